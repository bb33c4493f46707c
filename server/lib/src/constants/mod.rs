// Re-export as needed

pub mod entries;
pub mod schema;

pub use crate::constants::entries::*;
pub use crate::constants::schema::*;

/// The value of the boolean syntax meaning true.
pub const VALUE_TRUE: &str = "TRUE";
pub const VALUE_FALSE: &str = "FALSE";

/// The `collectiveExclusions` value that excludes every collective attribute.
pub const EXCLUDE_ALL_COLLECTIVE_ATTRIBUTES: &str = "excludeAllCollectiveAttributes";

pub const VENDOR_NAME: &str = "dirsrv";

/// Asks for a schema change to cascade to the elements depending on the target.
pub const OID_CASCADE_CONTROL: &str = "1.3.6.1.4.1.18060.0.0.1";

/// The administrator password when none is configured.
pub const DEFAULT_ADMIN_PASSWORD: &str = "secret";
