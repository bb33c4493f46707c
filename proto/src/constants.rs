//! Because consistency is great!
//!
//! Attribute names are stored lower case, that is the form every entry
//! and schema lookup normalises to.

use std::time::Duration;

/// The default interval the background task flushes the partitions to stable storage.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15);
/// How long shutdown waits for the sync task to finish its last flush.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// The DN of the built in administrator.
pub const ADMIN_DN: &str = "uid=admin,ou=system";
/// The container holding the administrator and other system entries.
pub const SYSTEM_DN: &str = "ou=system";
/// The container holding every meta-schema entry.
pub const SCHEMA_DN: &str = "ou=schema";
/// The subschema subentry advertised by the root DSE.
pub const SUBSCHEMA_SUBENTRY_DN: &str = "cn=schema";

// Control OIDs.
pub const OID_SUBENTRIES_CONTROL: &str = "1.3.6.1.4.1.4203.1.10.1";
pub const OID_MANAGE_DSA_IT_CONTROL: &str = "2.16.840.1.113730.3.4.2";

// IF YOU CHANGE THESE VALUES YOU BREAK EVERYTHING
pub const ATTR_ACCESS_CONTROL_SUBENTRIES: &str = "accesscontrolsubentries";
pub const ATTR_ADMINISTRATIVE_ROLE: &str = "administrativerole";
pub const ATTR_CN: &str = "cn";
pub const ATTR_COLLECTIVE_ATTRIBUTE_SUBENTRIES: &str = "collectiveattributesubentries";
pub const ATTR_COLLECTIVE_EXCLUSIONS: &str = "collectiveexclusions";
pub const ATTR_CREATE_TIMESTAMP: &str = "createtimestamp";
pub const ATTR_CREATORS_NAME: &str = "creatorsname";
pub const ATTR_DC: &str = "dc";
pub const ATTR_DESCRIPTION: &str = "description";
pub const ATTR_ENTRY_UUID: &str = "entryuuid";
pub const ATTR_MODIFIERS_NAME: &str = "modifiersname";
pub const ATTR_MODIFY_TIMESTAMP: &str = "modifytimestamp";
pub const ATTR_NAMING_CONTEXTS: &str = "namingcontexts";
pub const ATTR_OBJECT_CLASS: &str = "objectclass";
pub const ATTR_OU: &str = "ou";
pub const ATTR_PRESCRIPTIVE_ACI: &str = "prescriptiveaci";
pub const ATTR_REF: &str = "ref";
pub const ATTR_SN: &str = "sn";
pub const ATTR_SUBSCHEMA_SUBENTRY: &str = "subschemasubentry";
pub const ATTR_SUBTREE_SPECIFICATION: &str = "subtreespecification";
pub const ATTR_SUPPORTED_CONTROL: &str = "supportedcontrol";
pub const ATTR_SUPPORTED_LDAP_VERSION: &str = "supportedldapversion";
pub const ATTR_TRIGGER_EXECUTION_SUBENTRIES: &str = "triggerexecutionsubentries";
pub const ATTR_UID: &str = "uid";
pub const ATTR_USER_PASSWORD: &str = "userpassword";
pub const ATTR_VENDOR_NAME: &str = "vendorname";

// Meta-schema attributes.
pub const ATTR_M_COLLECTIVE: &str = "m-collective";
pub const ATTR_M_DEPENDENCIES: &str = "m-dependencies";
pub const ATTR_M_DESCRIPTION: &str = "m-description";
pub const ATTR_M_DISABLED: &str = "m-disabled";
pub const ATTR_M_EQUALITY: &str = "m-equality";
pub const ATTR_M_FQCN: &str = "m-fqcn";
pub const ATTR_M_MAY: &str = "m-may";
pub const ATTR_M_MUST: &str = "m-must";
pub const ATTR_M_NAME: &str = "m-name";
pub const ATTR_M_NO_USER_MODIFICATION: &str = "m-nousermodification";
pub const ATTR_M_OID: &str = "m-oid";
pub const ATTR_M_OWNER: &str = "m-owner";
pub const ATTR_M_SINGLE_VALUE: &str = "m-singlevalue";
pub const ATTR_M_SUP_ATTRIBUTE_TYPE: &str = "m-supattributetype";
pub const ATTR_M_SUP_OBJECT_CLASS: &str = "m-supobjectclass";
pub const ATTR_M_SYNTAX: &str = "m-syntax";
pub const ATTR_M_TYPE_OBJECT_CLASS: &str = "m-typeobjectclass";
pub const ATTR_M_USAGE: &str = "m-usage";
