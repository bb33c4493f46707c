//! The subentry engine: subtree specifications, the refinements that narrow them, the
//! evaluator deciding which entries a specification selects, and the cache of every
//! subentry in the directory.

pub mod cache;
pub mod evaluator;
pub mod refinement;
pub mod subtree;

pub use self::cache::{
    Subentry, SubentryCache, SubentryCacheReadTransaction, SubentryCacheTransaction,
    SubentryCacheWriteTransaction, SubentryTypes,
};
pub use self::evaluator::SubtreeEvaluator;
pub use self::refinement::{Refinement, RefinementEvaluator, RefinementLeafEvaluator};
pub use self::subtree::SubtreeSpecification;
