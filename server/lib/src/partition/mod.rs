//! Partitions hold the entries. The interceptor chain ends at a [`PartitionNexus`], which
//! performs the physical change or read for every operation that makes it that far.

use crate::prelude::*;

pub mod memory;

pub use self::memory::MemoryPartition;

pub trait PartitionNexus: Send + Sync {
    /// The naming contexts held.
    fn suffixes(&self) -> Vec<Dn>;

    /// Read an entry outside of any operation.
    fn fetch(&self, dn: &Dn) -> Result<Option<Entry>, OperationError>;

    fn has_children(&self, dn: &Dn) -> Result<bool, OperationError>;

    fn add(&self, ctx: &OperationContext<AddOp>) -> Result<(), OperationError>;

    fn delete(&self, ctx: &OperationContext<DeleteOp>) -> Result<(), OperationError>;

    /// Apply the modifications and return the entry as stored.
    fn modify(&self, ctx: &OperationContext<ModifyOp>) -> Result<Entry, OperationError>;

    fn rename(&self, ctx: &OperationContext<RenameOp>) -> Result<(), OperationError>;

    fn move_entry(&self, ctx: &OperationContext<MoveOp>) -> Result<(), OperationError>;

    fn move_and_rename(&self, ctx: &OperationContext<MoveAndRenameOp>) -> Result<(), OperationError>;

    fn lookup(&self, ctx: &OperationContext<LookupOp>) -> Result<Option<Entry>, OperationError>;

    fn has_entry(&self, ctx: &OperationContext<HasEntryOp>) -> Result<bool, OperationError>;

    fn search(&self, ctx: &OperationContext<SearchOp>) -> Result<EntryCursor, OperationError>;

    /// The immediate children of the target.
    fn list(&self, ctx: &OperationContext<ListOp>) -> Result<EntryCursor, OperationError>;

    fn compare(&self, ctx: &OperationContext<CompareOp>) -> Result<bool, OperationError>;

    fn root_dse(&self, ctx: &OperationContext<RootDseOp>) -> Result<Entry, OperationError>;

    /// Flush to stable storage.
    fn sync(&self) -> Result<(), OperationError>;
}
