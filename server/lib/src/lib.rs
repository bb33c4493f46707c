//! The directory server library. This implements the operation pipeline every directory
//! request travels through: an ordered chain of interceptors enforcing normalisation,
//! authentication, referrals, access, schema, operational and collective attributes and
//! subentries, in front of a partition holding the entries themselves.

#![deny(warnings)]
#![recursion_limit = "512"]
#![warn(unused_extern_crates)]
// Enable some groups of clippy lints.
#![deny(clippy::suspicious)]
#![deny(clippy::perf)]
// Specific lints to enforce.
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::manual_let_else)]
#![allow(clippy::unreachable)]

#[macro_use]
extern crate tracing;
#[macro_use]
extern crate lazy_static;

// This has to be before everything else so the macros are in scope.
#[macro_use]
pub mod macros;

pub mod changelog;
pub mod constants;
pub mod context;
pub mod cursor;
pub mod dn;
pub mod entry;
pub mod filter;
pub mod interceptor;
pub mod ldif;
pub mod modify;
pub mod operation;
pub mod partition;
pub mod schema;
pub mod service;
pub mod session;
pub mod subentry;
pub mod testkit;

/// A prelude of imports that should be imported by all other directory server
/// modules to help make imports cleaner.
pub mod prelude {
    pub use dirsrv_proto::attribute::{AttrString, Attribute};
    pub use dirsrv_proto::constants::*;
    pub use dirsrv_proto::internal::{OperationError, SchemaError};
    pub use sketching::{
        admin_debug, admin_error, admin_info, admin_warn, filter_error, filter_info, filter_trace,
        filter_warn, perf_trace, request_error, request_info, request_trace, request_warn,
        schema_error, schema_info, schema_trace, schema_warn, security_access, security_critical,
        security_debug, security_error, security_info, tagged_event, EventTag,
    };
    pub use std::sync::Arc;
    pub use std::time::Duration;

    pub use crate::constants::*;
    pub use crate::context::{
        AddOp, AttrSelection, BindOp, Bypass, CompareOp, Control, Controls, DeleteOp,
        HasEntryOp, ListOp, LookupOp, ModDnPayload, ModifyOp, MoveAndRenameOp, MoveOp,
        OpFrame, OperationContext, OperationId, OperationKind, OperationPayload, RenameOp,
        RootDseOp, SearchOp, UnbindOp,
    };
    pub use crate::cursor::EntryCursor;
    pub use crate::dn::{Ava, Dn, Rdn};
    pub use crate::entry::{Entry, ValueSet};
    pub use crate::filter::{f_and, f_eq, f_not, f_or, f_pres, f_sub, Filter, Scope};
    pub use crate::modify::{m_add, m_purge, m_remove, m_replace, Modify, ModifyList};
    pub use crate::service::{DirectoryService, DirectoryServiceConfig};
    pub use crate::session::{CoreSession, Principal};

    #[cfg(test)]
    pub use dirsrvd_lib_macros::*;
}
