#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

mod entry;

#[allow(unused_extern_crates)]
extern crate proc_macro;

use proc_macro::TokenStream;

/// Wrap a test function taking `&Arc<DirectoryService>` so that it runs against
/// a freshly started in-memory server. Fields of `testkit::TestConfiguration`
/// may be overridden, e.g. `#[ds_test(changelog = true)]`.
#[proc_macro_attribute]
pub fn ds_test(args: TokenStream, item: TokenStream) -> TokenStream {
    entry::ds_test(&args, item)
}
