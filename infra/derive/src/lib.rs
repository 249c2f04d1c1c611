#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the veil crates.
//!
//! * [`macro@veil_error`] wires an error enum into `thiserror` with context support.
//! * [`macro@main`] bootstraps a binary on a preconfigured Tokio runtime.
//! * [`macro@api_model`] and [`macro@api_handler`] keep HTTP models and handlers in step
//!   with their `OpenAPI` description.
//!
//! Examples are `ignore`d here because a proc-macro crate cannot use its own macros.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Attribute macro that boots an `async fn main` on a `veil_runtime` preset.
///
/// # Arguments
///
/// * `server` - multi-threaded runtime tuned for the HTTP proxy.
/// * `cli` - single worker runtime for the interactive shell.
/// * `default` - the default multi-threaded configuration.
///
/// # Examples
///
/// ```rust,ignore
/// #[veil_runtime::main(server)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Turns an enum into a `thiserror` error with context helpers.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already present.
/// * `<ErrorName>Ext` trait with `.context(...)` for `Result<T, ErrorName>` and for
///   `Result<T, Source>` of every variant that wraps a `source`.
/// * `From<Source>` for variants with a `source` field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
///
/// # Requirements
///
/// Variants must use named fields. A variant with a `source` must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[veil_derive::veil_error]
/// pub enum StoreError {
///     #[error("Redis error{}: {source}", format_context(.context))]
///     Redis { source: redis::RedisError, context: Option<Cow<'static, str>> },
///
///     #[error("Internal store error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn ping(conn: &mut redis::Connection) -> Result<(), StoreError> {
///     redis::cmd("PING").query::<String>(conn).context("Initial ping")?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn veil_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Prepares a struct for use as an HTTP request or response body.
///
/// Adds `Debug`, `serde::Serialize`, `serde::Deserialize` and `utoipa::ToSchema` when not
/// derived already, renames fields to camelCase and rejects unknown fields.
///
/// # Arguments
///
/// * `rename_all = "..."` - another serde case.
/// * `deny_unknown_fields = false` - accept unknown fields.
///
/// # Example
///
/// ```rust,ignore
/// #[veil_derive::api_model]
/// pub struct SetRequest {
///     pub key: String,
///     pub exp_time_unit: Option<String>,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(args.into(), input).into()
}

/// Documents an axum handler with `utoipa::path`; arguments are passed through.
///
/// # Example
///
/// ```rust,ignore
/// #[veil_derive::api_handler(
///     get,
///     path = "/health",
///     responses((status = OK, body = HealthResponse)),
///     tag = "System"
/// )]
/// pub async fn health() -> Json<HealthResponse> {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}
