//! Procedural macros for agent tool declarations.
//!
//! `#[tools]` turns the `#[tool]` methods of an inherent impl block into an
//! `agent_tools::ToolHost` implementation and registers the type for
//! link-time discovery. `#[derive(ToolParam)]` describes domain types used as
//! tool parameters.

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemImpl, parse_macro_input};

mod param;
mod tools;

/// Declares the `#[tool]` methods of an inherent impl block.
///
/// Method attributes:
///
/// * `#[tool]` marks a method as a tool. Options: `name = "..."` overrides the
///   tool name, `description = "..."` adds a description line (repeatable),
///   and one of `blocking`, `non_blocking`, `virtual_thread` pins the
///   execution model.
/// * `#[p(description = "...", required = false)]` on a parameter.
/// * `#[session_id]` on the parameter that receives the caller's session.
///
/// Tool methods take `&self` or no receiver and owned parameters that
/// implement `serde::Deserialize` and `ToolParam`. The return value must
/// implement `serde::Serialize`; `Result` returns propagate their error.
///
/// The block may carry `#[tools(crate = "path::to::agent_tools")]` when the
/// tools crate is reached through a re-export.
#[proc_macro_attribute]
pub fn tools(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = tools::Options::default();
    let parser = syn::meta::parser(|meta| options.parse(meta));
    parse_macro_input!(attr with parser);
    let item = parse_macro_input!(item as ItemImpl);

    tools::expand(&options, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives `ToolParam`.
///
/// Enums whose variants are all unit variants map to an enumeration of the
/// variant names (honouring serde's `rename` and `rename_all`); every other
/// type maps to an object. `#[tool_param(crate = "...")]` points the impl at
/// a re-exported tools crate.
#[proc_macro_derive(ToolParam, attributes(tool_param))]
pub fn derive_tool_param(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    param::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
