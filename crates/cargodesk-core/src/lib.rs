//! Core types and trait definitions for cargodesk.
//!
//! This crate holds the intermediate records produced by the document parsers,
//! the field coercion helpers they share, and the storage traits implemented
//! by backends. It has no HTTP, filesystem, or database dependencies.

// Native `async fn` in traits; the advisory lint about `Send` bounds does not
// apply because every trait method spells out its future type.
#![allow(async_fn_in_trait)]

pub mod coerce;
pub mod declaration;
pub mod error;
pub mod feed;
pub mod manifest;
pub mod reference;
pub mod report;
pub mod store;

pub use error::{Error, Result};
