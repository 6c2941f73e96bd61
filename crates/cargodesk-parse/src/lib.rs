//! Document parsers for cargodesk.
//!
//! Each parser turns the raw bytes of one source file into the intermediate
//! records defined in `cargodesk-core`. Parsers never touch the store or the
//! filesystem (apart from [`HeaderFeedReader::open`]); field-level problems
//! are absorbed by the coercion helpers and only document-level problems
//! surface as errors.

pub mod declaration;
pub mod error;
pub mod header_feed;
pub mod manifest;
pub mod reference;
mod xml;

pub use declaration::parse_declarations;
pub use error::{Error, Result};
pub use header_feed::HeaderFeedReader;
pub use manifest::parse_manifest;
pub use reference::parse_reference;
