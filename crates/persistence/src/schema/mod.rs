//! Record schema documents and their version chain.
//!
//! [`SchemaValidator`] decides whether a document may be published;
//! [`SchemaVersionChain`] is the ordered, doubly-linked view of what has been
//! published for one record type. Publishing itself is a storage operation,
//! see [`SchemaStorage`](crate::core::SchemaStorage).

mod chain;
mod validator;

pub use chain::{ChainLink, SchemaVersionChain};
pub use validator::SchemaValidator;
