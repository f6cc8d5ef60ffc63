//! # Column Template
//!
//! Host-independent core for computed message-list columns: the template node
//! model and its evaluator, the order-preserving numeric sort-key encoder, and
//! the logging and configuration services shared by the runtime crates.

pub mod config;
pub mod logging;
pub mod sort_key;
pub mod template;

// Convenience re-exports
pub use sort_key::{encode_order_preserving, parse_float_prefix, NON_NUMERIC_SORT_KEY};
pub use template::{evaluate, Evaluation, FieldLookup, ParseNode, Template, TemplateError};
