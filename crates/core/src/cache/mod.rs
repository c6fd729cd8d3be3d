//! Durable binary-hash → source-archive bindings.

pub mod binding;

pub use binding::{BINDING_FORMAT_VERSION, BindingCache, BindingFile, BindingRecord};
