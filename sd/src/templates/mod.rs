//! Document generation: batches, render context, template engine
//!
//! Templates are embedded at compile time and rendered with strict
//! Handlebars; the petition form goes through the field catalog in
//! [`crate::formfill`] instead of a text template.

pub mod batch;
pub mod context;
pub mod embedded;
mod engine;

pub use batch::{BatchKind, DocumentSpec, RenderTarget};
pub use context::build_context;
pub use engine::{DocumentBody, GeneratedDocument, TemplateEngine, TemplateError};
