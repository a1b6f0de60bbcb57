//! Field mapping for the fixed-schema insolvency petition form
//!
//! The government PDF form addresses ~300 fields by opaque names
//! ("Textfeld 1", "Kontrollkaestchen 25"). The [`FieldCatalog`] pins a
//! semantic name to each target field with a statically typed kind,
//! built once per form version; nothing re-derives field kinds at fill
//! time. [`FormFill`] is one fill operation against a catalog.

mod catalog;
mod fill;

pub use catalog::{
    CatalogDiff, CatalogEntry, DeclaredMapping, FieldCatalog, FieldKind, FormField, FormSchema, MappingError,
    default_mappings,
};
pub use fill::{ConflictError, FieldValue, FillError, FormFill};
