//! One fill operation against a pinned field catalog

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::catalog::{FieldCatalog, FieldKind, MappingError};

/// Two options of the same exclusive group were activated
#[derive(Debug, Error)]
#[error("Checkbox group '{group}' already has '{existing}' active, refusing '{requested}'")]
pub struct ConflictError {
    pub group: String,
    pub existing: String,
    pub requested: String,
}

#[derive(Debug, Error)]
pub enum FillError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

/// A value destined for one form field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FieldValue {
    Text(String),
    Checked,
}

/// Accumulates field values for a single document.
///
/// Values are keyed by form field id; exclusive groups track which
/// option is active so a second activation is rejected instead of
/// producing a form with two marital statuses ticked.
#[derive(Debug)]
pub struct FormFill<'a> {
    catalog: &'a FieldCatalog,
    values: BTreeMap<String, FieldValue>,
    active_options: BTreeMap<String, String>,
}

impl<'a> FormFill<'a> {
    pub fn new(catalog: &'a FieldCatalog) -> Self {
        Self {
            catalog,
            values: BTreeMap::new(),
            active_options: BTreeMap::new(),
        }
    }

    /// Catalog construction pinned to an expected form version.
    ///
    /// Callers that persisted the version a case was prepared against
    /// use this to refuse filling a drifted form.
    pub fn for_version(catalog: &'a FieldCatalog, expected_version: &str) -> Result<Self, MappingError> {
        if catalog.form_version() != expected_version {
            return Err(MappingError::VersionMismatch {
                catalog: catalog.form_version().to_string(),
                requested: expected_version.to_string(),
            });
        }
        Ok(Self::new(catalog))
    }

    /// Write a text value through its semantic name
    pub fn set_text(&mut self, semantic_name: &str, value: impl Into<String>) -> Result<(), MappingError> {
        let entry = self.catalog.resolve(semantic_name)?;
        if entry.kind != FieldKind::Text {
            return Err(MappingError::KindMismatch {
                semantic: entry.semantic_name.clone(),
                field_id: entry.field_id.clone(),
                declared: FieldKind::Text.as_str(),
                actual: entry.kind.as_str(),
            });
        }
        self.values.insert(entry.field_id.clone(), FieldValue::Text(value.into()));
        Ok(())
    }

    /// Tick a standalone checkbox
    pub fn check(&mut self, semantic_name: &str) -> Result<(), MappingError> {
        let entry = self.catalog.resolve(semantic_name)?;
        if entry.kind != FieldKind::Checkbox {
            return Err(MappingError::KindMismatch {
                semantic: entry.semantic_name.clone(),
                field_id: entry.field_id.clone(),
                declared: FieldKind::Checkbox.as_str(),
                actual: entry.kind.as_str(),
            });
        }
        self.values.insert(entry.field_id.clone(), FieldValue::Checked);
        Ok(())
    }

    /// Tick exactly one option of an exclusive group.
    ///
    /// Re-activating the already active option is a no-op; any other
    /// second activation is a conflict.
    pub fn activate(&mut self, group: &str, option_key: &str) -> Result<(), FillError> {
        // validates the group exists even when the option does not
        self.catalog.group_options(group)?;

        let semantic = format!("{group}.{option_key}");
        let entry = self.catalog.resolve(&semantic)?;

        if let Some(existing) = self.active_options.get(group) {
            if existing != option_key {
                return Err(ConflictError {
                    group: group.to_string(),
                    existing: existing.clone(),
                    requested: option_key.to_string(),
                }
                .into());
            }
            return Ok(());
        }

        debug!(group, option = option_key, field_id = %entry.field_id, "Group option activated");
        self.values.insert(entry.field_id.clone(), FieldValue::Checked);
        self.active_options.insert(group.to_string(), option_key.to_string());
        Ok(())
    }

    /// The accumulated values, keyed and ordered by form field id
    pub fn into_values(self) -> BTreeMap<String, FieldValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
