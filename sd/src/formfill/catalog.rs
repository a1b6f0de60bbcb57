//! Field catalog: semantic name -> form field binding
//!
//! Built once per form version against a [`FormSchema`] (the enumerated
//! field list of the official PDF). Every binding carries the field
//! kind, so a text value can never land on a checkbox. Missing target
//! fields are detected at build time and surface as [`MappingError`]
//! on resolve; a whole fill aborts rather than producing a petition
//! with silently dropped answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// What a form field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Checkbox,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Checkbox => "checkbox",
        }
    }
}

/// One addressable field of the form, as enumerated from the PDF
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    pub kind: FieldKind,
}

/// Enumerated field list of a specific form revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSchema {
    pub version: String,
    pub fields: Vec<FormField>,
}

impl FormSchema {
    pub fn new(version: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            version: version.into(),
            fields,
        }
    }

    /// The official consumer insolvency petition form, revision 2024.
    ///
    /// Only the fields the default mappings target are listed; the real
    /// form has ~300 more that we never write.
    pub fn insolvency_petition() -> Self {
        let mut fields = Vec::new();
        for id in [
            "Textfeld 1",
            "Textfeld 4",
            "Textfeld 22",
            "Textfeld 25",
            "Textfeld 26",
            "Textfeld 27",
            "Textfeld 28",
            "Textfeld 29",
            "Textfeld 30",
            "Textfeld 31",
            "Textfeld 37",
            "Textfeld 39",
            "Textfeld 40",
            "Textfeld 46",
            "Textfeld 47",
        ] {
            fields.push(FormField {
                id: id.to_string(),
                kind: FieldKind::Text,
            });
        }
        for n in [1, 11, 18, 19, 20, 23, 24, 25, 26, 27, 28, 29, 30, 32, 33, 35, 36, 298] {
            fields.push(FormField {
                id: format!("Kontrollkästchen {n}"),
                kind: FieldKind::Checkbox,
            });
        }
        Self::new("2024", fields)
    }
}

/// A declared binding before it is checked against a schema
#[derive(Debug, Clone)]
pub struct DeclaredMapping {
    pub semantic_name: &'static str,
    pub field_id: &'static str,
    pub kind: FieldKind,
    /// For checkbox options that are mutually exclusive
    pub group: Option<&'static str>,
}

const fn text(semantic_name: &'static str, field_id: &'static str) -> DeclaredMapping {
    DeclaredMapping {
        semantic_name,
        field_id,
        kind: FieldKind::Text,
        group: None,
    }
}

const fn checkbox(semantic_name: &'static str, field_id: &'static str) -> DeclaredMapping {
    DeclaredMapping {
        semantic_name,
        field_id,
        kind: FieldKind::Checkbox,
        group: None,
    }
}

const fn option(group: &'static str, semantic_name: &'static str, field_id: &'static str) -> DeclaredMapping {
    DeclaredMapping {
        semantic_name,
        field_id,
        kind: FieldKind::Checkbox,
        group: Some(group),
    }
}

/// The curated bindings for the petition form.
///
/// Group option names follow `group.option`; [`FieldCatalog::resolve`]
/// and `FormFill::activate` compose them the same way.
pub fn default_mappings() -> Vec<DeclaredMapping> {
    vec![
        // personal data, page 1
        text("name_vorname", "Textfeld 1"),
        text("telefon", "Textfeld 4"),
        text("vertreter_name", "Textfeld 22"),
        text("strasse", "Textfeld 25"),
        text("unterschrift_ort", "Textfeld 26"),
        text("plan_datum", "Textfeld 27"),
        text("hausnummer", "Textfeld 28"),
        text("vertreter_strasse", "Textfeld 29"),
        text("vertreter_ort", "Textfeld 30"),
        text("plz", "Textfeld 31"),
        text("ort", "Textfeld 37"),
        text("verfahren_aktenzeichen", "Textfeld 39"),
        text("email", "Textfeld 40"),
        text("unterhalt_anzahl", "Textfeld 46"),
        text("unterhalt_minderjaehrig", "Textfeld 47"),
        // petition and discharge declarations, always checked
        checkbox("antrag_restschuldbefreiung", "Kontrollkästchen 1"),
        checkbox("rsb_bisher_nicht_gestellt", "Kontrollkästchen 11"),
        checkbox("anlage_6", "Kontrollkästchen 18"),
        checkbox("anlage_7", "Kontrollkästchen 19"),
        checkbox("anlage_7a", "Kontrollkästchen 20"),
        checkbox("versicherung_richtigkeit", "Kontrollkästchen 298"),
        // exclusive groups
        option("familienstand", "familienstand.ledig", "Kontrollkästchen 23"),
        option("familienstand", "familienstand.verheiratet", "Kontrollkästchen 24"),
        option("familienstand", "familienstand.geschieden", "Kontrollkästchen 25"),
        option("familienstand", "familienstand.verwitwet", "Kontrollkästchen 26"),
        option("geschlecht", "geschlecht.maennlich", "Kontrollkästchen 27"),
        option("geschlecht", "geschlecht.weiblich", "Kontrollkästchen 28"),
        option("geschlecht", "geschlecht.divers", "Kontrollkästchen 29"),
        option("berufsstatus", "berufsstatus.angestellt", "Kontrollkästchen 30"),
        option("berufsstatus", "berufsstatus.selbstaendig", "Kontrollkästchen 32"),
        option("berufsstatus", "berufsstatus.arbeitslos", "Kontrollkästchen 33"),
        option("kinder", "kinder.ja", "Kontrollkästchen 35"),
        option("kinder", "kinder.nein", "Kontrollkästchen 36"),
    ]
}

/// Failures while binding semantic names to form fields
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Unknown semantic field: {0}")]
    UnknownSemantic(String),

    #[error("Form schema {version} has no field '{field_id}' for '{semantic}'")]
    MissingTargetField {
        semantic: String,
        field_id: String,
        version: String,
    },

    #[error("Field '{field_id}' for '{semantic}' is {actual} in schema, mapping declares {declared}")]
    KindMismatch {
        semantic: String,
        field_id: String,
        declared: &'static str,
        actual: &'static str,
    },

    #[error("Unknown checkbox group: {0}")]
    UnknownGroup(String),

    #[error("Catalog was built for form version {catalog}, fill requested {requested}")]
    VersionMismatch { catalog: String, requested: String },
}

/// A verified binding inside a catalog
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub semantic_name: String,
    pub field_id: String,
    pub kind: FieldKind,
    pub group: Option<String>,
    /// Declared but absent from the schema (drift); resolving it fails
    pub missing: bool,
}

/// Semantic-name index over one form revision
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    form_version: String,
    entries: Vec<CatalogEntry>,
    by_semantic: HashMap<String, usize>,
}

impl FieldCatalog {
    /// Check declared mappings against a schema and index them.
    ///
    /// Kind mismatches are rejected outright; missing target fields are
    /// kept as tombstones so that a fill touching them fails while a
    /// fill that never needs them can proceed.
    pub fn build(schema: &FormSchema, declared: Vec<DeclaredMapping>) -> Result<Self, MappingError> {
        let schema_kinds: HashMap<&str, FieldKind> =
            schema.fields.iter().map(|f| (f.id.as_str(), f.kind)).collect();

        let mut entries = Vec::with_capacity(declared.len());
        let mut by_semantic = HashMap::with_capacity(declared.len());

        for mapping in declared {
            let missing = match schema_kinds.get(mapping.field_id) {
                Some(actual) if *actual != mapping.kind => {
                    return Err(MappingError::KindMismatch {
                        semantic: mapping.semantic_name.to_string(),
                        field_id: mapping.field_id.to_string(),
                        declared: mapping.kind.as_str(),
                        actual: actual.as_str(),
                    });
                }
                Some(_) => false,
                None => {
                    warn!(
                        semantic = mapping.semantic_name,
                        field_id = mapping.field_id,
                        version = %schema.version,
                        "Declared field missing from form schema"
                    );
                    true
                }
            };

            by_semantic.insert(mapping.semantic_name.to_string(), entries.len());
            entries.push(CatalogEntry {
                semantic_name: mapping.semantic_name.to_string(),
                field_id: mapping.field_id.to_string(),
                kind: mapping.kind,
                group: mapping.group.map(str::to_string),
                missing,
            });
        }

        debug!(version = %schema.version, entries = entries.len(), "Field catalog built");
        Ok(Self {
            form_version: schema.version.clone(),
            entries,
            by_semantic,
        })
    }

    /// Catalog for the current petition form with the curated mappings
    pub fn insolvency_petition() -> Result<Self, MappingError> {
        Self::build(&FormSchema::insolvency_petition(), default_mappings())
    }

    pub fn form_version(&self) -> &str {
        &self.form_version
    }

    /// Look up the form field bound to a semantic name
    pub fn resolve(&self, semantic_name: &str) -> Result<&CatalogEntry, MappingError> {
        let entry = self
            .by_semantic
            .get(semantic_name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| MappingError::UnknownSemantic(semantic_name.to_string()))?;

        if entry.missing {
            return Err(MappingError::MissingTargetField {
                semantic: entry.semantic_name.clone(),
                field_id: entry.field_id.clone(),
                version: self.form_version.clone(),
            });
        }
        Ok(entry)
    }

    /// All option entries of an exclusive checkbox group
    pub fn group_options(&self, group: &str) -> Result<Vec<&CatalogEntry>, MappingError> {
        let options: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|e| e.group.as_deref() == Some(group))
            .collect();
        if options.is_empty() {
            return Err(MappingError::UnknownGroup(group.to_string()));
        }
        Ok(options)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Compare against the catalog built for a previous form revision.
    ///
    /// Removed or drifted semantics are the breaking part; a document
    /// run against the new revision must not start while any remain
    /// unreviewed.
    pub fn diff(&self, previous: &FieldCatalog) -> CatalogDiff {
        let removed = previous
            .entries
            .iter()
            .filter(|e| !e.missing)
            .filter(|e| self.resolve(&e.semantic_name).is_err())
            .map(|e| e.semantic_name.clone())
            .collect();
        let added = self
            .entries
            .iter()
            .filter(|e| !e.missing)
            .filter(|e| previous.resolve(&e.semantic_name).is_err())
            .map(|e| e.semantic_name.clone())
            .collect();
        CatalogDiff {
            from_version: previous.form_version.clone(),
            to_version: self.form_version.clone(),
            removed,
            added,
        }
    }
}

/// Result of comparing two catalog revisions
#[derive(Debug, Clone, Serialize)]
pub struct CatalogDiff {
    pub from_version: String,
    pub to_version: String,
    /// Semantics that resolved before and no longer do
    pub removed: Vec<String>,
    pub added: Vec<String>,
}

impl CatalogDiff {
    pub fn is_breaking(&self) -> bool {
        !self.removed.is_empty()
    }
}
