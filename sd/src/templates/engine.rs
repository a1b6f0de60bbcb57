//! Batch generation engine
//!
//! Renders a whole document batch in memory and hands every document
//! back at once. A failure anywhere aborts the batch with nothing
//! emitted; a half-generated batch never reaches the manifest.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use handlebars::Handlebars;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Case, DocumentRecord};
use crate::formfill::{FieldCatalog, FieldValue, FillError, FormFill, MappingError};

use super::batch::{BatchKind, DocumentSpec, RenderTarget};
use super::context::{build_context, format_date_de};
use super::embedded;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template registration failed: {0}")]
    Registration(#[from] handlebars::TemplateError),

    #[error("Rendering '{template}' failed")]
    Render {
        template: String,
        #[source]
        source: handlebars::RenderError,
    },

    #[error("No embedded template registered under '{0}'")]
    UnknownTemplate(&'static str),

    #[error("Template '{template}' never references declared slot '{slot}'")]
    SlotNotInTemplate { template: &'static str, slot: &'static str },

    #[error("Case {case_ref}: context is missing slot '{slot}' required by '{template}'")]
    SlotNotInContext {
        case_ref: String,
        template: &'static str,
        slot: &'static str,
    },

    #[error("Case {0} has no settlement plan, cannot generate this batch")]
    MissingPlan(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Fill(#[from] FillError),
}

/// Rendered content of one document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBody {
    /// Plain text rendered from a template
    Text(String),
    /// Field values for the petition form, keyed by form field id
    Form(BTreeMap<String, FieldValue>),
}

/// One generated document plus its manifest record
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub record: DocumentRecord,
    pub filename: String,
    pub body: DocumentBody,
}

/// Engine holding the registered templates and the field catalog.
///
/// Construction fails if any batch declares a slot its template never
/// references, so wiring mistakes surface at startup rather than in
/// the middle of a case.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    catalog: FieldCatalog,
}

impl TemplateEngine {
    pub fn new() -> Result<Self, TemplateError> {
        Self::with_catalog(FieldCatalog::insolvency_petition()?)
    }

    pub fn with_catalog(catalog: FieldCatalog) -> Result<Self, TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        for (name, source) in embedded::ALL {
            handlebars.register_template_string(name, source)?;
        }

        for batch in BatchKind::ALL {
            for spec in batch.documents() {
                if let RenderTarget::Template(name) = spec.target {
                    let source = embedded::source(name).ok_or(TemplateError::UnknownTemplate(name))?;
                    for &slot in spec.required_slots {
                        if !template_references_slot(source, slot) {
                            return Err(TemplateError::SlotNotInTemplate { template: name, slot });
                        }
                    }
                }
            }
        }

        debug!(templates = embedded::ALL.len(), "Template engine ready");
        Ok(Self { handlebars, catalog })
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Generate every document of a batch from one case snapshot.
    ///
    /// Deterministic for a fixed snapshot and `as_of` date; only the
    /// manifest metadata (ids, timestamps) differs between runs.
    pub fn generate(
        &self,
        case: &Case,
        batch: BatchKind,
        as_of: NaiveDate,
    ) -> Result<Vec<GeneratedDocument>, TemplateError> {
        if batch.requires_plan() && case.plan.is_none() {
            return Err(TemplateError::MissingPlan(case.reference.clone()));
        }

        let context = build_context(case, as_of);
        let mut documents = Vec::with_capacity(batch.documents().len());

        for spec in batch.documents() {
            let body = match spec.target {
                RenderTarget::Template(name) => {
                    self.check_slots(case, spec, &context)?;
                    let text = self
                        .handlebars
                        .render(name, &context)
                        .map_err(|source| TemplateError::Render {
                            template: name.to_string(),
                            source,
                        })?;
                    DocumentBody::Text(text)
                }
                RenderTarget::PetitionForm => DocumentBody::Form(self.petition_values(case, as_of)?),
            };

            let extension = match body {
                DocumentBody::Text(_) => "txt",
                DocumentBody::Form(_) => "json",
            };
            documents.push(GeneratedDocument {
                record: DocumentRecord {
                    id: Uuid::now_v7().to_string(),
                    batch_kind: batch.as_str().to_string(),
                    kind: spec.kind.to_string(),
                    generated_at: Utc::now(),
                },
                filename: format!("{}_{}.{extension}", case.reference, spec.kind),
                body,
            });
        }

        info!(case_ref = %case.reference, batch = batch.as_str(), documents = documents.len(), "Batch generated");
        Ok(documents)
    }

    fn check_slots(&self, case: &Case, spec: &DocumentSpec, context: &serde_json::Value) -> Result<(), TemplateError> {
        if let RenderTarget::Template(name) = spec.target {
            for &slot in spec.required_slots {
                if context.get(slot).is_none() {
                    return Err(TemplateError::SlotNotInContext {
                        case_ref: case.reference.clone(),
                        template: name,
                        slot,
                    });
                }
            }
        }
        Ok(())
    }

    /// Map a case onto the petition form field values
    fn petition_values(&self, case: &Case, as_of: NaiveDate) -> Result<BTreeMap<String, FieldValue>, TemplateError> {
        let debtor = &case.debtor;
        let mut fill = FormFill::new(&self.catalog);

        fill.set_text("name_vorname", &debtor.full_name)?;
        fill.set_text("strasse", &debtor.street)?;
        fill.set_text("hausnummer", &debtor.house_number)?;
        fill.set_text("plz", &debtor.postal_code)?;
        fill.set_text("ort", &debtor.city)?;
        fill.set_text("unterschrift_ort", &debtor.city)?;
        fill.set_text("plan_datum", format_date_de(as_of))?;
        fill.set_text("verfahren_aktenzeichen", &case.reference)?;
        if let Some(phone) = &debtor.phone {
            fill.set_text("telefon", phone)?;
        }
        if let Some(email) = &debtor.email {
            fill.set_text("email", email)?;
        }

        // declarations the petition always carries
        for semantic in [
            "antrag_restschuldbefreiung",
            "rsb_bisher_nicht_gestellt",
            "anlage_6",
            "anlage_7",
            "anlage_7a",
            "versicherung_richtigkeit",
        ] {
            fill.check(semantic)?;
        }

        fill.activate("geschlecht", debtor.gender.option_key())?;
        fill.activate("familienstand", debtor.marital_status.option_key())?;
        fill.activate("berufsstatus", debtor.employment.option_key())?;
        if debtor.children > 0 {
            fill.activate("kinder", "ja")?;
            fill.set_text("unterhalt_anzahl", debtor.children.to_string())?;
            fill.set_text("unterhalt_minderjaehrig", debtor.children.to_string())?;
        } else {
            fill.activate("kinder", "nein")?;
        }

        Ok(fill.into_values())
    }
}

/// Whether a template source references a top-level slot, either as a
/// plain expression or as an `#each` block.
fn template_references_slot(source: &str, slot: &str) -> bool {
    source.contains(&format!("{{{{{slot}}}}}")) || source.contains(&format!("{{{{#each {slot}}}}}"))
}
