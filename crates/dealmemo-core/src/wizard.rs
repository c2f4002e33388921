//! Wizard state machine
//!
//! Single owner of everything a deal-memo session holds: the current step,
//! staged uploads, extracted field values with their confidence scores,
//! manually entered values, per-request in-flight flags, and one dismissible
//! error. All mutations happen on one logical thread of control; network
//! completions re-enter through token-checked `apply_*`/`fail_*` calls so a
//! response that lands after a reset can never resurrect stale data.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::schema::FieldSchema;
use crate::upload::{validate_upload, DocumentRole, UploadRejection};

/// Current date in the MM-DD-YYYY form used by date-valued fields.
pub fn today_mmddyyyy() -> String {
    chrono::Local::now().format("%m-%d-%Y").to_string()
}

/// The four linear wizard steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Upload,
    Review,
    ManualEntry,
    Generate,
}

impl Step {
    pub fn index(self) -> u8 {
        match self {
            Step::Upload => 0,
            Step::Review => 1,
            Step::ManualEntry => 2,
            Step::Generate => 3,
        }
    }
}

/// An accepted upload held for submission and display. At most one per role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDocument {
    pub role: DocumentRole,
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Handle tying an in-flight request to the state that issued it. A reset
/// (or a newer request of the same kind) invalidates outstanding tokens;
/// completions carrying a stale token are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("an extraction request is already in flight")]
    ExtractionInFlight,
    #[error("a generation request is already in flight")]
    GenerationInFlight,
    #[error("No valid documents uploaded. Please upload at least one PDF or .docx file.")]
    NoDocumentsStaged,
    #[error("extracted data is not available yet")]
    ExtractionPending,
    #[error("document generation is only available at the final step")]
    NotAtGenerateStep,
    #[error("already at the first step")]
    AtFirstStep,
    #[error("no step beyond document generation")]
    AtFinalStep,
    #[error("required fields are missing: {0}")]
    MissingRequired(String),
    #[error("unknown field key: {0}")]
    UnknownField(String),
    #[error(transparent)]
    Rejected(#[from] UploadRejection),
}

/// One wizard session's state. Created once per session, mutated throughout,
/// reinitialized only by [`WizardState::reset`].
#[derive(Debug)]
pub struct WizardState {
    schema: FieldSchema,
    step: Step,
    staged: Vec<StagedDocument>,
    extracted: Option<BTreeMap<String, String>>,
    confidence: BTreeMap<String, f64>,
    manual: BTreeMap<String, String>,
    extracting: bool,
    generating: bool,
    error: Option<String>,
    extraction_epoch: u64,
    generation_epoch: u64,
}

impl WizardState {
    pub fn new(schema: FieldSchema) -> Self {
        let manual = schema.manual_defaults(&today_mmddyyyy());
        Self {
            schema,
            step: Step::Upload,
            staged: Vec::new(),
            extracted: None,
            confidence: BTreeMap::new(),
            manual,
            extracting: false,
            generating: false,
            error: None,
            extraction_epoch: 0,
            generation_epoch: 0,
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn staged_documents(&self) -> &[StagedDocument] {
        &self.staged
    }

    pub fn document_for_role(&self, role: DocumentRole) -> Option<&StagedDocument> {
        self.staged.iter().find(|d| d.role == role)
    }

    pub fn is_extracting(&self) -> bool {
        self.extracting
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Attach a dismissible error message to the current step.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Whether extraction has populated the review data.
    pub fn has_extracted(&self) -> bool {
        self.extracted.is_some()
    }

    pub fn extracted_value(&self, key: &str) -> Option<&str> {
        self.extracted.as_ref()?.get(key).map(String::as_str)
    }

    pub fn manual_value(&self, key: &str) -> Option<&str> {
        self.manual.get(key).map(String::as_str)
    }

    pub fn confidence_score(&self, key: &str) -> Option<f64> {
        self.confidence.get(key).copied()
    }

    pub fn manual_values(&self) -> &BTreeMap<String, String> {
        &self.manual
    }

    // ---- staging ----

    /// Validate and stage a candidate file. A second accepted file for the
    /// same role silently supersedes the first; the other role is never
    /// touched. On rejection nothing is staged and the rejection message is
    /// attached as the session error.
    pub fn stage_document(
        &mut self,
        role: DocumentRole,
        filename: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<(), UploadRejection> {
        if let Err(rejection) = validate_upload(filename, mime, bytes.len() as u64) {
            self.error = Some(rejection.to_string());
            return Err(rejection);
        }
        self.error = None;

        let doc = StagedDocument {
            role,
            filename: filename.to_string(),
            mime: mime.to_string(),
            bytes,
        };
        if let Some(existing) = self.staged.iter_mut().find(|d| d.role == role) {
            *existing = doc;
        } else {
            self.staged.push(doc);
            self.staged.sort_by_key(|d| d.role);
        }
        Ok(())
    }

    pub fn remove_document(&mut self, role: DocumentRole) {
        self.staged.retain(|d| d.role != role);
    }

    // ---- extraction lifecycle ----

    /// Mark an extraction request as in flight and hand out its token.
    /// Refused while another extraction is outstanding or with nothing
    /// staged.
    pub fn begin_extraction(&mut self) -> Result<RequestToken, WizardError> {
        if self.extracting {
            return Err(WizardError::ExtractionInFlight);
        }
        if self.staged.is_empty() {
            return Err(WizardError::NoDocumentsStaged);
        }
        self.error = None;
        self.extracting = true;
        self.extraction_epoch += 1;
        Ok(RequestToken(self.extraction_epoch))
    }

    /// Apply a successful extraction response: materialize every
    /// schema-defined key (missing keys become empty strings), keep only
    /// schema-known confidence scores, and move to the review step — all
    /// atomically. Returns false (and changes nothing) for a stale token.
    pub fn apply_extraction(
        &mut self,
        token: RequestToken,
        fields: BTreeMap<String, String>,
        confidence: BTreeMap<String, f64>,
    ) -> bool {
        if token.0 != self.extraction_epoch || !self.extracting {
            return false;
        }
        self.extracting = false;

        let materialized = self
            .schema
            .extracted_keys()
            .map(|key| {
                let value = fields.get(key).cloned().unwrap_or_default();
                (key.to_string(), value)
            })
            .collect();
        self.extracted = Some(materialized);
        self.confidence = confidence
            .into_iter()
            .filter(|(key, _)| self.schema.has_extracted_key(key))
            .collect();
        self.step = Step::Review;
        true
    }

    /// Record a failed extraction: the message becomes the session error,
    /// the step does not change, and staged files remain for retry.
    pub fn fail_extraction(&mut self, token: RequestToken, message: String) -> bool {
        if token.0 != self.extraction_epoch || !self.extracting {
            return false;
        }
        self.extracting = false;
        self.error = Some(message);
        true
    }

    // ---- generation lifecycle ----

    pub fn begin_generation(&mut self) -> Result<RequestToken, WizardError> {
        if self.generating {
            return Err(WizardError::GenerationInFlight);
        }
        if self.step != Step::Generate {
            return Err(WizardError::NotAtGenerateStep);
        }
        if self.extracted.is_none() {
            return Err(WizardError::ExtractionPending);
        }
        self.error = None;
        self.generating = true;
        self.generation_epoch += 1;
        Ok(RequestToken(self.generation_epoch))
    }

    /// Acknowledge a completed generation request. Returns true when the
    /// caller should go ahead with the download side effect; false means
    /// the token went stale (reset happened) and the result must be dropped.
    pub fn finish_generation(&mut self, token: RequestToken) -> bool {
        if token.0 != self.generation_epoch || !self.generating {
            return false;
        }
        self.generating = false;
        true
    }

    pub fn fail_generation(&mut self, token: RequestToken, message: String) -> bool {
        if token.0 != self.generation_epoch || !self.generating {
            return false;
        }
        self.generating = false;
        self.error = Some(message);
        true
    }

    // ---- field edits ----

    /// Replace one extracted field's value. Every other key is untouched.
    pub fn set_extracted_field(&mut self, key: &str, value: String) -> Result<(), WizardError> {
        if !self.schema.has_extracted_key(key) {
            return Err(WizardError::UnknownField(key.to_string()));
        }
        let fields = self
            .extracted
            .as_mut()
            .ok_or(WizardError::ExtractionPending)?;
        fields.insert(key.to_string(), value);
        Ok(())
    }

    /// Replace one manual field's value. Every other key is untouched.
    pub fn set_manual_field(&mut self, key: &str, value: String) -> Result<(), WizardError> {
        if !self.schema.has_manual_key(key) {
            return Err(WizardError::UnknownField(key.to_string()));
        }
        self.manual.insert(key.to_string(), value);
        Ok(())
    }

    // ---- step navigation ----

    /// Labels of manual fields that are required right now but empty.
    /// Conditional rules are evaluated against current values.
    pub fn missing_required(&self) -> Vec<String> {
        self.schema.missing_required(&self.manual)
    }

    /// User-triggered forward transition. Leaving the upload step happens
    /// only through a successful extraction; entry to the final step is
    /// gated on required manual fields, evaluated at this moment.
    pub fn advance(&mut self) -> Result<(), WizardError> {
        match self.step {
            Step::Upload => Err(WizardError::ExtractionPending),
            Step::Review => {
                self.step = Step::ManualEntry;
                Ok(())
            }
            Step::ManualEntry => {
                let missing = self.missing_required();
                if !missing.is_empty() {
                    return Err(WizardError::MissingRequired(missing.join(", ")));
                }
                self.step = Step::Generate;
                Ok(())
            }
            Step::Generate => Err(WizardError::AtFinalStep),
        }
    }

    /// User-triggered backward transition. Going back never clears staged
    /// files, extracted data, or manual entries.
    pub fn back(&mut self) -> Result<(), WizardError> {
        self.step = match self.step {
            Step::Upload => return Err(WizardError::AtFirstStep),
            Step::Review => Step::Upload,
            Step::ManualEntry => Step::Review,
            Step::Generate => Step::ManualEntry,
        };
        Ok(())
    }

    // ---- generation payload ----

    /// Flat merge of extracted and manual values for the generation
    /// request. Manual values win on key collision; the schemas are
    /// disjoint by construction so in practice there is none.
    pub fn generation_payload(&self) -> Result<serde_json::Map<String, serde_json::Value>, WizardError> {
        let extracted = self.extracted.as_ref().ok_or(WizardError::ExtractionPending)?;
        let mut payload = serde_json::Map::new();
        for (key, value) in extracted {
            payload.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        for (key, value) in &self.manual {
            payload.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        Ok(payload)
    }

    /// Deterministic download name derived from the primary identifying
    /// field, with a fixed fallback when it is empty.
    pub fn download_filename(&self) -> String {
        let vendor = self
            .schema
            .primary_key()
            .and_then(|key| self.extracted_value(key))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("Document");
        format!("Deal_Memo_{}.docx", vendor)
    }

    // ---- reset ----

    /// Collapse to the initial state from any step: step 0, nothing staged,
    /// extraction data gone, manual defaults re-derived (including the
    /// current date), error cleared. Outstanding request tokens go stale so
    /// late completions are discarded.
    pub fn reset(&mut self) {
        self.step = Step::Upload;
        self.staged.clear();
        self.extracted = None;
        self.confidence.clear();
        self.manual = self.schema.manual_defaults(&today_mmddyyyy());
        self.extracting = false;
        self.generating = false;
        self.error = None;
        self.extraction_epoch += 1;
        self.generation_epoch += 1;
    }
}
