//! Stateful deal-memo wizard session
//!
//! Holds the whole wizard state in Rust behind a single session object so
//! JavaScript only handles DOM events and file I/O. Async network calls
//! take `&self`; the state sits in a `RefCell` and borrows are never held
//! across an await, so the UI can keep reading state (and reset the
//! session) while a request is outstanding. Responses re-enter through
//! token-checked core calls, which is what discards anything that lands
//! after a reset.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use dealmemo_core::{
    format_bytes, ConfidenceBand, DocumentRole, FieldSchema, WizardState,
};

use crate::extract::{self, FilePart};
use crate::generate;

fn to_js_err<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_role(role: &str) -> Result<DocumentRole, JsValue> {
    DocumentRole::parse(role)
        .ok_or_else(|| JsValue::from_str(&format!("unknown document role: {}", role)))
}

/// Staged file entry for display.
#[derive(Serialize)]
struct StagedFileView {
    role: &'static str,
    title: &'static str,
    filename: String,
    size_bytes: usize,
    size_display: String,
}

/// One review-step row: an extracted field with its confidence badge.
#[derive(Serialize)]
struct ReviewRow {
    key: String,
    label: String,
    value: String,
    multiline: bool,
    confidence: Option<f64>,
    confidence_band: Option<&'static str>,
}

/// One manual-entry row. `required` reflects the conditional rules against
/// current values, so the UI can mark the detail field live.
#[derive(Serialize)]
struct ManualRow {
    key: String,
    label: String,
    value: String,
    required: bool,
    multiline: bool,
    options: Option<Vec<String>>,
    placeholder: Option<String>,
}

/// Wizard session exposed to JavaScript.
#[wasm_bindgen]
pub struct DealMemoSession {
    state: Rc<RefCell<WizardState>>,
}

impl Default for DealMemoSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl DealMemoSession {
    /// Create a session on the default (contractor) schema variant.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(WizardState::new(FieldSchema::contractor()))),
        }
    }

    /// Create a session on a named built-in schema variant.
    #[wasm_bindgen(js_name = withSchemaVariant)]
    pub fn with_schema_variant(name: &str) -> Result<DealMemoSession, JsValue> {
        let schema = FieldSchema::by_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("unknown schema variant: {}", name)))?;
        Ok(Self {
            state: Rc::new(RefCell::new(WizardState::new(schema))),
        })
    }

    /// Create a session from a JSON schema artifact.
    #[wasm_bindgen(js_name = fromSchemaJson)]
    pub fn from_schema_json(json: &str) -> Result<DealMemoSession, JsValue> {
        let schema = FieldSchema::from_json(json).map_err(to_js_err)?;
        Ok(Self {
            state: Rc::new(RefCell::new(WizardState::new(schema))),
        })
    }

    #[wasm_bindgen(js_name = schemaVersion)]
    pub fn schema_version(&self) -> String {
        self.state.borrow().schema().version.clone()
    }

    /// Current step index, 0 through 3.
    #[wasm_bindgen(js_name = currentStep)]
    pub fn current_step(&self) -> u8 {
        self.state.borrow().step().index()
    }

    #[wasm_bindgen(js_name = isExtracting)]
    pub fn is_extracting(&self) -> bool {
        self.state.borrow().is_extracting()
    }

    #[wasm_bindgen(js_name = isGenerating)]
    pub fn is_generating(&self) -> bool {
        self.state.borrow().is_generating()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error().map(String::from)
    }

    #[wasm_bindgen(js_name = dismissError)]
    pub fn dismiss_error(&self) {
        self.state.borrow_mut().dismiss_error();
    }

    /// Collapse to the initial state from any step. Outstanding requests
    /// keep running but their results are discarded on arrival.
    pub fn reset(&self) {
        self.state.borrow_mut().reset();
    }

    // ---- upload step ----

    /// Validate and stage a candidate file for a role. Rejection surfaces
    /// the validator message and leaves staged files untouched.
    #[wasm_bindgen(js_name = stageFile)]
    pub fn stage_file(
        &self,
        role: &str,
        filename: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<(), JsValue> {
        let role = parse_role(role)?;
        self.state
            .borrow_mut()
            .stage_document(role, filename, mime, bytes.to_vec())
            .map_err(to_js_err)
    }

    #[wasm_bindgen(js_name = removeFile)]
    pub fn remove_file(&self, role: &str) -> Result<(), JsValue> {
        let role = parse_role(role)?;
        self.state.borrow_mut().remove_document(role);
        Ok(())
    }

    /// Staged files as `[{ role, title, filename, size_bytes, size_display }]`.
    #[wasm_bindgen(js_name = stagedFiles)]
    pub fn staged_files(&self) -> Result<JsValue, JsValue> {
        let state = self.state.borrow();
        let views: Vec<StagedFileView> = state
            .staged_documents()
            .iter()
            .map(|doc| StagedFileView {
                role: doc.role.wire_id(),
                title: doc.role.title(),
                filename: doc.filename.clone(),
                size_bytes: doc.bytes.len(),
                size_display: format_bytes(doc.bytes.len() as u64),
            })
            .collect();
        serde_wasm_bindgen::to_value(&views).map_err(to_js_err)
    }

    // ---- navigation ----

    #[wasm_bindgen(js_name = goNext)]
    pub fn go_next(&self) -> Result<(), JsValue> {
        self.state.borrow_mut().advance().map_err(to_js_err)
    }

    #[wasm_bindgen(js_name = goBack)]
    pub fn go_back(&self) -> Result<(), JsValue> {
        self.state.borrow_mut().back().map_err(to_js_err)
    }

    // ---- review step ----

    /// Review rows in schema order: `[{ key, label, value, multiline,
    /// confidence, confidence_band }]`. Fields without a score carry no
    /// band.
    #[wasm_bindgen(js_name = reviewRows)]
    pub fn review_rows(&self) -> Result<JsValue, JsValue> {
        let state = self.state.borrow();
        if !state.has_extracted() {
            return Err(JsValue::from_str("extracted data is not available yet"));
        }
        let rows: Vec<ReviewRow> = state
            .schema()
            .extracted
            .iter()
            .map(|spec| {
                let confidence = state.confidence_score(&spec.key);
                ReviewRow {
                    key: spec.key.clone(),
                    label: spec.label.clone(),
                    value: state.extracted_value(&spec.key).unwrap_or("").to_string(),
                    multiline: spec.multiline,
                    confidence,
                    confidence_band: confidence
                        .map(|score| ConfidenceBand::from_score(score).label()),
                }
            })
            .collect();
        serde_wasm_bindgen::to_value(&rows).map_err(to_js_err)
    }

    #[wasm_bindgen(js_name = setExtractedField)]
    pub fn set_extracted_field(&self, key: &str, value: &str) -> Result<(), JsValue> {
        self.state
            .borrow_mut()
            .set_extracted_field(key, value.to_string())
            .map_err(to_js_err)
    }

    // ---- manual entry step ----

    /// Manual-entry rows in schema order: `[{ key, label, value, required,
    /// multiline, options, placeholder }]`.
    #[wasm_bindgen(js_name = manualRows)]
    pub fn manual_rows(&self) -> Result<JsValue, JsValue> {
        let state = self.state.borrow();
        let values = state.manual_values();
        let rows: Vec<ManualRow> = state
            .schema()
            .manual
            .iter()
            .map(|spec| {
                let conditionally_required = spec.required_if.as_ref().is_some_and(|rule| {
                    values.get(&rule.field).map(String::as_str) == Some(rule.equals.as_str())
                });
                ManualRow {
                    key: spec.key.clone(),
                    label: spec.label.clone(),
                    value: values.get(&spec.key).cloned().unwrap_or_default(),
                    required: spec.required || conditionally_required,
                    multiline: spec.multiline,
                    options: spec.options.clone(),
                    placeholder: spec.placeholder.clone(),
                }
            })
            .collect();
        serde_wasm_bindgen::to_value(&rows).map_err(to_js_err)
    }

    #[wasm_bindgen(js_name = setManualField)]
    pub fn set_manual_field(&self, key: &str, value: &str) -> Result<(), JsValue> {
        self.state
            .borrow_mut()
            .set_manual_field(key, value.to_string())
            .map_err(to_js_err)
    }

    /// Labels of required-but-empty manual fields, evaluated right now.
    #[wasm_bindgen(js_name = missingRequiredFields)]
    pub fn missing_required_fields(&self) -> Result<JsValue, JsValue> {
        let missing = self.state.borrow().missing_required();
        serde_wasm_bindgen::to_value(&missing).map_err(to_js_err)
    }

    #[wasm_bindgen(js_name = downloadFilename)]
    pub fn download_filename(&self) -> String {
        self.state.borrow().download_filename()
    }

    // ---- collaborator calls ----

    /// Submit the staged documents for extraction. One request in flight at
    /// a time; on success the session moves to the review step, on failure
    /// the message is attached and the step (and staged files) stay put.
    pub async fn extract(&self, api_base: &str) -> Result<(), JsValue> {
        let (token, parts) = {
            let mut state = self.state.borrow_mut();
            let token = state.begin_extraction().map_err(to_js_err)?;
            let parts: Vec<FilePart> = state
                .staged_documents()
                .iter()
                .map(|doc| FilePart {
                    name: doc.role.wire_id().to_string(),
                    filename: doc.filename.clone(),
                    mime: doc.mime.clone(),
                    bytes: doc.bytes.clone(),
                })
                .collect();
            (token, parts)
        };

        match extract::request_extraction(api_base, &parts).await {
            Ok(reply) => {
                let applied = self
                    .state
                    .borrow_mut()
                    .apply_extraction(token, reply.fields, reply.confidence);
                if !applied {
                    web_sys::console::warn_1(&"discarding stale extraction response".into());
                }
                Ok(())
            }
            Err(message) => {
                let applied = self
                    .state
                    .borrow_mut()
                    .fail_extraction(token, message.clone());
                if applied {
                    Err(JsValue::from_str(&message))
                } else {
                    web_sys::console::warn_1(&"discarding stale extraction failure".into());
                    Ok(())
                }
            }
        }
    }

    /// Request document generation from the merged field set and trigger
    /// the download on success. The download fires at most once per call
    /// and never after a reset.
    pub async fn generate(&self, api_base: &str) -> Result<(), JsValue> {
        let (token, payload, filename) = {
            let mut state = self.state.borrow_mut();
            let payload = state.generation_payload().map_err(to_js_err)?;
            let token = state.begin_generation().map_err(to_js_err)?;
            let filename = state.download_filename();
            (token, payload, filename)
        };

        match generate::request_generation(api_base, &payload).await {
            Ok(bytes) => {
                if !self.state.borrow_mut().finish_generation(token) {
                    web_sys::console::warn_1(&"discarding stale generation result".into());
                    return Ok(());
                }
                if let Err(message) = generate::trigger_download(&bytes, &filename) {
                    self.state.borrow_mut().set_error(message.clone());
                    return Err(JsValue::from_str(&message));
                }
                web_sys::console::log_1(&format!("download triggered: {}", filename).into());
                Ok(())
            }
            Err(message) => {
                let applied = self
                    .state
                    .borrow_mut()
                    .fail_generation(token, message.clone());
                if applied {
                    Err(JsValue::from_str(&message))
                } else {
                    web_sys::console::warn_1(&"discarding stale generation failure".into());
                    Ok(())
                }
            }
        }
    }
}
