//! Deal-memo wizard engine
//!
//! Pure, host-testable core of the four-step deal-memo wizard: the field
//! schema configuration, upload validation, confidence banding, and the
//! wizard state machine. Browser bindings and the network clients live in
//! the `dealmemo-wasm` app crate.

pub mod confidence;
pub mod schema;
pub mod upload;
pub mod wizard;

pub use confidence::ConfidenceBand;
pub use schema::{FieldSchema, FieldSpec, RequiredIf, SchemaError};
pub use upload::{
    format_bytes, validate_upload, DocumentRole, UploadRejection, ACCEPTED_MIME_TYPES,
    MAX_UPLOAD_BYTES,
};
pub use wizard::{today_mmddyyyy, RequestToken, StagedDocument, Step, WizardError, WizardState};
