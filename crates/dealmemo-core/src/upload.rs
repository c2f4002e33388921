//! Upload validation
//!
//! Pure classification of candidate files before they are staged: a fixed
//! MIME allow-list and a hard size cap. Rejection never mutates staged-file
//! state; that contract belongs to the caller and is upheld by
//! [`crate::wizard::WizardState::stage_document`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on accepted uploads.
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

const MAX_UPLOAD_MB: u64 = 20;

/// Accepted document MIME types: PDF and DOCX.
pub const ACCEPTED_MIME_TYPES: [&str; 2] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Semantic category of an uploaded file. The wire identifier doubles as
/// the multipart part name in the extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentRole {
    Sow,
    Contract,
}

impl DocumentRole {
    pub const ALL: [DocumentRole; 2] = [DocumentRole::Sow, DocumentRole::Contract];

    pub fn wire_id(self) -> &'static str {
        match self {
            DocumentRole::Sow => "sow",
            DocumentRole::Contract => "contract",
        }
    }

    /// Display title for the role's drop zone.
    pub fn title(self) -> &'static str {
        match self {
            DocumentRole::Sow => "Statement of Work (SOW)",
            DocumentRole::Contract => "Contract / Quote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sow" => Some(DocumentRole::Sow),
            "contract" => Some(DocumentRole::Contract),
            _ => None,
        }
    }
}

/// Why a candidate file was not accepted. `Display` names the file and the
/// specific reason; the message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("\"{filename}\" is not a supported file type. Please upload a PDF or .docx file.")]
    UnsupportedType { filename: String },
    #[error("\"{filename}\" exceeds the {limit_mb}MB size limit.")]
    TooLarge { filename: String, limit_mb: u64 },
}

/// Classify a candidate file by declared MIME type and byte size.
/// No side effects; the 20MB cap applies regardless of type.
pub fn validate_upload(filename: &str, mime: &str, size: u64) -> Result<(), UploadRejection> {
    if !ACCEPTED_MIME_TYPES.contains(&mime) {
        return Err(UploadRejection::UnsupportedType {
            filename: filename.to_string(),
        });
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge {
            filename: filename.to_string(),
            limit_mb: MAX_UPLOAD_MB,
        });
    }
    Ok(())
}

/// Format a byte count the way the upload UI displays staged files.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const DOCX_MIME: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

    #[test]
    fn test_accepts_pdf_and_docx_under_cap() {
        assert!(validate_upload("sow.pdf", "application/pdf", 2 * 1024 * 1024).is_ok());
        assert!(validate_upload("contract.docx", DOCX_MIME, MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_type_with_filename_in_message() {
        let err = validate_upload("notes.txt", "text/plain", 100).unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"notes.txt\" is not a supported file type. Please upload a PDF or .docx file."
        );
    }

    #[test]
    fn test_rejects_oversized_file_with_limit_in_message() {
        let err =
            validate_upload("big.pdf", "application/pdf", 25 * 1024 * 1024).unwrap_err();
        assert_eq!(err.to_string(), "\"big.pdf\" exceeds the 20MB size limit.");
    }

    #[test]
    fn test_size_cap_applies_regardless_of_type() {
        let err = validate_upload("big.docx", DOCX_MIME, MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(matches!(err, UploadRejection::TooLarge { .. }));
    }

    #[test]
    fn test_type_check_runs_before_size_check() {
        let err = validate_upload("huge.txt", "text/plain", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(matches!(err, UploadRejection::UnsupportedType { .. }));
    }

    #[test]
    fn test_role_wire_ids_round_trip() {
        for role in DocumentRole::ALL {
            assert_eq!(DocumentRole::parse(role.wire_id()), Some(role));
        }
        assert_eq!(DocumentRole::parse("other"), None);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(2621440), "2.5 MB");
    }

    proptest! {
        /// Property: any size over the cap is rejected, for every accepted type.
        #[test]
        fn oversized_always_rejected(extra in 1u64..=1024 * 1024, mime_idx in 0usize..2) {
            let result = validate_upload(
                "file.bin",
                ACCEPTED_MIME_TYPES[mime_idx],
                MAX_UPLOAD_BYTES + extra,
            );
            prop_assert!(
                matches!(result, Err(UploadRejection::TooLarge { .. })),
                "expected TooLarge, got {:?}",
                result
            );
        }

        /// Property: accepted types at or under the cap always pass.
        #[test]
        fn accepted_under_cap_always_passes(size in 0u64..=MAX_UPLOAD_BYTES, mime_idx in 0usize..2) {
            prop_assert!(validate_upload("file.bin", ACCEPTED_MIME_TYPES[mime_idx], size).is_ok());
        }
    }
}
