//! Extraction client
//!
//! Submits the staged documents to the AI extraction collaborator as one
//! multipart request, each file under its role identifier, and maps the
//! response into the schema-shaped field/confidence maps the state machine
//! expects. Failures become user-facing messages: a server-supplied
//! `error` string verbatim when present, otherwise a generic line with the
//! HTTP status.

use std::collections::BTreeMap;

use web_sys::FormData;

use crate::net;

const OPERATION: &str = "Extraction";

/// One multipart part: a staged file under its role's wire id.
pub(crate) struct FilePart {
    pub name: String,
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Parsed `{ fields, confidence? }` body. Values are kept as-is; the state
/// machine materializes the full schema shape on apply.
pub(crate) struct ExtractionReply {
    pub fields: BTreeMap<String, String>,
    pub confidence: BTreeMap<String, f64>,
}

pub(crate) async fn request_extraction(
    api_base: &str,
    parts: &[FilePart],
) -> Result<ExtractionReply, String> {
    let form = FormData::new().map_err(|e| net::js_error_message(&e, "Extraction failed"))?;
    for part in parts {
        let blob = net::bytes_to_blob(&part.bytes, &part.mime)?;
        form.append_with_blob_and_filename(&part.name, &blob, &part.filename)
            .map_err(|e| net::js_error_message(&e, "Extraction failed"))?;
    }

    let response = net::post(api_base, "/api/extract", form.as_ref(), None, OPERATION).await?;
    if !response.ok() {
        return Err(net::failure_message(&response, OPERATION).await);
    }

    let body = match response.json() {
        Ok(promise) => wasm_bindgen_futures::JsFuture::from(promise).await,
        Err(e) => Err(e),
    }
    .map_err(|_| "Extraction failed: malformed response body".to_string())?;

    let value: serde_json::Value =
        serde_wasm_bindgen::from_value(body).unwrap_or(serde_json::Value::Null);
    Ok(parse_reply(&value))
}

/// Defensive mapping of the response body: only string field values and
/// numeric confidence scores are taken; anything else is ignored so a
/// partially malformed body still makes forward progress.
pub(crate) fn parse_reply(value: &serde_json::Value) -> ExtractionReply {
    let mut fields = BTreeMap::new();
    if let Some(object) = value.get("fields").and_then(|v| v.as_object()) {
        for (key, v) in object {
            if let Some(text) = v.as_str() {
                fields.insert(key.clone(), text.to_string());
            }
        }
    }

    let mut confidence = BTreeMap::new();
    if let Some(object) = value.get("confidence").and_then(|v| v.as_object()) {
        for (key, v) in object {
            if let Some(score) = v.as_f64() {
                confidence.insert(key.clone(), score);
            }
        }
    }

    ExtractionReply { fields, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_reads_fields_and_confidence() {
        let body = serde_json::json!({
            "fields": { "vendor_name": "Acme", "total_cost": "$10" },
            "confidence": { "vendor_name": 0.92 }
        });
        let reply = parse_reply(&body);
        assert_eq!(reply.fields["vendor_name"], "Acme");
        assert_eq!(reply.fields["total_cost"], "$10");
        assert_eq!(reply.confidence["vendor_name"], 0.92);
        assert!(!reply.confidence.contains_key("total_cost"));
    }

    #[test]
    fn test_parse_reply_tolerates_missing_confidence() {
        let body = serde_json::json!({ "fields": { "vendor_name": "Acme" } });
        let reply = parse_reply(&body);
        assert_eq!(reply.fields["vendor_name"], "Acme");
        assert!(reply.confidence.is_empty());
    }

    #[test]
    fn test_parse_reply_ignores_non_string_values() {
        let body = serde_json::json!({
            "fields": { "vendor_name": 42, "total_cost": "$10" },
            "confidence": { "total_cost": "high" }
        });
        let reply = parse_reply(&body);
        assert!(!reply.fields.contains_key("vendor_name"));
        assert_eq!(reply.fields["total_cost"], "$10");
        assert!(reply.confidence.is_empty());
    }

    #[test]
    fn test_parse_reply_survives_malformed_body() {
        let reply = parse_reply(&serde_json::Value::Null);
        assert!(reply.fields.is_empty());
        assert!(reply.confidence.is_empty());

        let reply = parse_reply(&serde_json::json!({ "fields": [1, 2] }));
        assert!(reply.fields.is_empty());
    }
}
