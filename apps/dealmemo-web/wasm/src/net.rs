//! Shared fetch plumbing for the collaborator clients.

use js_sys::{Array, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, Request, RequestInit, RequestMode, Response};

/// Generic failure line when the collaborator gave no structured message.
pub(crate) fn fallback_failure(operation: &str, status: u16) -> String {
    format!("{} failed ({})", operation, status)
}

/// Best-effort human message out of a thrown JsValue.
pub(crate) fn js_error_message(err: &JsValue, fallback: &str) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        let message = String::from(error.message());
        if !message.is_empty() {
            return message;
        }
    }
    fallback.to_string()
}

/// Resolve the error text for a non-2xx response: prefer a server-supplied
/// `{ "error": … }` body, else a generic message embedding the status.
pub(crate) async fn failure_message(response: &Response, operation: &str) -> String {
    if let Ok(promise) = response.json() {
        if let Ok(body) = JsFuture::from(promise).await {
            let server_message = js_sys::Reflect::get(&body, &JsValue::from_str("error"))
                .ok()
                .and_then(|v| v.as_string());
            if let Some(message) = server_message {
                if !message.is_empty() {
                    return message;
                }
            }
        }
    }
    fallback_failure(operation, response.status())
}

/// Wrap raw bytes in a typed Blob.
pub(crate) fn bytes_to_blob(bytes: &[u8], mime: &str) -> Result<Blob, String> {
    let array = Uint8Array::new_with_length(bytes.len() as u32);
    array.copy_from(bytes);

    let parts = Array::new();
    parts.push(array.as_ref());

    let options = BlobPropertyBag::new();
    options.set_type(mime);

    Blob::new_with_u8_array_sequence_and_options(parts.as_ref(), &options)
        .map_err(|e| js_error_message(&e, "failed to build upload blob"))
}

/// POST to `{api_base}{path}` and hand back the raw Response. `operation`
/// is the noun used in failure messages ("Extraction", "Generation").
pub(crate) async fn post(
    api_base: &str,
    path: &str,
    body: &JsValue,
    content_type: Option<&str>,
    operation: &str,
) -> Result<Response, String> {
    let generic = format!("{} failed", operation);

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_body(body);

    let url = format!("{}{}", api_base, path);
    let request = Request::new_with_str_and_init(&url, &opts)
        .map_err(|e| js_error_message(&e, &generic))?;
    if let Some(mime) = content_type {
        request
            .headers()
            .set("Content-Type", mime)
            .map_err(|e| js_error_message(&e, &generic))?;
    }

    let window = web_sys::window().ok_or_else(|| "no window available".to_string())?;
    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| js_error_message(&e, &generic))?;
    response.dyn_into::<Response>().map_err(|_| generic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_failure_embeds_status() {
        assert_eq!(fallback_failure("Extraction", 502), "Extraction failed (502)");
        assert_eq!(fallback_failure("Generation", 404), "Generation failed (404)");
    }
}
