//! Generation client
//!
//! Posts the flat-merged field set to the generation collaborator and, on
//! success, offers the returned binary document as a local download. The
//! download is a one-shot observable effect per successful call; the
//! session layer drops the result instead when its request token has gone
//! stale.

use js_sys::Uint8Array;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlAnchorElement, Url};

use crate::net;

const OPERATION: &str = "Generation";

pub(crate) const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub(crate) async fn request_generation(
    api_base: &str,
    payload: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<u8>, String> {
    let body = serde_json::to_string(payload)
        .map_err(|e| format!("Generation failed: {}", e))?;

    let response = net::post(
        api_base,
        "/api/generate",
        &JsValue::from_str(&body),
        Some("application/json"),
        OPERATION,
    )
    .await?;
    if !response.ok() {
        return Err(net::failure_message(&response, OPERATION).await);
    }

    let buffer = match response.array_buffer() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(e) => Err(e),
    }
    .map_err(|_| "Generation failed: could not read document body".to_string())?;

    Ok(Uint8Array::new(&buffer).to_vec())
}

/// Trigger the browser's save affordance for the generated document:
/// object URL + synthetic anchor click, then revoke.
pub(crate) fn trigger_download(bytes: &[u8], filename: &str) -> Result<(), String> {
    let blob = net::bytes_to_blob(bytes, DOCX_MIME)?;
    let url = Url::create_object_url_with_blob(&blob)
        .map_err(|e| net::js_error_message(&e, "could not create download link"))?;

    let window = web_sys::window().ok_or_else(|| "no window available".to_string())?;
    let document = window
        .document()
        .ok_or_else(|| "no document available".to_string())?;
    let body = document
        .body()
        .ok_or_else(|| "no document body available".to_string())?;

    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(|e| net::js_error_message(&e, "could not create download link"))?
        .dyn_into()
        .map_err(|_| "could not create download link".to_string())?;
    anchor.set_href(&url);
    anchor.set_download(filename);

    body.append_child(&anchor)
        .map_err(|e| net::js_error_message(&e, "could not attach download link"))?;
    anchor.click();
    let _ = body.remove_child(&anchor);
    let _ = Url::revoke_object_url(&url);
    Ok(())
}
