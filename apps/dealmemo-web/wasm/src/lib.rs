//! WASM bindings for the deal-memo wizard
//!
//! This crate provides a stateful, session-based API for the four-step
//! deal-memo flow. All state is held in Rust, minimizing JavaScript
//! complexity.
//!
//! ## Architecture
//!
//! - Wizard state, schema, and validation live in `dealmemo-core`
//! - Network calls to the extraction and generation collaborators happen
//!   here over `fetch`
//! - JavaScript only handles DOM events and file I/O
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { DealMemoSession } from './pkg/dealmemo_wasm.js';
//!
//! await init();
//!
//! const session = new DealMemoSession();
//! session.stageFile("sow", file.name, file.type, bytes);
//! await session.extract("");                  // -> review step
//! session.setExtractedField("vendor_name", "Acme Corp");
//! session.goNext();                           // -> manual entry
//! session.setManualField("deal_owner", "Jane Smith");
//! session.goNext();                           // -> generate (gated on required fields)
//! await session.generate("");                 // downloads Deal_Memo_Acme Corp.docx
//! ```

mod extract;
mod generate;
mod net;
pub mod session;

use wasm_bindgen::prelude::*;

pub use session::DealMemoSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Check a candidate file before staging it, without a session.
/// Returns Ok(()) if it would be accepted, Err with the user-facing
/// rejection message if not.
#[wasm_bindgen]
pub fn validate_candidate(filename: &str, mime: &str, size: f64) -> Result<(), JsValue> {
    dealmemo_core::validate_upload(filename, mime, size as u64)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: f64) -> String {
    dealmemo_core::format_bytes(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        let version = get_version();
        assert!(!version.is_empty());
    }
}
