//! WASM bindings. `wasm-bindgen` cannot carry `ndarray` views across the
//! JS boundary, so the probability matrix is passed flattened (row-major
//! over `[T][B][C]`) together with its three dimensions.

use ndarray::ArrayView3;
use wasm_bindgen::prelude::*;

use crate::search::WordBeamSearchDecoder;

#[wasm_bindgen(js_name = WordBeamSearch)]
pub struct JsWordBeamSearch {
    inner: WordBeamSearchDecoder,
}

#[wasm_bindgen(js_class = WordBeamSearch)]
impl JsWordBeamSearch {
    #[wasm_bindgen(constructor)]
    pub fn new(
        beam_width: usize,
        mode: &str,
        smoothing: f64,
        corpus: &str,
        chars: &str,
        word_chars: &str,
    ) -> Result<JsWordBeamSearch, JsValue> {
        let inner = WordBeamSearchDecoder::new(beam_width, mode, smoothing, corpus, chars, word_chars)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(JsWordBeamSearch { inner })
    }

    /// `mat` is the `[T][B][C]` probability tensor flattened row-major.
    /// Returns one flattened `Uint32Array`-backed `Vec<u32>` per batch
    /// element, serialized as a JS array of arrays via `serde_json`.
    pub fn compute(&self, mat: &[f32], t: usize, b: usize, c: usize) -> Result<JsValue, JsValue> {
        let view = ArrayView3::from_shape((t, b, c), mat)
            .map_err(|e| JsValue::from_str(&format!("invalid matrix shape: {e}")))?;
        let result = self
            .inner
            .decode(view)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js_json(&result)
    }
}

/// Serialize via `serde_json` rather than pulling in `serde-wasm-bindgen`
/// as an extra dependency; the donor crate already carries `serde_json`
/// for its wasm build.
fn to_js_json(result: &[Vec<u32>]) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(result)
        .map_err(|e| JsValue::from_str(&format!("failed to serialize result: {e}")))?;
    Ok(JsValue::from_str(&json))
}
