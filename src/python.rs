//! Python bindings, mirroring the reference `word_beam_search` package's
//! surface: `WordBeamSearch(beam_width, mode, smoothing, corpus, chars,
//! word_chars)` with a `.compute(mat)` method returning one label list
//! per batch element.

use numpy::PyReadonlyArray3;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::search::WordBeamSearchDecoder;

#[pyclass(name = "WordBeamSearch")]
struct PyWordBeamSearch {
    inner: WordBeamSearchDecoder,
}

#[pymethods]
impl PyWordBeamSearch {
    #[new]
    fn new(
        beam_width: usize,
        mode: &str,
        smoothing: f64,
        corpus: &[u8],
        chars: &[u8],
        word_chars: &[u8],
    ) -> PyResult<Self> {
        let corpus = std::str::from_utf8(corpus)
            .map_err(|e| PyValueError::new_err(format!("corpus is not valid UTF-8: {e}")))?;
        let chars = std::str::from_utf8(chars)
            .map_err(|e| PyValueError::new_err(format!("chars is not valid UTF-8: {e}")))?;
        let word_chars = std::str::from_utf8(word_chars)
            .map_err(|e| PyValueError::new_err(format!("word_chars is not valid UTF-8: {e}")))?;

        let inner = WordBeamSearchDecoder::new(beam_width, mode, smoothing, corpus, chars, word_chars)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(PyWordBeamSearch { inner })
    }

    /// Decode a `[T][B][C]` float32 array; returns one list of label
    /// indices per batch element. Callers map labels back to characters
    /// themselves (`chars[label]`), as in the reference implementation.
    fn compute(&self, mat: PyReadonlyArray3<f32>) -> PyResult<Vec<Vec<u32>>> {
        self.inner
            .decode(mat.as_array())
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }
}

#[pymodule]
fn word_beam_search(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyWordBeamSearch>()?;
    Ok(())
}
