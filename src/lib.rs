//! Dictionary- and language-model-constrained CTC beam search decoding.
//!
//! This crate decodes the output of a CTC sequence classifier into text,
//! constrained so that every emitted word belongs to a dictionary
//! learned from a text corpus. Given a per-timestep character
//! probability matrix, it runs a beam search whose per-timestep
//! extension step is gated by a prefix tree built from the corpus and
//! optionally rescored by an n-gram language model over that same
//! corpus.
//!
//! Training, model inference, softmax normalization, and streaming/
//! online decoding are out of scope: the caller hands this crate a
//! fully-materialized, already-normalized probability tensor.
//!
//! ```
//! use word_beam_search::WordBeamSearchDecoder;
//! use ndarray::array;
//!
//! let decoder = WordBeamSearchDecoder::new(25, "Words", 0.0, "a ba", "ab ", "ab").unwrap();
//! let mat = array![
//!     [[0.9, 0.1, 0.0, 0.0]],
//!     [[0.0, 0.0, 0.0, 1.0]],
//!     [[0.6, 0.4, 0.0, 0.0]],
//! ];
//! let labels = decoder.decode(mat.view()).unwrap();
//! assert_eq!(decoder.alphabet().labels_to_string(&labels[0]), "ba");
//! ```

pub mod alphabet;
pub mod beam;
pub mod config;
pub mod error;
pub mod lm;
pub mod search;
pub mod tree;

#[cfg(feature = "python")]
mod python;

#[cfg(feature = "wasm")]
mod wasm;

pub mod prelude {
    pub use crate::alphabet::Alphabet;
    pub use crate::config::WordBeamSearchConfig;
    pub use crate::error::{ConfigError, DecodeError};
    pub use crate::lm::Mode;
    pub use crate::search::WordBeamSearchDecoder;
}

pub use alphabet::Alphabet;
pub use config::WordBeamSearchConfig;
pub use error::{ConfigError, DecodeError};
pub use lm::Mode;
pub use search::WordBeamSearchDecoder;
