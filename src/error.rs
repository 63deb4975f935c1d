//! Error kinds surfaced at the two boundaries a decoder has: construction
//! and invocation. See §7 of the design document.

use thiserror::Error;

/// Construction-time failures. The decoder is never partially built: any
/// of these means `WordBeamSearchDecoder::new` returns before touching
/// the corpus or allocating the beam search state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("beam width must be at least 1, got {0}")]
    BeamWidthTooSmall(usize),

    #[error("'{0}' is not a recognized mode (expected Words, NGrams, NGramsForecast, or NGramsForecastAndSample)")]
    UnknownMode(String),

    #[error("smoothing constant must be non-negative, got {0}")]
    NegativeSmoothing(f64),

    #[error("word_chars contains '{0}' which is not present in chars")]
    WordCharsNotSubset(char),

    #[error("corpus tokenized to zero words, which is invalid under a language-model mode")]
    EmptyVocabulary,
}

/// Invocation-time failures: the probability matrix's shape does not
/// match the alphabet this decoder was built with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("probability matrix has {actual} labels per timestep, expected {expected} (chars.len() + 1)")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("probability matrix must have at least one timestep")]
    EmptyTimeDimension,

    #[error("probability matrix must have at least one batch element")]
    EmptyBatchDimension,
}
