//! Caller-facing configuration bundle, so decoders built from a config
//! file (e.g. the CLI demo) have one place to deserialize from.

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lm::Mode;
use crate::search::WordBeamSearchDecoder;

/// Everything needed to construct a [`WordBeamSearchDecoder`] except the
/// corpus/alphabet text, which is usually loaded separately (it can be
/// large and is rarely hand-edited alongside the numeric knobs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordBeamSearchConfig {
    pub beam_width: usize,
    pub mode: String,
    pub smoothing: f64,
}

impl Default for WordBeamSearchConfig {
    fn default() -> Self {
        WordBeamSearchConfig {
            beam_width: 25,
            mode: "Words".to_string(),
            smoothing: 0.0,
        }
    }
}

impl WordBeamSearchConfig {
    /// Build a decoder from this config plus the corpus/alphabet text.
    pub fn build(
        &self,
        corpus: &str,
        chars: &str,
        word_chars: &str,
    ) -> Result<WordBeamSearchDecoder, ConfigError> {
        WordBeamSearchDecoder::new(
            self.beam_width,
            &self.mode,
            self.smoothing,
            corpus,
            chars,
            word_chars,
        )
    }

    pub fn mode(&self) -> Result<Mode, ConfigError> {
        Mode::try_from(self.mode.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_decoder() {
        let cfg = WordBeamSearchConfig::default();
        let decoder = cfg.build("a ba", "ab ", "ab").unwrap();
        assert_eq!(decoder.alphabet().len(), 3);
    }

    #[test]
    fn config_rejects_unknown_mode() {
        let cfg = WordBeamSearchConfig {
            mode: "Bogus".to_string(),
            ..Default::default()
        };
        assert!(cfg.mode().is_err());
    }
}
