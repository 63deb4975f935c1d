//! The decoder driver: orchestrates the per-timestep beam extension
//! (§4.3) across an entire `[T][B][C]` probability matrix (§4.4),
//! fanning batch elements out across a `rayon` thread pool (§5).

use std::convert::TryFrom;
use std::sync::Arc;

use ndarray::{ArrayView1, ArrayView2, ArrayView3};
use rayon::prelude::*;

use crate::alphabet::Alphabet;
use crate::beam::{Beam, BeamList, Labels, WordState};
use crate::error::{ConfigError, DecodeError};
use crate::lm::{ForecastCache, LanguageModel, Mode};
use crate::tree::NodeId;

/// A legal character extension from a given word-boundary state.
struct Transition {
    new_state: WordState,
    /// Set when this transition closes a dictionary word (a non-word-char
    /// following a terminal node); carries the word's vocabulary id.
    closes_word: Option<u32>,
}

/// Constructs the dictionary + language model once, then decodes any
/// number of probability matrices against it. Cheap to clone (it is
/// just an `Arc` handle) and safe to share across threads.
pub struct WordBeamSearchDecoder {
    alphabet: Alphabet,
    lm: Arc<LanguageModel>,
    beam_width: usize,
}

impl WordBeamSearchDecoder {
    /// Build a decoder. See §6 of the design document for the
    /// construction contract.
    pub fn new(
        beam_width: usize,
        mode: &str,
        smoothing: f64,
        corpus: &str,
        chars: &str,
        word_chars: &str,
    ) -> Result<Self, ConfigError> {
        if beam_width < 1 {
            return Err(ConfigError::BeamWidthTooSmall(beam_width));
        }
        let mode = Mode::try_from(mode)?;
        let alphabet = Alphabet::new(chars, word_chars)?;
        let lm = LanguageModel::new(corpus, &alphabet, mode, smoothing)?;

        log::debug!(
            "built word beam search decoder: beam_width={beam_width}, mode={mode:?}, smoothing={smoothing}, alphabet_size={}",
            alphabet.len()
        );

        Ok(WordBeamSearchDecoder {
            alphabet,
            lm: Arc::new(lm),
            beam_width,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Decode a `[T][B][C]` probability matrix; returns one label
    /// sequence per batch element, processed independently (§4.4, §8
    /// batch-independence law).
    pub fn decode(&self, mat: ArrayView3<f32>) -> Result<Vec<Vec<u32>>, DecodeError> {
        let (t, b, c) = mat.dim();
        if t == 0 {
            return Err(DecodeError::EmptyTimeDimension);
        }
        if b == 0 {
            return Err(DecodeError::EmptyBatchDimension);
        }
        let expected = self.alphabet.label_count();
        if c != expected {
            return Err(DecodeError::ShapeMismatch {
                expected,
                actual: c,
            });
        }

        let results: Vec<Vec<u32>> = (0..b)
            .into_par_iter()
            .map(|batch_idx| {
                let slice = mat.index_axis(ndarray::Axis(1), batch_idx);
                self.decode_one(slice)
            })
            .collect();
        Ok(results)
    }

    /// Decode a single `[T][C]` slice (one batch element).
    fn decode_one(&self, mat: ArrayView2<f32>) -> Vec<u32> {
        let mut cache = ForecastCache::new();
        let mut beams = BeamList::initial();

        for t in 0..mat.nrows() {
            beams = self.extend(&beams, mat.row(t), &mut cache).prune(self.beam_width);
            log::trace!("t={t}: {} active beams", beams.len());
        }

        if beams.is_empty() {
            log::debug!("all beams reached zero joint score; returning empty sequence");
            return Vec::new();
        }

        self.finalize(&beams)
    }

    /// Completion policy (§4.4.3): prefer a completed-word beam among the
    /// top-W if one exists, otherwise emit the best partial prefix as-is.
    fn finalize(&self, beams: &BeamList) -> Vec<u32> {
        for beam in beams.ranked() {
            if self.beam_is_word_complete(beam) {
                return beam.labels.to_vec();
            }
        }
        beams.best().map(|b| b.labels.to_vec()).unwrap_or_default()
    }

    fn beam_is_word_complete(&self, beam: &Beam) -> bool {
        match beam.state {
            WordState::InWord(node) => self.lm.tree().is_word(node),
            WordState::BeforeWord | WordState::AfterNonWordChar => true,
        }
    }

    fn extend(&self, input: &BeamList, dist: ArrayView1<f32>, cache: &mut ForecastCache) -> BeamList {
        let mut output = BeamList::new();
        let blank = self.alphabet.blank() as usize;
        let blank_prob = dist[blank] as f64;

        for beam in input.iter() {
            let total = beam.pb + beam.pnb;

            // Blank extension: never closes a word, labels unchanged.
            if total > 0.0 {
                output.add(
                    beam.labels.clone(),
                    total * blank_prob,
                    0.0,
                    beam.ptext,
                    beam.ptext_base,
                    beam.state,
                    beam.last_word,
                );
            }

            let last_label = beam.labels.last();

            // Repeat extension: same labels, only legal if the repeated
            // character is itself a legal transition from this state.
            if let Some(last) = last_label {
                if beam.pnb > 0.0 && self.legal_transition(beam.state, last).is_some() {
                    let p = dist[last as usize] as f64;
                    output.add(
                        beam.labels.clone(),
                        0.0,
                        beam.pnb * p,
                        beam.ptext,
                        beam.ptext_base,
                        beam.state,
                        beam.last_word,
                    );
                }
            }

            // Character extensions.
            for label in 0..self.alphabet.len() as u32 {
                let transition = match self.legal_transition(beam.state, label) {
                    Some(t) => t,
                    None => continue,
                };

                let is_repeat = last_label == Some(label);
                let extend_prob = if is_repeat { beam.pb } else { total };
                if extend_prob == 0.0 {
                    continue;
                }
                let p = dist[label as usize] as f64;
                let pnb = extend_prob * p;
                if pnb == 0.0 {
                    continue;
                }

                let (ptext, ptext_base, last_word) =
                    self.score_transition(beam.ptext_base, beam.last_word, &transition, cache);

                output.add(
                    beam.labels.push(label),
                    0.0,
                    pnb,
                    ptext,
                    ptext_base,
                    transition.new_state,
                    last_word,
                );
            }
        }

        output
    }

    /// Determine whether `label` is a legal extension from `state`, and
    /// what it does to word-boundary state (§4.3).
    fn legal_transition(&self, state: WordState, label: u32) -> Option<Transition> {
        let ch = self.alphabet.char_at(label);
        let tree = self.lm.tree();

        match state {
            WordState::BeforeWord | WordState::AfterNonWordChar => {
                if !self.alphabet.is_word_char(ch) {
                    Some(Transition {
                        new_state: WordState::AfterNonWordChar,
                        closes_word: None,
                    })
                } else {
                    tree.child(NodeId(0), ch).map(|child| Transition {
                        new_state: WordState::InWord(child),
                        closes_word: None,
                    })
                }
            }
            WordState::InWord(node) => {
                if let Some(child) = tree.child(node, ch) {
                    Some(Transition {
                        new_state: WordState::InWord(child),
                        closes_word: None,
                    })
                } else if !self.alphabet.is_word_char(ch) && tree.is_word(node) {
                    Some(Transition {
                        new_state: WordState::AfterNonWordChar,
                        closes_word: tree.word_id(node),
                    })
                } else {
                    None
                }
            }
        }
    }

    /// Apply the active scoring mode to a transition, returning the new
    /// `(ptext, ptext_base, last_word)` (§4.2).
    fn score_transition(
        &self,
        ptext_base: f64,
        last_word: Option<u32>,
        transition: &Transition,
        cache: &mut ForecastCache,
    ) -> (f64, f64, Option<u32>) {
        let mode = self.lm.mode();

        let (new_base, new_last_word) = match transition.closes_word {
            Some(word) if mode.uses_language_model() => {
                (ptext_base * self.lm.transition_prob(last_word, word), Some(word))
            }
            Some(word) => (ptext_base, Some(word)),
            None => (ptext_base, last_word),
        };

        let ptext = match transition.new_state {
            WordState::InWord(node) if mode.uses_forecast() => {
                new_base * self.lm.forecast(node, new_last_word, cache)
            }
            _ => new_base,
        };

        (ptext, new_base, new_last_word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn decode_mini(mode: &str, k: f64) -> Vec<u32> {
        let decoder =
            WordBeamSearchDecoder::new(25, mode, k, "a ba", "ab ", "ab").expect("valid config");
        let mat = array![
            [[0.9, 0.1, 0.0, 0.0]],
            [[0.0, 0.0, 0.0, 1.0]],
            [[0.6, 0.4, 0.0, 0.0]]
        ];
        let result = decoder.decode(mat.view()).expect("valid shape");
        result[0].clone()
    }

    #[test]
    fn scenario_mini_example_decodes_ba() {
        // §8 scenario 1: expects label sequence [1, 0] i.e. "ba".
        assert_eq!(decode_mini("Words", 0.0), vec![1, 0]);
    }

    #[test]
    fn scenario_prefix_preferring_extends_without_separator() {
        // §8 scenario 2: corpus "a ab", chars a/b/space; timesteps emit
        // a, blank, b at probability 1. Expect "ab" (partial "a" extends
        // straight into the dictionary word "ab").
        let decoder =
            WordBeamSearchDecoder::new(25, "Words", 0.0, "a ab", "ab ", "ab").expect("valid config");
        let mat = array![
            [[1.0, 0.0, 0.0, 0.0]],
            [[0.0, 0.0, 0.0, 1.0]],
            [[0.0, 1.0, 0.0, 0.0]]
        ];
        let result = decoder.decode(mat.view()).unwrap();
        assert_eq!(result[0], vec![0, 1]);
    }

    #[test]
    fn scenario_separator_required_without_space_mass() {
        // §8 scenario 3: corpus "a b" has two one-letter words and no "ab"
        // path through the dictionary. Emitting "a" then "b" with no
        // intervening separator mass must not decode to "ab": from the
        // completed word "a", extending with "b" is not a legal
        // transition (it isn't a child of node_a, and "b" is a word
        // char so it can't close the word either), so every beam that
        // tries it carries zero probability. Only the beam that stayed
        // on the completed word "a" survives, and the lenient completion
        // policy accepts it as-is.
        let decoder =
            WordBeamSearchDecoder::new(25, "Words", 0.0, "a b", "ab ", "ab").expect("valid config");
        let mat = array![[[1.0, 0.0, 0.0, 0.0]], [[0.0, 1.0, 0.0, 0.0]]];
        let result = decoder.decode(mat.view()).unwrap();
        assert_eq!(result[0], vec![0]);
    }

    #[test]
    fn scenario_t_equals_one_extends_the_initial_beam_once() {
        let decoder =
            WordBeamSearchDecoder::new(25, "Words", 0.0, "a ba", "ab ", "ab").expect("valid config");
        let mat = array![[[0.9, 0.1, 0.0, 0.0]]];
        let result = decoder.decode(mat.view()).unwrap();
        assert!(result[0].len() <= 1);
    }

    #[test]
    fn scenario_all_blank_distribution_decodes_to_empty() {
        let decoder =
            WordBeamSearchDecoder::new(25, "Words", 0.0, "a ba", "ab ", "ab").expect("valid config");
        let mat = array![
            [[0.0, 0.0, 0.0, 1.0]],
            [[0.0, 0.0, 0.0, 1.0]],
            [[0.0, 0.0, 0.0, 1.0]]
        ];
        let result = decoder.decode(mat.view()).unwrap();
        assert!(result[0].is_empty());
    }

    #[test]
    fn scenario_single_character_word_corpus() {
        let decoder = WordBeamSearchDecoder::new(25, "Words", 0.0, "a", "a ", "a").expect("valid config");
        let mat = array![[[1.0, 0.0, 0.0]], [[0.0, 0.0, 1.0]]];
        let result = decoder.decode(mat.view()).unwrap();
        assert_eq!(result[0], vec![0]);
    }

    #[test]
    fn scenario_prefix_word_and_longer_word_coexist() {
        // "a" and "ab" both in vocabulary: is_word(node) and further
        // extension must coexist at the node for "a".
        let decoder =
            WordBeamSearchDecoder::new(25, "Words", 0.0, "a ab", "ab ", "ab").expect("valid config");
        // Emitting only 'a' must be dictionary-valid on its own...
        let mat = array![[[1.0, 0.0, 0.0, 0.0]]];
        let result = decoder.decode(mat.view()).unwrap();
        assert_eq!(result[0], vec![0]);

        // ...and a space right after it must close the word "a" rather
        // than silently being rejected, appending the space's own label.
        let mat = array![[[1.0, 0.0, 0.0, 0.0]], [[0.0, 0.0, 1.0, 0.0]]];
        let result = decoder.decode(mat.view()).unwrap();
        assert_eq!(result[0], vec![0, 2]);
    }

    #[test]
    fn scenario_bigram_rescoring_prefers_corpus_observed_pair() {
        // §8 scenario 4: two competing decodes "the cat" / "the dog" with
        // equal acoustic probability; the beam whose bigram is more
        // frequent in the corpus must win deterministically.
        let alphabet = Alphabet::new("thecadog ", "thecadog").unwrap();
        let lm = LanguageModel::new("the cat the cat the dog", &alphabet, Mode::NGrams, 0.0).unwrap();
        let word_id = |w: &str| (0..10u32).find(|&i| lm.word(i) == w).unwrap();
        let the = word_id("the");
        let cat = word_id("cat");
        let dog = word_id("dog");
        assert!(lm.bigram_prob(the, cat) > lm.bigram_prob(the, dog));
    }

    #[test]
    fn decode_rejects_shape_mismatch() {
        let decoder =
            WordBeamSearchDecoder::new(25, "Words", 0.0, "a ba", "ab ", "ab").expect("valid config");
        let mat = array![[[0.5, 0.5]]];
        let err = decoder.decode(mat.view()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::ShapeMismatch {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn batch_elements_decode_independently() {
        let decoder =
            WordBeamSearchDecoder::new(25, "Words", 0.0, "a ba", "ab ", "ab").expect("valid config");
        let mat = array![
            [[0.9, 0.1, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]],
            [[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]],
            [[0.6, 0.4, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]]
        ];
        let batched = decoder.decode(mat.view()).unwrap();

        let singleton = array![
            [[0.9, 0.1, 0.0, 0.0]],
            [[0.0, 0.0, 0.0, 1.0]],
            [[0.6, 0.4, 0.0, 0.0]]
        ];
        let solo = decoder.decode(singleton.view()).unwrap();

        assert_eq!(batched[0], solo[0]);
    }
}
