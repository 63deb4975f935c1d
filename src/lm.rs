//! Tokenizes a corpus, builds the dictionary prefix tree, and scores
//! word transitions under add-k smoothed unigram/bigram counts.

use std::collections::HashMap;
use std::convert::TryFrom;

use crate::alphabet::Alphabet;
use crate::error::ConfigError;
use crate::tree::{NodeId, PrefixTree};

/// How a completed (or partial) word updates a beam's `ptext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dictionary constraint only; `ptext` never changes.
    Words,
    /// Multiply by the bigram probability when a word completes.
    NGrams,
    /// `NGrams`, plus a forecast over in-progress word completions.
    NGramsForecast,
    /// `NGramsForecast`, but the forecast sum is capped for long prefixes.
    NGramsForecastAndSample,
}

impl Mode {
    pub fn uses_language_model(self) -> bool {
        !matches!(self, Mode::Words)
    }

    pub fn uses_forecast(self) -> bool {
        matches!(self, Mode::NGramsForecast | Mode::NGramsForecastAndSample)
    }
}

impl TryFrom<&str> for Mode {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Words" => Ok(Mode::Words),
            "NGrams" => Ok(Mode::NGrams),
            "NGramsForecast" => Ok(Mode::NGramsForecast),
            "NGramsForecastAndSample" => Ok(Mode::NGramsForecastAndSample),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Number of completions summed by `NGramsForecastAndSample` before the
/// forecast is capped. Not part of the external contract (§4.2 design
/// note); chosen so the common case (short prefixes, a few dozen
/// compatible words) is never affected, only pathological wide prefixes.
pub const FORECAST_SAMPLE_CAP: usize = 20;

/// The dictionary plus optional n-gram statistics a decoder scores
/// against.
pub struct LanguageModel {
    mode: Mode,
    smoothing: f64,
    tree: PrefixTree,
    vocab: Vec<String>,
    unigram_counts: Vec<u32>,
    bigram_counts: HashMap<(u32, u32), u32>,
    total_tokens: u64,
}

/// Per-decode memoization of forecast sums, keyed by `(node, last_word)`.
/// Owned by whichever worker is decoding one batch element, so it never
/// needs to be shared across threads (§5, §9).
pub type ForecastCache = HashMap<(NodeId, Option<u32>), f64>;

impl LanguageModel {
    /// Tokenize `corpus` and build the prefix tree + n-gram counts.
    pub fn new(
        corpus: &str,
        alphabet: &Alphabet,
        mode: Mode,
        smoothing: f64,
    ) -> Result<Self, ConfigError> {
        if smoothing < 0.0 {
            return Err(ConfigError::NegativeSmoothing(smoothing));
        }

        let tokens = tokenize(corpus, alphabet);

        let mut vocab: Vec<String> = Vec::new();
        let mut word_to_id: HashMap<&str, u32> = HashMap::new();
        for tok in &tokens {
            if !word_to_id.contains_key(tok.as_str()) {
                word_to_id.insert(tok.as_str(), vocab.len() as u32);
                vocab.push(tok.clone());
            }
        }

        if vocab.is_empty() && mode.uses_language_model() {
            return Err(ConfigError::EmptyVocabulary);
        }

        let mut unigram_counts = vec![0u32; vocab.len()];
        let mut bigram_counts: HashMap<(u32, u32), u32> = HashMap::new();
        let ids: Vec<u32> = tokens.iter().map(|t| word_to_id[t.as_str()]).collect();
        for &id in &ids {
            unigram_counts[id as usize] += 1;
        }
        for pair in ids.windows(2) {
            *bigram_counts.entry((pair[0], pair[1])).or_insert(0) += 1;
        }

        let tree = PrefixTree::new(&vocab);

        Ok(LanguageModel {
            mode,
            smoothing,
            tree,
            vocab,
            unigram_counts,
            bigram_counts,
            total_tokens: ids.len() as u64,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tree(&self) -> &PrefixTree {
        &self.tree
    }

    pub fn word(&self, id: u32) -> &str {
        &self.vocab[id as usize]
    }

    fn vocab_size(&self) -> f64 {
        self.vocab.len() as f64
    }

    /// `P(w)` under add-k smoothing.
    pub fn unigram_prob(&self, word: u32) -> f64 {
        if self.vocab.is_empty() {
            return 0.0;
        }
        let count = self.unigram_counts[word as usize] as f64;
        let k = self.smoothing;
        (count + k) / (self.total_tokens as f64 + k * self.vocab_size())
    }

    /// `P(w2 | w1)` under add-k smoothing.
    pub fn bigram_prob(&self, w1: u32, w2: u32) -> f64 {
        if self.vocab.is_empty() {
            return 0.0;
        }
        let pair_count = self.bigram_counts.get(&(w1, w2)).copied().unwrap_or(0) as f64;
        let w1_count = self.unigram_counts[w1 as usize] as f64;
        let k = self.smoothing;
        let denom = w1_count + k * self.vocab_size();
        if denom == 0.0 {
            0.0
        } else {
            (pair_count + k) / denom
        }
    }

    /// Probability of transitioning from `last_word` (`None` at sentence
    /// start) to newly-completed `word`, under the active mode.
    pub fn transition_prob(&self, last_word: Option<u32>, word: u32) -> f64 {
        match last_word {
            None => self.unigram_prob(word),
            Some(w1) => self.bigram_prob(w1, word),
        }
    }

    /// Forecast score for a beam sitting at `node` with `last_word` the
    /// most recently completed word: the sum of `P(w | last_word)` over
    /// every dictionary word reachable from `node`. Used by the forecast
    /// modes so beams mid-word aren't unfairly dominated by beams that
    /// have already closed a word. Memoized in the caller-owned `cache`.
    pub fn forecast(&self, node: NodeId, last_word: Option<u32>, cache: &mut ForecastCache) -> f64 {
        if let Some(&cached) = cache.get(&(node, last_word)) {
            return cached;
        }

        let completions = self.tree.completions(node);
        let iter = completions.iter().copied();
        let sum: f64 = if self.mode == Mode::NGramsForecastAndSample {
            iter.take(FORECAST_SAMPLE_CAP)
                .map(|w| self.transition_prob(last_word, w))
                .sum()
        } else {
            iter.map(|w| self.transition_prob(last_word, w)).sum()
        };

        cache.insert((node, last_word), sum);
        sum
    }
}

/// Split `corpus` into maximal runs of word-chars, discarding everything
/// else. Deduplication/id-assignment happens in `LanguageModel::new`.
fn tokenize(corpus: &str, alphabet: &Alphabet) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in corpus.chars() {
        if alphabet.is_word_char(ch) {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
