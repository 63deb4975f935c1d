//! Rust-native counterpart to the original project's `prototype/main.py`
//! harness: load a corpus/chars/word-chars text triple plus a CSV
//! probability matrix, decode it, and print the result. CSV loading,
//! softmax, and dataset machinery live here rather than in the library
//! because the design document treats them as peripheral glue, not core
//! decoder logic.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::{Array1, Array3};
use ndarray_stats::QuantileExt;
use word_beam_search::WordBeamSearchDecoder;

#[derive(Parser)]
#[command(about = "Decode a CSV-serialized CTC probability matrix with word beam search")]
struct Args {
    /// Plain-text corpus used to build the dictionary and language model.
    #[arg(long)]
    corpus: PathBuf,

    /// All recognizable characters, in label-index order.
    #[arg(long)]
    chars: PathBuf,

    /// The subset of `chars` that forms dictionary words.
    #[arg(long)]
    word_chars: PathBuf,

    /// Semicolon-delimited matrix, one row per timestep, one column per
    /// label plus a trailing column that is dropped (matches the
    /// reference dataset format).
    #[arg(long)]
    matrix: PathBuf,

    #[arg(long, default_value_t = 25)]
    beam_width: usize,

    #[arg(long, default_value = "Words")]
    mode: String,

    #[arg(long, default_value_t = 0.0)]
    smoothing: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let corpus = fs::read_to_string(&args.corpus).with_context(|| format!("reading {:?}", args.corpus))?;
    let chars = fs::read_to_string(&args.chars).with_context(|| format!("reading {:?}", args.chars))?;
    let word_chars =
        fs::read_to_string(&args.word_chars).with_context(|| format!("reading {:?}", args.word_chars))?;

    let decoder = WordBeamSearchDecoder::new(
        args.beam_width,
        &args.mode,
        args.smoothing,
        &corpus,
        &chars,
        &word_chars,
    )
    .context("constructing decoder")?;

    let mat = load_softmax_matrix(&args.matrix, decoder.alphabet().label_count())
        .with_context(|| format!("loading matrix {:?}", args.matrix))?;

    let start = Instant::now();
    let labels = decoder.decode(mat.view()).context("decoding")?;
    let elapsed = start.elapsed();

    for (b, seq) in labels.iter().enumerate() {
        println!(
            "batch {b}: \"{}\"",
            decoder.alphabet().labels_to_string(seq)
        );
    }
    log::info!("decoded {} batch element(s) in {elapsed:?}", labels.len());

    Ok(())
}

/// Load a `;`-delimited matrix (one trailing empty column dropped, as in
/// the reference dataset's CSV export), apply softmax per row, and
/// expand it to a `[T][1][C]` tensor (single batch element).
fn load_softmax_matrix(path: &PathBuf, expected_labels: usize) -> Result<Array3<f32>> {
    let text = fs::read_to_string(path)?;
    let mut rows: Vec<Vec<f32>> = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields: Vec<&str> = line.split(';').collect();
        if fields.last().map(|f| f.trim().is_empty()).unwrap_or(false) {
            fields.pop();
        }
        let row: Vec<f32> = fields
            .iter()
            .map(|f| f.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("parsing row: {line}"))?;
        rows.push(row);
    }

    anyhow::ensure!(!rows.is_empty(), "matrix file has no rows");
    let c = rows[0].len();
    anyhow::ensure!(
        c == expected_labels,
        "matrix has {c} labels per row, decoder expects {expected_labels}"
    );

    let t = rows.len();
    let mut mat = Array3::<f32>::zeros((t, 1, c));
    for (ti, row) in rows.iter().enumerate() {
        let row_arr = Array1::from_vec(row.clone());
        let max = *row_arr
            .max()
            .map_err(|e| anyhow::anyhow!("computing max of row {ti}: {e}"))?;
        let exp: Vec<f32> = row.iter().map(|&v| (v - max).exp()).collect();
        let sum: f32 = exp.iter().sum();
        for (ci, &e) in exp.iter().enumerate() {
            mat[[ti, 0, ci]] = e / sum;
        }
    }
    Ok(mat)
}
