// src/dedup/similarity.rs
//! TF-IDF weighted bag of 1- and 2-grams with cosine similarity.
//!
//! Weighting follows the usual smooth-idf scheme:
//! `tf(t, d) * (ln((1 + n) / (1 + df(t))) + 1)`, rows L2-normalized, so the
//! cosine of two rows is their dot product. The vocabulary is capped to the
//! `max_features` most frequent terms across the corpus (ties broken
//! alphabetically).

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

fn token_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?u)\b\w\w+\b").expect("static token regex"))
}

/// Lowercased word tokens of two or more word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Unigrams followed by space-joined bigrams.
pub fn ngrams(tokens: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tokens.to_vec();
    out.extend(tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])));
    out
}

/// L2-normalized TF-IDF rows for a fitted corpus.
#[derive(Debug, Clone)]
pub struct TfIdfMatrix {
    rows: Vec<Vec<f64>>,
    vocab_len: usize,
}

impl TfIdfMatrix {
    /// Fit and transform `docs` in one pass. `None` when no document yields
    /// a single term (nothing to compare).
    pub fn fit(docs: &[&str], max_features: usize) -> Option<Self> {
        let grams: Vec<Vec<String>> = docs.iter().map(|d| ngrams(&tokenize(d))).collect();

        let mut corpus_count: BTreeMap<&str, usize> = BTreeMap::new();
        for g in grams.iter().flatten() {
            *corpus_count.entry(g.as_str()).or_default() += 1;
        }
        if corpus_count.is_empty() || max_features == 0 {
            return None;
        }

        let mut ranked: Vec<(&str, usize)> = corpus_count.into_iter().collect();
        // BTreeMap order is alphabetical; a stable sort keeps it for ties.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(max_features);
        let mut terms: Vec<&str> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort_unstable();
        let vocab: HashMap<&str, usize> = terms.iter().enumerate().map(|(i, t)| (*t, i)).collect();

        let mut tf: Vec<Vec<f64>> = vec![vec![0.0; vocab.len()]; docs.len()];
        let mut df = vec![0usize; vocab.len()];
        for (row, doc_grams) in tf.iter_mut().zip(&grams) {
            for g in doc_grams {
                if let Some(&col) = vocab.get(g.as_str()) {
                    if row[col] == 0.0 {
                        df[col] += 1;
                    }
                    row[col] += 1.0;
                }
            }
        }

        let n = docs.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        for row in tf.iter_mut() {
            for (v, w) in row.iter_mut().zip(&idf) {
                *v *= w;
            }
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.iter_mut().for_each(|v| *v /= norm);
            }
        }

        Some(Self {
            rows: tf,
            vocab_len: vocab.len(),
        })
    }

    pub fn vocab_len(&self) -> usize {
        self.vocab_len
    }

    pub fn cosine(&self, a: usize, b: usize) -> f64 {
        match (self.rows.get(a), self.rows.get(b)) {
            (Some(x), Some(y)) => x.iter().zip(y).map(|(p, q)| p * q).sum(),
            _ => 0.0,
        }
    }
}

/// Best match of `candidate` against `existing`: `(index, similarity)`.
///
/// The vocabulary is fitted on `existing` plus the candidate. `None` when
/// there is nothing to compare against or no usable vocabulary.
pub fn best_match(candidate: &str, existing: &[&str], max_features: usize) -> Option<(usize, f64)> {
    if existing.is_empty() {
        return None;
    }
    let mut docs: Vec<&str> = existing.to_vec();
    docs.push(candidate);
    let m = TfIdfMatrix::fit(&docs, max_features)?;
    let last = docs.len() - 1;
    (0..last)
        .map(|i| (i, m.cosine(last, i)))
        .fold(None, |best: Option<(usize, f64)>, (i, s)| match best {
            Some((_, bs)) if bs >= s => best,
            _ => Some((i, s)),
        })
}
