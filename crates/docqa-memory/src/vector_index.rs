//! Exact nearest-neighbour search over an in-memory list of entries.
//!
//! Scores are "higher is better" for every metric. Euclidean distance is reported
//! negated so callers can rank all metrics the same way. Exact score ties rank the
//! earlier-inserted entry first.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::document::ChunkMetadata;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("embedding dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding vector is empty")]
    EmptyVector,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Dot,
    Euclidean,
}

impl DistanceMetric {
    #[must_use]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Dot => dot(a, b),
            Self::Euclidean => -a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Dot => "dot",
            Self::Euclidean => "euclidean",
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            other => Err(format!("unknown distance metric: {other}")),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Insertion position of the entry.
    pub id: usize,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Append-only store of `(vector, text, metadata)` with a fixed dimension.
///
/// The dimension is taken from the first entry added and released by [`clear`](Self::clear).
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    metric: DistanceMetric,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl InMemoryIndex {
    #[must_use]
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            dimension: None,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a batch. Either every entry is added or none is.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyVector`] for a zero-length vector and
    /// [`IndexError::DimensionMismatch`] when a vector disagrees with the index dimension
    /// or with earlier vectors in the same batch.
    pub fn add(&mut self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        let mut expected = self.dimension;
        for entry in &entries {
            let actual = entry.vector.len();
            if actual == 0 {
                return Err(IndexError::EmptyVector);
            }
            match expected {
                Some(expected) if expected != actual => {
                    return Err(IndexError::DimensionMismatch { expected, actual });
                }
                Some(_) => {}
                None => expected = Some(actual),
            }
        }
        self.dimension = expected;
        self.entries.extend(entries);
        Ok(())
    }

    /// Top `k` entries by descending score; `min(k, len)` results.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if the query vector length differs from
    /// the index dimension.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension
            && expected != vector.len()
        {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(id, entry)| (id, self.metric.score(vector, &entry.vector)))
            .collect();

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_by(rank);

        Ok(scored
            .into_iter()
            .map(|(id, score)| {
                let entry = &self.entries[id];
                SearchHit {
                    id,
                    text: entry.text.clone(),
                    metadata: entry.metadata.clone(),
                    score,
                }
            })
            .collect())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dimension = None;
    }
}

/// Descending score, NaN last, then ascending insertion id.
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    let by_score = match (a.1.is_nan(), b.1.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal),
    };
    by_score.then(a.0.cmp(&b.0))
}
