// Copyright 2020 The rust-mrc Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Per-passage span picker
//! Proposes candidate answer spans for a single passage from the model start/end scores.
//! Both score vectors are normalized, the most likely start and end positions are collected
//! independently over a few rounds, and every (start, end) combination clearing the score
//! threshold becomes a candidate.

use crate::pipelines::common::{arg_max, softmax};
use std::cmp::min;

/// Span proposed for a passage. The score is the sum of the start and end probabilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanCandidate {
    /// Position of the first answer character in the scored text
    pub start_idx: usize,
    /// Position of the last answer character in the scored text (inclusive)
    pub end_idx: usize,
    /// Normalized probability of `start_idx`
    pub start_prob: f64,
    /// Normalized probability of `end_idx`
    pub end_prob: f64,
    /// `start_prob + end_prob`
    pub score: f64,
}

/// # Top-K span picker for a single passage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanPicker {
    /// Number of start and end positions collected per passage
    pub top_k: usize,
    /// Candidates must score strictly above this value
    pub threshold: f64,
    /// Positions past this length are ignored
    pub max_seq_length: usize,
}

impl SpanPicker {
    pub fn new(top_k: usize, threshold: f64, max_seq_length: usize) -> SpanPicker {
        SpanPicker {
            top_k,
            threshold,
            max_seq_length,
        }
    }

    /// Picks candidate spans for one passage.
    ///
    /// # Arguments
    ///
    /// * `start_logits` - start scores over the scored text positions
    /// * `end_logits` - end scores over the scored text positions
    /// * `question_length` - number of characters in the question. Starts at or before this
    /// position fall on the question prefix and end the search.
    ///
    /// # Returns
    ///
    /// * `Vec<SpanCandidate>` candidates with `start_idx <= end_idx` and `score > threshold`,
    /// ordered by start rank then end rank
    ///
    /// # Example
    ///
    /// ```
    /// use rust_mrc::pipelines::span_picker::SpanPicker;
    /// let picker = SpanPicker::new(5, 0.3, 512);
    /// let mut start_logits = vec![0.0; 16];
    /// let mut end_logits = vec![0.0; 16];
    /// start_logits[6] = 10.0;
    /// end_logits[9] = 10.0;
    /// let candidates = picker.pick(&start_logits, &end_logits, 3);
    /// assert_eq!((candidates[0].start_idx, candidates[0].end_idx), (6, 9));
    /// ```
    pub fn pick(
        &self,
        start_logits: &[f64],
        end_logits: &[f64],
        question_length: usize,
    ) -> Vec<SpanCandidate> {
        let start_logits = &start_logits[..min(start_logits.len(), self.max_seq_length)];
        let end_logits = &end_logits[..min(end_logits.len(), self.max_seq_length)];
        let mut start_probs = softmax(start_logits);
        let mut end_probs = softmax(end_logits);

        let mut best_starts: Vec<(usize, f64)> = Vec::with_capacity(self.top_k);
        let mut best_ends: Vec<(usize, f64)> = Vec::with_capacity(self.top_k);
        for _ in 0..self.top_k {
            let (Some((start_idx, start_prob)), Some((end_idx, end_prob))) =
                (arg_max(&start_probs), arg_max(&end_probs))
            else {
                break;
            };
            // A rejected pick leaves both distributions untouched: later rounds would see the
            // same arg-max and reject it again.
            if end_idx <= start_idx
                || start_idx <= question_length
                || start_prob == 0.0
                || end_prob == 0.0
            {
                break;
            }
            best_starts.push((start_idx, start_prob));
            best_ends.push((end_idx, end_prob));
            start_probs[start_idx] = 0.0;
            end_probs[end_idx] = 0.0;
        }

        pair_candidates(&best_starts, &best_ends, self.threshold)
    }
}

/// Combines every collected start with every collected end. Inverted pairs are dropped, as are
/// pairs whose summed probability does not exceed `threshold`.
///
/// # Arguments
///
/// * `best_starts` - `(position, probability)` start picks
/// * `best_ends` - `(position, probability)` end picks
/// * `threshold` - minimum score (exclusive)
pub fn pair_candidates(
    best_starts: &[(usize, f64)],
    best_ends: &[(usize, f64)],
    threshold: f64,
) -> Vec<SpanCandidate> {
    let mut candidates = vec![];
    for &(start_idx, start_prob) in best_starts {
        for &(end_idx, end_prob) in best_ends {
            let score = start_prob + end_prob;
            if start_idx <= end_idx && score > threshold {
                candidates.push(SpanCandidate {
                    start_idx,
                    end_idx,
                    start_prob,
                    end_prob,
                    score,
                });
            }
        }
    }
    candidates
}
