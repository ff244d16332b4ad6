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

//! # Single best answer selector
//! Alternate decoding strategy keeping exactly one span per question. Each passage proposes its
//! most likely span; the proposal is weighted by a prior reflecting how often a passage at that
//! retrieval rank holds the answer, and the highest weighted span wins.

use crate::pipelines::common::{arg_max, char_span, scored_text};
use crate::pipelines::question_answering::{
    AnswerSelector, Example, ProbabilityPair, QuestionAnsweringConfig,
};
use std::cmp::min;

/// Number of times an inverted (end before start) pick is replaced before giving up.
pub const MAX_SPAN_RETRIES: usize = 4;

/// Best span of a passage and its probability `p(start) * p(end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassageSpan {
    pub start_idx: usize,
    pub end_idx: usize,
    pub probability: f64,
}

/// Selected answer and the rank of the passage it was extracted from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BestAnswer {
    pub answer: String,
    pub passage_idx: Option<usize>,
    /// Prior weighted probability of the selected span
    pub score: f64,
}

/// Most likely span of a passage from its raw start/end scores.
///
/// While the best end precedes the best start, both positions are discarded and the next best
/// ones taken, at most `MAX_SPAN_RETRIES` times. A span still inverted afterwards is returned with
/// its bounds swapped. The input scores are left untouched.
pub fn find_best_answer_for_passage(start_probs: &[f64], end_probs: &[f64]) -> Option<PassageSpan> {
    let mut start_probs = start_probs.to_vec();
    let mut end_probs = end_probs.to_vec();
    let (mut best_start, mut prob_start) = arg_max(&start_probs)?;
    let (mut best_end, mut prob_end) = arg_max(&end_probs)?;

    for _ in 0..MAX_SPAN_RETRIES {
        if best_end >= best_start {
            break;
        }
        start_probs[best_start] = 0.0;
        end_probs[best_end] = 0.0;
        (best_start, prob_start) = arg_max(&start_probs)?;
        (best_end, prob_end) = arg_max(&end_probs)?;
    }

    Some(PassageSpan {
        start_idx: best_start.min(best_end),
        end_idx: best_start.max(best_end),
        probability: prob_start * prob_end,
    })
}

/// # Single best answer strategy
pub struct BestAnswerSelector {
    prior_scores: Vec<f64>,
    max_para_num: usize,
    max_seq_length: usize,
}

impl BestAnswerSelector {
    /// # Arguments
    ///
    /// * `prior_scores` - weight per passage rank, passages past the end weigh 0
    /// * `max_para_num` - number of leading passages considered
    /// * `max_seq_length` - score positions past this length are ignored
    pub fn new(
        prior_scores: Vec<f64>,
        max_para_num: usize,
        max_seq_length: usize,
    ) -> BestAnswerSelector {
        BestAnswerSelector {
            prior_scores,
            max_para_num,
            max_seq_length,
        }
    }

    pub fn find_best_answer(
        &self,
        example: &Example,
        probabilities: &[ProbabilityPair],
    ) -> BestAnswer {
        let mut best_answer = BestAnswer::default();
        for (passage_idx, (passage, scores)) in example
            .passages
            .iter()
            .zip(probabilities.iter())
            .take(self.max_para_num)
            .enumerate()
        {
            let start = &scores.start[..min(scores.start.len(), self.max_seq_length)];
            let end = &scores.end[..min(scores.end.len(), self.max_seq_length)];
            let span = match find_best_answer_for_passage(start, end) {
                Some(span) => span,
                None => continue,
            };
            let prior = self.prior_scores.get(passage_idx).copied().unwrap_or(0.0);
            let score = span.probability * prior;
            if score > best_answer.score {
                let text = scored_text(&example.question_text, &passage.text);
                best_answer = BestAnswer {
                    answer: char_span(&text, span.start_idx, span.end_idx),
                    passage_idx: Some(passage_idx),
                    score,
                };
            }
        }
        best_answer
    }
}

impl From<&QuestionAnsweringConfig> for BestAnswerSelector {
    fn from(config: &QuestionAnsweringConfig) -> Self {
        BestAnswerSelector::new(
            config.prior_scores.clone(),
            config.max_para_num,
            config.max_seq_length,
        )
    }
}

impl AnswerSelector for BestAnswerSelector {
    fn select_answer(&self, example: &Example, probabilities: &[ProbabilityPair]) -> String {
        self.find_best_answer(example, probabilities).answer
    }
}
