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

//! # Cross-passage answer merger
//! Gathers the candidate spans of every considered passage of a question, ranks them by score and
//! greedily concatenates the non-overlapping ones until the answer length budget is spent.

use crate::pipelines::common::{char_span, scored_text};
use crate::pipelines::question_answering::{
    AnswerSelector, Example, ProbabilityPair, QuestionAnsweringConfig,
};
use crate::pipelines::span_picker::{SpanCandidate, SpanPicker};
use ordered_float::OrderedFloat;
use tracing::debug;

/// Span candidate attached to its passage and answer text
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub span: SpanCandidate,
    /// Rank of the passage the span was extracted from
    pub passage_idx: usize,
    /// Characters `start_idx..=end_idx` of the passage scored text
    pub answer: String,
}

impl Candidate {
    /// Spans from the same passage sharing at least one position.
    pub fn overlaps(&self, other: &Candidate) -> bool {
        self.passage_idx == other.passage_idx
            && self.span.start_idx <= other.span.end_idx
            && other.span.start_idx <= self.span.end_idx
    }
}

/// Accepted candidates, in acceptance order, and their concatenated text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalAnswer {
    pub candidates: Vec<Candidate>,
    pub text: String,
}

/// # Multiple answer strategy
pub struct AnswerMerger {
    picker: SpanPicker,
    max_answer_length: usize,
    max_para_num: usize,
}

impl AnswerMerger {
    pub fn new(picker: SpanPicker, max_answer_length: usize, max_para_num: usize) -> AnswerMerger {
        AnswerMerger {
            picker,
            max_answer_length,
            max_para_num,
        }
    }

    /// Candidates of the first `max_para_num` passages, in passage order.
    pub fn collect_candidates(
        &self,
        example: &Example,
        probabilities: &[ProbabilityPair],
    ) -> Vec<Candidate> {
        let question_length = example.question_length();
        let mut all_candidates = vec![];
        for (passage_idx, (passage, scores)) in example
            .passages
            .iter()
            .zip(probabilities.iter())
            .take(self.max_para_num)
            .enumerate()
        {
            let text = scored_text(&example.question_text, &passage.text);
            let spans = self.picker.pick(&scores.start, &scores.end, question_length);
            all_candidates.extend(spans.into_iter().map(|span| Candidate {
                answer: char_span(&text, span.start_idx, span.end_idx),
                span,
                passage_idx,
            }));
        }
        all_candidates
    }

    /// Decodes the merged answer of an example.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_mrc::pipelines::answer_merger::AnswerMerger;
    /// use rust_mrc::pipelines::question_answering::{
    ///     Example, Passage, ProbabilityPair, QuestionId,
    /// };
    /// use rust_mrc::pipelines::span_picker::SpanPicker;
    /// # fn main() -> Result<(), rust_mrc::MrcError> {
    /// let merger = AnswerMerger::new(SpanPicker::new(5, 0.3, 512), 452, 5);
    /// let example = Example {
    ///     question_id: QuestionId::Number(1),
    ///     question_text: "谁".to_string(),
    ///     question_type: "ENTITY".to_string(),
    ///     passages: vec![Passage { text: "答案是小明".to_string() }],
    ///     answers: None,
    /// };
    /// // scored text: "p谁。答案是小明", "小明" at positions 6..=7
    /// let mut start = vec![0.0; 8];
    /// let mut end = vec![0.0; 8];
    /// start[6] = 10.0;
    /// end[7] = 10.0;
    /// let answer = merger.find_multiple_answers(&example, &[ProbabilityPair::new(start, end)?]);
    /// assert_eq!(answer.text, "小明");
    /// # Ok(())
    /// # }
    /// ```
    pub fn find_multiple_answers(
        &self,
        example: &Example,
        probabilities: &[ProbabilityPair],
    ) -> FinalAnswer {
        merge_candidates(
            self.collect_candidates(example, probabilities),
            self.max_answer_length,
        )
    }
}

impl From<&QuestionAnsweringConfig> for AnswerMerger {
    fn from(config: &QuestionAnsweringConfig) -> Self {
        AnswerMerger::new(
            SpanPicker::new(config.top_k, config.threshold, config.max_seq_length),
            config.max_answer_length,
            config.max_para_num,
        )
    }
}

impl AnswerSelector for AnswerMerger {
    fn select_answer(&self, example: &Example, probabilities: &[ProbabilityPair]) -> String {
        self.find_multiple_answers(example, probabilities).text
    }
}

/// Ranks candidates and concatenates the accepted ones.
///
/// Candidates are visited by decreasing score; equal scores are ordered by passage rank, then
/// start and end position. A candidate overlapping an accepted one is a duplicate and is not
/// accepted. Merging stops at the first candidate, duplicate or not, whose text would push the
/// answer past `max_answer_length` characters.
pub fn merge_candidates(mut candidates: Vec<Candidate>, max_answer_length: usize) -> FinalAnswer {
    candidates.sort_by(|a, b| {
        OrderedFloat(b.span.score)
            .cmp(&OrderedFloat(a.span.score))
            .then(a.passage_idx.cmp(&b.passage_idx))
            .then(a.span.start_idx.cmp(&b.span.start_idx))
            .then(a.span.end_idx.cmp(&b.span.end_idx))
    });

    let mut final_answer = FinalAnswer::default();
    let mut answer_length = 0;
    for candidate in candidates {
        let duplicated = final_answer
            .candidates
            .iter()
            .any(|accepted| candidate.overlaps(accepted));

        let candidate_length = candidate.answer.chars().count();
        if answer_length + candidate_length > max_answer_length {
            debug!(
                "answer budget of {} characters reached at {} characters",
                max_answer_length, answer_length
            );
            break;
        }

        if !duplicated {
            answer_length += candidate_length;
            final_answer.text.push_str(&candidate.answer);
            final_answer.candidates.push(candidate);
        }
    }

    if answer_length > max_answer_length {
        final_answer.text = final_answer.text.chars().take(max_answer_length).collect();
    }
    final_answer
}

#[cfg(test)]
mod test {
    use super::*;

    fn candidate(passage_idx: usize, start_idx: usize, end_idx: usize, score: f64) -> Candidate {
        Candidate {
            span: SpanCandidate {
                start_idx,
                end_idx,
                start_prob: score / 2.0,
                end_prob: score / 2.0,
                score,
            },
            passage_idx,
            answer: "字".repeat(end_idx - start_idx + 1),
        }
    }

    fn spans(answer: &FinalAnswer) -> Vec<(usize, usize, usize)> {
        answer
            .candidates
            .iter()
            .map(|c| (c.passage_idx, c.span.start_idx, c.span.end_idx))
            .collect()
    }

    #[test]
    fn overlapping_spans_keep_the_best() {
        let answer = merge_candidates(
            vec![candidate(0, 10, 20, 0.5), candidate(0, 15, 25, 0.9)],
            452,
        );
        assert_eq!(spans(&answer), vec![(0, 15, 25)]);
        assert_eq!(answer.text.chars().count(), 11);
    }

    #[test]
    fn containing_span_is_a_duplicate() {
        let answer = merge_candidates(
            vec![candidate(0, 12, 14, 0.9), candidate(0, 10, 20, 0.5)],
            452,
        );
        assert_eq!(spans(&answer), vec![(0, 12, 14)]);
    }

    #[test]
    fn overlap_is_scoped_to_a_passage() {
        let answer = merge_candidates(
            vec![candidate(0, 10, 20, 0.9), candidate(1, 10, 20, 0.5)],
            452,
        );
        assert_eq!(spans(&answer), vec![(0, 10, 20), (1, 10, 20)]);
        assert_eq!(answer.text.chars().count(), 22);
    }

    #[test]
    fn merging_stops_at_the_length_budget() {
        let answer = merge_candidates(
            vec![
                candidate(0, 10, 309, 0.9),
                candidate(1, 10, 209, 0.8),
                candidate(2, 10, 19, 0.7),
            ],
            452,
        );
        // the 200 character candidate overflows and ends the merge before the short one
        assert_eq!(spans(&answer), vec![(0, 10, 309)]);
        assert_eq!(answer.text.chars().count(), 300);
    }

    #[test]
    fn overflowing_duplicate_also_stops_merging() {
        let answer = merge_candidates(
            vec![
                candidate(0, 10, 109, 0.9),
                candidate(0, 50, 449, 0.8),
                candidate(1, 10, 19, 0.7),
            ],
            452,
        );
        assert_eq!(spans(&answer), vec![(0, 10, 109)]);
    }

    #[test]
    fn ties_follow_passage_then_position() {
        let answer = merge_candidates(
            vec![
                candidate(1, 5, 6, 0.6),
                candidate(0, 8, 9, 0.6),
                candidate(0, 3, 4, 0.6),
                candidate(2, 1, 1, 0.7),
            ],
            452,
        );
        assert_eq!(
            spans(&answer),
            vec![(2, 1, 1), (0, 3, 4), (0, 8, 9), (1, 5, 6)]
        );
    }

    #[test]
    fn no_candidates_give_an_empty_answer() {
        assert_eq!(merge_candidates(vec![], 452), FinalAnswer::default());
    }
}
