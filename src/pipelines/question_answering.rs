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

//! # Question answering prediction pipeline
//! Turns start/end scores produced by an extractive question answering model into competition
//! predictions. Each input record holds an [`Example`] (a question with its ranked passages) and
//! one start/end score vector per passage, aligned to the characters of
//! `"p" + question + "。" + passage`. The active [`AnswerStrategy`] decodes an answer string from
//! these scores and a [`Prediction`] is written for every question.
//!
//! ```no_run
//! use rust_mrc::pipelines::question_answering::{QuestionAnsweringConfig, QuestionAnsweringModel};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), rust_mrc::MrcError> {
//! let qa_model = QuestionAnsweringModel::new(QuestionAnsweringConfig::default())?;
//! let summary = qa_model.evaluate_file(Path::new("predict.data"), Path::new("predicts.json"))?;
//! # Ok(())
//! # }
//! ```
//!
//! Output (one JSON line per question): \
//! `{"question_id":221574,"question":"...","question_type":"DESCRIPTION","answers":["..."],"entity_answers":[[]],"yesno_answers":[]}`

use crate::common::error::MrcError;
use crate::pipelines::answer_merger::AnswerMerger;
use crate::pipelines::best_answer::BestAnswerSelector;
use crate::pipelines::common::scored_text;
use crate::Config;
use serde::{Deserialize, Serialize};
use std::cmp::min;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Identifier of a question, numeric in the DuReader releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionId::Number(id) => write!(f, "{id}"),
            QuestionId::Text(id) => write!(f, "{id}"),
        }
    }
}

/// Passage candidate for a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    #[serde(rename = "doc_tokens")]
    pub text: String,
}

/// # Question with its ranked passages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(rename = "id")]
    pub question_id: QuestionId,
    pub question_text: String,
    pub question_type: String,
    /// Passages ordered by retrieval rank
    #[serde(rename = "doc_tokens", default)]
    pub passages: Vec<Passage>,
    /// Reference answers, absent for test sets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
}

impl Example {
    /// Number of characters in the question.
    pub fn question_length(&self) -> usize {
        self.question_text.chars().count()
    }

    /// Text the scores of passage `passage_idx` index into.
    pub fn scored_text(&self, passage_idx: usize) -> Option<String> {
        self.passages
            .get(passage_idx)
            .map(|passage| scored_text(&self.question_text, &passage.text))
    }
}

/// Start and end scores over the scored text of one passage
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityPair {
    pub start: Vec<f64>,
    pub end: Vec<f64>,
}

impl ProbabilityPair {
    pub fn new(start: Vec<f64>, end: Vec<f64>) -> Result<ProbabilityPair, MrcError> {
        if start.len() != end.len() {
            return Err(MrcError::InvalidInputError(format!(
                "start and end scores have different lengths ({} and {})",
                start.len(),
                end.len()
            )));
        }
        Ok(ProbabilityPair { start, end })
    }
}

/// # Input record: an example with the model scores for each of its passages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredExample {
    pub example: Example,
    pub start_probs: Vec<Vec<f64>>,
    pub end_probs: Vec<Vec<f64>>,
}

impl ScoredExample {
    pub fn from_pairs(example: Example, probabilities: Vec<ProbabilityPair>) -> ScoredExample {
        let (start_probs, end_probs): (Vec<Vec<f64>>, Vec<Vec<f64>>) = probabilities
            .into_iter()
            .map(|pair| (pair.start, pair.end))
            .unzip();
        ScoredExample {
            example,
            start_probs,
            end_probs,
        }
    }

    /// Pairs the start and end scores of the first `passage_count` passages, checking their
    /// shapes. Score vectors past `passage_count` are not inspected.
    pub fn probability_pairs(
        &self,
        passage_count: usize,
    ) -> Result<Vec<ProbabilityPair>, MrcError> {
        if self.start_probs.len() < passage_count || self.end_probs.len() < passage_count {
            return Err(MrcError::InvalidInputError(format!(
                "question {}: {} passages considered but {} start and {} end score vectors",
                self.example.question_id,
                passage_count,
                self.start_probs.len(),
                self.end_probs.len()
            )));
        }
        self.start_probs
            .iter()
            .zip(self.end_probs.iter())
            .take(passage_count)
            .map(|(start, end)| ProbabilityPair::new(start.clone(), end.clone()))
            .collect()
    }
}

/// # Output record in the competition format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub question_id: QuestionId,
    pub question: String,
    pub question_type: String,
    /// Single predicted answer, possibly empty
    pub answers: Vec<String>,
    pub entity_answers: Vec<Vec<String>>,
    pub yesno_answers: Vec<String>,
}

impl Prediction {
    pub fn new(example: &Example, answer: String) -> Prediction {
        Prediction {
            question_id: example.question_id.clone(),
            question: example.question_text.clone(),
            question_type: example.question_type.clone(),
            answers: vec![answer],
            entity_answers: vec![vec![]],
            yesno_answers: vec![],
        }
    }
}

/// # Answer decoding strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStrategy {
    /// Merge the best non-overlapping spans of all passages (see [`AnswerMerger`])
    MultipleAnswers,
    /// Keep the single best span, weighted by passage rank (see [`BestAnswerSelector`])
    SingleBest,
}

impl FromStr for AnswerStrategy {
    type Err = MrcError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "multiple_answers" | "multiple-answers" => Ok(AnswerStrategy::MultipleAnswers),
            "single_best" | "single-best" => Ok(AnswerStrategy::SingleBest),
            _ => Err(MrcError::InvalidConfigurationError(format!(
                "unknown answer strategy {value}, expected multiple-answers or single-best"
            ))),
        }
    }
}

/// # Configuration for question answering predictions
/// Missing fields of a configuration file take the default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionAnsweringConfig {
    /// Maximum length of the model input; score positions past it are ignored
    pub max_seq_length: usize,
    /// Maximum question length used when the scores were produced
    pub max_query_length: usize,
    /// Maximum number of characters of the predicted answer
    pub max_answer_length: usize,
    /// Number of leading passages considered per question
    pub max_para_num: usize,
    /// Minimum (exclusive) summed start/end probability of a candidate span
    pub threshold: f64,
    /// Number of start and end positions collected per passage
    pub top_k: usize,
    /// Weight of a passage by retrieval rank, used by the single best strategy
    pub prior_scores: Vec<f64>,
    pub strategy: AnswerStrategy,
}

impl Default for QuestionAnsweringConfig {
    fn default() -> QuestionAnsweringConfig {
        QuestionAnsweringConfig {
            max_seq_length: 512,
            max_query_length: 60,
            max_answer_length: 452,
            max_para_num: 5,
            threshold: 0.3,
            top_k: 5,
            prior_scores: vec![0.44, 0.23, 0.15, 0.09, 0.07],
            strategy: AnswerStrategy::MultipleAnswers,
        }
    }
}

impl Config for QuestionAnsweringConfig {}

impl QuestionAnsweringConfig {
    pub fn validate(&self) -> Result<(), MrcError> {
        let invalid = |message: String| -> Result<(), MrcError> {
            Err(MrcError::InvalidConfigurationError(message))
        };
        if self.max_seq_length == 0 {
            return invalid("max_seq_length must be positive".to_string());
        }
        if self.max_query_length >= self.max_seq_length {
            return invalid(format!(
                "max_query_length ({}) must be smaller than max_seq_length ({})",
                self.max_query_length, self.max_seq_length
            ));
        }
        if self.max_answer_length == 0 {
            return invalid("max_answer_length must be positive".to_string());
        }
        if self.max_para_num == 0 {
            return invalid("max_para_num must be positive".to_string());
        }
        if self.top_k == 0 {
            return invalid("top_k must be positive".to_string());
        }
        if !self.threshold.is_finite() {
            return invalid(format!("threshold must be finite, got {}", self.threshold));
        }
        if let Some(prior) = self
            .prior_scores
            .iter()
            .find(|prior| !prior.is_finite() || **prior < 0.0)
        {
            return invalid(format!("prior scores must be non-negative, got {prior}"));
        }
        Ok(())
    }
}

/// Decodes an answer string for an example from its passage scores.
pub trait AnswerSelector {
    /// `probabilities` holds at least one pair per considered passage.
    fn select_answer(&self, example: &Example, probabilities: &[ProbabilityPair]) -> String;
}

/// Counts reported by an evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationSummary {
    /// Prediction records written
    pub predictions: usize,
    /// Input records skipped as malformed
    pub skipped: usize,
}

/// # QuestionAnsweringModel to decode and export predictions
pub struct QuestionAnsweringModel {
    selector: Box<dyn AnswerSelector>,
    max_para_num: usize,
}

impl QuestionAnsweringModel {
    /// Build a new `QuestionAnsweringModel`
    ///
    /// # Arguments
    ///
    /// * `qa_config` - `QuestionAnsweringConfig` with the decoding limits and the answer strategy
    ///
    /// # Example
    ///
    /// ```
    /// # fn main() -> Result<(), rust_mrc::MrcError> {
    /// use rust_mrc::pipelines::question_answering::QuestionAnsweringModel;
    ///
    /// let qa_model = QuestionAnsweringModel::new(Default::default())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(qa_config: QuestionAnsweringConfig) -> Result<QuestionAnsweringModel, MrcError> {
        qa_config.validate()?;
        let selector: Box<dyn AnswerSelector> = match qa_config.strategy {
            AnswerStrategy::MultipleAnswers => Box::new(AnswerMerger::from(&qa_config)),
            AnswerStrategy::SingleBest => Box::new(BestAnswerSelector::from(&qa_config)),
        };
        Ok(QuestionAnsweringModel {
            selector,
            max_para_num: qa_config.max_para_num,
        })
    }

    /// Decodes the prediction for a scored example. Examples without passages get an empty
    /// answer.
    ///
    /// # Returns
    ///
    /// * `Prediction`, or `MrcError::InvalidInputError` when the scores do not cover the
    /// considered passages
    pub fn predict(&self, scored_example: &ScoredExample) -> Result<Prediction, MrcError> {
        let example = &scored_example.example;
        if example.passages.is_empty() {
            return Ok(Prediction::new(example, String::new()));
        }
        let considered = min(example.passages.len(), self.max_para_num);
        let probabilities = scored_example.probability_pairs(considered)?;
        let answer = self.selector.select_answer(example, &probabilities);
        Ok(Prediction::new(example, answer))
    }

    /// Predicts every JSON line of `lines` and writes one JSON line per prediction to `writer`.
    /// Blank lines are ignored; malformed records, invalid UTF-8 included, are logged and skipped.
    pub fn evaluate<I, S, W>(&self, lines: I, mut writer: W) -> Result<EvaluationSummary, MrcError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
        W: Write,
    {
        let mut summary = EvaluationSummary::default();
        for (line_idx, line) in lines.into_iter().enumerate() {
            let line = match std::str::from_utf8(line.as_ref()) {
                Ok(line) => line.trim(),
                Err(error) => {
                    warn!("skipping record on line {}: {}", line_idx + 1, error);
                    summary.skipped += 1;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            let prediction = serde_json::from_str::<ScoredExample>(line)
                .map_err(MrcError::from)
                .and_then(|scored_example| self.predict(&scored_example));
            match prediction {
                Ok(prediction) => {
                    serde_json::to_writer(&mut writer, &prediction)?;
                    writer.write_all(b"\n")?;
                    summary.predictions += 1;
                }
                Err(error) => {
                    warn!("skipping record on line {}: {}", line_idx + 1, error);
                    summary.skipped += 1;
                }
            }
        }
        writer.flush()?;
        info!(
            "{} predictions written, {} records skipped",
            summary.predictions, summary.skipped
        );
        Ok(summary)
    }

    /// Reads scored examples from `source` and writes the predictions to `result`.
    pub fn evaluate_file(
        &self,
        source: &Path,
        result: &Path,
    ) -> Result<EvaluationSummary, MrcError> {
        let lines = BufReader::new(File::open(source)?)
            .split(b'\n')
            .collect::<Result<Vec<Vec<u8>>, _>>()?;
        let writer = BufWriter::new(File::create(result)?);
        let summary = self.evaluate(lines, writer)?;
        info!("save predicted data: {}", result.display());
        Ok(summary)
    }
}

/// Produces start/end scores for a passage. Implemented by model runtimes; the
/// [`FixedScorer`] returns the same scores for every passage.
pub trait SpanScorer {
    fn score(&self, question: &str, passage: &str) -> Result<ProbabilityPair, MrcError>;
}

/// # Scorer returning fixed scores regardless of its input
#[derive(Debug, Clone, PartialEq)]
pub struct FixedScorer {
    probabilities: ProbabilityPair,
}

impl FixedScorer {
    pub fn new(probabilities: ProbabilityPair) -> FixedScorer {
        FixedScorer { probabilities }
    }

    /// Scores of length `seq_length`, peaked at `start_position` and `end_position`.
    pub fn peaked(
        seq_length: usize,
        start_position: usize,
        end_position: usize,
    ) -> Result<FixedScorer, MrcError> {
        if start_position >= seq_length || end_position >= seq_length {
            return Err(MrcError::InvalidConfigurationError(format!(
                "peak positions ({start_position}, {end_position}) outside of a sequence of length {seq_length}"
            )));
        }
        let mut start = vec![0f64; seq_length];
        let mut end = vec![0f64; seq_length];
        start[start_position] = 10.0;
        end[end_position] = 10.0;
        Ok(FixedScorer::new(ProbabilityPair::new(start, end)?))
    }
}

impl SpanScorer for FixedScorer {
    fn score(&self, _question: &str, _passage: &str) -> Result<ProbabilityPair, MrcError> {
        Ok(self.probabilities.clone())
    }
}

/// Attaches scores to the first `max_para_num` passages of an example.
pub fn score_example<S: SpanScorer + ?Sized>(
    scorer: &S,
    example: Example,
    max_para_num: usize,
) -> Result<ScoredExample, MrcError> {
    let probabilities = example
        .passages
        .iter()
        .take(max_para_num)
        .map(|passage| scorer.score(&example.question_text, &passage.text))
        .collect::<Result<Vec<ProbabilityPair>, MrcError>>()?;
    Ok(ScoredExample::from_pairs(example, probabilities))
}
