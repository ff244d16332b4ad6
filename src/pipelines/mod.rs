//! # Answer decoding pipelines
//!
//! Post-processing of extractive question answering scores for Chinese machine reading
//! comprehension. The model runs upstream and provides, for every passage of a question, start and
//! end scores over the characters of `"p" + question + "。" + passage`. The following components
//! are available:
//!
//! #### 1. Example building
//! [`example_builder`] turns raw DuReader annotation files into examples, keeping the most related
//! paragraph of the first answer document of every question.
//!
//! #### 2. Per-passage span picking
//! [`span_picker`] normalizes the scores of a passage and proposes the top start/end combinations
//! scoring above a threshold.
//!
//! #### 3. Answer decoding
//! Two strategies are available, selected with
//! [`AnswerStrategy`](question_answering::AnswerStrategy):
//! - [`answer_merger`] (default): merges the best non-overlapping spans of all passages within an
//! answer length budget
//! - [`best_answer`]: keeps the single best span, weighted by passage rank
//!
//! #### 4. Prediction export
//! [`question_answering`] reads scored examples, applies the strategy and writes one prediction
//! per question.
//!
//! ```no_run
//! use rust_mrc::pipelines::question_answering::{
//!     AnswerStrategy, QuestionAnsweringConfig, QuestionAnsweringModel,
//! };
//! use std::path::Path;
//!
//! # fn main() -> Result<(), rust_mrc::MrcError> {
//! let config = QuestionAnsweringConfig {
//!     strategy: AnswerStrategy::SingleBest,
//!     ..Default::default()
//! };
//! let qa_model = QuestionAnsweringModel::new(config)?;
//! qa_model.evaluate_file(Path::new("predict.data"), Path::new("predicts.json"))?;
//! # Ok(())
//! # }
//! ```

pub mod answer_merger;
pub mod best_answer;
pub mod common;
pub mod example_builder;
pub mod question_answering;
pub mod span_picker;
