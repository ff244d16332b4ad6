//! # Answer span decoding for Chinese machine reading comprehension
//!
//! Post-processing of extractive question answering model outputs for DuReader-style data:
//! building evaluation examples from raw annotations, picking candidate answer spans per passage,
//! merging them across passages and exporting predictions in the competition format.
//!
//! The model forward pass is not part of this crate: start and end scores are read from the
//! prediction input, one vector per passage.
//!
//! ```no_run
//! use rust_mrc::pipelines::question_answering::{QuestionAnsweringConfig, QuestionAnsweringModel};
//! use rust_mrc::Config;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), rust_mrc::MrcError> {
//! let config = QuestionAnsweringConfig::from_file("predict_config.json")?;
//! let qa_model = QuestionAnsweringModel::new(config)?;
//! let summary = qa_model.evaluate_file(Path::new("predict.data"), Path::new("predicts.json"))?;
//! # Ok(())
//! # }
//! ```
//!
//! Input and output files hold one JSON object per line:
//! - input: `{"example": {"id", "question_text", "question_type", "doc_tokens": [{"doc_tokens"}]}, "start_probs": [[...]], "end_probs": [[...]]}`
//! - output: `{"question_id", "question", "question_type", "answers": [...], "entity_answers": [[]], "yesno_answers": []}`
//!
//! Remote inputs and model artifacts can be staged beforehand with the [`resources`] module
//! (`remote` feature, enabled by default).

pub mod common;
pub mod pipelines;

pub use common::config::Config;
pub use common::error::MrcError;
pub use common::resources;
