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

//! # Evaluation example builder
//! Builds prediction examples from raw DuReader annotation files (one JSON object per line).
//! For every question, the most related paragraph of its first answer document becomes the only
//! passage of the example; the leading paragraph tokens repeating the document title are dropped.
//!
//! ```no_run
//! use rust_mrc::pipelines::example_builder::build_examples;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), rust_mrc::MrcError> {
//! let summary = build_examples(
//!     &[
//!         Path::new("data/extracted/devset/zhidao.dev.json"),
//!         Path::new("data/extracted/devset/search.dev.json"),
//!     ],
//!     Path::new("predict.data"),
//! )?;
//! println!("{} questions in total, {} lines skipped", summary.examples, summary.skipped);
//! # Ok(())
//! # }
//! ```

use crate::common::error::MrcError;
use crate::pipelines::question_answering::{Example, Passage, QuestionId};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct RawSample {
    question_id: QuestionId,
    question: String,
    question_type: String,
    answer_docs: Vec<usize>,
    /// Only the answer document has to carry the segmented fields
    documents: Vec<Value>,
    #[serde(default)]
    answers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    segmented_title: Vec<String>,
    segmented_paragraphs: Vec<Vec<String>>,
    most_related_para: usize,
}

/// Examples read from an annotation source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExampleBatch {
    pub examples: Vec<Example>,
    /// Lines that could not be turned into an example
    pub skipped: usize,
}

/// Counts reported by [`build_examples`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildSummary {
    pub examples: usize,
    pub skipped: usize,
}

/// Converts one raw annotation line into an example.
pub fn example_from_line(line: &str) -> Result<Example, MrcError> {
    let sample: RawSample = serde_json::from_str(line.trim())?;
    let answer_doc_idx = *sample
        .answer_docs
        .first()
        .ok_or_else(|| MrcError::InvalidInputError("no answer document".to_string()))?;
    let document = sample.documents.get(answer_doc_idx).ok_or_else(|| {
        MrcError::InvalidInputError(format!("answer document {answer_doc_idx} out of range"))
    })?;
    let document = RawDocument::deserialize(document)?;
    let paragraph = document
        .segmented_paragraphs
        .get(document.most_related_para)
        .ok_or_else(|| {
            MrcError::InvalidInputError(format!(
                "most related paragraph {} out of range",
                document.most_related_para
            ))
        })?;

    let title_length = document.segmented_title.len() + 1;
    let passage = paragraph.get(title_length..).unwrap_or_default().concat();

    Ok(Example {
        question_id: sample.question_id,
        question_text: sample.question.trim().to_string(),
        question_type: sample.question_type,
        passages: vec![Passage { text: passage }],
        answers: sample.answers,
    })
}

/// Reads examples from raw annotation lines. Lines failing to parse (invalid UTF-8 included) or
/// missing a required field are counted as skipped.
pub fn read_examples<R: BufRead>(reader: R) -> Result<ExampleBatch, MrcError> {
    let mut batch = ExampleBatch::default();
    for (line_idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let example = std::str::from_utf8(&line)
            .map_err(|error| MrcError::InvalidInputError(error.to_string()))
            .and_then(example_from_line);
        match example {
            Ok(example) => batch.examples.push(example),
            Err(error) => {
                debug!("skipping line {}: {}", line_idx + 1, error);
                batch.skipped += 1;
            }
        }
    }
    Ok(batch)
}

/// Writes examples as JSON lines.
pub fn write_examples<W: Write>(examples: &[Example], mut writer: W) -> Result<(), MrcError> {
    for example in examples {
        serde_json::to_writer(&mut writer, example)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads examples written by [`write_examples`].
pub fn load_examples(path: &Path) -> Result<Vec<Example>, MrcError> {
    let mut examples = vec![];
    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        if !line.trim().is_empty() {
            examples.push(serde_json::from_str(&line)?);
        }
    }
    Ok(examples)
}

/// Builds the examples of all `input_files`, in order, and writes them to `output`.
pub fn build_examples<P: AsRef<Path>>(
    input_files: &[P],
    output: &Path,
) -> Result<BuildSummary, MrcError> {
    let mut examples = vec![];
    let mut skipped = 0;
    for input_file in input_files {
        let input_file = input_file.as_ref();
        let batch = read_examples(BufReader::new(File::open(input_file)?))?;
        examples.extend(batch.examples);
        skipped += batch.skipped;
        info!(
            "{}: {} examples so far, {} lines skipped",
            input_file.display(),
            examples.len(),
            batch.skipped
        );
    }
    write_examples(&examples, BufWriter::new(File::create(output)?))?;
    info!("{} questions in total", examples.len());
    Ok(BuildSummary {
        examples: examples.len(),
        skipped,
    })
}
