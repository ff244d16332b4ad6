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

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rust_mrc::pipelines::example_builder::{build_examples, load_examples};
use rust_mrc::pipelines::question_answering::{
    score_example, AnswerStrategy, FixedScorer, QuestionAnsweringConfig, QuestionAnsweringModel,
};
use rust_mrc::resources::{resource_from_location, stage_resources, ResourceProvider};
use rust_mrc::Config;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mrc-predict", about = "DuReader answer decoding and prediction export")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build prediction examples from raw annotation files
    BuildExamples(BuildExamplesArgs),
    /// Decode answers from scored examples and write predictions
    Predict(PredictArgs),
    /// Copy local or remote artifacts into the model directory
    Stage(StageArgs),
    /// Attach fixed scores to an example file (dry runs without a model)
    ScoreFixed(ScoreFixedArgs),
}

#[derive(Args, Debug)]
struct BuildExamplesArgs {
    #[arg(long, default_value = "../../data/extracted/devset/zhidao.dev.json")]
    zhidao_file: PathBuf,
    #[arg(long, default_value = "../../data/extracted/devset/search.dev.json")]
    search_file: PathBuf,
    #[arg(long, default_value = "predict.data")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Scored examples, local path or http(s) URL
    #[arg(long, default_value = "predict.data")]
    source_file: String,
    #[arg(long, default_value = "predicts.json")]
    result_file: PathBuf,
    /// JSON configuration file, overridden by the flags below
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    max_seq_length: Option<usize>,
    #[arg(long)]
    max_query_length: Option<usize>,
    #[arg(long)]
    max_answer_length: Option<usize>,
    #[arg(long)]
    max_para_num: Option<usize>,
    #[arg(long)]
    threshold: Option<f64>,
    /// multiple-answers or single-best
    #[arg(long)]
    strategy: Option<AnswerStrategy>,
}

impl PredictArgs {
    fn qa_config(&self) -> anyhow::Result<QuestionAnsweringConfig> {
        let mut config = match &self.config {
            Some(path) => QuestionAnsweringConfig::from_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => QuestionAnsweringConfig::default(),
        };
        if let Some(value) = self.max_seq_length {
            config.max_seq_length = value;
        }
        if let Some(value) = self.max_query_length {
            config.max_query_length = value;
        }
        if let Some(value) = self.max_answer_length {
            config.max_answer_length = value;
        }
        if let Some(value) = self.max_para_num {
            config.max_para_num = value;
        }
        if let Some(value) = self.threshold {
            config.threshold = value;
        }
        if let Some(value) = self.strategy {
            config.strategy = value;
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct StageArgs {
    #[arg(long, default_value = "../model_dir")]
    model_dir: PathBuf,
    /// Checkpoint file name expected in the model directory
    #[arg(long, default_value = "best_model")]
    model_name: String,
    /// Local paths or http(s) URLs
    resources: Vec<String>,
}

#[derive(Args, Debug)]
struct ScoreFixedArgs {
    #[arg(long, default_value = "predict.data")]
    examples: PathBuf,
    #[arg(long)]
    output: PathBuf,
    #[arg(long, default_value_t = 512)]
    seq_length: usize,
    #[arg(long, default_value_t = 64)]
    start_position: usize,
    #[arg(long, default_value_t = 80)]
    end_position: usize,
    #[arg(long, default_value_t = 5)]
    max_para_num: usize,
}

fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let config = args.qa_config()?;
    info!("{:?}", config);
    let qa_model = QuestionAnsweringModel::new(config)?;

    let source = resource_from_location(&args.source_file)?.get_local_path()?;
    let lines = BufReader::new(
        File::open(&source).with_context(|| format!("opening {}", source.display()))?,
    )
    .split(b'\n')
    .collect::<Result<Vec<Vec<u8>>, _>>()?;

    let progress_bar = ProgressBar::new(lines.len() as u64);
    progress_bar.set_style(ProgressStyle::with_template(
        "{bar:40} {pos}/{len} [{elapsed_precise}<{eta_precise}]",
    )?);
    let writer = BufWriter::new(
        File::create(&args.result_file)
            .with_context(|| format!("creating {}", args.result_file.display()))?,
    );
    let summary = qa_model.evaluate(progress_bar.wrap_iter(lines.into_iter()), writer)?;
    progress_bar.finish();

    info!(
        "save predicted data: {} ({} predictions, {} skipped)",
        args.result_file.display(),
        summary.predictions,
        summary.skipped
    );
    Ok(())
}

fn stage(args: StageArgs) -> anyhow::Result<()> {
    let resources = args
        .resources
        .iter()
        .map(|location| resource_from_location(location))
        .collect::<Result<Vec<Box<dyn ResourceProvider>>, _>>()?;
    let staged = stage_resources(&resources, &args.model_dir)?;
    for path in &staged {
        info!("staged {}", path.display());
    }
    if let Some(checkpoint) = missing_checkpoint(&args) {
        warn!("model checkpoint {} not found", checkpoint.display());
    }
    Ok(())
}

fn missing_checkpoint(args: &StageArgs) -> Option<PathBuf> {
    let checkpoint = args.model_dir.join(&args.model_name);
    (!checkpoint.is_file()).then_some(checkpoint)
}

fn score_fixed(args: ScoreFixedArgs) -> anyhow::Result<()> {
    let scorer = FixedScorer::peaked(args.seq_length, args.start_position, args.end_position)?;
    let examples = load_examples(&args.examples)?;
    let mut writer = BufWriter::new(File::create(&args.output)?);
    let count = examples.len();
    for example in examples {
        let scored_example = score_example(&scorer, example, args.max_para_num)?;
        serde_json::to_writer(&mut writer, &scored_example)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!("{} scored examples written to {}", count, args.output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::BuildExamples(args) => {
            let summary = build_examples(&[&args.zhidao_file, &args.search_file], &args.output)?;
            info!(
                "{} questions in total, {} lines skipped",
                summary.examples, summary.skipped
            );
        }
        Command::Predict(args) => predict(args)?,
        Command::Stage(args) => stage(args)?,
        Command::ScoreFixed(args) => score_fixed(args)?,
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use rust_mrc::pipelines::example_builder::write_examples;
    use rust_mrc::pipelines::question_answering::{Example, Passage, Prediction, QuestionId};
    use std::fs;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(args.iter().copied()).unwrap().command
    }

    #[test]
    fn flags_override_configuration_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("qa_config.json");
        fs::write(&config_path, r#"{"threshold": 0.5, "max_para_num": 3, "top_k": 2}"#)?;

        let Command::Predict(args) = parse(&[
            "mrc-predict",
            "predict",
            "--config",
            config_path.to_str().unwrap(),
            "--max-para-num",
            "2",
            "--strategy",
            "single-best",
        ]) else {
            panic!("expected the predict command");
        };
        let config = args.qa_config()?;

        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.top_k, 2);
        assert_eq!(config.max_para_num, 2);
        assert_eq!(config.strategy, AnswerStrategy::SingleBest);
        assert_eq!(config.max_seq_length, 512);
        assert_eq!(args.source_file, "predict.data");
        Ok(())
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["mrc-predict", "predict", "--strategy", "best"]).is_err());
    }

    #[test]
    fn stage_reports_missing_checkpoint() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let model_dir = dir.path().join("model_dir");
        let config_path = dir.path().join("bert_config.json");
        fs::write(&config_path, "{}")?;
        let stage_args = || StageArgs {
            model_dir: model_dir.clone(),
            model_name: "best_model".to_string(),
            resources: vec![config_path.to_string_lossy().into_owned()],
        };

        stage(stage_args())?;
        assert!(model_dir.join("bert_config.json").is_file());
        assert_eq!(
            missing_checkpoint(&stage_args()),
            Some(model_dir.join("best_model"))
        );

        fs::write(model_dir.join("best_model"), "weights")?;
        assert_eq!(missing_checkpoint(&stage_args()), None);
        Ok(())
    }

    #[test]
    fn fixed_scores_feed_predictions() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let examples_file = dir.path().join("predict.data");
        let scored_file = dir.path().join("scored.data");
        let result_file = dir.path().join("predicts.json");
        // scored text "p谁。答案是小明", answer at positions 6..=7
        let example = Example {
            question_id: QuestionId::Number(5),
            question_text: "谁".to_string(),
            question_type: "ENTITY".to_string(),
            passages: vec![Passage {
                text: "答案是小明".to_string(),
            }],
            answers: None,
        };
        write_examples(&[example], File::create(&examples_file)?)?;

        score_fixed(ScoreFixedArgs {
            examples: examples_file,
            output: scored_file.clone(),
            seq_length: 16,
            start_position: 6,
            end_position: 7,
            max_para_num: 5,
        })?;
        let Command::Predict(args) = parse(&[
            "mrc-predict",
            "predict",
            "--source-file",
            scored_file.to_str().unwrap(),
            "--result-file",
            result_file.to_str().unwrap(),
        ]) else {
            panic!("expected the predict command");
        };
        predict(args)?;

        let predictions = fs::read_to_string(&result_file)?
            .lines()
            .map(serde_json::from_str::<Prediction>)
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].answers, vec!["小明".to_string()]);
        Ok(())
    }
}
