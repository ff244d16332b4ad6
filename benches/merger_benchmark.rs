#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use rust_mrc::pipelines::question_answering::{
    AnswerStrategy, Example, Passage, QuestionAnsweringConfig, QuestionAnsweringModel, QuestionId,
    ScoredExample,
};
use std::time::{Duration, Instant};

static NUM_PASSAGES: usize = 5;
static SEQ_LENGTH: usize = 512;

fn create_scored_examples(count: usize) -> Vec<ScoredExample> {
    let passage = "北京的冬天很冷，最低气温可以达到零下十度。".repeat(24);
    (0..count)
        .map(|idx| {
            let example = Example {
                question_id: QuestionId::Number(idx as i64),
                question_text: "北京的冬天冷吗".to_string(),
                question_type: "YES_NO".to_string(),
                passages: vec![
                    Passage {
                        text: passage.clone()
                    };
                    NUM_PASSAGES
                ],
                answers: None,
            };
            let scores: Vec<Vec<f64>> = (0..NUM_PASSAGES)
                .map(|p_idx| {
                    (0..SEQ_LENGTH)
                        .map(|position| ((position * 31 + p_idx * 17 + idx) % 97) as f64 / 10.0)
                        .collect()
                })
                .collect();
            ScoredExample {
                example,
                end_probs: scores
                    .iter()
                    .map(|passage_scores| passage_scores.iter().rev().copied().collect())
                    .collect(),
                start_probs: scores,
            }
        })
        .collect()
}

fn decode(iters: u64, model: &QuestionAnsweringModel, inputs: &[ScoredExample]) -> Duration {
    let mut duration = Duration::new(0, 0);
    for _i in 0..iters {
        let start = Instant::now();
        for input in inputs {
            let _ = model.predict(input);
        }
        duration = duration.checked_add(start.elapsed()).unwrap();
    }
    duration
}

fn bench_merger(c: &mut Criterion) {
    let inputs = create_scored_examples(100);
    let merger = QuestionAnsweringModel::new(QuestionAnsweringConfig::default()).unwrap();
    let single_best = QuestionAnsweringModel::new(QuestionAnsweringConfig {
        strategy: AnswerStrategy::SingleBest,
        ..Default::default()
    })
    .unwrap();

    c.bench_function("Multiple answers decoding", |b| {
        b.iter_custom(|iters| black_box(decode(iters, &merger, &inputs)))
    });

    c.bench_function("Single best answer decoding", |b| {
        b.iter_custom(|iters| black_box(decode(iters, &single_best, &inputs)))
    });
}

criterion_group! {
name = benches;
config = Criterion::default().sample_size(20);
targets = bench_merger
}

criterion_main!(benches);
