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

//! # Common blocks for span decoding
//! Helpers shared by the answer selection strategies: construction of the text the probability
//! positions index into, character-level slicing, normalization and arg-max over probability
//! vectors.
use ordered_float::OrderedFloat;

/// Leading marker of the scored text, occupying position 0.
pub const SCORED_TEXT_PREFIX: char = 'p';
/// Separator placed between the question and the passage in the scored text.
pub const QUESTION_SEPARATOR: char = '。';

/// Builds the text probability positions refer to: `"p" + question + "。" + passage`.
///
/// Positions `0..=question.chars().count()` cover the marker and the question.
pub fn scored_text(question: &str, passage: &str) -> String {
    let mut text = String::with_capacity(question.len() + passage.len() + 4);
    text.push(SCORED_TEXT_PREFIX);
    text.push_str(question);
    text.push(QUESTION_SEPARATOR);
    text.push_str(passage);
    text
}

/// Characters `start..=end` of `text`, clamped at the end of the text. Returns an empty string
/// for inverted or out of range spans.
pub fn char_span(text: &str, start: usize, end: usize) -> String {
    if end < start {
        return String::new();
    }
    text.chars().skip(start).take(end - start + 1).collect()
}

/// Normalizes a vector of scores into a probability distribution.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = match logits.iter().copied().map(OrderedFloat).max() {
        Some(max) => max.0,
        None => return vec![],
    };
    let exp: Vec<f64> = logits.iter().map(|value| (value - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|value| value / sum).collect()
}

/// Position and value of the largest element; the first position wins ties.
pub fn arg_max(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, value)| OrderedFloat(**value))
        .map(|(position, value)| (position, *value))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scored_text_layout() {
        let text = scored_text("谁", "我是答案");
        assert_eq!(text, "p谁。我是答案");
        assert_eq!(char_span(&text, 3, 4), "我是");
        assert_eq!(char_span(&text, 5, 100), "答案");
        assert_eq!(char_span(&text, 100, 200), "");
        assert_eq!(char_span(&text, 4, 3), "");
    }

    #[test]
    fn softmax_normalizes() {
        let probs = softmax(&[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(probs.len(), 4);
        for prob in &probs {
            assert!((prob - 0.25).abs() < 1e-12);
        }
        let probs = softmax(&[1000.0, 0.0]);
        assert!((probs[0] - 1.0).abs() < 1e-12);
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn arg_max_prefers_first_position() {
        assert_eq!(arg_max(&[0.1, 0.7, 0.7, 0.2]), Some((1, 0.7)));
        assert_eq!(arg_max(&[]), None);
    }
}
