//! Feedback Evaluation
//!
//! LLM-judged quality scores for a finished turn:
//!
//! - **Groundedness**: is the answer supported by the retrieved passages?
//! - **Answer relevance**: does the answer address the retrieval query?
//! - **Context relevance**: is each passage relevant to the query? (mean)
//!
//! Judges reply with `Score: <0-10>` plus reasons; scores are normalized to
//! 0.0-1.0. A failing judge yields `None` for its metric and never fails the
//! turn.

use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ai::completer::Completer;
use crate::ai::prompt::{Prompt, PromptBuilder};
use crate::search::Passage;
use crate::types::{ChefError, Result};

const SCORE_PATTERN: &str = r"(?i)score\s*:\s*(\d+(?:\.\d+)?)";
const MAX_SCORE: f32 = 10.0;

const JUDGE_FORMAT: &str = "Respond in exactly this format:\nScore: <integer from 0 to 10>\nReasons: <one or two sentences>";

/// Normalized feedback scores for one turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackScores {
    pub groundedness: Option<f32>,
    pub answer_relevance: Option<f32>,
    pub context_relevance: Option<f32>,
}

impl FeedbackScores {
    pub fn is_empty(&self) -> bool {
        self.groundedness.is_none()
            && self.answer_relevance.is_none()
            && self.context_relevance.is_none()
    }
}

/// Runs the three feedback judges against one completion service
#[derive(Debug, Clone)]
pub struct Evaluator {
    completer: Completer,
    score_re: Regex,
}

impl Evaluator {
    pub fn new(completer: Completer) -> Result<Self> {
        let score_re = Regex::new(SCORE_PATTERN)
            .map_err(|e| ChefError::Evaluation(format!("invalid score pattern: {}", e)))?;
        Ok(Self {
            completer,
            score_re,
        })
    }

    /// Score a finished turn. Judges run concurrently.
    pub async fn evaluate(
        &self,
        query: &str,
        passages: &[Passage],
        answer: &str,
        cancel: &CancellationToken,
    ) -> FeedbackScores {
        let groundedness = async {
            if passages.is_empty() {
                return None;
            }
            self.judge("groundedness", groundedness_prompt(passages, answer), cancel)
                .await
        };
        let answer_relevance = self.judge(
            "answer_relevance",
            answer_relevance_prompt(query, answer),
            cancel,
        );
        let context_relevance = join_all(passages.iter().map(|passage| {
            self.judge(
                "context_relevance",
                context_relevance_prompt(query, passage),
                cancel,
            )
        }));

        let (groundedness, answer_relevance, per_passage) =
            futures::join!(groundedness, answer_relevance, context_relevance);

        let scores = FeedbackScores {
            groundedness,
            answer_relevance,
            context_relevance: mean(per_passage.into_iter().flatten()),
        };
        debug!(?scores, "Feedback evaluated");
        scores
    }

    async fn judge(&self, metric: &str, prompt: Prompt, cancel: &CancellationToken) -> Option<f32> {
        let reply = match self.completer.complete(prompt.as_str(), cancel).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(metric, error = %err, "Feedback judge failed");
                return None;
            }
        };

        let score = self.parse_score(&reply);
        if score.is_none() {
            warn!(metric, "Feedback judge reply had no score");
        }
        score
    }

    /// Extract `Score: N` and normalize to 0.0-1.0
    pub fn parse_score(&self, reply: &str) -> Option<f32> {
        let captures = self.score_re.captures(reply)?;
        let raw: f32 = captures.get(1)?.as_str().parse().ok()?;
        Some(raw.clamp(0.0, MAX_SCORE) / MAX_SCORE)
    }
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, count) = values.fold((0.0f32, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f32)
}

fn render_passages(passages: &[Passage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] {}", i + 1, p.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn groundedness_prompt(passages: &[Passage], answer: &str) -> Prompt {
    PromptBuilder::new()
        .text(
            "You are grading whether a response is grounded in source material. \
             Judge how much of the response's claims are supported by the sources. \
             10 means every claim is supported; 0 means none are.",
        )
        .tagged("sources", render_passages(passages))
        .tagged("response", answer)
        .text(JUDGE_FORMAT)
        .build()
}

fn answer_relevance_prompt(query: &str, answer: &str) -> Prompt {
    PromptBuilder::new()
        .text(
            "You are grading how relevant a response is to a question. \
             10 means the response fully answers the question; 0 means it is unrelated.",
        )
        .tagged("question", query)
        .tagged("response", answer)
        .text(JUDGE_FORMAT)
        .build()
}

fn context_relevance_prompt(query: &str, passage: &Passage) -> Prompt {
    PromptBuilder::new()
        .text(
            "You are grading how relevant a retrieved passage is to a question. \
             10 means the passage is highly relevant; 0 means it is unrelated.",
        )
        .tagged("question", query)
        .tagged("context", passage.text.as_str())
        .text(JUDGE_FORMAT)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockLlm, fast_policy};
    use crate::types::Category;
    use std::sync::Arc;
    use std::time::Duration;

    fn evaluator(llm: MockLlm) -> (Evaluator, Arc<MockLlm>) {
        let llm = Arc::new(llm);
        let completer = Completer::new(llm.clone(), fast_policy(0), Duration::from_secs(1));
        (Evaluator::new(completer).unwrap(), llm)
    }

    fn passage(text: &str) -> Passage {
        Passage {
            text: text.into(),
            source_id: Some("doc.pdf".into()),
            category: Category::Snacks,
        }
    }

    #[test]
    fn test_parse_score() {
        let (evaluator, _) = evaluator(MockLlm::replying(["x"]));
        assert_eq!(evaluator.parse_score("Score: 8\nReasons: fine"), Some(0.8));
        assert_eq!(evaluator.parse_score("score:10"), Some(1.0));
        assert_eq!(evaluator.parse_score("Score: 42"), Some(1.0));
        assert_eq!(evaluator.parse_score("Score: 7.5"), Some(0.75));
        assert_eq!(evaluator.parse_score("no idea"), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean([0.5, 1.0].into_iter()), Some(0.75));
        assert_eq!(mean(std::iter::empty()), None);
    }

    #[tokio::test]
    async fn test_evaluate_all_metrics() {
        let (evaluator, llm) = evaluator(MockLlm::replying(["Score: 6\nReasons: ok"]));
        let passages = vec![passage("Nachos"), passage("Popcorn")];

        let scores = evaluator
            .evaluate("snack ideas", &passages, "Try nachos", &CancellationToken::new())
            .await;

        assert_eq!(scores.groundedness, Some(0.6));
        assert_eq!(scores.answer_relevance, Some(0.6));
        assert_eq!(scores.context_relevance, Some(0.6));
        // groundedness + answer relevance + one per passage
        assert_eq!(llm.calls(), 4);
    }

    #[tokio::test]
    async fn test_no_passages_leaves_context_metrics_empty() {
        let (evaluator, llm) = evaluator(MockLlm::replying(["Score: 9"]));
        let scores = evaluator
            .evaluate("snack ideas", &[], "Try nachos", &CancellationToken::new())
            .await;

        assert_eq!(llm.calls(), 1);
        assert_eq!(scores.groundedness, None);
        assert_eq!(scores.context_relevance, None);
        assert_eq!(scores.answer_relevance, Some(0.9));
    }

    #[tokio::test]
    async fn test_judge_failures_become_none() {
        let (evaluator, _) = evaluator(MockLlm::unauthorized());
        let scores = evaluator
            .evaluate("q", &[passage("p")], "a", &CancellationToken::new())
            .await;
        assert!(scores.is_empty());
    }
}
