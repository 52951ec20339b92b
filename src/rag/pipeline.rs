//! Query Pipeline
//!
//! Sequences one user turn through the state machine:
//!
//! ```text
//! AwaitingQuery → Windowing → (Rewriting) → Retrieving → Building → Completing → Done
//!                     └──────────── any failure ────────────→ Errored
//! ```
//!
//! Rewriting runs only when history is enabled and the window is non-empty.
//! The rewritten query drives retrieval only; the prompt always carries the
//! user's literal query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::prompt::AnswerPromptBuilder;
use super::rewriter::QueryRewriter;
use super::state::PipelineState;
use crate::ai::completer::Completer;
use crate::chat::{ConversationStore, HistoryMode, Turn, window};
use crate::config::RewriteFallback;
use crate::search::{Passage, Retriever};
use crate::types::{Category, ChefError, Result};

/// Time spent in one state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub state: PipelineState,
    pub elapsed_ms: u64,
}

/// Serializable record of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnTrace {
    pub turn_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// States in visit order, starting at `AwaitingQuery`
    pub states: Vec<PipelineState>,
    pub history_turns: usize,
    /// Query sent to the search service
    pub retrieval_query: String,
    pub rewritten: bool,
    pub rewrite_fell_back: bool,
    pub stage_ms: Vec<StageTiming>,
    pub total_ms: u64,
    pub passage_count: usize,
}

impl TurnTrace {
    fn new(turn_id: Uuid, query: &str) -> Self {
        Self {
            turn_id,
            started_at: Utc::now(),
            states: vec![PipelineState::AwaitingQuery],
            history_turns: 0,
            retrieval_query: query.to_string(),
            rewritten: false,
            rewrite_fell_back: false,
            stage_ms: Vec::new(),
            total_ms: 0,
            passage_count: 0,
        }
    }

    pub fn visited(&self, state: PipelineState) -> bool {
        self.states.contains(&state)
    }

    pub fn final_state(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::AwaitingQuery)
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub answer: String,
    /// Distinct source documents of the retrieved passages
    pub source_ids: BTreeSet<String>,
    pub passages: Vec<Passage>,
    pub trace: TurnTrace,
}

impl PipelineOutcome {
    pub fn retrieval_query(&self) -> &str {
        &self.trace.retrieval_query
    }
}

/// Tracks state transitions and per-state timings
struct Transitions {
    trace: TurnTrace,
    run_start: Instant,
    state_start: Instant,
}

impl Transitions {
    fn new(trace: TurnTrace) -> Self {
        let now = Instant::now();
        Self {
            trace,
            run_start: now,
            state_start: now,
        }
    }

    fn current(&self) -> PipelineState {
        self.trace.final_state()
    }

    fn enter(&mut self, next: PipelineState) {
        let from = self.current();
        let now = Instant::now();
        if from != PipelineState::AwaitingQuery {
            self.trace.stage_ms.push(StageTiming {
                state: from,
                elapsed_ms: now.duration_since(self.state_start).as_millis() as u64,
            });
        }
        self.state_start = now;
        self.trace.states.push(next);
        debug!(from = %from, to = %next, "State transition");
    }

    /// Annotate `err` with the current state and the run's trace, ending in `Errored`
    fn fail(&mut self, err: ChefError) -> ChefError {
        let stage = self.current();
        self.enter(PipelineState::Errored);
        self.trace.total_ms = self.run_start.elapsed().as_millis() as u64;
        if err.is_cancelled() {
            info!(stage = %stage, "Turn cancelled");
        } else {
            warn!(stage = %stage, error = %err, "Turn failed");
        }
        err.at_stage(stage).with_trace(self.trace.clone())
    }

    fn finish(mut self) -> TurnTrace {
        self.enter(PipelineState::Done);
        self.trace.total_ms = self.run_start.elapsed().as_millis() as u64;
        self.trace
    }
}

/// One-way RAG pipeline shared by every session
#[derive(Debug, Clone)]
pub struct QueryPipeline {
    retriever: Retriever,
    rewriter: QueryRewriter,
    completer: Completer,
    fallback: RewriteFallback,
}

impl QueryPipeline {
    pub fn new(
        retriever: Retriever,
        rewriter: QueryRewriter,
        completer: Completer,
        fallback: RewriteFallback,
    ) -> Self {
        Self {
            retriever,
            rewriter,
            completer,
            fallback,
        }
    }

    /// Run one turn. `store` must already end with the question in flight.
    ///
    /// Errors carry the state they occurred in and the run's trace (see
    /// `ChefError::stage` and `ChefError::trace`).
    pub async fn run(
        &self,
        store: &ConversationStore,
        query: &str,
        category: Category,
        history: HistoryMode,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        self.run_turn(Uuid::new_v4(), store, query, category, history, cancel)
            .await
    }

    #[instrument(skip_all, fields(turn_id = %turn_id, category = %category))]
    async fn run_turn(
        &self,
        turn_id: Uuid,
        store: &ConversationStore,
        query: &str,
        category: Category,
        history: HistoryMode,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        let mut tx = Transitions::new(TurnTrace::new(turn_id, query));

        tx.enter(PipelineState::Windowing);
        let recent: &[Turn] = match history {
            HistoryMode::Enabled { window: max_turns } => window(store, max_turns),
            HistoryMode::Disabled => &[],
        };
        tx.trace.history_turns = recent.len();

        if history.is_enabled() && !recent.is_empty() {
            tx.enter(PipelineState::Rewriting);
            match self.rewriter.rewrite(recent, query, cancel).await {
                Ok(rewritten) => {
                    tx.trace.retrieval_query = rewritten;
                    tx.trace.rewritten = true;
                }
                Err(err) if err.is_cancelled() => return Err(tx.fail(err)),
                Err(err) => match self.fallback {
                    RewriteFallback::RawQuery => {
                        warn!(error = %err, "Rewrite failed, retrieving with the raw query");
                        tx.trace.rewrite_fell_back = true;
                    }
                    RewriteFallback::Fail => return Err(tx.fail(err)),
                },
            }
        }

        tx.enter(PipelineState::Retrieving);
        let retrieved = match self
            .retriever
            .retrieve(&tx.trace.retrieval_query, category, cancel)
            .await
        {
            Ok(retrieved) => retrieved,
            Err(err) => return Err(tx.fail(err)),
        };
        tx.trace.passage_count = retrieved.passages.len();

        tx.enter(PipelineState::Building);
        let prompt = AnswerPromptBuilder::build(query, category, &retrieved.passages, recent);

        tx.enter(PipelineState::Completing);
        let answer = match self.completer.complete(prompt.as_str(), cancel).await {
            Ok(answer) => answer,
            Err(err) => return Err(tx.fail(err)),
        };

        let trace = tx.finish();
        info!(
            passages = trace.passage_count,
            rewritten = trace.rewritten,
            total_ms = trace.total_ms,
            "Turn completed"
        );

        Ok(PipelineOutcome {
            answer,
            source_ids: retrieved.source_ids,
            passages: retrieved.passages,
            trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::test_support::{MockLlm, MockSearch, fast_policy};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        pipeline: QueryPipeline,
        search: Arc<MockSearch>,
        rewrite_llm: Arc<MockLlm>,
        answer_llm: Arc<MockLlm>,
    }

    fn fixture(search: MockSearch, rewrite: MockLlm, answer: MockLlm) -> Fixture {
        fixture_with(search, rewrite, answer, RewriteFallback::RawQuery)
    }

    fn fixture_with(
        search: MockSearch,
        rewrite: MockLlm,
        answer: MockLlm,
        fallback: RewriteFallback,
    ) -> Fixture {
        let search = Arc::new(search);
        let rewrite_llm = Arc::new(rewrite);
        let answer_llm = Arc::new(answer);
        let timeout = Duration::from_secs(1);

        let pipeline = QueryPipeline::new(
            Retriever::new(search.clone(), &RetrievalConfig::default()),
            QueryRewriter::new(Completer::new(rewrite_llm.clone(), fast_policy(0), timeout)),
            Completer::new(answer_llm.clone(), fast_policy(1), timeout),
            fallback,
        );

        Fixture {
            pipeline,
            search,
            rewrite_llm,
            answer_llm,
        }
    }

    fn main_course_records() -> Vec<serde_json::Value> {
        (0..5)
            .map(|i| {
                json!({
                    "chunk": format!("Chicken rice bowl variant {}", i),
                    "relative_path": format!("bowl_{}.pdf", i % 2),
                    "category": "MainCourse"
                })
            })
            .collect()
    }

    fn store_with_question(prior: usize, question: &str) -> ConversationStore {
        let mut store = ConversationStore::new();
        for i in 0..prior {
            if i % 2 == 0 {
                store.append(Turn::user(format!("prior user {}", i)));
            } else {
                store.append(Turn::assistant(format!("prior assistant {}", i)));
            }
        }
        store.append(Turn::user(question));
        store
    }

    #[tokio::test]
    async fn test_history_disabled_skips_rewrite() {
        let f = fixture(
            MockSearch::returning(main_course_records()),
            MockLlm::replying(["unused"]),
            MockLlm::replying(["1. Chicken fried rice"]),
        );
        let store = store_with_question(0, "I have chicken and rice");

        let outcome = f
            .pipeline
            .run(
                &store,
                "I have chicken and rice",
                Category::MainCourse,
                HistoryMode::Disabled,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(f.rewrite_llm.calls(), 0);
        assert!(!outcome.trace.visited(PipelineState::Rewriting));
        assert_eq!(outcome.trace.final_state(), PipelineState::Done);
        assert!(outcome.passages.len() <= 3);
        assert!(outcome.passages.iter().all(|p| p.category == Category::MainCourse));
        assert!(!outcome.answer.is_empty());

        let prompt = &f.answer_llm.prompts()[0];
        assert!(prompt.contains("User Query: I have chicken and rice"));
        assert!(prompt.contains("Current Category: MainCourse"));

        let request = &f.search.requests()[0];
        assert_eq!(request.query, "I have chicken and rice");
        assert!(request.filter.is_some());
    }

    #[tokio::test]
    async fn test_rewrite_receives_seven_turn_window() {
        let f = fixture(
            MockSearch::returning(main_course_records()),
            MockLlm::replying(["chicken rice bowl cooking time"]),
            MockLlm::replying(["About 25 minutes."]),
        );
        let store = store_with_question(8, "how long does it take?");

        let outcome = f
            .pipeline
            .run(
                &store,
                "how long does it take?",
                Category::All,
                HistoryMode::Enabled { window: 7 },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.trace.history_turns, 7);
        assert!(outcome.trace.rewritten);
        assert_eq!(outcome.retrieval_query(), "chicken rice bowl cooking time");

        let rewrite_prompt = &f.rewrite_llm.prompts()[0];
        assert!(!rewrite_prompt.contains("prior user 0"));
        assert!(rewrite_prompt.contains("prior assistant 1"));
        assert!(rewrite_prompt.contains("prior assistant 7"));

        // Retrieval uses the rewrite; the prompt keeps the literal query
        assert_eq!(f.search.requests()[0].query, "chicken rice bowl cooking time");
        assert_eq!(f.search.requests()[0].filter, None);
        assert!(f.answer_llm.prompts()[0].contains("User Query: how long does it take?"));
    }

    #[tokio::test]
    async fn test_zero_results_still_completes() {
        let f = fixture(
            MockSearch::empty(),
            MockLlm::replying(["unused"]),
            MockLlm::replying(["I couldn't find a match, but try an omelette!"]),
        );
        let store = store_with_question(0, "dragon fruit");

        let outcome = f
            .pipeline
            .run(
                &store,
                "dragon fruit",
                Category::Desserts,
                HistoryMode::Enabled { window: 7 },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.passages.is_empty());
        assert!(outcome.source_ids.is_empty());
        assert!(outcome.trace.visited(PipelineState::Building));
        assert!(outcome.trace.visited(PipelineState::Completing));
        assert_eq!(f.answer_llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_search_failure_errors_at_retrieving() {
        let f = fixture(
            MockSearch::failing(),
            MockLlm::replying(["unused"]),
            MockLlm::replying(["unused"]),
        );
        let store = store_with_question(0, "pasta");

        let err = f
            .pipeline
            .run(
                &store,
                "pasta",
                Category::All,
                HistoryMode::Disabled,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineState::Retrieving));
        assert!(matches!(err.root(), ChefError::Retrieval(_)));
        assert_eq!(f.answer_llm.calls(), 0);

        let trace = err.trace().unwrap();
        assert_eq!(
            trace.states,
            vec![
                PipelineState::AwaitingQuery,
                PipelineState::Windowing,
                PipelineState::Retrieving,
                PipelineState::Errored,
            ]
        );
        assert_eq!(trace.final_state(), PipelineState::Errored);
        assert_eq!(trace.stage_ms.last().unwrap().state, PipelineState::Retrieving);
        assert_eq!(trace.retrieval_query, "pasta");
    }

    #[tokio::test]
    async fn test_stalled_search_errors_at_retrieving() {
        let search = Arc::new(MockSearch::empty().with_delay(Duration::from_secs(5)));
        let answer_llm = Arc::new(MockLlm::replying(["unused"]));
        let timeout = Duration::from_secs(1);
        let pipeline = QueryPipeline::new(
            Retriever::new(search.clone(), &RetrievalConfig::default())
                .with_timeout(Duration::from_millis(10)),
            QueryRewriter::new(Completer::new(
                Arc::new(MockLlm::replying(["unused"])),
                fast_policy(0),
                timeout,
            )),
            Completer::new(answer_llm.clone(), fast_policy(0), timeout),
            RewriteFallback::RawQuery,
        );
        let store = store_with_question(0, "stew");

        let err = pipeline
            .run(
                &store,
                "stew",
                Category::All,
                HistoryMode::Disabled,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineState::Retrieving));
        assert!(matches!(err.root(), ChefError::Retrieval(_)));
        assert_eq!(err.trace().unwrap().final_state(), PipelineState::Errored);
        assert_eq!(answer_llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_rewrite_failure_falls_back_to_raw_query() {
        let f = fixture(
            MockSearch::returning(main_course_records()),
            MockLlm::replying(["''"]),
            MockLlm::replying(["Here you go"]),
        );
        let store = store_with_question(2, "and dessert?");

        let outcome = f
            .pipeline
            .run(
                &store,
                "and dessert?",
                Category::All,
                HistoryMode::Enabled { window: 7 },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.trace.rewrite_fell_back);
        assert_eq!(f.search.requests()[0].query, "and dessert?");
    }

    #[tokio::test]
    async fn test_rewrite_failure_with_fail_policy_errors() {
        let f = fixture_with(
            MockSearch::returning(main_course_records()),
            MockLlm::unauthorized(),
            MockLlm::replying(["unused"]),
            RewriteFallback::Fail,
        );
        let store = store_with_question(2, "and dessert?");

        let err = f
            .pipeline
            .run(
                &store,
                "and dessert?",
                Category::All,
                HistoryMode::Enabled { window: 7 },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineState::Rewriting));
        assert!(matches!(err.root(), ChefError::Rewrite(_)));
        assert_eq!(f.search.calls(), 0);
    }

    #[tokio::test]
    async fn test_completion_failure_errors_at_completing() {
        let f = fixture(
            MockSearch::returning(main_course_records()),
            MockLlm::replying(["unused"]),
            MockLlm::replying(["never"]).failing_first(10),
        );
        let store = store_with_question(0, "soup");

        let err = f
            .pipeline
            .run(
                &store,
                "soup",
                Category::All,
                HistoryMode::Disabled,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineState::Completing));
        assert!(matches!(err.root(), ChefError::Completion { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_run() {
        let f = fixture(
            MockSearch::returning(main_course_records()),
            MockLlm::replying(["unused"]),
            MockLlm::replying(["late"]),
        );
        let store = store_with_question(0, "soup");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = f
            .pipeline
            .run(&store, "soup", Category::All, HistoryMode::Disabled, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.trace().unwrap().final_state(), PipelineState::Errored);
    }

    #[tokio::test]
    async fn test_trace_serializes() {
        let f = fixture(
            MockSearch::returning(main_course_records()),
            MockLlm::replying(["unused"]),
            MockLlm::replying(["ok"]),
        );
        let store = store_with_question(0, "rice");

        let outcome = f
            .pipeline
            .run(
                &store,
                "rice",
                Category::MainCourse,
                HistoryMode::Disabled,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let value = serde_json::to_value(&outcome.trace).unwrap();
        assert_eq!(
            value["states"],
            json!(["awaiting_query", "windowing", "retrieving", "building", "completing", "done"])
        );
        assert_eq!(outcome.source_ids.len(), 2);
    }
}
