//! Chat Command
//!
//! Line-oriented chat loop on stdin.
//!
//! Usage:
//!   souschef chat [--category C] [--no-history] [--trace] [--evaluate]
//!
//! Ctrl-C cancels the turn in flight; at the prompt it exits.

use std::future::Future;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::chat::{ChatSession, HistoryMode};
use crate::cli::AppContext;
use crate::cli::ui::Output;
use crate::links::resolve_links;
use crate::rag::PipelineOutcome;
use crate::types::{Category, ChefError, Result};

const HELP: &str = "Commands:
  /category <name>   switch category (Snacks, Beverages, MainCourse, Salads, Desserts, Appetizers, ALL)
  /history on|off    toggle use of chat history
  /reset             start over
  /help              show this help
  /quit              exit";

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub category: Option<Category>,
    pub no_history: bool,
    pub trace: bool,
    pub evaluate: bool,
}

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Query(String),
    Category(Category),
    History(bool),
    Reset,
    Help,
    Quit,
    Invalid(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Input::Query(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name.to_lowercase().as_str() {
            "category" | "c" => match arg.parse() {
                Ok(category) => Input::Category(category),
                Err(e) => Input::Invalid(e),
            },
            "history" => match arg.to_lowercase().as_str() {
                "on" => Input::History(true),
                "off" => Input::History(false),
                _ => Input::Invalid("Usage: /history on|off".into()),
            },
            "reset" | "clear" => Input::Reset,
            "help" | "?" => Input::Help,
            "quit" | "exit" | "q" => Input::Quit,
            other => Input::Invalid(format!("Unknown command '/{}'. Type /help.", other)),
        }
    }
}

pub async fn run(ctx: &AppContext, options: ChatOptions) -> Result<()> {
    let out = Output::new();
    let mut session = ChatSession::new(
        ctx.category(options.category),
        ctx.history_mode(options.no_history),
    );
    let evaluate = options.evaluate || ctx.evaluate_by_default();
    debug!(session = %session.id(), "Chat session started");

    out.header("Food Recipe Assistant");
    if let Some(welcome) = session.store().last() {
        out.assistant(welcome.content());
    }
    out.info("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        out.prompt(session.category().as_str());

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match Input::parse(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Invalid(message) => out.warning(&message),
            Input::Reset => {
                session.reset();
                if let Some(welcome) = session.store().last() {
                    out.assistant(welcome.content());
                }
            }
            Input::History(enabled) => {
                session.set_history(HistoryMode::from_flag(
                    enabled,
                    ctx.config.chat.slide_window,
                ));
                out.info(if enabled {
                    "Chat history on"
                } else {
                    "Chat history off"
                });
            }
            Input::Category(category) => {
                if session.select_category(category)
                    && let Some(notice) = session.store().last()
                {
                    out.assistant(notice.content());
                }
            }
            Input::Query(query) => {
                let cancel = CancellationToken::new();
                interruptible(ctrl_c(), &cancel, async {
                    match session.submit(&ctx.pipeline, &query, &cancel).await {
                        Ok(outcome) => {
                            present(ctx, &out, &outcome, options.trace, evaluate, &cancel).await
                        }
                        Err(err) => report(&out, &err, options.trace),
                    }
                })
                .await;
            }
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
pub(crate) async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Drive `turn` to completion, cancelling `cancel` if `signal` fires first.
///
/// The watcher lives until `turn` returns, so every stage of the turn
/// (answer, links, scoring) observes the signal.
pub(crate) async fn interruptible<S, F>(signal: S, cancel: &CancellationToken, turn: F) -> F::Output
where
    S: Future<Output = ()> + Send + 'static,
    F: Future,
{
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            signal.await;
            cancel.cancel();
        })
    };

    let output = turn.await;
    watcher.abort();
    output
}

/// Print the answer, its related recipe links, and optional diagnostics
pub(crate) async fn present(
    ctx: &AppContext,
    out: &Output,
    outcome: &PipelineOutcome,
    show_trace: bool,
    evaluate: bool,
    cancel: &CancellationToken,
) {
    out.assistant(&outcome.answer);

    let links = resolve_links(ctx.links.as_ref(), &outcome.source_ids, cancel).await;
    out.links(&links);

    if show_trace {
        out.trace(&outcome.trace);
    }
    if evaluate {
        let scores = ctx
            .evaluator
            .evaluate(
                outcome.retrieval_query(),
                &outcome.passages,
                &outcome.answer,
                cancel,
            )
            .await;
        out.scores(&scores);
    }
}

/// Show a failed turn, with its trace when requested; the session stays usable
pub(crate) fn report(out: &Output, err: &ChefError, show_trace: bool) {
    if err.is_cancelled() {
        out.warning("Cancelled.");
    } else {
        let message = match err.root() {
            ChefError::Retrieval(_) => "I couldn't reach the recipe collection just now.",
            ChefError::Rewrite(_) => "I couldn't make sense of that follow-up.",
            ChefError::Completion { .. } => "I couldn't come up with an answer just now.",
            _ => "Something went wrong.",
        };
        out.error(&format!("{} ({})", message, err));
    }

    if show_trace && let Some(trace) = err.trace() {
        out.trace(trace);
    }
}
