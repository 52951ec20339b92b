use console::style;

use crate::eval::FeedbackScores;
use crate::links::DocumentLink;
use crate::rag::TurnTrace;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Assistant message
    pub fn assistant(&self, message: &str) {
        println!("\n{} {}\n", style("👨‍🍳 Ali:").cyan().bold(), message);
    }

    /// Input prompt, printed without a newline
    pub fn prompt(&self, category: &str) {
        use std::io::Write;
        print!("{} ", style(format!("[{}] you>", category)).green().bold());
        let _ = std::io::stdout().flush();
    }

    pub fn links(&self, links: &[DocumentLink]) {
        if links.is_empty() {
            return;
        }
        self.section("Related recipes");
        for link in links {
            println!("  {}", link);
        }
    }

    pub fn trace(&self, trace: &TurnTrace) {
        self.section("Trace");
        let states: Vec<&str> = trace.states.iter().map(|s| s.as_str()).collect();
        println!("  {} {}", style("states:").dim(), states.join(" → "));
        println!("  {} {}", style("retrieval query:").dim(), trace.retrieval_query);
        if trace.rewrite_fell_back {
            println!("  {} raw query (rewrite failed)", style("fallback:").dim());
        }
        println!(
            "  {} {} passages, {} history turns, {} ms",
            style("stats:").dim(),
            trace.passage_count,
            trace.history_turns,
            trace.total_ms
        );
    }

    pub fn scores(&self, scores: &FeedbackScores) {
        self.section("Feedback");
        let fmt = |score: Option<f32>| match score {
            Some(v) => format!("{:.2}", v),
            None => style("n/a").dim().to_string(),
        };
        println!("  Groundedness:      {}", fmt(scores.groundedness));
        println!("  Answer Relevance:  {}", fmt(scores.answer_relevance));
        println!("  Context Relevance: {}", fmt(scores.context_relevance));
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
