//! Interactive drill loop.
//!
//! Reads one line per turn from any async buffered reader. Lines starting
//! with `:` are commands; anything else is an answer to the current item.
//! Choice items also accept the option number as shown on screen.
//! `:reset` takes an optional item number or id, so finished items can be
//! cleared and asked again.

use crate::console::Console;
use lesson_core::{
    Attempt, ExerciseKind, ExerciseRunner, IgnoreReason, ItemState, Outcome, Response,
    ScoringLedger, SubmitResult,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const HELP: &str = "Commands: :hint :again :skip :reset [n|id] :restart :review :score :q";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Quit,
    Skip,
    Hint,
    Again,
    /// Item number as shown, an item id, or the current item when empty.
    Reset(Option<String>),
    Restart,
    Review,
    Score,
    Unknown(String),
    Answer(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(name) = trimmed.strip_prefix(':') else {
            return Self::Answer(line.to_string());
        };

        let mut words = name.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let argument = words.next().map(str::to_string);

        match command.as_str() {
            "q" | "quit" => Self::Quit,
            "skip" => Self::Skip,
            "hint" => Self::Hint,
            "again" => Self::Again,
            "reset" => Self::Reset(argument),
            "restart" => Self::Restart,
            "review" => Self::Review,
            "score" => Self::Score,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

/// End-of-session figures.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total: u32,
    pub done: usize,
    pub items: usize,
    pub best_streak: u32,
    /// First wrong answer per item, oldest first.
    pub misses: Vec<Attempt>,
    /// The learner quit or input ended before every item was done.
    pub quit_early: bool,
}

/// One sitting of a lesson: a runner, its ledger and the terminal.
pub struct Session {
    runner: ExerciseRunner,
    ledger: ScoringLedger,
    console: Console,
    title: Option<String>,
    order: Vec<String>,
    /// Display position to original option index, per choice item.
    option_order: HashMap<String, Vec<usize>>,
}

impl Session {
    pub fn new(runner: ExerciseRunner, ledger: ScoringLedger, console: Console) -> Self {
        let order = runner.items().iter().map(|item| item.id.clone()).collect();
        let option_order = runner
            .items()
            .iter()
            .filter(|item| item.kind() == ExerciseKind::Choice)
            .map(|item| (item.id.clone(), (0..item.options().len()).collect()))
            .collect();

        Self {
            runner,
            ledger,
            console,
            title: None,
            order,
            option_order,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// Shuffle item order and the displayed order of choice options.
    pub fn with_shuffle<R: Rng + ?Sized>(mut self, rng: &mut R) -> Self {
        self.order.shuffle(rng);
        for order in self.option_order.values_mut() {
            order.shuffle(rng);
        }
        self
    }

    pub fn ledger(&self) -> &ScoringLedger {
        &self.ledger
    }

    pub fn runner(&self) -> &ExerciseRunner {
        &self.runner
    }

    /// Item ids in the order they are asked.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Drive the lesson until every item is done, the learner quits or input ends.
    pub async fn run<R>(&mut self, input: R) -> std::io::Result<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut cursor = 0;
        let mut quit_early = false;

        self.print_header();

        'items: while let Some(pos) = self.next_pending(cursor) {
            let id = self.order[pos].clone();
            self.show(pos, &id);

            loop {
                self.console.prompt("> ");
                let Some(line) = lines.next_line().await? else {
                    quit_early = true;
                    break 'items;
                };

                match Command::parse(&line) {
                    Command::Quit => {
                        quit_early = true;
                        break 'items;
                    }
                    Command::Skip => {
                        cursor = pos + 1;
                        continue 'items;
                    }
                    Command::Hint => {
                        if let Some(item) = self.runner.item(&id) {
                            self.console.line(format!("  Hint: {}", hint(item.expected())));
                        }
                    }
                    Command::Again => {
                        if !self.runner.speak(&id) {
                            self.console.line("  (no audio for this item)");
                        }
                    }
                    Command::Reset(target) => {
                        let Some(target_pos) = self.locate(target.as_deref(), pos) else {
                            self.console.line(format!(
                                "  No exercise {}. Use its number or id.",
                                target.unwrap_or_default()
                            ));
                            continue;
                        };
                        let target_id = self.order[target_pos].clone();
                        self.runner.reset(&mut self.ledger, &target_id);
                        self.console.line(format!(
                            "  Item reset. Score {}.",
                            self.ledger.current_total()
                        ));
                        cursor = target_pos;
                        continue 'items;
                    }
                    Command::Restart => {
                        self.runner.reset_all(&mut self.ledger);
                        self.console.line("Lesson restarted.");
                        cursor = 0;
                        continue 'items;
                    }
                    Command::Review => self.print_review(),
                    Command::Score => self.print_score(),
                    Command::Unknown(name) => {
                        self.console.line(format!("  Unknown command {name}. {HELP}"));
                    }
                    Command::Answer(text) => {
                        let Some(response) = self.response_for(&id, &text) else {
                            continue;
                        };
                        match self.runner.submit(&mut self.ledger, &id, response) {
                            SubmitResult::Checked(outcome) => {
                                self.print_similarity(&outcome);
                                if outcome.correct {
                                    cursor = pos + 1;
                                    continue 'items;
                                }
                            }
                            SubmitResult::Ignored(IgnoreReason::EmptyInput) => {}
                            SubmitResult::Ignored(reason) => {
                                tracing::debug!(item = %id, ?reason, "submission ignored");
                                cursor = pos + 1;
                                continue 'items;
                            }
                        }
                    }
                }
            }
        }

        let summary = self.summary(quit_early);
        self.print_summary(&summary);
        Ok(summary)
    }

    /// Current figures without ending the session.
    pub fn summary(&self, quit_early: bool) -> SessionSummary {
        SessionSummary {
            total: self.ledger.current_total(),
            done: self.runner.done_count(),
            items: self.runner.len(),
            best_streak: self.ledger.best_streak(),
            misses: self.runner.review_list().to_vec(),
            quit_early,
        }
    }

    fn next_pending(&self, cursor: usize) -> Option<usize> {
        let len = self.order.len();
        (0..len)
            .map(|offset| (cursor + offset) % len)
            .find(|&pos| self.runner.state(&self.order[pos]) != Some(ItemState::Locked))
    }

    /// Position in `order` for a `:reset` argument, defaulting to `current`.
    fn locate(&self, target: Option<&str>, current: usize) -> Option<usize> {
        let Some(target) = target else {
            return Some(current);
        };
        if let Ok(number) = target.parse::<usize>() {
            return number.checked_sub(1).filter(|&pos| pos < self.order.len());
        }
        self.order.iter().position(|id| id == target)
    }

    fn response_for(&self, id: &str, text: &str) -> Option<Response> {
        if let Some(order) = self.option_order.get(id) {
            if let Ok(number) = text.trim().parse::<usize>() {
                let chosen = number.checked_sub(1).and_then(|idx| order.get(idx));
                return match chosen {
                    Some(&original) => Some(Response::Chosen(original)),
                    None => {
                        self.console
                            .line(format!("  Pick a number from 1 to {}.", order.len()));
                        None
                    }
                };
            }
        }
        Some(Response::from(text))
    }

    fn print_header(&self) {
        if let Some(title) = &self.title {
            self.console.line(title);
        }
        let remaining = self.runner.len() - self.runner.done_count();
        self.console.line(format!(
            "{} exercises, {} to go. {HELP}",
            self.runner.len(),
            remaining
        ));
        if self.runner.completion_bonus() > 0 {
            self.console.line(format!(
                "Finish them all for a +{} bonus.",
                self.runner.completion_bonus()
            ));
        }
    }

    fn show(&mut self, pos: usize, id: &str) {
        let Some((prompt, kind, options)) = self
            .runner
            .present(id)
            .map(|item| (item.prompt.clone(), item.kind(), item.options().to_vec()))
        else {
            return;
        };

        self.console.line("");
        self.console
            .line(format!("[{}/{}] {}", pos + 1, self.order.len(), prompt));

        match kind {
            ExerciseKind::Choice => {
                let shown = self.option_order.get(id).map(Vec::as_slice).unwrap_or_default();
                for (n, &original) in shown.iter().enumerate() {
                    if let Some(option) = options.get(original) {
                        self.console.line(format!("  {}. {}", n + 1, option));
                    }
                }
            }
            ExerciseKind::Spoken => {
                self.console.line("  Type what you would say. :again replays the audio.");
            }
            ExerciseKind::Typed => {}
        }
    }

    fn print_similarity(&self, outcome: &Outcome) {
        if let (Some(score), Some(band)) = (outcome.similarity, outcome.band) {
            self.console
                .line(format!("  Similarity {score}% ({})", band.label()));
        }
    }

    fn print_review(&self) {
        let review = self.runner.review_list();
        if review.is_empty() {
            self.console.line("  Nothing to review yet.");
            return;
        }
        for miss in review {
            let expected = self
                .runner
                .item(&miss.item_id)
                .map(|item| item.expected().to_string())
                .unwrap_or_default();
            self.console.line(format!(
                "  {}: you wrote \"{}\", expected \"{}\"",
                miss.item_id, miss.submitted, expected
            ));
        }
    }

    fn print_score(&self) {
        self.console.line(format!(
            "  Score {}, streak {}, {}/{} done",
            self.ledger.current_total(),
            self.ledger.streak(),
            self.runner.done_count(),
            self.runner.len()
        ));
    }

    fn print_summary(&self, summary: &SessionSummary) {
        self.console.line("");
        self.console.line(if summary.quit_early {
            "Session ended."
        } else {
            "All exercises done!"
        });
        self.console.line(format!("  Score: {}", summary.total));
        self.console
            .line(format!("  Completed: {}/{}", summary.done, summary.items));
        self.console
            .line(format!("  Best streak: {}", summary.best_streak));
        if !summary.misses.is_empty() {
            self.console.line("  To review:");
            self.print_review();
        }
    }
}

/// Mask an answer, keeping the first letter of each word.
fn hint(expected: &str) -> String {
    expected
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => std::iter::once(first)
                    .chain(chars.map(|c| if c.is_alphanumeric() { '_' } else { c }))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
