//! Exercise runner: drives each item through Unanswered -> Checked -> Locked.
//!
//! The runner never owns the score. Callers pass the [`ScoringLedger`] into
//! every operation that can change it, so one ledger stays the single source
//! of truth for a lesson.

use crate::error::ConfigError;
use crate::hooks::{Feedback, FeedbackSink, SpeechRequest, SpeechSink};
use crate::ledger::{completion_ratio, ScoringLedger};
use crate::matching::{best_similarity, exact_match, normalize};
use crate::types::{
    AnswerKey, Attempt, ExerciseItem, ItemState, LessonSettings, Outcome, Response,
    SimilarityBand, Thresholds,
};
use std::collections::HashMap;

/// Achievement key for the lesson completion bonus.
pub const COMPLETION_KEY: &str = "lesson-complete";

/// Why a submission produced no outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Blank or punctuation-only input; the host should prompt again.
    EmptyInput,
    UnknownItem,
    Locked,
    /// An option index was sent to an item without options.
    NotAChoiceItem,
    OptionOutOfRange,
}

/// Result of [`ExerciseRunner::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    Checked(Outcome),
    Ignored(IgnoreReason),
}

impl SubmitResult {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Checked(outcome) => Some(outcome),
            Self::Ignored(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Progress {
    state: ItemState,
    attempts: u32,
}

struct Check {
    correct: bool,
    similarity: Option<u8>,
    band: Option<SimilarityBand>,
}

/// Runs a lesson's exercise items against a scoring ledger.
pub struct ExerciseRunner {
    items: Vec<ExerciseItem>,
    index: HashMap<String, usize>,
    progress: Vec<Progress>,
    review: Vec<Attempt>,
    clock: u64,
    completion_bonus: u32,
    thresholds: Thresholds,
    feedback: Option<Box<dyn FeedbackSink>>,
    speech: Option<Box<dyn SpeechSink>>,
}

impl std::fmt::Debug for ExerciseRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExerciseRunner")
            .field("items", &self.items.len())
            .field("done", &self.done_count())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl ExerciseRunner {
    pub fn new(settings: &LessonSettings) -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            progress: Vec::new(),
            review: Vec::new(),
            clock: 0,
            completion_bonus: 0,
            thresholds: settings.thresholds,
            feedback: None,
            speech: None,
        }
    }

    /// Build a runner from authored items.
    ///
    /// Invalid items are returned as errors and left out; the rest keep
    /// their authoring order.
    pub fn load(
        items: impl IntoIterator<Item = ExerciseItem>,
        settings: &LessonSettings,
    ) -> (Self, Vec<ConfigError>) {
        let mut runner = Self::new(settings);
        let mut rejected = Vec::new();

        for item in items {
            if let Err(e) = runner.add_item(item) {
                tracing::warn!(item = e.item_id().unwrap_or_default(), error = %e, "exercise item rejected");
                rejected.push(e);
            }
        }

        (runner, rejected)
    }

    /// Validate and append one item.
    pub fn add_item(&mut self, item: ExerciseItem) -> Result<(), ConfigError> {
        item.validate()?;
        if item.id == COMPLETION_KEY {
            return Err(ConfigError::ReservedId { id: item.id });
        }
        if self.index.contains_key(&item.id) {
            return Err(ConfigError::DuplicateId { id: item.id });
        }

        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        self.progress.push(Progress::default());
        Ok(())
    }

    /// Points awarded once when every item is locked. Zero disables the bonus.
    pub fn with_completion_bonus(mut self, bonus: u32) -> Self {
        self.completion_bonus = bonus;
        self
    }

    pub fn set_feedback_sink(&mut self, sink: Box<dyn FeedbackSink>) {
        self.feedback = Some(sink);
    }

    pub fn set_speech_sink(&mut self, sink: Box<dyn SpeechSink>) {
        self.speech = Some(sink);
    }

    /// Check a response, score it and move the item to its next state.
    pub fn submit(
        &mut self,
        ledger: &mut ScoringLedger,
        item_id: &str,
        response: impl Into<Response>,
    ) -> SubmitResult {
        let response = response.into();
        let Some(&idx) = self.index.get(item_id) else {
            return SubmitResult::Ignored(IgnoreReason::UnknownItem);
        };
        if self.progress[idx].state == ItemState::Locked {
            return SubmitResult::Ignored(IgnoreReason::Locked);
        }

        let check = match self.check(idx, &response) {
            Ok(check) => check,
            Err(reason) => return SubmitResult::Ignored(reason),
        };

        self.clock += 1;
        let item = &self.items[idx];
        let progress = &mut self.progress[idx];
        progress.attempts += 1;

        let points_awarded = if check.correct {
            let points = if progress.attempts == 1 {
                item.points
            } else {
                item.retry_points
            };
            let awarded = if ledger.award(&item.id, points) { points } else { 0 };
            progress.state = ItemState::Locked;
            awarded
        } else {
            progress.state = ItemState::Checked;
            ledger.break_streak();
            if !self.review.iter().any(|a| a.item_id == item.id) {
                self.review.push(Attempt {
                    item_id: item.id.clone(),
                    submitted: submitted_text(item, &response),
                    seq: self.clock,
                    correct: false,
                });
            }
            0
        };

        let outcome = Outcome {
            item_id: item.id.clone(),
            correct: check.correct,
            explanation: item.explanation.clone(),
            expected: item.expected().to_string(),
            points_awarded,
            attempt: progress.attempts,
            similarity: check.similarity,
            band: check.band,
        };

        tracing::debug!(
            item = %outcome.item_id,
            kind = item.kind().as_str(),
            correct = outcome.correct,
            points = outcome.points_awarded,
            attempt = outcome.attempt,
            "answer checked"
        );

        if check.correct && self.completion_bonus > 0 && self.is_complete() {
            if ledger.award_bonus(COMPLETION_KEY, self.completion_bonus) {
                tracing::info!(bonus = self.completion_bonus, "lesson complete");
            }
        }

        self.emit_feedback(ledger, &outcome);
        SubmitResult::Checked(outcome)
    }

    /// Return an item to Unanswered and take back the points it earned.
    /// The ledger knows the earned amount. Items restored from a snapshot
    /// without per-key points give back their first-try points.
    ///
    /// Returns false for unknown ids.
    pub fn reset(&mut self, ledger: &mut ScoringLedger, item_id: &str) -> bool {
        let Some(&idx) = self.index.get(item_id) else {
            return false;
        };

        let item = &self.items[idx];
        let progress = std::mem::take(&mut self.progress[idx]);
        if progress.state == ItemState::Locked {
            ledger.revoke(&item.id, item.points);
            if self.completion_bonus > 0 {
                ledger.revoke(COMPLETION_KEY, self.completion_bonus);
            }
        }
        self.review.retain(|a| a.item_id != item_id);
        true
    }

    /// Return every item to Unanswered and clear the ledger.
    pub fn reset_all(&mut self, ledger: &mut ScoringLedger) {
        for progress in &mut self.progress {
            *progress = Progress::default();
        }
        self.review.clear();
        ledger.reset();
    }

    /// Lock every item the ledger already credits, e.g. after restoring a snapshot.
    pub fn restore_from(&mut self, ledger: &ScoringLedger) {
        for (item, progress) in self.items.iter().zip(self.progress.iter_mut()) {
            if ledger.is_awarded(&item.id) {
                progress.state = ItemState::Locked;
            }
        }
    }

    /// Look up an item for display and fire its speech request, if any.
    pub fn present(&mut self, item_id: &str) -> Option<&ExerciseItem> {
        let idx = *self.index.get(item_id)?;
        self.speak(item_id);
        self.items.get(idx)
    }

    /// Ask the speech collaborator to read the item's audio text.
    ///
    /// Returns true if a request was handed off. Failures are logged only.
    pub fn speak(&mut self, item_id: &str) -> bool {
        let Some(speech) = self.item(item_id).and_then(|item| item.speech.clone()) else {
            return false;
        };
        let Some(sink) = self.speech.as_mut() else {
            return false;
        };

        let request = SpeechRequest {
            text: speech.text,
            accent: speech.accent,
        };
        match sink.speak(&request) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(item = item_id, error = %e, "speech request failed");
                false
            }
        }
    }

    pub fn items(&self) -> &[ExerciseItem] {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> Option<&ExerciseItem> {
        self.index.get(item_id).map(|&idx| &self.items[idx])
    }

    pub fn state(&self, item_id: &str) -> Option<ItemState> {
        self.index.get(item_id).map(|&idx| self.progress[idx].state)
    }

    pub fn attempts(&self, item_id: &str) -> u32 {
        self.index
            .get(item_id)
            .map_or(0, |&idx| self.progress[idx].attempts)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn done_count(&self) -> usize {
        self.progress
            .iter()
            .filter(|p| p.state == ItemState::Locked)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.done_count() == self.items.len()
    }

    pub fn completion_ratio(&self) -> f64 {
        completion_ratio(self.done_count(), self.items.len())
    }

    /// First incorrect attempt per item, in the order they happened.
    pub fn review_list(&self) -> &[Attempt] {
        &self.review
    }

    pub fn completion_bonus(&self) -> u32 {
        self.completion_bonus
    }

    fn check(&self, idx: usize, response: &Response) -> Result<Check, IgnoreReason> {
        let item = &self.items[idx];

        if let Response::Typed(text) = response {
            if normalize(text).is_empty() {
                return Err(IgnoreReason::EmptyInput);
            }
        }

        let check = match (&item.answer, response) {
            (AnswerKey::Typed { accepted }, Response::Typed(text)) => Check {
                correct: exact_match(text, accepted),
                similarity: None,
                band: None,
            },
            (AnswerKey::Choice { options, correct }, Response::Chosen(choice)) => {
                if *choice >= options.len() {
                    return Err(IgnoreReason::OptionOutOfRange);
                }
                Check {
                    correct: choice == correct,
                    similarity: None,
                    band: None,
                }
            }
            (AnswerKey::Choice { options, correct }, Response::Typed(text)) => Check {
                correct: exact_match(text, &options[*correct..=*correct]),
                similarity: None,
                band: None,
            },
            (AnswerKey::Spoken { accepted, threshold }, Response::Typed(text)) => {
                let score = best_similarity(text, accepted).map_or(0, |(_, score)| score);
                Check {
                    correct: score >= *threshold,
                    similarity: Some(score),
                    band: Some(self.thresholds.band(score)),
                }
            }
            (_, Response::Chosen(_)) => return Err(IgnoreReason::NotAChoiceItem),
        };
        Ok(check)
    }

    fn emit_feedback(&mut self, ledger: &ScoringLedger, outcome: &Outcome) {
        let ratio = self.completion_ratio();
        if let Some(sink) = self.feedback.as_mut() {
            sink.feedback(&Feedback {
                item_id: outcome.item_id.clone(),
                correct: outcome.correct,
                explanation: outcome.explanation.clone(),
                points_awarded: outcome.points_awarded,
                running_total: ledger.current_total(),
                completion_ratio: ratio,
            });
        }
    }
}

fn submitted_text(item: &ExerciseItem, response: &Response) -> String {
    match response {
        Response::Typed(text) => text.trim().to_string(),
        Response::Chosen(idx) => item.options().get(*idx).cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpeechError;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sent_item() -> ExerciseItem {
        ExerciseItem::typed("sent-1", "Yesterday I ___ the report. (send)", ["sent"])
            .with_explanation("Send is irregular: send, sent, sent.")
    }

    fn runner_with(items: Vec<ExerciseItem>) -> ExerciseRunner {
        let (runner, rejected) = ExerciseRunner::load(items, &LessonSettings::default());
        assert!(rejected.is_empty(), "unexpected rejections: {rejected:?}");
        runner
    }

    fn outcome(result: SubmitResult) -> Outcome {
        match result {
            SubmitResult::Checked(outcome) => outcome,
            SubmitResult::Ignored(reason) => panic!("submission ignored: {reason:?}"),
        }
    }

    #[test]
    fn first_try_bonus() {
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![sent_item()]);

        let result = outcome(runner.submit(&mut ledger, "sent-1", "sent"));
        assert!(result.correct);
        assert_eq!(result.points_awarded, 2);
        assert_eq!(result.attempt, 1);
        assert_eq!(ledger.current_total(), 2);
        assert_eq!(runner.state("sent-1"), Some(ItemState::Locked));
    }

    #[test]
    fn retry_penalty_then_reset_reverses_score() {
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![sent_item()]);

        outcome(runner.submit(&mut ledger, "sent-1", "sent"));
        assert!(runner.reset(&mut ledger, "sent-1"));
        assert_eq!(ledger.current_total(), 0);
        assert_eq!(runner.state("sent-1"), Some(ItemState::Unanswered));

        let wrong = outcome(runner.submit(&mut ledger, "sent-1", "send"));
        assert!(!wrong.correct);
        assert_eq!(wrong.points_awarded, 0);
        assert_eq!(wrong.explanation, "Send is irregular: send, sent, sent.");
        assert_eq!(wrong.expected, "sent");
        assert_eq!(runner.state("sent-1"), Some(ItemState::Checked));

        let right = outcome(runner.submit(&mut ledger, "sent-1", "sent"));
        assert!(right.correct);
        assert_eq!(right.points_awarded, 1);
        assert_eq!(ledger.current_total(), 1);

        assert!(runner.reset(&mut ledger, "sent-1"));
        assert_eq!(ledger.current_total(), 0);
        assert!(!ledger.is_awarded("sent-1"));
        assert_eq!(runner.state("sent-1"), Some(ItemState::Unanswered));
        assert_eq!(runner.attempts("sent-1"), 0);
    }

    #[test]
    fn item_points_override_defaults() {
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![
            ExerciseItem::typed("a", "Prompt", ["yes"]).with_points(5, 3),
            ExerciseItem::typed("b", "Prompt", ["yes"]).with_points(5, 3),
        ]);

        outcome(runner.submit(&mut ledger, "a", "yes"));
        outcome(runner.submit(&mut ledger, "b", "no"));
        let retry = outcome(runner.submit(&mut ledger, "b", "yes"));
        assert_eq!(retry.points_awarded, 3);
        assert_eq!(ledger.current_total(), 8);
    }

    #[test]
    fn locked_item_ignores_resubmission() {
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![sent_item()]);

        outcome(runner.submit(&mut ledger, "sent-1", "sent"));
        assert_eq!(
            runner.submit(&mut ledger, "sent-1", "sent"),
            SubmitResult::Ignored(IgnoreReason::Locked)
        );
        assert_eq!(ledger.current_total(), 2);
    }

    #[test]
    fn blank_input_is_ignored_without_state_change() {
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![sent_item()]);

        for input in ["", "   ", "\t\n", "?!"] {
            assert_eq!(
                runner.submit(&mut ledger, "sent-1", input),
                SubmitResult::Ignored(IgnoreReason::EmptyInput)
            );
        }
        assert_eq!(runner.state("sent-1"), Some(ItemState::Unanswered));
        assert_eq!(runner.attempts("sent-1"), 0);
    }

    #[test]
    fn unknown_item_is_ignored() {
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![sent_item()]);
        assert_eq!(
            runner.submit(&mut ledger, "nope", "sent"),
            SubmitResult::Ignored(IgnoreReason::UnknownItem)
        );
        assert!(!runner.reset(&mut ledger, "nope"));
    }

    #[test]
    fn configuration_rejection_keeps_item_out() {
        let items = vec![
            ExerciseItem::typed("empty", "No answers", Vec::<String>::new()),
            sent_item(),
            ExerciseItem::choice("mc-bad", "Pick", ["a", "b"], 5),
            ExerciseItem::typed("sent-1", "Again", ["sent"]),
            ExerciseItem::typed(COMPLETION_KEY, "Reserved", ["x"]),
        ];
        let (runner, rejected) = ExerciseRunner::load(items, &LessonSettings::default());

        assert_eq!(runner.len(), 1);
        assert!(runner.item("empty").is_none());
        assert_eq!(
            rejected,
            vec![
                ConfigError::NoAcceptedAnswer { id: "empty".into() },
                ConfigError::OptionOutOfRange {
                    id: "mc-bad".into(),
                    index: 5,
                    len: 2
                },
                ConfigError::DuplicateId { id: "sent-1".into() },
                ConfigError::ReservedId {
                    id: COMPLETION_KEY.into()
                },
            ]
        );
    }

    #[test]
    fn alternate_phrasings_score_identically() {
        let item = ExerciseItem::typed(
            "recv",
            "I ___ your parcel yet.",
            ["haven't received", "have not received"],
        );
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![item]);

        let result = outcome(runner.submit(&mut ledger, "recv", "Have not received."));
        assert!(result.correct);
        assert_eq!(result.points_awarded, 2);
        assert_eq!(result.expected, "haven't received");
    }

    #[test]
    fn choice_by_index_and_by_text() {
        let items = vec![
            ExerciseItem::choice("mc-1", "Pick", ["I have went", "I went"], 1),
            ExerciseItem::choice("mc-2", "Pick", ["goes", "go"], 0),
        ];
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(items);

        assert_eq!(
            runner.submit(&mut ledger, "mc-1", Response::Chosen(7)),
            SubmitResult::Ignored(IgnoreReason::OptionOutOfRange)
        );
        let wrong = outcome(runner.submit(&mut ledger, "mc-1", Response::Chosen(0)));
        assert!(!wrong.correct);
        let right = outcome(runner.submit(&mut ledger, "mc-1", Response::Chosen(1)));
        assert_eq!(right.points_awarded, 1);

        let typed = outcome(runner.submit(&mut ledger, "mc-2", "Goes"));
        assert!(typed.correct);
        assert_eq!(ledger.current_total(), 3);

        assert_eq!(runner.review_list().len(), 1);
        assert_eq!(runner.review_list()[0].submitted, "I have went");
    }

    #[test]
    fn chosen_response_rejected_for_typed_item() {
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![sent_item()]);
        assert_eq!(
            runner.submit(&mut ledger, "sent-1", Response::Chosen(0)),
            SubmitResult::Ignored(IgnoreReason::NotAChoiceItem)
        );
    }

    #[test]
    fn spoken_item_uses_similarity_threshold() {
        let item = ExerciseItem::spoken(
            "say-1",
            "Repeat after me.",
            ["Could you send me the invoice, please?"],
            80,
        );
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![item]);

        let far = outcome(runner.submit(&mut ledger, "say-1", "could you"));
        assert!(!far.correct);
        assert_eq!(far.band, Some(SimilarityBand::Retry));

        let near = outcome(runner.submit(&mut ledger, "say-1", "could you send me the invoice pleas"));
        assert!(near.correct);
        assert!(near.similarity.unwrap() >= 80);
        assert_eq!(near.band, Some(SimilarityBand::Close));
        assert_eq!(near.points_awarded, 1);
    }

    #[test]
    fn wrong_answer_breaks_streak_and_logs_first_miss_once() {
        let items = vec![
            sent_item(),
            ExerciseItem::typed("went-1", "I ___ home. (go)", ["went"]),
        ];
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(items);

        outcome(runner.submit(&mut ledger, "sent-1", "sent"));
        assert_eq!(ledger.streak(), 1);

        outcome(runner.submit(&mut ledger, "went-1", "goed"));
        outcome(runner.submit(&mut ledger, "went-1", "gone"));
        assert_eq!(ledger.streak(), 0);

        let review = runner.review_list();
        assert_eq!(review.len(), 1);
        assert_eq!(review[0].item_id, "went-1");
        assert_eq!(review[0].submitted, "goed");
        assert_eq!(review[0].seq, 2);
    }

    #[test]
    fn completion_ratio_tracks_locked_items() {
        let items: Vec<ExerciseItem> = (0..8)
            .map(|i| ExerciseItem::typed(format!("item-{i}"), "Prompt", ["yes"]))
            .collect();
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(items);

        for i in 0..6 {
            outcome(runner.submit(&mut ledger, &format!("item-{i}"), "yes"));
        }
        assert_eq!(runner.done_count(), 6);
        assert_eq!(runner.completion_ratio(), 0.75);
        assert!(!runner.is_complete());
    }

    #[test]
    fn completion_bonus_awarded_once() {
        let items = vec![
            sent_item(),
            ExerciseItem::typed("went-1", "I ___ home. (go)", ["went"]),
        ];
        let (runner, _) = ExerciseRunner::load(items, &LessonSettings::default());
        let mut runner = runner.with_completion_bonus(3);
        let mut ledger = ScoringLedger::new();

        outcome(runner.submit(&mut ledger, "sent-1", "sent"));
        assert!(!ledger.is_awarded(COMPLETION_KEY));
        outcome(runner.submit(&mut ledger, "went-1", "went"));
        assert!(ledger.is_awarded(COMPLETION_KEY));
        assert_eq!(ledger.current_total(), 7);
        assert_eq!(ledger.streak(), 2);

        runner.reset(&mut ledger, "went-1");
        assert!(!ledger.is_awarded(COMPLETION_KEY));
        assert_eq!(ledger.current_total(), 2);
    }

    #[test]
    fn reset_all_returns_everything_to_unanswered() {
        let items = vec![
            sent_item(),
            ExerciseItem::typed("went-1", "I ___ home. (go)", ["went"]),
        ];
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(items);

        outcome(runner.submit(&mut ledger, "sent-1", "sent"));
        outcome(runner.submit(&mut ledger, "went-1", "goed"));
        runner.reset_all(&mut ledger);

        assert_eq!(ledger.current_total(), 0);
        assert!(runner.review_list().is_empty());
        assert_eq!(runner.state("sent-1"), Some(ItemState::Unanswered));
        assert_eq!(runner.state("went-1"), Some(ItemState::Unanswered));
    }

    #[test]
    fn restore_locks_awarded_items() {
        let mut ledger = ScoringLedger::new();
        ledger.restore(&crate::types::ScoreSnapshot {
            awarded_keys: vec!["sent-1".into()],
            total: 2,
            streak: 1,
            points: Default::default(),
        });
        let mut runner = runner_with(vec![sent_item()]);
        runner.restore_from(&ledger);

        assert_eq!(runner.state("sent-1"), Some(ItemState::Locked));
        assert!(runner.reset(&mut ledger, "sent-1"));
        assert_eq!(ledger.current_total(), 0);
    }

    #[test]
    fn reset_after_restore_takes_back_retry_points() {
        let items = || {
            vec![
                sent_item(),
                ExerciseItem::typed("went-1", "I ___ home. (go)", ["went"]),
            ]
        };
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(items());
        outcome(runner.submit(&mut ledger, "sent-1", "sent"));
        outcome(runner.submit(&mut ledger, "went-1", "goed"));
        outcome(runner.submit(&mut ledger, "went-1", "went"));
        let saved = ledger.snapshot();
        assert_eq!(saved.total, 3);

        let mut ledger = ScoringLedger::new();
        ledger.restore(&saved);
        let mut runner = runner_with(items());
        runner.restore_from(&ledger);

        assert!(runner.reset(&mut ledger, "went-1"));
        assert_eq!(ledger.current_total(), 2);
        assert_eq!(runner.state("went-1"), Some(ItemState::Unanswered));
        assert_eq!(runner.state("sent-1"), Some(ItemState::Locked));
    }

    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<Feedback>>>);

    impl FeedbackSink for Captured {
        fn feedback(&mut self, feedback: &Feedback) {
            self.0.borrow_mut().push(feedback.clone());
        }
    }

    #[test]
    fn feedback_emitted_once_per_checked_submit() {
        let captured = Captured::default();
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![
            sent_item(),
            ExerciseItem::typed("went-1", "I ___ home. (go)", ["went"]),
        ]);
        runner.set_feedback_sink(Box::new(captured.clone()));

        runner.submit(&mut ledger, "sent-1", "");
        runner.submit(&mut ledger, "sent-1", "send");
        runner.submit(&mut ledger, "sent-1", "sent");
        runner.submit(&mut ledger, "sent-1", "sent");

        let seen = captured.0.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1],
            Feedback {
                item_id: "sent-1".into(),
                correct: true,
                explanation: "Send is irregular: send, sent, sent.".into(),
                points_awarded: 1,
                running_total: 1,
                completion_ratio: 0.5,
            }
        );
    }

    #[derive(Clone, Default)]
    struct Spoken(Rc<RefCell<Vec<SpeechRequest>>>);

    impl SpeechSink for Spoken {
        fn speak(&mut self, request: &SpeechRequest) -> Result<(), SpeechError> {
            self.0.borrow_mut().push(request.clone());
            Ok(())
        }
    }

    struct Mute;

    impl SpeechSink for Mute {
        fn speak(&mut self, _request: &SpeechRequest) -> Result<(), SpeechError> {
            Err(SpeechError("no voices installed".into()))
        }
    }

    #[test]
    fn present_fires_speech_request() {
        let spoken = Spoken::default();
        let item = sent_item().with_speech("Yesterday I sent the report.", Some("en-GB".into()));
        let mut runner = runner_with(vec![item]);
        runner.set_speech_sink(Box::new(spoken.clone()));

        let shown = runner.present("sent-1").map(|i| i.prompt.clone());
        assert_eq!(shown.as_deref(), Some("Yesterday I ___ the report. (send)"));
        assert_eq!(
            spoken.0.borrow().as_slice(),
            &[SpeechRequest {
                text: "Yesterday I sent the report.".into(),
                accent: Some("en-GB".into()),
            }]
        );
    }

    #[test]
    fn speech_failure_does_not_block_scoring() {
        let item = sent_item().with_speech("sent", None);
        let mut ledger = ScoringLedger::new();
        let mut runner = runner_with(vec![item]);
        runner.set_speech_sink(Box::new(Mute));

        assert!(runner.present("sent-1").is_some());
        assert!(!runner.speak("sent-1"));
        assert!(outcome(runner.submit(&mut ledger, "sent-1", "sent")).correct);
    }
}
