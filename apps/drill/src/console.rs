//! Terminal output: the drill's rendering callback and score display.

use lesson_core::{ChangeKind, Feedback, FeedbackSink, LedgerChange, LedgerObserver, COMPLETION_KEY};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Cloneable line writer shared by the session and its renderers.
///
/// Write errors are logged and dropped.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Write one line.
    pub fn line(&self, text: impl AsRef<str>) {
        self.write(text.as_ref(), true);
    }

    /// Write without a newline and flush, for input prompts.
    pub fn prompt(&self, text: impl AsRef<str>) {
        self.write(text.as_ref(), false);
    }

    fn write(&self, text: &str, newline: bool) {
        let Ok(mut out) = self.out.lock() else {
            tracing::debug!("console lock poisoned");
            return;
        };
        let result = if newline {
            writeln!(out, "{text}")
        } else {
            write!(out, "{text}").and_then(|()| out.flush())
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "console write failed");
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// Prints checked answers and notable score changes.
#[derive(Debug, Clone)]
pub struct TerminalRenderer {
    console: Console,
}

impl TerminalRenderer {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl FeedbackSink for TerminalRenderer {
    fn feedback(&mut self, feedback: &Feedback) {
        let percent = (feedback.completion_ratio * 100.0).round() as u32;
        if feedback.correct {
            self.console.line(format!(
                "  Correct! +{} (total {}, {}% done)",
                feedback.points_awarded, feedback.running_total, percent
            ));
        } else {
            self.console.line(format!(
                "  Not quite. (total {}, {}% done)",
                feedback.running_total, percent
            ));
            if !feedback.explanation.is_empty() {
                self.console.line(format!("  {}", feedback.explanation));
            }
        }
    }
}

impl LedgerObserver for TerminalRenderer {
    fn on_change(&mut self, change: &LedgerChange) {
        if let ChangeKind::Awarded { key, points } = &change.kind {
            if key == COMPLETION_KEY {
                self.console
                    .line(format!("  Lesson complete! Bonus +{points}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::ScoreSnapshot;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn feedback(correct: bool) -> Feedback {
        Feedback {
            item_id: "sent-1".into(),
            correct,
            explanation: "Send is irregular: send, sent, sent.".into(),
            points_awarded: if correct { 2 } else { 0 },
            running_total: 2,
            completion_ratio: 0.5,
        }
    }

    #[test]
    fn correct_feedback_shows_points_and_progress() {
        let buf = Buffer::default();
        let mut renderer = TerminalRenderer::new(Console::new(buf.clone()));
        renderer.feedback(&feedback(true));
        assert_eq!(buf.text(), "  Correct! +2 (total 2, 50% done)\n");
    }

    #[test]
    fn wrong_feedback_shows_explanation() {
        let buf = Buffer::default();
        let mut renderer = TerminalRenderer::new(Console::new(buf.clone()));
        renderer.feedback(&feedback(false));
        assert!(buf.text().contains("Not quite."));
        assert!(buf.text().contains("Send is irregular"));
    }

    #[test]
    fn completion_bonus_is_announced() {
        let buf = Buffer::default();
        let mut renderer = TerminalRenderer::new(Console::new(buf.clone()));

        renderer.on_change(&LedgerChange {
            kind: ChangeKind::Awarded {
                key: "sent-1".into(),
                points: 2,
            },
            total: 2,
            streak: 1,
            snapshot: ScoreSnapshot::default(),
        });
        assert_eq!(buf.text(), "");

        renderer.on_change(&LedgerChange {
            kind: ChangeKind::Awarded {
                key: COMPLETION_KEY.into(),
                points: 3,
            },
            total: 5,
            streak: 1,
            snapshot: ScoreSnapshot::default(),
        });
        assert_eq!(buf.text(), "  Lesson complete! Bonus +3\n");
    }

    #[test]
    fn prompt_has_no_newline() {
        let buf = Buffer::default();
        let console = Console::new(buf.clone());
        console.prompt("> ");
        console.line("ok");
        assert_eq!(buf.text(), "> ok\n");
    }
}
