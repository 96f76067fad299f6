//! Scoring ledger: the single owner of a lesson's score.
//!
//! Every award goes through [`ScoringLedger::award`], which records the
//! achievement key first and refuses to count the same key twice.

use crate::types::ScoreSnapshot;
use std::collections::{BTreeMap, BTreeSet};

/// Mutable score state owned by one [`ScoringLedger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreState {
    pub total: u32,
    pub awarded: BTreeSet<String>,
    /// Points earned per key. Keys restored from an older snapshot may be missing.
    pub points: BTreeMap<String, u32>,
    pub streak: u32,
    pub best_streak: u32,
}

/// What changed in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Awarded { key: String, points: u32 },
    Revoked { key: String, points: u32 },
    StreakBroken,
    Reset,
    Restored,
}

/// Notification sent to observers after each state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChange {
    pub kind: ChangeKind,
    pub total: u32,
    pub streak: u32,
    pub snapshot: ScoreSnapshot,
}

/// Receives ledger changes, e.g. to refresh a score display or persist progress.
pub trait LedgerObserver {
    fn on_change(&mut self, change: &LedgerChange);
}

/// Best-effort score ledger. No operation fails.
#[derive(Default)]
pub struct ScoringLedger {
    state: ScoreState,
    observers: Vec<Box<dyn LedgerObserver>>,
}

impl std::fmt::Debug for ScoringLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringLedger")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ScoringLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn subscribe(&mut self, observer: Box<dyn LedgerObserver>) {
        self.observers.push(observer);
    }

    /// Record `key` and add `points`. Returns false if `key` was already awarded.
    pub fn award(&mut self, key: &str, points: u32) -> bool {
        self.grant(key, points, true)
    }

    /// Like [`award`](Self::award) but leaves the streak untouched.
    pub fn award_bonus(&mut self, key: &str, points: u32) -> bool {
        self.grant(key, points, false)
    }

    fn grant(&mut self, key: &str, points: u32, extends_streak: bool) -> bool {
        if !self.state.awarded.insert(key.to_string()) {
            tracing::debug!(key, "achievement already awarded");
            return false;
        }

        self.state.points.insert(key.to_string(), points);
        self.state.total = self.state.total.saturating_add(points);
        if extends_streak {
            self.state.streak += 1;
            self.state.best_streak = self.state.best_streak.max(self.state.streak);
        }

        self.notify(ChangeKind::Awarded {
            key: key.to_string(),
            points,
        });
        true
    }

    /// Remove `key` and subtract the points it earned, flooring the total at
    /// zero. `fallback` is used when the earned amount was never recorded.
    /// Unknown keys are a no-op.
    pub fn revoke(&mut self, key: &str, fallback: u32) -> bool {
        if !self.state.awarded.remove(key) {
            return false;
        }

        let points = self.state.points.remove(key).unwrap_or(fallback);
        self.state.total = self.state.total.saturating_sub(points);
        self.notify(ChangeKind::Revoked {
            key: key.to_string(),
            points,
        });
        true
    }

    /// Zero the streak after an incorrect attempt.
    pub fn break_streak(&mut self) {
        if self.state.streak == 0 {
            return;
        }
        self.state.streak = 0;
        self.notify(ChangeKind::StreakBroken);
    }

    /// Clear every award, the total and the streak.
    pub fn reset(&mut self) {
        self.state = ScoreState::default();
        self.notify(ChangeKind::Reset);
    }

    /// Replace the current state with a previously saved snapshot.
    pub fn restore(&mut self, snapshot: &ScoreSnapshot) {
        self.state = ScoreState {
            total: snapshot.total,
            awarded: snapshot.awarded_keys.iter().cloned().collect(),
            points: snapshot
                .points
                .iter()
                .filter(|(key, _)| snapshot.awarded_keys.contains(key))
                .map(|(key, &points)| (key.clone(), points))
                .collect(),
            streak: snapshot.streak,
            best_streak: snapshot.streak,
        };
        self.notify(ChangeKind::Restored);
    }

    pub fn current_total(&self) -> u32 {
        self.state.total
    }

    pub fn streak(&self) -> u32 {
        self.state.streak
    }

    pub fn best_streak(&self) -> u32 {
        self.state.best_streak
    }

    pub fn is_awarded(&self, key: &str) -> bool {
        self.state.awarded.contains(key)
    }

    /// Points recorded for an awarded key.
    pub fn points_for(&self, key: &str) -> Option<u32> {
        self.state.points.get(key).copied()
    }

    pub fn state(&self) -> &ScoreState {
        &self.state
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            awarded_keys: self.state.awarded.iter().cloned().collect(),
            total: self.state.total,
            streak: self.state.streak,
            points: self.state.points.clone(),
        }
    }

    fn notify(&mut self, kind: ChangeKind) {
        if self.observers.is_empty() {
            return;
        }

        let change = LedgerChange {
            kind,
            total: self.state.total,
            streak: self.state.streak,
            snapshot: self.snapshot(),
        };
        for observer in &mut self.observers {
            observer.on_change(&change);
        }
    }
}

/// Fraction of `done` out of `total`, clamped to `[0, 1]`. Zero items count as 0.
pub fn completion_ratio(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64).clamp(0.0, 1.0)
}
