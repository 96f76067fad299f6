//! Common test utilities for drill integration tests.
//!
//! Sessions write to an in-memory buffer so output can be asserted, and
//! progress tests share one in-memory SQLite repository across sessions.

#![allow(dead_code)]

pub mod fixtures;

use std::io::Write;
use std::sync::{Arc, Mutex};

use english_drills::console::Console;
use english_drills::db::SqliteRepository;
use english_drills::error::Result;
use english_drills::prepare_session;
use english_drills::progress::SharedRepository;
use english_drills::session::Session;
use lesson_core::LessonSettings;

/// Cloneable writer capturing everything a session prints.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One lesson file plus an optional shared progress database.
pub struct TestContext {
    pub lesson_key: String,
    pub content: String,
    pub repo: Option<SharedRepository>,
    pub output: SharedBuf,
}

impl TestContext {
    /// Context without persistence.
    pub fn new(content: &str) -> Self {
        Self {
            lesson_key: "lessons/verbs.md".to_string(),
            content: content.to_string(),
            repo: None,
            output: SharedBuf::default(),
        }
    }

    /// Context backed by a fresh in-memory database.
    pub fn with_database(content: &str) -> Self {
        let repo = SqliteRepository::open_in_memory().expect("in-memory database");
        Self {
            repo: Some(Arc::new(Mutex::new(repo))),
            ..Self::new(content)
        }
    }

    /// Same database, new lesson text and a clean output buffer.
    pub fn next_visit(&self, content: &str) -> Self {
        Self {
            lesson_key: self.lesson_key.clone(),
            content: content.to_string(),
            repo: self.repo.clone(),
            output: SharedBuf::default(),
        }
    }

    pub fn try_session(&self) -> Result<Session> {
        prepare_session(
            &self.lesson_key,
            &self.content,
            &LessonSettings::default(),
            &Console::new(self.output.clone()),
            self.repo.clone(),
            "test-session",
            None,
        )
    }

    /// # Panics
    /// Panics if the lesson cannot be prepared.
    pub fn session(&self) -> Session {
        self.try_session().expect("session prepared")
    }
}
