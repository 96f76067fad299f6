pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod progress;
pub mod session;
pub mod speech;

use lesson_core::{
    parse, ExerciseRunner, LessonSettings, PersistingObserver, ScoringLedger, SnapshotStore,
    SpeechSink,
};
use tokio::io::BufReader;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::Config;
use crate::console::{Console, TerminalRenderer};
use crate::error::{DrillError, Result};
use crate::progress::{content_hash, lesson_key, log_misses, open_repository, LessonStore, SharedRepository};
use crate::session::Session;
use crate::speech::CommandSpeech;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let session_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("session", id = %session_id);
    drill(config, session_id).instrument(span).await
}

async fn drill(config: Config, session_id: String) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&config.lesson_path)
        .await
        .map_err(|source| DrillError::ReadLesson {
            path: config.lesson_path.display().to_string(),
            source,
        })?;
    let key = lesson_key(&config.lesson_path);

    let repo = open_repository(&config.db_path);
    let speech = config
        .tts_command
        .as_deref()
        .and_then(|template| CommandSpeech::from_template(template, &config.default_voice))
        .map(|speech| Box::new(speech) as Box<dyn SpeechSink>);

    let console = Console::stdout();
    let mut session = prepare_session(
        &key,
        &content,
        &config.settings,
        &console,
        repo.clone(),
        &session_id,
        speech,
    )?;
    if config.shuffle {
        session = session.with_shuffle(&mut rand::rng());
    }

    tracing::info!(lesson = %key, items = session.runner().len(), "starting drill");
    let summary = session.run(BufReader::new(tokio::io::stdin())).await?;
    tracing::info!(
        total = summary.total,
        done = summary.done,
        quit_early = summary.quit_early,
        "drill finished"
    );

    if let Some(repo) = repo {
        if let Err(e) = log_misses(&repo, &key, &session_id, &summary.misses) {
            tracing::warn!(error = %e, "could not log missed items");
        }
    }

    Ok(())
}

/// Parse a lesson and wire up a session ready to run.
///
/// Rejected items are reported on the console and left out. With a
/// repository, progress saved for the same lesson content is restored and
/// every later ledger change is saved. A lesson restored fully done starts
/// over, and the cleared score is saved.
pub fn prepare_session(
    lesson_key: &str,
    content: &str,
    settings: &LessonSettings,
    console: &Console,
    repo: Option<SharedRepository>,
    session_id: &str,
    speech: Option<Box<dyn SpeechSink>>,
) -> Result<Session> {
    let lesson = parse(content, settings)?;

    let (runner, rejected) = ExerciseRunner::load(lesson.items, settings);
    for error in &rejected {
        console.line(format!("Skipping exercise: {error}"));
    }
    if runner.is_empty() {
        return Err(DrillError::EmptyLesson(lesson_key.to_string()));
    }

    let mut runner = runner.with_completion_bonus(lesson.completion_bonus);
    let renderer = TerminalRenderer::new(console.clone());
    runner.set_feedback_sink(Box::new(renderer.clone()));
    if let Some(speech) = speech {
        runner.set_speech_sink(speech);
    }

    let mut ledger = ScoringLedger::new();
    if let Some(repo) = repo {
        let store = LessonStore::new(repo, content_hash(content), session_id);
        let restored = match store.load(lesson_key) {
            Ok(Some(snapshot)) => {
                ledger.restore(&snapshot);
                runner.restore_from(&ledger);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "could not load saved progress");
                false
            }
        };

        ledger.subscribe(Box::new(PersistingObserver::new(store, lesson_key)));
        if restored && runner.is_complete() {
            console.line("You finished this lesson last time. Starting over.");
            runner.reset_all(&mut ledger);
        } else if ledger.current_total() > 0 {
            console.line(format!(
                "Welcome back! Restored {} points from your last session.",
                ledger.current_total()
            ));
        }
    }
    ledger.subscribe(Box::new(renderer));

    Ok(Session::new(runner, ledger, console.clone()).with_title(lesson.title))
}
