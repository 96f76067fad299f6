//! Text-to-speech through an external command such as `espeak-ng` or `say`.

use lesson_core::{SpeechError, SpeechRequest, SpeechSink};
use std::process::Stdio;
use tokio::process::Command;

/// Spawns a speech command per request and never waits for it.
///
/// The command comes from a template like `espeak-ng -v {voice} {text}`.
/// When the template has no `{text}` placeholder the text is appended as
/// the last argument.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
    default_voice: String,
}

impl CommandSpeech {
    /// Parse a command template. Returns `None` for an empty template.
    pub fn from_template(template: &str, default_voice: &str) -> Option<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts.next()?;

        Some(Self {
            program,
            args: parts.collect(),
            default_voice: default_voice.to_string(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for one request with placeholders filled in.
    pub fn build_args(&self, request: &SpeechRequest) -> Vec<String> {
        let voice = request.accent.as_deref().unwrap_or(&self.default_voice);
        let mut has_text = false;

        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                has_text |= arg.contains("{text}");
                arg.replace("{voice}", voice).replace("{text}", &request.text)
            })
            .collect();

        if !has_text {
            args.push(request.text.clone());
        }
        args
    }
}

impl SpeechSink for CommandSpeech {
    fn speak(&mut self, request: &SpeechRequest) -> Result<(), SpeechError> {
        let args = self.build_args(request);
        tracing::debug!(program = %self.program, ?args, "speaking");

        Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_child| ())
            .map_err(|e| SpeechError(format!("{}: {e}", self.program)))
    }
}
