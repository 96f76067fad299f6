//! Parser for lesson files.
//!
//! # Format
//! ```markdown
//! # Past simple: irregular verbs
//! BONUS: 3
//!
//! ID: send-1
//! Q: Yesterday I ___ the report to my manager. (send)
//! A: sent
//! E: "Send" is irregular: send, sent, sent.
//!
//! ID: mc-1
//! Q: Which sentence is correct?
//! O: I have received it yesterday.
//! O: I received it yesterday.
//! C: 2
//!
//! ID: say-1
//! K: spoken
//! Q: Repeat after me.
//! S: Could you send me the invoice, please?
//! L: en-GB
//! T: 75
//! ```
//!
//! `Q:` and `E:` continue over following plain lines. `A:` and `O:` repeat.
//! `C:` is 1-based. `P:`/`R:` override first-try and retry points.

use crate::error::{ParseError, Result};
use crate::types::{AnswerKey, ExerciseItem, ExerciseKind, LessonSettings, Speech};
use std::collections::HashSet;
use std::str::FromStr;

/// A parsed lesson file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lesson {
    pub title: Option<String>,
    pub completion_bonus: u32,
    pub items: Vec<ExerciseItem>,
}

/// Parse lesson content, filling unset point values and thresholds from `settings`.
///
/// Semantic checks (an item with no accepted answer, an option index past
/// the end) are left to the runner so they surface per item.
pub fn parse(content: &str, settings: &LessonSettings) -> Result<Lesson> {
    let mut parser = Parser::new(settings);

    for (idx, line) in content.lines().enumerate() {
        parser.process_line(line, idx + 1)?;
    }

    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Question,
    Explanation,
}

struct ItemBuilder {
    id: String,
    start_line: usize,
    kind: Option<ExerciseKind>,
    question: Option<String>,
    answers: Vec<String>,
    options: Vec<String>,
    correct: Option<usize>,
    explanation: Option<String>,
    speech: Option<String>,
    accent: Option<String>,
    threshold: Option<u8>,
    points: Option<u32>,
    retry_points: Option<u32>,
}

impl ItemBuilder {
    fn new(id: &str, start_line: usize) -> Self {
        Self {
            id: id.to_string(),
            start_line,
            kind: None,
            question: None,
            answers: Vec::new(),
            options: Vec::new(),
            correct: None,
            explanation: None,
            speech: None,
            accent: None,
            threshold: None,
            points: None,
            retry_points: None,
        }
    }

    fn build(self, settings: &LessonSettings) -> Result<ExerciseItem> {
        let prompt = self
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ParseError::MissingQuestion {
                id: self.id.clone(),
                line: self.start_line,
            })?;

        let kind = self.kind.unwrap_or(if self.options.is_empty() {
            ExerciseKind::Typed
        } else {
            ExerciseKind::Choice
        });

        let answer = match kind {
            ExerciseKind::Typed => AnswerKey::Typed {
                accepted: self.answers,
            },
            ExerciseKind::Choice => {
                let correct = self.correct.ok_or_else(|| ParseError::MissingCorrectOption {
                    id: self.id.clone(),
                    line: self.start_line,
                })?;
                AnswerKey::Choice {
                    options: self.options,
                    correct,
                }
            }
            ExerciseKind::Spoken => {
                let mut accepted = self.answers;
                if accepted.is_empty() {
                    accepted.extend(self.speech.clone());
                }
                AnswerKey::Spoken {
                    accepted,
                    threshold: self.threshold.unwrap_or(settings.thresholds.close),
                }
            }
        };

        Ok(ExerciseItem {
            id: self.id,
            prompt: prompt.trim().to_string(),
            answer,
            explanation: self
                .explanation
                .map(|e| e.trim().to_string())
                .unwrap_or_default(),
            points: self.points.unwrap_or(settings.first_try_points),
            retry_points: self.retry_points.unwrap_or(settings.retry_points),
            speech: self.speech.map(|text| Speech {
                text,
                accent: self.accent,
            }),
        })
    }
}

struct Parser<'s> {
    settings: &'s LessonSettings,
    lesson: Lesson,
    seen_ids: HashSet<String>,
    current: Option<ItemBuilder>,
    current_field: Option<Field>,
    buffer: Vec<String>,
}

impl<'s> Parser<'s> {
    fn new(settings: &'s LessonSettings) -> Self {
        Self {
            settings,
            lesson: Lesson::default(),
            seen_ids: HashSet::new(),
            current: None,
            current_field: None,
            buffer: Vec::new(),
        }
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<()> {
        let parsed = Self::parse_line(line);

        match parsed {
            LineType::Text(text) => {
                if self.current.is_none() && self.lesson.title.is_none() {
                    if let Some(title) = text.trim().strip_prefix("# ") {
                        self.lesson.title = Some(title.trim().to_string());
                        return Ok(());
                    }
                }
                self.buffer.push(text.to_string());
                return Ok(());
            }
            LineType::Empty => {
                self.buffer.push(String::new());
                return Ok(());
            }
            _ => {}
        }

        self.flush_buffer();

        match parsed {
            LineType::Bonus(value) => {
                self.lesson.completion_bonus = parse_number("BONUS", value, line_num)?;
            }
            LineType::Id(id) => self.start_item(id, line_num)?,
            LineType::Field(name, value) => self.handle_field(name, value, line_num)?,
            LineType::Text(_) | LineType::Empty => {}
        }
        Ok(())
    }

    fn parse_line(line: &str) -> LineType<'_> {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return LineType::Empty;
        }
        if let Some(rest) = trimmed.strip_prefix("BONUS:") {
            return LineType::Bonus(rest.trim());
        }
        if let Some(rest) = trimmed.strip_prefix("ID:") {
            return LineType::Id(rest.trim());
        }

        const FIELDS: [&str; 11] = ["K", "Q", "A", "O", "C", "E", "S", "L", "T", "P", "R"];
        for name in FIELDS {
            if let Some(rest) = trimmed
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix(':'))
            {
                return LineType::Field(name, rest.trim());
            }
        }

        LineType::Text(line)
    }

    fn start_item(&mut self, id: &str, line_num: usize) -> Result<()> {
        self.finish_item()?;

        if !self.seen_ids.insert(id.to_string()) {
            return Err(ParseError::DuplicateId {
                id: id.to_string(),
                line: line_num,
            });
        }
        self.current = Some(ItemBuilder::new(id, line_num));
        Ok(())
    }

    fn handle_field(&mut self, name: &'static str, value: &str, line_num: usize) -> Result<()> {
        let Some(item) = self.current.as_mut() else {
            return Err(ParseError::MissingId {
                field: name,
                line: line_num,
            });
        };
        self.current_field = None;

        match name {
            "K" => {
                let kind = ExerciseKind::from_str(&value.to_lowercase()).ok_or_else(|| {
                    ParseError::UnknownKind {
                        line: line_num,
                        value: value.to_string(),
                    }
                })?;
                item.kind = Some(kind);
            }
            "Q" => {
                self.current_field = Some(Field::Question);
                self.buffer.push(value.to_string());
            }
            "E" => {
                self.current_field = Some(Field::Explanation);
                self.buffer.push(value.to_string());
            }
            "A" => item.answers.push(value.to_string()),
            "O" => item.options.push(value.to_string()),
            "C" => {
                let one_based: usize = parse_number("C", value, line_num)?;
                let index = one_based.checked_sub(1).ok_or(ParseError::InvalidValue {
                    field: "C",
                    line: line_num,
                    value: value.to_string(),
                })?;
                item.correct = Some(index);
            }
            "S" => item.speech = Some(value.to_string()),
            "L" => item.accent = Some(value.to_string()),
            "T" => item.threshold = Some(parse_number("T", value, line_num)?),
            "P" => item.points = Some(parse_number("P", value, line_num)?),
            "R" => item.retry_points = Some(parse_number("R", value, line_num)?),
            _ => {}
        }
        Ok(())
    }

    fn flush_buffer(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let content = self.buffer.join("\n").trim().to_string();
        self.buffer.clear();

        if let Some(ref mut item) = self.current {
            match self.current_field {
                Some(Field::Question) => item.question = Some(content),
                Some(Field::Explanation) => item.explanation = Some(content),
                None => {}
            }
        }
    }

    fn finish_item(&mut self) -> Result<()> {
        self.flush_buffer();
        self.current_field = None;

        if let Some(item) = self.current.take() {
            self.lesson.items.push(item.build(self.settings)?);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Lesson> {
        self.finish_item()?;
        Ok(self.lesson)
    }
}

fn parse_number<T: FromStr>(field: &'static str, value: &str, line: usize) -> Result<T> {
    value.parse::<T>().map_err(|_| ParseError::InvalidValue {
        field,
        line,
        value: value.to_string(),
    })
}

#[derive(Clone, Copy)]
enum LineType<'a> {
    Bonus(&'a str),
    Id(&'a str),
    Field(&'static str, &'a str),
    Text(&'a str),
    Empty,
}
