//! Lesson texts used across integration tests.

/// Three items, one per exercise kind, with a completion bonus of 3.
pub const SAMPLE_LESSON: &str = "\
# Past simple: irregular verbs
BONUS: 3

ID: send-1
Q: Yesterday I ___ the report to my manager. (send)
A: sent
E: \"Send\" is irregular: send, sent, sent.

ID: mc-1
Q: Which sentence is correct?
O: I have received it yesterday.
O: I received it yesterday.
C: 2
E: Use the past simple with a finished time like \"yesterday\".

ID: say-1
K: spoken
Q: Repeat after me.
S: Could you send me the invoice, please?
L: en-GB
T: 75
";

/// Correct answer for each sample item, keyed by id.
pub fn sample_answer(item_id: &str) -> &'static str {
    match item_id {
        "send-1" => "sent",
        "mc-1" => "I received it yesterday.",
        "say-1" => "Could you send me the invoice please",
        other => panic!("no sample answer for {other}"),
    }
}

/// Generate a typed-only lesson with `count` items answered by `yes`.
pub fn typed_lesson(count: usize) -> String {
    (0..count)
        .map(|i| format!("ID: item-{}\nQ: Question {}?\nA: yes\n", i + 1, i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build scripted input from lines.
pub fn script(lines: &[&str]) -> Vec<u8> {
    lines
        .iter()
        .map(|line| format!("{line}\n"))
        .collect::<String>()
        .into_bytes()
}
