//! Builds the structuring instruction from the schema registry.

use ledgerlens_core::schema::{describe, skeleton};
use ledgerlens_core::StatementKind;
use tracing::warn;

use crate::model::Instruction;

fn system_prompt(kind: StatementKind) -> String {
    format!(
        "You convert the extracted text of a {label} into JSON.\n\
Reply with exactly one JSON object and nothing else: no prose, no Markdown.\n\
Rules:\n\
- Use exactly the keys listed below; do not add keys.\n\
- Copy values from the text. Never guess or invent a value.\n\
- If a value is not printed in the text, use null (also for required fields).\n\
- Dates as YYYY-MM-DD with a four-digit year; expand two-digit years from the statement period.\n\
- Amounts as plain decimals without currency symbols or thousands separators.\n\
- List transactions in the order they appear in the text.",
        label = kind.label()
    )
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Instruction embedding `raw_text` and the target schema for `kind`.
pub fn build_instruction(kind: StatementKind, raw_text: &str, max_input_chars: usize) -> Instruction {
    let text = truncate_chars(raw_text, max_input_chars);
    if text.len() < raw_text.len() {
        warn!(
            kind = %kind,
            original_chars = raw_text.chars().count(),
            kept_chars = max_input_chars,
            "statement text truncated before structuring"
        );
    }

    let example = serde_json::to_string_pretty(&skeleton(kind)).unwrap_or_default();
    let user = format!(
        "Fields:\n{fields}\nExample shape:\n{example}\n\nStatement text:\n<<<\n{text}\n>>>",
        fields = describe(kind),
    );

    Instruction {
        system: system_prompt(kind),
        user,
        json_only: true,
    }
}
