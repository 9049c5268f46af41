//! Prompt assembly: merges the user message, recent conversation turns, and
//! optional job/profile context into one bounded string.
//!
//! All budget decisions use the fixed ⌈chars/4⌉ token estimate, not a real
//! tokenizer, and truncation is a hard character cut — it may land mid-word.
//! The cut accounts for the marker so the post-truncation estimate always
//! honors the budget.

use crate::models::chat::{ChatTurn, Sender};

/// Appended to any text that was cut.
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated due to length limits]";

/// Per-block budget for ordinary chat assembly.
pub const STANDARD_BUDGET: usize = 6000;
/// Tokens held back from [`STANDARD_BUDGET`] for the system prompt and reply.
pub const STANDARD_RESERVE: usize = 2000;

/// Total budget when the message is a resume-analysis request.
pub const RESUME_BUDGET: usize = 4000;
/// Reserve applied on the resume path.
pub const RESUME_RESERVE: usize = 1500;

/// No assembled prompt may estimate above this, whatever the inputs.
pub const HARD_CEILING: usize = 7000;

/// How many trailing conversation turns are attached as context.
pub const HISTORY_TURNS: usize = 3;

/// Fixed token heuristic: one token per four characters, rounded up.
pub fn estimated_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Returns `text` unchanged if it fits `budget - reserve`; otherwise cuts it
/// so the estimate of the result (marker included) stays within the bound.
/// The cut lands on a character boundary but may split a word. If the bound
/// is too small to fit the marker itself, the text is cut without one.
pub fn truncate_to_fit(text: &str, budget_tokens: usize, reserve_tokens: usize) -> String {
    let max_tokens = budget_tokens.saturating_sub(reserve_tokens);
    if estimated_tokens(text) <= max_tokens {
        return text.to_string();
    }

    let max_chars = max_tokens * 4;
    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        return text.chars().take(max_chars).collect();
    }

    let mut cut: String = text.chars().take(max_chars - marker_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Builds the full prompt body. The fixed system instruction is *not* part
/// of the result; the gateway sends it separately.
///
/// Resume-analysis messages get the aggressive budget applied to the message
/// alone and skip all other context — resume text dominates. Otherwise the
/// message is followed by the trailing conversation window, job context, and
/// profile text, each block truncated independently before concatenation,
/// and the whole prompt is clamped to the hard ceiling at the end.
pub fn assemble(
    message: &str,
    job_context: Option<&str>,
    user_profile: Option<&str>,
    history: &[ChatTurn],
) -> String {
    if is_resume_analysis(message) {
        let body = truncate_to_fit(message, RESUME_BUDGET, RESUME_RESERVE);
        return truncate_to_fit(&body, HARD_CEILING, 0);
    }

    let mut blocks = vec![truncate_to_fit(message, STANDARD_BUDGET, STANDARD_RESERVE)];

    if !history.is_empty() {
        let turns = format_history(history);
        blocks.push(truncate_to_fit(
            &format!("Recent conversation:\n{turns}"),
            STANDARD_BUDGET,
            STANDARD_RESERVE,
        ));
    }
    if let Some(context) = job_context.filter(|c| !c.trim().is_empty()) {
        blocks.push(truncate_to_fit(
            &format!("Job context:\n{context}"),
            STANDARD_BUDGET,
            STANDARD_RESERVE,
        ));
    }
    if let Some(profile) = user_profile.filter(|p| !p.trim().is_empty()) {
        blocks.push(truncate_to_fit(
            &format!("User profile:\n{profile}"),
            STANDARD_BUDGET,
            STANDARD_RESERVE,
        ));
    }

    truncate_to_fit(&blocks.join("\n\n"), HARD_CEILING, 0)
}

/// Resume text dominates these requests, so other context is skipped.
fn is_resume_analysis(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("resume")
        && (lower.contains("analyze") || lower.contains("extract") || lower.contains("keyword"))
}

/// Renders the last [`HISTORY_TURNS`] turns, one line each, re-labelled from
/// the assistant's point of view.
fn format_history(history: &[ChatTurn]) -> String {
    let window = &history[history.len().saturating_sub(HISTORY_TURNS)..];
    window
        .iter()
        .map(|turn| {
            let content = strip_leading_label(&turn.content);
            match turn.sender {
                Sender::User => format!("User asked: {content}"),
                Sender::Assistant => format!("I previously answered: {content}"),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops a leading "user:" / "assistant:" label some clients prepend to turn
/// content, so it is not doubled with our own prefix.
fn strip_leading_label(content: &str) -> &str {
    let trimmed = content.trim_start();
    for label in ["user:", "assistant:"] {
        if let Some(head) = trimmed.get(..label.len()) {
            if head.eq_ignore_ascii_case(label) {
                return trimmed[label.len()..].trim_start();
            }
        }
    }
    trimmed
}
