//! Display helpers for CLI output: item lists, progress bar, step hints.

use faultline_core::types::ItemId;

/// Join ids with `, `, eliding after `limit` entries.
///
/// ```text
/// ["a", "b", "c", "d"], limit 2 -> "a, b (+2 more)"
/// []                              -> "(none)"
/// ```
pub fn join_items(items: &[ItemId], limit: usize) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    if items.len() <= limit {
        return items.join(", ");
    }
    let shown = items[..limit].join(", ");
    format!("{shown} (+{} more)", items.len() - limit)
}

/// Fixed-width bar, e.g. `[#####-----]` for 50%.
pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// `1 item`, `3 items`.
pub fn count_noun(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// One-line reminder of how to answer.
pub const ANSWER_HINT: &str =
    "Check for the problem, then run `faultline persists` or `faultline gone`.";
