//! Markdown report for a finished session.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};

use faultline_core::types::{TroubleshootState, Verdict};

const SINGLE_SUGGESTIONS: [&str; 4] = [
    "Check for an update to this item; the problem may already be fixed upstream.",
    "Review the item's settings for options related to the symptom.",
    "Report the problem to the item's maintainers with steps to reproduce.",
    "Keep the item disabled, or look for an alternative, until a fix is available.",
];

const PAIR_SUGGESTIONS: [&str; 4] = [
    "Check both items for updates; conflicts are often fixed on one side.",
    "Look for overlapping features or settings that both items change.",
    "Report the conflict to both maintainers and mention the other item.",
    "Keep only one of the two enabled until the conflict is resolved.",
];

/// Render the report, or `None` if the session has no result yet.
pub fn render_report(state: &TroubleshootState, now: DateTime<Utc>) -> Option<String> {
    let verdict = state.result.as_ref()?;
    let mut md = String::new();

    let title = match verdict {
        Verdict::Single { .. } => "Fault Isolation Report: Single Item",
        Verdict::Pair { .. } => "Fault Isolation Report: Conflicting Pair",
        Verdict::NotItemIssue => "Fault Isolation Report: Not Caused by Items",
        Verdict::Error { .. } => "Fault Isolation Report: Inconclusive",
    };
    let _ = writeln!(md, "# {title}\n");
    let _ = writeln!(md, "Generated by faultline on {}\n", now.format("%Y-%m-%d %H:%M:%S UTC"));
    md.push_str("---\n\n");

    match verdict {
        Verdict::Single { item } => {
            md.push_str("## Culprit\n\n| Item |\n|------|\n");
            let _ = writeln!(md, "| `{item}` |\n");
        }
        Verdict::Pair { item_a, item_b } => {
            md.push_str("## Conflict\n\n| Item 1 | Item 2 |\n|--------|--------|\n");
            let _ = writeln!(md, "| `{item_a}` | `{item_b}` |\n");
        }
        Verdict::NotItemIssue => {
            md.push_str(
                "## Finding\n\nThe problem persisted with every item disabled, \
                 so none of them causes it.\n\n",
            );
        }
        Verdict::Error { reason } => {
            let _ = writeln!(md, "## Finding\n\n{reason}.\n");
            md.push_str(
                "This usually means an answer was inconsistent, or the problem \
                 needs more than two items together.\n\n",
            );
        }
    }
    md.push_str("---\n\n");

    md.push_str("## Summary\n\n");
    let _ = writeln!(md, "- **Total steps**: {}", state.current_step);
    let _ = writeln!(md, "- **Result type**: {}", result_type(verdict));
    let _ = writeln!(
        md,
        "- **Originally enabled**: {}\n",
        state.original_enabled_set.len()
    );

    let suggestions: &[&str] = match verdict {
        Verdict::Single { .. } => &SINGLE_SUGGESTIONS,
        Verdict::Pair { .. } => &PAIR_SUGGESTIONS,
        Verdict::NotItemIssue | Verdict::Error { .. } => &[],
    };
    if !suggestions.is_empty() {
        md.push_str("---\n\n## Suggested Actions\n\n");
        for (i, s) in suggestions.iter().enumerate() {
            let _ = writeln!(md, "{}. {s}", i + 1);
        }
        md.push('\n');
    }

    if let Verdict::Pair { item_a, item_b } = verdict {
        md.push_str("---\n\n## Technical Details\n\n");
        let _ = writeln!(md, "### Item 1\n- ID: `{item_a}`\n");
        let _ = writeln!(md, "### Item 2\n- ID: `{item_b}`\n");
        md.push_str("### Originally Enabled\n");
        for id in &state.original_enabled_set {
            let _ = writeln!(md, "- `{id}`");
        }
    }

    Some(md)
}

fn result_type(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Single { .. } => "single item",
        Verdict::Pair { .. } => "conflicting pair",
        Verdict::NotItemIssue => "not an item issue",
        Verdict::Error { .. } => "inconclusive",
    }
}

/// `faultline report`: print to stdout or write to `output`.
pub fn cmd_report(
    state: &TroubleshootState,
    output: Option<&Path>,
    out: &mut impl std::io::Write,
) -> anyhow::Result<()> {
    let Some(md) = render_report(state, Utc::now()) else {
        anyhow::bail!("no result yet; finish the session first (see `faultline status`)");
    };
    match output {
        Some(path) => {
            std::fs::write(path, &md)
                .with_context(|| format!("failed to write report {}", path.display()))?;
            writeln!(out, "Report written to {}", path.display())?;
        }
        None => write!(out, "{md}")?,
    }
    Ok(())
}
