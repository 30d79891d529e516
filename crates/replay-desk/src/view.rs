//! Text rendering of the collection and controller events

use replay_core::text::newlines;
use replay_core::{Replay, ReplayEvent, Snapshot};

/// One summary line per replay
pub fn format_row(replay: &Replay) -> String {
    let labels: Vec<&str> = replay.tag_names();
    let mut row = format!("{:<32}", replay.tag.as_str());
    if let Some(date) = &replay.creation_date {
        row.push_str(&format!("  {}", date));
    }
    if !labels.is_empty() {
        row.push_str(&format!("  [{}]", labels.join(", ")));
    }
    let comments = replay.metadata.comments.len();
    if comments > 0 {
        row.push_str(&format!(
            "  {} comment{}",
            comments,
            if comments == 1 { "" } else { "s" }
        ));
    }
    row
}

pub fn format_list(snapshot: &Snapshot) -> String {
    if snapshot.is_empty() {
        return "No replays recorded.".to_string();
    }
    snapshot
        .iter()
        .map(format_row)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summary line followed by every comment, indented
pub fn format_details(replay: &Replay) -> String {
    let mut out = format_row(replay);
    for comment in &replay.metadata.comments {
        for (i, line) in comment.text.lines().enumerate() {
            out.push_str(if i == 0 { "\n  - " } else { "\n    " });
            out.push_str(line);
        }
    }
    out
}

/// Comments as an HTML list with line breaks
pub fn comments_html(replay: &Replay) -> String {
    let mut out = String::from("<ul class=\"comments\">\n");
    for comment in &replay.metadata.comments {
        out.push_str("  <li>");
        out.push_str(&newlines(&escape_html(&comment.text)));
        out.push_str("</li>\n");
    }
    out.push_str("</ul>");
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn format_event(event: &ReplayEvent) -> String {
    match event {
        ReplayEvent::Refreshed {
            count,
            preserved_edits,
            ..
        } => {
            if *preserved_edits > 0 {
                format!(
                    "Collection updated: {} replays ({} unsaved label edits kept)",
                    count, preserved_edits
                )
            } else {
                format!("Collection updated: {} replays", count)
            }
        }
        ReplayEvent::RefreshDiscarded { .. } => "Outdated collection response skipped".to_string(),
        ReplayEvent::RefreshFailed { error } => format!("Could not load replays: {}", error),
        ReplayEvent::PlaybackStarted { tag, .. } => format!("Playing {}", tag),
        ReplayEvent::PlaybackFailed { tag, error } => format!("Could not play {}: {}", tag, error),
        ReplayEvent::StopAcknowledged => "Stopped all replays".to_string(),
        ReplayEvent::StopFailed { error } => format!("Could not stop replays: {}", error),
        ReplayEvent::CommentSaved { tag } => format!("Comment saved on {}", tag),
        ReplayEvent::CommentFailed { tag, error } => {
            format!("Comment on {} not saved (draft kept): {}", tag, error)
        }
        ReplayEvent::TagsSaved { tag } => format!("Labels saved on {}", tag),
        ReplayEvent::TagsRejected {
            tag,
            error,
            reverted,
        } => {
            if *reverted {
                format!("Labels on {} not saved, reverted: {}", tag, error)
            } else {
                format!("Labels on {} not saved, newer edit sent: {}", tag, error)
            }
        }
    }
}
