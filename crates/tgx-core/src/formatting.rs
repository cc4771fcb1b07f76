//! Markdown block rendering for exported messages.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::domain::{MessageRecord, TextEntity};

/// Line separating two message blocks.
pub const BLOCK_SEPARATOR: &str = "---";

/// Body placeholder for messages without text (media-only posts).
pub const NO_TEXT_PLACEHOLDER: &str = "*(No text content)*";

/// Heading prefix of every block.
pub const HEADING_PREFIX: &str = "### Message ";

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^### Message (\d+) \x{2013} \d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$")
            .expect("valid regex")
    })
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>"')\]]+"#).expect("valid regex"))
}

/// ISO-8601 with second precision, always UTC (`2024-01-01T00:00:00Z`).
pub fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Collect URLs from entities first, then from the raw text.
///
/// Entity offsets are UTF-16 code units. Duplicates keep their first position.
pub fn extract_urls(text: &str, entities: &[TextEntity]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let mut push = |url: String| {
        if !url.is_empty() && !urls.contains(&url) {
            urls.push(url);
        }
    };

    let utf16: Vec<u16> = text.encode_utf16().collect();
    for entity in entities {
        match entity {
            TextEntity::Url { offset, length } => {
                let end = offset.saturating_add(*length);
                if end <= utf16.len() {
                    push(String::from_utf16_lossy(&utf16[*offset..end]));
                }
            }
            TextEntity::TextUrl { url } => push(url.clone()),
        }
    }

    for m in url_regex().find_iter(text) {
        push(m.as_str().to_string());
    }

    urls
}

/// Display name for a user: `First Last (@username)`, `@username`, or `User <id>`.
pub fn user_display_name(
    first_name: Option<&str>,
    last_name: Option<&str>,
    username: Option<&str>,
    id: i64,
) -> String {
    let full = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let username = username.filter(|u| !u.is_empty());

    match (full.is_empty(), username) {
        (false, Some(u)) => format!("{full} (@{u})"),
        (false, None) => full,
        (true, Some(u)) => format!("@{u}"),
        (true, None) => format!("User {id}"),
    }
}

/// Display name for a channel or group sender.
pub fn chat_display_name(title: &str, id: i64) -> String {
    if title.trim().is_empty() {
        format!("Channel {id}")
    } else {
        title.to_string()
    }
}

/// Render one message as a Markdown block, including the trailing separator.
pub fn format_message_block(record: &MessageRecord) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "{HEADING_PREFIX}{} \u{2013} {}",
        record.id.0,
        format_timestamp(&record.date)
    ));
    lines.push(String::new());

    if let Some(sender) = record.sender.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(format!("From: {sender}"));
        lines.push(String::new());
    }

    if record.has_text() {
        // A body line shaped like a block heading is escaped so it can never
        // be taken for one when the file is scanned for the resume point.
        for line in record.text.split('\n') {
            if heading_regex().is_match(line.trim_end_matches('\r')) {
                lines.push(format!("\\{line}"));
            } else {
                lines.push(line.to_string());
            }
        }
    } else {
        lines.push(NO_TEXT_PLACEHOLDER.to_string());
    }
    lines.push(String::new());

    if !record.urls.is_empty() {
        for url in &record.urls {
            lines.push(format!("- {url}"));
        }
        lines.push(String::new());
    }

    lines.push(BLOCK_SEPARATOR.to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// Message id from a block heading line, if the line is exactly one.
pub fn parse_heading_id(line: &str) -> Option<i32> {
    let caps = heading_regex().captures(line)?;
    caps[1].parse::<i32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;
    use chrono::TimeZone;

    fn record(id: i32, text: &str, sender: Option<&str>, urls: &[&str]) -> MessageRecord {
        MessageRecord {
            id: MessageId(id),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            sender: sender.map(|s| s.to_string()),
            text: text.to_string(),
            urls: urls.iter().map(|s| s.to_string()).collect(),
            has_media: false,
        }
    }

    #[test]
    fn full_block_layout() {
        let block = format_message_block(&record(
            7,
            "line one\nline two",
            Some("Alpha News"),
            &["https://a.test", "https://b.test"],
        ));
        assert_eq!(
            block,
            "### Message 7 \u{2013} 2024-01-01T00:00:00Z\n\
             \n\
             From: Alpha News\n\
             \n\
             line one\n\
             line two\n\
             \n\
             - https://a.test\n\
             - https://b.test\n\
             \n\
             ---\n"
        );
    }

    #[test]
    fn omits_sender_and_url_sections_when_absent() {
        let block = format_message_block(&record(1, "hello", None, &[]));
        assert_eq!(
            block,
            "### Message 1 \u{2013} 2024-01-01T00:00:00Z\n\nhello\n\n---\n"
        );
    }

    #[test]
    fn empty_body_gets_placeholder() {
        let block = format_message_block(&record(2, "  ", None, &["https://x.test"]));
        assert!(block.contains(NO_TEXT_PLACEHOLDER));
        assert!(block.contains("- https://x.test\n"));
    }

    #[test]
    fn separator_is_alone_on_its_line() {
        let block = format_message_block(&record(3, "a --- b", None, &[]));
        assert_eq!(
            block.lines().filter(|l| *l == BLOCK_SEPARATOR).count(),
            1
        );
    }

    #[test]
    fn heading_id_roundtrip() {
        let block = format_message_block(&record(12345, "x", None, &[]));
        let first = block.lines().next().unwrap();
        assert_eq!(parse_heading_id(first), Some(12345));
        assert_eq!(parse_heading_id("### Messages are fun"), None);
        assert_eq!(parse_heading_id("### Message 999 \u{2013} fake"), None);
        assert_eq!(parse_heading_id("hello"), None);
    }

    #[test]
    fn heading_shaped_body_lines_are_escaped() {
        let fake = "### Message 999 \u{2013} 2030-01-01T00:00:00Z";
        let block = format_message_block(&record(4, &format!("quote:\n---\n{fake}"), None, &[]));
        assert!(block.contains(&format!("\n\\{fake}\n")));
        let ids: Vec<i32> = block.lines().filter_map(parse_heading_id).collect();
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn extracts_entity_urls_with_utf16_offsets() {
        // "😀 " is three UTF-16 units.
        let text = "😀 see example.org now";
        let entities = vec![
            TextEntity::Url {
                offset: 7,
                length: 11,
            },
            TextEntity::TextUrl {
                url: "https://hidden.test/page".to_string(),
            },
        ];
        assert_eq!(
            extract_urls(text, &entities),
            vec!["example.org", "https://hidden.test/page"]
        );
    }

    #[test]
    fn regex_scan_dedupes_and_stops_at_delimiters() {
        let text = "(https://a.test/x) and <https://b.test> and https://a.test/x again";
        let entities = vec![TextEntity::Url {
            offset: 1,
            length: 16,
        }];
        assert_eq!(
            extract_urls(text, &entities),
            vec!["https://a.test/x", "https://b.test"]
        );
    }

    #[test]
    fn out_of_range_entity_is_ignored() {
        let entities = vec![TextEntity::Url {
            offset: 3,
            length: 50,
        }];
        assert!(extract_urls("short", &entities).is_empty());
    }

    #[test]
    fn user_names() {
        assert_eq!(
            user_display_name(Some("Ada"), Some("Lovelace"), Some("ada"), 1),
            "Ada Lovelace (@ada)"
        );
        assert_eq!(user_display_name(Some("Ada"), None, None, 1), "Ada");
        assert_eq!(user_display_name(None, None, Some("ada"), 1), "@ada");
        assert_eq!(user_display_name(Some(""), None, None, 9), "User 9");
        assert_eq!(chat_display_name("", 5), "Channel 5");
        assert_eq!(chat_display_name("Alpha", 5), "Alpha");
    }
}
