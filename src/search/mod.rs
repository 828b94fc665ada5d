use time::OffsetDateTime;

use crate::notes::Note;

/// Case-insensitive substring filter over title and content. An empty query
/// matches every note; input order is preserved. A whitespace-only query is
/// deliberately treated as empty rather than as a literal-space search.
pub fn filter_notes<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return notes.iter().collect();
    }
    notes
        .iter()
        .filter(|note| {
            note.title.to_lowercase().contains(&needle)
                || note.content.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Human label for a note's last-modified time, relative to `now`:
/// "Today", "Yesterday", "<n> days ago" up to six days, then the absolute
/// calendar date.
pub fn date_label(updated_at_millis: i64, now: OffsetDateTime) -> String {
    let then = match OffsetDateTime::from_unix_timestamp_nanos(
        i128::from(updated_at_millis) * 1_000_000,
    ) {
        Ok(then) => then,
        Err(_) => return String::from("unknown"),
    };
    let days = (now.date() - then.date()).whole_days();
    match days {
        i64::MIN..=0 => String::from("Today"),
        1 => String::from("Yesterday"),
        2..=6 => format!("{days} days ago"),
        _ => then.date().to_string(),
    }
}

/// List preview: everything after the title line joined with spaces, trimmed
/// once at the ends. Blank interior lines widen the gap rather than collapse.
pub fn snippet(content: &str) -> String {
    let rest = content
        .lines()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();
    if rest.is_empty() {
        String::from("No content")
    } else {
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn note(id: &str, title: &str, content: &str) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn millis(at: OffsetDateTime) -> i64 {
        (at.unix_timestamp_nanos() / 1_000_000) as i64
    }

    #[test]
    fn empty_query_matches_everything_in_order() {
        let notes = vec![
            note("a", "Alpha", "first"),
            note("b", "Beta", "second"),
            note("c", "Gamma", "third"),
        ];
        let ids: Vec<_> = filter_notes(&notes, "")
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(filter_notes(&notes, "   ").len(), 3);
    }

    #[test]
    fn filter_matches_title_or_content_case_insensitively() {
        let notes = vec![
            note("a", "Shopping list", "milk\neggs"),
            note("b", "Ideas", "open a SHOP someday"),
            note("c", "Travel", "pack light"),
        ];
        let ids: Vec<_> = filter_notes(&notes, "shop")
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn filter_with_no_hits_is_empty() {
        let notes = vec![note("a", "Alpha", "body")];
        assert!(filter_notes(&notes, "zebra").is_empty());
    }

    #[test]
    fn date_label_same_day_is_today() {
        let now = datetime!(2024-06-15 22:30 UTC);
        let morning = datetime!(2024-06-15 01:00 UTC);
        assert_eq!(date_label(millis(morning), now), "Today");
    }

    #[test]
    fn date_label_previous_calendar_day_is_yesterday() {
        let now = datetime!(2024-06-15 00:10 UTC);
        let late_yesterday = datetime!(2024-06-14 23:59 UTC);
        assert_eq!(date_label(millis(late_yesterday), now), "Yesterday");
    }

    #[test]
    fn date_label_counts_recent_days() {
        let now = datetime!(2024-06-15 12:00 UTC);
        assert_eq!(
            date_label(millis(datetime!(2024-06-13 12:00 UTC)), now),
            "2 days ago"
        );
        assert_eq!(
            date_label(millis(datetime!(2024-06-09 12:00 UTC)), now),
            "6 days ago"
        );
    }

    #[test]
    fn date_label_falls_back_to_absolute_date() {
        let now = datetime!(2024-06-15 12:00 UTC);
        let old = datetime!(2024-06-05 12:00 UTC);
        assert_eq!(date_label(millis(old), now), "2024-06-05");
    }

    #[test]
    fn future_timestamp_reads_as_today() {
        let now = datetime!(2024-06-15 12:00 UTC);
        let skewed = datetime!(2024-06-16 09:00 UTC);
        assert_eq!(date_label(millis(skewed), now), "Today");
    }

    #[test]
    fn snippet_joins_body_lines_with_spaces() {
        assert_eq!(snippet("Title\nfirst line\nsecond line"), "first line second line");
        assert_eq!(snippet("Title\n  padded body  "), "padded body");
    }

    #[test]
    fn snippet_keeps_interior_whitespace_from_blank_lines() {
        assert_eq!(snippet("Title\na\n\nb"), "a  b");
    }

    #[test]
    fn snippet_without_body_reads_no_content() {
        assert_eq!(snippet("Title only"), "No content");
        assert_eq!(snippet(""), "No content");
        assert_eq!(snippet("Title\n   \n"), "No content");
    }
}
