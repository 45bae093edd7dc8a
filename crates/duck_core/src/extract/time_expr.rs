//! Resolves Vietnamese/English time expressions against a reference "now".
//!
//! Rules are tried in order and the first hit wins:
//! relative minutes, relative hours, then an absolute time of day on today or
//! tomorrow. A date keyword on its own never produces a result.

use regex::Regex;
use std::sync::LazyLock;
use time::{Date, Duration, PrimitiveDateTime, Time};

static RELATIVE_MINUTES: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(?:sau|trong)\s+(?P<n>[0-9]{1,3})\s*(?:phút|phut|minutes|minute|mins)\b").ok()
});

static RELATIVE_HOURS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(?:sau|trong)\s+(?P<n>[0-9]{1,2})\s*(?:giờ|gio|hours|hour|h)\b").ok()
});

static TIME_OF_DAY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(?P<h>[0-9]{1,2})(?:h(?P<hm>[0-9]{2})?|:(?P<cm>[0-9]{2}))?\b").ok()
});

const TOMORROW_KEYWORDS: [&str; 2] = ["ngày mai", "mai"];
const AFTERNOON_KEYWORD: &str = "chiều";

/// Resolve the first recognised time expression in `text`.
pub fn parse_due(text: &str, now: PrimitiveDateTime) -> Option<PrimitiveDateTime> {
    let lower = text.to_lowercase();

    // A matched relative phrase is final, even when the sum overflows.
    if let Some(offset) = relative_offset(&lower) {
        return now.checked_add(offset);
    }

    let date = resolve_date(&lower, now.date())?;
    let time = parse_time_of_day(&lower)?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Only the "sau/trong N phút|giờ" forms. Used where an absolute clock time
/// makes no sense, such as one-off water-break requests.
pub fn parse_relative(text: &str, now: PrimitiveDateTime) -> Option<PrimitiveDateTime> {
    now.checked_add(relative_offset(&text.to_lowercase())?)
}

fn relative_offset(lower: &str) -> Option<Duration> {
    if let Some(n) = capture_count(RELATIVE_MINUTES.as_ref(), lower) {
        return Some(Duration::minutes(n.max(1)));
    }
    if let Some(n) = capture_count(RELATIVE_HOURS.as_ref(), lower) {
        return Some(Duration::hours(n.max(1)));
    }
    None
}

fn capture_count(pattern: Option<&Regex>, lower: &str) -> Option<i64> {
    pattern?
        .captures(lower)?
        .name("n")?
        .as_str()
        .parse()
        .ok()
}

/// "hôm nay" and the absence of any keyword both mean today.
fn resolve_date(lower: &str, today: Date) -> Option<Date> {
    if TOMORROW_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        today.next_day()
    } else {
        Some(today)
    }
}

fn parse_time_of_day(lower: &str) -> Option<Time> {
    let captures = TIME_OF_DAY.as_ref()?.captures(lower)?;
    let mut hour: u8 = captures.name("h")?.as_str().parse().ok()?;
    let minute: u8 = match captures.name("hm").or_else(|| captures.name("cm")) {
        Some(value) => value.as_str().parse().ok()?,
        None => 0,
    };

    // "chiều" anywhere in the text turns 1..=11 into PM.
    if lower.contains(AFTERNOON_KEYWORD) && (1..=11).contains(&hour) {
        hour += 12;
    }

    if hour > 23 || minute > 59 {
        return None;
    }
    Time::from_hms(hour, minute, 0).ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_due, parse_relative};
    use time::macros::datetime;

    #[test]
    fn relative_minutes_are_added_to_now() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(
            parse_due("họp sau 10 phút", now),
            Some(datetime!(2024-01-01 09:10:00))
        );
        assert_eq!(
            parse_due("trong 45 mins", now),
            Some(datetime!(2024-01-01 09:45:00))
        );
    }

    #[test]
    fn relative_minutes_hold_for_the_whole_range() {
        let now = datetime!(2024-01-01 09:00:00);
        for n in [1_i64, 7, 59, 120, 999] {
            let text = format!("nhắc tôi sau {n} phút");
            assert_eq!(
                parse_due(&text, now),
                Some(now + time::Duration::minutes(n)),
                "{text}"
            );
        }
    }

    #[test]
    fn zero_relative_amount_is_floored_to_one() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(
            parse_due("sau 0 phút", now),
            Some(datetime!(2024-01-01 09:01:00))
        );
        assert_eq!(
            parse_due("sau 0 giờ", now),
            Some(datetime!(2024-01-01 10:00:00))
        );
    }

    #[test]
    fn relative_hours_accept_ascii_and_english_units() {
        let now = datetime!(2024-01-01 22:30:00);
        assert_eq!(
            parse_due("trong 2 gio", now),
            Some(datetime!(2024-01-02 00:30:00))
        );
        assert_eq!(
            parse_due("after work, trong 1 hour", now),
            Some(datetime!(2024-01-01 23:30:00))
        );
        assert_eq!(
            parse_due("sau 3h", now),
            Some(datetime!(2024-01-02 01:30:00))
        );
    }

    #[test]
    fn relative_minutes_win_over_a_clock_time() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(
            parse_due("15:30 hay sau 5 phút", now),
            Some(datetime!(2024-01-01 09:05:00))
        );
    }

    #[test]
    fn clock_time_defaults_to_today() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(
            parse_due("gọi điện lúc 15:30", now),
            Some(datetime!(2024-01-01 15:30:00))
        );
        assert_eq!(
            parse_due("hôm nay 16h", now),
            Some(datetime!(2024-01-01 16:00:00))
        );
        assert_eq!(
            parse_due("họp 10h30", now),
            Some(datetime!(2024-01-01 10:30:00))
        );
    }

    #[test]
    fn tomorrow_keyword_moves_the_date() {
        let now = datetime!(2024-12-31 20:00:00);
        assert_eq!(
            parse_due("mai 9h nộp bài", now),
            Some(datetime!(2025-01-01 09:00:00))
        );
        assert_eq!(
            parse_due("ngày mai lúc 7:05", now),
            Some(datetime!(2025-01-01 07:05:00))
        );
    }

    #[test]
    fn afternoon_shifts_morning_hours() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(
            parse_due("chiều 3h đi khám", now),
            Some(datetime!(2024-01-01 15:00:00))
        );
        assert_eq!(
            parse_due("chiều 12h", now),
            Some(datetime!(2024-01-01 12:00:00))
        );
    }

    #[test]
    fn afternoon_shift_is_applied_unconditionally() {
        // Known quirk: "chiều" adds 12h to any hour in 1..=11, with no AM/PM grammar.
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(
            parse_due("sáng mai 8h, chiều rảnh", now),
            Some(datetime!(2024-01-02 20:00:00))
        );
    }

    #[test]
    fn date_keyword_alone_is_not_a_match() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(parse_due("mai nộp báo cáo", now), None);
        assert_eq!(parse_due("hôm nay đi chợ", now), None);
    }

    #[test]
    fn out_of_range_clock_values_are_rejected() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(parse_due("lúc 25h", now), None);
        assert_eq!(parse_due("lúc 10:75", now), None);
    }

    #[test]
    fn text_without_time_tokens_is_not_a_match() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(parse_due("nộp báo cáo", now), None);
        assert_eq!(parse_due("mua 100 quả trứng", now), None);
        assert_eq!(parse_due("", now), None);
    }

    #[test]
    fn overflowing_relative_phrase_does_not_fall_back_to_a_clock_time() {
        let now = datetime!(9999-12-31 23:59:00);
        assert_eq!(parse_due("sau 10 phút", now), None);
        assert_eq!(parse_due("trong 2 giờ", now), None);
        assert_eq!(parse_relative("uống nước sau 10 phút", now), None);
    }

    #[test]
    fn non_ascii_digits_are_not_time_tokens() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(parse_due("sau ١٠ phút", now), None);
        assert_eq!(parse_due("lúc ٩:٣٠", now), None);
    }

    #[test]
    fn parse_relative_ignores_clock_times() {
        let now = datetime!(2024-01-01 09:00:00);
        assert_eq!(parse_relative("uống nước lúc 15:00", now), None);
        assert_eq!(
            parse_relative("uống nước sau 15 phút", now),
            Some(datetime!(2024-01-01 09:15:00))
        );
    }
}
