use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// How many days before the reference date an unparseable date lands.
pub const UNPARSEABLE_DATE_OFFSET_DAYS: i64 = 9999;

/// Relative date keywords used by a marketplace locale.
#[derive(Debug, Clone, Copy)]
pub struct DateLocale {
    pub today: &'static [&'static str],
    pub yesterday: &'static [&'static str],
}

impl DateLocale {
    pub const SLOVAK: DateLocale = DateLocale {
        today: &["Dnes"],
        yesterday: &["Včera"],
    };

    pub const ENGLISH: DateLocale = DateLocale {
        today: &["today", "Today"],
        yesterday: &["yesterday", "Yesterday"],
    };
}

impl Default for DateLocale {
    fn default() -> Self {
        Self::SLOVAK
    }
}

fn day_month_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})\.\s*(\d{1,2})\.").expect("valid day.month regex"))
}

/// Turns the posted-date text of a result row into a calendar date.
///
/// `Dnes` and `Včera` are relative to `today`. A bare `day.month.` is placed
/// in the current year, or the previous one when that would be in the future.
/// Anything else maps to a date far enough back to fail every age cutoff.
pub fn normalize_posted_date(text: &str, today: NaiveDate) -> NaiveDate {
    normalize_posted_date_with(text, today, &DateLocale::SLOVAK)
}

pub fn normalize_posted_date_with(text: &str, today: NaiveDate, locale: &DateLocale) -> NaiveDate {
    if locale.today.iter().any(|kw| text.contains(kw)) {
        return today;
    }
    if locale.yesterday.iter().any(|kw| text.contains(kw)) {
        return today - Duration::days(1);
    }

    if let Some(captures) = day_month_regex().captures(text) {
        let day = captures[1].parse::<u32>().ok();
        let month = captures[2].parse::<u32>().ok();
        if let (Some(day), Some(month)) = (day, month) {
            if let Some(date) = resolve_day_month(day, month, today) {
                return date;
            }
        }
    }

    unparseable_date(today)
}

fn resolve_day_month(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    match NaiveDate::from_ymd_opt(today.year(), month, day) {
        Some(date) if date <= today => Some(date),
        // in the future, or 29.2. outside a leap year
        _ => NaiveDate::from_ymd_opt(today.year() - 1, month, day),
    }
}

pub fn unparseable_date(today: NaiveDate) -> NaiveDate {
    today - Duration::days(UNPARSEABLE_DATE_OFFSET_DAYS)
}

/// First calendar day a listing may be posted on to still count as new.
pub fn cutoff_date(today: NaiveDate, max_age_days: u32) -> NaiveDate {
    today - Duration::days(i64::from(max_age_days))
}

/// Collapses runs of whitespace the way the result rows need it.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn today_and_yesterday_keywords() {
        let today = date(2024, 6, 1);
        assert_eq!(normalize_posted_date("- [Dnes 12:30]", today), today);
        assert_eq!(normalize_posted_date("Včera", today), date(2024, 5, 31));
        assert_eq!(
            normalize_posted_date_with("posted today", today, &DateLocale::ENGLISH),
            today
        );
        assert_eq!(
            normalize_posted_date_with("yesterday", today, &DateLocale::ENGLISH),
            date(2024, 5, 31)
        );
    }

    #[test]
    fn day_month_in_current_year() {
        assert_eq!(normalize_posted_date("- [15.3. 2024]", date(2024, 6, 1)), date(2024, 3, 15));
        assert_eq!(normalize_posted_date("1. 6.", date(2024, 6, 1)), date(2024, 6, 1));
    }

    #[test]
    fn day_month_after_today_rolls_back_a_year() {
        assert_eq!(normalize_posted_date("15.3.", date(2024, 1, 1)), date(2023, 3, 15));
        assert_eq!(normalize_posted_date("31.12.", date(2025, 1, 2)), date(2024, 12, 31));
    }

    #[test]
    fn leap_day_outside_leap_year_uses_previous_year() {
        assert_eq!(normalize_posted_date("29.2.", date(2025, 3, 10)), date(2024, 2, 29));
    }

    #[test]
    fn garbage_falls_back_to_sentinel() {
        let today = date(2024, 6, 1);
        let parsed = normalize_posted_date("TOP inzerát", today);
        assert!((today - parsed).num_days() >= 9999);
        assert_eq!(normalize_posted_date("45.13.", today), unparseable_date(today));
        assert_eq!(normalize_posted_date("", today), unparseable_date(today));
    }

    #[test]
    fn cutoff_subtracts_max_age() {
        assert_eq!(cutoff_date(date(2024, 6, 4), 3), date(2024, 6, 1));
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  450 \n €  "), "450 €");
    }
}
