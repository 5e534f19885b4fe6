use chrono::{Datelike, Days, Local, NaiveDate};

use pulsetrack_common::ActivityDate;

/// Normalizes fuzzy timeline date text into a canonical calendar date.
///
/// Pure and deterministic given the injected reference date; unparseable text
/// yields `None` and is dropped by callers, never treated as an error.
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    today: NaiveDate,
}

impl DateNormalizer {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Normalizer anchored at the local calendar date.
    pub fn for_today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn normalize(&self, raw: &str) -> Option<ActivityDate> {
        // Leading labels are separated by '|'; only the trailing portion
        // carries the date.
        let text = raw.rsplit('|').next().unwrap_or(raw).trim();
        if text.is_empty() {
            return None;
        }

        let lower = text.to_lowercase();
        if lower.contains("today") {
            return Some(ActivityDate(self.today));
        }
        if lower.contains("yesterday") {
            return self.today.checked_sub_days(Days::new(1)).map(ActivityDate);
        }
        if lower.contains("tomorrow") {
            return self.today.checked_add_days(Days::new(1)).map(ActivityDate);
        }

        let cleaned = if lower.contains("overdue") {
            title_case(lower.replace("overdue", "").trim())
        } else {
            text.to_string()
        };

        self.parse_explicit(&cleaned)
    }

    fn parse_explicit(&self, text: &str) -> Option<ActivityDate> {
        if let Ok(d) = NaiveDate::parse_from_str(text, "%d-%b-%Y") {
            // A two-digit trailing year also satisfies %Y; route it through
            // %y below so "24" means 2024, not year 24.
            if d.year() >= 100 {
                return Some(ActivityDate(d));
            }
        }
        if let Ok(d) = NaiveDate::parse_from_str(text, "%d-%b-%y") {
            return Some(ActivityDate(d));
        }
        // Day and month with the year omitted: assume the reference year.
        let with_year = format!("{}-{}", text, self.today.format("%Y"));
        if let Ok(d) = NaiveDate::parse_from_str(&with_year, "%d-%b-%Y") {
            return Some(ActivityDate(d));
        }
        NaiveDate::parse_from_str(text, "%m/%d/%Y")
            .ok()
            .map(ActivityDate)
    }
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest
/// ("05-jan" becomes "05-Jan").
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> DateNormalizer {
        DateNormalizer::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
    }

    fn expect(raw: &str, want: &str) {
        let got = normalizer().normalize(raw);
        assert_eq!(got.map(|d| d.to_string()).as_deref(), Some(want), "input: {raw:?}");
    }

    #[test]
    fn relative_keywords() {
        expect("Today", "15-Mar-2024");
        expect("Yesterday", "14-Mar-2024");
        expect("Tomorrow", "16-Mar-2024");
    }

    #[test]
    fn explicit_four_digit_year() {
        expect("05-Jan-2024", "05-Jan-2024");
    }

    #[test]
    fn explicit_two_digit_year() {
        expect("05-Jan-24", "05-Jan-2024");
    }

    #[test]
    fn year_omitted_assumes_reference_year() {
        expect("05-Jan", "05-Jan-2024");
    }

    #[test]
    fn slash_separated() {
        expect("01/09/2024", "09-Jan-2024");
    }

    #[test]
    fn label_before_pipe_is_stripped() {
        expect("Task | 05-Jan-2024", "05-Jan-2024");
        expect("Call | Due | Yesterday", "14-Mar-2024");
    }

    #[test]
    fn overdue_with_date_remainder() {
        expect("Overdue 05-jan", "05-Jan-2024");
    }

    #[test]
    fn overdue_without_date_is_dropped() {
        assert_eq!(normalizer().normalize("3 Overdue"), None);
    }

    #[test]
    fn unparseable_and_empty_are_dropped() {
        assert_eq!(normalizer().normalize(""), None);
        assert_eq!(normalizer().normalize("   "), None);
        assert_eq!(normalizer().normalize("Label |"), None);
        assert_eq!(normalizer().normalize("no date here"), None);
    }

    #[test]
    fn title_case_restores_month_capitalization() {
        assert_eq!(title_case("05-jan"), "05-Jan");
        assert_eq!(title_case("hello world"), "Hello World");
    }
}
