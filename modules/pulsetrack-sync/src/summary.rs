use std::collections::BTreeSet;

use pulsetrack_common::{ActivityDate, ActivitySummary};

/// Aggregate normalized dates into (count, latest).
///
/// Dates are deduplicated as a set before counting, so repeated renderings of
/// the same date count once. An empty set yields `None` — never a zero-count
/// summary.
pub fn summarize<I>(dates: I) -> Option<ActivitySummary>
where
    I: IntoIterator<Item = ActivityDate>,
{
    let set: BTreeSet<ActivityDate> = dates.into_iter().collect();
    let latest = set.iter().next_back().copied()?;
    Some(ActivitySummary {
        count: set.len() as u32,
        latest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> ActivityDate {
        ActivityDate(NaiveDate::parse_from_str(s, "%d-%b-%Y").unwrap())
    }

    #[test]
    fn empty_input_yields_no_summary() {
        assert_eq!(summarize([]), None);
    }

    #[test]
    fn duplicates_collapse() {
        let summary = summarize([
            date("10-Mar-2024"),
            date("10-Mar-2024"),
            date("09-Mar-2024"),
        ])
        .unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.latest.to_string(), "10-Mar-2024");
    }

    #[test]
    fn latest_is_chronological_not_positional() {
        let summary = summarize([
            date("01-Jan-2024"),
            date("15-Dec-2023"),
            date("02-Feb-2024"),
        ])
        .unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.latest.to_string(), "02-Feb-2024");
    }

    #[test]
    fn single_date() {
        let summary = summarize([date("05-Jan-2024")]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.latest, date("05-Jan-2024"));
    }
}
