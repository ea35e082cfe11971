use std::cmp::Ordering;

use chrono::NaiveDate;

/// Calendar date of a feed entry. Anything that fails to parse becomes
/// `Invalid`, which orders before every valid date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryDate {
    Invalid,
    Valid(NaiveDate),
}

impl Ord for EntryDate {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (EntryDate::Invalid, EntryDate::Invalid) => Ordering::Equal,
            (EntryDate::Invalid, EntryDate::Valid(_)) => Ordering::Less,
            (EntryDate::Valid(_), EntryDate::Invalid) => Ordering::Greater,
            (EntryDate::Valid(a), EntryDate::Valid(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for EntryDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn parse_date(iso: &str) -> EntryDate {
    let mut parts = iso.trim().split('-');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return EntryDate::Invalid;
    };

    let parsed = (
        year.parse::<i32>(),
        month.parse::<u32>(),
        day.parse::<u32>(),
    );
    match parsed {
        (Ok(year), Ok(month), Ok(day)) => NaiveDate::from_ymd_opt(year, month, day)
            .map(EntryDate::Valid)
            .unwrap_or(EntryDate::Invalid),
        _ => EntryDate::Invalid,
    }
}

/// `"Oct 01, 2025"`, or the input untouched when it is not a date.
pub fn format_display_date(iso: &str) -> String {
    match parse_date(iso) {
        EntryDate::Valid(date) => date.format("%b %d, %Y").to_string(),
        EntryDate::Invalid => iso.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_valid_dates() {
        assert_eq!(format_display_date("2025-10-01"), "Oct 01, 2025");
        assert_eq!(format_display_date("1995-06-16"), "Jun 16, 1995");
    }

    #[test]
    fn leaves_unparseable_dates_alone() {
        assert_eq!(format_display_date("not-a-date"), "not-a-date");
        assert_eq!(format_display_date(""), "");
        assert_eq!(format_display_date("2025-02-30"), "2025-02-30");
    }

    #[test]
    fn rejects_malformed_shapes() {
        assert_eq!(parse_date("2025-10"), EntryDate::Invalid);
        assert_eq!(parse_date("2025-10-01-02"), EntryDate::Invalid);
        assert_eq!(parse_date("2025-13-01"), EntryDate::Invalid);
        assert_eq!(parse_date("20x5-10-01"), EntryDate::Invalid);
    }

    #[test]
    fn trims_whitespace() {
        assert!(matches!(parse_date(" 2024-01-05 "), EntryDate::Valid(_)));
    }

    #[test]
    fn invalid_dates_sort_oldest() {
        let valid = parse_date("1900-01-01");
        let invalid = parse_date("garbage");
        assert!(invalid < valid);
        assert_eq!(invalid.cmp(&parse_date("also garbage")), Ordering::Equal);
        assert!(parse_date("2025-10-02") > parse_date("2025-10-01"));
    }
}
