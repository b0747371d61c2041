use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Lenient date parsing for forum export cells. Anything unrecognised is `None`.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    parse_datetime_string(s)
        .or_else(|| parse_date_only(s))
        .or_else(|| parse_epoch_string(s))
}

fn parse_datetime_string(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    let zoned = [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%z",
    ];
    for f in zoned.iter() {
        if let Ok(dt) = DateTime::parse_from_str(s, f) {
            return Some(dt.with_timezone(&Utc).naive_utc());
        }
    }
    let naive = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for f in naive.iter() {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(ndt);
        }
    }
    None
}

fn parse_date_only(s: &str) -> Option<NaiveDateTime> {
    let fmts = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];
    fmts.iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_epoch_string(s: &str) -> Option<NaiveDateTime> {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let n = s.parse::<i64>().ok()?;
    let dt = match s.len() {
        10 => DateTime::<Utc>::from_timestamp(n, 0),
        13 => DateTime::<Utc>::from_timestamp_millis(n),
        16 => DateTime::<Utc>::from_timestamp_micros(n),
        _ => None,
    };
    dt.map(|d| d.naive_utc())
}

/// Calendar month key (`YYYY-MM`) for a parsed date.
pub fn month_key(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_iso_date_only() {
        let d = parse_date("2023-01-15").expect("date");
        assert_eq!((d.year(), d.month(), d.day()), (2023, 1, 15));
        assert_eq!(d.hour(), 0);
    }

    #[test]
    fn parses_datetime_with_offset_to_utc() {
        let d = parse_date("2024-03-01T10:00:00+02:00").expect("date");
        assert_eq!(d.hour(), 8);
    }

    #[test]
    fn parses_european_and_epoch_forms() {
        assert!(parse_date("15.01.2023 13:45").is_some());
        let d = parse_date("1700000000").expect("epoch");
        assert_eq!(d.year(), 2023);
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("2023-13-45").is_none());
        assert!(parse_date("   ").is_none());
    }

    #[test]
    fn month_key_is_zero_padded() {
        let d = parse_date("2023-02-01").unwrap();
        assert_eq!(month_key(&d), "2023-02");
    }
}
