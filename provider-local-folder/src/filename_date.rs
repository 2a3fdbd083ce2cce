//! Capture dates embedded in file names
//!
//! Phones and cameras commonly name files after the moment they were taken:
//! `IMG_20230714_093000.jpg`, `PXL_20230714_093000123.jpg`,
//! `20230714_093000_001.jpg`, `Screenshot 2023-07-14 09.30.00.png`. The
//! date is read as local time.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_IN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?:^|\D)
        (?P<y>(?:19|20)\d{2}) [-_.]? (?P<m>\d{2}) [-_.]? (?P<d>\d{2})
        (?: [-_.\sT]? (?P<hh>\d{2}) [-_.:]? (?P<mm>\d{2}) [-_.:]? (?P<ss>\d{2}) )?
        ",
    )
    .expect("valid regex")
});

/// Capture time encoded in `name`, if any
pub fn date_from_name(name: &str) -> Option<DateTime<Utc>> {
    DATE_IN_NAME.captures_iter(name).find_map(|caps| {
        let number = |key: &str| caps.name(key).and_then(|m| m.as_str().parse::<u32>().ok());

        let date = NaiveDate::from_ymd_opt(number("y")? as i32, number("m")?, number("d")?)?;
        let time = match (number("hh"), number("mm"), number("ss")) {
            (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_opt(h, m, s)?,
            _ => NaiveTime::MIN,
        };

        Local
            .from_local_datetime(&NaiveDateTime::new(date, time))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_phone_names() {
        assert_eq!(
            date_from_name("IMG_20230714_093000.jpg"),
            Some(local(2023, 7, 14, 9, 30, 0))
        );
        assert_eq!(
            date_from_name("20231014_100000_001.jpg"),
            Some(local(2023, 10, 14, 10, 0, 0))
        );
        assert_eq!(
            date_from_name("Screenshot 2023-07-14 09.30.00.png"),
            Some(local(2023, 7, 14, 9, 30, 0))
        );
    }

    #[test]
    fn test_date_only() {
        assert_eq!(
            date_from_name("2021-12-25 Christmas.jpg"),
            Some(local(2021, 12, 25, 0, 0, 0))
        );
    }

    #[test]
    fn test_no_date() {
        assert_eq!(date_from_name("IMG_0001.JPG"), None);
        assert_eq!(date_from_name("holiday.jpg"), None);
        assert_eq!(date_from_name("IMG_20231399_000000.jpg"), None);
    }
}
