// ⏰ Listing expiry - when a computed listing goes stale
//
// New listings are published at a fixed hour in the business timezone,
// Sunday through Thursday. A listing expires at the next publish instant.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryPolicy {
    pub tz: Tz,
    /// Hour of day (0-23) in `tz` at which listings are published
    pub publish_hour: u32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        ExpiryPolicy {
            tz: chrono_tz::America::New_York,
            publish_hour: 20,
        }
    }
}

fn is_publish_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Fri | Weekday::Sat)
}

impl ExpiryPolicy {
    pub fn new(tz: Tz, publish_hour: u32) -> Self {
        ExpiryPolicy {
            tz,
            publish_hour: publish_hour.min(23),
        }
    }

    /// Publish instant on a local date; a skipped hour (DST gap) moves forward
    fn publish_instant(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let mut local = date.and_hms_opt(self.publish_hour, 0, 0)?;
        for _ in 0..3 {
            match self.tz.from_local_datetime(&local) {
                LocalResult::Single(dt) => return Some(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
                LocalResult::None => local += Duration::hours(1),
            }
        }
        None
    }

    /// First publish instant strictly after `now`
    pub fn next_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = now.with_timezone(&self.tz).date_naive();

        // A publish day occurs at least every three days
        for _ in 0..8 {
            if is_publish_day(date.weekday()) {
                if let Some(instant) = self.publish_instant(date) {
                    if instant > now {
                        return instant;
                    }
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        now + Duration::days(1)
    }

    pub fn gen_expires(&self) -> DateTime<Utc> {
        self.next_expiry(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_same_day_before_publish() {
        let policy = ExpiryPolicy::default();
        // Monday 2024-01-15 10:00 EST
        let now = utc(2024, 1, 15, 15, 0);
        // Monday 20:00 EST = 01:00 UTC Tuesday
        assert_eq!(policy.next_expiry(now), utc(2024, 1, 16, 1, 0));
    }

    #[test]
    fn test_after_publish_rolls_to_next_day() {
        let policy = ExpiryPolicy::default();
        // Monday 2024-01-15 21:00 EST
        let now = utc(2024, 1, 16, 2, 0);
        assert_eq!(policy.next_expiry(now), utc(2024, 1, 17, 1, 0));
    }

    #[test]
    fn test_skips_friday_and_saturday() {
        let policy = ExpiryPolicy::default();
        // Thursday 2024-01-18 21:00 EST → Sunday 2024-01-21 20:00 EST
        let now = utc(2024, 1, 19, 2, 0);
        assert_eq!(policy.next_expiry(now), utc(2024, 1, 22, 1, 0));
    }

    #[test]
    fn test_daylight_saving_offset() {
        let policy = ExpiryPolicy::default();
        // Monday 2024-07-15 12:00 EDT; 20:00 EDT = 00:00 UTC
        let now = utc(2024, 7, 15, 16, 0);
        assert_eq!(policy.next_expiry(now), utc(2024, 7, 16, 0, 0));
    }

    #[test]
    fn test_utc_policy() {
        let policy = ExpiryPolicy::new(chrono_tz::UTC, 14);
        let now = utc(2024, 1, 15, 9, 30);
        assert_eq!(policy.next_expiry(now), utc(2024, 1, 15, 14, 0));
    }
}
