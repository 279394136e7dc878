//! Application deadline labels

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Expired,
    Today,
    Soon,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineLabel {
    pub text: String,
    pub urgency: Urgency,
}

/// Days left within which a deadline is shown as a countdown
const SOON_DAYS: i64 = 7;

/// Label a deadline relative to today. Both are compared as plain dates.
pub fn format_deadline(deadline: NaiveDate, today: NaiveDate) -> DeadlineLabel {
    let days_left = (deadline - today).num_days();
    let (text, urgency) = match days_left {
        d if d < 0 => ("Expired".to_string(), Urgency::Expired),
        0 => ("Closes Today".to_string(), Urgency::Today),
        1 => ("Closes Tomorrow".to_string(), Urgency::Soon),
        d if d <= SOON_DAYS => (format!("Closes in {} days", d), Urgency::Soon),
        _ => (
            format!("Closes on {}", deadline.format("%-d %b %Y")),
            Urgency::Open,
        ),
    };
    DeadlineLabel { text, urgency }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn today_and_yesterday() {
        let today = date(2026, 10, 19);
        assert_eq!(format_deadline(today, today).text, "Closes Today");
        let expired = format_deadline(date(2026, 10, 18), today);
        assert_eq!(expired.text, "Expired");
        assert_eq!(expired.urgency, Urgency::Expired);
    }

    #[test]
    fn countdown_and_far_dates() {
        let today = date(2026, 10, 19);
        assert_eq!(format_deadline(date(2026, 10, 20), today).text, "Closes Tomorrow");
        assert_eq!(format_deadline(date(2026, 10, 24), today).text, "Closes in 5 days");
        let far = format_deadline(date(2026, 12, 1), today);
        assert_eq!(far.text, "Closes on 1 Dec 2026");
        assert_eq!(far.urgency, Urgency::Open);
    }
}
