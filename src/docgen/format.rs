//! Currency, amount-in-words and date formatting for vouchers

use chrono::{Datelike, NaiveDate};

const ONES: [&str; 20] = [
    "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const SCALES: [(u64, &str); 4] = [
    (1_000_000_000_000, "Trillion"),
    (1_000_000_000, "Billion"),
    (1_000_000, "Million"),
    (1_000, "Thousand"),
];

/// `123456750` cents → `1,234,567.50`
pub fn format_currency(cents: i64) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let fraction = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{:02}", if negative { "-" } else { "" }, grouped, fraction)
}

/// Spell a whole number in English words, e.g. `1205` → `One Thousand Two Hundred Five`
pub fn number_to_words(n: u64) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut rest = n;
    for (scale, name) in SCALES {
        if rest >= scale {
            parts.push(format!("{} {}", below_thousand(rest / scale), name));
            rest %= scale;
        }
    }
    if rest > 0 {
        parts.push(below_thousand(rest));
    }
    parts.join(" ")
}

fn below_thousand(n: u64) -> String {
    let mut words: Vec<&str> = Vec::new();
    let hundreds = n / 100;
    let rest = (n % 100) as usize;
    // numbers of a trillion or more recurse through the leading group
    if hundreds >= 10 {
        return number_to_words(n);
    }
    if hundreds > 0 {
        words.push(ONES[hundreds as usize]);
        words.push("Hundred");
    }
    if rest >= 20 {
        words.push(TENS[rest / 10]);
        if rest % 10 > 0 {
            words.push(ONES[rest % 10]);
        }
    } else if rest > 0 {
        words.push(ONES[rest]);
    }
    words.join(" ")
}

/// Voucher wording of an amount in cents
pub fn amount_in_words(cents: i64) -> String {
    let abs = cents.unsigned_abs();
    let shillings = abs / 100;
    let fraction = abs % 100;

    let mut text = String::new();
    if cents < 0 {
        text.push_str("Minus ");
    }
    text.push_str(&number_to_words(shillings));
    text.push_str(" Shillings");
    if fraction > 0 {
        text.push_str(" and ");
        text.push_str(&number_to_words(fraction));
        text.push_str(" Cents");
    }
    text.push_str(" Only");
    text
}

/// `2026-10-19` → `19th October 2026`
pub fn format_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{} {}", day, suffix, date.format("%B %Y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_grouping() {
        assert_eq!(format_currency(0), "0.00");
        assert_eq!(format_currency(5), "0.05");
        assert_eq!(format_currency(99_999), "999.99");
        assert_eq!(format_currency(100_000), "1,000.00");
        assert_eq!(format_currency(123_456_750), "1,234,567.50");
        assert_eq!(format_currency(-250_000), "-2,500.00");
    }

    #[test]
    fn words_for_numbers() {
        assert_eq!(number_to_words(0), "Zero");
        assert_eq!(number_to_words(13), "Thirteen");
        assert_eq!(number_to_words(40), "Forty");
        assert_eq!(number_to_words(105), "One Hundred Five");
        assert_eq!(number_to_words(1_205), "One Thousand Two Hundred Five");
        assert_eq!(
            number_to_words(1_234_567),
            "One Million Two Hundred Thirty Four Thousand Five Hundred Sixty Seven"
        );
        assert_eq!(number_to_words(2_000_000_000), "Two Billion");
    }

    #[test]
    fn amount_wording() {
        assert_eq!(amount_in_words(120_050), "One Thousand Two Hundred Shillings and Fifty Cents Only");
        assert_eq!(amount_in_words(700_000), "Seven Thousand Shillings Only");
        assert_eq!(amount_in_words(0), "Zero Shillings Only");
    }

    #[test]
    fn ordinal_dates() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
        assert_eq!(format_date(d(19)), "19th October 2026");
        assert_eq!(format_date(d(1)), "1st October 2026");
        assert_eq!(format_date(d(2)), "2nd October 2026");
        assert_eq!(format_date(d(3)), "3rd October 2026");
        assert_eq!(format_date(d(11)), "11th October 2026");
        assert_eq!(format_date(d(12)), "12th October 2026");
        assert_eq!(format_date(d(22)), "22nd October 2026");
        assert_eq!(format_date(d(31)), "31st October 2026");
    }
}
