use chrono::NaiveDate;
use serde::Serialize;

use crate::entity::imprest;
use crate::error::{AppError, AppResult};

/// Largest single imprest (one trillion shillings)
pub const MAX_IMPREST_CENTS: i64 = 100_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImprestStatus {
    Outstanding,
    Retired,
}

impl ImprestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImprestStatus::Outstanding => "outstanding",
            ImprestStatus::Retired => "retired",
        }
    }
}

/// An outstanding imprest past its due date
pub fn is_overdue(entry: &imprest::Model, today: NaiveDate) -> bool {
    entry.status == ImprestStatus::Outstanding.as_str() && entry.due_on < today
}

/// Register totals in cents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterSummary {
    #[serde(rename = "outstandingCount")]
    pub outstanding_count: usize,
    #[serde(rename = "outstandingAmount")]
    pub outstanding_amount: i64,
    #[serde(rename = "overdueCount")]
    pub overdue_count: usize,
    #[serde(rename = "overdueAmount")]
    pub overdue_amount: i64,
    #[serde(rename = "retiredAmount")]
    pub retired_amount: i64,
}

/// Register totals. A total that would overflow is a validation error.
pub fn register_summary(entries: &[imprest::Model], today: NaiveDate) -> AppResult<RegisterSummary> {
    let mut summary = RegisterSummary::default();
    for entry in entries {
        if entry.status == ImprestStatus::Retired.as_str() {
            let retired = entry.amount_retired_cents.unwrap_or(entry.amount_cents);
            summary.retired_amount = add_cents(summary.retired_amount, retired, "retiredAmount")?;
            continue;
        }
        summary.outstanding_count += 1;
        summary.outstanding_amount =
            add_cents(summary.outstanding_amount, entry.amount_cents, "outstandingAmount")?;
        if is_overdue(entry, today) {
            summary.overdue_count += 1;
            summary.overdue_amount =
                add_cents(summary.overdue_amount, entry.amount_cents, "overdueAmount")?;
        }
    }
    Ok(summary)
}

fn add_cents(total: i64, amount: i64, name: &str) -> AppResult<i64> {
    total
        .checked_add(amount)
        .ok_or_else(|| AppError::Validation(format!("{}: total is too large", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(id: i64, amount: i64, due_on: NaiveDate, retired: Option<i64>) -> imprest::Model {
        imprest::Model {
            id,
            holder_name: "Jane Wanjiru".to_string(),
            holder_personal_number: "2019001234".to_string(),
            purpose: "Field visit".to_string(),
            amount_cents: amount,
            issued_on: date(2026, 9, 1),
            due_on,
            retired_on: retired.map(|_| date(2026, 9, 20)),
            amount_retired_cents: retired,
            status: if retired.is_some() { "retired" } else { "outstanding" }.to_string(),
            created_by: 1,
            created_at: 0,
        }
    }

    #[test]
    fn overdue_only_when_outstanding_and_past_due() {
        let today = date(2026, 10, 19);
        assert!(is_overdue(&entry(1, 100, date(2026, 10, 18), None), today));
        assert!(!is_overdue(&entry(2, 100, date(2026, 10, 19), None), today));
        assert!(!is_overdue(&entry(3, 100, date(2026, 10, 1), Some(90)), today));
    }

    #[test]
    fn summary_totals() {
        let today = date(2026, 10, 19);
        let entries = vec![
            entry(1, 50_000_00, date(2026, 10, 1), None),
            entry(2, 20_000_00, date(2026, 11, 1), None),
            entry(3, 10_000_00, date(2026, 9, 30), Some(9_500_00)),
        ];
        let summary = register_summary(&entries, today).unwrap();
        assert_eq!(summary.outstanding_count, 2);
        assert_eq!(summary.outstanding_amount, 70_000_00);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.overdue_amount, 50_000_00);
        assert_eq!(summary.retired_amount, 9_500_00);
    }

    #[test]
    fn overflowing_register_is_rejected() {
        let today = date(2026, 10, 19);
        let entries = vec![
            entry(1, i64::MAX, date(2026, 11, 1), None),
            entry(2, 1, date(2026, 11, 1), None),
        ];
        let err = register_summary(&entries, today).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("outstandingAmount:")));
    }
}
