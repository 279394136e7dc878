//! Qualification progression
//!
//! A progression rule allows moving from one certificate level to another
//! once enough time has passed since the reference date (usually the
//! graduation date of the current qualification).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRule {
    pub from: String,
    pub to: String,
    #[serde(rename = "minYears")]
    pub min_years: Option<f64>,
    #[serde(rename = "extraRequirement")]
    pub extra_requirement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionCheck {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "extraRequirement", skip_serializing_if = "Option::is_none")]
    pub extra_requirement: Option<String>,
}

impl ProgressionCheck {
    fn denied(reason: String, extra_requirement: Option<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            extra_requirement,
        }
    }
}

/// Years between two dates, counted in calendar days over 365.25
pub fn elapsed_years(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_YEAR
}

/// Check whether `current` may progress to `target`.
///
/// Only the rule matching `(current, target)` exactly is consulted; there is
/// no chaining through intermediate levels.
pub fn can_progress(
    current: &str,
    target: &str,
    reference_date: NaiveDate,
    rules: &[ProgressionRule],
    now: NaiveDate,
) -> ProgressionCheck {
    let Some(rule) = rules
        .iter()
        .find(|r| same_level(&r.from, current) && same_level(&r.to, target))
    else {
        return ProgressionCheck::denied(
            format!("No progression path from {} to {}", current, target),
            None,
        );
    };

    if let Some(min_years) = rule.min_years {
        let elapsed = elapsed_years(reference_date, now);
        if elapsed < min_years {
            return ProgressionCheck::denied(
                format!(
                    "Requires at least {} years at {} level, {:.1} years elapsed",
                    min_years, current, elapsed
                ),
                rule.extra_requirement.clone(),
            );
        }
    }

    ProgressionCheck {
        allowed: true,
        reason: None,
        extra_requirement: rule.extra_requirement.clone(),
    }
}

/// One rule per consecutive pair of an ordered level list
pub fn linear_rules(levels: &[String], years_per_level: f64) -> Vec<ProgressionRule> {
    levels
        .windows(2)
        .map(|pair| ProgressionRule {
            from: pair[0].clone(),
            to: pair[1].clone(),
            min_years: Some(years_per_level),
            extra_requirement: None,
        })
        .collect()
}

pub(crate) fn same_level(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn diploma_to_degree(min_years: Option<f64>) -> Vec<ProgressionRule> {
        vec![ProgressionRule {
            from: "Diploma".to_string(),
            to: "Degree".to_string(),
            min_years,
            extra_requirement: Some("Bridging course".to_string()),
        }]
    }

    #[test]
    fn short_of_min_years_is_denied() {
        let rules = diploma_to_degree(Some(5.0));
        // 1789 days is about 4.9 years
        let check = can_progress("Diploma", "Degree", date(2020, 1, 1), &rules, date(2024, 11, 24));
        assert!(!check.allowed);
        let reason = check.reason.unwrap();
        assert!(reason.contains("at least 5 years"), "{}", reason);
        assert!(reason.contains("4.9"), "{}", reason);
    }

    #[test]
    fn reaching_min_years_is_allowed() {
        let rules = diploma_to_degree(Some(5.0));
        let check = can_progress("Diploma", "Degree", date(2020, 1, 1), &rules, date(2025, 1, 1));
        assert!(check.allowed);
        assert_eq!(check.reason, None);
        assert_eq!(check.extra_requirement.as_deref(), Some("Bridging course"));
    }

    #[test]
    fn missing_rule_is_denied() {
        let rules = diploma_to_degree(Some(1.0));
        let check = can_progress("Certificate", "Degree", date(2000, 1, 1), &rules, date(2025, 1, 1));
        assert!(!check.allowed);
        assert_eq!(
            check.reason.as_deref(),
            Some("No progression path from Certificate to Degree")
        );
    }

    #[test]
    fn rule_without_min_years_always_allows() {
        let rules = diploma_to_degree(None);
        let check = can_progress("diploma", " DEGREE ", date(2025, 1, 1), &rules, date(2025, 1, 2));
        assert!(check.allowed);
    }

    #[test]
    fn no_multi_hop() {
        let levels: Vec<String> = ["Certificate", "Diploma", "Degree"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rules = linear_rules(&levels, 1.0);
        assert_eq!(rules.len(), 2);
        let check = can_progress("Certificate", "Degree", date(2000, 1, 1), &rules, date(2025, 1, 1));
        assert!(!check.allowed);
    }

    #[test]
    fn elapsed_years_uses_quarter_day_year() {
        let years = elapsed_years(date(2021, 1, 1), date(2022, 1, 1));
        assert!((years - 365.0 / 365.25).abs() < 1e-9);
    }
}
