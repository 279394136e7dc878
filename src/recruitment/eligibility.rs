//! Job eligibility
//!
//! Matches an applicant's education records against a job's requirements.
//! The first record that satisfies every requirement makes the applicant
//! eligible; otherwise the reason reported is the one for the last record
//! checked.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::progression::{can_progress, elapsed_years, linear_rules, same_level};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobRequirements {
    pub required_study_area: Option<String>,
    pub specializations: Vec<String>,
    pub certificate_level: Option<String>,
    pub progression_allowed: bool,
    pub min_experience_years: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EducationRecord {
    pub study_area: String,
    pub specialization: String,
    pub certificate_level: String,
    pub graduation_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmploymentRecord {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EligibilityResult {
    fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
        }
    }
}

/// Decide whether an applicant qualifies for a job.
///
/// `levels` is the certificate ladder, lowest first. It ranks levels and,
/// when the job allows progression, supplies one rule per consecutive pair
/// with `years_per_level` minimum years from the graduation date.
pub fn check_eligibility(
    authenticated: bool,
    job: &JobRequirements,
    education: &[EducationRecord],
    employment: &[EmploymentRecord],
    levels: &[String],
    years_per_level: f64,
    now: NaiveDate,
) -> EligibilityResult {
    if !authenticated {
        return EligibilityResult::rejected("Sign in to check eligibility");
    }
    if education.is_empty() {
        return EligibilityResult::rejected("No education records on profile");
    }

    let mut last_reason = String::new();
    let mut matched = false;
    for record in education {
        match check_record(job, record, levels, years_per_level, now) {
            Ok(()) => {
                matched = true;
                break;
            }
            Err(reason) => last_reason = reason,
        }
    }
    if !matched {
        return EligibilityResult::rejected(last_reason);
    }

    if job.min_experience_years > 0 {
        let years = total_experience_years(employment, now);
        if years < f64::from(job.min_experience_years) {
            return EligibilityResult::rejected(format!(
                "Requires {} years of experience, {:.1} on record",
                job.min_experience_years, years
            ));
        }
    }

    EligibilityResult::eligible()
}

fn check_record(
    job: &JobRequirements,
    record: &EducationRecord,
    levels: &[String],
    years_per_level: f64,
    now: NaiveDate,
) -> Result<(), String> {
    if let Some(area) = non_blank(job.required_study_area.as_deref()) {
        if !same_level(area, &record.study_area) {
            return Err(format!(
                "Study area {} does not match required {}",
                record.study_area, area
            ));
        }
    }

    if !job.specializations.is_empty()
        && !job
            .specializations
            .iter()
            .any(|s| same_level(s, &record.specialization))
    {
        return Err(format!(
            "Specialization {} is not among: {}",
            record.specialization,
            job.specializations.join(", ")
        ));
    }

    let Some(required) = non_blank(job.certificate_level.as_deref()) else {
        return Ok(());
    };
    if same_level(required, &record.certificate_level) {
        return Ok(());
    }
    if let (Some(have), Some(need)) = (rank(levels, &record.certificate_level), rank(levels, required)) {
        if have > need {
            return Ok(());
        }
    }

    if !job.progression_allowed {
        return Err(format!(
            "Requires {} certificate, found {}",
            required, record.certificate_level
        ));
    }

    let Some(graduated) = record.graduation_date else {
        return Err(format!(
            "Graduation date for {} is needed to assess progression",
            record.certificate_level
        ));
    };
    let rules = linear_rules(levels, years_per_level);
    let check = can_progress(&record.certificate_level, required, graduated, &rules, now);
    if check.allowed {
        Ok(())
    } else {
        Err(check.reason.unwrap_or_default())
    }
}

/// Sum of employment durations; open-ended records run to `now`
pub fn total_experience_years(employment: &[EmploymentRecord], now: NaiveDate) -> f64 {
    employment
        .iter()
        .map(|e| {
            let end = e.end_date.unwrap_or(now).min(now);
            if end > e.start_date {
                elapsed_years(e.start_date, end)
            } else {
                0.0
            }
        })
        .sum()
}

fn rank(levels: &[String], level: &str) -> Option<usize> {
    levels.iter().position(|l| same_level(l, level))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn levels() -> Vec<String> {
        ["Certificate", "Diploma", "Degree", "Masters"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn record(area: &str, specialization: &str, level: &str, graduated: Option<NaiveDate>) -> EducationRecord {
        EducationRecord {
            study_area: area.to_string(),
            specialization: specialization.to_string(),
            certificate_level: level.to_string(),
            graduation_date: graduated,
        }
    }

    fn check(job: &JobRequirements, education: &[EducationRecord]) -> EligibilityResult {
        check_eligibility(true, job, education, &[], &levels(), 3.0, date(2026, 10, 19))
    }

    #[test]
    fn unrestricted_job_accepts_any_record() {
        let job = JobRequirements::default();
        let result = check(&job, &[record("Arts", "History", "Certificate", None)]);
        assert_eq!(result, EligibilityResult::eligible());
    }

    #[test]
    fn unauthenticated_is_never_eligible() {
        let job = JobRequirements::default();
        let result = check_eligibility(
            false,
            &job,
            &[record("Arts", "History", "Degree", None)],
            &[],
            &levels(),
            3.0,
            date(2026, 10, 19),
        );
        assert!(!result.eligible);
    }

    #[test]
    fn no_records_is_not_eligible() {
        let result = check(&JobRequirements::default(), &[]);
        assert!(!result.eligible);
        assert_eq!(result.reason.as_deref(), Some("No education records on profile"));
    }

    #[test]
    fn first_full_match_wins() {
        let job = JobRequirements {
            required_study_area: Some("Business".to_string()),
            specializations: vec!["Accounting".to_string(), "Finance".to_string()],
            certificate_level: Some("Degree".to_string()),
            ..Default::default()
        };
        let result = check(
            &job,
            &[
                record("Health", "Nursing", "Diploma", None),
                record("business", "finance", "degree", None),
            ],
        );
        assert!(result.eligible);
    }

    #[test]
    fn reason_comes_from_last_record() {
        let job = JobRequirements {
            required_study_area: Some("Business".to_string()),
            specializations: vec!["Accounting".to_string()],
            ..Default::default()
        };
        let result = check(
            &job,
            &[
                record("Health", "Nursing", "Diploma", None),
                record("Business", "Marketing", "Degree", None),
            ],
        );
        assert!(!result.eligible);
        assert!(result.reason.unwrap().starts_with("Specialization Marketing"));
    }

    #[test]
    fn higher_level_satisfies_requirement() {
        let job = JobRequirements {
            certificate_level: Some("Diploma".to_string()),
            ..Default::default()
        };
        assert!(check(&job, &[record("Arts", "History", "Masters", None)]).eligible);
        assert!(!check(&job, &[record("Arts", "History", "Certificate", None)]).eligible);
    }

    #[test]
    fn progression_from_level_below() {
        let job = JobRequirements {
            certificate_level: Some("Degree".to_string()),
            progression_allowed: true,
            ..Default::default()
        };
        let seasoned = record("Arts", "History", "Diploma", Some(date(2020, 6, 1)));
        let fresh = record("Arts", "History", "Diploma", Some(date(2025, 6, 1)));
        let undated = record("Arts", "History", "Diploma", None);
        let two_below = record("Arts", "History", "Certificate", Some(date(2000, 1, 1)));

        assert!(check(&job, &[seasoned]).eligible);
        assert!(!check(&job, &[fresh]).eligible);
        assert!(!check(&job, &[undated]).eligible);
        assert!(!check(&job, &[two_below]).eligible);
    }

    #[test]
    fn experience_requirement() {
        let job = JobRequirements {
            min_experience_years: 3,
            ..Default::default()
        };
        let education = [record("Arts", "History", "Degree", None)];
        let short = [EmploymentRecord {
            start_date: date(2025, 1, 1),
            end_date: None,
        }];
        let long = [
            EmploymentRecord {
                start_date: date(2018, 1, 1),
                end_date: Some(date(2020, 1, 1)),
            },
            EmploymentRecord {
                start_date: date(2024, 1, 1),
                end_date: None,
            },
        ];
        let now = date(2026, 10, 19);
        assert!(!check_eligibility(true, &job, &education, &short, &levels(), 3.0, now).eligible);
        assert!(check_eligibility(true, &job, &education, &long, &levels(), 3.0, now).eligible);
    }

    #[test]
    fn experience_ignores_future_and_inverted_ranges() {
        let now = date(2026, 1, 1);
        let records = [EmploymentRecord {
            start_date: date(2027, 1, 1),
            end_date: None,
        }];
        assert_eq!(total_experience_years(&records, now), 0.0);
    }
}
