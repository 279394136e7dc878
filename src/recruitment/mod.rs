//! Recruitment rules
//!
//! Pure functions over caller-supplied records: qualification progression,
//! job eligibility and deadline labels. Nothing here touches the database.

pub mod deadline;
pub mod eligibility;
pub mod progression;

pub use deadline::{format_deadline, DeadlineLabel, Urgency};
pub use eligibility::{
    check_eligibility, total_experience_years, EducationRecord, EligibilityResult,
    EmploymentRecord, JobRequirements,
};
pub use progression::{can_progress, elapsed_years, linear_rules, ProgressionCheck, ProgressionRule};
