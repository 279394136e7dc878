use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declaration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Locked,
}

impl DialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialStatus::Draft => "draft",
            DialStatus::Submitted => "submitted",
            DialStatus::UnderReview => "under_review",
            DialStatus::Approved => "approved",
            DialStatus::Rejected => "rejected",
            DialStatus::Locked => "locked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(DialStatus::Draft),
            "submitted" => Some(DialStatus::Submitted),
            "under_review" => Some(DialStatus::UnderReview),
            "approved" => Some(DialStatus::Approved),
            "rejected" => Some(DialStatus::Rejected),
            "locked" => Some(DialStatus::Locked),
            _ => None,
        }
    }

    /// Header, spouses, dependents and items may change only in draft
    pub fn is_editable(&self) -> bool {
        *self == DialStatus::Draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialAction {
    Submit,
    StartReview,
    Approve,
    Reject,
    Lock,
    /// Start a new draft version from a reviewed declaration
    Amend,
}

impl DialAction {
    /// Reviewer actions; the rest belong to the declarant
    pub fn is_review(&self) -> bool {
        matches!(
            self,
            DialAction::StartReview | DialAction::Approve | DialAction::Reject | DialAction::Lock
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("cannot {action:?} a declaration that is {from}")]
    InvalidTransition { from: &'static str, action: DialAction },

    #[error("{0}")]
    Incomplete(String),

    #[error("you cannot review your own declaration")]
    SelfReview,

    #[error("not your declaration")]
    NotDeclarant,

    #[error("remarks are required when rejecting")]
    RemarksRequired,

    #[error("declaration already amended as {0}")]
    AlreadyAmended(i64),
}

/// Status after applying `action` to a declaration in `from`.
///
/// For `Amend` the result is the status of the new version; the source
/// record keeps its status.
pub fn next_status(from: DialStatus, action: DialAction) -> Result<DialStatus, WorkflowError> {
    use DialAction::*;
    use DialStatus::*;

    match (from, action) {
        (Draft, Submit) => Ok(Submitted),
        (Submitted, StartReview) => Ok(UnderReview),
        (UnderReview, Approve) => Ok(Approved),
        (UnderReview, Reject) => Ok(Rejected),
        (Approved, Lock) => Ok(Locked),
        (Approved, Amend) | (Rejected, Amend) => Ok(Draft),
        _ => Err(WorkflowError::InvalidTransition {
            from: from.as_str(),
            action,
        }),
    }
}

/// Checks run before a draft may be submitted
pub fn validate_submission(
    period_start: NaiveDate,
    period_end: NaiveDate,
    item_count: usize,
) -> Result<(), WorkflowError> {
    if period_end < period_start {
        return Err(WorkflowError::Incomplete(
            "declaration period ends before it starts".to_string(),
        ));
    }
    if item_count == 0 {
        return Err(WorkflowError::Incomplete(
            "declaration has no income, asset or liability items".to_string(),
        ));
    }
    Ok(())
}

/// What a workflow action is checked against
#[derive(Debug, Clone)]
pub struct ActionCheck<'a> {
    pub action: DialAction,
    pub status: DialStatus,
    pub declarant_id: i64,
    pub actor_id: i64,
    pub remarks: Option<&'a str>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Statement items on the record; only read for `Submit`
    pub item_count: usize,
    /// Existing newer version of the record; only read for `Amend`
    pub amended_as: Option<i64>,
}

/// Apply every rule an action must pass and return the resulting status.
///
/// Reviewers act only on other people's declarations and declarants only
/// on their own.
pub fn check_action(check: &ActionCheck<'_>) -> Result<DialStatus, WorkflowError> {
    if check.action.is_review() {
        if check.actor_id == check.declarant_id {
            return Err(WorkflowError::SelfReview);
        }
    } else if check.actor_id != check.declarant_id {
        return Err(WorkflowError::NotDeclarant);
    }

    let to = next_status(check.status, check.action)?;

    match check.action {
        DialAction::Submit => {
            validate_submission(check.period_start, check.period_end, check.item_count)?
        }
        DialAction::Reject => {
            if check.remarks.map(str::trim).unwrap_or("").is_empty() {
                return Err(WorkflowError::RemarksRequired);
            }
        }
        DialAction::Amend => {
            if let Some(id) = check.amended_as {
                return Err(WorkflowError::AlreadyAmended(id));
            }
        }
        _ => {}
    }
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::DialAction::*;
    use super::DialStatus::*;
    use super::*;

    #[test]
    fn happy_path() {
        let mut status = Draft;
        for action in [Submit, StartReview, Approve, Lock] {
            status = next_status(status, action).unwrap();
        }
        assert_eq!(status, Locked);
    }

    #[test]
    fn rejection_then_amend() {
        assert_eq!(next_status(UnderReview, Reject), Ok(Rejected));
        assert_eq!(next_status(Rejected, Amend), Ok(Draft));
        assert_eq!(next_status(Approved, Amend), Ok(Draft));
    }

    #[test]
    fn locked_is_terminal() {
        for action in [Submit, StartReview, Approve, Reject, Lock, Amend] {
            assert!(next_status(Locked, action).is_err());
        }
    }

    #[test]
    fn review_steps_cannot_be_skipped() {
        assert!(next_status(Draft, Approve).is_err());
        assert!(next_status(Submitted, Approve).is_err());
        assert!(next_status(Submitted, Submit).is_err());
        assert_eq!(
            next_status(Draft, Lock),
            Err(WorkflowError::InvalidTransition {
                from: "draft",
                action: Lock
            })
        );
    }

    #[test]
    fn only_drafts_are_editable() {
        assert!(Draft.is_editable());
        for status in [Submitted, UnderReview, Approved, Rejected, Locked] {
            assert!(!status.is_editable());
        }
    }

    #[test]
    fn status_names_round_trip() {
        for status in [Draft, Submitted, UnderReview, Approved, Rejected, Locked] {
            assert_eq!(DialStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn submission_checks() {
        let start = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        assert!(validate_submission(start, end, 3).is_ok());
        assert!(validate_submission(end, start, 3).is_err());
        assert!(validate_submission(start, end, 0).is_err());
    }

    fn check(action: DialAction, status: DialStatus) -> ActionCheck<'static> {
        ActionCheck {
            action,
            status,
            declarant_id: 10,
            actor_id: 10,
            remarks: None,
            period_start: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            item_count: 2,
            amended_as: None,
        }
    }

    #[test]
    fn reviewers_cannot_review_themselves() {
        for action in [StartReview, Approve, Reject, Lock] {
            let mut c = check(action, UnderReview);
            c.remarks = Some("incomplete");
            assert_eq!(check_action(&c), Err(WorkflowError::SelfReview));
        }

        let mut c = check(Approve, UnderReview);
        c.actor_id = 20;
        assert_eq!(check_action(&c), Ok(Approved));
    }

    #[test]
    fn only_the_declarant_submits_and_amends() {
        let mut c = check(Submit, Draft);
        c.actor_id = 20;
        assert_eq!(check_action(&c), Err(WorkflowError::NotDeclarant));

        let mut c = check(Amend, Approved);
        c.actor_id = 20;
        assert_eq!(check_action(&c), Err(WorkflowError::NotDeclarant));
    }

    #[test]
    fn reject_needs_remarks() {
        let mut c = check(Reject, UnderReview);
        c.actor_id = 20;
        assert_eq!(check_action(&c), Err(WorkflowError::RemarksRequired));

        c.remarks = Some("   ");
        assert_eq!(check_action(&c), Err(WorkflowError::RemarksRequired));

        c.remarks = Some("spouse income missing");
        assert_eq!(check_action(&c), Ok(Rejected));
    }

    #[test]
    fn submit_needs_items() {
        let mut c = check(Submit, Draft);
        c.item_count = 0;
        assert!(matches!(check_action(&c), Err(WorkflowError::Incomplete(_))));

        c.item_count = 1;
        assert_eq!(check_action(&c), Ok(Submitted));
    }

    #[test]
    fn amend_happens_once() {
        let mut c = check(Amend, Approved);
        assert_eq!(check_action(&c), Ok(Draft));

        c.amended_as = Some(31);
        assert_eq!(check_action(&c), Err(WorkflowError::AlreadyAmended(31)));
    }

    #[test]
    fn transition_is_checked_before_action_rules() {
        let mut c = check(Reject, Draft);
        c.actor_id = 20;
        assert!(matches!(
            check_action(&c),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }
}
