use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionAction {
    Approve,
    Reject,
    Pay,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Rejected => "rejected",
            TransactionStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TransactionStatus::Pending),
            "approved" => Some(TransactionStatus::Approved),
            "rejected" => Some(TransactionStatus::Rejected),
            "paid" => Some(TransactionStatus::Paid),
            _ => None,
        }
    }

    pub fn apply(&self, action: TransactionAction) -> Option<TransactionStatus> {
        match (self, action) {
            (TransactionStatus::Pending, TransactionAction::Approve) => Some(TransactionStatus::Approved),
            (TransactionStatus::Pending, TransactionAction::Reject) => Some(TransactionStatus::Rejected),
            (TransactionStatus::Approved, TransactionAction::Pay) => Some(TransactionStatus::Paid),
            _ => None,
        }
    }

    /// Vouchers exist only for money that has been authorised
    pub fn allows_voucher(&self) -> bool {
        matches!(self, TransactionStatus::Approved | TransactionStatus::Paid)
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionAction::*;
    use super::TransactionStatus::*;

    #[test]
    fn approval_flow() {
        assert_eq!(Pending.apply(Approve), Some(Approved));
        assert_eq!(Pending.apply(Reject), Some(Rejected));
        assert_eq!(Approved.apply(Pay), Some(Paid));
        assert_eq!(Pending.apply(Pay), None);
        assert_eq!(Rejected.apply(Approve), None);
        assert_eq!(Paid.apply(Pay), None);
    }

    #[test]
    fn voucher_needs_authorisation() {
        assert!(!Pending.allows_voucher());
        assert!(!Rejected.allows_voucher());
        assert!(Approved.allows_voucher());
        assert!(Paid.allows_voucher());
    }
}
