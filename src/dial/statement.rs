use serde::{Deserialize, Serialize};

use crate::entity::statement_item;
use crate::error::{AppError, AppResult};

/// Largest amount a single item may carry (one trillion shillings)
pub const MAX_ITEM_CENTS: i64 = 100_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Income,
    Asset,
    Liability,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Income => "income",
            Category::Asset => "asset",
            Category::Liability => "liability",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(Category::Income),
            "asset" => Some(Category::Asset),
            "liability" => Some(Category::Liability),
            _ => None,
        }
    }
}

/// Whose item it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    #[serde(rename = "self")]
    Declarant,
    Spouse,
    Dependent,
}

impl Owner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Owner::Declarant => "self",
            Owner::Spouse => "spouse",
            Owner::Dependent => "dependent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "self" => Some(Owner::Declarant),
            "spouse" => Some(Owner::Spouse),
            "dependent" => Some(Owner::Dependent),
            _ => None,
        }
    }
}

/// Totals in cents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    pub income: i64,
    pub assets: i64,
    pub liabilities: i64,
    #[serde(rename = "netWorth")]
    pub net_worth: i64,
}

/// Category totals. A total that would overflow is a validation error.
pub fn summarize(items: &[statement_item::Model]) -> AppResult<StatementSummary> {
    let mut summary = StatementSummary::default();
    for item in items {
        let (total, name) = match Category::parse(&item.category) {
            Some(Category::Income) => (&mut summary.income, "income"),
            Some(Category::Asset) => (&mut summary.assets, "assets"),
            Some(Category::Liability) => (&mut summary.liabilities, "liabilities"),
            None => {
                tracing::warn!("Statement item {} has unknown category {}", item.id, item.category);
                continue;
            }
        };
        *total = add_cents(*total, item.amount_cents, name)?;
    }
    summary.net_worth = summary
        .assets
        .checked_sub(summary.liabilities)
        .ok_or_else(|| too_large("netWorth"))?;
    Ok(summary)
}

fn add_cents(total: i64, amount: i64, name: &str) -> AppResult<i64> {
    total.checked_add(amount).ok_or_else(|| too_large(name))
}

fn too_large(name: &str) -> AppError {
    AppError::Validation(format!("{}: total is too large", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, category: &str, amount_cents: i64) -> statement_item::Model {
        statement_item::Model {
            id,
            dial_record_id: 1,
            owner: "self".to_string(),
            category: category.to_string(),
            description: String::new(),
            amount_cents,
            location: None,
        }
    }

    #[test]
    fn net_worth_is_assets_less_liabilities() {
        let items = vec![
            item(1, "income", 120_000_00),
            item(2, "asset", 5_000_000_00),
            item(3, "asset", 250_000_00),
            item(4, "liability", 1_500_000_00),
            item(5, "bogus", 99),
        ];
        let summary = summarize(&items).unwrap();
        assert_eq!(summary.income, 120_000_00);
        assert_eq!(summary.assets, 5_250_000_00);
        assert_eq!(summary.liabilities, 1_500_000_00);
        assert_eq!(summary.net_worth, 3_750_000_00);
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let err = summarize(&[item(1, "asset", i64::MAX), item(2, "asset", 1)]).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("assets:")));

        let err = summarize(&[item(1, "liability", i64::MAX), item(2, "asset", -2)]).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("netWorth:")));
    }

    #[test]
    fn owner_self_serializes_as_self() {
        assert_eq!(serde_json::to_string(&Owner::Declarant).unwrap(), "\"self\"");
        assert_eq!(Owner::parse("spouse"), Some(Owner::Spouse));
    }
}
