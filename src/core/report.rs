//! Report generation business logic.
//!
//! Turns a sheet's balances into structured report data and a plain-text rendering.
//! The structured form is what any presentation layer should consume.

use crate::{
    core::{balance::compute_balances, item::load_sheet_snapshot, numeric::SETTLEMENT_THRESHOLD},
    entities::sheet,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::fmt;

/// Where a contributor stands once the sheet is settled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceStatus {
    /// Others owe this contributor the amount
    WillReceive(f64),
    /// This contributor owes the amount (stored positive)
    WillGive(f64),
    /// Nothing left to pay or receive
    SettledUp,
}

impl BalanceStatus {
    /// Classifies a net balance. Magnitudes at or below half a cent count as settled.
    #[must_use]
    pub fn classify(balance: f64) -> Self {
        if balance > SETTLEMENT_THRESHOLD {
            Self::WillReceive(balance)
        } else if balance < -SETTLEMENT_THRESHOLD {
            Self::WillGive(balance.abs())
        } else {
            Self::SettledUp
        }
    }
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WillReceive(amount) => write!(f, "Will receive {amount:.2}"),
            Self::WillGive(amount) => write!(f, "Will give {amount:.2}"),
            Self::SettledUp => write!(f, "Settled up"),
        }
    }
}

/// One contributor's line in a sheet report.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceLine {
    /// Contributor name (or `unknown-{id}`)
    pub name: String,
    /// Net balance rounded to cents
    pub balance: f64,
    /// Classified status
    pub status: BalanceStatus,
}

/// Balances of every contributor in a sheet.
#[derive(Debug, Clone)]
pub struct SheetBalanceReport {
    /// The sheet being reported on
    pub sheet: sheet::Model,
    /// One line per name, sorted by name
    pub lines: Vec<BalanceLine>,
    /// Number of items in the sheet
    pub item_count: usize,
}

impl SheetBalanceReport {
    /// `true` when nobody has anything left to pay or receive.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.lines
            .iter()
            .all(|line| line.status == BalanceStatus::SettledUp)
    }
}

/// Generates the balance report for one sheet.
///
/// # Arguments
/// * `db` - Database connection
/// * `sheet_id` - ID of the sheet to report on
pub async fn generate_sheet_report(
    db: &DatabaseConnection,
    sheet_id: i64,
) -> Result<SheetBalanceReport> {
    let snapshot = load_sheet_snapshot(db, sheet_id).await?;
    let balances = compute_balances(&snapshot.contributors, &snapshot.items);

    let lines = balances
        .into_iter()
        .map(|(name, balance)| BalanceLine {
            name,
            balance,
            status: BalanceStatus::classify(balance),
        })
        .collect();

    Ok(SheetBalanceReport {
        sheet: snapshot.sheet,
        lines,
        item_count: snapshot.items.len(),
    })
}

/// Renders a report as plain text, one contributor per line.
///
/// ```text
/// Ski trip (3 items)
///   Alice: Will receive 20.00
///   Bob: Will give 20.00
/// ```
#[must_use]
pub fn format_report(report: &SheetBalanceReport) -> String {
    let noun = if report.item_count == 1 { "item" } else { "items" };
    let mut output = format!("{} ({} {noun})\n", report.sheet.name, report.item_count);
    if report.lines.is_empty() {
        output.push_str("  No contributors\n");
    }
    for line in &report.lines {
        output.push_str(&format!("  {}: {}\n", line.name, line.status));
    }
    output
}
