//! Weight reconciler - keeps per-consumer shares summing to an item's total while it
//! is being entered or edited.
//!
//! One reconciler belongs to one item-edit session. Every operation recomputes and
//! writes all affected rows before returning, so there is no re-entrant update to
//! guard against.
//!
//! In custom-split mode a row the user typed into is *locked*; the other checked rows
//! *float* and absorb whatever the locked rows leave. Once every checked row is locked,
//! editing one row makes it the new anchor and frees the others again.

use crate::{
    core::{
        item::ItemDraft,
        numeric::{
            COMMIT_PERCENTAGE_TOLERANCE, FULL_PERCENTAGE, MIN_DISTRIBUTABLE_TOTAL,
            REMAINDER_TOLERANCE, round2, sanitize_weight, weights_are_equal,
        },
    },
    entities::{contributor, item, item_consumer},
    errors::{Error, Result},
};
use tracing::debug;

/// Which field of a row the user edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// The row's amount
    Amount,
    /// The row's percentage of the total
    Percentage,
}

/// State of one candidate consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct RowState {
    /// Contributor this row stands for
    pub contributor_id: i64,
    /// Contributor name, for display
    pub name: String,
    /// Whether the contributor consumes the item
    pub checked: bool,
    /// Whether the user set this row's share since the last reset
    pub locked: bool,
    /// Share as an amount; `None` means "no entry"
    pub amount: Option<f64>,
    /// Share as a percentage of the total; `None` means "no entry"
    pub percentage: Option<f64>,
}

impl RowState {
    fn new(candidate: &contributor::Model) -> Self {
        Self {
            contributor_id: candidate.id,
            name: candidate.name.clone(),
            checked: false,
            locked: false,
            amount: None,
            percentage: None,
        }
    }

    fn clear(&mut self) {
        self.locked = false;
        self.amount = None;
        self.percentage = None;
    }

    fn amount_or_zero(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }
}

/// What a row shows and whether it can be edited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowDisplay {
    /// Unchecked: no share fields
    Hidden,
    /// Equal split: a read-only computed share
    Share(f64),
    /// Custom split: editable amount and percentage fields
    Editable {
        /// Current amount entry
        amount: Option<f64>,
        /// Current percentage entry
        percentage: Option<f64>,
    },
}

/// Live consumer shares for one item being created or edited.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightReconciler {
    total: f64,
    equal_split: bool,
    rows: Vec<RowState>,
}

impl WeightReconciler {
    /// Starts a new item: equal split, nothing checked, no total.
    #[must_use]
    pub fn new(candidates: &[contributor::Model]) -> Self {
        Self {
            total: 0.0,
            equal_split: true,
            rows: candidates.iter().map(RowState::new).collect(),
        }
    }

    /// Loads an existing item and its stored weights.
    ///
    /// Equal split is selected when the stored weights are all equal. Otherwise each
    /// stored consumer starts locked at its stored percentage.
    #[must_use]
    pub fn for_existing_item(
        candidates: &[contributor::Model],
        item: &item::Model,
        weights: &[item_consumer::Model],
    ) -> Self {
        let equal_split = weights_are_equal(weights.iter().map(|w| sanitize_weight(w.weight)));
        let total = if item.amount.is_finite() && item.amount > 0.0 {
            item.amount
        } else {
            0.0
        };

        let rows = candidates
            .iter()
            .map(|candidate| {
                let mut row = RowState::new(candidate);
                if let Some(stored) = weights.iter().find(|w| w.contributor_id == candidate.id) {
                    row.checked = true;
                    if !equal_split {
                        let weight = sanitize_weight(stored.weight);
                        row.percentage = Some(round2(weight));
                        row.amount = Some(round2(total * weight / FULL_PERCENTAGE));
                        row.locked = true;
                    }
                }
                row
            })
            .collect();

        let mut reconciler = Self {
            total,
            equal_split,
            rows,
        };
        reconciler.refresh_equal_shares();
        reconciler
    }

    /// Item total the shares must add up to.
    #[must_use]
    pub const fn total(&self) -> f64 {
        self.total
    }

    /// Whether every checked consumer pays the same share.
    #[must_use]
    pub const fn is_equal_split(&self) -> bool {
        self.equal_split
    }

    /// All candidate rows, in candidate order.
    #[must_use]
    pub fn rows(&self) -> &[RowState] {
        &self.rows
    }

    /// Number of checked rows.
    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.rows.iter().filter(|r| r.checked).count()
    }

    /// Sum of the checked rows' amounts.
    #[must_use]
    pub fn checked_sum(&self) -> f64 {
        self.rows
            .iter()
            .filter(|r| r.checked)
            .map(RowState::amount_or_zero)
            .sum()
    }

    /// How row `index` is presented.
    pub fn row_display(&self, index: usize) -> Result<RowDisplay> {
        let row = self.row(index)?;
        Ok(if !row.checked {
            RowDisplay::Hidden
        } else if self.equal_split {
            RowDisplay::Share(row.amount_or_zero())
        } else {
            RowDisplay::Editable {
                amount: row.amount,
                percentage: row.percentage,
            }
        })
    }

    /// Changes the item total.
    ///
    /// Equal shares are recomputed; custom rows keep their percentages and get new amounts.
    pub fn set_total(&mut self, total: f64) -> Result<()> {
        if !total.is_finite() || total < 0.0 {
            return Err(Error::InvalidAmount { amount: total });
        }
        self.total = total;

        if self.equal_split {
            self.refresh_equal_shares();
        } else {
            for row in self.rows.iter_mut().filter(|r| r.checked) {
                if let Some(percentage) = row.percentage.filter(|p| *p > 0.0) {
                    row.amount = Some(round2(total * percentage / FULL_PERCENTAGE));
                }
            }
        }
        Ok(())
    }

    /// Checks or unchecks a consumer. Unchecked rows lose their entries.
    pub fn on_check_toggle(&mut self, index: usize, checked: bool) -> Result<()> {
        let row = self.row_mut(index)?;
        row.checked = checked;
        if !checked {
            row.clear();
        }
        self.refresh_equal_shares();
        Ok(())
    }

    /// Switches between equal and custom split.
    ///
    /// Leaving equal split requires a positive total; on failure the reconciler stays
    /// in equal split. Either direction clears every lock. Requesting the current mode
    /// changes nothing.
    pub fn on_equal_split_toggle(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.equal_split {
            return Ok(());
        }
        if enabled {
            self.equal_split = true;
            for row in &mut self.rows {
                row.locked = false;
            }
            self.refresh_equal_shares();
            return Ok(());
        }

        if self.total <= 0.0 {
            self.equal_split = true;
            return Err(Error::EqualSplitRequiresAmount);
        }

        self.equal_split = false;
        for row in &mut self.rows {
            row.clear();
        }
        Ok(())
    }

    /// Applies a user edit to one row and redistributes the rest of the total.
    ///
    /// The edited row is locked. Rejected edits leave every row untouched.
    pub fn on_row_edited(&mut self, index: usize, value: f64, kind: ValueKind) -> Result<()> {
        if self.equal_split {
            return Err(Error::EqualSplitActive);
        }
        if !self.row(index)?.checked {
            return Err(Error::RowNotChecked { index });
        }
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidAmount { amount: value });
        }
        let total = self.total;
        if total <= MIN_DISTRIBUTABLE_TOTAL {
            return Err(Error::InvalidAmount { amount: total });
        }

        let (amount, percentage) = match kind {
            ValueKind::Amount => (value, round2(value / total * FULL_PERCENTAGE)),
            ValueKind::Percentage => (round2(total * value / FULL_PERCENTAGE), value),
        };
        if amount > total + REMAINDER_TOLERANCE {
            return Err(Error::ShareExceedsTotal {
                share: amount,
                total,
            });
        }

        let row = &mut self.rows[index];
        row.amount = Some(amount);
        row.percentage = Some(percentage);
        row.locked = true;

        self.distribute(index);
        Ok(())
    }

    /// Validates the session and produces the item to store.
    pub fn commit(&self, name: &str, payer_id: Option<i64>, notes: Option<&str>) -> Result<ItemDraft> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName { entity: "Item" });
        }
        if !self.total.is_finite() || self.total <= 0.0 {
            return Err(Error::InvalidAmount { amount: self.total });
        }
        let payer_id = payer_id.ok_or(Error::MissingPayer)?;
        if self.rows.iter().all(|r| r.contributor_id != payer_id) {
            return Err(Error::ContributorNotFound { id: payer_id });
        }

        let checked: Vec<&RowState> = self.rows.iter().filter(|r| r.checked).collect();
        if checked.is_empty() {
            return Err(Error::NoConsumers);
        }

        let consumer_weights: Vec<(i64, f64)> = if self.equal_split {
            #[allow(clippy::cast_precision_loss)]
            let weight = FULL_PERCENTAGE / checked.len() as f64;
            checked.iter().map(|r| (r.contributor_id, weight)).collect()
        } else {
            let weights: Vec<(i64, f64)> = checked
                .iter()
                .map(|r| (r.contributor_id, r.percentage.unwrap_or(0.0)))
                .collect();
            let sum: f64 = weights.iter().map(|(_, w)| w).sum();
            if (sum - FULL_PERCENTAGE).abs() > COMMIT_PERCENTAGE_TOLERANCE {
                return Err(Error::PercentageMismatch { total: sum });
            }
            weights
        };

        Ok(ItemDraft {
            name: name.to_string(),
            amount: self.total,
            payer_id,
            notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            consumer_weights,
        })
    }

    fn row(&self, index: usize) -> Result<&RowState> {
        let len = self.rows.len();
        self.rows.get(index).ok_or(Error::RowOutOfRange { index, len })
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut RowState> {
        let len = self.rows.len();
        self.rows.get_mut(index).ok_or(Error::RowOutOfRange { index, len })
    }

    fn checked_indices(&self) -> Vec<usize> {
        (0..self.rows.len()).filter(|&i| self.rows[i].checked).collect()
    }

    fn write_share(&mut self, index: usize, amount: f64) {
        let total = self.total;
        let row = &mut self.rows[index];
        row.amount = Some(amount);
        row.percentage = Some(round2(amount / total * FULL_PERCENTAGE));
    }

    /// Equal split: every checked row gets `total / n`. No-op in custom mode.
    fn refresh_equal_shares(&mut self) {
        if !self.equal_split {
            return;
        }
        let count = self.checked_count();
        for row in &mut self.rows {
            row.locked = false;
            if !row.checked {
                row.amount = None;
                row.percentage = None;
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let (share, percentage) = if count > 0 && self.total > 0.0 {
                (
                    round2(self.total / count as f64),
                    round2(FULL_PERCENTAGE / count as f64),
                )
            } else {
                (0.0, 0.0)
            };
            row.amount = Some(share);
            row.percentage = Some(percentage);
        }
    }

    fn distribute(&mut self, source: usize) {
        let checked = self.checked_indices();
        let mut floating: Vec<usize> = checked
            .iter()
            .copied()
            .filter(|&i| !self.rows[i].locked)
            .collect();

        if floating.is_empty() && checked.len() > 1 {
            debug!("All rows locked, row {source} becomes the anchor");
            for &i in &checked {
                if i != source {
                    self.rows[i].locked = false;
                }
            }
            floating = checked.iter().copied().filter(|&i| i != source).collect();
        }

        let sum_locked: f64 = checked
            .iter()
            .filter(|&&i| self.rows[i].locked)
            .map(|&i| self.rows[i].amount_or_zero())
            .sum();
        let remaining = self.total - sum_locked;

        if !floating.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let per_row = round2(remaining.max(0.0) / floating.len() as f64);
            for &i in &floating {
                self.write_share(i, per_row);
            }
        }

        self.correct_remainder(source, &checked, &floating);
    }

    /// Pushes any leftover difference onto the last floating row, spilling to the other
    /// non-source rows when clamping at zero leaves some of it unabsorbed.
    fn correct_remainder(&mut self, source: usize, checked: &[usize], floating: &[usize]) {
        let mut diff = self.total - self.checked_sum();
        if diff.abs() <= REMAINDER_TOLERANCE {
            return;
        }

        let targets: Vec<usize> = floating
            .iter()
            .rev()
            .copied()
            .chain(
                checked
                    .iter()
                    .copied()
                    .filter(|&i| i != source && !floating.contains(&i)),
            )
            .collect();

        if targets.is_empty() {
            // Sole consumer: it carries the whole item.
            self.write_share(source, self.total);
            return;
        }

        for target in targets {
            if diff.abs() <= REMAINDER_TOLERANCE {
                break;
            }
            let old = self.rows[target].amount_or_zero();
            let new = (old + diff).max(0.0);
            diff -= new - old;
            self.write_share(target, new);
        }
    }
}
