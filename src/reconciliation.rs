// ⚖️ Reconciliation Engine - check the ledger invariant against the store
//
// Following the formula:
//   opening_balance + Σ(deposits) − Σ(withdrawals) = balance
//
// The movements are folded in insertion order; the running balance must never
// drop below zero on the way.

use crate::db;
use crate::entities::{Account, Movement, MovementKind};
use crate::error::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconciliationResult {
    /// Stored balance equals the fold of the movements
    Balanced {
        opening_balance: Decimal,
        total_deposits: Decimal,
        total_withdrawals: Decimal,
        balance: Decimal,
    },

    /// Stored balance and the fold of the movements disagree
    Discrepancy {
        stored_balance: Decimal,
        calculated_balance: Decimal,
        difference: Decimal,
    },
}

impl ReconciliationResult {
    pub fn is_balanced(&self) -> bool {
        matches!(self, ReconciliationResult::Balanced { .. })
    }

    pub fn has_discrepancy(&self) -> bool {
        !self.is_balanced()
    }

    pub fn difference(&self) -> Decimal {
        match self {
            ReconciliationResult::Balanced { .. } => Decimal::ZERO,
            ReconciliationResult::Discrepancy { difference, .. } => *difference,
        }
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub account_id: i64,
    pub account_number: String,
    pub result: ReconciliationResult,
    pub movement_count: usize,
    pub stored_balance: Decimal,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub calculated_balance: Decimal,
    pub discrepancies: Vec<Discrepancy>,
    pub reconciled_at: chrono::DateTime<chrono::Utc>,
}

impl ReconciliationReport {
    /// Balanced and no rule was broken along the way
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Account {} (id {}): {} movements, calculated {}, stored {}, difference {}",
            self.account_number,
            self.account_id,
            self.movement_count,
            self.calculated_balance,
            self.stored_balance,
            self.result.difference()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    pub description: String,
    pub amount: Decimal,
    pub category: DiscrepancyCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscrepancyCategory {
    /// Stored balance differs from opening balance plus movements
    BalanceMismatch,

    /// A withdrawal took the running balance below zero
    NegativeRunningBalance,

    /// A movement in the input belongs to another account
    ForeignMovement,

    /// Folding the movements left the representable Decimal range
    AmountOverflow,
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Reconcile one account against its movements (in insertion order).
    pub fn reconcile(&self, account: &Account, movements: &[Movement]) -> ReconciliationReport {
        let mut discrepancies = Vec::new();
        let mut running = account.opening_balance;
        let mut total_deposits = Decimal::ZERO;
        let mut total_withdrawals = Decimal::ZERO;
        let mut movement_count = 0;

        for movement in movements {
            if movement.account_id != account.id {
                discrepancies.push(Discrepancy {
                    description: format!(
                        "Movement {} belongs to account {}",
                        movement.id, movement.account_id
                    ),
                    amount: movement.amount,
                    category: DiscrepancyCategory::ForeignMovement,
                });
                continue;
            }

            movement_count += 1;
            let totals = match movement.kind {
                MovementKind::Deposit => total_deposits
                    .checked_add(movement.amount)
                    .map(|sum| (sum, total_withdrawals)),
                MovementKind::Withdrawal => total_withdrawals
                    .checked_add(movement.amount)
                    .map(|sum| (total_deposits, sum)),
            };
            let next = running.checked_add(movement.signed_amount());

            let (Some((deposits, withdrawals)), Some(next)) = (totals, next) else {
                discrepancies.push(Discrepancy {
                    description: format!("Movement {} overflows the running totals", movement.id),
                    amount: movement.amount,
                    category: DiscrepancyCategory::AmountOverflow,
                });
                break;
            };
            total_deposits = deposits;
            total_withdrawals = withdrawals;
            running = next;

            if running < Decimal::ZERO {
                discrepancies.push(Discrepancy {
                    description: format!(
                        "Balance went negative ({}) after movement {}",
                        running, movement.id
                    ),
                    amount: running,
                    category: DiscrepancyCategory::NegativeRunningBalance,
                });
            }
        }

        let calculated_balance = running;
        // Saturates only when the fold already overflowed or the stored row is corrupt
        let difference = account.balance.saturating_sub(calculated_balance);

        let result = if difference.is_zero() {
            ReconciliationResult::Balanced {
                opening_balance: account.opening_balance,
                total_deposits,
                total_withdrawals,
                balance: account.balance,
            }
        } else {
            discrepancies.push(Discrepancy {
                description: format!("Balance mismatch: {} difference", difference),
                amount: difference,
                category: DiscrepancyCategory::BalanceMismatch,
            });
            ReconciliationResult::Discrepancy {
                stored_balance: account.balance,
                calculated_balance,
                difference,
            }
        };

        ReconciliationReport {
            account_id: account.id,
            account_number: account.account_number.clone(),
            result,
            movement_count,
            stored_balance: account.balance,
            total_deposits,
            total_withdrawals,
            calculated_balance,
            discrepancies,
            reconciled_at: chrono::Utc::now(),
        }
    }

    /// Reconcile every persisted account.
    pub fn reconcile_all(&self, conn: &Connection) -> Result<Vec<ReconciliationReport>> {
        let mut reports = Vec::new();

        for account in db::get_all_accounts(conn)? {
            let movements = db::get_movements_for_account(conn, account.id)?;
            let report = self.reconcile(&account, &movements);

            if !report.is_clean() {
                warn!(
                    account_id = account.id,
                    discrepancies = report.discrepancies.len(),
                    "account does not reconcile"
                );
            }
            reports.push(report);
        }

        Ok(reports)
    }
}

// ============================================================================
// TESTS
// ============================================================================
