// 🧾 Movement Entity - immutable ledger entry
//
// A movement records one balance change on one account. It is written once,
// in the same SQLite transaction as the balance update, and never modified.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// MOVEMENT KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Abono: increases the balance
    Deposit,

    /// Cargo: decreases the balance, bounded by the current balance
    Withdrawal,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Deposit => "deposit",
            MovementKind::Withdrawal => "withdrawal",
        }
    }

    /// Signed effect of `amount` on a balance.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            MovementKind::Deposit => amount,
            MovementKind::Withdrawal => -amount,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown movement kind: {0:?}")]
pub struct UnknownMovementKind(pub String);

impl FromStr for MovementKind {
    type Err = UnknownMovementKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(MovementKind::Deposit),
            "withdrawal" => Ok(MovementKind::Withdrawal),
            other => Err(UnknownMovementKind(other.to_string())),
        }
    }
}

impl ToSql for MovementKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MovementKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

// ============================================================================
// MOVEMENT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Row id assigned by the store (0 until inserted)
    pub id: i64,

    /// Owning account (foreign key to accounts.id)
    pub account_id: i64,

    /// Stable external reference, unique per movement
    pub reference: Uuid,

    pub kind: MovementKind,

    /// Always strictly positive; the sign comes from `kind`
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,

    pub description: String,

    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Build a movement that has not been persisted yet.
    pub fn new(account_id: i64, kind: MovementKind, amount: Decimal, description: &str) -> Self {
        Movement {
            id: 0,
            account_id,
            reference: Uuid::new_v4(),
            kind,
            amount,
            description: description.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    pub fn is_deposit(&self) -> bool {
        self.kind == MovementKind::Deposit
    }

    pub fn is_withdrawal(&self) -> bool {
        self.kind == MovementKind::Withdrawal
    }
}
