// Ledger errors
//
// Validation failures are explicit variants; storage and export failures wrap
// the underlying crate errors.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("amount must be greater than zero, got {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("insufficient funds: balance is {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("amount {amount} would overflow balance {balance}")]
    AmountOverflow { balance: Decimal, amount: Decimal },

    #[error("opening balance cannot be negative, got {0}")]
    NegativeOpeningBalance(Decimal),

    #[error("invalid account number: {0}")]
    InvalidAccountNumber(String),

    #[error("invalid holder {field}: {reason}")]
    InvalidHolder { field: &'static str, reason: String },

    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("account number {0} is already registered")]
    DuplicateAccountNumber(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("could not write CSV rows: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not access file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Config(#[from] serde_json::Error),
}

impl LedgerError {
    /// True for business-rule rejections of a movement amount.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount { .. }
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::AmountOverflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejection_classification() {
        assert!(LedgerError::InvalidAmount { amount: dec!(-100) }.is_rejection());
        assert!(LedgerError::InsufficientFunds {
            balance: dec!(10),
            requested: dec!(20),
        }
        .is_rejection());
        assert!(LedgerError::AmountOverflow {
            balance: Decimal::MAX,
            amount: dec!(1),
        }
        .is_rejection());
        assert!(!LedgerError::AccountNotFound(7).is_rejection());
    }

    #[test]
    fn test_error_messages() {
        let err = LedgerError::InsufficientFunds {
            balance: dec!(180000),
            requested: dec!(999999),
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: balance is 180000, requested 999999"
        );

        let err = LedgerError::InvalidAmount { amount: dec!(-100) };
        assert_eq!(err.to_string(), "amount must be greater than zero, got -100");
    }
}
