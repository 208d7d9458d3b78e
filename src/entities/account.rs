// 💳 Account Entity - current account with guarded balance transitions
//
// Invariant: balance == opening_balance + Σ(deposits) − Σ(withdrawals), and
// the balance never goes below zero.
//
// The in-memory account and its row stay in sync: every operation validates
// first, then writes the new balance and the movement in one SQLite
// transaction, and only after the commit updates `self.balance`.

use crate::db;
use crate::entities::movement::{Movement, MovementKind};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const MAX_RUT_LEN: usize = 12;
pub const MAX_HOLDER_NAME_LEN: usize = 105;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Row id assigned by the store
    pub id: i64,

    pub account_number: String,

    /// Holder national ID (RUT), e.g. "17.985.747-1"
    pub holder_rut: String,

    pub holder_name: String,

    /// Balance the account was registered with
    #[serde(with = "rust_decimal::serde::str")]
    pub opening_balance: Decimal,

    /// Current balance
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,

    pub opened_at: DateTime<Utc>,
}

impl Account {
    // ========================================================================
    // REGISTRATION & LOOKUP
    // ========================================================================

    /// Register a new account with its opening balance.
    pub fn open(
        conn: &Connection,
        account_number: &str,
        holder_rut: &str,
        holder_name: &str,
        opening_balance: Decimal,
    ) -> Result<Account> {
        if account_number.trim().is_empty() {
            return Err(LedgerError::InvalidAccountNumber(account_number.to_string()));
        }
        validate_holder_field("rut", holder_rut, MAX_RUT_LEN)?;
        validate_holder_field("name", holder_name, MAX_HOLDER_NAME_LEN)?;
        if opening_balance < Decimal::ZERO {
            return Err(LedgerError::NegativeOpeningBalance(opening_balance));
        }

        let mut account = Account {
            id: 0,
            account_number: account_number.to_string(),
            holder_rut: holder_rut.to_string(),
            holder_name: holder_name.to_string(),
            opening_balance,
            balance: opening_balance,
            opened_at: Utc::now(),
        };
        account.id = db::insert_account(conn, &account)?;

        info!(
            account_id = account.id,
            account_number = %account.account_number,
            opening_balance = %account.opening_balance,
            "account registered"
        );
        Ok(account)
    }

    pub fn load(conn: &Connection, id: i64) -> Result<Account> {
        db::get_account(conn, id)?.ok_or(LedgerError::AccountNotFound(id))
    }

    pub fn find_by_number(conn: &Connection, account_number: &str) -> Result<Option<Account>> {
        db::find_account_by_number(conn, account_number)
    }

    /// Re-read the persisted balance into this instance.
    pub fn refresh(&mut self, conn: &Connection) -> Result<()> {
        *self = Account::load(conn, self.id)?;
        Ok(())
    }

    pub fn movements(&self, conn: &Connection) -> Result<Vec<Movement>> {
        db::get_movements_for_account(conn, self.id)
    }

    // ========================================================================
    // LEDGER OPERATIONS
    // ========================================================================

    pub fn deposit(&mut self, conn: &Connection, amount: Decimal) -> Result<Movement> {
        self.apply(conn, MovementKind::Deposit, amount, "")
    }

    pub fn deposit_with_note(
        &mut self,
        conn: &Connection,
        amount: Decimal,
        description: &str,
    ) -> Result<Movement> {
        self.apply(conn, MovementKind::Deposit, amount, description)
    }

    pub fn withdraw(&mut self, conn: &Connection, amount: Decimal) -> Result<Movement> {
        self.apply(conn, MovementKind::Withdrawal, amount, "")
    }

    pub fn withdraw_with_note(
        &mut self,
        conn: &Connection,
        amount: Decimal,
        description: &str,
    ) -> Result<Movement> {
        self.apply(conn, MovementKind::Withdrawal, amount, description)
    }

    /// Balance after applying `kind` with `amount`, or the rule it breaks.
    /// Does not touch memory or disk.
    pub fn next_balance(&self, kind: MovementKind, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount { amount });
        }

        match kind {
            MovementKind::Deposit => {
                self.balance
                    .checked_add(amount)
                    .ok_or(LedgerError::AmountOverflow {
                        balance: self.balance,
                        amount,
                    })
            }
            MovementKind::Withdrawal if amount > self.balance => Err(LedgerError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            }),
            MovementKind::Withdrawal => Ok(self.balance - amount),
        }
    }

    fn apply(
        &mut self,
        conn: &Connection,
        kind: MovementKind,
        amount: Decimal,
        description: &str,
    ) -> Result<Movement> {
        let new_balance = match self.next_balance(kind, amount) {
            Ok(balance) => balance,
            Err(e) => {
                warn!(account_id = self.id, %kind, %amount, error = %e, "movement rejected");
                return Err(e);
            }
        };

        let mut movement = Movement::new(self.id, kind, amount, description);

        let tx = conn.unchecked_transaction()?;
        db::update_balance(&tx, self.id, new_balance)?;
        movement.id = db::insert_movement(&tx, &movement)?;
        tx.commit()?;

        self.balance = new_balance;

        info!(
            account_id = self.id,
            movement_id = movement.id,
            %kind,
            %amount,
            balance = %self.balance,
            "movement recorded"
        );
        Ok(movement)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Net change since the account was opened (None if it does not fit a Decimal)
    pub fn balance_change(&self) -> Option<Decimal> {
        self.balance.checked_sub(self.opening_balance)
    }

    pub fn can_withdraw(&self, amount: Decimal) -> bool {
        self.next_balance(MovementKind::Withdrawal, amount).is_ok()
    }
}

fn validate_holder_field(field: &'static str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidHolder {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    // SQLite length() counts characters, not bytes
    if value.chars().count() > max_len {
        return Err(LedgerError::InvalidHolder {
            field,
            reason: format!("must be at most {} characters", max_len),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn
    }

    fn open_test_account(conn: &Connection, balance: Decimal) -> Account {
        Account::open(conn, "45214578", "17.985.747-1", "Alfredo Cardenas", balance).unwrap()
    }

    #[test]
    fn test_account_creation() {
        let conn = test_conn();
        let account = open_test_account(&conn, dec!(150000));

        assert!(account.id > 0);
        assert_eq!(account.balance, dec!(150000));
        assert_eq!(account.opening_balance, dec!(150000));

        let stored = Account::load(&conn, account.id).unwrap();
        assert_eq!(stored, account);
    }

    #[test]
    fn test_ledger_example_scenario() {
        let conn = test_conn();
        let mut account = open_test_account(&conn, dec!(150000));

        let deposit = account.deposit(&conn, dec!(50000)).unwrap();
        assert_eq!(account.balance, dec!(200000));
        assert_eq!(deposit.kind, MovementKind::Deposit);
        assert_eq!(deposit.amount, dec!(50000));

        account.withdraw(&conn, dec!(20000)).unwrap();
        assert_eq!(account.balance, dec!(180000));

        let err = account.withdraw(&conn, dec!(999999)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(account.balance, dec!(180000));

        let err = account.deposit(&conn, dec!(-100)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        assert_eq!(account.balance, dec!(180000));

        // Disk agrees with memory, and only the two successful operations left movements
        assert_eq!(Account::load(&conn, account.id).unwrap().balance, dec!(180000));
        let movements = account.movements(&conn).unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].kind, MovementKind::Deposit);
        assert_eq!(movements[1].kind, MovementKind::Withdrawal);
        assert_eq!(movements[1].amount, dec!(20000));

        println!("✅ Ledger scenario passed: balance {}", account.balance);
    }

    #[test]
    fn test_deposit_sequence_sums() {
        let conn = test_conn();
        let mut account = open_test_account(&conn, dec!(1000));
        let amounts = [dec!(0.01), dec!(250), dec!(99.99), dec!(1), dec!(123456.78)];

        for amount in amounts {
            account.deposit(&conn, amount).unwrap();
        }

        let expected = dec!(1000) + amounts.iter().copied().sum::<Decimal>();
        assert_eq!(account.balance, expected);
        assert_eq!(Account::load(&conn, account.id).unwrap().balance, expected);
        assert_eq!(account.movements(&conn).unwrap().len(), amounts.len());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let conn = test_conn();
        let mut account = open_test_account(&conn, dec!(100));

        assert!(matches!(
            account.deposit(&conn, Decimal::ZERO),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            account.withdraw(&conn, Decimal::ZERO),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(account.movements(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_withdraw_entire_balance() {
        let conn = test_conn();
        let mut account = open_test_account(&conn, dec!(500));

        account.withdraw(&conn, dec!(500)).unwrap();

        assert_eq!(account.balance, Decimal::ZERO);
        assert!(!account.can_withdraw(dec!(0.01)));
    }

    #[test]
    fn test_withdraw_with_note_is_persisted() {
        let conn = test_conn();
        let mut account = open_test_account(&conn, dec!(500));

        let movement = account.withdraw_with_note(&conn, dec!(120), "pago luz").unwrap();

        let stored = account.movements(&conn).unwrap();
        assert_eq!(stored, vec![movement]);
        assert_eq!(stored[0].description, "pago luz");
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let conn = test_conn();
        let mut account = open_test_account(&conn, dec!(100));
        // Point at a row that does not exist so the balance update fails
        account.id = 9999;

        let err = account.deposit(&conn, dec!(10)).unwrap_err();

        assert!(matches!(err, LedgerError::AccountNotFound(9999)));
        assert_eq!(account.balance, dec!(100));
        assert_eq!(db::count_movements(&conn).unwrap(), 0);
    }

    #[test]
    fn test_refresh_reads_persisted_balance() {
        let conn = test_conn();
        let mut account = open_test_account(&conn, dec!(100));
        let mut other_handle = Account::load(&conn, account.id).unwrap();

        other_handle.deposit(&conn, dec!(50)).unwrap();
        account.refresh(&conn).unwrap();

        assert_eq!(account.balance, dec!(150));
        assert_eq!(account.balance_change(), Some(dec!(50)));
    }

    #[test]
    fn test_holder_validation() {
        let conn = test_conn();

        let err = Account::open(&conn, "1", "", "Nombre", dec!(0)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidHolder { field: "rut", .. }));

        let err = Account::open(&conn, "1", "12.345.678-90", "Nombre", dec!(0)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidHolder { field: "rut", .. }));

        let long_name = "ñ".repeat(MAX_HOLDER_NAME_LEN + 1);
        let err = Account::open(&conn, "1", "1-9", &long_name, dec!(0)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidHolder { field: "name", .. }));

        // Exactly at the limit is fine, even with multi-byte characters
        let name = "ñ".repeat(MAX_HOLDER_NAME_LEN);
        assert!(Account::open(&conn, "1", "1-9", &name, dec!(0)).is_ok());
    }

    #[test]
    fn test_empty_account_number_rejected() {
        let conn = test_conn();

        let err = Account::open(&conn, "  ", "1-9", "Nombre", dec!(0)).unwrap_err();

        assert!(matches!(err, LedgerError::InvalidAccountNumber(_)));
        assert_eq!(db::count_accounts(&conn).unwrap(), 0);
    }

    #[test]
    fn test_overflowing_deposit_rejected() {
        let conn = test_conn();
        let mut account = open_test_account(&conn, Decimal::ONE);

        let err = account.deposit(&conn, Decimal::MAX).unwrap_err();

        assert!(matches!(err, LedgerError::AmountOverflow { .. }));
        assert_eq!(account.balance, Decimal::ONE);
        assert_eq!(Account::load(&conn, account.id).unwrap().balance, Decimal::ONE);
        assert!(account.movements(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_negative_opening_balance_rejected() {
        let conn = test_conn();

        let err = Account::open(&conn, "1", "1-9", "Nombre", dec!(-1)).unwrap_err();

        assert!(matches!(err, LedgerError::NegativeOpeningBalance(_)));
        assert_eq!(db::count_accounts(&conn).unwrap(), 0);
    }

    #[test]
    fn test_load_missing_account() {
        let conn = test_conn();

        assert!(matches!(
            Account::load(&conn, 1),
            Err(LedgerError::AccountNotFound(1))
        ));
        assert!(Account::find_by_number(&conn, "45214578").unwrap().is_none());
    }
}
