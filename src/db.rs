// 🗄️ Persistence - SQLite schema and row I/O
//
// Two tables: accounts and movements (movements.account_id → accounts.id).
// Every statement binds its values; nothing is interpolated into SQL text.
// Decimals are stored as TEXT so amounts survive without float rounding.

use crate::entities::{Account, Movement};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Column order of the accounts table (also the CSV header).
pub const ACCOUNT_COLUMNS: [&str; 7] = [
    "id",
    "account_number",
    "holder_rut",
    "holder_name",
    "opening_balance",
    "balance",
    "opened_at",
];

/// Column order of the movements table (also the CSV header).
pub const MOVEMENT_COLUMNS: [&str; 7] = [
    "id",
    "account_id",
    "reference",
    "kind",
    "amount",
    "description",
    "created_at",
];

const SELECT_ACCOUNT: &str = "SELECT id, account_number, holder_rut, holder_name,
                                     opening_balance, balance, opened_at
                              FROM accounts";

const SELECT_MOVEMENT: &str = "SELECT id, account_id, reference, kind,
                                      amount, description, created_at
                               FROM movements";

/// Open (or create) the database file and make sure the schema exists.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    // WAL for crash recovery; in-memory databases report "memory" instead
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Accounts Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_number TEXT UNIQUE NOT NULL,
            holder_rut TEXT NOT NULL CHECK(length(holder_rut) <= 12),
            holder_name TEXT NOT NULL CHECK(length(holder_name) <= 105),
            opening_balance TEXT NOT NULL,
            balance TEXT NOT NULL DEFAULT '0',
            opened_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Movements Table (append-only)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS movements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            reference TEXT UNIQUE NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('deposit', 'withdrawal')),
            amount TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_movements_account ON movements(account_id)",
        [],
    )?;

    debug!("database schema ready");
    Ok(())
}

// ============================================================================
// COLUMN DECODING
// ============================================================================

fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        account_number: row.get(1)?,
        holder_rut: row.get(2)?,
        holder_name: row.get(3)?,
        opening_balance: decimal_column(row, 4)?,
        balance: decimal_column(row, 5)?,
        opened_at: timestamp_column(row, 6)?,
    })
}

fn movement_from_row(row: &Row) -> rusqlite::Result<Movement> {
    Ok(Movement {
        id: row.get(0)?,
        account_id: row.get(1)?,
        reference: uuid_column(row, 2)?,
        kind: row.get(3)?,
        amount: decimal_column(row, 4)?,
        description: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

// ============================================================================
// ACCOUNTS
// ============================================================================

/// Insert an account row and return the id the store assigned.
/// The `id` field of `account` is ignored.
pub fn insert_account(conn: &Connection, account: &Account) -> Result<i64> {
    let result = conn.execute(
        "INSERT INTO accounts (
            account_number, holder_rut, holder_name, opening_balance, balance, opened_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            account.account_number,
            account.holder_rut,
            account.holder_name,
            account.opening_balance.to_string(),
            account.balance.to_string(),
            account.opened_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(LedgerError::DuplicateAccountNumber(account.account_number.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn update_balance(conn: &Connection, account_id: i64, balance: Decimal) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts SET balance = ?1 WHERE id = ?2",
        params![balance.to_string(), account_id],
    )?;

    if changed == 0 {
        return Err(LedgerError::AccountNotFound(account_id));
    }
    Ok(())
}

pub fn get_account(conn: &Connection, account_id: i64) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("{SELECT_ACCOUNT} WHERE id = ?1"),
            params![account_id],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn find_account_by_number(conn: &Connection, account_number: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("{SELECT_ACCOUNT} WHERE account_number = ?1"),
            params![account_number],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn get_all_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!("{SELECT_ACCOUNT} ORDER BY id"))?;

    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(accounts)
}

pub fn count_accounts(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// MOVEMENTS
// ============================================================================

/// Insert a movement row and return the id the store assigned.
pub fn insert_movement(conn: &Connection, movement: &Movement) -> Result<i64> {
    conn.execute(
        "INSERT INTO movements (
            account_id, reference, kind, amount, description, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            movement.account_id,
            movement.reference.to_string(),
            movement.kind,
            movement.amount.to_string(),
            movement.description,
            movement.created_at.to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn get_all_movements(conn: &Connection) -> Result<Vec<Movement>> {
    let mut stmt = conn.prepare(&format!("{SELECT_MOVEMENT} ORDER BY id"))?;

    let movements = stmt
        .query_map([], movement_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(movements)
}

pub fn get_movements_for_account(conn: &Connection, account_id: i64) -> Result<Vec<Movement>> {
    let mut stmt = conn.prepare(&format!("{SELECT_MOVEMENT} WHERE account_id = ?1 ORDER BY id"))?;

    let movements = stmt
        .query_map(params![account_id], movement_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(movements)
}

pub fn count_movements(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM movements", [], |row| row.get(0))?;
    Ok(count)
}
