// 📤 CSV Export - full snapshots of the accounts and movements tables
//
// The header row is the table's column list and is written even when the
// table is empty. File exports overwrite their destination.

use crate::config::Config;
use crate::db::{self, ACCOUNT_COLUMNS, MOVEMENT_COLUMNS};
use crate::entities::{Account, Movement};
use crate::error::Result;
use csv::{ReaderBuilder, WriterBuilder};
use rusqlite::Connection;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Row counts of a two-file export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub accounts: usize,
    pub movements: usize,
}

fn write_rows<T: Serialize>(header: &[&str], rows: &[T], writer: impl Write) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_accounts(accounts: &[Account], writer: impl Write) -> Result<()> {
    write_rows(&ACCOUNT_COLUMNS, accounts, writer)
}

pub fn write_movements(movements: &[Movement], writer: impl Write) -> Result<()> {
    write_rows(&MOVEMENT_COLUMNS, movements, writer)
}

/// Parse an accounts export back into entities.
pub fn read_accounts(reader: impl Read) -> Result<Vec<Account>> {
    let accounts = ReaderBuilder::new()
        .from_reader(reader)
        .into_deserialize()
        .collect::<csv::Result<Vec<_>>>()?;
    Ok(accounts)
}

/// Parse a movements export back into entities.
pub fn read_movements(reader: impl Read) -> Result<Vec<Movement>> {
    let movements = ReaderBuilder::new()
        .from_reader(reader)
        .into_deserialize()
        .collect::<csv::Result<Vec<_>>>()?;
    Ok(movements)
}

/// Dump every account to `path`. Returns the number of data rows.
pub fn export_accounts_csv(conn: &Connection, path: &Path) -> Result<usize> {
    let accounts = db::get_all_accounts(conn)?;
    write_accounts(&accounts, File::create(path)?)?;

    debug!(path = %path.display(), rows = accounts.len(), "accounts exported");
    Ok(accounts.len())
}

/// Dump every movement to `path`. Returns the number of data rows.
pub fn export_movements_csv(conn: &Connection, path: &Path) -> Result<usize> {
    let movements = db::get_all_movements(conn)?;
    write_movements(&movements, File::create(path)?)?;

    debug!(path = %path.display(), rows = movements.len(), "movements exported");
    Ok(movements.len())
}

/// Export both tables to the locations named in `config`.
pub fn export_all(conn: &Connection, config: &Config) -> Result<ExportSummary> {
    let summary = ExportSummary {
        accounts: export_accounts_csv(conn, &config.accounts_csv)?,
        movements: export_movements_csv(conn, &config.movements_csv)?,
    };

    info!(
        accounts = summary.accounts,
        movements = summary.movements,
        "export complete"
    );
    Ok(summary)
}
