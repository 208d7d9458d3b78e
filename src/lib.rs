// Cuenta Corriente Ledger - Core Library
// Exposes all modules for use in the CLI and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod export;
pub mod logging;
pub mod reconciliation;

// Re-export commonly used types
pub use config::Config;
pub use db::{
    open_database, setup_database,
    insert_account, update_balance, insert_movement,
    get_account, find_account_by_number, get_all_accounts, count_accounts,
    get_all_movements, get_movements_for_account, count_movements,
};
pub use entities::{Account, Movement, MovementKind};
pub use error::{LedgerError, Result};
pub use export::{
    ExportSummary,
    export_all, export_accounts_csv, export_movements_csv,
    read_accounts, read_movements, write_accounts, write_movements,
};
pub use reconciliation::{
    ReconciliationEngine, ReconciliationReport, ReconciliationResult,
    Discrepancy, DiscrepancyCategory,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
