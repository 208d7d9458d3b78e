use anyhow::{bail, Context, Result};
use ctacte_ledger::{
    export_all, get_all_accounts, logging, open_database, Account, Config, Movement,
    ReconciliationEngine,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::env;

fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let conn = open_database(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;

    let args: Vec<String> = env::args().collect();
    run(args.get(1).map(String::as_str), &conn, &config)
}

fn run(command: Option<&str>, conn: &Connection, config: &Config) -> Result<()> {
    match command {
        None | Some("demo") => {
            run_demo(conn)?;
            run_export(conn, config)?;
        }
        Some("export") => run_export(conn, config)?,
        Some("reconcile") => run_reconcile(conn)?,
        Some("accounts") => run_accounts(conn)?,
        Some(other) => {
            bail!("unknown command {:?}; usage: ctacte [demo | export | reconcile | accounts]", other)
        }
    }

    Ok(())
}

/// Open the account, or pick it up again if an earlier run registered it.
fn open_or_load(
    conn: &Connection,
    number: &str,
    rut: &str,
    name: &str,
    opening_balance: i64,
) -> Result<Account> {
    if let Some(account) = Account::find_by_number(conn, number)? {
        println!("↺ Account {} already registered (balance {})", number, account.balance);
        return Ok(account);
    }

    let account = Account::open(conn, number, rut, name, Decimal::from(opening_balance))?;
    println!("✓ Opened account {} for {} with {}", number, name, account.balance);
    Ok(account)
}

/// Print the outcome of one operation; business rejections are not fatal.
fn report(label: &str, account: &Account, outcome: ctacte_ledger::Result<Movement>) -> Result<()> {
    match outcome {
        Ok(movement) => {
            println!(
                "✓ {} {} on {} → balance {}",
                label, movement.amount, account.account_number, account.balance
            );
            Ok(())
        }
        Err(e) if e.is_rejection() => {
            println!("✗ {} rejected on {}: {}", label, account.account_number, e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_demo(conn: &Connection) -> Result<()> {
    println!("🏦 Current accounts - demo");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut first = open_or_load(conn, "45214578", "17.985.747-1", "Alfredo Cardenas", 150000)?;
    let _second = open_or_load(conn, "98563245", "9.222.874-2", "Danilo Ortega", 250000)?;

    println!();
    let outcome = first.deposit(conn, Decimal::from(50000));
    report("Deposit", &first, outcome)?;

    let outcome = first.withdraw(conn, Decimal::from(20000));
    report("Withdrawal", &first, outcome)?;

    // Insufficient funds
    let outcome = first.withdraw(conn, Decimal::from(999999));
    report("Withdrawal", &first, outcome)?;

    // Invalid amount
    let outcome = first.deposit(conn, Decimal::from(-100));
    report("Deposit", &first, outcome)?;

    Ok(())
}

fn run_export(conn: &Connection, config: &Config) -> Result<()> {
    println!("\n📤 Exporting...");
    let summary = export_all(conn, config)?;

    println!(
        "✓ Exported {} accounts to {}",
        summary.accounts,
        config.accounts_csv.display()
    );
    println!(
        "✓ Exported {} movements to {}",
        summary.movements,
        config.movements_csv.display()
    );
    Ok(())
}

fn run_reconcile(conn: &Connection) -> Result<()> {
    println!("⚖️  Reconciling accounts...");
    let reports = ReconciliationEngine::new().reconcile_all(conn)?;

    for report in &reports {
        let mark = if report.is_clean() { "✓" } else { "✗" };
        println!("{} {}", mark, report.summary());
        for discrepancy in &report.discrepancies {
            println!("    - {:?}: {}", discrepancy.category, discrepancy.description);
        }
    }

    let unreconciled = reports.iter().filter(|r| !r.is_clean()).count();
    if unreconciled > 0 {
        bail!("{} account(s) do not reconcile", unreconciled);
    }
    Ok(())
}

fn run_accounts(conn: &Connection) -> Result<()> {
    let accounts = get_all_accounts(conn)?;
    println!("📊 {} accounts", accounts.len());

    for account in accounts {
        println!(
            "  #{:<4} {:<12} {:<14} {:<30} {}",
            account.id, account.account_number, account.holder_rut, account.holder_name, account.balance
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctacte_ledger::{setup_database, update_balance};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let conn = test_conn();

        let err = run(Some("transfer"), &conn, &Config::default()).unwrap_err();

        assert!(err.to_string().contains("unknown command \"transfer\""));
    }

    #[test]
    fn test_reconcile_command_fails_on_tampered_balance() {
        let conn = test_conn();
        run_demo(&conn).unwrap();
        assert!(run(Some("reconcile"), &conn, &Config::default()).is_ok());

        let account = Account::find_by_number(&conn, "45214578").unwrap().unwrap();
        update_balance(&conn, account.id, Decimal::from(1)).unwrap();

        let err = run(Some("reconcile"), &conn, &Config::default()).unwrap_err();
        assert_eq!(err.to_string(), "1 account(s) do not reconcile");
    }
}
