use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::Amount;
use crate::model::{Account, TxKind};

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized transaction type '{tx_type}'")]
    UnrecognizedType { line: usize, tx_type: String },

    #[error("line {line}: amount must be positive, got {amount}")]
    NonPositiveAmount { line: usize, amount: f64 },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    account: String,
    amount: f64,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    username: String,
    balance: String,
    status: String,
}

/// One parsed replay row: a transaction intent addressed by username.
#[derive(Debug, Clone)]
pub struct ReplayOp {
    pub username: String,
    pub kind: TxKind,
    pub amount: Amount,
    pub description: Option<String>,
}

/// Read replay operations from a csv file
pub fn read_ops(path: impl AsRef<Path>) -> impl Iterator<Item = Result<ReplayOp, CsvError>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .expect("failed to open csv file");

    reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let kind = TxKind::parse(&row.r#type).ok_or_else(|| CsvError::UnrecognizedType {
                line,
                tx_type: row.r#type.clone(),
            })?;
            if row.amount <= 0.0 {
                return Err(CsvError::NonPositiveAmount {
                    line,
                    amount: row.amount,
                });
            }
            Ok(ReplayOp {
                username: row.account,
                kind,
                amount: Amount::from_float(row.amount),
                description: row.description.filter(|d| !d.is_empty()),
            })
        })
}

/// write account balances to stdout in csv format
pub fn write_summary(accounts: impl IntoIterator<Item = Account>) {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());

    for account in accounts {
        let row = OutputRow {
            username: account.username,
            balance: account.balance.to_string(),
            status: account.status.as_str().to_string(),
        };
        writer.serialize(&row).expect("failed to write csv row");
    }

    writer.flush().expect("failed to flush csv writer");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn read_deposit() {
        let file = write_csv("type,account,amount,description\ndeposit,alice,10.50,payday\n");
        let results: Vec<_> = read_ops(file.path()).collect();
        assert_eq!(results.len(), 1);

        let op = results.into_iter().next().unwrap().unwrap();
        assert_eq!(op.username, "alice");
        assert_eq!(op.kind, TxKind::Deposit);
        assert_eq!(op.amount, Amount::from_float(10.5));
        assert_eq!(op.description.as_deref(), Some("payday"));
    }

    #[test]
    fn read_withdrawal_without_description() {
        let file = write_csv("type,account,amount,description\nwithdrawal,bob,5.25,\n");
        let op = read_ops(file.path()).next().unwrap().unwrap();
        assert_eq!(op.username, "bob");
        assert_eq!(op.kind, TxKind::Withdrawal);
        assert_eq!(op.amount, Amount::from_float(5.25));
        assert_eq!(op.description, None);
    }

    #[test]
    fn read_with_whitespace_and_mixed_case() {
        let file = write_csv("type, account, amount, description\nBill Pay, carol, 12.00,\n");
        let op = read_ops(file.path()).next().unwrap().unwrap();
        assert_eq!(op.kind, TxKind::BillPay);
        assert_eq!(op.username, "carol");
    }

    #[test]
    fn read_returns_error_for_unknown_type() {
        let file = write_csv("type,account,amount,description\npayday,alice,10.0,\n");
        let results: Vec<_> = read_ops(file.path()).collect();
        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert!(matches!(err, CsvError::UnrecognizedType { line: 2, .. }));
    }

    #[test]
    fn read_returns_error_for_non_positive_amount() {
        let file = write_csv("type,account,amount,description\ndeposit,alice,0,\n");
        let err = read_ops(file.path()).next().unwrap().unwrap_err();
        assert!(matches!(err, CsvError::NonPositiveAmount { line: 2, .. }));
    }

    #[test]
    fn read_returns_error_for_missing_amount() {
        let file = write_csv("type,account,amount,description\ndeposit,alice,,\n");
        let err = read_ops(file.path()).next().unwrap().unwrap_err();
        assert!(matches!(err, CsvError::Parse { line: 2, .. }));
    }
}
