use std::process::Command;

fn run(fixture: &str) -> (String, String, bool) {
    let path = format!("tests/fixtures/{fixture}");
    let output = Command::new(env!("CARGO_BIN_EXE_bank-core"))
        .arg(&path)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn valid_operations() {
    let (stdout, stderr, success) = run("valid.csv");

    assert!(success);
    assert!(stderr.is_empty());

    // opening balance is 100.00 per account, rows ordered by username
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "username,balance,status");
    assert_eq!(lines[1], "alice,120.00,Active");
    assert_eq!(lines[2], "bob,300.00,Active");
}

#[test]
fn errors_warn_but_do_not_block() {
    let (stdout, stderr, success) = run("with_errors.csv");

    assert!(success);
    assert!(stderr.contains("unrecognized transaction type"));
    // 150 - 60 = 90 would breach the default 100.00 floor
    assert!(stderr.contains("minimum balance"));
    // 100000.00 is over the default 10000.00 per-transaction ceiling
    assert!(stderr.contains("transaction limit"));

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "username,balance,status");
    assert_eq!(lines[1], "alice,150.00,Active");
}
