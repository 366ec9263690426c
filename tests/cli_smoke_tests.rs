use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("credit_core_cli").unwrap();
    cmd.env("CREDIT_CORE_HOME", home.path());
    cmd
}

#[test]
fn list_on_fresh_home_reports_no_buyers() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No buyers recorded."));
}

#[test]
fn declined_credit_exits_with_error_and_records_nothing() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["credit", "abcde1234f", "Ravi Stores", "500"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stdout(contains("Approval code for ABCDE1234F"))
        .stderr(contains("buyer declined"));

    cli(&home)
        .args(["show", "ABCDE1234F"])
        .assert()
        .success()
        .stdout(contains("No profile for ABCDE1234F"));
}

#[test]
fn invalid_amount_is_rejected_before_prompting() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["credit", "ABCDE1234F", "Ravi", "-5"])
        .assert()
        .failure()
        .stderr(contains("Invalid input"));
}

#[test]
fn config_prints_defaults() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(contains("\"reward_points\": 10"));
}

#[test]
fn unknown_command_prints_usage() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(contains("Usage: credit_core_cli"));
}
