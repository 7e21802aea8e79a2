use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const SCENARIO_CSV: &str = "URL,IP,timeStamp,timeSpent\n\
                            /a,1.1.1.1,2024-01-01T00:00:00Z,10\n\
                            /a,1.1.1.2,2024-01-02T00:00:00Z,20\n\
                            /b,1.1.1.1,2024-01-01T12:00:00Z,5\n";

fn run(dir: &Path, extra: &[&str], command: &[&str]) -> Output {
    let mut args: Vec<String> = vec![
        "--source".into(),
        dir.join("logs.csv").display().to_string(),
        "--snapshot".into(),
        dir.join("logs.json").display().to_string(),
        "--db".into(),
        dir.join("logs.db").display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    args.extend(command.iter().map(|s| s.to_string()));
    Command::new(env!("CARGO_BIN_EXE_log-ledger"))
        .args(&args)
        .output()
        .expect("failed to run log-ledger")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn convert_and_import(dir: &Path) {
    let converted = run(dir, &[], &["convert"]);
    assert!(converted.status.success(), "convert failed: {converted:?}");
    let imported = run(dir, &[], &["import"]);
    assert!(imported.status.success(), "import failed: {imported:?}");
}

#[test]
fn csv_round_trips_into_queries_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("logs.csv"), SCENARIO_CSV).unwrap();

    let converted = run(dir.path(), &[], &["convert"]);
    assert!(converted.status.success());
    assert!(stdout(&converted).contains("Converted 3 rows"));

    let snapshot = fs::read_to_string(dir.path().join("logs.json")).unwrap();
    assert!(snapshot.contains("\"timeStamp\""));

    let imported = run(dir.path(), &[], &["import"]);
    assert!(imported.status.success());
    assert!(stdout(&imported).contains("Inserted 3 entries"));

    let urls = run(dir.path(), &[], &["urls"]);
    assert_eq!(stdout(&urls), "/a\n/b\n");

    let ips = run(dir.path(), &[], &["ips", "/a"]);
    assert_eq!(stdout(&ips), "1.1.1.1\n1.1.1.2\n");

    let range = run(
        dir.path(),
        &[],
        &["range", "2024-01-01T00:00:00Z", "2024-01-01T23:59:59Z"],
    );
    assert_eq!(stdout(&range), "/a\n/b\n");

    let byip = run(dir.path(), &[], &["byip", "1.1.1.1"]);
    assert_eq!(stdout(&byip), "/a\n/b\n");
}

#[test]
fn aggregation_reports_match_the_loaded_entries() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("logs.csv"), SCENARIO_CSV).unwrap();
    convert_and_import(dir.path());

    let duration = run(dir.path(), &[], &["agg-duration"]);
    assert_eq!(stdout(&duration), "/a\t30\n/b\t5\n");

    let visits = run(dir.path(), &[], &["agg-visits"]);
    assert_eq!(stdout(&visits), "/a\t2\n/b\t1\n");

    let daily = run(
        dir.path(),
        &[],
        &["agg-daily", "2024-01-01", "2024-01-02"],
    );
    assert_eq!(
        stdout(&daily),
        "/a\t2024-01-01\t1\n/a\t2024-01-02\t1\n/b\t2024-01-01\t1\n"
    );

    let by_ip = run(dir.path(), &[], &["agg-ip"]);
    assert_eq!(stdout(&by_ip), "1.1.1.1\t2\t15\n1.1.1.2\t1\t20\n");
}

#[test]
fn malformed_row_aborts_convert_by_default() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("logs.csv"),
        "URL,IP,timeStamp,timeSpent\n\
         /a,1.1.1.1,2024-01-01T00:00:00Z,10\n\
         /b,1.1.1.1,2024-01-01T00:00:00Z,not-a-number\n",
    )
    .unwrap();

    let converted = run(dir.path(), &[], &["convert"]);
    assert!(!converted.status.success());
    let stderr = String::from_utf8_lossy(&converted.stderr).into_owned();
    assert!(stderr.contains("line 3"), "stderr was: {stderr}");
    assert!(!dir.path().join("logs.json").exists());
}

#[test]
fn skip_policy_drops_malformed_rows_without_corrupting_sums() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("logs.csv"),
        "URL,IP,timeStamp,timeSpent\n\
         /a,1.1.1.1,2024-01-01T00:00:00Z,10\n\
         /b,1.1.1.1,2024-01-01T00:00:00Z,not-a-number\n\
         /a,1.1.1.2,2024-01-01T06:00:00Z,20\n",
    )
    .unwrap();

    let converted = run(dir.path(), &["--on-parse-error", "skip"], &["convert"]);
    assert!(converted.status.success());
    assert!(stdout(&converted).contains("Converted 2 rows"));
    assert!(stdout(&converted).contains("Skipped 1 malformed rows"));

    let imported = run(dir.path(), &[], &["import"]);
    assert!(imported.status.success());

    let duration = run(dir.path(), &[], &["agg-duration"]);
    assert_eq!(stdout(&duration), "/a\t30\n");
}

#[test]
fn missing_source_fails_without_writing_a_snapshot() {
    let dir = tempfile::tempdir().unwrap();

    let converted = run(dir.path(), &[], &["convert"]);
    assert!(!converted.status.success());
    assert!(!dir.path().join("logs.json").exists());
}

#[test]
fn unknown_command_prints_usage_and_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_log-ledger"))
        .arg("frobnicate")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    assert!(stderr.to_lowercase().contains("usage"), "stderr was: {stderr}");
}

#[test]
fn bad_range_instant_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("logs.csv"), SCENARIO_CSV).unwrap();
    convert_and_import(dir.path());

    let range = run(dir.path(), &[], &["range", "soon", "later"]);
    assert!(!range.status.success());
    let stderr = String::from_utf8_lossy(&range.stderr).into_owned();
    assert!(stderr.contains("unparseable instant"), "stderr was: {stderr}");
}
