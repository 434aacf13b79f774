use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use margin_intel::mart::initialize_mart;
use rusqlite::{Connection, params};
use serde_json::{Value, json};

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_INVALID_REQUEST: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{nanos}"))
}

fn seeded_mart(prefix: &str) -> (PathBuf, PathBuf) {
    let temp = unique_temp_dir(prefix);
    let home_dir = temp.join("home");
    std::fs::create_dir_all(&home_dir).expect("home dir should be creatable");
    let mart_path = temp.join("mart.sqlite");
    initialize_mart(&mart_path).expect("mart should initialize");

    let connection = Connection::open(&mart_path).expect("mart should open for seeding");
    connection
        .execute(
            "INSERT INTO report_control (current_period, comparison_period, last_updated_at) VALUES (?1, ?2, '2026-03-01T06:00:00Z')",
            params!["2026-02", "2026-01"],
        )
        .expect("report control should insert");
    connection
        .execute(
            "INSERT INTO margin_base (period_month, parentname, customer_type, price_branch_region, item_sn2, sales_amt, cogs_amt) VALUES ('2026-02', 'ACME FRAMING', 'DEALER', 'Texas', 'JH14148', 640.0, 410.0)",
            [],
        )
        .expect("margin line should insert");

    (home_dir, mart_path)
}

fn margin_intel(home_dir: &Path, mart_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_margin-intel"))
        .arg("--home-dir")
        .arg(home_dir)
        .arg("--mart")
        .arg(mart_path)
        .args(args)
        .env_remove("MARGIN_INTEL_MART")
        .output()
        .expect("command should execute")
}

fn stdout_envelope(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().last().expect("stdout should carry an envelope");
    serde_json::from_str(line).expect("stdout should be a JSON envelope")
}

#[test]
fn missing_required_args_exits_with_usage_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_margin-intel"))
        .arg("call")
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_USAGE_ERROR));
}

#[test]
fn help_exits_successfully() {
    let status = Command::new(env!("CARGO_BIN_EXE_margin-intel"))
        .arg("--help")
        .stdout(Stdio::null())
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_SUCCESS));
}

#[test]
fn runtime_path_resolution_failures_exit_with_runtime_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_margin-intel"))
        .args(["--home-dir", "relative", "tool", "margin-summary"])
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_RUNTIME_FAILURE));
}

#[test]
fn tool_call_prints_ok_envelope_on_stdout() {
    let (home_dir, mart_path) = seeded_mart("margin-intel-exit-ok");
    let output = margin_intel(&home_dir, &mart_path, &["tool", "top-customers"]);

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let envelope = stdout_envelope(&output);
    assert_eq!(envelope.get("ok"), Some(&json!(true)));
    assert_eq!(envelope.get("command"), Some(&json!("top-customers")));
    assert_eq!(envelope.pointer("/meta/row_count"), Some(&json!(1)));
    assert_eq!(
        envelope.pointer("/data/rows/0/parentname"),
        Some(&json!("ACME FRAMING"))
    );
}

#[test]
fn call_by_name_matches_the_typed_tool() {
    let (home_dir, mart_path) = seeded_mart("margin-intel-exit-call");
    let typed = margin_intel(
        &home_dir,
        &mart_path,
        &["tool", "product-performance", "--product-search", "jh14"],
    );
    let by_name = margin_intel(
        &home_dir,
        &mart_path,
        &["call", "product-performance", "--args", r#"{"product_search":"jh14"}"#],
    );

    assert_eq!(typed.status.code(), Some(EXIT_SUCCESS));
    assert_eq!(by_name.status.code(), Some(EXIT_SUCCESS));
    assert_eq!(
        stdout_envelope(&typed).pointer("/data/rows"),
        stdout_envelope(&by_name).pointer("/data/rows")
    );
}

#[test]
fn unknown_operation_exits_with_invalid_request_code() {
    let (home_dir, mart_path) = seeded_mart("margin-intel-exit-unknown");
    let output = margin_intel(&home_dir, &mart_path, &["call", "get_margin_summary"]);

    assert_eq!(output.status.code(), Some(EXIT_INVALID_REQUEST));
    let envelope = stdout_envelope(&output);
    assert_eq!(envelope.get("ok"), Some(&json!(false)));
    assert_eq!(
        envelope.pointer("/error/code"),
        Some(&json!("unknown_operation"))
    );
}

#[test]
fn mistyped_arguments_exit_with_invalid_request_code() {
    let (home_dir, mart_path) = seeded_mart("margin-intel-exit-args");
    let output = margin_intel(
        &home_dir,
        &mart_path,
        &["call", "margin-history", "--args", r#"{"months":"six"}"#],
    );

    assert_eq!(output.status.code(), Some(EXIT_INVALID_REQUEST));
    assert_eq!(
        stdout_envelope(&output).pointer("/error/code"),
        Some(&json!("invalid_arguments"))
    );
}

#[test]
fn missing_mart_exits_with_runtime_code() {
    let temp = unique_temp_dir("margin-intel-exit-missing");
    let home_dir = temp.join("home");
    std::fs::create_dir_all(&home_dir).expect("home dir should be creatable");
    let output = margin_intel(
        &home_dir,
        &temp.join("absent.sqlite"),
        &["tool", "margin-summary"],
    );

    assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
    assert_eq!(
        stdout_envelope(&output).pointer("/error/code"),
        Some(&json!("mart_unavailable"))
    );
    assert!(!temp.join("absent.sqlite").exists());
}

#[test]
fn init_creates_a_queryable_mart() {
    let temp = unique_temp_dir("margin-intel-exit-init");
    let home_dir = temp.join("home");
    std::fs::create_dir_all(&home_dir).expect("home dir should be creatable");
    let mart_path = temp.join("nested").join("mart.sqlite");

    let init = margin_intel(&home_dir, &mart_path, &["init"]);
    assert_eq!(init.status.code(), Some(EXIT_SUCCESS));
    assert!(mart_path.exists());

    let empty = margin_intel(&home_dir, &mart_path, &["tool", "margin-bridge"]);
    assert_eq!(empty.status.code(), Some(EXIT_SUCCESS));
    let envelope = stdout_envelope(&empty);
    assert_eq!(envelope.pointer("/meta/row_count"), Some(&json!(0)));
    assert_eq!(envelope.pointer("/warnings/0/code"), Some(&json!("no_rows")));
}

#[test]
fn serve_answers_each_request_line() {
    let (home_dir, mart_path) = seeded_mart("margin-intel-exit-serve");
    let mut child = Command::new(env!("CARGO_BIN_EXE_margin-intel"))
        .arg("--home-dir")
        .arg(&home_dir)
        .arg("--mart")
        .arg(&mart_path)
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("serve should start");

    {
        let stdin = child.stdin.as_mut().expect("stdin should be piped");
        writeln!(stdin, r#"{{"id": 1, "method": "call", "operation": "report-config"}}"#)
            .expect("request should write");
        writeln!(stdin, r#"{{"id": 2, "method": "shutdown"}}"#).expect("request should write");
    }
    let output = child.wait_with_output().expect("serve should exit");

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines = stdout
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).expect("each line should be JSON"))
        .collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].pointer("/meta/request_id"), Some(&json!(1)));
    assert_eq!(
        lines[0].pointer("/data/rows/0/current_period"),
        Some(&json!("2026-02"))
    );
    assert_eq!(lines[1].get("command"), Some(&json!("shutdown")));
}
