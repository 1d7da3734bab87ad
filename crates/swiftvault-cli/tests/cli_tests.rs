//! CLI integration tests.
//!
//! Every test runs the binary against its own temporary data directory
//! and an RPC endpoint nothing listens on, so no network is needed.
//! Secrets are piped through stdin or `SWIFTVAULT_PIN`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// BIP39 mnemonic from all-zero 256-bit entropy.
const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon \
                        abandon abandon abandon abandon abandon abandon \
                        abandon abandon abandon abandon abandon abandon \
                        abandon abandon abandon abandon abandon art";

/// RFC 8032 test vector 1 secret key.
const SEED_HEX: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

const UNREACHABLE_RPC: &str = "http://127.0.0.1:9";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("swiftvault_cli_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&path);
        Self(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

struct Run {
    code: i32,
    stdout: String,
    stderr: String,
}

/// Runs the binary with the shared flags, an optional PIN in the
/// environment and `input` on stdin.
fn run_cli(dir: &Path, args: &[&str], pin: Option<&str>, input: &str) -> Run {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_swiftvault"));
    cmd.arg("--data-dir")
        .arg(dir)
        .args(["--rpc-url", UNREACHABLE_RPC, "--kdf-iterations", "100000"])
        .args(args)
        .env_remove("SWIFTVAULT_PIN")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(pin) = pin {
        cmd.env("SWIFTVAULT_PIN", pin);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => panic!("could not run binary: {e}"),
    };
    if let Some(mut stdin) = child.stdin.take() {
        // The process may exit before reading everything.
        let _ = stdin.write_all(input.as_bytes());
    }
    let output = match child.wait_with_output() {
        Ok(output) => output,
        Err(e) => panic!("binary did not finish: {e}"),
    };

    Run {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Stdin for `import` when the PIN comes from the environment.
fn key_line() -> String {
    format!("{SEED_HEX}\n")
}

fn status_json(dir: &Path) -> serde_json::Value {
    let run = run_cli(dir, &["--json", "status"], None, "");
    assert_eq!(run.code, 0, "status failed: {}", run.stderr);
    match serde_json::from_str(run.stdout.trim()) {
        Ok(value) => value,
        Err(e) => panic!("status output is not JSON ({e}): {}", run.stdout),
    }
}

// ---------------------------------------------------------------------------
// Clap parsing
// ---------------------------------------------------------------------------

#[test]
fn help_flag_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_swiftvault")).arg("--help").output();
    let output = match output {
        Ok(o) => o,
        Err(e) => panic!("could not run binary: {e}"),
    };
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("recover"), "help should list subcommands");
    assert!(stdout.contains("export-key"));
}

#[test]
fn unknown_network_is_rejected_by_parser() {
    let dir = TempDir::new("bad_network");
    let run = run_cli(dir.path(), &["--network", "moonnet", "status"], None, "");
    assert_eq!(run.code, 2, "clap usage errors exit 2");
    assert!(run.stderr.contains("moonnet"));
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn empty_data_dir_reports_no_wallet() {
    let dir = TempDir::new("empty");
    let status = status_json(dir.path());
    assert_eq!(status["status"], "no-wallet");
    assert_eq!(status["address"], "-");
    assert_eq!(status["network"], "devnet");
}

#[test]
fn network_flag_is_remembered() {
    let dir = TempDir::new("network");
    let run = run_cli(dir.path(), &["import"], Some("1234"), &key_line());
    assert_eq!(run.code, 0, "{}", run.stderr);

    let run = run_cli(dir.path(), &["--network", "testnet", "status"], None, "");
    assert_eq!(run.code, 0, "{}", run.stderr);

    assert_eq!(status_json(dir.path())["network"], "testnet");
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

#[test]
fn import_then_export_requires_the_pin() {
    let dir = TempDir::new("import_export");

    let run = run_cli(dir.path(), &["--json", "import"], Some("1234"), &key_line());
    assert_eq!(run.code, 0, "{}", run.stderr);
    let status = status_json(dir.path());
    assert_eq!(status["status"], "locked");

    let wrong = run_cli(dir.path(), &["export-key"], Some("4321"), "");
    assert_eq!(wrong.code, 1);
    assert!(wrong.stderr.contains("incorrect PIN"));

    let right = run_cli(dir.path(), &["--json", "export-key"], Some("1234"), "");
    assert_eq!(right.code, 0, "{}", right.stderr);
    let exported: serde_json::Value = match serde_json::from_str(right.stdout.trim()) {
        Ok(v) => v,
        Err(e) => panic!("export output is not JSON ({e}): {}", right.stdout),
    };
    let key = exported["privateKey"].as_str().unwrap_or_default();
    assert_eq!(key.len(), 128);
    assert!(key.starts_with(SEED_HEX));
}

#[test]
fn import_reads_key_and_pin_from_stdin() {
    let dir = TempDir::new("import_stdin");
    let input = format!("{SEED_HEX}\n5678\n5678\n");
    let run = run_cli(dir.path(), &["import"], None, &input);
    assert_eq!(run.code, 0, "{}", run.stderr);

    let export = run_cli(dir.path(), &["export-key"], None, "5678\n");
    assert_eq!(export.code, 0, "{}", export.stderr);
    assert!(export.stdout.trim().starts_with(SEED_HEX));
}

#[test]
fn mismatched_new_pins_write_nothing() {
    let dir = TempDir::new("pin_mismatch");
    let input = format!("{SEED_HEX}\n1234\n1235\n");
    let run = run_cli(dir.path(), &["import"], None, &input);
    assert_eq!(run.code, 1);
    assert_eq!(status_json(dir.path())["status"], "no-wallet");
}

#[test]
fn key_is_never_accepted_as_an_argument() {
    let dir = TempDir::new("key_arg");
    let run = run_cli(dir.path(), &["import", SEED_HEX], Some("1234"), "");
    assert_eq!(run.code, 2);
    assert!(run.stderr.contains("unexpected argument"));
    assert_eq!(status_json(dir.path())["status"], "no-wallet");
}

#[test]
fn weak_pin_is_rejected() {
    let dir = TempDir::new("weak_pin");
    let run = run_cli(dir.path(), &["import"], Some("12ab"), &key_line());
    assert_eq!(run.code, 1);
    assert!(run.stderr.contains("PIN rejected"));
    assert_eq!(status_json(dir.path())["status"], "no-wallet");
}

#[test]
fn malformed_key_is_rejected() {
    let dir = TempDir::new("bad_key");
    let run = run_cli(dir.path(), &["--json", "import"], Some("1234"), "deadbeef\n");
    assert_eq!(run.code, 1);
    assert!(run.stderr.contains("malformed key material"));
    assert!(run.stderr.contains("\"transient\":false"));
}

// ---------------------------------------------------------------------------
// Recover / lookup / forget
// ---------------------------------------------------------------------------

#[test]
fn recover_lookup_and_forget() {
    let dir = TempDir::new("recover");
    let phrase_line = format!("{MNEMONIC}\n");

    let recovered = run_cli(dir.path(), &["--json", "recover"], Some("2468"), &phrase_line);
    assert_eq!(recovered.code, 0, "{}", recovered.stderr);
    let session: serde_json::Value = match serde_json::from_str(recovered.stdout.trim()) {
        Ok(v) => v,
        Err(e) => panic!("recover output is not JSON ({e}): {}", recovered.stdout),
    };
    let address = session["publicKey"].as_str().unwrap_or_default().to_string();
    assert!(!address.is_empty());

    let found = run_cli(dir.path(), &["--json", "lookup"], None, &phrase_line.to_uppercase());
    assert_eq!(found.code, 0, "{}", found.stderr);
    assert!(found.stdout.contains(&address));

    let forgot = run_cli(dir.path(), &["forget", "--yes"], None, "");
    assert_eq!(forgot.code, 0, "{}", forgot.stderr);
    assert_eq!(status_json(dir.path())["status"], "no-wallet");

    let missing = run_cli(dir.path(), &["lookup"], None, &phrase_line);
    assert_eq!(missing.code, 1);
}

#[test]
fn forget_declined_keeps_the_wallet() {
    let dir = TempDir::new("forget_no");
    let run = run_cli(dir.path(), &["import"], Some("1234"), &key_line());
    assert_eq!(run.code, 0, "{}", run.stderr);

    let declined = run_cli(dir.path(), &["forget"], None, "n\n");
    assert_eq!(declined.code, 0, "{}", declined.stderr);
    assert_eq!(status_json(dir.path())["status"], "locked");
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_with_wrong_answers_leaves_no_wallet() {
    let dir = TempDir::new("create_wrong");
    let answers = "wrong\n".repeat(9);
    let run = run_cli(dir.path(), &["create"], Some("1234"), &answers);
    assert_eq!(run.code, 1);
    assert!(run.stderr.contains("recovery phrase verification failed"));
    assert_eq!(status_json(dir.path())["status"], "no-wallet");
}

#[test]
fn create_abandoned_on_closed_input_leaves_no_wallet() {
    let dir = TempDir::new("create_eof");
    let run = run_cli(dir.path(), &["create"], Some("1234"), "");
    assert_eq!(run.code, 1);
    assert_eq!(status_json(dir.path())["status"], "no-wallet");
}

// ---------------------------------------------------------------------------
// Chain access
// ---------------------------------------------------------------------------

#[test]
fn unreachable_rpc_is_a_transient_error() {
    let dir = TempDir::new("offline");
    let run = run_cli(
        dir.path(),
        &["--json", "balance", "11111111111111111111111111111111"],
        None,
        "",
    );
    assert_eq!(run.code, 1);
    assert!(run.stderr.contains("network error"));
    assert!(run.stderr.contains("\"transient\":true"));
}

#[test]
fn balance_without_wallet_or_address_fails() {
    let dir = TempDir::new("no_target");
    let run = run_cli(dir.path(), &["balance"], None, "");
    assert_eq!(run.code, 1);
    assert!(run.stderr.contains("wallet not found"));
}

#[test]
fn send_rejects_bad_amount_before_asking_for_pin() {
    let dir = TempDir::new("bad_amount");
    let run = run_cli(dir.path(), &["import"], Some("1234"), &key_line());
    assert_eq!(run.code, 0, "{}", run.stderr);

    let run = run_cli(
        dir.path(),
        &["send", "11111111111111111111111111111111", "1.0000000001"],
        None,
        "",
    );
    assert_eq!(run.code, 1);
    assert!(run.stderr.contains("invalid transaction"));
}

#[test]
fn sign_needs_the_pin() {
    let dir = TempDir::new("sign");
    let run = run_cli(dir.path(), &["import"], Some("1234"), &key_line());
    assert_eq!(run.code, 0, "{}", run.stderr);

    let signed = run_cli(dir.path(), &["--json", "sign", "hello"], Some("1234"), "");
    assert_eq!(signed.code, 0, "{}", signed.stderr);
    assert!(signed.stdout.contains("\"signature\""));

    let denied = run_cli(dir.path(), &["sign", "hello"], Some("0000"), "");
    assert_eq!(denied.code, 1);
    assert!(denied.stderr.contains("incorrect PIN"));
}
