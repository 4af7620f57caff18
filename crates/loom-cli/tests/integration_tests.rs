//! Integration tests for the `loom` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn loom(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("loom");
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        // Keep the user's global config out of the run.
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("HOME", dir);
    cmd
}

/// A fresh workspace `shop.json` inside a temp dir.
fn shop() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("shop.json");
    loom(dir.path())
        .args(["new", "shop.json", "--name", "Online Shop"])
        .assert()
        .success();
    (dir, file)
}

// ── basics ────────────────────────────────────────────────────────────────

#[test]
fn help_lists_the_commands() {
    let dir = TempDir::new().unwrap();
    loom(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("scope"));
}

#[test]
fn version_flag() {
    let dir = TempDir::new().unwrap();
    loom(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_argument_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    loom(dir.path()).args(["new", "--bogus"]).assert().code(2);
}

// ── new / show ────────────────────────────────────────────────────────────

#[test]
fn new_creates_a_workspace_document() {
    let (_dir, file) = shop();
    let raw = fs::read_to_string(&file).unwrap();
    assert!(raw.contains("\"typeDiscriminator\": \"workspace\""));
    assert!(raw.contains("Online Shop"));
}

#[test]
fn new_refuses_to_overwrite_without_force() {
    let (dir, _file) = shop();
    loom(dir.path())
        .args(["new", "shop.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"))
        .stderr(predicate::str::contains("--force"));

    loom(dir.path())
        .args(["new", "shop.json", "--force"])
        .assert()
        .success();
}

#[test]
fn show_prints_the_tree() {
    let (dir, _file) = shop();
    loom(dir.path())
        .args(["scope", "add", "shop.json", "Sales"])
        .assert()
        .success();
    loom(dir.path())
        .args(["show", "shop.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("workspace Online Shop"))
        .stdout(predicate::str::contains("scope Sales"));
}

#[test]
fn missing_workspace_exits_with_not_found() {
    let dir = TempDir::new().unwrap();
    loom(dir.path())
        .args(["show", "nope.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("loom new"));
}

// ── scopes and entities ───────────────────────────────────────────────────

#[test]
fn scope_lifecycle() {
    let (dir, _file) = shop();
    let run = |args: &[&str]| loom(dir.path()).args(args).assert();

    run(&["scope", "add", "shop.json", "Sales"]).success();
    run(&["scope", "add", "shop.json", "Billing"]).success();
    run(&["scope", "list", "shop.json"])
        .success()
        .stdout(predicate::eq("Sales\nBilling\n"));

    run(&["scope", "rename", "shop.json", "Billing", "Invoicing"]).success();
    run(&["scope", "remove", "shop.json", "Sales", "--yes"]).success();
    run(&["scope", "list", "shop.json"])
        .success()
        .stdout(predicate::eq("Invoicing\n"));
}

#[test]
fn duplicate_scope_is_rejected() {
    let (dir, _file) = shop();
    loom(dir.path())
        .args(["scope", "add", "shop.json", "Sales"])
        .assert()
        .success();
    loom(dir.path())
        .args(["scope", "add", "shop.json", "Sales"])
        .assert()
        .code(2);
}

#[test]
fn rename_with_a_slash_is_vetoed() {
    let (dir, _file) = shop();
    loom(dir.path())
        .args(["scope", "add", "shop.json", "Sales"])
        .assert()
        .success();
    loom(dir.path())
        .args(["scope", "rename", "shop.json", "Sales", "Sales/EU"])
        .assert()
        .failure();
    loom(dir.path())
        .args(["scope", "list", "shop.json"])
        .assert()
        .stdout(predicate::eq("Sales\n"));
}

#[test]
fn unknown_scope_suggests_existing_ones() {
    let (dir, _file) = shop();
    loom(dir.path())
        .args(["scope", "add", "shop.json", "Sales"])
        .assert()
        .success();
    loom(dir.path())
        .args(["entity", "add", "shop.json", "Salse", "Order"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No scope named 'Salse'"))
        .stderr(predicate::str::contains("Sales"));
}

#[test]
fn entities_carry_their_table() {
    let (dir, _file) = shop();
    loom(dir.path())
        .args(["scope", "add", "shop.json", "Sales"])
        .assert()
        .success();
    loom(dir.path())
        .args(["entity", "add", "shop.json", "Sales", "Order", "--table", "orders"])
        .assert()
        .success();
    loom(dir.path())
        .args(["entity", "add", "shop.json", "Sales", "OrderLine"])
        .assert()
        .success();
    loom(dir.path())
        .args(["entity", "list", "shop.json", "Sales"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Order\torders"))
        .stdout(predicate::str::contains("OrderLine\torder_line"));
}

#[test]
fn export_then_import_copies_a_scope() {
    let (dir, _file) = shop();
    let run = |args: &[&str]| loom(dir.path()).args(args).assert();
    run(&["scope", "add", "shop.json", "Sales"]).success();
    run(&["entity", "add", "shop.json", "Sales", "Order"]).success();
    run(&["scope", "export", "shop.json", "Sales", "--out", "sales.json"]).success();

    run(&["new", "other.json"]).success();
    run(&["scope", "import", "other.json", "sales.json"])
        .success()
        .stdout(predicate::str::contains("Imported 'Sales'"));
    run(&["entity", "list", "other.json", "Sales"])
        .success()
        .stdout(predicate::str::contains("Order"));
}

#[test]
fn toml_schemas_import_from_a_directory() {
    let (dir, _file) = shop();
    let schemas = dir.path().join("schema");
    fs::create_dir(&schemas).unwrap();
    fs::write(
        schemas.join("billing.toml"),
        "name = \"Billing\"\n\n[[entities]]\nname = \"Invoice\"\ntable = \"invoices\"\n",
    )
    .unwrap();
    fs::write(schemas.join("sales.toml"), "name = \"Sales\"\n").unwrap();

    loom(dir.path())
        .args(["scope", "import", "shop.json", "schema"])
        .assert()
        .success();
    loom(dir.path())
        .args(["scope", "list", "shop.json"])
        .assert()
        .stdout(predicate::eq("Billing\nSales\n"));
}

#[test]
fn unknown_provider_is_not_found() {
    let (dir, _file) = shop();
    fs::write(dir.path().join("x.json"), "{}").unwrap();
    loom(dir.path())
        .args(["scope", "import", "shop.json", "x.json", "--provider", "yaml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("json"))
        .stderr(predicate::str::contains("toml"));
}

// ── apply ─────────────────────────────────────────────────────────────────

#[test]
fn apply_runs_a_script_and_saves_once() {
    let (dir, _file) = shop();
    fs::write(
        dir.path().join("edits.loom"),
        "# build the model\n\
         scope add Sales\n\
         scope add Scratch\n\
         undo\n\
         entity add Sales Order orders\n\
         set Sales/Order audited=true\n",
    )
    .unwrap();

    loom(dir.path())
        .args(["apply", "shop.json", "edits.loom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 step(s) applied"));
    loom(dir.path())
        .args(["scope", "list", "shop.json"])
        .assert()
        .stdout(predicate::eq("Sales\n"));
}

#[test]
fn failing_script_leaves_the_file_untouched() {
    let (dir, file) = shop();
    let before = fs::read_to_string(&file).unwrap();
    fs::write(
        dir.path().join("edits.loom"),
        "scope add Sales\nentity add Billing Invoice\n",
    )
    .unwrap();

    loom(dir.path())
        .args(["apply", "shop.json", "edits.loom"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("edits.loom:2:"));
    assert_eq!(fs::read_to_string(&file).unwrap(), before);
}

#[test]
fn apply_dry_run_does_not_save() {
    let (dir, file) = shop();
    let before = fs::read_to_string(&file).unwrap();
    fs::write(dir.path().join("edits.loom"), "scope add Sales\n").unwrap();

    loom(dir.path())
        .args(["apply", "shop.json", "edits.loom", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not saved"));
    assert_eq!(fs::read_to_string(&file).unwrap(), before);
}

// ── generate ──────────────────────────────────────────────────────────────

fn modelled_shop() -> (TempDir, PathBuf) {
    let (dir, file) = shop();
    fs::write(
        dir.path().join("model.loom"),
        "scope add Sales\nentity add Sales Order orders\nscope add Billing\n",
    )
    .unwrap();
    loom(dir.path())
        .args(["apply", "shop.json", "model.loom"])
        .assert()
        .success();
    (dir, file)
}

#[test]
fn generate_writes_the_crate_and_records_the_run() {
    let (dir, file) = modelled_shop();
    loom(dir.path())
        .args(["generate", "shop.json", "--out", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated"));

    let out = dir.path().join("out");
    let cargo = fs::read_to_string(out.join("Cargo.toml")).unwrap();
    assert!(cargo.contains("name = \"online-shop\""));
    let lib = fs::read_to_string(out.join("src/lib.rs")).unwrap();
    assert!(lib.contains("pub mod sales;"));
    assert!(lib.contains("pub mod billing;"));
    let sales = fs::read_to_string(out.join("src/sales/mod.rs")).unwrap();
    assert!(sales.contains("pub struct Order"));
    assert!(out.join("README.md").exists());
    assert!(fs::read_to_string(out.join("schema.sql")).unwrap().contains("orders"));

    let raw = fs::read_to_string(&file).unwrap();
    assert!(raw.contains("generated-file"));
}

#[test]
fn generate_dry_run_writes_nothing() {
    let (dir, file) = modelled_shop();
    let before = fs::read_to_string(&file).unwrap();
    loom(dir.path())
        .args(["generate", "shop.json", "--out", "out", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("Cargo.toml"));
    assert!(!dir.path().join("out").exists());
    assert_eq!(fs::read_to_string(&file).unwrap(), before);
}

#[test]
fn generate_refuses_an_existing_output() {
    let (dir, file) = modelled_shop();
    let before = fs::read_to_string(&file).unwrap();
    fs::create_dir(dir.path().join("out")).unwrap();
    loom(dir.path())
        .args(["generate", "shop.json", "--out", "out"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(&file).unwrap(), before);
}

#[test]
fn generate_json_report() {
    let (dir, _file) = modelled_shop();
    loom(dir.path())
        .args(["--output-format", "json", "generate", "shop.json", "--out", "out", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dry_run\": true"));
}

// ── plugins / config / completions ────────────────────────────────────────

#[test]
fn plugins_list_shows_builtins() {
    let dir = TempDir::new().unwrap();
    loom(dir.path())
        .args(["plugins", "list", "--format", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("loom.rust-crate"))
        .stdout(predicate::str::contains("loom.structural-audit"));
}

#[test]
fn config_reads_environment_overrides() {
    let dir = TempDir::new().unwrap();
    loom(dir.path())
        .env("LOOM_HISTORY__MAX_UNDO", "7")
        .args(["config", "get", "history.max_undo"])
        .assert()
        .success()
        .stdout(predicate::eq("7\n"));
}

#[test]
fn init_local_writes_a_loadable_config() {
    let dir = TempDir::new().unwrap();
    loom(dir.path()).args(["init", "--local"]).assert().success();
    assert!(dir.path().join(".loom.toml").exists());

    fs::write(
        dir.path().join(".loom.toml"),
        "[generation]\noutput_name = \"build\"\n",
    )
    .unwrap();
    loom(dir.path())
        .args(["config", "get", "generation.output_name"])
        .assert()
        .success()
        .stdout(predicate::eq("build\n"));
}

#[test]
fn completions_for_bash() {
    let dir = TempDir::new().unwrap();
    loom(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("loom"));
}
