use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const STATEMENT: &[u8] = b"Date;Libell\xe9;Montant;Cat\xe9gorie;Sous-cat\xe9gorie;Note\r\n\
05/01/2024;CB CARREFOUR;-42,10;Alimentation;Courses;\r\n\
06/01/2024;VIR SALAIRE;2 150,00;Revenus professionnels;;janvier\r\n\
05/01/2024;CB CARREFOUR;-42,10;Alimentation;Courses;\r\n\
pas une ligne\r\n";

struct Env {
    home: TempDir,
    data: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
            data: tempfile::tempdir().unwrap(),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("comptes").unwrap();
        cmd.env("HOME", self.home.path())
            .env("COMPTES_DATA_DIR", self.data.path())
            .env("NO_COLOR", "1")
            .env_remove("COMPTES_LOG");
        cmd
    }

    fn write_csv(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn init_creates_database() {
    let env = Env::new();
    env.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized comptes"))
        .stdout(predicate::str::contains("14 categories"));
    assert!(env.data.path().join("comptes.db").exists());
}

#[test]
fn dry_run_reports_duplicates_without_writing() {
    let env = Env::new();
    let csv = env.write_csv("releve.csv", STATEMENT);
    env.cmd()
        .args(["import", arg(&csv), "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalRows\": 3"))
        .stdout(predicate::str::contains("\"uniqueRows\": 2"))
        .stdout(predicate::str::contains("\"duplicatesCount\": 1"))
        .stdout(predicate::str::contains("\"rowIndex\": 4"))
        .stdout(predicate::str::contains("\"invalidRows\": 1"));
    assert!(!env.data.path().join("comptes.db").exists());

    env.cmd()
        .args(["transactions", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn import_skips_duplicates_and_flags_reimport() {
    let env = Env::new();
    let csv = env.write_csv("releve.csv", STATEMENT);

    env.cmd()
        .args(["import", arg(&csv)])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imported\": 2"))
        .stdout(predicate::str::contains("\"newSubcategories\": 1"))
        .stdout(predicate::str::contains("previousBatchId").not());

    env.cmd()
        .args(["import", arg(&csv)])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imported\": 0"))
        .stdout(predicate::str::contains("\"skipped\": 2"))
        .stdout(predicate::str::contains("\"previousBatchId\": 1"));

    env.cmd()
        .args(["transactions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CB CARREFOUR"))
        .stdout(predicate::str::contains("-42,10 €"))
        .stdout(predicate::str::contains("2 150,00 €"));
}

#[test]
fn include_duplicates_keeps_every_row() {
    let env = Env::new();
    let csv = env.write_csv("releve.csv", STATEMENT);
    env.cmd()
        .args(["import", arg(&csv), "--include-duplicates"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imported\": 3"));
}

#[test]
fn import_missing_file_fails() {
    let env = Env::new();
    env.cmd()
        .args(["import", "/nonexistent/releve.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: No file to import"));
}

#[test]
fn import_empty_file_fails() {
    let env = Env::new();
    let csv = env.write_csv("vide.csv", b"Date;Libell\xe9;Montant\n");
    env.cmd()
        .args(["import", arg(&csv)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: invalid or empty CSV"));
}

#[test]
fn categories_add_and_list() {
    let env = Env::new();
    env.cmd()
        .args(["categories", "add", "Placements", "--theme", "4", "--sub", "PEA,Livret A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added category: Placements"));

    env.cmd()
        .args(["categories", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Placements"))
        .stdout(predicate::str::contains("Livret A"));
}

#[test]
fn admin_reset_categories_drops_custom_ones() {
    let env = Env::new();
    let csv = env.write_csv("releve.csv", b"Date;Libell\xe9;Montant;Cat\xe9gorie\n01/02/2024;Resto;-25,00;Sorties\n");
    env.cmd().args(["import", arg(&csv)]).assert().success();

    env.cmd()
        .args(["admin", "reset-categories"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(14 categories)"));
}

#[test]
fn completions_are_generated() {
    let env = Env::new();
    env.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("comptes"));
}

#[test]
fn init_records_owner_shown_by_status() {
    let env = Env::new();
    env.cmd().args(["init", "--owner", "Camille"]).assert().success();
    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Owner:      Camille"));
}

#[test]
fn themes_add_edit_delete() {
    let env = Env::new();
    env.cmd()
        .args(["themes", "add", "Patrimoine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added theme: Patrimoine (#5)"));

    env.cmd()
        .args(["themes", "edit", "5", "--name", "Placements", "--order", "0"])
        .assert()
        .success();

    env.cmd()
        .args(["themes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Placements"))
        .stdout(predicate::str::contains("Patrimoine").not());

    env.cmd()
        .args(["themes", "delete", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(2 categories removed)"));

    env.cmd()
        .args(["themes", "delete", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Not found: theme 3"));
}
