//! Pack specs
//!
//! Verify install, idempotent re-apply, drift detection and rollback.

use crate::prelude::*;
use std::path::Path;

const BASE_PACK: &str = r#"
id = "base"
version = "1.0.0"

[[transforms]]
op = "write"
path = "config/base.txt"
content = "base"
"#;

fn docs_pack(version: &str) -> String {
    format!(
        r#"
id = "docs"
version = "{version}"

[dependencies]
base = "^1"

[options.title]
default = "Untitled"

[[transforms]]
op = "write"
path = "TITLE"
content = "${{title}}"

[[transforms]]
op = "append"
path = "README.md"
content = "See TITLE.\n"
"#
    )
}

fn publish(registry: &Path, id: &str, version: &str, manifest: &str) {
    let dir = registry.join(id).join(version);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("pack.toml"), manifest).unwrap();
}

fn registry() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    publish(dir.path(), "base", "1.0.0", BASE_PACK);
    publish(dir.path(), "docs", "1.0.0", &docs_pack("1.0.0"));
    dir
}

fn install(repo: &Repo, registry: &Path) -> RunAssert {
    repo.gitvan()
        .args(&["pack", "install", "docs", "^1.0"])
        .args(&["--registry", registry.to_str().unwrap()])
        .args(&["--option", "title=Handbook"])
        .passes()
}

#[test]
fn install_applies_dependencies_first() {
    let repo = Repo::new();
    let reg = registry();

    let out = install(&repo, reg.path()).stdout();
    let base = out.find("base@1.0.0").expect("base installed");
    let docs = out.find("docs@1.0.0").expect("docs installed");
    assert!(base < docs, "dependency must be applied first:\n{out}");

    assert_eq!(repo.read("TITLE").as_deref(), Some("Handbook"));
    assert_eq!(repo.read("config/base.txt").as_deref(), Some("base"));
    assert_eq!(repo.read("README.md").as_deref(), Some("# test\nSee TITLE.\n"));
}

#[test]
fn reinstall_with_same_options_is_skipped() {
    let repo = Repo::new();
    let reg = registry();
    install(&repo, reg.path());
    install(&repo, reg.path()).stdout_has("skipped");
    assert_eq!(repo.read("README.md").as_deref(), Some("# test\nSee TITLE.\n"));
}

#[test]
fn list_and_verify_installed_pack() {
    let repo = Repo::new();
    let reg = registry();
    install(&repo, reg.path());

    let packs = repo
        .gitvan()
        .args(&["pack", "list", "-o", "json"])
        .passes()
        .json();
    assert_eq!(packs["docs"]["version"], "1.0.0");
    assert_eq!(packs["base"]["version"], "1.0.0");

    repo.gitvan()
        .args(&["pack", "verify", "docs"])
        .passes()
        .stdout_has("docs is intact");

    repo.file("TITLE", "edited");
    repo.gitvan()
        .args(&["pack", "verify", "docs"])
        .exits(1)
        .stdout_has("modified")
        .stderr_has("pack docs has drifted");
}

#[test]
fn rollback_restores_previous_content() {
    let repo = Repo::new();
    let reg = registry();
    install(&repo, reg.path());

    repo.gitvan()
        .args(&["pack", "rollback", "docs", "--dry-run"])
        .passes()
        .stdout_has("Would delete TITLE")
        .stdout_has("Would restore README.md");
    assert!(repo.read("TITLE").is_some());

    repo.gitvan().args(&["pack", "rollback", "docs"]).passes();
    assert!(repo.read("TITLE").is_none());
    assert_eq!(repo.read("README.md").as_deref(), Some("# test\n"));
    assert_eq!(repo.read("config/base.txt").as_deref(), Some("base"));
}

#[test]
fn rollback_of_unknown_pack_exits_one() {
    let repo = Repo::new();
    repo.gitvan()
        .args(&["pack", "rollback", "ghost"])
        .exits(1)
        .stderr_has("pack ghost is not installed");
}

#[test]
fn unresolvable_dependency_fails_without_changes() {
    let repo = Repo::new();
    let reg = tempfile::tempdir().unwrap();
    publish(reg.path(), "docs", "1.0.0", &docs_pack("1.0.0"));

    repo.gitvan()
        .args(&["pack", "install", "docs"])
        .args(&["--registry", reg.path().to_str().unwrap()])
        .fails();
    assert!(repo.read("TITLE").is_none());
}

#[test]
fn updates_reports_newer_version() {
    let repo = Repo::new();
    let reg = registry();
    install(&repo, reg.path());
    publish(reg.path(), "docs", "1.1.0", &docs_pack("1.1.0"));

    repo.gitvan()
        .args(&["pack", "updates", "--registry", reg.path().to_str().unwrap()])
        .passes()
        .stdout_has("docs")
        .stdout_has("1.1.0")
        .stdout_lacks("base");
}

#[test]
fn apply_local_directory() {
    let repo = Repo::new();
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("pack.toml"), BASE_PACK).unwrap();

    repo.gitvan()
        .args(&["pack", "apply", src.path().to_str().unwrap()])
        .passes()
        .stdout_has("installed base@1.0.0");
    assert_eq!(repo.read("config/base.txt").as_deref(), Some("base"));
}
