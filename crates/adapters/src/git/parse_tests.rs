// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn name_status_groups_by_code() {
    let out = "A\0src/a.js\0M\0README.md\0D\0old.txt\0R087\0lib/x.rs\0lib/y.rs\0C100\0a\0b\0T\0link\0";
    let files = parse_name_status_z(out);
    assert_eq!(files.added, vec!["src/a.js", "b"]);
    assert_eq!(files.modified, vec!["README.md", "link"]);
    assert_eq!(files.deleted, vec!["old.txt"]);
    assert_eq!(
        files.renamed,
        vec![("lib/x.rs".to_string(), "lib/y.rs".to_string())]
    );
}

#[test]
fn name_status_handles_spaces_and_truncation() {
    let files = parse_name_status_z("M\0dir with space/f.txt\0R100\0only-one");
    assert_eq!(files.modified, vec!["dir with space/f.txt"]);
    assert!(files.renamed.is_empty());
}

#[test]
fn name_status_empty() {
    assert!(parse_name_status_z("").is_empty());
}

#[test]
fn commit_info_fields() {
    let sha = "a".repeat(40);
    let out = format!(
        "{sha}\u{1f}Ada\u{1f}ada@example.com\u{1f}1772330400\u{1f}{p1} {p2}\u{1f}G\u{1f}Merge branch 'feature'\n\nbody line\n\n",
        sha = sha,
        p1 = "b".repeat(40),
        p2 = "c".repeat(40),
    );
    let info = parse_commit_info(&out).unwrap();
    assert_eq!(info.sha, sha);
    assert_eq!(info.author_name, "Ada");
    assert_eq!(info.author_email, "ada@example.com");
    assert_eq!(info.timestamp, 1_772_330_400);
    assert_eq!(info.parents.len(), 2);
    assert!(info.is_merge());
    assert!(info.is_signed());
    assert_eq!(info.subject(), "Merge branch 'feature'");
    assert_eq!(info.message, "Merge branch 'feature'\n\nbody line");
}

#[test]
fn commit_info_root_commit_unsigned() {
    let out = format!("{}\u{1f}A\u{1f}a@b\u{1f}0\u{1f}\u{1f}N\u{1f}init", "d".repeat(40));
    let info = parse_commit_info(&out).unwrap();
    assert!(info.parents.is_empty());
    assert!(!info.is_signed());
}

#[test]
fn commit_info_rejects_garbage() {
    assert!(parse_commit_info("nonsense").is_none());
}

#[test]
fn refs_peel_annotated_tags() {
    let out = "refs/heads/main\taaa\t\nrefs/tags/v1.0.0\tttt\tccc\nrefs/tags/light\tddd\t\nrefs/remotes/origin/main\teee\t\n";
    let refs = parse_refs(out);
    assert_eq!(refs.len(), 3);
    assert_eq!(refs[0].kind, RefKind::Branch);
    assert_eq!(refs[0].full_name(), "refs/heads/main");
    assert_eq!(refs[1].sha, "ccc");
    assert_eq!(refs[2].sha, "ddd");
    assert_eq!(refs[2].full_name(), "refs/tags/light");
}

#[test]
fn note_list_pairs() {
    let entries = parse_note_list("n1 t1\nn2 t2\n\n");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].target, "t2");
}

#[test]
fn worktree_porcelain() {
    let out = "worktree /repo\nHEAD abc\nbranch refs/heads/main\n\nworktree /repo-feature\nHEAD def\ndetached\n";
    assert_eq!(
        parse_worktrees(out),
        vec![PathBuf::from("/repo"), PathBuf::from("/repo-feature")]
    );
}

#[yare::parameterized(
    full    = { "0123456789abcdef0123456789abcdef01234567", true },
    short   = { "0123456", false },
    non_hex = { "z123456789abcdef0123456789abcdef01234567", false },
)]
fn full_sha(input: &str, expected: bool) {
    assert_eq!(is_full_sha(input), expected);
}
