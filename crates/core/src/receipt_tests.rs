// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn receipt(job: &str, fp: &str, status: ReceiptStatus) -> Receipt {
    Receipt::new(
        JobId::new(job),
        Fingerprint::from(fp),
        status,
        "2026-03-01T02:00:00.000Z",
    )
}

#[test]
fn line_matches_wire_layout() {
    let mut r = receipt("lint.changed", "ab12", ReceiptStatus::Success);
    r.artifacts.push("dist/report.json".into());
    r.duration = 42;
    let value: serde_json::Value = serde_json::from_str(&r.to_line().unwrap()).unwrap();
    assert_eq!(value["receiptVersion"], 1);
    assert_eq!(value["jobId"], "lint.changed");
    assert_eq!(value["fingerprint"], "ab12");
    assert_eq!(value["status"], "success");
    assert_eq!(value["artifacts"][0], "dist/report.json");
    assert_eq!(value["duration"], 42);
    assert!(value.get("error").is_none());
}

#[test]
fn parse_note_skips_noise() {
    let a = receipt("a", "1", ReceiptStatus::Success).to_line().unwrap();
    let b = receipt("b", "2", ReceiptStatus::Error).to_line().unwrap();
    let body = format!("{}\n\nnot json\n{{broken\n{}\n", a, b);
    let parsed = Receipt::parse_note(&body);
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].job_id, "a");
    assert_eq!(parsed[1].status, ReceiptStatus::Error);
}

#[test]
fn status_display() {
    assert_eq!(ReceiptStatus::Success.to_string(), "success");
    assert_eq!(ReceiptStatus::Error.to_string(), "error");
}
