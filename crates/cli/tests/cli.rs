#![forbid(unsafe_code)]

fn run(args: &[&str]) -> (i32, String, String) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = sift_devtools::run(args.iter().copied(), &mut out, &mut err);
    (code, String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
}

#[test]
fn greets_world_by_default() {
    let (code, out, _) = run(&["cli"]);
    assert_eq!(code, 0);
    assert_eq!(out, "Hello, world!\n");
}

#[test]
fn greets_by_name() {
    let (code, out, _) = run(&["cli", "Roman"]);
    assert_eq!(code, 0);
    assert_eq!(out, "Hello, Roman!\n");
}

#[test]
fn help_and_version_exit_zero() {
    let (code, out, _) = run(&["cli", "--help"]);
    assert_eq!(code, 0);
    assert!(out.contains("generateTestReportSummary"));
    let (code, out, _) = run(&["cli", "-h"]);
    assert_eq!(code, 0);
    assert!(out.contains("Usage"));
    let (code, out, _) = run(&["cli", "-v"]);
    assert_eq!(code, 0);
    assert!(out.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_report_dir_is_a_usage_error() {
    let (code, out, err) = run(&["cli", "generateTestReportSummary"]);
    assert_eq!(code, 1);
    assert!(out.is_empty());
    assert!(err.contains("missing working directory argument"));
}

#[test]
fn summarizes_reports_in_a_tree() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("core").join("build").join("test-results");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(
        nested.join("TEST-io.sift.CodecTest.xml"),
        r#"<testsuite name="io.sift.CodecTest" tests="2" failures="1" errors="0" skipped="0" time="1.5">
  <testcase name="roundTrip" classname="io.sift.CodecTest"/>
  <testcase name="labels" classname="io.sift.CodecTest"><failure message="boom"/></testcase>
</testsuite>"#,
    )
    .unwrap();
    std::fs::write(nested.join("notes.xml"), "<testsuite name=\"ignored\" tests=\"9\"/>").unwrap();

    let path = dir.path().to_str().unwrap();
    let (code, out, _) = run(&["cli", "generateTestReportSummary", path]);
    assert_eq!(code, 0);
    assert!(out.contains("| io.sift.CodecTest | 2 | 1 | 0 | 0 | 1.50 |"));
    assert!(!out.contains("ignored"));

    let (code, out, _) = run(&["cli", "generateTestReportSummary", path, "--only-errors"]);
    assert_eq!(code, 0);
    assert!(!out.contains("| Suite |"));
    assert!(out.contains("- `io.sift.CodecTest.labels`: boom"));
}

#[test]
fn decode_prints_filters_as_json() {
    let (code, out, _) = run(&["cli", "decode", "executions", "filters[namespace][IN]=company&filters[q][EQUALS]=x"]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["view"], "executions");
    assert_eq!(json["searchQuery"], "x");
    assert_eq!(json["filters"][0]["key"], "namespace");
    assert_eq!(json["filters"][0]["value"], serde_json::json!(["company"]));

    let (code, out, _) = run(&["cli", "decode", "audit-logs", "details.env=prod", "--legacy"]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["filters"][0]["value"], serde_json::json!(["env:prod"]));
}

#[test]
fn keys_lists_comparators() {
    let (code, out, _) = run(&["cli", "keys", "flows"]);
    assert_eq!(code, 0);
    assert!(out.contains("namespace • Namespace • IN, NOT_IN, CONTAINS, PREFIX"));

    let (code, _, err) = run(&["cli", "keys", "nowhere"]);
    assert_eq!(code, 1);
    assert!(err.contains("unknown view"));
}
