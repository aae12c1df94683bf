//! Markdown summary of JUnit XML reports (`TEST-*.xml`) found under a directory.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use metrics::histogram;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

static SUITE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<testsuite\b([^>]*)>").expect("static regex"));
static CASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<testcase\b([^>]*?)(/?)>").expect("static regex"));
static FAILURE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(failure|error)\b([^>]*)").expect("static regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCase {
    pub class: String,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteSummary {
    pub name: String,
    pub tests: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
    pub time: f64,
    pub failed: Vec<FailedCase>,
}

/// Where a CI run came from; rendered as a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubContext {
    pub repository: String,
    pub ref_name: Option<String>,
    pub sha: Option<String>,
    pub server_url: String,
    pub run_id: Option<String>,
}

impl GithubContext {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any variable source. `GITHUB_REPOSITORY` is required.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |k: &str| get(k).filter(|v| !v.is_empty());
        Some(Self {
            repository: non_empty("GITHUB_REPOSITORY")?,
            ref_name: non_empty("GITHUB_REF_NAME"),
            sha: non_empty("GITHUB_SHA"),
            server_url: non_empty("GITHUB_SERVER_URL").unwrap_or_else(|| "https://github.com".to_string()),
            run_id: non_empty("GITHUB_RUN_ID"),
        })
    }

    fn header(&self) -> String {
        let mut line = format!("**{}**", self.repository);
        if let Some(r) = &self.ref_name {
            let _ = write!(line, " on `{}`", r);
        }
        if let Some(sha) = &self.sha {
            let short: String = sha.chars().take(7).collect();
            let _ = write!(line, " at `{}`", short);
        }
        if let Some(id) = &self.run_id {
            let _ = write!(line, " ([run {}]({}/{}/actions/runs/{}))", id, self.server_url, self.repository, id);
        }
        line
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub only_errors: bool,
    pub github: Option<GithubContext>,
}

/// Collect every `TEST-*.xml` file under `dir`, sorted by path.
pub fn find_reports(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        if entry.file_type().is_file() && is_report_file(entry.path()) {
            out.push(entry.into_path());
        }
    }
    out.sort();
    Ok(out)
}

fn is_report_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("TEST-") && n.ends_with(".xml"))
        .unwrap_or(false)
}

fn attrs(raw: &str) -> Vec<(&str, String)> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|c| Some((c.get(1)?.as_str(), unescape(c.get(2)?.as_str()))))
        .collect()
}

fn attr<'a>(list: &'a [(&str, String)], name: &str) -> Option<&'a str> {
    list.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str())
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<").replace("&gt;", ">").replace("&quot;", "\"").replace("&apos;", "'").replace("&amp;", "&")
}

/// Parse one JUnit XML document. Each `<testsuite>` yields a summary; failing
/// cases are those holding a `<failure>` or `<error>` element.
pub fn parse_report(xml: &str) -> Vec<SuiteSummary> {
    let suite_starts: Vec<_> = SUITE_RE.captures_iter(xml).filter_map(|c| c.get(0).zip(c.get(1))).collect();
    let mut out = Vec::with_capacity(suite_starts.len());
    for (i, (whole, raw)) in suite_starts.iter().enumerate() {
        let body_end = suite_starts.get(i + 1).map(|(w, _)| w.start()).unwrap_or(xml.len());
        let body = &xml[whole.end()..body_end];
        let a = attrs(raw.as_str());
        let num = |k: &str| attr(&a, k).and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(0);
        out.push(SuiteSummary {
            name: attr(&a, "name").unwrap_or("unnamed").to_string(),
            tests: num("tests"),
            failures: num("failures"),
            errors: num("errors"),
            skipped: num("skipped"),
            time: attr(&a, "time").and_then(|v| v.trim().parse::<f64>().ok()).unwrap_or(0.0),
            failed: failed_cases(body),
        });
    }
    out
}

fn failed_cases(body: &str) -> Vec<FailedCase> {
    let cases: Vec<_> = CASE_RE.captures_iter(body).collect();
    let mut out = Vec::new();
    for (i, c) in cases.iter().enumerate() {
        let (Some(whole), Some(raw)) = (c.get(0), c.get(1)) else { continue };
        if c.get(2).map(|m| m.as_str() == "/").unwrap_or(false) {
            continue;
        }
        let end = cases.get(i + 1).and_then(|n| n.get(0)).map(|m| m.start()).unwrap_or(body.len());
        let case_body = &body[whole.end()..end];
        let Some(failure) = FAILURE_RE.captures(case_body) else { continue };
        let a = attrs(raw.as_str());
        let fa = attrs(failure.get(2).map(|m| m.as_str()).unwrap_or_default());
        let kind = failure.get(1).map(|m| m.as_str()).unwrap_or("failure");
        out.push(FailedCase {
            class: attr(&a, "classname").unwrap_or_default().to_string(),
            name: attr(&a, "name").unwrap_or_default().to_string(),
            message: attr(&fa, "message").map(|m| m.lines().next().unwrap_or_default().to_string()).unwrap_or_else(|| kind.to_string()),
        });
    }
    out
}

/// Scan `dir` and render the Markdown summary.
pub fn export_test_report_summary(dir: &Path, opts: &ReportOptions) -> Result<String> {
    let started = std::time::Instant::now();
    let mut suites = Vec::new();
    for path in find_reports(dir)? {
        match std::fs::read_to_string(&path) {
            Ok(xml) => {
                let parsed = parse_report(&xml);
                debug!(path = %path.display(), suites = parsed.len(), "parsed report");
                suites.extend(parsed);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable report"),
        }
    }
    histogram!("report_scan_ms", started.elapsed().as_secs_f64() * 1000.0);
    Ok(render(&suites, opts))
}

pub fn render(suites: &[SuiteSummary], opts: &ReportOptions) -> String {
    let mut md = String::from("## Test report summary\n\n");
    if let Some(gh) = &opts.github {
        let _ = writeln!(md, "{}\n", gh.header());
    }
    if suites.is_empty() {
        md.push_str("No test reports found.\n");
        return md;
    }

    let sum = |f: fn(&SuiteSummary) -> u64| suites.iter().map(f).sum::<u64>();
    let (tests, failures, errors, skipped) =
        (sum(|s| s.tests), sum(|s| s.failures), sum(|s| s.errors), sum(|s| s.skipped));
    let status = if failures + errors == 0 { "✅" } else { "❌" };
    let _ = writeln!(
        md,
        "{} {} tests, {} failures, {} errors, {} skipped\n",
        status, tests, failures, errors, skipped
    );

    if !opts.only_errors {
        md.push_str("| Suite | Tests | Failures | Errors | Skipped | Time (s) |\n");
        md.push_str("|---|---:|---:|---:|---:|---:|\n");
        for s in suites {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {:.2} |",
                s.name, s.tests, s.failures, s.errors, s.skipped, s.time
            );
        }
        md.push('\n');
    }

    let failed: Vec<&FailedCase> = suites.iter().flat_map(|s| s.failed.iter()).collect();
    if failed.is_empty() {
        if opts.only_errors {
            md.push_str("No failing tests.\n");
        }
        return md;
    }
    md.push_str("### Failing tests\n\n");
    for f in failed {
        let _ = writeln!(md, "- `{}.{}`: {}", f.class, f.name, f.message);
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="io.sift.FiltersTest" tests="3" skipped="1" failures="1" errors="0" time="0.412">
  <testcase name="decodes" classname="io.sift.FiltersTest" time="0.1"/>
  <testcase name="encodes" classname="io.sift.FiltersTest" time="0.2">
    <failure message="expected &lt;1&gt; but was &lt;2&gt;" type="AssertionError">stack</failure>
  </testcase>
  <testcase name="ignored" classname="io.sift.FiltersTest"><skipped/></testcase>
</testsuite>
"#;

    #[test]
    fn parses_suite_and_failures() {
        let suites = parse_report(SAMPLE);
        assert_eq!(suites.len(), 1);
        let s = &suites[0];
        assert_eq!(s.name, "io.sift.FiltersTest");
        assert_eq!((s.tests, s.failures, s.errors, s.skipped), (3, 1, 0, 1));
        assert_eq!(s.failed, vec![FailedCase {
            class: "io.sift.FiltersTest".into(),
            name: "encodes".into(),
            message: "expected <1> but was <2>".into(),
        }]);
    }

    #[test]
    fn only_errors_skips_table() {
        let suites = parse_report(SAMPLE);
        let full = render(&suites, &ReportOptions::default());
        assert!(full.contains("| io.sift.FiltersTest | 3 | 1 | 0 | 1 | 0.41 |"));
        let only = render(&suites, &ReportOptions { only_errors: true, github: None });
        assert!(!only.contains("| Suite |"));
        assert!(only.contains("- `io.sift.FiltersTest.encodes`: expected <1> but was <2>"));
    }

    #[test]
    fn finds_nested_reports_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("core/build/test-results");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("TEST-b.xml"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("TEST-a.xml"), SAMPLE).unwrap();
        std::fs::write(nested.join("results.xml"), SAMPLE).unwrap();
        std::fs::write(nested.join("TEST-c.txt"), "").unwrap();

        let found = find_reports(dir.path()).unwrap();
        let names: Vec<String> = found.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(found.len(), 2);
        assert!(names.contains(&"TEST-a.xml".to_string()));
        assert!(names.contains(&"TEST-b.xml".to_string()));
        assert!(find_reports(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn github_header() {
        let vars = [
            ("GITHUB_REPOSITORY", "acme/sift"),
            ("GITHUB_REF_NAME", "main"),
            ("GITHUB_SHA", "0123456789abcdef"),
            ("GITHUB_RUN_ID", "42"),
        ];
        let gh = GithubContext::from_lookup(|k| vars.iter().find(|(n, _)| *n == k).map(|(_, v)| v.to_string())).unwrap();
        assert_eq!(
            gh.header(),
            "**acme/sift** on `main` at `0123456` ([run 42](https://github.com/acme/sift/actions/runs/42))"
        );
        assert!(GithubContext::from_lookup(|_| None).is_none());
    }
}
