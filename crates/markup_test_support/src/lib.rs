//! Shared helpers for the golden tests: fixture discovery, expected-output
//! files and readable line diffs.
//!
//! A fixture is a directory holding `input.html`, an expected-output file
//! and, optionally, `case.toml` with parser settings. Expected-output files
//! carry `# key: value` headers followed by one line per event or element;
//! the last line is `EOF` or an `ERROR <code> at <position>` line.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const EVENTS_FORMAT_V1: &str = "markup-events-v1";
pub const ELEMENTS_FORMAT_V1: &str = "markup-elements-v1";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FixtureStatus {
    Active,
    Xfail,
    Skip,
}

#[derive(Clone, Debug)]
pub struct ExpectedLines {
    pub status: FixtureStatus,
    pub reason: Option<String>,
    pub lines: Vec<String>,
}

/// Per-fixture settings read from `case.toml`. A missing file means all
/// defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CaseSettings {
    pub namespace: Option<String>,
    pub strip_comments: bool,
    pub compress_whitespace: bool,
    pub require_xml_declaration: bool,
}

#[derive(Clone, Debug)]
pub struct Fixture {
    pub name: String,
    pub dir: PathBuf,
    pub input: String,
    pub settings: CaseSettings,
    pub expected: ExpectedLines,
}

/// Loads every fixture directory under `root`, sorted by name.
pub fn load_fixtures(root: &Path, expected_file: &str, format: &str) -> Vec<Fixture> {
    let mut entries: Vec<_> = fs::read_dir(root)
        .unwrap_or_else(|err| panic!("failed to read fixture root {root:?}: {err}"))
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut fixtures = Vec::new();
    for entry in entries {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name != name.trim() {
            panic!("fixture directory has leading/trailing whitespace: '{name}'");
        }
        if name.starts_with('.') {
            continue;
        }
        let input_path = dir.join("input.html");
        let input = fs::read_to_string(&input_path)
            .unwrap_or_else(|err| panic!("failed to read input {input_path:?}: {err}"));
        let settings = load_case_settings(&dir.join("case.toml"));
        let expected = parse_expected_file(&dir.join(expected_file), format);
        fixtures.push(Fixture {
            name,
            dir,
            input,
            settings,
            expected,
        });
    }
    fixtures
}

pub fn load_case_settings(path: &Path) -> CaseSettings {
    if !path.exists() {
        return CaseSettings::default();
    }
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read case settings {path:?}: {err}"));
    toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse case settings {path:?}: {err}"))
}

pub fn parse_expected_file(path: &Path, format: &str) -> ExpectedLines {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read expected file {path:?}: {err}"));
    let mut lines = Vec::new();
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for raw_line in content.lines() {
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(stripped) = line.strip_prefix('#') {
            let header = stripped.trim();
            if header.is_empty() {
                continue;
            }
            let (key, value) = header
                .split_once(':')
                .unwrap_or_else(|| panic!("invalid header in {path:?}: '{line}'"));
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if headers.insert(key.clone(), value).is_some() {
                panic!("duplicate header '{key}' in {path:?}");
            }
        } else {
            lines.push(line.to_string());
        }
    }

    let found = headers
        .get("format")
        .unwrap_or_else(|| panic!("missing format header in {path:?}"));
    assert_eq!(found, format, "unsupported format in {path:?}");

    let status = match headers.get("status").map(String::as_str) {
        Some("active") | None => FixtureStatus::Active,
        Some("xfail") => FixtureStatus::Xfail,
        Some("skip") => FixtureStatus::Skip,
        Some(other) => panic!("unsupported status '{other}' in {path:?}"),
    };
    let reason = headers.get("reason").cloned();
    if matches!(status, FixtureStatus::Xfail | FixtureStatus::Skip)
        && reason.as_deref().unwrap_or("").is_empty()
    {
        panic!("non-active fixture missing reason in {path:?}");
    }
    match lines.last().map(String::as_str) {
        None => panic!("expected file {path:?} has no lines"),
        Some(last) if last == "EOF" || last.starts_with("ERROR ") => {}
        Some(_) => panic!("expected file {path:?} must end with EOF or an ERROR line"),
    }

    ExpectedLines {
        status,
        reason,
        lines,
    }
}

/// Compares `actual` against a fixture, honouring its status.
pub fn enforce_expected(fixture: &Fixture, actual: &[String], label: &str) {
    let mismatch = actual != fixture.expected.lines;
    match fixture.expected.status {
        FixtureStatus::Active => {
            if mismatch {
                panic!(
                    "{label} mismatch in fixture '{}'\npath: {}\n{}",
                    fixture.name,
                    fixture.dir.display(),
                    diff_lines(&fixture.expected.lines, actual)
                );
            }
        }
        FixtureStatus::Xfail => {
            if !mismatch {
                panic!(
                    "fixture '{}' [{label}] matched but is marked xfail; reason: {}\npath: {}",
                    fixture.name,
                    fixture
                        .expected
                        .reason
                        .as_deref()
                        .unwrap_or("<missing reason>"),
                    fixture.dir.display()
                );
            }
        }
        FixtureStatus::Skip => {}
    }
}

/// Substring filter over fixture names, read from an environment variable.
pub struct FixtureFilter {
    raw: Option<String>,
}

impl FixtureFilter {
    pub fn from_env(key: &str) -> Self {
        Self {
            raw: env::var(key).ok().filter(|value| !value.is_empty()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        let Some(filter) = &self.raw else {
            return true;
        };
        name.contains(filter)
    }
}

pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;

    let max = expected.len().max(actual.len());
    let missing = "<missing>";
    let line_at = |lines: &[String], idx: usize| -> String {
        lines
            .get(idx)
            .map(String::as_str)
            .unwrap_or(missing)
            .to_string()
    };
    let mismatch = (0..max).find(|&i| line_at(expected, i) != line_at(actual, i));

    let mut out = String::new();
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            &mut out,
            "first mismatch at line {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for idx in start..end {
            let marker = if idx == i { ">" } else { " " };
            let _ = writeln!(
                &mut out,
                "{marker} {:>4}  expected: {}",
                idx + 1,
                line_at(expected, idx)
            );
            let _ = writeln!(
                &mut out,
                "{marker} {:>4}    actual: {}",
                idx + 1,
                line_at(actual, idx)
            );
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}
