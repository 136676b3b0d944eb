//! CI build descriptor: a fixed eight-field JSON record derived from the
//! release tag, repository and CI run.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::ARCHIVE_EXTENSION;
use crate::timestamp;

pub const USAGE: &str = "required args: <git hash> <tag name> <github repo (owner/name)> <build number> <github actions run ID>";

const GITHUB: &str = "https://github.com";

/// Field order here is the order in the emitted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildInfo {
    pub version: String,
    pub build: i64,
    pub git_commit: String,
    pub date: i64,
    pub details_url: String,
    pub download_url: String,
    pub source_url: String,
    pub build_log_url: String,
}

impl BuildInfo {
    /// Parse the five positional arguments (program name excluded).
    pub fn from_args(args: &[String], now: OffsetDateTime) -> Result<Self> {
        match args {
            [git_commit, tag, repo, build_number, run_id] => Ok(Self::new(
                git_commit,
                tag,
                repo,
                parse_build_number(build_number),
                run_id,
                timestamp::unix_seconds(now),
            )),
            _ => bail!(USAGE),
        }
    }

    pub fn new(
        git_commit: &str,
        tag: &str,
        repo: &str,
        build: i64,
        run_id: &str,
        date: i64,
    ) -> Self {
        Self {
            version: tag.to_string(),
            build,
            git_commit: git_commit.to_string(),
            date,
            details_url: format!("{GITHUB}/{repo}/releases/tag/{tag}"),
            download_url: format!(
                "{GITHUB}/{repo}/releases/download/{tag}/{}.{ARCHIVE_EXTENSION}",
                repo_name(repo)
            ),
            source_url: format!("{GITHUB}/{repo}/tree/{tag}"),
            build_log_url: format!("{GITHUB}/{repo}/actions/runs/{run_id}"),
        }
    }

    /// Pretty JSON with four-space indent and a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .context("serializing build info")?;
        let mut text = String::from_utf8(out).context("build info is not UTF-8")?;
        text.push('\n');
        Ok(text)
    }
}

/// Lenient integer cast of a CLI argument.
///
/// Leading whitespace is skipped and the longest numeric prefix is used:
/// optional sign, digits, optional fraction, optional exponent (`"1e3"` is
/// 1000, `"2.9"` is 2, `"12abc"` is 12). No numeric prefix gives 0. Plain
/// integers saturate on overflow; fractional or exponent forms truncate
/// toward zero and saturate.
pub fn parse_build_number(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let prefix = numeric_prefix(trimmed);
    if prefix.is_empty() {
        return 0;
    }
    if prefix.contains(['.', 'e', 'E']) {
        // `as` saturates and maps NaN to 0.
        return prefix.parse::<f64>().map_or(0, |value| value.trunc() as i64);
    }

    let (negative, digits) = match prefix.as_bytes()[0] {
        b'-' => (true, &prefix[1..]),
        b'+' => (false, &prefix[1..]),
        _ => (false, prefix),
    };
    let mut value: i64 = 0;
    for byte in digits.bytes() {
        let digit = i64::from(byte - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

/// Longest `[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?` prefix of `s`, or `""`.
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let count_digits = |from: usize| {
        bytes[from.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_digits = count_digits(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    &s[..end]
}

/// `name` of `owner/name`; the whole identifier when there is no slash.
fn repo_name(repo: &str) -> &str {
    let repo = repo.trim_end_matches('/');
    repo.rsplit_once('/').map_or(repo, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn at() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[test]
    fn test_from_args_derives_urls() {
        let info =
            BuildInfo::from_args(&args(&["abc123", "v1.2.0", "foo/bar", "42", "999"]), at())
                .unwrap();

        assert_eq!(info.version, "v1.2.0");
        assert_eq!(info.build, 42);
        assert_eq!(info.git_commit, "abc123");
        assert_eq!(info.date, 1_700_000_000);
        assert_eq!(
            info.details_url,
            "https://github.com/foo/bar/releases/tag/v1.2.0"
        );
        assert_eq!(
            info.download_url,
            "https://github.com/foo/bar/releases/download/v1.2.0/bar.tar.zst"
        );
        assert_eq!(info.source_url, "https://github.com/foo/bar/tree/v1.2.0");
        assert_eq!(
            info.build_log_url,
            "https://github.com/foo/bar/actions/runs/999"
        );
    }

    #[test]
    fn test_wrong_argument_count() {
        for count in [0usize, 1, 4, 6] {
            let values = vec!["x".to_string(); count];
            let err = BuildInfo::from_args(&values, at()).unwrap_err();
            assert_eq!(err.to_string(), USAGE);
        }
    }

    #[test]
    fn test_json_shape_and_order() {
        let info =
            BuildInfo::from_args(&args(&["abc123", "v1.2.0", "foo/bar", "42", "999"]), at())
                .unwrap();
        let json = info.to_json().unwrap();

        assert!(json.ends_with("}\n"));
        assert!(json.starts_with("{\n    \"version\": \"v1.2.0\",\n    \"build\": 42,"));
        assert!(json.contains("\"details_url\": \"https://github.com/foo/bar/releases/tag/v1.2.0\""));
        assert!(!json.contains("\\/"));

        let keys: Vec<usize> = [
            "\"version\"",
            "\"build\"",
            "\"git_commit\"",
            "\"date\"",
            "\"details_url\"",
            "\"download_url\"",
            "\"source_url\"",
            "\"build_log_url\"",
        ]
        .iter()
        .map(|key| json.find(key).unwrap())
        .collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));

        let parsed: BuildInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 8);
        assert!(value["build"].is_i64());
        assert!(value["date"].is_i64());
    }

    #[test]
    fn test_json_escapes_strings() {
        let info = BuildInfo::new("a\"b", "v1", "o/r", 1, "2", 0);
        let json = info.to_json().unwrap();
        assert!(json.contains(r#""git_commit": "a\"b""#));
    }

    #[test]
    fn test_parse_build_number() {
        assert_eq!(parse_build_number("42"), 42);
        assert_eq!(parse_build_number(" 7"), 7);
        assert_eq!(parse_build_number("+5"), 5);
        assert_eq!(parse_build_number("-3"), -3);
        assert_eq!(parse_build_number("12abc"), 12);
        assert_eq!(parse_build_number("abc"), 0);
        assert_eq!(parse_build_number(""), 0);
        assert_eq!(parse_build_number("-"), 0);
        assert_eq!(parse_build_number("99999999999999999999"), i64::MAX);
        assert_eq!(parse_build_number("-99999999999999999999"), i64::MIN);
    }

    #[test]
    fn test_parse_build_number_float_forms() {
        assert_eq!(parse_build_number("1e3"), 1000);
        assert_eq!(parse_build_number("1E3"), 1000);
        assert_eq!(parse_build_number("1.5e1"), 15);
        assert_eq!(parse_build_number("2.9"), 2);
        assert_eq!(parse_build_number("-2.9"), -2);
        assert_eq!(parse_build_number(".5e1"), 5);
        assert_eq!(parse_build_number("7."), 7);
        assert_eq!(parse_build_number("2e-1"), 0);
        assert_eq!(parse_build_number("5e"), 5);
        assert_eq!(parse_build_number("5e+"), 5);
        assert_eq!(parse_build_number("3e2xyz"), 300);
        assert_eq!(parse_build_number("1e400"), i64::MAX);
        assert_eq!(parse_build_number("."), 0);
        assert_eq!(parse_build_number("-.e1"), 0);
    }

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name("foo/bar"), "bar");
        assert_eq!(repo_name("foo/bar/"), "bar");
        assert_eq!(repo_name("bar"), "bar");
    }
}
