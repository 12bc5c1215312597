//! Markdown changelog rendering.
//!
//! A release adds one section at the top of the changelog:
//!
//! ```markdown
//! # Changelog
//!
//! ## v1.3.0 - 2026-10-16
//!
//! - `1a2b3c4` feat: add X
//! - `5d6e7f8` fix: handle Y
//! ```

use std::str::FromStr;

use camino::Utf8PathBuf;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ChangelogConfig;
use crate::error::{ValidationError, ValidationResult};
use crate::git::CommitRecord;
use crate::version::Version;
use crate::version::classify::trim_header;

/// Default changelog file name.
pub const DEFAULT_PATH: &str = "CHANGELOG.md";

const TITLE: &str = "# Changelog";

/// Entry order within a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest commit first.
    Asc,
    /// Newest commit first.
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::Sort(s.to_string())),
        }
    }
}

/// Validated changelog options.
#[derive(Debug, Clone, Default)]
pub struct ChangelogOptions {
    /// Entry order.
    pub sort: SortOrder,
    /// Keep only commits whose header matches one of these.
    pub include: Vec<Regex>,
    /// Drop commits whose header matches any of these.
    pub exclude: Vec<Regex>,
    /// Render full messages.
    pub multiline: bool,
    /// Leave the changelog alone for prerelease versions.
    pub skip_prerelease: bool,
    /// Drop lines before the conventional header.
    pub trim_header: bool,
    /// Keep the rendered section in memory instead of writing the file.
    pub diff_only: bool,
    /// Skip the changelog stage entirely.
    pub skip: bool,
    /// Changelog file, relative to the project root.
    pub path: Utf8PathBuf,
}

impl ChangelogOptions {
    /// Validate the configured section.
    pub fn from_config(config: &ChangelogConfig) -> ValidationResult<Self> {
        let sort = config
            .sort
            .as_deref()
            .map(SortOrder::from_str)
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            sort,
            include: compile_patterns(&config.include)?,
            exclude: compile_patterns(&config.exclude)?,
            multiline: config.multiline,
            skip_prerelease: config.skip_prerelease,
            trim_header: config.trim_header,
            diff_only: false,
            skip: false,
            path: Utf8PathBuf::from(DEFAULT_PATH),
        })
    }
}

/// Compile include/exclude patterns.
pub fn compile_patterns(patterns: &[String]) -> ValidationResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| ValidationError::Pattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// One changelog line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<'a> {
    /// Abbreviated hash (may be empty).
    pub hash: &'a str,
    /// Header line, or the full message when multiline.
    pub text: &'a str,
}

/// Filter and order commits for a section.
///
/// `commits` are expected newest first, as git lists them.
pub fn select_entries<'a>(commits: &'a [CommitRecord], options: &ChangelogOptions) -> Vec<Entry<'a>> {
    let mut entries: Vec<Entry<'a>> = commits
        .iter()
        .filter_map(|commit| {
            let message = if options.trim_header {
                trim_header(&commit.message)
            } else {
                commit.message.as_str()
            };
            let message = message.trim();
            let header = message.lines().next().unwrap_or_default();

            if !options.include.is_empty() && !options.include.iter().any(|re| re.is_match(header)) {
                return None;
            }
            if options.exclude.iter().any(|re| re.is_match(header)) {
                return None;
            }
            if header.is_empty() {
                return None;
            }

            Some(Entry {
                hash: &commit.hash,
                text: if options.multiline { message } else { header },
            })
        })
        .collect();

    if options.sort == SortOrder::Asc {
        entries.reverse();
    }
    entries
}

/// Render a section for `version`.
pub fn render_section(version: &Version, date: &str, entries: &[Entry<'_>]) -> String {
    let mut out = format!("## {version} - {date}\n\n");
    for entry in entries {
        let mut lines = entry.text.lines();
        let first = lines.next().unwrap_or_default();
        if entry.hash.is_empty() {
            out.push_str(&format!("- {first}\n"));
        } else {
            out.push_str(&format!("- `{}` {first}\n", entry.hash));
        }
        for line in lines {
            if line.trim().is_empty() {
                out.push('\n');
            } else {
                out.push_str(&format!("  {line}\n"));
            }
        }
    }
    out
}

/// Insert `section` below the title of an existing changelog.
///
/// A changelog without a `# ` title gets one.
pub fn prepend(existing: &str, section: &str) -> String {
    let existing = existing.trim_start();
    let (title, rest) = match existing.split_once('\n') {
        Some((first, rest)) if first.starts_with("# ") => (first, rest.trim_start()),
        None if existing.starts_with("# ") => (existing, ""),
        _ => (TITLE, existing),
    };

    let mut out = format!("{title}\n\n{section}");
    if !rest.is_empty() {
        out.push('\n');
        out.push_str(rest);
        if !rest.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Today's date as `YYYY-MM-DD` (UTC).
pub fn iso_date_today() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let days = i64::try_from(secs / 86_400).unwrap_or_default();

    // Hinnant civil_from_days
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!("{y:04}-{m:02}-{d:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn commit(hash: &str, message: &str) -> CommitRecord {
        CommitRecord {
            hash: hash.into(),
            author: "dev".into(),
            message: message.into(),
        }
    }

    fn history() -> Vec<CommitRecord> {
        vec![
            commit("ccc", "feat: newest\n\nwith details"),
            commit("bbb", "chore: tidy"),
            commit("aaa", "fix: oldest"),
        ]
    }

    fn texts(entries: &[Entry<'_>]) -> Vec<String> {
        entries.iter().map(|e| e.text.to_string()).collect()
    }

    #[test]
    fn sort_from_str() {
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!(
            "sideways".parse::<SortOrder>(),
            Err(ValidationError::Sort("sideways".into()))
        );
    }

    #[test]
    fn from_config_rejects_bad_pattern() {
        let config = ChangelogConfig {
            exclude: vec!["(".into()],
            ..ChangelogConfig::default()
        };
        assert!(matches!(
            ChangelogOptions::from_config(&config),
            Err(ValidationError::Pattern { .. })
        ));
    }

    #[test]
    fn default_is_newest_first_headers_only() {
        let commits = history();
        let entries = select_entries(&commits, &ChangelogOptions::default());
        assert_eq!(texts(&entries), vec!["feat: newest", "chore: tidy", "fix: oldest"]);
    }

    #[test]
    fn ascending_sort() {
        let commits = history();
        let options = ChangelogOptions {
            sort: SortOrder::Asc,
            ..ChangelogOptions::default()
        };
        let entries = select_entries(&commits, &options);
        assert_eq!(texts(&entries), vec!["fix: oldest", "chore: tidy", "feat: newest"]);
    }

    #[test]
    fn include_and_exclude() {
        let commits = history();
        let options = ChangelogOptions {
            exclude: compile_patterns(&["^chore".into()]).unwrap(),
            ..ChangelogOptions::default()
        };
        assert_eq!(
            texts(&select_entries(&commits, &options)),
            vec!["feat: newest", "fix: oldest"]
        );

        let options = ChangelogOptions {
            include: compile_patterns(&["^fix".into()]).unwrap(),
            ..ChangelogOptions::default()
        };
        assert_eq!(texts(&select_entries(&commits, &options)), vec!["fix: oldest"]);
    }

    #[test]
    fn multiline_keeps_body() {
        let commits = history();
        let options = ChangelogOptions {
            multiline: true,
            ..ChangelogOptions::default()
        };
        let entries = select_entries(&commits, &options);
        assert_eq!(entries[0].text, "feat: newest\n\nwith details");
    }

    #[test]
    fn trim_header_drops_leading_lines() {
        let commits = vec![commit("ddd", "Squashed\nfeat: real header")];
        let options = ChangelogOptions {
            trim_header: true,
            ..ChangelogOptions::default()
        };
        assert_eq!(texts(&select_entries(&commits, &options)), vec!["feat: real header"]);
    }

    #[test]
    fn render_section_format() {
        let commits = history();
        let options = ChangelogOptions {
            multiline: true,
            exclude: compile_patterns(&["^chore".into()]).unwrap(),
            ..ChangelogOptions::default()
        };
        let entries = select_entries(&commits, &options);
        let version = Version::parse("v1.3.0").unwrap();
        let section = render_section(&version, "2026-10-16", &entries);
        assert_eq!(
            section,
            "## v1.3.0 - 2026-10-16\n\n- `ccc` feat: newest\n\n  with details\n- `aaa` fix: oldest\n"
        );
    }

    #[test]
    fn render_section_without_hashes() {
        let entries = [
            Entry {
                hash: "",
                text: "fix: a\n\nfirst line\n\nsecond line",
            },
            Entry {
                hash: "",
                text: "feat: b",
            },
        ];
        let version = Version::parse("2.0.0").unwrap();
        assert_eq!(
            render_section(&version, "2026-01-02", &entries),
            "## 2.0.0 - 2026-01-02\n\n- fix: a\n\n  first line\n\n  second line\n- feat: b\n"
        );
    }

    #[test]
    fn prepend_to_empty() {
        let out = prepend("", "## v1.0.0 - 2026-01-01\n\n- x\n");
        assert_eq!(out, "# Changelog\n\n## v1.0.0 - 2026-01-01\n\n- x\n");
    }

    #[test]
    fn prepend_keeps_title_and_history() {
        let existing = "# Changelog\n\n## v1.0.0 - 2026-01-01\n\n- old\n";
        let out = prepend(existing, "## v1.1.0 - 2026-02-01\n\n- new\n");
        assert_eq!(
            out,
            "# Changelog\n\n## v1.1.0 - 2026-02-01\n\n- new\n\n## v1.0.0 - 2026-01-01\n\n- old\n"
        );
    }

    #[test]
    fn prepend_adds_missing_title() {
        let out = prepend("## v1.0.0\n\n- old\n", "## v1.1.0\n\n- new\n");
        assert_eq!(out, "# Changelog\n\n## v1.1.0\n\n- new\n\n## v1.0.0\n\n- old\n");
    }

    #[test]
    fn iso_date_today_format() {
        let date = iso_date_today();
        assert_eq!(date.len(), 10);
        assert_eq!(date.as_bytes()[4], b'-');
        assert_eq!(date.as_bytes()[7], b'-');
        let year: u32 = date[..4].parse().unwrap();
        assert!((2020..2100).contains(&year));
    }
}
