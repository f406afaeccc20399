//! Ignore and include filters
//!
//! Decide per relative asset path whether it takes part in a sync.
//!
//! Pattern syntax (both filters):
//! - blank lines and lines starting with `#` are skipped
//! - `*` matches across directory separators (`*.jpg` matches `assets/a.jpg`)
//! - a trailing `/` matches everything below a directory
//! - a leading `/` anchors the pattern to the theme root
//! - a pattern without `/` also matches at any depth
//!
//! The ignore filter additionally supports `!` negation; the last matching
//! pattern wins, as in `.gitignore`.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::debug;

/// Name of the ignore file read from the theme root
pub const IGNORE_FILE: &str = ".shopifyignore";

/// Always ignored, regardless of the ignore file
const DEFAULT_IGNORES: &[&str] = &[
    ".git/",
    ".DS_Store",
    "*.swp",
    "config.yml",
    "node_modules/",
    ".gitkeep",
    IGNORE_FILE,
];

/// Errors building a filter
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to read ignore file '{path}': {source}")]
    ReadIgnoreFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A compiled pattern
#[derive(Debug, Clone)]
struct Rule {
    source: String,
    negated: bool,
    matcher: GlobSet,
}

impl Rule {
    fn parse(line: &str) -> Result<Option<Self>, FilterError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (negated, pattern) = match line.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, line),
        };
        if pattern.is_empty() {
            return Ok(None);
        }

        let anchored = pattern.starts_with('/');
        let mut body = pattern.trim_start_matches('/').to_string();
        if body.ends_with('/') {
            body.push('*');
        }

        let mut globs = vec![body.clone()];
        if !anchored && !pattern.trim_end_matches('/').contains('/') {
            globs.push(format!("*/{}", body));
        }

        let mut builder = GlobSetBuilder::new();
        for glob in globs {
            builder.add(compile(&glob, line)?);
        }
        let matcher = builder
            .build()
            .map_err(|source| FilterError::InvalidPattern {
                pattern: line.to_string(),
                source,
            })?;

        Ok(Some(Self {
            source: line.to_string(),
            negated,
            matcher,
        }))
    }

    fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

fn compile(glob: &str, original: &str) -> Result<Glob, FilterError> {
    GlobBuilder::new(glob)
        .literal_separator(false)
        .build()
        .map_err(|source| FilterError::InvalidPattern {
            pattern: original.to_string(),
            source,
        })
}

fn parse_rules<I, S>(patterns: I) -> Result<Vec<Rule>, FilterError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut rules = Vec::new();
    for pattern in patterns {
        if let Some(rule) = Rule::parse(pattern.as_ref())? {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// Normalize a path to the `/`-separated form patterns are matched against
fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}

/// Deny-list of paths that never take part in a sync
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    root: PathBuf,
    rules: Vec<Rule>,
}

impl IgnoreFilter {
    /// Filter with only the default ignores
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            // Defaults are static and known to compile
            rules: parse_rules(DEFAULT_IGNORES).unwrap_or_default(),
        }
    }

    /// Default ignores plus the root's ignore file, when present
    pub fn from_path(root: impl AsRef<Path>) -> Result<Self, FilterError> {
        let root = root.as_ref();
        let mut filter = Self::new(root);

        let path = root.join(IGNORE_FILE);
        if path.is_file() {
            let content = fs::read_to_string(&path).map_err(|source| {
                FilterError::ReadIgnoreFile {
                    path: path.clone(),
                    source,
                }
            })?;
            filter.add_patterns(content.lines())?;
            debug!("Loaded ignore patterns from {:?}", path);
        }

        Ok(filter)
    }

    /// Append patterns; later patterns override earlier ones
    pub fn add_patterns<I, S>(&mut self, patterns: I) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rules.extend(parse_rules(patterns)?);
        Ok(())
    }

    /// Whether a relative path is ignored
    pub fn ignore(&self, path: &str) -> bool {
        let path = normalize(path);
        let mut ignored = false;
        for rule in &self.rules {
            if rule.matches(&path) {
                ignored = !rule.negated;
            }
        }
        ignored
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Patterns in effect, in evaluation order
    pub fn patterns(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.source.as_str()).collect()
    }
}

/// Allow-list of paths; empty means every path is included
#[derive(Debug, Clone)]
pub struct IncludeFilter {
    root: PathBuf,
    rules: Vec<Rule>,
}

impl IncludeFilter {
    pub fn new<I, S>(root: impl Into<PathBuf>, patterns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            root: root.into(),
            rules: parse_rules(patterns)?,
        })
    }

    /// Filter that includes everything
    pub fn all(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rules: Vec::new(),
        }
    }

    /// Whether a relative path is included
    pub fn matches(&self, path: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        let path = normalize(path);
        self.rules.iter().any(|rule| rule.matches(&path))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_ignores() {
        let filter = IgnoreFilter::new(".");
        assert!(filter.ignore(".git/HEAD"));
        assert!(filter.ignore("assets/.DS_Store"));
        assert!(filter.ignore("sections/header.liquid.swp"));
        assert!(filter.ignore("config.yml"));
        assert!(filter.ignore("node_modules/lib/index.js"));
        assert!(!filter.ignore("sections/header.liquid"));
        assert!(!filter.ignore("config/settings_schema.json"));
    }

    #[test]
    fn test_add_patterns() {
        let mut filter = IgnoreFilter::new(".");
        filter.add_patterns(["config/*"]).unwrap();

        assert!(filter.ignore("config/settings_data.json"));
        assert!(!filter.ignore("templates/index.json"));
    }

    #[test]
    fn test_unanchored_name_matches_at_any_depth() {
        let mut filter = IgnoreFilter::new(".");
        filter.add_patterns(["*.jpg", "drafts/", "footer.liquid"]).unwrap();

        assert!(filter.ignore("assets/photo.jpg"));
        assert!(filter.ignore("sections/drafts/wip.liquid"));
        assert!(filter.ignore("sections/footer.liquid"));
        assert!(!filter.ignore("sections/header.liquid"));
    }

    #[test]
    fn test_anchored_pattern() {
        let mut filter = IgnoreFilter::new(".");
        filter.add_patterns(["/assets/"]).unwrap();

        assert!(filter.ignore("assets/app.js"));
        assert!(!filter.ignore("templates/assets.liquid"));
    }

    #[test]
    fn test_negation_last_match_wins() {
        let mut filter = IgnoreFilter::new(".");
        filter
            .add_patterns(["config/*", "!config/settings_schema.json"])
            .unwrap();

        assert!(filter.ignore("config/settings_data.json"));
        assert!(!filter.ignore("config/settings_schema.json"));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let mut filter = IgnoreFilter::new(".");
        let before = filter.patterns().len();
        filter.add_patterns(["# comment", "", "   "]).unwrap();
        assert_eq!(filter.patterns().len(), before);
    }

    #[test]
    fn test_from_path_reads_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(IGNORE_FILE),
            "# local overrides\nlocales/*\n!locales/en.default.json\n",
        )
        .unwrap();

        let filter = IgnoreFilter::from_path(temp_dir.path()).unwrap();
        assert!(filter.ignore("locales/fr.json"));
        assert!(!filter.ignore("locales/en.default.json"));
        assert_eq!(filter.root(), temp_dir.path());
    }

    #[test]
    fn test_from_path_without_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        let filter = IgnoreFilter::from_path(temp_dir.path()).unwrap();
        assert!(!filter.ignore("layout/theme.liquid"));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut filter = IgnoreFilter::new(".");
        let err = filter.add_patterns(["assets/[a-"]).unwrap_err();
        assert!(err.to_string().contains("assets/[a-"));
    }

    #[test]
    fn test_include_filter_empty_allows_all() {
        let filter = IncludeFilter::new(".", Vec::<String>::new()).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches("anything/at/all.liquid"));
    }

    #[test]
    fn test_include_filter_patterns() {
        let filter = IncludeFilter::new(".", ["config/*", "sections/*.liquid"]).unwrap();
        assert!(filter.matches("config/settings_data.json"));
        assert!(filter.matches("sections/header.liquid"));
        assert!(!filter.matches("templates/index.json"));
        assert!(!filter.matches("sections/header.json"));
    }

    #[test]
    fn test_normalize_paths() {
        let filter = IncludeFilter::new(".", ["config/*"]).unwrap();
        assert!(filter.matches("./config/settings_data.json"));
        assert!(filter.matches("config\\settings_data.json"));
    }
}
