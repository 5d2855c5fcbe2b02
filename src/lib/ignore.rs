//! Ordered include/exclude rules deciding which paths are left out of an archive.
//!
//! Each non-blank line is one rule. `*` matches within a path segment, `**` matches any number of
//! segments and a leading `!` re-includes. A rule matches a path equal to the pattern, anything
//! beneath it, and (unless the pattern starts with `/`) the same at any depth of the tree. Rules
//! apply top to bottom and the last matching rule decides.
//!
//! ```rust
//! use fetch_zip::ignore::IgnoreRules;
//!
//! let rules = IgnoreRules::parse("node_modules/*\n!node_modules/common");
//! assert!(rules.is_ignored("node_modules/left-pad"));
//! assert!(!rules.is_ignored("node_modules/common"));
//! assert!(rules.is_ignored(".git/HEAD"));
//! ```

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Version-control metadata ignored unless a later rule re-includes it.
pub const DEFAULT_IGNORES: &[&str] = &[".git", ".hg", ".svn", ".bzr", "_darcs"];

#[derive(Debug, Clone)]
enum Matcher {
    Globs(GlobSet),
    /// Fallback for patterns which do not compile as globs.
    Literal(String),
}

impl Matcher {
    fn is_match(&self, path: &str) -> bool {
        match self {
            Matcher::Globs(set) => set.is_match(path),
            Matcher::Literal(pattern) => {
                path == pattern
                    || path
                        .strip_prefix(pattern.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    exclude: bool,
    matcher: Matcher,
}

/// An ordered set of ignore rules, always starting with [`DEFAULT_IGNORES`].
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::parse("")
    }
}

impl IgnoreRules {
    /// Parse newline-separated patterns. Never fails: a pattern which is not a valid glob is
    /// matched literally.
    pub fn parse(text: &str) -> Self {
        let rules = DEFAULT_IGNORES
            .iter()
            .copied()
            .chain(text.lines())
            .filter_map(Self::parse_line)
            .collect();
        Self { rules }
    }

    fn parse_line(line: &str) -> Option<Rule> {
        let line = line.trim();
        let (exclude, pattern) = match line.strip_prefix('!') {
            Some(pattern) => (false, pattern),
            None => (true, line),
        };
        let anchored = pattern.starts_with('/');
        let pattern = clean(pattern);
        if pattern.is_empty() {
            return None;
        }
        let matcher = match compile(&pattern, anchored) {
            Ok(set) => Matcher::Globs(set),
            Err(err) => {
                tracing::debug!(pattern = %pattern, "matching ignore pattern literally: {err}");
                Matcher::Literal(pattern)
            }
        };
        Some(Rule { exclude, matcher })
    }

    /// Whether `path` (relative, `/`-separated) should be left out.
    pub fn is_ignored(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        let path = path.trim_start_matches("./").trim_matches('/');
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matcher.is_match(path))
            .is_some_and(|rule| rule.exclude)
    }

    /// Number of rules, defaults included.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Strip surrounding slashes, `./` prefixes and empty or `.` segments.
fn clean(pattern: &str) -> String {
    pattern
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Only `*` and `**` are wildcards: every other glob metacharacter is escaped.
fn escape(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '?' | '[' | ']' | '{' | '}' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The pattern itself, its contents, and unless anchored the same at any depth.
fn expand(pattern: &str, anchored: bool) -> Vec<String> {
    let mut globs = vec![
        pattern.to_string(),
        format!("{pattern}/*"),
        format!("{pattern}/**/*"),
    ];
    if !anchored {
        globs.push(format!("**/{pattern}"));
        globs.push(format!("**/{pattern}/*"));
        globs.push(format!("**/{pattern}/**/*"));
    }
    globs
}

fn compile(pattern: &str, anchored: bool) -> Result<GlobSet, globset::Error> {
    let mut set = GlobSetBuilder::new();
    for glob in expand(&escape(pattern), anchored) {
        set.add(
            GlobBuilder::new(&glob)
                .literal_separator(true)
                .backslash_escape(true)
                .build()?,
        );
    }
    set.build()
}
