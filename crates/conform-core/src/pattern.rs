//! Package path patterns and identifier classification.
//!
//! Package patterns use `/` separators. Each segment is a domain-style name
//! (alphanumerics, `-`, `_`, `~`, with internal dots) or the wildcard `...`,
//! which stands for any number of segments.

use globset::{Glob, GlobMatcher};
use regex::Regex;
use thiserror::Error;

/// Token that expands to any sequence of path segments.
pub const WILDCARD: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("package pattern is empty")]
    Empty,
    #[error("invalid segment '{segment}' in package pattern '{pattern}'")]
    InvalidSegment { pattern: String, segment: String },
    #[error("invalid glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },
}

/// A compiled package pattern, anchored at the end of the package path.
#[derive(Debug, Clone)]
pub struct PackagePattern {
    source: String,
    regex: Regex,
}

impl PackagePattern {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&pattern_to_regex(pattern)?).map_err(|e| {
            PatternError::InvalidGlob {
                pattern: pattern.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, package_path: &str) -> bool {
        self.regex.is_match(package_path)
    }
}

impl std::fmt::Display for PackagePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Translate a package pattern into regex source text.
pub fn pattern_to_regex(pattern: &str) -> Result<String, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    let segments: Vec<&str> = pattern.split('/').collect();
    let mut out = String::from("(?:^|/)");
    let mut after_leading_wildcard = false;

    for (i, segment) in segments.iter().enumerate() {
        if *segment == WILDCARD {
            if segments.len() == 1 {
                out.push_str(".*");
            } else if i == 0 {
                out.push_str("(?:.*/)?");
                after_leading_wildcard = true;
            } else {
                out.push_str("(?:/.*)?");
            }
            continue;
        }

        if !is_valid_segment(segment) {
            return Err(PatternError::InvalidSegment {
                pattern: pattern.to_string(),
                segment: segment.to_string(),
            });
        }
        if i > 0 && !after_leading_wildcard {
            out.push('/');
        }
        after_leading_wildcard = false;
        out.push_str(&regex::escape(segment));
    }

    out.push('$');
    Ok(out)
}

fn is_valid_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.starts_with('.') || segment.ends_with('.') {
        return false;
    }
    if segment.contains("..") {
        return false;
    }
    segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '~'))
}

/// Compile a filesystem-style glob matched against package paths.
pub fn package_glob(pattern: &str) -> Result<GlobMatcher, PatternError> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| PatternError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// An identifier is exported when its first character is uppercase.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Snake-case names contain an underscore. Single characters and the blank
/// identifier are exempt.
pub fn is_snake_case(name: &str) -> bool {
    name != "_" && name.chars().count() > 1 && name.contains('_')
}

/// Standard-library heuristic: the first path segment has no dot.
pub fn is_standard_library(package_path: &str) -> bool {
    let first = package_path.split('/').next().unwrap_or(package_path);
    !first.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        PackagePattern::compile(pattern).unwrap().is_match(path)
    }

    #[test]
    fn test_compile_valid_patterns() {
        for p in [
            "mod",
            "path/...",
            "path/sub",
            "github.com/acme/app",
            "gopkg.in/yaml.v3",
            ".../internal",
            "a/.../b",
            "...",
        ] {
            assert!(PackagePattern::compile(p).is_ok(), "should compile {p}");
        }
    }

    #[test]
    fn test_compile_rejects_invalid_patterns() {
        for p in ["", "a/../b", "..", "a//b", "a/...x/b", "x.../b", "a/.hidden", "a/b.", "a b"] {
            assert!(PackagePattern::compile(p).is_err(), "should reject {p:?}");
        }
    }

    #[test]
    fn test_trailing_wildcard() {
        assert!(matches("mod/internal/...", "mod/internal"));
        assert!(matches("mod/internal/...", "mod/internal/db"));
        assert!(matches("mod/internal/...", "mod/internal/db/sql"));
        assert!(!matches("mod/internal/...", "mod/internalx"));
        assert!(!matches("mod/internal/...", "mod/helper"));
    }

    #[test]
    fn test_anchored_at_end_only() {
        assert!(matches("mod", "mod"));
        assert!(!matches("mod", "mod/helper"));
        assert!(matches("internal/db", "example.com/app/internal/db"));
        assert!(!matches("internal/db", "example.com/app/xinternal/db"));
    }

    #[test]
    fn test_leading_and_middle_wildcards() {
        assert!(matches(".../service", "example.com/app/service"));
        assert!(matches(".../service", "service"));
        assert!(matches("app/.../model", "app/model"));
        assert!(matches("app/.../model", "app/user/v1/model"));
        assert!(!matches("app/.../model", "app/user/models"));
        assert!(matches("...", "anything/at/all"));
    }

    #[test]
    fn test_dots_are_literal() {
        assert!(matches("gopkg.in/yaml.v3", "gopkg.in/yaml.v3"));
        assert!(!matches("gopkg.in/yaml.v3", "gopkgXin/yamlXv3"));
    }

    #[test]
    fn test_package_glob() {
        let g = package_glob("**/model").unwrap();
        assert!(g.is_match("example.com/app/model"));
        assert!(!g.is_match("example.com/app/models"));
        assert!(package_glob("a/[").is_err());
    }

    #[test]
    fn test_identifier_classification() {
        assert!(is_exported("Name"));
        assert!(is_exported("Über"));
        assert!(!is_exported("name"));
        assert!(!is_exported("_Name"));
        assert!(!is_exported(""));

        assert!(is_snake_case("max_size"));
        assert!(is_snake_case("Max_Size"));
        assert!(!is_snake_case("_"));
        assert!(!is_snake_case("x"));
        assert!(!is_snake_case("maxSize"));
    }

    #[test]
    fn test_standard_library_heuristic() {
        assert!(is_standard_library("fmt"));
        assert!(is_standard_library("net/http"));
        assert!(!is_standard_library("github.com/acme/app"));
        assert!(!is_standard_library("gopkg.in/yaml.v3"));
    }
}
