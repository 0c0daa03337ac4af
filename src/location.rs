//! Source locations extracted from debugger output

use std::fmt;
use std::path::{Component, Path, PathBuf};

use regex::Captures;
use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// A position in a source file; lines are 1-based
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// How captured file names are turned into paths
///
/// Breakpoint bookkeeping keys on path identity, so a backend that prints
/// relative names has to be resolved against a known base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPolicy {
    /// Use the captured name as printed
    Verbatim,
    /// Resolve relative names against `base` and clean up `.`/`..`
    Absolute { base: PathBuf },
}

/// Turns captured `(file, line)` text into a [`Location`]
#[derive(Debug, Clone)]
pub struct LocationResolver {
    policy: PathPolicy,
}

impl LocationResolver {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }

    /// Build a location from capture groups 1 (file) and 2 (line)
    pub fn from_captures(&self, captures: &Captures<'_>) -> Result<Location> {
        let file = captures.get(1).map_or("", |m| m.as_str());
        let line = captures.get(2).map_or("", |m| m.as_str());
        self.resolve(file, line)
    }

    /// Decode file and line text
    ///
    /// Line numbers must be positive integers; anything else is an error
    /// rather than being coerced.
    pub fn resolve(&self, file: &str, line: &str) -> Result<Location> {
        let file = file.trim();
        if file.is_empty() {
            return Err(Error::LocationParse("empty file name".to_string()));
        }

        let line = match line.trim().parse::<u32>() {
            Ok(0) => {
                return Err(Error::LocationParse(format!("line 0 in '{}'", file)));
            }
            Ok(n) => n,
            Err(e) => {
                return Err(Error::LocationParse(format!(
                    "invalid line '{}' in '{}': {}",
                    line, file, e
                )));
            }
        };

        Ok(Location {
            file: self.normalize(file),
            line,
        })
    }

    fn normalize(&self, file: &str) -> PathBuf {
        match &self.policy {
            PathPolicy::Verbatim => PathBuf::from(file),
            PathPolicy::Absolute { base } => {
                let path = Path::new(file);
                if path.is_absolute() {
                    clean(path)
                } else {
                    clean(&base.join(path))
                }
            }
        }
    }
}

/// Lexically remove `.` and `..` components without touching the filesystem
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absolute() -> LocationResolver {
        LocationResolver::new(PathPolicy::Absolute {
            base: PathBuf::from("/home/user/project"),
        })
    }

    #[test]
    fn test_verbatim_keeps_relative_name() {
        let resolver = LocationResolver::new(PathPolicy::Verbatim);
        let loc = resolver.resolve("src/main.c", "17").unwrap();
        assert_eq!(loc.file, PathBuf::from("src/main.c"));
        assert_eq!(loc.line, 17);
        assert_eq!(loc.to_string(), "src/main.c:17");
    }

    #[test]
    fn test_absolute_resolves_against_base() {
        let loc = absolute().resolve("./src/../lib/util.c", "3").unwrap();
        assert_eq!(loc.file, PathBuf::from("/home/user/project/lib/util.c"));
    }

    #[test]
    fn test_absolute_leaves_absolute_paths() {
        let loc = absolute().resolve("/tmp/x.sh", "1").unwrap();
        assert_eq!(loc.file, PathBuf::from("/tmp/x.sh"));
    }

    #[test]
    fn test_rejects_bad_line_numbers() {
        let resolver = absolute();
        for line in ["0", "-4", "abc", "", "99999999999"] {
            let err = resolver.resolve("a.c", line).unwrap_err();
            assert!(matches!(err, Error::LocationParse(_)), "line {:?}", line);
        }
    }

    #[test]
    fn test_rejects_empty_file() {
        assert!(absolute().resolve("  ", "3").is_err());
    }

    #[test]
    fn test_from_captures() {
        let re = regex::Regex::new(r"at ([^:]+):(\d+)").unwrap();
        let caps = re.captures("stopped at main.c:42").unwrap();
        let loc = LocationResolver::new(PathPolicy::Verbatim)
            .from_captures(&caps)
            .unwrap();
        assert_eq!(loc.file, PathBuf::from("main.c"));
        assert_eq!(loc.line, 42);
    }
}
