/// Package references and version classification
///
/// A package reference is identified by its name, compared case-insensitively.
/// Its version is either exact (pinned) or floating (range, wildcard, latest).
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A package requested by a script or a package declaration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageReference {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl PackageReference {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Case-insensitive identity key
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn is_pinned(&self) -> bool {
        is_exact_version(&self.version)
    }

    /// Parse `name[,version]` package shorthand
    pub fn parse_shorthand(text: &str) -> Option<Self> {
        let (name, version) = match text.split_once(',') {
            Some((name, version)) => (name.trim(), version.trim()),
            None => (text.trim(), ""),
        };

        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }

        Some(Self::new(name, version))
    }
}

impl PartialEq for PackageReference {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for PackageReference {}

impl PartialOrd for PackageReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}@{}", self.name, self.version)
        }
    }
}

/// Whether a version string pins a single version
///
/// Accepts `MAJOR[.MINOR[.PATCH[.REV]]]` with optional `-prerelease` and `+build`
/// suffixes, optionally wrapped in single-value brackets (`[1.2.3]`).
pub fn is_exact_version(version: &str) -> bool {
    let version = version.trim();
    let version = match version
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
    {
        Some(inner) => inner.trim(),
        None => version,
    };

    let (version, build) = match version.split_once('+') {
        Some((version, build)) => (version, Some(build)),
        None => (version, None),
    };
    if let Some(build) = build {
        if !is_label(build) {
            return false;
        }
    }

    let (core, prerelease) = match version.split_once('-') {
        Some((core, prerelease)) => (core, Some(prerelease)),
        None => (version, None),
    };
    if let Some(prerelease) = prerelease {
        if !is_label(prerelease) {
            return false;
        }
    }

    let parts: Vec<&str> = core.split('.').collect();
    (1..=4).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

fn is_label(label: &str) -> bool {
    !label.is_empty()
        && label.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_versions() {
        assert!(is_exact_version("1"));
        assert!(is_exact_version("1.2.3"));
        assert!(is_exact_version("1.2.3.4"));
        assert!(is_exact_version("1.2.3-beta.1"));
        assert!(is_exact_version("1.2.3-rc-2+sha.abc123"));
        assert!(is_exact_version("[1.2.3]"));
        assert!(is_exact_version(" 13.0.3 "));
    }

    #[test]
    fn test_floating_versions() {
        assert!(!is_exact_version(""));
        assert!(!is_exact_version("*"));
        assert!(!is_exact_version("1.*"));
        assert!(!is_exact_version("1.2.*-*"));
        assert!(!is_exact_version("[1.0,2.0)"));
        assert!(!is_exact_version("(1.0,)"));
        assert!(!is_exact_version(">=1.0"));
        assert!(!is_exact_version("^1.2"));
        assert!(!is_exact_version("~1.2"));
        assert!(!is_exact_version("latest"));
        assert!(!is_exact_version("1.2.3.4.5"));
        assert!(!is_exact_version("1.2.3-"));
    }

    #[test]
    fn test_identity_is_case_insensitive() {
        let a = PackageReference::new("Newtonsoft.Json", "13.0.1");
        let b = PackageReference::new("newtonsoft.json", "12.0.0");
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert!(PackageReference::new("Alpha", "1") < PackageReference::new("beta", "1"));
    }

    #[test]
    fn test_parse_shorthand() {
        let pkg = PackageReference::parse_shorthand(" AutoMapper , 10.1.1 ").unwrap();
        assert_eq!(pkg.name, "AutoMapper");
        assert_eq!(pkg.version, "10.1.1");
        assert!(pkg.is_pinned());

        let pkg = PackageReference::parse_shorthand("Serilog").unwrap();
        assert_eq!(pkg.version, "");
        assert!(!pkg.is_pinned());

        assert!(PackageReference::parse_shorthand(" , 1.0").is_none());
        assert!(PackageReference::parse_shorthand("two words, 1.0").is_none());
    }
}
