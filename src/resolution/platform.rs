/// Runtime platform identifiers (`<os>-<arch>`) and qualifier matching
use std::fmt;

/// Platform the resolved assets will run on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuntimePlatform {
    pub os: String,
    pub arch: String,
}

impl RuntimePlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The executing host
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "osx",
            "windows" => "win",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Parse `<os>-<arch>`
    pub fn parse(identifier: &str) -> Option<Self> {
        let (os, arch) = identifier.trim().rsplit_once('-')?;
        if os.is_empty() || arch.is_empty() {
            return None;
        }
        Some(Self::new(os.to_lowercase(), arch.to_lowercase()))
    }

    pub fn identifier(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Whether an asset qualifier applies to this platform
    ///
    /// Matches the full identifier, the bare os, `any`, or `unix` on non-Windows hosts.
    pub fn matches(&self, qualifier: &str) -> bool {
        let qualifier = qualifier.trim().to_lowercase();
        qualifier == self.identifier()
            || qualifier == self.os
            || qualifier == "any"
            || (qualifier == "unix" && self.os != "win")
    }
}

impl fmt::Display for RuntimePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches() {
        let linux = RuntimePlatform::new("linux", "x64");
        assert!(linux.matches("linux-x64"));
        assert!(linux.matches("LINUX-X64"));
        assert!(linux.matches("linux"));
        assert!(linux.matches("unix"));
        assert!(linux.matches("any"));
        assert!(!linux.matches("linux-arm64"));
        assert!(!linux.matches("win-x64"));
        assert!(!linux.matches("osx"));

        let windows = RuntimePlatform::new("win", "x64");
        assert!(!windows.matches("unix"));
        assert!(windows.matches("win"));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            RuntimePlatform::parse("osx-arm64"),
            Some(RuntimePlatform::new("osx", "arm64"))
        );
        assert_eq!(
            RuntimePlatform::parse("linux-musl-x64"),
            Some(RuntimePlatform::new("linux-musl", "x64"))
        );
        assert_eq!(RuntimePlatform::parse("linux"), None);
    }

    #[test]
    fn test_current_is_self_matching() {
        let current = RuntimePlatform::current();
        assert!(current.matches(&current.identifier()));
    }
}
