//! Operating-system detection and the user's home directory.
use std::fmt;
use std::path::PathBuf;

use crate::error::PlatformError;

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// macOS.
    MacOs,
    /// Linux and other Unix-like systems.
    Linux,
    /// Windows (symlinks need Developer Mode or elevation).
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// The user's home directory.
    pub home: PathBuf,
}

impl Platform {
    /// Detect the current platform.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::HomeNotFound`] if neither `HOME` nor
    /// `USERPROFILE` is set to a non-empty value.
    pub fn detect() -> Result<Self, PlatformError> {
        Ok(Self {
            os: Self::detect_os(),
            home: home_from(
                std::env::var_os("HOME").map(PathBuf::from),
                std::env::var_os("USERPROFILE").map(PathBuf::from),
            )?,
        })
    }

    /// Create a platform with explicit values (for testing).
    #[must_use]
    pub fn new(os: Os, home: impl Into<PathBuf>) -> Self {
        Self {
            os,
            home: home.into(),
        }
    }

    /// Whether this is Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    const fn detect_os() -> Os {
        if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else {
            // Default to Linux for other Unix-like systems
            Os::Linux
        }
    }
}

/// Pick the home directory from `HOME`, falling back to `USERPROFILE`.
fn home_from(home: Option<PathBuf>, profile: Option<PathBuf>) -> Result<PathBuf, PlatformError> {
    home.filter(|p| !p.as_os_str().is_empty())
        .or_else(|| profile.filter(|p| !p.as_os_str().is_empty()))
        .ok_or_else(|| PlatformError::HomeNotFound("neither HOME nor USERPROFILE is set".into()))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn os_display() {
        assert_eq!(Os::MacOs.to_string(), "macos");
        assert_eq!(Os::Linux.to_string(), "linux");
    }

    #[test]
    fn platform_new() {
        let p = Platform::new(Os::Windows, "C:/Users/u");
        assert!(p.is_windows());
        assert_eq!(p.home, PathBuf::from("C:/Users/u"));
    }

    #[test]
    fn home_prefers_home_var() {
        let home = home_from(Some("/home/u".into()), Some("/profile".into())).unwrap();
        assert_eq!(home, PathBuf::from("/home/u"));
    }

    #[test]
    fn home_falls_back_to_profile() {
        let home = home_from(Some(PathBuf::new()), Some("/profile".into())).unwrap();
        assert_eq!(home, PathBuf::from("/profile"));
    }

    #[test]
    fn home_missing_is_error() {
        assert!(matches!(
            home_from(None, None).unwrap_err(),
            PlatformError::HomeNotFound(_)
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn detects_linux() {
        assert_eq!(Platform::detect_os(), Os::Linux);
    }
}
