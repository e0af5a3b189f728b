//! Home-alias expansion and repository-relative source resolution.
use std::path::{Component, Path, PathBuf};

/// The leading token in a target path that stands for the home directory.
pub const HOME_ALIAS: &str = "~";

/// Resolves declared paths against the home directory and the repository root.
///
/// Both roots are supplied by the caller; nothing here consults the process
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    home: PathBuf,
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the given home directory and repository root.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            root: root.into(),
        }
    }

    /// The home directory targets are expanded against.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The repository root sources are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expand a leading `~` (alone or followed by a separator) to the home
    /// directory.  Any other string is returned unchanged.
    ///
    /// ```
    /// use dotfiles_manager::resources::paths::PathResolver;
    /// use std::path::PathBuf;
    ///
    /// let paths = PathResolver::new("/home/u", "/repo");
    /// assert_eq!(paths.resolve_target("~/.zshrc"), PathBuf::from("/home/u/.zshrc"));
    /// assert_eq!(paths.resolve_target("/etc/hosts"), PathBuf::from("/etc/hosts"));
    /// ```
    #[must_use]
    pub fn resolve_target(&self, target: &str) -> PathBuf {
        if target == HOME_ALIAS {
            return self.home.clone();
        }
        target
            .strip_prefix("~/")
            .or_else(|| target.strip_prefix("~\\"))
            .map_or_else(|| PathBuf::from(target), |rest| self.home.join(rest))
    }

    /// Join `source` onto the repository root.
    #[must_use]
    pub fn resolve_source(&self, source: &str) -> PathBuf {
        self.root.join(source)
    }

    /// Whether `path` lies inside the repository root, compared component by
    /// component without touching the filesystem.
    #[must_use]
    pub fn is_inside_root(&self, path: &Path) -> bool {
        normalize(path).starts_with(normalize(&self.root))
    }

    /// Render `path` with the home directory replaced by `~` for display.
    #[must_use]
    pub fn contract(&self, path: &Path) -> String {
        path.strip_prefix(&self.home).map_or_else(
            |_| path.display().to_string(),
            |rest| {
                if rest.as_os_str().is_empty() {
                    HOME_ALIAS.to_string()
                } else {
                    format!("{HOME_ALIAS}/{}", rest.display())
                }
            },
        )
    }
}

/// Lexically resolve `.` and `..` components and strip the Windows `\\?\`
/// prefix that `read_link` can return for extended-length paths.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let path = s
        .strip_prefix(r"\\?\")
        .map_or_else(|| path.to_path_buf(), PathBuf::from);

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

/// Compare two paths after [`normalize`].
#[must_use]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}
