//! Shell startup files that must stay plain files.
//!
//! Shells and installers append to `.zshrc` and friends on their own, so
//! these targets are never symlinked.  Instead a marker comment and a
//! `source "<repo file>"` line are merged into the existing file.
use std::path::{Path, PathBuf};

use super::classify::resolve_link_destination;
use super::error::ResourceError;
use super::helpers::fs::{read_bytes, write_atomic};
use super::reconcile::Reconciler;
use super::report::{LinkKind, LinkResult, LinkStatus};
use super::{Inspection, Linkable, ResourceChange};
use crate::operations::EntryKind;

/// Target file names handled by this installer unless configured otherwise.
pub const DEFAULT_SOURCEABLE_FILES: &[&str] = &[".zshrc", ".bashrc", ".profile"];

/// Comment line written above the directive.
pub const MARKER: &str = "# Dotfiles configuration";

/// The directive line for `source`.
#[must_use]
pub fn directive(source: &Path) -> String {
    format!("source \"{}\"", source.display())
}

/// Lines of `content` with surrounding ASCII whitespace trimmed.
///
/// Works on bytes: startup files are not required to be UTF-8 and must be
/// written back unchanged.
fn trimmed_lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content.split(|&b| b == b'\n').map(<[u8]>::trim_ascii)
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Whether `content` already sources `source`, quoted or not.
#[must_use]
pub fn contains_directive(content: &[u8], source: &Path) -> bool {
    let quoted = directive(source);
    let bare = format!("source {}", source.display());
    contains_bytes(content, quoted.as_bytes())
        || trimmed_lines(content).any(|l| l == bare.as_bytes())
}

/// Empty, whitespace-only or comment-only content carries nothing the user
/// would miss, so it is merged without `--force`.
#[must_use]
pub fn is_placeholder(content: &[u8]) -> bool {
    trimmed_lines(content).all(|l| l.is_empty() || l.starts_with(b"#"))
}

/// Build the new file body: preserved bytes, a blank line, the marker and
/// the directive.
#[must_use]
pub fn render(preserved: &[u8], source: &Path) -> Vec<u8> {
    let preserved = preserved.trim_ascii_end();
    let directive = directive(source);
    let mut out = Vec::with_capacity(preserved.len() + MARKER.len() + directive.len() + 4);
    if !preserved.is_empty() {
        out.extend_from_slice(preserved);
        out.extend_from_slice(b"\n\n");
    }
    out.extend_from_slice(MARKER.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(directive.as_bytes());
    out.push(b'\n');
    out
}

/// Remove the marker and directive lines written by [`render`]; `None` if
/// the directive is not present. Every other line is kept byte for byte.
#[must_use]
pub fn strip(content: &[u8], source: &Path) -> Option<Vec<u8>> {
    if !contains_directive(content, source) {
        return None;
    }
    let quoted = directive(source);
    let bare = format!("source {}", source.display());
    let kept: Vec<&[u8]> = content
        .split(|&b| b == b'\n')
        .filter(|l| {
            let l = l.trim_ascii();
            l != MARKER.as_bytes() && l != quoted.as_bytes() && l != bare.as_bytes()
        })
        .collect();
    let body = kept.join(&b'\n');
    let body = body.trim_ascii_end();
    Some(if body.is_empty() {
        Vec::new()
    } else {
        let mut out = body.to_vec();
        out.push(b'\n');
        out
    })
}

/// What currently occupies a sourceable target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceableState {
    /// The declared source does not exist.
    SourceMissing,
    /// The file already sources the declared source.
    AlreadySourced,
    /// A symlink into the repository (left over from a symlink-style install).
    ManagedSymlink {
        /// The link's destination.
        current: PathBuf,
    },
    /// A symlink pointing outside the repository.
    ForeignSymlink {
        /// The link's destination.
        current: PathBuf,
    },
    /// A file with content the user may care about.
    Unrelated {
        /// Current content.
        content: Vec<u8>,
    },
    /// A file that is empty or only has comments.
    Placeholder {
        /// Current content.
        content: Vec<u8>,
    },
    /// A directory or special file.
    Unmanageable {
        /// What was found.
        kind: EntryKind,
    },
    /// Nothing exists at the target.
    Absent,
}

impl SourceableState {
    fn label(&self) -> String {
        match self {
            Self::SourceMissing => "source missing".to_string(),
            Self::AlreadySourced => "sourced".to_string(),
            Self::ManagedSymlink { current } => {
                format!("symlink to repository file {}", current.display())
            }
            Self::ForeignSymlink { current } => format!("foreign symlink -> {}", current.display()),
            Self::Unrelated { .. } => "has unrelated content".to_string(),
            Self::Placeholder { .. } => "placeholder".to_string(),
            Self::Unmanageable { kind } => format!("unmanageable ({kind:?})"),
            Self::Absent => "not linked".to_string(),
        }
    }
}

/// A shell startup file that should source a repository file.
#[derive(Debug, Clone)]
pub struct SourceableResource<'a> {
    ctx: &'a Reconciler,
    /// Repository file to source.
    pub source: PathBuf,
    /// Startup file to merge the directive into.
    pub target: PathBuf,
}

impl<'a> SourceableResource<'a> {
    /// Create a new sourceable resource.
    #[must_use]
    pub const fn new(ctx: &'a Reconciler, source: PathBuf, target: PathBuf) -> Self {
        Self {
            ctx,
            source,
            target,
        }
    }

    /// Inspect the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be inspected or read.
    pub fn current_state(&self) -> Result<SourceableState, ResourceError> {
        let fs = self.ctx.fs();
        if !self.ctx.classifier().source_exists(&self.source)? {
            return Ok(SourceableState::SourceMissing);
        }
        let kind = fs
            .entry_kind(&self.target)
            .map_err(|e| ResourceError::fs("inspect", &self.target, e))?;
        match kind {
            EntryKind::Absent => Ok(SourceableState::Absent),
            EntryKind::Symlink => {
                let current = fs
                    .read_link(&self.target)
                    .map_err(|e| ResourceError::fs("read link", &self.target, e))?;
                let resolved = resolve_link_destination(&self.target, &current);
                if self.ctx.paths().is_inside_root(&resolved) {
                    Ok(SourceableState::ManagedSymlink { current })
                } else {
                    Ok(SourceableState::ForeignSymlink { current })
                }
            }
            EntryKind::File => {
                let content = read_bytes(fs, &self.target)?;
                if contains_directive(&content, &self.source) {
                    Ok(SourceableState::AlreadySourced)
                } else if is_placeholder(&content) {
                    Ok(SourceableState::Placeholder { content })
                } else {
                    Ok(SourceableState::Unrelated { content })
                }
            }
            EntryKind::Directory | EntryKind::Other => Ok(SourceableState::Unmanageable { kind }),
        }
    }

    fn result(&self, status: LinkStatus) -> LinkResult {
        LinkResult::new(LinkKind::Sourceable, &self.target, &self.source, status)
    }

    fn failed(&self, err: &ResourceError) -> LinkResult {
        self.result(LinkStatus::Failed).with_message(err.to_string())
    }

    /// Act on an already computed state.
    #[must_use]
    pub fn apply(&self, state: SourceableState, force: bool) -> LinkResult {
        match state {
            SourceableState::SourceMissing => self
                .result(LinkStatus::SourceMissing)
                .with_message(format!("source does not exist: {}", self.source.display())),
            SourceableState::AlreadySourced => self.result(LinkStatus::Linked),
            SourceableState::ForeignSymlink { current } if !force => self
                .result(LinkStatus::Conflict)
                .with_message(format!(
                    "symlink to {} is not managed by dotfiles; use --force to replace it with a file",
                    current.display()
                )),
            SourceableState::ManagedSymlink { current }
            | SourceableState::ForeignSymlink { current } => self.convert_symlink(current),
            SourceableState::Unrelated { .. } if !force => self
                .result(LinkStatus::Conflict)
                .with_message(format!(
                    "file has its own content; add `{}` manually or use --force",
                    directive(&self.source)
                )),
            SourceableState::Unrelated { content } | SourceableState::Placeholder { content } => {
                self.merge(&content)
            }
            SourceableState::Unmanageable { kind } => self
                .result(LinkStatus::Conflict)
                .with_message(format!("{kind:?} exists at target; remove it manually")),
            SourceableState::Absent => {
                if self.ctx.is_dry_run() {
                    return self
                        .result(LinkStatus::Linked)
                        .changed()
                        .with_message("would create");
                }
                match write_atomic(self.ctx.fs(), &self.target, &render(b"", &self.source)) {
                    Ok(()) => self.result(LinkStatus::Linked).changed(),
                    Err(e) => self.failed(&e),
                }
            }
        }
    }

    /// Replace a symlink with a fresh file; the old destination is recorded
    /// so rollback can put the link back.
    fn convert_symlink(&self, current: PathBuf) -> LinkResult {
        if self.ctx.is_dry_run() {
            return self
                .result(LinkStatus::Linked)
                .changed()
                .with_previous_link(current)
                .with_message("would replace symlink with file");
        }
        let fs = self.ctx.fs();
        if let Err(e) = fs.remove_file(&self.target) {
            return self.failed(&ResourceError::fs("remove link", &self.target, e));
        }
        match write_atomic(fs, &self.target, &render(b"", &self.source)) {
            Ok(()) => self
                .result(LinkStatus::Linked)
                .changed()
                .with_previous_link(current),
            Err(e) => {
                let restored = fs.symlink(&current, &self.target).is_ok();
                let result = self.failed(&e).with_previous_link(current);
                if restored { result } else { result.changed() }
            }
        }
    }

    /// Back up the existing file, then rewrite it with the directive appended.
    fn merge(&self, content: &[u8]) -> LinkResult {
        if self.ctx.is_dry_run() {
            return self
                .result(LinkStatus::Linked)
                .changed()
                .with_message("would back up and append source line");
        }
        let entry = match self.ctx.backup(&self.target) {
            Ok(entry) => entry,
            Err(e) => return self.failed(&e),
        };
        match write_atomic(self.ctx.fs(), &self.target, &render(content, &self.source)) {
            Ok(()) => self
                .result(LinkStatus::Linked)
                .changed()
                .with_backup(entry.backup_path),
            Err(e) => self.failed(&e).with_backup(entry.backup_path),
        }
    }
}

impl Linkable for SourceableResource<'_> {
    fn kind(&self) -> LinkKind {
        LinkKind::Sourceable
    }

    fn target(&self) -> &Path {
        &self.target
    }

    fn inspect(&self) -> Result<Inspection, ResourceError> {
        let state = self.current_state()?;
        Ok(Inspection {
            satisfied: state == SourceableState::AlreadySourced,
            label: state.label(),
        })
    }

    fn install(&self, force: bool) -> LinkResult {
        match self.current_state() {
            Ok(state) => self.apply(state, force),
            Err(e) => self.failed(&e),
        }
    }

    fn uninstall(&self) -> Result<ResourceChange, ResourceError> {
        let fs = self.ctx.fs();
        match self.current_state()? {
            SourceableState::AlreadySourced => {
                let content = read_bytes(fs, &self.target)?;
                let Some(rest) = strip(&content, &self.source) else {
                    return Ok(ResourceChange::AlreadyCorrect);
                };
                if self.ctx.is_dry_run() {
                    return Ok(ResourceChange::Applied);
                }
                if rest.is_empty() {
                    fs.remove_file(&self.target)
                        .map_err(|e| ResourceError::fs("remove", &self.target, e))?;
                } else {
                    write_atomic(fs, &self.target, &rest)?;
                }
                Ok(ResourceChange::Applied)
            }
            SourceableState::Absent | SourceableState::SourceMissing => {
                Ok(ResourceChange::AlreadyCorrect)
            }
            other => Ok(ResourceChange::Skipped {
                reason: other.label(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::{FaultyFs, FsOp, SystemFileSystemOps};
    use crate::resources::paths::PathResolver;
    use std::sync::Arc;

    struct Fixture {
        _dir: tempfile::TempDir,
        home: PathBuf,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let home = dir.path().join("home");
            let root = home.join("dotfiles");
            std::fs::create_dir_all(root.join("shell")).unwrap();
            std::fs::write(root.join("shell/zshrc"), "alias ll='ls -l'\n").unwrap();
            Self {
                _dir: dir,
                home,
                root,
            }
        }

        fn reconciler(&self) -> Reconciler {
            Reconciler::new(
                Arc::new(SystemFileSystemOps),
                PathResolver::new(&self.home, &self.root),
            )
        }

        fn source(&self) -> PathBuf {
            self.root.join("shell/zshrc")
        }

        fn target(&self) -> PathBuf {
            self.home.join(".zshrc")
        }

        fn install(&self, ctx: &Reconciler, force: bool) -> LinkResult {
            SourceableResource::new(ctx, self.source(), self.target()).install(force)
        }

        fn content(&self) -> String {
            std::fs::read_to_string(self.target()).unwrap()
        }
    }

    #[test]
    fn absent_target_gets_exactly_one_directive() {
        let fx = Fixture::new();
        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Linked);
        assert!(r.changed);
        let content = fx.content();
        assert_eq!(
            content,
            format!("{MARKER}\nsource \"{}\"\n", fx.source().display())
        );
        assert_eq!(content.matches("source \"").count(), 1);
        assert!(!fx.target().symlink_metadata().unwrap().is_symlink());
    }

    #[test]
    fn repeated_installs_never_duplicate_the_directive() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "export PATH=$HOME/bin:$PATH\n").unwrap();
        let ctx = fx.reconciler();
        fx.install(&ctx, true);
        let first = fx.content();
        for force in [false, true, true] {
            let r = fx.install(&ctx, force);
            assert_eq!(r.status, LinkStatus::Linked);
            assert!(!r.changed);
        }
        assert_eq!(fx.content(), first);
        assert_eq!(ctx.taken_backups().len(), 1);
    }

    #[test]
    fn unquoted_directive_counts_as_present() {
        let fx = Fixture::new();
        let body = format!("# mine\nsource {}\n", fx.source().display());
        std::fs::write(fx.target(), &body).unwrap();
        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Linked);
        assert!(!r.changed);
        assert_eq!(fx.content(), body);
    }

    #[test]
    fn unrelated_content_without_force_is_conflict() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "export EDITOR=vim\n").unwrap();
        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Conflict);
        assert!(r.message.unwrap().contains("--force"));
        assert_eq!(fx.content(), "export EDITOR=vim\n");
    }

    #[test]
    fn unrelated_content_with_force_is_preserved_above_directive() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "export EDITOR=vim\n\n\n").unwrap();
        let r = fx.install(&fx.reconciler(), true);
        assert_eq!(r.status, LinkStatus::Linked);
        assert_eq!(
            fx.content(),
            format!(
                "export EDITOR=vim\n\n{MARKER}\nsource \"{}\"\n",
                fx.source().display()
            )
        );
        let backup = r.backup_path.unwrap();
        assert_eq!(
            std::fs::read_to_string(backup).unwrap(),
            "export EDITOR=vim\n\n\n"
        );
    }

    #[test]
    fn placeholder_is_merged_without_force() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "# created by installer\n\n").unwrap();
        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Linked);
        assert!(r.backup_path.is_some());
        assert!(fx.content().starts_with("# created by installer\n\n# Dotfiles"));
    }

    #[test]
    fn failed_backup_leaves_file_untouched() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "export EDITOR=vim\n").unwrap();
        let fs = Arc::new(FaultyFs::failing(&[FsOp::Copy]));
        let ctx = Reconciler::new(fs.clone(), PathResolver::new(&fx.home, &fx.root));
        let r = fx.install(&ctx, true);
        assert_eq!(r.status, LinkStatus::Failed);
        assert!(fs.calls_to(FsOp::Rename).is_empty());
        assert_eq!(fx.content(), "export EDITOR=vim\n");
    }

    #[cfg(unix)]
    #[test]
    fn managed_symlink_is_converted_to_file() {
        let fx = Fixture::new();
        std::os::unix::fs::symlink(fx.source(), fx.target()).unwrap();
        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Linked);
        assert_eq!(r.previous_link, Some(fx.source()));
        assert!(!fx.target().symlink_metadata().unwrap().is_symlink());
        assert!(contains_directive(fx.content().as_bytes(), &fx.source()));
        assert_eq!(
            std::fs::read_to_string(fx.source()).unwrap(),
            "alias ll='ls -l'\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn foreign_symlink_needs_force() {
        let fx = Fixture::new();
        let foreign = fx.home.join("other-zshrc");
        std::fs::write(&foreign, "theirs").unwrap();
        std::os::unix::fs::symlink(&foreign, fx.target()).unwrap();

        let r = fx.install(&fx.reconciler(), false);
        assert_eq!(r.status, LinkStatus::Conflict);
        assert!(fx.target().symlink_metadata().unwrap().is_symlink());

        let r = fx.install(&fx.reconciler(), true);
        assert_eq!(r.status, LinkStatus::Linked);
        assert_eq!(r.previous_link, Some(foreign.clone()));
        assert_eq!(std::fs::read_to_string(&foreign).unwrap(), "theirs");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let fx = Fixture::new();
        let ctx = fx.reconciler().dry_run(true);
        let r = fx.install(&ctx, false);
        assert_eq!(r.status, LinkStatus::Linked);
        assert_eq!(r.message.as_deref(), Some("would create"));
        assert!(fx.target().symlink_metadata().is_err());
    }

    #[test]
    fn uninstall_strips_directive_and_keeps_user_content() {
        let fx = Fixture::new();
        std::fs::write(fx.target(), "export EDITOR=vim\n").unwrap();
        let ctx = fx.reconciler();
        fx.install(&ctx, true);
        let res = SourceableResource::new(&ctx, fx.source(), fx.target());
        assert_eq!(res.uninstall().unwrap(), ResourceChange::Applied);
        assert_eq!(fx.content(), "export EDITOR=vim\n");
    }

    #[test]
    fn uninstall_deletes_file_left_empty() {
        let fx = Fixture::new();
        let ctx = fx.reconciler();
        fx.install(&ctx, false);
        let res = SourceableResource::new(&ctx, fx.source(), fx.target());
        assert_eq!(res.uninstall().unwrap(), ResourceChange::Applied);
        assert!(fx.target().symlink_metadata().is_err());
    }

    #[test]
    fn non_utf8_bytes_survive_merge_and_strip() {
        let fx = Fixture::new();
        let original: &[u8] = b"export PS1='\xff\xfe latin1 \xe9'\r\nalias ll='ls -l'\n";
        std::fs::write(fx.target(), original).unwrap();
        let ctx = fx.reconciler();

        let r = fx.install(&ctx, true);
        assert_eq!(r.status, LinkStatus::Linked);
        let merged = std::fs::read(fx.target()).unwrap();
        assert!(merged.starts_with(original.trim_ascii_end()), "{merged:?}");
        let tail = format!("\n\n{MARKER}\n{}\n", directive(&fx.source()));
        assert!(merged.ends_with(tail.as_bytes()), "{merged:?}");
        assert_eq!(std::fs::read(r.backup_path.unwrap()).unwrap(), original);

        let res = SourceableResource::new(&ctx, fx.source(), fx.target());
        assert_eq!(res.uninstall().unwrap(), ResourceChange::Applied);
        assert_eq!(std::fs::read(fx.target()).unwrap(), original);
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder(b""));
        assert!(is_placeholder(b"\n  \n# comment\n"));
        assert!(!is_placeholder(b"# comment\nexport A=1\n"));
        assert!(!is_placeholder(b"\xe9\n"));
    }

    #[test]
    fn render_and_strip() {
        let source = Path::new("/repo/shell/zshrc");
        assert_eq!(
            render(b"", source),
            b"# Dotfiles configuration\nsource \"/repo/shell/zshrc\"\n"
        );
        let merged = render(b"export A=1\n", source);
        assert_eq!(
            merged,
            b"export A=1\n\n# Dotfiles configuration\nsource \"/repo/shell/zshrc\"\n"
        );
        assert_eq!(strip(&merged, source).unwrap(), b"export A=1\n");
        assert_eq!(strip(b"export A=1\n", source), None);
    }
}
