//! Status command: classify every declared entry without side effects.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::resources::report::{LinkKind, RunSummary};
use crate::resources::state::StateStore;
use crate::tasks::Context;

/// How one declared entry looks right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStatus {
    /// Target as displayed (home contracted to `~`).
    pub target: String,
    /// Installer that would handle the entry.
    pub kind: LinkKind,
    /// Classification, or the inspection error.
    pub label: String,
    /// Whether the entry is already in its desired state.
    pub satisfied: bool,
    /// Whether the target could not be inspected.
    pub error: bool,
}

impl EntryStatus {
    /// Display line, e.g. `symlink  ~/.gitconfig  linked`.
    #[must_use]
    pub fn line(&self) -> String {
        let kind = match self.kind {
            LinkKind::Symlink => "symlink",
            LinkKind::Sourceable => "source",
        };
        format!("{kind:<8} {:<32} {}", self.target, self.label)
    }
}

/// Inspect every `[[symlinks]]` entry in declaration order.
#[must_use]
pub fn collect(ctx: &Context) -> Vec<EntryStatus> {
    ctx.config
        .symlinks
        .iter()
        .map(|link| {
            let target = ctx.paths().contract(&ctx.resolve_target(&link.target));
            match ctx.reconciler.inspect(&link.source, &link.target) {
                Ok((kind, inspection)) => EntryStatus {
                    target,
                    kind,
                    label: inspection.label,
                    satisfied: inspection.satisfied,
                    error: false,
                },
                Err(e) => EntryStatus {
                    target,
                    kind: LinkKind::Symlink,
                    label: e.to_string(),
                    satisfied: false,
                    error: true,
                },
            }
        })
        .collect()
}

/// Run the status command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, an entry cannot be
/// inspected, or (with `--strict`) an entry is not in place.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let ctx = super::CommandSetup::init(global, log)?.context(global, log);

    log.stage("Status");
    let entries = collect(&ctx);
    for entry in &entries {
        if entry.error {
            log.error(&entry.line());
        } else if entry.satisfied {
            log.info(&entry.line());
        } else {
            log.warn(&entry.line());
        }
    }
    let in_place = entries.iter().filter(|e| e.satisfied).count();
    log.info(&format!("{in_place} of {} entries in place", entries.len()));

    let store = StateStore::new(Arc::clone(&ctx.fs_ops), ctx.home());
    match store.load() {
        Ok(Some(state)) => {
            log.info(&format!(
                "last run: {} at {} ({})",
                state.command,
                state.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                RunSummary::from_results(&state.results)
            ));
        }
        Ok(None) => log.debug("no recorded run"),
        Err(e) => log.warn(&format!("cannot read run state: {e}")),
    }

    let errors = entries.iter().filter(|e| e.error).count();
    if errors > 0 {
        anyhow::bail!("{errors} entries could not be inspected");
    }
    if global.strict && in_place < entries.len() {
        anyhow::bail!("{} entries not in place (--strict)", entries.len() - in_place);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::config::symlinks::Symlink;
    use crate::exec::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::make_context_in;

    fn link(source: &str, target: &str) -> Symlink {
        Symlink {
            source: source.to_string(),
            target: target.to_string(),
            force: None,
        }
    }

    #[test]
    fn line_pads_kind_and_target() {
        let entry = EntryStatus {
            target: "~/.zshrc".into(),
            kind: LinkKind::Sourceable,
            label: "sourced".into(),
            satisfied: true,
            error: false,
        };
        assert!(entry.line().starts_with("source   ~/.zshrc"), "{}", entry.line());
        assert!(entry.line().ends_with(" sourced"));
    }

    #[cfg(unix)]
    #[test]
    fn collect_reports_each_entry_without_changing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let root = home.join("dotfiles");
        std::fs::create_dir_all(root.join("git")).unwrap();
        std::fs::write(root.join("git/gitconfig"), "").unwrap();
        std::fs::write(root.join("git/gitignore"), "").unwrap();
        std::os::unix::fs::symlink(root.join("git/gitconfig"), home.join(".gitconfig")).unwrap();

        let config = Config {
            root,
            symlinks: vec![
                link("git/gitconfig", "~/.gitconfig"),
                link("git/gitignore", "~/.gitignore"),
            ],
            ..Config::default()
        };
        let ctx = make_context_in(config, home.clone(), Arc::new(MockExecutor::new()));

        let entries = collect(&ctx);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].satisfied);
        assert_eq!(entries[0].target, "~/.gitconfig");
        assert!(!entries[1].satisfied);
        assert!(!entries[1].error);
        assert!(home.join(".gitignore").symlink_metadata().is_err());
    }
}
