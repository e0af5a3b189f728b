//! Everything that touches the home directory.
//!
//! Link targets go through [`Linkable`] (symlinks and sourceable files, driven
//! by the [`reconcile::Reconciler`]); directories and templates through the
//! simpler [`Resource`]. Backups, the persisted run state and rollback live
//! here as well.
pub mod backup;
pub mod classify;
pub mod directory;
pub mod error;
pub mod paths;
pub mod reconcile;
pub mod report;
pub mod rollback;
pub mod sourceable;
pub mod state;
pub mod symlink;
pub mod template;

/// Shared filesystem helpers for resource implementations.
pub mod helpers {
    pub mod fs;
}

use std::path::Path;

use anyhow::Result;

use self::error::ResourceError;
use self::report::{LinkKind, LinkResult};

/// State of a simple resource (directory, template file).
///
/// # Examples
///
/// ```
/// use dotfiles_manager::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let skip = ResourceState::Invalid { reason: "target is a file".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist or is not present.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource cannot be applied (e.g., source missing, wrong file type).
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying or removing a resource.
///
/// # Examples
///
/// ```
/// use dotfiles_manager::resources::ResourceChange;
///
/// let applied = ResourceChange::Applied;
/// let noop = ResourceChange::AlreadyCorrect;
/// let skipped = ResourceChange::Skipped { reason: "source missing".into() };
///
/// assert_eq!(applied, ResourceChange::Applied);
/// assert_ne!(applied, noop);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created, updated or removed.
    Applied,
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
    /// Resource was skipped (e.g., missing source file, or something else
    /// occupies the path).
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}

/// A path that is either already in its desired state or can be brought
/// there in one step (directories, templates).
///
/// Driven by [`process_resources`](crate::tasks::process_resources).
pub trait Resource {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource state cannot be determined due to I/O
    /// failures or permission issues.
    fn current_state(&self) -> Result<ResourceState>;

    /// Bring the resource to its desired state.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be applied.
    fn apply(&self) -> Result<ResourceChange>;
}

/// What [`Linkable::inspect`] found at a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// Human-readable state, e.g. `linked` or `foreign symlink -> /opt/x`.
    pub label: String,
    /// Whether the target is already in its desired state.
    pub satisfied: bool,
}

/// A declared link target handled by one of the two installers.
pub trait Linkable {
    /// Which installer this is.
    fn kind(&self) -> LinkKind;

    /// Resolved target path.
    fn target(&self) -> &Path;

    /// Classify the target without side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be inspected.
    fn inspect(&self) -> Result<Inspection, ResourceError>;

    /// Reconcile the target.  Never fails: problems become the result's
    /// status.
    fn install(&self, force: bool) -> LinkResult;

    /// Remove what [`install`](Self::install) created, leaving anything else
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be inspected or changed.
    fn uninstall(&self) -> Result<ResourceChange, ResourceError>;
}
