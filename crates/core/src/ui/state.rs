//! UI state types and event definitions.

use std::path::PathBuf;

/// Which view the workspace shows for a processed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Background layer under the cut-out, updated live.
    #[default]
    Preview,
    /// Before/after split view.
    Compare,
}

/// Where an export goes.
#[derive(Debug, Clone)]
pub(crate) enum ExportTarget {
    File(PathBuf),
    Clipboard,
}

/// Events received from the background export task.
pub(crate) enum ExportEvent {
    /// The PNG was written to disk.
    Saved(PathBuf),
    /// The composite was placed on the clipboard.
    Copied,
    /// The export failed; carries the user-facing message.
    Failed(String),
}
