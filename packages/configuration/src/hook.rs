//! Configuration of a pluggable hook.
use serde::{Deserialize, Serialize};

/// A hook entry in the `prehooks` or `posthooks` lists.
///
/// The `name` selects the hook constructor from the registry; `options` is
/// handed to the constructor untouched, so every hook defines its own options
/// schema.
///
/// ```yaml
/// prehooks:
///   - name: torrent_approval
///     options:
///       denylist:
///         - 3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0
/// ```
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct HookConfig {
    /// The registered name of the hook.
    pub name: String,

    /// Hook-specific options.
    #[serde(default)]
    pub options: serde_json::Value,
}
