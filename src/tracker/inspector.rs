use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Deepest node tree we are willing to walk.
pub const MAX_NODE_DEPTH: usize = 64;

/// Snapshot of one node of the active window's UI tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub scrollable: bool,
    #[serde(default)]
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn leaf(scrollable: bool) -> Self {
        Self { scrollable, ..Default::default() }
    }

    pub fn with_children(children: Vec<UiNode>) -> Self {
        Self { children, ..Default::default() }
    }
}

/// Depth-first search for a scrollable node. Trees deeper than
/// [`MAX_NODE_DEPTH`] are rejected as malformed.
pub fn has_scrollable_node(root: &UiNode) -> Result<bool> {
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_NODE_DEPTH {
            bail!("UI node tree deeper than {} levels", MAX_NODE_DEPTH);
        }
        if node.scrollable {
            return Ok(true);
        }
        stack.extend(node.children.iter().map(|child| (child, depth + 1)));
    }
    Ok(false)
}

/// Synchronous access to the host's active window.
pub trait WindowInspector: Send {
    fn active_window_has_scrollable(&self) -> Result<bool>;

    /// Hosts that push snapshots instead of answering queries override this.
    fn replace_active_window(&mut self, _root: Option<UiNode>) {}
}

/// Inspector backed by the last tree the host bridge pushed.
#[derive(Debug, Default)]
pub struct SnapshotInspector {
    root: Option<UiNode>,
}

impl WindowInspector for SnapshotInspector {
    fn active_window_has_scrollable(&self) -> Result<bool> {
        match &self.root {
            Some(root) => has_scrollable_node(root),
            None => Ok(false),
        }
    }

    fn replace_active_window(&mut self, root: Option<UiNode>) {
        self.root = root;
    }
}
