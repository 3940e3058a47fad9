//! Platform Operations - the capability set the reconciler drives.
//!
//! The core never touches a host tree directly; it converges it through this
//! trait. Every operation is synchronous and side-effect-only - no return
//! value influences control flow except [`Platform::parent_node`].
//!
//! Host nodes are opaque [`HostId`] handles. A handle is minted by the
//! platform on create and owned by the node's logical identity across
//! renders (the reconciler copies it forward on patch).

mod memory;

pub use memory::{HostOp, MemoryPlatform};

use crate::vnode::PropValue;

/// Opaque reference to a node in the rendering target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(u64);

impl HostId {
    pub fn from_raw(raw: u64) -> Self {
        HostId(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Host-side node creation, mutation and traversal.
pub trait Platform {
    /// Create an element node for the given host tag.
    fn create_element(&mut self, tag: &str) -> HostId;

    /// Create a raw text node.
    fn create_text(&mut self, content: &str) -> HostId;

    /// Replace the content of a raw text node.
    fn set_text(&mut self, node: HostId, content: &str);

    /// Replace an element's children with a single run of text.
    fn set_element_text(&mut self, node: HostId, content: &str);

    /// Apply a prop change. `next == None` removes the prop.
    fn patch_prop(
        &mut self,
        node: HostId,
        key: &str,
        prev: Option<&PropValue>,
        next: Option<&PropValue>,
    );

    /// Insert `child` into `parent`, before `anchor` (or at the end).
    /// Re-inserting an attached node moves it.
    fn insert(&mut self, child: HostId, parent: HostId, anchor: Option<HostId>);

    /// Detach `child` from its parent.
    fn remove(&mut self, child: HostId);

    /// Parent of `node`, if attached.
    fn parent_node(&self, node: HostId) -> Option<HostId>;
}
