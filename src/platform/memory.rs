//! In-memory reference platform.
//!
//! An arena-backed host tree with DOM-like insert/remove semantics plus an
//! operation log. This is the test double for the reconciler's observable
//! behavior (every test asserts against the log and the final child order),
//! and it doubles as a headless rendering target.
//!
//! The platform is a `Clone`-able shared handle: the renderer owns one clone
//! boxed behind [`Platform`], the test keeps another to inspect the same
//! tree.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{HostId, Platform};
use crate::vnode::PropValue;

/// One recorded platform mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    CreateElement { node: HostId, tag: String },
    CreateText { node: HostId, content: String },
    SetText { node: HostId, content: String },
    SetElementText { node: HostId, content: String },
    PatchProp { node: HostId, key: String, next: Option<PropValue> },
    Insert { child: HostId, parent: HostId, anchor: Option<HostId> },
    Remove { child: HostId },
}

struct HostNode {
    /// `Some(tag)` for elements, `None` for text nodes.
    tag: Option<String>,
    text: String,
    attrs: IndexMap<String, PropValue>,
    children: Vec<HostId>,
    parent: Option<HostId>,
}

struct MemoryInner {
    nodes: HashMap<u64, HostNode>,
    next_id: u64,
    ops: Vec<HostOp>,
}

impl MemoryInner {
    fn alloc(&mut self, tag: Option<String>, text: String) -> HostId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            HostNode {
                tag,
                text,
                attrs: IndexMap::new(),
                children: Vec::new(),
                parent: None,
            },
        );
        HostId::from_raw(id)
    }

    fn node(&self, id: HostId) -> &HostNode {
        self.nodes.get(&id.raw()).expect("unknown host node")
    }

    fn node_mut(&mut self, id: HostId) -> &mut HostNode {
        self.nodes.get_mut(&id.raw()).expect("unknown host node")
    }

    /// Detach `child` from its current parent, if attached.
    fn detach(&mut self, child: HostId) {
        if let Some(parent) = self.node(child).parent {
            let siblings = &mut self.node_mut(parent).children;
            siblings.retain(|&c| c != child);
            self.node_mut(child).parent = None;
        }
    }
}

/// Shared-handle in-memory host tree.
#[derive(Clone)]
pub struct MemoryPlatform {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        MemoryPlatform {
            inner: Rc::new(RefCell::new(MemoryInner {
                nodes: HashMap::new(),
                next_id: 0,
                ops: Vec::new(),
            })),
        }
    }

    /// Create a detached container element. Not recorded in the op log -
    /// roots are scaffolding, not reconciler output.
    pub fn create_root(&self) -> HostId {
        self.inner.borrow_mut().alloc(Some("root".to_string()), String::new())
    }

    /// Snapshot of the operation log.
    pub fn ops(&self) -> Vec<HostOp> {
        self.inner.borrow().ops.clone()
    }

    /// Drain the operation log.
    pub fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut self.inner.borrow_mut().ops)
    }

    /// Children of `node`, in host order.
    pub fn children_of(&self, node: HostId) -> Vec<HostId> {
        self.inner.borrow().node(node).children.clone()
    }

    /// Text content of a node (raw text nodes and text-mode elements).
    pub fn text_of(&self, node: HostId) -> String {
        self.inner.borrow().node(node).text.clone()
    }

    /// Tag of an element node.
    pub fn tag_of(&self, node: HostId) -> Option<String> {
        self.inner.borrow().node(node).tag.clone()
    }

    /// Current value of an attribute.
    pub fn attr_of(&self, node: HostId, key: &str) -> Option<PropValue> {
        self.inner.borrow().node(node).attrs.get(key).cloned()
    }

    /// Whether `node` exists in the arena (detached nodes still exist).
    pub fn contains(&self, node: HostId) -> bool {
        self.inner.borrow().nodes.contains_key(&node.raw())
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MemoryPlatform {
    fn create_element(&mut self, tag: &str) -> HostId {
        let mut inner = self.inner.borrow_mut();
        let node = inner.alloc(Some(tag.to_string()), String::new());
        inner.ops.push(HostOp::CreateElement {
            node,
            tag: tag.to_string(),
        });
        node
    }

    fn create_text(&mut self, content: &str) -> HostId {
        let mut inner = self.inner.borrow_mut();
        let node = inner.alloc(None, content.to_string());
        inner.ops.push(HostOp::CreateText {
            node,
            content: content.to_string(),
        });
        node
    }

    fn set_text(&mut self, node: HostId, content: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.node_mut(node).text = content.to_string();
        inner.ops.push(HostOp::SetText {
            node,
            content: content.to_string(),
        });
    }

    fn set_element_text(&mut self, node: HostId, content: &str) {
        let mut inner = self.inner.borrow_mut();
        // Text-mode assignment wipes element children, like DOM textContent.
        let children = std::mem::take(&mut inner.node_mut(node).children);
        for child in children {
            inner.node_mut(child).parent = None;
        }
        inner.node_mut(node).text = content.to_string();
        inner.ops.push(HostOp::SetElementText {
            node,
            content: content.to_string(),
        });
    }

    fn patch_prop(
        &mut self,
        node: HostId,
        key: &str,
        _prev: Option<&PropValue>,
        next: Option<&PropValue>,
    ) {
        let mut inner = self.inner.borrow_mut();
        match next {
            Some(value) => {
                inner.node_mut(node).attrs.insert(key.to_string(), value.clone());
            }
            None => {
                inner.node_mut(node).attrs.shift_remove(key);
            }
        }
        inner.ops.push(HostOp::PatchProp {
            node,
            key: key.to_string(),
            next: next.cloned(),
        });
    }

    fn insert(&mut self, child: HostId, parent: HostId, anchor: Option<HostId>) {
        let mut inner = self.inner.borrow_mut();
        inner.detach(child);
        let position = anchor
            .and_then(|a| inner.node(parent).children.iter().position(|&c| c == a))
            .unwrap_or_else(|| inner.node(parent).children.len());
        inner.node_mut(parent).children.insert(position, child);
        inner.node_mut(child).parent = Some(parent);
        inner.ops.push(HostOp::Insert {
            child,
            parent,
            anchor,
        });
    }

    fn remove(&mut self, child: HostId) {
        let mut inner = self.inner.borrow_mut();
        inner.detach(child);
        inner.ops.push(HostOp::Remove { child });
    }

    fn parent_node(&self, node: HostId) -> Option<HostId> {
        self.inner.borrow().node(node).parent
    }
}

// =============================================================================
// Tests
// =============================================================================
