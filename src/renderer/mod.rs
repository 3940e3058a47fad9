//! Renderer - converges a host tree onto the latest virtual tree.
//!
//! [`Renderer::render`] diffs the new root against what the container
//! currently holds and applies the minimal platform operations: patch nodes
//! of the same logical type in place, replace on type change, reorder keyed
//! siblings with moves instead of rebuilds. Component nodes expand through
//! instances (see [`component`]); their re-renders arrive here via the
//! scheduler.
//!
//! The renderer is a shared handle over [`RendererInner`], which owns the
//! platform, the live component instances, and the last rendered tree per
//! container. Update jobs re-enter through a weak reference, so jobs queued
//! against a dropped renderer fizzle instead of dangling.

pub mod component;
mod diff;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

pub use component::{ComponentDef, ComponentId};

use crate::platform::{HostId, Platform};
use crate::vnode::{same_vnode_type, Children, ShapeFlags, VNode, VNodeType};
use component::ComponentInstance;

// =============================================================================
// Renderer
// =============================================================================

/// Public entry point. Cheap to clone into jobs and callbacks.
pub struct Renderer {
    inner: Rc<RefCell<RendererInner>>,
}

pub(crate) struct RendererInner {
    pub(crate) platform: Box<dyn Platform>,
    pub(crate) instances: HashMap<ComponentId, Rc<RefCell<ComponentInstance>>>,
    /// Last rendered root per container.
    roots: HashMap<HostId, VNode>,
    /// Next component uid; monotonic, doubles as the update job id.
    pub(crate) next_uid: u64,
    pub(crate) weak_self: Weak<RefCell<RendererInner>>,
}

impl Renderer {
    pub fn new(platform: Box<dyn Platform>) -> Self {
        let inner = Rc::new_cyclic(|weak| {
            RefCell::new(RendererInner {
                platform,
                instances: HashMap::new(),
                roots: HashMap::new(),
                next_uid: 1,
                weak_self: weak.clone(),
            })
        });
        Renderer { inner }
    }

    /// Render `vnode` into `container`, diffing against the previous render.
    /// `None` unmounts whatever the container holds.
    pub fn render(&self, vnode: Option<VNode>, container: HostId) {
        let mut inner = self.inner.borrow_mut();
        let prev = inner.roots.remove(&container);
        match vnode {
            Some(mut next) => {
                inner.patch(prev.as_ref(), &mut next, container, None);
                inner.roots.insert(container, next);
            }
            None => {
                if let Some(prev) = prev {
                    inner.unmount(&prev);
                }
            }
        }
    }
}

// =============================================================================
// Reconciliation core
// =============================================================================

impl RendererInner {
    /// Reconcile `n2` against `n1`. A type change replaces: the new node
    /// mounts anchored at the old node's host so it takes the old position,
    /// and the old node is unmounted afterwards.
    pub(crate) fn patch(
        &mut self,
        n1: Option<&VNode>,
        n2: &mut VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) {
        let mut replaced = None;
        let (n1, anchor) = match n1 {
            Some(prev) if !same_vnode_type(prev, n2) => {
                replaced = Some(prev);
                (None, prev.host.or(anchor))
            }
            other => (other, anchor),
        };

        if n2.flags.contains(ShapeFlags::COMPONENT) {
            match n1 {
                None => self.mount_component(n2, container, anchor),
                Some(prev) => self.update_component(prev, n2),
            }
        } else if matches!(n2.kind, VNodeType::Text) {
            self.process_text(n1, n2, container, anchor);
        } else {
            match n1 {
                None => self.mount_element(n2, container, anchor),
                Some(prev) => self.patch_element(prev, n2),
            }
        }

        if let Some(prev) = replaced {
            self.unmount(prev);
        }
    }

    fn process_text(
        &mut self,
        n1: Option<&VNode>,
        n2: &mut VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) {
        match n1 {
            None => {
                let node = self.platform.create_text(n2.text_content());
                n2.host = Some(node);
                self.platform.insert(node, container, anchor);
            }
            Some(prev) => {
                let node = prev.host.expect("text node missing host handle");
                n2.host = Some(node);
                if prev.text_content() != n2.text_content() {
                    self.platform.set_text(node, n2.text_content());
                }
            }
        }
    }

    /// Mount a fresh element: create, populate children, apply props, then
    /// attach. The node enters the host tree fully formed.
    fn mount_element(&mut self, n2: &mut VNode, container: HostId, anchor: Option<HostId>) {
        let tag = match &n2.kind {
            VNodeType::Element(tag) => tag.clone(),
            _ => panic!("mount_element called on a non-element node"),
        };
        let el = self.platform.create_element(&tag);

        if n2.flags.contains(ShapeFlags::TEXT_CHILDREN) {
            self.platform.set_element_text(el, n2.text_content());
        } else if let Children::Nodes(children) = &mut n2.children {
            for child in children.iter_mut() {
                self.patch(None, child, el, None);
            }
        }

        for (key, value) in &n2.props {
            self.platform.patch_prop(el, key, None, Some(value));
        }

        n2.host = Some(el);
        self.platform.insert(el, container, anchor);
    }

    fn patch_element(&mut self, n1: &VNode, n2: &mut VNode) {
        let el = n1.host.expect("element missing host handle at patch time");
        n2.host = Some(el);

        self.patch_children(n1, n2, el, None);

        for (key, prev_value) in &n1.props {
            if !n2.props.contains_key(key) {
                self.platform.patch_prop(el, key, Some(prev_value), None);
            }
        }
        for (key, next_value) in &n2.props {
            let prev_value = n1.props.get(key);
            if prev_value != Some(next_value) {
                self.platform.patch_prop(el, key, prev_value, Some(next_value));
            }
        }
    }

    /// Reconcile the children of an element across the three modes.
    fn patch_children(
        &mut self,
        n1: &VNode,
        n2: &mut VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) {
        match (&n1.children, &mut n2.children) {
            (prev, Children::Text(next_text)) => {
                if let Children::Nodes(prev_children) = prev {
                    for child in prev_children {
                        self.unmount(child);
                    }
                }
                if n1.text_content() != next_text.as_str() {
                    let next_text = next_text.clone();
                    self.platform.set_element_text(container, &next_text);
                }
            }
            (Children::Nodes(prev_children), Children::Nodes(next_children)) => {
                self.patch_keyed_children(prev_children, next_children, container, anchor);
            }
            (prev, Children::Nodes(next_children)) => {
                if matches!(prev, Children::Text(_)) {
                    self.platform.set_element_text(container, "");
                }
                for child in next_children.iter_mut() {
                    self.patch(None, child, container, anchor);
                }
            }
            (Children::Nodes(prev_children), Children::None) => {
                for child in prev_children {
                    self.unmount(child);
                }
            }
            (Children::Text(_), Children::None) => {
                self.platform.set_element_text(container, "");
            }
            (Children::None, Children::None) => {}
        }
    }

    /// Remove a node and everything under it. Component nodes tear down
    /// through their instance so effects and queued jobs retire too.
    pub(crate) fn unmount(&mut self, vnode: &VNode) {
        if let Some(id) = vnode.component {
            self.unmount_component(id);
            return;
        }
        if let Children::Nodes(children) = &vnode.children {
            for child in children {
                self.unmount(child);
            }
        }
        if let Some(host) = vnode.host {
            self.platform.remove(host);
        }
    }

    /// Relocate an already-mounted node. Re-insertion moves in one host op;
    /// component nodes carry their sub-tree's root handle.
    pub(crate) fn move_node(&mut self, vnode: &VNode, container: HostId, anchor: Option<HostId>) {
        if let Some(host) = vnode.host {
            self.platform.insert(host, container, anchor);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
