//! Virtual tree nodes - the per-render description of desired host structure.
//!
//! A [`VNode`] is produced fresh on every render and never mutated afterward,
//! with two exceptions: `host` and `component` are back-references written by
//! the reconciler to thread a node's identity across renders. Everything else
//! (type, key, props, children) is immutable description.
//!
//! # Node classes
//!
//! - **Element** - a host tag plus props and children
//! - **Text** - a raw text node
//! - **Component** - a reference to a [`ComponentDef`] whose render output
//!   expands into a sub-tree owned by its instance
//!
//! # Children modes
//!
//! Children are either a single string (text-children mode), an ordered list
//! of nodes (array-children mode), or absent. The mode is also encoded in
//! [`ShapeFlags`] so the reconciler can branch on class + mode in one place.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::platform::HostId;
use crate::renderer::component::{ComponentDef, ComponentId};

// =============================================================================
// Shape Flags
// =============================================================================

bitflags! {
    /// Encodes a node's class and its children mode.
    ///
    /// Computed once by the constructors; the reconciler reads these instead
    /// of re-deriving the mode from the `children` payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShapeFlags: u8 {
        const ELEMENT        = 1;
        const COMPONENT      = 1 << 1;
        const TEXT_CHILDREN  = 1 << 2;
        const ARRAY_CHILDREN = 1 << 3;
    }
}

// =============================================================================
// Keys and Props
// =============================================================================

/// Stable identity for a node within its sibling list.
///
/// Nodes carrying the same key across two renders are treated as the same
/// logical entity and are patched rather than recreated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(String),
    Num(i64),
    /// Opaque token identity for callers that mint their own key space.
    Token(u64),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Num(value)
    }
}

/// A single attribute/prop value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Num(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Num(value as f64)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

/// Prop map. Insertion-ordered so prop diffs apply deterministically;
/// the order carries no semantics.
pub type Props = IndexMap<String, PropValue>;

// =============================================================================
// VNode
// =============================================================================

/// Node class discriminator plus its type payload.
#[derive(Clone)]
pub enum VNodeType {
    /// Host element with a tag identifier.
    Element(Rc<str>),
    /// Raw text node; content lives in `children`.
    Text,
    /// Component node referencing its definition.
    Component(Rc<dyn ComponentDef>),
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "Element({tag})"),
            VNodeType::Text => write!(f, "Text"),
            VNodeType::Component(_) => write!(f, "Component"),
        }
    }
}

/// Children payload of a node.
#[derive(Debug, Clone)]
pub enum Children {
    /// No children.
    None,
    /// Text-children mode: a single string.
    Text(String),
    /// Array-children mode: an ordered list of nodes.
    Nodes(Vec<VNode>),
}

/// A virtual tree node.
///
/// `host` and `component` are the only fields the reconciler mutates:
/// `host` is written on mount, copied forward on patch, and identifies the
/// created host-side node; `component` links a Component node to its
/// instance across renders.
#[derive(Debug, Clone)]
pub struct VNode {
    pub kind: VNodeType,
    pub key: Option<Key>,
    pub props: Props,
    pub children: Children,
    pub flags: ShapeFlags,
    pub host: Option<HostId>,
    pub component: Option<ComponentId>,
}

impl VNode {
    /// Element node with array children. An empty list means "no children".
    pub fn element(tag: &str, props: Props, children: Vec<VNode>) -> Self {
        let mut flags = ShapeFlags::ELEMENT;
        let children = if children.is_empty() {
            Children::None
        } else {
            flags |= ShapeFlags::ARRAY_CHILDREN;
            Children::Nodes(children)
        };
        VNode {
            kind: VNodeType::Element(Rc::from(tag)),
            key: None,
            props,
            children,
            flags,
            host: None,
            component: None,
        }
    }

    /// Element node in text-children mode.
    pub fn element_with_text(tag: &str, props: Props, text: impl Into<String>) -> Self {
        VNode {
            kind: VNodeType::Element(Rc::from(tag)),
            key: None,
            props,
            children: Children::Text(text.into()),
            flags: ShapeFlags::ELEMENT | ShapeFlags::TEXT_CHILDREN,
            host: None,
            component: None,
        }
    }

    /// Raw text node.
    pub fn text(content: impl Into<String>) -> Self {
        VNode {
            kind: VNodeType::Text,
            key: None,
            props: Props::new(),
            children: Children::Text(content.into()),
            flags: ShapeFlags::empty(),
            host: None,
            component: None,
        }
    }

    /// Component node.
    pub fn component(def: Rc<dyn ComponentDef>, props: Props) -> Self {
        VNode {
            kind: VNodeType::Component(def),
            key: None,
            props,
            children: Children::None,
            flags: ShapeFlags::COMPONENT,
            host: None,
            component: None,
        }
    }

    /// Attach a stable identity key.
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Text content for nodes in text-children mode.
    pub(crate) fn text_content(&self) -> &str {
        match &self.children {
            Children::Text(s) => s,
            _ => "",
        }
    }
}

/// Whether two nodes describe the same logical entity: same discriminator,
/// same type (tag equality for elements, definition identity for components),
/// same key.
pub fn same_vnode_type(a: &VNode, b: &VNode) -> bool {
    if a.key != b.key {
        return false;
    }
    match (&a.kind, &b.kind) {
        (VNodeType::Element(t1), VNodeType::Element(t2)) => t1 == t2,
        (VNodeType::Text, VNodeType::Text) => true,
        (VNodeType::Component(c1), VNodeType::Component(c2)) => Rc::ptr_eq(c1, c2),
        _ => false,
    }
}

// =============================================================================
// Tests
// =============================================================================
