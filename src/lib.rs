//! # spark-vdom
//!
//! Reactive virtual tree runtime for Rust.
//!
//! Components describe their output as immutable [`VNode`] trees; a
//! [`Renderer`] converges a host tree onto each new description with the
//! minimal set of platform operations, and a coalescing scheduler batches
//! reactive invalidations so a burst of writes costs one re-render.
//!
//! ## Architecture
//!
//! ```text
//! Signal write → effect invalidation → job queue → flush_jobs
//!                                                     │
//! ComponentDef::render → VNode tree → patch ──────────┘
//!                                       │
//!                                   Platform ops (create/insert/move/remove)
//! ```
//!
//! The host side is abstracted behind the [`Platform`] trait; an in-memory
//! implementation ([`MemoryPlatform`]) records every operation for
//! inspection and headless use.
//!
//! ## Modules
//!
//! - [`vnode`] - Virtual node model (elements, text, components, keys, props)
//! - [`renderer`] - Reconciler, keyed diffing, component lifecycle
//! - [`reactivity`] - Signals and invalidation-based effects
//! - [`scheduler`] - Deduplicated, identity-ordered update queue
//! - [`platform`] - Host operation trait and the in-memory platform

pub mod platform;
pub mod reactivity;
pub mod renderer;
pub mod scheduler;
pub mod vnode;

// Re-export commonly used items
pub use platform::{HostId, HostOp, MemoryPlatform, Platform};

pub use reactivity::{signal, ReactiveEffect, Signal};

pub use renderer::{ComponentDef, ComponentId, Renderer};

pub use scheduler::{flush_jobs, invalidate_job, pending_count, queue_job, Job, JobId};

pub use vnode::{
    same_vnode_type, Children, Key, PropValue, Props, ShapeFlags, VNode, VNodeType,
};
