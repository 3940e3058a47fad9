//! Component lifecycle - instances, render effects and update jobs.
//!
//! A Component vnode expands into a *sub-tree* rendered by its definition.
//! The instance owns that sub-tree across renders, together with a render
//! effect whose invalidation enqueues the instance's update job. Two paths
//! re-render a mounted instance:
//!
//! - **self update**: a signal read during render changes; the effect
//!   invalidation queues the job and the host flushes it later
//! - **parent update**: the parent patches the component vnode; the new
//!   vnode is parked in `pending`, the queued duplicate (if any) is dropped,
//!   and the same job body runs synchronously
//!
//! Both paths funnel through [`RendererInner::run_component_job`], so a
//! parent-driven update and a queued self update never double-render.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::platform::HostId;
use crate::reactivity::{signal, ReactiveEffect, Signal};
use crate::scheduler::{self, Job, JobId};
use crate::vnode::{Props, VNode, VNodeType};

use super::RendererInner;

/// Identity of a live component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub(crate) u64);

/// A component definition: stateless description of setup and render.
///
/// `setup` runs once per instance, before the first render, and returns the
/// instance state handed back to every `render` call. Definitions that read
/// props during render stash a clone of the props signal in their state;
/// reads through [`Signal::get`] are tracked by the render effect.
pub trait ComponentDef {
    fn setup(&self, props: &Signal<Props>) -> Rc<dyn Any>;

    fn render(&self, state: &dyn Any) -> VNode;
}

/// Per-instance bookkeeping.
///
/// `vnode` is the instance's own copy of the component vnode currently
/// mounted; `pending` parks the incoming vnode during a parent-driven update
/// until the job body adopts it.
pub(crate) struct ComponentInstance {
    pub(crate) uid: JobId,
    pub(crate) is_mounted: bool,
    pub(crate) vnode: VNode,
    pub(crate) pending: Option<VNode>,
    pub(crate) sub_tree: Option<VNode>,
    pub(crate) props: Signal<Props>,
    pub(crate) state: Rc<dyn Any>,
    pub(crate) def: Rc<dyn ComponentDef>,
    pub(crate) effect: ReactiveEffect,
    pub(crate) container: HostId,
    pub(crate) anchor: Option<HostId>,
}

impl RendererInner {
    /// Create an instance for `n2`, run setup, and perform the first render
    /// synchronously through the update job body.
    pub(crate) fn mount_component(
        &mut self,
        n2: &mut VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) {
        let VNodeType::Component(def) = &n2.kind else {
            panic!("mount_component called on a non-component node");
        };
        let def = def.clone();

        let uid = self.next_uid;
        self.next_uid += 1;
        let id = ComponentId(uid);

        let props = signal(n2.props.clone());
        let state = def.setup(&props);

        // Invalidation enqueues the job; the job re-enters the renderer
        // through a weak handle so a dropped renderer orphans the job safely.
        let weak = self.weak_self.clone();
        let effect = ReactiveEffect::new(move || {
            let weak = weak.clone();
            scheduler::queue_job(Job::new(uid, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().run_component_job(id);
                }
            }));
        });

        let instance = Rc::new(RefCell::new(ComponentInstance {
            uid,
            is_mounted: false,
            vnode: n2.clone(),
            pending: None,
            sub_tree: None,
            props,
            state,
            def,
            effect,
            container,
            anchor,
        }));
        self.instances.insert(id, instance);
        n2.component = Some(id);

        self.run_component_job(id);

        // The component vnode borrows its sub-tree's root handle; it is an
        // anchor reference, not an owned host node.
        if let Some(instance) = self.instances.get(&id) {
            n2.host = instance.borrow().vnode.host;
        }
    }

    /// Parent-driven update: park the incoming vnode, cancel the queued
    /// duplicate, and run the job body now.
    pub(crate) fn update_component(&mut self, n1: &VNode, n2: &mut VNode) {
        let id = n1.component.expect("patched component vnode missing instance link");
        n2.component = Some(id);

        let instance = self
            .instances
            .get(&id)
            .cloned()
            .expect("patched component has no live instance");

        {
            let mut b = instance.borrow_mut();
            b.pending = Some(n2.clone());
            scheduler::invalidate_job(b.uid);
        }
        self.run_component_job(id);

        n2.host = instance.borrow().vnode.host;
    }

    /// The update job body shared by mount, self update and parent update.
    ///
    /// No-op when the instance is gone: a job queued before unmount may still
    /// reach its flush slot.
    pub(crate) fn run_component_job(&mut self, id: ComponentId) {
        let Some(instance) = self.instances.get(&id).cloned() else {
            return;
        };
        let effect = instance.borrow().effect.clone();
        effect.run(|| self.component_update_fn(&instance));
    }

    /// Render the instance inside its tracked effect run and reconcile the
    /// produced sub-tree against the previous one.
    fn component_update_fn(&mut self, instance: &Rc<RefCell<ComponentInstance>>) {
        let is_mounted = instance.borrow().is_mounted;

        if !is_mounted {
            let (def, state, container, anchor) = {
                let b = instance.borrow();
                (b.def.clone(), b.state.clone(), b.container, b.anchor)
            };

            let mut sub_tree = def.render(state.as_ref());
            self.patch(None, &mut sub_tree, container, anchor);

            let mut b = instance.borrow_mut();
            b.vnode.host = sub_tree.host;
            b.sub_tree = Some(sub_tree);
            b.is_mounted = true;
        } else {
            // Adopt the pending vnode inside the tracked run: the props write
            // is then a self-write, which the effect guard keeps from
            // re-queuing the job this update is already performing.
            let pending = instance.borrow_mut().pending.take();
            if let Some(mut next_vnode) = pending {
                next_vnode.host = instance.borrow().vnode.host;
                let props = instance.borrow().props.clone();
                props.set(next_vnode.props.clone());
                instance.borrow_mut().vnode = next_vnode;
            }

            let (def, state) = {
                let b = instance.borrow();
                (b.def.clone(), b.state.clone())
            };
            let prev_tree = instance
                .borrow_mut()
                .sub_tree
                .take()
                .expect("mounted component missing sub-tree");
            let prev_host = prev_tree.host.expect("mounted sub-tree missing host handle");
            let container = self
                .platform
                .parent_node(prev_host)
                .expect("mounted sub-tree detached from host");

            let mut next_tree = def.render(state.as_ref());
            self.patch(Some(&prev_tree), &mut next_tree, container, None);

            let mut b = instance.borrow_mut();
            b.vnode.host = next_tree.host;
            b.sub_tree = Some(next_tree);
        }
    }

    /// Tear an instance down: drop its queued job, retire its effect, and
    /// unmount its sub-tree.
    pub(crate) fn unmount_component(&mut self, id: ComponentId) {
        let Some(instance) = self.instances.remove(&id) else {
            return;
        };
        let sub_tree = {
            let mut b = instance.borrow_mut();
            scheduler::invalidate_job(b.uid);
            b.effect.stop();
            b.sub_tree.take()
        };
        if let Some(sub_tree) = sub_tree {
            self.unmount(&sub_tree);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use crate::renderer::Renderer;
    use crate::scheduler::{flush_jobs, pending_count};
    use crate::vnode::PropValue;
    use std::cell::Cell;

    /// Renders its signal's value into a div; counts render calls.
    struct Counter {
        count: Signal<i64>,
        renders: Rc<Cell<usize>>,
    }

    impl ComponentDef for Counter {
        fn setup(&self, _props: &Signal<Props>) -> Rc<dyn Any> {
            Rc::new(())
        }

        fn render(&self, _state: &dyn Any) -> VNode {
            self.renders.set(self.renders.get() + 1);
            VNode::element_with_text("div", Props::new(), self.count.get().to_string())
        }
    }

    /// Renders its `text` prop into a span.
    struct Label {
        renders: Rc<Cell<usize>>,
    }

    impl ComponentDef for Label {
        fn setup(&self, props: &Signal<Props>) -> Rc<dyn Any> {
            Rc::new(props.clone())
        }

        fn render(&self, state: &dyn Any) -> VNode {
            self.renders.set(self.renders.get() + 1);
            let props = state
                .downcast_ref::<Signal<Props>>()
                .expect("label state is its props signal");
            let text = match props.get().get("text") {
                Some(PropValue::Str(s)) => s.clone(),
                _ => String::new(),
            };
            VNode::element_with_text("span", Props::new(), text)
        }
    }

    fn setup_renderer() -> (Renderer, MemoryPlatform, HostId) {
        let platform = MemoryPlatform::new();
        let root = platform.create_root();
        let renderer = Renderer::new(Box::new(platform.clone()));
        (renderer, platform, root)
    }

    fn label_props(text: &str) -> Props {
        let mut props = Props::new();
        props.insert("text".to_string(), PropValue::from(text));
        props
    }

    #[test]
    fn test_mount_renders_sub_tree() {
        let (renderer, platform, root) = setup_renderer();
        let count = signal(0);
        let renders = Rc::new(Cell::new(0));
        let def: Rc<dyn ComponentDef> = Rc::new(Counter {
            count: count.clone(),
            renders: renders.clone(),
        });

        renderer.render(Some(VNode::component(def, Props::new())), root);

        assert_eq!(renders.get(), 1);
        let children = platform.children_of(root);
        assert_eq!(children.len(), 1);
        assert_eq!(platform.tag_of(children[0]).as_deref(), Some("div"));
        assert_eq!(platform.text_of(children[0]), "0");
    }

    #[test]
    fn test_signal_write_queues_instead_of_rendering() {
        let (renderer, platform, root) = setup_renderer();
        let count = signal(0);
        let renders = Rc::new(Cell::new(0));
        let def: Rc<dyn ComponentDef> = Rc::new(Counter {
            count: count.clone(),
            renders: renders.clone(),
        });
        renderer.render(Some(VNode::component(def, Props::new())), root);

        count.set(1);
        assert_eq!(renders.get(), 1, "write only enqueues");
        assert_eq!(pending_count(), 1);

        flush_jobs();
        assert_eq!(renders.get(), 2);
        let children = platform.children_of(root);
        assert_eq!(platform.text_of(children[0]), "1");
    }

    #[test]
    fn test_multiple_writes_coalesce_into_one_render() {
        let (renderer, platform, root) = setup_renderer();
        let count = signal(0);
        let renders = Rc::new(Cell::new(0));
        let def: Rc<dyn ComponentDef> = Rc::new(Counter {
            count: count.clone(),
            renders: renders.clone(),
        });
        renderer.render(Some(VNode::component(def, Props::new())), root);

        count.set(1);
        count.set(2);
        count.set(3);
        assert_eq!(pending_count(), 1, "duplicate jobs coalesce");

        flush_jobs();
        assert_eq!(renders.get(), 2, "one render for three writes");
        let children = platform.children_of(root);
        assert_eq!(platform.text_of(children[0]), "3");
    }

    #[test]
    fn test_parent_props_update_renders_synchronously() {
        let (renderer, platform, root) = setup_renderer();
        let renders = Rc::new(Cell::new(0));
        let def: Rc<dyn ComponentDef> = Rc::new(Label {
            renders: renders.clone(),
        });

        renderer.render(Some(VNode::component(def.clone(), label_props("a"))), root);
        let span = platform.children_of(root)[0];
        assert_eq!(platform.text_of(span), "a");

        renderer.render(Some(VNode::component(def, label_props("b"))), root);
        assert_eq!(renders.get(), 2, "props update renders in place");
        assert_eq!(
            platform.children_of(root),
            vec![span],
            "same instance, same host node"
        );
        assert_eq!(platform.text_of(span), "b");
        assert_eq!(pending_count(), 0, "the props write must not leave a job queued");
    }

    #[test]
    fn test_props_update_supersedes_queued_self_update() {
        let (renderer, platform, root) = setup_renderer();
        let count = signal(0);
        let renders = Rc::new(Cell::new(0));
        let def: Rc<dyn ComponentDef> = Rc::new(Counter {
            count: count.clone(),
            renders: renders.clone(),
        });
        renderer.render(Some(VNode::component(def.clone(), Props::new())), root);

        count.set(5);
        assert_eq!(pending_count(), 1);

        // The parent update drops the queued duplicate and renders now.
        renderer.render(Some(VNode::component(def, Props::new())), root);
        assert_eq!(renders.get(), 2);
        assert_eq!(pending_count(), 0);

        flush_jobs();
        assert_eq!(renders.get(), 2, "no second render for the superseded job");
        let children = platform.children_of(root);
        assert_eq!(platform.text_of(children[0]), "5");
    }

    #[test]
    fn test_unmount_cancels_job_and_stops_effect() {
        let (renderer, platform, root) = setup_renderer();
        let count = signal(0);
        let renders = Rc::new(Cell::new(0));
        let def: Rc<dyn ComponentDef> = Rc::new(Counter {
            count: count.clone(),
            renders: renders.clone(),
        });
        renderer.render(Some(VNode::component(def, Props::new())), root);

        count.set(1);
        assert_eq!(pending_count(), 1);

        renderer.render(None, root);
        assert_eq!(pending_count(), 0, "unmount drops the queued job");
        assert!(platform.children_of(root).is_empty());

        count.set(2);
        assert_eq!(pending_count(), 0, "stopped effect no longer invalidates");

        flush_jobs();
        assert_eq!(renders.get(), 1, "no render after teardown");
    }
}
