//! Reactive Effect primitive - dependency tracking with pluggable invalidation.
//!
//! This is the narrow reactivity interface the reconciler consumes: a
//! [`Signal`] whose tracked reads subscribe the currently running
//! [`ReactiveEffect`], and an effect whose dependency writes invoke its
//! *invalidation callback* rather than re-running the computation. The
//! renderer points that callback at the scheduler, which is what makes
//! multiple synchronous writes coalesce into a single re-render.
//!
//! # Tracking contract
//!
//! - `ReactiveEffect::run(f)` drops all previously registered dependencies,
//!   then records a fresh subscription for every `Signal::get` performed by
//!   `f`. Tracking is re-registered from scratch on every run.
//! - Effects nest: a parent component's update runs a child's effect
//!   synchronously, and the outer effect is restored afterward.
//! - A write made by the effect that is currently running does not
//!   re-invalidate that effect (a render adopting its own new props must not
//!   schedule itself again).
//! - `stop()` unsubscribes from everything and retires the effect; later
//!   triggers are no-ops.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

// =============================================================================
// Registry State
// =============================================================================

/// Identity of a reactive effect.
pub type EffectId = u64;

struct EffectEntry {
    /// Invoked (instead of the computation) when a dependency changes.
    invalidate: Rc<dyn Fn()>,
    /// Dependencies subscribed during the last run, for cleanup on re-run.
    deps: Vec<Weak<DepInner>>,
}

thread_local! {
    /// Stack of currently running effects; the top receives tracked reads.
    static ACTIVE_STACK: RefCell<Vec<EffectId>> = const { RefCell::new(Vec::new()) };

    /// Live effects by id.
    static EFFECTS: RefCell<HashMap<EffectId, EffectEntry>> = RefCell::new(HashMap::new());

    /// Counter for effect ids.
    static NEXT_EFFECT_ID: Cell<EffectId> = const { Cell::new(1) };
}

fn current_effect() -> Option<EffectId> {
    ACTIVE_STACK.with(|stack| stack.borrow().last().copied())
}

/// Remove `id` from every dependency it subscribed to during its last run.
fn cleanup_deps(id: EffectId) {
    let deps = EFFECTS.with(|effects| {
        effects
            .borrow_mut()
            .get_mut(&id)
            .map(|entry| std::mem::take(&mut entry.deps))
    });
    if let Some(deps) = deps {
        for dep in deps {
            if let Some(dep) = dep.upgrade() {
                dep.subscribers.borrow_mut().remove(&id);
            }
        }
    }
}

// =============================================================================
// Dependencies
// =============================================================================

struct DepInner {
    subscribers: RefCell<HashSet<EffectId>>,
}

/// A tracked dependency: the set of effects subscribed to one reactive cell.
#[derive(Clone)]
struct Dep {
    inner: Rc<DepInner>,
}

impl Dep {
    fn new() -> Self {
        Dep {
            inner: Rc::new(DepInner {
                subscribers: RefCell::new(HashSet::new()),
            }),
        }
    }

    /// Subscribe the currently running effect, if any.
    fn track(&self) {
        let Some(active) = current_effect() else {
            return;
        };
        let newly_added = self.inner.subscribers.borrow_mut().insert(active);
        if newly_added {
            EFFECTS.with(|effects| {
                if let Some(entry) = effects.borrow_mut().get_mut(&active) {
                    entry.deps.push(Rc::downgrade(&self.inner));
                }
            });
        }
    }

    /// Invoke the invalidation callback of every subscriber except the
    /// effect currently running (self-trigger guard).
    fn trigger(&self) {
        let current = current_effect();
        let subscribers: Vec<EffectId> =
            self.inner.subscribers.borrow().iter().copied().collect();

        // Collect callbacks first so no registry borrow is held while they run.
        let mut callbacks: Vec<Rc<dyn Fn()>> = Vec::new();
        EFFECTS.with(|effects| {
            let effects = effects.borrow();
            for id in subscribers {
                if Some(id) == current {
                    continue;
                }
                if let Some(entry) = effects.get(&id) {
                    callbacks.push(entry.invalidate.clone());
                }
            }
        });

        for callback in callbacks {
            callback();
        }
    }
}

// =============================================================================
// ReactiveEffect
// =============================================================================

/// A reactive computation handle.
///
/// The effect itself is registry-backed; this handle is a cheap clone of its
/// id. Dependency writes call the invalidation callback passed to [`new`],
/// never the computation - scheduling the re-run is the callback's job.
///
/// [`new`]: ReactiveEffect::new
#[derive(Clone)]
pub struct ReactiveEffect {
    id: EffectId,
}

impl ReactiveEffect {
    /// Register a new effect with the given invalidation callback.
    pub fn new(invalidate: impl Fn() + 'static) -> Self {
        let id = NEXT_EFFECT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        EFFECTS.with(|effects| {
            effects.borrow_mut().insert(
                id,
                EffectEntry {
                    invalidate: Rc::new(invalidate),
                    deps: Vec::new(),
                },
            );
        });
        ReactiveEffect { id }
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Whether the effect has not been stopped.
    pub fn is_active(&self) -> bool {
        EFFECTS.with(|effects| effects.borrow().contains_key(&self.id))
    }

    /// Run `f` with this effect active, re-registering dependency tracking
    /// from scratch for every reactive read `f` performs.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        cleanup_deps(self.id);
        ACTIVE_STACK.with(|stack| stack.borrow_mut().push(self.id));

        // Restore the outer effect even if `f` unwinds; a propagated render
        // panic must not leave tracking attributed to a dead frame.
        struct PopGuard;
        impl Drop for PopGuard {
            fn drop(&mut self) {
                ACTIVE_STACK.with(|stack| {
                    stack.borrow_mut().pop();
                });
            }
        }
        let _guard = PopGuard;

        f()
    }

    /// Unsubscribe from all dependencies and retire the effect.
    /// Safe to call more than once.
    pub fn stop(&self) {
        cleanup_deps(self.id);
        EFFECTS.with(|effects| {
            effects.borrow_mut().remove(&self.id);
        });
    }
}

// =============================================================================
// Signal
// =============================================================================

/// A reactive value cell.
///
/// Clones share the same cell. `get` tracks, `peek` does not, and `set`
/// skips the trigger when the value is unchanged.
pub struct Signal<T> {
    value: Rc<RefCell<T>>,
    dep: Dep,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal {
            value: self.value.clone(),
            dep: self.dep.clone(),
        }
    }
}

impl<T: Clone> Signal<T> {
    /// Read the value, subscribing the currently running effect.
    pub fn get(&self) -> T {
        self.dep.track();
        self.value.borrow().clone()
    }

    /// Read the value without tracking.
    pub fn peek(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: Clone + PartialEq> Signal<T> {
    /// Write the value, invalidating subscribers. Equal values are a no-op.
    pub fn set(&self, next: T) {
        if *self.value.borrow() == next {
            return;
        }
        *self.value.borrow_mut() = next;
        self.dep.trigger();
    }
}

impl<T> Signal<T> {
    /// Mutate the value in place and invalidate subscribers unconditionally.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
        self.dep.trigger();
    }
}

/// Create a new signal.
pub fn signal<T>(value: T) -> Signal<T> {
    Signal {
        value: Rc::new(RefCell::new(value)),
        dep: Dep::new(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_not_computation() {
        let count = signal(0);
        let invalidations = Rc::new(Cell::new(0));

        let inv = invalidations.clone();
        let effect = ReactiveEffect::new(move || inv.set(inv.get() + 1));

        let count_read = count.clone();
        effect.run(|| {
            let _ = count_read.get();
        });

        assert_eq!(invalidations.get(), 0, "running the effect does not invalidate");

        count.set(1);
        assert_eq!(invalidations.get(), 1, "a write invokes the callback once");
        count.set(2);
        assert_eq!(invalidations.get(), 2);
    }

    #[test]
    fn test_equal_set_is_skipped() {
        let value = signal(7);
        let invalidations = Rc::new(Cell::new(0));

        let inv = invalidations.clone();
        let effect = ReactiveEffect::new(move || inv.set(inv.get() + 1));
        let reader = value.clone();
        effect.run(|| {
            let _ = reader.get();
        });

        value.set(7);
        assert_eq!(invalidations.get(), 0, "writing the same value is a no-op");
        value.set(8);
        assert_eq!(invalidations.get(), 1);
    }

    #[test]
    fn test_tracking_reregisters_each_run() {
        let a = signal(0);
        let b = signal(0);
        let use_a = signal(true);
        let invalidations = Rc::new(Cell::new(0));

        let inv = invalidations.clone();
        let effect = ReactiveEffect::new(move || inv.set(inv.get() + 1));

        let run = {
            let (a, b, use_a) = (a.clone(), b.clone(), use_a.clone());
            move || {
                if use_a.get() {
                    let _ = a.get();
                } else {
                    let _ = b.get();
                }
            }
        };

        effect.run(run.clone());
        b.set(1);
        assert_eq!(invalidations.get(), 0, "untracked branch does not invalidate");
        a.set(1);
        assert_eq!(invalidations.get(), 1);

        // Switch the tracked branch and re-run: a must no longer invalidate.
        use_a.set(false);
        effect.run(run);
        a.set(2);
        assert_eq!(invalidations.get(), 2, "stale dependency was dropped");
        b.set(2);
        assert_eq!(invalidations.get(), 3, "fresh dependency is live");
    }

    #[test]
    fn test_self_trigger_guard() {
        let value = signal(0);
        let invalidations = Rc::new(Cell::new(0));

        let inv = invalidations.clone();
        let effect = ReactiveEffect::new(move || inv.set(inv.get() + 1));

        let inner = value.clone();
        effect.run(|| {
            let _ = inner.get();
            inner.set(99); // write by the running effect itself
        });

        assert_eq!(
            invalidations.get(),
            0,
            "an effect's own write must not invalidate it"
        );

        value.set(100);
        assert_eq!(invalidations.get(), 1, "outside writes still invalidate");
    }

    #[test]
    fn test_nested_effects_restore_outer() {
        let outer_dep = signal(0);
        let inner_dep = signal(0);
        let outer_hits = Rc::new(Cell::new(0));
        let inner_hits = Rc::new(Cell::new(0));

        let oh = outer_hits.clone();
        let outer = ReactiveEffect::new(move || oh.set(oh.get() + 1));
        let ih = inner_hits.clone();
        let inner = ReactiveEffect::new(move || ih.set(ih.get() + 1));

        let (od, id) = (outer_dep.clone(), inner_dep.clone());
        outer.run(|| {
            inner.run(|| {
                let _ = id.get();
            });
            // Read after the nested run: must track the OUTER effect.
            let _ = od.get();
        });

        outer_dep.set(1);
        assert_eq!(outer_hits.get(), 1);
        assert_eq!(inner_hits.get(), 0);

        inner_dep.set(1);
        assert_eq!(inner_hits.get(), 1);
        assert_eq!(outer_hits.get(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let value = signal(0);
        let invalidations = Rc::new(Cell::new(0));

        let inv = invalidations.clone();
        let effect = ReactiveEffect::new(move || inv.set(inv.get() + 1));
        let reader = value.clone();
        effect.run(|| {
            let _ = reader.get();
        });

        assert!(effect.is_active());
        effect.stop();
        effect.stop();
        assert!(!effect.is_active());

        value.set(1);
        assert_eq!(invalidations.get(), 0, "stopped effects never fire");
    }

    #[test]
    fn test_peek_does_not_track() {
        let value = signal(0);
        let invalidations = Rc::new(Cell::new(0));

        let inv = invalidations.clone();
        let effect = ReactiveEffect::new(move || inv.set(inv.get() + 1));
        let reader = value.clone();
        effect.run(|| {
            let _ = reader.peek();
        });

        value.set(1);
        assert_eq!(invalidations.get(), 0);
    }
}
