// ============================================================================
// spark-store - Reference Component Runtime
//
// A minimal host implementing `Hooks`: one render function, hook slots
// matched by call order, effects committed after each render, and
// synchronous re-render when a state cell is set.
// ============================================================================
//
// Render cycle:
// 1. Reset the hook cursor and call the render function with a `Scope`
// 2. Commit: for every effect whose deps changed, run the previous cleanup,
//    then the new setup, and keep the cleanup it returns
// 3. If a cell was set during 1 or 2, render again (bounded by RENDER_LIMIT)
//
// Setting a cell outside of a render re-renders immediately. After
// `unmount()` every cleanup has run and later sets are ignored.
// ============================================================================

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use super::{Deps, HostError, Hooks, ValueCell};
use crate::core::types::CleanupFn;

/// Renders allowed in one pass before giving up.
pub const RENDER_LIMIT: usize = 25;

type RenderFn = Box<dyn FnMut(&Scope<'_>)>;
type SetupFn = Box<dyn FnOnce() -> Option<CleanupFn>>;

// =============================================================================
// HOOK SLOTS
// =============================================================================

enum Hook {
    /// `Rc<StateSlot<S>>`
    State(Rc<dyn Any>),
    Effect {
        deps: Deps,
        cleanup: Option<CleanupFn>,
    },
}

struct StateSlot<S> {
    value: RefCell<S>,
    revision: Cell<u64>,
}

struct PendingEffect {
    index: usize,
    deps: Deps,
    setup: SetupFn,
}

// =============================================================================
// CORE
// =============================================================================

struct Core {
    render: RefCell<Option<RenderFn>>,
    hooks: RefCell<Vec<Hook>>,
    pending: RefCell<Vec<PendingEffect>>,
    cursor: Cell<usize>,
    renders: Cell<u64>,
    rendering: Cell<bool>,
    dirty: Cell<bool>,
    mounted: Cell<bool>,
    /// First hook error raised by the render in progress
    render_error: RefCell<Option<HostError>>,
    /// Last error from a re-render nobody could return it to
    last_error: RefCell<Option<HostError>>,
}

impl Core {
    fn new(render: RenderFn) -> Rc<Self> {
        Rc::new(Self {
            render: RefCell::new(Some(render)),
            hooks: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
            cursor: Cell::new(0),
            renders: Cell::new(0),
            rendering: Cell::new(false),
            dirty: Cell::new(false),
            mounted: Cell::new(true),
            render_error: RefCell::new(None),
            last_error: RefCell::new(None),
        })
    }

    fn advance(&self) -> usize {
        let index = self.cursor.get();
        self.cursor.set(index + 1);
        index
    }

    fn report(&self, error: HostError) {
        let mut slot = self.render_error.borrow_mut();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    /// Put `hook` at `index`, returning whatever was there.
    fn replace_hook(&self, index: usize, hook: Hook) -> Option<Hook> {
        let mut hooks = self.hooks.borrow_mut();
        if index < hooks.len() {
            Some(std::mem::replace(&mut hooks[index], hook))
        } else {
            hooks.push(hook);
            None
        }
    }

    /// Render until no cell was set during the pass.
    fn run(self: &Rc<Self>) -> Result<(), HostError> {
        if !self.mounted.get() {
            return Err(HostError::Unmounted);
        }
        if self.rendering.get() {
            self.dirty.set(true);
            return Ok(());
        }

        struct RenderingGuard<'a>(&'a Core);

        impl Drop for RenderingGuard<'_> {
            fn drop(&mut self) {
                self.0.rendering.set(false);
                if std::thread::panicking() {
                    // Effects queued by the aborted render must not run later
                    self.0.pending.borrow_mut().clear();
                    self.0.render_error.borrow_mut().take();
                }
            }
        }

        self.rendering.set(true);
        let _guard = RenderingGuard(self);
        let mut result = Ok(());
        let mut passes = 0;
        loop {
            if passes == RENDER_LIMIT {
                self.dirty.set(false);
                result = Err(HostError::TooManyRenders {
                    limit: RENDER_LIMIT,
                });
                break;
            }
            passes += 1;
            self.dirty.set(false);

            if let Err(error) = self.render_once() {
                if result.is_ok() {
                    result = Err(error);
                }
            }
            self.commit();

            if !self.dirty.get() || !self.mounted.get() {
                break;
            }
        }
        result
    }

    fn render_once(self: &Rc<Self>) -> Result<(), HostError> {
        let previous = self.hooks.borrow().len();
        let first = self.renders.get() == 0;
        self.cursor.set(0);

        struct RenderSlot<'a> {
            core: &'a Core,
            render: Option<RenderFn>,
        }

        impl Drop for RenderSlot<'_> {
            fn drop(&mut self) {
                if self.core.mounted.get() {
                    *self.core.render.borrow_mut() = self.render.take();
                }
            }
        }

        let Some(render) = self.render.borrow_mut().take() else {
            return Ok(());
        };
        let mut slot = RenderSlot {
            core: self,
            render: Some(render),
        };
        if let Some(render) = slot.render.as_mut() {
            render(&Scope { core: self });
        }
        drop(slot);

        self.renders.set(self.renders.get() + 1);
        trace!(
            render = self.renders.get(),
            hooks = self.cursor.get(),
            "component rendered"
        );

        if let Some(error) = self.render_error.borrow_mut().take() {
            return Err(error);
        }

        let found = self.cursor.get();
        if !first && found < previous {
            // Slots past the cursor belong to hooks this render skipped
            let stale: Vec<Hook> = self.hooks.borrow_mut().drain(found..).collect();
            run_cleanups(stale);
        }
        if !first && found != previous {
            return Err(HostError::HookCountChanged {
                expected: previous,
                found,
            });
        }
        Ok(())
    }

    fn commit(&self) {
        let pending: Vec<PendingEffect> = self.pending.borrow_mut().drain(..).collect();

        for effect in pending {
            if !self.mounted.get() {
                break;
            }

            let previous = match self.hooks.borrow_mut().get_mut(effect.index) {
                Some(Hook::Effect { deps, cleanup }) => {
                    *deps = effect.deps;
                    cleanup.take()
                }
                _ => continue,
            };
            if let Some(cleanup) = previous {
                cleanup();
            }

            let cleanup = (effect.setup)();
            let orphan = if self.mounted.get() {
                self.store_cleanup(effect.index, cleanup)
            } else {
                cleanup
            };
            if let Some(cleanup) = orphan {
                cleanup();
            }
        }
    }

    /// Keep `cleanup` in the effect slot at `index`; hands it back if the
    /// slot is gone.
    fn store_cleanup(&self, index: usize, cleanup: Option<CleanupFn>) -> Option<CleanupFn> {
        match self.hooks.borrow_mut().get_mut(index) {
            Some(Hook::Effect { cleanup: slot, .. }) => {
                *slot = cleanup;
                None
            }
            _ => cleanup,
        }
    }

    fn invalidate(self: &Rc<Self>) {
        if let Err(error) = self.run() {
            error!(%error, "component re-render failed");
            *self.last_error.borrow_mut() = Some(error);
        }
    }

    fn unmount(&self) {
        if !self.mounted.replace(false) {
            return;
        }

        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        drop(pending);

        let hooks = std::mem::take(&mut *self.hooks.borrow_mut());
        trace!(hooks = hooks.len(), "component unmounting");
        run_cleanups(hooks);

        let render = self.render.borrow_mut().take();
        drop(render);
    }
}

/// Run effect cleanups in reverse registration order.
fn run_cleanups(hooks: Vec<Hook>) {
    let cleanups: Vec<CleanupFn> = hooks
        .into_iter()
        .filter_map(|hook| match hook {
            Hook::Effect { cleanup, .. } => cleanup,
            Hook::State(_) => None,
        })
        .collect();

    for cleanup in cleanups.into_iter().rev() {
        cleanup();
    }
}

// =============================================================================
// SCOPE
// =============================================================================

/// The [`Hooks`] implementation handed to a render function.
pub struct Scope<'a> {
    core: &'a Rc<Core>,
}

impl Scope<'_> {
    /// Renders completed before this one.
    pub fn render_count(&self) -> u64 {
        self.core.renders.get()
    }
}

impl Hooks for Scope<'_> {
    type Cell<S: Clone + 'static> = StateCell<S>;

    fn use_state<S: Clone + 'static>(&self, init: impl FnOnce() -> S) -> StateCell<S> {
        let index = self.core.advance();

        let existing = self.core.hooks.borrow().get(index).map(|hook| match hook {
            Hook::State(slot) => slot.clone().downcast::<StateSlot<S>>().ok(),
            Hook::Effect { .. } => None,
        });

        let slot = match existing {
            Some(Some(slot)) => slot,
            found => {
                if found.is_some() {
                    self.core.report(HostError::HookMismatch {
                        index,
                        expected: type_name::<S>(),
                    });
                }
                let slot = Rc::new(StateSlot {
                    value: RefCell::new(init()),
                    revision: Cell::new(0),
                });
                if let Some(replaced) = self.core.replace_hook(index, Hook::State(slot.clone())) {
                    run_cleanups(vec![replaced]);
                }
                slot
            }
        };

        StateCell {
            slot,
            owner: Rc::downgrade(self.core),
        }
    }

    fn use_effect(&self, deps: Deps, setup: impl FnOnce() -> Option<CleanupFn> + 'static) {
        let index = self.core.advance();

        let changed = match self.core.hooks.borrow().get(index) {
            Some(Hook::Effect { deps: previous, .. }) => Some(*previous != deps),
            Some(Hook::State(_)) => {
                self.core.report(HostError::HookMismatch {
                    index,
                    expected: "effect",
                });
                None
            }
            None => None,
        };

        let changed = changed.unwrap_or_else(|| {
            let placeholder = Hook::Effect {
                deps: Deps::new(),
                cleanup: None,
            };
            // A replaced state slot has nothing to clean up
            drop(self.core.replace_hook(index, placeholder));
            true
        });

        if changed {
            self.core.pending.borrow_mut().push(PendingEffect {
                index,
                deps,
                setup: Box::new(setup),
            });
        }
    }
}

// =============================================================================
// STATE CELL
// =============================================================================

/// Remembered value owned by one component.
pub struct StateCell<S> {
    slot: Rc<StateSlot<S>>,
    owner: Weak<Core>,
}

impl<S> Clone for StateCell<S> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            owner: self.owner.clone(),
        }
    }
}

impl<S: Clone + 'static> ValueCell<S> for StateCell<S> {
    fn get(&self) -> S {
        self.slot.value.borrow().clone()
    }

    fn set(&self, value: S) {
        let Some(owner) = self.owner.upgrade() else {
            debug!("state set after its component was dropped; ignoring");
            return;
        };
        if !owner.mounted.get() {
            debug!("state set on an unmounted component; ignoring");
            return;
        }

        *self.slot.value.borrow_mut() = value;
        self.slot.revision.set(self.slot.revision.get() + 1);
        owner.invalidate();
    }

    fn revision(&self) -> u64 {
        self.slot.revision.get()
    }
}

// =============================================================================
// COMPONENT
// =============================================================================

/// A mounted consumer.
///
/// Dropping the component unmounts it.
///
/// # Example
///
/// ```
/// use spark_store::host::{Component, Hooks, ValueCell};
///
/// let component = Component::mount(|scope| {
///     let clicks = scope.use_state(|| 0);
///     clicks.get()
/// })
/// .unwrap();
///
/// assert_eq!(component.output(), Some(0));
/// assert_eq!(component.render_count(), 1);
/// ```
pub struct Component<R> {
    core: Rc<Core>,
    output: Rc<RefCell<Option<R>>>,
}

impl<R: 'static> Component<R> {
    /// Render once and commit effects.
    pub fn mount(mut render: impl FnMut(&Scope<'_>) -> R + 'static) -> Result<Self, HostError> {
        let output = Rc::new(RefCell::new(None));
        let core = Core::new(Box::new({
            let output = output.clone();
            move |scope: &Scope<'_>| {
                let rendered = render(scope);
                *output.borrow_mut() = Some(rendered);
            }
        }));

        let component = Self { core, output };
        component.core.run()?;
        Ok(component)
    }

    /// Render again regardless of state changes.
    pub fn rerender(&self) -> Result<(), HostError> {
        self.core.run()
    }

    /// Value returned by the latest render.
    pub fn output(&self) -> Option<R>
    where
        R: Clone,
    {
        self.output.borrow().clone()
    }

    /// Completed renders.
    pub fn render_count(&self) -> u64 {
        self.core.renders.get()
    }

    /// `false` once [`unmount`](Self::unmount) has run or the component was
    /// dropped.
    pub fn is_mounted(&self) -> bool {
        self.core.mounted.get()
    }

    /// Error from the latest re-render triggered by a state cell.
    pub fn last_error(&self) -> Option<HostError> {
        self.core.last_error.borrow().clone()
    }

    /// Run every effect cleanup and stop reacting to state cells.
    pub fn unmount(&self) {
        self.core.unmount();
    }
}

impl<R> Drop for Component<R> {
    fn drop(&mut self) {
        self.core.unmount();
    }
}

impl<R> fmt::Debug for Component<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("renders", &self.core.renders.get())
            .field("hooks", &self.core.hooks.borrow().len())
            .field("mounted", &self.core.mounted.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
