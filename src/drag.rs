//! Single-pointer drag sessions.
//!
//! Only one drag may run at a time across every controller that shares a
//! [`DragCoordinator`]. A controller holds a [`DragLease`] for the lifetime
//! of its session; dropping the lease releases the coordinator, so the
//! flag cannot leak through an early return or a panic in the caller.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::geometry::{Point, Vector};

#[derive(Debug, Default)]
struct Holder {
    generation: u64,
    last_activity: Option<Instant>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    next_generation: u64,
    holder: Option<Holder>,
}

/// Arbiter for the one active drag.
#[derive(Debug, Default)]
pub struct DragCoordinator {
    state: RefCell<CoordinatorState>,
    watchdog: Option<Duration>,
}

impl DragCoordinator {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A coordinator that lets a new drag reclaim a session which has seen
    /// no pointer activity for `idle`.
    pub fn with_watchdog(idle: Duration) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::default(),
            watchdog: Some(idle),
        })
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().holder.is_some()
    }

    /// Text selection and native drag-and-drop should be ignored by the
    /// host while this is true.
    pub fn selection_suppressed(&self) -> bool {
        self.is_active()
    }

    /// Take the drag flag, or `None` if another session holds it.
    pub fn try_acquire(self: &Rc<Self>) -> Option<DragLease> {
        let mut state = self.state.borrow_mut();
        if let Some(holder) = &state.holder {
            let stale = match (self.watchdog, holder.last_activity) {
                (Some(idle), Some(at)) => at.elapsed() >= idle,
                _ => false,
            };
            if !stale {
                return None;
            }
            warn!(
                "reclaiming drag session {} after {:?} without pointer activity",
                holder.generation,
                self.watchdog.unwrap_or_default()
            );
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        state.holder = Some(Holder {
            generation,
            last_activity: Some(Instant::now()),
        });
        Some(DragLease {
            coordinator: Rc::clone(self),
            generation,
        })
    }

    fn holds(&self, generation: u64) -> bool {
        matches!(&self.state.borrow().holder, Some(h) if h.generation == generation)
    }

    fn touch(&self, generation: u64) {
        if let Some(h) = self.state.borrow_mut().holder.as_mut() {
            if h.generation == generation {
                h.last_activity = Some(Instant::now());
            }
        }
    }

    fn release(&self, generation: u64) {
        let mut state = self.state.borrow_mut();
        if matches!(&state.holder, Some(h) if h.generation == generation) {
            state.holder = None;
        }
    }
}

/// Proof of owning the active drag. Released on drop.
#[derive(Debug)]
pub struct DragLease {
    coordinator: Rc<DragCoordinator>,
    generation: u64,
}

impl DragLease {
    /// False once a watchdog handed the flag to somebody else.
    pub fn is_current(&self) -> bool {
        self.coordinator.holds(self.generation)
    }
}

impl Drop for DragLease {
    fn drop(&mut self) {
        self.coordinator.release(self.generation);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
}

#[derive(Debug)]
struct ActiveDrag<S> {
    lease: DragLease,
    origin: Point,
    session: S,
}

/// Start/move/end state machine over one pointer.
///
/// `S` is whatever the owner snapshots when the drag starts; it comes back
/// on every tick and is handed over when the drag ends.
#[derive(Debug)]
pub struct PointerDragController<S> {
    coordinator: Rc<DragCoordinator>,
    active: Option<ActiveDrag<S>>,
}

impl<S> PointerDragController<S> {
    pub fn new(coordinator: Rc<DragCoordinator>) -> Self {
        Self {
            coordinator,
            active: None,
        }
    }

    pub fn coordinator(&self) -> &Rc<DragCoordinator> {
        &self.coordinator
    }

    pub fn phase(&self) -> DragPhase {
        if self.active.is_some() {
            DragPhase::Dragging
        } else {
            DragPhase::Idle
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Pointer down. `start` builds the session snapshot and only runs when
    /// the drag flag is free; returns whether a drag began.
    pub fn begin(&mut self, origin: Point, start: impl FnOnce() -> S) -> bool {
        if self.active.is_some() {
            return false;
        }
        let Some(lease) = self.coordinator.try_acquire() else {
            debug!("drag at ({}, {}) ignored: another drag is active", origin.x, origin.y);
            return false;
        };
        self.active = Some(ActiveDrag {
            lease,
            origin,
            session: start(),
        });
        true
    }

    /// Pointer move. Returns the session and the travel since `begin`.
    pub fn update(&mut self, at: Point) -> Option<(&S, Vector)> {
        self.drop_if_revoked();
        let active = self.active.as_ref()?;
        active.lease.coordinator.touch(active.lease.generation);
        Some((&active.session, at - active.origin))
    }

    /// Pointer up. The drag flag is already released when this returns.
    pub fn finish(&mut self, at: Point) -> Option<(S, Vector)> {
        self.drop_if_revoked();
        let ActiveDrag {
            lease,
            origin,
            session,
        } = self.active.take()?;
        drop(lease);
        Some((session, at - origin))
    }

    /// Abandon the current drag without reporting an end.
    pub fn cancel(&mut self) -> Option<S> {
        self.active.take().map(|active| active.session)
    }

    fn drop_if_revoked(&mut self) {
        if self.active.as_ref().is_some_and(|a| !a.lease.is_current()) {
            debug!("drag session revoked by the coordinator");
            self.active = None;
        }
    }
}
