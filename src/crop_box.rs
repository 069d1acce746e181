//! The crop box: its rectangle, the drags that move and resize it, and
//! the initial placement inside the fitted image.

use std::rc::Rc;

use log::{debug, trace};

use crate::config::sanitize_aspect_ratio;
use crate::drag::{DragCoordinator, PointerDragController};
use crate::geometry::{
    AspectMode, Point, Rect, Size, apply_aspect_correction, clamp_to_containment,
};
use crate::resize::{Direction, Handle, SizeConstraints, compute_resize};

/// What the pointer grabbed on pointer down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabTarget {
    /// The box itself: translate without resizing.
    Body,
    Handle(Handle),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CropBoxEvent {
    /// The rectangle changed during a drag or a reset.
    StateChanged(Rect),
    /// A drag was released, or a reset committed a new rectangle.
    DragEnded(Rect),
}

/// Caller-requested placement for [`CropBoxController::reset`]. Missing or
/// non-positive values fall back to computed defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InitialGeometry {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Clone, Copy, Debug)]
struct DragSession {
    target: GrabTarget,
    start_rect: Rect,
    containment: Rect,
}

/// Owns the crop rectangle, expressed in the fitted image's local space.
#[derive(Debug)]
pub struct CropBoxController {
    rect: Rect,
    bounds: Size,
    aspect_ratio: Option<f64>,
    constraints: SizeConstraints,
    drag: PointerDragController<DragSession>,
}

impl CropBoxController {
    pub fn new(
        coordinator: Rc<DragCoordinator>,
        aspect_ratio: Option<f64>,
        constraints: SizeConstraints,
    ) -> Self {
        Self {
            rect: Rect::ZERO,
            bounds: Size::ZERO,
            aspect_ratio: aspect_ratio.map(sanitize_aspect_ratio),
            constraints,
            drag: PointerDragController::new(coordinator),
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Size of the fitted image the box lives in.
    pub fn bounds(&self) -> Size {
        self.bounds
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        self.aspect_ratio
    }

    /// An unusable ratio falls back to 1. Ends any active drag.
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) {
        self.abandon_drag();
        self.aspect_ratio = ratio.map(sanitize_aspect_ratio);
    }

    pub fn constraints(&self) -> &SizeConstraints {
        &self.constraints
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn coordinator(&self) -> &Rc<DragCoordinator> {
        self.drag.coordinator()
    }

    /// Ends any active drag: its snapshot belongs to the old bounds.
    pub fn set_bounds(&mut self, bounds: Size) {
        self.abandon_drag();
        self.bounds = bounds;
    }

    /// Place the box from `initial`, correcting whatever doesn't fit.
    pub fn reset(&mut self, initial: &InitialGeometry) -> [CropBoxEvent; 2] {
        self.abandon_drag();
        let bounds = self.bounds;
        let ratio = self.aspect_ratio.unwrap_or(1.0);

        let mut width = match positive(initial.width) {
            Some(w) => w.min(bounds.width),
            None => bounds.width / 2.0,
        };
        let mut height = match positive(initial.height) {
            Some(h) => h,
            None => width / ratio,
        }
        .min(bounds.height);

        if let Some(ratio) = self.aspect_ratio {
            if width > 0.0 && height > 0.0 {
                (width, height) = apply_aspect_correction(width, height, ratio, AspectMode::Corner);
            }
        }

        let left = place(initial.x, bounds.width, width);
        let top = place(initial.y, bounds.height, height);

        self.rect = Rect::new(left, top, width, height);
        debug!("crop box reset to {:?} inside {:?}", self.rect, bounds);
        [
            CropBoxEvent::StateChanged(self.rect),
            CropBoxEvent::DragEnded(self.rect),
        ]
    }

    /// Follow a change of the fitted image's size, keeping the box over
    /// the same part of the image.
    pub fn refit(&mut self, bounds: Size) -> CropBoxEvent {
        self.abandon_drag();
        if self.bounds.width > 0.0 {
            let factor = bounds.width / self.bounds.width;
            self.rect = self.rect.scale(factor);
        }
        self.bounds = bounds;
        self.rect = clamp_to_containment(self.rect, &Rect::from_size(bounds));
        CropBoxEvent::StateChanged(self.rect)
    }

    pub fn pointer_down(&mut self, target: GrabTarget, at: Point) -> bool {
        let start_rect = self.rect;
        let containment = Rect::from_size(self.bounds);
        let started = self.drag.begin(at, || DragSession {
            target,
            start_rect,
            containment,
        });
        if started {
            debug!("drag started on {target:?} at ({}, {})", at.x, at.y);
        }
        started
    }

    pub fn pointer_move(&mut self, at: Point) -> Option<CropBoxEvent> {
        let (session, delta) = self.drag.update(at)?;
        let session = *session;
        self.rect = match session.target {
            GrabTarget::Body => {
                translate_within(session.start_rect, &session.containment, delta.dx, delta.dy)
            }
            GrabTarget::Handle(handle) => compute_resize(
                handle.direction,
                delta,
                session.start_rect,
                &session.containment,
                self.aspect_ratio,
                &self.constraints,
            ),
        };
        trace!("{:?} dragged by {:?} -> {:?}", session.target, delta, self.rect);
        Some(CropBoxEvent::StateChanged(self.rect))
    }

    /// The rectangle stays where the last move left it.
    pub fn pointer_up(&mut self, at: Point) -> Option<CropBoxEvent> {
        let (session, _) = self.drag.finish(at)?;
        debug!("drag on {:?} ended at {:?}", session.target, self.rect);
        Some(CropBoxEvent::DragEnded(self.rect))
    }

    /// Drop the active drag and put the box back where it started.
    pub fn cancel(&mut self) -> Option<CropBoxEvent> {
        let session = self.drag.cancel()?;
        self.rect = session.start_rect;
        debug!("drag on {:?} cancelled", session.target);
        Some(CropBoxEvent::StateChanged(self.rect))
    }

    /// Drop the active drag without touching the rectangle. Later moves
    /// and the release are ignored.
    fn abandon_drag(&mut self) {
        if let Some(session) = self.drag.cancel() {
            debug!("drag on {:?} abandoned by a reset", session.target);
        }
    }

    /// Find what sits under `p` (fitted-image local coordinates).
    pub fn hit_test(&self, p: Point, tolerance: f64) -> Option<GrabTarget> {
        let r = self.rect;
        let (left, top, right, bottom) = (r.left, r.top, r.right(), r.bottom());
        let (mid_x, mid_y) = (r.center().x, r.center().y);

        let grips = [
            (Point::new(left, top), Direction::NW),
            (Point::new(right, top), Direction::NE),
            (Point::new(left, bottom), Direction::SW),
            (Point::new(right, bottom), Direction::SE),
            (Point::new(mid_x, top), Direction::N),
            (Point::new(mid_x, bottom), Direction::S),
            (Point::new(left, mid_y), Direction::W),
            (Point::new(right, mid_y), Direction::E),
        ];
        if let Some((_, direction)) = grips.iter().find(|(at, _)| p.distance(*at) < tolerance) {
            return Some(GrabTarget::Handle(Handle::grip(*direction)));
        }

        let within_y = p.y > top && p.y < bottom;
        let within_x = p.x > left && p.x < right;
        let bar = if (p.x - left).abs() < tolerance && within_y {
            Some(Direction::W)
        } else if (p.x - right).abs() < tolerance && within_y {
            Some(Direction::E)
        } else if (p.y - top).abs() < tolerance && within_x {
            Some(Direction::N)
        } else if (p.y - bottom).abs() < tolerance && within_x {
            Some(Direction::S)
        } else {
            None
        };
        if let Some(direction) = bar {
            return Some(GrabTarget::Handle(Handle::bar(direction)));
        }

        r.contains(p).then_some(GrabTarget::Body)
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Requested offset pinned to the far edge, or centered when absent.
fn place(requested: Option<f64>, available: f64, extent: f64) -> f64 {
    match positive(requested) {
        Some(v) if v > available - extent => available - extent,
        Some(v) => v,
        None => (available - extent) / 2.0,
    }
}

fn translate_within(start: Rect, containment: &Rect, dx: f64, dy: f64) -> Rect {
    let mut left = start.left + dx;
    let mut top = start.top + dy;
    if left < containment.left {
        left = containment.left;
    }
    if top < containment.top {
        top = containment.top;
    }
    if left + start.width > containment.right() {
        left = containment.right() - start.width;
    }
    if top + start.height > containment.bottom() {
        top = containment.bottom() - start.height;
    }
    Rect::new(left, top, start.width, start.height)
}
