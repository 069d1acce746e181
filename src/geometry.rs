//! Plain box-model geometry shared by the crop box, the viewport and the
//! preview panes.
//!
//! Every rectangle here uses `left`/`top`/`width`/`height` semantics with
//! the y axis pointing down, the same way the host lays out its widgets.

use std::ops::Sub;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width over height. Degenerate sizes yield a non-finite ratio.
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Pointer travel since a drag started.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, rhs: Point) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin, used as a containment box in a
    /// parent's local coordinates.
    pub const fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }

    /// True when `inner` lies within `self`, allowing `eps` of float slack.
    pub fn contains_rect(&self, inner: &Rect, eps: f64) -> bool {
        inner.left >= self.left - eps
            && inner.top >= self.top - eps
            && inner.right() <= self.right() + eps
            && inner.bottom() <= self.bottom() + eps
    }

    pub fn scale(&self, factor: f64) -> Rect {
        Rect::new(
            self.left * factor,
            self.top * factor,
            self.width * factor,
            self.height * factor,
        )
    }
}

/// Letterbox a box of `intrinsic_ratio` inside `outer`, centered on the
/// axis that has slack.
pub fn fit_contain_center(outer: Size, intrinsic_ratio: f64) -> Rect {
    if intrinsic_ratio > outer.aspect_ratio() {
        let height = outer.width / intrinsic_ratio;
        Rect::new(0.0, (outer.height - height) / 2.0, outer.width, height)
    } else {
        let width = outer.height * intrinsic_ratio;
        Rect::new((outer.width - width) / 2.0, 0.0, width, outer.height)
    }
}

/// Shrink `rect` until it fits in `containment`.
///
/// The far edges (right, bottom) are corrected before the near edges (left,
/// top), so a rectangle overflowing on both sides of an axis ends up with
/// exactly the containment's extent on that axis.
pub fn clamp_to_containment(rect: Rect, containment: &Rect) -> Rect {
    let mut r = rect;

    if r.right() > containment.right() {
        r.width = containment.right() - r.left;
    }
    if r.left < containment.left {
        r.width -= containment.left - r.left;
        r.left = containment.left;
    }

    if r.bottom() > containment.bottom() {
        r.height = containment.bottom() - r.top;
    }
    if r.top < containment.top {
        r.height -= containment.top - r.top;
        r.top = containment.top;
    }

    r
}

/// Which dimension wins when re-locking an aspect ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AspectMode {
    /// Height was driven by the pointer; width follows.
    VerticalDriven,
    /// Width was driven by the pointer; height follows.
    HorizontalDriven,
    /// Keep whichever dimension is the tighter fit, shrinking the other.
    Corner,
}

pub fn apply_aspect_correction(
    width: f64,
    height: f64,
    ratio: f64,
    mode: AspectMode,
) -> (f64, f64) {
    match mode {
        AspectMode::VerticalDriven => (height * ratio, height),
        AspectMode::HorizontalDriven => (width, width / ratio),
        AspectMode::Corner => {
            if width / height < ratio {
                (width, width / ratio)
            } else {
                (height * ratio, height)
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-6 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}
