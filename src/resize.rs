//! Handle-driven resizing of the crop box.

use serde::{Deserialize, Serialize};

use crate::geometry::{AspectMode, Rect, Vector, apply_aspect_correction, clamp_to_containment};

/// One of the eight compass directions a handle can pull the crop box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    N,
    S,
    W,
    E,
    NW,
    NE,
    SW,
    SE,
}

/// Which edges a direction moves and how pointer travel maps onto size.
///
/// A sign of `None` leaves that dimension untouched by the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionDescriptor {
    pub move_left_edge: bool,
    pub move_top_edge: bool,
    pub width_sign: Option<f64>,
    pub height_sign: Option<f64>,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::S,
        Direction::W,
        Direction::E,
        Direction::NW,
        Direction::NE,
        Direction::SW,
        Direction::SE,
    ];

    pub const fn descriptor(self) -> DirectionDescriptor {
        let (move_left_edge, move_top_edge, width_sign, height_sign) = match self {
            Direction::N => (false, true, None, Some(-1.0)),
            Direction::S => (false, false, None, Some(1.0)),
            Direction::W => (true, false, Some(-1.0), None),
            Direction::E => (false, false, Some(1.0), None),
            Direction::NW => (true, true, Some(-1.0), Some(-1.0)),
            Direction::NE => (false, true, Some(1.0), Some(-1.0)),
            Direction::SW => (true, false, Some(-1.0), Some(1.0)),
            Direction::SE => (false, false, Some(1.0), Some(1.0)),
        };
        DirectionDescriptor {
            move_left_edge,
            move_top_edge,
            width_sign,
            height_sign,
        }
    }

    /// How the first aspect pass settles width against height.
    pub fn aspect_mode(self) -> AspectMode {
        match self {
            Direction::N | Direction::S => AspectMode::VerticalDriven,
            Direction::W | Direction::E => AspectMode::HorizontalDriven,
            _ => AspectMode::Corner,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleStyle {
    /// Full-length edge strip.
    Bar,
    /// Small grab point on a corner or an edge midpoint.
    Grip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    pub style: HandleStyle,
    pub direction: Direction,
}

impl Handle {
    pub const fn bar(direction: Direction) -> Self {
        Self {
            style: HandleStyle::Bar,
            direction,
        }
    }

    pub const fn grip(direction: Direction) -> Self {
        Self {
            style: HandleStyle::Grip,
            direction,
        }
    }

    /// Every handle on the crop box, bars first.
    pub const ALL: [Handle; 12] = [
        Handle::bar(Direction::N),
        Handle::bar(Direction::S),
        Handle::bar(Direction::W),
        Handle::bar(Direction::E),
        Handle::grip(Direction::NW),
        Handle::grip(Direction::N),
        Handle::grip(Direction::NE),
        Handle::grip(Direction::W),
        Handle::grip(Direction::E),
        Handle::grip(Direction::SW),
        Handle::grip(Direction::S),
        Handle::grip(Direction::SE),
    ];
}

/// Bounds applied to a pointer-driven size before containment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SizeConstraints {
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            min_width: 50.0,
            max_width: 10000.0,
            min_height: 50.0,
            max_height: 10000.0,
        }
    }
}

/// Resize `start` by pulling `direction` `delta` pixels.
///
/// Size constraints apply first, then the aspect lock for the pulled
/// direction, then containment. Containment can break the ratio, so a
/// corner-mode aspect pass runs again afterwards and the moving edges are
/// re-anchored. On conflict containment wins over `constraints`.
pub fn compute_resize(
    direction: Direction,
    delta: Vector,
    start: Rect,
    containment: &Rect,
    aspect_ratio: Option<f64>,
    constraints: &SizeConstraints,
) -> Rect {
    if delta == Vector::ZERO {
        return start;
    }

    let d = direction.descriptor();
    let mut width = start.width;
    let mut height = start.height;

    if let Some(sign) = d.width_sign {
        width = (start.width + sign * delta.dx)
            .max(constraints.min_width)
            .min(constraints.max_width);
    }
    if let Some(sign) = d.height_sign {
        height = (start.height + sign * delta.dy)
            .max(constraints.min_height)
            .min(constraints.max_height);
    }

    if let Some(ratio) = aspect_ratio {
        (width, height) = apply_aspect_correction(width, height, ratio, direction.aspect_mode());
    }

    let tentative = anchor(&d, &start, Rect::new(start.left, start.top, width, height));
    let clamped = clamp_to_containment(tentative, containment);
    let Some(ratio) = aspect_ratio else {
        return clamped;
    };

    // the second pass is always corner mode, even for edge handles
    let (width, height) =
        apply_aspect_correction(clamped.width, clamped.height, ratio, AspectMode::Corner);
    let relocked = Rect::new(clamped.left, clamped.top, width, height);
    anchor(&d, &start, relocked)
}

/// Re-derive the pulled edges of `r` from `start` so the opposite edges
/// stay put. Edges that don't move keep the position `r` already has.
fn anchor(d: &DirectionDescriptor, start: &Rect, mut r: Rect) -> Rect {
    if d.move_left_edge {
        r.left = start.left + (r.width - start.width) * d.width_sign.unwrap_or(0.0);
    }
    if d.move_top_edge {
        r.top = start.top + (r.height - start.height) * d.height_sign.unwrap_or(0.0);
    }
    r
}
