//! Marker layouts: how a position around the centre maps to a [`Role`].

use libm::{fabsf, fmaxf};

use crate::types::{Point, Role, RoleMap};

/// Physical arrangement of the four IR markers around the screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Layout {
    /// One marker at the middle of each screen edge.
    #[default]
    Diamond,
    /// One marker at each screen corner.
    Square,
}

/// Sense of the last known roll, used to break ties on a sector boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tilt {
    /// Roll > 0 (Y points down, so the picture turns clockwise).
    Clockwise,
    #[default]
    CounterClockwise,
}

impl Tilt {
    #[must_use]
    pub fn from_roll(roll: f32) -> Self {
        if roll > 0.0 {
            Tilt::Clockwise
        } else {
            Tilt::CounterClockwise
        }
    }
}

/// Result of classifying one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Classification {
    pub role: Role,
    /// Role on the other side of the nearest sector boundary.
    pub alternate: Role,
    /// Distance past that boundary, in precision units.
    pub depth: f32,
}

impl Layout {
    /// Assign a role to a sample at offset `(dx, dy)` from the centre,
    /// already rotated into the constellation's frame.
    ///
    /// `half_w`/`half_h` are half the constellation extents. Within
    /// `margin` of a sector boundary the slot's `previous` role is kept if
    /// it is one of the two candidates; failing that, `tilt` decides.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn classify(
        self,
        dx: f32,
        dy: f32,
        half_w: f32,
        half_h: f32,
        margin: f32,
        previous: Option<Role>,
        tilt: Tilt,
    ) -> Classification {
        let (role, alternate, depth, tie) = match self {
            Layout::Diamond => diamond_sector(dx, dy, half_w, half_h, tilt),
            Layout::Square => square_quadrant(dx, dy),
        };
        if depth >= margin {
            return Classification {
                role,
                alternate,
                depth,
            };
        }
        let keep = match previous {
            Some(p) if p == role || p == alternate => p,
            _ => tie,
        };
        Classification {
            role: keep,
            alternate: if keep == role { alternate } else { role },
            depth,
        }
    }

    /// Offset of `role` from the centre of an upright constellation.
    #[must_use]
    pub fn nominal_offset(self, role: Role, width: f32, height: f32) -> (f32, f32) {
        let (hw, hh) = (width * 0.5, height * 0.5);
        match (self, role) {
            (Layout::Diamond, Role::North) => (0.0, -hh),
            (Layout::Diamond, Role::East) => (hw, 0.0),
            (Layout::Diamond, Role::South) => (0.0, hh),
            (Layout::Diamond, Role::West) => (-hw, 0.0),
            (Layout::Square, Role::North) => (-hw, -hh),
            (Layout::Square, Role::East) => (hw, -hh),
            (Layout::Square, Role::South) => (hw, hh),
            (Layout::Square, Role::West) => (-hw, hh),
        }
    }

    /// Vector along the constellation's horizontal axis; its angle is the roll.
    #[must_use]
    pub fn reference_axis(self, corners: &RoleMap<Point>) -> (f32, f32) {
        let axis = match self {
            Layout::Diamond => corners[Role::East] - corners[Role::West],
            Layout::Square => {
                (corners[Role::East] - corners[Role::North])
                    + (corners[Role::South] - corners[Role::West])
            }
        };
        (axis.x as f32, axis.y as f32)
    }

    /// Width and height of the constellation.
    #[must_use]
    pub fn extents(self, corners: &RoleMap<Point>) -> (f32, f32) {
        let c = corners;
        match self {
            Layout::Diamond => (
                c[Role::West].distance_to(c[Role::East]),
                c[Role::North].distance_to(c[Role::South]),
            ),
            Layout::Square => (
                (c[Role::North].distance_to(c[Role::East])
                    + c[Role::West].distance_to(c[Role::South]))
                    * 0.5,
                (c[Role::North].distance_to(c[Role::West])
                    + c[Role::East].distance_to(c[Role::South]))
                    * 0.5,
            ),
        }
    }

    /// Human-readable role name for logs.
    #[must_use]
    pub const fn role_name(self, role: Role) -> &'static str {
        match (self, role) {
            (Layout::Diamond, Role::North) => "top",
            (Layout::Diamond, Role::East) => "right",
            (Layout::Diamond, Role::South) => "bottom",
            (Layout::Diamond, Role::West) => "left",
            (Layout::Square, Role::North) => "top-left",
            (Layout::Square, Role::East) => "top-right",
            (Layout::Square, Role::South) => "bottom-right",
            (Layout::Square, Role::West) => "bottom-left",
        }
    }
}

/// Diamond sectors are split by the constellation's diagonals.
///
/// Returns `(role, alternate, depth, tie)`.
fn diamond_sector(dx: f32, dy: f32, half_w: f32, half_h: f32, tilt: Tilt) -> (Role, Role, f32, Role) {
    let hw = fmaxf(half_w, 1.0);
    let hh = fmaxf(half_h, 1.0);
    let u = dx / hw;
    let v = dy / hh;
    let lean = fabsf(v) - fabsf(u);
    let depth = fabsf(lean) * (hw + hh) * 0.5;

    let right = u >= 0.0;
    let below = v >= 0.0;
    let vertical = if below { Role::South } else { Role::North };
    let horizontal = if right { Role::East } else { Role::West };
    let (role, alternate) = if lean >= 0.0 {
        (vertical, horizontal)
    } else {
        (horizontal, vertical)
    };

    // Rolled clockwise, each marker drifts into the quadrant clockwise of it.
    let tie = match (tilt, right, below) {
        (Tilt::Clockwise, true, false) => Role::North,
        (Tilt::Clockwise, true, true) => Role::East,
        (Tilt::Clockwise, false, true) => Role::South,
        (Tilt::Clockwise, false, false) => Role::West,
        (Tilt::CounterClockwise, false, false) => Role::North,
        (Tilt::CounterClockwise, true, false) => Role::East,
        (Tilt::CounterClockwise, true, true) => Role::South,
        (Tilt::CounterClockwise, false, true) => Role::West,
    };
    (role, alternate, depth, tie)
}

fn quadrant(right: bool, below: bool) -> Role {
    match (right, below) {
        (false, false) => Role::North,
        (true, false) => Role::East,
        (true, true) => Role::South,
        (false, true) => Role::West,
    }
}

/// Square quadrants are split by the constellation's axes.
fn square_quadrant(dx: f32, dy: f32) -> (Role, Role, f32, Role) {
    let right = dx >= 0.0;
    let below = dy >= 0.0;
    let role = quadrant(right, below);
    let (alternate, depth) = if fabsf(dx) < fabsf(dy) {
        (quadrant(!right, below), fabsf(dx))
    } else {
        (quadrant(right, !below), fabsf(dy))
    };
    (role, alternate, depth, role)
}
