//! Learned shape of the marker constellation.

use core::f32::consts::PI;

use libm::{atan2f, cosf, sinf};

use super::layout::Layout;
use crate::types::{Point, Role, RoleMap, AIM_RES_X, AIM_RES_Y};

/// Wrap an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(mut a: f32) -> f32 {
    while a > PI {
        a -= 2.0 * PI;
    }
    while a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Rotate `(x, y)` by `angle` (Y down, positive is clockwise on screen).
#[inline]
#[must_use]
pub fn rotate(x: f32, y: f32, angle: f32) -> (f32, f32) {
    let (s, c) = (sinf(angle), cosf(angle));
    (x * c - y * s, x * s + y * c)
}

/// Per-side lengths and angles plus the global pose of the quad.
///
/// Side `r` runs from role `r` to `r.next()`. All distances are in
/// precision units, angles in radians with Y pointing down.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeometryModel {
    /// Mean of the four reconstructed markers.
    pub median: Point,
    /// Last measured length of each side.
    pub side_length: RoleMap<f32>,
    /// Last measured absolute angle of each side.
    pub side_angle: RoleMap<f32>,
    /// Angle of each side relative to [`roll`](Self::roll), fixed at the
    /// last frame with all four markers visible.
    pub side_offset: RoleMap<f32>,
    /// Rotation of the constellation about the camera axis.
    pub roll: f32,
    pub width: f32,
    pub height: f32,
}

impl GeometryModel {
    /// An upright constellation filling the middle half of the camera view.
    #[must_use]
    pub fn nominal(layout: Layout) -> Self {
        let width = (AIM_RES_X / 2) as f32;
        let height = (AIM_RES_Y / 2) as f32;
        let median = Point::new(AIM_RES_X / 2, AIM_RES_Y / 2);
        let corners = RoleMap::from_fn(|role| {
            let (dx, dy) = layout.nominal_offset(role, width, height);
            median.offset(dx, dy)
        });

        let mut model = Self {
            median,
            side_length: RoleMap::default(),
            side_angle: RoleMap::default(),
            side_offset: RoleMap::default(),
            roll: 0.0,
            width,
            height,
        };
        for side in Role::ALL {
            model.learn_side(side, corners[side], corners[side.next()]);
        }
        model.side_offset = model.side_angle;
        model
    }

    /// Reset roll, extents and side offsets from four raw positions.
    ///
    /// Side lengths and angles are left alone; they only change through
    /// [`learn_side`](Self::learn_side).
    pub fn recalibrate(&mut self, layout: Layout, corners: &RoleMap<Point>) {
        let (ax, ay) = layout.reference_axis(corners);
        self.roll = atan2f(ay, ax);
        let (width, height) = layout.extents(corners);
        self.width = width;
        self.height = height;
        for side in Role::ALL {
            let angle = corners[side].angle_to(corners[side.next()]);
            self.side_offset[side] = wrap_angle(angle - self.roll);
        }
    }

    /// Record the measured length and angle of `side`.
    pub fn learn_side(&mut self, side: Role, from: Point, to: Point) {
        self.side_length[side] = from.distance_to(to);
        self.side_angle[side] = from.angle_to(to);
    }

    /// Re-estimate roll as the circular mean of `side_angle - side_offset`
    /// over the sides flagged in `measured`.
    ///
    /// Returns `false` (roll unchanged) when no side was measured.
    pub fn track_roll(&mut self, measured: &RoleMap<bool>) -> bool {
        let (mut s, mut c, mut n) = (0.0f32, 0.0f32, 0u8);
        for (side, &m) in measured.iter() {
            if m {
                let a = self.side_angle[side] - self.side_offset[side];
                s += sinf(a);
                c += cosf(a);
                n += 1;
            }
        }
        if n == 0 {
            return false;
        }
        self.roll = atan2f(s, c);
        true
    }

    /// Vector along `side` at its learned length, under the current roll.
    #[must_use]
    pub fn side_vector(&self, side: Role) -> (f32, f32) {
        let a = self.roll + self.side_offset[side];
        let len = self.side_length[side];
        (len * cosf(a), len * sinf(a))
    }

    /// Offset of `role` from the median under the current roll and extents.
    #[must_use]
    pub fn centre_offset(&self, layout: Layout, role: Role) -> (f32, f32) {
        let (x, y) = layout.nominal_offset(role, self.width, self.height);
        rotate(x, y, self.roll)
    }
}
