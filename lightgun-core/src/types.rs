//! Core coordinate and marker-role types.

use core::ops::{Add, Index, IndexMut, Sub};

use ircam_proto::{CameraPoint, CAMERA_RES_X, CAMERA_RES_Y};

/// Left shift applied to camera pixels to get precision units.
pub const PRECISION_SHIFT: u32 = 2;

/// Precision units per camera pixel.
pub const PRECISION_SCALE: i32 = 1 << PRECISION_SHIFT;

/// Camera width in precision units.
pub const AIM_RES_X: i32 = CAMERA_RES_X as i32 * PRECISION_SCALE;

/// Camera height in precision units.
pub const AIM_RES_Y: i32 = CAMERA_RES_Y as i32 * PRECISION_SCALE;

/// A marker position in precision units (camera pixels << [`PRECISION_SHIFT`]).
///
/// Signed: synthesized markers may lie outside the camera's field of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Scale a camera sample, optionally mirroring it horizontally.
    #[must_use]
    pub const fn from_camera(p: CameraPoint, mirror_x: bool) -> Self {
        let x = if mirror_x {
            (CAMERA_RES_X - 1) as i32 - p.x as i32
        } else {
            p.x as i32
        };
        Self {
            x: x << PRECISION_SHIFT,
            y: (p.y as i32) << PRECISION_SHIFT,
        }
    }

    /// Nearest point to a fractional position.
    #[must_use]
    pub fn from_f32(x: f32, y: f32) -> Self {
        Self {
            x: libm::roundf(x) as i32,
            y: libm::roundf(y) as i32,
        }
    }

    /// Offset this point by a fractional vector, rounding to the nearest unit.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::from_f32(self.x as f32 + dx, self.y as f32 + dy)
    }

    /// Rounded back to camera pixels.
    #[must_use]
    pub const fn to_camera(self) -> (i32, i32) {
        let half = PRECISION_SCALE / 2;
        (
            (self.x + half) >> PRECISION_SHIFT,
            (self.y + half) >> PRECISION_SHIFT,
        )
    }

    #[must_use]
    pub fn to_f64(self) -> PointF {
        PointF::new(self.x as f64, self.y as f64)
    }

    /// Angle of the vector from `self` to `to`, Y down, in radians.
    #[must_use]
    pub fn angle_to(self, to: Point) -> f32 {
        libm::atan2f((to.y - self.y) as f32, (to.x - self.x) as f32)
    }

    #[must_use]
    pub fn distance_to(self, to: Point) -> f32 {
        libm::hypotf((to.x - self.x) as f32, (to.y - self.y) as f32)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Double-precision point used by the perspective mapper.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Integer screen position, as sent to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Floor a mapped position onto the pixel grid.
    #[must_use]
    pub fn from_mapped(p: PointF) -> Self {
        Self {
            x: libm::floor(p.x) as i32,
            y: libm::floor(p.y) as i32,
        }
    }
}

/// Position of a marker in the constellation, in clockwise perimeter order.
///
/// The names are compass points of the diamond layout. For the square
/// layout they stand for the corners in the same perimeter order:
///
/// | Role    | Diamond | Square       |
/// |---------|---------|--------------|
/// | `North` | top     | top-left     |
/// | `East`  | right   | top-right    |
/// | `South` | bottom  | bottom-right |
/// | `West`  | left    | bottom-left  |
///
/// Side `r` of the quad runs from `r` to `r.next()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Role {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Role {
    /// All roles in perimeter order.
    pub const ALL: [Role; 4] = [Role::North, Role::East, Role::South, Role::West];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index & 3]
    }

    /// Clockwise neighbour.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Counter-clockwise neighbour.
    #[inline]
    #[must_use]
    pub const fn prev(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        Self::from_index(self.index() + 2)
    }
}

/// One value per [`Role`], indexed by role.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RoleMap<T>(pub [T; 4]);

impl<T> RoleMap<T> {
    #[inline]
    #[must_use]
    pub const fn new(values: [T; 4]) -> Self {
        Self(values)
    }

    /// Build a map by evaluating `f` for each role in perimeter order.
    pub fn from_fn(mut f: impl FnMut(Role) -> T) -> Self {
        Self([
            f(Role::North),
            f(Role::East),
            f(Role::South),
            f(Role::West),
        ])
    }

    /// Iterate `(role, value)` pairs in perimeter order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> {
        Role::ALL.into_iter().zip(self.0.iter())
    }

    #[inline]
    pub fn values(&self) -> &[T; 4] {
        &self.0
    }

    /// Apply `f` to each value.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> RoleMap<U> {
        RoleMap(self.0.map(f))
    }
}

impl<T> Index<Role> for RoleMap<T> {
    type Output = T;

    #[inline]
    fn index(&self, role: Role) -> &T {
        &self.0[role.index()]
    }
}

impl<T> IndexMut<Role> for RoleMap<T> {
    #[inline]
    fn index_mut(&mut self, role: Role) -> &mut T {
        &mut self.0[role.index()]
    }
}
