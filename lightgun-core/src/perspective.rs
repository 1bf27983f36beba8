//! Quad-to-rectangle perspective mapping.
//!
//! The warp from the camera-space quad of reconstructed markers to the
//! calibrated screen quad is built each frame as
//! `square_to_quad(dest) * quad_to_square(source)`, both in `f64`.

use libm::fabs;

use crate::types::PointF;

/// Below this, a determinant or homogeneous `w` counts as zero.
const EPSILON: f64 = 1e-9;

/// Error type for perspective mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PerspectiveError {
    /// Three or more corners are collinear, or the point maps to infinity.
    DegenerateQuad,
}

/// A 3x3 projective transform, row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Homography(pub [[f64; 3]; 3]);

impl Homography {
    pub const IDENTITY: Self = Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    /// Transform taking the unit square onto `quad`.
    ///
    /// Corners correspond as (0,0)→q0, (1,0)→q1, (1,1)→q2, (0,1)→q3, so
    /// `quad` must be in perimeter order.
    pub fn square_to_quad(quad: &[PointF; 4]) -> Result<Self, PerspectiveError> {
        let [p0, p1, p2, p3] = *quad;
        let sx = p0.x - p1.x + p2.x - p3.x;
        let sy = p0.y - p1.y + p2.y - p3.y;

        let (g, h) = if fabs(sx) < EPSILON && fabs(sy) < EPSILON {
            // Parallelogram: affine.
            (0.0, 0.0)
        } else {
            let dx1 = p1.x - p2.x;
            let dy1 = p1.y - p2.y;
            let dx2 = p3.x - p2.x;
            let dy2 = p3.y - p2.y;
            let den = dx1 * dy2 - dx2 * dy1;
            if fabs(den) < EPSILON {
                return Err(PerspectiveError::DegenerateQuad);
            }
            ((sx * dy2 - dx2 * sy) / den, (dx1 * sy - sx * dy1) / den)
        };

        let m = Self([
            [p1.x - p0.x + g * p1.x, p3.x - p0.x + h * p3.x, p0.x],
            [p1.y - p0.y + g * p1.y, p3.y - p0.y + h * p3.y, p0.y],
            [g, h, 1.0],
        ]);
        if fabs(m.determinant()) < EPSILON {
            return Err(PerspectiveError::DegenerateQuad);
        }
        Ok(m)
    }

    /// Transform taking `quad` onto the unit square.
    pub fn quad_to_square(quad: &[PointF; 4]) -> Result<Self, PerspectiveError> {
        Self::square_to_quad(quad)?.inverse()
    }

    #[must_use]
    pub fn determinant(&self) -> f64 {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.0;
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// Inverse via the adjugate.
    pub fn inverse(&self) -> Result<Self, PerspectiveError> {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.0;
        let det = self.determinant();
        if fabs(det) < EPSILON {
            return Err(PerspectiveError::DegenerateQuad);
        }
        let k = 1.0 / det;
        Ok(Self([
            [(e * i - f * h) * k, (c * h - b * i) * k, (b * f - c * e) * k],
            [(f * g - d * i) * k, (a * i - c * g) * k, (c * d - a * f) * k],
            [(d * h - e * g) * k, (b * g - a * h) * k, (a * e - b * d) * k],
        ]))
    }

    /// `self * rhs`: applies `rhs` first.
    #[must_use]
    pub fn compose(&self, rhs: &Homography) -> Self {
        let mut out = [[0.0; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.0[r][k] * rhs.0[k][c]).sum();
            }
        }
        Self(out)
    }

    /// Map a point, dividing by the homogeneous coordinate.
    pub fn apply(&self, p: PointF) -> Result<PointF, PerspectiveError> {
        let m = &self.0;
        let x = m[0][0] * p.x + m[0][1] * p.y + m[0][2];
        let y = m[1][0] * p.x + m[1][1] * p.y + m[1][2];
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        if fabs(w) < EPSILON {
            return Err(PerspectiveError::DegenerateQuad);
        }
        Ok(PointF::new(x / w, y / w))
    }
}

/// Screen-side calibration: the quad the markers should map onto.
///
/// Recalibrating means building a new `Calibration`; the destination
/// transform is computed once here and reused for every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    dest: [PointF; 4],
    square_to_dest: Homography,
}

impl Calibration {
    /// Calibrate onto `dest`, in the same perimeter order as the markers.
    pub fn new(dest: [PointF; 4]) -> Result<Self, PerspectiveError> {
        Ok(Self {
            dest,
            square_to_dest: Homography::square_to_quad(&dest)?,
        })
    }

    /// Corners of a `width` x `height` screen: (0,0), (w,0), (w,h), (0,h).
    pub fn screen(width: f64, height: f64) -> Result<Self, PerspectiveError> {
        Self::new([
            PointF::new(0.0, 0.0),
            PointF::new(width, 0.0),
            PointF::new(width, height),
            PointF::new(0.0, height),
        ])
    }

    #[inline]
    pub fn dest(&self) -> &[PointF; 4] {
        &self.dest
    }

    /// Full warp for this frame's source quad.
    pub fn warp(&self, source: &[PointF; 4]) -> Result<Homography, PerspectiveError> {
        Ok(self
            .square_to_dest
            .compose(&Homography::quad_to_square(source)?))
    }

    /// Map `point` through the warp from `source` onto the calibrated quad.
    pub fn map(&self, source: &[PointF; 4], point: PointF) -> Result<PointF, PerspectiveError> {
        self.warp(source)?.apply(point)
    }
}
