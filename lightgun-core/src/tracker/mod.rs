//! Occlusion-tolerant reconstruction of the four-marker constellation.
//!
//! Each frame the tracker:
//!
//! 1. assigns every visible camera slot a [`Role`] by its sector around the
//!    previous median (the camera does not keep slot order stable),
//! 2. updates per-role [`Confidence`],
//! 3. resets roll, extents and side offsets when all four are visible,
//! 4. learns side lengths/angles between confirmed visible neighbours and,
//!    with markers missing, re-estimates roll from those sides,
//! 5. synthesizes every missing marker from a confirmed neighbour along the
//!    learned side, or failing that from the median and the nominal shape,
//! 6. recomputes the median from the four reconstructed positions.
//!
//! One engine serves both layouts; only sector classification and the
//! nominal shape differ (see [`Layout`]).

mod confidence;
mod geometry;
mod layout;

pub use confidence::{Confidence, CONFIRMATION_FRAMES};
pub use geometry::{rotate, wrap_angle, GeometryModel};
pub use layout::{Layout, Tilt};

use ircam_proto::{RawMarkerFrame, SeenMask, MARKER_COUNT};
use libm::{cosf, sinf};

use crate::types::{Point, Role, RoleMap, PRECISION_SCALE};
use layout::Classification;

/// Tracker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackerConfig {
    pub layout: Layout,
    /// Dead band around sector boundaries, in precision units.
    pub margin: i32,
    /// Mirror camera X before tracking (camera mounted upside down).
    pub mirror_x: bool,
}

pub const DEFAULT_TRACKER_CONFIG: TrackerConfig = TrackerConfig {
    layout: Layout::Diamond,
    margin: 50 * PRECISION_SCALE,
    mirror_x: false,
};

impl Default for TrackerConfig {
    fn default() -> Self {
        DEFAULT_TRACKER_CONFIG
    }
}

/// Outcome of [`QuadTracker::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackStatus {
    /// Nothing visible; positions held from the previous frame.
    Frozen,
    /// No frame with all four markers has been seen yet.
    AwaitingLock,
    /// Positions updated. `ground_truth` when all four were visible and
    /// classified to distinct roles.
    Tracking { ground_truth: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct TrackedMarker {
    /// Reconstructed ("final") position.
    position: Point,
    confidence: Confidence,
    visible: bool,
}

/// Marker tracker for one constellation.
pub struct QuadTracker {
    config: TrackerConfig,
    markers: RoleMap<TrackedMarker>,
    geometry: GeometryModel,
    /// Role each camera slot had last frame.
    slot_roles: [Option<Role>; MARKER_COUNT],
    seen: SeenMask,
    tilt: Tilt,
    locked: bool,
}

impl QuadTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let geometry = GeometryModel::nominal(config.layout);
        let markers = RoleMap::from_fn(|role| {
            let (dx, dy) = geometry.centre_offset(config.layout, role);
            TrackedMarker {
                position: geometry.median.offset(dx, dy),
                ..TrackedMarker::default()
            }
        });
        Self {
            config,
            markers,
            geometry,
            slot_roles: [None; MARKER_COUNT],
            seen: SeenMask::NONE,
            tilt: Tilt::default(),
            locked: false,
        }
    }

    /// Forget everything learned, keeping the configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Feed one camera frame.
    pub fn update(&mut self, frame: &RawMarkerFrame) -> TrackStatus {
        self.seen = frame.seen;

        if frame.seen.is_empty() {
            for marker in &mut self.markers.0 {
                marker.confidence.record(false);
                marker.visible = false;
            }
            self.slot_roles = [None; MARKER_COUNT];
            trace!("no markers visible, holding");
            return TrackStatus::Frozen;
        }
        if !self.locked && !frame.seen.is_all() {
            return TrackStatus::AwaitingLock;
        }

        let mut samples = [None; MARKER_COUNT];
        for (slot, point) in frame.visible() {
            samples[slot] = Some(Point::from_camera(point, self.config.mirror_x));
        }
        let centre = if self.locked {
            self.geometry.median
        } else {
            mean(samples.iter().flatten().copied())
        };
        let (assigned, slot_roles) = self.classify(&samples, centre);
        let complete = assigned.0.iter().all(Option::is_some);

        if !self.locked {
            if !complete {
                trace!("lock frame classified ambiguously");
                return TrackStatus::AwaitingLock;
            }
            self.locked = true;
            debug!("constellation locked");
        }
        self.slot_roles = slot_roles;

        for (marker, sample) in self.markers.0.iter_mut().zip(assigned.0.iter()) {
            marker.visible = sample.is_some();
            marker.confidence.record(marker.visible);
        }

        let layout = self.config.layout;
        let ground_truth = frame.seen.is_all() && complete;
        if ground_truth {
            let corners = assigned.map(|p| p.unwrap_or(centre));
            self.geometry.recalibrate(layout, &corners);
        }

        // Anchors: visible this frame and confirmed.
        let anchors = RoleMap::from_fn(|role| {
            assigned[role].filter(|_| self.markers[role].confidence.is_confirmed())
        });

        let mut measured = RoleMap::new([false; 4]);
        for side in Role::ALL {
            if let (Some(from), Some(to)) = (anchors[side], anchors[side.next()]) {
                self.geometry.learn_side(side, from, to);
                measured[side] = true;
            }
        }
        if !ground_truth && self.geometry.track_roll(&measured) {
            trace!("roll {}", self.geometry.roll);
        }

        let shifted_centre = self.shifted_centre(&assigned);
        for role in Role::ALL {
            let position = match assigned[role] {
                Some(p) => p,
                None => self.synthesize(role, &anchors, shifted_centre),
            };
            self.markers[role].position = position;
        }

        let (mut sx, mut sy) = (0, 0);
        for marker in &self.markers.0 {
            sx += marker.position.x;
            sy += marker.position.y;
        }
        self.geometry.median = Point::new((sx + 2).div_euclid(4), (sy + 2).div_euclid(4));
        self.tilt = Tilt::from_roll(self.geometry.roll);

        TrackStatus::Tracking { ground_truth }
    }

    /// Assign roles to the visible samples.
    ///
    /// When two slots claim the same role the one deeper inside the sector
    /// keeps it; the other falls back to its alternate role if that is
    /// free, and is dropped otherwise.
    fn classify(
        &self,
        samples: &[Option<Point>; MARKER_COUNT],
        centre: Point,
    ) -> (RoleMap<Option<Point>>, [Option<Role>; MARKER_COUNT]) {
        let g = &self.geometry;
        let (s, c) = (sinf(-g.roll), cosf(-g.roll));
        let margin = self.config.margin as f32;

        let mut candidates: [Option<Classification>; MARKER_COUNT] = [None; MARKER_COUNT];
        for (slot, sample) in samples.iter().enumerate() {
            if let Some(p) = sample {
                let dx = (p.x - centre.x) as f32;
                let dy = (p.y - centre.y) as f32;
                candidates[slot] = Some(self.config.layout.classify(
                    dx * c - dy * s,
                    dx * s + dy * c,
                    g.width * 0.5,
                    g.height * 0.5,
                    margin,
                    self.slot_roles[slot],
                    self.tilt,
                ));
            }
        }

        let mut assigned = RoleMap::new([None; 4]);
        let mut roles = [None; MARKER_COUNT];
        loop {
            let deepest = candidates
                .iter()
                .enumerate()
                .filter_map(|(slot, c)| c.map(|c| (slot, c)))
                .max_by(|a, b| a.1.depth.total_cmp(&b.1.depth));
            let Some((slot, claim)) = deepest else {
                break;
            };
            candidates[slot] = None;
            let role = if assigned[claim.role].is_none() {
                claim.role
            } else if assigned[claim.alternate].is_none() {
                claim.alternate
            } else {
                trace!("slot {} has no free role, ignored", slot);
                continue;
            };
            assigned[role] = samples[slot];
            roles[slot] = Some(role);
        }
        (assigned, roles)
    }

    /// Previous median moved by the mean displacement of the visible markers.
    fn shifted_centre(&self, assigned: &RoleMap<Option<Point>>) -> Point {
        let (mut dx, mut dy, mut n) = (0i32, 0i32, 0i32);
        for (role, sample) in assigned.iter() {
            if let Some(p) = sample {
                let moved = *p - self.markers[role].position;
                dx += moved.x;
                dy += moved.y;
                n += 1;
            }
        }
        if n == 0 {
            return self.geometry.median;
        }
        self.geometry
            .median
            .offset(dx as f32 / n as f32, dy as f32 / n as f32)
    }

    /// Position for a marker that is not visible this frame.
    fn synthesize(&self, role: Role, anchors: &RoleMap<Option<Point>>, centre: Point) -> Point {
        let g = &self.geometry;
        let prev = role.prev();
        let from_prev = anchors[prev].map(|p| {
            let (dx, dy) = g.side_vector(prev);
            p.offset(dx, dy)
        });
        let from_next = anchors[role.next()].map(|n| {
            let (dx, dy) = g.side_vector(role);
            n.offset(-dx, -dy)
        });
        match (from_prev, from_next) {
            (Some(a), Some(b)) => Point::new((a.x + b.x).div_euclid(2), (a.y + b.y).div_euclid(2)),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => {
                let (dx, dy) = g.centre_offset(self.config.layout, role);
                centre.offset(dx, dy)
            }
        }
    }

    /// Reconstructed position of `role`, in precision units.
    #[inline]
    pub fn final_position(&self, role: Role) -> Point {
        self.markers[role].position
    }

    /// All four reconstructed positions in perimeter order.
    pub fn corners(&self) -> RoleMap<Point> {
        self.markers.map(|m| m.position)
    }

    #[inline]
    pub fn median(&self) -> Point {
        self.geometry.median
    }

    /// Roll of the constellation in radians.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.geometry.roll
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.geometry.height
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.geometry.width
    }

    /// Seen mask of the last frame.
    #[inline]
    pub fn seen(&self) -> SeenMask {
        self.seen
    }

    pub fn confidence(&self, role: Role) -> Confidence {
        self.markers[role].confidence
    }

    /// Whether `role` was observed (rather than synthesized) last frame.
    pub fn is_visible(&self, role: Role) -> bool {
        self.markers[role].visible
    }

    /// Role assigned to camera `slot` last frame.
    pub fn slot_role(&self, slot: usize) -> Option<Role> {
        self.slot_roles.get(slot).copied().flatten()
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn geometry(&self) -> &GeometryModel {
        &self.geometry
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

impl Default for QuadTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKER_CONFIG)
    }
}

fn mean(points: impl Iterator<Item = Point>) -> Point {
    let (mut sx, mut sy, mut n) = (0i32, 0i32, 0i32);
    for p in points {
        sx += p.x;
        sy += p.y;
        n += 1;
    }
    if n == 0 {
        return Point::default();
    }
    Point::new(sx / n, sy / n)
}
