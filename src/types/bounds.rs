use serde::Serialize;

use crate::math::{Real, Vector3};

/// Axis-aligned bounding box in 3-D.
///
/// A freshly created box is in the empty state (`min = +MAX`,
/// `max = lowest`) and reports `is_valid() == false` until it absorbs a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: Vector3,
    pub max: Vector3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    pub fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vector3::splat(Real::MAX),
            max: Vector3::splat(Real::MIN),
        }
    }

    /// Smallest box containing every point of the iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vector3>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand(p);
        }
        bb
    }

    /// Return to the empty state.
    pub fn reset(&mut self) {
        *self = Self::empty();
    }

    /// Grow the box to include `point`.
    pub fn expand(&mut self, point: Vector3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to include `other`.
    pub fn expand_box(&mut self, other: &BoundingBox) {
        *self = self.merge(other);
    }

    /// Return the smallest box that contains both `self` and `other`.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Centre point of the box.
    pub fn center(&self) -> Vector3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector3 {
        self.max - self.min
    }

    /// Half-extents along each axis.
    pub fn half_extents(&self) -> Vector3 {
        self.size() * 0.5
    }

    /// Length of the space diagonal.
    pub fn diagonal(&self) -> Real {
        self.size().length()
    }

    pub fn volume(&self) -> Real {
        let s = self.size();
        s.x * s.y * s.z
    }

    pub fn surface_area(&self) -> Real {
        let s = self.size();
        2.0 * (s.x * s.y + s.y * s.z + s.z * s.x)
    }

    /// Whether a point lies inside (or on the boundary of) the box.
    pub fn contains_point(&self, p: Vector3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// `min <= max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }
}
