//! Axis-aligned bounding boxes and the fit-to-view normalization of imported objects.

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::data_structures::instance::Instance;

/// Edge length of the cube an imported object is scaled to fit into.
pub const FIT_EXTENT: f32 = 2.0;

/// The minimal axis-aligned box around a set of points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn from_point(point: Point3<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Returns `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point3<f32>>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::from_point(first), |mut aabb, p| {
            aabb.expand(p);
            aabb
        }))
    }

    pub fn expand(&mut self, p: Point3<f32>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut union = *self;
        union.expand(other.min);
        union.expand(other.max);
        union
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn max_dimension(&self) -> f32 {
        let size = self.size();
        size.x.max(size.y).max(size.z)
    }
}

/// Uniform scale that makes the largest dimension `FIT_EXTENT` long.
///
/// Degenerate boxes (all points coincide) and non-finite sizes fall back to `1.0`.
pub fn fit_scale(max_dimension: f32) -> f32 {
    if max_dimension > 0.0 && max_dimension.is_finite() {
        FIT_EXTENT / max_dimension
    } else {
        1.0
    }
}

/**
 * Builds the root transform that centres `bounds` on the origin and scales it uniformly
 * so that it fits a cube of edge length `FIT_EXTENT`.
 *
 * Translation is applied after scaling, so the offset is the scaled centre.
 * Without bounds (empty object) the identity transform is returned.
 */
pub fn fit_transform(bounds: Option<&Aabb>) -> Instance {
    let mut instance = Instance::new();
    if let Some(bounds) = bounds {
        let scale = fit_scale(bounds.max_dimension());
        instance.set_uniform_scale(scale);
        instance.position = -bounds.center().to_vec() * scale;
    }
    instance
}
