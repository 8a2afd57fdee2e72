//! Axis-aligned bounding boxes.
//!
//! Boxes are built by min/max folding over their inputs, so `lower` never
//! exceeds `upper` on any axis. The ray test is the slab method clipped to
//! the caller's distance window.

use lumen_math::{gamma, Point3, Transform, Vec3};

use crate::Ray;

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Axis {
    /// The X axis.
    X = 0,
    /// The Y axis.
    Y = 1,
    /// The Z axis.
    Z = 2,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Entry and exit distances of a ray through a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Distance at which the ray enters the box (clipped to the window).
    pub begin: f64,
    /// Distance at which the ray leaves the box (clipped to the window).
    pub end: f64,
}

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    lower: Point3,
    upper: Point3,
}

impl BoundingBox {
    /// Create the smallest box containing both points.
    pub fn new(a: Point3, b: Point3) -> Self {
        Self {
            lower: a.inf(&b),
            upper: a.sup(&b),
        }
    }

    /// A zero-volume box around a single point.
    pub fn from_point(p: Point3) -> Self {
        Self { lower: p, upper: p }
    }

    /// Minimum corner.
    #[inline]
    pub fn lower(&self) -> &Point3 {
        &self.lower
    }

    /// Maximum corner.
    #[inline]
    pub fn upper(&self) -> &Point3 {
        &self.upper
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        Self {
            lower: self.lower.inf(&other.lower),
            upper: self.upper.sup(&other.upper),
        }
    }

    /// Overlap of two boxes, or `None` if they are disjoint.
    ///
    /// Touching boxes overlap in a degenerate box.
    pub fn intersect(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let lower = self.lower.sup(&other.lower);
        let upper = self.upper.inf(&other.upper);
        if lower.x <= upper.x && lower.y <= upper.y && lower.z <= upper.z {
            Some(Self { lower, upper })
        } else {
            None
        }
    }

    /// Whether at least two axes are degenerate, leaving no area.
    pub fn is_empty(&self) -> bool {
        let d = self.diagonal();
        let degenerate = Axis::ALL.iter().filter(|a| d[a.index()] == 0.0).count();
        degenerate >= 2
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.lower.x <= other.lower.x
            && self.lower.y <= other.lower.y
            && self.lower.z <= other.lower.z
            && self.upper.x >= other.upper.x
            && self.upper.y >= other.upper.y
            && self.upper.z >= other.upper.z
    }

    /// Vector from the lower to the upper corner.
    #[inline]
    pub fn diagonal(&self) -> Vec3 {
        self.upper - self.lower
    }

    /// Midpoint of the box.
    #[inline]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.lower, &self.upper)
    }

    /// Total area of the six faces.
    #[inline]
    pub fn surface_area(&self) -> f64 {
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Axis along which the box is widest. Ties prefer the lower axis.
    pub fn largest_axis(&self) -> Axis {
        let d = self.diagonal();
        if d.x >= d.y && d.x >= d.z {
            Axis::X
        } else if d.y >= d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Bounds of the eight corners after transformation.
    pub fn transformed(&self, transform: &Transform) -> BoundingBox {
        let mut builder = BoundingBoxBuilder::new();
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { self.lower.x } else { self.upper.x },
                if i & 2 == 0 { self.lower.y } else { self.upper.y },
                if i & 4 == 0 { self.lower.z } else { self.upper.z },
            );
            builder.add_point(&transform.apply_point(&corner));
        }
        builder.build()
    }

    /// Test ray-box intersection within `[min_distance, max_distance]`
    /// using the slab method.
    ///
    /// Returns the clipped entry/exit distances, or `None` if the ray
    /// misses the box inside the window. Axis-parallel rays are handled
    /// through the infinite reciprocals cached on the ray.
    #[inline]
    pub fn intersect_ray(
        &self,
        ray: &Ray,
        min_distance: f64,
        max_distance: f64,
    ) -> Option<Interval> {
        let bounds = [self.lower, self.upper];
        let sign = ray.sign();
        let inv = ray.inv_direction();

        let mut t_min = min_distance;
        let mut t_max = max_distance;
        for axis in 0..3 {
            let near = (bounds[sign[axis]][axis] - ray.origin[axis]) * inv[axis];
            let far = (bounds[1 - sign[axis]][axis] - ray.origin[axis]) * inv[axis];
            // `f64::max`/`min` discard a NaN operand, which appears when the
            // origin lies on a slab plane of an axis-parallel ray.
            t_min = t_min.max(near);
            t_max = t_max.min(far * (1.0 + 2.0 * gamma(3)));
            if t_min > t_max {
                return None;
            }
        }

        Some(Interval {
            begin: t_min,
            end: t_max,
        })
    }
}

/// Incremental min/max fold producing a [`BoundingBox`].
#[derive(Debug, Clone, Copy)]
pub struct BoundingBoxBuilder {
    lower: Point3,
    upper: Point3,
}

impl BoundingBoxBuilder {
    /// Start with nothing included.
    pub fn new() -> Self {
        Self {
            lower: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            upper: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Expand to include a point.
    pub fn add_point(&mut self, p: &Point3) -> &mut Self {
        self.lower = self.lower.inf(p);
        self.upper = self.upper.sup(p);
        self
    }

    /// Expand to include a box.
    pub fn add_box(&mut self, b: &BoundingBox) -> &mut Self {
        self.lower = self.lower.inf(&b.lower);
        self.upper = self.upper.sup(&b.upper);
        self
    }

    /// Expand to include everything another fold has seen.
    pub fn merge(&mut self, other: &BoundingBoxBuilder) -> &mut Self {
        self.lower = self.lower.inf(&other.lower);
        self.upper = self.upper.sup(&other.upper);
        self
    }

    /// Whether nothing has been added yet.
    pub fn is_unset(&self) -> bool {
        self.lower.x > self.upper.x
    }

    /// Finish the fold. Nothing added yields a degenerate box at the origin.
    pub fn build(&self) -> BoundingBox {
        if self.is_unset() {
            return BoundingBox::from_point(Point3::origin());
        }
        BoundingBox {
            lower: self.lower,
            upper: self.upper,
        }
    }
}

impl Default for BoundingBoxBuilder {
    fn default() -> Self {
        Self::new()
    }
}
