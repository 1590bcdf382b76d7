//! Regions on the unit sphere.

use nalgebra::Vector3;

/// A spherical cap: the set of unit vectors v with axis . v >= d.
///
/// d = 0 is a hemisphere, d = -1 the whole sphere, d -> 1 shrinks to the
/// axis point. Caps double as half-space clip volumes for arc drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCap {
    /// Unit axis through the cap center.
    pub axis: Vector3<f64>,
    /// Cosine of the cap's angular radius.
    pub d: f64,
}

impl SphericalCap {
    pub fn new(axis: Vector3<f64>, d: f64) -> Self {
        Self {
            axis: axis.normalize(),
            d,
        }
    }

    /// Cap covering everything within `aperture` radians of `axis`.
    pub fn from_aperture(axis: Vector3<f64>, aperture: f64) -> Self {
        Self::new(axis, aperture.cos())
    }

    /// Whole-sphere cap; contains every direction.
    pub fn full_sphere() -> Self {
        Self {
            axis: Vector3::z(),
            d: -1.1,
        }
    }

    /// Whether a direction lies inside the cap. The input need not be
    /// normalized when d <= 0 is not relied on; callers pass unit vectors.
    pub fn contains(&self, v: &Vector3<f64>) -> bool {
        self.axis.dot(v) >= self.d
    }

    /// Angular radius of the cap in radians.
    pub fn aperture(&self) -> f64 {
        self.d.clamp(-1.0, 1.0).acos()
    }

    /// Whether two caps share any direction: their axes are closer than
    /// the sum of the angular radii.
    pub fn intersects(&self, other: &SphericalCap) -> bool {
        let separation = self.axis.dot(&other.axis).clamp(-1.0, 1.0).acos();
        separation <= self.aperture() + other.aperture()
    }
}
