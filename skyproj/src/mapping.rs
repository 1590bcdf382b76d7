//! The non-linear sphere-flattening mappings.
//!
//! Conventions shared by every mapping: the input is a point in the eye
//! frame where the view direction is the negative z axis. `forward`
//! rewrites it in place to (plane x, plane y, original radius) and reports
//! whether the point lies in the mapping's valid zone. `backward` takes a
//! plane point in x/y and rewrites it to the unit view direction it came
//! from. Forward always writes usable coordinates, valid or not, so
//! callers can still place labels for objects just outside the zone.

use nalgebra::Vector3;

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// Available projection mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    /// Gnomonic; straight lines stay straight.
    Perspective,
    /// Conformal; circles stay circles. The widest practical mapping.
    Stereographic,
    /// Equal-angle fisheye.
    Fisheye,
    /// Equirectangular cylinder.
    Cylinder,
    /// Hammer-Aitoff equal-area, for all-sky views.
    Hammer,
}

impl Mapping {
    /// Largest total field of view the mapping can display, degrees.
    pub fn max_fov_deg(self) -> f64 {
        match self {
            Mapping::Perspective => 150.0,
            Mapping::Stereographic => 235.0,
            Mapping::Fisheye => 180.0,
            Mapping::Cylinder => 175.0,
            Mapping::Hammer => 360.0,
        }
    }

    /// Flatten an eye-frame point. See the module docs for the in-place
    /// convention.
    pub fn forward(self, v: &mut Vector3<f64>) -> bool {
        let r = v.norm();
        match self {
            Mapping::Perspective => {
                if v.z < 0.0 {
                    v.x /= -v.z;
                    v.y /= -v.z;
                    v.z = r;
                    true
                } else if v.z > 0.0 {
                    // Behind the eye: mirror through the plane so the
                    // coordinates stay finite and continuous.
                    v.x /= v.z;
                    v.y /= v.z;
                    v.z = r;
                    false
                } else {
                    v.x = if v.x == 0.0 { 0.0 } else { v.x.signum() * 1e30 };
                    v.y = if v.y == 0.0 { 0.0 } else { v.y.signum() * 1e30 };
                    v.z = r;
                    false
                }
            }
            Mapping::Stereographic => {
                let h = 0.5 * (r - v.z);
                if h <= 0.0 {
                    // Exactly the anti-view direction
                    v.x = 1e30;
                    v.y = 0.0;
                    v.z = r;
                    return false;
                }
                let f = 1.0 / h;
                v.x *= f;
                v.y *= f;
                v.z = r;
                true
            }
            Mapping::Fisheye => {
                let rho_sq = v.x * v.x + v.y * v.y;
                let rho = rho_sq.sqrt();
                if rho > 0.0 {
                    let f = (rho).atan2(-v.z) / rho;
                    v.x *= f;
                    v.y *= f;
                    v.z = r;
                    true
                } else {
                    // On the optical axis: forward is the center, backward
                    // has no defined image point.
                    let ok = v.z < 0.0;
                    v.x = 0.0;
                    v.y = 0.0;
                    v.z = r;
                    ok
                }
            }
            Mapping::Cylinder => {
                let ok = r > 0.0 && v.y.abs() < r;
                let alpha = v.x.atan2(-v.z);
                let delta = if r > 0.0 {
                    (v.y / r).clamp(-1.0, 1.0).asin()
                } else {
                    0.0
                };
                v.x = alpha;
                v.y = delta;
                v.z = r;
                ok
            }
            Mapping::Hammer => {
                let alpha = v.x.atan2(-v.z);
                let delta = if r > 0.0 {
                    (v.y / r).clamp(-1.0, 1.0).asin()
                } else {
                    0.0
                };
                let cd = delta.cos();
                let w = (1.0 + cd * (alpha / 2.0).cos()).sqrt();
                v.x = 2.0 * SQRT_2 * cd * (alpha / 2.0).sin() / w;
                v.y = SQRT_2 * delta.sin() / w;
                v.z = r;
                r > 0.0
            }
        }
    }

    /// Invert a plane point back to the unit view direction. Returns false
    /// when the point lies outside the mapping's image; the output is
    /// still the best-effort direction.
    pub fn backward(self, v: &mut Vector3<f64>) -> bool {
        match self {
            Mapping::Perspective => {
                let inv_len = 1.0 / (v.x * v.x + v.y * v.y + 1.0).sqrt();
                v.x *= inv_len;
                v.y *= inv_len;
                v.z = -inv_len;
                true
            }
            Mapping::Stereographic => {
                let lqq = 0.25 * (v.x * v.x + v.y * v.y);
                let f = 1.0 / (lqq + 1.0);
                v.x *= f;
                v.y *= f;
                v.z = (lqq - 1.0) * f;
                true
            }
            Mapping::Fisheye => {
                let a = (v.x * v.x + v.y * v.y).sqrt();
                let ok = a <= std::f64::consts::PI;
                let f = if a > 0.0 { a.sin() / a } else { 1.0 };
                let z = -a.cos();
                v.x *= f;
                v.y *= f;
                v.z = z;
                ok
            }
            Mapping::Cylinder => {
                let ok = v.y.abs() <= std::f64::consts::FRAC_PI_2
                    && v.x.abs() <= std::f64::consts::PI;
                let (sin_a, cos_a) = v.x.sin_cos();
                let (sin_d, cos_d) = v.y.clamp(
                    -std::f64::consts::FRAC_PI_2,
                    std::f64::consts::FRAC_PI_2,
                )
                .sin_cos();
                v.x = cos_d * sin_a;
                v.y = sin_d;
                v.z = -cos_d * cos_a;
                ok
            }
            Mapping::Hammer => {
                let zsq = 1.0 - v.x * v.x / 16.0 - v.y * v.y / 4.0;
                let ok = v.x * v.x / 8.0 + v.y * v.y / 2.0 < 1.0;
                let z = if zsq > 0.0 { zsq.sqrt() } else { 0.0 };
                let alpha = 2.0 * (z * v.x).atan2(2.0 * (2.0 * zsq - 1.0));
                let delta = (v.y * z).clamp(-1.0, 1.0).asin();
                let (sin_a, cos_a) = alpha.sin_cos();
                let (sin_d, cos_d) = delta.sin_cos();
                v.x = cos_d * sin_a;
                v.y = sin_d;
                v.z = -cos_d * cos_a;
                ok
            }
        }
    }

    /// Plane distance of a point at angular distance `half_fov` from the
    /// view axis. Feeds the pixels-per-radian scaling of the viewport.
    pub fn fov_to_view_scaling(self, half_fov: f64) -> f64 {
        match self {
            Mapping::Perspective => half_fov.tan(),
            Mapping::Stereographic => 2.0 * (half_fov / 2.0).tan(),
            Mapping::Fisheye | Mapping::Cylinder => half_fov,
            Mapping::Hammer => {
                2.0 * SQRT_2 * (half_fov / 2.0).sin() / (1.0 + (half_fov / 2.0).cos()).sqrt()
            }
        }
    }

    /// Stable lowercase name, as used in configs and user interfaces.
    pub fn name(self) -> &'static str {
        match self {
            Mapping::Perspective => "perspective",
            Mapping::Stereographic => "stereographic",
            Mapping::Fisheye => "fisheye",
            Mapping::Cylinder => "cylinder",
            Mapping::Hammer => "hammer",
        }
    }

    /// Mapping for a name. An unknown name degrades to the stereographic
    /// default with a warning rather than failing the caller.
    pub fn from_name(name: &str) -> Mapping {
        match name {
            "perspective" => Mapping::Perspective,
            "stereographic" => Mapping::Stereographic,
            "fisheye" => Mapping::Fisheye,
            "cylinder" => Mapping::Cylinder,
            "hammer" => Mapping::Hammer,
            other => {
                log::warn!("unknown projection mapping {other:?}, using stereographic");
                Mapping::Stereographic
            }
        }
    }

    /// All mappings, for sweeps.
    pub const ALL: [Mapping; 5] = [
        Mapping::Perspective,
        Mapping::Stereographic,
        Mapping::Fisheye,
        Mapping::Cylinder,
        Mapping::Hammer,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_unit(v: &Vector3<f64>) {
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_center_maps_to_origin_for_all_mappings() {
        for mapping in Mapping::ALL {
            let mut v = Vector3::new(0.0, 0.0, -2.5);
            assert!(mapping.forward(&mut v), "{mapping:?}");
            assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
            assert_relative_eq!(v.y, 0.0, epsilon = 1e-12);
            // Third component preserves the pre-mapping radius
            assert_relative_eq!(v.z, 2.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_forward_backward_round_trip() {
        let directions = [
            Vector3::new(0.1, 0.2, -1.0),
            Vector3::new(-0.4, 0.1, -0.8),
            Vector3::new(0.3, -0.5, -0.6),
            Vector3::new(0.05, 0.0, -1.0),
        ];
        for mapping in Mapping::ALL {
            for dir in directions {
                let unit = dir.normalize();
                let mut v = unit;
                assert!(mapping.forward(&mut v), "{mapping:?} {dir:?}");
                assert!(mapping.backward(&mut v), "{mapping:?} {dir:?}");
                assert_unit(&v);
                assert_relative_eq!(v.x, unit.x, epsilon = 1e-9);
                assert_relative_eq!(v.y, unit.y, epsilon = 1e-9);
                assert_relative_eq!(v.z, unit.z, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_round_trip_random_forward_hemisphere() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(42);
        for mapping in Mapping::ALL {
            for _ in 0..200 {
                let x = rng.gen_range(-0.7..0.7);
                let y = rng.gen_range(-0.7..0.7);
                let unit = Vector3::new(x, y, -1.0).normalize();
                let mut v = unit;
                assert!(mapping.forward(&mut v));
                assert!(mapping.backward(&mut v));
                assert_relative_eq!(v.x, unit.x, epsilon = 1e-9);
                assert_relative_eq!(v.y, unit.y, epsilon = 1e-9);
                assert_relative_eq!(v.z, unit.z, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_forward_scales_with_radius_invariance() {
        // Plane coordinates depend only on direction, not distance
        for mapping in Mapping::ALL {
            let mut near = Vector3::new(0.2, -0.3, -1.0);
            let mut far = near * 1000.0;
            mapping.forward(&mut near);
            mapping.forward(&mut far);
            assert_relative_eq!(near.x, far.x, epsilon = 1e-9);
            assert_relative_eq!(near.y, far.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_perspective_rejects_behind_but_stays_finite() {
        let mut v = Vector3::new(0.1, 0.2, 1.0);
        assert!(!Mapping::Perspective.forward(&mut v));
        assert!(v.x.is_finite() && v.y.is_finite());
    }

    #[test]
    fn test_stereographic_accepts_beyond_hemisphere() {
        // 120 degrees off axis is fine for the conformal mapping
        let x = 3.0f64.sqrt() / 2.0;
        let mut v = Vector3::new(x, 0.0, 0.5);
        assert!(Mapping::Stereographic.forward(&mut v));
        let mut back = v;
        assert!(Mapping::Stereographic.backward(&mut back));
        assert_relative_eq!(back.x, x, epsilon = 1e-9);
        assert_relative_eq!(back.z, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_fisheye_plane_radius_is_angle() {
        // 90 degrees off axis lands at plane radius pi/2
        let mut v = Vector3::new(1.0, 0.0, 0.0);
        assert!(Mapping::Fisheye.forward(&mut v));
        assert_relative_eq!(v.x, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(v.y, 0.0);
    }

    #[test]
    fn test_fisheye_backward_outside_circle_invalid() {
        let mut v = Vector3::new(3.5, 0.0, 0.0);
        assert!(!Mapping::Fisheye.backward(&mut v));
    }

    #[test]
    fn test_cylinder_angles() {
        let mut v = Vector3::new(1.0, 0.0, -1.0);
        assert!(Mapping::Cylinder.forward(&mut v));
        assert_relative_eq!(v.x, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(v.y, 0.0);
    }

    #[test]
    fn test_cylinder_pole_is_invalid_but_finite() {
        let mut v = Vector3::new(0.0, 1.0, 0.0);
        assert!(!Mapping::Cylinder.forward(&mut v));
        assert!(v.x.is_finite() && v.y.is_finite());
    }

    #[test]
    fn test_hammer_covers_full_sphere() {
        // Straight behind the eye still yields finite plane coordinates
        let mut v = Vector3::new(0.001, 0.0, 1.0);
        assert!(Mapping::Hammer.forward(&mut v));
        assert!(v.x.abs() < 2.0 * SQRT_2 + 1e-9);
        assert!(v.y.abs() < SQRT_2 + 1e-9);
    }

    #[test]
    fn test_hammer_backward_recovers_longitude() {
        // The inverse must undo the half-angle parametrization of the
        // forward mapping, not return half the azimuth.
        for alpha in [0.2f64, -0.7, 1.5, 2.8] {
            let unit = Vector3::new(alpha.sin(), 0.0, -alpha.cos());
            let mut v = unit;
            assert!(Mapping::Hammer.forward(&mut v));
            assert!(Mapping::Hammer.backward(&mut v));
            assert_relative_eq!(v.x.atan2(-v.z), alpha, epsilon = 1e-9);
            assert_relative_eq!(v.y, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_hammer_backward_outside_ellipse_invalid() {
        let mut v = Vector3::new(3.0, 1.0, 0.0);
        assert!(!Mapping::Hammer.backward(&mut v));
    }

    #[test]
    fn test_view_scaling_matches_forward_mapping() {
        // A point half_fov off axis must land at plane radius
        // fov_to_view_scaling(half_fov)
        for mapping in Mapping::ALL {
            for half_fov_deg in [5.0, 20.0, 45.0, 60.0] {
                let a = f64::to_radians(half_fov_deg);
                let mut v = Vector3::new(a.sin(), 0.0, -a.cos());
                mapping.forward(&mut v);
                assert_relative_eq!(
                    v.x,
                    mapping.fov_to_view_scaling(a),
                    epsilon = 1e-9,
                    max_relative = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_name_round_trip() {
        for mapping in Mapping::ALL {
            assert_eq!(Mapping::from_name(mapping.name()), mapping);
        }
        assert_eq!(Mapping::from_name("mercator"), Mapping::Stereographic);
    }

    #[test]
    fn test_max_fov_ordering() {
        assert!(Mapping::Hammer.max_fov_deg() > Mapping::Stereographic.max_fov_deg());
        assert!(Mapping::Stereographic.max_fov_deg() > Mapping::Perspective.max_fov_deg());
    }
}
