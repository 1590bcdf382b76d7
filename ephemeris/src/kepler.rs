//! Kepler's equation and closed-orbit propagation.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::elements::OrbitalElements;
use crate::time::normalize_radians;

/// Convergence tolerance on the eccentric anomaly residual, radians.
const KEPLER_TOLERANCE: f64 = 1e-12;

/// Iteration cap for the Newton-Raphson solve. High eccentricities near
/// periapsis converge slowest; 30 steps is far beyond what they need.
const KEPLER_MAX_ITERATIONS: u32 = 30;

/// Result of solving Kepler's equation M = E - e sin E.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    /// Eccentric anomaly in radians.
    pub eccentric_anomaly: f64,
    /// Newton-Raphson steps taken.
    pub iterations: u32,
    /// False only when the iteration cap was hit before the residual
    /// dropped below tolerance.
    pub converged: bool,
}

/// Solve Kepler's equation for the eccentric anomaly.
///
/// Newton-Raphson with the standard starter: E0 = M for modest
/// eccentricities, E0 = π when e >= 0.8 (the near-parabolic regime where
/// starting at M can diverge). Always returns a best-effort solution; a
/// capped solve is logged and flagged rather than turned into an error.
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
    let m = normalize_radians(mean_anomaly);
    let mut e_anom = if eccentricity < 0.8 {
        m
    } else {
        std::f64::consts::PI
    };

    for iteration in 0..KEPLER_MAX_ITERATIONS {
        let residual = e_anom - eccentricity * e_anom.sin() - m;
        if residual.abs() < KEPLER_TOLERANCE {
            return KeplerSolution {
                eccentric_anomaly: e_anom,
                iterations: iteration,
                converged: true,
            };
        }
        e_anom -= residual / (1.0 - eccentricity * e_anom.cos());
    }

    log::warn!(
        "Kepler solve hit iteration cap (M={m:.6}, e={eccentricity:.4}); \
         using last iterate E={e_anom:.6}"
    );
    KeplerSolution {
        eccentric_anomaly: e_anom,
        iterations: KEPLER_MAX_ITERATIONS,
        converged: false,
    }
}

/// A closed orbit propagated analytically from Keplerian elements.
///
/// The in-plane state is rotated into the elements' reference frame by
/// Rz(Ω) · Rx(i) · Rz(ω), computed once at construction.
#[derive(Debug, Clone)]
pub struct EllipticalOrbit {
    elements: OrbitalElements,
    plane_to_frame: Matrix3<f64>,
}

impl EllipticalOrbit {
    pub fn new(elements: OrbitalElements) -> Self {
        let rot_node =
            Rotation3::from_axis_angle(&Vector3::z_axis(), elements.ascending_node_rad);
        let rot_incl = Rotation3::from_axis_angle(&Vector3::x_axis(), elements.inclination_rad);
        let rot_peri = Rotation3::from_axis_angle(&Vector3::z_axis(), elements.arg_periapsis_rad);
        Self {
            elements,
            plane_to_frame: (rot_node * rot_incl * rot_peri).into_inner(),
        }
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }

    /// Position at a Julian day, in AU.
    pub fn position_at(&self, jd: f64) -> Vector3<f64> {
        let (position, _) = self.state_at(jd);
        position
    }

    /// Velocity at a Julian day, in AU per day.
    pub fn velocity_at(&self, jd: f64) -> Vector3<f64> {
        let (_, velocity) = self.state_at(jd);
        velocity
    }

    /// Position (AU) and velocity (AU/day) at a Julian day.
    pub fn state_at(&self, jd: f64) -> (Vector3<f64>, Vector3<f64>) {
        let a = self.elements.semi_major_axis_au;
        let ecc = self.elements.eccentricity;
        let b = a * (1.0 - ecc * ecc).sqrt();

        let solution = solve_kepler(self.elements.mean_anomaly_at(jd), ecc);
        let (sin_e, cos_e) = solution.eccentric_anomaly.sin_cos();

        let position = Vector3::new(a * (cos_e - ecc), b * sin_e, 0.0);

        // dE/dt from differentiating Kepler's equation
        let e_dot = self.elements.mean_motion_rad_per_day() / (1.0 - ecc * cos_e);
        let velocity = Vector3::new(-a * sin_e * e_dot, b * cos_e * e_dot, 0.0);

        (self.plane_to_frame * position, self.plane_to_frame * velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn elements(a: f64, e: f64) -> OrbitalElements {
        OrbitalElements::new(a, e, 0.0, 0.0, 0.0, 0.0, 2451545.0, 365.25).unwrap()
    }

    #[test]
    fn test_residual_small_across_eccentricity_sweep() {
        for e10 in 0..100 {
            let ecc = f64::from(e10) / 100.0;
            for m10 in 0..63 {
                let m = f64::from(m10) * 0.1;
                let sol = solve_kepler(m, ecc);
                let residual =
                    sol.eccentric_anomaly - ecc * sol.eccentric_anomaly.sin() - normalize_radians(m);
                assert!(
                    residual.abs() < 1e-8,
                    "e={ecc} M={m}: residual {residual}, {} iters",
                    sol.iterations
                );
                assert!(sol.converged);
            }
        }
    }

    #[test]
    fn test_residual_small_for_random_inputs() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let ecc: f64 = rng.gen_range(0.0..0.999);
            let m: f64 = rng.gen_range(-20.0..20.0);
            let sol = solve_kepler(m, ecc);
            let residual =
                sol.eccentric_anomaly - ecc * sol.eccentric_anomaly.sin() - normalize_radians(m);
            assert!(residual.abs() < 1e-8, "e={ecc} M={m}");
        }
    }

    #[test]
    fn test_circular_orbit_anomaly_equals_mean() {
        let sol = solve_kepler(1.234, 0.0);
        assert_relative_eq!(sol.eccentric_anomaly, 1.234);
        assert_eq!(sol.iterations, 0);
    }

    #[test]
    fn test_periapsis_distance() {
        // At M = 0 the body sits at periapsis, r = a(1 - e)
        let orbit = EllipticalOrbit::new(elements(1.0, 0.5));
        let r = orbit.position_at(orbit.elements().epoch_jd);
        assert_relative_eq!(r.norm(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(r.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_apoapsis_distance() {
        let orbit = EllipticalOrbit::new(elements(2.0, 0.3));
        let jd = orbit.elements().epoch_jd + orbit.elements().period_days / 2.0;
        assert_relative_eq!(orbit.position_at(jd).norm(), 2.0 * 1.3, epsilon = 1e-9);
    }

    #[test]
    fn test_circular_orbit_constant_radius() {
        let orbit = EllipticalOrbit::new(elements(1.5, 0.0));
        for step in 0..20 {
            let jd = orbit.elements().epoch_jd + f64::from(step) * 13.7;
            assert_relative_eq!(orbit.position_at(jd).norm(), 1.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_inclined_orbit_stays_in_plane() {
        let e = OrbitalElements::new(1.0, 0.2, 0.5, 1.0, 2.0, 0.0, 2451545.0, 365.25).unwrap();
        let orbit = EllipticalOrbit::new(e);
        // Orbit normal is Rz(node) * Rx(incl) * z-hat
        let normal = Rotation3::from_axis_angle(&Vector3::z_axis(), 1.0)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), 0.5)
            * Vector3::z();
        for step in 0..10 {
            let jd = 2451545.0 + f64::from(step) * 31.0;
            assert_relative_eq!(orbit.position_at(jd).dot(&normal), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_velocity_matches_finite_difference() {
        let orbit = EllipticalOrbit::new(elements(1.0, 0.6));
        let jd = orbit.elements().epoch_jd + 40.0;
        let h = 1e-5;
        let numeric = (orbit.position_at(jd + h) - orbit.position_at(jd - h)) / (2.0 * h);
        let analytic = orbit.velocity_at(jd);
        assert_relative_eq!(analytic.x, numeric.x, epsilon = 1e-6);
        assert_relative_eq!(analytic.y, numeric.y, epsilon = 1e-6);
        assert_relative_eq!(analytic.z, numeric.z, epsilon = 1e-6);
    }

    #[test]
    fn test_angular_momentum_conserved() {
        let orbit = EllipticalOrbit::new(elements(1.0, 0.8));
        let (r0, v0) = orbit.state_at(2451545.0);
        let h0 = r0.cross(&v0);
        for step in 1..12 {
            let (r, v) = orbit.state_at(2451545.0 + f64::from(step) * 17.3);
            let h = r.cross(&v);
            assert_relative_eq!(h.norm(), h0.norm(), epsilon = 1e-9);
        }
    }
}
