//! Minor planets: osculating-element propagation and apparent magnitude
//! models.

use nalgebra::Vector3;

use crate::elements::{MagnitudeParams, OrbitalElements};
use crate::kepler::EllipticalOrbit;

/// Apparent magnitude of the Sun at 1 AU.
const SUN_APPARENT_MAGNITUDE: f64 = -26.73;

const KM_PER_AU: f64 = 1.495_978_707e8;

/// Apparent visual magnitude of a body at `body_helio_au` seen from
/// `observer_helio_au` (both heliocentric, AU).
///
/// With a valid slope parameter the Bowell phase-integral model is used;
/// the unset-slope sentinel routes to the radius/albedo Lambert-sphere
/// fallback instead. The two scales are independent and a body switching
/// between them will not produce continuous magnitudes.
pub fn apparent_magnitude(
    params: Option<&MagnitudeParams>,
    body_helio_au: &Vector3<f64>,
    observer_helio_au: &Vector3<f64>,
    radius_km: f64,
    albedo: f64,
) -> f64 {
    let to_observer = observer_helio_au - body_helio_au;
    let helio_dist = body_helio_au.norm();
    let observer_dist = to_observer.norm();
    // Sun-body-observer angle, cosine clamped against rounding
    let cos_phase = (-body_helio_au).dot(&to_observer) / (helio_dist * observer_dist);
    let phase_angle = cos_phase.clamp(-1.0, 1.0).acos();
    match params {
        Some(p) if p.has_valid_slope() => {
            hg_magnitude(p, helio_dist, observer_dist, phase_angle)
        }
        _ => lambert_magnitude(radius_km, albedo, helio_dist, observer_dist, phase_angle),
    }
}

/// H-G system magnitude from distances (AU) and phase angle (radians).
///
/// The phase integrals are the standard Bowell fits; an unset slope
/// degrades to the conventional 0.15 via
/// [`MagnitudeParams::effective_slope`].
pub fn hg_magnitude(
    params: &MagnitudeParams,
    helio_dist_au: f64,
    observer_dist_au: f64,
    phase_angle_rad: f64,
) -> f64 {
    let slope = params.effective_slope();
    let tan_half = (phase_angle_rad / 2.0).tan();
    let phi1 = (-3.33 * tan_half.powf(0.63)).exp();
    let phi2 = (-1.87 * tan_half.powf(1.22)).exp();
    // The fit collapses to zero past ~120 degrees phase; floor it so the
    // magnitude stays finite there.
    let phase_integral = ((1.0 - slope) * phi1 + slope * phi2).max(1e-12);

    params.absolute_magnitude() + 5.0 * (helio_dist_au * observer_dist_au).log10()
        - 2.5 * phase_integral.log10()
}

/// Radius/albedo fallback magnitude: a Lambert sphere of the given size,
/// inverse-square falloff plus phase darkening.
pub fn lambert_magnitude(
    radius_km: f64,
    albedo: f64,
    helio_dist_au: f64,
    observer_dist_au: f64,
    phase_angle_rad: f64,
) -> f64 {
    let phi = phase_angle_rad;
    // Lambert phase law, 1 at opposition, 0 at conjunction
    let phase_factor = ((std::f64::consts::PI - phi) * phi.cos() + phi.sin())
        / std::f64::consts::PI;
    let radius_au = radius_km / KM_PER_AU;
    let flux = (2.0 / 3.0) * albedo * radius_au * radius_au * phase_factor.max(1e-12)
        / (helio_dist_au * helio_dist_au * observer_dist_au * observer_dist_au);
    SUN_APPARENT_MAGNITUDE - 2.5 * flux.log10()
}

/// One osculating refit: elements valid around their epoch.
#[derive(Debug, Clone)]
struct Refit {
    epoch_jd: f64,
    orbit: EllipticalOrbit,
}

/// A minor planet propagated from a table of osculating refits.
///
/// Each query selects the refit whose epoch is nearest and propagates
/// elliptically from it. A single-entry table is the common case; dense
/// tables keep perturbed bodies accurate over long spans.
#[derive(Debug, Clone)]
pub struct OsculatingOrbit {
    name: String,
    refits: Vec<Refit>,
    magnitude_params: Option<MagnitudeParams>,
    radius_km: f64,
    albedo: f64,
}

impl OsculatingOrbit {
    pub fn new(name: impl Into<String>, elements: OrbitalElements) -> Self {
        Self {
            name: name.into(),
            refits: vec![Refit {
                epoch_jd: elements.epoch_jd,
                orbit: EllipticalOrbit::new(elements),
            }],
            magnitude_params: None,
            radius_km: 1.0,
            albedo: 0.15,
        }
    }

    /// Attach H-G photometric parameters, switching magnitude queries to
    /// the phase-integral model.
    pub fn with_magnitude_params(mut self, params: MagnitudeParams) -> Self {
        self.magnitude_params = Some(params);
        self
    }

    /// Physical size and albedo for the fallback magnitude model.
    pub fn with_photometry(mut self, radius_km: f64, albedo: f64) -> Self {
        self.radius_km = radius_km;
        self.albedo = albedo;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn magnitude_params(&self) -> Option<&MagnitudeParams> {
        self.magnitude_params.as_ref()
    }

    pub fn magnitude_params_mut(&mut self) -> Option<&mut MagnitudeParams> {
        self.magnitude_params.as_mut()
    }

    /// Insert another refit, keeping the table epoch-ordered.
    pub fn add_refit(&mut self, elements: OrbitalElements) {
        let refit = Refit {
            epoch_jd: elements.epoch_jd,
            orbit: EllipticalOrbit::new(elements),
        };
        let at = self
            .refits
            .partition_point(|r| r.epoch_jd < refit.epoch_jd);
        self.refits.insert(at, refit);
    }

    pub fn refit_count(&self) -> usize {
        self.refits.len()
    }

    /// The refit whose epoch is nearest to `jd`.
    fn refit_for(&self, jd: f64) -> &Refit {
        let at = self.refits.partition_point(|r| r.epoch_jd < jd);
        let candidate_after = self.refits.get(at);
        let candidate_before = at.checked_sub(1).and_then(|i| self.refits.get(i));
        let chosen = match (candidate_before, candidate_after) {
            (Some(b), Some(a)) => {
                if jd - b.epoch_jd <= a.epoch_jd - jd {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            // Construction guarantees at least one refit
            (None, None) => &self.refits[0],
        };
        if self.refits.len() > 1 {
            let span = (self.refits.last().map(|r| r.epoch_jd).unwrap_or(jd)
                - self.refits[0].epoch_jd)
                / (self.refits.len() - 1) as f64;
            if (jd - chosen.epoch_jd).abs() > span {
                log::debug!(
                    "{}: extrapolating {:.1} days beyond nearest refit epoch",
                    self.name,
                    (jd - chosen.epoch_jd).abs()
                );
            }
        }
        chosen
    }

    /// Heliocentric position in AU at a Julian day.
    pub fn position_at(&self, jd: f64) -> Vector3<f64> {
        self.refit_for(jd).orbit.position_at(jd)
    }

    /// Heliocentric velocity in AU/day at a Julian day.
    pub fn velocity_at(&self, jd: f64) -> Vector3<f64> {
        self.refit_for(jd).orbit.velocity_at(jd)
    }

    /// Apparent magnitude as seen from an observer at a heliocentric
    /// position (AU).
    pub fn magnitude_at(&self, observer_helio_au: &Vector3<f64>, jd: f64) -> f64 {
        apparent_magnitude(
            self.magnitude_params.as_ref(),
            &self.position_at(jd),
            observer_helio_au,
            self.radius_km,
            self.albedo,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(h: f64, g: f64) -> MagnitudeParams {
        let mut p = MagnitudeParams::new(h);
        assert!(p.set_absolute_magnitude_and_slope(h, g));
        p
    }

    fn ceres_elements() -> OrbitalElements {
        OrbitalElements::new(2.77, 0.076, 0.184, 1.402, 1.285, 0.5, 2451545.0, 1681.6).unwrap()
    }

    #[test]
    fn test_zero_phase_reduces_to_distance_law() {
        // Both phase integrals are 1 at zero phase
        let p = params(3.34, 0.12);
        let m = hg_magnitude(&p, 2.77, 1.77, 0.0);
        assert_relative_eq!(m, 3.34 + 5.0 * (2.77f64 * 1.77).log10(), epsilon = 1e-12);
    }

    #[test]
    fn test_magnitude_increases_with_phase_for_both_models() {
        let p = params(7.0, 0.15);
        let mut previous_hg = f64::NEG_INFINITY;
        let mut previous_lambert = f64::NEG_INFINITY;
        for step in 0..30 {
            let phase = f64::from(step) * 0.1;
            let hg = hg_magnitude(&p, 2.0, 1.0, phase);
            let lambert = lambert_magnitude(470.0, 0.09, 2.0, 1.0, phase);
            assert!(hg > previous_hg, "H-G not monotone at phase {phase}");
            assert!(lambert > previous_lambert, "Lambert not monotone at phase {phase}");
            previous_hg = hg;
            previous_lambert = lambert;
        }
    }

    #[test]
    fn test_unset_slope_matches_default() {
        let unset = MagnitudeParams::new(7.0);
        let explicit = params(7.0, 0.15);
        let a = hg_magnitude(&unset, 2.0, 1.5, 0.4);
        let b = hg_magnitude(&explicit, 2.0, 1.5, 0.4);
        assert_relative_eq!(a, b, epsilon = 1e-12);
    }

    #[test]
    fn test_extreme_phase_stays_finite() {
        let p = params(7.0, 0.15);
        assert!(hg_magnitude(&p, 2.0, 1.0, 3.1).is_finite());
        assert!(lambert_magnitude(470.0, 0.09, 2.0, 1.0, 3.14).is_finite());
        assert!(lambert_magnitude(470.0, 0.09, 2.0, 1.0, 0.0).is_finite());
    }

    #[test]
    fn test_fallback_magnitude_is_realistic_for_ceres_size() {
        // A 470 km, 0.09 albedo body at Ceres distances should land near
        // the known 7-9 magnitude band
        let m = lambert_magnitude(470.0, 0.09, 2.77, 1.77, 0.2);
        assert!((6.0..9.5).contains(&m), "magnitude {m}");
    }

    #[test]
    fn test_hg_body_magnitude_band() {
        let body =
            OsculatingOrbit::new("Ceres", ceres_elements()).with_magnitude_params(params(3.34, 0.12));
        let observer = Vector3::new(1.0, 0.0, 0.0);
        for step in 0..16 {
            let jd = 2451545.0 + f64::from(step) * 105.0;
            let m = body.magnitude_at(&observer, jd);
            assert!((6.0..10.0).contains(&m), "magnitude {m} at step {step}");
        }
    }

    #[test]
    fn test_body_without_params_uses_fallback() {
        let body = OsculatingOrbit::new("1998 XY", ceres_elements()).with_photometry(470.0, 0.09);
        let observer = Vector3::new(1.0, 0.0, 0.0);
        let m = body.magnitude_at(&observer, 2451545.0);
        assert!(m.is_finite());
        assert!((5.0..11.0).contains(&m), "magnitude {m}");
    }

    #[test]
    fn test_unset_slope_sentinel_routes_to_fallback() {
        // H present but G never set: the sentinel selects the
        // radius/albedo model, same as carrying no parameters at all
        let with_sentinel = OsculatingOrbit::new("X", ceres_elements())
            .with_magnitude_params(MagnitudeParams::new(3.34))
            .with_photometry(470.0, 0.09);
        let without = OsculatingOrbit::new("X", ceres_elements()).with_photometry(470.0, 0.09);
        let observer = Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(
            with_sentinel.magnitude_at(&observer, 2451545.0),
            without.magnitude_at(&observer, 2451545.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_refit_selection_picks_nearest_epoch() {
        let mut early = ceres_elements();
        early.epoch_jd = 2451545.0;
        let mut late = ceres_elements();
        late.epoch_jd = 2453545.0;
        // Distinguish the refits by mean anomaly
        late.mean_anomaly_epoch_rad = 2.0;

        let mut body = OsculatingOrbit::new("Ceres", early);
        body.add_refit(late);
        assert_eq!(body.refit_count(), 2);

        let from_early = body.position_at(2451600.0);
        let from_late = body.position_at(2453500.0);
        // Same query time against each refit's own orbit
        let early_orbit = EllipticalOrbit::new(early);
        let late_orbit = EllipticalOrbit::new(late);
        assert_relative_eq!(from_early.x, early_orbit.position_at(2451600.0).x, epsilon = 1e-12);
        assert_relative_eq!(from_late.x, late_orbit.position_at(2453500.0).x, epsilon = 1e-12);
    }

    #[test]
    fn test_refits_stay_sorted() {
        let mut a = ceres_elements();
        a.epoch_jd = 2452000.0;
        let mut b = ceres_elements();
        b.epoch_jd = 2451000.0;
        let mut body = OsculatingOrbit::new("X", a);
        body.add_refit(b);
        // Nearest to an early time is the early refit
        let early_orbit = EllipticalOrbit::new(b);
        assert_relative_eq!(
            body.position_at(2451001.0).x,
            early_orbit.position_at(2451001.0).x,
            epsilon = 1e-12
        );
    }
}
