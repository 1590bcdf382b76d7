//! Orbital element records and photometric parameters.

use serde::{Deserialize, Serialize};

use crate::time::normalize_radians;
use crate::{EphemerisError, Result};

/// Sentinel marking an unset photometric slope parameter.
///
/// Magnitude evaluation treats a body carrying this sentinel as having no
/// usable phase-integral parameters and routes it to the radius/albedo
/// model instead.
pub const SLOPE_UNSET: f64 = -10.0;

/// Default slope parameter for the H-G magnitude system.
pub const SLOPE_DEFAULT: f64 = 0.15;

/// Heliocentric Keplerian elements for a closed (elliptical) orbit.
///
/// Angles are stored in radians, distances in AU, the epoch as a Julian
/// day. Records are validated at construction; a stored instance is always
/// usable for propagation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Semi-major axis in AU. Strictly positive.
    pub semi_major_axis_au: f64,
    /// Eccentricity, in [0, 1).
    pub eccentricity: f64,
    /// Inclination to the reference plane, radians.
    pub inclination_rad: f64,
    /// Longitude of the ascending node, radians.
    pub ascending_node_rad: f64,
    /// Argument of periapsis, radians.
    pub arg_periapsis_rad: f64,
    /// Mean anomaly at `epoch_jd`, radians.
    pub mean_anomaly_epoch_rad: f64,
    /// Epoch of the elements, Julian day.
    pub epoch_jd: f64,
    /// Orbital period in days. Strictly positive.
    pub period_days: f64,
}

impl OrbitalElements {
    /// Validate and build an element record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        semi_major_axis_au: f64,
        eccentricity: f64,
        inclination_rad: f64,
        ascending_node_rad: f64,
        arg_periapsis_rad: f64,
        mean_anomaly_epoch_rad: f64,
        epoch_jd: f64,
        period_days: f64,
    ) -> Result<Self> {
        let elements = Self {
            semi_major_axis_au,
            eccentricity,
            inclination_rad,
            ascending_node_rad,
            arg_periapsis_rad,
            mean_anomaly_epoch_rad,
            epoch_jd,
            period_days,
        };
        elements.validate()?;
        Ok(elements)
    }

    /// Check the constraints a usable closed orbit must satisfy.
    pub fn validate(&self) -> Result<()> {
        if !(self.semi_major_axis_au > 0.0) || !self.semi_major_axis_au.is_finite() {
            return Err(EphemerisError::InvalidElements(format!(
                "semi-major axis must be positive, got {}",
                self.semi_major_axis_au
            )));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(EphemerisError::InvalidElements(format!(
                "eccentricity must be in [0, 1), got {}",
                self.eccentricity
            )));
        }
        if !(self.period_days > 0.0) || !self.period_days.is_finite() {
            return Err(EphemerisError::InvalidElements(format!(
                "period must be positive, got {} days",
                self.period_days
            )));
        }
        Ok(())
    }

    /// Mean motion in radians per day.
    pub fn mean_motion_rad_per_day(&self) -> f64 {
        std::f64::consts::TAU / self.period_days
    }

    /// Mean anomaly at a Julian day, normalized to [0, 2π).
    pub fn mean_anomaly_at(&self, jd: f64) -> f64 {
        normalize_radians(
            self.mean_anomaly_epoch_rad + self.mean_motion_rad_per_day() * (jd - self.epoch_jd),
        )
    }
}

/// Absolute magnitude and phase slope in the H-G magnitude system, plus
/// the B-V color index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeParams {
    absolute_magnitude: f64,
    slope: f64,
    /// B-V color index; 0 renders as a solar-colored body.
    #[serde(default)]
    pub color_index_bv: f64,
}

impl MagnitudeParams {
    /// Build with an explicit H; the slope starts unset.
    pub fn new(absolute_magnitude: f64) -> Self {
        Self {
            absolute_magnitude,
            slope: SLOPE_UNSET,
            color_index_bv: 0.0,
        }
    }

    pub fn absolute_magnitude(&self) -> f64 {
        self.absolute_magnitude
    }

    /// Slope parameter to feed the phase integrals; substitutes the default
    /// when the catalog never supplied one.
    pub fn effective_slope(&self) -> f64 {
        if self.has_valid_slope() {
            self.slope
        } else {
            SLOPE_DEFAULT
        }
    }

    /// Whether a physically plausible slope was set.
    pub fn has_valid_slope(&self) -> bool {
        (-1.0..=2.0).contains(&self.slope)
    }

    /// Set H and G together, as catalogs deliver them.
    ///
    /// A slope outside [-1, 2] is rejected: the previous state is kept and
    /// `false` is returned. Values outside that range make the phase
    /// integrals meaningless.
    pub fn set_absolute_magnitude_and_slope(
        &mut self,
        absolute_magnitude: f64,
        slope: f64,
    ) -> bool {
        if !(-1.0..=2.0).contains(&slope) {
            log::warn!(
                "rejecting implausible magnitude slope G={slope} (H={absolute_magnitude}); \
                 keeping previous parameters"
            );
            return false;
        }
        self.absolute_magnitude = absolute_magnitude;
        self.slope = slope;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn circular_one_au() -> OrbitalElements {
        OrbitalElements::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2451545.0, 365.25).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_semi_major_axis() {
        let err = OrbitalElements::new(0.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0);
        assert!(matches!(err, Err(EphemerisError::InvalidElements(_))));
        let err = OrbitalElements::new(-2.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0);
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_open_orbits() {
        assert!(OrbitalElements::new(1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0).is_err());
        assert!(OrbitalElements::new(1.0, 1.5, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0).is_err());
        assert!(OrbitalElements::new(1.0, -0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0).is_err());
    }

    #[test]
    fn test_rejects_non_positive_period() {
        assert!(OrbitalElements::new(1.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0).is_err());
        assert!(OrbitalElements::new(1.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0).is_err());
    }

    #[test]
    fn test_mean_anomaly_advances_one_cycle_per_period() {
        let e = circular_one_au();
        assert_relative_eq!(e.mean_anomaly_at(e.epoch_jd), 0.0);
        assert_relative_eq!(
            e.mean_anomaly_at(e.epoch_jd + e.period_days / 4.0),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
        // Full period wraps back to zero
        assert_relative_eq!(
            e.mean_anomaly_at(e.epoch_jd + e.period_days),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_slope_sentinel_falls_back_to_default() {
        let params = MagnitudeParams::new(7.5);
        assert!(!params.has_valid_slope());
        assert_relative_eq!(params.effective_slope(), SLOPE_DEFAULT);
        assert_relative_eq!(params.color_index_bv, 0.0);
    }

    #[test]
    fn test_set_slope_accepts_plausible_range() {
        let mut params = MagnitudeParams::new(7.5);
        assert!(params.set_absolute_magnitude_and_slope(3.34, 0.12));
        assert_relative_eq!(params.absolute_magnitude(), 3.34);
        assert_relative_eq!(params.effective_slope(), 0.12);
    }

    #[test]
    fn test_set_slope_rejects_and_keeps_previous() {
        let mut params = MagnitudeParams::new(7.5);
        params.set_absolute_magnitude_and_slope(3.34, 0.12);
        assert!(!params.set_absolute_magnitude_and_slope(1.0, 2.5));
        assert!(!params.set_absolute_magnitude_and_slope(1.0, -1.5));
        assert_relative_eq!(params.absolute_magnitude(), 3.34);
        assert_relative_eq!(params.effective_slope(), 0.12);
    }
}
