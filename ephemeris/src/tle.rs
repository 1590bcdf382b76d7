//! Artificial satellites from two-line element sets.
//!
//! Parsing and propagation are delegated to the `sgp4` crate; this module
//! wraps its types behind the crate error type, anchors each element set to
//! a Julian-day epoch, and derives topocentric look angles and Doppler for
//! radio work. Satellite states are kilometers in the TEME frame, which
//! this crate treats as interchangeable with the true equator of date at
//! rendering accuracy.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::frames::ObserverLocation;
use crate::time::{gmst_radians, julian_day_from_naive, normalize_radians, SECONDS_PER_DAY};
use crate::{EphemerisError, Result};

/// WGS84 equatorial radius, km.
const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;

/// WGS84 flattening.
const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Earth rotation rate, rad/s.
const EARTH_ROTATION_RATE: f64 = 7.292_115e-5;

/// Speed of light, km/s.
const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Magnitude assigned to satellites whose catalog record carries no
/// standard magnitude.
pub const DEFAULT_SATELLITE_MAGNITUDE: f64 = 5.0;

/// Days past the element-set epoch after which SGP4 accuracy has visibly
/// degraded for LEO objects.
pub const STALE_ELEMENTS_DAYS: f64 = 30.0;

/// One satellite entry from the JSON catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteRecord {
    /// Display name.
    pub name: String,
    /// First TLE line.
    pub tle1: String,
    /// Second TLE line.
    pub tle2: String,
    /// Intrinsic standard magnitude at 1000 km and 90 degrees phase,
    /// where known.
    #[serde(default)]
    pub standard_magnitude: Option<f64>,
    /// Free-form catalog description.
    #[serde(default)]
    pub description: Option<String>,
    /// Catalog group tags, e.g. "visual" or "amateur".
    #[serde(default)]
    pub groups: Vec<String>,
}

impl SatelliteRecord {
    /// Decode a JSON array of catalog records.
    pub fn load_catalog(json: &str) -> Result<Vec<SatelliteRecord>> {
        serde_json::from_str(json)
            .map_err(|e| EphemerisError::MalformedRecord(format!("satellite catalog: {e}")))
    }
}

/// Topocentric look angles toward a satellite, with the range rate needed
/// for Doppler prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopocentricLook {
    /// Azimuth in radians, measured from north through east, in [0, 2π).
    pub azimuth_rad: f64,
    /// Elevation above the horizon in radians.
    pub elevation_rad: f64,
    /// Slant range in km.
    pub range_km: f64,
    /// Range rate in km/s, positive receding.
    pub range_rate_km_s: f64,
}

impl TopocentricLook {
    /// Doppler shift of a carrier in Hz. Negative while the satellite
    /// recedes.
    pub fn doppler_shift_hz(&self, carrier_hz: f64) -> f64 {
        -self.range_rate_km_s / SPEED_OF_LIGHT_KM_S * carrier_hz
    }

    /// Whether the satellite is above the local horizon.
    pub fn is_above_horizon(&self) -> bool {
        self.elevation_rad > 0.0
    }
}

/// A satellite propagated with SGP4 from its two-line element set.
pub struct TleSatellite {
    name: String,
    elements: sgp4::Elements,
    constants: sgp4::Constants,
    epoch_jd: f64,
    standard_magnitude: Option<f64>,
}

impl TleSatellite {
    /// Parse a TLE pair and prepare the propagator.
    ///
    /// Checksum or layout failures come back as [`EphemerisError::InvalidTle`];
    /// a malformed record never yields a usable satellite.
    pub fn from_tle(name: &str, line1: &str, line2: &str) -> Result<Self> {
        let elements =
            sgp4::Elements::from_tle(Some(name.to_owned()), line1.as_bytes(), line2.as_bytes())
                .map_err(|e| EphemerisError::InvalidTle {
                    designation: name.to_owned(),
                    reason: e.to_string(),
                })?;
        let constants =
            sgp4::Constants::from_elements(&elements).map_err(|e| EphemerisError::InvalidTle {
                designation: name.to_owned(),
                reason: e.to_string(),
            })?;
        let epoch_jd = julian_day_from_naive(&elements.datetime);
        Ok(Self {
            name: name.to_owned(),
            elements,
            constants,
            epoch_jd,
            standard_magnitude: None,
        })
    }

    /// Build from a catalog record.
    pub fn from_record(record: &SatelliteRecord) -> Result<Self> {
        let mut satellite = Self::from_tle(&record.name, &record.tle1, &record.tle2)?;
        satellite.standard_magnitude = record.standard_magnitude;
        Ok(satellite)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// NORAD catalog number.
    pub fn norad_id(&self) -> u64 {
        self.elements.norad_id
    }

    /// Epoch of the element set as a Julian day.
    pub fn epoch_jd(&self) -> f64 {
        self.epoch_jd
    }

    /// Days between the element-set epoch and `jd`.
    pub fn staleness_days(&self, jd: f64) -> f64 {
        (jd - self.epoch_jd).abs()
    }

    /// Whether the element set is old enough at `jd` that predictions
    /// should be treated as degraded. Diagnostic only; propagation still
    /// runs.
    pub fn is_stale(&self, jd: f64) -> bool {
        self.staleness_days(jd) > STALE_ELEMENTS_DAYS
    }

    /// Visual magnitude placeholder until a phase-dependent model is fed
    /// with range and illumination.
    pub fn magnitude(&self) -> f64 {
        self.standard_magnitude
            .unwrap_or(DEFAULT_SATELLITE_MAGNITUDE)
    }

    /// Geocentric TEME position in km at a Julian day.
    pub fn position_teme_at(&self, jd: f64) -> Result<Vector3<f64>> {
        self.state_teme_at(jd).map(|(position, _)| position)
    }

    /// Geocentric TEME position (km) and velocity (km/s) at a Julian day.
    pub fn state_teme_at(&self, jd: f64) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let minutes = (jd - self.epoch_jd) * SECONDS_PER_DAY / 60.0;
        let prediction = self
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .map_err(|e| EphemerisError::PropagationFailed {
                designation: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok((
            Vector3::from(prediction.position),
            Vector3::from(prediction.velocity),
        ))
    }

    /// Look angles and range rate from a ground observer at a Julian day.
    pub fn look_from(&self, observer: &ObserverLocation, jd: f64) -> Result<TopocentricLook> {
        let (sat_pos, sat_vel) = self.state_teme_at(jd)?;

        let theta = gmst_radians(jd) + observer.longitude_rad;
        let obs_pos = observer_teme_position(observer, theta);
        // Site velocity is Earth rotation about the polar axis
        let omega = Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE);
        let obs_vel = omega.cross(&obs_pos);

        let rho = sat_pos - obs_pos;
        let rho_dot = sat_vel - obs_vel;
        let range = rho.norm();

        let (sin_lat, cos_lat) = observer.latitude_rad.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        let up = Vector3::new(cos_lat * cos_theta, cos_lat * sin_theta, sin_lat);
        let east = Vector3::new(-sin_theta, cos_theta, 0.0);
        let north = Vector3::new(-sin_lat * cos_theta, -sin_lat * sin_theta, cos_lat);

        Ok(TopocentricLook {
            azimuth_rad: normalize_radians(rho.dot(&east).atan2(rho.dot(&north))),
            elevation_rad: (rho.dot(&up) / range).asin(),
            range_km: range,
            range_rate_km_s: rho.dot(&rho_dot) / range,
        })
    }
}

/// Unit direction from a ground observer to a geocentric TEME position.
///
/// For drawing, where only the direction matters; use
/// [`TleSatellite::look_from`] when range and range rate are needed.
pub fn topocentric_direction_teme(
    observer: &ObserverLocation,
    jd: f64,
    target_km: &Vector3<f64>,
) -> Vector3<f64> {
    let theta = gmst_radians(jd) + observer.longitude_rad;
    (target_km - observer_teme_position(observer, theta)).normalize()
}

/// Geodetic site position rotated into TEME at local sidereal angle
/// `theta`.
fn observer_teme_position(observer: &ObserverLocation, theta: f64) -> Vector3<f64> {
    let (sin_lat, cos_lat) = observer.latitude_rad.sin_cos();
    let e2 = EARTH_FLATTENING * (2.0 - EARTH_FLATTENING);
    let n = EARTH_EQUATORIAL_RADIUS_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let altitude_km = observer.altitude_m / 1000.0;
    let r_xy = (n + altitude_km) * cos_lat;
    Vector3::new(
        r_xy * theta.cos(),
        r_xy * theta.sin(),
        (n * (1.0 - e2) + altitude_km) * sin_lat,
    )
}
