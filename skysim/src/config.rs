//! Simulation configuration.
//!
//! One JSON document describes the observer site, the view, the clock and
//! the body catalogs. Everything except the observer has defaults, so a
//! minimal config is just a latitude and longitude.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use ephemeris::tle::SatelliteRecord;
use skyproj::Mapping;

/// Projection mapping selection, as it appears in config files and on
/// the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    Perspective,
    Stereographic,
    Fisheye,
    Cylinder,
    Hammer,
}

impl ProjectionKind {
    pub fn mapping(self) -> Mapping {
        match self {
            ProjectionKind::Perspective => Mapping::Perspective,
            ProjectionKind::Stereographic => Mapping::Stereographic,
            ProjectionKind::Fisheye => Mapping::Fisheye,
            ProjectionKind::Cylinder => Mapping::Cylinder,
            ProjectionKind::Hammer => Mapping::Hammer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub projection: ProjectionKind,
    /// Total field of view across the smaller viewport dimension, degrees.
    pub fov_deg: f64,
    pub width_px: u32,
    pub height_px: u32,
    /// View direction azimuth, degrees from north through east.
    pub azimuth_deg: f64,
    /// View direction altitude above the horizon, degrees.
    pub altitude_deg: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionKind::Stereographic,
            fov_deg: 60.0,
            width_px: 1280,
            height_px: 720,
            azimuth_deg: 0.0,
            altitude_deg: 20.0,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Starting Julian day; the system clock when absent.
    pub start_jd: Option<f64>,
    /// Simulated seconds per wall second.
    pub rate: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            start_jd: None,
            rate: 1.0,
        }
    }
}

/// Minor planet catalog entry, angles in degrees as catalogs publish them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinorPlanetConfig {
    pub name: String,
    pub semi_major_axis_au: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub ascending_node_deg: f64,
    pub arg_periapsis_deg: f64,
    pub mean_anomaly_deg: f64,
    pub epoch_jd: f64,
    pub period_days: f64,
    #[serde(default)]
    pub absolute_magnitude: Option<f64>,
    #[serde(default)]
    pub slope: Option<f64>,
    /// Physical radius for the fallback magnitude model, km.
    #[serde(default)]
    pub radius_km: Option<f64>,
    /// Geometric albedo for the fallback magnitude model.
    #[serde(default)]
    pub albedo: Option<f64>,
}

/// Orbit trail rendering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per orbit trail.
    pub orbit_line_segments: usize,
    /// Simulated seconds between consecutive trail samples.
    pub orbit_segment_duration_s: f64,
    /// Samples faded at each end of the trail.
    pub orbit_fade_segments: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            orbit_line_segments: 90,
            orbit_segment_duration_s: 20.0,
            orbit_fade_segments: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub observer: ObserverConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub render: RenderConfig,
    /// Observer's heliocentric position in AU (J2000 ecliptic). Zero,
    /// i.e. Sun-centered rendering of distant bodies, when absent.
    #[serde(default)]
    pub observer_heliocentric_au: Option<[f64; 3]>,
    #[serde(default)]
    pub satellites: Vec<SatelliteRecord>,
    #[serde(default)]
    pub minor_planets: Vec<MinorPlanetConfig>,
}

impl SimConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing simulation config")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in config {}", path.display()))
    }
}
