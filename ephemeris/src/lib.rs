//! Ephemeris calculation library for astronomical bodies
//!
//! This crate provides the computational core of a sky simulator: reference
//! frame transformations, orbit propagation for planets, minor planets and
//! artificial satellites, apparent magnitude models, and the per-body
//! position caches that keep orbit trails cheap to maintain while the
//! simulation clock runs.
//!
//! All positions are `nalgebra::Vector3<f64>`. Heliocentric orbits work in
//! astronomical units, satellite states in kilometers (TEME frame); each
//! propagator documents its convention.

use thiserror::Error;

pub mod body;
pub mod cache;
pub mod elements;
pub mod frames;
pub mod kepler;
pub mod minor_planet;
pub mod time;
pub mod tle;

pub use body::{Body, BodyId, BodyRegistry, Propagator};
pub use cache::{OrbitTrail, PositionCache, PropagatedState};
pub use elements::{MagnitudeParams, OrbitalElements};
pub use frames::{Frame, FrameTransformer, ObserverLocation};
pub use kepler::{solve_kepler, EllipticalOrbit, KeplerSolution};
pub use minor_planet::{apparent_magnitude, OsculatingOrbit};
pub use tle::{SatelliteRecord, TleSatellite, TopocentricLook};

/// Error types for ephemeris calculations
#[derive(Debug, Error)]
pub enum EphemerisError {
    /// TLE line pair failed checksum or column-layout validation.
    #[error("invalid TLE for {designation}: {reason}")]
    InvalidTle {
        /// Satellite designation from the catalog record.
        designation: String,
        /// Parser failure description.
        reason: String,
    },

    /// Orbital element record rejected at construction time.
    #[error("invalid orbital elements: {0}")]
    InvalidElements(String),

    /// SGP4 could not produce a state for the requested time
    /// (decayed or otherwise degenerate orbit).
    #[error("propagation failed for {designation}: {reason}")]
    PropagationFailed {
        /// Satellite designation from the catalog record.
        designation: String,
        /// Propagator failure description.
        reason: String,
    },

    /// Query referenced a body id that was never registered.
    #[error("unknown body id {0}")]
    UnknownBody(u64),

    /// Body catalog record could not be decoded.
    #[error("malformed body record: {0}")]
    MalformedRecord(String),
}

pub type Result<T> = std::result::Result<T, EphemerisError>;
