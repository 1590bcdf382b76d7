//! Scene assembly for the sky simulator.
//!
//! Ties the ephemeris layer (where things are) to the projection layer
//! (where they land on screen): a simulation clock, a configuration
//! format for observer, view and catalogs, and a [`Scene`] that produces
//! per-body screen snapshots and trail geometry.

pub mod clock;
pub mod config;
pub mod scene;

pub use clock::SimulationClock;
pub use config::{ProjectionKind, RenderConfig, SimConfig};
pub use scene::{Scene, ScreenEntry, TrailSegment};
