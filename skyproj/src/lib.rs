//! Non-linear projections from the celestial sphere onto a viewport.
//!
//! The pipeline is: model-view rotation into the eye frame (looking down
//! the negative z axis), a non-linear forward mapping that flattens the
//! sphere, then the viewport transform into pixels. Every mapping also has
//! an analytic inverse, so screen picks go back to sky directions without
//! iteration.

use thiserror::Error;

pub mod arc;
pub mod mapping;
pub mod projector;
pub mod sphere;

pub use arc::{
    draw_great_circle_arc, draw_great_circle_arc_with_crossings, draw_small_circle_arc,
    draw_small_circle_arc_with_crossings, ArcError,
};
pub use mapping::Mapping;
pub use projector::{MaskType, Projector, ProjectorParams};
pub use sphere::SphericalCap;

/// Errors from the projection layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    /// Viewport dimensions must be positive.
    #[error("degenerate viewport {width}x{height}")]
    DegenerateViewport { width: u32, height: u32 },
}
