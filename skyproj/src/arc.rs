//! Great- and small-circle arc rasterization.
//!
//! Arcs are subdivided adaptively against the projector's pixel scale and
//! emitted as window-space segments, optionally clipped against a
//! [`SphericalCap`]. Clip crossings are located by bisection on the cap
//! membership test, so the emitted chain ends within a fraction of a pixel
//! of the true boundary.

use nalgebra::Vector3;
use thiserror::Error;

use crate::projector::Projector;
use crate::sphere::SphericalCap;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArcError {
    /// The two endpoints subtend half a turn or more; such an arc has no
    /// unique great-circle path.
    #[error("great-circle arc spans half a turn or more")]
    ArcExceedsHalfTurn,
}

/// Target on-screen length of one emitted segment, px.
const TARGET_SEGMENT_PX: f64 = 16.0;

const MIN_STEPS: usize = 3;
const MAX_STEPS: usize = 2048;

/// Bisection iterations when locating a clip boundary crossing.
const BISECTION_STEPS: u32 = 24;

/// Subdivide and project the shorter great-circle arc between two
/// directions.
///
/// `emit` is called once per visible segment with window-space endpoints,
/// in order from `start` to `stop`. A `clip` cap restricts emission to
/// directions it contains. Identical (or numerically indistinguishable)
/// endpoints produce no segments and no error.
pub fn draw_great_circle_arc(
    projector: &Projector,
    start: &Vector3<f64>,
    stop: &Vector3<f64>,
    clip: Option<&SphericalCap>,
    emit: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
) -> Result<(), ArcError> {
    draw_great_circle_arc_with_crossings(projector, start, stop, clip, emit, &mut |_, _| {})
}

/// Like [`draw_great_circle_arc`], additionally reporting each clip
/// boundary crossing.
///
/// `on_crossing` receives the window position of the crossing and the
/// unit screen-space travel direction of the arc there, for boundary
/// decorations. Crossings whose screen direction is degenerate (the two
/// window points coincide) are not reported.
pub fn draw_great_circle_arc_with_crossings(
    projector: &Projector,
    start: &Vector3<f64>,
    stop: &Vector3<f64>,
    clip: Option<&SphericalCap>,
    emit: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
    on_crossing: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
) -> Result<(), ArcError> {
    let a = start.normalize();
    let b = stop.normalize();
    let cross_norm = a.cross(&b).norm();
    let angle = cross_norm.atan2(a.dot(&b));
    if angle >= std::f64::consts::PI - 1e-10 {
        return Err(ArcError::ArcExceedsHalfTurn);
    }
    if cross_norm < 1e-12 {
        return Ok(());
    }

    let steps = ((angle * projector.pixels_per_radian() / TARGET_SEGMENT_PX).ceil() as usize)
        .clamp(MIN_STEPS, MAX_STEPS);

    let point_at = |t: f64| -> Vector3<f64> {
        // Spherical linear interpolation along the arc
        let sin_angle = angle.sin();
        (a * ((1.0 - t) * angle).sin() + b * (t * angle).sin()) / sin_angle
    };
    march_clipped(projector, steps, &point_at, clip, emit, on_crossing);
    Ok(())
}

/// Subdivide and project a small-circle arc around `center`.
///
/// `start` fixes the circle: its height along and radius about the
/// `center` axis. The arc runs counterclockwise around `center` (seen from
/// outside the sphere along the axis) until it reaches the azimuth of
/// `stop`; coincident azimuths trace the full circle. A `start` on the
/// axis degenerates to a point and emits nothing.
pub fn draw_small_circle_arc(
    projector: &Projector,
    start: &Vector3<f64>,
    stop: &Vector3<f64>,
    center: &Vector3<f64>,
    clip: Option<&SphericalCap>,
    emit: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
) {
    draw_small_circle_arc_with_crossings(projector, start, stop, center, clip, emit, &mut |_, _| {})
}

/// Like [`draw_small_circle_arc`], additionally reporting each clip
/// boundary crossing, with the same callback contract as
/// [`draw_great_circle_arc_with_crossings`].
pub fn draw_small_circle_arc_with_crossings(
    projector: &Projector,
    start: &Vector3<f64>,
    stop: &Vector3<f64>,
    center: &Vector3<f64>,
    clip: Option<&SphericalCap>,
    emit: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
    on_crossing: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
) {
    let axis = center.normalize();
    let a = start.normalize();
    let height = a.dot(&axis);
    let planar = a - axis * height;
    let radius = planar.norm();
    if radius < 1e-12 {
        return;
    }
    let u = planar / radius;
    let v = axis.cross(&u);

    let b = stop.normalize();
    let sweep = {
        let s = b.dot(&v).atan2(b.dot(&u)).rem_euclid(std::f64::consts::TAU);
        if s < 1e-12 {
            std::f64::consts::TAU
        } else {
            s
        }
    };

    // On-sky length of the arc is sweep * radius
    let steps = ((sweep * radius * projector.pixels_per_radian() / TARGET_SEGMENT_PX).ceil()
        as usize)
        .clamp(MIN_STEPS, MAX_STEPS);

    let point_at = |t: f64| -> Vector3<f64> {
        let (sin_t, cos_t) = (t * sweep).sin_cos();
        axis * height + (u * cos_t + v * sin_t) * radius
    };
    march_clipped(projector, steps, &point_at, clip, emit, on_crossing);
}

/// Walk the parametrized curve in `steps` increments, emitting segments
/// inside the clip cap and bisecting each membership flip to locate the
/// boundary.
fn march_clipped(
    projector: &Projector,
    steps: usize,
    point_at: &dyn Fn(f64) -> Vector3<f64>,
    clip: Option<&SphericalCap>,
    emit: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
    on_crossing: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
) {
    let inside = |p: &Vector3<f64>| clip.map_or(true, |cap| cap.contains(p));

    let mut t0 = 0.0;
    let mut p0 = point_at(0.0);
    let mut in0 = inside(&p0);
    for i in 1..=steps {
        let t1 = i as f64 / steps as f64;
        let p1 = point_at(t1);
        let in1 = inside(&p1);
        match (in0, in1) {
            (true, true) => {
                emit_segment(projector, &p0, &p1, emit);
            }
            (true, false) => {
                let boundary = point_at(bisect_crossing(point_at, &inside, t0, t1));
                let (w0, wb) = emit_segment(projector, &p0, &boundary, emit);
                report_crossing(wb, wb - w0, on_crossing);
            }
            (false, true) => {
                let boundary = point_at(bisect_crossing(point_at, &inside, t1, t0));
                let (wb, w1) = emit_segment(projector, &boundary, &p1, emit);
                report_crossing(wb, w1 - wb, on_crossing);
            }
            (false, false) => {}
        }
        t0 = t1;
        p0 = p1;
        in0 = in1;
    }
}

fn emit_segment(
    projector: &Projector,
    p0: &Vector3<f64>,
    p1: &Vector3<f64>,
    emit: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
) -> (Vector3<f64>, Vector3<f64>) {
    let mut w0 = Vector3::zeros();
    let mut w1 = Vector3::zeros();
    projector.project(p0, &mut w0);
    projector.project(p1, &mut w1);
    emit(w0, w1);
    (w0, w1)
}

/// Report a boundary crossing with its normalized screen travel
/// direction, unless the direction is degenerate.
fn report_crossing(
    at: Vector3<f64>,
    travel: Vector3<f64>,
    on_crossing: &mut dyn FnMut(Vector3<f64>, Vector3<f64>),
) {
    let planar = Vector3::new(travel.x, travel.y, 0.0);
    let norm = planar.norm();
    if norm >= 1e-9 {
        on_crossing(at, planar / norm);
    }
}

/// Find the parameter where cap membership flips. `t_in` is inside,
/// `t_out` outside; the result is on the inside of the crossing.
fn bisect_crossing(
    point_at: &dyn Fn(f64) -> Vector3<f64>,
    inside: &dyn Fn(&Vector3<f64>) -> bool,
    mut t_in: f64,
    mut t_out: f64,
) -> f64 {
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (t_in + t_out);
        if inside(&point_at(mid)) {
            t_in = mid;
        } else {
            t_out = mid;
        }
    }
    t_in
}
