//! Reference frames and the rotations between them.
//!
//! Every supported frame is related to equatorial J2000 by a single rigid
//! transform (rotation plus, for the heliocentric frame, a translation), so
//! any pairwise conversion composes two of those canonical transforms. No
//! frame conversion requires iterative solving.

use std::cell::RefCell;
use std::collections::HashMap;

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};

use crate::time::{centuries_since_j2000, gmst_radians};

/// Arcseconds to radians.
const ARCSEC: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Mean obliquity of the ecliptic at J2000.0, degrees.
const OBLIQUITY_J2000_DEG: f64 = 23.439_291_1;

/// Named reference frames selectable per draw or query call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frame {
    /// Observer's horizontal frame (landscape consumers).
    Local,
    /// Observer's horizontal frame (grid consumers). Same rotation as
    /// `Local`; kept as a distinct tag because callers distinguish them.
    AltAz,
    /// True equator and equinox of date (precession + nutation applied).
    EquatorialOfDate,
    /// Mean equator and equinox of J2000.0. The canonical hub frame.
    EquatorialJ2000,
    /// Mean ecliptic of date.
    Ecliptic,
    /// IAU 1958 galactic frame (fixed with respect to J2000).
    Galactic,
    /// Heliocentric, oriented along the J2000 ecliptic; carries the
    /// observer's heliocentric offset in the translation column.
    Heliocentric,
}

impl Frame {
    /// All frame tags, for exhaustive sweeps in tests and callers.
    pub const ALL: [Frame; 7] = [
        Frame::Local,
        Frame::AltAz,
        Frame::EquatorialOfDate,
        Frame::EquatorialJ2000,
        Frame::Ecliptic,
        Frame::Galactic,
        Frame::Heliocentric,
    ];

    /// Whether the frame's canonical transform is independent of time.
    fn is_time_invariant(self) -> bool {
        matches!(self, Frame::EquatorialJ2000 | Frame::Galactic)
    }
}

/// Geographic observer location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverLocation {
    /// Geodetic latitude in radians, positive north.
    pub latitude_rad: f64,
    /// Longitude in radians, positive east.
    pub longitude_rad: f64,
    /// Altitude above the reference ellipsoid in meters.
    pub altitude_m: f64,
}

impl ObserverLocation {
    /// Build a location from degrees and meters.
    pub fn from_degrees(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_rad: latitude_deg.to_radians(),
            longitude_rad: longitude_deg.to_radians(),
            altitude_m,
        }
    }
}

/// Computes and caches frame-to-frame transforms.
///
/// `transform` is a pure function of the two frame tags and the Julian day.
/// Transforms between time-invariant frames are cached on first use; the
/// cache entries involving the local frame are dropped whenever the observer
/// location changes.
pub struct FrameTransformer {
    location: ObserverLocation,
    observer_helio_au: Vector3<f64>,
    static_cache: RefCell<HashMap<(Frame, Frame), Matrix4<f64>>>,
}

impl FrameTransformer {
    pub fn new(location: ObserverLocation) -> Self {
        Self {
            location,
            observer_helio_au: Vector3::zeros(),
            static_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Current observer location.
    pub fn location(&self) -> ObserverLocation {
        self.location
    }

    /// Move the observer. Invalidates every cached transform that depends
    /// on the site.
    pub fn set_location(&mut self, location: ObserverLocation) {
        if location != self.location {
            self.location = location;
            self.static_cache.borrow_mut().clear();
        }
    }

    /// Set the observer's heliocentric position (AU, J2000 ecliptic).
    ///
    /// Feeds the translation column of the heliocentric frame transform.
    pub fn set_observer_heliocentric(&mut self, position_au: Vector3<f64>) {
        self.observer_helio_au = position_au;
        self.static_cache.borrow_mut().clear();
    }

    /// Rigid transform taking coordinates in `from` to coordinates in `to`
    /// at the given Julian day. Never fails.
    pub fn transform(&self, from: Frame, to: Frame, jd: f64) -> Matrix4<f64> {
        if from == to {
            return Matrix4::identity();
        }
        if from.is_time_invariant() && to.is_time_invariant() {
            if let Some(cached) = self.static_cache.borrow().get(&(from, to)) {
                return *cached;
            }
        }
        let mat = rigid_inverse(&self.to_j2000(to, jd)) * self.to_j2000(from, jd);
        if from.is_time_invariant() && to.is_time_invariant() {
            self.static_cache.borrow_mut().insert((from, to), mat);
        }
        mat
    }

    /// Canonical transform of a frame into equatorial J2000.
    fn to_j2000(&self, frame: Frame, jd: f64) -> Matrix4<f64> {
        match frame {
            Frame::EquatorialJ2000 => Matrix4::identity(),
            Frame::EquatorialOfDate => {
                // equ_of_date = N * P * equ_j2000
                let np = nutation_matrix(jd) * precession_matrix(jd);
                to_homogeneous(&np.transpose())
            }
            Frame::Ecliptic => {
                // Mean ecliptic of date relates to the mean equator of date.
                let p = precession_matrix(jd);
                let tilt = rot_x(mean_obliquity(jd));
                to_homogeneous(&(p.transpose() * tilt))
            }
            Frame::Galactic => to_homogeneous(&galactic_from_j2000().transpose()),
            Frame::Local | Frame::AltAz => {
                let np = nutation_matrix(jd) * precession_matrix(jd);
                let horizontal = self.horizontal_from_equ_of_date(jd);
                to_homogeneous(&(np.transpose() * horizontal.transpose()))
            }
            Frame::Heliocentric => {
                let tilt = to_homogeneous(&rot_x(OBLIQUITY_J2000_DEG.to_radians()));
                tilt * Matrix4::new_translation(&(-self.observer_helio_au))
            }
        }
    }

    /// Rotation from the true equator of date into the horizontal frame:
    /// x south, y east, z to the zenith.
    fn horizontal_from_equ_of_date(&self, jd: f64) -> Matrix3<f64> {
        let lst = gmst_radians(jd) + self.location.longitude_rad;
        rot_y(self.location.latitude_rad - std::f64::consts::FRAC_PI_2) * rot_z(-lst)
    }
}

/// IAU 1976 precession rotation taking J2000 equatorial coordinates to the
/// mean equator and equinox of date.
pub fn precession_matrix(jd: f64) -> Matrix3<f64> {
    let t = centuries_since_j2000(jd);
    let zeta = (2306.2181 * t + 0.30188 * t * t + 0.017998 * t * t * t) * ARCSEC;
    let z = (2306.2181 * t + 1.09468 * t * t + 0.018203 * t * t * t) * ARCSEC;
    let theta = (2004.3109 * t - 0.42665 * t * t - 0.041833 * t * t * t) * ARCSEC;
    rot_z(-z) * rot_y(theta) * rot_z(-zeta)
}

/// Largest-term nutation rotation taking mean-of-date to true-of-date
/// equatorial coordinates.
///
/// Only the 18.6-year term is carried; shorter-period terms are below an
/// arcsecond and irrelevant at the rendering scale.
pub fn nutation_matrix(jd: f64) -> Matrix3<f64> {
    let t = centuries_since_j2000(jd);
    let omega = (125.044_52 - 1934.136_261 * t).to_radians();
    let dpsi = -17.20 * omega.sin() * ARCSEC;
    let deps = 9.20 * omega.cos() * ARCSEC;
    let eps = mean_obliquity(jd);
    rot_x(-(eps + deps)) * rot_z(-dpsi) * rot_x(eps)
}

/// IAU 1980 mean obliquity of the ecliptic, radians.
pub fn mean_obliquity(jd: f64) -> f64 {
    let t = centuries_since_j2000(jd);
    let arcsec = 84381.448 - 46.8150 * t - 0.00059 * t * t + 0.001813 * t * t * t;
    arcsec * ARCSEC
}

/// Fixed rotation from equatorial J2000 to galactic coordinates
/// (IAU 1958 pole and zero point, Hipparcos-refined values).
pub fn galactic_from_j2000() -> Matrix3<f64> {
    Matrix3::new(
        -0.054_875_539_726,
        -0.873_437_108_010,
        -0.483_834_985_808,
        0.494_109_453_312,
        -0.444_829_589_425,
        0.746_982_251_810,
        -0.867_666_135_858,
        -0.198_076_386_122,
        0.455_983_795_705,
    )
}

/// Invert a rigid transform (rotation + translation) without a general
/// matrix inverse.
pub fn rigid_inverse(m: &Matrix4<f64>) -> Matrix4<f64> {
    let r = m.fixed_view::<3, 3>(0, 0).into_owned();
    let t = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    let rt = r.transpose();
    let mut out = to_homogeneous(&rt);
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-(rt * t)));
    out
}

fn to_homogeneous(r: &Matrix3<f64>) -> Matrix4<f64> {
    Rotation3::from_matrix_unchecked(*r).to_homogeneous()
}

fn rot_x(angle: f64) -> Matrix3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), angle).into_inner()
}

fn rot_y(angle: f64) -> Matrix3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), angle).into_inner()
}

fn rot_z(angle: f64) -> Matrix3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), angle).into_inner()
}
