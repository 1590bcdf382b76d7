//! Julian day arithmetic and sidereal time.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Julian day of the J2000.0 epoch (2000 January 1, 12:00 TT).
pub const J2000_JD: f64 = 2451545.0;

/// Julian day of the Unix epoch (1970 January 1, 00:00 UTC).
pub const UNIX_EPOCH_JD: f64 = 2440587.5;

/// Seconds per Julian day.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Days per Julian century.
pub const DAYS_PER_CENTURY: f64 = 36525.0;

/// Julian centuries elapsed since J2000.0 at the given Julian day.
pub fn centuries_since_j2000(jd: f64) -> f64 {
    (jd - J2000_JD) / DAYS_PER_CENTURY
}

/// Convert Unix seconds to a Julian day.
pub fn julian_day_from_unix_seconds(seconds: f64) -> f64 {
    UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY
}

/// Convert a chrono UTC datetime to a Julian day.
pub fn julian_day_from_datetime(dt: &DateTime<Utc>) -> f64 {
    let seconds = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9;
    julian_day_from_unix_seconds(seconds)
}

/// Convert a naive (assumed-UTC) datetime to a Julian day.
///
/// TLE epochs come out of the parser as naive datetimes.
pub fn julian_day_from_naive(dt: &NaiveDateTime) -> f64 {
    julian_day_from_datetime(&dt.and_utc())
}

/// Greenwich mean sidereal time in radians at the given Julian day (UT1≈UTC).
///
/// IAU 1982-style linear model, adequate for frame orientation at the
/// arcsecond level. Result is normalized to [0, 2π).
pub fn gmst_radians(jd: f64) -> f64 {
    let d = jd - J2000_JD;
    let gmst_deg = 280.460_618_37 + 360.985_647_366_29 * d;
    normalize_radians(gmst_deg.to_radians())
}

/// Normalize an angle in radians to [0, 2π).
pub fn normalize_radians(angle: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let r = angle % two_pi;
    if r < 0.0 {
        r + two_pi
    } else {
        r
    }
}
