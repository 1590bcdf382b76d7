//! Body registry: everything the simulator propagates, one interface.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::Vector3;

use crate::cache::{OrbitTrail, PositionCache};
use crate::frames::Frame;
use crate::kepler::EllipticalOrbit;
use crate::minor_planet::OsculatingOrbit;
use crate::tle::TleSatellite;
use crate::{EphemerisError, Result};

/// Stable identifier for a registered body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// The propagation model behind a body.
///
/// Heliocentric variants produce AU in the J2000 ecliptic frame; the SGP4
/// variant produces km in TEME, which the frame layer treats as equatorial
/// of date.
pub enum Propagator {
    /// Major planet on a fixed Keplerian orbit.
    Elliptical(EllipticalOrbit),
    /// Minor planet on an osculating refit table.
    Osculating(OsculatingOrbit),
    /// Artificial satellite on SGP4.
    Satellite(TleSatellite),
}

impl Propagator {
    /// Frame the propagated positions are expressed in.
    pub fn native_frame(&self) -> Frame {
        match self {
            Propagator::Elliptical(_) | Propagator::Osculating(_) => Frame::Heliocentric,
            Propagator::Satellite(_) => Frame::EquatorialOfDate,
        }
    }

    /// Position at a Julian day, in the propagator's native frame and unit.
    pub fn position_at(&self, jd: f64) -> Result<Vector3<f64>> {
        match self {
            Propagator::Elliptical(orbit) => Ok(orbit.position_at(jd)),
            Propagator::Osculating(body) => Ok(body.position_at(jd)),
            Propagator::Satellite(satellite) => satellite.position_teme_at(jd),
        }
    }
}

/// A registered body: propagator plus its per-body cache and trail.
pub struct Body {
    id: BodyId,
    name: String,
    propagator: Propagator,
    cache: PositionCache,
    trail: OrbitTrail,
}

impl Body {
    pub fn new(id: BodyId, name: impl Into<String>, propagator: Propagator) -> Self {
        Self {
            id,
            name: name.into(),
            propagator,
            cache: PositionCache::new(),
            trail: OrbitTrail::with_defaults(),
        }
    }

    /// Replace the default trail window.
    pub fn with_trail(mut self, trail: OrbitTrail) -> Self {
        self.trail = trail;
        self
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    pub fn trail(&self) -> &OrbitTrail {
        &self.trail
    }

    /// Cached position at a Julian day. Repeated queries at the same time
    /// propagate once.
    pub fn position_at(&mut self, jd: f64) -> Result<Vector3<f64>> {
        if let Some(position) = self.cache.peek(jd) {
            return Ok(position);
        }
        let position = self.propagator.position_at(jd)?;
        self.cache.store(jd, position);
        Ok(position)
    }

    /// Apparent magnitude, where the body's model defines one.
    pub fn magnitude_at(&self, observer_helio_au: &Vector3<f64>, jd: f64) -> Option<f64> {
        match &self.propagator {
            Propagator::Elliptical(_) => None,
            Propagator::Osculating(body) => Some(body.magnitude_at(observer_helio_au, jd)),
            Propagator::Satellite(satellite) => Some(satellite.magnitude()),
        }
    }

    /// Advance the trail window to `jd`.
    ///
    /// A propagation failure leaves the failed samples at the origin and
    /// reports the first error after the window is consistent again.
    pub fn update_trail(&mut self, jd: f64) -> Result<()> {
        let propagator = &self.propagator;
        let mut first_err = None;
        self.trail.update(jd, &mut |sample_jd| {
            match propagator.position_at(sample_jd) {
                Ok(position) => position,
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                    Vector3::zeros()
                }
            }
        });
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// All bodies known to the simulation, keyed by id.
#[derive(Default)]
pub struct BodyRegistry {
    bodies: BTreeMap<BodyId, Body>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Register a body. Replacing an id is allowed and returns the old
    /// entry.
    pub fn insert(&mut self, body: Body) -> Option<Body> {
        self.bodies.insert(body.id(), body)
    }

    pub fn get(&self, id: BodyId) -> Result<&Body> {
        self.bodies.get(&id).ok_or(EphemerisError::UnknownBody(id.0))
    }

    pub fn get_mut(&mut self, id: BodyId) -> Result<&mut Body> {
        self.bodies
            .get_mut(&id)
            .ok_or(EphemerisError::UnknownBody(id.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.bodies.values_mut()
    }

    /// Advance every trail to `jd`. A body whose propagation fails is
    /// logged and skipped; one decayed satellite must not stall the frame.
    pub fn update_all_trails(&mut self, jd: f64) {
        for body in self.bodies.values_mut() {
            if let Err(e) = body.update_trail(jd) {
                log::warn!("trail update failed for {}: {e}", body.name());
            }
        }
    }
}
