//! The scene: bodies, frames, clock and projector working together.

use anyhow::Context;
use nalgebra::{Matrix4, Point3, Rotation3, Vector3};

use ephemeris::tle::{topocentric_direction_teme, SatelliteRecord, TleSatellite, TopocentricLook};
use ephemeris::{
    Body, BodyId, BodyRegistry, Frame, FrameTransformer, MagnitudeParams, ObserverLocation,
    OrbitTrail, OrbitalElements, OsculatingOrbit, Propagator,
};
use skyproj::{
    draw_great_circle_arc, draw_small_circle_arc, Projector, ProjectorParams, SphericalCap,
};

use crate::clock::SimulationClock;
use crate::config::{MinorPlanetConfig, RenderConfig, SimConfig};

/// Where one body landed in the viewport for one snapshot.
#[derive(Debug, Clone)]
pub struct ScreenEntry {
    pub id: BodyId,
    pub name: String,
    /// Window coordinates; meaningful even when `valid` is false.
    pub window: Vector3<f64>,
    /// Inside the projection mapping's valid zone.
    pub valid: bool,
    /// Valid and inside the viewport rectangle.
    pub on_screen: bool,
    pub azimuth_deg: f64,
    pub altitude_deg: f64,
    pub magnitude: Option<f64>,
}

/// One projected trail segment with its fade intensity.
#[derive(Debug, Clone, Copy)]
pub struct TrailSegment {
    pub start_win: Vector3<f64>,
    pub stop_win: Vector3<f64>,
    pub intensity: f64,
}

pub struct Scene {
    clock: SimulationClock,
    observer: ObserverLocation,
    observer_helio_au: Vector3<f64>,
    transformer: FrameTransformer,
    registry: BodyRegistry,
    projector: Projector,
    render: RenderConfig,
    next_id: u64,
}

impl Scene {
    pub fn from_config(config: &SimConfig) -> anyhow::Result<Self> {
        let observer = ObserverLocation::from_degrees(
            config.observer.latitude_deg,
            config.observer.longitude_deg,
            config.observer.altitude_m,
        );
        let mut transformer = FrameTransformer::new(observer);
        let observer_helio_au = config
            .observer_heliocentric_au
            .map(Vector3::from)
            .unwrap_or_else(Vector3::zeros);
        transformer.set_observer_heliocentric(observer_helio_au);

        let clock = match config.time.start_jd {
            Some(jd) => SimulationClock::new(jd),
            None => SimulationClock::from_system_time(),
        };

        let render = config.render.clone();
        let mut registry = BodyRegistry::new();
        let mut next_id = 1u64;
        for record in &config.satellites {
            // A catalog line that fails to parse never becomes a body;
            // the rest of the catalog still loads.
            let satellite = match TleSatellite::from_record(record) {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("skipping satellite {}: {e}", record.name);
                    continue;
                }
            };
            registry.insert(
                Body::new(
                    BodyId(next_id),
                    record.name.clone(),
                    Propagator::Satellite(satellite),
                )
                .with_trail(trail_from_render(&render)),
            );
            next_id += 1;
        }
        for entry in &config.minor_planets {
            let body = minor_planet_from_config(entry)
                .with_context(|| format!("minor planet {}", entry.name))?;
            registry.insert(
                Body::new(
                    BodyId(next_id),
                    entry.name.clone(),
                    Propagator::Osculating(body),
                )
                .with_trail(trail_from_render(&render)),
            );
            next_id += 1;
        }

        let params = ProjectorParams {
            viewport_width_px: config.view.width_px,
            viewport_height_px: config.view.height_px,
            fov_deg: config.view.fov_deg,
            flip_horizontal: config.view.flip_horizontal,
            flip_vertical: config.view.flip_vertical,
            ..ProjectorParams::default()
        };
        let modelview = view_matrix(
            config.view.azimuth_deg.to_radians(),
            config.view.altitude_deg.to_radians(),
        );
        let projector = Projector::new(config.view.projection.mapping(), modelview, params)
            .context("building projector")?;

        log::info!(
            "scene: {} bodies, {:?} projection, fov {} deg",
            registry.len(),
            config.view.projection,
            projector.fov_deg()
        );
        Ok(Self {
            clock,
            observer,
            observer_helio_au,
            transformer,
            registry,
            projector,
            render,
            next_id,
        })
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn projector_mut(&mut self) -> &mut Projector {
        &mut self.projector
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    /// Re-aim the view.
    pub fn look_towards(&mut self, azimuth_deg: f64, altitude_deg: f64) {
        self.projector
            .set_modelview(view_matrix(azimuth_deg.to_radians(), altitude_deg.to_radians()));
    }

    /// Project every body at the current simulated time.
    ///
    /// A body whose propagation fails for this instant is logged and left
    /// out of the snapshot; the rest of the frame still renders.
    pub fn snapshot(&mut self) -> Vec<ScreenEntry> {
        let jd = self.clock.jd();
        let helio_to_altaz = self.transformer.transform(Frame::Heliocentric, Frame::AltAz, jd);
        let observer = self.observer;
        let observer_helio = self.observer_helio_au;
        let projector = &self.projector;

        let mut entries = Vec::with_capacity(self.registry.len());
        for body in self.registry.iter_mut() {
            // Copy the look result out so the propagator borrow ends
            // before the cached-position path mutates the body.
            let look = match body.propagator() {
                Propagator::Satellite(satellite) => Some(satellite.look_from(&observer, jd)),
                _ => None,
            };
            let dir_altaz = match look {
                Some(Ok(look)) => direction_from_look(&look),
                Some(Err(e)) => {
                    log::warn!("skipping {}: {e}", body.name());
                    continue;
                }
                None => {
                    let position = match body.position_at(jd) {
                        Ok(p) => p,
                        Err(e) => {
                            log::warn!("skipping {}: {e}", body.name());
                            continue;
                        }
                    };
                    let topo = helio_to_altaz.transform_point(&Point3::from(position)).coords;
                    if topo.norm() == 0.0 {
                        continue;
                    }
                    topo.normalize()
                }
            };

            let mut window = Vector3::zeros();
            let valid = projector.project(&dir_altaz, &mut window);
            entries.push(ScreenEntry {
                id: body.id(),
                name: body.name().to_owned(),
                window,
                valid,
                on_screen: valid && projector.in_viewport(&window),
                azimuth_deg: dir_altaz.y.atan2(-dir_altaz.x).rem_euclid(std::f64::consts::TAU).to_degrees(),
                altitude_deg: dir_altaz.z.clamp(-1.0, 1.0).asin().to_degrees(),
                magnitude: body.magnitude_at(&observer_helio, jd),
            });
        }
        entries
    }

    /// Advance a body's trail window and project it.
    pub fn trail_segments(&mut self, id: BodyId) -> anyhow::Result<Vec<TrailSegment>> {
        let jd = self.clock.jd();
        let body = self.registry.get_mut(id)?;
        body.update_trail(jd)?;

        let is_satellite = matches!(body.propagator(), Propagator::Satellite(_));
        let samples: Vec<_> = body.trail().samples().copied().collect();
        let intensities: Vec<f64> = (0..samples.len())
            .map(|i| body.trail().sample_intensity(i))
            .collect();

        let frame = if is_satellite {
            Frame::EquatorialOfDate
        } else {
            Frame::Heliocentric
        };
        let to_altaz = self.transformer.transform(frame, Frame::AltAz, jd);

        let mut windows = Vec::with_capacity(samples.len());
        for sample in &samples {
            let dir = if is_satellite {
                // Topocentric in TEME, then rotated into the local frame
                let topo = topocentric_direction_teme(&self.observer, sample.jd, &sample.position);
                (to_altaz.fixed_view::<3, 3>(0, 0) * topo).normalize()
            } else {
                let p = to_altaz.transform_point(&Point3::from(sample.position)).coords;
                if p.norm() == 0.0 {
                    // Keep indices aligned with the intensity table
                    windows.push((Vector3::zeros(), false));
                    continue;
                }
                p.normalize()
            };
            let mut win = Vector3::zeros();
            let valid = self.projector.project(&dir, &mut win);
            windows.push((win, valid));
        }

        let mut segments = Vec::new();
        for (i, pair) in windows.windows(2).enumerate() {
            let ((w0, ok0), (w1, ok1)) = (pair[0], pair[1]);
            if ok0 && ok1 {
                segments.push(TrailSegment {
                    start_win: w0,
                    stop_win: w1,
                    intensity: intensities[i].min(intensities[i + 1]),
                });
            }
        }
        Ok(segments)
    }

    /// Window segments of a coordinate-grid meridian in `frame`: the great
    /// semicircle at the given longitude, pole to pole.
    pub fn meridian_segments(
        &self,
        frame: Frame,
        longitude_rad: f64,
        clip: Option<&SphericalCap>,
    ) -> anyhow::Result<Vec<(Vector3<f64>, Vector3<f64>)>> {
        let jd = self.clock.jd();
        let rot = self
            .transformer
            .transform(frame, Frame::AltAz, jd)
            .fixed_view::<3, 3>(0, 0)
            .into_owned();
        let south = rot * Vector3::new(0.0, 0.0, -1.0);
        let equator = rot * Vector3::new(longitude_rad.cos(), longitude_rad.sin(), 0.0);
        let north = rot * Vector3::new(0.0, 0.0, 1.0);

        let mut segments = Vec::new();
        for (a, b) in [(south, equator), (equator, north)] {
            draw_great_circle_arc(&self.projector, &a, &b, clip, &mut |w0, w1| {
                segments.push((w0, w1));
            })?;
        }
        Ok(segments)
    }

    /// Window segments of a grid parallel in `frame`: the small circle at
    /// the given latitude, drawn as two half arcs around the frame's pole.
    pub fn parallel_segments(
        &self,
        frame: Frame,
        latitude_rad: f64,
        clip: Option<&SphericalCap>,
    ) -> Vec<(Vector3<f64>, Vector3<f64>)> {
        let jd = self.clock.jd();
        let rot = self
            .transformer
            .transform(frame, Frame::AltAz, jd)
            .fixed_view::<3, 3>(0, 0)
            .into_owned();
        let (sin_lat, cos_lat) = latitude_rad.sin_cos();
        let pole = rot * Vector3::new(0.0, 0.0, 1.0);
        let first = rot * Vector3::new(cos_lat, 0.0, sin_lat);
        let middle = rot * Vector3::new(-cos_lat, 0.0, sin_lat);

        let mut segments = Vec::new();
        for (a, b) in [(first, middle), (middle, first)] {
            draw_small_circle_arc(&self.projector, &a, &b, &pole, clip, &mut |w0, w1| {
                segments.push((w0, w1));
            });
        }
        segments
    }

    /// Project a local-frame direction with the current view. The window
    /// coordinates are filled in even when the direction falls outside the
    /// mapping's valid zone.
    pub fn project(&self, dir_altaz: &Vector3<f64>) -> (Vector3<f64>, bool) {
        let mut window = Vector3::zeros();
        let valid = self.projector.project(dir_altaz, &mut window);
        (window, valid)
    }

    /// Local-frame direction under a window position, when the mapping
    /// covers it.
    pub fn unproject(&self, window_x: f64, window_y: f64) -> Option<Vector3<f64>> {
        self.projector.unproject(window_x, window_y)
    }

    /// Cached position of a body at a Julian day, in its propagator's
    /// native frame and unit.
    pub fn position(&mut self, id: BodyId, jd: f64) -> anyhow::Result<Vector3<f64>> {
        Ok(self.registry.get_mut(id)?.position_at(jd)?)
    }

    /// Rigid transform taking coordinates from one reference frame to
    /// another at a Julian day.
    pub fn transform(&self, from: Frame, to: Frame, jd: f64) -> Matrix4<f64> {
        self.transformer.transform(from, to, jd)
    }

    /// Apparent magnitude of a body at a Julian day, where its model
    /// defines one.
    pub fn apparent_magnitude(&self, id: BodyId, jd: f64) -> anyhow::Result<Option<f64>> {
        let body = self.registry.get(id)?;
        Ok(body.magnitude_at(&self.observer_helio_au, jd))
    }

    /// Advance the simulation by a wall-clock interval and bring every
    /// trail window up to the new simulated time.
    pub fn advance(&mut self, real_dt_s: f64) {
        self.clock.advance(real_dt_s);
        self.registry.update_all_trails(self.clock.jd());
    }

    /// Register satellites from a JSON catalog. Malformed records are
    /// logged and skipped; the number of bodies added is returned.
    pub fn load_satellites(&mut self, json: &str) -> anyhow::Result<usize> {
        let records = SatelliteRecord::load_catalog(json)?;
        let mut added = 0;
        for record in &records {
            let satellite = match TleSatellite::from_record(record) {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("skipping satellite {}: {e}", record.name);
                    continue;
                }
            };
            self.registry.insert(
                Body::new(
                    BodyId(self.next_id),
                    record.name.clone(),
                    Propagator::Satellite(satellite),
                )
                .with_trail(trail_from_render(&self.render)),
            );
            self.next_id += 1;
            added += 1;
        }
        Ok(added)
    }
}

/// Unit direction in the local frame from topocentric look angles.
fn direction_from_look(look: &TopocentricLook) -> Vector3<f64> {
    let (sin_az, cos_az) = look.azimuth_rad.sin_cos();
    let (sin_el, cos_el) = look.elevation_rad.sin_cos();
    // Local frame: x south, y east, z zenith; azimuth from north
    Vector3::new(-cos_el * cos_az, cos_el * sin_az, sin_el)
}

/// Model-view matrix looking from the origin toward the given azimuth and
/// altitude in the local frame.
fn view_matrix(azimuth_rad: f64, altitude_rad: f64) -> Matrix4<f64> {
    let (sin_az, cos_az) = azimuth_rad.sin_cos();
    let (sin_alt, cos_alt) = altitude_rad.sin_cos();
    let dir = Vector3::new(-cos_alt * cos_az, cos_alt * sin_az, sin_alt);
    let up = if cos_alt < 1e-6 {
        // Looking at a pole of the local frame: screen up points back
        // toward the horizon at the view azimuth
        Vector3::new(cos_az, -sin_az, 0.0)
    } else {
        Vector3::z()
    };
    Rotation3::look_at_rh(&dir, &up).to_homogeneous()
}

fn trail_from_render(render: &RenderConfig) -> OrbitTrail {
    OrbitTrail::new(
        render.orbit_line_segments.max(2),
        render.orbit_segment_duration_s,
        render.orbit_fade_segments,
    )
}

fn minor_planet_from_config(entry: &MinorPlanetConfig) -> anyhow::Result<OsculatingOrbit> {
    let elements = OrbitalElements::new(
        entry.semi_major_axis_au,
        entry.eccentricity,
        entry.inclination_deg.to_radians(),
        entry.ascending_node_deg.to_radians(),
        entry.arg_periapsis_deg.to_radians(),
        entry.mean_anomaly_deg.to_radians(),
        entry.epoch_jd,
        entry.period_days,
    )?;
    let mut body = OsculatingOrbit::new(&entry.name, elements).with_photometry(
        entry.radius_km.unwrap_or(1.0),
        entry.albedo.unwrap_or(0.15),
    );
    if let Some(h) = entry.absolute_magnitude {
        let mut params = MagnitudeParams::new(h);
        // Catalogs that give H without G get the conventional slope
        let slope = entry.slope.unwrap_or(ephemeris::elements::SLOPE_DEFAULT);
        if !params.set_absolute_magnitude_and_slope(h, slope) {
            anyhow::bail!("slope parameter {slope} outside [-1, 2]");
        }
        body = body.with_magnitude_params(params);
    }
    Ok(body)
}
