//! Viewport projection: model space to window pixels and back.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::mapping::Mapping;
use crate::sphere::SphericalCap;
use crate::ProjectionError;

/// Smallest total field of view accepted, degrees. Below this the
/// pixels-per-radian scaling overflows usefulness.
const MIN_FOV_DEG: f64 = 0.001;

/// Viewport mask: which window region counts as visible beyond the
/// rectangle itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskType {
    /// The full viewport rectangle.
    #[default]
    None,
    /// An inscribed disk, for planetarium domes and eyepiece views.
    Disk,
}

impl MaskType {
    pub fn name(self) -> &'static str {
        match self {
            MaskType::None => "none",
            MaskType::Disk => "disk",
        }
    }

    /// Mask for a name; anything unrecognized means no mask.
    pub fn from_name(name: &str) -> MaskType {
        match name {
            "disk" => MaskType::Disk,
            _ => MaskType::None,
        }
    }
}

/// Viewport and view parameters for a [`Projector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectorParams {
    pub viewport_width_px: u32,
    pub viewport_height_px: u32,
    /// Total field of view across the smaller viewport dimension, degrees.
    pub fov_deg: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub mask: MaskType,
    /// Near depth bound used to normalize the window z coordinate.
    pub z_near: f64,
    /// Far depth bound used to normalize the window z coordinate.
    pub z_far: f64,
}

impl Default for ProjectorParams {
    fn default() -> Self {
        Self {
            viewport_width_px: 1280,
            viewport_height_px: 720,
            fov_deg: 60.0,
            flip_horizontal: false,
            flip_vertical: false,
            mask: MaskType::None,
            z_near: 0.1,
            z_far: 100.0,
        }
    }
}

/// Projects model-space positions through a non-linear [`Mapping`] into
/// window coordinates.
///
/// Window coordinates put the origin at the bottom-left of the viewport,
/// x right and y up, with z normalized against the depth bounds.
/// `project` reports validity but always produces finite window
/// coordinates, so callers can place off-zone annotations without special
/// cases.
#[derive(Debug, Clone)]
pub struct Projector {
    mapping: Mapping,
    modelview: Matrix4<f64>,
    /// Transpose of the model-view rotation block, for unprojection.
    inv_rotation: Matrix3<f64>,
    params: ProjectorParams,
    center_x: f64,
    center_y: f64,
    flip_h: f64,
    flip_v: f64,
    view_scaling: f64,
}

impl Projector {
    pub fn new(
        mapping: Mapping,
        modelview: Matrix4<f64>,
        params: ProjectorParams,
    ) -> Result<Self, ProjectionError> {
        if params.viewport_width_px == 0 || params.viewport_height_px == 0 {
            return Err(ProjectionError::DegenerateViewport {
                width: params.viewport_width_px,
                height: params.viewport_height_px,
            });
        }
        let mut projector = Self {
            mapping,
            modelview,
            inv_rotation: modelview.fixed_view::<3, 3>(0, 0).transpose(),
            params,
            center_x: f64::from(params.viewport_width_px) / 2.0,
            center_y: f64::from(params.viewport_height_px) / 2.0,
            flip_h: if params.flip_horizontal { -1.0 } else { 1.0 },
            flip_v: if params.flip_vertical { -1.0 } else { 1.0 },
            view_scaling: 1.0,
        };
        projector.set_fov(params.fov_deg);
        Ok(projector)
    }

    pub fn mapping(&self) -> Mapping {
        self.mapping
    }

    pub fn fov_deg(&self) -> f64 {
        self.params.fov_deg
    }

    /// Replace the model-view transform, e.g. when the observer re-aims.
    pub fn set_modelview(&mut self, modelview: Matrix4<f64>) {
        self.modelview = modelview;
        self.inv_rotation = modelview.fixed_view::<3, 3>(0, 0).transpose();
    }

    /// Set the total field of view, clamped to what the mapping can show.
    pub fn set_fov(&mut self, fov_deg: f64) {
        let clamped = fov_deg.clamp(MIN_FOV_DEG, self.mapping.max_fov_deg());
        if clamped != fov_deg {
            log::debug!(
                "fov {fov_deg} deg clamped to {clamped} for {:?}",
                self.mapping
            );
        }
        self.params.fov_deg = clamped;
        let half_fov = clamped.to_radians() / 2.0;
        let half_extent_px = 0.5
            * f64::from(self.params.viewport_width_px.min(self.params.viewport_height_px));
        self.view_scaling = half_extent_px / self.mapping.fov_to_view_scaling(half_fov);
    }

    /// Pixels per mapping-plane unit. All mappings have unit slope at the
    /// view axis, so this is also pixels per radian at the view center.
    pub fn pixels_per_radian(&self) -> f64 {
        self.view_scaling
    }

    /// Project a model-space position into window coordinates.
    ///
    /// The transform always runs to completion; the flag reports whether
    /// the point lies in the mapping's valid zone.
    pub fn project(&self, v: &Vector3<f64>, win: &mut Vector3<f64>) -> bool {
        *win = self.modelview.transform_point(&Point3::from(*v)).coords;
        let valid = self.mapping.forward(win);
        win.x = self.center_x + self.flip_h * self.view_scaling * win.x;
        win.y = self.center_y + self.flip_v * self.view_scaling * win.y;
        win.z = (win.z - self.params.z_near) / (self.params.z_near - self.params.z_far);
        valid
    }

    /// Like [`project`](Self::project) but additionally requires the
    /// result to land inside the viewport.
    pub fn project_check(&self, v: &Vector3<f64>, win: &mut Vector3<f64>) -> bool {
        self.project(v, win) && self.in_viewport(win)
    }

    /// Project both endpoints of a segment; the segment is worth drawing
    /// when both are in the valid zone and it touches the viewport.
    pub fn project_line_check(
        &self,
        v1: &Vector3<f64>,
        win1: &mut Vector3<f64>,
        v2: &Vector3<f64>,
        win2: &mut Vector3<f64>,
    ) -> bool {
        let ok1 = self.project(v1, win1);
        let ok2 = self.project(v2, win2);
        ok1 && ok2 && (self.in_viewport(win1) || self.in_viewport(win2))
    }

    /// Whether window coordinates fall inside the viewport, honoring the
    /// disk mask when one is set.
    pub fn in_viewport(&self, win: &Vector3<f64>) -> bool {
        let in_rect = win.x >= 0.0
            && win.x < f64::from(self.params.viewport_width_px)
            && win.y >= 0.0
            && win.y < f64::from(self.params.viewport_height_px);
        match self.params.mask {
            MaskType::None => in_rect,
            MaskType::Disk => {
                let radius = 0.5
                    * f64::from(
                        self.params.viewport_width_px.min(self.params.viewport_height_px),
                    );
                let dx = win.x - self.center_x;
                let dy = win.y - self.center_y;
                in_rect && dx * dx + dy * dy <= radius * radius
            }
        }
    }

    /// A model-space cap covering every direction whose image can fall in
    /// the viewport, from the unprojected center and corners. Wide
    /// mappings whose corners have no preimage degrade to the whole
    /// sphere.
    pub fn viewport_bounding_cap(&self) -> SphericalCap {
        let axis = match self.unproject(self.center_x, self.center_y) {
            Some(dir) => dir.normalize(),
            None => return SphericalCap::full_sphere(),
        };
        let w = f64::from(self.params.viewport_width_px);
        let h = f64::from(self.params.viewport_height_px);
        let mut d = 1.0f64;
        for (x, y) in [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)] {
            match self.unproject(x, y) {
                Some(dir) => d = d.min(axis.dot(&dir.normalize())),
                None => return SphericalCap::full_sphere(),
            }
        }
        SphericalCap { axis, d }
    }

    /// Invert a window position to a unit view direction in model space.
    ///
    /// Uses only the rotation block of the model-view transform; any
    /// translation (heliocentric rendering) is irrelevant for directions.
    /// Returns `None` when the pixel lies outside the mapping's image.
    pub fn unproject(&self, win_x: f64, win_y: f64) -> Option<Vector3<f64>> {
        let mut v = Vector3::new(
            (win_x - self.center_x) / (self.flip_h * self.view_scaling),
            (win_y - self.center_y) / (self.flip_v * self.view_scaling),
            0.0,
        );
        if !self.mapping.backward(&mut v) {
            return None;
        }
        Some(self.inv_rotation * v)
    }
}
