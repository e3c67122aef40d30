use crate::assets::primitives::{self, ShapeKind};
use crate::assets::{AssetError, Drawable, FileResolver};
use crate::render::CameraController;

/// Identifies one load request. Only the most recently issued ticket may
/// replace the active drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug)]
pub enum ApplyOutcome {
    Applied,
    /// A newer request was issued; the result was dropped.
    Stale,
    /// The load failed; the previous drawable stays active.
    Failed(AssetError),
}

/// What the shape menu last produced, so a texture toggle can regenerate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeState {
    pub last_generator_kind: ShapeKind,
    pub last_textured: bool,
}

/// Owns the drawable currently on screen and the camera framing it.
pub struct SceneRuntime {
    active: Option<Drawable>,
    camera: CameraController,
    latest_request: u64,
    shape: Option<ShapeState>,
}

impl Default for SceneRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRuntime {
    pub fn new() -> Self {
        Self {
            active: None,
            camera: CameraController::new([0.0, 0.0, 5.0], -std::f32::consts::FRAC_PI_2, 0.0),
            latest_request: 0,
            shape: None,
        }
    }

    pub fn active(&self) -> Option<&Drawable> {
        self.active.as_ref()
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn shape_state(&self) -> Option<ShapeState> {
        self.shape
    }

    /// Issues a ticket for a load about to start; earlier tickets become stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_request += 1;
        LoadTicket(self.latest_request)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest_request
    }

    /// Applies a finished asset load if its ticket is still current.
    pub fn apply(
        &mut self,
        ticket: LoadTicket,
        result: Result<Drawable, AssetError>,
    ) -> ApplyOutcome {
        if !self.is_current(ticket) {
            log::debug!(
                "Discarding result of load #{} (latest is #{})",
                ticket.0,
                self.latest_request
            );
            return ApplyOutcome::Stale;
        }
        match result {
            Ok(drawable) => {
                self.shape = None;
                self.replace(drawable);
                ApplyOutcome::Applied
            }
            Err(err) => {
                log::warn!("Load #{} failed ({}): {}", ticket.0, err.kind(), err);
                ApplyOutcome::Failed(err)
            }
        }
    }

    /// Replaces the active drawable with a generated shape.
    pub fn show_shape(&mut self, kind: ShapeKind, texture: Option<(&dyn FileResolver, &str)>) {
        // A shape supersedes any asset load still in flight.
        self.begin_load();
        let drawable = primitives::load_shape(kind, texture);
        self.shape = Some(ShapeState {
            last_generator_kind: kind,
            last_textured: drawable.texture.is_some(),
        });
        self.replace(drawable);
    }

    /// Regenerates the last shape with its texture flag flipped. Returns
    /// `false` when the active drawable is not a generated shape.
    pub fn toggle_texture(&mut self, texture: Option<(&dyn FileResolver, &str)>) -> bool {
        let Some(state) = self.shape else {
            return false;
        };
        let texture = if state.last_textured { None } else { texture };
        self.show_shape(state.last_generator_kind, texture);
        true
    }

    fn replace(&mut self, drawable: Drawable) {
        self.camera = CameraController::from_bounds(&drawable.bounds);
        log::info!(
            "Active drawable '{}' framed at {:?} (radius {})",
            drawable.name,
            drawable.bounds.center,
            drawable.bounds.radius
        );
        self.active = Some(drawable);
    }
}
