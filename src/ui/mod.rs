use crate::assets::{AssetError, IndexElementWidth};
use crate::scene::{ApplyOutcome, SceneRuntime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub level: BannerLevel,
    pub text: String,
}

/// Text the editor shell renders: a summary of the active drawable and a
/// status banner for the last import.
pub struct UiState {
    asset_summary: String,
    banner: Option<Banner>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            asset_summary: String::new(),
            banner: None,
        }
    }

    pub fn update(&mut self, scene: &SceneRuntime) {
        let Some(drawable) = scene.active() else {
            self.asset_summary = "No model loaded".to_string();
            return;
        };
        let width = match drawable.index_element_width() {
            IndexElementWidth::U16 => "16-bit",
            IndexElementWidth::U32 => "32-bit",
        };
        let mut summary = format!(
            "{} (center {:.2}, {:.2}, {:.2}, radius {:.2})\n",
            drawable.name,
            drawable.bounds.center[0],
            drawable.bounds.center[1],
            drawable.bounds.center[2],
            drawable.bounds.radius
        );
        summary.push_str(&format!(
            "Vertices: {}  Indices: {} ({})",
            drawable.attribute_vertex_count(),
            drawable.vertex_count(),
            width
        ));
        match &drawable.texture {
            Some(texture) => {
                summary.push_str(&format!("\nTexture: {}x{}", texture.width, texture.height))
            }
            None => summary.push_str("\nTexture: none"),
        }
        if let Some(shape) = scene.shape_state() {
            summary.push_str(&format!(
                "\nShape: {} ({})",
                shape.last_generator_kind.name(),
                if shape.last_textured {
                    "textured"
                } else {
                    "untextured"
                }
            ));
        }
        self.asset_summary = summary;
    }

    /// Turns the outcome of an import into banner text.
    pub fn report(&mut self, outcome: &ApplyOutcome, scene: &SceneRuntime) {
        match outcome {
            ApplyOutcome::Applied => {
                let name = scene.active().map(|drawable| drawable.name.as_str());
                self.banner = Some(Banner {
                    level: BannerLevel::Info,
                    text: format!("Loaded {}", name.unwrap_or("model")),
                });
            }
            // A newer import owns the banner.
            ApplyOutcome::Stale => {}
            ApplyOutcome::Failed(err) => self.report_error(err),
        }
        self.update(scene);
    }

    pub fn report_error(&mut self, err: &AssetError) {
        self.banner = Some(Banner {
            level: BannerLevel::Error,
            text: format!("{}: {}", err.kind(), err),
        });
    }

    pub fn summary(&self) -> &str {
        &self.asset_summary
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }
}
