//! Scene editor model import: GLTF ingestion into GPU-ready drawables.

pub mod assets;
pub mod render;
pub mod scene;
pub mod ui;
