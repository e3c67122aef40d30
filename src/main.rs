//! scenepad - imports a GLTF model (or generates a primitive shape), uploads
//! it to the headless backend and prints what the editor would show.
//!
//! Examples:
//!   scenepad https://example.com/models/box/scene.gltf
//!   scenepad ./models/box
//!   scenepad ./models/box/scene.gltf --extended-indices
//!   scenepad scene.gltf scene.bin albedo.png
//!   scenepad --shape sphere --bands 16x32 --texture ./checker.png

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use scenepad::assets::primitives::{ShapeKind, DEFAULT_SPHERE_BANDS, MAX_SPHERE_BANDS};
use scenepad::assets::resolver::{file_name, is_manifest_path};
use scenepad::assets::{
    AssetError, AssetLoader, AssetSource, ByteSource, FileResolver, LoaderOptions, VirtualFileSet,
};
use scenepad::render::{self, HeadlessBackend, RenderError};
use scenepad::scene::{ApplyOutcome, SceneRuntime};
use scenepad::ui::UiState;

#[derive(Parser)]
#[command(name = "scenepad")]
#[command(version, about = "Import a GLTF model and report the GPU-ready result")]
struct Args {
    /// URL, directory, .gltf file, or several files making up one asset
    sources: Vec<String>,

    /// Manifest to prefer when the file set holds several .gltf files
    #[arg(long)]
    hint: Option<String>,

    /// Backend accepts 32-bit index buffers
    #[arg(long)]
    extended_indices: bool,

    /// Choose the asset folder with a native dialog
    #[arg(long, conflicts_with = "sources")]
    pick: bool,

    /// Generate a primitive shape instead of importing a model
    #[arg(long, value_enum, conflicts_with_all = ["sources", "pick"])]
    shape: Option<ShapeArg>,

    /// Image to texture the generated shape with
    #[arg(long, requires = "shape")]
    texture: Option<PathBuf>,

    /// Sphere tessellation as LATxLON
    #[arg(long, value_parser = parse_bands, requires = "shape")]
    bands: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeArg {
    Cube,
    Sphere,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {0}", .0.kind())]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Usage(String),
}

fn parse_bands(value: &str) -> Result<(u32, u32), String> {
    let (lat, lon) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected LATxLON, got '{value}'"))?;
    let lat = lat.trim().parse().map_err(|_| format!("invalid latitude bands '{lat}'"))?;
    let lon = lon.trim().parse().map_err(|_| format!("invalid longitude bands '{lon}'"))?;
    if lat > MAX_SPHERE_BANDS || lon > MAX_SPHERE_BANDS {
        return Err(format!("at most {MAX_SPHERE_BANDS} bands per axis"));
    }
    Ok((lat, lon))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let mut backend = HeadlessBackend::new(args.extended_indices);
    let mut scene = SceneRuntime::new();
    let mut ui = UiState::new();

    if let Some(shape) = args.shape {
        let kind = match shape {
            ShapeArg::Cube => ShapeKind::Cube,
            ShapeArg::Sphere => {
                let (latitude_bands, longitude_bands) = args
                    .bands
                    .unwrap_or((DEFAULT_SPHERE_BANDS, DEFAULT_SPHERE_BANDS));
                ShapeKind::Sphere {
                    latitude_bands,
                    longitude_bands,
                }
            }
        };
        let texture = args.texture.as_deref().map(texture_file_set);
        let texture = texture
            .as_ref()
            .map(|(files, name)| (files as &dyn FileResolver, name.as_str()));
        scene.show_shape(kind, texture);
        ui.update(&scene);
    } else {
        let (source, hint) = classify_sources(args)?;
        let loader = AssetLoader::new(LoaderOptions::for_backend(&backend));
        let ticket = scene.begin_load();
        let result = loader.load(&source, hint.as_deref());
        let outcome = scene.apply(ticket, result);
        ui.report(&outcome, &scene);
        if let ApplyOutcome::Failed(err) = outcome {
            return Err(err.into());
        }
    }

    let Some(drawable) = scene.active() else {
        return Err(CliError::Usage("nothing was loaded".to_string()));
    };
    let mesh = render::upload(&mut backend, drawable)?;
    render::draw(&mut backend, &mesh)?;

    if let Some(banner) = ui.banner() {
        println!("{}", banner.text);
    }
    println!("{}", ui.summary());
    println!(
        "Uploaded {} buffers, {} textures ({} bytes); {} draw call(s)",
        backend.buffers().len(),
        backend.textures().len(),
        backend.uploaded_bytes(),
        backend.draws().len()
    );
    let camera = scene.camera();
    let forward = camera.forward();
    println!(
        "Camera at {:.2}, {:.2}, {:.2} looking along {:.2}, {:.2}, {:.2}",
        camera.position[0],
        camera.position[1],
        camera.position[2],
        forward.x,
        forward.y,
        forward.z
    );
    Ok(())
}

/// A one-entry file set holding the texture, keyed by its file name.
fn texture_file_set(path: &Path) -> (VirtualFileSet, String) {
    let name = file_name(&path.to_string_lossy()).to_string();
    let mut files = VirtualFileSet::new();
    files.insert(&name, ByteSource::File(path.to_path_buf()));
    (files, name)
}

/// Decides how the positional sources become an [`AssetSource`], returning
/// the manifest hint to load with.
fn classify_sources(args: &Args) -> Result<(AssetSource, Option<String>), CliError> {
    if args.pick {
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return Err(CliError::Usage("no folder picked".to_string()));
        };
        return Ok((walk(&dir)?, args.hint.clone()));
    }

    match args.sources.as_slice() {
        [] => Err(CliError::Usage(
            "pass a URL, directory or files, or use --pick / --shape".to_string(),
        )),
        [single] if single.starts_with("http://") || single.starts_with("https://") => {
            Ok((AssetSource::Url(single.clone()), args.hint.clone()))
        }
        [single] => {
            let path = PathBuf::from(single);
            if path.is_dir() {
                return Ok((walk(&path)?, args.hint.clone()));
            }
            if is_manifest_path(single) {
                // Load the manifest with its siblings so relative uris resolve.
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                let hint = args
                    .hint
                    .clone()
                    .unwrap_or_else(|| file_name(single).to_string());
                return Ok((walk(&dir)?, Some(hint)));
            }
            let bytes = std::fs::read(&path).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            Ok((
                AssetSource::RawBytes {
                    name: Some(file_name(single).to_string()),
                    bytes,
                },
                args.hint.clone(),
            ))
        }
        several => {
            let mut files = VirtualFileSet::new();
            for source in several {
                files.insert(file_name(source), ByteSource::File(PathBuf::from(source)));
            }
            Ok((AssetSource::Files(files), args.hint.clone()))
        }
    }
}

fn walk(dir: &Path) -> Result<AssetSource, CliError> {
    let files = VirtualFileSet::from_directory(dir).map_err(|source| CliError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    log::info!("Found {} files under {}", files.len(), dir.display());
    Ok(AssetSource::Files(files))
}
