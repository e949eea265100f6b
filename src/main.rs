//! Meshport - import a model file into an entity world
//!
//! Runs the import engine against one file, ticking until the request
//! settles, and prints the resulting meshes.

mod settings;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use meshport_assets::DataServer;
use meshport_ecs::{Entity, World};
use meshport_models::{ModelImportSystem, ModelRequest, ModelView, RequestStatus};

use settings::{AppSettings, RunSettings};

#[derive(Parser, Debug)]
#[command(name = "meshport")]
#[command(version)]
#[command(about = "Import a glTF or OBJ model and summarize its meshes")]
struct Cli {
    /// Model file to import
    path: PathBuf,

    /// Format hint overriding the file extension (gltf, glb, obj)
    #[arg(long)]
    format: Option<String>,

    /// Seconds to wait for the file before giving up
    #[arg(long)]
    timeout: Option<f32>,

    /// Simulated seconds per tick
    #[arg(long)]
    tick: Option<f32>,

    /// Ticks to run before giving up
    #[arg(long)]
    max_ticks: Option<u32>,

    /// Settings file to use instead of the one in the config directory
    #[arg(long, env = "MESHPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Write the effective settings to the config directory
    #[arg(long)]
    save_config: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => AppSettings::load_from(path)?,
        None => AppSettings::load(),
    };

    let file_name = cli
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Not a file path: {:?}", cli.path))?
        .to_string();
    let base = cli
        .path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Some(tick) = cli.tick {
        settings.run.tick = tick;
    }
    if let Some(max_ticks) = cli.max_ticks {
        settings.run.max_ticks = max_ticks;
    }
    if let Some(timeout) = cli.timeout {
        settings.import.default_timeout = timeout;
    }
    if cli.save_config {
        settings.save()?;
    }
    debug!(?settings, "effective settings");
    let RunSettings { tick, max_ticks } = settings.run;
    let timeout = settings.import.default_timeout;

    let mut request = ModelRequest::new(file_name).with_timeout(timeout);
    if let Some(format) = &cli.format {
        request = request.with_format(format);
    }

    let mut world = World::new();
    let mut system = ModelImportSystem::with_loader(DataServer::with_base_path(base))
        .with_settings(settings.import);
    let model = request.spawn(&mut world);

    info!("Importing {:?}", cli.path);
    let mut ticks = 0;
    let status = loop {
        let stats = system.update(&mut world, tick)?;
        ticks += 1;
        debug!(tick = ticks, ?stats, "tick");

        let status = ModelView::new(&world, model)
            .status()
            .context("Model request disappeared")?;
        if matches!(
            status,
            RequestStatus::Loaded | RequestStatus::NotFound | RequestStatus::Failed
        ) || ticks >= max_ticks
        {
            break status;
        }
    };

    match status {
        RequestStatus::Loaded => {}
        RequestStatus::NotFound => bail!("{:?} was not found within {}s", cli.path, timeout),
        RequestStatus::Failed => bail!("{:?} could not be imported", cli.path),
        other => bail!("{:?} still {:?} after {} ticks", cli.path, other, ticks),
    }

    print_summary(&world, model);
    Ok(())
}

fn print_summary(world: &World, model: Entity) {
    let view = ModelView::new(world, model);
    println!("{} meshes", view.mesh_count());
    for (index, mesh) in view.meshes().enumerate() {
        let bounds = mesh
            .bounds()
            .map(|b| format!("{:?} .. {:?}", b.min.to_array(), b.max.to_array()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{}] {:<24} vertices {:>7}  indices {:>7}  channels {:?}  bounds {}",
            index,
            mesh.name().unwrap_or(""),
            mesh.vertex_count(),
            mesh.index_count(),
            mesh.channels(),
            bounds,
        );
    }
    if let Some(bounds) = view.bounds() {
        println!(
            "model bounds {:?} .. {:?} (size {:?})",
            bounds.min.to_array(),
            bounds.max.to_array(),
            bounds.size().to_array()
        );
    }
}
