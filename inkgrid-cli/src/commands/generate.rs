//! Generate command - submit a mosaic job and follow it to completion.

use clap::Args;
use inkgrid::config::ConfigFile;
use inkgrid::pipeline::{
    GenerationJob, GenerationParams, InMemoryJobStore, JobDraft, JobStatus, MosaicOrchestrator,
    SettingsStore, Style, TargetId, UserId,
};
use inkgrid::store::{FsImageStore, ImageRef};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the generate command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Main image reference, relative to the uploads root
    #[arg(long)]
    pub main: String,

    /// Tile image reference (repeat for each tile)
    #[arg(long = "tile", required = true)]
    pub tiles: Vec<String>,

    /// Owning user ID
    #[arg(long, default_value_t = 1)]
    pub user: u64,

    /// Target (project) ID
    #[arg(long, default_value_t = 1)]
    pub target: u64,

    /// Tile edge in pixels for the HD output (10-200) [default: saved settings]
    #[arg(long)]
    pub tile_size: Option<u32>,

    /// Tile density (1-100) [default: saved settings]
    #[arg(long)]
    pub density: Option<u32>,

    /// Color adjustment (0-100) [default: saved settings]
    #[arg(long)]
    pub color_adjustment: Option<u32>,

    /// Mosaic style: classic, random or flowing [default: saved settings]
    #[arg(long)]
    pub style: Option<Style>,

    /// Uploads root directory [default: from config]
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Seed for reproducible tile placement
    #[arg(long)]
    pub seed: Option<u64>,

    /// Status poll interval in milliseconds
    #[arg(long, default_value_t = 250)]
    pub poll_ms: u64,
}

/// Run the generate command.
pub async fn run(args: GenerateArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("generate");

    let root = args
        .root
        .clone()
        .unwrap_or_else(|| runner.config().storage.uploads_root.clone());
    let job = execute(runner.config(), args).await?;

    println!();
    println!("✓ Mosaic complete ({})", job.id);
    if let Some(sd) = &job.sd_output {
        println!("  SD: {}", sd.to_path(&root).display());
    }
    if let Some(hd) = &job.hd_output {
        println!("  HD: {}", hd.to_path(&root).display());
    }
    Ok(())
}

/// Submits the job, prints forward-only progress and returns the completed
/// record.
pub async fn execute(config: &ConfigFile, args: GenerateArgs) -> Result<GenerationJob, CliError> {
    let mut orchestrator_config = config.orchestrator_config();
    if let Some(root) = &args.root {
        orchestrator_config.uploads_root = root.clone();
    }
    orchestrator_config.seed = args.seed;

    let images = Arc::new(FsImageStore::new(&orchestrator_config.uploads_root));
    let orchestrator = MosaicOrchestrator::new(
        orchestrator_config,
        Arc::new(InMemoryJobStore::new()),
        images,
    );

    // The config file's [generation] section is the user's saved settings.
    orchestrator
        .settings()
        .save(UserId::new(args.user), None, config.generation_params())?;
    let request = build_request(orchestrator.settings(), &args)?;

    let job = orchestrator.submit(request)?;
    info!(job_id = %job.id, "Job submitted");
    println!(
        "Submitted {} ({} tiles, tile size {}px)",
        job.id,
        job.tile_images.len(),
        job.params.tile_size
    );

    let registry = orchestrator.registry();
    let poll = Duration::from_millis(args.poll_ms.max(1));
    let mut last_progress = None;
    let finished = loop {
        let status = registry.get_status(job.user_id, job.id)?;
        if last_progress != Some(status.progress) {
            println!("  [{:>3}%] {}", status.progress, status.status);
            last_progress = Some(status.progress);
        }
        if status.is_terminal() {
            break status;
        }
        tokio::time::sleep(poll).await;
    };
    orchestrator.wait_idle().await;

    match finished.status {
        JobStatus::Completed => Ok(finished),
        _ => Err(CliError::Generation {
            job: finished.id,
            kind: finished
                .error_kind
                .unwrap_or(inkgrid::pipeline::ErrorKind::Internal),
            message: finished.error_message.unwrap_or_default(),
        }),
    }
}

/// Builds the job request, layering command-line overrides over the saved
/// settings for the user and target.
fn build_request(settings: &SettingsStore, args: &GenerateArgs) -> Result<JobDraft, CliError> {
    let main_image = parse_reference(&args.main)?;
    let tile_images = args
        .tiles
        .iter()
        .map(|tile| parse_reference(tile))
        .collect::<Result<Vec<_>, _>>()?;

    let user_id = UserId::new(args.user);
    let target_id = TargetId::new(args.target);
    let saved = settings.get(user_id, Some(target_id));
    let params = GenerationParams {
        tile_size: args.tile_size.unwrap_or(saved.tile_size),
        tile_density: args.density.unwrap_or(saved.tile_density),
        color_adjustment: args.color_adjustment.unwrap_or(saved.color_adjustment),
        style: args.style.unwrap_or(saved.style),
    };

    Ok(JobDraft {
        user_id,
        target_id,
        main_image,
        tile_images,
        params,
    })
}

fn parse_reference(raw: &str) -> Result<ImageRef, CliError> {
    ImageRef::normalize(raw).map_err(|e| CliError::InvalidArgument(e.to_string()))
}
