mod config;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tile_lib::{TileClient, TileId};
use tileview::{ManagerConfig, RenderGroup, TileManager};
use tileview_core::index::DEFAULT_TILE_TEMPLATE;
use tileview_core::{BoundaryIndex, BoundingBox, Feature, FeatureCollection, ZoomTransform};

use config::Step;

#[derive(Parser)]
#[command(name = "tile-fetch", about = "Query a tile server and replay pan/zoom sessions")]
struct Cli {
    /// TOML file with manager settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tile server origin (overrides TILES_ORIGIN and the config file)
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct BoundsArgs {
    #[arg(long, allow_hyphen_values = true)]
    west: f64,
    #[arg(long, allow_hyphen_values = true)]
    east: f64,
    #[arg(long, allow_hyphen_values = true)]
    north: f64,
    #[arg(long, allow_hyphen_values = true)]
    south: f64,
}

impl BoundsArgs {
    fn bounds(&self) -> Result<BoundingBox> {
        let bounds = BoundingBox::new(self.west, self.east, self.north, self.south);
        if !bounds.is_valid() {
            bail!("Invalid bounds: west must not exceed east, south must not exceed north");
        }
        Ok(bounds)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the tile boundary collection and list each tile's envelope
    Boundaries,
    /// List the tiles intersecting a box
    Find {
        #[command(flatten)]
        bounds: BoundsArgs,

        /// Resolve offline against a local boundary GeoJSON file
        #[arg(long)]
        boundaries: Option<PathBuf>,

        /// Tile file name pattern for offline resolution
        #[arg(long, default_value = DEFAULT_TILE_TEMPLATE)]
        template: String,
    },
    /// Fetch one tile and summarize its features
    Fetch {
        /// Tile id as returned by `find`
        tile: String,

        /// Print the normalized features as a GeoJSON FeatureCollection
        #[arg(long)]
        json: bool,
    },
    /// Drive a tile manager with a scripted list of transforms
    Replay {
        /// JSON array of {k, x, y, wait_ms} or {center, zoom, wait_ms} steps
        script: PathBuf,

        /// Override the fetch concurrency bound
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Override the debounce delay
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

fn manager_config(cli: &Cli) -> Result<ManagerConfig> {
    let file = cli.config.as_deref().map(config::load_file).transpose()?;
    let env_origin = std::env::var(config::ORIGIN_ENV).ok();
    Ok(config::layered(file, env_origin, cli.origin.clone()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = manager_config(&cli)?;
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Boundaries => {
            let client = TileClient::with_timeout(&config.origin, timeout)?;
            let boundaries = client.fetch_boundaries().await.context("Failed to fetch boundaries")?;
            print_boundaries(&boundaries);
        }

        Commands::Find { bounds, boundaries, template } => {
            let bounds = bounds.bounds()?;
            let tiles: Vec<String> = match boundaries {
                Some(path) => {
                    let collection = load_boundaries(&path)?;
                    BoundaryIndex::from_features(&collection).tile_names(&bounds, &template)
                }
                None => {
                    let client = TileClient::with_timeout(&config.origin, timeout)?;
                    let ids = client.find_tiles(&bounds).await.context("Failed to resolve tiles")?;
                    ids.into_iter().map(|id| id.as_str().to_string()).collect()
                }
            };
            for tile in &tiles {
                println!("{tile}");
            }
            eprintln!("{} tiles", tiles.len());
        }

        Commands::Fetch { tile, json } => {
            let client = TileClient::with_timeout(&config.origin, timeout)?;
            let id = TileId::from(tile);
            let features = client
                .fetch_tile(&id)
                .await
                .with_context(|| format!("Failed to fetch tile {id}"))?;
            if json {
                let collection = FeatureCollection::new(features);
                println!("{}", serde_json::to_string_pretty(&collection)?);
            } else {
                print_tile_summary(&id, &features);
            }
        }

        Commands::Replay { script, max_concurrent, debounce_ms } => {
            if let Some(n) = max_concurrent {
                config.max_concurrent = n;
            }
            if let Some(ms) = debounce_ms {
                config.debounce_ms = ms;
            }
            let steps = config::load_script(&script)?;
            replay(config, timeout, steps).await?;
        }
    }

    Ok(())
}

async fn replay(config: ManagerConfig, timeout: Duration, steps: Vec<Step>) -> Result<()> {
    let client = TileClient::with_timeout(&config.origin, timeout)?;
    let manager = TileManager::new(config, client, RenderGroup::new())?;

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            manager.initialize().await;
            for (i, step) in steps.iter().enumerate() {
                let transform = match *step {
                    Step::Transform { k, x, y, .. } => ZoomTransform::new(k, x, y),
                    Step::Center { center, zoom, .. } => manager.monitor().transform_for(center, zoom),
                };
                let viewport = manager.handle_transform(transform);
                log::info!(
                    "Step {}: zoom {:.2}, [{:.4}, {:.4}] x [{:.4}, {:.4}]",
                    i + 1,
                    viewport.zoom,
                    viewport.bounds.west,
                    viewport.bounds.east,
                    viewport.bounds.south,
                    viewport.bounds.north
                );
                tokio::time::sleep(Duration::from_millis(step.wait_ms())).await;
            }
            manager.drained().await;
        })
        .await;

    let stats = manager.queue_stats();
    println!(
        "{} fetches: {} loaded, {} failed, {} discarded, peak {} in flight",
        stats.started, stats.loaded, stats.failed, stats.discarded, stats.peak_in_flight
    );
    manager.with_renderer(|group| {
        println!("{} tiles, {} features drawn", group.tile_count(), group.feature_count());
        for id in group.tile_ids() {
            let n = group.tile(&id).map_or(0, |f| f.len());
            println!("  {id:60} {n:>6} features");
        }
    });
    manager.dispose();
    Ok(())
}

fn load_boundaries(path: &std::path::Path) -> Result<FeatureCollection> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read boundaries: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse boundaries: {}", path.display()))
}

fn print_boundaries(boundaries: &FeatureCollection) {
    let index = BoundaryIndex::from_features(boundaries);
    println!("{} boundaries", boundaries.len());
    if let Some(extent) = index.extent() {
        println!(
            "Extent: [{:.4}, {:.4}] x [{:.4}, {:.4}]",
            extent.west, extent.east, extent.south, extent.north
        );
    }
    println!();
    for entry in index.entries() {
        let b = &entry.bbox;
        println!(
            "  {:20} [{:>10.4}, {:>10.4}] x [{:>9.4}, {:>9.4}]",
            entry.code, b.west, b.east, b.south, b.north
        );
    }
}

fn print_tile_summary(id: &TileId, features: &[Feature]) {
    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    let mut positions = 0;
    for geometry in features.iter().filter_map(|f| f.geometry.as_ref()) {
        *kinds.entry(geometry.kind()).or_default() += 1;
        positions += geometry.position_count();
    }
    println!("{id}: {} features, {positions} positions", features.len());
    for (kind, n) in kinds {
        println!("  {kind:20} {n:>6}");
    }
}
