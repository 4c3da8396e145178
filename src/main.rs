mod cli;

use smartmedia::{
    config::{self, Config},
    conversion::{ConversionOrchestrator, CostEstimator, PresetCatalog},
    pricing::{load_location_pricing, PricingCalculator, StaticPricingSource},
    remote::{LocalArtifactBucket, LocalDispatchBucket},
    storage::{BlobStore, FsBlobStore},
};
use smartmedia_common::{ContentHash, PathHash};
use smartmedia_db::models::{MediaMetadata, NewQueueMessage};
use smartmedia_db::pool::{get_conn, init_pool, DbPool};
use smartmedia_db::queries::{media_metadata, queue_messages};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "smartmedia=trace,smartmedia_db=debug,smartmedia_common=debug".to_string()
        } else {
            "smartmedia=info,smartmedia_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or_else(|| cli.config.clone());
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("smartmedia {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Estimate {
            height,
            duration,
            video_streams,
            audio_streams,
            presets,
            region,
        } => estimate(
            config_path,
            height,
            duration,
            video_streams,
            audio_streams,
            presets,
            region,
        ),
        command => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_command(command, config_path))
        }
    }
}

/// Everything a batch command needs, built from the configuration.
struct Services {
    config: Config,
    pool: DbPool,
    blobs: Arc<FsBlobStore>,
}

impl Services {
    fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = config::load_config_or_default(config_path)?;

        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", config.data_dir))?;

        let db_path = config.db_path();
        let db_path_str = db_path.to_string_lossy();
        tracing::debug!("Opening database at {}", db_path_str);
        let pool = init_pool(&db_path_str)?;

        let blobs = Arc::new(FsBlobStore::new(config.blob_dir(), pool.clone()));
        Ok(Self {
            config,
            pool,
            blobs,
        })
    }

    fn orchestrator(&self) -> ConversionOrchestrator {
        ConversionOrchestrator::new(
            self.pool.clone(),
            self.config.orchestrator_settings(),
            self.blobs.clone(),
            Arc::new(LocalDispatchBucket::new(&self.config.remote.input_dir)),
            Arc::new(LocalArtifactBucket::new(&self.config.remote.output_dir)),
        )
    }
}

async fn run_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let services = Services::open(config_path)?;

    match command {
        Commands::Create { path_hash } => {
            let path_hash = PathHash::new(path_hash);
            let file = services
                .blobs
                .get(&path_hash)
                .await?
                .with_context(|| format!("No stored file with path hash {}", path_hash))?;
            print_json(&services.orchestrator().create_conversion(&file)?)
        }
        Commands::Backfill => print_json(&services.orchestrator().backfill().await?),
        Commands::Dispatch => print_json(&services.orchestrator().dispatch().await?),
        Commands::Reconcile => print_json(&services.orchestrator().reconcile().await?),
        Commands::Run => print_json(&services.orchestrator().run_cycle().await?),
        Commands::Status { path_hash, trigger } => {
            let status = services
                .orchestrator()
                .request_conversion(&PathHash::new(path_hash), trigger)
                .await?;
            match status {
                Some(status) => println!("{}", status),
                None => println!("not_found"),
            }
            Ok(())
        }
        Commands::Import { file, path } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {:?}", file))?;
            let path = match path {
                Some(path) => path,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .with_context(|| format!("Cannot derive a store path from {:?}", file))?,
            };
            print_json(&services.blobs.put(&path, data.into()).await?)
        }
        Commands::Metadata {
            path_hash,
            height,
            duration,
            video_streams,
            audio_streams,
        } => {
            let path_hash = PathHash::new(path_hash);
            let file = services
                .blobs
                .get(&path_hash)
                .await?
                .with_context(|| format!("No stored file with path hash {}", path_hash))?;
            let metadata = MediaMetadata {
                path_hash,
                content_hash: file.content_hash,
                height,
                duration_secs: duration,
                video_streams,
                audio_streams,
            };
            let conn = get_conn(&services.pool)?;
            media_metadata::upsert_metadata(&conn, &metadata)?;
            print_json(&metadata)
        }
        Commands::Notify {
            process,
            status,
            object_key,
            message_id,
        } => {
            let message_id = message_id.unwrap_or_else(|| {
                format!(
                    "{}-{}-{}",
                    object_key,
                    process,
                    chrono::Utc::now().timestamp_micros()
                )
            });
            let message = NewQueueMessage {
                message_id,
                process,
                status,
                object_key: ContentHash::new(object_key),
                body: None,
            };
            let conn = get_conn(&services.pool)?;
            if !queue_messages::insert_message(&conn, &message)? {
                println!("Message {} already recorded", message.message_id);
            }
            Ok(())
        }
        Commands::EstimateRecord { path_hash } => {
            let config = &services.config;
            let pricing = load_location_pricing(
                &StaticPricingSource::new(config.pricing.prices.clone()),
                &config.pricing.region,
            )?;
            let estimator = CostEstimator::new(
                services.pool.clone(),
                PresetCatalog::new(config.presets.iter().cloned()),
                pricing,
            );
            print_json(&estimator.estimate_record(&PathHash::new(path_hash))?)
        }
        Commands::Estimate { .. } | Commands::Validate { .. } | Commands::Version => {
            anyhow::bail!("Command does not use the conversion database")
        }
    }
}

fn estimate(
    config_path: Option<&Path>,
    height: u32,
    duration: f64,
    video_streams: u32,
    audio_streams: u32,
    presets: Vec<String>,
    region: Option<String>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let region = region.unwrap_or_else(|| config.pricing.region.clone());
    let preset_ids = if presets.is_empty() {
        config.transcode.presets.clone()
    } else {
        presets
    };

    let pricing = load_location_pricing(
        &StaticPricingSource::new(config.pricing.prices.clone()),
        &region,
    )?;
    let catalog = PresetCatalog::new(config.presets.iter().cloned());
    let calculator = PricingCalculator::new(pricing, catalog.resolve(&preset_ids)?);

    for (tier, valid) in [
        ("standard definition", calculator.is_standard_definition_pricing_valid()),
        ("high definition", calculator.is_high_definition_pricing_valid()),
        ("audio", calculator.is_audio_pricing_valid()),
    ] {
        if !valid {
            tracing::warn!("No valid {} price for region {}", tier, region);
        }
    }

    match calculator.calculate_transcode_cost(height, duration, video_streams, audio_streams)? {
        Some(cost) => println!("{:.5}", cost),
        None => println!("No presets selected; cost unknown"),
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            let settings = config.orchestrator_settings();
            println!("✓ Configuration is valid");
            println!("  Site: {}", config.site_id);
            println!("  Data dir: {:?}", config.data_dir);
            println!("  Batch size: {}", config.batch_size);
            println!(
                "  Services: transcoding{}",
                settings
                    .services
                    .optional()
                    .map(|s| format!(", {}", s))
                    .collect::<String>()
            );
            println!("  Transcode presets: {}", config.transcode.presets.join(", "));
            println!("  Pricing region: {}", config.pricing.region);
            println!("  Preset catalog: {}", config.presets.len());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Data dir: {:?}", config.data_dir);
            println!("  Pricing region: {}", config.pricing.region);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
