//! Kompas Node - compass guidance demo driver
//!
//! This binary runs the guidance service against the static place
//! provider and feeds it simulated sensor streams:
//! - a location feed walking a randomly drifting course from a start
//!   point, one step per interval
//! - a compass feed sweeping the device heading
//!
//! Every broadcast event is logged as it happens; a final snapshot and
//! the service statistics are printed before graceful shutdown.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use kompas_core::{normalize_degrees, GeoPoint, HeadingSample};
use kompas_guidance::{GuidanceConfig, GuidanceEvent, GuidanceService, StaticProvider};

/// Simulated backend latency for the static provider
const PROVIDER_LATENCY: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "kompas-node")]
#[command(about = "Compass guidance demo with simulated location and heading feeds")]
struct Args {
    /// Start latitude in degrees
    #[arg(long, default_value_t = 52.3676)]
    lat: f64,

    /// Start longitude in degrees
    #[arg(long, default_value_t = 4.9041)]
    lon: f64,

    /// Path to a JSON guidance configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Movement threshold in meters (overrides the config file)
    #[arg(long)]
    threshold: Option<f64>,

    /// Number of simulated walk steps
    #[arg(long, default_value_t = 30)]
    steps: u32,

    /// Meters covered per step
    #[arg(long, default_value_t = 25.0)]
    step_m: f64,

    /// Delay between steps (e.g. "250ms", "1s")
    #[arg(long, default_value = "250ms", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Only consider places that are currently open
    #[arg(long)]
    open_now: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    let start = GeoPoint::new(args.lat, args.lon)?;

    info!("═══════════════════════════════════════════════════════════");
    info!("  Kompas guidance demo");
    info!("  Start position:     {}", start);
    info!("  Movement threshold: {} m", config.movement_threshold_m);
    info!("  Search radius:      {} m", config.search.radius_m);
    info!("  Open places only:   {}", config.search.open_now);
    info!("  Walk:               {} steps of {} m every {}",
        args.steps, args.step_m, humantime::format_duration(args.interval));
    info!("═══════════════════════════════════════════════════════════");

    let provider =
        StaticProvider::new(config.search.clone()).with_latency(PROVIDER_LATENCY);
    let (service, handle, mut events) = GuidanceService::new(config, provider)?;

    let service_task = tokio::spawn(service.run());

    // Log every broadcast event as it happens
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                GuidanceEvent::Started => info!("Guidance service running"),
                GuidanceEvent::SearchStarted { generation, origin } => {
                    info!(generation, origin = %origin, "Searching for places nearby");
                }
                GuidanceEvent::TargetUpdated { target } => {
                    info!(
                        name = %target.name,
                        address = %target.address,
                        distance = %target.formatted_distance(),
                        bearing_deg = target.bearing_deg.unwrap_or(0.0),
                        "Nearest target updated"
                    );
                }
                GuidanceEvent::TargetCleared { origin } => {
                    info!(origin = %origin, "Nothing found nearby");
                }
                GuidanceEvent::SearchFailed { reason } => {
                    warn!(%reason, "Search failed");
                }
                GuidanceEvent::Stopped => info!("Guidance service stopped"),
            }
        }
    });

    walk(&handle, start, &args).await?;

    // Let an in-flight search settle before reading the final state
    tokio::time::sleep(PROVIDER_LATENCY + args.interval).await;

    let snapshot = handle.snapshot();
    let stats = handle.stats().await?;

    info!("═══════════════════════════════════════════════════════════");
    info!("  Final status:       {}", snapshot.status);
    match &snapshot.nearest {
        Some(target) => {
            info!("  Nearest target:     {} ({})", target.name, target.address);
            info!("  Distance:           {}", target.formatted_distance());
            info!("  Bearing:            {:.1}°", target.bearing_deg.unwrap_or(0.0));
        }
        None => info!("  Nearest target:     none"),
    }
    info!("  Device heading:     {:.1}°", snapshot.device_heading);
    info!("  Relative heading:   {:.1}°", snapshot.relative_heading);
    info!("───────────────────────────────────────────────────────────");
    info!("  Location updates:   {}", stats.location_updates);
    info!("  Heading updates:    {}", stats.heading_updates);
    info!("  Searches started:   {}", stats.searches_started);
    info!("  Succeeded / empty / failed: {} / {} / {}",
        stats.searches_succeeded, stats.searches_empty, stats.searches_failed);
    info!("  Gated updates:      {}", stats.gated_updates);
    info!("  Coalesced triggers: {}", stats.coalesced_triggers);
    info!("  Gating efficiency:  {:.0}%", stats.gating_efficiency() * 100.0);
    info!("  Uptime:             {} s", stats.uptime_secs);
    info!("═══════════════════════════════════════════════════════════");

    handle.shutdown().await?;
    if let Err(e) = service_task.await? {
        error!("Guidance service error: {}", e);
    }

    Ok(())
}

/// Load the guidance configuration and apply CLI overrides
fn load_config(args: &Args) -> anyhow::Result<GuidanceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let config: GuidanceConfig = serde_json::from_str(&text)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        None => GuidanceConfig::default(),
    };

    if let Some(threshold) = args.threshold {
        config.movement_threshold_m = threshold;
    }
    if args.open_now {
        config.search.open_now = true;
    }

    Ok(config)
}

/// Feed the service a drifting walk and a sweeping compass
async fn walk(
    handle: &kompas_guidance::GuidanceHandle,
    start: GeoPoint,
    args: &Args,
) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let mut position = start;
    let mut course: f64 = rng.gen_range(0.0..360.0);

    for step in 0..args.steps {
        // The compass sweeps independently of the walking direction,
        // like a user looking around while they walk
        let device_heading = normalize_degrees(step as f64 * 17.0);
        handle
            .update_heading(HeadingSample::new(device_heading)?)
            .await?;
        handle.update_location(position).await?;

        course = normalize_degrees(course + rng.gen_range(-30.0..30.0));
        position = position.destination(course, args.step_m);

        tokio::time::sleep(args.interval).await;
    }

    Ok(())
}
