//! Plan a path offline and optionally simulate the follower along it.
//!
//! Terrain is flat at `--ground`; no height service is contacted.

use clap::Parser;
use routebot_cli::{load_routes, parse_point};
use routebot_core::{
    FlatTerrain, GeoPoint, PathFollower, PlannerConfig, RoutePlanner, DEFAULT_FOLLOWER_SPEED_MPS,
};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::time;
use tracing_subscriber::EnvFilter;

/// Plan between two points over a routes file
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Routes JSON file (array or {"routes": [...]})
    #[arg(long)]
    routes: Option<String>,

    /// Start point as lon,lat[,height]
    #[arg(long, value_parser = parse_point_arg)]
    start: GeoPoint,

    /// End point as lon,lat[,height]
    #[arg(long, value_parser = parse_point_arg)]
    end: GeoPoint,

    /// Ground height for the direct-line fallback, in meters
    #[arg(long, default_value_t = 0.0)]
    ground: f64,

    /// Graph nodes each query point is spliced to
    #[arg(long, default_value_t = 3)]
    neighbors: usize,

    /// Segments of the direct-line fallback
    #[arg(long, default_value_t = 48)]
    samples: usize,

    /// Simulate the follower and print its positions
    #[arg(long)]
    follow: bool,

    /// Follower speed in m/s
    #[arg(long, default_value_t = DEFAULT_FOLLOWER_SPEED_MPS)]
    speed: f64,

    /// Follower update rate in Hz
    #[arg(long, default_value_t = 2.0)]
    rate: f64,

    /// Pace the simulation in wall-clock time
    #[arg(long)]
    realtime: bool,
}

fn parse_point_arg(raw: &str) -> Result<GeoPoint, String> {
    parse_point(raw).map_err(|err| err.to_string())
}

/// Simulation step for an update rate in Hz.
fn tick_step(rate: f64) -> anyhow::Result<Duration> {
    if !(rate.is_finite() && rate > 0.0) {
        anyhow::bail!("--rate must be positive");
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .map_err(|_| anyhow::anyhow!("--rate {} is too small", rate))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let step = tick_step(args.rate)?;

    let routes = match args.routes.as_deref() {
        Some(path) => load_routes(path)?,
        None => Vec::new(),
    };
    let planner = RoutePlanner::new(
        routes,
        PlannerConfig {
            nearest_neighbors: args.neighbors,
            terrain_samples: args.samples,
        },
    );
    let graph = planner.snapshot();
    tracing::info!(
        "Route graph: {} routes, {} nodes",
        graph.route_count(),
        graph.node_count()
    );

    let terrain = FlatTerrain {
        height_m: args.ground,
    };
    let planned = planner.plan(&terrain, &args.start, &args.end).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "mode": planned.mode(),
            "length_m": planned.path.length_m(),
            "node_ids": planned.node_ids,
            "positions": planned.path.positions(),
        }))?
    );

    if !args.follow {
        return Ok(());
    }

    let mut follower = PathFollower::new();
    let started = Instant::now();
    if !follower.start(planned.path.into_positions(), args.speed, started) {
        anyhow::bail!("nothing to follow (check --speed)");
    }
    if let Some(state) = follower.state() {
        tracing::info!(
            "Following {:.1} m at {} m/s ({:.1} s)",
            state.total_length(),
            args.speed,
            state.duration().as_secs_f64()
        );
    }

    let mut elapsed = Duration::ZERO;
    let mut interval = time::interval(step);
    loop {
        if args.realtime {
            interval.tick().await;
            elapsed = started.elapsed();
        }
        let Some(tick) = follower.tick(started + elapsed) else {
            break;
        };
        println!(
            "{:>6.2}s {:>5.1}% x={:.2} y={:.2} z={:.2}",
            elapsed.as_secs_f64(),
            tick.fraction * 100.0,
            tick.position.x,
            tick.position.y,
            tick.position.z
        );
        if tick.completed {
            break;
        }
        elapsed += step;
    }

    Ok(())
}
