//! Push the routes of a JSON file to a running routebot server.

use clap::Parser;
use routebot_cli::{load_routes, RouteServerClient};
use tracing_subscriber::EnvFilter;

/// Import routes into a routebot server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Routes JSON file (array or {"routes": [...]})
    file: String,

    /// Routebot server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Replace every stored route instead of upserting one by one
    #[arg(long)]
    replace: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let routes = load_routes(&args.file)?;
    let client = RouteServerClient::new(&args.url);

    println!("Importing {} routes into {}...", routes.len(), args.url);

    if args.replace {
        let stored = client.replace_routes(&routes)?;
        println!("Replaced stored routes ({} routes)", stored);
        return Ok(());
    }

    let mut failed = 0usize;
    for route in &routes {
        match client.upsert_route(route) {
            Ok(id) => println!("  stored {} ({} points)", id, route.points.len()),
            Err(e) => {
                tracing::warn!("Route '{}' failed: {:#}", route.id, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} routes failed", failed, routes.len());
    }
    println!("Done.");
    Ok(())
}
