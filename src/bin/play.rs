use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use routle_rust_server::constants::{
    DEFAULT_GEOCODER_TIMEOUT_MS, DEFAULT_MAP_LIST_PATH, DEFAULT_VIEWPORT_HEIGHT,
    DEFAULT_VIEWPORT_WIDTH,
};
use routle_rust_server::geocoder::StaticGeocoder;
use routle_rust_server::map_registry::MapRegistry;
use routle_rust_server::session::{GameSession, RadiusUpdate};
use routle_rust_server::types::{GameSnapshot, Viewport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Play a round in the terminal against a local city list.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value = DEFAULT_MAP_LIST_PATH)]
    maps: PathBuf,
    #[arg(long)]
    map: String,
    /// JSON array of `{name, lat, lng}`.
    #[arg(long)]
    cities: PathBuf,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH)]
    width: f64,
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_HEIGHT)]
    height: f64,
}

enum Command {
    Guess(String),
    Radius(f64),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Some(rest) = trimmed.strip_prefix(':') else {
        return Some(Command::Guess(trimmed.to_string()));
    };
    let mut parts = rest.split_whitespace();
    match parts.next()? {
        "radius" => parts
            .next()
            .and_then(|value| value.parse::<f64>().ok())
            .map(Command::Radius),
        "status" => Some(Command::Status),
        "quit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("routle_rust_server=warn")),
        )
        .init();

    let cli = Cli::parse();
    let viewport = Viewport::new(cli.width, cli.height);
    if !viewport.is_valid() {
        bail!("viewport must be positive, got {}x{}", cli.width, cli.height);
    }

    let maps = MapRegistry::load(&cli.maps)
        .with_context(|| format!("failed to load map list from {}", cli.maps.display()))?;
    let map = maps.get(&cli.map)?.clone();
    let geocoder = StaticGeocoder::load(&cli.cities)
        .with_context(|| format!("failed to load cities from {}", cli.cities.display()))?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let session = GameSession::start(
        "local".to_string(),
        map,
        Arc::new(geocoder),
        Duration::from_millis(DEFAULT_GEOCODER_TIMEOUT_MS),
        &mut rng,
    )
    .await?;

    println!(
        "Get from {} to {}",
        session.start_city.name, session.end_city.name
    );
    println!("Type a city name, :radius <px>, :status or :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            continue;
        };
        match command {
            Command::Guess(query) => match session.submit_guess(&query, viewport).await {
                Ok(report) => {
                    println!("{}", report.tagline);
                    if report.snapshot.has_won {
                        print_result(&report.snapshot);
                        break;
                    }
                }
                Err(error) => println!("error: {error}"),
            },
            Command::Radius(radius) => {
                match session.update_radius(RadiusUpdate::Absolute(radius)).await {
                    Ok(snapshot) => println!("search radius: {}", snapshot.search_radius),
                    Err(error) => println!("error: {error}"),
                }
            }
            Command::Status => print_status(&session.snapshot().await),
            Command::Quit => break,
        }
    }

    session.cancel();
    Ok(())
}

fn print_status(snapshot: &GameSnapshot) {
    println!(
        "at {} -> {} | visited {} | too far {} | radius {}",
        snapshot.current_point.name,
        snapshot.end_point.name,
        snapshot.past_points.len(),
        snapshot.far_points.len(),
        snapshot.search_radius
    );
}

fn print_result(snapshot: &GameSnapshot) {
    let route: Vec<&str> = snapshot
        .past_points
        .iter()
        .chain(std::iter::once(&snapshot.current_point))
        .map(|point| point.name.as_str())
        .collect();
    println!("Number of cities: {}", snapshot.past_points.len());
    println!("{}", route.join(" -> "));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_guess() {
        assert!(matches!(
            parse_command("  Malmo "),
            Some(Command::Guess(query)) if query == "Malmo"
        ));
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn colon_commands_parse() {
        assert!(matches!(parse_command(":radius 42"), Some(Command::Radius(value)) if value == 42.0));
        assert!(parse_command(":radius wide").is_none());
        assert!(matches!(parse_command(":status"), Some(Command::Status)));
        assert!(matches!(parse_command(":q"), Some(Command::Quit)));
        assert!(parse_command(":teleport").is_none());
    }
}
