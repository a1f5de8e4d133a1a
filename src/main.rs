// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod display;

use chrono::Utc;
use clap::Parser;
use config::AppConfig;
use log::{info, warn};
use opensky_client::cache::{CacheStorage, FileStorage, MemoryStorage};
use opensky_client::{OpenSkyClient, TrackedAircraft, TrackingClient, TrackingClientConfig};

/// Live flight tracker for a small fleet, polling the OpenSky Network.
#[derive(Parser, Debug)]
#[command(name = "skytrack", version, about)]
struct Args {
    /// Tail numbers to track (defaults to all tracking-enabled roster entries)
    tails: Vec<String>,

    /// Run a single poll pass, render it, and exit
    #[arg(long)]
    once: bool,

    /// Follow refresh passes and re-render on each snapshot
    #[arg(long, conflicts_with = "once")]
    watch: bool,

    /// Override the automatic refresh interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Render the compact live-flights view instead of the full dashboard
    #[arg(long)]
    compact: bool,

    /// Print the configuration file path and exit
    #[arg(long)]
    config_path: bool,
}

/// Resolve requested tail numbers against the roster, warning on unknowns.
fn resolve_tracked(args: &Args, config: &AppConfig) -> Vec<TrackedAircraft> {
    if args.tails.is_empty() {
        return config.trackable();
    }

    let mut tracked = Vec::new();
    for tail in &args.tails {
        match config.roster.iter().find(|e| e.tail_number == *tail) {
            Some(entry) => {
                tracked.push(TrackedAircraft::new(
                    entry.tail_number.clone(),
                    entry.icao24.clone(),
                ));
            }
            None => warn!("Tail number {} not found in roster, skipping", tail),
        }
    }
    tracked
}

fn open_cache_storage() -> Box<dyn CacheStorage> {
    match FileStorage::new() {
        Ok(storage) => {
            info!("Affinity cache file: {}", storage.path().display());
            Box::new(storage)
        }
        Err(e) => {
            warn!("Cache storage unavailable ({}), running without persistence", e);
            Box::new(MemoryStorage::new())
        }
    }
}

fn render(client: &TrackingClient, compact: bool, max_live: usize) {
    let snapshot = client.latest_snapshot();
    let now = Utc::now();
    let output = if compact {
        display::render_live_flights(&snapshot, max_live, now)
    } else {
        display::render_dashboard(&snapshot, &client.tracked(), now)
    };
    print!("{}", output);

    let suggestions = client.quick_access_suggestions();
    print!("{}", display::render_suggestions(&suggestions));
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.config_path {
        match AppConfig::get_config_path() {
            Ok(path) => println!("{}", path.display()),
            Err(e) => eprintln!("Failed to resolve config path: {}", e),
        }
        return;
    }

    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config ({}), using defaults", e);
        AppConfig::default()
    });

    let mut scheduler_config = config.scheduler_config();
    if let Some(secs) = args.interval {
        scheduler_config.refresh_interval = std::time::Duration::from_secs(secs);
    }

    let tracked = resolve_tracked(&args, &config);
    if tracked.is_empty() {
        eprintln!("Nothing to track: pass tail numbers or add roster entries to the config.");
        if let Ok(path) = AppConfig::get_config_path() {
            eprintln!("Config file: {}", path.display());
        }
        return;
    }

    let client = TrackingClient::spawn(
        OpenSkyClient::new(),
        open_cache_storage(),
        TrackingClientConfig {
            scheduler: scheduler_config,
            cache: config.cache_config(),
        },
    );

    let mut snapshots = client.subscribe();

    info!("Tracking {} aircraft", tracked.len());
    let expected = tracked.len();
    for aircraft in tracked {
        client.add_aircraft(aircraft);
    }

    // Each add triggers an immediate pass; wait for the first snapshot that
    // covers the whole set before rendering.
    while snapshots.borrow_and_update().len() < expected {
        if snapshots.changed().await.is_err() {
            warn!("Scheduler stopped before the first snapshot");
            return;
        }
    }
    render(&client, args.compact, config.max_live_flights);

    if args.once {
        client.shutdown();
        return;
    }

    if args.watch {
        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        warn!("Scheduler stopped, exiting");
                        break;
                    }
                    println!();
                    render(&client, args.compact, config.max_live_flights);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    break;
                }
            }
        }
    } else {
        // Default: keep polling in the background until interrupted, but only
        // render once. Useful alongside RUST_LOG=debug for watching the poll
        // cadence.
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
    }

    client.shutdown();
}
