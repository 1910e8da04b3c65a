#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line client for the ParkenDD parking API.
//!
//! Uses `indicatif-log-bridge` (via [`parkendd_cli_utils::init_logger`])
//! so the network spinner and log lines never fight for the terminal.

mod config;
mod store;
mod track;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use parkendd_cli_utils::SpinnerActivity;
use parkendd_client::{NetworkActivity, ParkingClient, forecast};
use parkendd_geocoder::ReverseGeocoder;
use parkendd_models::{Coordinate, ForecastSeries, KeyValueStore, Selection, timestamp};

use crate::config::AppConfig;
use crate::store::FileStore;

#[derive(Parser)]
#[command(name = "parkendd", about = "Parking lot availability and forecasts")]
struct Cli {
    /// TOML config file with `[client]` and `[tracker]` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Talk to the staging API instead of production
    #[arg(long, global = true)]
    staging: bool,
    /// File the selected city is remembered in
    #[arg(long, global = true, default_value = ".parkendd.json")]
    state: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported cities
    Cities,
    /// Show the current lot snapshot for a city
    Lots {
        /// City identifier (e.g., "Dresden"). Defaults to the selected city.
        city: Option<String>,
        /// Sort lots by distance from this `lat,lng` position
        #[arg(long, value_parser = track::parse_coordinate)]
        near: Option<Coordinate>,
    },
    /// Show the occupancy forecast for a lot
    Forecast {
        /// Lot identifier
        lot: String,
        /// Seven days starting at `--from` (the default)
        #[arg(long, conflicts_with = "day")]
        week: bool,
        /// The calendar day containing `--from`
        #[arg(long)]
        day: bool,
        /// Start of the window as `yyyy-MM-ddTHH:mm:ss`. Defaults to now.
        #[arg(long, value_parser = parse_datetime)]
        from: Option<NaiveDateTime>,
        /// Forecast region. Defaults to the configured region.
        #[arg(long)]
        region: Option<String>,
    },
    /// Select the supported city nearest to a position
    Nearest {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Remember the city for `lots`
        #[arg(long)]
        save: bool,
    },
    /// Resolve a position to a locality name
    Locality {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
    /// Track `lat,lng` lines from stdin and auto-select the nearest city
    Track,
}

fn parse_datetime(input: &str) -> Result<NaiveDateTime, String> {
    timestamp::parse_naive(input)
        .ok_or_else(|| format!("expected yyyy-MM-ddTHH:mm:ss, got {input:?}"))
}

fn print_forecast(series: &ForecastSeries) {
    println!("{:<20} OCCUPANCY", "TIME");
    println!("{}", "-".repeat(32));
    for (at, value) in &series.data {
        println!("{:<20} {value}", timestamp::format(at));
    }
    if let Some((at, value)) = series.peak() {
        println!();
        println!("Peak: {value} at {}", timestamp::format(&at));
    }
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = parkendd_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut app_config = AppConfig::load(cli.config.as_deref())?;
    if cli.staging {
        app_config.client = app_config.client.staging();
    }

    let activity = NetworkActivity::new(Arc::new(SpinnerActivity::new(
        &multi,
        "Contacting ParkenDD...",
    )));
    let client = Arc::new(ParkingClient::new(app_config.client, activity)?);
    let store = Arc::new(FileStore::open(&cli.state));

    match cli.command {
        Commands::Cities => {
            let metadata = client.fetch_metadata().await?;
            println!("API version {}", metadata.api_version);
            println!();
            println!("{:<20} {:<24} LOCATION", "ID", "NAME");
            println!("{}", "-".repeat(64));
            for (id, info) in &metadata.cities {
                let location = info.coordinate.map_or_else(
                    || "-".to_string(),
                    |c| format!("{:.4},{:.4}", c.latitude, c.longitude),
                );
                let support = if info.active_support { "" } else { " (inactive)" };
                println!("{id:<20} {:<24} {location}{support}", info.name);
            }
        }
        Commands::Lots { city, near } => {
            let (update, city_id) = match city {
                Some(city) => (client.update_snapshot_for_selected_city(&city).await?, city),
                None => {
                    let update = client.update_snapshot_for_saved_city(store.as_ref()).await?;
                    let city_id = Selection::load(store.as_ref())
                        .map(|s| s.city_id)
                        .unwrap_or_default();
                    (update, city_id)
                }
            };
            let snapshot = &update.snapshot;
            let city_name = update.metadata.display_name(&city_id).unwrap_or(&city_id);
            log::debug!("Snapshot source {}", snapshot.url());
            println!(
                "{city_name}: {} lots, updated {}, {} free",
                snapshot.lots().len(),
                snapshot.last_updated().format("%Y-%m-%d %H:%M"),
                snapshot.total_free()
            );
            println!();
            println!("{:<32} {:>5} {:>5} {:<8} DIST", "LOT", "FREE", "TOTAL", "STATE");
            println!("{}", "-".repeat(64));
            match near {
                Some(from) => {
                    for (lot, meters) in parkendd_geo::rank_lots(snapshot.lots(), &from) {
                        println!(
                            "{:<32} {:>5} {:>5} {:<8} {:.1} km",
                            lot.name,
                            lot.free,
                            lot.total,
                            lot.state.to_string(),
                            meters / 1000.0
                        );
                    }
                }
                None => {
                    for lot in snapshot.lots() {
                        println!(
                            "{:<32} {:>5} {:>5} {:<8}",
                            lot.name,
                            lot.free,
                            lot.total,
                            lot.state.to_string()
                        );
                    }
                }
            }
        }
        Commands::Forecast {
            lot,
            week: _,
            day,
            from,
            region,
        } => {
            let from = from.unwrap_or_else(|| Local::now().naive_local());
            let series = match (region, day) {
                (None, true) => client.fetch_forecast_for_day_containing(&lot, from).await?,
                (None, false) => client.fetch_forecast_for_week_starting(&lot, from).await?,
                (Some(region), day) => {
                    let (from, to) = if day {
                        forecast::day_window(from)
                    } else {
                        forecast::week_window(from)
                    };
                    client
                        .fetch_forecast_in_region(&region, &lot, from, to)
                        .await?
                }
            };
            print_forecast(&series);
        }
        Commands::Nearest { lat, lng, save } => {
            let from = Coordinate::new(lat, lng);
            let geocoder = ReverseGeocoder::new()?;
            let (metadata, locality) = futures::future::join(
                client.fetch_metadata(),
                geocoder.resolve_locality(&from),
            )
            .await;
            let catalog = metadata?.catalog();
            let city = parkendd_geo::select_nearest(&catalog, &from)?;
            let meters = parkendd_geo::distance_meters(&from, &city.coordinate);

            println!(
                "{} ({}), {:.1} km away",
                city.name,
                city.id,
                meters / 1000.0
            );
            if let Some(locality) = locality {
                println!("You are in {locality}");
            }
            if save {
                Selection::from(city).save(store.as_ref());
                log::info!("Saved {} as the selected city", city.id);
            }
        }
        Commands::Locality { lat, lng } => {
            let geocoder = ReverseGeocoder::new()?;
            match geocoder.resolve_locality(&Coordinate::new(lat, lng)).await {
                Some(locality) => println!("{locality}"),
                None => println!("No locality found"),
            }
        }
        Commands::Track => {
            let store: Arc<dyn KeyValueStore> = store;
            track::run(client, store, app_config.tracker).await?;
        }
    }

    Ok(())
}
