use std::sync::Arc;

use anyhow::{Context, anyhow};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use inquire::{Password, Select, Text};
use weatherdash_core::{
    AppState, CompareError, ComparisonSet, Config, DebouncedSearch, GeocodeCandidate,
    LocationResolver, ProviderId, SEARCH_DEBOUNCE, Theme, Unit, WeatherService, bucket_by_day,
    hourly_view, provider, weekly_overview,
};

use crate::live_search::LiveSearch;
use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherdash", version, about = "Terminal weather dashboard")]
pub struct Cli {
    /// Temperature unit for this run (C or F); defaults to the configured one.
    #[arg(long, global = true)]
    pub unit: Option<String>,

    /// IANA time zone for day boundaries, e.g. "Europe/Paris"; defaults to the system zone.
    #[arg(long, global = true)]
    pub tz: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set API keys and display preferences.
    Configure,

    /// List locations matching a query.
    Search {
        query: String,
    },

    /// Pick a location and remember it.
    Select {
        /// Search text; prompts with live suggestions when absent.
        query: Option<String>,
    },

    /// Select the location at the given coordinates.
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Show current conditions for the selected location.
    Current,

    /// Show the daily forecast for the selected location.
    Forecast {
        /// Also show the 3-hour rows of this day (1 = first day).
        #[arg(long)]
        day: Option<usize>,
    },

    /// Compare current conditions of 2 to 4 places.
    Compare {
        #[arg(required = true, num_args = 2..=4)]
        queries: Vec<String>,
    },

    /// Set the default temperature unit.
    Unit {
        /// C or F; switches to the other unit when omitted.
        unit: Option<String>,
    },

    /// Set the display theme.
    Theme {
        /// dark or light; switches to the other theme when omitted.
        theme: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut state = AppState::open_default()?;

        if let Some(unit) = self.unit.as_deref() {
            state.use_unit(Unit::try_from(unit)?);
        }

        let mut changes = state.subscribe();
        let before = state.selection();

        match self.tz.as_deref() {
            Some(name) => {
                let zone: chrono_tz::Tz = name
                    .parse()
                    .map_err(|e| anyhow!("Unknown time zone '{name}': {e}"))?;
                self.command.run(&mut state, &zone).await?;
            }
            None => self.command.run(&mut state, &Local).await?,
        }

        if changes.has_changed().unwrap_or(false) {
            print!("{}", render::changes(&before, &changes.borrow_and_update()));
        }
        Ok(())
    }
}

impl Command {
    async fn run<Tz: TimeZone>(self, state: &mut AppState, zone: &Tz) -> anyhow::Result<()> {
        match self {
            Command::Configure => tokio::task::block_in_place(|| configure(state)),
            Command::Unit { unit } => {
                match unit {
                    Some(unit) => {
                        let unit = Unit::try_from(unit.as_str())?;
                        if unit == state.unit() {
                            println!("Unit is already {}", unit.symbol());
                        }
                        state.set_unit(unit)?;
                    }
                    None => {
                        state.toggle_unit()?;
                    }
                }
                Ok(())
            }
            Command::Theme { theme } => {
                match theme {
                    Some(theme) => {
                        let theme = Theme::try_from(theme.as_str())?;
                        if theme == state.theme() {
                            println!("Theme is already {theme}");
                        }
                        state.set_theme(theme)?;
                    }
                    None => {
                        state.toggle_theme()?;
                    }
                }
                Ok(())
            }
            Command::Search { query } => {
                let resolver = resolver(state.config())?;
                print!("{}", render::candidates(&resolver.search(&query).await));
                Ok(())
            }
            Command::Select { query } => select(state, query).await,
            Command::Locate { lat, lon } => {
                let resolver = resolver(state.config())?;
                match resolver.reverse(lat, lon).await {
                    Some(location) => state.select_location(location),
                    None => {
                        println!("No location found at {lat}, {lon}.");
                        Ok(())
                    }
                }
            }
            Command::Current => {
                let service = weather_service(state.config())?;
                let location = state.location();

                match service.current(&location, state.unit()).await {
                    Some(current) => {
                        print!("{}", render::current_card(&location.address, &current, state.unit(), zone))
                    }
                    None => println!("{}", render::NO_DATA),
                }
                Ok(())
            }
            Command::Forecast { day } => {
                let service = weather_service(state.config())?;
                let location = state.location();

                let Some(forecast) = service.forecast(&location, state.unit()).await else {
                    println!("{}", render::NO_DATA);
                    return Ok(());
                };

                let buckets = bucket_by_day(&forecast.list, zone);
                if buckets.is_empty() {
                    println!("{}", render::NO_DATA);
                    return Ok(());
                }

                println!("{}-Day Forecast: {}\n", buckets.len(), location.address);
                print!(
                    "{}",
                    render::weekly_chart(&weekly_overview(&buckets), state.unit(), state.theme())
                );

                if let Some(n) = day {
                    let bucket = n
                        .checked_sub(1)
                        .and_then(|i| buckets.get(i))
                        .with_context(|| format!("Day must be between 1 and {}", buckets.len()))?;

                    println!();
                    print!("{}", render::day_header(bucket));
                    print!("{}", render::hourly_table(hourly_view(bucket, zone), state.unit()));
                }
                Ok(())
            }
            Command::Compare { queries } => {
                let resolver = resolver(state.config())?;
                let service = weather_service(state.config())?;

                let mut set = ComparisonSet::new();
                for query in &queries {
                    let Some(first) = resolver.search(query).await.into_iter().next() else {
                        tracing::warn!(%query, "no match, skipping");
                        continue;
                    };
                    if let Err(err) = set.add(first.value) {
                        tracing::warn!(%query, "skipping: {err}");
                    }
                }

                match set.fetch(&service, state.unit()).await {
                    Ok(rows) if rows.is_empty() => println!("{}", render::NO_DATA),
                    Ok(rows) => print!("{}", render::comparison_table(&rows, state.unit())),
                    Err(CompareError::TooFew) => println!("{}", CompareError::TooFew),
                    Err(err) => return Err(err.into()),
                }
                Ok(())
            }
        }
    }
}

fn resolver(config: &Config) -> anyhow::Result<LocationResolver> {
    Ok(LocationResolver::new(provider::geocoder_from_config(config)?))
}

fn weather_service(config: &Config) -> anyhow::Result<WeatherService> {
    Ok(WeatherService::new(provider::weather_provider_from_config(config)?))
}

fn configure(state: &mut AppState) -> anyhow::Result<()> {
    let mut keys = Vec::new();
    for id in ProviderId::all() {
        let prompt = format!("API key for {id} (leave empty to keep current):");
        let key = Password::new(&prompt).without_confirmation().prompt()?;
        if !key.trim().is_empty() {
            keys.push((*id, key.trim().to_string()));
        }
    }

    let current = state.config();
    let unit = Select::new("Temperature unit:", vec![Unit::Celsius, Unit::Fahrenheit])
        .with_starting_cursor(usize::from(current.unit == Unit::Fahrenheit))
        .prompt()?;
    let theme = Select::new("Theme:", vec![Theme::Dark, Theme::Light])
        .with_starting_cursor(usize::from(current.theme == Theme::Light))
        .prompt()?;

    state.update_config(|cfg| {
        for (id, key) in keys {
            cfg.set_provider_api_key(id, key);
        }
        cfg.unit = unit;
        cfg.theme = theme;
    })?;

    tracing::info!(path = %state.config_path().display(), "configuration saved");
    println!("Saved configuration to {}", state.config_path().display());
    Ok(())
}

async fn select(state: &mut AppState, query: Option<String>) -> anyhow::Result<()> {
    let resolver = resolver(state.config())?;

    let (text, picked) = match query {
        Some(q) => (q, None),
        None => {
            let search = DebouncedSearch::new(resolver.clone(), SEARCH_DEBOUNCE);
            let live = LiveSearch::new(Arc::new(search), SEARCH_DEBOUNCE);
            let prompt_live = live.clone();
            let text = tokio::task::block_in_place(|| {
                Text::new("Location:")
                    .with_help_message("Type at least 4 characters; suggestions appear when you pause")
                    .with_autocomplete(prompt_live)
                    .prompt()
            })?;
            let picked = live.candidate(&text);
            (text, picked)
        }
    };

    let chosen = match picked {
        Some(candidate) => Some(candidate),
        None => pick(resolver.search(&text).await)?,
    };

    match chosen {
        Some(candidate) => state.select_location(candidate.value),
        None => {
            println!("No matching locations.");
            Ok(())
        }
    }
}

fn pick(candidates: Vec<GeocodeCandidate>) -> anyhow::Result<Option<GeocodeCandidate>> {
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.into_iter().next()),
        _ => {
            let labels: Vec<String> = candidates.iter().map(|c| c.label.clone()).collect();
            let choice = tokio::task::block_in_place(|| {
                Select::new("Pick a location:", labels).raw_prompt()
            })?;
            Ok(candidates.into_iter().nth(choice.index))
        }
    }
}
