//! Geoaddress CLI entrypoint.

use std::collections::BTreeMap;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use geoaddress::config::Config;
use geoaddress::provider::{LookupOptions, OsmQuery, SearchOptions};
use geoaddress::service::{ProviderCall, ProviderFilter, ProviderRegistry};

#[derive(Parser, Debug)]
#[command(name = "geoaddress")]
#[command(about = "Address lookup across ten geocoding backends", version)]
struct Cli {
    /// Only query backends whose name contains this substring.
    #[arg(long, visible_alias = "filter", global = true)]
    backend: Option<String>,

    /// Only query backends matching this metadata attribute (key=value,
    /// repeatable).
    #[arg(long = "attr", value_parser = parse_key_value, global = true)]
    attributes: Vec<(String, String)>,

    /// Stop at the first backend returning a usable result.
    #[arg(long, global = true)]
    first: bool,

    /// Return the vendor responses untouched instead of normalizing.
    #[arg(long, global = true)]
    raw: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forward search: free-text query to candidate addresses.
    Address {
        #[arg(long)]
        query: String,
        /// "lat,lon" bias hint.
        #[arg(long)]
        proximity: Option<String>,
    },
    /// Reverse geocode coordinates to the closest address.
    Reverse {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
    },
    /// Look an address up by its provider-specific reference id.
    Reference {
        #[arg(long = "ref")]
        reference: String,
    },
    /// Look addresses up by OSM tags or one element id.
    Osm {
        #[arg(long)]
        osm_id: Option<i64>,
        /// Element type letter: N, W or R.
        #[arg(long)]
        osm_type: Option<String>,
        /// OSM tag filter (key=value, repeatable).
        #[arg(long = "tag", value_parser = parse_key_value)]
        tags: Vec<(String, String)>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Json,
    Table,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("invalid format {raw:?}, expected key=value"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let registry = ProviderRegistry::from_config(&config);

    let filter = ProviderFilter {
        name_contains: cli.backend.clone(),
        attributes: cli.attributes.iter().cloned().collect(),
    };

    let call = build_call(&cli, &config)?;

    if cli.first {
        match registry.try_providers_first(&filter, &call).await {
            Some((name, value)) => {
                let mut outcomes = BTreeMap::new();
                outcomes.insert(name, value);
                print_outcomes(&outcomes, cli.format)?;
            }
            None => println!("null"),
        }
        return Ok(());
    }

    let outcomes = registry.try_providers(&filter, &call).await;
    if outcomes.is_empty() {
        anyhow::bail!("no providers matched the selection");
    }
    print_outcomes(&outcomes, cli.format)?;
    Ok(())
}

fn build_call(cli: &Cli, config: &Config) -> anyhow::Result<ProviderCall> {
    let call = match &cli.command {
        Command::Address { query, proximity } => ProviderCall::Search {
            query: query.clone(),
            options: SearchOptions {
                raw: cli.raw,
                proximity: proximity.clone(),
                limit: config.result_limit,
            },
        },
        Command::Reverse { lat, lon } => ProviderCall::Reverse {
            latitude: *lat,
            longitude: *lon,
            options: LookupOptions { raw: cli.raw },
        },
        Command::Reference { reference } => ProviderCall::Reference {
            reference: reference.clone(),
            options: LookupOptions { raw: cli.raw },
        },
        Command::Osm {
            osm_id,
            osm_type,
            tags,
        } => {
            let query = match (osm_id, osm_type) {
                (Some(osm_id), Some(osm_type)) => OsmQuery::Element {
                    osm_id: *osm_id,
                    osm_type: osm_type.clone(),
                },
                (None, None) if !tags.is_empty() => {
                    OsmQuery::Tags(tags.iter().cloned().collect())
                }
                _ => anyhow::bail!(
                    "provide either --osm-id with --osm-type, or at least one --tag key=value"
                ),
            };
            ProviderCall::Osm {
                query,
                options: LookupOptions { raw: cli.raw },
            }
        }
    };
    Ok(call)
}

fn print_outcomes(outcomes: &BTreeMap<String, Value>, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcomes)?),
        OutputFormat::Table => {
            for (name, value) in outcomes {
                println!("{name}");
                print_table_value(value);
                println!();
            }
        }
    }
    Ok(())
}

fn print_table_value(value: &Value) {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                println!("  (no results)");
            }
            for item in items {
                print_table_entry(item);
                println!("  --");
            }
        }
        Value::Null => println!("  (no result)"),
        other => print_table_entry(other),
    }
}

fn print_table_entry(value: &Value) {
    match value.as_object() {
        Some(map) => {
            for (key, field_value) in map {
                match field_value.as_str() {
                    Some(text) => println!("  {key}: {text}"),
                    None => println!("  {key}: {field_value}"),
                }
            }
        }
        None => println!("  {value}"),
    }
}
