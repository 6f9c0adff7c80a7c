use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::browser::loader::LoadOptions;
use crate::browser::session::DEFAULT_DRIVER_SCRIPT;
use crate::client::submit::DEFAULT_API_BASE_URL;
use crate::schema::store::DEFAULT_SCHEMA_PATH;

pub const DEFAULT_TARGET_URL: &str = "https://udyamregistration.gov.in/UdyamRegistration.aspx";
pub const DEFAULT_CONFIG_PATH: &str = "form-mirror.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-mirror",
    version,
    about = "Extract a web form's schema, render it, and accept submissions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-mirror.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the target form in a browser and write its schema
    Extract {
        /// Page to extract from (default: TARGET_URL or the Udyam portal)
        #[arg(long)]
        url: Option<String>,

        /// Where to write the schema JSON
        #[arg(short, long)]
        output: Option<String>,

        /// Browser driver script run with node
        #[arg(long)]
        driver: Option<String>,

        /// Run trace file (JSON lines)
        #[arg(long)]
        trace: Option<String>,
    },

    /// Run the submission API
    Serve {
        /// Port to listen on (default: PORT or 4000)
        #[arg(long)]
        port: Option<u16>,

        /// Submission store file (JSON lines); in-memory when omitted
        #[arg(long)]
        store: Option<String>,

        /// Schema to cross-check at startup
        #[arg(long)]
        schema: Option<String>,
    },

    /// Fill the form described by a schema and submit it
    Fill {
        /// Schema JSON produced by `extract`
        #[arg(long)]
        schema: Option<String>,

        /// API base URL (default: API_BASE_URL or http://localhost:4000)
        #[arg(long)]
        api_base: Option<String>,

        /// Field values as id=value, repeatable
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
}

/// Parse `id=value`. The value may itself contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, value)) if !id.is_empty() => Ok((id.to_string(), value.to_string())),
        _ => Err(format!("expected id=value, got '{}'", raw)),
    }
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-mirror.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub serve: ServeConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub url: Option<String>,
    pub output: Option<String>,
    pub driver: Option<String>,
    pub trace: Option<String>,
    pub user_agent: Option<String>,
    pub navigation_timeout_ms: Option<u64>,
    pub ready_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServeConfig {
    pub port: Option<u16>,
    pub store: Option<String>,
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: Option<String>,
    pub schema: Option<String>,
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Settings resolution: CLI > config file > environment > default
// ============================================================================

fn resolve(cli: Option<String>, config: Option<&String>, env_key: &str, default: &str) -> String {
    cli.or_else(|| config.cloned())
        .or_else(|| std::env::var(env_key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSettings {
    pub url: String,
    pub output: String,
    pub driver: String,
    pub trace: String,
    pub options: LoadOptions,
}

pub fn resolve_extract(
    url: Option<String>,
    output: Option<String>,
    driver: Option<String>,
    trace: Option<String>,
    config: &ExtractConfig,
) -> ExtractSettings {
    ExtractSettings {
        url: resolve(url, config.url.as_ref(), "TARGET_URL", DEFAULT_TARGET_URL),
        output: resolve(output, config.output.as_ref(), "SCHEMA_PATH", DEFAULT_SCHEMA_PATH),
        driver: resolve(driver, config.driver.as_ref(), "BROWSER_DRIVER", DEFAULT_DRIVER_SCRIPT),
        trace: resolve(trace, config.trace.as_ref(), "EXTRACTION_TRACE", "extraction_trace.jsonl"),
        options: load_options(config),
    }
}

/// Default load options with any overrides from the config file.
pub fn load_options(config: &ExtractConfig) -> LoadOptions {
    let mut options = LoadOptions::default();
    if let Some(user_agent) = &config.user_agent {
        options.user_agent = user_agent.clone();
    }
    if let Some(ms) = config.navigation_timeout_ms {
        options.navigation_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = config.ready_timeout_ms {
        options.ready_timeout = Duration::from_millis(ms);
    }
    options
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSettings {
    pub port: u16,
    pub store: Option<String>,
    pub schema: String,
}

pub fn resolve_serve(
    port: Option<u16>,
    store: Option<String>,
    schema: Option<String>,
    config: &ServeConfig,
) -> ServeSettings {
    let port = port
        .or(config.port)
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(4000);

    ServeSettings {
        port,
        store: store
            .or_else(|| config.store.clone())
            .or_else(|| std::env::var("SUBMISSION_STORE").ok()),
        schema: resolve(schema, config.schema.as_ref(), "SCHEMA_PATH", DEFAULT_SCHEMA_PATH),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillSettings {
    pub schema: String,
    pub api_base_url: String,
}

pub fn resolve_fill(
    schema: Option<String>,
    api_base: Option<String>,
    config: &ClientConfig,
) -> FillSettings {
    FillSettings {
        schema: resolve(schema, config.schema.as_ref(), "SCHEMA_PATH", DEFAULT_SCHEMA_PATH),
        api_base_url: resolve(
            api_base,
            config.api_base_url.as_ref(),
            "API_BASE_URL",
            DEFAULT_API_BASE_URL,
        ),
    }
}
