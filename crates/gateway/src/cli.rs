use clap::{Parser, Subcommand};

/// aqmap: conversational backend for a live PM2.5 dashboard.
#[derive(Debug, Parser)]
#[command(name = "aqmap", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Dump the resolved configuration (with defaults) as TOML.
    ConfigShow,
    /// Print version information.
    Version,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `AQMAP_CONFIG` (or
/// `config.toml` by default). A missing file is not an error: every
/// field has a default, so the gateway boots on an empty config.
pub fn load_config() -> anyhow::Result<(aqm_domain::config::Config, String)> {
    let config_path = std::env::var("AQMAP_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        aqm_domain::config::Config::default()
    };

    Ok((config, config_path))
}
