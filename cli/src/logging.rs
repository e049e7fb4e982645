//! Tracing setup for the CLI: a `LogConfig` built from a JSON file and/or
//! global flags, turned into an `EnvFilter` subscriber on stderr.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a full filter directive; wins over `level`.
pub const LOG_ENV: &str = "FAULTLINE_LOG";

/// Logging settings, e.g. `{"level": "info", "components": {"faultline-core": "debug"}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter applied to every target without its own entry.
    pub level: String,
    /// Crate name → level. Dashes are accepted and mapped to underscores.
    pub components: BTreeMap<String, String>,
    /// JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            components: BTreeMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading log config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing log config {}", path.display()))
    }

    /// Apply a `component=level` override.
    pub fn set_component(&mut self, spec: &str) -> Result<()> {
        let (component, level) = spec
            .split_once('=')
            .filter(|(c, l)| !c.is_empty() && !l.is_empty())
            .ok_or_else(|| anyhow!("expected COMPONENT=LEVEL, got {spec:?}"))?;
        self.components.insert(component.to_string(), level.to_string());
        Ok(())
    }

    /// `EnvFilter` directive string, e.g. `"info,faultline_core=debug"`.
    pub fn directives(&self) -> String {
        let mut directives = self.level.clone();
        for (component, level) in &self.components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Install the global subscriber. Call once at startup. Output goes to
/// stderr so stdout stays clean for JSON records.
pub fn init_tracing(config: &LogConfig) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_new(config.directives()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
