use agentic_origin_adapter::ResolveOptions;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub spec_fetch_timeout_secs: Option<u64>,
    #[serde(default)]
    pub mcp_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_spec_bytes: Option<usize>,
}

impl CliConfig {
    /// Resolution limits, falling back to library defaults for unset fields.
    pub fn resolve_options(&self) -> ResolveOptions {
        let mut options = ResolveOptions::default();
        if let Some(secs) = self.spec_fetch_timeout_secs {
            options.spec.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = self.max_spec_bytes {
            options.spec.max_spec_bytes = bytes;
        }
        if let Some(secs) = self.mcp_timeout_secs {
            options.mcp_timeout = Duration::from_secs(secs);
        }
        options
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let base = if let Ok(v) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(v)
    } else {
        let home = std::env::var("HOME").context("HOME is not set")?;
        PathBuf::from(home).join(".config")
    };
    Ok(base.join("agentic").join("origin-cli.json"))
}

pub fn load_config(path: &Path) -> anyhow::Result<CliConfig> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CliConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("read config {}", path.display())),
    };
    let cfg: CliConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg, CliConfig::default());
        assert_eq!(cfg.resolve_options(), ResolveOptions::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("origin-cli.json");
        std::fs::write(
            &path,
            r#"{ "logLevel": "debug", "mcpTimeoutSecs": 5, "maxSpecBytes": 2048 }"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));

        let options = cfg.resolve_options();
        assert_eq!(options.mcp_timeout, Duration::from_secs(5));
        assert_eq!(options.spec.max_spec_bytes, 2048);
        assert_eq!(options.spec.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("origin-cli.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().starts_with("parse "));
    }
}
