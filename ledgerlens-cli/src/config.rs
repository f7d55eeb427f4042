use anyhow::{Context, Result};
use ledgerlens_ingest::ExtractorConfig;
use ledgerlens_structure::ProcessorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::Provider;
use crate::state::ensure_ledgerlens_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub extraction: ExtractionSection,
    pub processing: ProcessingSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// "anthropic" or "openai"
    pub provider: String,
    pub model: String,
    /// Overrides the provider's public endpoint (proxies, gateways)
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    pub hosted_base_url: String,
    pub primary_timeout_secs: u64,
    pub fallback_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSection {
    pub max_input_chars: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Default directory for `process` when neither --out nor --out-dir is given
    pub dir: Option<PathBuf>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-3-5-sonnet-latest".to_string(),
            base_url: None,
            temperature: 0.0,
            max_tokens: 8192,
            timeout_secs: 120,
        }
    }
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            hosted_base_url: "https://api.cloud.llamaindex.ai".to_string(),
            primary_timeout_secs: 120,
            fallback_timeout_secs: 60,
            poll_interval_ms: 1500,
        }
    }
}

impl Default for ProcessingSection {
    fn default() -> Self {
        Self {
            max_input_chars: ProcessorConfig::default().max_input_chars,
        }
    }
}

impl Config {
    pub fn provider(&self) -> Result<Provider> {
        self.llm.provider.parse()
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            primary_timeout: Duration::from_secs(self.extraction.primary_timeout_secs),
            fallback_timeout: Duration::from_secs(self.extraction.fallback_timeout_secs),
        }
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            timeout: Duration::from_secs(self.llm.timeout_secs),
            max_input_chars: self.processing.max_input_chars,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_ledgerlens_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Missing file means defaults; a present but malformed file is an error.
pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(p: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&p, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let p = config_path()?;
    let cfg = load_config_from(&p)?;
    if !p.exists() {
        println!("# {} not found; showing defaults", p.display());
    }
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.extractor_config(), ExtractorConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(
            &p,
            "[llm]\nprovider = \"openai\"\nmodel = \"gpt-4o-mini\"\n\n[processing]\nmax_input_chars = 5000\n",
        )
        .unwrap();

        let cfg = load_config_from(&p).unwrap();
        assert_eq!(cfg.provider().unwrap(), Provider::OpenAI);
        assert_eq!(cfg.llm.timeout_secs, 120);
        assert_eq!(cfg.processor_config().max_input_chars, 5000);
        assert_eq!(cfg.extraction, ExtractionSection::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.output.dir = Some(PathBuf::from("/tmp/statements"));
        cfg.llm.base_url = Some("http://localhost:8080".to_string());

        save_config_to(&p, &cfg).unwrap();
        assert_eq!(load_config_from(&p).unwrap(), cfg);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "[llm\nprovider = ").unwrap();
        let err = load_config_from(&p).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
