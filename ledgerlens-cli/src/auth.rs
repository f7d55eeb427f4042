use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::state::ensure_ledgerlens_home;

pub const ANTHROPIC_ENV: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_ENV: &str = "OPENAI_API_KEY";
pub const LLAMA_CLOUD_ENV: &str = "LLAMA_CLOUD_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub llama_cloud_api_key: Option<String>,
}

/// Services a key can be stored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Service {
    Anthropic,
    Openai,
    LlamaCloud,
}

impl Credentials {
    /// Environment values win over the file; blank values count as unset.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(v) = env(ANTHROPIC_ENV) {
            self.anthropic_api_key = Some(v);
        }
        if let Some(v) = env(OPENAI_ENV) {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = env(LLAMA_CLOUD_ENV) {
            self.llama_cloud_api_key = Some(v);
        }
        self
    }

    pub fn set(&mut self, service: Service, key: String) {
        match service {
            Service::Anthropic => self.anthropic_api_key = Some(key),
            Service::Openai => self.openai_api_key = Some(key),
            Service::LlamaCloud => self.llama_cloud_api_key = Some(key),
        }
    }
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_ledgerlens_home()?.join("auth.json"))
}

pub fn load_auth_from(p: &Path) -> Result<Credentials> {
    if !p.exists() {
        return Ok(Credentials::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth_to(p: &Path, creds: &Credentials) -> Result<()> {
    let s = serde_json::to_string_pretty(creds)?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// auth.json, then `.env`, then the process environment.
pub fn resolve_credentials() -> Result<Credentials> {
    let _ = dotenvy::dotenv();
    let creds = load_auth_from(&auth_path()?)?;
    Ok(creds.with_env_overrides(|name| std::env::var(name).ok()))
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn store_key(service: Service) -> Result<()> {
    let (label, prefix) = match service {
        Service::Anthropic => ("Paste Anthropic API key (starts with sk-ant-)", "sk-ant-"),
        Service::Openai => ("Paste OpenAI API key (starts with sk-)", "sk-"),
        Service::LlamaCloud => ("Paste LlamaCloud API key (starts with llx-)", "llx-"),
    };
    let key = prompt_secret(label)?;
    if !key.starts_with(prefix) {
        bail!("key didn't look right (expected prefix {prefix})");
    }

    let p = auth_path()?;
    let mut creds = load_auth_from(&p)?;
    creds.set(service, key);
    save_auth_to(&p, &creds)?;
    println!("Saved key to {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_env_overrides_file_values() {
        let file = Credentials {
            anthropic_api_key: Some("sk-ant-file".to_string()),
            openai_api_key: Some("sk-file".to_string()),
            llama_cloud_api_key: None,
        };
        let env: HashMap<&str, &str> = HashMap::from([
            (ANTHROPIC_ENV, "sk-ant-env"),
            (OPENAI_ENV, "   "),
            (LLAMA_CLOUD_ENV, "llx-env"),
        ]);

        let creds = file.with_env_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(creds.anthropic_api_key.as_deref(), Some("sk-ant-env"));
        // blank env value does not clobber the file
        assert_eq!(creds.openai_api_key.as_deref(), Some("sk-file"));
        assert_eq!(creds.llama_cloud_api_key.as_deref(), Some("llx-env"));
    }

    #[test]
    fn test_auth_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("auth.json");
        assert_eq!(load_auth_from(&p).unwrap(), Credentials::default());

        let mut creds = Credentials::default();
        creds.set(Service::LlamaCloud, "llx-123".to_string());
        save_auth_to(&p, &creds).unwrap();

        let back = load_auth_from(&p).unwrap();
        assert_eq!(back.llama_cloud_api_key.as_deref(), Some("llx-123"));
        assert_eq!(back.anthropic_api_key, None);
    }
}
