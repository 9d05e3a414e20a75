//! AWS credentials loading
//!
//! Supports:
//! - Environment variables (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN)
//! - The shared credentials file (`AWS_SHARED_CREDENTIALS_FILE` or ~/.aws/credentials)
//!
//! Region lookup for a profile reads the shared config file
//! (`AWS_CONFIG_FILE` or ~/.aws/config).

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// AWS credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Load credentials for a given profile
pub fn load_credentials(profile: &str) -> Result<Credentials> {
    if let Some(creds) = load_from_env() {
        debug!("Using credentials from environment");
        return Ok(creds);
    }

    let path = credentials_file_path()?;
    load_from_credentials_file(&path, profile).with_context(|| {
        format!(
            "No AWS credentials found in the environment or for profile '{}'",
            profile
        )
    })
}

fn load_from_env() -> Option<Credentials> {
    let access_key_id = env::var("AWS_ACCESS_KEY_ID").ok().filter(|v| !v.is_empty())?;
    let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
        .ok()
        .filter(|v| !v.is_empty())?;
    let session_token = env::var("AWS_SESSION_TOKEN").ok().filter(|v| !v.is_empty());

    Some(Credentials {
        access_key_id,
        secret_access_key,
        session_token,
    })
}

/// Get the AWS config directory
pub fn aws_config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".aws"))
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

fn credentials_file_path() -> Result<PathBuf> {
    match env::var_os("AWS_SHARED_CREDENTIALS_FILE") {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(aws_config_dir()?.join("credentials")),
    }
}

/// Parse an INI file into sections
fn parse_ini_file(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = section.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}

fn load_from_credentials_file(path: &Path, profile: &str) -> Result<Credentials> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let sections = parse_ini_file(&content);

    let section = sections
        .get(profile)
        .ok_or_else(|| anyhow!("Profile '{}' not found in {}", profile, path.display()))?;

    let access_key_id = section
        .get("aws_access_key_id")
        .ok_or_else(|| anyhow!("aws_access_key_id missing for profile '{}'", profile))?;
    let secret_access_key = section
        .get("aws_secret_access_key")
        .ok_or_else(|| anyhow!("aws_secret_access_key missing for profile '{}'", profile))?;

    debug!("Using credentials for profile '{}' from {}", profile, path.display());

    Ok(Credentials {
        access_key_id: access_key_id.clone(),
        secret_access_key: secret_access_key.clone(),
        session_token: section.get("aws_session_token").cloned(),
    })
}

/// Region configured for a profile in the shared config file
pub fn get_profile_region(path: &Path, profile: &str) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let sections = parse_ini_file(&content);

    // The config file names non-default profiles "profile <name>"
    let section_name = if profile == "default" {
        "default".to_string()
    } else {
        format!("profile {}", profile)
    };

    sections
        .get(&section_name)
        .and_then(|s| s.get("region"))
        .filter(|r| !r.is_empty())
        .cloned()
}
