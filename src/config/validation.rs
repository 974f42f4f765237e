//! Configuration validation functions.

use super::Config;
use std::path::Path;

/// Validates a loaded config. Called twice, exactly as the teacher does:
/// once inside `load()` (warn-only), once from `main.rs` (hard failure via
/// `anyhow`, aborting startup per spec §7).
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    if config.room_name_on_startup.trim().is_empty() {
        anyhow::bail!("roomNameOnStartup must not be empty");
    }

    if config.max_players == 0 {
        anyhow::bail!("maxPlayers must be greater than zero");
    }

    if let Some(pattern) = &config.restrictions.usernames.disallow_regex {
        if let Err(e) = regex::Regex::new(pattern) {
            anyhow::bail!("restrictions.usernames.disallowRegex is not a valid regex: {e}");
        }
    }

    if config.use_https {
        let tls = &config.security.tls;
        let cert_path = tls
            .certificate_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("security.tls.certificatePath must be set when useHttps is true")
            })?;
        if !Path::new(cert_path).exists() {
            anyhow::bail!("TLS certificate file not found at {cert_path}");
        }

        let key_path = tls
            .private_key_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("security.tls.privateKeyPath must be set when useHttps is true")
            })?;
        if !Path::new(key_path).exists() {
            anyhow::bail!("TLS private key file not found at {key_path}");
        }
    }

    Ok(())
}
