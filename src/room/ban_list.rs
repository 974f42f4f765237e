//! Address+username ban list, persisted as a single flat document
//! (SPEC_FULL.md §4.C).

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BanStoreError {
    #[error("failed to read ban list from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write ban list to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ban list at {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Two parallel ordered sequences; entry `i` of one corresponds to entry
/// `i` of the other.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BanList {
    pub addresses: Vec<String>,
    pub usernames: Vec<String>,
}

impl BanList {
    pub fn is_banned(&self, addr: IpAddr) -> bool {
        let needle = addr.to_string();
        self.addresses.iter().any(|a| a == &needle)
    }

    pub fn add(&mut self, addr: IpAddr, username: String) {
        self.addresses.push(addr.to_string());
        self.usernames.push(username);
    }

    /// Removes the entry whose username matches; returns the removed
    /// address if one was found.
    pub fn remove(&mut self, username: &str) -> Option<String> {
        let index = self.usernames.iter().position(|u| u == username)?;
        self.usernames.remove(index);
        Some(self.addresses.remove(index))
    }

    pub async fn load(path: &Path) -> Result<Self, BanStoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| BanStoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&contents).map_err(|source| BanStoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub async fn save(&self, path: &Path) -> Result<(), BanStoreError> {
        let contents = serde_json::to_string_pretty(self).expect("BanList always serializes");
        tokio::fs::write(path, contents)
            .await
            .map_err(|source| BanStoreError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}
