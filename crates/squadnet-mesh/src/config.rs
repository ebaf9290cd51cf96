//! Mesh configuration, TOML on disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use squadnet_protocol::RoleKeyring;

use crate::MeshError;

/// Identifier under which mesh nodes advertise and discover each other.
pub const DEFAULT_SERVICE_ID: &str = "io.squadnet.mesh";

const DEFAULT_MAX_AGENTS: u8 = 8;

/// Top-level configuration for a mesh node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Transport service id; peers only see each other within one.
    pub service_id: String,
    /// Bound N of the role universe ("Agent1".."AgentN").
    pub max_agents: u8,
    /// Enable rejection of connections whose claimed display name is
    /// already bound. Off by default, matching observed deployments.
    pub reject_duplicate_names: bool,
    /// Election tie-break identity. When unset, a persisted random id is
    /// created on first use.
    pub local_identity: Option<String>,
    /// Where the role keys come from.
    pub keys: KeyConfig,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            service_id: DEFAULT_SERVICE_ID.to_string(),
            max_agents: DEFAULT_MAX_AGENTS,
            reject_duplicate_names: false,
            local_identity: None,
            keys: KeyConfig::default(),
        }
    }
}

/// Key provisioning source. Mnemonic takes precedence over a bundle
/// directory when both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// 24-word BIP-39 mnemonic of the shared mesh seed.
    pub mnemonic: Option<String>,
    /// Directory of pre-provisioned `<alias>.key` seed files.
    pub bundle_dir: Option<PathBuf>,
}

impl MeshConfig {
    /// Load from an explicit TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: MeshConfig =
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when no
    /// file exists there.
    pub fn load_default() -> anyhow::Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/squadnet/config.toml`, if a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("squadnet").join("config.toml"))
    }

    /// Build the role keyring from the configured source.
    pub fn build_keyring(&self) -> Result<RoleKeyring, MeshError> {
        if let Some(phrase) = &self.keys.mnemonic {
            return Ok(RoleKeyring::from_mnemonic(phrase, self.max_agents)?);
        }
        if let Some(dir) = &self.keys.bundle_dir {
            return Ok(RoleKeyring::load_bundle(dir, self.max_agents)?);
        }
        Err(MeshError::Config(
            "no key source configured: set keys.mnemonic or keys.bundle_dir".into(),
        ))
    }

    /// The election tie-break identity: the configured override, or a
    /// random id persisted on first use so it stays stable across restarts.
    pub fn resolve_local_identity(&self) -> Result<String, MeshError> {
        if let Some(id) = &self.local_identity {
            return Ok(id.clone());
        }
        let path = local_identity_path().ok_or_else(|| {
            MeshError::Config("no data directory available for the local identity".into())
        })?;
        load_or_create_local_identity(&path)
    }
}

/// `<data dir>/squadnet/identity`, if a data dir exists.
pub fn local_identity_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("squadnet").join("identity"))
}

/// Load the persisted local identity, creating a random one on first use.
pub fn load_or_create_local_identity(path: &Path) -> Result<String, MeshError> {
    if path.exists() {
        let id = std::fs::read_to_string(path)
            .map_err(|e| MeshError::Config(format!("read {}: {e}", path.display())))?;
        let id = id.trim().to_string();
        if !id.is_empty() {
            return Ok(id);
        }
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| MeshError::Config(format!("create dir: {e}")))?;
    }
    let id = {
        use rand::RngCore;
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    };
    std::fs::write(path, &id)
        .map_err(|e| MeshError::Config(format!("write {}: {e}", path.display())))?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MeshConfig::default();
        assert_eq!(config.service_id, DEFAULT_SERVICE_ID);
        assert_eq!(config.max_agents, 8);
        assert!(!config.reject_duplicate_names);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: MeshConfig = toml::from_str(
            r#"
            max_agents = 3
            [keys]
            bundle_dir = "/etc/squadnet/keys"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_agents, 3);
        assert_eq!(config.service_id, DEFAULT_SERVICE_ID);
        assert_eq!(
            config.keys.bundle_dir.as_deref(),
            Some(Path::new("/etc/squadnet/keys"))
        );
    }

    #[test]
    fn test_keyring_requires_a_source() {
        let config = MeshConfig::default();
        assert!(matches!(
            config.build_keyring(),
            Err(MeshError::Config(_))
        ));
    }

    #[test]
    fn test_local_identity_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity");
        let first = load_or_create_local_identity(&path).unwrap();
        let second = load_or_create_local_identity(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
    }

    #[test]
    fn test_configured_identity_wins() {
        let config = MeshConfig {
            local_identity: Some("node-a".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_local_identity().unwrap(), "node-a");
    }
}
