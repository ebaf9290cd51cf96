//! The role keyring: one Ed25519 keypair per role alias.
//!
//! Keys are established once at startup — either derived deterministically
//! from a shared 32-byte mesh seed, restored from a BIP-39 mnemonic of that
//! seed, or loaded from a pre-provisioned bundle of per-role seed files —
//! and the keyring is immutable for the process lifetime.
//!
//! Signing and verification are CPU-bound; callers on the coordination
//! event lane must offload them (`tokio::task::spawn_blocking`).

use std::collections::HashMap;
use std::path::Path;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use sha2::{Digest, Sha256};

use crate::{ProtocolError, RoleAlias};

/// Length of the shared mesh seed and of every per-role seed file.
pub const SEED_LEN: usize = 32;

/// Holds the keypair for every role in the configured universe.
///
/// Every installation carries every role's private key: authenticity proves
/// possession of a role key, not device identity. Populated fully before any
/// sign/verify call is served, immutable afterwards.
pub struct RoleKeyring {
    keys: HashMap<RoleAlias, SigningKey>,
}

impl RoleKeyring {
    /// Derive the full role universe from a shared mesh seed.
    ///
    /// Each role key is `SigningKey::from_bytes(sha256(seed || alias))`, so
    /// two installations sharing the seed derive identical keypairs.
    pub fn from_seed(seed: &[u8; SEED_LEN], max_agents: u8) -> Self {
        let keys = RoleAlias::universe(max_agents)
            .map(|alias| (alias, derive_role_key(seed, alias)))
            .collect();
        Self { keys }
    }

    /// Restore the keyring from a 24-word mnemonic of the mesh seed.
    pub fn from_mnemonic(phrase: &str, max_agents: u8) -> Result<Self, ProtocolError> {
        let seed = seed_from_mnemonic(phrase)?;
        Ok(Self::from_seed(&seed, max_agents))
    }

    /// Load a pre-provisioned bundle: one `<alias>.key` file of raw 32-byte
    /// Ed25519 seed per role, all of which must be present.
    pub fn load_bundle(dir: &Path, max_agents: u8) -> Result<Self, ProtocolError> {
        let mut keys = HashMap::new();
        for alias in RoleAlias::universe(max_agents) {
            let path = dir.join(format!("{alias}.key"));
            let seed_bytes = std::fs::read(&path)
                .map_err(|e| ProtocolError::Crypto(format!("read {}: {e}", path.display())))?;
            let seed: [u8; SEED_LEN] = seed_bytes.as_slice().try_into().map_err(|_| {
                ProtocolError::Crypto(format!(
                    "{} is {} bytes, expected {SEED_LEN}",
                    path.display(),
                    seed_bytes.len()
                ))
            })?;
            keys.insert(alias, SigningKey::from_bytes(&seed));
        }
        Ok(Self { keys })
    }

    /// Write every role's seed as a `<alias>.key` file (mode 0600 on unix).
    pub fn write_bundle(&self, dir: &Path) -> Result<(), ProtocolError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| ProtocolError::Crypto(format!("create dir: {e}")))?;
        for (alias, key) in &self.keys {
            let path = dir.join(format!("{alias}.key"));
            std::fs::write(&path, key.to_bytes())
                .map_err(|e| ProtocolError::Crypto(format!("write {}: {e}", path.display())))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                    .map_err(|e| ProtocolError::Crypto(format!("set permissions: {e}")))?;
            }
        }
        Ok(())
    }

    pub fn contains(&self, alias: RoleAlias) -> bool {
        self.keys.contains_key(&alias)
    }

    pub fn roles(&self) -> impl Iterator<Item = RoleAlias> + '_ {
        self.keys.keys().copied()
    }

    /// Short hex fingerprint of a role's public key, for operator display
    /// and cross-device comparison.
    pub fn fingerprint(&self, alias: RoleAlias) -> Option<String> {
        self.keys.get(&alias).map(|key| {
            let hash = Sha256::digest(key.verifying_key().as_bytes());
            hex::encode(&hash[..8])
        })
    }

    /// Sign `data` on behalf of `alias`.
    pub fn sign(&self, alias: RoleAlias, data: &[u8]) -> Result<Signature, ProtocolError> {
        let key = self
            .keys
            .get(&alias)
            .ok_or_else(|| ProtocolError::UnknownAlias(alias.to_string()))?;
        Ok(key.sign(data))
    }

    /// Verify `signature` over `data` against `alias`'s public key.
    ///
    /// Never errors: an unknown alias, a malformed signature, or a wrong
    /// signature all yield `false`.
    pub fn verify(&self, alias: RoleAlias, data: &[u8], signature: &[u8]) -> bool {
        let Some(key) = self.keys.get(&alias) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        key.verifying_key().verify(data, &sig).is_ok()
    }
}

/// Derive one role's signing key from the mesh seed.
fn derive_role_key(seed: &[u8; SEED_LEN], alias: RoleAlias) -> SigningKey {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(alias.to_string().as_bytes());
    let role_seed: [u8; SEED_LEN] = hasher.finalize().into();
    SigningKey::from_bytes(&role_seed)
}

/// Generate a fresh random mesh seed.
pub fn generate_seed() -> [u8; SEED_LEN] {
    use rand::RngCore;
    let mut seed = [0u8; SEED_LEN];
    rand::thread_rng().fill_bytes(&mut seed);
    seed
}

/// Encode the mesh seed as a 24-word BIP-39 mnemonic for operator hand-off.
pub fn seed_to_mnemonic(seed: &[u8; SEED_LEN]) -> Result<String, ProtocolError> {
    use bip39::Mnemonic;
    let mnemonic = Mnemonic::from_entropy(seed)
        .map_err(|e| ProtocolError::Crypto(format!("mnemonic generation: {e}")))?;
    Ok(mnemonic.to_string())
}

/// Restore the mesh seed from a 24-word BIP-39 mnemonic.
pub fn seed_from_mnemonic(phrase: &str) -> Result<[u8; SEED_LEN], ProtocolError> {
    use bip39::Mnemonic;
    use zeroize::Zeroize;
    let mnemonic =
        Mnemonic::parse(phrase).map_err(|e| ProtocolError::Crypto(format!("invalid mnemonic: {e}")))?;
    let mut entropy = mnemonic.to_entropy();
    if entropy.len() < SEED_LEN {
        entropy.zeroize();
        return Err(ProtocolError::Crypto("entropy too short".into()));
    }
    let seed: [u8; SEED_LEN] = entropy[..SEED_LEN]
        .try_into()
        .map_err(|_| ProtocolError::Crypto("entropy too short".into()))?;
    entropy.zeroize();
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let ring = RoleKeyring::from_seed(&[7u8; 32], 3);
        let sig = ring.sign(RoleAlias::Agent(1), b"hello mesh").unwrap();
        assert!(ring.verify(RoleAlias::Agent(1), b"hello mesh", &sig.to_bytes()));
    }

    #[test]
    fn test_verify_wrong_data() {
        let ring = RoleKeyring::from_seed(&[7u8; 32], 3);
        let sig = ring.sign(RoleAlias::Commander, b"correct").unwrap();
        assert!(!ring.verify(RoleAlias::Commander, b"wrong", &sig.to_bytes()));
    }

    #[test]
    fn test_verify_wrong_role() {
        let ring = RoleKeyring::from_seed(&[7u8; 32], 3);
        let sig = ring.sign(RoleAlias::Agent(2), b"data").unwrap();
        assert!(!ring.verify(RoleAlias::Agent(1), b"data", &sig.to_bytes()));
    }

    #[test]
    fn test_unknown_alias() {
        let ring = RoleKeyring::from_seed(&[7u8; 32], 2);
        assert!(matches!(
            ring.sign(RoleAlias::Agent(5), b"data"),
            Err(ProtocolError::UnknownAlias(_))
        ));
        assert!(!ring.verify(RoleAlias::Agent(5), b"data", &[0u8; 64]));
    }

    #[test]
    fn test_malformed_signature_is_false() {
        let ring = RoleKeyring::from_seed(&[7u8; 32], 1);
        assert!(!ring.verify(RoleAlias::Commander, b"data", b"short"));
    }

    #[test]
    fn test_shared_seed_derives_identical_keys() {
        let a = RoleKeyring::from_seed(&[42u8; 32], 2);
        let b = RoleKeyring::from_seed(&[42u8; 32], 2);
        let sig = a.sign(RoleAlias::Agent(2), b"cross-device").unwrap();
        assert!(b.verify(RoleAlias::Agent(2), b"cross-device", &sig.to_bytes()));
    }

    #[test]
    fn test_fingerprints_match_across_installations() {
        let a = RoleKeyring::from_seed(&[42u8; 32], 2);
        let b = RoleKeyring::from_seed(&[42u8; 32], 2);
        assert_eq!(
            a.fingerprint(RoleAlias::Commander),
            b.fingerprint(RoleAlias::Commander)
        );
        assert_ne!(
            a.fingerprint(RoleAlias::Commander),
            a.fingerprint(RoleAlias::Agent(1))
        );
        assert_eq!(a.fingerprint(RoleAlias::Agent(7)), None);
    }

    #[test]
    fn test_mnemonic_roundtrip() {
        let seed = generate_seed();
        let phrase = seed_to_mnemonic(&seed).unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
        assert_eq!(seed_from_mnemonic(&phrase).unwrap(), seed);
    }

    #[test]
    fn test_bundle_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ring = RoleKeyring::from_seed(&[9u8; 32], 2);
        ring.write_bundle(dir.path()).unwrap();

        let loaded = RoleKeyring::load_bundle(dir.path(), 2).unwrap();
        let sig = ring.sign(RoleAlias::Agent(1), b"payload").unwrap();
        assert!(loaded.verify(RoleAlias::Agent(1), b"payload", &sig.to_bytes()));
    }

    #[test]
    fn test_bundle_missing_role_fails() {
        let dir = tempfile::tempdir().unwrap();
        RoleKeyring::from_seed(&[9u8; 32], 1)
            .write_bundle(dir.path())
            .unwrap();
        // Bundle was provisioned for 1 agent; asking for 2 must fail.
        assert!(RoleKeyring::load_bundle(dir.path(), 2).is_err());
    }
}
