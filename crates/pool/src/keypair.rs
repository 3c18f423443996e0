//! Ed25519 key material for vanity addresses.
//!
//! Keys are stored and exchanged in the 64-byte secret-then-public
//! layout, and addressed by the base58 encoding of their 32-byte
//! public half.

use derive_more::{Display, Error};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

/// Length of serialized key material: 32 secret bytes followed by the
/// 32-byte public key.
pub const KEYPAIR_LENGTH: usize = 64;

/// Stored key material could not be turned back into a keypair.
#[derive(Debug, Display, Error)]
pub enum InvalidKeypairBytes {
    /// Wrong buffer length.
    #[display(fmt = "expected 64 bytes of key material, got {}", _0)]
    Length(#[error(not(source))] usize),

    /// The public half does not belong to the secret half.
    #[display(fmt = "public half does not match the secret half")]
    Mismatch,
}

/// An Ed25519 keypair owned by the pool.
#[derive(Clone)]
pub struct VanityKeypair {
    signing: SigningKey,
}

impl VanityKeypair {
    /// Generate a fresh keypair from the operating system CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Base58 encoding of the public key.
    pub fn public_key_base58(&self) -> String {
        bs58::encode(self.signing.verifying_key().to_bytes()).into_string()
    }

    /// Serialize into the stored secret-then-public layout.
    pub fn to_bytes(&self) -> [u8; KEYPAIR_LENGTH] {
        self.signing.to_keypair_bytes()
    }

    /// Rebuild a keypair from [`VanityKeypair::to_bytes`] output,
    /// verifying that the public half matches the secret half.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidKeypairBytes> {
        let bytes: &[u8; KEYPAIR_LENGTH] = bytes
            .try_into()
            .map_err(|_| InvalidKeypairBytes::Length(bytes.len()))?;

        let signing = SigningKey::from_keypair_bytes(bytes)
            .map_err(|_| InvalidKeypairBytes::Mismatch)?;

        Ok(Self { signing })
    }

    /// The underlying signing key, for consumers that sign with the
    /// claimed address.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }
}

// Manual impl to keep secret material out of log output.
impl std::fmt::Debug for VanityKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VanityKeypair")
            .field("public_key", &self.public_key_base58())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip() {
        let keypair = VanityKeypair::generate();
        let restored = VanityKeypair::from_bytes(&keypair.to_bytes()).unwrap();

        assert_eq!(restored.public_key_base58(), keypair.public_key_base58());
    }

    #[test]
    fn public_key_is_base58() {
        let public_key = VanityKeypair::generate().public_key_base58();

        assert!(public_key.len() >= 32 && public_key.len() <= 44);
        assert!(bs58::decode(&public_key).into_vec().is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            VanityKeypair::from_bytes(&[0; 32]),
            Err(InvalidKeypairBytes::Length(32))
        ));
    }

    #[test]
    fn rejects_mismatched_halves() {
        let mut bytes = VanityKeypair::generate().to_bytes();
        // Corrupt the public half.
        bytes[40] ^= 0xff;

        assert!(matches!(
            VanityKeypair::from_bytes(&bytes),
            Err(InvalidKeypairBytes::Mismatch)
        ));
    }

    #[test]
    fn debug_hides_secret_material() {
        let keypair = VanityKeypair::generate();
        let rendered = format!("{keypair:?}");

        assert!(rendered.contains(&keypair.public_key_base58()));
        assert!(!rendered.contains("signing"));
    }
}
