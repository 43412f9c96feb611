// src/service/encryption_service.rs

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, AeadCore, OsRng};
use aes_gcm::{Aes256Gcm, Key, KeyInit};
use sha2::{Digest, Sha256};

use crate::error::{PrivacyError, PrivacyResult};

/// Literal marker identifying an encryption envelope. Values without it are
/// treated as legacy plaintext and passed through `decrypt` unchanged.
pub const ENVELOPE_PREFIX: &str = "enc:v1:";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Validated 256-bit symmetric key. Construction fails fast on anything
/// that is not exactly 32 bytes of hex.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    pub fn from_hex(hex_key: &str) -> PrivacyResult<Self> {
        let bytes = hex::decode(hex_key).map_err(|_| {
            PrivacyError::Configuration("Encryption key must be hex-encoded".to_string())
        })?;
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            PrivacyError::Configuration(format!(
                "Encryption key must be exactly {} bytes ({} hex characters)",
                KEY_LEN,
                KEY_LEN * 2
            ))
        })?;
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Field-level authenticated encryption (AES-256-GCM), plus the masking and
/// one-way hashing helpers used around sensitive attributes.
///
/// Envelope layout: `enc:v1:<nonce-hex>:<tag-hex>:<ciphertext-hex>`.
#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    pub fn new(key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Check whether a value already carries the envelope marker
    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(ENVELOPE_PREFIX)
    }

    /// Encrypt one field. None in, None out. Already-enveloped values are
    /// returned unchanged so re-running a migration is idempotent.
    pub fn encrypt(&self, plaintext: Option<&str>) -> PrivacyResult<Option<String>> {
        let plaintext = match plaintext {
            Some(value) => value,
            None => return Ok(None),
        };
        if Self::is_encrypted(plaintext) {
            return Ok(Some(plaintext.to_string()));
        }

        // メッセージごとに新しいランダム nonce を使用
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext_and_tag = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| PrivacyError::Integrity("Encryption failed".to_string()))?;

        let (ciphertext, tag) = ciphertext_and_tag.split_at(ciphertext_and_tag.len() - TAG_LEN);
        Ok(Some(format!(
            "{}{}:{}:{}",
            ENVELOPE_PREFIX,
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(ciphertext)
        )))
    }

    /// Decrypt one field. None and legacy plaintext pass through unchanged;
    /// a tampered or malformed envelope is a hard integrity error, never a
    /// silent fallback.
    pub fn decrypt(&self, value: Option<&str>) -> PrivacyResult<Option<String>> {
        let value = match value {
            Some(value) => value,
            None => return Ok(None),
        };
        if !Self::is_encrypted(value) {
            return Ok(Some(value.to_string()));
        }
        self.decrypt_envelope(value).map(Some)
    }

    fn decrypt_envelope(&self, envelope: &str) -> PrivacyResult<String> {
        let body = &envelope[ENVELOPE_PREFIX.len()..];
        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() != 3 {
            return Err(PrivacyError::Integrity(
                "Malformed encryption envelope".to_string(),
            ));
        }

        let nonce = hex::decode(parts[0])
            .map_err(|_| PrivacyError::Integrity("Malformed envelope nonce".to_string()))?;
        let tag = hex::decode(parts[1])
            .map_err(|_| PrivacyError::Integrity("Malformed envelope tag".to_string()))?;
        let ciphertext = hex::decode(parts[2])
            .map_err(|_| PrivacyError::Integrity("Malformed envelope ciphertext".to_string()))?;
        if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(PrivacyError::Integrity(
                "Malformed encryption envelope".to_string(),
            ));
        }

        let mut combined = ciphertext;
        combined.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(GenericArray::from_slice(&nonce), combined.as_slice())
            .map_err(|_| {
                PrivacyError::Integrity("Decryption failed: authentication tag mismatch".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| PrivacyError::Integrity("Decrypted payload is not UTF-8".to_string()))
    }

    /// Mask a value for display, keeping only the last `visible_suffix`
    /// characters. Values no longer than the suffix are returned unmasked.
    pub fn mask(value: &str, visible_suffix: usize) -> String {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() <= visible_suffix {
            return value.to_string();
        }
        let masked_len = chars.len() - visible_suffix;
        let mut masked: String = "*".repeat(masked_len);
        masked.extend(&chars[masked_len..]);
        masked
    }

    /// Deterministic one-way hash (SHA-256, hex). Suitable for equality
    /// search only, never for confidentiality.
    pub fn one_way_hash(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EncryptionService {
        let key = EncryptionKey::from_hex(
            "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff",
        )
        .unwrap();
        EncryptionService::new(&key)
    }

    #[test]
    fn test_key_validation_fails_fast() {
        assert!(matches!(
            EncryptionKey::from_hex("deadbeef"),
            Err(PrivacyError::Configuration(_))
        ));
        assert!(matches!(
            EncryptionKey::from_hex("not-hex-at-all"),
            Err(PrivacyError::Configuration(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let svc = service();
        let envelope = svc.encrypt(Some("juan.perez@example.com")).unwrap().unwrap();
        assert!(envelope.starts_with(ENVELOPE_PREFIX));

        let plaintext = svc.decrypt(Some(&envelope)).unwrap().unwrap();
        assert_eq!(plaintext, "juan.perez@example.com");
    }

    #[test]
    fn test_none_in_none_out() {
        let svc = service();
        assert_eq!(svc.encrypt(None).unwrap(), None);
        assert_eq!(svc.decrypt(None).unwrap(), None);
    }

    #[test]
    fn test_nonce_uniqueness() {
        let svc = service();
        let a = svc.encrypt(Some("same plaintext")).unwrap().unwrap();
        let b = svc.encrypt(Some("same plaintext")).unwrap().unwrap();
        assert_ne!(a, b);
        assert_eq!(svc.decrypt(Some(&a)).unwrap().unwrap(), "same plaintext");
        assert_eq!(svc.decrypt(Some(&b)).unwrap().unwrap(), "same plaintext");
    }

    #[test]
    fn test_encrypt_is_idempotent_on_envelopes() {
        let svc = service();
        let envelope = svc.encrypt(Some("already secret")).unwrap().unwrap();
        let again = svc.encrypt(Some(&envelope)).unwrap().unwrap();
        assert_eq!(envelope, again);
    }

    #[test]
    fn test_plaintext_passes_through_decrypt() {
        let svc = service();
        // エンベロープマーカーのない値はそのまま返す（移行互換）
        let result = svc.decrypt(Some("legacy plaintext value")).unwrap().unwrap();
        assert_eq!(result, "legacy plaintext value");
    }

    #[test]
    fn test_tamper_detection() {
        let svc = service();
        let envelope = svc.encrypt(Some("sensitive")).unwrap().unwrap();

        // 各 16 進文字を 1 つずつ反転しても必ず失敗する
        let body_start = ENVELOPE_PREFIX.len();
        for i in body_start..envelope.len() {
            let original = envelope.as_bytes()[i] as char;
            if original == ':' {
                continue;
            }
            let flipped = if original == '0' { '1' } else { '0' };
            if flipped == original {
                continue;
            }
            let mut tampered = envelope.clone();
            tampered.replace_range(i..i + 1, &flipped.to_string());
            assert!(
                matches!(svc.decrypt(Some(&tampered)), Err(PrivacyError::Integrity(_))),
                "tampering at byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_malformed_envelope_is_rejected() {
        let svc = service();
        assert!(svc.decrypt(Some("enc:v1:onlytwoparts:abcd")).is_err());
        assert!(svc.decrypt(Some("enc:v1:zz:zz:zz")).is_err());
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let svc = service();
        let envelope = svc.encrypt(Some("secret")).unwrap().unwrap();

        let other_key = EncryptionKey::from_hex(
            "ffeeddccbbaa99887766554433221100ffeeddccbbaa99887766554433221100",
        )
        .unwrap();
        let other = EncryptionService::new(&other_key);
        assert!(matches!(
            other.decrypt(Some(&envelope)),
            Err(PrivacyError::Integrity(_))
        ));
    }

    #[test]
    fn test_mask() {
        assert_eq!(EncryptionService::mask("1234567890", 4), "******7890");
        assert_eq!(EncryptionService::mask("789", 4), "789");
        assert_eq!(EncryptionService::mask("7890", 4), "7890");
        assert_eq!(EncryptionService::mask("", 4), "");
    }

    #[test]
    fn test_one_way_hash_is_deterministic() {
        let h1 = EncryptionService::one_way_hash("900123456-7");
        let h2 = EncryptionService::one_way_hash("900123456-7");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(EncryptionService::one_way_hash("other"), h1);
    }
}
