//! Cache keys for model responses

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Key of a cached model response: the prompt plus the hash of any attached image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCacheKey {
    prompt: String,
    image_hash: Option<String>,
}

impl ResponseCacheKey {
    pub fn new(prompt: impl Into<String>, image_hash: Option<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_hash,
        }
    }

    /// 64-character hex digest. The prompt is length-prefixed, so no
    /// prompt text can produce the same bytes as a prompt plus an image.
    pub fn generate(&self) -> String {
        let image = self.image_hash.as_deref().unwrap_or("");
        let mut bytes = Vec::with_capacity(16 + self.prompt.len() + image.len());
        bytes.extend_from_slice(&(self.prompt.len() as u64).to_le_bytes());
        bytes.extend_from_slice(self.prompt.as_bytes());
        bytes.push(u8::from(self.image_hash.is_some()));
        bytes.extend_from_slice(image.as_bytes());
        hash_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_response_key_is_sha256_hex() {
        let key = ResponseCacheKey::new("Grade this", None).generate();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_response_key_depends_on_image() {
        let text_only = ResponseCacheKey::new("Grade this", None).generate();
        let with_image = ResponseCacheKey::new("Grade this", Some(hash_bytes(b"png"))).generate();
        let other_image = ResponseCacheKey::new("Grade this", Some(hash_bytes(b"jpg"))).generate();

        assert_ne!(text_only, with_image);
        assert_ne!(with_image, other_image);
        assert_eq!(
            with_image,
            ResponseCacheKey::new("Grade this", Some(hash_bytes(b"png"))).generate()
        );
    }

    #[test]
    fn test_control_characters_in_prompt_do_not_collide_with_image() {
        let image = hash_bytes(b"png");
        let with_image = ResponseCacheKey::new("answer", Some(image.clone())).generate();

        for forged in [
            format!("answer\u{0}image={image}"),
            format!("answer\u{1}{image}"),
            format!("answer{image}"),
        ] {
            assert_ne!(ResponseCacheKey::new(forged, None).generate(), with_image);
        }

        assert_ne!(
            ResponseCacheKey::new("", Some(String::new())).generate(),
            ResponseCacheKey::new("", None).generate()
        );
    }
}
