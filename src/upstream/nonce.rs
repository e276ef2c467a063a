use super::error::GenerationError;
use rand::{rngs::OsRng, RngCore};

/// Length of the nonce attached to every outbound request.
pub const NONCE_LENGTH: usize = 8;

// 64 symbols so a random byte maps without bias; none of them is `&` or `=`.
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Produces the single-use `r=` token mixed into each signature.
///
/// Uniqueness is not tracked here; callers must not reuse a nonce.
pub trait NonceSource: Send + Sync {
    /// # Errors
    /// Returns an error if `length` is zero or the entropy source fails.
    fn generate(&self, length: usize) -> Result<String, GenerationError>;
}

/// Nonces drawn from the operating system RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsNonce;

impl NonceSource for OsNonce {
    fn generate(&self, length: usize) -> Result<String, GenerationError> {
        if length == 0 {
            return Err(GenerationError::ZeroLength);
        }

        let mut bytes = vec![0u8; length];
        OsRng.try_fill_bytes(&mut bytes)?;

        Ok(bytes
            .into_iter()
            .map(|b| char::from(ALPHABET[usize::from(b & 0x3f)]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_length() {
        let nonce = OsNonce.generate(NONCE_LENGTH).unwrap();
        assert_eq!(nonce.len(), NONCE_LENGTH);
    }

    #[test]
    fn output_is_query_safe() {
        for _ in 0..64 {
            let nonce = OsNonce.generate(32).unwrap();
            assert!(!nonce.is_empty());
            assert!(nonce
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        assert!(matches!(
            OsNonce.generate(0),
            Err(GenerationError::ZeroLength)
        ));
    }

    #[test]
    fn consecutive_nonces_differ() {
        let a = OsNonce.generate(16).unwrap();
        let b = OsNonce.generate(16).unwrap();
        assert_ne!(a, b);
    }
}
