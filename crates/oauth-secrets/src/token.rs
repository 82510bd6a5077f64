//! Cookie secret generation
//!
//! Cookie secrets are drawn from a 64-symbol URL-safe alphabet. Each random
//! byte maps to `ALPHABET[byte % 64]`; since 256 is a multiple of 64 every
//! symbol is equally likely.

use crate::error::GenerationError;
use rand::rngs::OsRng;
use rand::RngCore;

/// Symbols a cookie secret is built from.
pub const COOKIE_SECRET_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Length of every generated cookie secret.
pub const COOKIE_SECRET_LENGTH: usize = 32;

/// Generate a cookie secret of `length` symbols from the OS CSPRNG.
pub fn generate_cookie_secret(length: usize) -> Result<String, GenerationError> {
    generate_cookie_secret_with(&mut OsRng, length)
}

/// Generate a cookie secret of `length` symbols from `rng`.
///
/// Fails only if `rng` cannot fill the buffer.
pub fn generate_cookie_secret_with<R>(rng: &mut R, length: usize) -> Result<String, GenerationError>
where
    R: RngCore + ?Sized,
{
    let mut bytes = vec![0u8; length];
    rng.try_fill_bytes(&mut bytes)?;

    Ok(bytes
        .iter()
        .map(|b| char::from(COOKIE_SECRET_ALPHABET[usize::from(*b) % COOKIE_SECRET_ALPHABET.len()]))
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    /// RNG whose entropy source is always unavailable
    pub(crate) struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    #[test]
    fn test_generate_length_and_alphabet() {
        let secret = generate_cookie_secret(COOKIE_SECRET_LENGTH).unwrap();
        assert_eq!(secret.len(), 32);
        assert!(secret.bytes().all(|c| COOKIE_SECRET_ALPHABET.contains(&c)));
    }

    #[test]
    fn test_successive_secrets_differ() {
        let first = generate_cookie_secret(COOKIE_SECRET_LENGTH).unwrap();
        let second = generate_cookie_secret(COOKIE_SECRET_LENGTH).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_alphabet_has_64_distinct_symbols() {
        let mut symbols = COOKIE_SECRET_ALPHABET.to_vec();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), 64);
    }

    #[test]
    fn test_byte_maps_modulo_alphabet() {
        // Bytes come out as the little-endian u64 65: [65, 0, 0, 0, ...]
        let mut rng = StepRng::new(65, 0);
        let secret = generate_cookie_secret_with(&mut rng, 4).unwrap();
        // 65 % 64 == 1 -> 'B', 0 -> 'A'
        assert_eq!(secret, "BAAA");
    }

    #[test]
    fn test_zero_length() {
        assert_eq!(generate_cookie_secret(0).unwrap(), "");
    }

    #[test]
    fn test_entropy_failure() {
        let err = generate_cookie_secret_with(&mut BrokenRng, COOKIE_SECRET_LENGTH).unwrap_err();
        assert!(err.to_string().contains("entropy source unavailable"));
    }
}
