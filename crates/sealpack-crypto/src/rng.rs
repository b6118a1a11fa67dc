//! Randomness sources.
//!
//! Fresh keys and envelope secrets come from the operating system. Seeded
//! key generation expands the caller's seed into a ChaCha20 DRBG so the same
//! seed always yields the same key.

use hkdf::Hkdf;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;

pub const MIN_SEED_SIZE: usize = 32;
pub const MAX_SEED_SIZE: usize = 512;

const SEED_INFO: &[u8] = b"sealpack_keygen_seed_v1";

/// Build the deterministic generator for one seeded key generation.
pub fn seeded_rng(seed: &[u8]) -> Result<ChaCha20Rng, CryptoError> {
    if !(MIN_SEED_SIZE..=MAX_SEED_SIZE).contains(&seed.len()) {
        return Err(CryptoError::InvalidSeedSize {
            min: MIN_SEED_SIZE,
            max: MAX_SEED_SIZE,
            got: seed.len(),
        });
    }

    let hk = Hkdf::<Sha256>::new(None, seed);
    let mut drbg_seed = [0u8; 32];
    hk.expand(SEED_INFO, &mut drbg_seed)
        .map_err(|_| CryptoError::Random)?;
    let rng = ChaCha20Rng::from_seed(drbg_seed);
    drbg_seed.zeroize();
    Ok(rng)
}

/// Fill a fresh buffer of `len` bytes from the OS generator.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CryptoError> {
    let mut out = vec![0u8; len];
    fill_random(&mut out)?;
    Ok(out)
}

/// Fill `buf` from the OS generator.
pub fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf).map_err(|_| CryptoError::Random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::RngCore;

    #[test]
    fn test_seed_bounds() {
        assert!(seeded_rng(&[7u8; MIN_SEED_SIZE]).is_ok());
        assert!(seeded_rng(&[7u8; MAX_SEED_SIZE]).is_ok());
        assert!(matches!(
            seeded_rng(&[7u8; 31]),
            Err(CryptoError::InvalidSeedSize { got: 31, .. })
        ));
        assert!(matches!(
            seeded_rng(&[7u8; 513]),
            Err(CryptoError::InvalidSeedSize { got: 513, .. })
        ));
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = seeded_rng(&[1u8; 40]).unwrap();
        let mut b = seeded_rng(&[1u8; 40]).unwrap();
        let mut c = seeded_rng(&[2u8; 40]).unwrap();
        assert_eq!(a.next_u64(), b.next_u64());
        assert_ne!(a.next_u64(), c.next_u64());
    }

    #[test]
    fn test_random_bytes() {
        let a = random_bytes(32).unwrap();
        let b = random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(random_bytes(0).unwrap().is_empty());
    }
}
