use std::fmt;

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};

use crate::error::EncryptionError;

/// Seed length for [`SeededRandom`].
pub const SEED_LEN: usize = 32;

/// A source of cryptographically strong random bytes.
///
/// The engine is generic over this trait: every salt and IV it needs is
/// obtained through a single `fill` call on the caller's source. The
/// `&mut self` receiver is how generator state is threaded; a draw from a
/// [`SeededRandom`] advances the generator in place, while [`SystemRandom`]
/// carries no state at all.
pub trait RandomSource {
    /// Fill `dest` with random bytes, advancing any internal state.
    ///
    /// # Arguments
    /// * `dest` - The buffer to fill; every byte is overwritten.
    ///
    /// # Errors
    /// Returns [`EncryptionError::RngFailure`] if the underlying source
    /// cannot deliver the requested bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EncryptionError>;
}

/// The operating system's entropy pool.
///
/// Every draw is independent and fresh; the value itself owns nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EncryptionError> {
        getrandom::fill(dest)?;
        Ok(())
    }
}

/// A user-held deterministic generator (ChaCha20 keystream).
///
/// Two generators built from the same seed produce identical byte streams,
/// which makes encryption reproducible end-to-end: seed, salt, IVs, and
/// therefore the whole envelope are a pure function of the inputs. Draws
/// consume the value through `&mut`, so losing a generator is harmless;
/// build a fresh one from OS entropy with [`SeededRandom::from_entropy`].
///
/// A generator is not internally synchronized. The exclusive borrow makes
/// concurrent draws from one value impossible to express; clone it if two
/// tasks genuinely need independent streams, and give each its own seed.
#[derive(Clone)]
pub struct SeededRandom {
    rng: ChaCha20Rng,
}

impl SeededRandom {
    /// Build a generator from a fixed seed.
    ///
    /// # Arguments
    /// * `seed` - The 32-byte seed; equal seeds yield equal byte streams.
    ///
    /// # Returns
    /// A generator positioned at the start of the seeded stream.
    #[must_use]
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            rng: ChaCha20Rng::from_seed(seed),
        }
    }

    /// Build a generator seeded from the operating system.
    ///
    /// # Returns
    /// A generator whose stream is unpredictable to anyone without the
    /// freshly drawn seed.
    ///
    /// # Errors
    /// Returns [`EncryptionError::RngFailure`] if the OS entropy pool is
    /// unavailable.
    pub fn from_entropy() -> Result<Self, EncryptionError> {
        let mut seed = [0u8; SEED_LEN];
        getrandom::fill(&mut seed)?;
        Ok(Self::from_seed(seed))
    }
}

impl RandomSource for SeededRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EncryptionError> {
        self.rng.fill_bytes(dest);
        Ok(())
    }
}

impl fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededRandom").finish_non_exhaustive()
    }
}
