//! TripleSec v3: triple-paranoid password-based authenticated encryption.
//!
//! One message is protected by three independent stream-cipher layers
//! (XSalsa20, Twofish-256-CTR, AES-256-CTR) and authenticated by two
//! independent MACs (HMAC-SHA-512 and HMAC-SHA3-512), all keyed from a
//! single memory-hard Scrypt derivation. Breaking a ciphertext requires
//! breaking every cipher and forging against both MACs.
//!
//! # One-shot usage
//!
//! ```
//! let envelope = triplesec::encrypt(b"my secret password", b"message")?;
//! let plaintext = triplesec::decrypt(b"my secret password", &envelope)?;
//! assert_eq!(plaintext, b"message");
//! # Ok::<(), triplesec::Error>(())
//! ```
//!
//! # Batch usage
//!
//! Key derivation dominates the cost of a single message. When many
//! messages share one password, derive a [`Cipher`] once and reuse it;
//! [`check_prefix`] recovers the salt from any stored envelope so the same
//! keys can be rebuilt later:
//!
//! ```
//! use triplesec::Cipher;
//!
//! let cipher = Cipher::new(b"my secret password")?;
//! let messages: [&[u8]; 3] = [b"message1", b"message2", b"message3"];
//! let sealed: Vec<Vec<u8>> = messages
//!     .iter()
//!     .map(|m| cipher.encrypt(m))
//!     .collect::<Result<_, _>>()?;
//!
//! let salt = triplesec::check_prefix(&sealed[0]).unwrap().salt;
//! let reopened = Cipher::with_salt(b"my secret password", &salt)?;
//! for (envelope, original) in sealed.iter().zip(messages) {
//!     assert_eq!(reopened.decrypt(envelope).unwrap(), original);
//! }
//! # Ok::<(), triplesec::EncryptionError>(())
//! ```
//!
//! Encryption is randomized: the salt and all three IVs come from a
//! [`RandomSource`]. The default is the OS entropy pool
//! ([`SystemRandom`]); a caller-held [`SeededRandom`] generator makes the
//! whole envelope a deterministic function of seed, password, and message.

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod rng;

pub use cipher::Cipher;
pub use envelope::{MAGIC, OVERHEAD, Prefix, SALT_LEN, VERSION, check_prefix};
pub use error::{DecryptionError, EncryptionError, Error, Result};
pub use rng::{RandomSource, SeededRandom, SystemRandom};

/// Encrypt `plaintext` under `password` with a one-off cipher.
///
/// Draws a fresh 16-byte salt from the OS, derives subkeys at full Scrypt
/// cost, seals the message, and discards the keys. Use a [`Cipher`] when
/// several messages share a password.
///
/// # Arguments
/// * `password` - The user's password; any non-empty byte sequence.
/// * `plaintext` - The message to seal; any non-empty byte sequence.
///
/// # Returns
/// The complete envelope: a 208-byte header followed by a body of the
/// same length as the plaintext.
///
/// # Errors
/// Anything [`Cipher::new`] or [`Cipher::encrypt`] can report, wrapped in
/// [`Error::Encryption`].
pub fn encrypt(password: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    encrypt_with(password, plaintext, &mut SystemRandom)
}

/// [`encrypt`], but with every random byte (salt and IVs) drawn from the
/// caller's source.
///
/// # Arguments
/// * `password` - The user's password; any non-empty byte sequence.
/// * `plaintext` - The message to seal; any non-empty byte sequence.
/// * `rng` - The source the salt and all three IVs are drawn from.
///
/// # Returns
/// The complete envelope bytes.
///
/// # Errors
/// Same conditions as [`encrypt`].
pub fn encrypt_with<R: RandomSource>(
    password: &[u8],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let cipher = Cipher::new_with(password, rng)?;
    Ok(cipher.encrypt_with(plaintext, rng)?)
}

/// Decrypt an envelope with a one-off cipher.
///
/// Recovers the salt from the envelope header, re-derives the subkeys at
/// full Scrypt cost, verifies both MACs, and unwinds the three cipher
/// layers.
///
/// # Arguments
/// * `password` - The password the envelope was encrypted under.
/// * `envelope` - The complete envelope bytes as produced by [`encrypt`].
///
/// # Returns
/// The recovered plaintext; nothing is returned on any failure.
///
/// # Errors
/// [`Error::Decryption`] for a malformed, forged, or corrupt envelope;
/// [`Error::Encryption`] if key derivation rejects the password.
pub fn decrypt(password: &[u8], envelope: &[u8]) -> Result<Vec<u8>> {
    let prefix = check_prefix(envelope)?;
    let cipher = Cipher::with_salt(password, &prefix.salt)?;
    Ok(cipher.decrypt(envelope)?)
}
