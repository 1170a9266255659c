use thiserror::Error;

/// Failures raised while constructing a [`Cipher`](crate::Cipher) or encrypting.
///
/// Nothing is retried inside the library; every failure surfaces to the
/// caller, and no partial output is ever produced alongside an error.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Refused to encrypt an empty message.
    #[error("plaintext must not be empty")]
    ZeroLengthPlaintext,

    /// Refused to derive keys from an empty password.
    #[error("password must not be empty")]
    InvalidPassword,

    /// A caller-supplied salt was not exactly 16 bytes.
    #[error("salt must be exactly 16 bytes, got {0}")]
    InvalidSaltLength(usize),

    /// The random source could not deliver the requested bytes.
    #[error("random source failure")]
    RngFailure(#[from] getrandom::Error),
}

/// Failures raised while parsing or decrypting an envelope.
#[derive(Debug, Error)]
pub enum DecryptionError {
    /// The envelope is too short, carries the wrong magic bytes, or was
    /// produced by an unsupported protocol version.
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(&'static str),

    /// The envelope salt differs from the salt the supplied cipher was
    /// derived under. Reported before any MAC work so that misuse of the
    /// batch API is distinguishable from forgery.
    #[error("envelope salt does not match the cipher salt")]
    MisMatchedCipherSalt,

    /// One or both MACs failed to verify: the envelope is forged or corrupt.
    #[error("MAC verification failed")]
    MacMismatch,
}

/// Umbrella error for the one-shot operations, which can fail on either
/// side of the pipeline (e.g. [`decrypt`](crate::decrypt) derives keys and
/// so can reject an empty password).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
    #[error(transparent)]
    Decryption(#[from] DecryptionError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
