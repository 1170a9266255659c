use std::fmt;

use aes::Aes256;
use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use salsa20::XSalsa20;
use sha2::Sha512;
use sha3::Sha3_512;
use subtle::ConstantTimeEq;
use tracing::{trace, warn};
use twofish::Twofish;
use zeroize::Zeroizing;

use crate::envelope::{
    self, AES_IV_LEN, Header, IV_BUNDLE_LEN, IvBundle, MAC_LEN, SALT_LEN, TWOFISH_IV_LEN,
};
use crate::error::{DecryptionError, EncryptionError};
use crate::kdf::{self, SubKeys};
use crate::rng::{RandomSource, SystemRandom};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type Twofish256Ctr = ctr::Ctr128BE<Twofish>;
type HmacSha512 = Hmac<Sha512>;
type HmacSha3_512 = Hmac<Sha3_512>;

/// A reusable handle over the subkeys derived from one `(password, salt)`
/// pair.
///
/// Scrypt is deliberately expensive; a `Cipher` exists to pay that cost
/// once and amortize it across every message in a batch. The value is
/// immutable after construction, so any number of encryptions and
/// decryptions may run against it in parallel through `&self`; each
/// encryptor just brings its own random source for the per-message IVs.
pub struct Cipher {
    password: Zeroizing<Vec<u8>>,
    salt: [u8; SALT_LEN],
    keys: SubKeys,
}

impl Cipher {
    /// Derive a cipher under a fresh random salt from the OS entropy pool.
    ///
    /// # Arguments
    /// * `password` - The user's password; any non-empty byte sequence.
    ///
    /// # Returns
    /// A `Cipher` holding the derived subkeys, ready to seal and open any
    /// number of messages.
    ///
    /// # Errors
    /// Returns [`EncryptionError::InvalidPassword`] for an empty password
    /// and [`EncryptionError::RngFailure`] if the salt cannot be drawn.
    pub fn new(password: &[u8]) -> Result<Self, EncryptionError> {
        Self::new_with(password, &mut SystemRandom)
    }

    /// Derive a cipher under a fresh salt drawn from `rng`.
    ///
    /// With a [`SeededRandom`](crate::SeededRandom) this makes the salt
    /// deterministic, along with every envelope later produced through the
    /// same generator.
    ///
    /// # Arguments
    /// * `password` - The user's password; any non-empty byte sequence.
    /// * `rng` - The source the 16 salt bytes are drawn from.
    ///
    /// # Returns
    /// A `Cipher` holding the derived subkeys.
    ///
    /// # Errors
    /// Same conditions as [`Cipher::new`].
    pub fn new_with<R: RandomSource>(password: &[u8], rng: &mut R) -> Result<Self, EncryptionError> {
        let mut salt = [0u8; SALT_LEN];
        rng.fill(&mut salt)?;
        Self::build(password, salt)
    }

    /// Derive a cipher under a caller-supplied salt, typically one
    /// recovered from an existing envelope via
    /// [`check_prefix`](crate::check_prefix).
    ///
    /// # Arguments
    /// * `password` - The user's password; any non-empty byte sequence.
    /// * `salt` - The 16-byte salt the original cipher was derived under.
    ///
    /// # Returns
    /// A `Cipher` that decrypts every envelope produced under the same
    /// `(password, salt)` pair.
    ///
    /// # Errors
    /// Returns [`EncryptionError::InvalidSaltLength`] unless `salt` is
    /// exactly 16 bytes, and [`EncryptionError::InvalidPassword`] for an
    /// empty password.
    pub fn with_salt(password: &[u8], salt: &[u8]) -> Result<Self, EncryptionError> {
        let salt: [u8; SALT_LEN] = salt
            .try_into()
            .map_err(|_| EncryptionError::InvalidSaltLength(salt.len()))?;
        Self::build(password, salt)
    }

    /// Derive a sibling cipher for the same password under another salt,
    /// e.g. to read envelopes from a different batch.
    ///
    /// This re-runs the KDF at full cost.
    ///
    /// # Arguments
    /// * `salt` - The 16-byte salt the sibling batch was produced under.
    ///
    /// # Returns
    /// A new `Cipher` for the same password under `salt`.
    ///
    /// # Errors
    /// Same conditions as [`Cipher::with_salt`].
    pub fn resalted(&self, salt: &[u8]) -> Result<Self, EncryptionError> {
        Self::with_salt(&self.password, salt)
    }

    fn build(password: &[u8], salt: [u8; SALT_LEN]) -> Result<Self, EncryptionError> {
        let keys = kdf::derive(password, &salt)?;
        Ok(Self {
            password: Zeroizing::new(password.to_vec()),
            salt,
            keys,
        })
    }

    /// The salt this cipher was derived under.
    #[must_use]
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// Encrypt one message, drawing IVs from the OS entropy pool.
    ///
    /// # Arguments
    /// * `plaintext` - The message to seal; any non-empty byte sequence.
    ///
    /// # Returns
    /// The complete envelope: a 208-byte header followed by a body of the
    /// same length as the plaintext.
    ///
    /// # Errors
    /// Returns [`EncryptionError::ZeroLengthPlaintext`] for an empty
    /// message and [`EncryptionError::RngFailure`] if the IVs cannot be
    /// drawn.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        self.encrypt_with(plaintext, &mut SystemRandom)
    }

    /// Encrypt one message, drawing the 56 IV bytes from `rng`.
    ///
    /// The layering runs inside-out: XSalsa20 first, then Twofish-CTR,
    /// then AES-CTR, and both MACs are computed over the triply-encrypted
    /// body together with the header prefix that binds salt and IVs.
    ///
    /// # Arguments
    /// * `plaintext` - The message to seal; any non-empty byte sequence.
    /// * `rng` - The source the AES IV, Twofish IV, and XSalsa20 nonce are
    ///   drawn from, in one contiguous fill.
    ///
    /// # Returns
    /// The complete envelope bytes.
    ///
    /// # Errors
    /// Same conditions as [`Cipher::encrypt`].
    pub fn encrypt_with<R: RandomSource>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, EncryptionError> {
        if plaintext.is_empty() {
            return Err(EncryptionError::ZeroLengthPlaintext);
        }
        let ivs = draw_ivs(rng)?;

        let mut body = plaintext.to_vec();
        self.apply_xsalsa(&ivs.xsalsa, &mut body);
        self.apply_twofish(&ivs.twofish, &mut body);
        self.apply_aes(&ivs.aes, &mut body);

        let ad = envelope::associated_data(&self.salt, &ivs, &body);
        let header = Header {
            salt: self.salt,
            mac_sha512: self.mac_sha512(&ad),
            mac_sha3: self.mac_sha3(&ad),
            ivs,
        };

        trace!(body_len = body.len(), "message sealed");
        Ok(envelope::encode(&header, &body))
    }

    /// Verify and decrypt one envelope.
    ///
    /// Both MACs are recomputed over the canonical prefix and compared in
    /// constant time; neither comparison short-circuits the other. No
    /// inverse cipher work happens until both tags check out.
    ///
    /// # Arguments
    /// * `envelope` - The complete envelope bytes as produced by
    ///   [`Cipher::encrypt`].
    ///
    /// # Returns
    /// The recovered plaintext. Nothing is returned on any failure; there
    /// are no partial outputs.
    ///
    /// # Errors
    /// Returns [`DecryptionError::InvalidCiphertext`] if the envelope
    /// cannot be parsed, [`DecryptionError::MisMatchedCipherSalt`] if it
    /// was produced under a different salt than this cipher (checked
    /// before any MAC work), and [`DecryptionError::MacMismatch`] if
    /// either tag fails to verify.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let (header, body) = envelope::split(envelope)?;
        if header.salt != self.salt {
            return Err(DecryptionError::MisMatchedCipherSalt);
        }

        let ad = envelope::associated_data(&self.salt, &header.ivs, body);
        let sha512_ok = self.mac_sha512(&ad)[..].ct_eq(&header.mac_sha512[..]);
        let sha3_ok = self.mac_sha3(&ad)[..].ct_eq(&header.mac_sha3[..]);
        if !bool::from(sha512_ok & sha3_ok) {
            warn!("MAC verification failed");
            return Err(DecryptionError::MacMismatch);
        }

        let mut body = body.to_vec();
        self.apply_aes(&header.ivs.aes, &mut body);
        self.apply_twofish(&header.ivs.twofish, &mut body);
        self.apply_xsalsa(&header.ivs.xsalsa, &mut body);

        trace!(body_len = body.len(), "message opened");
        Ok(body)
    }

    // CTR keystreams encrypt and decrypt alike, so each layer is a single
    // in-place application in both directions.

    fn apply_aes(&self, iv: &[u8; AES_IV_LEN], buf: &mut [u8]) {
        let mut layer = Aes256Ctr::new((&self.keys.aes).into(), iv.into());
        layer.apply_keystream(buf);
    }

    fn apply_twofish(&self, iv: &[u8; TWOFISH_IV_LEN], buf: &mut [u8]) {
        let mut layer = Twofish256Ctr::new((&self.keys.twofish).into(), iv.into());
        layer.apply_keystream(buf);
    }

    fn apply_xsalsa(&self, nonce: &[u8; envelope::XSALSA_NONCE_LEN], buf: &mut [u8]) {
        let mut layer = XSalsa20::new((&self.keys.xsalsa).into(), nonce.into());
        layer.apply_keystream(buf);
    }

    /// Compute the HMAC-SHA-512 tag over `data`.
    ///
    /// # Attributes
    /// * `#[allow(clippy::expect_used)]` - Suppresses the Clippy lint
    ///   warning for using `.expect()`.
    ///
    /// # Panics
    /// The `expect` cannot fire in practice: HMAC accepts keys of any
    /// length, so constructing it from the 48-byte subkey never fails.
    #[allow(clippy::expect_used)]
    fn mac_sha512(&self, data: &[u8]) -> [u8; MAC_LEN] {
        let mut mac = <HmacSha512 as Mac>::new_from_slice(&self.keys.hmac_sha512)
            .expect("HMAC accepts any key length");
        mac.update(data);
        let mut tag = [0u8; MAC_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        tag
    }

    /// Compute the HMAC-SHA3-512 tag over `data`.
    ///
    /// # Attributes
    /// * `#[allow(clippy::expect_used)]` - Suppresses the Clippy lint
    ///   warning for using `.expect()`.
    ///
    /// # Panics
    /// The `expect` cannot fire in practice: HMAC accepts keys of any
    /// length, so constructing it from the 48-byte subkey never fails.
    #[allow(clippy::expect_used)]
    fn mac_sha3(&self, data: &[u8]) -> [u8; MAC_LEN] {
        let mut mac = <HmacSha3_512 as Mac>::new_from_slice(&self.keys.hmac_sha3)
            .expect("HMAC accepts any key length");
        mac.update(data);
        let mut tag = [0u8; MAC_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        tag
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher")
            .field("salt", &hex::encode(self.salt))
            .field("password", &"[REDACTED]")
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

fn draw_ivs<R: RandomSource>(rng: &mut R) -> Result<IvBundle, EncryptionError> {
    // One contiguous draw, split in wire order.
    let mut buf = [0u8; IV_BUNDLE_LEN];
    rng.fill(&mut buf)?;

    let mut ivs = IvBundle {
        aes: [0u8; AES_IV_LEN],
        twofish: [0u8; TWOFISH_IV_LEN],
        xsalsa: [0u8; envelope::XSALSA_NONCE_LEN],
    };
    let (aes, rest) = buf.split_at(AES_IV_LEN);
    let (twofish, xsalsa) = rest.split_at(TWOFISH_IV_LEN);
    ivs.aes.copy_from_slice(aes);
    ivs.twofish.copy_from_slice(twofish);
    ivs.xsalsa.copy_from_slice(xsalsa);
    Ok(ivs)
}
