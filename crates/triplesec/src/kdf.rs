use scrypt::Params;
use tracing::debug;
use zeroize::Zeroize;

use crate::envelope::SALT_LEN;
use crate::error::EncryptionError;

/// Scrypt cost parameters fixed by TripleSec v3: N = 2^15, r = 8, p = 1.
pub const SCRYPT_LOG_N: u8 = 15;
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;

/// Length of the Scrypt output (the "mega key") that all subkeys are cut from.
pub const MASTER_KEY_LEN: usize = 264;

/// Length of each MAC subkey.
pub const MAC_KEY_LEN: usize = 48;

/// Length of each cipher subkey.
pub const CIPHER_KEY_LEN: usize = 32;

/// The eight-way partition of the mega key, minus the 72 reserved bytes.
///
/// Derived exactly once when a cipher is constructed and immutable after
/// that. All fields are wiped on drop.
#[derive(Debug)]
pub(crate) struct SubKeys {
    pub(crate) hmac_sha512: [u8; MAC_KEY_LEN],
    pub(crate) hmac_sha3: [u8; MAC_KEY_LEN],
    pub(crate) aes: [u8; CIPHER_KEY_LEN],
    pub(crate) twofish: [u8; CIPHER_KEY_LEN],
    pub(crate) xsalsa: [u8; CIPHER_KEY_LEN],
}

impl Drop for SubKeys {
    fn drop(&mut self) {
        self.hmac_sha512.zeroize();
        self.hmac_sha3.zeroize();
        self.aes.zeroize();
        self.twofish.zeroize();
        self.xsalsa.zeroize();
    }
}

/// Runs Scrypt over `(password, salt)` and partitions the mega key.
///
/// The partition order is fixed by the protocol: HMAC-SHA-512 key (48B),
/// HMAC-SHA3-512 key (48B), AES-256 key (32B), Twofish-256 key (32B),
/// XSalsa20 key (32B). The trailing 72 bytes are reserved by v3 and
/// discarded here; the whole mega-key buffer is wiped before returning.
///
/// # Arguments
/// * `password` - The user's password; any non-empty byte sequence.
/// * `salt` - The 16-byte salt the subkeys are bound to.
///
/// # Returns
/// The five subkeys, each cut from its fixed offset in the mega key.
///
/// # Errors
/// Returns [`EncryptionError::InvalidPassword`] if the password is empty.
///
/// # Panics
/// Neither `expect` can fire in practice: the v3 cost parameters are
/// accepted by `Params::new` by construction, and the 264-byte output
/// length is valid for Scrypt.
///
/// # Attributes
/// * `#[allow(clippy::expect_used)]` - Suppresses the Clippy lint warning
///   for using `.expect()`.
#[allow(clippy::expect_used)]
pub(crate) fn derive(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<SubKeys, EncryptionError> {
    if password.is_empty() {
        return Err(EncryptionError::InvalidPassword);
    }

    debug!(log_n = SCRYPT_LOG_N, r = SCRYPT_R, p = SCRYPT_P, "deriving subkeys");

    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P)
        .expect("v3 scrypt parameters are valid");
    let mut mega = [0u8; MASTER_KEY_LEN];
    scrypt::scrypt(password, salt, &params, &mut mega).expect("output length is fixed and valid");

    let keys = partition(&mega);
    mega.zeroize();
    Ok(keys)
}

fn partition(mega: &[u8; MASTER_KEY_LEN]) -> SubKeys {
    let (mac1, rest) = mega.split_at(MAC_KEY_LEN);
    let (mac2, rest) = rest.split_at(MAC_KEY_LEN);
    let (aes, rest) = rest.split_at(CIPHER_KEY_LEN);
    let (twofish, rest) = rest.split_at(CIPHER_KEY_LEN);
    let (xsalsa, _reserved) = rest.split_at(CIPHER_KEY_LEN);

    let mut keys = SubKeys {
        hmac_sha512: [0u8; MAC_KEY_LEN],
        hmac_sha3: [0u8; MAC_KEY_LEN],
        aes: [0u8; CIPHER_KEY_LEN],
        twofish: [0u8; CIPHER_KEY_LEN],
        xsalsa: [0u8; CIPHER_KEY_LEN],
    };
    keys.hmac_sha512.copy_from_slice(mac1);
    keys.hmac_sha3.copy_from_slice(mac2);
    keys.aes.copy_from_slice(aes);
    keys.twofish.copy_from_slice(twofish);
    keys.xsalsa.copy_from_slice(xsalsa);
    keys
}
