//! Binary framing of the v3 ciphertext envelope.
//!
//! Fixed layout, big-endian fields, 208 bytes of overhead ahead of the body:
//!
//! | offset | length | field |
//! |--------|--------|-------|
//! | 0      | 4      | magic `1C 94 D7 DE` |
//! | 4      | 4      | version (3) |
//! | 8      | 16     | salt |
//! | 24     | 64     | HMAC-SHA-512 tag |
//! | 88     | 64     | HMAC-SHA3-512 tag |
//! | 152    | 16     | AES-CTR IV |
//! | 168    | 16     | Twofish-CTR IV |
//! | 184    | 24     | XSalsa20 nonce |
//! | 208    | n      | body (triply-encrypted plaintext) |

use crate::error::DecryptionError;

/// Leading magic bytes of every envelope.
pub const MAGIC: [u8; 4] = [0x1c, 0x94, 0xd7, 0xde];

/// The only protocol version this crate speaks.
pub const VERSION: u32 = 3;

/// Salt length; one salt identifies one derived cipher per password.
pub const SALT_LEN: usize = 16;

/// Length of each MAC tag.
pub const MAC_LEN: usize = 64;

/// AES-256-CTR IV length.
pub const AES_IV_LEN: usize = 16;

/// Twofish-256-CTR IV length.
pub const TWOFISH_IV_LEN: usize = 16;

/// XSalsa20 nonce length.
pub const XSALSA_NONCE_LEN: usize = 24;

/// Total length of the three per-message IVs, drawn in one fill.
pub const IV_BUNDLE_LEN: usize = AES_IV_LEN + TWOFISH_IV_LEN + XSALSA_NONCE_LEN;

/// Envelope bytes ahead of the body. Body length equals plaintext length.
pub const OVERHEAD: usize = 8 + SALT_LEN + 2 * MAC_LEN + IV_BUNDLE_LEN;

const SALT_OFFSET: usize = 8;
const MAC1_OFFSET: usize = SALT_OFFSET + SALT_LEN;
const MAC2_OFFSET: usize = MAC1_OFFSET + MAC_LEN;
const IV_OFFSET: usize = MAC2_OFFSET + MAC_LEN;

/// The three fresh IVs generated for one message, in wire order.
pub(crate) struct IvBundle {
    pub(crate) aes: [u8; AES_IV_LEN],
    pub(crate) twofish: [u8; TWOFISH_IV_LEN],
    pub(crate) xsalsa: [u8; XSALSA_NONCE_LEN],
}

/// Every fixed-length field of an envelope, parsed.
pub(crate) struct Header {
    pub(crate) salt: [u8; SALT_LEN],
    pub(crate) mac_sha512: [u8; MAC_LEN],
    pub(crate) mac_sha3: [u8; MAC_LEN],
    pub(crate) ivs: IvBundle,
}

/// What [`check_prefix`] learns about an envelope without any key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    /// Protocol version carried by the envelope (always 3 once parsed).
    pub version: u32,
    /// The salt the producing cipher was derived under.
    pub salt: [u8; SALT_LEN],
    /// Length of the encrypted body that follows the header.
    pub body_len: usize,
}

/// Parse an envelope's header without touching MACs or key material.
///
/// This is the entry point for salt recovery: read the salt out of an
/// existing envelope, rebuild the cipher with
/// [`Cipher::with_salt`](crate::Cipher::with_salt), then decrypt the whole
/// batch it came from.
///
/// # Arguments
/// * `envelope` - The candidate envelope bytes; only the fixed header is
///   inspected.
///
/// # Returns
/// A [`Prefix`] carrying the parsed version, the salt, and the length of
/// the body that follows the header. No MAC verification has happened.
///
/// # Errors
/// Returns [`DecryptionError::InvalidCiphertext`] if the envelope is
/// shorter than the fixed header, does not start with the v3 magic, or
/// carries any version other than 3.
pub fn check_prefix(envelope: &[u8]) -> Result<Prefix, DecryptionError> {
    if envelope.len() < OVERHEAD {
        return Err(DecryptionError::InvalidCiphertext(
            "shorter than the fixed 208-byte header",
        ));
    }
    if envelope[..4] != MAGIC {
        return Err(DecryptionError::InvalidCiphertext("bad magic bytes"));
    }
    let version = u32::from_be_bytes(read::<4>(envelope, 4));
    if version != VERSION {
        return Err(DecryptionError::InvalidCiphertext("unsupported version"));
    }

    Ok(Prefix {
        version,
        salt: read(envelope, SALT_OFFSET),
        body_len: envelope.len() - OVERHEAD,
    })
}

/// Parse the full header and hand back the body slice.
pub(crate) fn split(envelope: &[u8]) -> Result<(Header, &[u8]), DecryptionError> {
    let prefix = check_prefix(envelope)?;

    let header = Header {
        salt: prefix.salt,
        mac_sha512: read(envelope, MAC1_OFFSET),
        mac_sha3: read(envelope, MAC2_OFFSET),
        ivs: IvBundle {
            aes: read(envelope, IV_OFFSET),
            twofish: read(envelope, IV_OFFSET + AES_IV_LEN),
            xsalsa: read(envelope, IV_OFFSET + AES_IV_LEN + TWOFISH_IV_LEN),
        },
    };
    Ok((header, &envelope[OVERHEAD..]))
}

/// Assemble the full envelope: header fields in wire order, then the body.
pub(crate) fn encode(header: &Header, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(OVERHEAD + body.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_be_bytes());
    out.extend_from_slice(&header.salt);
    out.extend_from_slice(&header.mac_sha512);
    out.extend_from_slice(&header.mac_sha3);
    out.extend_from_slice(&header.ivs.aes);
    out.extend_from_slice(&header.ivs.twofish);
    out.extend_from_slice(&header.ivs.xsalsa);
    out.extend_from_slice(body);
    out
}

/// The canonical buffer both MACs run over: the envelope minus its MAC
/// fields. Binding the salt and all three IVs here is what stops an
/// attacker splicing a body under a different header.
pub(crate) fn associated_data(salt: &[u8; SALT_LEN], ivs: &IvBundle, body: &[u8]) -> Vec<u8> {
    let mut ad = Vec::with_capacity(OVERHEAD - 2 * MAC_LEN + body.len());
    ad.extend_from_slice(&MAGIC);
    ad.extend_from_slice(&VERSION.to_be_bytes());
    ad.extend_from_slice(salt);
    ad.extend_from_slice(&ivs.aes);
    ad.extend_from_slice(&ivs.twofish);
    ad.extend_from_slice(&ivs.xsalsa);
    ad.extend_from_slice(body);
    ad
}

#[allow(clippy::expect_used)]
fn read<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    buf[offset..offset + N]
        .try_into()
        .expect("length checked against OVERHEAD")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use hex_literal::hex;

    fn sample_header() -> Header {
        Header {
            salt: [0xaa; SALT_LEN],
            mac_sha512: [0xb1; MAC_LEN],
            mac_sha3: [0xb2; MAC_LEN],
            ivs: IvBundle {
                aes: [0xc1; AES_IV_LEN],
                twofish: [0xc2; TWOFISH_IV_LEN],
                xsalsa: [0xc3; XSALSA_NONCE_LEN],
            },
        }
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(OVERHEAD, 208);
        assert_eq!(IV_BUNDLE_LEN, 56);
        assert_eq!(MAGIC, hex!("1c94d7de"));
    }

    #[test]
    fn test_encode_places_every_field_at_its_offset() {
        let body = [0xd0u8; 5];
        let bytes = encode(&sample_header(), &body);

        assert_eq!(bytes.len(), OVERHEAD + 5);
        assert_eq!(bytes[..4], hex!("1c94d7de"));
        assert_eq!(bytes[4..8], hex!("00000003"));
        assert!(bytes[8..24].iter().all(|&b| b == 0xaa));
        assert!(bytes[24..88].iter().all(|&b| b == 0xb1));
        assert!(bytes[88..152].iter().all(|&b| b == 0xb2));
        assert!(bytes[152..168].iter().all(|&b| b == 0xc1));
        assert!(bytes[168..184].iter().all(|&b| b == 0xc2));
        assert!(bytes[184..208].iter().all(|&b| b == 0xc3));
        assert!(bytes[208..].iter().all(|&b| b == 0xd0));
    }

    #[test]
    fn test_split_inverts_encode() {
        let body = b"four byte body!!";
        let bytes = encode(&sample_header(), body);

        let (header, parsed_body) = split(&bytes).unwrap();
        assert_eq!(header.salt, [0xaa; SALT_LEN]);
        assert_eq!(header.mac_sha512, [0xb1; MAC_LEN]);
        assert_eq!(header.mac_sha3, [0xb2; MAC_LEN]);
        assert_eq!(header.ivs.aes, [0xc1; AES_IV_LEN]);
        assert_eq!(header.ivs.twofish, [0xc2; TWOFISH_IV_LEN]);
        assert_eq!(header.ivs.xsalsa, [0xc3; XSALSA_NONCE_LEN]);
        assert_eq!(parsed_body, body);
    }

    #[test]
    fn test_check_prefix_reports_salt_and_body_len() {
        let bytes = encode(&sample_header(), &[0u8; 33]);
        let prefix = check_prefix(&bytes).unwrap();

        assert_eq!(prefix.version, VERSION);
        assert_eq!(prefix.salt, [0xaa; SALT_LEN]);
        assert_eq!(prefix.body_len, 33);
    }

    #[test]
    fn test_short_envelope_is_rejected() {
        let bytes = encode(&sample_header(), &[0u8; 1]);
        let err = check_prefix(&bytes[..OVERHEAD - 1]).unwrap_err();
        assert!(matches!(err, DecryptionError::InvalidCiphertext(_)));
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut bytes = encode(&sample_header(), &[0u8; 1]);
        bytes[0] ^= 0x01;
        let err = check_prefix(&bytes).unwrap_err();
        assert!(matches!(err, DecryptionError::InvalidCiphertext(_)));
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let mut bytes = encode(&sample_header(), &[0u8; 1]);
        bytes[7] = 0x04;
        let err = check_prefix(&bytes).unwrap_err();
        assert!(matches!(err, DecryptionError::InvalidCiphertext(_)));
    }

    #[test]
    fn test_associated_data_is_the_envelope_minus_macs() {
        let header = sample_header();
        let body = [0xd0u8; 7];
        let bytes = encode(&header, &body);
        let ad = associated_data(&header.salt, &header.ivs, &body);

        // magic ‖ version ‖ salt, then IVs ‖ body, skipping both MAC fields.
        assert_eq!(ad[..24], bytes[..24]);
        assert_eq!(ad[24..], bytes[152..]);
    }
}
