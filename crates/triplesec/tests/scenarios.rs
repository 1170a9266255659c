//! End-to-end scenarios against the public API only.

#![allow(clippy::unwrap_used)]

use triplesec::{
    Cipher, DecryptionError, EncryptionError, Error, OVERHEAD, SeededRandom, check_prefix,
    decrypt, encrypt, encrypt_with,
};

#[test]
fn test_one_shot_round_trip() {
    let password = b"my secret password";
    let plaintext = b"message that will be encrypted";

    let envelope = encrypt(password, plaintext).unwrap();
    assert_eq!(envelope.len(), OVERHEAD + plaintext.len());
    assert_eq!(decrypt(password, &envelope).unwrap(), plaintext);
}

#[test]
fn test_empty_plaintext_emits_nothing() {
    let err = encrypt(b"my secret password", b"").unwrap_err();
    assert!(matches!(
        err,
        Error::Encryption(EncryptionError::ZeroLengthPlaintext)
    ));
}

#[test]
fn test_batch_reuse_over_one_cipher() {
    let cipher = Cipher::new(b"mypassword").unwrap();
    let messages: [&[u8]; 3] = [b"message1", b"message2", b"message3"];

    let sealed: Vec<Vec<u8>> = messages.iter().map(|m| cipher.encrypt(m).unwrap()).collect();

    for (envelope, original) in sealed.iter().zip(messages) {
        assert_eq!(cipher.decrypt(envelope).unwrap(), original);
    }
}

#[test]
fn test_salt_mismatch_between_sibling_ciphers() {
    let c1 = Cipher::new(b"mypassword").unwrap();
    let c2 = Cipher::new(b"mypassword").unwrap();
    assert_ne!(c1.salt(), c2.salt());

    let envelope = c1.encrypt(b"message").unwrap();
    let err = c2.decrypt(&envelope).unwrap_err();
    assert!(matches!(err, DecryptionError::MisMatchedCipherSalt));
}

#[test]
fn test_salt_recovery_reopens_a_whole_batch() {
    let cipher = Cipher::new(b"mypassword").unwrap();
    let messages: [&[u8]; 3] = [b"first", b"second", b"third"];
    let sealed: Vec<Vec<u8>> = messages.iter().map(|m| cipher.encrypt(m).unwrap()).collect();

    // Every envelope of the batch advertises the cipher's salt.
    for envelope in &sealed {
        assert_eq!(&check_prefix(envelope).unwrap().salt, cipher.salt());
    }

    let recovered = check_prefix(&sealed[0]).unwrap().salt;
    let reopened = Cipher::with_salt(b"mypassword", &recovered).unwrap();
    for (envelope, original) in sealed.iter().zip(messages) {
        assert_eq!(reopened.decrypt(envelope).unwrap(), original);
    }
}

#[test]
fn test_forged_body_byte_is_detected() {
    let password = b"mypassword";
    let mut envelope = encrypt(password, b"untampered contents").unwrap();
    envelope[OVERHEAD + 3] ^= 0x01;

    let err = decrypt(password, &envelope).unwrap_err();
    assert!(matches!(
        err,
        Error::Decryption(DecryptionError::MacMismatch)
    ));
}

#[test]
fn test_independent_encryptions_never_collide() {
    let a = encrypt(b"mypassword", b"message").unwrap();
    let b = encrypt(b"mypassword", b"message").unwrap();

    assert_ne!(a, b);
    // Salts differ, so even the headers diverge.
    assert_ne!(a[8..24], b[8..24]);
}

#[test]
fn test_every_header_byte_is_load_bearing() {
    let password = b"mypassword";
    let cipher = Cipher::new(password).unwrap();
    let envelope = cipher.encrypt(b"short message").unwrap();

    // Magic and version corruption is rejected as an invalid envelope
    // before any key material comes into play.
    for offset in 0..8 {
        let mut forged = envelope.clone();
        forged[offset] ^= 0x01;
        let err = decrypt(password, &forged).unwrap_err();
        assert!(
            matches!(err, Error::Decryption(DecryptionError::InvalidCiphertext(_))),
            "offset {offset}"
        );
    }

    // A flipped salt byte re-derives different keys, so the one-shot path
    // lands on a MAC failure.
    for offset in 8..24 {
        let mut forged = envelope.clone();
        forged[offset] ^= 0x01;
        let err = decrypt(password, &forged).unwrap_err();
        assert!(
            matches!(err, Error::Decryption(DecryptionError::MacMismatch)),
            "offset {offset}"
        );
    }

    // MACs, IVs, and body are all covered by the MAC check.
    for offset in 24..envelope.len() {
        let mut forged = envelope.clone();
        forged[offset] ^= 0x01;
        let err = cipher.decrypt(&forged).unwrap_err();
        assert!(
            matches!(err, DecryptionError::MacMismatch),
            "offset {offset}"
        );
    }
}

#[test]
fn test_seeded_envelope_is_fully_deterministic() {
    let password = b"my secret password";
    let plaintext = b"message that will be encrypted";
    let seed = [0x5eu8; 32];

    let a = encrypt_with(password, plaintext, &mut SeededRandom::from_seed(seed)).unwrap();
    let b = encrypt_with(password, plaintext, &mut SeededRandom::from_seed(seed)).unwrap();
    assert_eq!(a, b);

    // The generator feeds the salt first, then the 56 IV bytes, so the
    // envelope's random fields are exactly the head of the seeded stream.
    let mut stream = SeededRandom::from_seed(seed);
    let mut expected_salt = [0u8; 16];
    triplesec::RandomSource::fill(&mut stream, &mut expected_salt).unwrap();
    let mut expected_ivs = [0u8; 56];
    triplesec::RandomSource::fill(&mut stream, &mut expected_ivs).unwrap();

    let prefix = check_prefix(&a).unwrap();
    assert_eq!(prefix.version, 3);
    assert_eq!(prefix.salt, expected_salt);
    assert_eq!(prefix.body_len, plaintext.len());
    assert_eq!(a[152..208], expected_ivs);

    assert_eq!(decrypt(password, &a).unwrap(), plaintext);
}
