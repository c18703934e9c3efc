use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::config;
use crate::error::{Result, RvsError};

/// Derive a 32-byte AES key from a password and salt with
/// PBKDF2-HMAC-SHA256 at 100 000 iterations.
pub fn derive_key(password: &[u8], salt: &[u8]) -> [u8; config::KEY_SIZE] {
    let mut key = [0u8; config::KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, salt, config::PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt a whole file under a password.
///
/// Layout: `salt(16) | nonce_field(16) | tag(16) | ciphertext`. The nonce
/// is 12 random bytes stored in the first 12 bytes of the nonce field;
/// the trailing 4 bytes are zero, reserved. Encryption happens once over
/// the whole plaintext, before chunking, so recovering a subset of chunks
/// yields nothing decryptable.
pub fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
    let mut salt = [0u8; config::SALT_SIZE];
    let mut nonce = [0u8; config::NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut key = derive_key(password.as_bytes(), &salt);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| RvsError::AuthFailure(format!("cipher init: {e}")))?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| RvsError::AuthFailure(format!("encryption: {e}")))?;
    secure_zero(&mut key);

    // aes-gcm appends the tag to the ciphertext; the envelope keeps it up
    // front with the other fixed fields.
    let (ciphertext, tag) = sealed.split_at(sealed.len() - config::TAG_SIZE);

    let mut envelope = Vec::with_capacity(config::ENVELOPE_OVERHEAD + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&[0u8; config::NONCE_FIELD_SIZE - config::NONCE_SIZE]);
    envelope.extend_from_slice(tag);
    envelope.extend_from_slice(ciphertext);
    Ok(envelope)
}

/// Decrypt an envelope produced by [`seal`]. Any tamper (flipped
/// ciphertext byte, wrong password, truncation) surfaces as a single
/// authentication failure; no plaintext is ever emitted on mismatch.
pub fn open(envelope: &[u8], password: &str) -> Result<Vec<u8>> {
    if envelope.len() < config::ENVELOPE_OVERHEAD {
        return Err(RvsError::AuthFailure(format!(
            "envelope too short: {} bytes",
            envelope.len()
        )));
    }

    let salt = &envelope[..config::SALT_SIZE];
    let nonce_field = &envelope[config::SALT_SIZE..config::SALT_SIZE + config::NONCE_FIELD_SIZE];
    let tag_off = config::SALT_SIZE + config::NONCE_FIELD_SIZE;
    let tag = &envelope[tag_off..tag_off + config::TAG_SIZE];
    let ciphertext = &envelope[config::ENVELOPE_OVERHEAD..];

    let mut key = derive_key(password.as_bytes(), salt);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| RvsError::AuthFailure(format!("cipher init: {e}")))?;

    let mut sealed = Vec::with_capacity(ciphertext.len() + config::TAG_SIZE);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    let result = cipher
        .decrypt(Nonce::from_slice(&nonce_field[..config::NONCE_SIZE]), sealed.as_slice())
        .map_err(|_| RvsError::AuthFailure("tag mismatch".into()));
    secure_zero(&mut key);
    result
}

/// Overwrite key material before the buffer is dropped.
pub fn secure_zero(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        unsafe {
            std::ptr::write_volatile(byte, 0);
        }
    }
    std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
}
