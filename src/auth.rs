use pbkdf2::password_hash::{PasswordHasher, SaltString};
use pbkdf2::Pbkdf2;
use rand::{thread_rng, Rng};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use crate::Error;

/// Hashes a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Pbkdf2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Random hex token, used to key one-shot flash entries.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = thread_rng().gen();

    let mut hasher: Sha256 = Digest::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
