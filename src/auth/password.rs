use argon2::{
    Argon2,
    password_hash::{
        Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error as ThisError;

pub fn hash_password(password: &str) -> Result<String, Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

pub fn verify_password(password: &str, hashed: &str) -> Result<(), Error> {
    let argon2 = Argon2::default();
    let parsed = PasswordHash::new(hashed)?;

    argon2.verify_password(password.as_bytes(), &parsed)
}

/// Secret for accounts that only sign in with PIN or face.
pub fn random_secret() -> String {
    format!(
        "{}{}",
        SaltString::generate(&mut OsRng).as_str(),
        uuid::Uuid::new_v4().to_simple()
    )
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PinError {
    #[error("PIN must be exactly 4 digits")]
    Format,
}

pub fn validate_pin(pin: &str) -> Result<(), PinError> {
    if pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(PinError::Format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hashed = hash_password("1234").unwrap();
        assert_ne!(hashed, "1234");
        assert!(verify_password("1234", &hashed).is_ok());
        assert!(verify_password("4321", &hashed).is_err());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_panic() {
        assert!(verify_password("1234", "not-a-phc-string").is_err());
    }

    #[test]
    fn pin_rules() {
        assert_eq!(validate_pin("0007"), Ok(()));
        assert_eq!(validate_pin("123"), Err(PinError::Format));
        assert_eq!(validate_pin("12345"), Err(PinError::Format));
        assert_eq!(validate_pin("12a4"), Err(PinError::Format));
        assert_eq!(validate_pin("１２３４"), Err(PinError::Format));
    }

    #[test]
    fn random_secrets_differ() {
        let a = random_secret();
        assert!(a.len() >= 32);
        assert_ne!(a, random_secret());
    }
}
