use std::{fmt::Display, str::FromStr};

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Four-digit numeric room identifier chosen by the Host.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(1000..=9999).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code_re = Regex::new(r"^\d{4}$").expect("Valid room code regex");
        let trimmed = s.trim();
        if code_re.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(SyncError::InvalidRoomCode(s.to_string()))
        }
    }
}

impl TryFrom<String> for RoomCode {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomCode> for String {
    fn from(value: RoomCode) -> Self {
        value.0
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("0420".parse::<RoomCode>().unwrap().as_str(), "0420");
        assert_eq!(" 1234\n".parse::<RoomCode>().unwrap().as_str(), "1234");
        for bad in ["123", "12345", "12a4", ""] {
            assert!(bad.parse::<RoomCode>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_generated_codes_are_valid() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let code = RoomCode::generate(&mut rng);
            assert!(code.as_str().parse::<RoomCode>().is_ok());
            assert!(!code.as_str().starts_with('0'));
        }
    }

    #[test]
    fn test_serde_validates() {
        assert!(serde_json::from_str::<RoomCode>("\"9999\"").is_ok());
        assert!(serde_json::from_str::<RoomCode>("\"99\"").is_err());
    }
}
