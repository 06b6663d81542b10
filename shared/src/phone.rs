//! 手机号校验与规范化（俄罗斯号码）
//!
//! 规范形式为 11 位数字、以 `7` 开头，例如 `79161234567`。

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    Empty,
    InvalidLength(usize),
    InvalidPrefix,
}

impl fmt::Display for PhoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhoneError::Empty => write!(f, "phone number is empty"),
            PhoneError::InvalidLength(n) => {
                write!(f, "phone number must have 10 or 11 digits, got {}", n)
            }
            PhoneError::InvalidPrefix => write!(f, "phone number must start with +7, 8 or 9"),
        }
    }
}

impl std::error::Error for PhoneError {}

/// 已规范化的手机号
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        let normalized = match (digits.len(), digits.chars().next()) {
            (0, _) => return Err(PhoneError::Empty),
            (10, Some('9')) => format!("7{}", digits),
            (10, _) => return Err(PhoneError::InvalidPrefix),
            (11, Some('8')) => format!("7{}", &digits[1..]),
            (11, Some('7')) => digits,
            (11, _) => return Err(PhoneError::InvalidPrefix),
            (n, _) => return Err(PhoneError::InvalidLength(n)),
        };

        Ok(Self(normalized))
    }

    /// 纯数字形式，用于 API 调用
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `+7 (916) 123-45-67`
    pub fn display(&self) -> String {
        let d = &self.0;
        format!(
            "+7 ({}) {}-{}-{}",
            &d[1..4],
            &d[4..7],
            &d[7..9],
            &d[9..11]
        )
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(p: PhoneNumber) -> Self {
        p.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_formats() {
        for raw in [
            "+7 (916) 123-45-67",
            "8 916 123 45 67",
            "89161234567",
            "9161234567",
            "7-916-123-45-67",
        ] {
            assert_eq!(PhoneNumber::parse(raw).unwrap().as_str(), "79161234567", "{raw}");
        }
    }

    #[test]
    fn rejects_invalid_numbers() {
        assert_eq!(PhoneNumber::parse(""), Err(PhoneError::Empty));
        assert_eq!(PhoneNumber::parse("  - "), Err(PhoneError::Empty));
        assert_eq!(PhoneNumber::parse("12345"), Err(PhoneError::InvalidLength(5)));
        assert_eq!(PhoneNumber::parse("4951234567"), Err(PhoneError::InvalidPrefix));
        assert_eq!(PhoneNumber::parse("19161234567"), Err(PhoneError::InvalidPrefix));
        assert_eq!(
            PhoneNumber::parse("+7 916 123 45 67 8"),
            Err(PhoneError::InvalidLength(12))
        );
    }

    #[test]
    fn display_form() {
        let p = PhoneNumber::parse("89161234567").unwrap();
        assert_eq!(p.display(), "+7 (916) 123-45-67");
    }

    #[test]
    fn deserialization_validates() {
        let p: PhoneNumber = serde_json::from_str(r#""8 (916) 123-45-67""#).unwrap();
        assert_eq!(p.as_str(), "79161234567");
        assert!(serde_json::from_str::<PhoneNumber>(r#""123""#).is_err());
    }
}
