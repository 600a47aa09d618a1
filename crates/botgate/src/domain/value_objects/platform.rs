//! PlatformType - supported messenger platforms

use serde::{Deserialize, Serialize};

/// Messenger platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Telegram,
    Viber,
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformType::Telegram => write!(f, "telegram"),
            PlatformType::Viber => write!(f, "viber"),
        }
    }
}

impl std::str::FromStr for PlatformType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "telegram" => Ok(PlatformType::Telegram),
            "viber" => Ok(PlatformType::Viber),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}
