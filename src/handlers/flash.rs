//! One-shot notifications carried across a redirect in a cookie.

use std::fmt;
use tower_cookies::{Cookie, Cookies};

const FLASH_COOKIE: &str = "darkwatch_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

impl FlashLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(FlashLevel::Success),
            "error" => Some(FlashLevel::Error),
            "info" => Some(FlashLevel::Info),
            _ => None,
        }
    }
}

impl fmt::Display for FlashLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashLevel::Success => write!(f, "success"),
            FlashLevel::Error => write!(f, "error"),
            FlashLevel::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    // Hex keeps arbitrary messages inside the cookie value grammar.
    fn encode(&self) -> String {
        let raw = format!("{}:{}", self.level, self.message);
        raw.bytes().map(|b| format!("{:02x}", b)).collect()
    }

    fn decode(value: &str) -> Option<Self> {
        if value.len() % 2 != 0 {
            return None;
        }
        let bytes = (0..value.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(value.get(i..i + 2)?, 16).ok())
            .collect::<Option<Vec<u8>>>()?;
        let raw = String::from_utf8(bytes).ok()?;
        let (level, message) = raw.split_once(':')?;
        Some(Self {
            level: FlashLevel::parse(level)?,
            message: message.to_string(),
        })
    }
}

pub fn set(cookies: &Cookies, flash: Flash) {
    let cookie = Cookie::build((FLASH_COOKIE, flash.encode()))
        .http_only(true)
        .path("/");
    cookies.add(cookie.into());
}

/// Returns the pending notification, if any, and removes it.
pub fn take(cookies: &Cookies) -> Option<Flash> {
    let value = cookies.get(FLASH_COOKIE)?.value().to_string();
    let mut expired = Cookie::from(FLASH_COOKIE);
    expired.set_path("/");
    cookies.remove(expired);
    Flash::decode(&value)
}
