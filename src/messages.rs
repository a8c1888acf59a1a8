// src/messages.rs
//! Fixed, localized caller-facing messages. Internal error detail never reaches the caller.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ja,
    En,
}

impl Locale {
    /// Parse `ja` / `en` (case-insensitive); anything else falls back to the default.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" => Locale::En,
            _ => Locale::Ja,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    MissingInput,
    ZeroContent,
    SourceUnavailable,
    InvalidOperation,
    /// Remote call or storage failure.
    General,
}

impl From<ValidationError> for Message {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingInput => Message::MissingInput,
            ValidationError::ZeroContent => Message::ZeroContent,
            ValidationError::SourceUnavailable => Message::SourceUnavailable,
            ValidationError::InvalidOperation => Message::InvalidOperation,
        }
    }
}

impl Message {
    pub fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Message::MissingInput, Locale::Ja) => {
                "Twitter アカウント か つぶやき のどちらかを入力してください。"
            }
            (Message::MissingInput, Locale::En) => "Enter either a Twitter account or a tweet.",
            (Message::ZeroContent, Locale::Ja) => "ツイートが取得できませんでした。",
            (Message::ZeroContent, Locale::En) => "No tweets could be retrieved.",
            (Message::SourceUnavailable, Locale::Ja) => {
                "Twitter に接続できませんでした。しばらくしてから再度お試しください。"
            }
            (Message::SourceUnavailable, Locale::En) => {
                "Twitter could not be reached. Please try again later."
            }
            (Message::InvalidOperation, Locale::Ja) => "不正な操作が行われました。",
            (Message::InvalidOperation, Locale::En) => "An invalid operation was performed.",
            (Message::General, Locale::Ja) => "システムに問題が発生しました。",
            (Message::General, Locale::En) => "A system problem occurred.",
        }
    }
}
