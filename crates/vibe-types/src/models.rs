use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of content a post carries.
///
/// `TextPost` has only text, `VisualPost` has pictures with or without text,
/// `VideoPost` has a video with or without text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostType {
    #[default]
    TextPost,
    VisualPost,
    VideoPost,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextPost => "TextPost",
            Self::VisualPost => "VisualPost",
            Self::VideoPost => "VideoPost",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TextPost" => Ok(Self::TextPost),
            "VisualPost" => Ok(Self::VisualPost),
            "VideoPost" => Ok(Self::VideoPost),
            other => Err(format!("unknown post type: {}", other)),
        }
    }
}

/// Why a secondary verification token was issued to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenReason {
    EmailVerification,
}

impl TokenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "EmailVerification",
        }
    }
}

/// JWT flavour. Access tokens authenticate requests, refresh tokens only
/// mint new access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_type_parses_its_own_names() {
        for ty in [PostType::TextPost, PostType::VisualPost, PostType::VideoPost] {
            assert_eq!(ty.as_str().parse::<PostType>().unwrap(), ty);
        }
        assert!("Reel".parse::<PostType>().is_err());
    }

    #[test]
    fn token_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TokenType::Refresh).unwrap(), "\"refresh\"");
    }
}
