use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The fixed set of avatars a user may pick from.
///
/// This is the single list consumed both by request validation and by the
/// selection surface, so the two cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Avatar {
    Avatar1,
    Avatar2,
    Avatar3,
    Avatar4,
    Avatar5,
    Avatar6,
    Avatar7,
    Avatar8,
    Avatar9,
    Avatar10,
}

impl Avatar {
    pub const ALL: [Avatar; 10] = [
        Avatar::Avatar1,
        Avatar::Avatar2,
        Avatar::Avatar3,
        Avatar::Avatar4,
        Avatar::Avatar5,
        Avatar::Avatar6,
        Avatar::Avatar7,
        Avatar::Avatar8,
        Avatar::Avatar9,
        Avatar::Avatar10,
    ];

    /// File name the avatar is published under, e.g. `avatar3.png`.
    pub fn file_name(self) -> &'static str {
        match self {
            Avatar::Avatar1 => "avatar1.png",
            Avatar::Avatar2 => "avatar2.png",
            Avatar::Avatar3 => "avatar3.png",
            Avatar::Avatar4 => "avatar4.png",
            Avatar::Avatar5 => "avatar5.png",
            Avatar::Avatar6 => "avatar6.png",
            Avatar::Avatar7 => "avatar7.png",
            Avatar::Avatar8 => "avatar8.png",
            Avatar::Avatar9 => "avatar9.png",
            Avatar::Avatar10 => "avatar10.png",
        }
    }
}

impl fmt::Display for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Returned when a string names no known avatar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid avatar: {0}")]
pub struct UnknownAvatar(pub String);

impl FromStr for Avatar {
    type Err = UnknownAvatar;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Avatar::ALL
            .into_iter()
            .find(|a| a.file_name() == s)
            .ok_or_else(|| UnknownAvatar(s.to_string()))
    }
}

impl TryFrom<String> for Avatar {
    type Error = UnknownAvatar;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Avatar> for String {
    fn from(avatar: Avatar) -> Self {
        avatar.file_name().to_string()
    }
}

/// An authenticated user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<Avatar>,
}

/// Claims carried in the payload segment of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    pub exp: i64,
}

/// Signup form. The password is wiped from memory on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login form. The password is wiped from memory on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body returned by `/signup` and `/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    pub token: String,
}
