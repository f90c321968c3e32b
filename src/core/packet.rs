//! # Login Packets
//!
//! Fixed-size request and reply frames of the STNP login extension.
//!
//! ```text
//! request    [255] [kind] [username(16)] [password(16)]      34 bytes
//! logged in  [255] [0]    [kind] [user_id LE(4)]              7 bytes
//! failed     [255] [1]    [reason(72)]                       74 bytes
//! ```

use crate::core::charset;
use crate::error::{constants, LoginError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Message type byte identifying the login extension
pub const LOGIN_MSG_TYPE: u8 = 255;

/// Reply marker for a successful login
pub const LOGGED_IN: u8 = 0;

/// Reply marker for a refused login
pub const LOGIN_FAILED: u8 = 1;

/// Width of the username and password fields
pub const FIELD_LEN: usize = 16;

/// Length of every well-formed request
pub const REQUEST_LEN: usize = 2 + 2 * FIELD_LEN;

/// Length of a logged-in reply
pub const LOGGED_IN_LEN: usize = 7;

/// Number of symbols in a failure reason
pub const REASON_LEN: usize = 72;

/// Length of a login-failed reply
pub const LOGIN_FAILED_LEN: usize = 2 + REASON_LEN;

const USERNAME_OFFSET: usize = 2;
const PASSWORD_OFFSET: usize = USERNAME_OFFSET + FIELD_LEN;

/// Login method requested by the client (byte 1 of a request)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoginKind {
    Anonymous = 0,
    Password = 1,
    CreateAccount = 2,
}

impl LoginKind {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            LoginKind::Anonymous => "anonymous",
            LoginKind::Password => "password",
            LoginKind::CreateAccount => "create_account",
        }
    }
}

impl TryFrom<u8> for LoginKind {
    type Error = LoginError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(LoginKind::Anonymous),
            1 => Ok(LoginKind::Password),
            2 => Ok(LoginKind::CreateAccount),
            other => Err(LoginError::UnknownLoginKind(other)),
        }
    }
}

/// Opaque 16-byte password blob.
///
/// Compared byte for byte and persisted as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Password([u8; FIELD_LEN]);

impl Password {
    pub fn new(bytes: [u8; FIELD_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FIELD_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let mut bytes = [0u8; FIELD_LEN];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|e| LoginError::CorruptStore(format!("bad password {text:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password({})", self.to_hex())
    }
}

impl Serialize for Password {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_hex().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Password::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Decoded username and password of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Password,
}

/// A raw 34-byte login request.
///
/// The username stays charset-encoded until [`LoginRequest::credentials`] is
/// called; anonymous requests never need it decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub kind: LoginKind,
    pub username: [u8; FIELD_LEN],
    pub password: [u8; FIELD_LEN],
}

impl LoginRequest {
    /// Anonymous request with an all-zero payload
    pub fn anonymous() -> Self {
        Self {
            kind: LoginKind::Anonymous,
            username: [0; FIELD_LEN],
            password: [0; FIELD_LEN],
        }
    }

    /// Build a request carrying credentials; the username is charset-encoded and zero-padded.
    pub fn with_credentials(kind: LoginKind, username: &str, password: Password) -> Result<Self> {
        let mut encoded = [0u8; FIELD_LEN];
        charset::encode_field(username, &mut encoded)?;
        Ok(Self {
            kind,
            username: encoded,
            password: *password.as_bytes(),
        })
    }

    /// Parse a full-length request frame.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != REQUEST_LEN {
            return Err(LoginError::MalformedFrame(constants::ERR_WRONG_LENGTH));
        }
        if data[0] != LOGIN_MSG_TYPE {
            return Err(LoginError::MalformedFrame(constants::ERR_WRONG_TAG));
        }
        let kind = LoginKind::try_from(data[1])?;

        let mut username = [0u8; FIELD_LEN];
        username.copy_from_slice(&data[USERNAME_OFFSET..PASSWORD_OFFSET]);
        let mut password = [0u8; FIELD_LEN];
        password.copy_from_slice(&data[PASSWORD_OFFSET..REQUEST_LEN]);

        Ok(Self {
            kind,
            username,
            password,
        })
    }

    pub fn to_bytes(&self) -> [u8; REQUEST_LEN] {
        let mut out = [0u8; REQUEST_LEN];
        out[0] = LOGIN_MSG_TYPE;
        out[1] = self.kind.as_byte();
        out[USERNAME_OFFSET..PASSWORD_OFFSET].copy_from_slice(&self.username);
        out[PASSWORD_OFFSET..].copy_from_slice(&self.password);
        out
    }

    /// Decode the username and wrap the password blob.
    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials {
            username: charset::decode_field(&self.username, USERNAME_OFFSET)?,
            password: Password::new(self.password),
        })
    }
}

/// Why a login was refused.
///
/// Each reason renders as four 18-symbol rows on the client screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    MalformedCredentials,
    UsernameTooShort,
    InvalidCredentials,
    UsernameTaken,
    AccountCreationFailed,
    InvalidLoginMessage,
}

impl FailureReason {
    pub const ALL: [FailureReason; 6] = [
        FailureReason::MalformedCredentials,
        FailureReason::UsernameTooShort,
        FailureReason::InvalidCredentials,
        FailureReason::UsernameTaken,
        FailureReason::AccountCreationFailed,
        FailureReason::InvalidLoginMessage,
    ];

    pub fn text(self) -> &'static str {
        match self {
            FailureReason::MalformedCredentials => concat!(
                "missformed user   ",
                "name or password  ",
                "                  ",
                "                  ",
            ),
            FailureReason::UsernameTooShort => concat!(
                "user name shall   ",
                "have at least     ",
                "three characters  ",
                "                  ",
            ),
            FailureReason::InvalidCredentials => concat!(
                "invalid user name ",
                "or password       ",
                "                  ",
                "                  ",
            ),
            FailureReason::UsernameTaken => concat!(
                "this user name    ",
                "already exists    ",
                "                  ",
                "                  ",
            ),
            FailureReason::AccountCreationFailed => concat!(
                "internal error    ",
                "when creating your",
                "account           ",
                "                  ",
            ),
            FailureReason::InvalidLoginMessage => concat!(
                "invalid login     ",
                "message           ",
                "                  ",
                "                  ",
            ),
        }
    }
}

/// Reply sent back to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    LoggedIn { kind: u8, user_id: u32 },
    Failed { reason: String },
}

impl LoginReply {
    pub fn logged_in(kind: LoginKind, user_id: u32) -> Self {
        LoginReply::LoggedIn {
            kind: kind.as_byte(),
            user_id,
        }
    }

    pub fn failed(reason: FailureReason) -> Self {
        LoginReply::Failed {
            reason: reason.text().to_string(),
        }
    }

    /// Encode the reply.
    ///
    /// A failure reason that is not exactly 72 charset symbols is a bug in the
    /// caller and yields [`LoginError::InvalidReason`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            LoginReply::LoggedIn { kind, user_id } => {
                let mut out = Vec::with_capacity(LOGGED_IN_LEN);
                out.push(LOGIN_MSG_TYPE);
                out.push(LOGGED_IN);
                out.push(*kind);
                out.extend_from_slice(&user_id.to_le_bytes());
                Ok(out)
            }
            LoginReply::Failed { reason } => {
                let encoded = charset::encode_exact::<REASON_LEN>(reason)?;
                let mut out = Vec::with_capacity(LOGIN_FAILED_LEN);
                out.push(LOGIN_MSG_TYPE);
                out.push(LOGIN_FAILED);
                out.extend_from_slice(&encoded);
                Ok(out)
            }
        }
    }

    /// Parse a reply frame (client side).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(LoginError::MalformedFrame(constants::ERR_SHORT_FRAME));
        }
        if data[0] != LOGIN_MSG_TYPE {
            return Err(LoginError::MalformedFrame(constants::ERR_WRONG_TAG));
        }
        match data[1] {
            LOGGED_IN if data.len() == LOGGED_IN_LEN => {
                let mut id = [0u8; 4];
                id.copy_from_slice(&data[3..7]);
                Ok(LoginReply::LoggedIn {
                    kind: data[2],
                    user_id: u32::from_le_bytes(id),
                })
            }
            LOGIN_FAILED if data.len() == LOGIN_FAILED_LEN => {
                let mut reason = String::with_capacity(REASON_LEN);
                for (i, &byte) in data[2..].iter().enumerate() {
                    let c = charset::symbol(byte)
                        .ok_or(LoginError::InvalidCharacter { offset: i + 2, value: byte })?;
                    reason.push(c);
                }
                Ok(LoginReply::Failed { reason })
            }
            LOGGED_IN | LOGIN_FAILED => Err(LoginError::MalformedFrame(constants::ERR_WRONG_LENGTH)),
            _ => Err(LoginError::MalformedFrame(constants::ERR_WRONG_MARKER)),
        }
    }
}
