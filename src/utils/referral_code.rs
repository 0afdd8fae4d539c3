//! Deterministic `user id <-> referral code` mapping.
//!
//! A code is `PREFIX || pad6(user_id) || suffix4(user_id)`. The suffix is a
//! 16-bit polynomial hash of the id rendered in base 36, so any device can
//! produce the same code without asking the server. Decoding only checks the
//! grammar; whether the id belongs to a real user is decided downstream.

use crate::models::{referrals::ReferralCode, user::UserId};

pub const DEFAULT_CODE_PREFIX: &str = "DIVINE";

const ID_DIGITS: usize = 6;
const SUFFIX_LEN: usize = 4;
const MAX_ENCODABLE_ID: i64 = 999_999;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid referral code format")]
    MalformedCode,
    #[error("User id {0} does not fit in a referral code")]
    IdOutOfRange(i64),
    #[error("Referral code prefix must be non-empty ASCII letters, got {0:?}")]
    InvalidPrefix(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralCodec {
    prefix: String,
}

impl Default for ReferralCodec {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_CODE_PREFIX.to_string(),
        }
    }
}

impl ReferralCodec {
    pub fn new(prefix: &str) -> CodecResult<Self> {
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CodecError::InvalidPrefix(prefix.to_string()));
        }

        Ok(Self {
            prefix: prefix.to_ascii_uppercase(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn encode(&self, user_id: UserId) -> CodecResult<ReferralCode> {
        let id = user_id.get();
        if id > MAX_ENCODABLE_ID {
            return Err(CodecError::IdOutOfRange(id));
        }

        Ok(ReferralCode(format!(
            "{}{:0width$}{}",
            self.prefix,
            id,
            checksum_suffix(id),
            width = ID_DIGITS
        )))
    }

    /// Parses `^PREFIX\d{6}[A-Z0-9]{4}$`, case-insensitively and ignoring
    /// surrounding whitespace. The suffix is not re-verified against the id.
    pub fn decode(&self, code: &str) -> CodecResult<UserId> {
        let code = code.trim().to_ascii_uppercase();
        let rest = code.strip_prefix(&self.prefix).ok_or(CodecError::MalformedCode)?;

        if rest.len() != ID_DIGITS + SUFFIX_LEN || !rest.is_ascii() {
            return Err(CodecError::MalformedCode);
        }

        let (digits, suffix) = rest.split_at(ID_DIGITS);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::MalformedCode);
        }
        if !suffix.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return Err(CodecError::MalformedCode);
        }

        let id = digits.parse::<i64>().map_err(|_| CodecError::MalformedCode)?;
        UserId::new(id).map_err(|_| CodecError::MalformedCode)
    }
}

fn checksum_suffix(id: i64) -> String {
    let hash = id
        .to_string()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
        & 0xFFFF;

    let mut digits = [b'0'; SUFFIX_LEN];
    let mut remaining = hash;
    for slot in digits.iter_mut().rev() {
        *slot = BASE36[(remaining % 36) as usize];
        remaining /= 36;
    }

    // 0xFFFF is "1EKF" in base 36, so four digits always suffice.
    String::from_utf8_lossy(&digits).into_owned()
}
