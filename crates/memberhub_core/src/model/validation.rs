//! Model-level validation rules and errors.

use crate::model::member::MemberId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.@-]{2,31}$").expect("username pattern is valid")
});
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{6,20}$").expect("phone pattern is valid"));
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Precondition violations raised before any store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidUsername(String),
    /// Another member already uses this login name.
    UsernameTaken(String),
    InvalidPhone(String),
    InvalidEmail(String),
    /// Satellite or history record without a positive owning member id.
    MissingOwner(&'static str),
    /// Bank info is locked and cannot change through the save path.
    BankInfoLocked(MemberId),
    /// Address exists but belongs to a different member.
    AddressOwnerMismatch { address_id: i64, member_id: MemberId },
    /// Level requires a non-empty name.
    EmptyLevelName,
    /// Buyer group requires a non-empty name.
    EmptyGroupName,
    /// Balance info is addressed by its trade number.
    EmptyTradeNo,
    /// Another balance info already uses this trade number.
    TradeNoTaken(String),
    /// No member exists under this id.
    UnknownMember(MemberId),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUsername(value) => write!(f, "invalid username `{value}`"),
            Self::UsernameTaken(value) => write!(f, "username `{value}` is already taken"),
            Self::InvalidPhone(value) => write!(f, "invalid phone `{value}`"),
            Self::InvalidEmail(value) => write!(f, "invalid email `{value}`"),
            Self::MissingOwner(kind) => write!(f, "{kind} requires an owning member id"),
            Self::BankInfoLocked(member_id) => {
                write!(f, "bank info of member {member_id} is locked")
            }
            Self::AddressOwnerMismatch {
                address_id,
                member_id,
            } => write!(
                f,
                "address {address_id} does not belong to member {member_id}"
            ),
            Self::EmptyLevelName => write!(f, "level name cannot be empty"),
            Self::EmptyGroupName => write!(f, "buyer group name cannot be empty"),
            Self::EmptyTradeNo => write!(f, "trade number cannot be empty"),
            Self::TradeNoTaken(value) => write!(f, "trade number `{value}` is already used"),
            Self::UnknownMember(member_id) => write!(f, "member {member_id} does not exist"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn check_username(value: &str) -> Result<(), ValidationError> {
    if USERNAME_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUsername(value.to_string()))
    }
}

/// Empty phone means "not provided" and is accepted.
pub(crate) fn check_phone(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || PHONE_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone(value.to_string()))
    }
}

/// Empty email means "not provided" and is accepted.
pub(crate) fn check_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || EMAIL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(value.to_string()))
    }
}

pub(crate) fn check_owner(member_id: MemberId, kind: &'static str) -> Result<(), ValidationError> {
    if member_id > 0 {
        Ok(())
    } else {
        Err(ValidationError::MissingOwner(kind))
    }
}
