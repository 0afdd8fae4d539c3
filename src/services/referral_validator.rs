use crate::{models::user::UserId, utils::referral_code::ReferralCodec};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Referral code is required")]
    Required,
    #[error("Invalid referral code format")]
    MalformedCode,
    #[error("Cannot refer yourself")]
    SelfReferral,
}

/// `Ok` carries the referrer id decoded from the code.
pub type ValidationResult = Result<UserId, ValidationError>;

/// Side-effect-free gate in front of every referral mutation. Format rules
/// live in [`ReferralCodec`] and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct ReferralValidator {
    codec: ReferralCodec,
}

impl ReferralValidator {
    pub fn new(codec: ReferralCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &ReferralCodec {
        &self.codec
    }

    pub fn validate(&self, code: &str, current_user_id: UserId) -> ValidationResult {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::Required);
        }

        let referrer_id = self
            .codec
            .decode(code)
            .map_err(|_| ValidationError::MalformedCode)?;

        if referrer_id == current_user_id {
            return Err(ValidationError::SelfReferral);
        }

        Ok(referrer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn test_blank_code_is_required() {
        let validator = ReferralValidator::default();

        assert_eq!(validator.validate("", uid(1)), Err(ValidationError::Required));
        assert_eq!(validator.validate("   \t", uid(1)), Err(ValidationError::Required));
    }

    #[test]
    fn test_malformed_code() {
        let validator = ReferralValidator::default();

        assert_eq!(
            validator.validate("HELLO", uid(1)),
            Err(ValidationError::MalformedCode)
        );
        assert_eq!(
            ValidationError::MalformedCode.to_string(),
            "Invalid referral code format"
        );
    }

    #[test]
    fn test_own_code_is_always_rejected() {
        let validator = ReferralValidator::default();

        for id in [1, 3003, 123_456, 999_999] {
            let code = validator.codec().encode(uid(id)).unwrap();
            assert_eq!(
                validator.validate(code.as_str(), uid(id)),
                Err(ValidationError::SelfReferral)
            );
        }
    }

    #[test]
    fn test_valid_code_yields_referrer() {
        let validator = ReferralValidator::default();
        let code = validator.codec().encode(uid(1001)).unwrap();

        assert_eq!(validator.validate(code.as_str(), uid(2002)), Ok(uid(1001)));
        assert_eq!(
            validator.validate(&format!("  {}  ", code.as_str().to_lowercase()), uid(2002)),
            Ok(uid(1001))
        );
    }
}
