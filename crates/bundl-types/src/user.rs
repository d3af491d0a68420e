//! User identity record.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// A verified user, owned by the credit ledger (credits) and the identity
/// subsystem (phone/push fields, out of scope for this crate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub phone_number: String,
    pub push_token: Option<String>,
    pub credits: i64,
}

impl User {
    #[must_use]
    pub fn new(phone_number: impl Into<String>, starting_credits: i64) -> Self {
        Self {
            id: UserId::new(),
            phone_number: phone_number.into(),
            push_token: None,
            credits: starting_credits,
        }
    }

    #[must_use]
    pub fn has_push_token(&self) -> bool {
        self.push_token.is_some()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl User {
    /// A freshly-verified user with no push token, for use in tests.
    /// The phone number is derived from a fresh [`UserId`] so repeated calls
    /// never collide on the `phone_number UNIQUE` constraint.
    pub fn dummy(starting_credits: i64) -> Self {
        let id = UserId::new();
        let digits: String = id.0.simple().to_string().chars().take(10).collect();
        Self::new(format!("+1{digits}"), starting_credits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_no_push_token() {
        let user = User::new("+15551234567", 5);
        assert!(!user.has_push_token());
        assert_eq!(user.credits, 5);
    }

    #[test]
    fn serde_roundtrip() {
        let mut user = User::new("+15551234567", 5);
        user.push_token = Some("apns:token".to_string());
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back.phone_number, user.phone_number);
        assert_eq!(back.push_token, user.push_token);
        assert_eq!(back.credits, user.credits);
    }
}
