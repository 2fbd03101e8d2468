//! The closed role set and the single authorization decision function.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::tokens::Claims;

/// A user's role. Stored on the user record, carried in token claims, and
/// displayed next to chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    User,
    /// Assigned to chat connections that present no credential. Never
    /// stored on a user record and never permitted by `authorize`.
    Guest,
}

/// Roles allowed to call mutating REST endpoints.
pub const STAFF: &[Role] = &[Role::Admin, Role::Moderator];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
            Role::Guest => "guest",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            "guest" => Ok(Role::Guest),
            _ => Err(()),
        }
    }
}

/// Decide whether the caller may perform an action requiring one of
/// `required`.
///
/// REST handlers call this before mutating operations and deny outright on
/// `false`. The chat gateway deliberately does NOT call this at handshake
/// time: a missing credential downgrades the connection to Guest instead of
/// rejecting it.
pub fn authorize(claims: Option<&Claims>, required: &[Role]) -> bool {
    match claims {
        Some(claims) => required.contains(&claims.role),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::Claims;

    fn claims_with_role(role: Role) -> Claims {
        Claims {
            sub: "usr_test".to_string(),
            name: "tester".to_string(),
            role,
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn staff_roles_are_authorized() {
        assert!(authorize(Some(&claims_with_role(Role::Admin)), STAFF));
        assert!(authorize(Some(&claims_with_role(Role::Moderator)), STAFF));
    }

    #[test]
    fn plain_user_and_guest_are_denied() {
        assert!(!authorize(Some(&claims_with_role(Role::User)), STAFF));
        assert!(!authorize(Some(&claims_with_role(Role::Guest)), STAFF));
    }

    #[test]
    fn absent_claims_are_denied() {
        assert!(!authorize(None, STAFF));
        assert!(!authorize(None, &[Role::User]));
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::Moderator, Role::User, Role::Guest] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("owner".parse::<Role>().is_err());
    }
}
