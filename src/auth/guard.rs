use tracing::debug;

use crate::auth::service::{AuthError, AuthService};
use crate::database::models::{user, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Any valid token.
    Authenticated,
    EditorOrAdmin,
    Admin,
}

impl AccessLevel {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            AccessLevel::Authenticated | AccessLevel::EditorOrAdmin => matches!(role, Role::Admin | Role::Editor),
            AccessLevel::Admin => role == Role::Admin,
        }
    }
}

/// Identity of an authorized caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

/// Verify `token` and authorize it for `level`.
///
/// A token whose embedded role falls short is checked again against the
/// stored role, so promotions since issuance take effect immediately.
pub async fn require_role(auth: &AuthService, token: &str, level: AccessLevel) -> Result<Principal, AuthError> {
    let claims = auth.verify(token)?;
    if level.allows(claims.role) {
        return Ok(Principal {
            id: claims.id,
            role: claims.role,
        });
    }

    let Some(stored) = user::find_by_id(auth.store(), claims.id).await? else {
        debug!("Token subject {} no longer exists", claims.id);
        return Err(AuthError::InvalidToken);
    };

    if level.allows(stored.role) {
        debug!("User {} authorized by refreshed role {}", stored.id, stored.role);
        Ok(Principal {
            id: stored.id,
            role: stored.role,
        })
    } else {
        debug!("User {} with role {} denied {:?}", stored.id, stored.role, level);
        Err(AuthError::Forbidden)
    }
}
