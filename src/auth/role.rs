use super::{AuthError, Identity, Role};

/// Strict role equality; `User` never satisfies an `Admin` requirement and vice versa.
pub fn authorize(identity: &Identity, required_role: Role) -> Result<(), AuthError> {
    if identity.role == required_role {
        Ok(())
    } else {
        tracing::warn!("Role check failed: user {} has role '{}', '{}' required", identity.id, identity.role, required_role);
        Err(AuthError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn identity(role: Role) -> Identity {
        Identity { id: Uuid::new_v4(), role, pin_hash: None }
    }

    #[test]
    fn admin_passes_admin_check() {
        assert_eq!(authorize(&identity(Role::Admin), Role::Admin), Ok(()));
    }

    #[test]
    fn user_is_forbidden_from_admin_check() {
        assert_eq!(authorize(&identity(Role::User), Role::Admin), Err(AuthError::Forbidden));
    }

    #[test]
    fn comparison_is_not_hierarchical() {
        assert_eq!(authorize(&identity(Role::Admin), Role::User), Err(AuthError::Forbidden));
    }
}
