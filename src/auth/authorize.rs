use crate::auth::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Exact-string membership of `required` in the identity's role.
///
/// No wildcards, no hierarchy. An identity without a role is denied
/// everything.
pub fn authorize(identity: &Identity, required: &str) -> Decision {
    match &identity.role {
        Some(role) if role.permissions.iter().any(|p| p == required) => Decision::Allow,
        _ => Decision::Deny,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::auth::permissions;
    use crate::models::Role;

    fn identity_with(permissions: Option<Vec<&str>>) -> Identity {
        Identity {
            user_id: Uuid::now_v7(),
            name: "Tester".to_string(),
            email: "tester@example.com".to_string(),
            role: permissions.map(|perms| Role {
                id: Uuid::now_v7(),
                name: "Custom".to_string(),
                permissions: perms.into_iter().map(String::from).collect(),
                description: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }),
        }
    }

    #[test]
    fn allow_iff_permission_is_held() {
        // every subset of a small slice of the registry against every permission
        let pool = &permissions::ALL[..5];
        for mask in 0u32..(1 << pool.len()) {
            let held: Vec<&str> = pool
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, p)| *p)
                .collect();
            let identity = identity_with(Some(held.clone()));

            for required in permissions::ALL {
                let expected = if held.contains(required) {
                    Decision::Allow
                } else {
                    Decision::Deny
                };
                assert_eq!(authorize(&identity, required), expected, "{held:?} vs {required}");
            }
        }
    }

    #[test]
    fn missing_role_is_denied() {
        let identity = identity_with(None);
        for required in permissions::ALL {
            assert_eq!(authorize(&identity, required), Decision::Deny);
        }
    }

    #[test]
    fn no_prefix_or_case_matching() {
        let identity = identity_with(Some(vec!["manage_stock"]));
        assert_eq!(authorize(&identity, "manage"), Decision::Deny);
        assert_eq!(authorize(&identity, "MANAGE_STOCK"), Decision::Deny);
        assert_eq!(authorize(&identity, "*"), Decision::Deny);
        assert_eq!(authorize(&identity, "manage_stock"), Decision::Allow);
    }
}
