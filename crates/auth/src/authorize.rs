use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use stockroom_core::UserId;

use crate::catalog::PermissionCatalog;
use crate::{Role, RoleRequirement, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Role check for the (possibly absent) current user.
///
/// - No IO
/// - No panics
/// - Always `false` without a user
pub fn has_role(user: Option<&User>, required: impl Into<RoleRequirement>) -> bool {
    let Some(user) = user else {
        return false;
    };
    required.into().admits(&user.role)
}

/// Catalog check for the (possibly absent) current user.
pub fn can(user: Option<&User>, action: &str) -> bool {
    user.is_some_and(|u| PermissionCatalog::global().allows(&u.role, action))
}

/// [`can`] in `Result` form, for call sites that want to use `?`.
pub fn authorize(user: Option<&User>, action: &str) -> Result<(), AuthzError> {
    let user = user.ok_or(AuthzError::Unauthenticated)?;
    if PermissionCatalog::global().allows(&user.role, action) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(action.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Why a UI gate was opened or kept closed, for debugging screens and logs.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// The action that was being checked.
    pub action: String,

    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// `None` when nobody is signed in.
    pub subject: Option<SubjectState>,

    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectState {
    pub user_id: UserId,
    pub role: String,
    pub role_recognized: bool,
    pub effective_permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    MissingPermission,
}

/// Explain the outcome of [`can`] for `user` and `action`.
pub fn explain_authorization(user: Option<&User>, action: &str) -> AuthorizationExplanation {
    let catalog = PermissionCatalog::global();

    let Some(user) = user else {
        return AuthorizationExplanation {
            action: action.to_string(),
            granted: false,
            reason: "No user is signed in".to_string(),
            subject: None,
            denial_reason: Some(DenialReason {
                kind: DenialKind::Unauthenticated,
                message: "Authorization requires an authenticated session".to_string(),
                suggestions: vec!["Sign in and try again".to_string()],
            }),
        };
    };

    let mut effective: Vec<String> = catalog
        .permissions_for(&user.role)
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();
    effective.sort();

    let subject = SubjectState {
        user_id: user.id.clone(),
        role: user.role.as_str().to_string(),
        role_recognized: user.role.is_recognized(),
        effective_permissions: effective.clone(),
    };

    if catalog.allows(&user.role, action) {
        return AuthorizationExplanation {
            action: action.to_string(),
            granted: true,
            reason: format!("Role '{}' grants '{}'", user.role, action),
            subject: Some(subject),
            denial_reason: None,
        };
    }

    let granting = catalog.roles_granting(action);
    let mut suggestions = Vec::new();
    if granting.is_empty() {
        suggestions.push(format!("No role grants '{}'; check the action name", action));
    } else {
        let names: Vec<&str> = granting.iter().map(|r| r.as_str()).collect();
        suggestions.push(format!(
            "Ask an administrator for one of these roles: {}",
            names.join(", ")
        ));
    }
    if !user.role.is_recognized() {
        suggestions.push(format!(
            "Role '{}' is not recognized by this client and grants nothing",
            user.role
        ));
    }

    AuthorizationExplanation {
        action: action.to_string(),
        granted: false,
        reason: format!(
            "Role '{}' does not grant '{}'. Current permissions: {:?}",
            user.role, action, effective
        ),
        subject: Some(subject),
        denial_reason: Some(DenialReason {
            kind: DenialKind::MissingPermission,
            message: format!("Missing required permission: '{}'", action),
            suggestions,
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry (audit/display)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: String,
    pub permissions: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub name: String,
    pub category: String,
    pub granted_to: Vec<String>,
}

/// Complete view of roles and actions, for admin screens.
#[derive(Debug, Clone, Serialize)]
pub struct RbacRegistry {
    pub roles: HashMap<String, RoleDefinition>,
    pub permissions: HashMap<String, PermissionDefinition>,
}

impl RbacRegistry {
    pub fn from_catalog(catalog: &PermissionCatalog) -> Self {
        let mut roles = HashMap::new();
        for role in Role::KNOWN {
            let mut perms: Vec<String> = catalog
                .permissions_for(role)
                .iter()
                .map(|p| p.as_str().to_string())
                .collect();
            perms.sort();
            roles.insert(
                role.as_str().to_string(),
                RoleDefinition {
                    name: role.as_str().to_string(),
                    permissions: perms,
                    description: role_description(role),
                },
            );
        }

        let permissions = catalog
            .all_permissions()
            .into_iter()
            .map(|perm| {
                let granted_to = catalog
                    .roles_granting(perm.as_str())
                    .iter()
                    .map(|r| r.as_str().to_string())
                    .collect();
                let def = PermissionDefinition {
                    name: perm.as_str().to_string(),
                    category: perm.category().to_string(),
                    granted_to,
                };
                (def.name.clone(), def)
            })
            .collect();

        Self { roles, permissions }
    }
}

fn role_description(role: &Role) -> Option<String> {
    match role {
        Role::Admin => Some("Full administrator, including users and warehouses".to_string()),
        Role::Manager => Some("Runs stock operations and reporting".to_string()),
        Role::Staff => Some("Floor staff handling picking, packing and tasks".to_string()),
        Role::Warehouse => Some("Default role for accounts without an assigned role".to_string()),
        Role::Unrecognized(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn manager() -> User {
        User::new(1u64, "A", "a@x.com", Role::Manager)
    }

    #[test]
    fn has_role_is_false_without_user() {
        assert!(!has_role(None, Role::Admin));
        assert!(!has_role(None, ["admin", "manager", "staff", "warehouse"]));
    }

    #[test]
    fn has_role_single_and_set() {
        let user = manager();
        assert!(has_role(Some(&user), Role::Manager));
        assert!(has_role(Some(&user), ["admin", "manager"]));
        assert!(!has_role(Some(&user), "admin"));
        assert!(!has_role(Some(&user), vec![Role::Staff, Role::Warehouse]));
    }

    #[test]
    fn can_follows_catalog() {
        let user = manager();
        assert!(can(Some(&user), "manage_products"));
        assert!(!can(Some(&user), "manage_users"));
        assert!(!can(None, "manage_products"));
    }

    #[test]
    fn authorize_reports_kind_of_failure() {
        let user = manager();
        assert_eq!(authorize(Some(&user), "view_reports"), Ok(()));
        assert_eq!(
            authorize(Some(&user), "manage_users"),
            Err(AuthzError::Forbidden("manage_users".to_string()))
        );
        assert_eq!(authorize(None, "view_reports"), Err(AuthzError::Unauthenticated));
    }

    #[test]
    fn explanation_for_missing_permission_suggests_roles() {
        let user = manager();
        let explained = explain_authorization(Some(&user), "manage_users");
        assert!(!explained.granted);
        let denial = explained.denial_reason.unwrap();
        assert_eq!(denial.kind, DenialKind::MissingPermission);
        assert!(denial.suggestions[0].contains("admin"));
        assert_eq!(explained.subject.unwrap().role, "manager");
    }

    #[test]
    fn explanation_without_user() {
        let explained = explain_authorization(None, "view_tasks");
        assert!(!explained.granted);
        assert!(explained.subject.is_none());
        assert_eq!(explained.denial_reason.unwrap().kind, DenialKind::Unauthenticated);
    }

    #[test]
    fn explanation_for_granted_action() {
        let staff = User::new(2u64, "S", "s@x.com", Role::Staff);
        let explained = explain_authorization(Some(&staff), "perform_picking");
        assert!(explained.granted);
        assert!(explained.denial_reason.is_none());
    }

    #[test]
    fn registry_lists_every_known_role() {
        let registry = RbacRegistry::from_catalog(PermissionCatalog::global());
        assert_eq!(registry.roles.len(), 4);
        assert!(registry.roles["warehouse"].permissions.is_empty());
        assert_eq!(registry.permissions["view_reports"].category, "view");
        assert_eq!(
            registry.permissions["manage_users"].granted_to,
            vec!["admin".to_string()]
        );
    }

    fn any_known_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::KNOWN.to_vec())
    }

    proptest! {
        /// Property: a user always has its own role, alone or inside any set.
        #[test]
        fn has_role_is_reflexive(
            role in any_known_role(),
            others in prop::collection::vec(any_known_role(), 0..4),
        ) {
            let user = User::new(9u64, "P", "p@x.com", role.clone());
            prop_assert!(has_role(Some(&user), role.clone()));

            let mut set = others.clone();
            set.push(role.clone());
            prop_assert!(has_role(Some(&user), set));

            let without: Vec<Role> = others.into_iter().filter(|r| *r != role).collect();
            prop_assert!(!has_role(Some(&user), without));
        }
    }
}
