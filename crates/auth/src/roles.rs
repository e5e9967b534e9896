use serde::{Deserialize, Serialize};

/// Role assigned to a user.
///
/// The known roles form a closed set. Values the identity service sends that
/// are not in it are kept verbatim as [`Role::Unrecognized`] so they can be
/// logged, but they never grant anything. An empty or missing role resolves to
/// [`Role::Warehouse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    #[default]
    Warehouse,
    Unrecognized(String),
}

impl Role {
    /// Every known role, in catalog order.
    pub const KNOWN: &'static [Role] = &[Role::Admin, Role::Manager, Role::Staff, Role::Warehouse];

    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "" | "warehouse" => Role::Warehouse,
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            "staff" => Role::Staff,
            other => Role::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::Warehouse => "warehouse",
            Role::Unrecognized(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Role::Unrecognized(_))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::parse(value)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Option<String>> for Role {
    fn from(value: Option<String>) -> Self {
        value.map(Role::from).unwrap_or_default()
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::Unrecognized(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Roles a screen or action accepts: a single role or any of a set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleRequirement {
    roles: Vec<Role>,
}

impl RoleRequirement {
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// An empty requirement places no restriction on the role.
    pub fn is_unrestricted(&self) -> bool {
        self.roles.is_empty()
    }

    /// True iff `role` equals the required role or is a member of the set.
    pub fn admits(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<Role> for RoleRequirement {
    fn from(value: Role) -> Self {
        Self { roles: vec![value] }
    }
}

impl From<&Role> for RoleRequirement {
    fn from(value: &Role) -> Self {
        Self {
            roles: vec![value.clone()],
        }
    }
}

impl From<&str> for RoleRequirement {
    fn from(value: &str) -> Self {
        Self::from(Role::parse(value))
    }
}

impl From<Vec<Role>> for RoleRequirement {
    fn from(roles: Vec<Role>) -> Self {
        Self { roles }
    }
}

impl From<&[Role]> for RoleRequirement {
    fn from(roles: &[Role]) -> Self {
        Self {
            roles: roles.to_vec(),
        }
    }
}

impl<const N: usize> From<[Role; N]> for RoleRequirement {
    fn from(roles: [Role; N]) -> Self {
        Self::any_of(roles)
    }
}

impl<const N: usize> From<[&str; N]> for RoleRequirement {
    fn from(names: [&str; N]) -> Self {
        Self::any_of(names.into_iter().map(Role::parse))
    }
}
