//! Roles and the fine-grained permission set a group's admins draw from (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumIter, EnumString};

/// The closed permission set a [`Role`] can grant.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    AddUser,
    RemoveUser,
    EditMetadata,
    AddPermission,
    RemovePermission,
    DeleteEvent,
    EditGroupStatus,
    DeleteGroup,
}

/// A named bundle of permissions. Groups reference roles by name; the
/// catalog itself is owned by the `Group` (§9's "arena+identifier" note) so
/// members never hold a reference into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: HashSet<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// The sentinel ordinary-member role: present by name but grants nothing.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: HashSet::new(),
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// The conventional "Admin" role every default catalog ships with, holding
/// every permission. Not a language-level sentinel — just a role whose name
/// admins agree to treat as "full admin" by convention.
pub fn full_admin_role() -> Role {
    use strum::IntoEnumIterator;
    Role::new("admin", Permission::iter())
}

/// The ordinary-member sentinel: an empty role set denotes no admin powers (§3).
pub fn member_role() -> Role {
    Role::empty("member")
}

/// Resolve role names (as carried on a `p` tag, §4.1) against a group's
/// catalog. Unknown names map to the empty role set rather than erroring —
/// the Action Codec never fails on an unrecognized role name.
pub fn resolve_roles<'a>(catalog: &'a [Role], names: impl IntoIterator<Item = &'a str>) -> Vec<Role> {
    names
        .into_iter()
        .map(|name| {
            catalog
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(name))
                .cloned()
                .unwrap_or_else(|| Role::empty(name))
        })
        .collect()
}

/// The permission union of a set of resolved roles (I4: derived solely from
/// roles present in `group.members[author]`).
pub fn union_permissions<'a>(roles: impl IntoIterator<Item = &'a Role>) -> HashSet<Permission> {
    let mut set = HashSet::new();
    for role in roles {
        set.extend(role.permissions.iter().copied());
    }
    set
}
