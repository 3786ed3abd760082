//! User roles.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parse::ParseError;

/// Platform role.
///
/// Wire and storage format: the Spanish role name (`estudiante`, `docente`,
/// `administrador`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "estudiante")]
    Student,
    #[serde(rename = "docente")]
    Teacher,
    #[serde(rename = "administrador")]
    Administrator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::Administrator];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "estudiante",
            Self::Teacher => "docente",
            Self::Administrator => "administrador",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "estudiante" => Ok(Self::Student),
            "docente" => Ok(Self::Teacher),
            "administrador" => Ok(Self::Administrator),
            other => Err(ParseError::new("role", other)),
        }
    }
}

/// The canonical role set of a user: unordered membership, serialized as a
/// sorted, duplicate-free list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored representation of a role list.
    ///
    /// Accepts plain role names and the Postgres array literal form
    /// (`{estudiante,docente}`), which some drivers hand back as one string.
    pub fn parse_stored<I, S>(values: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for value in values {
            let raw = value.as_ref().trim();
            let inner = raw
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .unwrap_or(raw);
            for part in inner.split(',') {
                let name = part.trim().trim_matches('"');
                if name.is_empty() {
                    continue;
                }
                set.insert(name.parse::<Role>()?);
            }
        }
        Ok(Self(set))
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// `true` when at least one of `allowed` is held.
    pub fn intersects(&self, allowed: &[Role]) -> bool {
        allowed.iter().any(|r| self.0.contains(r))
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn remove(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Role> {
        self.iter().collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Role>> for RoleSet {
    fn from(roles: Vec<Role>) -> Self {
        roles.into_iter().collect()
    }
}
