//! Department value object.
//!
//! # Invariants
//! - Identity and equality are defined by `code` alone.
//! - A department is immutable once constructed; re-registration replaces
//!   the registry entry instead of mutating it.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Short unique department identifier, e.g. `FIN`.
pub type DepartmentCode = String;

/// Organizational unit that can own documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    /// Stable identifier used by documents and transfer records.
    pub code: DepartmentCode,
    /// Display name for presentation layers.
    pub name: String,
}

impl Department {
    pub fn new(code: impl Into<DepartmentCode>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for Department {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Department {}

impl Hash for Department {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl Display for Department {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}
