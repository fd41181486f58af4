//! Role-derived capabilities
//!
//! Every feature gate in the admin consults a [`CapabilitySet`] derived from the
//! signed-in profile's role. Derivation is a pure function of [`Role`]; nothing
//! caches a role or a capability set between calls.
//!
//! | Capability        | admin | editor | viewer |
//! |-------------------|:-----:|:------:|:------:|
//! | manage users      |   ✓   |        |        |
//! | manage screens    |   ✓   |        |        |
//! | manage content    |   ✓   |   ✓    |        |
//! | manage playlists  |   ✓   |   ✓    |        |
//! | manage schedules  |   ✓   |   ✓    |        |
//! | view reports      |   ✓   |   ✓    |   ✓    |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::tenant::Role;

/// An action gated by role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageUsers,
    ManageScreens,
    ManageContent,
    ManagePlaylists,
    ManageSchedules,
    ViewReports,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::ManageUsers,
        Capability::ManageScreens,
        Capability::ManageContent,
        Capability::ManagePlaylists,
        Capability::ManageSchedules,
        Capability::ViewReports,
    ];

    /// The least privileged role that holds this capability.
    pub fn minimum_role(&self) -> Role {
        match self {
            Capability::ManageUsers | Capability::ManageScreens => Role::Admin,
            Capability::ManageContent
            | Capability::ManagePlaylists
            | Capability::ManageSchedules => Role::Editor,
            Capability::ViewReports => Role::Viewer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageUsers => "manage_users",
            Capability::ManageScreens => "manage_screens",
            Capability::ManageContent => "manage_content",
            Capability::ManagePlaylists => "manage_playlists",
            Capability::ManageSchedules => "manage_schedules",
            Capability::ViewReports => "view_reports",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of capabilities held by a role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// The empty set, held by a session with no profile.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_superset(&self, other: &CapabilitySet) -> bool {
        self.0.is_superset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn can_manage_users(&self) -> bool {
        self.contains(Capability::ManageUsers)
    }

    pub fn can_manage_screens(&self) -> bool {
        self.contains(Capability::ManageScreens)
    }

    pub fn can_manage_content(&self) -> bool {
        self.contains(Capability::ManageContent)
    }

    pub fn can_manage_playlists(&self) -> bool {
        self.contains(Capability::ManagePlaylists)
    }

    pub fn can_manage_schedules(&self) -> bool {
        self.contains(Capability::ManageSchedules)
    }

    pub fn can_view_reports(&self) -> bool {
        self.contains(Capability::ViewReports)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Derive the capability set for a role.
///
/// ```
/// use marquee::{Capability, Role, capabilities_for};
///
/// let editor = capabilities_for(Role::Editor);
/// assert!(editor.contains(Capability::ManagePlaylists));
/// assert!(!editor.contains(Capability::ManageScreens));
/// ```
pub fn capabilities_for(role: Role) -> CapabilitySet {
    Capability::ALL
        .into_iter()
        .filter(|capability| role >= capability.minimum_role())
        .collect()
}
