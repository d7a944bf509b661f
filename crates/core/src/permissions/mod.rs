//! Role-based access to application features

use crate::models::Role;

/// Features a session may be allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ViewDashboard,
    ViewMenu,
    ManageInventory,
    ViewAnalytics,
    ViewOwnAttendance,

    // Manager only
    ManageEmployees,
    EditSettings,
}

impl Capability {
    pub fn all() -> &'static [Capability] {
        &[
            Capability::ViewDashboard,
            Capability::ViewMenu,
            Capability::ManageInventory,
            Capability::ViewAnalytics,
            Capability::ViewOwnAttendance,
            Capability::ManageEmployees,
            Capability::EditSettings,
        ]
    }
}

/// Permission matrix for staff roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role may use a capability
    pub fn can_perform(role: Role, capability: Capability) -> bool {
        match role {
            Role::Manager => true,
            Role::Employee => !matches!(
                capability,
                Capability::ManageEmployees | Capability::EditSettings
            ),
            // Accounts without a role see nothing until a manager assigns one
            Role::None => false,
        }
    }
}
