//! Role matrix for incident operations.

use flood_watch_user_models::Role;

use crate::{AuthError, Claims};

/// An operation gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReportIncident,
    ViewIncidents,
    /// Changing title, description, location, priority, status,
    /// instructions, or notes. Commanders additionally need to be the
    /// incident's assigned commander; that check needs the incident and is
    /// made by the caller.
    UpdateIncident,
    AssignCommander,
    DeleteIncident,
    AddRescueStep,
    UpdateRescueStep,
    ListUsers,
}

const ANY_ROLE: &[Role] = Role::all();

impl Operation {
    /// Roles allowed to perform this operation.
    #[must_use]
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::ReportIncident | Self::ViewIncidents | Self::ListUsers => ANY_ROLE,
            Self::UpdateIncident => &[Role::Coordinator, Role::Official, Role::Commander],
            Self::AssignCommander => &[Role::Coordinator, Role::Official],
            Self::DeleteIncident => &[Role::Official, Role::Commander],
            Self::AddRescueStep => &[Role::Coordinator, Role::Commander],
            Self::UpdateRescueStep => &[Role::Coordinator, Role::Commander, Role::Responder],
        }
    }

    #[must_use]
    pub fn permits(self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Fails with [`AuthError::Forbidden`] unless the caller's role is in
/// `allowed`.
///
/// # Errors
///
/// Returns [`AuthError::Forbidden`] if the role is not allowed.
pub fn authorize(claims: &Claims, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        log::debug!(
            "Denied {} ({}) with role {}",
            claims.username,
            claims.id,
            claims.role
        );
        Err(AuthError::Forbidden)
    }
}
