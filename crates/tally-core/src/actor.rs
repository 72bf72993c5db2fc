//! # Actor
//!
//! The authenticated caller as the engine sees it. Identity is issued by the
//! auth collaborator; this crate only checks the capabilities it carries.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Who is performing an operation.
///
/// ## Capabilities
/// ```text
/// is_active = false   → can do nothing that writes
/// is_auditor          → read every report, never transact
/// is_superuser        → administrator: close/reconcile any shift, delete sales
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_auditor: bool,
}

impl Actor {
    /// An active cashier with no extra capabilities.
    pub fn cashier(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            name: name.into(),
            is_active: true,
            is_superuser: false,
            is_auditor: false,
        }
    }

    /// An active administrator.
    pub fn administrator(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Actor {
            is_superuser: true,
            ..Actor::cashier(user_id, name)
        }
    }

    /// Administrators and auditors see every cashier's records.
    pub fn can_view_all(&self) -> bool {
        self.is_superuser || self.is_auditor
    }

    /// Selling and till operations need an active, non-auditor account.
    pub fn ensure_can_transact(&self) -> CoreResult<()> {
        if !self.is_active {
            return Err(CoreError::forbidden("inactive users cannot perform transactions"));
        }
        if self.is_auditor {
            return Err(CoreError::forbidden(
                "auditors have read-only access and cannot perform transactions",
            ));
        }
        Ok(())
    }

    pub fn ensure_admin(&self) -> CoreResult<()> {
        if self.is_superuser && self.is_active {
            Ok(())
        } else {
            Err(CoreError::forbidden("administrator privileges required"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transact_capabilities() {
        assert!(Actor::cashier("u1", "Ann").ensure_can_transact().is_ok());

        let inactive = Actor {
            is_active: false,
            ..Actor::cashier("u1", "Ann")
        };
        assert!(inactive.ensure_can_transact().is_err());

        let auditor = Actor {
            is_auditor: true,
            ..Actor::cashier("u2", "Audit")
        };
        assert!(auditor.ensure_can_transact().is_err());
        assert!(auditor.can_view_all());
    }

    #[test]
    fn test_admin_check() {
        assert!(Actor::administrator("a1", "Boss").ensure_admin().is_ok());
        assert!(Actor::cashier("u1", "Ann").ensure_admin().is_err());
    }
}
