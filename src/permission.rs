//! Permission module using Casbin
//!
//! Role-based access: every portal role maps to a fixed set of permissions,
//! loaded into an in-memory Casbin enforcer at startup.

use casbin::{CoreApi, DefaultModel, Enforcer, MgmtApi};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::entity::user::Role;

/// Permission constants
pub mod perm {
    /// Maintain own applicant profile and apply for jobs
    pub const PROFILE: &str = "profile";
    /// Publish and close job adverts
    pub const JOBS: &str = "jobs";
    /// Shortlist, reject and hire applicants
    pub const APPLICATIONS: &str = "applications";
    /// Users, departments and employees
    pub const PEOPLE: &str = "people";
    /// File own DIAL declarations
    pub const DIAL: &str = "dial";
    /// Review, approve and lock DIAL declarations
    pub const DIAL_REVIEW: &str = "dial_review";
    /// Raise transactions, vouchers and imprest
    pub const ACCOUNTS: &str = "accounts";
    /// Approve expenditure against an A.I.E
    pub const AIE: &str = "aie";
    /// Read the audit trail
    pub const AUDIT: &str = "audit";

    /// All permissions
    pub const ALL: [&str; 9] = [
        PROFILE,
        JOBS,
        APPLICATIONS,
        PEOPLE,
        DIAL,
        DIAL_REVIEW,
        ACCOUNTS,
        AIE,
        AUDIT,
    ];
}

/// Action constants
pub mod action {
    pub const ACCESS: &str = "access";
}

const MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = r.sub == p.sub && r.obj == p.obj && r.act == p.act
"#;

/// Default permission matrix
pub fn role_permissions(role: Role) -> &'static [&'static str] {
    match role {
        Role::Applicant => &[perm::PROFILE],
        Role::Admin => &[
            perm::JOBS,
            perm::APPLICATIONS,
            perm::PEOPLE,
            perm::DIAL,
            perm::DIAL_REVIEW,
            perm::AUDIT,
        ],
        Role::Board => &[perm::APPLICATIONS, perm::DIAL],
        Role::Accountant => &[perm::ACCOUNTS, perm::DIAL],
        Role::AieHolder => &[perm::AIE, perm::DIAL],
        Role::Officer => &[perm::DIAL],
    }
}

/// Permission enforcer wrapper
#[derive(Clone)]
pub struct PermissionEnforcer {
    enforcer: Arc<RwLock<Enforcer>>,
}

impl PermissionEnforcer {
    /// Create an enforcer seeded with the default role matrix
    pub async fn new() -> anyhow::Result<Self> {
        let model = DefaultModel::from_str(MODEL).await?;
        let enforcer = Enforcer::new(model, ()).await?;

        let perm_enforcer = Self {
            enforcer: Arc::new(RwLock::new(enforcer)),
        };
        perm_enforcer.load_policies().await?;

        Ok(perm_enforcer)
    }

    /// Load the role matrix into the enforcer
    pub async fn load_policies(&self) -> anyhow::Result<()> {
        let mut enforcer = self.enforcer.write().await;
        enforcer.clear_policy().await?;

        for role in Role::ALL {
            for permission in role_permissions(role) {
                enforcer
                    .add_policy(vec![
                        role.as_str().to_string(),
                        permission.to_string(),
                        action::ACCESS.to_string(),
                    ])
                    .await?;
            }
        }

        Ok(())
    }

    /// Get all permissions held by a role
    pub async fn get_role_permissions(&self, role: &str) -> Vec<String> {
        let enforcer = self.enforcer.read().await;
        let mut permissions = Vec::new();

        for perm in perm::ALL {
            if enforcer.enforce((role, perm, action::ACCESS)).unwrap_or(false) {
                permissions.push(perm.to_string());
            }
        }

        permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matrix_is_enforced() {
        let enforcer = PermissionEnforcer::new().await.unwrap();

        let holds = |perms: Vec<String>, p: &str| perms.iter().any(|held| held == p);

        assert!(holds(enforcer.get_role_permissions("admin").await, perm::AUDIT));
        assert!(holds(enforcer.get_role_permissions("aie_holder").await, perm::AIE));
        assert!(!holds(enforcer.get_role_permissions("applicant").await, perm::DIAL));
        assert!(!holds(enforcer.get_role_permissions("accountant").await, perm::AIE));
        assert!(enforcer.get_role_permissions("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn role_permissions_listed_in_canonical_order() {
        let enforcer = PermissionEnforcer::new().await.unwrap();
        assert_eq!(
            enforcer.get_role_permissions("accountant").await,
            vec!["dial".to_string(), "accounts".to_string()]
        );
        assert_eq!(
            enforcer.get_role_permissions("applicant").await,
            vec!["profile".to_string()]
        );
        assert!(enforcer.get_role_permissions("ghost").await.is_empty());
    }

    #[test]
    fn every_staff_role_files_declarations() {
        for role in Role::ALL {
            let files_dial = role_permissions(role).contains(&perm::DIAL);
            assert_eq!(files_dial, role != Role::Applicant, "{:?}", role);
        }
    }
}
