//! Project membership planning
//!
//! Given the current roster of a project and the desired records of one
//! partition, [`MembershipPlan::compute`] decides who is added, whose role
//! changes, and who is pruned. Executing the plan is the adapter's job.

use std::collections::HashSet;

use super::platform_user::{find_role, PlatformUser, ProjectRole};
use super::user_record::UserRecord;
use super::whitelist::Whitelist;

/// Role given to records that do not name one
pub const DEFAULT_ROLE: &str = "readOnlyUserRole";

/// Flags that shape membership planning
#[derive(Debug, Clone, Copy)]
pub struct MembershipPolicy<'a> {
    /// Identities never pruned
    pub whitelist: &'a Whitelist,
    /// Whether members missing from the desired set are pruned
    pub prune: bool,
    /// Prune by removing the membership instead of disabling it
    pub remove_from_project: bool,
}

/// A record that needs a membership write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub record: UserRecord,
    pub role: ProjectRole,
    /// The current membership, `None` when the user is not a member yet
    pub existing: Option<PlatformUser>,
}

/// A record the plan cannot act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub record: UserRecord,
    pub reason: String,
}

/// Planned membership writes for one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    /// New or re-enabled members
    pub to_add: Vec<MembershipChange>,
    /// Enabled members whose role differs
    pub to_change_role: Vec<MembershipChange>,
    /// Members absent from the desired set
    pub to_remove: Vec<PlatformUser>,
    /// Whether `to_remove` should be removed rather than disabled
    pub remove_from_project: bool,
    /// Records carrying group assignments, in input order
    pub group_assignments: Vec<(String, Vec<String>)>,
    pub unresolved: Vec<Unresolved>,
    pub unchanged: usize,
}

impl MembershipPlan {
    /// Plans the membership of one project
    ///
    /// Records are deduplicated by identity, first occurrence wins. Input
    /// order is preserved in every list.
    #[must_use]
    pub fn compute(
        current: &[PlatformUser],
        desired: &[UserRecord],
        roles: &[ProjectRole],
        policy: MembershipPolicy<'_>,
    ) -> Self {
        let mut plan = MembershipPlan {
            remove_from_project: policy.remove_from_project,
            ..Self::default()
        };
        let mut wanted: HashSet<String> = HashSet::new();

        for record in desired {
            let Some(identity) = record.identity() else {
                continue;
            };
            if !wanted.insert(identity.to_lowercase()) {
                continue;
            }

            let role_name = record
                .role
                .as_deref()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(DEFAULT_ROLE);
            let Some(role) = find_role(roles, role_name) else {
                plan.unresolved.push(Unresolved {
                    record: record.clone(),
                    reason: format!("Role \"{role_name}\" does not exist in the project"),
                });
                continue;
            };

            if let Some(groups) = &record.user_group {
                plan.group_assignments
                    .push((identity.to_string(), groups.clone()));
            }

            match current.iter().find(|user| user.has_login(identity)) {
                None => plan.to_add.push(MembershipChange {
                    record: record.clone(),
                    role: role.clone(),
                    existing: None,
                }),
                Some(user) if !user.enabled => plan.to_add.push(MembershipChange {
                    record: record.clone(),
                    role: role.clone(),
                    existing: Some(user.clone()),
                }),
                Some(user) if user.role_uri.as_deref() != Some(role.uri.as_str()) => {
                    plan.to_change_role.push(MembershipChange {
                        record: record.clone(),
                        role: role.clone(),
                        existing: Some(user.clone()),
                    });
                }
                Some(_) => plan.unchanged += 1,
            }
        }

        if policy.prune {
            plan.to_remove = current
                .iter()
                .filter(|user| user.enabled)
                .filter(|user| {
                    !wanted.contains(&user.login.to_lowercase())
                        && !user
                            .email
                            .as_deref()
                            .map(|e| wanted.contains(&e.to_lowercase()))
                            .unwrap_or(false)
                })
                .filter(|user| !policy.whitelist.contains(&user.login))
                .cloned()
                .collect();
        }

        plan
    }

    /// Whether executing the plan would change nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty()
            && self.to_change_role.is_empty()
            && self.to_remove.is_empty()
            && self.group_assignments.is_empty()
            && self.unresolved.is_empty()
    }
}
