//! Filter diff plan
//!
//! Compares desired filters with the filter objects stored on the project,
//! keyed by the profile URI of the user each one is related to.
//!
//! - A desired filter whose user already has a filter with the same
//!   (normalised) expression is matched and left alone.
//! - Any other desired filter is created.
//! - An existing filter that was not matched is deleted when its user falls
//!   within the managed set. Without a managed set every user is managed.
//!   A changed filter of a user outside the managed set is left in place
//!   next to the new one.
//! - Existing filters without a related user are never touched.

use std::collections::HashSet;

use usersync_core::domain::{DesiredFilter, ExistingFilter, ObjectUri};

/// The changes needed to reach the desired filters
#[derive(Debug, Clone, Default)]
pub struct FilterPlan {
    pub to_create: Vec<DesiredFilter>,
    pub to_delete: Vec<ExistingFilter>,
    /// Desired filters already present on the project
    pub matched: usize,
}

impl FilterPlan {
    /// Computes the plan
    ///
    /// `managed` restricts all deletions to the users it contains; `None`
    /// means every user is managed.
    #[must_use]
    pub fn compute(
        desired: &[DesiredFilter],
        existing: &[ExistingFilter],
        managed: Option<&HashSet<ObjectUri>>,
    ) -> Self {
        let mut plan = Self::default();
        let mut kept: HashSet<&ObjectUri> = HashSet::new();

        for filter in desired {
            let found = existing.iter().find(|e| {
                !kept.contains(&e.uri)
                    && e.related_user_uri.as_ref() == Some(&filter.related_user_uri)
                    && e.matches_expression(&filter.expression)
            });
            match found {
                Some(existing) => {
                    kept.insert(&existing.uri);
                    plan.matched += 1;
                }
                None => plan.to_create.push(filter.clone()),
            }
        }

        plan.to_delete = existing
            .iter()
            .filter(|e| !kept.contains(&e.uri))
            .filter(|e| match &e.related_user_uri {
                Some(user) => managed.map_or(true, |m| m.contains(user)),
                None => false,
            })
            .cloned()
            .collect();

        plan
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}
