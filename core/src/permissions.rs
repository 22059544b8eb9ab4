use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// Feature area gated by a bundle of IAM permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Health,
    Cost,
    Deployment,
    Billing,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Health => "health",
            Capability::Cost => "cost",
            Capability::Deployment => "deployment",
            Capability::Billing => "billing",
        }
    }
}

/// Required permissions per capability, in declaration order.
pub const CAPABILITY_PERMISSIONS: [(Capability, &[&str]); 4] = [
    (Capability::Health, &["monitoring.timeSeries.list"]),
    (
        Capability::Cost,
        &["bigquery.jobs.create", "bigquery.tables.list"],
    ),
    (Capability::Deployment, &["cloudbuild.builds.list"]),
    (Capability::Billing, &["resourcemanager.projects.get"]),
];

/// Union of every required permission, deduplicated, in table order.
pub fn required_permissions() -> Vec<&'static str> {
    let mut seen = HashSet::new();
    CAPABILITY_PERMISSIONS
        .iter()
        .flat_map(|(_, permissions)| permissions.iter().copied())
        .filter(|permission| seen.insert(*permission))
        .collect()
}

/// Outcome of checking an identity against the capability table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionReport {
    pub identity: String,
    pub project_id: String,
    pub capabilities: BTreeMap<Capability, bool>,
    pub missing_permissions: Vec<String>,
}

impl PermissionReport {
    /// Partition a granted permission set back into per-capability flags.
    ///
    /// A capability holds only when every one of its permissions is granted.
    pub fn from_granted<S: AsRef<str>>(
        identity: impl Into<String>,
        project_id: impl Into<String>,
        granted: &[S],
    ) -> Self {
        let granted: HashSet<&str> = granted.iter().map(AsRef::as_ref).collect();
        let capabilities = CAPABILITY_PERMISSIONS
            .iter()
            .map(|(capability, permissions)| {
                (
                    *capability,
                    permissions.iter().all(|p| granted.contains(p)),
                )
            })
            .collect();
        let missing_permissions = required_permissions()
            .into_iter()
            .filter(|permission| !granted.contains(permission))
            .map(str::to_string)
            .collect();
        Self {
            identity: identity.into(),
            project_id: project_id.into(),
            capabilities,
            missing_permissions,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.get(&capability).copied().unwrap_or(false)
    }

    pub fn fully_granted(&self) -> bool {
        self.missing_permissions.is_empty()
    }
}
