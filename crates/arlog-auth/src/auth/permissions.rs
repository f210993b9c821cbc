//! Team and namespace permissions

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::error::{AuthError, Result};
use super::identity::Identity;

/// A team mapped to one provider group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: u64,
    pub name: String,
    pub group_id: String,
}

/// Kubernetes service-account credential attached to a permission
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceAccountToken(String);

impl ServiceAccountToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw credential for the Kubernetes client. Never serialize or log it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ServiceAccountToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServiceAccountToken([REDACTED])")
    }
}

/// Stored permission row. Deliberately not `Serialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: u64,
    pub team_id: u64,
    pub cluster_name: String,
    pub namespace: String,
    service_account_token: ServiceAccountToken,
}

impl Permission {
    pub fn new(
        id: u64,
        team_id: u64,
        cluster_name: impl Into<String>,
        namespace: impl Into<String>,
        service_account_token: ServiceAccountToken,
    ) -> Self {
        Self {
            id,
            team_id,
            cluster_name: cluster_name.into(),
            namespace: namespace.into(),
            service_account_token,
        }
    }

    pub const fn service_account_token(&self) -> &ServiceAccountToken {
        &self.service_account_token
    }

    pub fn view(&self) -> PermissionView {
        PermissionView {
            id: self.id,
            team_id: self.team_id,
            cluster_name: self.cluster_name.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

/// Client-facing projection of a [`Permission`], without the credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionView {
    pub id: u64,
    pub team_id: u64,
    pub cluster_name: String,
    pub namespace: String,
}

/// Persistence behind permission resolution
#[async_trait]
pub trait PermissionStore: Send + Sync + std::fmt::Debug {
    async fn find_team_by_group(&self, group_id: &str) -> Result<Option<Team>>;

    /// Permissions of a team, ordered by id
    async fn permissions_for_team(&self, team_id: u64) -> Result<Vec<Permission>>;
}

/// Namespaces an identity may inspect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPermissions {
    team: Team,
    permissions: Vec<PermissionView>,
}

impl ResolvedPermissions {
    pub const fn team(&self) -> &Team {
        &self.team
    }

    pub fn permissions(&self) -> &[PermissionView] {
        &self.permissions
    }

    pub fn allows(&self, cluster: &str, namespace: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p.cluster_name == cluster && p.namespace == namespace)
    }

    pub fn into_views(self) -> Vec<PermissionView> {
        self.permissions
    }
}

/// Maps identities to their team's permissions
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    /// One team per identity: the first of its groups with a team wins.
    pub async fn resolve(&self, identity: &Identity) -> Result<ResolvedPermissions> {
        let mut matched: Option<Team> = None;
        for group in &identity.groups {
            let Some(team) = self.store.find_team_by_group(group).await? else {
                continue;
            };
            match &matched {
                None => matched = Some(team),
                Some(first) => {
                    tracing::warn!(
                        sub = %identity.sub,
                        team = %first.name,
                        ignored_team = %team.name,
                        "Identity matches several teams, using the first"
                    );
                }
            }
        }

        let Some(team) = matched else {
            tracing::error!(
                sub = %identity.sub,
                groups = ?identity.groups,
                "No team mapped to any of the identity's groups"
            );
            return Err(AuthError::TeamNotFound(identity.groups.clone()));
        };

        let mut rows = self.store.permissions_for_team(team.id).await?;
        rows.sort_by_key(|p| p.id);
        let permissions = rows.iter().map(Permission::view).collect();

        tracing::debug!(sub = %identity.sub, team = %team.name, "Resolved permissions");
        Ok(ResolvedPermissions { team, permissions })
    }
}
