//! In-memory permission store

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::{AuthError, Result};
use super::permissions::{Permission, PermissionStore, ServiceAccountToken, Team};

#[derive(Debug, Default)]
struct Tables {
    teams: Vec<Team>,
    permissions: Vec<Permission>,
    next_team_id: u64,
    next_permission_id: u64,
}

/// Team and permission tables held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Team names and group ids are unique.
    pub fn create_team(&self, name: &str, group_id: &str) -> Result<Team> {
        let mut tables = self.tables.write();
        if tables.teams.iter().any(|t| t.name == name) {
            return Err(AuthError::Storage(format!("team name already exists: {name}")));
        }
        if tables.teams.iter().any(|t| t.group_id == group_id) {
            return Err(AuthError::Storage(format!(
                "group already mapped to a team: {group_id}"
            )));
        }

        tables.next_team_id += 1;
        let team = Team {
            id: tables.next_team_id,
            name: name.to_string(),
            group_id: group_id.to_string(),
        };
        tables.teams.push(team.clone());
        Ok(team)
    }

    pub fn create_permission(
        &self,
        team_id: u64,
        cluster_name: &str,
        namespace: &str,
        token: ServiceAccountToken,
    ) -> Result<Permission> {
        let mut tables = self.tables.write();
        if !tables.teams.iter().any(|t| t.id == team_id) {
            return Err(AuthError::Storage(format!("unknown team id: {team_id}")));
        }

        tables.next_permission_id += 1;
        let permission = Permission::new(
            tables.next_permission_id,
            team_id,
            cluster_name,
            namespace,
            token,
        );
        tables.permissions.push(permission.clone());
        Ok(permission)
    }

    /// Delete a team and its permissions. Returns whether the team existed.
    pub fn delete_team(&self, team_id: u64) -> bool {
        let mut tables = self.tables.write();
        let before = tables.teams.len();
        tables.teams.retain(|t| t.id != team_id);
        if tables.teams.len() == before {
            return false;
        }
        tables.permissions.retain(|p| p.team_id != team_id);
        true
    }

    pub fn team_count(&self) -> usize {
        self.tables.read().teams.len()
    }

    pub fn permission_count(&self) -> usize {
        self.tables.read().permissions.len()
    }

    /// Insert development teams when the store is empty. Returns whether it seeded.
    pub fn seed_development(&self) -> Result<bool> {
        if self.team_count() > 0 {
            return Ok(false);
        }

        let cosmos = self.create_team("Cosmos Team", "cosmos-team-okta-group")?;
        let jupiter = self.create_team("Jupiter Team", "jupiter-team-okta-group")?;

        self.create_permission(
            cosmos.id,
            "dev-cluster",
            "cosmos-namespace",
            ServiceAccountToken::new("dummy-token-cosmos-dev"),
        )?;
        self.create_permission(
            cosmos.id,
            "test-cluster",
            "cosmos-namespace",
            ServiceAccountToken::new("dummy-token-cosmos-test"),
        )?;
        self.create_permission(
            jupiter.id,
            "dev-cluster",
            "jupiter-namespace",
            ServiceAccountToken::new("dummy-token-jupiter-dev"),
        )?;

        tracing::info!(
            teams = self.team_count(),
            permissions = self.permission_count(),
            "Seeded development permissions"
        );
        Ok(true)
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn find_team_by_group(&self, group_id: &str) -> Result<Option<Team>> {
        Ok(self
            .tables
            .read()
            .teams
            .iter()
            .find(|t| t.group_id == group_id)
            .cloned())
    }

    async fn permissions_for_team(&self, team_id: u64) -> Result<Vec<Permission>> {
        let mut rows: Vec<Permission> = self
            .tables
            .read()
            .permissions
            .iter()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.id);
        Ok(rows)
    }
}
