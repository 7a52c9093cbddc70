// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission repository for database operations.
//!
//! This module provides database access for the permission system including:
//! - Permission group CRUD
//! - Membership management (add/remove/sync)
//! - Grant CRUD with write-time scope validation
//! - The evaluation query: all grants reachable through a user's
//!   memberships, filtered to one module

use async_trait::async_trait;
use chrono::Utc;
use muster_server_auth::{
	Effect, Grant, GrantId, GrantScope, GroupId, Membership, Module, ObjectId, PermissionGroup,
	ScopeKind, UserId,
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait PermissionStore: Send + Sync {
	async fn create_group(&self, name: &str) -> Result<PermissionGroup, DbError>;
	async fn get_group(&self, id: &GroupId) -> Result<Option<PermissionGroup>, DbError>;
	async fn get_group_by_name(&self, name: &str) -> Result<Option<PermissionGroup>, DbError>;
	async fn list_groups(&self) -> Result<Vec<PermissionGroup>, DbError>;
	async fn delete_group(&self, id: &GroupId) -> Result<bool, DbError>;
	async fn count_members(&self, group_id: &GroupId) -> Result<i64, DbError>;
	async fn count_grants(&self, group_id: &GroupId) -> Result<i64, DbError>;
	async fn add_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<(), DbError>;
	async fn remove_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool, DbError>;
	async fn get_membership(
		&self,
		group_id: &GroupId,
		user_id: &UserId,
	) -> Result<Option<Membership>, DbError>;
	async fn list_member_ids(&self, group_id: &GroupId) -> Result<Vec<UserId>, DbError>;
	async fn groups_for_user(&self, user_id: &UserId) -> Result<Vec<PermissionGroup>, DbError>;
	async fn set_groups_for_user(
		&self,
		user_id: &UserId,
		group_ids: &[GroupId],
	) -> Result<(), DbError>;
	async fn create_grant(
		&self,
		group_id: &GroupId,
		module: Module,
		permission: &str,
		effect: Effect,
		scope: GrantScope,
	) -> Result<Grant, DbError>;
	async fn update_grant(&self, grant: &Grant) -> Result<(), DbError>;
	async fn delete_grant(&self, id: &GrantId) -> Result<bool, DbError>;
	async fn list_grants_for_group(&self, group_id: &GroupId) -> Result<Vec<Grant>, DbError>;
	async fn grants_for(&self, user_id: &UserId, module: Module) -> Result<Vec<Grant>, DbError>;
}

/// Repository for permission database operations.
///
/// Manages permission groups, their memberships, and their grants.
/// All IDs are UUIDs stored as strings in SQLite.
#[derive(Clone)]
pub struct PermissionRepository {
	pool: SqlitePool,
}

impl PermissionRepository {
	/// Create a new repository with the given pool.
	///
	/// # Arguments
	/// * `pool` - SQLite connection pool
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Groups
	// =========================================================================

	/// Create a new permission group.
	///
	/// # Arguments
	/// * `name` - Unique display name
	///
	/// # Errors
	/// Returns `DbError::Conflict` if a group with this name already exists.
	#[tracing::instrument(skip(self), fields(name = %name))]
	pub async fn create_group(&self, name: &str) -> Result<PermissionGroup, DbError> {
		let group = PermissionGroup::new(name);
		sqlx::query(
			r#"
			INSERT INTO permission_groups (id, name, created_at)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(group.id.to_string())
		.bind(&group.name)
		.bind(group.created_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| unique_conflict(e, "group name already in use"))?;

		tracing::debug!(group_id = %group.id, "permission group created");
		Ok(group)
	}

	/// Get a group by ID.
	///
	/// # Returns
	/// `None` if no group exists with this ID.
	#[tracing::instrument(skip(self), fields(group_id = %id))]
	pub async fn get_group(&self, id: &GroupId) -> Result<Option<PermissionGroup>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, created_at
			FROM permission_groups
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_group(&r)).transpose()
	}

	/// Get a group by its unique name.
	#[tracing::instrument(skip(self), fields(name = %name))]
	pub async fn get_group_by_name(&self, name: &str) -> Result<Option<PermissionGroup>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, created_at
			FROM permission_groups
			WHERE name = ?
			"#,
		)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_group(&r)).transpose()
	}

	/// List all groups, ordered by name.
	#[tracing::instrument(skip(self))]
	pub async fn list_groups(&self) -> Result<Vec<PermissionGroup>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, name, created_at
			FROM permission_groups
			ORDER BY name ASC
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_group(r)).collect()
	}

	/// Delete a group. Memberships and grants cascade.
	///
	/// # Returns
	/// `true` if a group was deleted, `false` if not found.
	#[tracing::instrument(skip(self), fields(group_id = %id))]
	pub async fn delete_group(&self, id: &GroupId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM permission_groups
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(group_id = %id, "permission group deleted");
		}
		Ok(deleted)
	}

	/// Count members of a group.
	#[tracing::instrument(skip(self), fields(group_id = %group_id))]
	pub async fn count_members(&self, group_id: &GroupId) -> Result<i64, DbError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM permission_memberships
			WHERE group_id = ?
			"#,
		)
		.bind(group_id.to_string())
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0)
	}

	/// Count grants attached to a group.
	#[tracing::instrument(skip(self), fields(group_id = %group_id))]
	pub async fn count_grants(&self, group_id: &GroupId) -> Result<i64, DbError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM permission_grants
			WHERE group_id = ?
			"#,
		)
		.bind(group_id.to_string())
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0)
	}

	// =========================================================================
	// Memberships
	// =========================================================================

	/// Add a user to a group.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the user is already a member.
	///
	/// # Database Constraints
	/// - (`group_id`, `user_id`) must be unique
	/// - `group_id` must reference an existing group
	#[tracing::instrument(skip(self), fields(group_id = %group_id, user_id = %user_id))]
	pub async fn add_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<(), DbError> {
		let id = Uuid::new_v4().to_string();
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO permission_memberships (id, group_id, user_id, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(&id)
		.bind(group_id.to_string())
		.bind(user_id.to_string())
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| unique_conflict(e, "user is already a member of this group"))?;

		tracing::debug!(group_id = %group_id, user_id = %user_id, "member added to group");
		Ok(())
	}

	/// Remove a user from a group.
	///
	/// # Returns
	/// `true` if a membership was removed, `false` if not found.
	#[tracing::instrument(skip(self), fields(group_id = %group_id, user_id = %user_id))]
	pub async fn remove_member(
		&self,
		group_id: &GroupId,
		user_id: &UserId,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM permission_memberships
			WHERE group_id = ? AND user_id = ?
			"#,
		)
		.bind(group_id.to_string())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		let removed = result.rows_affected() > 0;
		if removed {
			tracing::debug!(group_id = %group_id, user_id = %user_id, "member removed from group");
		}
		Ok(removed)
	}

	/// Get a user's membership in a group.
	///
	/// # Returns
	/// `None` if the user is not a member.
	#[tracing::instrument(skip(self), fields(group_id = %group_id, user_id = %user_id))]
	pub async fn get_membership(
		&self,
		group_id: &GroupId,
		user_id: &UserId,
	) -> Result<Option<Membership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT group_id, user_id, created_at
			FROM permission_memberships
			WHERE group_id = ? AND user_id = ?
			"#,
		)
		.bind(group_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_membership(&r)).transpose()
	}

	/// List the user ids belonging to a group.
	#[tracing::instrument(skip(self), fields(group_id = %group_id))]
	pub async fn list_member_ids(&self, group_id: &GroupId) -> Result<Vec<UserId>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT user_id FROM permission_memberships
			WHERE group_id = ?
			ORDER BY created_at ASC
			"#,
		)
		.bind(group_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows
			.iter()
			.map(|r| parse_uuid(r.get("user_id"), "user_id").map(UserId::new))
			.collect()
	}

	/// List the groups a user is a member of, ordered by name.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn groups_for_user(&self, user_id: &UserId) -> Result<Vec<PermissionGroup>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT g.id, g.name, g.created_at
			FROM permission_groups g
			INNER JOIN permission_memberships m ON g.id = m.group_id
			WHERE m.user_id = ?
			ORDER BY g.name ASC
			"#,
		)
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_group(r)).collect()
	}

	/// Replace a user's memberships with exactly the given groups.
	///
	/// Memberships outside the set are deleted, missing ones are inserted,
	/// existing ones are left untouched. Runs in one transaction.
	#[tracing::instrument(skip(self, group_ids), fields(user_id = %user_id, count = group_ids.len()))]
	pub async fn set_groups_for_user(
		&self,
		user_id: &UserId,
		group_ids: &[GroupId],
	) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		let rows = sqlx::query(
			r#"
			SELECT group_id FROM permission_memberships
			WHERE user_id = ?
			"#,
		)
		.bind(user_id.to_string())
		.fetch_all(&mut *tx)
		.await?;

		let existing: Vec<String> = rows.iter().map(|r| r.get("group_id")).collect();
		let wanted: Vec<String> = group_ids.iter().map(|g| g.to_string()).collect();

		for group_id in existing.iter().filter(|g| !wanted.contains(g)) {
			sqlx::query(
				r#"
				DELETE FROM permission_memberships
				WHERE user_id = ? AND group_id = ?
				"#,
			)
			.bind(user_id.to_string())
			.bind(group_id)
			.execute(&mut *tx)
			.await?;
		}

		let now = Utc::now().to_rfc3339();
		for group_id in wanted.iter().filter(|g| !existing.contains(g)) {
			sqlx::query(
				r#"
				INSERT INTO permission_memberships (id, group_id, user_id, created_at)
				VALUES (?, ?, ?, ?)
				"#,
			)
			.bind(Uuid::new_v4().to_string())
			.bind(group_id)
			.bind(user_id.to_string())
			.bind(&now)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;
		tracing::debug!(user_id = %user_id, count = group_ids.len(), "memberships synced");
		Ok(())
	}

	// =========================================================================
	// Grants
	// =========================================================================

	/// Create a grant for a group.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if an identical grant already exists at
	/// the same specificity (same module, permission, scope, and effect).
	#[tracing::instrument(
		skip(self, scope),
		fields(group_id = %group_id, module = %module, permission = %permission, effect = %effect)
	)]
	pub async fn create_grant(
		&self,
		group_id: &GroupId,
		module: Module,
		permission: &str,
		effect: Effect,
		scope: GrantScope,
	) -> Result<Grant, DbError> {
		let grant = Grant::new(*group_id, module, permission, effect, scope);
		let (kind, object_id, key) = grant.scope.parts();
		sqlx::query(
			r#"
			INSERT INTO permission_grants
				(id, group_id, module, permission, effect, scope_kind, scope_object_id, scope_key, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(grant.id.to_string())
		.bind(grant.group_id.to_string())
		.bind(grant.module.to_string())
		.bind(&grant.permission)
		.bind(grant.effect.to_string())
		.bind(kind.map(ScopeKind::as_str))
		.bind(object_id.map(|id| id.to_string()))
		.bind(key)
		.bind(grant.created_at.to_rfc3339())
		.bind(grant.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| unique_conflict(e, "an identical grant already exists"))?;

		tracing::debug!(grant_id = %grant.id, "grant created");
		Ok(grant)
	}

	/// Create a grant from loose scope parts, validating the scope
	/// invariants at write time.
	///
	/// # Errors
	/// Returns `DbError::Auth` when both an object scope and a key are set,
	/// or an object id arrives without a kind. Nothing is persisted in that
	/// case.
	#[tracing::instrument(
		skip(self, scope_kind, scope_object_id, scope_key),
		fields(group_id = %group_id, module = %module, permission = %permission)
	)]
	pub async fn create_grant_from_parts(
		&self,
		group_id: &GroupId,
		module: Module,
		permission: &str,
		effect: Effect,
		scope_kind: Option<ScopeKind>,
		scope_object_id: Option<ObjectId>,
		scope_key: Option<String>,
	) -> Result<Grant, DbError> {
		let scope = GrantScope::from_parts(scope_kind, scope_object_id, scope_key)?;
		self
			.create_grant(group_id, module, permission, effect, scope)
			.await
	}

	/// Update a grant's fields. Refreshes `updated_at`.
	#[tracing::instrument(skip(self, grant), fields(grant_id = %grant.id))]
	pub async fn update_grant(&self, grant: &Grant) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let (kind, object_id, key) = grant.scope.parts();
		sqlx::query(
			r#"
			UPDATE permission_grants
			SET group_id = ?, module = ?, permission = ?, effect = ?,
				scope_kind = ?, scope_object_id = ?, scope_key = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(grant.group_id.to_string())
		.bind(grant.module.to_string())
		.bind(&grant.permission)
		.bind(grant.effect.to_string())
		.bind(kind.map(ScopeKind::as_str))
		.bind(object_id.map(|id| id.to_string()))
		.bind(key)
		.bind(&now)
		.bind(grant.id.to_string())
		.execute(&self.pool)
		.await
		.map_err(|e| unique_conflict(e, "an identical grant already exists"))?;

		tracing::debug!(grant_id = %grant.id, "grant updated");
		Ok(())
	}

	/// Delete a grant.
	///
	/// # Returns
	/// `true` if a grant was deleted, `false` if not found.
	#[tracing::instrument(skip(self), fields(grant_id = %id))]
	pub async fn delete_grant(&self, id: &GrantId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM permission_grants
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(grant_id = %id, "grant deleted");
		}
		Ok(deleted)
	}

	/// List a group's grants, oldest first.
	#[tracing::instrument(skip(self), fields(group_id = %group_id))]
	pub async fn list_grants_for_group(&self, group_id: &GroupId) -> Result<Vec<Grant>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, group_id, module, permission, effect,
				scope_kind, scope_object_id, scope_key, created_at, updated_at
			FROM permission_grants
			WHERE group_id = ?
			ORDER BY created_at ASC, id ASC
			"#,
		)
		.bind(group_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_grant(r)).collect()
	}

	/// All grants reachable through a user's memberships, filtered to one
	/// module. The evaluation query.
	///
	/// The result order carries no meaning for the decision; it is fixed
	/// only so tests are deterministic.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, module = %module))]
	pub async fn grants_for(&self, user_id: &UserId, module: Module) -> Result<Vec<Grant>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT g.id, g.group_id, g.module, g.permission, g.effect,
				g.scope_kind, g.scope_object_id, g.scope_key, g.created_at, g.updated_at
			FROM permission_grants g
			INNER JOIN permission_memberships m ON g.group_id = m.group_id
			WHERE m.user_id = ? AND g.module = ?
			ORDER BY g.created_at ASC, g.id ASC
			"#,
		)
		.bind(user_id.to_string())
		.bind(module.to_string())
		.fetch_all(&self.pool)
		.await?;

		let grants: Result<Vec<_>, _> = rows.iter().map(|r| self.row_to_grant(r)).collect();
		let grants = grants?;
		tracing::debug!(user_id = %user_id, count = grants.len(), "fetched candidate grants");
		Ok(grants)
	}

	// =========================================================================
	// Helpers
	// =========================================================================

	fn row_to_group(&self, row: &sqlx::sqlite::SqliteRow) -> Result<PermissionGroup, DbError> {
		let id = parse_uuid(row.get("id"), "group id")?;
		let created_at: String = row.get("created_at");

		Ok(PermissionGroup {
			id: GroupId::new(id),
			name: row.get("name"),
			created_at: parse_timestamp(&created_at, "created_at")?,
		})
	}

	fn row_to_membership(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Membership, DbError> {
		let group_id = parse_uuid(row.get("group_id"), "group_id")?;
		let user_id = parse_uuid(row.get("user_id"), "user_id")?;
		let created_at: String = row.get("created_at");

		Ok(Membership {
			group_id: GroupId::new(group_id),
			user_id: UserId::new(user_id),
			created_at: parse_timestamp(&created_at, "created_at")?,
		})
	}

	fn row_to_grant(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Grant, DbError> {
		let id = parse_uuid(row.get("id"), "grant id")?;
		let group_id = parse_uuid(row.get("group_id"), "group_id")?;
		let module: String = row.get("module");
		let effect: String = row.get("effect");
		let scope_kind: Option<String> = row.get("scope_kind");
		let scope_object_id: Option<String> = row.get("scope_object_id");
		let scope_key: Option<String> = row.get("scope_key");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		let object_id = scope_object_id
			.map(|raw| parse_uuid(raw, "scope_object_id").map(ObjectId::new))
			.transpose()?;
		let scope = GrantScope::from_parts(scope_kind.map(ScopeKind::new), object_id, scope_key)?;

		Ok(Grant {
			id: GrantId::new(id),
			group_id: GroupId::new(group_id),
			module: module.parse()?,
			permission: row.get("permission"),
			effect: effect.parse()?,
			scope,
			created_at: parse_timestamp(&created_at, "created_at")?,
			updated_at: parse_timestamp(&updated_at, "updated_at")?,
		})
	}
}

fn parse_uuid(raw: String, what: &str) -> Result<Uuid, DbError> {
	Uuid::parse_str(&raw).map_err(|e| DbError::Internal(format!("Invalid {what}: {e}")))
}

fn parse_timestamp(raw: &str, what: &str) -> Result<chrono::DateTime<chrono::Utc>, DbError> {
	chrono::DateTime::parse_from_rfc3339(raw)
		.map(|dt| dt.with_timezone(&chrono::Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {what}: {e}")))
}

fn unique_conflict(err: sqlx::Error, what: &str) -> DbError {
	match &err {
		sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Conflict(what.to_string()),
		_ => DbError::Sqlx(err),
	}
}

#[async_trait]
impl PermissionStore for PermissionRepository {
	async fn create_group(&self, name: &str) -> Result<PermissionGroup, DbError> {
		self.create_group(name).await
	}

	async fn get_group(&self, id: &GroupId) -> Result<Option<PermissionGroup>, DbError> {
		self.get_group(id).await
	}

	async fn get_group_by_name(&self, name: &str) -> Result<Option<PermissionGroup>, DbError> {
		self.get_group_by_name(name).await
	}

	async fn list_groups(&self) -> Result<Vec<PermissionGroup>, DbError> {
		self.list_groups().await
	}

	async fn delete_group(&self, id: &GroupId) -> Result<bool, DbError> {
		self.delete_group(id).await
	}

	async fn count_members(&self, group_id: &GroupId) -> Result<i64, DbError> {
		self.count_members(group_id).await
	}

	async fn count_grants(&self, group_id: &GroupId) -> Result<i64, DbError> {
		self.count_grants(group_id).await
	}

	async fn add_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<(), DbError> {
		self.add_member(group_id, user_id).await
	}

	async fn remove_member(&self, group_id: &GroupId, user_id: &UserId) -> Result<bool, DbError> {
		self.remove_member(group_id, user_id).await
	}

	async fn get_membership(
		&self,
		group_id: &GroupId,
		user_id: &UserId,
	) -> Result<Option<Membership>, DbError> {
		self.get_membership(group_id, user_id).await
	}

	async fn list_member_ids(&self, group_id: &GroupId) -> Result<Vec<UserId>, DbError> {
		self.list_member_ids(group_id).await
	}

	async fn groups_for_user(&self, user_id: &UserId) -> Result<Vec<PermissionGroup>, DbError> {
		self.groups_for_user(user_id).await
	}

	async fn set_groups_for_user(
		&self,
		user_id: &UserId,
		group_ids: &[GroupId],
	) -> Result<(), DbError> {
		self.set_groups_for_user(user_id, group_ids).await
	}

	async fn create_grant(
		&self,
		group_id: &GroupId,
		module: Module,
		permission: &str,
		effect: Effect,
		scope: GrantScope,
	) -> Result<Grant, DbError> {
		self
			.create_grant(group_id, module, permission, effect, scope)
			.await
	}

	async fn update_grant(&self, grant: &Grant) -> Result<(), DbError> {
		self.update_grant(grant).await
	}

	async fn delete_grant(&self, id: &GrantId) -> Result<bool, DbError> {
		self.delete_grant(id).await
	}

	async fn list_grants_for_group(&self, group_id: &GroupId) -> Result<Vec<Grant>, DbError> {
		self.list_grants_for_group(group_id).await
	}

	async fn grants_for(&self, user_id: &UserId, module: Module) -> Result<Vec<Grant>, DbError> {
		self.grants_for(user_id, module).await
	}
}
