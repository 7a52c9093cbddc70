// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authorization entry point.
//!
//! [`PermissionService`] wires the grant repository to the pure decision
//! engine: it fetches the candidate grants for the caller's groups and
//! module, then hands the decision to
//! [`muster_server_auth::PermissionEngine`]. Anonymous and superuser
//! principals never touch the store — the engine decides them from the
//! principal alone.

use muster_server_auth::{Module, PermissionEngine, Principal, ScopeRef};
use tracing::instrument;

use crate::error::DbError;
use crate::perms::PermissionRepository;

/// Evaluates permission checks against stored groups and grants.
#[derive(Clone)]
pub struct PermissionService {
	repository: PermissionRepository,
	engine: PermissionEngine,
}

impl PermissionService {
	/// A service over the built-in registry and inherited-rule table.
	pub fn new(repository: PermissionRepository) -> Self {
		Self {
			repository,
			engine: PermissionEngine::new(),
		}
	}

	/// A service with an explicit engine.
	pub fn with_engine(repository: PermissionRepository, engine: PermissionEngine) -> Self {
		Self { repository, engine }
	}

	/// The underlying repository.
	pub fn repository(&self) -> &PermissionRepository {
		&self.repository
	}

	/// Decide whether a principal holds a permission for a scope.
	///
	/// A `false` result is a normal outcome, not an error; callers translate
	/// it into their own forbidden signal.
	///
	/// # Errors
	/// Returns `DbError` only for store failures while fetching grants.
	#[instrument(level = "debug", skip(self, scope), fields(module = %module))]
	pub async fn evaluate(
		&self,
		principal: &Principal,
		permission: &str,
		module: Module,
		scope: &ScopeRef,
	) -> Result<bool, DbError> {
		// Anonymous and superuser outcomes need no grants; skip the query.
		let grants = match principal {
			Principal::Authenticated(subject) if !subject.superuser => {
				self.repository.grants_for(&subject.user_id, module).await?
			}
			_ => Vec::new(),
		};

		Ok(self
			.engine
			.evaluate(principal, permission, module, scope, &grants))
	}
}
