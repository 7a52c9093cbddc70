// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission groups and memberships.
//!
//! Groups are the unit grants attach to; users pick up grants by being a
//! member of a group. Both records are administrative data, mutated outside
//! the evaluation path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GroupId, UserId};

/// A named collection of users that grants attach to.
///
/// Deleting a group cascades to its memberships and grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
	pub id: GroupId,
	/// Unique display name.
	pub name: String,
	pub created_at: DateTime<Utc>,
}

impl PermissionGroup {
	/// Create a new group with a generated id.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			id: GroupId::generate(),
			name: name.into(),
			created_at: Utc::now(),
		}
	}
}

/// A (user, group) join record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
	pub group_id: GroupId,
	pub user_id: UserId,
	pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_group_has_unique_id() {
		let a = PermissionGroup::new("Section Editors");
		let b = PermissionGroup::new("Section Editors");
		assert_ne!(a.id, b.id);
		assert_eq!(a.name, "Section Editors");
	}
}
