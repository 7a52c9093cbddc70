// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission grants and grant scopes.
//!
//! A grant binds a group to a `(module, permission, effect)` triple at a
//! given specificity: everything, a type of object, one object, or a string
//! key. The scope variants make the "object or key, never both" invariant
//! structural; [`GrantScope::from_parts`] is the write-time gate for data
//! arriving as loose columns or form fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::scope::NormalizedScope;
use crate::types::{Effect, GrantId, GroupId, Module, ObjectId, ScopeKind};

/// The specificity a grant applies at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GrantScope {
	/// Applies to every scope in the module.
	Global,
	/// Applies to all objects of one kind.
	Kind { kind: ScopeKind },
	/// Applies to a single object.
	Object { kind: ScopeKind, id: ObjectId },
	/// Applies to a named string key.
	Key { key: String },
}

impl GrantScope {
	/// Assemble a grant scope from loose parts, validating the invariants.
	///
	/// # Errors
	///
	/// Returns [`AuthError::InvalidGrant`] when both an object scope and a
	/// key are set, or an object id arrives without a kind.
	pub fn from_parts(
		kind: Option<ScopeKind>,
		object_id: Option<ObjectId>,
		key: Option<String>,
	) -> Result<Self, AuthError> {
		match (kind, object_id, key) {
			(None, None, None) => Ok(GrantScope::Global),
			(Some(kind), None, None) => Ok(GrantScope::Kind { kind }),
			(Some(kind), Some(id), None) => Ok(GrantScope::Object { kind, id }),
			(None, None, Some(key)) => Ok(GrantScope::Key { key }),
			(Some(_), _, Some(_)) | (None, Some(_), Some(_)) => Err(AuthError::InvalidGrant(
				"grant may scope to an object or a key, not both".to_string(),
			)),
			(None, Some(_), None) => Err(AuthError::InvalidGrant(
				"grant object id requires a scope kind".to_string(),
			)),
		}
	}

	/// Decompose into the `(kind, object id, key)` column triple.
	pub fn parts(&self) -> (Option<&ScopeKind>, Option<ObjectId>, Option<&str>) {
		match self {
			GrantScope::Global => (None, None, None),
			GrantScope::Kind { kind } => (Some(kind), None, None),
			GrantScope::Object { kind, id } => (Some(kind), Some(*id), None),
			GrantScope::Key { key } => (None, None, Some(key)),
		}
	}

	/// Whether the grant applies to a normalized request scope.
	///
	/// Global grants match everything; a kind grant matches every object of
	/// that kind; an object grant matches only the one object; a key grant
	/// matches the equal key.
	pub fn matches(&self, scope: &NormalizedScope<'_>) -> bool {
		match self {
			GrantScope::Global => true,
			GrantScope::Key { key } => scope.key == Some(key.as_str()),
			GrantScope::Kind { kind } => scope.kind == Some(kind),
			GrantScope::Object { kind, id } => {
				scope.kind == Some(kind) && scope.object_id == Some(*id)
			}
		}
	}
}

/// A rule binding a group to a permission, module, effect, and scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
	pub id: GrantId,
	pub group_id: GroupId,
	pub module: Module,
	/// Permission name, or `"*"` to match every permission in the module.
	pub permission: String,
	pub effect: Effect,
	pub scope: GrantScope,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Grant {
	/// Create a new grant with a generated id.
	pub fn new(
		group_id: GroupId,
		module: Module,
		permission: impl Into<String>,
		effect: Effect,
		scope: GrantScope,
	) -> Self {
		let now = Utc::now();
		Self {
			id: GrantId::generate(),
			group_id,
			module,
			permission: permission.into(),
			effect,
			scope,
			created_at: now,
			updated_at: now,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scope::{ScopeAttrs, ScopeRef};

	fn kind(name: &str) -> ScopeKind {
		ScopeKind::new(name)
	}

	mod from_parts {
		use super::*;

		#[test]
		fn empty_parts_are_global() {
			let scope = GrantScope::from_parts(None, None, None).unwrap();
			assert_eq!(scope, GrantScope::Global);
		}

		#[test]
		fn kind_only_is_type_level() {
			let scope = GrantScope::from_parts(Some(kind("section")), None, None).unwrap();
			assert_eq!(
				scope,
				GrantScope::Kind {
					kind: kind("section")
				}
			);
		}

		#[test]
		fn kind_and_id_are_object_level() {
			let id = ObjectId::generate();
			let scope = GrantScope::from_parts(Some(kind("section")), Some(id), None).unwrap();
			assert_eq!(
				scope,
				GrantScope::Object {
					kind: kind("section"),
					id
				}
			);
		}

		#[test]
		fn key_only_is_key_level() {
			let scope = GrantScope::from_parts(None, None, Some("operation".to_string())).unwrap();
			assert_eq!(
				scope,
				GrantScope::Key {
					key: "operation".to_string()
				}
			);
		}

		#[test]
		fn object_and_key_together_are_rejected() {
			let err = GrantScope::from_parts(
				Some(kind("section")),
				Some(ObjectId::generate()),
				Some("operation".to_string()),
			)
			.unwrap_err();
			assert!(matches!(err, AuthError::InvalidGrant(_)));

			let err =
				GrantScope::from_parts(Some(kind("section")), None, Some("operation".to_string()))
					.unwrap_err();
			assert!(matches!(err, AuthError::InvalidGrant(_)));
		}

		#[test]
		fn object_id_without_kind_is_rejected() {
			let err = GrantScope::from_parts(None, Some(ObjectId::generate()), None).unwrap_err();
			assert!(matches!(err, AuthError::InvalidGrant(_)));
		}

		#[test]
		fn parts_roundtrip() {
			let id = ObjectId::generate();
			for scope in [
				GrantScope::Global,
				GrantScope::Kind {
					kind: kind("section"),
				},
				GrantScope::Object {
					kind: kind("section"),
					id,
				},
				GrantScope::Key {
					key: "operation".to_string(),
				},
			] {
				let (k, o, key) = scope.parts();
				let rebuilt =
					GrantScope::from_parts(k.cloned(), o, key.map(str::to_string)).unwrap();
				assert_eq!(rebuilt, scope);
			}
		}
	}

	mod matching {
		use super::*;

		#[test]
		fn global_grant_matches_everything() {
			let grant = GrantScope::Global;
			let object = ScopeRef::object(ScopeAttrs::new("section", ObjectId::generate()));
			assert!(grant.matches(&ScopeRef::Global.normalize()));
			assert!(grant.matches(&object.normalize()));
			assert!(grant.matches(&ScopeRef::key("operation").normalize()));
		}

		#[test]
		fn kind_grant_matches_all_objects_of_kind() {
			let grant = GrantScope::Kind {
				kind: kind("section"),
			};
			let section = ScopeRef::object(ScopeAttrs::new("section", ObjectId::generate()));
			let platoon = ScopeRef::object(ScopeAttrs::new("platoon", ObjectId::generate()));
			assert!(grant.matches(&section.normalize()));
			assert!(!grant.matches(&platoon.normalize()));
			assert!(!grant.matches(&ScopeRef::Global.normalize()));
		}

		#[test]
		fn object_grant_matches_only_that_object() {
			let id = ObjectId::generate();
			let grant = GrantScope::Object {
				kind: kind("section"),
				id,
			};
			let same = ScopeRef::object(ScopeAttrs::new("section", id));
			let sibling = ScopeRef::object(ScopeAttrs::new("section", ObjectId::generate()));
			assert!(grant.matches(&same.normalize()));
			assert!(!grant.matches(&sibling.normalize()));
		}

		#[test]
		fn key_grant_matches_equal_key() {
			let grant = GrantScope::Key {
				key: "operation".to_string(),
			};
			assert!(grant.matches(&ScopeRef::key("operation").normalize()));
			assert!(!grant.matches(&ScopeRef::key("social").normalize()));
			assert!(!grant.matches(&ScopeRef::Global.normalize()));
		}
	}
}
