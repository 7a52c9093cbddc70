// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for permission evaluation.
//!
//! This module defines the foundational types used throughout the permission
//! system:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for different entity
//!   types ([`UserId`], [`GroupId`], [`GrantId`], [`ObjectId`]) preventing
//!   accidental mixing
//! - **Principal model**: [`Principal`] distinguishes anonymous callers from
//!   authenticated subjects at the type level — anonymous denial is a
//!   variant, not a runtime patch
//! - **Module/effect enums**: [`Module`] names the functional area a
//!   permission is namespaced under, [`Effect`] is the allow/deny outcome
//!   of a grant
//! - **Scope kinds**: [`ScopeKind`] names the type of a scope object
//!   ("section", "qualification", …)
//!
//! All ID types implement transparent serde serialization (as UUID strings)
//! and provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AuthError;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(GroupId, "Unique identifier for a permission group.");
define_id_type!(GrantId, "Unique identifier for a permission grant.");
define_id_type!(ObjectId, "Unique identifier for a scope object.");

// =============================================================================
// Modules
// =============================================================================

/// A named functional area under which permissions are namespaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
	/// Order-of-battle management (platoons, sections).
	Orbat,
	/// Qualification and criteria management.
	Training,
	/// Event scheduling and management.
	Events,
}

impl Module {
	/// Returns all known modules.
	pub fn all() -> &'static [Module] {
		&[Module::Orbat, Module::Training, Module::Events]
	}
}

impl fmt::Display for Module {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Module::Orbat => write!(f, "orbat"),
			Module::Training => write!(f, "training"),
			Module::Events => write!(f, "events"),
		}
	}
}

impl FromStr for Module {
	type Err = AuthError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orbat" => Ok(Module::Orbat),
			"training" => Ok(Module::Training),
			"events" => Ok(Module::Events),
			other => Err(AuthError::UnknownModule(other.to_string())),
		}
	}
}

// =============================================================================
// Effects
// =============================================================================

/// The outcome a grant attaches to a matched permission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
	/// The grant permits the permission.
	#[default]
	Allow,
	/// The grant forbids the permission. A single matching deny overrides
	/// any number of matching allows.
	Deny,
}

impl fmt::Display for Effect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Effect::Allow => write!(f, "allow"),
			Effect::Deny => write!(f, "deny"),
		}
	}
}

impl FromStr for Effect {
	type Err = AuthError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"allow" => Ok(Effect::Allow),
			"deny" => Ok(Effect::Deny),
			other => Err(AuthError::UnknownEffect(other.to_string())),
		}
	}
}

// =============================================================================
// Scope Kinds
// =============================================================================

/// The type name of a scope object ("section", "platoon", "qualification").
///
/// Kinds are compared as plain strings; the registry declares which kinds a
/// permission may be scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKind(String);

impl ScopeKind {
	/// Create a scope kind from a type name.
	pub fn new(kind: impl Into<String>) -> Self {
		Self(kind.into())
	}

	/// The kind as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ScopeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for ScopeKind {
	fn from(kind: &str) -> Self {
		Self(kind.to_string())
	}
}

// =============================================================================
// Principals
// =============================================================================

/// An authenticated subject: a user identity plus superuser standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
	pub user_id: UserId,
	pub superuser: bool,
}

/// The caller of a permission check.
///
/// Anonymous callers are a first-class variant rather than a sentinel user:
/// evaluation denies them before any grants are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Principal {
	/// An unauthenticated caller. Always denied.
	Anonymous,
	/// An authenticated user.
	Authenticated(Subject),
}

impl Principal {
	/// An authenticated, non-superuser principal.
	pub fn user(user_id: UserId) -> Self {
		Self::Authenticated(Subject {
			user_id,
			superuser: false,
		})
	}

	/// An authenticated superuser principal.
	pub fn superuser(user_id: UserId) -> Self {
		Self::Authenticated(Subject {
			user_id,
			superuser: true,
		})
	}

	/// Returns true if the principal is authenticated.
	pub fn is_authenticated(&self) -> bool {
		matches!(self, Principal::Authenticated(_))
	}

	/// Returns true if the principal has superuser standing.
	pub fn is_superuser(&self) -> bool {
		matches!(
			self,
			Principal::Authenticated(Subject {
				superuser: true,
				..
			})
		)
	}

	/// The authenticated user id, if any.
	pub fn user_id(&self) -> Option<UserId> {
		match self {
			Principal::Anonymous => None,
			Principal::Authenticated(subject) => Some(subject.user_id),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod id_types {
		use super::*;

		#[test]
		fn user_id_roundtrips() {
			let uuid = Uuid::new_v4();
			let user_id = UserId::new(uuid);
			assert_eq!(user_id.into_inner(), uuid);
		}

		#[test]
		fn user_id_generates_unique() {
			let id1 = UserId::generate();
			let id2 = UserId::generate();
			assert_ne!(id1, id2);
		}

		#[test]
		fn user_id_serializes_as_uuid() {
			let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
			let user_id = UserId::new(uuid);
			let json = serde_json::to_string(&user_id).unwrap();
			assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
		}

		proptest! {
				#[test]
				fn user_id_roundtrip_any_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let user_id = UserId::new(uuid);
						prop_assert_eq!(user_id.into_inner(), uuid);
						prop_assert_eq!(Uuid::from(user_id), uuid);
				}

				#[test]
				fn group_id_roundtrip_any_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let group_id = GroupId::new(uuid);
						prop_assert_eq!(group_id.into_inner(), uuid);
				}

				#[test]
				fn object_id_display_matches_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let object_id = ObjectId::new(uuid);
						prop_assert_eq!(object_id.to_string(), uuid.to_string());
				}
		}
	}

	mod modules {
		use super::*;

		#[test]
		fn display_fromstr_roundtrip() {
			for module in Module::all() {
				let parsed: Module = module.to_string().parse().unwrap();
				assert_eq!(parsed, *module);
			}
		}

		#[test]
		fn unknown_module_is_rejected() {
			let err = "dashboard".parse::<Module>().unwrap_err();
			assert!(matches!(err, AuthError::UnknownModule(_)));
		}

		#[test]
		fn serializes_snake_case() {
			let json = serde_json::to_string(&Module::Orbat).unwrap();
			assert_eq!(json, "\"orbat\"");
		}
	}

	mod effects {
		use super::*;

		#[test]
		fn display_fromstr_roundtrip() {
			assert_eq!("allow".parse::<Effect>().unwrap(), Effect::Allow);
			assert_eq!("deny".parse::<Effect>().unwrap(), Effect::Deny);
			assert_eq!(Effect::Allow.to_string(), "allow");
			assert_eq!(Effect::Deny.to_string(), "deny");
		}

		#[test]
		fn default_is_allow() {
			assert_eq!(Effect::default(), Effect::Allow);
		}

		#[test]
		fn unknown_effect_is_rejected() {
			let err = "audit".parse::<Effect>().unwrap_err();
			assert!(matches!(err, AuthError::UnknownEffect(_)));
		}
	}

	mod principals {
		use super::*;

		#[test]
		fn anonymous_is_not_authenticated() {
			let principal = Principal::Anonymous;
			assert!(!principal.is_authenticated());
			assert!(!principal.is_superuser());
			assert_eq!(principal.user_id(), None);
		}

		#[test]
		fn user_is_authenticated_but_not_superuser() {
			let user_id = UserId::generate();
			let principal = Principal::user(user_id);
			assert!(principal.is_authenticated());
			assert!(!principal.is_superuser());
			assert_eq!(principal.user_id(), Some(user_id));
		}

		#[test]
		fn superuser_is_both() {
			let user_id = UserId::generate();
			let principal = Principal::superuser(user_id);
			assert!(principal.is_authenticated());
			assert!(principal.is_superuser());
			assert_eq!(principal.user_id(), Some(user_id));
		}
	}
}
