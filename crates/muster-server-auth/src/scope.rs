// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scope references for permission checks.
//!
//! A permission check targets a scope: everything ([`ScopeRef::Global`]), a
//! concrete domain object ([`ScopeRef::Object`]), or a named string key
//! ([`ScopeRef::Key`]). The variants are decided at the call site — there is
//! no runtime type inspection of the scope parameter. Loosely-typed callers
//! (admin tooling, request payloads) go through [`ScopeRef::from_json`],
//! which is where unsupported shapes are rejected.
//!
//! Scope objects are carried as pre-loaded attributes ([`ScopeAttrs`]), not
//! live entities: every fact the inherited rules need is an explicit field.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::types::{ObjectId, ScopeKind, UserId};

/// Pre-loaded attributes of a scope object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeAttrs {
	/// The object's type name ("section", "qualification", …).
	pub kind: ScopeKind,
	pub id: ObjectId,
	/// The designated leader of the object, when the domain has one.
	/// Consulted by inherited rules.
	#[serde(default)]
	pub leader: Option<UserId>,
}

impl ScopeAttrs {
	/// Attributes for an object with no leader.
	pub fn new(kind: impl Into<ScopeKind>, id: ObjectId) -> Self {
		Self {
			kind: kind.into(),
			id,
			leader: None,
		}
	}

	/// Builder: set the leader.
	pub fn with_leader(mut self, leader: UserId) -> Self {
		self.leader = Some(leader);
		self
	}
}

/// The target of a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScopeRef {
	/// No scope: the check targets the module as a whole.
	Global,
	/// A concrete domain object.
	Object(ScopeAttrs),
	/// A named string key (e.g. an event type).
	Key(String),
}

/// The canonical `(kind, object id, key)` triple of a scope reference.
///
/// At most one of the object pair and the key is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedScope<'a> {
	pub kind: Option<&'a ScopeKind>,
	pub object_id: Option<ObjectId>,
	pub key: Option<&'a str>,
}

impl ScopeRef {
	/// An object scope from pre-loaded attributes.
	pub fn object(attrs: ScopeAttrs) -> Self {
		Self::Object(attrs)
	}

	/// A key scope.
	pub fn key(key: impl Into<String>) -> Self {
		Self::Key(key.into())
	}

	/// Reduce the scope to its canonical triple. No side effects.
	pub fn normalize(&self) -> NormalizedScope<'_> {
		match self {
			ScopeRef::Global => NormalizedScope {
				kind: None,
				object_id: None,
				key: None,
			},
			ScopeRef::Object(attrs) => NormalizedScope {
				kind: Some(&attrs.kind),
				object_id: Some(attrs.id),
				key: None,
			},
			ScopeRef::Key(key) => NormalizedScope {
				kind: None,
				object_id: None,
				key: Some(key),
			},
		}
	}

	/// Build a scope reference from a loosely-typed JSON value.
	///
	/// `null` maps to [`ScopeRef::Global`], a string to [`ScopeRef::Key`],
	/// and an object with `kind`/`id` (and optional `leader`) fields to
	/// [`ScopeRef::Object`].
	///
	/// # Errors
	///
	/// Returns [`AuthError::UnsupportedScope`] for any other shape.
	pub fn from_json(value: &serde_json::Value) -> Result<Self, AuthError> {
		match value {
			serde_json::Value::Null => Ok(ScopeRef::Global),
			serde_json::Value::String(key) => Ok(ScopeRef::Key(key.clone())),
			serde_json::Value::Object(_) => serde_json::from_value(value.clone())
				.map(ScopeRef::Object)
				.map_err(|e| AuthError::UnsupportedScope(e.to_string())),
			serde_json::Value::Bool(_) => Err(AuthError::UnsupportedScope("boolean".to_string())),
			serde_json::Value::Number(_) => Err(AuthError::UnsupportedScope("number".to_string())),
			serde_json::Value::Array(_) => Err(AuthError::UnsupportedScope("array".to_string())),
		}
	}
}
