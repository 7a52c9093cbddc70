// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Inherited permission rules.
//!
//! Inherited rules grant access through a relationship to the scope object
//! (e.g. being its designated leader) rather than an explicit grant. The
//! table is code-defined and read-only at runtime; the decision engine
//! consults it only after no explicit grant has decided the outcome.

use crate::scope::ScopeRef;
use crate::types::{Module, UserId};

/// A code-defined fallback rule.
///
/// The predicate is a pure function over the requesting user and the
/// pre-loaded scope attributes.
#[derive(Debug, Clone, Copy)]
pub struct InheritedRule {
	pub module: Module,
	/// Permission names this rule covers.
	pub permissions: &'static [&'static str],
	pub check: fn(UserId, &ScopeRef) -> bool,
}

/// True when the scope object's designated leader is the requesting user.
fn scope_leader_is_user(user_id: UserId, scope: &ScopeRef) -> bool {
	match scope {
		ScopeRef::Object(attrs) => attrs.leader == Some(user_id),
		_ => false,
	}
}

const BUILTIN_RULES: &[InheritedRule] = &[InheritedRule {
	module: Module::Orbat,
	permissions: &["modify", "changedescription", "approve_application"],
	check: scope_leader_is_user,
}];

/// The built-in rule table: orbat leaders may manage their own element.
pub fn builtin_rules() -> &'static [InheritedRule] {
	BUILTIN_RULES
}

/// Evaluate the rule table for a user and scope.
///
/// Returns true on the first rule whose module and permission set match and
/// whose predicate passes; false when no rule applies.
pub fn check_inherited(
	rules: &[InheritedRule],
	user_id: UserId,
	permission: &str,
	module: Module,
	scope: &ScopeRef,
) -> bool {
	for rule in rules {
		if rule.module != module {
			continue;
		}
		if !rule.permissions.contains(&permission) {
			continue;
		}
		if (rule.check)(user_id, scope) {
			return true;
		}
	}
	false
}
