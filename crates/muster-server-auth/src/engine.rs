// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The permission decision engine.
//!
//! [`PermissionEngine::evaluate`] turns a principal, a requested permission,
//! and a pre-fetched grant list into an allow/deny decision. Evaluation is a
//! pure function — no store access, all attributes pre-loaded — so the
//! precedence rules are easy to test in isolation:
//!
//! 1. Anonymous principals are denied, superusers allowed, before any grant
//!    is looked at.
//! 2. A matching Deny grant ends evaluation immediately. Deny wins over any
//!    number of matching Allows and over every inherited rule.
//! 3. A matching Allow is recorded but scanning continues — a later Deny
//!    still overrides.
//! 4. Only when no explicit grant decided the outcome does the inherited
//!    rule table run.
//!
//! A permission check is expected to fail routinely; a `false` result is a
//! normal outcome, not an error.

use tracing::instrument;

use crate::grant::Grant;
use crate::matcher::permission_matches;
use crate::registry::{PermissionRegistry, ResolvedRegistry};
use crate::rules::{builtin_rules, check_inherited, InheritedRule};
use crate::scope::ScopeRef;
use crate::types::{Effect, Module, Principal};

/// Evaluates permission checks against grants and inherited rules.
#[derive(Debug, Clone)]
pub struct PermissionEngine {
	registry: ResolvedRegistry,
	rules: &'static [InheritedRule],
}

impl PermissionEngine {
	/// An engine over the built-in registry and rule table.
	pub fn new() -> Self {
		Self {
			registry: PermissionRegistry::builtin().resolve(),
			rules: builtin_rules(),
		}
	}

	/// An engine over an explicit registry and rule table.
	pub fn with_rules(registry: ResolvedRegistry, rules: &'static [InheritedRule]) -> Self {
		Self { registry, rules }
	}

	/// The resolved registry backing diagnostics and admin tooling.
	pub fn registry(&self) -> &ResolvedRegistry {
		&self.registry
	}

	/// Decide whether a principal holds a permission for a scope.
	///
	/// `grants` are the candidate grants for the principal's groups within
	/// `module`; their order carries no meaning. Grants from other modules
	/// are skipped.
	#[instrument(
		level = "debug",
		skip(self, grants, scope),
		fields(module = %module, grants = grants.len())
	)]
	pub fn evaluate(
		&self,
		principal: &Principal,
		permission: &str,
		module: Module,
		scope: &ScopeRef,
		grants: &[Grant],
	) -> bool {
		if !self.registry.contains(module, permission) {
			tracing::debug!(
				%module,
				permission,
				"permission check for undeclared module/permission pair"
			);
		}

		let subject = match principal {
			Principal::Anonymous => {
				tracing::debug!(%module, permission, "denied anonymous principal");
				return false;
			}
			Principal::Authenticated(subject) => subject,
		};

		if subject.superuser {
			return true;
		}

		let normalized = scope.normalize();
		let mut allow = false;
		for grant in grants {
			if grant.module != module {
				continue;
			}
			if !grant.scope.matches(&normalized) {
				continue;
			}
			if !permission_matches(&grant.permission, permission) {
				continue;
			}
			match grant.effect {
				Effect::Deny => {
					tracing::debug!(grant_id = %grant.id, "deny grant matched");
					return false;
				}
				Effect::Allow => allow = true,
			}
		}

		if allow {
			return true;
		}

		check_inherited(self.rules, subject.user_id, permission, module, scope)
	}
}

impl Default for PermissionEngine {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::grant::GrantScope;
	use crate::scope::ScopeAttrs;
	use crate::types::{GroupId, ObjectId, ScopeKind, UserId};

	fn engine() -> PermissionEngine {
		PermissionEngine::new()
	}

	fn group() -> GroupId {
		GroupId::generate()
	}

	fn section_scope(id: ObjectId) -> ScopeRef {
		ScopeRef::object(ScopeAttrs::new("section", id))
	}

	fn allow_grant(module: Module, permission: &str, scope: GrantScope) -> Grant {
		Grant::new(group(), module, permission, Effect::Allow, scope)
	}

	fn deny_grant(module: Module, permission: &str, scope: GrantScope) -> Grant {
		Grant::new(group(), module, permission, Effect::Deny, scope)
	}

	fn object_scope(id: ObjectId) -> GrantScope {
		GrantScope::Object {
			kind: ScopeKind::new("section"),
			id,
		}
	}

	mod principals {
		use super::*;

		#[test]
		fn anonymous_is_always_denied() {
			let grants = vec![allow_grant(Module::Orbat, "*", GrantScope::Global)];
			assert!(!engine().evaluate(
				&Principal::Anonymous,
				"modify",
				Module::Orbat,
				&ScopeRef::Global,
				&grants
			));
		}

		#[test]
		fn superuser_is_always_allowed() {
			let denies = vec![deny_grant(Module::Orbat, "*", GrantScope::Global)];
			assert!(engine().evaluate(
				&Principal::superuser(UserId::generate()),
				"modify",
				Module::Orbat,
				&ScopeRef::Global,
				&denies
			));
		}

		#[test]
		fn plain_user_with_no_grants_is_denied() {
			assert!(!engine().evaluate(
				&Principal::user(UserId::generate()),
				"modify",
				Module::Orbat,
				&ScopeRef::Global,
				&[]
			));
		}
	}

	mod grant_scanning {
		use super::*;

		#[test]
		fn matching_allow_grants_access() {
			let id = ObjectId::generate();
			let grants = vec![allow_grant(Module::Orbat, "modify", object_scope(id))];
			assert!(engine().evaluate(
				&Principal::user(UserId::generate()),
				"modify",
				Module::Orbat,
				&section_scope(id),
				&grants
			));
		}

		#[test]
		fn object_grant_does_not_cover_siblings() {
			let id = ObjectId::generate();
			let sibling = ObjectId::generate();
			let grants = vec![allow_grant(Module::Orbat, "modify", object_scope(id))];
			assert!(!engine().evaluate(
				&Principal::user(UserId::generate()),
				"modify",
				Module::Orbat,
				&section_scope(sibling),
				&grants
			));
		}

		#[test]
		fn kind_grant_covers_all_objects_of_kind() {
			let grants = vec![allow_grant(
				Module::Orbat,
				"modify",
				GrantScope::Kind {
					kind: ScopeKind::new("section"),
				},
			)];
			let user = Principal::user(UserId::generate());
			assert!(engine().evaluate(
				&user,
				"modify",
				Module::Orbat,
				&section_scope(ObjectId::generate()),
				&grants
			));
			assert!(engine().evaluate(
				&user,
				"modify",
				Module::Orbat,
				&section_scope(ObjectId::generate()),
				&grants
			));
		}

		#[test]
		fn wildcard_permission_covers_module() {
			let grants = vec![allow_grant(Module::Events, "*", GrantScope::Global)];
			let user = Principal::user(UserId::generate());
			for permission in ["create", "modify", "delete"] {
				assert!(engine().evaluate(
					&user,
					permission,
					Module::Events,
					&ScopeRef::Global,
					&grants
				));
			}
		}

		#[test]
		fn key_grant_matches_equal_key_only() {
			let grants = vec![allow_grant(
				Module::Events,
				"create",
				GrantScope::Key {
					key: "operation".to_string(),
				},
			)];
			let user = Principal::user(UserId::generate());
			assert!(engine().evaluate(
				&user,
				"create",
				Module::Events,
				&ScopeRef::key("operation"),
				&grants
			));
			assert!(!engine().evaluate(
				&user,
				"create",
				Module::Events,
				&ScopeRef::key("social"),
				&grants
			));
		}

		#[test]
		fn grants_from_other_modules_are_skipped() {
			let grants = vec![allow_grant(Module::Training, "*", GrantScope::Global)];
			assert!(!engine().evaluate(
				&Principal::user(UserId::generate()),
				"modify",
				Module::Orbat,
				&ScopeRef::Global,
				&grants
			));
		}

		#[test]
		fn undeclared_pair_still_evaluates() {
			let grants = vec![allow_grant(Module::Orbat, "launch", GrantScope::Global)];
			assert!(engine().evaluate(
				&Principal::user(UserId::generate()),
				"launch",
				Module::Orbat,
				&ScopeRef::Global,
				&grants
			));
		}
	}

	mod deny_precedence {
		use super::*;

		#[test]
		fn deny_overrides_allow_at_same_scope() {
			let id = ObjectId::generate();
			let grants = vec![
				allow_grant(Module::Orbat, "modify", object_scope(id)),
				deny_grant(Module::Orbat, "modify", object_scope(id)),
			];
			assert!(!engine().evaluate(
				&Principal::user(UserId::generate()),
				"modify",
				Module::Orbat,
				&section_scope(id),
				&grants
			));
		}

		#[test]
		fn narrow_deny_overrides_broad_allow() {
			let id = ObjectId::generate();
			let grants = vec![
				allow_grant(Module::Orbat, "modify", GrantScope::Global),
				deny_grant(Module::Orbat, "modify", object_scope(id)),
			];
			assert!(!engine().evaluate(
				&Principal::user(UserId::generate()),
				"modify",
				Module::Orbat,
				&section_scope(id),
				&grants
			));
		}

		#[test]
		fn deny_elsewhere_does_not_leak() {
			let id = ObjectId::generate();
			let other = ObjectId::generate();
			let grants = vec![
				allow_grant(
					Module::Orbat,
					"modify",
					GrantScope::Kind {
						kind: ScopeKind::new("section"),
					},
				),
				deny_grant(Module::Orbat, "modify", object_scope(other)),
			];
			assert!(engine().evaluate(
				&Principal::user(UserId::generate()),
				"modify",
				Module::Orbat,
				&section_scope(id),
				&grants
			));
		}

		#[test]
		fn deny_suppresses_inherited_allow() {
			let leader = UserId::generate();
			let id = ObjectId::generate();
			let scope =
				ScopeRef::object(ScopeAttrs::new("section", id).with_leader(leader));
			let grants = vec![deny_grant(Module::Orbat, "modify", object_scope(id))];
			assert!(!engine().evaluate(
				&Principal::user(leader),
				"modify",
				Module::Orbat,
				&scope,
				&grants
			));
		}
	}

	mod inherited_fallback {
		use super::*;

		#[test]
		fn leader_falls_back_to_inherited_rule() {
			let leader = UserId::generate();
			let scope = ScopeRef::object(
				ScopeAttrs::new("section", ObjectId::generate()).with_leader(leader),
			);
			assert!(engine().evaluate(
				&Principal::user(leader),
				"modify",
				Module::Orbat,
				&scope,
				&[]
			));
		}

		#[test]
		fn explicit_allow_takes_precedence_over_fallback() {
			let user = UserId::generate();
			let id = ObjectId::generate();
			let grants = vec![allow_grant(Module::Orbat, "modify", object_scope(id))];
			assert!(engine().evaluate(
				&Principal::user(user),
				"modify",
				Module::Orbat,
				&section_scope(id),
				&grants
			));
		}

		#[test]
		fn non_leader_has_no_fallback() {
			let scope = ScopeRef::object(
				ScopeAttrs::new("section", ObjectId::generate())
					.with_leader(UserId::generate()),
			);
			assert!(!engine().evaluate(
				&Principal::user(UserId::generate()),
				"modify",
				Module::Orbat,
				&scope,
				&[]
			));
		}
	}

	mod property_tests {
		use super::*;
		use proptest::prelude::*;

		proptest! {
				#[test]
				fn one_deny_beats_any_number_of_allows(
						allow_count in 0usize..8,
						deny_index in 0usize..8
				) {
						let id = ObjectId::generate();
						let mut grants: Vec<Grant> = (0..allow_count)
								.map(|_| allow_grant(Module::Orbat, "modify", object_scope(id)))
								.collect();
						let deny = deny_grant(Module::Orbat, "modify", GrantScope::Global);
						grants.insert(deny_index.min(grants.len()), deny);

						prop_assert!(!engine().evaluate(
								&Principal::user(UserId::generate()),
								"modify",
								Module::Orbat,
								&section_scope(id),
								&grants
						));
				}

				#[test]
				fn superuser_ignores_any_grant_set(
						deny_count in 0usize..8
				) {
						let grants: Vec<Grant> = (0..deny_count)
								.map(|_| deny_grant(Module::Orbat, "*", GrantScope::Global))
								.collect();
						prop_assert!(engine().evaluate(
								&Principal::superuser(UserId::generate()),
								"modify",
								Module::Orbat,
								&ScopeRef::Global,
								&grants
						));
				}

				#[test]
				fn decision_is_order_independent(
						rotate_by in 0usize..4
				) {
						let id = ObjectId::generate();
						let mut grants = vec![
								allow_grant(Module::Orbat, "modify", GrantScope::Global),
								deny_grant(Module::Orbat, "modify", object_scope(id)),
								allow_grant(Module::Orbat, "*", object_scope(id)),
						];
						let max_rotate = grants.len() - 1;
						grants.rotate_left(rotate_by.min(max_rotate));
						prop_assert!(!engine().evaluate(
								&Principal::user(UserId::generate()),
								"modify",
								Module::Orbat,
								&section_scope(id),
								&grants
						));
				}
		}
	}
}
