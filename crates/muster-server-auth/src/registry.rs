// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The permission registry: which `(module, permission)` pairs exist and
//! which scope kinds each may be scoped to.
//!
//! The registry is a static table resolved in two phases. Declarations carry
//! either a fixed kind list or a resolver function for scope sets that
//! depend on other configuration (event types). [`PermissionRegistry::resolve`]
//! runs every resolver once and returns a [`ResolvedRegistry`] of concrete
//! sets; lookups never invoke deferred code.
//!
//! An unknown pair is not an error anywhere in evaluation — the registry
//! only feeds diagnostics and admin tooling (form choices, grant-scope
//! validation hints).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::types::{Module, ScopeKind};

/// Event-type keys that event permissions may be scoped to.
const EVENT_TYPE_KINDS: &[&str] = &["operation", "training", "social"];

/// Where a permission's allowed scope kinds come from.
#[derive(Debug, Clone, Copy)]
pub enum ScopeSource {
	/// A fixed list of kinds.
	Static(&'static [&'static str]),
	/// Resolved by a function at [`PermissionRegistry::resolve`] time.
	Dynamic(fn() -> AllowedScopes),
}

/// A declared permission within a module.
#[derive(Debug, Clone, Copy)]
pub struct PermissionSpec {
	pub name: &'static str,
	pub scopes: ScopeSource,
}

/// Concrete allowed scopes for one permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedScopes {
	pub kinds: BTreeSet<ScopeKind>,
	/// Whether the permission may also be granted globally (no scope).
	pub allow_global: bool,
}

impl AllowedScopes {
	fn from_static(kinds: &[&str]) -> Self {
		Self {
			kinds: kinds.iter().map(|k| ScopeKind::new(*k)).collect(),
			allow_global: false,
		}
	}
}

fn event_scopes() -> AllowedScopes {
	AllowedScopes {
		kinds: EVENT_TYPE_KINDS.iter().map(|k| ScopeKind::new(*k)).collect(),
		allow_global: true,
	}
}

const TRAINING_PERMISSIONS: &[PermissionSpec] = &[
	PermissionSpec {
		name: "modifyqualification",
		scopes: ScopeSource::Static(&["qualification"]),
	},
	PermissionSpec {
		name: "addqualification",
		scopes: ScopeSource::Static(&["qualification"]),
	},
	PermissionSpec {
		name: "removequalification",
		scopes: ScopeSource::Static(&["qualification"]),
	},
	PermissionSpec {
		name: "addcriteria",
		scopes: ScopeSource::Static(&["qualification", "qualificationcriterion"]),
	},
	PermissionSpec {
		name: "removecriteria",
		scopes: ScopeSource::Static(&["qualification", "qualificationcriterion"]),
	},
	PermissionSpec {
		name: "modifycriteria",
		scopes: ScopeSource::Static(&["qualification", "qualificationcriterion"]),
	},
	PermissionSpec {
		name: "grantqualification",
		scopes: ScopeSource::Static(&["qualification"]),
	},
];

const EVENTS_PERMISSIONS: &[PermissionSpec] = &[
	PermissionSpec {
		name: "create",
		scopes: ScopeSource::Dynamic(event_scopes),
	},
	PermissionSpec {
		name: "modify",
		scopes: ScopeSource::Dynamic(event_scopes),
	},
	PermissionSpec {
		name: "delete",
		scopes: ScopeSource::Dynamic(event_scopes),
	},
];

const ORBAT_PERMISSIONS: &[PermissionSpec] = &[
	PermissionSpec {
		name: "create",
		scopes: ScopeSource::Static(&["platoon", "section"]),
	},
	PermissionSpec {
		name: "modify",
		scopes: ScopeSource::Static(&["platoon", "section"]),
	},
	PermissionSpec {
		name: "delete",
		scopes: ScopeSource::Static(&["platoon", "section"]),
	},
];

const BUILTIN_MODULES: &[(Module, &[PermissionSpec])] = &[
	(Module::Training, TRAINING_PERMISSIONS),
	(Module::Events, EVENTS_PERMISSIONS),
	(Module::Orbat, ORBAT_PERMISSIONS),
];

/// The static permission table.
#[derive(Debug, Clone, Copy)]
pub struct PermissionRegistry {
	modules: &'static [(Module, &'static [PermissionSpec])],
}

impl PermissionRegistry {
	/// The built-in table covering the orbat, training, and events modules.
	pub fn builtin() -> Self {
		Self {
			modules: BUILTIN_MODULES,
		}
	}

	/// Resolve every scope source into concrete sets.
	pub fn resolve(&self) -> ResolvedRegistry {
		let mut modules = BTreeMap::new();
		for (module, permissions) in self.modules {
			let mut resolved: BTreeMap<String, AllowedScopes> = BTreeMap::new();
			for spec in *permissions {
				let scopes = match spec.scopes {
					ScopeSource::Static(kinds) => AllowedScopes::from_static(kinds),
					ScopeSource::Dynamic(resolver) => resolver(),
				};
				resolved.insert(spec.name.to_string(), scopes);
			}
			modules.insert(*module, resolved);
		}
		ResolvedRegistry { modules }
	}
}

/// A registry with every dynamic scope source resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRegistry {
	modules: BTreeMap<Module, BTreeMap<String, AllowedScopes>>,
}

impl ResolvedRegistry {
	/// Whether the `(module, permission)` pair is declared.
	pub fn contains(&self, module: Module, permission: &str) -> bool {
		self
			.modules
			.get(&module)
			.is_some_and(|permissions| permissions.contains_key(permission))
	}

	/// The allowed scope kinds for a declared permission.
	pub fn allowed_scopes(&self, module: Module, permission: &str) -> Option<&AllowedScopes> {
		self.modules.get(&module)?.get(permission)
	}

	/// The declared permission names for a module. Used by admin forms to
	/// offer valid choices.
	pub fn permissions_for(&self, module: Module) -> Vec<&str> {
		self
			.modules
			.get(&module)
			.map(|permissions| permissions.keys().map(String::as_str).collect())
			.unwrap_or_default()
	}

	/// Whether a kind is an allowed scope for a declared permission.
	pub fn kind_allowed(&self, module: Module, permission: &str, kind: &ScopeKind) -> bool {
		self
			.allowed_scopes(module, permission)
			.is_some_and(|scopes| scopes.kinds.contains(kind))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn resolved() -> ResolvedRegistry {
		PermissionRegistry::builtin().resolve()
	}

	#[test]
	fn builtin_declares_orbat_crud() {
		let registry = resolved();
		for permission in ["create", "modify", "delete"] {
			assert!(registry.contains(Module::Orbat, permission));
		}
	}

	#[test]
	fn unknown_pairs_are_absent() {
		let registry = resolved();
		assert!(!registry.contains(Module::Orbat, "launch"));
		assert!(!registry.contains(Module::Training, "create"));
	}

	#[test]
	fn training_permission_count_matches_table() {
		let registry = resolved();
		assert_eq!(registry.permissions_for(Module::Training).len(), 7);
	}

	#[test]
	fn static_scopes_resolve_without_global() {
		let registry = resolved();
		let scopes = registry.allowed_scopes(Module::Orbat, "modify").unwrap();
		assert!(!scopes.allow_global);
		assert!(scopes.kinds.contains(&ScopeKind::new("section")));
		assert!(scopes.kinds.contains(&ScopeKind::new("platoon")));
	}

	#[test]
	fn dynamic_scopes_resolve_event_kinds_and_global() {
		let registry = resolved();
		let scopes = registry.allowed_scopes(Module::Events, "create").unwrap();
		assert!(scopes.allow_global);
		assert_eq!(scopes.kinds.len(), EVENT_TYPE_KINDS.len());
	}

	#[test]
	fn kind_allowed_checks_membership() {
		let registry = resolved();
		assert!(registry.kind_allowed(Module::Orbat, "modify", &ScopeKind::new("section")));
		assert!(!registry.kind_allowed(Module::Orbat, "modify", &ScopeKind::new("qualification")));
		assert!(!registry.kind_allowed(Module::Orbat, "launch", &ScopeKind::new("section")));
	}

	#[test]
	fn resolve_is_deterministic() {
		assert_eq!(resolved(), resolved());
	}
}
