// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission-name matching.

/// Whether a grant's permission field covers a requested permission.
///
/// `"*"` covers every permission; anything else must match exactly. There is
/// no prefix or pattern matching.
pub fn permission_matches(grant_permission: &str, requested_permission: &str) -> bool {
	grant_permission == "*" || grant_permission == requested_permission
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn exact_match() {
		assert!(permission_matches("modify", "modify"));
		assert!(!permission_matches("modify", "delete"));
	}

	#[test]
	fn no_prefix_matching() {
		assert!(!permission_matches("modify", "modifyqualification"));
		assert!(!permission_matches("modifyqualification", "modify"));
	}

	proptest! {
			#[test]
			fn wildcard_matches_anything(
					requested in "[a-z_]{1,30}"
			) {
					prop_assert!(permission_matches("*", &requested));
			}

			#[test]
			fn equality_is_symmetric(
					a in "[a-z_]{1,30}",
					b in "[a-z_]{1,30}"
			) {
					prop_assume!(a != "*" && b != "*");
					prop_assert_eq!(permission_matches(&a, &b), permission_matches(&b, &a));
			}
	}
}
