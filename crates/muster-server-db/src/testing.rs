// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.create_if_missing(true);

	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool")
}

pub async fn create_permission_tables(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS permission_groups (
			id TEXT PRIMARY KEY,
			name TEXT UNIQUE NOT NULL,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS permission_memberships (
			id TEXT PRIMARY KEY,
			group_id TEXT NOT NULL REFERENCES permission_groups(id) ON DELETE CASCADE,
			user_id TEXT NOT NULL,
			created_at TEXT NOT NULL,
			UNIQUE(group_id, user_id)
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS permission_grants (
			id TEXT PRIMARY KEY,
			group_id TEXT NOT NULL REFERENCES permission_groups(id) ON DELETE CASCADE,
			module TEXT NOT NULL,
			permission TEXT NOT NULL,
			effect TEXT NOT NULL,
			scope_kind TEXT,
			scope_object_id TEXT,
			scope_key TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL,
			UNIQUE(module, permission, scope_kind, scope_object_id, effect)
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_sections_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS sections (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			platoon_id TEXT,
			position INTEGER
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_nav_shortcuts_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS nav_shortcuts (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			url TEXT NOT NULL,
			position INTEGER
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_permission_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_permission_tables(&pool).await;
	pool
}

pub async fn create_ordering_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_sections_table(&pool).await;
	create_nav_shortcuts_table(&pool).await;
	pool
}
