// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dense, scope-partitioned ordering over records.
//!
//! Any table with an integer position column can opt in: declare an
//! [`OrderingSpec`] (table, columns, scope columns) and implement
//! [`Orderable`] on the record type. Within each scope partition the
//! position values form the contiguous sequence `1..N`; ties are broken by
//! ascending record id.
//!
//! Moves are pairwise swaps ([`OrderedCollection::move_up`] /
//! [`OrderedCollection::move_down`]) or block shifts
//! ([`OrderedCollection::move_to`]). Either can transiently leave gaps or
//! duplicates, so every move finishes with
//! [`OrderedCollection::fix_ordering`], the idempotent renumbering pass
//! that restores the dense sequence. Each move and each repair runs in a
//! single transaction; block shifts are one conditional UPDATE over
//! scope + range rather than a write per row.

use std::collections::BTreeMap;
use std::fmt;

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::error::DbError;

/// Unique identifier for an ordered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
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
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<Uuid> for RecordId {
	fn from(id: Uuid) -> Self {
		Self(id)
	}
}

/// Static ordering configuration for one record type.
///
/// `scope_columns` partitions the ordering space; an empty list declares a
/// single global sequence. Column names are compile-time constants, never
/// user input.
#[derive(Debug, Clone, Copy)]
pub struct OrderingSpec {
	pub table: &'static str,
	pub id_column: &'static str,
	pub position_column: &'static str,
	pub scope_columns: &'static [&'static str],
}

/// The narrow interface an ordered record exposes.
pub trait Orderable {
	fn record_id(&self) -> RecordId;

	/// The current position, if one has been assigned.
	fn position(&self) -> Option<i64>;

	fn set_position(&mut self, position: i64);

	/// The record's value for each scope column, in `scope_columns` order.
	/// A `None` value excludes that column from scope filters, tolerating
	/// nullable scope dimensions.
	fn scope_values(&self) -> Vec<(&'static str, Option<String>)>;
}

/// Maintains the position column of one ordered table.
#[derive(Clone)]
pub struct OrderedCollection {
	pool: SqlitePool,
	spec: OrderingSpec,
}

impl OrderedCollection {
	/// Create a collection over the given pool and spec.
	pub fn new(pool: SqlitePool, spec: OrderingSpec) -> Self {
		Self { pool, spec }
	}

	/// The ordering configuration.
	pub fn spec(&self) -> &OrderingSpec {
		&self.spec
	}

	/// Assign a position to a record that has none: `max(position)` within
	/// its scope plus one, or 1 in an empty scope. Records with a position
	/// keep it. In-memory only; pair with [`Self::save`] to persist.
	pub async fn ensure_position<R: Orderable>(&self, record: &mut R) -> Result<(), DbError> {
		if record.position().is_some() {
			return Ok(());
		}
		let (clauses, binds) = scope_clauses(record);
		let max = self.max_position(&clauses, &binds).await?;
		record.set_position(max.unwrap_or(0) + 1);
		Ok(())
	}

	/// Persist a record's position, assigning one first if unset. The row
	/// itself must already exist; only the position column is written.
	#[instrument(level = "debug", skip(self, record), fields(table = self.spec.table))]
	pub async fn save<R: Orderable>(&self, record: &mut R) -> Result<(), DbError> {
		self.ensure_position(record).await?;
		let sql = format!(
			"UPDATE {} SET {} = ? WHERE {} = ?",
			self.spec.table, self.spec.position_column, self.spec.id_column
		);
		sqlx::query(&sql)
			.bind(record.position())
			.bind(record.record_id().to_string())
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	/// Swap the record with its nearest neighbor above. A no-op at the top
	/// of the scope. Finishes with [`Self::fix_ordering`].
	#[instrument(level = "debug", skip(self, record), fields(table = self.spec.table))]
	pub async fn move_up<R: Orderable>(&self, record: &mut R) -> Result<(), DbError> {
		let Some(current) = record.position() else {
			return Err(DbError::Internal(
				"cannot move a record with no position".to_string(),
			));
		};
		let (clauses, binds) = scope_clauses(record);
		let Some((neighbor_id, neighbor_position)) =
			self.neighbor_above(&clauses, &binds, current).await?
		else {
			return Ok(());
		};
		self
			.swap_positions(record, current, &neighbor_id, neighbor_position)
			.await?;
		self.fix_ordering().await?;
		Ok(())
	}

	/// Swap the record with its nearest neighbor below. A no-op at the
	/// bottom of the scope. Finishes with [`Self::fix_ordering`].
	#[instrument(level = "debug", skip(self, record), fields(table = self.spec.table))]
	pub async fn move_down<R: Orderable>(&self, record: &mut R) -> Result<(), DbError> {
		let Some(current) = record.position() else {
			return Err(DbError::Internal(
				"cannot move a record with no position".to_string(),
			));
		};
		let (clauses, binds) = scope_clauses(record);
		let max = self.max_position(&clauses, &binds).await?.unwrap_or(current);
		if current >= max {
			return Ok(());
		}
		let Some((neighbor_id, neighbor_position)) =
			self.neighbor_below(&clauses, &binds, current).await?
		else {
			return Ok(());
		};
		self
			.swap_positions(record, current, &neighbor_id, neighbor_position)
			.await?;
		self.fix_ordering().await?;
		Ok(())
	}

	/// Move the record to a target position, shifting the block in between
	/// by one. A no-op when already at the target. Finishes with
	/// [`Self::fix_ordering`].
	#[instrument(level = "debug", skip(self, record), fields(table = self.spec.table))]
	pub async fn move_to<R: Orderable>(&self, record: &mut R, target: i64) -> Result<(), DbError> {
		let Some(current) = record.position() else {
			return Err(DbError::Internal(
				"cannot move a record with no position".to_string(),
			));
		};
		if target == current {
			return Ok(());
		}

		let (clauses, binds) = scope_clauses(record);
		let mut tx = self.pool.begin().await?;

		// One conditional bulk update over scope + range, not a write per row.
		let (shift_sql, low, high) = if target < current {
			(
				self.scoped_sql(
					&clauses,
					format!(
						"UPDATE {} SET {col} = {col} + 1",
						self.spec.table,
						col = self.spec.position_column
					),
					&format!(
						"{col} >= ? AND {col} < ?",
						col = self.spec.position_column
					),
				),
				target,
				current,
			)
		} else {
			(
				self.scoped_sql(
					&clauses,
					format!(
						"UPDATE {} SET {col} = {col} - 1",
						self.spec.table,
						col = self.spec.position_column
					),
					&format!(
						"{col} > ? AND {col} <= ?",
						col = self.spec.position_column
					),
				),
				current,
				target,
			)
		};
		let mut shift = sqlx::query(&shift_sql);
		for bind in &binds {
			shift = shift.bind(bind);
		}
		shift.bind(low).bind(high).execute(&mut *tx).await?;

		let assign_sql = format!(
			"UPDATE {} SET {} = ? WHERE {} = ?",
			self.spec.table, self.spec.position_column, self.spec.id_column
		);
		sqlx::query(&assign_sql)
			.bind(target)
			.bind(record.record_id().to_string())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;
		record.set_position(target);
		tracing::debug!(record_id = %record.record_id(), from = current, to = target, "record moved");

		self.fix_ordering().await?;
		Ok(())
	}

	/// Renumber every scope partition to the contiguous sequence `1..N`,
	/// sorted by `(position, id)`. Only rows whose position changes are
	/// written, so a second run performs zero writes. NULL scope values
	/// form their own partition. Safe to call at any time.
	///
	/// # Returns
	/// The number of rows rewritten.
	#[instrument(level = "debug", skip(self), fields(table = self.spec.table))]
	pub async fn fix_ordering(&self) -> Result<u64, DbError> {
		let mut tx = self.pool.begin().await?;

		let mut columns = vec![self.spec.id_column, self.spec.position_column];
		columns.extend_from_slice(self.spec.scope_columns);
		let select_sql = format!(
			"SELECT {} FROM {} ORDER BY {} ASC, {} ASC",
			columns.join(", "),
			self.spec.table,
			self.spec.position_column,
			self.spec.id_column
		);
		let rows = sqlx::query(&select_sql).fetch_all(&mut *tx).await?;

		// Partition by scope values, keeping the (position, id) sort within
		// each partition.
		let mut partitions: BTreeMap<Vec<Option<String>>, Vec<(String, Option<i64>)>> =
			BTreeMap::new();
		for row in &rows {
			let id: String = row.try_get(0)?;
			let position: Option<i64> = row.try_get(1)?;
			let mut key = Vec::with_capacity(self.spec.scope_columns.len());
			for index in 0..self.spec.scope_columns.len() {
				key.push(row.try_get::<Option<String>, _>(2 + index)?);
			}
			partitions.entry(key).or_default().push((id, position));
		}

		let update_sql = format!(
			"UPDATE {} SET {} = ? WHERE {} = ?",
			self.spec.table, self.spec.position_column, self.spec.id_column
		);
		let mut writes = 0u64;
		for records in partitions.values() {
			for (index, (id, position)) in records.iter().enumerate() {
				let expected = index as i64 + 1;
				if *position != Some(expected) {
					sqlx::query(&update_sql)
						.bind(expected)
						.bind(id)
						.execute(&mut *tx)
						.await?;
					writes += 1;
				}
			}
		}

		tx.commit().await?;
		if writes > 0 {
			tracing::debug!(writes, "renumbered out-of-sequence records");
		}
		Ok(writes)
	}

	/// The stored position of a record, if the row exists and has one.
	pub async fn position_of(&self, id: &RecordId) -> Result<Option<i64>, DbError> {
		let sql = format!(
			"SELECT {} FROM {} WHERE {} = ?",
			self.spec.position_column, self.spec.table, self.spec.id_column
		);
		let row: Option<(Option<i64>,)> = sqlx::query_as(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.and_then(|(position,)| position))
	}

	// =========================================================================
	// Helpers
	// =========================================================================

	fn scoped_sql(&self, clauses: &[String], prefix: String, condition: &str) -> String {
		let mut conditions: Vec<String> = clauses.to_vec();
		conditions.push(condition.to_string());
		format!("{prefix} WHERE {}", conditions.join(" AND "))
	}

	async fn max_position(
		&self,
		clauses: &[String],
		binds: &[String],
	) -> Result<Option<i64>, DbError> {
		let mut sql = format!(
			"SELECT MAX({}) FROM {}",
			self.spec.position_column, self.spec.table
		);
		if !clauses.is_empty() {
			sql.push_str(" WHERE ");
			sql.push_str(&clauses.join(" AND "));
		}
		let mut query = sqlx::query_as::<_, (Option<i64>,)>(&sql);
		for bind in binds {
			query = query.bind(bind);
		}
		let (max,) = query.fetch_one(&self.pool).await?;
		Ok(max)
	}

	async fn neighbor_above(
		&self,
		clauses: &[String],
		binds: &[String],
		current: i64,
	) -> Result<Option<(String, i64)>, DbError> {
		let sql = self.scoped_sql(
			clauses,
			format!(
				"SELECT {}, {} FROM {}",
				self.spec.id_column, self.spec.position_column, self.spec.table
			),
			&format!("{} < ?", self.spec.position_column),
		);
		let sql = format!(
			"{sql} ORDER BY {} DESC, {} DESC LIMIT 1",
			self.spec.position_column, self.spec.id_column
		);
		let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
		for bind in binds {
			query = query.bind(bind);
		}
		Ok(query.bind(current).fetch_optional(&self.pool).await?)
	}

	async fn neighbor_below(
		&self,
		clauses: &[String],
		binds: &[String],
		current: i64,
	) -> Result<Option<(String, i64)>, DbError> {
		let sql = self.scoped_sql(
			clauses,
			format!(
				"SELECT {}, {} FROM {}",
				self.spec.id_column, self.spec.position_column, self.spec.table
			),
			&format!("{} > ?", self.spec.position_column),
		);
		let sql = format!(
			"{sql} ORDER BY {} ASC, {} ASC LIMIT 1",
			self.spec.position_column, self.spec.id_column
		);
		let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
		for bind in binds {
			query = query.bind(bind);
		}
		Ok(query.bind(current).fetch_optional(&self.pool).await?)
	}

	/// Exchange positions with a neighbor in one transaction.
	async fn swap_positions<R: Orderable>(
		&self,
		record: &mut R,
		current: i64,
		neighbor_id: &str,
		neighbor_position: i64,
	) -> Result<(), DbError> {
		let sql = format!(
			"UPDATE {} SET {} = ? WHERE {} = ?",
			self.spec.table, self.spec.position_column, self.spec.id_column
		);
		let mut tx = self.pool.begin().await?;
		sqlx::query(&sql)
			.bind(current)
			.bind(neighbor_id)
			.execute(&mut *tx)
			.await?;
		sqlx::query(&sql)
			.bind(neighbor_position)
			.bind(record.record_id().to_string())
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;
		record.set_position(neighbor_position);
		tracing::debug!(
			record_id = %record.record_id(),
			from = current,
			to = neighbor_position,
			"swapped with neighbor"
		);
		Ok(())
	}
}

/// The scope filter for a record: one `column = ?` clause per scope column
/// with a non-null value, plus the values to bind.
fn scope_clauses<R: Orderable>(record: &R) -> (Vec<String>, Vec<String>) {
	let mut clauses = Vec::new();
	let mut binds = Vec::new();
	for (column, value) in record.scope_values() {
		if let Some(value) = value {
			clauses.push(format!("{column} = ?"));
			binds.push(value);
		}
	}
	(clauses, binds)
}
