// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
	#[error("unsupported scope type: {0}")]
	UnsupportedScope(String),

	#[error("invalid grant definition: {0}")]
	InvalidGrant(String),

	#[error("unknown module: {0}")]
	UnknownModule(String),

	#[error("unknown effect: {0}")]
	UnknownEffect(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
