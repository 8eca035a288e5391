// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Manager Error Taxonomy
//!
//! Flat error enumeration surfaced by every session operation. There is no
//! recovery hierarchy: each failure maps to exactly one kind and is returned
//! to the caller, never retried or swallowed internally. Errors raised by the
//! underlying crypto, codec and network primitives are caught at the
//! operation boundary in [`crate::manager::SessionManager`] and mapped to the
//! nearest kind here, never leaked raw.

use thiserror::Error;

/// Failure kinds for session create/authorize/invalidate operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionManagerError {
    /// No persisted session id; the caller must log in again first.
    #[error("SessionID not found!")]
    SessionIdNotFound,

    /// Serializing a wire record failed.
    #[error("Encoding Error")]
    EncodingError,

    /// Parsing or unpadding a wire record failed.
    #[error("Decoding Error")]
    DecodingError,

    /// Local precondition failed, typically no network connectivity.
    #[error("Runtime Error")]
    RuntimeError,

    /// The remote store rejected the lookup or returned nothing.
    #[error("Session Expired or Invalid public key!")]
    SessionExpired,

    /// The remote call itself failed.
    #[error("Something went wrong!")]
    SomethingWentWrong,

    /// Decrypt or parse failed while authorizing a retrieved session.
    #[error("No user found, please login again!")]
    NoUserFound,

    /// The entropy source or key primitive was unavailable.
    #[error("Key generation failed")]
    KeyGenerationError,
}
