// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Remote session store client.
//!
//! Two endpoints cover all three session operations: `POST /store/set`
//! publishes a signed encrypted share, `GET /store/get` retrieves one by
//! public key. The client carries no protocol logic and makes exactly one
//! attempt per call; retries and failure meaning belong to the caller.

pub mod client;
pub mod connectivity;

pub use client::{HttpSessionStore, SessionStoreApi, StoreApiError};
pub use connectivity::{AlwaysReachable, ConnectivityProbe};
