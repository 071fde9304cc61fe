// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The attest module provides an [`AttestationClient`] to request fresh
//! attestation tokens from the local Confidential Space vTPM attestation
//! service over its Unix domain socket.  The returned token is opaque here;
//! validation is the token module's job.

pub use self::client::AttestationClient;
pub use self::client::TokenType;
pub use self::errors::Error;

mod client;
mod errors;
