// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Confidential Space vTPM attestation token handling.
//!
//! This crate provides an API to request and validate attestation tokens
//! issued by the Confidential Space attestation service.  A token proves
//! that a workload ran inside a genuine trusted execution environment.
//!
//! The API allows:
//! * Requesting a fresh token from the local vTPM attestation service over
//!   its Unix domain socket
//! * Validating a token through the PKI scheme (embedded x5c certificate
//!   chain anchored in a pinned root certificate)
//! * Validating a token through the OIDC scheme (signing key discovered via
//!   the issuer's well-known OpenID configuration and JWKS endpoints)

pub mod attest;
pub mod token;
