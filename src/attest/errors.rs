// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid nonce: {0}")]
    Nonce(String),
    #[error("Attestation service connection error: {0}")]
    Connection(String),
    #[error("Failed to get attestation response: {0}")]
    Status(String),
    #[error("Malformed attestation response: {0}")]
    Response(String),
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Nonce(e) | Error::Connection(e) | Error::Status(e) | Error::Response(e) => {
                write!(f, "{}", e)
            }
        }
    }
}
