// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid token format: {0}")]
    InvalidFormat(String),
    #[error("Failed to parse token header: {0}")]
    HeaderParse(String),
    #[error("Invalid algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unable to find appropriate key id (kid): {0}")]
    KeyNotFound(String),
    #[error("Failed to parse certificates: {0}")]
    CertificateParse(String),
    #[error("Invalid certificate chain: {0}")]
    InvalidCertificateChain(String),
    #[error("Signature validation error: {0}")]
    SignatureValidation(String),
    #[error("Token has expired")]
    TokenExpired,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidFormat(e)
            | Error::HeaderParse(e)
            | Error::UnsupportedAlgorithm(e)
            | Error::Validation(e)
            | Error::KeyNotFound(e)
            | Error::CertificateParse(e)
            | Error::InvalidCertificateChain(e)
            | Error::SignatureValidation(e) => {
                write!(f, "{}", e)
            }
            Error::TokenExpired => {
                write!(f, "token has expired")
            }
        }
    }
}
