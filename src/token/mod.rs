// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The token module provides a [`TokenValidator`] object to encapsulate the
//! trust logic used for validation of a Confidential Space vTPM attestation
//! token.
//!
//! # Example
//!
//! The following example assumes `token` contains a signed attestation token
//! obtained from the local attestation service.
//!
//! ```no_run
//! use cstoken::token::TokenValidator;
//!
//! # async fn doc(token: &str) -> Result<(), cstoken::token::Error> {
//! let validator = TokenValidator::new()?;
//!
//! // decode the header to select the PKI or OIDC scheme, fetch the trust
//! // material from the issuer's well-known endpoints, check the
//! // certificate chain (PKI) or JWKS key (OIDC), and verify the signature
//! let claims = validator.validate(token).await?;
//!
//! // use the verified claims
//! println!("{}", serde_json::Value::Object(claims));
//! # Ok(())
//! # }
//! ```

pub use self::chain::CertificateChain;
pub use self::errors::Error;
pub use self::header::decode_for_debug;
pub use self::header::Header;
pub use self::validator::Claims;
pub use self::validator::TokenValidator;

mod chain;
mod errors;
mod header;
mod jwk;
mod validator;
mod wellknown;

#[cfg(test)]
mod testutil;
