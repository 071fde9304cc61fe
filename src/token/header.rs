// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use base64::{self, engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::Value;

/// The JOSE header of an attestation token, decoded without any signature
/// verification.  No trust is implied by a successful decode.
#[derive(Clone, Deserialize, Debug)]
pub struct Header {
    /// Signing algorithm, e.g. "RS256"
    pub alg: String,
    /// Key identifier used for the OIDC JWKS lookup
    pub kid: Option<String>,
    /// Base64 DER certificate chain, present only for PKI-scheme tokens.
    /// Ordered leaf, intermediate, root.
    pub x5c: Option<Vec<String>>,
}

impl Header {
    /// Decode the header segment of a token.  Fails if the token is not made
    /// of three dot-separated segments, or if the first segment is not
    /// base64url-encoded JSON.
    pub fn decode(token: &str) -> Result<Header, Error> {
        let segments = split_token(token)?;

        let raw = general_purpose::URL_SAFE_NO_PAD
            .decode(segments[0])
            .map_err(|e| Error::HeaderParse(e.to_string()))?;

        serde_json::from_slice(&raw).map_err(|e| Error::HeaderParse(e.to_string()))
    }
}

fn split_token(token: &str) -> Result<Vec<&str>, Error> {
    let segments: Vec<&str> = token.split('.').collect();

    if segments.len() != 3 {
        return Err(Error::InvalidFormat(format!(
            "expecting 3 dot-separated segments, got {}",
            segments.len()
        )));
    }

    Ok(segments)
}

/// Decode a token's header and payload without verifying anything.
///
/// This bypasses all signature and trust checks and MUST NOT be used for
/// trust decisions.  It exists for debugging and for the CLI `decode`
/// subcommand only; no validation path calls it.
pub fn decode_for_debug(token: &str) -> Result<(Value, Value), Error> {
    let segments = split_token(token)?;

    let mut decoded: Vec<Value> = Vec::with_capacity(2);

    for segment in &segments[..2] {
        let raw = general_purpose::URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| Error::HeaderParse(e.to_string()))?;

        decoded.push(serde_json::from_slice(&raw).map_err(|e| Error::HeaderParse(e.to_string()))?);
    }

    let payload = decoded.pop().unwrap();
    let header = decoded.pop().unwrap();

    Ok((header, payload))
}
