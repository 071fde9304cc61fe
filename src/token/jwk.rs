// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use base64::{self, engine::general_purpose, Engine as _};
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk};
use jsonwebtoken::DecodingKey;
use openssl::bn::BigNum;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use tracing::debug;

/// Convert a JWK into a verification key.
///
/// The structured conversion is tried first.  Only if that fails, the RSA
/// components are re-padded, base64-decoded and the key is rebuilt from the
/// raw modulus and exponent.  The fallback yields the same key as the
/// primary path; there is no weaker conversion.  If both fail, the error
/// reports both causes.
pub fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, Error> {
    match DecodingKey::from_jwk(jwk) {
        Ok(key) => Ok(key),
        Err(primary) => {
            debug!("structured JWK conversion failed ({primary}), trying raw components");

            decoding_key_from_raw_components(jwk).map_err(|fallback| {
                Error::Validation(format!(
                    "failed to convert JWK to public key: {primary}; fallback also failed: {fallback}"
                ))
            })
        }
    }
}

/// Rebuild the RSA public key from the JWK's n/e fields, decoded by hand.
fn decoding_key_from_raw_components(jwk: &Jwk) -> Result<DecodingKey, Error> {
    let AlgorithmParameters::RSA(params) = &jwk.algorithm else {
        return Err(Error::Validation(
            "JWK does not carry RSA parameters".to_string(),
        ));
    };

    let n = decode_padded(&params.n)?;
    let e = decode_padded(&params.e)?;

    let rsa = Rsa::from_public_components(
        BigNum::from_slice(&n).map_err(|e| Error::Validation(e.to_string()))?,
        BigNum::from_slice(&e).map_err(|e| Error::Validation(e.to_string()))?,
    )
    .map_err(|e| Error::Validation(e.to_string()))?;

    let pem = PKey::from_rsa(rsa)
        .and_then(|k| k.public_key_to_pem())
        .map_err(|e| Error::Validation(e.to_string()))?;

    DecodingKey::from_rsa_pem(&pem).map_err(|e| Error::Validation(e.to_string()))
}

/// Translate base64url to the standard alphabet and restore the padding
/// stripped by JWK encoding.
fn decode_padded(v: &str) -> Result<Vec<u8>, Error> {
    let mut s = v.replace('-', "+").replace('_', "/");

    while s.len() % 4 != 0 {
        s.push('=');
    }

    general_purpose::STANDARD
        .decode(s)
        .map_err(|e| Error::Validation(e.to_string()))
}
