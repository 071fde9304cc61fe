// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::chain::{self, CertificateChain};
use super::errors::Error;
use super::header::Header;
use super::jwk;
use super::wellknown::{OpenIdConfiguration, WellKnownFetcher};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use openssl::x509::X509;
use tracing::debug;

/// The only signing algorithm accepted for Confidential Space tokens.
const ALGO: Algorithm = Algorithm::RS256;
const ALGO_NAME: &str = "RS256";

const DEFAULT_ISSUER: &str = "https://confidentialcomputing.googleapis.com";
const DEFAULT_OIDC_ENDPOINT: &str = "/.well-known/openid-configuration";
const DEFAULT_PKI_ENDPOINT: &str = "/.well-known/confidential_space_root.crt";

/// SHA-1 fingerprint of the Confidential Space root certificate.  The sole
/// trust anchor for the PKI scheme.
const ROOT_CERT_FINGERPRINT: &str = "B9:51:20:74:2C:24:E3:AA:34:04:2E:1C:3B:A3:AA:D2:8B:21:23:21";

/// Claims carried by a validated token: an arbitrary JSON object, returned
/// verbatim only after the signature has verified.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Validates Confidential Space vTPM tokens through the PKI or OIDC scheme.
///
/// The scheme is selected per token: a header carrying an x5c certificate
/// chain is validated against the pinned root certificate (PKI), everything
/// else against the key set discovered from the issuer's OpenID
/// configuration (OIDC).  All configuration is fixed at construction; the
/// validator holds no mutable state and can be shared across tasks.
pub struct TokenValidator {
    expected_issuer: String,
    oidc_endpoint: String,
    pki_endpoint: String,
    root_fingerprint: String,
    fetcher: WellKnownFetcher,
}

impl TokenValidator {
    /// Return a validator pinned to the Confidential Space issuer and root
    /// certificate.
    pub fn new() -> Result<TokenValidator, Error> {
        Self::with_options(
            DEFAULT_ISSUER,
            DEFAULT_OIDC_ENDPOINT,
            DEFAULT_PKI_ENDPOINT,
            ROOT_CERT_FINGERPRINT,
        )
    }

    /// Return a validator for a non-default trust root.  Intended for tests
    /// and for deployments that speak to a different attestation provider.
    pub fn with_options(
        expected_issuer: &str,
        oidc_endpoint: &str,
        pki_endpoint: &str,
        root_fingerprint: &str,
    ) -> Result<TokenValidator, Error> {
        Ok(TokenValidator {
            expected_issuer: expected_issuer.to_string(),
            oidc_endpoint: oidc_endpoint.to_string(),
            pki_endpoint: pki_endpoint.to_string(),
            root_fingerprint: root_fingerprint.to_string(),
            fetcher: WellKnownFetcher::new()?,
        })
    }

    /// Validate a token and return its claims.
    ///
    /// The header is inspected (without trusting it) to pick the scheme,
    /// then the full set of trust checks for that scheme runs.  Any failure
    /// surfaces as a typed error; claims are never returned for a token
    /// whose signature did not verify.
    pub async fn validate(&self, token: &str) -> Result<Claims, Error> {
        let header = Header::decode(token)?;

        if header.alg != ALGO_NAME {
            return Err(Error::UnsupportedAlgorithm(format!(
                "got {}, expected {ALGO_NAME}",
                header.alg
            )));
        }

        match &header.x5c {
            Some(x5c) => {
                debug!("token carries x5c certificates, using PKI scheme");
                self.validate_pki(token, x5c).await
            }
            None => {
                debug!("no x5c certificates in header, using OIDC scheme");
                self.validate_oidc(token, header.kid.as_deref()).await
            }
        }
    }

    /// OIDC scheme: discover the JWKS, select the key named by the header
    /// kid, convert it, verify.
    async fn validate_oidc(&self, token: &str, kid: Option<&str>) -> Result<Claims, Error> {
        let discovery_url = format!("{}{}", self.expected_issuer, self.oidc_endpoint);
        let config: OpenIdConfiguration = self.fetcher.fetch_json(&discovery_url).await?;

        debug!(jwks_uri = %config.jwks_uri, "fetched OpenID configuration");

        let jwks: JwkSet = self.fetcher.fetch_json(&config.jwks_uri).await?;

        let kid = kid.ok_or_else(|| {
            Error::KeyNotFound("token header carries no kid".to_string())
        })?;

        let matched = jwks
            .find(kid)
            .ok_or_else(|| Error::KeyNotFound(format!("no JWKS entry for kid {kid}")))?;

        let key = jwk::decoding_key(matched)?;

        verify_signature(token, &key)
    }

    /// PKI scheme: all checks are mandatory.  The pinned fingerprint runs
    /// first so an untrusted root fails before any chain walking.
    async fn validate_pki(&self, token: &str, x5c: &[String]) -> Result<Claims, Error> {
        let root_url = format!("{}{}", self.expected_issuer, self.pki_endpoint);
        let root_pem = self.fetcher.fetch_text(&root_url).await?;

        let trusted_root = X509::from_pem(root_pem.as_bytes())
            .map_err(|e| Error::CertificateParse(e.to_string()))?;

        let trusted_fingerprint = chain::fingerprint(&trusted_root)?;

        if trusted_fingerprint != self.root_fingerprint {
            return Err(Error::Validation(format!(
                "root certificate fingerprint does not match expected fingerprint: \
                 expected {}, received {trusted_fingerprint}",
                self.root_fingerprint
            )));
        }

        let certs = CertificateChain::from_x5c(x5c)?;

        let leaf_key_pem = certs.leaf_public_key_pem()?;

        if chain::fingerprint(&certs.root)? != trusted_fingerprint {
            return Err(Error::Validation(
                "root certificate fingerprint mismatch".to_string(),
            ));
        }

        certs.check_validity()?;
        certs.verify_chain()?;

        let key = DecodingKey::from_rsa_pem(&leaf_key_pem)
            .map_err(|e| Error::SignatureValidation(e.to_string()))?;

        verify_signature(token, &key)
    }
}

/// Verify the token signature and return the decoded claims.  One attempt,
/// no leeway; an expired token is reported distinctly from an invalid one.
fn verify_signature(token: &str, key: &DecodingKey) -> Result<Claims, Error> {
    let mut validation = Validation::new(ALGO);
    validation.validate_aud = false;
    validation.leeway = 0;

    match jsonwebtoken::decode::<Claims>(token, key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            ErrorKind::ExpiredSignature => Err(Error::TokenExpired),
            _ => Err(Error::Validation(format!("token is invalid: {e}"))),
        },
    }
}
