// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use base64::{self, engine::general_purpose, Engine as _};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::hash::MessageDigest;
use openssl::pkey::Id;
use openssl::x509::{X509Ref, X509};
use std::cmp::Ordering;

/// Number of certificates carried by a PKI-scheme token: leaf, intermediate
/// and root, in that order.
pub const CERT_COUNT: usize = 3;

/// Immutable container for the complete certificate chain extracted from a
/// PKI-scheme token header.
pub struct CertificateChain {
    /// Signs the token
    pub leaf: X509,
    /// Issues the leaf
    pub intermediate: X509,
    /// Self-signed trust anchor, matched against the pinned root
    pub root: X509,
}

impl CertificateChain {
    /// Decode the certificate chain from the x5c header entries.  The list
    /// must contain exactly [`CERT_COUNT`] base64 DER certificates.
    pub fn from_x5c(x5c: &[String]) -> Result<CertificateChain, Error> {
        if x5c.len() != CERT_COUNT {
            return Err(Error::InvalidCertificateChain(format!(
                "expecting {CERT_COUNT} x5c certificates in header, got {}",
                x5c.len()
            )));
        }

        let mut certs = x5c
            .iter()
            .map(|c| decode_der_certificate(c))
            .collect::<Result<Vec<X509>, Error>>()?;

        let root = certs.pop().unwrap();
        let intermediate = certs.pop().unwrap();
        let leaf = certs.pop().unwrap();

        Ok(CertificateChain {
            leaf,
            intermediate,
            root,
        })
    }

    /// Check that "now" falls within the validity window of every
    /// certificate in the chain.  The error names the first certificate
    /// that fails.
    pub fn check_validity(&self) -> Result<(), Error> {
        let now = Asn1Time::days_from_now(0)
            .map_err(|e| Error::InvalidCertificateChain(e.to_string()))?;

        let to_check = [
            ("Leaf", &self.leaf),
            ("Intermediate", &self.intermediate),
            ("Root", &self.root),
        ];

        for (name, cert) in to_check {
            if !is_valid_at(cert, &now)? {
                return Err(Error::InvalidCertificateChain(format!(
                    "{name} certificate is not valid"
                )));
            }
        }

        Ok(())
    }

    /// Verify the chain of custody: the leaf is issued by the intermediate,
    /// the intermediate by the root, and the root is self-signed.
    pub fn verify_chain(&self) -> Result<(), Error> {
        if !is_issued_by(&self.leaf, &self.intermediate)? {
            return Err(Error::InvalidCertificateChain(
                "leaf certificate not issued by intermediate certificate".to_string(),
            ));
        }

        if !is_issued_by(&self.intermediate, &self.root)? {
            return Err(Error::InvalidCertificateChain(
                "intermediate certificate not issued by root certificate".to_string(),
            ));
        }

        if !is_issued_by(&self.root, &self.root)? {
            return Err(Error::InvalidCertificateChain(
                "root certificate is not self-signed".to_string(),
            ));
        }

        Ok(())
    }

    /// Return the leaf public key as SPKI PEM, after checking that it is an
    /// RSA key.  The token signature must verify under this key.
    pub fn leaf_public_key_pem(&self) -> Result<Vec<u8>, Error> {
        let pkey = self
            .leaf
            .public_key()
            .map_err(|e| Error::SignatureValidation(format!(
                "no public key found in leaf certificate: {e}"
            )))?;

        if pkey.id() != Id::RSA {
            return Err(Error::SignatureValidation(
                "leaf certificate must use RSA public key".to_string(),
            ));
        }

        pkey.public_key_to_pem()
            .map_err(|e| Error::SignatureValidation(e.to_string()))
    }
}

/// Compute a certificate fingerprint as uppercase colon-separated hex of the
/// SHA-1 digest of the DER encoding, e.g. "B9:51:20:...".  Only ever used as
/// an equality pin against a trusted value.
pub fn fingerprint(cert: &X509Ref) -> Result<String, Error> {
    let digest = cert
        .digest(MessageDigest::sha1())
        .map_err(|e| Error::CertificateParse(e.to_string()))?;

    let hex: Vec<String> = digest.iter().map(|b| format!("{b:02X}")).collect();

    Ok(hex.join(":"))
}

/// Decode a single base64 DER certificate.  PEM armor and embedded
/// whitespace are tolerated and stripped before decoding.
fn decode_der_certificate(cert: &str) -> Result<X509, Error> {
    let cleaned: String = cert
        .replace("-----BEGIN CERTIFICATE-----", "")
        .replace("-----END CERTIFICATE-----", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let der = general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| Error::CertificateParse(e.to_string()))?;

    X509::from_der(&der).map_err(|e| Error::CertificateParse(e.to_string()))
}

fn is_valid_at(cert: &X509Ref, at: &Asn1TimeRef) -> Result<bool, Error> {
    let after_start = cert
        .not_before()
        .compare(at)
        .map_err(|e| Error::InvalidCertificateChain(e.to_string()))?
        != Ordering::Greater;

    let before_end = at
        .compare(cert.not_after())
        .map_err(|e| Error::InvalidCertificateChain(e.to_string()))?
        != Ordering::Greater;

    Ok(after_start && before_end)
}

/// A certificate is issued by another when the issuer/subject names match
/// and its signature verifies under the candidate issuer's key.
fn is_issued_by(cert: &X509Ref, issuer: &X509Ref) -> Result<bool, Error> {
    let names_match = cert
        .issuer_name()
        .try_cmp(issuer.subject_name())
        .map_err(|e| Error::InvalidCertificateChain(e.to_string()))?
        == Ordering::Equal;

    if !names_match {
        return Ok(false);
    }

    let issuer_key = issuer
        .public_key()
        .map_err(|e| Error::InvalidCertificateChain(e.to_string()))?;

    cert.verify(&issuer_key)
        .map_err(|e| Error::InvalidCertificateChain(e.to_string()))
}
