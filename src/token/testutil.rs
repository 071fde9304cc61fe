// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Fixture builders shared by the token module tests: RSA keys, x5c
//! certificate chains and signed tokens.

use base64::{self, engine::general_purpose, Engine as _};
use jsonwebtoken::{encode, EncodingKey};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509Name, X509NameBuilder, X509};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct TestChain {
    pub leaf: X509,
    pub intermediate: X509,
    pub root: X509,
    pub leaf_key: PKey<Private>,
}

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

pub fn rsa_keypair() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn ec_keypair() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn name(cn: &str) -> X509Name {
    let mut b = X509NameBuilder::new().unwrap();
    b.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    b.build()
}

fn make_cert(
    cn: &str,
    key: &PKey<Private>,
    issuer_cn: &str,
    issuer_key: &PKey<Private>,
    not_after_unix: i64,
) -> X509 {
    let mut b = X509Builder::new().unwrap();

    b.set_version(2).unwrap();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
    b.set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();

    b.set_subject_name(&name(cn)).unwrap();
    b.set_issuer_name(&name(issuer_cn)).unwrap();
    b.set_pubkey(key).unwrap();

    b.set_not_before(&Asn1Time::from_unix(now_unix() - 3600).unwrap())
        .unwrap();
    b.set_not_after(&Asn1Time::from_unix(not_after_unix).unwrap())
        .unwrap();

    b.sign(issuer_key, MessageDigest::sha256()).unwrap();

    b.build()
}

fn make_chain_with(leaf_key: PKey<Private>, leaf_not_after: i64) -> TestChain {
    let root_key = rsa_keypair();
    let intermediate_key = rsa_keypair();

    let valid_until = now_unix() + 86400;

    let root = make_cert("Test Root", &root_key, "Test Root", &root_key, valid_until);
    let intermediate = make_cert(
        "Test Intermediate",
        &intermediate_key,
        "Test Root",
        &root_key,
        valid_until,
    );
    let leaf = make_cert(
        "Test Leaf",
        &leaf_key,
        "Test Intermediate",
        &intermediate_key,
        leaf_not_after,
    );

    TestChain {
        leaf,
        intermediate,
        root,
        leaf_key,
    }
}

/// A well-formed chain: self-signed root, intermediate issued by root, RSA
/// leaf issued by intermediate, all valid for another day.
pub fn make_chain() -> TestChain {
    make_chain_with(rsa_keypair(), now_unix() + 86400)
}

/// Same shape, but the leaf expired half an hour ago.
pub fn make_chain_with_expired_leaf() -> TestChain {
    make_chain_with(rsa_keypair(), now_unix() - 1800)
}

/// Same shape, but the leaf key is EC rather than RSA.
pub fn make_chain_with_ec_leaf() -> TestChain {
    make_chain_with(ec_keypair(), now_unix() + 86400)
}

pub fn b64_der(cert: &X509) -> String {
    general_purpose::STANDARD.encode(cert.to_der().unwrap())
}

pub fn x5c(chain: &TestChain) -> Vec<String> {
    vec![
        b64_der(&chain.leaf),
        b64_der(&chain.intermediate),
        b64_der(&chain.root),
    ]
}

/// Claims payload for a token that expires in an hour.
pub fn claims() -> Value {
    json!({
        "iss": "https://confidentialcomputing.googleapis.com",
        "aud": "https://sts.google.com",
        "exp": now_unix() + 3600,
        "iat": now_unix(),
        "hwmodel": "GCP_AMD_SEV",
        "swname": "CONFIDENTIAL_SPACE",
    })
}

pub fn sign_token(header: &jsonwebtoken::Header, claims: &Value, key: &PKey<Private>) -> String {
    let pem = key.private_key_to_pem_pkcs8().unwrap();
    encode(header, claims, &EncodingKey::from_rsa_pem(&pem).unwrap()).unwrap()
}

/// The (n, e) of an RSA key as unpadded base64url, as published in a JWKS.
pub fn rsa_components_b64url(key: &PKey<Private>) -> (String, String) {
    let rsa = key.rsa().unwrap();

    (
        general_purpose::URL_SAFE_NO_PAD.encode(rsa.n().to_vec()),
        general_purpose::URL_SAFE_NO_PAD.encode(rsa.e().to_vec()),
    )
}
