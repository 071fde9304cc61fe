// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use cstoken::attest::{AttestationClient, TokenType};
use cstoken::token::{decode_for_debug, TokenValidator};
use std::error::Error;
use std::fs;

#[derive(Parser)]
enum CsTokenCli {
    Validate(ValidateArgs),
    Request(RequestArgs),
    Decode(DecodeArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Validate the supplied attestation token against the \
    Confidential Space trust root and print its claims")]
struct ValidateArgs {
    #[arg(short, long, default_value = "token.jwt")]
    token: String,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Request a fresh attestation token from the local vTPM \
    attestation service")]
struct RequestArgs {
    #[arg(short, long, required = true)]
    nonce: Vec<String>,

    #[arg(short, long, default_value = "https://sts.google.com")]
    audience: String,

    #[arg(long, value_enum, default_value_t = CliTokenType::Oidc)]
    token_type: CliTokenType,

    #[arg(short, long, default_value = "/run/container_launcher/teeserver.sock")]
    socket: String,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Decode the supplied token WITHOUT any verification.  For \
    debugging only: the output must not be used for trust decisions")]
struct DecodeArgs {
    #[arg(short, long, default_value = "token.jwt")]
    token: String,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliTokenType {
    Oidc,
    Pki,
}

impl From<CliTokenType> for TokenType {
    fn from(t: CliTokenType) -> TokenType {
        match t {
            CliTokenType::Oidc => TokenType::Oidc,
            CliTokenType::Pki => TokenType::Pki,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match CsTokenCli::parse() {
        CsTokenCli::Validate(args) => match validate(&args).await {
            Ok(claims) => println!("{claims}"),
            Err(e) => eprintln!("validation failed: {e}"),
        },

        CsTokenCli::Request(args) => match request(&args).await {
            Ok(token) => println!("{token}"),
            Err(e) => eprintln!("token request failed: {e}"),
        },

        CsTokenCli::Decode(args) => match decode(&args) {
            Ok(dump) => println!("{dump}"),
            Err(e) => eprintln!("decoding failed: {e}"),
        },
    }
}

fn read_token(arg: &str) -> Result<String, Box<dyn Error>> {
    // accept either a path to a token file or the token itself
    let token = match fs::read_to_string(arg) {
        Ok(contents) => contents,
        Err(_) => arg.to_string(),
    };

    Ok(token.trim().to_string())
}

async fn validate(args: &ValidateArgs) -> Result<String, Box<dyn Error>> {
    let token = read_token(&args.token)?;

    let v = TokenValidator::new()?;

    let claims = v.validate(&token).await?;

    Ok(serde_json::to_string_pretty(&claims)?)
}

async fn request(args: &RequestArgs) -> Result<String, Box<dyn Error>> {
    let client = AttestationClient::with_socket(&args.socket, "/v1/token");

    let token = client
        .get_token(&args.nonce, &args.audience, args.token_type.into())
        .await?;

    Ok(token)
}

fn decode(args: &DecodeArgs) -> Result<String, Box<dyn Error>> {
    let token = read_token(&args.token)?;

    let (header, payload) = decode_for_debug(&token)?;

    let dump = serde_json::json!({
        "header": header,
        "payload": payload,
    });

    Ok(serde_json::to_string_pretty(&dump)?)
}
