// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::debug;

const DEFAULT_SOCKET_PATH: &str = "/run/container_launcher/teeserver.sock";
const DEFAULT_TOKEN_PATH: &str = "/v1/token";
const DEFAULT_AUDIENCE: &str = "https://sts.google.com";

/// Each nonce must be between 10 and 74 bytes when UTF-8 encoded.  These
/// bounds are the tee-server contract, not configuration.
const NONCE_MIN_BYTE_LEN: usize = 10;
const NONCE_MAX_BYTE_LEN: usize = 74;

/// Bound on the whole socket exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The trust scheme a requested token should be validatable under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum TokenType {
    #[default]
    #[serde(rename = "OIDC")]
    Oidc,
    #[serde(rename = "PKI")]
    Pki,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    audience: &'a str,
    token_type: TokenType,
    nonces: &'a [String],
}

/// Client for requesting attestation tokens from the local vTPM attestation
/// service over its Unix domain socket.
///
/// The client performs a single HTTP/1.1 POST per call and returns the
/// response body verbatim; validating the returned token is the
/// [`TokenValidator`](crate::token::TokenValidator)'s job.
pub struct AttestationClient {
    socket_path: PathBuf,
    token_path: String,
}

impl Default for AttestationClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AttestationClient {
    /// Return a client for the Confidential Space launcher socket.
    pub fn new() -> Self {
        Self::with_socket(DEFAULT_SOCKET_PATH, DEFAULT_TOKEN_PATH)
    }

    /// Return a client for a non-default socket endpoint.
    pub fn with_socket<P: Into<PathBuf>>(socket_path: P, token_path: &str) -> Self {
        Self {
            socket_path: socket_path.into(),
            token_path: token_path.to_string(),
        }
    }

    /// The default audience used by [`AttestationClient::get_token`] callers
    /// that have no specific relying party.
    pub fn default_audience() -> &'static str {
        DEFAULT_AUDIENCE
    }

    /// Request a token carrying the given nonces, targeted at the given
    /// audience.  Nonce lengths are checked before any connection is opened.
    pub async fn get_token(
        &self,
        nonces: &[String],
        audience: &str,
        token_type: TokenType,
    ) -> Result<String, Error> {
        check_nonce_length(nonces)?;

        let request = TokenRequest {
            audience,
            token_type,
            nonces,
        };

        let body = serde_json::to_string(&request).map_err(|e| Error::Response(e.to_string()))?;

        let token = timeout(REQUEST_TIMEOUT, self.exchange(&body))
            .await
            .map_err(|_| Error::Connection("attestation request timed out".to_string()))??;

        debug!(?token_type, "received attestation token");

        Ok(token)
    }

    /// One request, one response, then the connection is dropped.
    async fn exchange(&self, body: &str) -> Result<String, Error> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        debug!(socket = %self.socket_path.display(), "connected to attestation service");

        let request = format!(
            "POST {} HTTP/1.1\r\n\
             Host: localhost\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.token_path,
            body.len(),
            body
        );

        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        parse_response(&raw)
    }
}

fn check_nonce_length(nonces: &[String]) -> Result<(), Error> {
    for nonce in nonces {
        let byte_len = nonce.len();

        if !(NONCE_MIN_BYTE_LEN..=NONCE_MAX_BYTE_LEN).contains(&byte_len) {
            return Err(Error::Nonce(format!(
                "nonce '{nonce}' must be between {NONCE_MIN_BYTE_LEN} bytes and \
                 {NONCE_MAX_BYTE_LEN} bytes, got {byte_len}"
            )));
        }
    }

    Ok(())
}

/// Minimal HTTP/1.1 response parsing: status line, optional Content-Length,
/// body.  The service closes the connection after one response.
fn parse_response(raw: &[u8]) -> Result<String, Error> {
    let text =
        std::str::from_utf8(raw).map_err(|e| Error::Response(e.to_string()))?;

    let (head, body) = text
        .split_once("\r\n\r\n")
        .ok_or_else(|| Error::Response("missing header/body separator".to_string()))?;

    let status_line = head
        .lines()
        .next()
        .ok_or_else(|| Error::Response("missing status line".to_string()))?;

    let mut fields = status_line.splitn(3, ' ');
    let _version = fields.next();

    let status: u16 = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Response(format!("bad status line: {status_line}")))?;

    if status != 200 {
        let reason = fields.next().unwrap_or("");
        return Err(Error::Status(format!("{status} {reason}").trim().to_string()));
    }

    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok());

    match content_length {
        Some(len) if len <= body.len() => Ok(body[..len].to_string()),
        _ => Ok(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::UnixListener;

    static SOCKET_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn scratch_socket_path() -> PathBuf {
        let seq = SOCKET_SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "cstoken-attest-{}-{seq}.sock",
            std::process::id()
        ))
    }

    /// Serve exactly one canned HTTP response and hand back the request the
    /// client sent.
    fn spawn_service(
        status_line: &str,
        body: &str,
    ) -> (PathBuf, tokio::task::JoinHandle<String>) {
        let path = scratch_socket_path();
        let _ = std::fs::remove_file(&path);

        let listener = UnixListener::bind(&path).unwrap();

        let response = format!(
            "{status_line}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = stream.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&request);
                if let Some((head, got)) = text.split_once("\r\n\r\n") {
                    let want: usize = head
                        .lines()
                        .filter_map(|l| l.split_once(':'))
                        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, v)| v.trim().parse().ok())
                        .unwrap_or(0);

                    if got.len() >= want {
                        break;
                    }
                }
            }

            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();

            String::from_utf8(request).unwrap()
        });

        (path, handle)
    }

    fn nonce_of_len(len: usize) -> Vec<String> {
        vec!["n".repeat(len)]
    }

    #[tokio::test]
    async fn end_to_end_returns_body_verbatim() {
        let (path, server) = spawn_service("HTTP/1.1 200 OK", "eyJh.eyJz.c2ln");

        let client = AttestationClient::with_socket(&path, "/v1/token");

        let token = client
            .get_token(
                &["abcdefghij".to_string()],
                "https://sts.google.com",
                TokenType::Oidc,
            )
            .await
            .unwrap();

        assert_eq!(token, "eyJh.eyJz.c2ln");

        let request = server.await.unwrap();

        assert!(request.starts_with("POST /v1/token HTTP/1.1\r\n"));

        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();

        assert_eq!(json["audience"], "https://sts.google.com");
        assert_eq!(json["token_type"], "OIDC");
        assert_eq!(json["nonces"][0], "abcdefghij");
    }

    #[tokio::test]
    async fn nonce_boundary_lengths_accepted() {
        for len in [10, 74] {
            let (path, _server) = spawn_service("HTTP/1.1 200 OK", "tok");

            let client = AttestationClient::with_socket(&path, "/v1/token");

            let r = client
                .get_token(&nonce_of_len(len), "aud", TokenType::Oidc)
                .await;

            assert!(r.is_ok(), "nonce of {len} bytes must be accepted");
        }
    }

    #[tokio::test]
    async fn nonce_out_of_bounds_rejected_before_connect() {
        // no service behind this path: a connect attempt would fail with a
        // Connection error, so getting Nonce proves the early reject
        let client = AttestationClient::with_socket("/nonexistent/teeserver.sock", "/v1/token");

        for len in [9, 75] {
            let r = client
                .get_token(&nonce_of_len(len), "aud", TokenType::Oidc)
                .await;

            assert!(
                matches!(r, Err(Error::Nonce(_))),
                "nonce of {len} bytes must be rejected"
            );
        }
    }

    #[tokio::test]
    async fn nonce_length_is_counted_in_bytes() {
        let client = AttestationClient::with_socket("/nonexistent/teeserver.sock", "/v1/token");

        // 38 two-byte characters: 38 chars but 76 bytes
        let r = client
            .get_token(&vec!["é".repeat(38)], "aud", TokenType::Pki)
            .await;

        assert!(matches!(r, Err(Error::Nonce(_))));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (path, _server) = spawn_service("HTTP/1.1 500 Internal Server Error", "boom");

        let client = AttestationClient::with_socket(&path, "/v1/token");

        let r = client
            .get_token(&nonce_of_len(12), "aud", TokenType::Oidc)
            .await;

        assert_eq!(
            r,
            Err(Error::Status("500 Internal Server Error".to_string()))
        );
    }

    #[tokio::test]
    async fn connection_refused_is_reported() {
        let client = AttestationClient::with_socket("/nonexistent/teeserver.sock", "/v1/token");

        let r = client
            .get_token(&nonce_of_len(12), "aud", TokenType::Oidc)
            .await;

        assert!(matches!(r, Err(Error::Connection(_))));
    }
}
