// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Bound on every remote fetch.  A hung discovery endpoint must surface as
/// a typed error, never as an indefinite suspension.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenID discovery document.  Only `jwks_uri` is of interest.
#[derive(Debug, Deserialize)]
pub struct OpenIdConfiguration {
    pub jwks_uri: String,
}

/// Fetches trust material (discovery document, JWKS, PKI root certificate)
/// from the issuer's well-known endpoints.  One fetch per call, no retries,
/// no caching.
pub struct WellKnownFetcher {
    client: reqwest::Client,
}

impl WellKnownFetcher {
    pub fn new() -> Result<WellKnownFetcher, Error> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::Validation(e.to_string()))?;

        Ok(WellKnownFetcher { client })
    }

    /// GET a JSON document from a well-known endpoint.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        debug!(url, "fetching well-known JSON document");

        let response = self.get(url).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Validation(format!("failed to fetch well known file: {e}")))
    }

    /// GET a raw text document (e.g. a PEM certificate) from a well-known
    /// endpoint.
    pub async fn fetch_text(&self, url: &str) -> Result<String, Error> {
        debug!(url, "fetching well-known text document");

        let response = self.get(url).await?;

        response
            .text()
            .await
            .map_err(|e| Error::Validation(format!("failed to fetch well known file: {e}")))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, Error> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Validation(format!("failed to fetch well known file: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::Validation(format!(
                "failed to fetch well known file: {status}"
            )));
        }

        Ok(response)
    }
}
