//! OpenChain / Sourcify signature database backend

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{FetchError, SignatureSource};

pub const DEFAULT_OPENCHAIN_URL: &str =
    "https://api.4byte.sourcify.dev/signature-database/v1/lookup";

#[derive(Debug, Deserialize)]
struct LookupResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    result: Option<LookupResult>,
}

#[derive(Debug, Default, Deserialize)]
struct LookupResult {
    #[serde(default)]
    function: HashMap<String, Option<Vec<LookupSignature>>>,
}

#[derive(Debug, Deserialize)]
struct LookupSignature {
    name: String,
}

pub struct OpenChainClient {
    http: reqwest::Client,
    api_url: String,
}

impl OpenChainClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl SignatureSource for OpenChainClient {
    async fn fetch_signatures(&self, selector: &str) -> Result<Vec<String>, FetchError> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&[("function", selector), ("filter", "true")])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_lookup_response(&body, selector)
    }
}

/// Extract the signatures for `selector` from a lookup response body
pub fn parse_lookup_response(body: &str, selector: &str) -> Result<Vec<String>, FetchError> {
    let response: LookupResponse =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidPayload(e.to_string()))?;

    if !response.ok {
        return Err(FetchError::Upstream(
            response.error.unwrap_or_else(|| "ok=false".to_string()),
        ));
    }

    let mut result = response.result.unwrap_or_default();
    Ok(result
        .function
        .remove(selector)
        .flatten()
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidates_in_order() {
        let body = r#"{
            "ok": true,
            "result": {
                "event": {},
                "function": {
                    "0xa9059cbb": [
                        {"name": "transfer(address,uint256)", "filtered": false},
                        {"name": "many_msg_babbage(bytes1)", "filtered": false}
                    ]
                }
            }
        }"#;

        let signatures = parse_lookup_response(body, "0xa9059cbb").unwrap();
        assert_eq!(
            signatures,
            vec!["transfer(address,uint256)", "many_msg_babbage(bytes1)"]
        );
    }

    #[test]
    fn test_unknown_selector() {
        let null_entry = r#"{"ok":true,"result":{"event":{},"function":{"0xdeadbeef":null}}}"#;
        assert!(parse_lookup_response(null_entry, "0xdeadbeef").unwrap().is_empty());

        let missing = r#"{"ok":true,"result":{"event":{},"function":{}}}"#;
        assert!(parse_lookup_response(missing, "0xdeadbeef").unwrap().is_empty());
    }

    #[test]
    fn test_error_responses() {
        let refused = r#"{"ok":false,"error":"invalid selector"}"#;
        assert_eq!(
            parse_lookup_response(refused, "0xdeadbeef"),
            Err(FetchError::Upstream("invalid selector".to_string()))
        );
        assert!(matches!(
            parse_lookup_response("Too Many Requests", "0xdeadbeef"),
            Err(FetchError::InvalidPayload(_))
        ));
    }
}
