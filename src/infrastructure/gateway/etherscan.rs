//! Etherscan v2 `getsourcecode` backend

use std::time::Duration;

use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use super::{ContractRecord, ContractSource, FetchError};

pub const DEFAULT_ETHERSCAN_URL: &str = "https://api.etherscan.io/v2/api";

/// ABI field value for contracts without verified source
const NOT_VERIFIED: &str = "Contract source code not verified";

#[derive(Debug, Deserialize)]
struct SourceResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SourceEntry {
    #[serde(rename = "ABI", default)]
    abi: String,
    #[serde(default)]
    contract_name: String,
    #[serde(default)]
    proxy: String,
    #[serde(default)]
    implementation: String,
}

pub struct EtherscanClient {
    http: reqwest::Client,
    api_url: String,
    chain_id: u64,
    api_key: Option<String>,
}

impl EtherscanClient {
    pub fn new(
        api_url: impl Into<String>,
        chain_id: u64,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.into(),
            chain_id,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ContractSource for EtherscanClient {
    async fn fetch_contract(&self, address: Address) -> Result<ContractRecord, FetchError> {
        let chain_id = self.chain_id.to_string();
        let address = address.to_checksum(None);
        let mut query = vec![
            ("chainid", chain_id.as_str()),
            ("module", "contract"),
            ("action", "getsourcecode"),
            ("address", address.as_str()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.as_str()));
        }

        trace!(%address, chain_id = self.chain_id, "Requesting contract source");
        let response = self.http.get(&self.api_url).query(&query).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_source_response(&body)
    }
}

/// Parse a `getsourcecode` response body
pub fn parse_source_response(body: &str) -> Result<ContractRecord, FetchError> {
    let response: SourceResponse =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidPayload(e.to_string()))?;

    if response.status != "1" {
        let detail = match &response.result {
            serde_json::Value::String(s) if !s.is_empty() => s.clone(),
            _ => response.message.clone(),
        };
        return Err(classify_refusal(detail));
    }

    let entries: Vec<SourceEntry> = serde_json::from_value(response.result)
        .map_err(|e| FetchError::InvalidPayload(e.to_string()))?;
    let Some(entry) = entries.into_iter().next() else {
        return Err(FetchError::InvalidPayload("empty result".to_string()));
    };

    let abi = match entry.abi.trim() {
        "" | NOT_VERIFIED => None,
        raw => Some(
            serde_json::from_str::<JsonAbi>(raw)
                .map_err(|e| FetchError::InvalidPayload(format!("ABI: {e}")))?,
        ),
    };

    let implementation = entry
        .implementation
        .trim()
        .parse::<Address>()
        .ok()
        .filter(|a| !a.is_zero());

    Ok(ContractRecord {
        name: Some(entry.contract_name.trim().to_string())
            .filter(|n| !n.is_empty() && abi.is_some()),
        abi,
        proxy: entry.proxy.trim() == "1",
        implementation,
    })
}

fn classify_refusal(detail: String) -> FetchError {
    let lower = detail.to_lowercase();
    if lower.contains("rate limit") {
        FetchError::RateLimited
    } else if lower.contains("api key") || lower.contains("apikey") {
        FetchError::InvalidCredential(detail)
    } else {
        FetchError::Upstream(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_parse_verified_contract() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [{
                "SourceCode": "contract Token {}",
                "ABI": "[{\"type\":\"function\",\"name\":\"transfer\",\"inputs\":[{\"name\":\"to\",\"type\":\"address\"},{\"name\":\"amount\",\"type\":\"uint256\"}],\"outputs\":[{\"name\":\"\",\"type\":\"bool\"}],\"stateMutability\":\"nonpayable\"}]",
                "ContractName": "Token",
                "Proxy": "0",
                "Implementation": ""
            }]
        }"#;

        let record = parse_source_response(body).unwrap();
        assert_eq!(record.name.as_deref(), Some("Token"));
        assert!(record.is_verified());
        assert!(!record.proxy);
        assert_eq!(record.implementation, None);
        let abi = record.abi.unwrap();
        assert_eq!(abi.functions().count(), 1);
    }

    #[test]
    fn test_parse_unverified_proxy() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [{
                "SourceCode": "",
                "ABI": "Contract source code not verified",
                "ContractName": "",
                "Proxy": "1",
                "Implementation": "0x43506849d7c04f9138d1a2050bbf3a0c054402dd"
            }]
        }"#;

        let record = parse_source_response(body).unwrap();
        assert!(!record.is_verified());
        assert_eq!(record.name, None);
        assert!(record.proxy);
        assert_eq!(
            record.implementation,
            Some(address!("43506849d7c04f9138d1a2050bbf3a0c054402dd"))
        );
    }

    #[test]
    fn test_rate_limit_and_credentials() {
        let rate_limited = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached, please use API Key for higher rate limit"}"#;
        assert_eq!(parse_source_response(rate_limited), Err(FetchError::RateLimited));

        let bad_key = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key (#err2)|v2"}"#;
        assert!(matches!(
            parse_source_response(bad_key),
            Err(FetchError::InvalidCredential(_))
        ));

        let other = r#"{"status":"0","message":"NOTOK","result":"Invalid Address format"}"#;
        assert_eq!(
            parse_source_response(other),
            Err(FetchError::Upstream("Invalid Address format".to_string()))
        );
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(parse_source_response("<html>"), Err(FetchError::InvalidPayload(_))));
        assert!(matches!(
            parse_source_response(r#"{"status":"1","message":"OK","result":[]}"#),
            Err(FetchError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_source_response(
                r#"{"status":"1","message":"OK","result":[{"ABI":"not json","ContractName":"X"}]}"#
            ),
            Err(FetchError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_blank_api_key_is_anonymous() {
        let client = EtherscanClient::new(DEFAULT_ETHERSCAN_URL, 1, Some("  ".into()), Duration::from_secs(10)).unwrap();
        assert!(!client.has_api_key());
    }
}
