//! AWS SigV4 request signing
//!
//! The Selling Partner API requires every request to carry an AWS
//! Signature Version 4 over the `execute-api` service, computed with IAM
//! user credentials distinct from the LWA token credential.

use crate::utils::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// SigV4 signer for Selling Partner API requests
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(access_key: String, secret_key: String, region: String) -> Self {
        Self {
            access_key,
            secret_key,
            region,
            service: "execute-api".to_string(),
        }
    }

    /// Sign an HTTP request; returns the full header map to send,
    /// including the input headers, `host`, `x-amz-date`, and
    /// `Authorization`.
    pub fn sign_request(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        body: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<HashMap<String, String>> {
        let parsed_url = url::Url::parse(url)
            .map_err(|e| TrackerError::SpApi(format!("invalid request URL: {}", e)))?;
        let host = parsed_url
            .host_str()
            .ok_or_else(|| TrackerError::SpApi("request URL has no host".to_string()))?;
        let host = match parsed_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let path = parsed_url.path();
        let query = parsed_url.query().unwrap_or("");

        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = timestamp.format("%Y%m%d").to_string();

        let mut canonical_headers = headers.clone();
        canonical_headers.insert("host".to_string(), host);
        canonical_headers.insert("x-amz-date".to_string(), amz_date.clone());

        // Sort headers by key (case-insensitive)
        let mut sorted_headers: Vec<_> = canonical_headers.iter().collect();
        sorted_headers.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

        let canonical_headers_str = sorted_headers
            .iter()
            .map(|(k, v)| format!("{}:{}", k.to_lowercase(), v.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let signed_headers = sorted_headers
            .iter()
            .map(|(k, _)| k.to_lowercase())
            .collect::<Vec<_>>()
            .join(";");

        let payload_hash = hex::encode(Sha256::digest(body.as_bytes()));
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n\n{}\n{}",
            method.to_uppercase(),
            path,
            query,
            canonical_headers_str,
            signed_headers,
            payload_hash
        );

        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm, amz_date, credential_scope, canonical_request_hash
        );

        let signature = self.calculate_signature(&string_to_sign, &date_stamp)?;
        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.access_key, credential_scope, signed_headers, signature
        );

        let mut final_headers = canonical_headers;
        final_headers.insert("Authorization".to_string(), authorization);
        Ok(final_headers)
    }

    fn calculate_signature(&self, string_to_sign: &str, date_stamp: &str) -> Result<String> {
        let k_date = self.hmac_sha256(
            format!("AWS4{}", self.secret_key).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = self.hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = self.hmac_sha256(&k_region, self.service.as_bytes())?;
        let k_signing = self.hmac_sha256(&k_service, b"aws4_request")?;

        let signature = self.hmac_sha256(&k_signing, string_to_sign.as_bytes())?;
        Ok(hex::encode(signature))
    }

    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| TrackerError::SpApi(format!("HMAC key error: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signer() -> SigV4Signer {
        SigV4Signer::new(
            "AKIATEST".to_string(),
            "testsecret".to_string(),
            "eu-west-1".to_string(),
        )
    }

    #[test]
    fn test_signer_targets_execute_api() {
        let s = signer();
        assert_eq!(s.service, "execute-api");
        assert_eq!(s.region, "eu-west-1");
    }

    #[test]
    fn test_hmac_sha256() {
        let result = signer().hmac_sha256(b"key", b"message").unwrap();
        // Known HMAC-SHA256 result for key="key", message="message"
        let expected = "6e9ef29b75fffc5b7abae527d58fdadb2fe42e7219011e917a9c6e0c3d5e4c3b";
        assert_eq!(hex::encode(result), expected);
    }

    #[test]
    fn test_sign_request_produces_authorization() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut headers = HashMap::new();
        headers.insert("x-amz-access-token".to_string(), "lwa-token".to_string());

        let signed = signer()
            .sign_request(
                "GET",
                "https://sellingpartnerapi-eu.amazon.com/listings/2021-08-01/restrictions?asin=B000000001",
                &headers,
                "",
                timestamp,
            )
            .unwrap();

        let authorization = signed.get("Authorization").expect("Authorization header");
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIATEST/20240101/eu-west-1/execute-api/aws4_request"));
        // The token header participates in the signature.
        assert!(authorization.contains("x-amz-access-token"));
        assert_eq!(signed.get("x-amz-date").unwrap(), "20240101T120000Z");
    }

    #[test]
    fn test_signature_is_deterministic() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let headers = HashMap::new();
        let url = "https://sellingpartnerapi-eu.amazon.com/listings/2021-08-01/restrictions";

        let a = signer().sign_request("GET", url, &headers, "", timestamp).unwrap();
        let b = signer().sign_request("GET", url, &headers, "", timestamp).unwrap();
        assert_eq!(a.get("Authorization"), b.get("Authorization"));
    }
}
