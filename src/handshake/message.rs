//! Canonical login message and proof query encoding.
//!
//! The message format is a byte-for-byte contract with the authorization
//! server that verifies the signature. `Semicolon` is what the reference
//! server checks (`"{account};{nonce}"`); the other variants exist for
//! servers speaking older or newer protocol revisions and must be selected
//! explicitly.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ACCOUNT_PARAM: &str = "account";
pub const CHAIN_ID_PARAM: &str = "chain_id";
pub const SIGNATURE_PARAM: &str = "signature";

const PROOF_PARAMS: [&str; 3] = [ACCOUNT_PARAM, CHAIN_ID_PARAM, SIGNATURE_PARAM];

/// Protocol revision of the canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    /// `"<account>;<nonce>"`.
    #[default]
    Semicolon,
    /// `"<account>;<percent-encoded nonce>"`.
    SemicolonEncodedNonce,
    /// `"<account><nonce>"`.
    Concatenated,
    /// `{"account":"<account>","nonce":"<nonce>"}`.
    Structured,
}

impl MessageFormat {
    pub fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "semicolon" => Ok(Self::Semicolon),
            "semicolon_encoded_nonce" | "semicolon_uri" => Ok(Self::SemicolonEncodedNonce),
            "concatenated" | "concat" => Ok(Self::Concatenated),
            "structured" | "json" => Ok(Self::Structured),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!(
                    "expected 'semicolon', 'semicolon_encoded_nonce', 'concatenated', or 'structured', got '{value}'"
                ),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semicolon => "semicolon",
            Self::SemicolonEncodedNonce => "semicolon_encoded_nonce",
            Self::Concatenated => "concatenated",
            Self::Structured => "structured",
        }
    }
}

/// Build the message the wallet is asked to sign.
pub fn build_message(format: MessageFormat, account: &str, nonce: &str) -> String {
    match format {
        MessageFormat::Semicolon => format!("{account};{nonce}"),
        MessageFormat::SemicolonEncodedNonce => {
            format!("{account};{}", urlencoding::encode(nonce))
        }
        MessageFormat::Concatenated => format!("{account}{nonce}"),
        MessageFormat::Structured => {
            serde_json::json!({ "account": account, "nonce": nonce }).to_string()
        }
    }
}

/// Evidence of account control submitted to the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedProof {
    pub account: String,
    pub chain_id: Option<u64>,
    pub signature: String,
}

/// Append the proof to the original query string.
///
/// Existing segments, empty ones included, are kept byte-for-byte and in
/// order. A stale proof left in the query (a page reloaded from a previous
/// redirect) is replaced rather than duplicated.
pub fn encode_proof(existing_query: &str, proof: &SignedProof) -> String {
    let existing = existing_query.strip_prefix('?').unwrap_or(existing_query);

    let mut segments: Vec<String> = if existing.is_empty() {
        Vec::new()
    } else {
        existing
            .split('&')
            .filter(|segment| !is_proof_segment(segment))
            .map(str::to_string)
            .collect()
    };

    segments.push(format!(
        "{ACCOUNT_PARAM}={}",
        urlencoding::encode(&proof.account)
    ));
    if let Some(chain_id) = proof.chain_id {
        segments.push(format!("{CHAIN_ID_PARAM}={chain_id}"));
    }
    segments.push(format!(
        "{SIGNATURE_PARAM}={}",
        urlencoding::encode(&proof.signature)
    ));

    segments.join("&")
}

fn is_proof_segment(segment: &str) -> bool {
    url::form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| PROOF_PARAMS.iter().any(|param| key == *param))
}
