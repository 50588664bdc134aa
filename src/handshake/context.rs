//! Challenge context carried by the login page URL.

use serde::Serialize;

use crate::error::ChallengeError;

/// Challenge issued by the authorization server, as read from the URL that
/// opened the login page. Parsed once per page load and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeContext {
    pub nonce: String,
    pub chain_hint: Option<String>,
    pub redirect_uri: Option<String>,
    /// Contract address or OIDC client id being authorized.
    pub subject_id: Option<String>,
    /// Original query string without the leading `?`, kept verbatim so the
    /// proof can be appended to it.
    #[serde(skip)]
    pub query: String,
}

impl ChallengeContext {
    /// Parse the context from an absolute or path-relative URL, a `?query`,
    /// or a bare query.
    pub fn parse(url: &str) -> Result<Self, ChallengeError> {
        let query = query_part(url);
        let query = query.as_str();

        let nonce = first_param(query, "nonce")
            .filter(|v| !v.is_empty())
            .ok_or(ChallengeError::MissingNonce)?;
        let chain_hint = first_param(query, "chain").filter(|v| !v.is_empty());
        let redirect_uri = first_param(query, "redirect_uri").filter(|v| !v.is_empty());
        // `client_id` is the legacy name older servers still send.
        let subject_id = first_param(query, "contract")
            .filter(|v| !v.is_empty())
            .or_else(|| first_param(query, "client_id").filter(|v| !v.is_empty()));

        Ok(Self {
            nonce,
            chain_hint,
            redirect_uri,
            subject_id,
            query: query.to_string(),
        })
    }

    /// Chain hint as a numeric chain id, when the server sent one.
    pub fn numeric_chain_hint(&self) -> Option<u64> {
        let hint = self.chain_hint.as_deref()?.trim();
        match hint.strip_prefix("0x").or_else(|| hint.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => hint.parse().ok(),
        }
    }

    pub fn chain_description(&self, wallet_chain_id: Option<u64>) -> String {
        let name = match (&self.chain_hint, wallet_chain_id) {
            (Some(hint), _) => hint.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => "unknown".to_string(),
        };
        format!("Log in on {name} chain using your crypto account - You have to sign a message")
    }

    pub fn subject_description(&self) -> String {
        self.subject_id
            .as_deref()
            .map(|id| format!("contract: {id}"))
            .unwrap_or_default()
    }
}

fn query_part(input: &str) -> String {
    if let Ok(parsed) = url::Url::parse(input) {
        return parsed.query().unwrap_or_default().to_string();
    }
    let without_fragment = input.split('#').next().unwrap_or_default();
    let query = match without_fragment.strip_prefix('?') {
        Some(query) => query,
        // Path-relative page URL.
        None if without_fragment.starts_with('/') => without_fragment
            .split_once('?')
            .map(|(_, query)| query)
            .unwrap_or_default(),
        None => without_fragment,
    };
    query.to_string()
}

fn first_param(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
