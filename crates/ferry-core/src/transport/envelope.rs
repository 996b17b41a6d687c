//! Parse the `{ status, message?, data? }` envelope both endpoints reply with.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::TransportError;

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Turn an HTTP status and body into the envelope's `data`.
///
/// Non-2xx responses become `Http` carrying the server's message when the
/// body is an envelope; `status: "error"` becomes `Server`; anything that
/// does not parse, or succeeds without `data`, is `Malformed`.
pub fn parse_response<T: DeserializeOwned>(code: u32, body: &[u8]) -> Result<T, TransportError> {
    if !(200..300).contains(&code) {
        let message = serde_json::from_slice::<Envelope<serde_json::Value>>(body)
            .ok()
            .and_then(|env| env.message)
            .filter(|m| !m.trim().is_empty());
        return Err(TransportError::Http {
            status: code,
            message,
        });
    }

    let env: Envelope<T> =
        serde_json::from_slice(body).map_err(|e| TransportError::Malformed(e.to_string()))?;
    if env.status != "success" {
        return Err(TransportError::Server {
            message: env.message,
        });
    }
    env.data
        .ok_or_else(|| TransportError::Malformed("response has no data".to_string()))
}
