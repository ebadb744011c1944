//! EdDSA JWT generation for the weather API.
//!
//! The API authenticates with a compact JWS signed by an Ed25519 key:
//! header `{"alg": "EdDSA", "kid": ...}`, claims `{iat, exp, sub}`,
//! base64url segments without padding. Tokens are short-lived and
//! generated per request, backdated slightly against clock skew.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::{Signer, SigningKey};
use serde::Serialize;
use thiserror::Error;

/// Seconds the `iat` claim is backdated.
const IAT_SKEW_SECS: i64 = 30;

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: i64 = 900;

/// Errors during token generation.
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("invalid Ed25519 private key: {0}")]
    Key(String),

    #[error("failed to encode token segment: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Header<'a> {
    alg: &'static str,
    kid: &'a str,
}

#[derive(Serialize)]
struct Claims<'a> {
    iat: i64,
    exp: i64,
    sub: &'a str,
}

/// Generate a signed token from a PKCS#8 PEM private key.
pub fn generate_token(private_key_pem: &str, kid: &str, sub: &str) -> Result<String, JwtError> {
    let key = SigningKey::from_pkcs8_pem(private_key_pem).map_err(|e| JwtError::Key(e.to_string()))?;

    let now = Utc::now().timestamp();
    let header = Header { alg: "EdDSA", kid };
    let claims = Claims {
        iat: now - IAT_SKEW_SECS,
        exp: now + TOKEN_TTL_SECS,
        sub,
    };

    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = key.sign(signing_input.as_bytes());

    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}
