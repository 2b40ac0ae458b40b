//! Shared fixtures for token-path tests: symmetric JWK sets, token minting,
//! and a canned-response HTTP listener for the discovery fetch path.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub(crate) const TEST_KID: &str = "test-key";
pub(crate) const TEST_SECRET: &[u8] = b"channel-auth-test-secret";

pub(crate) fn oct_jwk_set_json(kid: &str, secret: &[u8]) -> Value {
    json!({
        "keys": [{
            "kty": "oct",
            "kid": kid,
            "k": URL_SAFE_NO_PAD.encode(secret),
        }]
    })
}

pub(crate) fn oct_jwk_set(kid: &str, secret: &[u8]) -> JwkSet {
    serde_json::from_value(oct_jwk_set_json(kid, secret)).unwrap()
}

/// Mint an HS256 token signed with [`TEST_SECRET`] under [`TEST_KID`].
pub(crate) fn mint_token(claims: &Value) -> String {
    mint_token_with(claims, Algorithm::HS256, TEST_KID, TEST_SECRET)
}

pub(crate) fn mint_token_with(
    claims: &Value,
    alg: Algorithm,
    kid: &str,
    secret: &[u8],
) -> String {
    let mut header = Header::new(alg);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(secret)).unwrap()
}

/// Standard claim set for a token that should pass the full pipeline.
pub(crate) fn valid_claims(issuer: &str, app_id: &str) -> Value {
    json!({
        "iss": issuer,
        "aud": app_id,
        "serviceurl": "https://smba.example.com/channel",
        "exp": chrono::Utc::now().timestamp() + 300,
    })
}

/// Serve canned JSON responses over a local listener.
///
/// `routes` is built after binding so bodies can reference the base URL
/// (e.g. an OpenID configuration's `jwks_uri`). Returns the base URL (with a
/// trailing slash) and a counter of requests served.
pub(crate) async fn serve_json<F>(routes: F) -> (String, Arc<AtomicUsize>)
where
    F: FnOnce(&str) -> Vec<(String, Value)>,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let routes = routes(&base);
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }

            let request = String::from_utf8_lossy(&request);
            let path = request
                .lines()
                .next()
                .and_then(|line| line.split_whitespace().nth(1))
                .unwrap_or("/")
                .to_string();

            counter.fetch_add(1, Ordering::SeqCst);

            let response = match routes.iter().find(|(p, _)| *p == path) {
                Some((_, body)) => {
                    let body = body.to_string();
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                }
                None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    .to_string(),
            };

            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (base, hits)
}
