use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tokio::sync::RwLock;
use tracing::{info, warn};
use crate::models::errors::AuthError;
use crate::models::notifications::{AccessToken, FirebaseClaims, ServiceAccountCredential, TokenResponse};
use crate::utilities::fields::fcm;

/// Lifetime requested for every assertion and assumed for tokens whose
/// response omits `expires_in`.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Exchanges service-account credentials for short-lived FCM bearer tokens.
///
/// Each call to [`CredentialMinter::mint`] signs a fresh assertion unless the
/// optional cache is enabled, in which case a token is reused until it gets
/// within `refresh_margin` of expiry.
pub struct CredentialMinter {
    http: reqwest::Client,
    cache: Option<TokenCache>,
}

struct TokenCache {
    tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
    refresh_margin: Duration,
}

impl CredentialMinter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http, cache: None }
    }

    pub fn with_cache(mut self, refresh_margin: Duration) -> Self {
        self.cache = Some(TokenCache {
            tokens: Arc::new(RwLock::new(HashMap::new())),
            refresh_margin,
        });
        self
    }

    pub async fn mint(&self, credential: &ServiceAccountCredential) -> Result<AccessToken, AuthError> {
        let Some(cache) = &self.cache else {
            return self.mint_uncached(credential).await;
        };

        let key = credential.cache_key();
        let now = Utc::now();

        // Hold the write lock across the exchange so concurrent callers share one refresh.
        let mut guard = cache.tokens.write().await;
        if let Some(token) = guard.get(&key) {
            let seconds_remaining = token.seconds_remaining(now);
            if token.expires_at - cache.refresh_margin > now {
                info!(seconds_remaining, "[Push] Access token cache hit");
                return Ok(token.clone());
            }
            info!(seconds_remaining, "[Push] Access token near expiry, refreshing");
        } else {
            info!("[Push] Access token cache miss");
        }

        let token = self.mint_uncached(credential).await?;
        guard.insert(key, token.clone());
        info!(expires_at = %token.expires_at, "[Push] New access token cached");
        Ok(token)
    }

    async fn mint_uncached(&self, credential: &ServiceAccountCredential) -> Result<AccessToken, AuthError> {
        let assertion = create_assertion(credential, Utc::now())?;
        exchange_assertion(&self.http, &credential.token_uri, &assertion).await
    }
}

/// Builds the signed `header.payload.signature` JWT for the bearer grant.
pub fn create_assertion(credential: &ServiceAccountCredential, now: DateTime<Utc>) -> Result<String, AuthError> {
    let claims = FirebaseClaims {
        iss: &credential.client_email,
        scope: fcm::MESSAGING_SCOPE,
        aud: &credential.token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };

    let pem = credential.private_key.replace("\\n", "\n");
    let key = EncodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| AuthError::InvalidKey(format!("Invalid private key format: {}", e)))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = credential.private_key_id.clone();

    encode(&header, &claims, &key).map_err(|e| AuthError::Signing(e.to_string()))
}

async fn exchange_assertion(
    http: &reqwest::Client,
    token_uri: &str,
    assertion: &str,
) -> Result<AccessToken, AuthError> {
    let params = [
        ("grant_type", fcm::JWT_BEARER_GRANT),
        ("assertion", assertion),
    ];

    let res = http
        .post(token_uri)
        .form(&params)
        .send()
        .await?;

    let status = res.status();
    if status != reqwest::StatusCode::OK {
        let body = res.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "[Push] Token exchange rejected");
        return Err(AuthError::Rejected { status: status.as_u16(), body });
    }

    let body = res.text().await?;
    let token_response: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

    if token_response.access_token.is_empty() {
        return Err(AuthError::MalformedResponse("access_token is empty".to_string()));
    }

    let lifetime = token_response.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
    Ok(AccessToken {
        token: token_response.access_token,
        expires_at: Utc::now() + Duration::seconds(lifetime),
    })
}
