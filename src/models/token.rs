use time::OffsetDateTime;

/// One-time code handed to the platform after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub user_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub user_id: String,
    pub client_id: String,
    pub expires_at: OffsetDateTime,
    /// Hash of the refresh token issued alongside this access token.
    pub refresh_token_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub user_id: String,
    pub client_id: String,
    pub expires_at: OffsetDateTime,
}

/// Plaintext token pair as returned to the client. Only hashes are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

pub fn is_expired(expires_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    expires_at < now
}
