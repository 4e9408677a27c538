use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voyage_core::user::{User, UserRole};

use super::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    pub sub: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: UserRole,
    pub exp: usize,
}

fn user_validation() -> Validation {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation
}

pub fn issue_user_jwt(
    secret: &str,
    user: &User,
    ttl_seconds: i64,
) -> Result<(String, usize), AuthError> {
    let exp = (Utc::now() + Duration::seconds(ttl_seconds)).timestamp() as usize;
    let claims = UserClaims {
        sub: user.id,
        tenant_id: user.tenant_id,
        role: user.role,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map(|token| (token, exp))
    .map_err(|err| AuthError::Signing(err.to_string()))
}

pub fn verify_user_jwt(secret: &str, token: &str) -> Result<UserClaims, AuthError> {
    decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &user_validation(),
    )
    .map(|decoded| decoded.claims)
    .map_err(|err| AuthError::InvalidToken(err.to_string()))
}
