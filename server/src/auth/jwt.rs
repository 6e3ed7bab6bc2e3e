//! JWT issuing and validation

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::models::UserRole;

/// Token lifetime, matching the original 7-day session length
const JWT_EXPIRY_DAYS: i64 = 7;

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// User email
    pub email: String,
    /// User role (USER | ADMIN)
    pub role: UserRole,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated identity extracted from a verified JWT
///
/// Injected into the request extensions by [`super::middleware::require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Create a JWT for a user
pub fn create_token(
    user_id: &str,
    email: &str,
    role: UserRole,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: (now + chrono::Duration::days(JWT_EXPIRY_DAYS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify and decode a JWT
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-at-least-32-characters!!";

    #[test]
    fn test_token_roundtrip() {
        let token = create_token("user-1", "an@example.com", UserRole::User, SECRET)
            .expect("Failed to create token");

        let claims = decode_token(&token, SECRET).expect("Failed to decode token");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "an@example.com");
        assert_eq!(claims.role, UserRole::User);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token("user-1", "an@example.com", UserRole::Admin, SECRET).unwrap();
        assert!(decode_token(&token, "another-secret-of-sufficient-len").is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = create_token("user-1", "an@example.com", UserRole::User, SECRET).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        assert!(decode_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn test_current_user_from_claims() {
        let token = create_token("user-9", "b@example.com", UserRole::Admin, SECRET).unwrap();
        let user = CurrentUser::from(decode_token(&token, SECRET).unwrap());
        assert_eq!(user.id, "user-9");
        assert!(user.is_admin());
    }
}
