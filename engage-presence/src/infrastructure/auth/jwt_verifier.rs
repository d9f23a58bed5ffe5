//! HS256 JWT 令牌验证

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::repository::{TokenVerifier, VerifiedSubject};
use crate::domain::value_object::{CompanyId, Role, UserId};
use crate::error::{PresenceError, PresenceResult};

/// Token Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// 用户ID（访客连接时为访客ID）
    pub sub: String,
    /// 角色列表
    pub roles: Vec<String>,
    /// 公司ID（访客令牌通常不带）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    /// 过期时间（Unix时间戳）
    pub exp: i64,
}

pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    fn token_preview(token: &str) -> &str {
        match token.char_indices().nth(12) {
            Some((idx, _)) => &token[..idx],
            None => token,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify(&self, token: &str) -> PresenceResult<VerifiedSubject> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| {
                warn!(token_preview = %Self::token_preview(token), error = %err, "Token validation failed");
                PresenceError::validation(format!("Invalid token: {}", err))
            })?
            .claims;

        let subject = VerifiedSubject {
            subject_id: UserId::new(claims.sub)?,
            roles: Role::parse_all(&claims.roles)?,
            company_id: claims.company_id.map(CompanyId::new).transpose()?,
        };
        if subject.roles.is_empty() {
            return Err(PresenceError::validation("Token carries no roles"));
        }

        debug!(subject_id = %subject.subject_id, "Token verified");
        Ok(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &[u8] = b"test-secret";

    fn token(roles: &[&str], company: Option<&str>, exp_offset: i64) -> String {
        let claims = TokenClaims {
            sub: "agent-1".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            company_id: company.map(str::to_string),
            exp: chrono::Utc::now().timestamp() + exp_offset,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token() {
        let verifier = JwtTokenVerifier::new(SECRET);
        let subject = verifier
            .verify(&token(&["commercial"], Some("acme"), 3600))
            .await
            .unwrap();
        assert_eq!(subject.subject_id.as_str(), "agent-1");
        assert_eq!(subject.roles, vec![Role::Commercial]);
        assert_eq!(subject.company_id.unwrap().as_str(), "acme");
    }

    #[tokio::test]
    async fn test_rejects_wrong_secret_expired_and_bad_roles() {
        let verifier = JwtTokenVerifier::new(b"other-secret");
        assert!(verifier.verify(&token(&["commercial"], None, 3600)).await.is_err());

        let verifier = JwtTokenVerifier::new(SECRET);
        assert!(verifier.verify(&token(&["commercial"], None, -3600)).await.is_err());
        assert!(verifier.verify(&token(&["overlord"], None, 3600)).await.is_err());
        assert!(verifier.verify(&token(&[], None, 3600)).await.is_err());
    }
}
