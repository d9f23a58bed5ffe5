//! 令牌验证适配器

mod jwt_verifier;

pub use jwt_verifier::{JwtTokenVerifier, TokenClaims};
