use serde::{Deserialize, Serialize};

/// Session token issued by the host runtime; `sub` is the numeric user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OperatorClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// Authenticated operator, inserted by the admin middleware.
#[derive(Debug, Clone)]
pub struct Operator {
    pub name: String,
}
