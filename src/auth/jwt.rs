use chrono::{Utc, Duration};
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Serialize, Deserialize};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
    pub username: String,
}

pub fn sign_token(user_id: i64, role: &str, username: &str, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(8);
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        username: username.to_string(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("Token signing failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256)
    )
    .map(|d| d.claims)
    .map_err(|e| AppError::validation(format!("Invalid or expired token: {e}")))
}

/// Payload of the QR code handed to the transporter at scheduling time.
/// The gate lookup accepts this token in place of a raw truck id; image
/// rendering and camera decoding happen client-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatePassClaims {
    pub sub: i64,
    pub vehicle_number: String,
    pub exp: usize,
    pub iat: usize,
    pub kind: String,
}

pub fn sign_gate_pass(truck_id: i64, vehicle_number: &str, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    // Generous window: schedules are created days before the truck arrives.
    let exp = now + Duration::days(14);
    let claims = GatePassClaims {
        sub: truck_id,
        vehicle_number: vehicle_number.to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        kind: "gate_pass".to_string(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("Gate pass signing failed: {e}")))
}

pub fn verify_gate_pass(token: &str, secret: &str) -> Result<GatePassClaims, AppError> {
    let claims = decode::<GatePassClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256)
    )
    .map(|d| d.claims)
    .map_err(|e| AppError::validation(format!("Invalid or expired gate pass: {e}")))?;

    if claims.kind != "gate_pass" {
        return Err(AppError::validation("Token is not a gate pass"));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_pass_round_trips() {
        let token = sign_gate_pass(42, "KA01AB1234", "test-secret").unwrap();
        let claims = verify_gate_pass(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.vehicle_number, "KA01AB1234");
    }

    #[test]
    fn gate_pass_rejects_wrong_secret() {
        let token = sign_gate_pass(42, "KA01AB1234", "test-secret").unwrap();
        assert!(verify_gate_pass(&token, "other-secret").is_err());
    }

    #[test]
    fn login_token_is_not_a_gate_pass() {
        let token = sign_token(7, "gate_guard", "guard1", "test-secret").unwrap();
        assert!(verify_gate_pass(&token, "test-secret").is_err());
    }
}
