use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::utils::error::AppError;

/// JSON body that has been deserialized and passed its `validator` rules.
/// Malformed bodies and failed rules both surface as `InvalidArgument`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidArgument(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| AppError::InvalidArgument(errors.to_string()))?;

        Ok(ValidatedJson(value))
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Digits, spaces, dashes and parentheses with an optional leading `+`.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')');
    if !body.is_empty() && body.chars().all(allowed) {
        Ok(())
    } else {
        Err(invalid("phone", "Please provide a valid phone number"))
    }
}

/// Kenyan mobile number accepted by the STK push: `+?254[17]` and 8 digits.
pub fn validate_mpesa_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let valid = digits.len() == 12
        && digits.starts_with("254")
        && matches!(digits.as_bytes()[3], b'1' | b'7')
        && digits.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(invalid(
            "phone_number",
            "Please provide a valid M-Pesa phone number",
        ))
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if upper && lower && digit {
        Ok(())
    } else {
        Err(invalid(
            "password",
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        ))
    }
}

pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.iter().all(|tag| tag.chars().count() <= 50) {
        Ok(())
    } else {
        Err(invalid("tags", "Each tag cannot exceed 50 characters"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_patterns() {
        assert!(validate_phone("+254 (712) 345-678").is_ok());
        assert!(validate_phone("0712345678").is_ok());
        assert!(validate_phone("+").is_err());
        assert!(validate_phone("call me").is_err());
    }

    #[test]
    fn test_mpesa_phone_requires_kenyan_mobile_prefix() {
        assert!(validate_mpesa_phone("254712345678").is_ok());
        assert!(validate_mpesa_phone("+254112345678").is_ok());
        assert!(validate_mpesa_phone("254612345678").is_err());
        assert!(validate_mpesa_phone("25471234567").is_err());
        assert!(validate_mpesa_phone("0712345678").is_err());
    }

    #[test]
    fn test_password_complexity() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("secret123").is_err());
        assert!(validate_password("SECRET123").is_err());
        assert!(validate_password("SecretSecret").is_err());
    }
}
