//! User directory endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use household_core::{User, UserId};
use serde::Deserialize;

use crate::state::AppState;
use crate::store::UserPatch;

use super::{bad_request, forbidden, store_error, ActingUser, ApiJson, ApiPath, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

/// Absent fields are left alone. An empty `phone` or `iban` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub iban: Option<String>,
}

fn check_email(email: &str) -> Result<&str, String> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(format!("email is not valid: {}", email))
    }
}

/// Digits with optional `+`, spaces, dashes, slashes or parentheses.
fn check_phone(phone: &str) -> Result<String, String> {
    let phone = phone.trim();
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '/' | '(' | ')'));
    if allowed && (5..=15).contains(&digits) {
        Ok(phone.to_string())
    } else {
        Err("phone number is not valid".into())
    }
}

/// Normalize to uppercase without spaces and check the ISO 13616 shape:
/// country code, two check digits, then up to 30 alphanumerics.
fn check_iban(iban: &str) -> Result<String, String> {
    let iban: String = iban
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let bytes = iban.as_bytes();
    let valid = (15..=34).contains(&bytes.len())
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..4].iter().all(u8::is_ascii_digit)
        && bytes.iter().all(u8::is_ascii_alphanumeric);
    if valid {
        Ok(iban)
    } else {
        Err("IBAN is not valid".into())
    }
}

/// `Some("")` clears, anything else must pass `check`.
fn optional_field(
    value: Option<String>,
    check: fn(&str) -> Result<String, String>,
) -> Result<Option<Option<String>>, String> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(Some(None)),
        Some(v) => check(&v).map(|v| Some(Some(v))),
    }
}

impl TryFrom<UpdateUserRequest> for UserPatch {
    type Error = String;

    fn try_from(req: UpdateUserRequest) -> Result<Self, Self::Error> {
        let name = match req.name {
            Some(name) if name.trim().is_empty() => return Err("name must not be empty".into()),
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        let email = req
            .email
            .as_deref()
            .map(check_email)
            .transpose()?
            .map(str::to_string);
        Ok(UserPatch {
            name,
            email,
            phone: optional_field(req.phone, check_phone)?,
            iban: optional_field(req.iban, check_iban)?,
        })
    }
}

/// Register a directory entry. Called by the auth layer when an account is created.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    let email = check_email(&req.email).map_err(bad_request)?;

    let user = state.store.create_user(name, email).await.map_err(store_error)?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _actor: ActingUser,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<Json<User>> {
    let user = state.store.get_user(id).await.map_err(store_error)?;
    Ok(Json(user))
}

/// Change your own contact details. A taken email is a 409.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    if id != actor {
        return Err(forbidden("can only update your own details"));
    }
    let patch = UserPatch::try_from(req).map_err(bad_request)?;
    let user = state.store.update_user(id, patch).await.map_err(store_error)?;
    tracing::info!(user_id = %id, "user details updated");
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert_eq!(check_email(" bob@example.com "), Ok("bob@example.com"));
        assert!(check_email("bob").is_err());
        assert!(check_email("@example.com").is_err());
        assert!(check_email("bob@localhost").is_err());
        assert!(check_email("bob@@example.com").is_err());
        assert!(check_email("bo b@example.com").is_err());
    }

    #[test]
    fn iban_is_normalized() {
        assert_eq!(
            check_iban("nl91 abna 0417 1643 00").unwrap(),
            "NL91ABNA0417164300"
        );
        assert!(check_iban("NL91").is_err());
        assert!(check_iban("9191ABNA0417164300").is_err());
        assert!(check_iban("NLXXABNA0417164300").is_err());
        assert!(check_iban("NL91-ABNA-0417-1643-00").is_err());
    }

    #[test]
    fn phone_accepts_common_formats() {
        assert!(check_phone("+31 (0)6-1234 5678").is_ok());
        assert!(check_phone("0612345678").is_ok());
        assert!(check_phone("123").is_err());
        assert!(check_phone("call me").is_err());
    }

    #[test]
    fn blank_optional_fields_clear() {
        let patch = UserPatch::try_from(UpdateUserRequest {
            phone: Some("  ".into()),
            iban: Some("DE89 3704 0044 0532 0130 00".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(patch.phone, Some(None));
        assert_eq!(patch.iban, Some(Some("DE89370400440532013000".into())));
        assert_eq!(patch.name, None);
        assert_eq!(patch.email, None);
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = UserPatch::try_from(UpdateUserRequest {
            name: Some(" ".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, "name must not be empty");
    }
}
