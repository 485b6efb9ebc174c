//! Sign-in, registration, password management and the current user.

use super::{keys, paths, CURRENT_USER_QUERY, HOME_QUERY};
use crate::client::MediTurnos;
use crate::error::ApiError;
use crate::request::RequestDescriptor;
use mt_common::{
    resolve_role, AuthResponse, ChangePasswordRequest, LoginRequest, RecoverPasswordRequest,
    RegisterRequest, UserProfile,
};
use serde_json::Value;
use tracing::{info, warn};

pub struct AuthApi<'a> {
    client: &'a MediTurnos,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a MediTurnos) -> Self {
        Self { client }
    }

    /// Sign in and persist the session.
    ///
    /// The profile comes from the `user` embedded in the response when
    /// present, otherwise from `GET /obtenerUsuario`, otherwise it is a
    /// placeholder built from the email.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let descriptor = RequestDescriptor::post(paths::LOGIN)
            .anonymous()
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?;

        let response: AuthResponse = self.client.requester().execute(descriptor).await?;
        let token = response
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                warn!("Login response did not include a token");
                ApiError::invalid_response()
            })?;

        let tokens = self.client.tokens();
        self.client.cache().clear();
        tokens.set_access_token(token);

        let fallback_role = resolve_role(response.role, response.rol);
        let mut profile = match response.user {
            Some(user) => user,
            None => match self.fetch_current_user().await {
                Ok(user) => user,
                // The lookup's 401 already ended the session.
                Err(e) if !tokens.has_access_token() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Could not load profile after login, using placeholder");
                    UserProfile::placeholder(email, None)
                }
            },
        };
        if profile.email.is_empty() {
            profile.email = email.to_string();
        }
        if profile.role.is_none() {
            profile.role = fallback_role;
        }

        tokens.set_user(Some(profile.clone()));
        self.client
            .cache()
            .set(keys::current_user(), profile.clone(), CURRENT_USER_QUERY.gc_time);

        info!(
            email = %profile.email,
            role = profile.role.as_ref().map(|r| r.as_str()).unwrap_or("desconocido"),
            "Login succeeded"
        );
        Ok(profile)
    }

    /// Create an account. Returns the stored profile when the backend opened
    /// a session for the new account.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<UserProfile>, ApiError> {
        let descriptor = RequestDescriptor::put(paths::REGISTER)
            .anonymous()
            .json(request)?;
        let response: Value = self.client.requester().execute(descriptor).await?;

        // Some deployments acknowledge with plain text instead of a session.
        let response = match response {
            Value::Object(_) => serde_json::from_value::<AuthResponse>(response).ok(),
            _ => None,
        };
        let Some(response) = response else {
            info!(email = %request.email, "Registered without opening a session");
            return Ok(None);
        };
        let Some(token) = response.token.filter(|t| !t.trim().is_empty()) else {
            info!(email = %request.email, "Registered without opening a session");
            return Ok(None);
        };

        let fallback_role = resolve_role(response.role, response.rol).or(Some(request.role.clone()));
        let mut profile = response.user.unwrap_or_else(|| UserProfile {
            first_name: Some(request.first_name.clone()),
            last_name: Some(request.last_name.clone()),
            dni: request.dni.clone(),
            phone: request.phone.clone(),
            specialty: request.specialty.clone(),
            description: request.description.clone(),
            ..UserProfile::placeholder(&request.email, None)
        });
        if profile.role.is_none() {
            profile.role = fallback_role;
        }

        self.client.cache().clear();
        self.client.tokens().set_access_token(token);
        self.client.tokens().set_user(Some(profile.clone()));
        info!(email = %profile.email, "Registered and signed in");
        Ok(Some(profile))
    }

    /// Ask the backend to email a password recovery code.
    pub async fn recover_password(&self, email: &str) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::post(paths::RECOVER_PASSWORD)
            .anonymous()
            .json(&RecoverPasswordRequest {
                email: email.to_string(),
            })?;
        self.client.requester().execute(descriptor).await
    }

    /// Set a new password. Stores the token if the backend returns one.
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::post(paths::CHANGE_PASSWORD)
            .anonymous()
            .json(request)?;
        let response: Value = self.client.requester().execute(descriptor).await?;

        if let Some(token) = response.get("token").and_then(Value::as_str) {
            if !token.trim().is_empty() {
                self.client.tokens().set_access_token(token);
                info!(email = %request.email, "Password changed, session refreshed");
            }
        }
        Ok(response)
    }

    /// The signed-in user, cached for five minutes. The result replaces the
    /// stored profile, keeping the stored role if the backend sent none.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let mut profile = self
            .client
            .cache()
            .fetch(keys::current_user(), CURRENT_USER_QUERY, || self.fetch_current_user())
            .await?;

        let tokens = self.client.tokens();
        if profile.role.is_none() {
            profile.role = tokens.get_user_role();
        }
        tokens.set_user(Some(profile.clone()));
        Ok(profile)
    }

    /// Landing-page summary for the signed-in user.
    pub async fn home(&self) -> Result<Value, ApiError> {
        let requester = self.client.requester();
        self.client
            .cache()
            .fetch(keys::home(), HOME_QUERY, move || {
                requester.execute(RequestDescriptor::get(paths::HOME))
            })
            .await
    }

    /// Forget the session and every cached read.
    pub fn logout(&self) {
        self.client.tokens().clear();
        self.client.cache().clear();
        info!("Logged out");
    }

    async fn fetch_current_user(&self) -> Result<UserProfile, ApiError> {
        let value: Value = self
            .client
            .requester()
            .execute(RequestDescriptor::get(paths::CURRENT_USER))
            .await?;
        user_from_payload(value)
    }
}

/// The user endpoint answers either with the user itself or wrapped in a
/// `user`/`usuario` field.
fn user_from_payload(mut value: Value) -> Result<UserProfile, ApiError> {
    let inner = ["user", "usuario"]
        .iter()
        .find_map(|field| value.get_mut(*field).filter(|v| v.is_object()).map(Value::take));
    let user = inner.unwrap_or(value);

    if !user.is_object() {
        return Err(ApiError::invalid_response());
    }
    serde_json::from_value(user).map_err(|e| {
        warn!(error = %e, "Unexpected user payload");
        ApiError::invalid_response()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_payload_shapes() {
        let direct = user_from_payload(json!({"email": "a@b.com"})).unwrap();
        assert_eq!(direct.email, "a@b.com");

        let wrapped = user_from_payload(json!({"usuario": {"email": "c@d.com", "rol": "admin"}})).unwrap();
        assert_eq!(wrapped.email, "c@d.com");
        assert!(wrapped.role.unwrap().is_admin());

        assert!(user_from_payload(json!(null)).is_err());
    }
}
