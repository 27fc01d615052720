use async_trait::async_trait;

use super::ApiClient;
use crate::auth::{AuthBackend, AuthFailure};
use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::error::StoreError;
use crate::models::session::Identity;

/// Signs in against the server realm and keeps the issued token in the
/// shared [`ApiClient`] slot.
#[derive(Clone)]
pub struct HttpAuthBackend {
    api: ApiClient,
}

impl HttpAuthBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

fn failure_from_store(err: StoreError) -> AuthFailure {
    match err {
        StoreError::Unauthenticated(_) => AuthFailure::InvalidCredential,
        StoreError::Unavailable(detail) => AuthFailure::Network(detail),
        StoreError::PermissionDenied(detail)
        | StoreError::NotFound(detail)
        | StoreError::Other(detail) => AuthFailure::Internal(detail),
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthFailure> {
        let url = self.api.url("api/auth/login").map_err(failure_from_store)?;
        let req = self.api.http().post(url).json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        });
        let res = self.api.send(req).await.map_err(failure_from_store)?;
        let body: LoginResponse = res
            .json()
            .await
            .map_err(|e| AuthFailure::Internal(e.to_string()))?;
        self.api.set_token(Some(body.token));
        Ok(Identity { email: body.email })
    }

    async fn sign_out(&self) -> Result<(), AuthFailure> {
        if !self.api.has_token() {
            return Ok(());
        }
        let url = self.api.url("api/auth/logout").map_err(failure_from_store)?;
        let req = self.api.authorized(self.api.http().post(url));
        match self.api.send(req).await {
            Ok(_) => {
                self.api.set_token(None);
                Ok(())
            }
            // A token the server no longer accepts is already signed out.
            Err(StoreError::Unauthenticated(_)) => {
                self.api.set_token(None);
                Ok(())
            }
            Err(err) => Err(failure_from_store(err)),
        }
    }
}
