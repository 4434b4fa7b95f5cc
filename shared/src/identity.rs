use std::env;

use async_trait::async_trait;
use log::error;
use reqwest::{Client, StatusCode};

use crate::error::AppError;
use crate::models::User;

/// Identity collaborator: resolves bearer tokens and user ids against the
/// external authentication server.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolves a bearer token to the authenticated user's profile.
    async fn get_user_by_token(&self, token: &str) -> Result<User, AppError>;

    /// Looks up a user by id. `Ok(None)` when the user does not exist.
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
}

pub struct HttpIdentityService {
    client: Client,
    base_url: String,
}

impl HttpIdentityService {
    /// Reads `AUTH_SERVER_URL` from the environment.
    pub fn from_env() -> Result<Self, AppError> {
        let base_url = env::var("AUTH_SERVER_URL").map_err(|_| {
            AppError::internal("AUTH_SERVER_URL environment variable not set")
        })?;
        Ok(Self::with_client_and_base_url(
            crate::mailer::HTTP_CLIENT.clone(),
            base_url,
        ))
    }

    pub fn with_client_and_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn get_user_by_token(&self, token: &str) -> Result<User, AppError> {
        let response = self
            .client
            .get(&self.base_url)
            .header("Authorization", token)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach auth server: {}", e);
                AppError::internal(format!("Failed to reach auth server: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::unauthorized(
                "Invalid or malfunctioned token provided",
            ));
        }

        response.json::<User>().await.map_err(|e| {
            error!("Failed to parse auth server response: {}", e);
            AppError::internal(format!("Failed to parse auth server response: {}", e))
        })
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let url = format!("{}/api/users/{}", self.base_url, id);
        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("Failed to reach auth server: {}", e);
            AppError::internal(format!("Failed to reach auth server: {}", e))
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::internal(format!(
                "Auth server returned status {}",
                response.status()
            )));
        }

        let user = response.json::<User>().await.map_err(|e| {
            error!("Failed to parse auth server response: {}", e);
            AppError::internal(format!("Failed to parse auth server response: {}", e))
        })?;
        Ok(Some(user))
    }
}
