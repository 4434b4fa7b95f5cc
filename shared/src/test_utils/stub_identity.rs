use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::identity::IdentityService;
use crate::models::User;

/// Identity double backed by an in-memory user table keyed by both id
/// and token ("token-{id}").
#[derive(Default)]
pub struct StubIdentityService {
    users: Mutex<HashMap<String, User>>,
}

impl StubIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.add_user(user);
        self
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }
}

#[async_trait]
impl IdentityService for StubIdentityService {
    async fn get_user_by_token(&self, token: &str) -> Result<User, AppError> {
        let users = self.users.lock().unwrap();
        token
            .strip_prefix("token-")
            .and_then(|id| users.get(id).cloned())
            .ok_or_else(|| AppError::unauthorized("Invalid or malfunctioned token provided"))
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }
}
