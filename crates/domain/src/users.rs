//! User registration and lookup.

use std::sync::Arc;

use booking_store::{User, UserDirectory, UserId};

use crate::commands::RegisterUser;
use crate::error::Result;

/// Registers users and resolves them by id.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserDirectory>,
}

impl UserService {
    /// Creates a new user service.
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Registers a user under a fresh identity.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, cmd: RegisterUser) -> Result<User> {
        let id = self.users.next_identity().await?;
        let user = User::new(id, cmd.name);
        self.users.add(user.clone()).await?;
        tracing::info!(user_id = %id, "user registered");
        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> Result<User> {
        Ok(self.users.get(id).await?)
    }
}
