use serde::{Deserialize, Serialize};

use crate::db::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{is_valid_phone, require_text, Validate};

/// Request body for user create and update.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "senha")]
    pub password: String,
}

impl Validate for UserRequest {
    fn validate(&self) -> AppResult<()> {
        require_text("nome", &self.name, 100)?;
        if !is_valid_phone(&self.phone) {
            return Err(AppError::validation("invalid telefone"));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("invalid senha"));
        }
        Ok(())
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            phone: u.phone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<PublicUser>,
}
