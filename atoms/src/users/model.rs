use serde::{Deserialize, Serialize};

/// Profile stored next to the identity-provider account.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    /// Identity-provider subject
    pub uid: String,
    #[serde(default)]
    pub user_name: String,
    /// Gates upload, edit, delete and signup
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: String,
}
