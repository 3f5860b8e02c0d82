use serde_json::Value;

use super::model::User;
use crate::error::{CatalogError, CatalogResult};
use crate::store::DocumentStore;

pub const USERS_COLLECTION: &str = "users";

/// Create the profile for a freshly signed-up account. New users are never admins.
pub async fn create_user_profile(
    docs: &dyn DocumentStore,
    uid: &str,
    user_name: &str,
) -> CatalogResult<User> {
    let user = User {
        uid: uid.to_string(),
        user_name: user_name.to_string(),
        is_admin: false,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    let fields = match serde_json::to_value(&user).map_err(|e| CatalogError::Decode(e.to_string()))? {
        Value::Object(fields) => fields,
        _ => return Err(CatalogError::Decode("user is not an object".to_string())),
    };
    docs.put(USERS_COLLECTION, uid, fields).await?;
    Ok(user)
}

/// Get a user profile; `None` when the account has none.
pub async fn get_user(docs: &dyn DocumentStore, uid: &str) -> CatalogResult<Option<User>> {
    let Some(document) = docs.get(USERS_COLLECTION, uid).await? else {
        return Ok(None);
    };
    let mut fields = document.fields;
    fields
        .entry("uid")
        .or_insert_with(|| Value::String(document.id.clone()));
    serde_json::from_value(Value::Object(fields))
        .map(Some)
        .map_err(|e| CatalogError::Decode(format!("user: {}", e)))
}

/// Missing profile means not an admin.
pub async fn is_admin(docs: &dyn DocumentStore, uid: &str) -> CatalogResult<bool> {
    Ok(get_user(docs, uid).await?.map(|u| u.is_admin).unwrap_or(false))
}
