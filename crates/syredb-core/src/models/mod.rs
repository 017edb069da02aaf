//! Data models shared between the store, the pipeline and the backend

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier carried by a user that is not authenticated.
///
/// There is no separate "logged in" flag anywhere in the client: every gate
/// compares the user id against this value.
pub const NIL_USER_ID: Uuid = Uuid::nil();

/// Database connection parameters (persisted by the backend, not by us)
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_url: String,
    pub db_username: String,
    pub db_password: String,
    pub db_name: String,
}

impl AppConfig {
    pub fn new(
        db_url: impl Into<String>,
        db_username: impl Into<String>,
        db_password: impl Into<String>,
        db_name: impl Into<String>,
    ) -> Self {
        Self {
            db_url: db_url.into(),
            db_username: db_username.into(),
            db_password: db_password.into(),
            db_name: db_name.into(),
        }
    }

    /// A connection attempt is only made with a usable config: every field set.
    pub fn is_usable(&self) -> bool {
        !self.db_url.is_empty()
            && !self.db_username.is_empty()
            && !self.db_password.is_empty()
            && !self.db_name.is_empty()
    }

    /// True when nothing has been entered yet (fresh install).
    pub fn is_blank(&self) -> bool {
        self.db_url.is_empty()
            && self.db_username.is_empty()
            && self.db_password.is_empty()
            && self.db_name.is_empty()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("db_url", &self.db_url)
            .field("db_username", &self.db_username)
            .field("db_password", &"****")
            .field("db_name", &self.db_name)
            .finish()
    }
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Owner,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Owner => "owner",
        }
    }

    pub fn is_admin_or_owner(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Owner)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "owner" => Ok(UserRole::Owner),
            _ => Err(format!("Invalid role: {}. Use 'user', 'admin' or 'owner'", s)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Disabled,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub account_status: AccountStatus,
}

impl User {
    /// The canonical "nobody is signed in" user.
    pub fn unauthenticated() -> Self {
        Self {
            id: NIL_USER_ID,
            email: String::new(),
            name: String::new(),
            role: UserRole::default(),
            account_status: AccountStatus::default(),
        }
    }

    /// Only the id decides; email, name and role are ignored.
    pub fn is_authenticated(&self) -> bool {
        self.id != NIL_USER_ID
    }
}

impl Default for User {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

/// Login credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("email", &self.email)
            .field("password", &"****")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> AppConfig {
        AppConfig::new("localhost:5432", "syre", "secret", "syredb")
    }

    #[test]
    fn test_config_usable_when_all_fields_set() {
        assert!(full_config().is_usable());
    }

    #[test]
    fn test_config_not_usable_when_any_field_empty() {
        let clears: [fn(&mut AppConfig); 4] = [
            |c| c.db_url.clear(),
            |c| c.db_username.clear(),
            |c| c.db_password.clear(),
            |c| c.db_name.clear(),
        ];
        for clear in clears {
            let mut config = full_config();
            clear(&mut config);
            assert!(!config.is_usable(), "{:?} should not be usable", config);
        }
    }

    #[test]
    fn test_default_config_is_blank() {
        let config = AppConfig::default();
        assert!(config.is_blank());
        assert!(!config.is_usable());
        assert!(!full_config().is_blank());
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let debug = format!("{:?}", full_config());
        assert!(debug.contains("localhost:5432"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_nil_user_is_unauthenticated_regardless_of_fields() {
        let mut user = User::unauthenticated();
        user.email = "someone@example.com".to_string();
        user.name = "Someone".to_string();
        user.role = UserRole::Owner;
        assert!(!user.is_authenticated());
    }

    #[test]
    fn test_user_with_id_is_authenticated() {
        let user = User {
            id: Uuid::new_v4(),
            ..User::unauthenticated()
        };
        assert!(user.is_authenticated());
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!("owner".parse::<UserRole>().unwrap(), UserRole::Owner);
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("user".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_user_role_admin_or_owner() {
        assert!(UserRole::Owner.is_admin_or_owner());
        assert!(UserRole::Admin.is_admin_or_owner());
        assert!(!UserRole::User.is_admin_or_owner());
    }

    #[test]
    fn test_user_deserializes_with_missing_optional_fields() {
        let json = r#"{"id": "00000000-0000-0000-0000-000000000000"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user, User::unauthenticated());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = UserCredentials {
            email: "a@b.co".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
