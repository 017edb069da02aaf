//! Application state and its reducer
//!
//! The state is a pair of shared pointers. Every transition builds a new
//! [`ApplicationState`]; fields an action does not touch keep pointing at the
//! previous allocation, so consumers can detect changes with `Arc::ptr_eq`.

pub mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{AppConfig, User};

pub use store::{StateHandle, Store};

/// Everything the application knows about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationState {
    pub config: Arc<AppConfig>,
    pub user: Arc<User>,
}

impl ApplicationState {
    /// Start-up state: the given config and nobody signed in
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            user: Arc::new(User::unauthenticated()),
        }
    }
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

/// State transitions; the only way state changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    SetConfig(AppConfig),
    SetUser(User),
    #[serde(rename = "signout")]
    SignOut,
}

impl Action {
    /// Wire tags accepted by [`Action::from_value`]
    pub const TAGS: [&'static str; 3] = ["set_config", "set_user", "signout"];

    pub fn tag(&self) -> &'static str {
        match self {
            Action::SetConfig(_) => "set_config",
            Action::SetUser(_) => "set_user",
            Action::SignOut => "signout",
        }
    }

    /// Decode an untyped `{"type": ..., "payload": ...}` action.
    ///
    /// Distinguishes an unknown tag ([`Error::UnknownAction`]) from a known
    /// tag with a bad payload ([`Error::InvalidAction`]).
    pub fn from_value(value: Value) -> Result<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_action("missing \"type\" tag"))?
            .to_string();

        if !Self::TAGS.contains(&tag.as_str()) {
            return Err(Error::unknown_action(tag));
        }

        serde_json::from_value(value).map_err(|e| Error::invalid_action(format!("{}: {}", tag, e)))
    }
}

/// What the store does with an action tag it does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownActionPolicy {
    /// Fail with [`Error::UnknownAction`]
    Reject,
    /// Log a warning and leave the state alone
    Ignore,
}

impl Default for UnknownActionPolicy {
    /// Reject in debug builds, ignore in release builds
    fn default() -> Self {
        if cfg!(debug_assertions) {
            UnknownActionPolicy::Reject
        } else {
            UnknownActionPolicy::Ignore
        }
    }
}

/// Pure transition function.
///
/// `state` is never modified; the returned state shares every field the
/// action leaves untouched.
pub fn reduce(state: &ApplicationState, action: Action) -> ApplicationState {
    match action {
        Action::SetConfig(config) => ApplicationState {
            config: Arc::new(config),
            user: Arc::clone(&state.user),
        },
        Action::SetUser(user) => ApplicationState {
            config: Arc::clone(&state.config),
            user: Arc::new(user),
        },
        Action::SignOut => ApplicationState {
            config: Arc::clone(&state.config),
            user: Arc::new(User::unauthenticated()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use serde_json::json;
    use uuid::Uuid;

    fn signed_in() -> ApplicationState {
        let state = ApplicationState::new(AppConfig::new("db:5432", "u", "p", "n"));
        reduce(&state, Action::SetUser(alice()))
    }

    fn alice() -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: UserRole::Admin,
            ..User::unauthenticated()
        }
    }

    #[test]
    fn test_initial_state_is_unauthenticated() {
        let state = ApplicationState::default();
        assert!(!state.user.is_authenticated());
        assert!(state.config.is_blank());
    }

    #[test]
    fn test_set_user_replaces_only_user() {
        let state = ApplicationState::new(AppConfig::new("db:5432", "u", "p", "n"));
        let user = alice();

        let next = reduce(&state, Action::SetUser(user.clone()));

        assert_eq!(*next.user, user);
        assert_eq!(next.config, state.config);
        assert!(Arc::ptr_eq(&next.config, &state.config));
        assert_ne!(next, state);
        // Input untouched
        assert!(!state.user.is_authenticated());
    }

    #[test]
    fn test_set_config_replaces_only_config() {
        let state = signed_in();
        let config = AppConfig::new("other:5432", "u2", "p2", "n2");

        let next = reduce(&state, Action::SetConfig(config.clone()));

        assert_eq!(*next.config, config);
        assert!(Arc::ptr_eq(&next.user, &state.user));
        assert_ne!(*state.config, config);
    }

    #[test]
    fn test_sign_out_is_idempotent() {
        let state = signed_in();

        let once = reduce(&state, Action::SignOut);
        let twice = reduce(&once, Action::SignOut);

        assert_eq!(once.user.id, crate::models::NIL_USER_ID);
        assert_eq!(once, twice);
        assert_eq!(*twice.user, User::unauthenticated());
        assert!(Arc::ptr_eq(&twice.config, &state.config));
    }

    #[test]
    fn test_action_wire_format() {
        let value = serde_json::to_value(Action::SignOut).unwrap();
        assert_eq!(value, json!({"type": "signout"}));

        let value = serde_json::to_value(Action::SetConfig(AppConfig::default())).unwrap();
        assert_eq!(value["type"], "set_config");
        assert_eq!(value["payload"]["db_url"], "");
    }

    #[test]
    fn test_action_from_value() {
        let action = Action::from_value(json!({"type": "signout"})).unwrap();
        assert_eq!(action, Action::SignOut);

        let action = Action::from_value(json!({
            "type": "set_user",
            "payload": {"id": "7a0f5f4e-4a51-4e86-9d59-2b3f3c9e1a10", "email": "a@b.co"}
        }))
        .unwrap();
        assert_eq!(action.tag(), "set_user");
    }

    #[test]
    fn test_action_from_value_unknown_tag() {
        let err = Action::from_value(json!({"type": "set_theme", "payload": "dark"})).unwrap_err();
        assert!(matches!(err, Error::UnknownAction(tag) if tag == "set_theme"));
    }

    #[test]
    fn test_action_from_value_bad_payload() {
        let err = Action::from_value(json!({"type": "set_user", "payload": 42})).unwrap_err();
        assert!(matches!(err, Error::InvalidAction(_)));

        let err = Action::from_value(json!({"payload": {}})).unwrap_err();
        assert!(matches!(err, Error::InvalidAction(_)));
    }

    #[test]
    fn test_tags_match_serialization() {
        let actions = [
            Action::SetConfig(AppConfig::default()),
            Action::SetUser(User::unauthenticated()),
            Action::SignOut,
        ];
        for (action, tag) in actions.iter().zip(Action::TAGS) {
            assert_eq!(action.tag(), tag);
            assert_eq!(serde_json::to_value(action).unwrap()["type"], tag);
        }
    }
}
