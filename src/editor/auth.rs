//! Editor sign-in with a GitHub personal access token

use crate::config::GitHubConfig;
use crate::error::{Error, Result};
use crate::github::{GitHubClient, GitHubUser};
use crate::state::LocalState;

/// Only configured accounts may use the editor
pub fn authorize(user: &GitHubUser, config: &GitHubConfig) -> Result<()> {
    if config.authorized_users.iter().any(|u| u == &user.login) {
        return Ok(());
    }
    Err(Error::Unauthorized(format!(
        "{} may not edit this blog. Authorized users: {}",
        user.login,
        config.authorized_users.join(", ")
    )))
}

/// Keep the session when the account is authorized, otherwise clear it
pub fn start_session(state: &mut LocalState, token: &str, user: GitHubUser, config: &GitHubConfig) -> Result<()> {
    if let Err(e) = authorize(&user, config) {
        state.clear_session();
        return Err(e);
    }
    state.set_session(token, user);
    Ok(())
}

/// Verify `token` against the API and start a session for its account
pub async fn login(
    client: &GitHubClient,
    token: &str,
    config: &GitHubConfig,
    state: &mut LocalState,
) -> Result<GitHubUser> {
    let user = match client.current_user().await {
        Ok(user) => user,
        Err(e) => {
            state.clear_session();
            return Err(e);
        }
    };
    start_session(state, token, user.clone(), config)?;
    tracing::info!("Signed in as {}", user.login);
    Ok(user)
}

pub fn logout(state: &mut LocalState) {
    state.clear_session();
}

/// The stored session, re-checked against the authorized users.
/// A session for an account that lost access is cleared.
pub fn restore_session(state: &mut LocalState, config: &GitHubConfig) -> Result<Option<(String, GitHubUser)>> {
    let (Some(token), Some(user)) = (state.token.clone(), state.user.clone()) else {
        return Ok(None);
    };
    if let Err(e) = authorize(&user, config) {
        state.clear_session();
        return Err(e);
    }
    Ok(Some((token, user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(login: &str) -> GitHubUser {
        GitHubUser {
            login: login.to_string(),
            name: None,
            email: None,
            avatar_url: None,
        }
    }

    fn config() -> GitHubConfig {
        GitHubConfig {
            owner: "jane".to_string(),
            repo: "jane.github.io".to_string(),
            authorized_users: vec!["jane".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_authorized_session() {
        let mut state = LocalState::new();
        start_session(&mut state, "tok", user("jane"), &config()).unwrap();
        assert_eq!(state.token.as_deref(), Some("tok"));

        let restored = restore_session(&mut state, &config()).unwrap();
        assert_eq!(restored.map(|(t, u)| (t, u.login)), Some(("tok".to_string(), "jane".to_string())));
    }

    #[test]
    fn test_unauthorized_user_is_signed_out() {
        let mut state = LocalState::new();
        state.set_session("old", user("jane"));

        let err = start_session(&mut state, "tok", user("mallory"), &config()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert!(state.token.is_none());
        assert!(state.user.is_none());
    }

    #[test]
    fn test_restore_after_access_revoked() {
        let mut state = LocalState::new();
        state.set_session("tok", user("jane"));
        let revoked = GitHubConfig {
            authorized_users: vec!["someone-else".to_string()],
            ..config()
        };
        assert!(restore_session(&mut state, &revoked).is_err());
        assert!(state.token.is_none());

        assert!(restore_session(&mut state, &config()).unwrap().is_none());
    }

    #[test]
    fn test_logout() {
        let mut state = LocalState::new();
        state.set_session("tok", user("jane"));
        logout(&mut state);
        assert!(state.token.is_none());
    }
}
