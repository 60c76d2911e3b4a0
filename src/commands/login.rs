//! Editor session commands

use anyhow::Result;

use super::prompt;
use crate::editor::auth;
use crate::GitPost;

/// Verify a personal access token and remember it
pub async fn login(app: &GitPost, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => {
            println!("A GitHub personal access token with the `repo` scope is required.");
            println!("Create one under Settings > Developer settings > Personal access tokens.");
            prompt("Token: ")?
        }
    };
    if token.is_empty() {
        anyhow::bail!("No token given");
    }

    let mut state = app.load_state();
    let client = app.github(&token)?;
    let result = auth::login(&client, &token, &app.config.github, &mut state).await;
    app.save_state(&state)?;

    let user = result?;
    println!("Signed in as {}", user.name.as_deref().unwrap_or(&user.login));
    Ok(())
}

pub fn logout(app: &GitPost) -> Result<()> {
    let mut state = app.load_state();
    auth::logout(&mut state);
    app.save_state(&state)?;
    println!("Signed out");
    Ok(())
}

/// Show the stored session
pub fn whoami(app: &GitPost) -> Result<()> {
    let mut state = app.load_state();
    let session = auth::restore_session(&mut state, &app.config.github);
    app.save_state(&state)?;

    match session? {
        Some((_, user)) => {
            println!("{}", user.name.as_deref().unwrap_or(&user.login));
            println!("  login: {}", user.login);
            if let Some(email) = &user.email {
                println!("  email: {}", email);
            }
        }
        None => println!("Not signed in"),
    }
    Ok(())
}
