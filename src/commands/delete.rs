//! Delete a post

use anyhow::Result;

use super::prompt;
use crate::editor::{DeleteOutcome, Editor};
use crate::GitPost;

pub async fn run(app: &GitPost, filename: &str, yes: bool) -> Result<()> {
    if !yes {
        let answer = prompt(&format!(
            "Delete \"{}\"? This cannot be undone. [y/N] ",
            filename
        ))?;
        if !matches!(answer.to_lowercase().as_str(), "y" | "yes") {
            println!("Cancelled");
            return Ok(());
        }
    }

    let mut state = app.load_state();
    let client = app.editor_client(&mut state).await?;
    let mut editor = Editor::new(&client, &app.config);

    match editor.delete(filename).await? {
        DeleteOutcome::Deleted => println!("Deleted {}", filename),
        DeleteOutcome::IndexOnly => {
            println!("Removed {} from the index (the file was already deleted)", filename)
        }
    }
    Ok(())
}
