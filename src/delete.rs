// ABOUTME: Deletes a selected uploaded image from the remote host
// ABOUTME: Looks the URL up in the ledger, asks the daemon to delete it, then clears the selection

use anyhow::{Context, Result};

use crate::deleter::PicGoDeleter;
use crate::editor::Editor;
use crate::extract::selected_image_url;
use crate::workflow::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(String),
    /// The daemon answered but reported failure
    Rejected(String),
}

impl Session {
    /// Delete the image whose markdown link is selected in the editor
    pub async fn delete_selected<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
    ) -> Result<DeleteOutcome> {
        let selection = editor.selection();
        let url = selected_image_url(&selection).context("Selection holds no image link")?;

        let record = self
            .ledger
            .find(&url)
            .cloned()
            .with_context(|| format!("{} was not uploaded by PicList", url))?;

        let deleter = PicGoDeleter::new(&self.settings.delete_server);
        let response = deleter
            .delete_images(&[record])
            .await
            .context("Error, could not delete")?;

        if !response.success {
            if let Some(msg) = &response.msg {
                tracing::warn!("Delete server said: {}", msg);
            }
            return Ok(DeleteOutcome::Rejected(url));
        }

        editor.replace_selection("");
        self.ledger.remove(&url);
        self.ledger.save()?;
        Ok(DeleteOutcome::Deleted(url))
    }
}
