//! HTTP implementation of the remote note authority.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use notarium_core::{
    Error, MediaAttachment, MediaKind, Note, NoteAuthority, NoteDraft, NotePatch, Result,
    TokenProvider,
};

use crate::config::GatewayConfig;

/// Note authority client against the remote HTTP API.
///
/// Every call resolves the bearer credential first; a missing credential
/// fails with [`Error::Auth`] before any request is issued.
pub struct HttpNoteAuthority {
    config: GatewayConfig,
    tokens: Arc<dyn TokenProvider>,
    client: reqwest::Client,
}

impl HttpNoteAuthority {
    pub fn new(config: GatewayConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            config,
            tokens,
            client: reqwest::Client::new(),
        }
    }

    fn notes_url(&self) -> String {
        format!("{}/api/notes", self.config.base_url)
    }

    fn note_url(&self, id: Uuid) -> String {
        format!("{}/api/notes/{}", self.config.base_url, id)
    }

    /// Resolve the bearer credential or fail fast.
    fn token(&self) -> Result<String> {
        self.tokens
            .bearer_token()
            .ok_or_else(|| Error::Auth("no bearer credential available".to_string()))
    }

    /// Map a non-success HTTP response to the error taxonomy.
    async fn error_for(response: reqwest::Response, note_id: Option<Uuid>) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        status_to_error(status.as_u16(), &body, note_id)
    }

    async fn parse_note(response: reqwest::Response) -> Result<Note> {
        response
            .json::<Note>()
            .await
            .map_err(|e| Error::Serialization(format!("invalid note payload: {}", e)))
    }
}

/// Translate an HTTP status into the engine error taxonomy.
fn status_to_error(status: u16, body: &str, note_id: Option<Uuid>) -> Error {
    match status {
        401 | 403 => Error::Auth(format!("authority rejected credential ({})", status)),
        404 => match note_id {
            Some(id) => Error::NoteNotFound(id),
            None => Error::NotFound(body.to_string()),
        },
        _ => Error::Transport(format!("authority returned {}: {}", status, body)),
    }
}

#[async_trait]
impl NoteAuthority for HttpNoteAuthority {
    #[instrument(skip(self))]
    async fn fetch_all(&self) -> Result<Vec<Note>> {
        let token = self.token()?;
        let response = self
            .client
            .get(self.notes_url())
            .bearer_auth(token)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, None).await);
        }

        let mut notes: Vec<Note> = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("invalid note list payload: {}", e)))?;
        // The store contract is most-recently-modified first regardless of
        // what order the authority happens to return.
        notes.sort_by(|a, b| b.updated_at_utc.cmp(&a.updated_at_utc));
        debug!(count = notes.len(), "fetched notes");
        Ok(notes)
    }

    #[instrument(skip(self, draft), fields(title = %draft.effective_title()))]
    async fn create(&self, draft: NoteDraft) -> Result<Note> {
        let token = self.token()?;
        let mut body = draft;
        body.title = body.effective_title();

        let response = self
            .client
            .post(self.notes_url())
            .bearer_auth(token)
            .json(&body)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, None).await);
        }
        Self::parse_note(response).await
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        let token = self.token()?;
        let response = self
            .client
            .patch(self.note_url(id))
            .bearer_auth(token)
            .json(&patch)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, Some(id)).await);
        }
        Self::parse_note(response).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<()> {
        let token = self.token()?;
        let response = self
            .client
            .delete(self.note_url(id))
            .bearer_auth(token)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, Some(id)).await);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn toggle_favorite(&self, id: Uuid) -> Result<Note> {
        let token = self.token()?;
        let url = format!("{}/favorite", self.note_url(id));
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, Some(id)).await);
        }
        Self::parse_note(response).await
    }

    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    async fn attach_media(
        &self,
        id: Uuid,
        kind: MediaKind,
        payload: Vec<u8>,
    ) -> Result<MediaAttachment> {
        let token = self.token()?;
        let mime = match kind {
            MediaKind::Audio => "audio/webm",
            MediaKind::Video => "video/webm",
        };

        let file_part = reqwest::multipart::Part::bytes(payload)
            .file_name("clip.webm")
            .mime_str(mime)
            .map_err(|e| Error::Internal(format!("failed to build multipart: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("kind", kind.to_string());

        let url = format!("{}/media", self.note_url(id));
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .timeout(Duration::from_secs(self.config.upload_timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::error_for(response, Some(id)).await;
            warn!(%id, %kind, error = %err, "media upload failed");
            return Err(err);
        }

        response
            .json::<MediaAttachment>()
            .await
            .map_err(|e| Error::Serialization(format!("invalid attachment payload: {}", e)))
    }
}
