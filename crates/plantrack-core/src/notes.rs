//! Per-project notes.
//!
//! [`NoteService`] is the storage boundary: it validates text, scopes every
//! read and write to the session user, and talks to the notes collection.
//! [`NotesPanel`] is the view model for one project's note list. It keeps a
//! local copy that can run ahead of storage (optimistic delete) and records
//! when that copy may have diverged.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{CoreError, ValidationError};
use crate::format::truncate_chars;
use crate::model::note::{self, Note};
use crate::model::project::Project;
use crate::session::{Session, require_user};
use crate::store::{DocumentStore, Filter};

/// Trim `text` and check it against the length limit.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyNote`] for blank text and
/// [`ValidationError::NoteTooLong`] past `max_chars` characters.
pub fn validate_note_text(text: &str, max_chars: usize) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyNote);
    }

    let got = trimmed.chars().count();
    if got > max_chars {
        return Err(ValidationError::NoteTooLong {
            max: max_chars,
            got,
        });
    }
    Ok(trimmed.to_string())
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Note CRUD scoped to the session user.
pub struct NoteService<'a> {
    store: &'a dyn DocumentStore,
    session: Option<&'a Session>,
    collection: &'a str,
    max_chars: usize,
}

impl<'a> NoteService<'a> {
    pub const fn new(
        store: &'a dyn DocumentStore,
        session: Option<&'a Session>,
        collection: &'a str,
        max_chars: usize,
    ) -> Self {
        Self {
            store,
            session,
            collection,
            max_chars,
        }
    }

    #[must_use]
    pub const fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Attach a note to `project_id`.
    ///
    /// # Errors
    ///
    /// Fails without a session, on invalid input, or when the store fails.
    pub fn add_note(&self, project_id: &str, text: &str) -> Result<Note, CoreError> {
        let user_id = require_user(self.session)?;
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(ValidationError::EmptyProjectId.into());
        }
        let text = validate_note_text(text, self.max_chars)?;

        let now = now_rfc3339();
        let mut note = Note {
            id: String::new(),
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            text,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        note.id = self.store.add_document(self.collection, note.to_fields())?;

        info!(user_id = %user_id, project_id, note_id = %note.id, "added note");
        Ok(note)
    }

    /// Attach a note to a resolved project.
    ///
    /// # Errors
    ///
    /// As [`add_note`](Self::add_note); ephemeral projects are rejected.
    pub fn add_note_for(&self, project: &Project, text: &str) -> Result<Note, CoreError> {
        let project_id = project
            .stored_id()
            .ok_or_else(|| ValidationError::EphemeralProject(project.key.to_string()))?;
        self.add_note(project_id, text)
    }

    /// Replace the text of one of the user's notes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoteNotFound`] when the note is missing or owned
    /// by someone else, plus the usual session/validation/store errors.
    pub fn update_note(&self, note_id: &str, text: &str) -> Result<Note, CoreError> {
        let user_id = require_user(self.session)?;
        let text = validate_note_text(text, self.max_chars)?;

        let mut note = self
            .owned_note(note_id)?
            .ok_or_else(|| CoreError::NoteNotFound(note_id.to_string()))?;
        note.text = text;
        note.updated_at = Some(now_rfc3339());

        self.store
            .set_document(self.collection, &note.id, note.to_fields())?;

        debug!(user_id = %user_id, note_id, "updated note");
        Ok(note)
    }

    /// Delete one of the user's notes. `false` means there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Fails without a session or when the store fails.
    pub fn delete_note(&self, note_id: &str) -> Result<bool, CoreError> {
        let user_id = require_user(self.session)?;
        if self.owned_note(note_id)?.is_none() {
            debug!(user_id = %user_id, note_id, "note to delete not found");
            return Ok(false);
        }

        let deleted = self.store.delete_document(self.collection, note_id)?;
        if deleted {
            info!(user_id = %user_id, note_id, "deleted note");
        }
        Ok(deleted)
    }

    /// The user's notes on `project_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_notes(&self, project_id: &str) -> Result<Vec<Note>, CoreError> {
        let Some(session) = self.session else {
            return Ok(Vec::new());
        };

        let filters = [
            Filter::eq(note::FIELD_USER_ID, session.user_id.as_str()),
            Filter::eq(note::FIELD_PROJECT_ID, Value::from(project_id.trim())),
        ];
        let mut notes: Vec<Note> = self
            .store
            .query(self.collection, &filters)?
            .iter()
            .filter_map(Note::from_document)
            .collect();

        notes.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(notes)
    }

    fn owned_note(&self, note_id: &str) -> Result<Option<Note>, CoreError> {
        let user_id = require_user(self.session)?;
        let note_id = note_id.trim();
        if note_id.is_empty() {
            return Ok(None);
        }

        Ok(self
            .store
            .get_document(self.collection, note_id)?
            .as_ref()
            .and_then(Note::from_document)
            .filter(|n| n.user_id == user_id.as_str()))
    }
}

// ---------------------------------------------------------------------------
// NotesPanel
// ---------------------------------------------------------------------------

/// Local note list for one project.
///
/// Deletes are optimistic and final locally: the note leaves the list before
/// storage is asked, and a failed delete does not put it back. Instead the
/// panel is flagged [`stale`](Self::is_stale) until the next
/// [`refresh`](Self::refresh).
#[derive(Debug, Clone)]
pub struct NotesPanel {
    project_id: String,
    notes: Vec<Note>,
    expanded: bool,
    draft: String,
    max_chars: usize,
    stale: bool,
}

impl NotesPanel {
    pub fn new(project_id: impl Into<String>, max_chars: usize) -> Self {
        Self {
            project_id: project_id.into(),
            notes: Vec::new(),
            expanded: false,
            draft: String::new(),
            max_chars,
            stale: true,
        }
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    #[must_use]
    pub const fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub const fn toggle_expanded(&mut self) {
        self.expanded = !self.expanded;
    }

    /// Whether the local list may differ from storage.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the draft, capped at the panel's character limit.
    pub fn set_draft(&mut self, text: &str) {
        self.draft = truncate_chars(text, self.max_chars).to_string();
    }

    /// Save is only offered for non-blank drafts.
    #[must_use]
    pub fn can_save(&self) -> bool {
        !self.draft.trim().is_empty()
    }

    /// Reload the list from storage and clear the stale flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; the local list is left as is.
    pub fn refresh(&mut self, service: &NoteService<'_>) -> Result<(), CoreError> {
        self.notes = service.list_notes(&self.project_id)?;
        self.stale = false;
        Ok(())
    }

    /// Persist the draft as a new note and append it locally.
    ///
    /// # Errors
    ///
    /// Validation and store errors leave the draft untouched.
    pub fn save_draft(&mut self, service: &NoteService<'_>) -> Result<&Note, CoreError> {
        let note = service.add_note(&self.project_id, &self.draft)?;
        self.draft.clear();
        self.notes.push(note);
        Ok(&self.notes[self.notes.len() - 1])
    }

    /// Replace a note's text in storage, then locally.
    ///
    /// # Errors
    ///
    /// Errors leave the local copy untouched.
    pub fn edit(
        &mut self,
        service: &NoteService<'_>,
        note_id: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let updated = service.update_note(note_id, text)?;
        if let Some(slot) = self.notes.iter_mut().find(|n| n.id == updated.id) {
            *slot = updated;
        } else {
            self.stale = true;
        }
        Ok(())
    }

    /// Optimistically remove a note, then delete it from storage.
    ///
    /// The note is gone from [`notes`](Self::notes) whatever the outcome.
    ///
    /// # Errors
    ///
    /// Store errors are returned after flagging the panel stale.
    pub fn delete(&mut self, service: &NoteService<'_>, note_id: &str) -> Result<bool, CoreError> {
        self.notes.retain(|n| n.id != note_id);

        match service.delete_note(note_id) {
            Ok(deleted) => Ok(deleted),
            Err(e) => {
                warn!(
                    project_id = %self.project_id,
                    note_id,
                    error = %e,
                    "note delete failed; local list may have diverged"
                );
                self.stale = true;
                Err(e)
            }
        }
    }
}
