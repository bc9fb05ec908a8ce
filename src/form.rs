#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Inline annotation form: the events it emits and the handlers turning them
//! into backend calls and listing updates.

use itertools::Itertools;
use typed_builder::TypedBuilder;

use crate::{
    annotation::{Annotation, AnnotationId},
    client::{AnnotationClient, CreateMode},
    error::{AnnotationError, Result},
    listing::CodeListing,
    notice::Notifier,
    payload::UserAnnotationFormData,
    transport::Transport,
};

/// Longest generated saved-annotation title.
const DEFAULT_TITLE_CHARS: usize = 40;

/// Number of leading words a generated title is made of.
const DEFAULT_TITLE_WORDS: usize = 5;

/// Payload of a submit.
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct SubmitDetail {
    /// Markdown text.
    #[builder(setter(into))]
    pub text:                   String,
    /// Saved annotation the text was picked from.
    #[builder(default)]
    pub saved_annotation_id:    Option<u64>,
    /// Title for a new saved annotation.
    #[builder(default, setter(strip_option, into))]
    pub saved_annotation_title: Option<String>,
    /// Whether to store the text as a reusable annotation.
    #[builder(default)]
    pub save_annotation:        bool,
}

impl SubmitDetail {
    /// Title of the saved annotation: the given one, or the first words of
    /// the text.
    pub fn title(&self) -> String {
        match self.saved_annotation_title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => default_title(&self.text),
        }
    }
}

/// Title generated for a saved annotation when none is given.
pub fn default_title(text: &str) -> String {
    text.split_whitespace()
        .take(DEFAULT_TITLE_WORDS)
        .join(" ")
        .chars()
        .take(DEFAULT_TITLE_CHARS)
        .collect()
}

/// What the user did with the form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormEvent {
    /// Send the form.
    Submit(SubmitDetail),
    /// Close the form without changes.
    Cancel,
    /// Delete the edited annotation.
    Delete,
}

/// Visible state of the form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormState {
    /// The last write failed.
    pub errored: bool,
    /// Inputs accept interaction.
    pub enabled: bool,
    /// Current text.
    pub text:    String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            errored: false,
            enabled: true,
            text:    String::new(),
        }
    }
}

/// What a form is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormTarget {
    /// Creates an annotation on a 1-based line, or a global one.
    New {
        /// Line, `None` for a global annotation.
        line: Option<usize>,
        /// Annotation or question.
        mode: CreateMode,
    },
    /// Edits an existing annotation.
    Edit(AnnotationId),
}

/// Result of a handled event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormOutcome {
    /// A new annotation was added to the listing.
    Created(AnnotationId),
    /// The edited annotation was replaced.
    Updated(AnnotationId),
    /// The edited annotation was removed.
    Deleted,
    /// The form was closed.
    Cancelled,
}

/// An open annotation form.
#[derive(Clone, Debug)]
pub struct AnnotationForm {
    /// What the form writes to.
    target: FormTarget,
    /// Visible state.
    state:  FormState,
}

impl AnnotationForm {
    /// Opens a creation form.
    pub fn create(line: Option<usize>, mode: CreateMode) -> Self {
        Self {
            target: FormTarget::New { line, mode },
            state:  FormState::default(),
        }
    }

    /// Opens an edit form prefilled with the raw text of a modifiable
    /// annotation. `None` when the annotation cannot be edited.
    pub fn edit(listing: &mut CodeListing, id: AnnotationId) -> Option<Self> {
        let text = listing.begin_edit(id)?;
        Some(Self {
            target: FormTarget::Edit(id),
            state:  FormState {
                text,
                ..FormState::default()
            },
        })
    }

    /// What the form writes to.
    pub fn target(&self) -> FormTarget {
        self.target
    }

    /// Visible state.
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Handles one event. Failed writes leave the form errored, re-enabled
    /// and with the typed text kept, and return the error.
    pub async fn handle<T: Transport>(
        &mut self,
        event: FormEvent,
        listing: &mut CodeListing,
        client: &AnnotationClient<T>,
        notifier: &dyn Notifier,
    ) -> Result<FormOutcome> {
        let outcome = match (event, self.target) {
            (FormEvent::Cancel, FormTarget::Edit(id)) => {
                listing.end_edit(id);
                return Ok(FormOutcome::Cancelled);
            }
            (FormEvent::Cancel, FormTarget::New { .. }) => return Ok(FormOutcome::Cancelled),
            (FormEvent::Submit(detail), FormTarget::New { line, mode }) => {
                self.sending(&detail.text);
                submit_new(&detail, line, mode, listing, client, notifier).await
            }
            (FormEvent::Submit(detail), FormTarget::Edit(id)) => {
                self.sending(&detail.text);
                submit_edit(&detail, id, listing, client).await
            }
            (FormEvent::Delete, FormTarget::Edit(id)) => {
                self.state.enabled = false;
                delete(id, listing, client).await
            }
            (FormEvent::Delete, FormTarget::New { .. }) => Err(AnnotationError::Contract(
                "an unsaved annotation cannot be deleted".to_string(),
            )),
        };

        match outcome {
            Ok(outcome) => {
                self.state.errored = false;
                self.state.enabled = true;
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("annotation form failed: {e}");
                self.state.errored = true;
                self.state.enabled = true;
                Err(e)
            }
        }
    }

    /// Disables the form while a write is in flight.
    fn sending(&mut self, text: &str) {
        self.state.text = text.to_string();
        self.state.enabled = false;
        self.state.errored = false;
    }
}

/// Converts a 1-based listing line to the 0-based line sent to the server.
fn wire_line(line: Option<usize>) -> Option<usize> {
    line.map(|line| line.saturating_sub(1))
}

/// Creates an annotation, adds it to the listing and optionally stores its
/// text as a saved annotation. Failing to save does not fail the creation.
pub async fn submit_new<T: Transport>(
    detail: &SubmitDetail,
    line: Option<usize>,
    mode: CreateMode,
    listing: &mut CodeListing,
    client: &AnnotationClient<T>,
    notifier: &dyn Notifier,
) -> Result<FormOutcome> {
    let form = UserAnnotationFormData::builder()
        .annotation_text(detail.text.clone())
        .line_nr(wire_line(line))
        .evaluation_id(listing.evaluation_id())
        .saved_annotation_id(detail.saved_annotation_id)
        .build();

    let created = client
        .create_user_annotation(&form, listing.submission_id(), mode)
        .await?;
    client.saved_cache().invalidate([created.saved_annotation_id()]);
    let id = listing.add_annotation(created);

    if detail.save_annotation {
        let title = detail.title();
        if let Err(e) = listing
            .save_annotation(client, id, Some(&title), notifier)
            .await
        {
            tracing::debug!("annotation {id} was created but not saved: {e}");
        }
    }

    Ok(FormOutcome::Created(id))
}

/// Updates the text of an annotation and swaps it in the listing.
pub async fn submit_edit<T: Transport>(
    detail: &SubmitDetail,
    id: AnnotationId,
    listing: &mut CodeListing,
    client: &AnnotationClient<T>,
) -> Result<FormOutcome> {
    let original = listed(listing, id)?;
    let form = UserAnnotationFormData::builder()
        .annotation_text(detail.text.clone())
        .line_nr(wire_line(original.line()))
        .evaluation_id(listing.evaluation_id())
        .saved_annotation_id(detail.saved_annotation_id)
        .build();

    let updated = client.update(&original, &form).await?;
    let new_id = updated.id();
    listing.update_annotation(&original, updated);
    Ok(FormOutcome::Updated(new_id))
}

/// Deletes an annotation and drops it from the listing.
pub async fn delete<T: Transport>(
    id: AnnotationId,
    listing: &mut CodeListing,
    client: &AnnotationClient<T>,
) -> Result<FormOutcome> {
    let original = listed(listing, id)?;
    client.delete(&original).await?;
    listing.remove_annotation(&original);
    Ok(FormOutcome::Deleted)
}

/// Clones a listed annotation.
fn listed(listing: &CodeListing, id: AnnotationId) -> Result<Annotation> {
    listing
        .annotation(id)
        .cloned()
        .ok_or_else(|| AnnotationError::Contract(format!("annotation {id} is not listed")))
}
