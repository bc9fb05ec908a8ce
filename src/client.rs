#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Create, read, update, delete and transition calls against the backend,
//! translating payloads into [`Annotation`]s.

use std::{collections::HashMap, sync::Mutex};

use serde_json::json;

use crate::{
    annotation::{Annotation, SharedIds},
    error::{AnnotationError, Result},
    payload::{
        NewSavedAnnotation, SavedAnnotationData, SavedAnnotationFields, UserAnnotationData,
        UserAnnotationFormData,
    },
    transport::{ApiRequest, Transport},
    types::QuestionState,
};

/// Envelope key of a create request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CreateMode {
    /// Teacher comment, sent as `{annotation: ...}`.
    #[default]
    Annotation,
    /// Student question, sent as `{question: ...}`.
    Question,
}

impl CreateMode {
    /// JSON envelope key.
    pub fn key(self) -> &'static str {
        match self {
            CreateMode::Annotation => "annotation",
            CreateMode::Question => "question",
        }
    }
}

/// Result of a question state change. Every variant is a successful
/// convergence with server truth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied; the annotation carries the new state.
    Transitioned(Annotation),
    /// Someone deleted the question first.
    Gone,
    /// Someone changed the state first; the annotation is the refetched
    /// server state.
    Refreshed(Annotation),
}

/// Path of the annotations collection of a submission.
pub fn submission_annotations_path(submission_id: u64) -> String {
    format!("/submissions/{submission_id}/annotations.json")
}

/// Path of a single annotation.
pub fn annotation_path(server_id: u64) -> String {
    format!("/annotations/{server_id}")
}

/// Cache of saved annotations keyed by id.
#[derive(Debug, Default)]
pub struct SavedAnnotationCache {
    /// Known saved annotations.
    by_id: Mutex<HashMap<u64, SavedAnnotationData>>,
}

impl SavedAnnotationCache {
    /// Cached entry.
    pub fn get(&self, id: u64) -> Option<SavedAnnotationData> {
        self.by_id
            .lock()
            .expect("saved annotation cache poisoned")
            .get(&id)
            .cloned()
    }

    /// Stores an entry.
    pub fn insert(&self, saved: SavedAnnotationData) {
        self.by_id
            .lock()
            .expect("saved annotation cache poisoned")
            .insert(saved.id, saved);
    }

    /// Drops the given entries; `None`s are ignored.
    pub fn invalidate<I>(&self, ids: I)
    where
        I: IntoIterator<Item = Option<u64>>,
    {
        let mut by_id = self.by_id.lock().expect("saved annotation cache poisoned");
        for id in ids.into_iter().flatten() {
            by_id.remove(&id);
        }
    }
}

/// Backend client for user annotations and questions.
pub struct AnnotationClient<T> {
    /// Carrier of the calls.
    transport: T,
    /// Identity source for constructed annotations.
    ids:       SharedIds,
    /// Saved annotations seen so far.
    saved:     SavedAnnotationCache,
}

impl<T: Transport> AnnotationClient<T> {
    /// Creates a client.
    pub fn new(transport: T, ids: SharedIds) -> Self {
        Self {
            transport,
            ids,
            saved: SavedAnnotationCache::default(),
        }
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Identity source shared with listings.
    pub fn ids(&self) -> SharedIds {
        self.ids.clone()
    }

    /// Saved-annotation cache.
    pub fn saved_cache(&self) -> &SavedAnnotationCache {
        &self.saved
    }

    /// Builds the right variant for a payload.
    fn build(&self, data: &UserAnnotationData) -> Annotation {
        Annotation::from_user_data(data, self.ids.as_ref())
    }

    /// Sends a request and decodes a single annotation from a 2xx answer.
    async fn fetch_one(&self, request: ApiRequest) -> Result<Annotation> {
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        if !response.is_ok() {
            return Err(response.rejection());
        }
        let data: UserAnnotationData = response.json(&path)?;
        Ok(self.build(&data))
    }

    /// Creates an annotation or question on a submission.
    pub async fn create_user_annotation(
        &self,
        form: &UserAnnotationFormData,
        submission_id: u64,
        mode: CreateMode,
    ) -> Result<Annotation> {
        let body = json!({ mode.key(): form });
        self.fetch_one(ApiRequest::post(submission_annotations_path(submission_id), body))
            .await
    }

    /// Lists every user annotation and question of a submission, in server
    /// order.
    pub async fn get_all_user_annotations(&self, submission_id: u64) -> Result<Vec<Annotation>> {
        let path = submission_annotations_path(submission_id);
        let response = self.transport.send(ApiRequest::get(path.clone())).await?;
        if !response.is_ok() {
            return Err(response.rejection());
        }
        let data: Vec<UserAnnotationData> = response.json(&path)?;
        Ok(data.iter().map(|item| self.build(item)).collect())
    }

    /// Updates the text of an annotation or question.
    pub async fn update(
        &self,
        annotation: &Annotation,
        form: &UserAnnotationFormData,
    ) -> Result<Annotation> {
        let url = mutation_url(annotation)?;
        let key = match annotation.question_state() {
            Some(_) => CreateMode::Question.key(),
            None => CreateMode::Annotation.key(),
        };
        let updated = self
            .fetch_one(ApiRequest::patch(url, json!({ key: form })))
            .await?;
        if form.saved_annotation_id != annotation.saved_annotation_id() {
            self.saved
                .invalidate([form.saved_annotation_id, annotation.saved_annotation_id()]);
        }
        Ok(updated)
    }

    /// Deletes an annotation or question.
    pub async fn delete(&self, annotation: &Annotation) -> Result<()> {
        let url = mutation_url(annotation)?;
        let response = self.transport.send(ApiRequest::delete(url)).await?;
        if !response.is_ok() {
            return Err(response.rejection());
        }
        self.saved.invalidate([annotation.saved_annotation_id()]);
        Ok(())
    }

    /// Refetches an annotation by server id.
    pub async fn refresh(&self, server_id: u64) -> Result<Annotation> {
        self.fetch_one(ApiRequest::get(annotation_path(server_id)))
            .await
    }

    /// Moves a question to another state.
    ///
    /// `404` means the question is gone, `403` means its state changed
    /// concurrently: the current state is refetched once instead of retrying.
    pub async fn transition(
        &self,
        question: &Annotation,
        to: QuestionState,
    ) -> Result<TransitionOutcome> {
        let Some(from) = question.question_state() else {
            return Err(AnnotationError::Contract(format!(
                "annotation {} is not a question and cannot transition",
                question.id()
            )));
        };
        let url = mutation_url(question)?;
        let body = json!({
            "from": from,
            "question": { "question_state": to },
        });

        let response = self.transport.send(ApiRequest::patch(url.clone(), body)).await?;
        match response.status {
            _ if response.is_ok() => {
                let data: UserAnnotationData = response.json(&url)?;
                Ok(TransitionOutcome::Transitioned(self.build(&data)))
            }
            404 => Ok(TransitionOutcome::Gone),
            403 => {
                let server_id = question.server_id().unwrap_or_default();
                tracing::warn!(
                    "question {server_id} changed concurrently, refetching its current state"
                );
                match self.refresh(server_id).await {
                    Ok(fresh) => Ok(TransitionOutcome::Refreshed(fresh)),
                    Err(AnnotationError::Rejected { status: 404, .. }) => {
                        Ok(TransitionOutcome::Gone)
                    }
                    Err(e) => Err(e),
                }
            }
            _ => Err(response.rejection()),
        }
    }

    /// Turns an annotation into a reusable saved annotation.
    pub async fn create_saved_annotation(
        &self,
        from: u64,
        title: &str,
        annotation_text: &str,
    ) -> Result<SavedAnnotationData> {
        let path = "/saved_annotations.json";
        let body = NewSavedAnnotation {
            from,
            saved_annotation: SavedAnnotationFields {
                title:           title.to_string(),
                annotation_text: annotation_text.to_string(),
            },
        };
        let body = serde_json::to_value(&body).map_err(|source| AnnotationError::Decode {
            path: path.to_string(),
            source,
        })?;

        let response = self.transport.send(ApiRequest::post(path, body)).await?;
        if !response.is_ok() {
            return Err(response.rejection());
        }
        let saved: SavedAnnotationData = response.json(path)?;
        self.saved.insert(saved.clone());
        Ok(saved)
    }

    /// Reads a saved annotation, from cache when possible.
    pub async fn fetch_saved_annotation(&self, id: u64) -> Result<SavedAnnotationData> {
        if let Some(saved) = self.saved.get(id) {
            return Ok(saved);
        }
        let path = format!("/saved_annotations/{id}.json");
        let response = self.transport.send(ApiRequest::get(path.clone())).await?;
        if !response.is_ok() {
            return Err(response.rejection());
        }
        let saved: SavedAnnotationData = response.json(&path)?;
        self.saved.insert(saved.clone());
        Ok(saved)
    }
}

/// Mutation url of a user annotation or question.
fn mutation_url(annotation: &Annotation) -> Result<String> {
    annotation.url().map(str::to_string).ok_or_else(|| {
        AnnotationError::Contract(format!(
            "annotation {} has no server resource to mutate",
            annotation.id()
        ))
    })
}
