//! Wire shapes exchanged with the Dodona backend.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::types::{AnnotationType, QuestionState};

/// Author reference embedded in annotation payloads.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserRef {
    /// Display name of the user.
    pub name: String,
}

/// Per-target permissions for question transitions.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionPermissions {
    /// May move the question back to `unanswered`.
    #[serde(default)]
    pub unanswered:  bool,
    /// May move the question to `in_progress`.
    #[serde(default)]
    pub in_progress: bool,
    /// May move the question to `answered`.
    #[serde(default)]
    pub answered:    bool,
}

impl TransitionPermissions {
    /// Whether the server allows a transition towards `to`.
    pub fn allows(&self, to: QuestionState) -> bool {
        match to {
            QuestionState::Unanswered => self.unanswered,
            QuestionState::InProgress => self.in_progress,
            QuestionState::Answered => self.answered,
        }
    }
}

/// Server-computed permissions of the current user on an annotation.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PermissionData {
    /// May edit the annotation text.
    #[serde(default)]
    pub update:     bool,
    /// May delete the annotation.
    #[serde(default)]
    pub destroy:    bool,
    /// May turn the annotation into a reusable saved annotation.
    #[serde(default)]
    pub save:       bool,
    /// Question transitions, absent for plain annotations.
    #[serde(default)]
    pub transition: Option<TransitionPermissions>,
}

/// Annotations without a `released` flag are visible.
fn default_released() -> bool {
    true
}

/// Annotation payload as returned by `/submissions/{id}/annotations.json` and
/// `/annotations/{id}`.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct UserAnnotationData {
    /// Server id.
    pub id:                   u64,
    /// Raw markdown source.
    #[serde(default)]
    pub annotation_text:      String,
    /// Sanitized html rendering of the markdown.
    #[serde(default)]
    pub rendered_markdown:    String,
    /// Creation timestamp as sent by the server.
    #[serde(default)]
    pub created_at:           String,
    /// 0-based line, absent for global annotations.
    #[serde(default)]
    pub line_nr:              Option<usize>,
    /// Permissions of the current user.
    #[serde(default)]
    pub permission:           PermissionData,
    /// Whether students can see the annotation.
    #[serde(default = "default_released")]
    pub released:             bool,
    /// Evaluation the annotation belongs to.
    #[serde(default)]
    pub evaluation_id:        Option<u64>,
    /// Saved annotation this annotation was created from.
    #[serde(default)]
    pub saved_annotation_id:  Option<u64>,
    /// Resource url used for mutations.
    pub url:                  String,
    /// Author of the annotation.
    #[serde(default)]
    pub user:                 UserRef,
    /// Last user that changed a question's state.
    #[serde(default)]
    pub last_updated_by:      Option<UserRef>,
    /// Raw type discriminator (`annotation`, `user` or `question`).
    #[serde(rename = "type", default)]
    pub kind:                 Option<String>,
    /// Lifecycle state, questions only.
    #[serde(default)]
    pub question_state:       Option<QuestionState>,
    /// Set when the asker has submitted a newer version of the code.
    #[serde(default)]
    pub newer_submission_url: Option<String>,
}

impl UserAnnotationData {
    /// Whether the payload describes a question.
    pub fn is_question(&self) -> bool {
        self.kind.as_deref() == Some("question")
    }
}

/// Static-analysis finding attached to a submission.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MachineAnnotationData {
    /// One of `error`, `warning` or `info`.
    #[serde(rename = "type")]
    pub kind:         AnnotationType,
    /// Message as reported by the linter.
    pub text:         String,
    /// 0-based row the finding refers to.
    pub row:          usize,
    /// Link to documentation about the finding.
    #[serde(default, alias = "externalUrl")]
    pub external_url: Option<String>,
}

/// Body of create and update requests.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct UserAnnotationFormData {
    /// Markdown text typed by the user.
    #[builder(setter(into))]
    pub annotation_text:     String,
    /// 0-based line, `null` for global annotations.
    #[builder(default)]
    pub line_nr:             Option<usize>,
    /// Evaluation context of the listing.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_id:       Option<u64>,
    /// Saved annotation the text was taken from.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_annotation_id: Option<u64>,
}

/// Reusable annotation template.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SavedAnnotationData {
    /// Server id.
    pub id:                u64,
    /// Short title shown in pickers.
    pub title:             String,
    /// Markdown text of the template.
    pub annotation_text:   String,
    /// Number of annotations created from this template.
    #[serde(default)]
    pub annotations_count: u64,
}

/// Payload of `POST /saved_annotations.json`.
#[derive(Serialize, Clone, Debug)]
pub struct NewSavedAnnotation {
    /// Annotation the template is created from.
    pub from:             u64,
    /// Template fields.
    pub saved_annotation: SavedAnnotationFields,
}

/// Fields of a new saved annotation.
#[derive(Serialize, Clone, Debug)]
pub struct SavedAnnotationFields {
    /// Template title.
    pub title:           String,
    /// Template text.
    pub annotation_text: String,
}

/// Flattens a Rails style error body into human readable messages.
///
/// Accepts `{"field": ["msg", ...]}`, `["msg", ...]` and `{"errors": ...}`.
pub fn validation_messages(body: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Vec::new();
    };
    collect_messages(None, &value)
}

/// Recursive helper for [`validation_messages`].
fn collect_messages(field: Option<&str>, value: &serde_json::Value) -> Vec<String> {
    use serde_json::Value;

    match value {
        Value::String(msg) => match field {
            Some(field) if field != "errors" && field != "base" => vec![format!("{field} {msg}")],
            _ => vec![msg.clone()],
        },
        Value::Array(items) => items
            .iter()
            .flat_map(|item| collect_messages(field, item))
            .collect(),
        Value::Object(map) => map
            .iter()
            .flat_map(|(key, item)| collect_messages(Some(key.as_str()), item))
            .collect(),
        _ => Vec::new(),
    }
}
