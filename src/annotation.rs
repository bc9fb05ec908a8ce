#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fmt::{self, Display},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use itertools::Itertools;

use crate::{
    i18n::Locale,
    payload::{MachineAnnotationData, PermissionData, TransitionPermissions, UserAnnotationData},
    render::escape_html,
    types::{AnnotationType, LineKey, QuestionState},
};

/// Process-local identity of an annotation. Used for view addressing and
/// index membership only, never sent to the server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(u64);

impl AnnotationId {
    /// Returns the raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of fresh annotation identities.
pub trait IdGenerator: Send + Sync {
    /// Returns an identity that was never handed out before by this generator.
    fn next_id(&self) -> AnnotationId;
}

/// Monotonic counter, the default identity source.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shared counter starting at zero.
    pub fn shared() -> SharedIds {
        Arc::new(Self::new())
    }

    /// Restarts the counter. Only safe when no annotation of a previous run is
    /// still alive.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl IdGenerator for Counter {
    fn next_id(&self) -> AnnotationId {
        AnnotationId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity source shared between a listing and its client.
pub type SharedIds = Arc<dyn IdGenerator>;

/// Details of a static-analysis finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineDetails {
    /// `error`, `warning` or `info`.
    pub kind:         AnnotationType,
    /// Link to documentation about the finding.
    pub external_url: Option<String>,
}

/// Details shared by teacher comments and questions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDetails {
    /// Server id.
    pub server_id:           u64,
    /// Resource url used for mutations.
    pub url:                 String,
    /// Permissions of the current user.
    pub permission:          PermissionData,
    /// Author name.
    pub user:                String,
    /// Creation timestamp as sent by the server.
    pub created_at:          String,
    /// Whether students can see the annotation.
    pub released:            bool,
    /// Evaluation context.
    pub evaluation_id:       Option<u64>,
    /// Reusable template this annotation is linked to.
    pub saved_annotation_id: Option<u64>,
}

/// Details only questions carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionDetails {
    /// Current lifecycle state.
    pub state:                QuestionState,
    /// Per-target transition permissions.
    pub transition:           TransitionPermissions,
    /// Newer submission of the asker, if any.
    pub newer_submission_url: Option<String>,
    /// Last user that changed the state.
    pub last_updated_by:      Option<String>,
}

/// Variant-specific part of an annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Linter output.
    Machine(MachineDetails),
    /// Teacher comment.
    User(UserDetails),
    /// Student question.
    Question(UserDetails, QuestionDetails),
}

/// How a notice link is decorated in the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoticeStyle {
    /// An info icon with the given tooltip.
    Icon(String),
    /// Literal notice text.
    Text(String),
}

/// Link rendered in the header when an annotation has something to point out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// Target of the link.
    pub url:   String,
    /// Decoration of the link.
    pub style: NoticeStyle,
}

/// One piece of feedback attached to a submission line or to the submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    /// Process-local identity.
    id:       AnnotationId,
    /// 1-based line, `None` for global annotations.
    line:     Option<usize>,
    /// Sanitized html body.
    text:     String,
    /// Source text as typed or reported.
    raw_text: String,
    /// Variant data.
    kind:     AnnotationKind,
}

impl Annotation {
    /// Builds an annotation from a linter finding. Separator lines made of
    /// dashes are dropped and the remaining text is html-escaped.
    pub fn machine(data: &MachineAnnotationData, ids: &dyn IdGenerator) -> Self {
        let raw_text = data
            .text
            .split('\n')
            .filter(|line| !is_separator(line))
            .join("\n");

        Self {
            id: ids.next_id(),
            line: Some(data.row.saturating_add(1)),
            text: escape_html(&raw_text),
            raw_text,
            kind: AnnotationKind::Machine(MachineDetails {
                kind:         data.kind,
                external_url: data.external_url.clone(),
            }),
        }
    }

    /// Builds the right variant for a server payload: questions become
    /// question annotations, everything else a plain user annotation.
    pub fn from_user_data(data: &UserAnnotationData, ids: &dyn IdGenerator) -> Self {
        let details = UserDetails {
            server_id:           data.id,
            url:                 data.url.clone(),
            permission:          data.permission,
            user:                data.user.name.clone(),
            created_at:          data.created_at.clone(),
            released:            data.released,
            evaluation_id:       data.evaluation_id,
            saved_annotation_id: data.saved_annotation_id,
        };

        let kind = if data.is_question() {
            AnnotationKind::Question(details, QuestionDetails {
                state:                data.question_state.unwrap_or(QuestionState::Unanswered),
                transition:           data.permission.transition.unwrap_or_default(),
                newer_submission_url: data.newer_submission_url.clone(),
                last_updated_by:      data.last_updated_by.as_ref().map(|u| u.name.clone()),
            })
        } else {
            AnnotationKind::User(details)
        };

        Self {
            id: ids.next_id(),
            line: data.line_nr.map(|line| line.saturating_add(1)),
            text: data.rendered_markdown.clone(),
            raw_text: data.annotation_text.clone(),
            kind,
        }
    }

    /// Process-local identity.
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    /// 1-based line, `None` for global annotations.
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Index key of this annotation.
    pub fn key(&self) -> LineKey {
        LineKey::of(self.line)
    }

    /// Rendered html body.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source text, used to prefill edit forms.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Variant data.
    pub fn kind(&self) -> &AnnotationKind {
        &self.kind
    }

    /// Type of the annotation.
    pub fn annotation_type(&self) -> AnnotationType {
        match &self.kind {
            AnnotationKind::Machine(details) => details.kind,
            AnnotationKind::User(_) => AnnotationType::User,
            AnnotationKind::Question(..) => AnnotationType::Question,
        }
    }

    /// Attached to the submission rather than a line.
    pub fn global(&self) -> bool {
        self.line.is_none()
    }

    /// Survives the "show errors only" filter.
    pub fn important(&self) -> bool {
        self.annotation_type().is_important()
    }

    /// Visible to students.
    pub fn visible(&self) -> bool {
        self.user_details().is_none_or(|details| details.released)
    }

    /// Edit controls are rendered.
    pub fn modifiable(&self) -> bool {
        self.user_details()
            .is_some_and(|details| details.permission.update)
    }

    /// May be deleted by the current user.
    pub fn removable(&self) -> bool {
        self.user_details()
            .is_some_and(|details| details.permission.destroy)
    }

    /// May be saved as a reusable annotation.
    pub fn savable(&self) -> bool {
        matches!(&self.kind, AnnotationKind::User(details) if details.permission.save)
    }

    /// Whether the current user may move this question to `to`.
    pub fn transitionable(&self, to: QuestionState) -> bool {
        match &self.kind {
            AnnotationKind::Question(_, question) => question.transition.allows(to),
            _ => false,
        }
    }

    /// Notice to show in the header, if any.
    pub fn notice(&self, locale: Locale) -> Option<Notice> {
        match &self.kind {
            AnnotationKind::Machine(details) => details.external_url.as_ref().map(|url| Notice {
                url:   url.clone(),
                style: NoticeStyle::Icon(locale.external_url().to_string()),
            }),
            AnnotationKind::Question(_, question) => {
                question.newer_submission_url.as_ref().map(|url| Notice {
                    url:   url.clone(),
                    style: NoticeStyle::Text(locale.newer_submission().to_string()),
                })
            }
            AnnotationKind::User(_) => None,
        }
    }

    /// Whether a notice link is rendered.
    pub fn has_notice(&self) -> bool {
        match &self.kind {
            AnnotationKind::Machine(details) => details.external_url.is_some(),
            AnnotationKind::Question(_, question) => question.newer_submission_url.is_some(),
            AnnotationKind::User(_) => false,
        }
    }

    /// Localized metadata line.
    pub fn meta(&self, locale: Locale) -> String {
        match &self.kind {
            AnnotationKind::Machine(_) => self.title(locale),
            AnnotationKind::User(details) => locale.user_meta(&details.user, &details.created_at),
            AnnotationKind::Question(details, question) => {
                match (question.state, question.last_updated_by.as_deref()) {
                    (QuestionState::Unanswered, _) | (_, None) => {
                        locale.question_meta(&details.user, &details.created_at, question.state)
                    }
                    (state, Some(updater)) => locale.question_meta_updated(
                        &details.user,
                        &details.created_at,
                        state,
                        updater,
                    ),
                }
            }
        }
    }

    /// Localized title, used as tooltip of the whole annotation.
    pub fn title(&self, locale: Locale) -> String {
        locale.type_label(self.annotation_type()).to_string()
    }

    /// Tooltip of the edit button.
    pub fn edit_title(&self, locale: Locale) -> &'static str {
        locale.edit_title(self.annotation_type())
    }

    /// Extra css class on the root element.
    pub fn extra_class(&self) -> Option<&'static str> {
        match &self.kind {
            AnnotationKind::Machine(_) => Some("machine-annotation"),
            AnnotationKind::User(_) => Some("user-annotation"),
            AnnotationKind::Question(..) => Some("question-annotation"),
        }
    }

    /// Shared user/question details.
    pub fn user_details(&self) -> Option<&UserDetails> {
        match &self.kind {
            AnnotationKind::Machine(_) => None,
            AnnotationKind::User(details) | AnnotationKind::Question(details, _) => Some(details),
        }
    }

    /// Question details.
    pub fn question_details(&self) -> Option<&QuestionDetails> {
        match &self.kind {
            AnnotationKind::Question(_, question) => Some(question),
            _ => None,
        }
    }

    /// Server id of user annotations and questions.
    pub fn server_id(&self) -> Option<u64> {
        self.user_details().map(|details| details.server_id)
    }

    /// Mutation url of user annotations and questions.
    pub fn url(&self) -> Option<&str> {
        self.user_details().map(|details| details.url.as_str())
    }

    /// Current question state.
    pub fn question_state(&self) -> Option<QuestionState> {
        self.question_details().map(|question| question.state)
    }

    /// Saved annotation this annotation is linked to.
    pub fn saved_annotation_id(&self) -> Option<u64> {
        self.user_details()
            .and_then(|details| details.saved_annotation_id)
    }

    /// Links the annotation to a saved annotation.
    pub fn set_saved_annotation_id(&mut self, saved: Option<u64>) {
        if let AnnotationKind::User(details) | AnnotationKind::Question(details, _) = &mut self.kind
        {
            details.saved_annotation_id = saved;
        }
    }
}

/// Whether a linter output line only separates sections.
fn is_separator(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '-')
}
