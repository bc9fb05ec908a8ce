use std::{
    fmt::{self, Display},
    sync::OnceLock,
};

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Kind of feedback an annotation carries.
pub enum AnnotationType {
    /// Machine-reported error.
    Error,
    /// Machine-reported warning.
    Warning,
    /// Machine-reported informational message.
    Info,
    /// Comment written by a teacher or author.
    User,
    /// Question asked by a student.
    Question,
}

impl AnnotationType {
    /// All annotation types, in declaration order.
    pub const ALL: [AnnotationType; 5] = [
        AnnotationType::Error,
        AnnotationType::Warning,
        AnnotationType::Info,
        AnnotationType::User,
        AnnotationType::Question,
    ];

    /// Returns the lowercase name used in css classes and payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationType::Error => "error",
            AnnotationType::Warning => "warning",
            AnnotationType::Info => "info",
            AnnotationType::User => "user",
            AnnotationType::Question => "question",
        }
    }

    /// Indicates whether annotations of this type survive "show errors only".
    pub fn is_important(self) -> bool {
        matches!(
            self,
            AnnotationType::Error | AnnotationType::User | AnnotationType::Question
        )
    }

    /// Returns the rendering group this type is mapped to.
    pub fn group(self) -> Group {
        GROUP_MAPPING
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, group)| *group)
            .unwrap_or(Group::Info)
    }

    /// Returns the gutter dot class for this type.
    pub fn dot_class(self) -> String {
        format!("dot-{}", self.as_str())
    }
}

impl Serialize for AnnotationType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AnnotationType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.as_str() {
            "error" => Ok(AnnotationType::Error),
            "warning" => Ok(AnnotationType::Warning),
            "info" => Ok(AnnotationType::Info),
            // newer servers call plain comments "annotation"
            "user" | "annotation" => Ok(AnnotationType::User),
            "question" => Ok(AnnotationType::Question),
            other => Err(de::Error::custom(format!("Unknown annotation type: {other}"))),
        }
    }
}

impl Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Rendering bucket an annotation type is placed in.
pub enum Group {
    /// Errors.
    Error,
    /// Teacher comments and questions.
    Conversation,
    /// Warnings.
    Warning,
    /// Informational messages.
    Info,
}

/// Maps every annotation type onto its group. The order of first appearance of
/// each group in this table is the order groups are rendered in.
pub const GROUP_MAPPING: [(AnnotationType, Group); 5] = [
    (AnnotationType::Error, Group::Error),
    (AnnotationType::User, Group::Conversation),
    (AnnotationType::Question, Group::Conversation),
    (AnnotationType::Warning, Group::Warning),
    (AnnotationType::Info, Group::Info),
];

impl Group {
    /// Returns the groups in rendering order.
    pub fn ordered() -> &'static [Group] {
        static ORDER: OnceLock<Vec<Group>> = OnceLock::new();
        ORDER.get_or_init(|| GROUP_MAPPING.iter().map(|(_, group)| *group).unique().collect())
    }

    /// Returns the lowercase group name.
    pub fn as_str(self) -> &'static str {
        match self {
            Group::Error => "error",
            Group::Conversation => "conversation",
            Group::Warning => "warning",
            Group::Info => "info",
        }
    }

    /// Returns the css class of the group container.
    pub fn class(self) -> String {
        format!("annotation-group-{}", self.as_str())
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle state of a question.
pub enum QuestionState {
    /// Nobody has picked up the question yet.
    Unanswered,
    /// A teacher is working on an answer.
    InProgress,
    /// The question has been answered.
    Answered,
}

impl QuestionState {
    /// Transition targets in the order their buttons are rendered.
    pub const TRANSITION_TARGETS: [QuestionState; 3] = [
        QuestionState::Answered,
        QuestionState::InProgress,
        QuestionState::Unanswered,
    ];

    /// Returns the wire representation of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionState::Unanswered => "unanswered",
            QuestionState::InProgress => "in_progress",
            QuestionState::Answered => "answered",
        }
    }

    /// Icon used on the transition button towards this state.
    pub fn icon(self) -> &'static str {
        match self {
            QuestionState::Answered => "mdi-check",
            QuestionState::InProgress => "mdi-comment-processing-outline",
            QuestionState::Unanswered => "mdi-restart",
        }
    }
}

impl std::str::FromStr for QuestionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unanswered" => Ok(QuestionState::Unanswered),
            "in_progress" => Ok(QuestionState::InProgress),
            "answered" => Ok(QuestionState::Answered),
            other => Err(format!("Unknown question state: {other}")),
        }
    }
}

impl Display for QuestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Key of the per-line annotation index.
pub enum LineKey {
    /// Annotations attached to the whole submission.
    Global,
    /// Annotations attached to a 1-based line.
    Line(usize),
}

impl LineKey {
    /// Builds the key for an optional 1-based line.
    pub fn of(line: Option<usize>) -> Self {
        match line {
            Some(line) => LineKey::Line(line),
            None => LineKey::Global,
        }
    }

    /// Numeric form of the key, with `0` reserved for global annotations.
    pub fn as_number(self) -> usize {
        match self {
            LineKey::Global => 0,
            LineKey::Line(line) => line,
        }
    }
}
