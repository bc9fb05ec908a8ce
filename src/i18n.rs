//! Localized strings used in annotation headers, notices and tooltips.

use crate::types::{AnnotationType, QuestionState};

/// Interface language.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    /// English.
    #[default]
    En,
    /// Dutch.
    Nl,
}

impl Locale {
    /// Parses a locale code, falling back to English.
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "nl" | "nl-be" | "nl-nl" => Locale::Nl,
            _ => Locale::En,
        }
    }

    /// Label of an annotation type, capitalized.
    pub fn type_label(self, kind: AnnotationType) -> &'static str {
        match (self, kind) {
            (Locale::En, AnnotationType::Error) => "Error",
            (Locale::En, AnnotationType::Warning) => "Warning",
            (Locale::En, AnnotationType::Info) => "Info",
            (Locale::En, AnnotationType::User) => "Annotation",
            (Locale::En, AnnotationType::Question) => "Question",
            (Locale::Nl, AnnotationType::Error) => "Fout",
            (Locale::Nl, AnnotationType::Warning) => "Waarschuwing",
            (Locale::Nl, AnnotationType::Info) => "Info",
            (Locale::Nl, AnnotationType::User) => "Annotatie",
            (Locale::Nl, AnnotationType::Question) => "Vraag",
        }
    }

    /// Label of a question state.
    pub fn state_label(self, state: QuestionState) -> &'static str {
        match (self, state) {
            (Locale::En, QuestionState::Unanswered) => "unanswered",
            (Locale::En, QuestionState::InProgress) => "in progress",
            (Locale::En, QuestionState::Answered) => "answered",
            (Locale::Nl, QuestionState::Unanswered) => "onbeantwoord",
            (Locale::Nl, QuestionState::InProgress) => "in behandeling",
            (Locale::Nl, QuestionState::Answered) => "beantwoord",
        }
    }

    /// Metadata line of a teacher annotation.
    pub fn user_meta(self, user: &str, time: &str) -> String {
        match self {
            Locale::En => format!("{user} at {time}"),
            Locale::Nl => format!("{user} om {time}"),
        }
    }

    /// Metadata line of a question nobody has touched yet.
    pub fn question_meta(self, user: &str, time: &str, state: QuestionState) -> String {
        let state = self.state_label(state);
        match self {
            Locale::En => format!("{user} asked at {time} ({state})"),
            Locale::Nl => format!("{user} vroeg om {time} ({state})"),
        }
    }

    /// Metadata line of a question whose state was changed by someone.
    pub fn question_meta_updated(
        self,
        user: &str,
        time: &str,
        state: QuestionState,
        updater: &str,
    ) -> String {
        let state = self.state_label(state);
        match self {
            Locale::En => format!("{user} asked at {time} ({state} by {updater})"),
            Locale::Nl => format!("{user} vroeg om {time} ({state} door {updater})"),
        }
    }

    /// Tooltip of the eye-off icon.
    pub fn not_released(self) -> &'static str {
        match self {
            Locale::En => "This annotation is not visible to the student yet.",
            Locale::Nl => "Deze annotatie is nog niet zichtbaar voor de student.",
        }
    }

    /// Title of the edit button.
    pub fn edit_title(self, kind: AnnotationType) -> &'static str {
        match (self, kind) {
            (Locale::En, AnnotationType::Question) => "Edit question",
            (Locale::En, _) => "Edit annotation",
            (Locale::Nl, AnnotationType::Question) => "Vraag bewerken",
            (Locale::Nl, _) => "Annotatie bewerken",
        }
    }

    /// Title of the transition button towards `to`.
    pub fn transition_title(self, to: QuestionState) -> &'static str {
        match (self, to) {
            (Locale::En, QuestionState::Answered) => "Mark as answered",
            (Locale::En, QuestionState::InProgress) => "Mark as in progress",
            (Locale::En, QuestionState::Unanswered) => "Mark as unanswered",
            (Locale::Nl, QuestionState::Answered) => "Markeer als beantwoord",
            (Locale::Nl, QuestionState::InProgress) => "Markeer als in behandeling",
            (Locale::Nl, QuestionState::Unanswered) => "Markeer als onbeantwoord",
        }
    }

    /// Notice shown on a question when the student submitted newer code.
    pub fn newer_submission(self) -> &'static str {
        match self {
            Locale::En => "A newer submission exists.",
            Locale::Nl => "Er bestaat een nieuwere oplossing.",
        }
    }

    /// Tooltip of the link to external documentation of a linter message.
    pub fn external_url(self) -> &'static str {
        match self {
            Locale::En => "More information about this message",
            Locale::Nl => "Meer informatie over dit bericht",
        }
    }

    /// Toast shown when a question disappeared during a transition.
    pub fn question_deleted(self) -> &'static str {
        match self {
            Locale::En => "This question has been deleted in the meantime.",
            Locale::Nl => "Deze vraag werd ondertussen verwijderd.",
        }
    }

    /// Toast shown when someone else changed the question state first.
    pub fn question_conflict(self) -> &'static str {
        match self {
            Locale::En => "Someone else changed the state of this question in the meantime.",
            Locale::Nl => "Iemand anders heeft de status van deze vraag ondertussen aangepast.",
        }
    }

    /// Tooltip of a gutter dot hiding `count` annotations.
    pub fn hidden(self, count: usize) -> String {
        match (self, count) {
            (Locale::En, 1) => "1 annotation hidden".to_string(),
            (Locale::En, n) => format!("{n} annotations hidden"),
            (Locale::Nl, 1) => "1 annotatie verborgen".to_string(),
            (Locale::Nl, n) => format!("{n} annotaties verborgen"),
        }
    }

    /// Title of the "save as reusable annotation" control.
    pub fn save_annotation(self) -> &'static str {
        match self {
            Locale::En => "Save as reusable annotation",
            Locale::Nl => "Opslaan als herbruikbare annotatie",
        }
    }

    /// Alert shown when saving a reusable annotation failed.
    pub fn save_failed(self, errors: &[String]) -> String {
        let heading = match (self, errors.len()) {
            (Locale::En, 1) => "Saving the annotation failed because of 1 error:".to_string(),
            (Locale::En, n) => format!("Saving the annotation failed because of {n} errors:"),
            (Locale::Nl, 1) => "Het opslaan van de annotatie mislukte door 1 fout:".to_string(),
            (Locale::Nl, n) => format!("Het opslaan van de annotatie mislukte door {n} fouten:"),
        };
        format!("{heading}\n\n{}", errors.join("\n"))
    }

    /// Title of the indicator shown on annotations linked to a saved annotation.
    pub fn saved(self) -> &'static str {
        match self {
            Locale::En => "Linked to a saved annotation",
            Locale::Nl => "Gekoppeld aan een opgeslagen annotatie",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_tooltip_pluralizes() {
        assert_eq!(Locale::En.hidden(1), "1 annotation hidden");
        assert_eq!(Locale::En.hidden(3), "3 annotations hidden");
        assert_eq!(Locale::Nl.hidden(2), "2 annotaties verborgen");
    }

    #[test]
    fn unknown_locales_fall_back_to_english() {
        assert_eq!(Locale::parse("fr"), Locale::En);
        assert_eq!(Locale::parse("NL"), Locale::Nl);
    }
}
