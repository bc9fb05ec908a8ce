//! Terminal overview of the annotations in a listing.

use colored::{ColoredString, Colorize};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use crate::{annotation::Annotation, i18n::Locale, listing::CodeListing, types::AnnotationType};

#[derive(Tabled, Clone, Debug, PartialEq, Eq)]
/// One annotation as shown in the overview table
pub struct AnnotationRow {
    #[tabled(rename = "Line")]
    /// * `line`: 1-based line, or `global`
    line:  String,
    #[tabled(rename = "Type")]
    /// * `kind`: annotation type
    kind:  AnnotationType,
    #[tabled(rename = "By")]
    /// * `meta`: author and time, or the finding title for machine findings
    meta:  String,
    #[tabled(rename = "Text")]
    /// * `text`: raw text
    text:  String,
}

impl AnnotationRow {
    /// Summarizes an annotation.
    pub fn new(annotation: &Annotation, locale: Locale) -> Self {
        let meta = annotation.meta(locale);
        Self {
            line:  annotation
                .line()
                .map_or_else(|| "global".to_string(), |line| line.to_string()),
            kind:  annotation.annotation_type(),
            meta:  if meta.is_empty() { "-".to_string() } else { meta },
            text:  annotation.raw_text().to_string(),
        }
    }

    /// Annotation type.
    pub fn kind(&self) -> AnnotationType {
        self.kind
    }
}

/// Rows of every annotation in a listing, global ones first.
pub fn rows(listing: &CodeListing) -> Vec<AnnotationRow> {
    let locale = listing.views().locale();
    listing
        .index()
        .iter()
        .map(|annotation| AnnotationRow::new(annotation, locale))
        .collect()
}

/// Renders the overview table of a listing.
pub fn overview(listing: &CodeListing) -> String {
    let rows = rows(listing);
    Table::new(&rows)
        .with(Panel::header(format!("Submission {}", listing.submission_id())))
        .with(Panel::footer(format!(
            "{} annotations, {} important",
            listing.count(),
            listing.important_count()
        )))
        .with(Modify::new(Rows::new(1..)).with(Width::wrap(48).keep_words(true)))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(
            Modify::new(Rows::last())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// Colored label of an annotation type.
pub fn type_label(kind: AnnotationType) -> ColoredString {
    match kind {
        AnnotationType::Error => kind.as_str().red().bold(),
        AnnotationType::Warning => kind.as_str().yellow(),
        AnnotationType::Info => kind.as_str().blue(),
        AnnotationType::User => kind.as_str().green(),
        AnnotationType::Question => kind.as_str().magenta(),
    }
}

/// One colored line counting annotations per type.
pub fn type_counts(listing: &CodeListing) -> String {
    AnnotationType::ALL
        .iter()
        .filter_map(|kind| {
            let count = listing
                .index()
                .iter()
                .filter(|a| a.annotation_type() == *kind)
                .count();
            (count > 0).then(|| format!("{} {}", count, type_label(*kind)))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
