
use annotation_support::*;
use dodona_annotations::{
    AnnotationType,
    i18n::Locale,
    report::{self, AnnotationRow},
};

#[test]
fn overview_lists_every_annotation() {
    let ids = ids();
    let mut listing = listing_with(4, ids.clone());
    listing.add_annotation(machine("error", 2, "missing semicolon", &ids));
    listing.add_annotation(user(1, None, &ids));
    listing.add_annotation(question(2, Some(3), "unanswered", &ids));

    let table = report::overview(&listing);

    assert!(table.contains("Submission 42"));
    assert!(table.contains("3 annotations, 3 important"));
    assert!(table.contains("missing semicolon"));
    assert!(table.contains("global"));
    assert!(table.contains("Why does this fail?"));
}

#[test]
fn rows_describe_the_author() {
    let ids = ids();
    let finding = machine("info", 1, "consider a constant", &ids);
    let note = user(1, Some(1), &ids);

    let finding_row = AnnotationRow::new(&finding, Locale::En);
    let note_row = AnnotationRow::new(&note, Locale::En);

    assert_eq!(finding_row.kind(), AnnotationType::Info);
    assert_eq!(note_row.kind(), AnnotationType::User);
    assert_ne!(finding_row, note_row);
}

#[test]
fn counts_skip_absent_types() {
    colored::control::set_override(false);
    let ids = ids();
    let mut listing = listing_with(4, ids.clone());
    listing.add_annotation(machine("warning", 1, "unused import", &ids));
    listing.add_annotation(machine("warning", 2, "unused variable", &ids));
    listing.add_annotation(user(1, Some(3), &ids));

    assert_eq!(report::type_counts(&listing), "2 warning, 1 user");
}
