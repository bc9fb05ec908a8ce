
use annotation_support::*;
use dodona_annotations::{
    Annotation, AnnotationError, CodeListing, CreateMode, ListingOptions, ScriptedTransport,
    SharedIds,
    annotation::AnnotationKind,
    form::{AnnotationForm, FormEvent, FormOutcome, SubmitDetail},
    i18n::Locale,
    notice::RecordingNotifier,
    payload::{SavedAnnotationData, UserAnnotationFormData},
    render::HeaderAction,
    transport::Method,
};
use serde_json::json;

const COLLECTION: &str = "/submissions/42/annotations.json";

fn is_question(kind: &AnnotationKind) -> bool {
    matches!(kind, AnnotationKind::Question(..))
}

#[tokio::test]
async fn listing_dispatches_on_the_type_field_in_server_order() {
    let transport = ScriptedTransport::new();
    let mut plain = user_json(3, Some(4), "Indent this");
    plain["type"] = json!("user");
    let body = json!([
        question_json(1, Some(0), "unanswered"),
        user_json(2, None, "Well done"),
        plain,
        question_json(4, Some(2), "answered"),
    ]);
    transport.respond(Method::Get, COLLECTION, 200, body.to_string());
    let ids = ids();
    let client = client(transport, ids.clone());

    let annotations = client
        .get_all_user_annotations(SUBMISSION)
        .await
        .expect("annotations");

    let server_ids: Vec<_> = annotations.iter().filter_map(|a| a.server_id()).collect();
    assert_eq!(server_ids, vec![1, 2, 3, 4]);
    let questions: Vec<_> = annotations.iter().map(|a| is_question(a.kind())).collect();
    assert_eq!(questions, vec![true, false, false, true]);
    assert_eq!(annotations[1].line(), None);
    assert_eq!(annotations[2].line(), Some(5));
}

#[tokio::test]
async fn loading_fills_the_listing() {
    let transport = ScriptedTransport::new();
    let body = json!([
        user_json(1, Some(0), "First"),
        question_json(2, Some(0), "unanswered"),
        user_json(3, None, "Overall fine"),
    ]);
    transport.respond(Method::Get, COLLECTION, 200, body.to_string());
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(3, ids);

    let loaded = listing
        .load_user_annotations(&client)
        .await
        .expect("load");

    assert_eq!(loaded, 3);
    assert_eq!(listing.count(), 3);
    let first_line: Vec<_> = listing
        .annotations_for_line(Some(1))
        .iter()
        .filter_map(|a| a.server_id())
        .collect();
    assert_eq!(first_line, vec![1, 2]);
    assert!(listing.global_panel().has_annotations());
    assert_consistent(&listing);
}

#[tokio::test]
async fn failed_listing_is_an_error() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::Get, COLLECTION, 500, "");
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(3, ids);

    let err = listing
        .load_user_annotations(&client)
        .await
        .expect_err("500 propagates");
    assert_eq!(err.status(), Some(500));
    assert_eq!(listing.count(), 0);
}

#[tokio::test]
async fn create_wraps_the_form_in_the_mode_key() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Post,
        COLLECTION,
        201,
        question_json(11, Some(3), "unanswered").to_string(),
    );
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(6, ids);
    let notifier = RecordingNotifier::new();

    let mut form = AnnotationForm::create(Some(4), CreateMode::Question);
    let outcome = form
        .handle(
            FormEvent::Submit(SubmitDetail::builder().text("Why does this fail?").build()),
            &mut listing,
            &client,
            &notifier,
        )
        .await
        .expect("create");

    let FormOutcome::Created(id) = outcome else {
        panic!("expected a creation, got {outcome:?}");
    };
    assert_eq!(listing.annotation(id).and_then(|a| a.line()), Some(4));
    assert!(!form.state().errored);
    assert!(form.state().enabled);

    let request = &client.transport().requests()[0];
    assert_eq!(
        request.body,
        Some(json!({ "question": { "annotation_text": "Why does this fail?", "line_nr": 3 } }))
    );
    assert_consistent(&listing);
}

#[tokio::test]
async fn create_sends_the_evaluation_context() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Post,
        COLLECTION,
        201,
        user_json(12, None, "Overall fine").to_string(),
    );
    let ids = ids();
    let client = client(transport, ids.clone());
    let options = ListingOptions::builder().evaluation_id(Some(9)).build();
    let mut listing = CodeListing::new(SUBMISSION, code(2), options, ids);

    let mut form = AnnotationForm::create(None, CreateMode::Annotation);
    form.handle(
        FormEvent::Submit(
            SubmitDetail::builder()
                .text("Overall fine")
                .saved_annotation_id(Some(5))
                .build(),
        ),
        &mut listing,
        &client,
        &RecordingNotifier::new(),
    )
    .await
    .expect("create");

    let request = &client.transport().requests()[0];
    assert_eq!(
        request.body,
        Some(json!({
            "annotation": {
                "annotation_text": "Overall fine",
                "line_nr": null,
                "evaluation_id": 9,
                "saved_annotation_id": 5,
            }
        }))
    );
    assert!(listing.global_panel().has_annotations());
}

#[tokio::test]
async fn rejected_create_keeps_the_form_filled() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Post,
        COLLECTION,
        422,
        r#"{"annotation_text": ["is too long"]}"#,
    );
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(3, ids);

    let mut form = AnnotationForm::create(Some(1), CreateMode::Annotation);
    let err = form
        .handle(
            FormEvent::Submit(SubmitDetail::builder().text("A very long remark").build()),
            &mut listing,
            &client,
            &RecordingNotifier::new(),
        )
        .await
        .expect_err("422 is an error");

    assert_eq!(err.status(), Some(422));
    assert_eq!(err.validation_messages(), ["annotation_text is too long"]);
    assert!(form.state().errored);
    assert!(form.state().enabled);
    assert_eq!(form.state().text, "A very long remark");
    assert_eq!(listing.count(), 0);
}

#[tokio::test]
async fn saving_links_the_new_annotation() {
    let transport = ScriptedTransport::new();
    transport
        .respond(
            Method::Post,
            COLLECTION,
            201,
            user_json(12, Some(0), "Use a loop").to_string(),
        )
        .respond(
            Method::Post,
            "/saved_annotations.json",
            201,
            json!({
                "id": 5,
                "title": "Loops",
                "annotation_text": "Use a loop",
                "annotations_count": 1
            })
            .to_string(),
        );
    let ids = ids();
    let client = client(transport, ids.clone());
    let options = ListingOptions::builder().beta(true).build();
    let mut listing = CodeListing::new(SUBMISSION, code(2), options, ids);
    let notifier = RecordingNotifier::new();

    let mut form = AnnotationForm::create(Some(1), CreateMode::Annotation);
    let detail = SubmitDetail::builder()
        .text("Use a loop")
        .saved_annotation_title("Loops")
        .save_annotation(true)
        .build();
    let outcome = form
        .handle(FormEvent::Submit(detail), &mut listing, &client, &notifier)
        .await
        .expect("create");

    let FormOutcome::Created(id) = outcome else {
        panic!("expected a creation, got {outcome:?}");
    };
    assert_eq!(
        listing.annotation(id).and_then(|a| a.saved_annotation_id()),
        Some(5)
    );
    let indicator = listing
        .views()
        .get(id)
        .and_then(|view| view.find_by_class("saved-annotation-indicator"))
        .expect("beta listings render the indicator");
    assert!(!indicator.has_class("hide"));
    assert_eq!(indicator.attr("data-saved-annotation-id"), Some("5"));

    let requests = client.transport().requests();
    assert_eq!(
        requests[1].body,
        Some(json!({
            "from": 12,
            "saved_annotation": { "title": "Loops", "annotation_text": "Use a loop" }
        }))
    );
    assert!(client.saved_cache().get(5).is_some());
    assert!(notifier.alerts().is_empty());
}

#[tokio::test]
async fn failed_save_alerts_without_rolling_back() {
    let transport = ScriptedTransport::new();
    transport
        .respond(
            Method::Post,
            COLLECTION,
            201,
            user_json(12, Some(0), "Use a loop").to_string(),
        )
        .respond(
            Method::Post,
            "/saved_annotations.json",
            422,
            r#"{"title": ["has already been taken"]}"#,
        );
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(2, ids);
    let notifier = RecordingNotifier::new();

    let mut form = AnnotationForm::create(Some(1), CreateMode::Annotation);
    let detail = SubmitDetail::builder()
        .text("Use a loop")
        .save_annotation(true)
        .build();
    let outcome = form
        .handle(FormEvent::Submit(detail), &mut listing, &client, &notifier)
        .await
        .expect("the annotation itself was created");

    assert!(matches!(outcome, FormOutcome::Created(_)));
    assert_eq!(listing.count(), 1);
    assert!(!form.state().errored);
    assert_eq!(
        notifier.alerts(),
        vec![Locale::En.save_failed(&["title has already been taken".to_string()])]
    );
}

#[tokio::test]
async fn editing_swaps_the_annotation() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Patch,
        "/annotations/1",
        200,
        user_json(1, Some(1), "Edited").to_string(),
    );
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(3, ids.clone());
    let original = listing.add_annotation(user(1, Some(2), &ids));

    let mut form = AnnotationForm::edit(&mut listing, original).expect("modifiable");
    assert_eq!(form.state().text, "Nice");
    assert!(listing.is_editing(original));

    let outcome = form
        .handle(
            FormEvent::Submit(SubmitDetail::builder().text("Edited").build()),
            &mut listing,
            &client,
            &RecordingNotifier::new(),
        )
        .await
        .expect("update");

    let FormOutcome::Updated(updated) = outcome else {
        panic!("expected an update, got {outcome:?}");
    };
    assert!(listing.annotation(original).is_none());
    assert_eq!(listing.annotation(updated).map(|a| a.raw_text()), Some("Edited"));
    assert!(!listing.is_editing(original));
    assert!(!listing.is_editing(updated));

    let request = &client.transport().requests()[0];
    assert_eq!(
        request.body,
        Some(json!({ "annotation": { "annotation_text": "Edited", "line_nr": 1 } }))
    );
    assert_consistent(&listing);
}

#[tokio::test]
async fn questions_are_updated_under_their_own_key() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Patch,
        "/annotations/7",
        200,
        question_json(7, Some(0), "unanswered").to_string(),
    );
    let ids = ids();
    let client = client(transport, ids.clone());
    let asked = question(7, Some(1), "unanswered", &ids);
    let form = UserAnnotationFormData::builder()
        .annotation_text("Why does this still fail?")
        .line_nr(Some(0))
        .build();

    client.update(&asked, &form).await.expect("update");

    let body = client.transport().requests()[0].body.clone().expect("body");
    assert!(body.get("question").is_some());
    assert!(body.get("annotation").is_none());
}

#[tokio::test]
async fn changing_the_saved_link_invalidates_the_cache() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Patch,
        "/annotations/1",
        200,
        user_json(1, Some(0), "From template").to_string(),
    );
    let ids = ids();
    let client = client(transport, ids.clone());
    client.saved_cache().insert(SavedAnnotationData {
        id:                3,
        title:             "Template".to_string(),
        annotation_text:   "From template".to_string(),
        annotations_count: 4,
    });
    let note = user(1, Some(1), &ids);
    let form = UserAnnotationFormData::builder()
        .annotation_text("From template")
        .line_nr(Some(0))
        .saved_annotation_id(Some(3))
        .build();

    client.update(&note, &form).await.expect("update");

    assert!(client.saved_cache().get(3).is_none());
}

#[tokio::test]
async fn rejected_edit_keeps_the_original() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::Patch, "/annotations/1", 403, "");
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(3, ids.clone());
    let original = listing.add_annotation(user(1, Some(2), &ids));

    let mut form = AnnotationForm::edit(&mut listing, original).expect("modifiable");
    form.handle(
        FormEvent::Submit(SubmitDetail::builder().text("Edited").build()),
        &mut listing,
        &client,
        &RecordingNotifier::new(),
    )
    .await
    .expect_err("403 is an error");

    assert!(form.state().errored);
    assert_eq!(form.state().text, "Edited");
    assert_eq!(listing.annotation(original).map(|a| a.raw_text()), Some("Nice"));
    assert!(listing.is_editing(original));
}

#[tokio::test]
async fn deleting_drops_the_annotation() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::Delete, "/annotations/1", 204, "");
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(3, ids.clone());
    let original = listing.add_annotation(user(1, Some(2), &ids));

    let mut form = AnnotationForm::edit(&mut listing, original).expect("modifiable");
    let outcome = form
        .handle(FormEvent::Delete, &mut listing, &client, &RecordingNotifier::new())
        .await
        .expect("delete");

    assert_eq!(outcome, FormOutcome::Deleted);
    assert_eq!(listing.count(), 0);
    assert!(listing.views().get(original).is_none());
    assert_consistent(&listing);
}

#[tokio::test]
async fn failed_delete_keeps_the_annotation() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::Delete, "/annotations/1", 500, "");
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = listing_with(3, ids.clone());
    let original = listing.add_annotation(user(1, Some(2), &ids));

    let mut form = AnnotationForm::edit(&mut listing, original).expect("modifiable");
    form.handle(FormEvent::Delete, &mut listing, &client, &RecordingNotifier::new())
        .await
        .expect_err("500 is an error");

    assert!(form.state().errored);
    assert!(form.state().enabled);
    assert_eq!(listing.count(), 1);
}

#[tokio::test]
async fn cancel_restores_the_edit_button() {
    let ids = ids();
    let client = client(ScriptedTransport::new(), ids.clone());
    let mut listing = listing_with(3, ids.clone());
    let original = listing.add_annotation(user(1, Some(2), &ids));

    let mut form = AnnotationForm::edit(&mut listing, original).expect("modifiable");
    let button_hidden = |listing: &CodeListing| {
        listing
            .views()
            .get(original)
            .and_then(|view| view.find_by_class("annotation-edit"))
            .map(|button| button.has_class("hide"))
    };
    assert_eq!(button_hidden(&listing), Some(true));

    let outcome = form
        .handle(FormEvent::Cancel, &mut listing, &client, &RecordingNotifier::new())
        .await
        .expect("cancel");

    assert_eq!(outcome, FormOutcome::Cancelled);
    assert_eq!(button_hidden(&listing), Some(false));
    assert!(!listing.is_editing(original));
    assert!(client.transport().requests().is_empty());
}

#[tokio::test]
async fn unsaved_forms_cannot_delete() {
    let ids = ids();
    let client = client(ScriptedTransport::new(), ids.clone());
    let mut listing = listing_with(3, ids);

    let mut form = AnnotationForm::create(Some(1), CreateMode::Annotation);
    let err = form
        .handle(FormEvent::Delete, &mut listing, &client, &RecordingNotifier::new())
        .await
        .expect_err("nothing to delete");

    assert!(matches!(err, AnnotationError::Contract(_)));
    assert!(client.transport().requests().is_empty());
}

#[test]
fn machine_annotations_cannot_be_edited() {
    let ids = ids();
    let mut listing = listing_with(3, ids.clone());
    let finding = listing.add_annotation(machine("warning", 2, "unused variable", &ids));

    assert!(AnnotationForm::edit(&mut listing, finding).is_none());
    assert!(!listing.is_editing(finding));
}

#[tokio::test]
async fn saved_annotations_are_fetched_once() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Get,
        "/saved_annotations/5.json",
        200,
        json!({ "id": 5, "title": "Loops", "annotation_text": "Use a loop" }).to_string(),
    );
    let client = client(transport, ids());

    let first = client.fetch_saved_annotation(5).await.expect("fetch");
    let second = client.fetch_saved_annotation(5).await.expect("cached");

    assert_eq!(first, second);
    assert_eq!(first.annotations_count, 0);
    assert_eq!(client.transport().count(Method::Get, "/saved_annotations/5.json"), 1);
}

fn beta_listing(lines: usize, ids: SharedIds) -> CodeListing {
    let options = ListingOptions::builder().beta(true).build();
    CodeListing::new(SUBMISSION, code(lines), options, ids)
}

#[test]
fn save_control_follows_the_save_permission() {
    let ids = ids();
    let mut listing = beta_listing(3, ids.clone());
    let note = listing.add_annotation(user(1, Some(1), &ids));
    let asked = listing.add_annotation(question(2, Some(2), "unanswered", &ids));
    let mut locked = user_json(3, Some(2), "Read only");
    locked["permission"]["save"] = json!(false);
    let locked = listing.add_annotation(Annotation::from_user_data(&data(&locked), ids.as_ref()));

    assert!(listing.actions(note).contains(&HeaderAction::Save));
    assert!(!listing.actions(asked).contains(&HeaderAction::Save));
    assert!(!listing.actions(locked).contains(&HeaderAction::Save));

    let mut stable = listing_with(3, ids.clone());
    let note = stable.add_annotation(user(4, Some(1), &ids));
    assert!(!stable.actions(note).contains(&HeaderAction::Save));
}

#[tokio::test]
async fn saving_an_existing_annotation_links_it() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Post,
        "/saved_annotations.json",
        201,
        json!({ "id": 8, "title": "Nice", "annotation_text": "Nice" }).to_string(),
    );
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = beta_listing(3, ids.clone());
    let note = listing.add_annotation(user(1, Some(2), &ids));
    let notifier = RecordingNotifier::new();

    let saved = listing
        .save_annotation(&client, note, None, &notifier)
        .await
        .expect("save");

    assert_eq!(saved, 8);
    assert_eq!(listing.annotation(note).and_then(|a| a.saved_annotation_id()), Some(8));
    let indicator = listing
        .views()
        .get(note)
        .and_then(|view| view.find_by_class("saved-annotation-indicator"))
        .expect("indicator");
    assert!(!indicator.has_class("hide"));
    assert_eq!(indicator.attr("data-saved-annotation-id"), Some("8"));
    assert_eq!(
        client.transport().requests()[0].body,
        Some(json!({
            "from": 1,
            "saved_annotation": { "title": "Nice", "annotation_text": "Nice" }
        }))
    );
    assert!(notifier.alerts().is_empty());
}

#[tokio::test]
async fn rejected_save_of_an_existing_annotation_alerts() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Post,
        "/saved_annotations.json",
        422,
        r#"{"title": ["can't be blank"]}"#,
    );
    let ids = ids();
    let client = client(transport, ids.clone());
    let mut listing = beta_listing(3, ids.clone());
    let note = listing.add_annotation(user(1, Some(2), &ids));
    let notifier = RecordingNotifier::new();

    let err = listing
        .save_annotation(&client, note, Some("  "), &notifier)
        .await
        .expect_err("422 is an error");

    assert_eq!(err.status(), Some(422));
    assert_eq!(
        notifier.alerts(),
        vec![Locale::En.save_failed(&["title can't be blank".to_string()])]
    );
    assert_eq!(listing.annotation(note).and_then(|a| a.saved_annotation_id()), None);
    let indicator = listing
        .views()
        .get(note)
        .and_then(|view| view.find_by_class("saved-annotation-indicator"))
        .expect("indicator");
    assert!(indicator.has_class("hide"));
}

#[tokio::test]
async fn questions_cannot_be_saved() {
    let ids = ids();
    let client = client(ScriptedTransport::new(), ids.clone());
    let mut listing = beta_listing(3, ids.clone());
    let asked = listing.add_annotation(question(2, Some(2), "unanswered", &ids));
    let notifier = RecordingNotifier::new();

    let err = listing
        .save_annotation(&client, asked, Some("Question"), &notifier)
        .await
        .expect_err("questions have no save permission");

    assert!(matches!(err, AnnotationError::Contract(_)));
    assert!(client.transport().requests().is_empty());
    assert!(notifier.alerts().is_empty());
}
