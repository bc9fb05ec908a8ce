
use annotation_support::*;
use dodona_annotations::{
    AnnotationClient, AnnotationError, AnnotationId, CodeListing, QuestionState,
    ScriptedTransport, SharedIds, TransitionOutcome,
    i18n::Locale,
    notice::RecordingNotifier,
    render::HeaderAction,
    transport::Method,
};
use serde_json::json;

const QUESTION: u64 = 7;
const URL: &str = "/annotations/7";

struct Fixture {
    ids:      SharedIds,
    listing:  CodeListing,
    client:   AnnotationClient<ScriptedTransport>,
    notifier: RecordingNotifier,
    question: AnnotationId,
}

fn fixture(transport: ScriptedTransport) -> Fixture {
    let ids = ids();
    let mut listing = listing_with(10, ids.clone());
    listing.add_annotation(machine("error", 3, "cannot find symbol", &ids));
    let question = listing.add_annotation(question(QUESTION, Some(3), "unanswered", &ids));
    listing.add_annotation(user(8, Some(3), &ids));
    Fixture {
        client: client(transport, ids.clone()),
        ids,
        listing,
        notifier: RecordingNotifier::new(),
        question,
    }
}

#[tokio::test]
async fn transition_replaces_the_question_in_place() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Patch,
        URL,
        200,
        question_json(QUESTION, Some(2), "answered").to_string(),
    );
    let mut f = fixture(transport);
    let before: Vec<_> = f
        .listing
        .annotations_for_line(Some(3))
        .iter()
        .map(|a| a.id())
        .collect();

    let outcome = f
        .listing
        .transition_question(&f.client, f.question, QuestionState::Answered, &f.notifier)
        .await
        .expect("transition");

    let TransitionOutcome::Transitioned(updated) = outcome.clone() else {
        panic!("expected a transition, got {outcome:?}");
    };
    assert_eq!(updated.question_state(), Some(QuestionState::Answered));
    assert_ne!(updated.id(), f.question);

    let after: Vec<_> = f
        .listing
        .annotations_for_line(Some(3))
        .iter()
        .map(|a| a.id())
        .collect();
    assert_eq!(after, vec![before[0], updated.id(), before[2]]);
    assert_eq!(
        f.listing
            .annotation(updated.id())
            .and_then(|a| a.question_state()),
        Some(QuestionState::Answered)
    );

    let html = f.listing.to_html();
    assert_eq!(html.matches(&format!("id=\"annotation-div-{}\"", updated.id())).count(), 1);
    assert!(!html.contains(&format!("id=\"annotation-div-{}\"", f.question)));
    assert!(f.notifier.toasts().is_empty());
    assert_consistent(&f.listing);

    let request = &f.client.transport().requests()[0];
    assert_eq!(
        request.body,
        Some(json!({ "from": "unanswered", "question": { "question_state": "answered" } }))
    );
}

#[tokio::test]
async fn deleted_question_is_dropped_quietly() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::Patch, URL, 404, "");
    let mut f = fixture(transport);

    let outcome = f
        .listing
        .transition_question(&f.client, f.question, QuestionState::Answered, &f.notifier)
        .await
        .expect("a lost race is not an error");

    assert_eq!(outcome, TransitionOutcome::Gone);
    assert!(f.listing.annotation(f.question).is_none());
    assert!(f.listing.views().get(f.question).is_none());
    assert_eq!(f.listing.count(), 2);
    assert_eq!(f.notifier.toasts(), vec![Locale::En.question_deleted().to_string()]);
    assert_consistent(&f.listing);
}

#[tokio::test]
async fn conflict_refetches_exactly_once() {
    let transport = ScriptedTransport::new();
    transport
        .respond(Method::Patch, URL, 403, r#"{"errors": ["state changed"]}"#)
        .respond(
            Method::Get,
            URL,
            200,
            question_json(QUESTION, Some(2), "in_progress").to_string(),
        );
    let mut f = fixture(transport);

    let outcome = f
        .listing
        .transition_question(&f.client, f.question, QuestionState::Answered, &f.notifier)
        .await
        .expect("a conflict is not an error");

    let TransitionOutcome::Refreshed(fresh) = outcome.clone() else {
        panic!("expected a refresh, got {outcome:?}");
    };
    assert_eq!(f.client.transport().count(Method::Get, URL), 1);
    assert_eq!(f.client.transport().count(Method::Patch, URL), 1);
    assert_eq!(
        f.listing
            .annotation(fresh.id())
            .and_then(|a| a.question_state()),
        Some(QuestionState::InProgress)
    );
    assert!(f.listing.annotation(f.question).is_none());
    assert_eq!(f.notifier.toasts(), vec![Locale::En.question_conflict().to_string()]);
    assert_consistent(&f.listing);
}

#[tokio::test]
async fn conflict_on_a_deleted_question_is_a_removal() {
    let transport = ScriptedTransport::new();
    transport
        .respond(Method::Patch, URL, 403, "")
        .respond(Method::Get, URL, 404, "");
    let mut f = fixture(transport);

    let outcome = f
        .listing
        .transition_question(&f.client, f.question, QuestionState::InProgress, &f.notifier)
        .await
        .expect("transition");

    assert_eq!(outcome, TransitionOutcome::Gone);
    assert!(f.listing.annotation(f.question).is_none());
    assert_consistent(&f.listing);
}

#[tokio::test]
async fn other_failures_leave_the_listing_alone() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::Patch, URL, 500, "");
    let mut f = fixture(transport);

    let err = f
        .listing
        .transition_question(&f.client, f.question, QuestionState::Answered, &f.notifier)
        .await
        .expect_err("server errors propagate");

    assert_eq!(err.status(), Some(500));
    assert!(f.listing.annotation(f.question).is_some());
    assert!(f.notifier.toasts().is_empty());
}

#[tokio::test]
async fn stale_outcomes_do_not_resurrect_questions() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::Patch,
        URL,
        200,
        question_json(QUESTION, Some(2), "answered").to_string(),
    );
    let mut f = fixture(transport);
    let original = f.listing.annotation(f.question).cloned().expect("question");

    let outcome = f
        .client
        .transition(&original, QuestionState::Answered)
        .await
        .expect("transition");
    // someone removed it locally while the request was in flight
    f.listing.remove_annotation(&original);
    f.listing.apply_transition(&original, &outcome, &f.notifier);

    assert_eq!(f.listing.count(), 2);
    assert_consistent(&f.listing);
}

#[tokio::test]
async fn only_questions_can_transition() {
    let f = fixture(ScriptedTransport::new());
    let note = user(8, Some(3), &f.ids);

    let err = f
        .client
        .transition(&note, QuestionState::Answered)
        .await
        .expect_err("plain annotations have no state");
    assert!(matches!(err, AnnotationError::Contract(_)));
    assert!(f.client.transport().requests().is_empty());
}

#[test]
fn transition_buttons_follow_permissions() {
    let f = fixture(ScriptedTransport::new());
    let actions = f.listing.actions(f.question);

    assert!(actions.contains(&HeaderAction::Edit));
    assert!(actions.contains(&HeaderAction::Transition(QuestionState::Answered)));
    assert!(actions.contains(&HeaderAction::Transition(QuestionState::InProgress)));
    assert!(!actions.contains(&HeaderAction::Transition(QuestionState::Unanswered)));
}

#[test]
fn meta_mentions_who_changed_the_state() {
    let ids = ids();
    let fresh = question(1, Some(1), "unanswered", &ids);
    let handled = question(2, Some(1), "in_progress", &ids);

    assert_eq!(
        fresh.meta(Locale::En),
        "Student asked at 2024-02-01 11:00 (unanswered)"
    );
    assert_eq!(
        handled.meta(Locale::En),
        "Student asked at 2024-02-01 11:00 (in progress by Teacher)"
    );
}
