#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # dodona-annotations
//! ## Introduction
//!
//! Inspect and manage the annotations of Dodona submissions from a terminal.
//!
//! ## Configuration
//!
//! The backend is read from `DODONA_BASE_URL` (default `https://dodona.be`).
//! Write calls need `DODONA_CSRF_TOKEN`. Strings follow `DODONA_LOCALE`
//! (`en` or `nl`), beta controls follow `DODONA_COURSE_BETA`. A `.env` file in
//! the working directory is loaded first.

use anyhow::{Context, Result};
use bpaf::*;
use dodona_annotations::{
    AnnotationClient, CodeListing, Counter, HttpTransport, QuestionState, TransitionOutcome,
    config::{self, ConfigHandle},
    notice::TracingNotifier,
    payload::MachineAnnotationData,
    report,
};
use dotenvy::dotenv;
use futures::future::try_join_all;
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Print an overview of the annotations of submissions
    List(Vec<u64>),
    /// Render the annotated listing of a submission
    Render(u64, String, Option<String>),
    /// Move a question to another state
    Transition(u64, u64, QuestionState),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses a submission id
    fn s() -> impl Parser<u64> {
        positional("SUBMISSION").help("Id of the submission")
    }

    let submissions = positional::<u64>("SUBMISSION")
        .help("Ids of the submissions")
        .some("at least one submission is required");
    let list = construct!(Cmd::List(submissions))
        .to_options()
        .command("list")
        .help("Print the annotations of one or more submissions");

    let code = positional::<String>("CODE_FILE").help("File holding the submitted code");
    let machine = long("machine")
        .short('m')
        .help("JSON file with linter findings to add")
        .argument::<String>("FILE")
        .optional();
    let render = construct!(Cmd::Render(s(), code, machine))
        .to_options()
        .command("render")
        .help("Print the html of an annotated code listing");

    let annotation = positional::<u64>("ANNOTATION_ID").help("Server id of the question");
    let state = positional::<QuestionState>("STATE")
        .help("Target state: unanswered, in_progress or answered");
    let transition = construct!(Cmd::Transition(s(), annotation, state))
        .to_options()
        .command("transition")
        .help("Move a question to another state");

    let cmd = construct!([list, render, transition]);

    cmd.to_options()
        .descr("Annotations of Dodona submissions")
        .run()
}

/// Loads the user annotations of a submission into a fresh listing.
async fn load(
    cfg: &ConfigHandle,
    client: &AnnotationClient<HttpTransport>,
    submission_id: u64,
    code: String,
) -> Result<CodeListing> {
    let mut listing = CodeListing::new(
        submission_id,
        code,
        cfg.listing_options(None),
        client.ids(),
    );
    listing
        .load_user_annotations(client)
        .await
        .with_context(|| format!("Failed to load annotations of submission {submission_id}"))?;
    Ok(listing)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let cmd = options();
    let cfg = config::ensure_initialized().context("Failed to load configuration")?;
    let client = AnnotationClient::new(cfg.transport(), Counter::shared());

    match cmd {
        Cmd::List(submissions) => {
            let listings = try_join_all(
                submissions
                    .iter()
                    .map(|id| load(&cfg, &client, *id, String::new())),
            )
            .await?;

            for listing in listings {
                println!("{}", report::overview(&listing));
                println!("{}", report::type_counts(&listing));
            }
        }
        Cmd::Render(submission, code_file, machine) => {
            let code = tokio::fs::read_to_string(&code_file)
                .await
                .with_context(|| format!("Failed to read `{code_file}`"))?;
            let mut listing = load(&cfg, &client, submission, code).await?;

            if let Some(machine) = machine {
                let raw = tokio::fs::read_to_string(&machine)
                    .await
                    .with_context(|| format!("Failed to read `{machine}`"))?;
                let findings: Vec<MachineAnnotationData> = serde_json::from_str(&raw)
                    .with_context(|| format!("`{machine}` is not a list of linter findings"))?;
                listing.add_machine_annotations(&findings);
            }

            println!("{}", listing.to_html());
        }
        Cmd::Transition(submission, server_id, state) => {
            let mut listing = load(&cfg, &client, submission, String::new()).await?;
            let id = listing
                .index()
                .find_by_server_id(server_id)
                .map(|annotation| annotation.id())
                .with_context(|| {
                    format!("Submission {submission} has no annotation with id {server_id}")
                })?;

            let outcome = listing
                .transition_question(&client, id, state, &TracingNotifier)
                .await
                .with_context(|| format!("Failed to move question {server_id} to {state}"))?;
            match outcome {
                TransitionOutcome::Transitioned(q) | TransitionOutcome::Refreshed(q) => {
                    let current = q.question_state().unwrap_or(state);
                    eprintln!("Question {server_id} is now {current}");
                }
                TransitionOutcome::Gone => eprintln!("Question {server_id} no longer exists"),
            }
        }
    };

    Ok(())
}
