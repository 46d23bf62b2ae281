//! The `gitai commit` pipeline: collect, reduce, prompt, generate, review,
//! commit.

pub mod message;

pub use message::{CommitMessage, ensure_topic_line};

use std::io::{BufRead, Write};
use std::time::Instant;

use git2::Repository;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::cost::{self, CostEstimate, PricingTable};
use crate::diff::{ReduceOptions, ReducedDiff, quote_path, reduce};
use crate::error::GitaiError;
use crate::git::collect_staged;
use crate::llm::{Backend, BackendKind, BackendResponse};
use crate::prompt::{Prompt, PromptRequest, Template};
use crate::review::{Committer, Editor, Outcome, ReviewSession, apply_decision};

/// Prompt built from the staged diff, with the reduction that produced it.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub prompt: Prompt,
    pub reduced: ReducedDiff,
}

/// Reduction settings for a backend: the local model gets the sparse digest.
pub fn reduce_options(config: &Config, kind: BackendKind) -> ReduceOptions {
    let options = ReduceOptions::new(config.budget_for(kind));
    match kind {
        BackendKind::Local => options.changes_only(),
        BackendKind::Remote => options,
    }
}

/// Collect the staged diff and render the prompt for `kind`.
///
/// Everything here is local: collection, template and placeholder failures
/// surface before any request is made.
pub fn prepare_prompt(
    repo: &Repository,
    config: &Config,
    kind: BackendKind,
    manual_context: Option<&str>,
) -> Result<PreparedPrompt, GitaiError> {
    let record = collect_staged(repo)?;
    let reduced = reduce(&record, &reduce_options(config, kind));

    if reduced.truncated {
        eprintln!(
            "\x1b[33m⚠ Large diff: {} lines across {} file(s), sending {} lines\x1b[0m",
            reduced.total_lines,
            reduced.files.len(),
            reduced.emitted_lines
        );
        if !reduced.omitted_files.is_empty() {
            eprintln!(
                "\x1b[33m⚠ Content omitted for: {}\x1b[0m",
                reduced
                    .omitted_files
                    .iter()
                    .map(|p| quote_path(p))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    } else {
        println!(
            "Staged diff: {} lines across {} file(s)",
            reduced.total_lines,
            reduced.files.len()
        );
    }

    let template = Template::load(config)?;
    let prompt = PromptRequest::new(&template, &reduced.files, &reduced.text)
        .with_manual_context(manual_context)
        .build()?;
    debug!("Prompt length: {} chars", prompt.user.len());

    Ok(PreparedPrompt { prompt, reduced })
}

/// Pricing table for cost reporting; a broken pricing file only warns.
pub fn load_pricing(config: &Config) -> PricingTable {
    PricingTable::load(config).unwrap_or_else(|e| {
        eprintln!("\x1b[33m⚠ {}. Using built-in pricing.\x1b[0m", e);
        PricingTable::builtin()
    })
}

fn report_response(response: &BackendResponse, pricing: &PricingTable) {
    println!("Inference time: {:.2}s", response.elapsed.as_secs_f64());

    let Some(usage) = &response.usage else {
        info!("Backend reported no token usage");
        return;
    };
    println!("Tokens: {}", usage);

    if response.backend == BackendKind::Remote {
        match cost::estimate(pricing, &response.model, Some(usage)) {
            estimate @ CostEstimate::Estimated { .. } => println!("Estimated cost: {}", estimate),
            CostEstimate::Unavailable(reason) => info!("Cost unavailable: {}", reason),
        }
    }
}

/// Run the full pipeline against `repo`.
///
/// Returns [`Outcome::Rejected`] when the user declines; nothing is
/// committed and the index is left as it was.
pub async fn run_commit<R, W, E, C>(
    repo: &Repository,
    config: &Config,
    backend: &dyn Backend,
    manual_context: Option<&str>,
    session: &mut ReviewSession<R, W, E>,
    committer: &C,
) -> Result<Outcome, GitaiError>
where
    R: BufRead,
    W: Write,
    E: Editor,
    C: Committer + ?Sized,
{
    let started = Instant::now();
    let kind = backend.kind();

    let prepared = prepare_prompt(repo, config, kind, manual_context)?;
    let pricing = load_pricing(config);

    println!(
        "Generating commit message with {} ({})... this may take a minute.",
        kind,
        backend.model()
    );
    let response = backend.send(&prepared.prompt).await?;

    let draft = ensure_topic_line(&response.text, manual_context);

    println!("\n========== AI-generated commit message ==========\n");
    println!("{}", draft);
    println!("\n=================================================\n");
    report_response(&response, &pricing);

    let decision = session.review(&draft)?;
    let outcome = apply_decision(decision, committer)?;

    match &outcome {
        Outcome::Committed(message) => println!("Committed: {}", message.subject),
        Outcome::Rejected => warn!("Commit aborted by user"),
    }
    info!("Total runtime: {:.2}s", started.elapsed().as_secs_f64());

    Ok(outcome)
}
