use anyhow::{Context, Result};

use crate::cli::ValidateArgs;
use crate::config;
use crate::util::process::ShellRunner;
use crate::validate::{ArtifactStatus, BuildValidator, PipelineEvent, RunState, StepOutcome};

/// Runs the validator from the current directory and returns the process exit code.
pub fn run(args: &ValidateArgs) -> Result<i32> {
    let config = config::load()?;
    let root = std::env::current_dir().context("failed to resolve project root")?;
    let runner = ShellRunner::new(&root);

    let mut validator = BuildValidator::new(&root, config.validate, runner);
    if !args.json {
        println!("Validating native build in {}", root.display());
        validator = validator.with_observer(|event| print!("{}", render_event(event)));
    }
    let report = validator.run();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to render report json")?
        );
    } else {
        println!("{}", render_verdict(&report.state));
    }
    Ok(report.exit_code())
}

pub fn render_event(event: &PipelineEvent) -> String {
    match event {
        // A missing marker is reported once, by the verdict.
        PipelineEvent::Precondition { .. } => String::new(),
        PipelineEvent::StepFinished {
            label,
            command,
            elapsed_seconds,
            outcome,
            output,
            ..
        } => {
            let mut text = format!("\n» {label}\n  $ {command}\n  took {elapsed_seconds:.2}s\n");
            match outcome {
                StepOutcome::Succeeded => {
                    text.push_str(&format!("✓ {label} succeeded\n"));
                    push_block(&mut text, "Output", output);
                }
                _ => {
                    text.push_str(&format!("✗ {label} failed\n"));
                    push_block(&mut text, "Error output", output);
                }
            }
            text
        }
        PipelineEvent::PipelineFailed { label, .. } => {
            format!("\n✗ Validation stopped at step '{label}'\n")
        }
        PipelineEvent::PipelineSucceeded { steps } => {
            format!("\n✓ All {steps} build steps succeeded\n")
        }
        PipelineEvent::Artifact { path, status } => match status {
            ArtifactStatus::Present => format!("✓ Native binary present: {}\n", path.display()),
            ArtifactStatus::Absent => format!("✗ Native binary not found: {}\n", path.display()),
        },
        PipelineEvent::SmokeTest(smoke) => {
            let mut text = format!(
                "\n» Smoke test\n  $ {}\n  took {:.2}s\n",
                smoke.command, smoke.elapsed_seconds
            );
            if smoke.passed {
                text.push_str("✓ Smoke test passed\n");
            } else if smoke.timed_out {
                text.push_str("! Smoke test timed out (advisory)\n");
            } else {
                text.push_str("! Smoke test failed (advisory)\n");
            }
            push_block(&mut text, "Output", &smoke.output);
            text
        }
    }
}

fn render_verdict(state: &RunState) -> String {
    match state {
        RunState::Done => "✓ Native build validated".to_string(),
        RunState::Aborted { message } => format!("✗ Aborted: {message}"),
        RunState::StepsFailed { label, .. } => format!("✗ Failed at '{label}'"),
        RunState::ArtifactMissing { path } => {
            format!("✗ Build succeeded but {} is missing", path.display())
        }
        other => format!("✗ Run ended in unexpected state {other:?}"),
    }
}

fn push_block(text: &mut String, title: &str, body: &str) {
    let body = body.trim_end();
    if body.is_empty() {
        return;
    }
    text.push_str(&format!("{title}:\n{body}\n"));
}
