//! Native build validation.
//!
//! Runs the fixed clean → compile → test → native-package sequence against a Maven
//! project, stops at the first failing step, then checks for the produced binary and
//! starts it once under a timeout. Every observation is recorded as a
//! [`PipelineEvent`]; presentation is left to the caller.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::config::ValidateSection;
use crate::error::ValidateError;
use crate::util::process::{CommandOutput, CommandRunner};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct BuildStep {
    pub label: String,
    pub command: String,
    pub elapsed_seconds: Option<f64>,
    pub outcome: StepOutcome,
}

impl BuildStep {
    pub fn new(command: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            elapsed_seconds: None,
            outcome: StepOutcome::Pending,
        }
    }
}

/// The pipeline in dependency order.
pub fn default_steps(settings: &ValidateSection) -> Vec<BuildStep> {
    let tool = settings.build_tool.trim();
    let package = format!("{tool} package {}", settings.native_args.trim());
    vec![
        BuildStep::new(format!("{tool} clean"), "Clean project"),
        BuildStep::new(format!("{tool} compile"), "Compile project"),
        BuildStep::new(format!("{tool} test"), "Run tests"),
        BuildStep::new(package.trim_end(), "Build native image"),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Present,
    Absent,
}

pub fn verify_artifact(expected: &Path) -> ArtifactStatus {
    if expected.exists() {
        ArtifactStatus::Present
    } else {
        ArtifactStatus::Absent
    }
}

/// Outcome of starting the produced binary. Never affects the run verdict.
#[derive(Clone, Debug, Serialize)]
pub struct SmokeResult {
    pub command: String,
    pub elapsed_seconds: f64,
    pub passed: bool,
    pub timed_out: bool,
    pub exit_code: Option<i32>,
    pub output: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    PreconditionChecked,
    Aborted { message: String },
    RunningSteps,
    StepsFailed { index: usize, label: String },
    AllStepsSucceeded,
    ArtifactChecked,
    ArtifactMissing { path: PathBuf },
    SmokeTested,
    Done,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Aborted { .. }
                | RunState::StepsFailed { .. }
                | RunState::ArtifactMissing { .. }
                | RunState::Done
        )
    }

    /// Process exit status for a finished run.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunState::Done => 0,
            _ => 1,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Precondition {
        marker: PathBuf,
        present: bool,
    },
    StepFinished {
        index: usize,
        label: String,
        command: String,
        elapsed_seconds: f64,
        outcome: StepOutcome,
        /// Captured stdout on success, stderr (or the launch error) on failure.
        output: String,
    },
    PipelineFailed {
        index: usize,
        label: String,
    },
    PipelineSucceeded {
        steps: usize,
    },
    Artifact {
        path: PathBuf,
        status: ArtifactStatus,
    },
    SmokeTest(SmokeResult),
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationReport {
    pub started_at: String,
    pub state: RunState,
    pub steps: Vec<BuildStep>,
    pub events: Vec<PipelineEvent>,
    pub smoke: Option<SmokeResult>,
}

impl ValidationReport {
    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }

    pub fn executed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.outcome != StepOutcome::Pending)
            .count()
    }
}

type Observer<'a> = Box<dyn FnMut(&PipelineEvent) + 'a>;

pub struct BuildValidator<'a, R> {
    root: PathBuf,
    settings: ValidateSection,
    runner: R,
    steps: Vec<BuildStep>,
    state: RunState,
    events: Vec<PipelineEvent>,
    observer: Option<Observer<'a>>,
}

impl<'a, R: CommandRunner> BuildValidator<'a, R> {
    pub fn new(root: impl Into<PathBuf>, settings: ValidateSection, runner: R) -> Self {
        let steps = default_steps(&settings);
        Self {
            root: root.into(),
            settings,
            runner,
            steps,
            state: RunState::NotStarted,
            events: Vec::new(),
            observer: None,
        }
    }

    /// Receives each event as soon as it is recorded.
    pub fn with_observer(mut self, observer: impl FnMut(&PipelineEvent) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Drives the whole state machine to a terminal state.
    pub fn run(mut self) -> ValidationReport {
        let started_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".into());
        let mut smoke = None;

        match self.check_precondition() {
            Err(err) => self.transition(RunState::Aborted {
                message: err.to_string(),
            }),
            Ok(()) => {
                self.transition(RunState::PreconditionChecked);
                if self.run_pipeline() == StepOutcome::Succeeded {
                    let artifact = self.root.join(&self.settings.artifact);
                    let status = verify_artifact(&artifact);
                    self.record(PipelineEvent::Artifact {
                        path: artifact.clone(),
                        status,
                    });
                    match status {
                        ArtifactStatus::Absent => {
                            self.transition(RunState::ArtifactMissing { path: artifact });
                        }
                        ArtifactStatus::Present => {
                            self.transition(RunState::ArtifactChecked);
                            smoke = Some(self.smoke_test(&artifact));
                            self.transition(RunState::SmokeTested);
                            self.transition(RunState::Done);
                        }
                    }
                }
            }
        }

        debug_assert!(self.state.is_terminal());
        tracing::info!(state = ?self.state, "validation finished");
        ValidationReport {
            started_at,
            state: self.state,
            steps: self.steps,
            events: self.events,
            smoke,
        }
    }

    fn check_precondition(&mut self) -> Result<(), ValidateError> {
        let marker = self.root.join(&self.settings.marker);
        let present = marker.is_file();
        self.record(PipelineEvent::Precondition {
            marker: marker.clone(),
            present,
        });
        if present {
            Ok(())
        } else {
            Err(ValidateError::Precondition { path: marker })
        }
    }

    /// Runs the steps in order and stops at the first failure.
    fn run_pipeline(&mut self) -> StepOutcome {
        self.transition(RunState::RunningSteps);
        for index in 0..self.steps.len() {
            if self.run_step(index) == StepOutcome::Failed {
                let label = self.steps[index].label.clone();
                self.record(PipelineEvent::PipelineFailed {
                    index,
                    label: label.clone(),
                });
                self.transition(RunState::StepsFailed { index, label });
                return StepOutcome::Failed;
            }
        }
        self.record(PipelineEvent::PipelineSucceeded {
            steps: self.steps.len(),
        });
        self.transition(RunState::AllStepsSucceeded);
        StepOutcome::Succeeded
    }

    /// Executes one step exactly once and records its outcome and duration.
    fn run_step(&mut self, index: usize) -> StepOutcome {
        let step = &self.steps[index];
        if step.outcome != StepOutcome::Pending {
            return step.outcome;
        }
        let command = step.command.clone();
        tracing::info!(step = %self.steps[index].label, %command, "running build step");
        let started = Instant::now();
        let result = self.runner.run(&command, None);
        let elapsed = started.elapsed().as_secs_f64();

        let (outcome, output) = match result {
            Ok(output) if output.success() => (StepOutcome::Succeeded, output.stdout),
            Ok(output) => (StepOutcome::Failed, failure_text(output)),
            Err(err) => (StepOutcome::Failed, format!("{err:#}")),
        };

        let step = &mut self.steps[index];
        step.outcome = outcome;
        step.elapsed_seconds = Some(elapsed);
        let event = PipelineEvent::StepFinished {
            index,
            label: step.label.clone(),
            command,
            elapsed_seconds: elapsed,
            outcome,
            output,
        };
        self.record(event);
        outcome
    }

    /// Starts the binary once, without a shell, under the configured timeout.
    fn smoke_test(&mut self, artifact: &Path) -> SmokeResult {
        let command = artifact.display().to_string();
        let timeout = Duration::from_secs(self.settings.smoke_timeout_secs);
        let started = Instant::now();
        let result = self.runner.run_program(artifact, Some(timeout));
        let elapsed_seconds = started.elapsed().as_secs_f64();

        let smoke = match result {
            Ok(output) => SmokeResult {
                command,
                elapsed_seconds,
                passed: output.success(),
                timed_out: output.timed_out,
                exit_code: output.exit_code,
                output: if output.success() {
                    output.stdout
                } else {
                    failure_text(output)
                },
            },
            Err(err) => SmokeResult {
                command,
                elapsed_seconds,
                passed: false,
                timed_out: false,
                exit_code: None,
                output: format!("{err:#}"),
            },
        };
        if !smoke.passed {
            tracing::warn!(timed_out = smoke.timed_out, "smoke test did not pass");
        }
        self.record(PipelineEvent::SmokeTest(smoke.clone()));
        smoke
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "state change");
        self.state = next;
    }

    fn record(&mut self, event: PipelineEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
        self.events.push(event);
    }
}

fn failure_text(output: CommandOutput) -> String {
    if output.stderr.trim().is_empty() && !output.stdout.trim().is_empty() {
        output.stdout
    } else {
        output.stderr
    }
}
