//! Machines: a stage plus routing and throughput counters
//!
//! A machine walks `Idle -> Processing -> Dispatched -> Idle` on every run.
//! A failed stage returns it from `Processing` straight to `Idle`.

use crate::error::{ConfigurationError, PipelineError};
use crate::stages::Stage;
use af_core::Batch;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of one machine run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MachineState {
    /// Waiting for a run
    #[default]
    Idle,
    /// Stage is working on the pulled batch
    Processing,
    /// Outputs handed to routing
    Dispatched,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: MachineState) -> Vec<MachineState> {
    use MachineState::{Dispatched, Idle, Processing};
    match from {
        Idle => vec![Processing],
        Processing => vec![Dispatched, Idle],
        Dispatched => vec![Idle],
    }
}

/// Validate a state transition
///
/// # Errors
/// Returns [`PipelineError::IllegalTransition`] for a move the lifecycle
/// does not allow
pub fn validate_transition(from: MachineState, to: MachineState) -> Result<(), PipelineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PipelineError::IllegalTransition { from, to })
    }
}

/// Where a path's answers go
///
/// Without a machine the answers land in the workstation's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    /// Target workstation
    pub workstation: String,
    /// Target machine inside it
    pub machine: Option<String>,
}

impl Destination {
    /// Route to a machine
    #[must_use]
    pub fn machine(workstation: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            workstation: workstation.into(),
            machine: Some(machine.into()),
        }
    }

    /// Route to a workstation's inbox
    #[must_use]
    pub fn workstation(workstation: impl Into<String>) -> Self {
        Self {
            workstation: workstation.into(),
            machine: None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.machine {
            Some(machine) => write!(f, "{}/{machine}", self.workstation),
            None => write!(f, "{}", self.workstation),
        }
    }
}

/// Routing table and free-form settings of a machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineOptions {
    /// Path name to destination
    pub paths: IndexMap<String, Destination>,
    /// Settings passed through untouched
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl MachineOptions {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `path` to `destination`
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>, destination: Destination) -> Self {
        self.paths.insert(path.into(), destination);
        self
    }

    /// Store an opaque setting
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// Running counters of a machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStats {
    /// Answers pulled from the queue over all runs
    pub total_answers_in: usize,
    /// Answers emitted per path over all runs
    pub total_answers_out: IndexMap<String, usize>,
    /// Completed runs
    pub runs: usize,
}

impl MachineStats {
    /// Emitted-on-path over received; 0 before anything was received
    #[must_use]
    pub fn average_gain(&self, path: &str) -> f64 {
        if self.total_answers_in == 0 {
            return 0.0;
        }
        let out = self.total_answers_out.get(path).copied().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let gain = out as f64 / self.total_answers_in as f64;
        gain
    }
}

/// Batch bound for a destination
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Path the batch left on
    pub path: String,
    /// Where it goes
    pub destination: Destination,
    /// Answers
    pub answers: Batch,
}

/// Named stage with routing inside a workstation
pub struct Machine {
    name: String,
    workstation: String,
    options: MachineOptions,
    stage: Box<dyn Stage>,
    state: MachineState,
    stats: MachineStats,
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("workstation", &self.workstation)
            .field("options", &self.options)
            .field("output_paths", &self.stage.output_paths())
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Machine {
    /// Create idle machine `name` in `workstation`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        workstation: impl Into<String>,
        stage: impl Stage + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            workstation: workstation.into(),
            options: MachineOptions::default(),
            stage: Box::new(stage),
            state: MachineState::Idle,
            stats: MachineStats::default(),
        }
    }

    /// Replace routing table and settings
    #[must_use]
    pub fn with_options(mut self, options: MachineOptions) -> Self {
        self.options = options;
        self
    }

    /// Route `path` to `destination`
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>, destination: Destination) -> Self {
        self.set_path(path, destination);
        self
    }

    /// Route `path` to `destination`, replacing any earlier route
    pub fn set_path(&mut self, path: impl Into<String>, destination: Destination) -> &mut Self {
        self.options.paths.insert(path.into(), destination);
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn workstation(&self) -> &str {
        &self.workstation
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &MachineOptions {
        &self.options
    }

    /// Destination of `path`
    #[must_use]
    pub fn path(&self, path: &str) -> Option<&Destination> {
        self.options.paths.get(path)
    }

    /// Paths the stage may emit on
    #[must_use]
    pub fn output_paths(&self) -> Vec<String> {
        self.stage.output_paths()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> MachineState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> &MachineStats {
        &self.stats
    }

    #[inline]
    #[must_use]
    pub fn total_answers_in(&self) -> usize {
        self.stats.total_answers_in
    }

    /// Answers emitted on `path` over all runs
    #[must_use]
    pub fn total_answers_out(&self, path: &str) -> usize {
        self.stats.total_answers_out.get(path).copied().unwrap_or(0)
    }

    /// Emitted-on-path over received
    #[must_use]
    pub fn average_gain(&self, path: &str) -> f64 {
        self.stats.average_gain(path)
    }

    fn transition(&mut self, to: MachineState) -> Result<(), PipelineError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }

    /// Process one pulled batch and address the outputs
    ///
    /// Answers the stage did not forward stay in `input` when the run
    /// fails, and so does the output of a stage that emitted on an
    /// unrouted path.
    ///
    /// # Errors
    /// Returns [`PipelineError::Stage`] if the stage fails and
    /// [`PipelineError::Configuration`] if a path has no destination.
    /// Counters are left untouched in both cases.
    pub fn process(&mut self, input: &mut Batch) -> Result<Vec<Delivery>, PipelineError> {
        if let Some(path) = self.unrouted(self.stage.output_paths().into_iter()) {
            return Err(self.unrouted_error(path).into());
        }
        self.transition(MachineState::Processing)?;
        let received = input.len();

        let output = match self.stage.process(input) {
            Ok(output) => output,
            Err(err) => {
                self.transition(MachineState::Idle)?;
                tracing::warn!(machine = %self.name, error = %err, "stage failed");
                return Err(err.into());
            }
        };
        if let Some(path) = self.unrouted(output.keys().cloned()) {
            self.transition(MachineState::Idle)?;
            input.extend(output.into_values().flatten());
            return Err(self.unrouted_error(path).into());
        }

        self.transition(MachineState::Dispatched)?;
        let deliveries: Vec<Delivery> = output
            .into_iter()
            .filter_map(|(path, answers)| {
                let destination = self.options.paths.get(&path)?.clone();
                Some(Delivery {
                    path,
                    destination,
                    answers,
                })
            })
            .collect();
        self.stats.total_answers_in += received;
        for delivery in &deliveries {
            *self
                .stats
                .total_answers_out
                .entry(delivery.path.clone())
                .or_default() += delivery.answers.len();
        }
        self.stats.runs += 1;
        tracing::debug!(
            machine = %self.name,
            received,
            emitted = deliveries.iter().map(|d| d.answers.len()).sum::<usize>(),
            "machine run"
        );
        self.transition(MachineState::Idle)?;
        Ok(deliveries)
    }

    fn unrouted(&self, mut paths: impl Iterator<Item = String>) -> Option<String> {
        paths.find(|path| !self.options.paths.contains_key(path))
    }

    fn unrouted_error(&self, path: String) -> ConfigurationError {
        ConfigurationError::UnroutedPath {
            machine: self.name.clone(),
            path,
        }
    }
}
