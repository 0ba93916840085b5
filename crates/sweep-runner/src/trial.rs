use crate::command::CommandLine;
use crate::extract::{extract_metric, ExtractError, MetricKind};
use crate::invoke::{InvokeError, Invoker};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TRIALS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TrialFailure {
    Spawn(String),
    TimedOut(Duration),
    Invoke(String),
    Extract(String),
}

impl TrialFailure {
    fn from_invoke(err: &InvokeError) -> Self {
        match err {
            InvokeError::Spawn { .. } => TrialFailure::Spawn(err.to_string()),
            InvokeError::TimedOut { timeout, .. } => TrialFailure::TimedOut(*timeout),
            InvokeError::EmptyCommand | InvokeError::Wait(_) => {
                TrialFailure::Invoke(err.to_string())
            }
        }
    }

    fn from_extract(err: &ExtractError) -> Self {
        TrialFailure::Extract(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    Success(f64),
    Failed(TrialFailure),
}

impl TrialOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            TrialOutcome::Success(v) => Some(*v),
            TrialOutcome::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialBatch {
    pub trials: usize,
    pub outcomes: Vec<TrialOutcome>,
}

impl TrialBatch {
    pub fn new(trials: usize) -> Self {
        Self {
            trials,
            outcomes: Vec::with_capacity(trials),
        }
    }

    pub fn push(&mut self, outcome: TrialOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn values(&self) -> Vec<f64> {
        self.outcomes.iter().filter_map(TrialOutcome::value).collect()
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.value().is_some()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    /// 1 when every requested trial produced a value, otherwise 0.
    pub fn aggregated(&self) -> u8 {
        if self.successes() == self.trials {
            1
        } else {
            0
        }
    }

    pub fn median(&self) -> Option<f64> {
        let mut values = self.values();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            Some(values[mid])
        } else {
            Some((values[mid - 1] + values[mid]) / 2.0)
        }
    }
}

pub fn run_trials<I: Invoker + ?Sized>(
    invoker: &I,
    command: &CommandLine,
    metric: MetricKind,
    trials: usize,
) -> TrialBatch {
    let mut batch = TrialBatch::new(trials);
    for i in 0..trials {
        info!(trial = i, "iteration {}", i);
        let outcome = match invoker.invoke(command) {
            Err(InvokeError::TimedOut {
                timeout,
                stdout,
                stderr,
            }) => {
                warn!(
                    trial = i,
                    ?timeout,
                    "trial timed out\n--- stdout ---\n{}\n--- stderr ---\n{}",
                    stdout,
                    stderr
                );
                TrialOutcome::Failed(TrialFailure::TimedOut(timeout))
            }
            Err(e) => {
                warn!(trial = i, error = %e, "benchmark did not run to completion");
                TrialOutcome::Failed(TrialFailure::from_invoke(&e))
            }
            Ok(output) => match extract_metric(&output.stdout, metric) {
                Ok(value) => {
                    info!(trial = i, value, "{} = {}", metric.marker(), value);
                    TrialOutcome::Success(value)
                }
                Err(e) => {
                    warn!(
                        trial = i,
                        error = %e,
                        status = %output.status_label(),
                        "trial failed\n--- stdout ---\n{}\n--- stderr ---\n{}",
                        output.stdout,
                        output.stderr
                    );
                    TrialOutcome::Failed(TrialFailure::from_extract(&e))
                }
            },
        };
        batch.push(outcome);
    }
    info!(
        successes = batch.successes(),
        trials,
        aggregated = batch.aggregated(),
        "batch complete"
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::ProcessOutput;
    use std::cell::RefCell;
    use std::io;

    /// Replays canned stdout, one entry per call.
    struct ScriptedInvoker {
        outputs: RefCell<Vec<Result<String, InvokeError>>>,
        calls: RefCell<usize>,
    }

    impl ScriptedInvoker {
        fn new(outputs: Vec<Result<String, InvokeError>>) -> Self {
            Self {
                outputs: RefCell::new(outputs.into_iter().rev().collect()),
                calls: RefCell::new(0),
            }
        }
    }

    impl Invoker for ScriptedInvoker {
        fn invoke(&self, _command: &CommandLine) -> Result<ProcessOutput, InvokeError> {
            *self.calls.borrow_mut() += 1;
            let next = self
                .outputs
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| Ok(String::new()));
            next.map(|stdout| ProcessOutput {
                exit_code: Some(0),
                stdout,
                stderr: "stderr text".to_string(),
            })
        }
    }

    fn ok(v: f64) -> Result<String, InvokeError> {
        Ok(format!("Throughput (ops/s)\t{}\n", v))
    }

    fn cmd() -> CommandLine {
        CommandLine::split("java -jar bench.jar")
    }

    #[test]
    fn all_trials_succeeding_yields_one() {
        let invoker = ScriptedInvoker::new(vec![ok(3.0), ok(1.0), ok(2.0)]);
        let batch = run_trials(&invoker, &cmd(), MetricKind::Throughput, DEFAULT_TRIALS);
        assert_eq!(*invoker.calls.borrow(), 3);
        assert_eq!(batch.aggregated(), 1);
        assert_eq!(batch.values(), vec![3.0, 1.0, 2.0]);
        assert_eq!(batch.median(), Some(2.0));
    }

    #[test]
    fn any_single_failure_yields_zero() {
        for failing in 0..3 {
            let mut outputs = vec![ok(1.0), ok(2.0), ok(3.0)];
            outputs[failing] = Ok("java.lang.IllegalStateException\n".to_string());
            let invoker = ScriptedInvoker::new(outputs);
            let batch = run_trials(&invoker, &cmd(), MetricKind::Throughput, DEFAULT_TRIALS);
            assert_eq!(batch.aggregated(), 0, "failing trial {}", failing);
            assert_eq!(batch.successes(), 2);
            assert_eq!(batch.failures(), 1);
            assert_eq!(batch.outcomes.len(), 3);
        }
    }

    #[test]
    fn failed_trials_are_dropped_not_zeroed() {
        let invoker = ScriptedInvoker::new(vec![
            ok(5.0),
            Ok("no metric here".to_string()),
            ok(7.0),
        ]);
        let batch = run_trials(&invoker, &cmd(), MetricKind::Throughput, DEFAULT_TRIALS);
        assert_eq!(batch.values(), vec![5.0, 7.0]);
        assert_eq!(batch.median(), Some(6.0));
        assert!(matches!(
            batch.outcomes[1],
            TrialOutcome::Failed(TrialFailure::Extract(ref m)) if m.starts_with("metric_absent")
        ));
    }

    #[test]
    fn invoker_errors_become_trial_failures() {
        let invoker = ScriptedInvoker::new(vec![
            Err(InvokeError::TimedOut {
                timeout: Duration::from_secs(1),
                stdout: "Throughput (ops/s)\t9.0\n".to_string(),
                stderr: "GC overhead limit".to_string(),
            }),
            Err(InvokeError::Spawn {
                program: "java".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            }),
            ok(1.0),
        ]);
        let batch = run_trials(&invoker, &cmd(), MetricKind::Throughput, DEFAULT_TRIALS);
        // Output captured before the kill is never mined for a metric.
        assert_eq!(
            batch.outcomes[0],
            TrialOutcome::Failed(TrialFailure::TimedOut(Duration::from_secs(1)))
        );
        assert!(matches!(
            batch.outcomes[1],
            TrialOutcome::Failed(TrialFailure::Spawn(ref m)) if m.starts_with("spawn_failed: java")
        ));
        assert_eq!(batch.values(), vec![1.0]);
        assert_eq!(batch.aggregated(), 0);
    }

    #[test]
    fn wait_and_empty_command_errors_are_not_spawn_failures() {
        let invoker = ScriptedInvoker::new(vec![
            Err(InvokeError::Wait(io::Error::new(io::ErrorKind::Other, "ECHILD"))),
            Err(InvokeError::EmptyCommand),
        ]);
        let batch = run_trials(&invoker, &cmd(), MetricKind::Throughput, 2);
        assert!(matches!(
            batch.outcomes[0],
            TrialOutcome::Failed(TrialFailure::Invoke(ref m)) if m == "wait_failed: ECHILD"
        ));
        assert!(matches!(
            batch.outcomes[1],
            TrialOutcome::Failed(TrialFailure::Invoke(ref m)) if m.starts_with("empty_command")
        ));
    }

    #[test]
    fn empty_batch_has_no_median() {
        let batch = TrialBatch::new(3);
        assert_eq!(batch.median(), None);
        assert_eq!(batch.aggregated(), 0);
    }
}
