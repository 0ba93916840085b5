pub mod command;
pub mod extract;
pub mod invoke;
pub mod scenario;
pub mod sizing;
pub mod sweep;
pub mod trial;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

pub use command::{BenchTarget, CommandLine, Configuration, WorkloadParams};
pub use extract::{extract_metric, ExtractError, MetricKind};
pub use invoke::{InvokeError, Invoker, ProcessInvoker, ProcessOutput};
pub use scenario::{lookup, scenarios, select, ScenarioDef, ScenarioError, Sweep};
pub use sizing::{derive_sizing, DerivedSizing, OffHeapRule};
pub use sweep::{run_sweep, SweepAxis, SweepResult};
pub use trial::{run_trials, TrialBatch, TrialFailure, TrialOutcome, DEFAULT_TRIALS};

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub java: String,
    pub jar_path: String,
    pub trials: usize,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            java: command::DEFAULT_JAVA.to_string(),
            jar_path: command::DEFAULT_JAR_PATH.to_string(),
            trials: DEFAULT_TRIALS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub started_at: String,
    pub finished_at: String,
    pub result: SweepResult,
}

pub struct Harness<I: Invoker> {
    invoker: I,
    options: HarnessOptions,
}

impl<I: Invoker> Harness<I> {
    pub fn new(invoker: I, options: HarnessOptions) -> Self {
        Self { invoker, options }
    }

    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    pub fn command_for(&self, config: &Configuration) -> CommandLine {
        config.command_line(&self.options.java, &self.options.jar_path)
    }

    pub fn run_configuration(&self, config: &Configuration, metric: MetricKind) -> TrialBatch {
        let command = self.command_for(config);
        info!(command = %command, "running configuration");
        run_trials(&self.invoker, &command, metric, self.options.trials)
    }

    pub fn run_scenario(&self, def: &ScenarioDef) -> Result<ScenarioReport> {
        info!(scenario = def.name, "running {} test", def.name);
        let started_at = Utc::now().to_rfc3339();
        let points = def.configurations();
        let result = run_sweep(def.axis(), &points, |_, config| {
            Ok(self.run_configuration(config, def.metric))
        })?;
        Ok(ScenarioReport {
            scenario: def.name.to_string(),
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            result,
        })
    }

    pub fn run_scenarios<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ScenarioReport>> {
        let defs = select(names)?;
        defs.iter().map(|def| self.run_scenario(def)).collect()
    }
}
