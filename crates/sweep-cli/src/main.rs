use anyhow::Result;
use clap::Parser;
use serde_json::{json, Value};
use std::time::Duration;
use sweep_runner::{Harness, HarnessOptions, ProcessInvoker, ScenarioReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sweep", version = "0.3.0", about = "Synchrobench sweep harness")]
struct Cli {
    #[arg(required_unless_present = "list")]
    scenarios: Vec<String>,
    #[arg(long)]
    list: bool,
    #[arg(long, default_value = sweep_runner::command::DEFAULT_JAVA)]
    java: String,
    #[arg(long, default_value = sweep_runner::command::DEFAULT_JAR_PATH)]
    jar: String,
    #[arg(long)]
    timeout_seconds: Option<u64>,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();
    let json_mode = cli.json;
    match run_command(cli) {
        Ok(payload) => {
            if let Some(payload) = payload {
                println!("{}", payload);
            }
            Ok(())
        }
        Err(err) if json_mode => {
            println!("{}", failure_payload(&err));
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(cli: Cli) -> Result<Option<Value>> {
    if cli.list {
        let all = sweep_runner::scenarios();
        if cli.json {
            return Ok(Some(json!({
                "ok": true,
                "command": "list",
                "scenarios": all.iter().map(|s| json!({
                    "name": s.name,
                    "about": s.about,
                    "axis": s.axis().as_str(),
                })).collect::<Vec<_>>()
            })));
        }
        for s in all {
            println!("{}: {} (sweeps {})", s.name, s.about, s.axis().as_str());
        }
        return Ok(None);
    }

    let invoker = ProcessInvoker::new(cli.timeout_seconds.map(Duration::from_secs));
    let options = HarnessOptions {
        java: cli.java,
        jar_path: cli.jar,
        ..HarnessOptions::default()
    };
    let harness = Harness::new(invoker, options);
    info!(scenarios = ?cli.scenarios, jar = %harness.options().jar_path, "starting sweep");
    let reports = harness.run_scenarios(cli.scenarios.as_slice())?;
    if cli.json {
        return Ok(Some(json!({
            "ok": true,
            "command": "run",
            "scenarios": reports.iter().map(report_to_json).collect::<Vec<_>>()
        })));
    }
    for report in &reports {
        print_report(report);
    }
    Ok(None)
}

// Errors carry their code as the `code: message` prefix of the top-level message.
fn failure_payload(err: &anyhow::Error) -> Value {
    let message = err.to_string();
    let code = message
        .split_once(": ")
        .map(|(code, _)| code)
        .filter(|code| !code.contains(' '))
        .unwrap_or("command_failed");
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "causes": err.chain().skip(1).map(|c| c.to_string()).collect::<Vec<_>>(),
        }
    })
}

fn report_to_json(report: &ScenarioReport) -> Value {
    json!({
        "scenario": report.scenario,
        "axis": report.result.axis.as_str(),
        "started_at": report.started_at,
        "finished_at": report.finished_at,
        "results": report.result.entries.iter().map(|e| json!({
            "key": e.key,
            "aggregated": e.aggregated,
            "values": e.batch.values(),
            "failures": e.batch.failures(),
        })).collect::<Vec<_>>()
    })
}

fn print_report(report: &ScenarioReport) {
    println!("scenario: {}", report.scenario);
    println!("axis: {}", report.result.axis.as_str());
    for (key, sentinel) in report.result.sentinels() {
        println!("{}: {}", key, sentinel);
    }
}
