mod args;
mod shutdown;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use streamguard_core::{
    Decision, EscalationPolicy, InjectedFailureTransform, RunOutcome, Settings, StreamRunner,
};

use crate::args::{Args, Command};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("streamguard: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run { config, input, fail_on, json } => {
            run_stream(&config, input.as_deref(), fail_on, json)
        }
        Command::InitConfig { output, max_failures, max_time_millis } => {
            init_config(output.as_deref(), max_failures, max_time_millis)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_stream(config: &Path, input: Option<&Path>, fail_on: Vec<u64>, json: bool) -> Result<ExitCode> {
    let settings = Settings::load(config)
        .with_context(|| format!("could not load configuration from {}", config.display()))?;
    let escalation = settings.escalation()?;
    tracing::info!(
        application = %settings.application_id,
        input = %settings.input_topic,
        output = %settings.output_topic,
        max_failures = escalation.max_failures(),
        max_time_millis = escalation.max_time_interval_ms(),
        "starting stream"
    );

    let policy = Arc::new(EscalationPolicy::new(escalation));
    let runner = StreamRunner::new(settings.application_id.clone(), policy.clone());
    shutdown::install_shutdown_hook(runner.shutdown_signal())?;
    let mut transform = InjectedFailureTransform::new(fail_on);

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("could not open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let records = reader.lines().map_while(|line| match line {
        Ok(l) => Some(l),
        Err(e) => {
            tracing::error!(error = %e, "input read failed; ending stream");
            None
        }
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = runner.run(&mut transform, records, &mut out)?;

    if json {
        for decision in &report.decisions {
            eprintln!("{}", decision_json(decision));
        }
    }
    let stats = policy.stats();
    tracing::info!(
        outcome = %report.outcome,
        processed = report.processed,
        restarts = report.restarts,
        escalations = stats.escalations,
        "stream finished"
    );

    Ok(match report.outcome {
        RunOutcome::ApplicationShutdown { .. } => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    })
}

fn decision_json(d: &Decision) -> serde_json::Value {
    serde_json::json!({
        "record": d.record,
        "attempt": d.attempt,
        "action": d.action,
        "cause": d.cause,
    })
}

fn init_config(output: Option<&Path>, max_failures: i64, max_time_millis: i64) -> Result<()> {
    let settings = Settings { max_failures, max_time_millis, ..Settings::default() };
    settings.escalation()?;
    let body = settings.to_toml_string()?;
    match output {
        Some(path) => std::fs::write(path, body)
            .with_context(|| format!("could not write {}", path.display()))?,
        None => print!("{body}"),
    }
    Ok(())
}
