use std::io::Write;

use fanline_core::api::{AppConfig, CliError, ClientState, EventSink, ProgressEvent, RunControl};
use fanline_plugins::factory;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::UnboundedReceiver;

use super::cli::{OutputFormat, RunArgs};
use crate::render::{summary, JsonlWriter, ProgressRenderer};

pub async fn read_request(args: &RunArgs) -> Result<String, CliError> {
    let raw = if let Some(text) = &args.request {
        text.clone()
    } else if let Some(path) = &args.request_file {
        tokio::fs::read_to_string(path).await?
    } else if args.stdin {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        return Err(CliError::Command(
            "one of --request, --request-file or --stdin is required".into(),
        ));
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::Command("request is empty".into()));
    }
    Ok(trimmed.to_string())
}

pub fn apply_overrides(cfg: &mut AppConfig, args: &RunArgs) {
    if let Some(n) = args.max_tasks {
        cfg.pipeline.max_tasks = n.max(1);
    }
    if let Some(secs) = args.timeout_secs {
        cfg.pipeline.task_timeout_secs = secs.max(1);
    }
}

pub async fn render_jsonl<W: Write>(
    mut rx: UnboundedReceiver<ProgressEvent>,
    out: W,
) -> Result<ClientState, CliError> {
    let mut writer = JsonlWriter::new(out);
    let mut state = ClientState::default();
    while let Some(event) = rx.recv().await {
        state = fanline_core::api::reduce(&state, &event);
        writer.write_event(&event)?;
    }
    Ok(state)
}

pub async fn render_text(
    mut rx: UnboundedReceiver<ProgressEvent>,
    draw: bool,
) -> Result<ClientState, CliError> {
    let mut renderer = ProgressRenderer::new(draw);
    while let Some(event) = rx.recv().await {
        renderer.apply(&event);
    }
    let state = renderer.finish();
    print!("{}", summary(&state));
    Ok(state)
}

/// Runs one request to completion. Ctrl-C cancels the tasks in flight; the
/// run still ends with its batch report.
pub async fn handle_run(args: RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    let request = read_request(&args).await?;
    apply_overrides(&mut cfg, &args);
    let pipeline = factory::build_pipeline(&cfg)?;

    let control = RunControl::new();
    let interrupt = {
        let control = control.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; cancelling active tasks");
                control.cancel_all();
            }
        })
    };

    let (sink, rx) = EventSink::channel();
    let run = async move {
        let outcome = pipeline.run(&request, &sink, &control).await;
        drop(sink);
        outcome
    };
    let render = async {
        match args.format {
            OutputFormat::Jsonl => render_jsonl(rx, std::io::stdout()).await,
            OutputFormat::Text => render_text(rx, atty::is(atty::Stream::Stderr)).await,
        }
    };

    let (outcome, rendered) = tokio::join!(run, render);
    interrupt.abort();
    rendered?;

    let report = outcome?;
    tracing::info!(
        run_id = %report.run_id,
        duration_ms = report.duration_ms,
        tasks = report.outcomes.len(),
        "run finished"
    );
    Ok(0)
}
