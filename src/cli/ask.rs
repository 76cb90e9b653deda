//! Ask command handler.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};

use querybridge::agent::TurnRequest;
use querybridge::config::Config;

use super::common::create_engine;

/// Run one turn and print every frame in SSE wire form.
pub(crate) async fn cmd_ask(
    config: Config,
    question: String,
    thread: Option<String>,
    metadata: BTreeMap<String, String>,
) -> Result<()> {
    let engine = create_engine(config)?;

    let mut request = TurnRequest::new(&question).with_metadata(metadata);
    if let Some(ref thread_id) = thread {
        request = request.with_thread(thread_id);
    }

    let mut frames = engine.submit(request);
    let mut stdout = std::io::stdout();
    while let Some(frame) = frames.recv().await {
        stdout
            .write_all(frame.to_sse().as_bytes())
            .and_then(|_| stdout.flush())
            .with_context(|| "Failed to write to stdout")?;
    }
    Ok(())
}
