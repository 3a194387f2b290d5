//! `espclock watch`: print every state change until Ctrl-C.

use tokio_util::sync::CancellationToken;
use tracing::info;

use espclock_core::{Device, DeviceSnapshot};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    let mut changes = device.watch();

    device.fetch().await;
    let initial = changes.borrow_and_update().clone();
    print_state(initial.as_ref(), global)?;

    let cancel = CancellationToken::new();
    let supervisor = device.spawn_supervisor(&cancel);
    info!(host = %device.config().host, "watching device events");

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(CliError::from),
            changed = changes.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot = changes.borrow_and_update().clone();
                if let Err(e) = print_state(snapshot.as_ref(), global) {
                    break Err(e);
                }
            }
        }
    };

    supervisor.shutdown().await;
    result
}

fn print_state(snapshot: Option<&DeviceSnapshot>, global: &GlobalOpts) -> Result<(), CliError> {
    let line = match global.format() {
        OutputFormat::Table => output::summary_line(snapshot, output::should_color()),
        // One JSON document per line so the stream stays parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(&snapshot)?,
    };
    output::print_output(&line, global.quiet);
    Ok(())
}
