//! Pipeline coordinator (component K): wires the batch source, train
//! detector, buffer manager, and chunk serializer into one run, and owns
//! the per-run summary the CLI logs at completion.

use crate::buffer::BufferManager;
use crate::cli::Cli;
use crate::config::{Config, validate_config};
use crate::detect::TrainDetector;
use crate::error::Result;
use crate::serialize::ChunkSerializer;
use crate::source::{BatchSource, RawF32MatrixReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Per-run totals, logged by the CLI once the batch source is exhausted
/// (or the run is interrupted).
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineSummary {
    /// Batches pulled from the batch source and run through the detector.
    pub batches_delivered: usize,
    /// Chunks emitted by the buffer manager across all sections.
    pub chunks_emitted: usize,
    /// Fragments successfully written to disk.
    pub fragments_written: usize,
    /// Fragments dropped after a serializer error (isolated per spec.md
    /// §7: a write failure never aborts the run).
    pub fragments_dropped: usize,
}

impl PipelineSummary {
    /// Log the final summary at info level.
    pub fn log(&self) {
        info!(
            batches = self.batches_delivered,
            chunks = self.chunks_emitted,
            fragments_written = self.fragments_written,
            fragments_dropped = self.fragments_dropped,
            "pipeline run complete"
        );
    }
}

/// Apply CLI overrides to a loaded configuration.
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(files) = cli.files {
        config.batch_source.max_files = files;
    }
    if cli.binary {
        config.serializer.binary = true;
    }
    if let Some(ref output) = cli.output {
        config.serializer.output_root.clone_from(output);
    }
}

/// Run the pipeline over `config`'s batch source until exhausted or
/// interrupted, dispatching emitted chunks to the serializer when
/// `cli.save` is set.
///
/// # Errors
///
/// Returns the batch source's error immediately on an I/O failure
/// (fatal per spec.md §7: the pipeline terminates cleanly, with no
/// buffer drain) or [`crate::error::Error::ConfigValidation`] if the
/// loaded config fails validation against the batch geometry observed
/// from the first delivered batch.
pub fn run(mut config: Config, cli: &Cli) -> Result<PipelineSummary> {
    apply_cli_overrides(&mut config, cli);

    if cli.plot {
        if cli.save {
            warn!("--plot is accepted as a no-op; chunks will still be persisted via --save");
        } else {
            warn!("--plot is accepted as a no-op and --save is not set; no chunks will be persisted");
        }
    }

    if INTERRUPTED.load(Ordering::SeqCst) {
        // A previous run in this process already consumed the handler slot;
        // resetting here keeps repeated calls (e.g. in tests) independent.
        INTERRUPTED.store(false, Ordering::SeqCst);
    }
    if let Err(e) = ctrlc::set_handler(|| {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }) {
        warn!("failed to install Ctrl+C handler: {e}");
    }

    let dt = config.signal.dt();
    let mut source = BatchSource::new(&cli.data_path, RawF32MatrixReader, config.signal.clone(), &config.batch_source)?;

    let Some(first) = source.next() else {
        info!("batch source produced no batches; nothing to do");
        return Ok(PipelineSummary::default());
    };
    let first = first?;
    let t_b = first.nrows();

    let geometry = validate_config(&config, t_b, dt)?;

    let detector = TrainDetector::new(config.train_detector.clone());
    let mut buffer_manager = BufferManager::new(&config.section_map, &geometry);
    let serializer = cli.save.then(|| ChunkSerializer::new(&config.serializer, &config.signal, &config.buffer_manager));

    let mut summary = PipelineSummary::default();

    for batch in std::iter::once(Ok(first)).chain(source) {
        if INTERRUPTED.load(Ordering::SeqCst) {
            warn!("interrupted; any in-progress capture is left without a terminal fragment");
            break;
        }

        let batch = batch?;

        #[allow(clippy::cast_precision_loss)]
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64());

        let annotated = detector.detect(&batch, &config.section_map, timestamp);
        summary.batches_delivered += 1;
        debug!(batches = summary.batches_delivered, "processed batch");

        for chunk in buffer_manager.process_batch(annotated) {
            summary.chunks_emitted += 1;
            info!(
                section = %chunk.section_id,
                uuid = %chunk.uuid,
                file_chunk_index = chunk.file_chunk_index,
                complete = chunk.complete,
                rows = chunk.data.nrows(),
                cols = chunk.data.ncols(),
                "chunk emitted"
            );

            if let Some(serializer) = &serializer {
                match serializer.write(&chunk, None) {
                    Ok(path) => {
                        summary.fragments_written += 1;
                        info!(path = %path.display(), "fragment written");
                    }
                    Err(e) => {
                        summary.fragments_dropped += 1;
                        error!("failed to write fragment for section '{}': {e}", chunk.section_id);
                    }
                }
            }
        }
    }

    Ok(summary)
}
