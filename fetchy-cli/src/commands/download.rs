//! Download command - fetch one URL with a live progress bar.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fetchy::{DownloadHandle, Downloader, FetchConfig, ProgressSnapshot, ResourceMetadata};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use super::format_optional_size;
use crate::error::CliError;

/// Arguments for the download command.
pub struct DownloadArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub threads: usize,
    pub quiet: bool,
}

/// Run the download command.
pub fn run(args: DownloadArgs) -> Result<(), CliError> {
    debug!(url = %args.url, threads = args.threads, "Running download command");
    let downloader = Downloader::new(FetchConfig::default().with_default_threads(args.threads))?;

    // Set up signal handler for graceful cancellation
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    let handle = downloader.start(&args.url, args.output, Some(args.threads));

    // The summary comes from the session's own probe, not a second request.
    let Some((metadata, output)) = wait_for_target(&handle, &interrupted) else {
        let outcome = handle.await_completion();
        debug!(state = %outcome.state, message = %outcome.message, "Session ended before connecting");
        return if interrupted.load(Ordering::SeqCst) {
            Err(CliError::Cancelled)
        } else {
            Err(CliError::Connect(args.url))
        };
    };

    if metadata.total_size.unwrap_or(0) == 0 {
        eprintln!("Warning: Could not determine file size. Progress will show bytes only.");
    }

    if !args.quiet {
        println!("File:    {}", output.display());
        println!("Size:    {}", format_optional_size(metadata.total_size));
        println!("Threads: {}", metadata.effective_threads(args.threads));
        println!();
    }

    let bar = progress_bar(metadata.total_size, args.quiet);
    let bar_clone = bar.clone();
    let reporter = handle.reporter(
        Box::new(move |snapshot: ProgressSnapshot| bar_clone.set_position(snapshot.bytes_downloaded)),
        Duration::from_millis(100),
    );

    while !handle.is_finished() {
        if interrupted.load(Ordering::SeqCst) && !handle.is_cancelled() {
            bar.println("Interrupted, cancelling download...");
            handle.cancel();
        }
        thread::sleep(Duration::from_millis(100));
    }

    let outcome = handle.await_completion();
    reporter.stop();
    debug!(state = %outcome.state, bytes = outcome.bytes, "Download command finished");

    if outcome.success {
        bar.finish();
        if let Some(warning) = outcome.warning {
            eprintln!("Warning: {}", warning);
        }
        if !args.quiet {
            let path = outcome
                .output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!("Download completed: {}", path);
        }
        Ok(())
    } else if interrupted.load(Ordering::SeqCst) {
        bar.abandon();
        Err(CliError::Cancelled)
    } else {
        bar.abandon();
        Err(CliError::DownloadFailed(outcome.message))
    }
}

/// Wait until the session has probed the resource and chosen its output.
///
/// Returns `None` if the session ends first.
fn wait_for_target(
    handle: &DownloadHandle,
    interrupted: &AtomicBool,
) -> Option<(ResourceMetadata, PathBuf)> {
    loop {
        // Output is published after metadata, so both are present once it is.
        if let Some(output) = handle.output_path() {
            return handle.metadata().map(|metadata| (metadata, output));
        }
        if handle.is_finished() {
            return None;
        }
        if interrupted.load(Ordering::SeqCst) && !handle.is_cancelled() {
            handle.cancel();
        }
        thread::sleep(Duration::from_millis(20));
    }
}

fn progress_bar(total_size: Option<u64>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    match total_size.filter(|&size| size > 0) {
        Some(size) => {
            let bar = ProgressBar::new(size);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} {bytes} ({bytes_per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        }
    }
}
