//! The download command.

use std::io::Write;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::cover::ArtworkResolver;
use crate::downloader::DownloaderRegistry;
use crate::pipeline::{DownloadPipeline, DownloadRequest, JobContext, JobRecord};

/// Run one download request, cancelling it on Ctrl+C.
pub fn cmd_download(
    rt: &Runtime,
    registry: Arc<DownloaderRegistry>,
    config: &Config,
    request: &DownloadRequest,
    json: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let resolver = Arc::new(ArtworkResolver::new(&config.artwork)?);
        let pipeline = DownloadPipeline::new(registry, resolver, config);

        let ctx = JobContext::new()
            .with_record(JobRecord::new(request.placeholder_name()))
            .with_progress(|percent, message| {
                eprint!("\r[{:>3}%] {:<40}", percent, message);
                let _ = std::io::stderr().flush();
            });

        let cancel = ctx.cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling...");
                cancel.cancel();
            }
        });

        let outcome = pipeline.run(request, &ctx).await;
        watcher.abort();
        eprintln!();
        let result = outcome?;

        if json {
            println!("{}", serde_json::to_string_pretty(&result.to_json())?);
        } else {
            println!("{}", ctx.record.lock().name);
            println!(
                "Downloaded {} tracks ({} tagged, {} skipped)",
                result.track_count, result.tagged, result.skipped
            );
            for path in &result.file_paths {
                println!("  {}", path.display());
            }
        }
        Ok::<_, anyhow::Error>(())
    })
}
