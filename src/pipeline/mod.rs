//! Download pipeline - turns a request into tagged files on disk.
//!
//! For every request the pipeline:
//! 1. Resolves the downloader from the registry
//! 2. Plans the items (listing them when the provider can, or calling its
//!    bulk entry point)
//! 3. Downloads, normalizes and validates each item
//! 4. Resolves artwork and writes tags
//!
//! Single-track jobs fail on the first error. Batch jobs skip items that
//! fail to download, validate or tag, and stop at once when cancelled. Files already written stay on disk.

mod progress;
mod request;
mod result;

pub use progress::{
    CancellationToken, JobContext, JobRecord, ProgressReporter, ProgressSink, scale,
};
pub use request::{DownloadRequest, DownloadTarget, RequestKind};
pub use result::PipelineResult;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ArtworkConfig, Config, DownloadConfig};
use crate::cover::{ArtworkPolicy, ArtworkResolver, ResolvedArtwork, save_local_cover};
use crate::downloader::{ByteProgress, Downloader, DownloaderError, DownloaderRegistry};
use crate::error::{Error, Result, ResultExt};
use crate::metadata;
use crate::model::Track;
use crate::tagger::TagWriter;

/// How the items of a multi-track request are fetched.
#[derive(Debug, PartialEq, Eq)]
enum Plan {
    /// Download these track IDs one at a time
    Items(Vec<String>),
    /// Let the provider download everything in one call
    Bulk,
}

/// State of one running job.
struct Job<'a> {
    request: &'a DownloadRequest,
    ctx: &'a JobContext,
    progress: &'a ProgressReporter,
    downloader: Arc<dyn Downloader>,
    dir: PathBuf,
}

impl Job<'_> {
    fn unsupported(&self) -> Error {
        Error::UnsupportedDownloadType {
            downloader: self.downloader.name().to_string(),
            kind: self.request.kind().to_string(),
        }
    }

    fn provider_error(&self, e: DownloaderError) -> Error {
        if e.is_not_supported() {
            self.unsupported()
        } else {
            Error::download(self.downloader.name(), e)
        }
    }
}

/// The download-and-tag pipeline.
pub struct DownloadPipeline {
    registry: Arc<DownloaderRegistry>,
    resolver: Arc<ArtworkResolver>,
    tagger: TagWriter,
    policy: ArtworkPolicy,
    download: DownloadConfig,
    artwork: ArtworkConfig,
}

impl DownloadPipeline {
    pub fn new(
        registry: Arc<DownloaderRegistry>,
        resolver: Arc<ArtworkResolver>,
        config: &Config,
    ) -> Self {
        let policy = ArtworkPolicy::from(&config.artwork);
        Self {
            registry,
            resolver,
            tagger: TagWriter::new(policy),
            policy,
            download: config.download.clone(),
            artwork: config.artwork.clone(),
        }
    }

    /// Execute `request`, reporting through `ctx`.
    pub async fn run(&self, request: &DownloadRequest, ctx: &JobContext) -> Result<PipelineResult> {
        let progress = ProgressReporter::new(ctx.progress.clone());
        tracing::info!(
            "Starting {} download {} via {}",
            request.kind(),
            request.item_id(),
            request.downloader
        );

        let outcome = self.execute(request, ctx, &progress).await;

        match &outcome {
            Ok(result) => {
                progress.complete("Done");
                tracing::info!(
                    "Finished {} {}: {} tracks ({} tagged, {} skipped)",
                    result.kind,
                    result.item_id,
                    result.track_count,
                    result.tagged,
                    result.skipped
                );
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!("{} download {} cancelled", request.kind(), request.item_id());
            }
            Err(e) => {
                tracing::error!("{} download {} failed: {}", request.kind(), request.item_id(), e);
            }
        }
        outcome
    }

    async fn execute(
        &self,
        request: &DownloadRequest,
        ctx: &JobContext,
        progress: &ProgressReporter,
    ) -> Result<PipelineResult> {
        ctx.cancel.check()?;
        let downloader = self.registry.get(&request.downloader)?;

        let dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| self.download.root.clone());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(format!("creating download directory {}", dir.display()))?;

        let job = Job {
            request,
            ctx,
            progress,
            downloader,
            dir,
        };
        progress.report(5, "Starting download");

        match &request.target {
            DownloadTarget::Track { track_id } => self.run_track(&job, track_id).await,
            _ => self.run_batch(&job).await,
        }
    }

    async fn run_track(&self, job: &Job<'_>, track_id: &str) -> Result<PipelineResult> {
        let mut result = PipelineResult::new(RequestKind::Track, track_id);

        let on_bytes =
            |done: u64, total: u64| job.progress.report_scaled(25, 75, done, total, "Downloading");
        let on_bytes: &ByteProgress<'_> = &on_bytes;
        let mut track = job
            .downloader
            .download_track(track_id, &job.dir, Some(on_bytes))
            .await
            .map_err(|e| job.provider_error(e))?;
        self.enrich_record(job, &track, &mut result);

        job.progress.report(75, "Processing metadata");
        metadata::normalize(&mut track)?;

        job.progress.report(80, "Resolving artwork");
        let artwork = self.resolve_artwork(&track).await;

        let mut tagged = false;
        if self.download.tag_files {
            job.progress.report(90, "Writing tags");
            self.write_tags(&track, artwork.as_ref()).await?;
            tagged = true;
        }
        self.save_cover(&track, artwork).await;

        result.push(track.path.clone(), tagged);
        Ok(result)
    }

    async fn run_batch(&self, job: &Job<'_>) -> Result<PipelineResult> {
        let mut result = PipelineResult::new(job.request.kind(), job.request.item_id());

        match self.plan(job).await? {
            Plan::Items(ids) => self.download_items(job, &ids, &mut result).await?,
            Plan::Bulk => self.download_bulk(job, &mut result).await?,
        }
        Ok(result)
    }

    /// Decide how to fetch the items, checking capabilities first.
    async fn plan(&self, job: &Job<'_>) -> Result<Plan> {
        let caps = job.downloader.capabilities();
        let downloader = job.downloader.as_ref();

        let listed = match &job.request.target {
            DownloadTarget::Track { track_id } => return Ok(Plan::Items(vec![track_id.clone()])),
            DownloadTarget::Batch { track_ids } => return Ok(Plan::Items(track_ids.clone())),
            DownloadTarget::Playlist { playlist_id } => {
                if !caps.supports_playlists {
                    return Err(job.unsupported());
                }
                downloader.playlist_tracks(playlist_id).await
            }
            DownloadTarget::Link { .. } if !caps.supports_direct_links => {
                return Err(job.unsupported());
            }
            _ if !caps.supports_track_listing => return Ok(Plan::Bulk),
            DownloadTarget::Album { album_id } => downloader.album_tracks(album_id).await,
            DownloadTarget::Artist { artist_id } => artist_tracks(downloader, artist_id).await,
            DownloadTarget::Link { url } => downloader.resolve_link(url).await,
        };

        let tracks = listed.map_err(|e| job.provider_error(e))?;
        tracing::debug!("Planned {} items for {}", tracks.len(), job.request.item_id());
        Ok(Plan::Items(tracks.into_iter().map(|t| t.id).collect()))
    }

    async fn download_items(
        &self,
        job: &Job<'_>,
        ids: &[String],
        result: &mut PipelineResult,
    ) -> Result<()> {
        let total = ids.len() as u64;
        for (i, id) in ids.iter().enumerate() {
            job.ctx.cancel.check()?;

            let from = scale(10, 95, i as u64, total);
            let to = scale(10, 95, i as u64 + 1, total);
            job.progress
                .report(from, &format!("Downloading {} of {}", i + 1, total));

            let on_bytes =
                |done: u64, len: u64| job.progress.report_scaled(from, to, done, len, "Downloading");
            let on_bytes: &ByteProgress<'_> = &on_bytes;
            match job.downloader.download_track(id, &job.dir, Some(on_bytes)).await {
                Ok(track) => self.process_item(job, track, result).await,
                Err(e) if e.is_not_supported() => return Err(job.unsupported()),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", id, e);
                    result.skipped += 1;
                }
            }
        }
        Ok(())
    }

    async fn download_bulk(&self, job: &Job<'_>, result: &mut PipelineResult) -> Result<()> {
        let on_progress =
            |done: u64, total: u64| job.progress.report_scaled(10, 50, done, total, "Downloading");
        let on_progress: &ByteProgress<'_> = &on_progress;
        let downloader = job.downloader.as_ref();
        let dir = job.dir.as_path();

        let tracks = match &job.request.target {
            DownloadTarget::Album { album_id } => {
                downloader.download_album(album_id, dir, Some(on_progress)).await
            }
            DownloadTarget::Artist { artist_id } => {
                downloader.download_artist(artist_id, dir, Some(on_progress)).await
            }
            DownloadTarget::Link { url } => downloader.download_link(url, dir, Some(on_progress)).await,
            _ => Err(DownloaderError::unsupported("bulk download")),
        }
        .map_err(|e| job.provider_error(e))?;

        let total = tracks.len() as u64;
        for (i, track) in tracks.into_iter().enumerate() {
            job.ctx.cancel.check()?;
            job.progress
                .report_scaled(50, 95, i as u64, total, "Tagging");
            self.process_item(job, track, result).await;
        }
        Ok(())
    }

    /// Normalize, tag and record one downloaded batch item.
    async fn process_item(&self, job: &Job<'_>, mut track: Track, result: &mut PipelineResult) {
        self.enrich_record(job, &track, result);
        let name = track.display_name();

        if let Err(e) = metadata::normalize(&mut track) {
            tracing::warn!("Skipping {}: {}", name, e);
            result.skipped += 1;
            return;
        }

        let artwork = self.resolve_artwork(&track).await;
        let tagged = self.download.tag_files;
        if tagged && let Err(e) = self.write_tags(&track, artwork.as_ref()).await {
            tracing::warn!("Skipping {}: {}", name, e);
            result.skipped += 1;
            return;
        }
        self.save_cover(&track, artwork).await;

        result.push(track.path.clone(), tagged);
    }

    /// Best-effort artwork; `None` when disabled, absent or broken.
    async fn resolve_artwork(&self, track: &Track) -> Option<ResolvedArtwork> {
        if !self.artwork.embed && !self.artwork.save_local {
            return None;
        }
        match self.resolver.resolve(track, &self.policy).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("No artwork for {}: {}", track.display_name(), e);
                None
            }
        }
    }

    async fn write_tags(&self, track: &Track, artwork: Option<&ResolvedArtwork>) -> Result<()> {
        let picture = artwork
            .filter(|_| self.artwork.embed)
            .map(|resolved| resolved.artwork.clone());
        self.tagger.write_blocking(track.clone(), picture).await
    }

    async fn save_cover(&self, track: &Track, artwork: Option<ResolvedArtwork>) {
        if !self.artwork.save_local {
            return;
        }
        let (Some(resolved), Some(path)) = (artwork, track.path.clone()) else {
            return;
        };

        let track = track.clone();
        let template = self.artwork.local_filename.clone();
        let policy = self.policy;
        let size = self.artwork.local_size;
        let saved = tokio::task::spawn_blocking(move || {
            save_local_cover(&path, &track, &resolved, &template, &policy, size)
        })
        .await;

        match saved {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("Failed to save cover file: {}", e),
            Err(e) => tracing::warn!("Cover file task failed: {}", e),
        }
    }

    /// Name the job after the first fetched item and attach its metadata.
    fn enrich_record(&self, job: &Job<'_>, track: &Track, result: &mut PipelineResult) {
        let kind = job.request.kind();
        let title = display_title(kind, track);
        if result.title.is_none() {
            result.title = title.clone();
        }

        let mut record = job.ctx.record.lock();
        let placeholder = {
            let name = record.name.trim();
            name.is_empty() || name == job.request.placeholder_name()
        };
        if placeholder && let Some(title) = title {
            tracing::debug!("Job renamed to {}", title);
            record.name = title;
        }
        for (key, value) in job_metadata(kind, track) {
            record.metadata.entry(key.to_string()).or_insert(value);
        }
    }
}

async fn artist_tracks(
    downloader: &dyn Downloader,
    artist_id: &str,
) -> std::result::Result<Vec<Track>, DownloaderError> {
    let mut tracks = Vec::new();
    for album in downloader.artist_albums(artist_id).await? {
        tracks.extend(downloader.album_tracks(&album.id).await?);
    }
    Ok(tracks)
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn album_artist(track: &Track) -> Option<String> {
    track
        .album_artist_names()
        .first()
        .and_then(|name| non_blank(name))
}

fn album_title(track: &Track) -> Option<String> {
    track.album.as_ref().and_then(|a| non_blank(&a.title))
}

/// Display title of the job for `kind`, derived from one of its tracks.
fn display_title(kind: RequestKind, track: &Track) -> Option<String> {
    match kind {
        RequestKind::Album => match (album_artist(track), album_title(track)) {
            (Some(artist), Some(album)) => Some(format!("{} - {}", artist, album)),
            (None, album) => album,
            (Some(_), None) => None,
        },
        RequestKind::Artist => album_artist(track),
        _ => non_blank(&track.title).map(|_| track.display_name()),
    }
}

fn job_metadata(kind: RequestKind, track: &Track) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if !matches!(kind, RequestKind::Album | RequestKind::Artist)
        && let Some(title) = non_blank(&track.full_title())
    {
        fields.push(("trackTitle", title));
    }
    if matches!(kind, RequestKind::Track | RequestKind::Album)
        && let Some(album) = album_title(track)
    {
        fields.push(("albumTitle", album));
    }
    let artist = match kind {
        RequestKind::Album | RequestKind::Artist => album_artist(track),
        _ => track.primary_artist().and_then(|a| non_blank(&a.name)),
    };
    if let Some(artist) = artist {
        fields.push(("artistName", artist));
    }
    fields
}
