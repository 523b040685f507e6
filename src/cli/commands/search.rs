//! Catalog search command.

use tokio::runtime::Runtime;

use crate::downloader::DownloaderRegistry;

/// What a search returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Tracks,
    Albums,
    Artists,
}

/// Search a downloader and print one result per line as `id<TAB>label`.
pub fn cmd_search(
    rt: &Runtime,
    registry: &DownloaderRegistry,
    downloader: &str,
    query: &str,
    kind: SearchKind,
    limit: usize,
) -> anyhow::Result<()> {
    let downloader = registry.get(downloader)?;
    let caps = downloader.capabilities();
    let supported = match kind {
        SearchKind::Tracks | SearchKind::Albums => caps.supports_search,
        SearchKind::Artists => caps.supports_artist_search,
    };
    if !supported {
        anyhow::bail!("{} does not support {:?} search", downloader.name(), kind);
    }

    rt.block_on(async {
        let lines: Vec<(String, String)> = match kind {
            SearchKind::Tracks => downloader
                .search_tracks(query, limit)
                .await?
                .into_iter()
                .map(|t| (t.id.clone(), t.display_name()))
                .collect(),
            SearchKind::Albums => downloader
                .search_albums(query, limit)
                .await?
                .into_iter()
                .map(|a| {
                    let artist = a.primary_artist().map(|p| p.name.clone());
                    let label = match artist {
                        Some(artist) => format!("{} - {}", artist, a.title),
                        None => a.title.clone(),
                    };
                    (a.id, label)
                })
                .collect(),
            SearchKind::Artists => downloader
                .search_artists(query, limit)
                .await?
                .into_iter()
                .map(|a| (a.id, a.name))
                .collect(),
        };

        if lines.is_empty() {
            println!("No results for {:?}", query);
        }
        for (id, label) in lines {
            println!("{}\t{}", id, label);
        }
        Ok::<_, anyhow::Error>(())
    })
}
