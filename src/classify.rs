//! Single-item vs. collection classification.

use crate::backend::{Classification, MediaBackend};
use crate::error::{Error, Result};

/// Classifies `url` with a flat backend query.
///
/// Any backend failure to resolve the link surfaces as [`Error::InvalidLink`];
/// local failures (I/O, missing tools) pass through unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidLink`] when the backend cannot resolve the URL.
pub async fn classify<B: MediaBackend + ?Sized>(backend: &B, url: &str) -> Result<Classification> {
    match backend.classify(url).await {
        Ok(mut found) => {
            if !found.is_collection {
                found.item_count = 1;
            }
            log::info!(
                "Classified {url}: {} ({} item(s), collection={})",
                found.title,
                found.item_count,
                found.is_collection
            );
            Ok(found)
        }
        Err(e @ (Error::InvalidLink { .. } | Error::Io(_) | Error::MissingTranscoder(_))) => Err(e),
        Err(e) => Err(Error::InvalidLink {
            url: url.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DownloadOptions, MediaManifest, TransferSink};
    use async_trait::async_trait;

    struct Fixed(fn() -> Result<Classification>);

    #[async_trait]
    impl MediaBackend for Fixed {
        async fn classify(&self, _url: &str) -> Result<Classification> {
            (self.0)()
        }
        async fn fetch_manifest(&self, _url: &str, _selector: &str) -> Result<MediaManifest> {
            unreachable!("classifier never fetches manifests")
        }
        async fn download(
            &self,
            _url: &str,
            _options: &DownloadOptions,
            _sink: &mut dyn TransferSink,
        ) -> Result<()> {
            unreachable!("classifier never downloads")
        }
        async fn ensure_transcoder(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_items_report_one_entry() {
        let backend = Fixed(|| {
            Ok(Classification {
                is_collection: false,
                item_count: 0,
                title: "clip".into(),
            })
        });
        let found = classify(&backend, "https://x.test/v").await.unwrap();
        assert!(!found.is_collection);
        assert_eq!(found.item_count, 1);
    }

    #[tokio::test]
    async fn collections_keep_their_count() {
        let backend = Fixed(|| {
            Ok(Classification {
                is_collection: true,
                item_count: 5,
                title: "mix".into(),
            })
        });
        let found = classify(&backend, "https://x.test/list").await.unwrap();
        assert_eq!(found.item_count, 5);
        assert_eq!(found.title, "mix");
    }

    #[tokio::test]
    async fn backend_failures_become_invalid_link() {
        let backend = Fixed(|| Err(Error::Backend("HTTP Error 404".into())));
        let err = classify(&backend, "https://x.test/gone").await.unwrap_err();
        assert!(
            matches!(err, Error::InvalidLink { ref url, .. } if url == "https://x.test/gone")
        );
    }
}
