use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::{MediaService, RawInfo, ResolutionError};
use crate::cache::{CacheKey, CacheMetrics, ResolutionCache};

/// Resolvedor de metadata con cache acotado.
///
/// Las llamadas al servicio corren en el pool bloqueante de tokio, limitadas
/// por un semáforo para no saturar yt-dlp ni los hilos bloqueantes.
pub struct MetadataResolver {
    service: Arc<dyn MediaService>,
    cache: ResolutionCache,
    workers: Semaphore,
}

impl MetadataResolver {
    pub fn new(service: Arc<dyn MediaService>, cache_size: usize, workers: usize) -> Self {
        Self {
            service,
            cache: ResolutionCache::new(cache_size),
            workers: Semaphore::new(workers.max(1)),
        }
    }

    /// Resuelve una URL o término de búsqueda.
    ///
    /// El cache solo se consulta y se llena con `flat == false`; las
    /// consultas flat enumeran playlists y siempre van al servicio.
    pub async fn resolve(&self, source_ref: &str, flat: bool) -> Result<RawInfo, ResolutionError> {
        let key = CacheKey::new(source_ref, flat);

        if !flat {
            if let Some(info) = self.cache.get(&key) {
                debug!("🎯 Cache hit para {}", source_ref);
                return Ok(info);
            }
        }

        let info = self.resolve_upstream(source_ref, flat).await?;

        if !flat {
            if let Some(evicted) = self.cache.insert(key, info.clone()) {
                debug!("🗑️ Expulsado del cache: {}", evicted.source_ref);
            }
        }

        Ok(info)
    }

    async fn resolve_upstream(&self, source_ref: &str, flat: bool) -> Result<RawInfo, ResolutionError> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|e| ResolutionError::Unknown(e.to_string()))?;

        let service = self.service.clone();
        let reference = source_ref.to_string();
        let joined = tokio::task::spawn_blocking(move || service.resolve(&reference, flat)).await;

        match joined {
            Ok(Ok(info)) => {
                info!("🔍 Resuelto: {}", info.title.as_deref().unwrap_or(source_ref));
                Ok(info)
            }
            Ok(Err(service_error)) => {
                let error = ResolutionError::from(service_error);
                match &error {
                    ResolutionError::AgeRestricted | ResolutionError::Unavailable => {
                        warn!("🚫 {} no reproducible: {}", source_ref, error)
                    }
                    ResolutionError::DownloadFailure(_) => error!("yt-dlp error: {}", error),
                    ResolutionError::Unknown(_) => {
                        error!("Error inesperado resolviendo {}: {}", source_ref, error)
                    }
                }
                Err(error)
            }
            Err(join_error) => {
                error!("❌ El worker de resolución falló: {}", join_error);
                Err(ResolutionError::Unknown(join_error.to_string()))
            }
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockMediaService, ServiceError};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn video(title: &str) -> RawInfo {
        RawInfo {
            id: Some(title.to_string()),
            title: Some(title.to_string()),
            url: Some(format!("https://cdn.example/{title}.webm")),
            webpage_url: Some(format!("https://youtu.be/{title}")),
            ..RawInfo::default()
        }
    }

    #[tokio::test]
    async fn second_full_resolution_is_served_from_cache() {
        let mut service = MockMediaService::new();
        service
            .expect_resolve()
            .times(1)
            .returning(|reference, _| Ok(video(reference)));

        let resolver = MetadataResolver::new(Arc::new(service), 50, 2);

        let first = resolver.resolve("trackA", false).await.unwrap();
        let second = resolver.resolve("trackA", false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.cache_metrics().hits, 1);
    }

    #[tokio::test]
    async fn flat_resolutions_never_touch_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut service = MockMediaService::new();
        service.expect_resolve().returning(move |reference, flat| {
            assert!(flat);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(video(reference))
        });

        let resolver = MetadataResolver::new(Arc::new(service), 50, 2);
        for _ in 0..5 {
            resolver.resolve("playlistX", true).await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(resolver.cache().is_empty());
        assert_eq!(resolver.cache_metrics(), CacheMetrics { hits: 0, misses: 0, evictions: 0 });
    }

    #[tokio::test]
    async fn overflow_evicts_earliest_inserted_key() {
        let mut service = MockMediaService::new();
        service
            .expect_resolve()
            .returning(|reference, _| Ok(video(reference)));

        let resolver = MetadataResolver::new(Arc::new(service), 3, 2);
        for name in ["a", "b", "c", "d"] {
            resolver.resolve(name, false).await.unwrap();
        }

        let cache = resolver.cache();
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&CacheKey::new("a", false)));
        assert!(cache.contains(&CacheKey::new("d", false)));
    }

    #[tokio::test]
    async fn failures_are_classified_and_not_cached() {
        let mut service = MockMediaService::new();
        service.expect_resolve().returning(|reference, _| match reference {
            "restricted" => Err(ServiceError::Download(
                "ERROR: Sign in to confirm your age".to_string(),
            )),
            "gone" => Err(ServiceError::Download("Video has been removed".to_string())),
            "broken" => Err(ServiceError::Download("HTTP Error 500".to_string())),
            _ => Err(ServiceError::Unexpected("json".to_string())),
        });

        let resolver = MetadataResolver::new(Arc::new(service), 50, 2);

        assert_eq!(
            resolver.resolve("restricted", false).await,
            Err(ResolutionError::AgeRestricted)
        );
        assert_eq!(resolver.resolve("gone", false).await, Err(ResolutionError::Unavailable));
        assert!(matches!(
            resolver.resolve("broken", false).await,
            Err(ResolutionError::DownloadFailure(_))
        ));
        assert!(matches!(
            resolver.resolve("weird", false).await,
            Err(ResolutionError::Unknown(_))
        ));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn panicking_service_maps_to_unknown() {
        let mut service = MockMediaService::new();
        service
            .expect_resolve()
            .returning(|_, _| panic!("extractor crashed"));

        let resolver = MetadataResolver::new(Arc::new(service), 50, 1);
        let result = resolver.resolve("anything", false).await;

        assert!(matches!(result, Err(ResolutionError::Unknown(_))));
    }
}
