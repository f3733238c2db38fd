//! # Sources Module
//!
//! Everything that turns a user reference (URL or search term) into
//! playable metadata.
//!
//! - [`MediaService`]: blocking seam over the upstream extractor
//!   ([`ytdlp::YtDlpService`] in production).
//! - [`resolver::MetadataResolver`]: async front with the bounded cache and
//!   error classification.
//! - [`RawInfo`] / [`PlaylistEntry`]: the extractor's JSON, as received.

pub mod resolver;
pub mod ytdlp;

use serde::Deserialize;
use thiserror::Error;

pub use resolver::MetadataResolver;
pub use ytdlp::YtDlpService;

/// Metadata completa tal como la devuelve el extractor.
///
/// Los campos pesados (`formats`, `thumbnails`, subtítulos) se conservan sin
/// interpretar; nunca llegan a la cola, ver [`crate::audio::queue::QueueItem`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// URL directa del stream de audio (solo en resoluciones de un video).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    /// Presente solo en playlists y búsquedas; las entradas nulas se conservan.
    #[serde(default)]
    pub entries: Option<Vec<Option<PlaylistEntry>>>,
    #[serde(default)]
    pub formats: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub thumbnails: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub subtitles: Option<serde_json::Value>,
    #[serde(default)]
    pub automatic_captions: Option<serde_json::Value>,
}

impl RawInfo {
    pub fn is_playlist(&self) -> bool {
        self.entries.is_some()
    }

    pub fn has_stream(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// Entrada de una playlist obtenida en modo flat (sin stream resuelto).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl PlaylistEntry {
    /// Referencia a resolver: la URL de la entrada o la URL de YouTube
    /// construida a partir del ID.
    pub fn source_ref(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }

        let id = self.id.as_deref().filter(|id| !id.is_empty())?;
        url::Url::parse_with_params("https://www.youtube.com/watch", &[("v", id)])
            .ok()
            .map(String::from)
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }
}

/// Fallos reportados por el servicio de resolución.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// El extractor corrió y reportó un error (texto tal cual).
    #[error("download failed: {0}")]
    Download(String),
    /// Cualquier otra cosa: no se pudo lanzar, salida ilegible, etc.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// Servicio bloqueante que resuelve una referencia a metadata.
///
/// Se invoca siempre desde el pool bloqueante de tokio.
#[cfg_attr(test, mockall::automock)]
pub trait MediaService: Send + Sync {
    fn resolve(&self, reference: &str, flat: bool) -> Result<RawInfo, ServiceError>;
}

/// Error de resolución clasificado.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("age-restricted or requires sign-in")]
    AgeRestricted,
    #[error("unavailable or removed")]
    Unavailable,
    #[error("download failed: {0}")]
    DownloadFailure(String),
    #[error("unknown error: {0}")]
    Unknown(String),
}

const AGE_RESTRICTED_MARKERS: &[&str] = &["sign in", "age", "private"];
const UNAVAILABLE_MARKERS: &[&str] = &["not available", "removed"];

impl ResolutionError {
    /// Clasifica el texto de error del extractor por palabras clave.
    ///
    /// Es una heurística: depende del idioma y la versión de yt-dlp.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        if AGE_RESTRICTED_MARKERS.iter().any(|m| lower.contains(m)) {
            ResolutionError::AgeRestricted
        } else if UNAVAILABLE_MARKERS.iter().any(|m| lower.contains(m)) {
            ResolutionError::Unavailable
        } else {
            ResolutionError::DownloadFailure(message.to_string())
        }
    }

    pub fn is_age_restricted(&self) -> bool {
        matches!(self, ResolutionError::AgeRestricted)
    }
}

impl From<ServiceError> for ResolutionError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Download(message) => ResolutionError::classify(&message),
            ServiceError::Unexpected(message) => ResolutionError::Unknown(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_age_restriction_family() {
        for text in [
            "ERROR: [youtube] abc: Sign in to confirm your age",
            "This video is private",
            "Age-restricted video",
        ] {
            assert_eq!(ResolutionError::classify(text), ResolutionError::AgeRestricted);
        }
    }

    #[test]
    fn classifies_unavailable_family() {
        assert_eq!(
            ResolutionError::classify("ERROR: Video not available in your country"),
            ResolutionError::Unavailable
        );
        assert_eq!(
            ResolutionError::classify("This video has been removed by the uploader"),
            ResolutionError::Unavailable
        );
    }

    #[test]
    fn other_download_errors_keep_their_text() {
        let error = ResolutionError::classify("HTTP Error 503");
        assert_eq!(error, ResolutionError::DownloadFailure("HTTP Error 503".to_string()));
    }

    #[test]
    fn unexpected_service_errors_are_unknown() {
        let error = ResolutionError::from(ServiceError::Unexpected("boom".to_string()));
        assert_eq!(error, ResolutionError::Unknown("boom".to_string()));
    }

    #[test]
    fn entry_falls_back_to_watch_url() {
        let entry = PlaylistEntry {
            id: Some("dQw4w9WgXcQ".to_string()),
            url: None,
            title: None,
        };
        assert_eq!(
            entry.source_ref().as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
        assert_eq!(entry.display_title(), "Unknown");
    }

    #[test]
    fn entry_without_reference_is_unusable() {
        assert_eq!(PlaylistEntry::default().source_ref(), None);
    }

    #[test]
    fn parses_flat_playlist_json_with_null_entries() {
        let json = r#"{
            "id": "PL1",
            "title": "Mix",
            "_type": "playlist",
            "entries": [
                {"id": "a", "url": "https://www.youtube.com/watch?v=a", "title": "A"},
                null,
                {"id": "b", "title": "B"}
            ]
        }"#;

        let info: RawInfo = serde_json::from_str(json).unwrap();
        assert!(info.is_playlist());
        assert!(!info.has_stream());
        let entries = info.entries.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[1].is_none());
    }
}
