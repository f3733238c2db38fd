use std::process::{Command, Output};
use tracing::debug;

use super::{MediaService, RawInfo, ServiceError};

/// Opciones de invocación de yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    pub binary: String,
    /// Dirección local de salida (fija la interfaz de red).
    pub source_address: String,
    pub extractor_retries: u32,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            source_address: "0.0.0.0".to_string(),
            extractor_retries: 1,
        }
    }
}

/// Servicio de resolución que ejecuta yt-dlp y parsea su JSON.
///
/// Es bloqueante: [`super::MetadataResolver`] lo llama desde `spawn_blocking`.
#[derive(Debug, Clone, Default)]
pub struct YtDlpService {
    options: YtDlpOptions,
}

impl YtDlpService {
    pub fn new(options: YtDlpOptions) -> Self {
        Self { options }
    }

    fn args(&self, reference: &str, flat: bool) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-single-json",
            "--skip-download",
            "--format",
            "bestaudio/best",
            "--default-search",
            "ytsearch",
            "--no-check-certificate",
            "--quiet",
            "--no-warnings",
            "--no-color",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.push("--source-address".to_string());
        args.push(self.options.source_address.clone());
        args.push("--extractor-retries".to_string());
        args.push(self.options.extractor_retries.to_string());

        if flat {
            args.push("--flat-playlist".to_string());
        } else {
            args.push("--yes-playlist".to_string());
        }

        // Fin de opciones: la referencia puede empezar por '-'
        args.push("--".to_string());
        args.push(reference.to_string());
        args
    }

    fn parse_output(output: Output) -> Result<RawInfo, ServiceError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("yt-dlp terminó con estado {}", output.status)
            } else {
                stderr
            };
            return Err(ServiceError::Download(message));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ServiceError::Unexpected(format!("JSON de yt-dlp inválido: {}", e)))
    }
}

impl MediaService for YtDlpService {
    fn resolve(&self, reference: &str, flat: bool) -> Result<RawInfo, ServiceError> {
        debug!("📊 yt-dlp (flat={}): {}", flat, reference);

        let output = Command::new(&self.options.binary)
            .args(self.args(reference, flat))
            .output()
            .map_err(|e| ServiceError::Unexpected(format!("no se pudo ejecutar yt-dlp: {}", e)))?;

        Self::parse_output(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_requests_use_flat_playlist_mode() {
        let service = YtDlpService::default();
        let args = service.args("https://youtube.com/playlist?list=PL1", true);

        assert!(args.contains(&"--flat-playlist".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtube.com/playlist?list=PL1"));
    }

    #[test]
    fn pins_source_address_and_single_retry() {
        let service = YtDlpService::new(YtDlpOptions {
            source_address: "10.0.0.2".to_string(),
            ..YtDlpOptions::default()
        });
        let args = service.args("never gonna give you up", false);

        let pos = args.iter().position(|a| a == "--source-address").unwrap();
        assert_eq!(args[pos + 1], "10.0.0.2");
        let pos = args.iter().position(|a| a == "--extractor-retries").unwrap();
        assert_eq!(args[pos + 1], "1");
        assert!(!args.contains(&"--flat-playlist".to_string()));
    }

    #[test]
    fn missing_binary_is_unexpected_error() {
        let service = YtDlpService::new(YtDlpOptions {
            binary: "/nonexistent/yt-dlp-binary".to_string(),
            ..YtDlpOptions::default()
        });

        let result = service.resolve("anything", false);
        assert!(matches!(result, Err(ServiceError::Unexpected(_))));
    }
}
