use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    audio::{
        ingest::{IngestError, IngestProgress, IngestReport},
        player::{StopOutcome, TransportError},
        queue::{PlaybackSnapshot, QueueItem},
    },
    sources::ResolutionError,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Open Jukebox";

const TITLE_LIMIT: usize = 100;
const UPLOADER_LIMIT: usize = 50;
const QUEUE_TITLE_LIMIT: usize = 60;

/// Crea el embed "reproduciendo ahora" que acompaña a los botones de control
pub fn now_playing_embed(item: &QueueItem, queued: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(linked_title(item))
        .color(colors::SUCCESS_GREEN);

    if let Some(thumbnail) = &item.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    if let Some(uploader) = &item.uploader {
        embed = embed.field("🎤 Canal", truncate(uploader, UPLOADER_LIMIT), true);
    }

    if let Some(duration) = item.duration {
        embed = embed.field("⏱️ Duración", format_duration(duration), true);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(format!("Cola: {} canciones", queued)))
}

/// Crea un embed para mostrar que se agregó una canción a la cola
pub fn track_added_embed(item: &QueueItem, position: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("✅ Agregado a la Cola")
        .description(linked_title(item))
        .color(colors::SUCCESS_GREEN)
        .field("📍 Posición", format!("#{}", position), true);

    if let Some(duration) = item.duration {
        embed = embed.field("⏱️ Duración", format_duration(duration), true);
    }

    if let Some(thumbnail) = &item.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Embed inicial mientras se resuelven las entradas de una playlist
pub fn playlist_loading_embed(title: &str, total: usize) -> CreateEmbed {
    CreateEmbed::default()
        .title("📋 Cargando Playlist")
        .description(format!("**{}**\nAgregando {} videos...", title, total))
        .color(colors::INFO_BLUE)
}

pub fn playlist_progress_embed(progress: &IngestProgress) -> CreateEmbed {
    CreateEmbed::default()
        .title("📋 Cargando Playlist")
        .description(progress_text(progress))
        .color(colors::INFO_BLUE)
}

/// Crea el resumen final de una playlist agregada
pub fn playlist_added_embed(report: &IngestReport) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("✅ Playlist Agregada")
        .description(format!(
            "**{}**\nSe agregaron {} videos correctamente",
            report.title, report.added
        ))
        .color(colors::MUSIC_PURPLE);

    if let Some(skipped) = skipped_summary(report.skipped, report.age_restricted) {
        embed = embed.field("Saltados", skipped, false);
    }

    embed
        .field("📊 Cola", format!("{} canciones", report.queued), true)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar la cola de reproducción
pub fn queue_embed(pending: &[QueueItem], preview_size: usize) -> CreateEmbed {
    if pending.is_empty() {
        return CreateEmbed::default()
            .title("📜 Cola")
            .description("📭 ¡La cola está vacía!")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER));
    }

    let (listing, footer) = queue_preview(pending, preview_size);
    CreateEmbed::default()
        .title("📜 Cola")
        .description(listing)
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(footer))
}

/// Estado actual para `/nowplaying`
pub fn now_playing_status_embed(snapshot: &PlaybackSnapshot) -> Option<CreateEmbed> {
    snapshot
        .now_playing
        .as_ref()
        .map(|item| now_playing_embed(item, snapshot.pending.len()))
}

pub fn stopped_embed(outcome: &StopOutcome) -> CreateEmbed {
    let description = if outcome.cleared > 0 {
        format!(
            "Reproducción detenida y cola limpiada ({} canciones eliminadas).",
            outcome.cleared
        )
    } else {
        "Reproducción detenida y cola limpiada.".to_string()
    };

    CreateEmbed::default()
        .title("⏹️ Detenido")
        .description(description)
        .color(colors::ERROR_RED)
}

pub fn skipped_embed(skipped: Option<&QueueItem>) -> CreateEmbed {
    let description = match skipped {
        Some(item) => format!(
            "**{}**\nPasando a la siguiente canción...",
            truncate(&item.title, TITLE_LIMIT)
        ),
        None => "Pasando a la siguiente canción...".to_string(),
    };

    CreateEmbed::default()
        .title("⏭️ Saltado")
        .description(description)
        .color(colors::WARNING_ORANGE)
}

pub fn resumed_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("▶️ Reanudado")
        .description("Reproducción reanudada.")
        .color(colors::SUCCESS_GREEN)
}

pub fn cleared_embed(removed: usize) -> CreateEmbed {
    CreateEmbed::default()
        .title("🗑️ Cola Limpiada")
        .description(format!("Se eliminaron {} canciones de la cola.", removed))
        .color(colors::WARNING_ORANGE)
}

/// Crea un embed de ayuda general
pub fn help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("🎵 Open Jukebox - Comandos")
        .color(colors::INFO_BLUE)
        .field(
            "🎵 Reproducción",
            "• `/play <url o búsqueda>` - Reproduce un video o playlist\n\
            • `/pause` - Pausa la reproducción\n\
            • `/resume` - Reanuda la reproducción\n\
            • `/skip` - Salta la canción actual\n\
            • `/stop` - Detiene y limpia la cola",
            false,
        )
        .field(
            "📜 Cola",
            "• `/queue` - Muestra la cola\n\
            • `/clear` - Limpia la cola sin detener la canción actual\n\
            • `/nowplaying` - Muestra la canción actual",
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Crea un embed de error
pub fn error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Mensaje para el usuario según el tipo de fallo de resolución
pub fn resolution_error_message(error: &ResolutionError) -> String {
    match error {
        ResolutionError::AgeRestricted => {
            "🔞 Este video tiene restricción de edad o requiere iniciar sesión. El bot no puede reproducirlo sin autenticación.".to_string()
        }
        ResolutionError::Unavailable => {
            "❌ Este video no está disponible, es privado o fue eliminado.".to_string()
        }
        ResolutionError::DownloadFailure(_) | ResolutionError::Unknown(_) => {
            "❌ URL no soportada o no se pudo obtener la información.".to_string()
        }
    }
}

pub fn ingest_error_message(error: &IngestError) -> String {
    match error {
        IngestError::Resolution(error) => resolution_error_message(error),
        IngestError::EmptyPlaylist { .. } => "❌ ¡No se encontraron videos en esta playlist!".to_string(),
        IngestError::AllItemsFailed {
            skipped,
            age_restricted,
            ..
        } => {
            let mut message = "❌ ¡No se pudo agregar ningún video!".to_string();
            if *age_restricted > 0 {
                message.push_str(&format!(
                    "\n🔞 {} videos tenían restricción de edad",
                    age_restricted
                ));
            }
            if *skipped > 0 {
                message.push_str(&format!("\n⚠️ {} videos no estaban disponibles o eran privados", skipped));
            }
            message
        }
        IngestError::NoPlayableStream => "❌ ¡No se pudo obtener la información del video!".to_string(),
        IngestError::Rejected(_) => "❌ No se pudo reproducir el audio de este video.".to_string(),
        IngestError::Cancelled { added, .. } => {
            format!("⏹️ Carga de la playlist cancelada ({} videos agregados antes de detener).", added)
        }
        IngestError::PlayerGone => "❌ El reproductor de este servidor se detuvo. Intenta de nuevo.".to_string(),
    }
}

pub fn transport_error_message(error: &TransportError) -> &'static str {
    match error {
        TransportError::NothingPlaying => "❌ ¡No hay nada reproduciéndose!",
        TransportError::NothingPaused => "❌ ¡No hay nada en pausa!",
        TransportError::Sink(_) => "❌ Error del reproductor de audio",
        TransportError::PlayerGone => "❌ No hay reproducción activa en este servidor",
        TransportError::SessionEnded => "⏹️ La reproducción fue detenida",
    }
}

/// Formatea una duración como `HH:MM:SS` o `MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Corta `text` a `max` caracteres, terminando en "..." si se recortó
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Lista numerada de los primeros `preview_size` items y su pie
fn queue_preview(pending: &[QueueItem], preview_size: usize) -> (String, String) {
    let listing = pending
        .iter()
        .take(preview_size)
        .enumerate()
        .map(|(i, item)| {
            let title: String = item.title.chars().take(QUEUE_TITLE_LIMIT).collect();
            format!("`{}.` {}", i + 1, title)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let footer = if pending.len() > preview_size {
        format!("... y {} canciones más", pending.len() - preview_size)
    } else {
        format!("Total: {} canciones", pending.len())
    };

    (listing, footer)
}

fn progress_text(progress: &IngestProgress) -> String {
    let mut status = format!(
        "**{}**\nAgregados {}/{} videos...",
        progress.title, progress.added, progress.total
    );
    if progress.skipped > 0 {
        status.push_str(&format!("\n⚠️ Saltados {} (no disponibles/privados)", progress.skipped));
    }
    if progress.age_restricted > 0 {
        status.push_str(&format!(
            "\n🔞 Saltados {} (restricción de edad)",
            progress.age_restricted
        ));
    }
    status
}

fn skipped_summary(skipped: usize, age_restricted: usize) -> Option<String> {
    let mut parts = Vec::new();
    if skipped > 0 {
        parts.push(format!("⚠️ {} no disponibles/privados", skipped));
    }
    if age_restricted > 0 {
        parts.push(format!("🔞 {} con restricción de edad", age_restricted));
    }
    (!parts.is_empty()).then(|| parts.join(" | "))
}

fn linked_title(item: &QueueItem) -> String {
    let title = truncate(&item.title, TITLE_LIMIT);
    if item.page_url.is_empty() {
        format!("**{}**", title)
    } else {
        format!("**[{}]({})**", title, item.page_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(title: &str) -> QueueItem {
        QueueItem {
            stream_url: "https://cdn.example/a.webm".to_string(),
            title: title.to_string(),
            page_url: String::new(),
            thumbnail: None,
            uploader: None,
            duration: None,
        }
    }

    #[test]
    fn durations_use_two_digit_fields() {
        assert_eq!(format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_duration(Duration::ZERO), "00:00");
    }

    #[test]
    fn long_titles_are_cut_with_ellipsis() {
        let long = "x".repeat(120);
        let cut = truncate(&long, 100);
        assert_eq!(cut.chars().count(), 100);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("corto", 100), "corto");
        assert_eq!(truncate("ñandú ñandú", 8), "ñandú...");
    }

    #[test]
    fn queue_preview_lists_first_titles_and_remainder() {
        let pending: Vec<QueueItem> = (1..=12).map(|i| item(&format!("tema {i}"))).collect();

        let (listing, footer) = queue_preview(&pending, 10);

        assert_eq!(listing.lines().count(), 10);
        assert!(listing.starts_with("`1.` tema 1"));
        assert_eq!(footer, "... y 2 canciones más");

        let (_, footer) = queue_preview(&pending[..3], 10);
        assert_eq!(footer, "Total: 3 canciones");
    }

    #[test]
    fn queue_preview_cuts_titles_at_sixty_chars() {
        let pending = vec![item(&"a".repeat(80))];
        let (listing, _) = queue_preview(&pending, 10);
        assert_eq!(listing, format!("`1.` {}", "a".repeat(60)));
    }

    #[test]
    fn error_messages_differ_per_kind() {
        let age = resolution_error_message(&ResolutionError::AgeRestricted);
        let gone = resolution_error_message(&ResolutionError::Unavailable);
        let other = resolution_error_message(&ResolutionError::DownloadFailure("x".into()));

        assert!(age.contains("🔞"));
        assert_ne!(age, gone);
        assert_ne!(gone, other);
    }

    #[test]
    fn aggregate_failure_message_lists_both_counts() {
        let message = ingest_error_message(&IngestError::AllItemsFailed {
            title: "mix".to_string(),
            skipped: 3,
            age_restricted: 2,
        });

        assert!(message.contains("🔞 2 videos"));
        assert!(message.contains("⚠️ 3 videos"));
    }

    #[test]
    fn cancelled_load_reports_what_was_added() {
        let message = ingest_error_message(&IngestError::Cancelled {
            title: "mix".to_string(),
            added: 6,
        });

        assert!(message.contains("6 videos agregados"));
    }

    #[test]
    fn skipped_summary_only_when_something_was_skipped() {
        assert_eq!(skipped_summary(0, 0), None);
        assert_eq!(
            skipped_summary(1, 2),
            Some("⚠️ 1 no disponibles/privados | 🔞 2 con restricción de edad".to_string())
        );
    }
}
