use anyhow::Result;
use serenity::{
    all::{ButtonStyle, ComponentInteraction, Context},
    builder::{
        CreateActionRow, CreateButton, CreateInteractionResponse,
        CreateInteractionResponseMessage,
    },
};
use tracing::debug;

use crate::{
    bot::OpenJukeboxBot,
    ui::embeds,
};

/// IDs personalizados para los botones
pub mod button_ids {
    pub const PAUSE: &str = "player_pause";
    pub const RESUME: &str = "player_resume";
    pub const SKIP: &str = "player_skip";
    pub const STOP: &str = "player_stop";
    pub const QUEUE: &str = "player_queue";
}

/// Controles que acompañan al mensaje "reproduciendo ahora"
pub fn player_controls() -> Vec<CreateActionRow> {
    let pause_btn = CreateButton::new(button_ids::PAUSE)
        .label("Pausa")
        .emoji('⏸')
        .style(ButtonStyle::Primary);

    let resume_btn = CreateButton::new(button_ids::RESUME)
        .label("Reanudar")
        .emoji('▶')
        .style(ButtonStyle::Success);

    let skip_btn = CreateButton::new(button_ids::SKIP)
        .label("Saltar")
        .emoji('⏭')
        .style(ButtonStyle::Secondary);

    let stop_btn = CreateButton::new(button_ids::STOP)
        .label("Detener")
        .emoji('⏹')
        .style(ButtonStyle::Danger);

    let queue_btn = CreateButton::new(button_ids::QUEUE)
        .label("Cola")
        .emoji('📜')
        .style(ButtonStyle::Secondary);

    vec![CreateActionRow::Buttons(vec![
        pause_btn, resume_btn, skip_btn, stop_btn, queue_btn,
    ])]
}

/// Manejador de los botones del reproductor.
///
/// Todas las respuestas son efímeras; el mensaje "reproduciendo ahora" no
/// se modifica.
pub async fn handle_player_component(
    ctx: &Context,
    interaction: &ComponentInteraction,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let guild_id = interaction
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("No guild ID"))?;
    let player = bot.players().get(guild_id);

    let response = match (interaction.data.custom_id.as_str(), player) {
        (button_ids::QUEUE, Some(player)) => {
            let pending = player.list_queue().await.unwrap_or_default();
            ephemeral_embed(embeds::queue_embed(&pending, bot.config().queue_preview_size))
        }
        (button_ids::QUEUE, None) => ephemeral_text("📭 ¡La cola está vacía!"),
        (_, None) => ephemeral_text("❌ ¡No hay nada reproduciéndose!"),
        (button_ids::PAUSE, Some(player)) => match player.pause().await {
            Ok(()) => ephemeral_text("⏸️ Pausado"),
            Err(e) => ephemeral_text(embeds::transport_error_message(&e)),
        },
        (button_ids::RESUME, Some(player)) => match player.resume().await {
            Ok(()) => ephemeral_text("▶️ Reanudado"),
            Err(e) => ephemeral_text(embeds::transport_error_message(&e)),
        },
        (button_ids::SKIP, Some(player)) => match player.skip().await {
            Ok(_) => ephemeral_text("⏭️ Saltado"),
            Err(e) => ephemeral_text(embeds::transport_error_message(&e)),
        },
        (button_ids::STOP, Some(player)) => match player.stop().await {
            Ok(outcome) if outcome.was_active => ephemeral_text("⏹️ Detenido y cola limpiada"),
            Ok(_) => ephemeral_text("❌ ¡No hay nada reproduciéndose!"),
            Err(e) => ephemeral_text(embeds::transport_error_message(&e)),
        },
        (other, Some(_)) => {
            debug!("Componente no manejado: {}", other);
            ephemeral_text("⚠️ Acción no reconocida")
        }
    };

    interaction.create_response(&ctx.http, response).await?;

    Ok(())
}

fn ephemeral_text(content: &str) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    )
}

fn ephemeral_embed(embed: serenity::builder::CreateEmbed) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(embed)
            .ephemeral(true),
    )
}
