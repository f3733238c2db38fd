use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, ComponentInteraction},
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    audio::{
        ingest::EnqueueOutcome,
        player::{GuildPlayer, TransportError},
    },
    bot::OpenJukeboxBot,
    ui::{buttons, embeds, presenters::InteractionReporter},
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, command, guild_id, bot).await?,
        "pause" => handle_pause(ctx, command, guild_id, bot).await?,
        "resume" => handle_resume(ctx, command, guild_id, bot).await?,
        "skip" => handle_skip(ctx, command, guild_id, bot).await?,
        "stop" => handle_stop(ctx, command, guild_id, bot).await?,
        "queue" => handle_queue(ctx, command, guild_id, bot).await?,
        "clear" => handle_clear(ctx, command, guild_id, bot).await?,
        "nowplaying" => handle_nowplaying(ctx, command, guild_id, bot).await?,
        "help" => respond(ctx, &command, message().embed(embeds::help_embed())).await?,
        _ => {
            respond(
                ctx,
                &command,
                message().content("❌ Comando no reconocido").ephemeral(true),
            )
            .await?;
        }
    }

    Ok(())
}

/// Maneja interacciones con componentes (botones del reproductor)
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;

    info!(
        "🔘 Botón {} presionado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    buttons::handle_player_component(ctx, &component, bot).await
}

// Handlers específicos para cada comando

async fn handle_play(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?
        .to_string();

    // Defer la respuesta ya que la resolución puede tardar
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let voice_channel_id = match get_user_voice_channel(ctx, guild_id, command.user.id) {
        Ok(channel_id) => channel_id,
        Err(e) => {
            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new().content(format!("❌ {}", e)),
                )
                .await?;
            return Ok(());
        }
    };

    let call = bot
        .join_voice_channel(ctx, guild_id, voice_channel_id)
        .await?;
    let player = bot.player_for(guild_id, call, ctx.http.clone(), command.channel_id);

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().content("🔍 Obteniendo información del video..."),
        )
        .await?;

    let reporter = InteractionReporter::new(ctx.http.clone(), command.clone());
    let edit = match bot.ingester().enqueue(&query, &player, &reporter).await {
        Ok(EnqueueOutcome::Started(_)) => {
            // El presenter publica el mensaje "reproduciendo ahora"
            command.delete_response(&ctx.http).await?;
            return Ok(());
        }
        Ok(EnqueueOutcome::Queued { item, position }) => EditInteractionResponse::new()
            .content("")
            .embed(embeds::track_added_embed(&item, position)),
        Ok(EnqueueOutcome::Playlist(report)) => EditInteractionResponse::new()
            .content("")
            .embed(embeds::playlist_added_embed(&report)),
        Err(e) => {
            warn!("⚠️ /play {} falló en guild {}: {}", query, guild_id, e);
            EditInteractionResponse::new()
                .content(embeds::ingest_error_message(&e))
                .embeds(Vec::new())
        }
    };

    command.edit_response(&ctx.http, edit).await?;

    Ok(())
}

async fn handle_pause(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let result = match active_player(bot, guild_id) {
        Ok(player) => player.pause().await,
        Err(e) => Err(e),
    };
    let reply = match result {
        Ok(()) => message().content("⏸️ Música pausada."),
        Err(e) => transport_failure(&e),
    };

    respond(ctx, &command, reply).await
}

async fn handle_resume(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let result = match active_player(bot, guild_id) {
        Ok(player) => player.resume().await,
        Err(e) => Err(e),
    };
    let reply = match result {
        Ok(()) => message().embed(embeds::resumed_embed()),
        Err(e) => transport_failure(&e),
    };

    respond(ctx, &command, reply).await
}

async fn handle_skip(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let result = match active_player(bot, guild_id) {
        Ok(player) => player.skip().await,
        Err(e) => Err(e),
    };
    let reply = match result {
        Ok(skipped) => message().embed(embeds::skipped_embed(skipped.as_ref())),
        Err(e) => transport_failure(&e),
    };

    respond(ctx, &command, reply).await
}

async fn handle_stop(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let result = match active_player(bot, guild_id) {
        Ok(player) => player.stop().await,
        Err(e) => Err(e),
    };
    let reply = match result {
        Ok(outcome) if outcome.was_active => message().embed(embeds::stopped_embed(&outcome)),
        Ok(_) => transport_failure(&TransportError::NothingPlaying),
        Err(e) => transport_failure(&e),
    };

    respond(ctx, &command, reply).await
}

async fn handle_queue(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let pending = match bot.players().get(guild_id) {
        Some(player) => player.list_queue().await.unwrap_or_default(),
        None => Vec::new(),
    };

    let embed = embeds::queue_embed(&pending, bot.config().queue_preview_size);
    respond(ctx, &command, message().embed(embed)).await
}

async fn handle_clear(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let removed = match bot.players().get(guild_id) {
        Some(player) => player.clear().await.unwrap_or(0),
        None => 0,
    };

    let reply = if removed == 0 {
        message().content("📭 ¡La cola ya está vacía!")
    } else {
        message().embed(embeds::cleared_embed(removed))
    };

    respond(ctx, &command, reply).await
}

async fn handle_nowplaying(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &OpenJukeboxBot,
) -> Result<()> {
    let snapshot = match bot.players().get(guild_id) {
        Some(player) => player.snapshot().await.ok(),
        None => None,
    };

    let reply = match snapshot.as_ref().and_then(embeds::now_playing_status_embed) {
        Some(embed) => message()
            .embed(embed)
            .components(buttons::player_controls()),
        None => transport_failure(&TransportError::NothingPlaying),
    };

    respond(ctx, &command, reply).await
}

// Utilidades

fn message() -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
}

fn transport_failure(error: &TransportError) -> CreateInteractionResponseMessage {
    message()
        .content(embeds::transport_error_message(error))
        .ephemeral(true)
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    reply: CreateInteractionResponseMessage,
) -> Result<()> {
    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(reply))
        .await?;

    Ok(())
}

/// Controlador vivo del guild.
fn active_player(bot: &OpenJukeboxBot, guild_id: GuildId) -> Result<GuildPlayer, TransportError> {
    bot.players()
        .get(guild_id)
        .ok_or(TransportError::PlayerGone)
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Result<ChannelId> {
    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or_else(|| anyhow::anyhow!("Guild no encontrada en caché"))?;

    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or_else(|| anyhow::anyhow!("¡Primero únete a un canal de voz!"))?;

    Ok(channel_id)
}
