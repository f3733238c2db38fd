use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        stop_command(),
        queue_command(),
        clear_command(),
        nowplaying_command(),
        help_command(),
    ]
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Reproduce un video o playlist por URL o búsqueda")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL o término de búsqueda",
            )
            .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa la reproducción actual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Reanuda la reproducción pausada")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Salta a la siguiente canción")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Detiene la reproducción y limpia la cola")
}

// Comandos de cola

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Muestra la cola de reproducción")
}

fn clear_command() -> CreateCommand {
    CreateCommand::new("clear").description("Limpia la cola sin detener la canción actual")
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Muestra información de la canción actual")
}

fn help_command() -> CreateCommand {
    CreateCommand::new("help").description("Muestra los comandos disponibles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_command_once() {
        let names: Vec<String> = all_commands()
            .iter()
            .map(|command| {
                serde_json::to_value(command).expect("comando serializable")["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();

        assert_eq!(
            names,
            vec![
                "play", "pause", "resume", "skip", "stop", "queue", "clear", "nowplaying", "help"
            ]
        );
    }
}
