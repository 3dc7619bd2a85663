// Service configuration, loaded from environment variables.

use std::path::PathBuf;

use thiserror::Error;

use crate::api::discord::DEFAULT_API_BASE as DEFAULT_DISCORD_API_BASE;
use crate::extract::DEFAULT_SEPARATOR;
use crate::translation::oracle::DEFAULT_API_BASE as DEFAULT_TRANSLATION_API_BASE;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:spawns.db?mode=rwc";
pub const DEFAULT_TAGS_FILE: &str = "biomes_tags.txt";
pub const DEFAULT_TRANSLATION_CACHE: &str = "translations.json";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("DISCORD_GUILD_ID must be non-zero")]
    ZeroGuildId,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token; command registration is skipped without it.
    pub discord_token: Option<String>,
    pub guild_id: u64,
    pub application_id: Option<String>,
    pub discord_api_base: String,
    pub database_url: String,
    pub tags_file: PathBuf,
    pub translation_cache: PathBuf,
    pub translation_api_base: String,
    pub port: u16,
    pub separator: String,
}

impl Config {
    /// Load configuration from the process environment. `port_override`
    /// (the `--port` flag) takes precedence over `PORT`.
    ///
    /// Environment variables:
    /// - `DISCORD_GUILD_ID` - target guild, required and non-zero
    /// - `DISCORD_BOT_TOKEN`, `DISCORD_APPLICATION_ID` - command registration and follow-ups
    /// - `DISCORD_API_BASE` - chat API root (default: `https://discord.com/api/v10`)
    /// - `SPAWN_DATABASE_URL` - spawn table (default: `sqlite:spawns.db?mode=rwc`)
    /// - `BIOME_TAGS_FILE` - tag reference table (default: `biomes_tags.txt`)
    /// - `TRANSLATION_CACHE_FILE` - translation cache (default: `translations.json`)
    /// - `TRANSLATION_API_BASE` - translation oracle root (default: `https://pokeapi.co/api/v2`)
    /// - `PORT` - HTTP port (default: 3000)
    /// - `LIST_SEPARATOR` - list separator in stored cells (default: `", "`)
    pub fn load(port_override: Option<u16>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), port_override)
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(get: F, port_override: Option<u16>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let raw_guild = non_empty("DISCORD_GUILD_ID").ok_or(ConfigError::Missing("DISCORD_GUILD_ID"))?;
        let guild_id: u64 = raw_guild.trim().parse().map_err(|_| ConfigError::Invalid {
            name: "DISCORD_GUILD_ID",
            value: raw_guild.clone(),
        })?;
        if guild_id == 0 {
            return Err(ConfigError::ZeroGuildId);
        }

        let port = match port_override {
            Some(port) => port,
            None => match non_empty("PORT") {
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "PORT",
                    value: raw.clone(),
                })?,
                None => DEFAULT_PORT,
            },
        };

        Ok(Config {
            discord_token: non_empty("DISCORD_BOT_TOKEN"),
            guild_id,
            application_id: non_empty("DISCORD_APPLICATION_ID"),
            discord_api_base: non_empty("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
            database_url: non_empty("SPAWN_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            tags_file: non_empty("BIOME_TAGS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TAGS_FILE)),
            translation_cache: non_empty("TRANSLATION_CACHE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TRANSLATION_CACHE)),
            translation_api_base: non_empty("TRANSLATION_API_BASE")
                .unwrap_or_else(|| DEFAULT_TRANSLATION_API_BASE.to_string()),
            port,
            // The separator may be whitespace-padded, so only absence falls back.
            separator: get("LIST_SEPARATOR")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        })
    }
}
