//! Application-level configuration loading: avatar catalog, task template, and family roster.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::round::{Avatar, Player, Task};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TASK_RACE_CONFIG_PATH";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    avatars: Vec<Avatar>,
    tasks: Vec<Task>,
    roster: Vec<RosterSeed>,
}

/// Family member pre-seeded into every fresh round.
#[derive(Debug, Clone)]
struct RosterSeed {
    id: String,
    name: String,
    avatar_id: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the baked-in
    /// family setup when the file is missing or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        avatars = app_config.avatars.len(),
                        tasks = app_config.tasks.len(),
                        roster = app_config.roster.len(),
                        "loaded configuration from file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Sections left out of the file keep
    /// their built-in defaults.
    fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// The avatar catalog players can pick from.
    pub fn avatars(&self) -> &[Avatar] {
        &self.avatars
    }

    /// Look up a catalog avatar by id.
    pub fn avatar(&self, id: &str) -> Option<&Avatar> {
        self.avatars.iter().find(|avatar| avatar.id == id)
    }

    /// A fresh, all-incomplete copy of the task template for one player.
    pub fn fresh_tasks(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Materialize the configured family roster into players, each with
    /// their own checklist copy.
    pub fn seed_players(&self) -> Vec<Player> {
        self.roster
            .iter()
            .filter_map(|seed| {
                let avatar = match self.avatar(&seed.avatar_id) {
                    Some(avatar) => avatar.clone(),
                    None => {
                        let Some(fallback) = self.avatars.first() else {
                            warn!(
                                member = %seed.id,
                                "avatar catalog is empty; skipping roster entry"
                            );
                            return None;
                        };
                        warn!(
                            member = %seed.id,
                            avatar_id = %seed.avatar_id,
                            "roster entry references an unknown avatar; using the first catalog entry"
                        );
                        fallback.clone()
                    }
                };
                Some(Player {
                    id: seed.id.clone(),
                    name: seed.name.clone(),
                    avatar,
                    tasks: self.fresh_tasks(),
                    is_winner: false,
                })
            })
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            avatars: default_avatars(),
            tasks: default_tasks(),
            roster: default_roster(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    avatars: Vec<RawAvatar>,
    #[serde(default)]
    tasks: Vec<RawTask>,
    #[serde(default)]
    roster: Vec<RawRosterMember>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let avatars = if value.avatars.is_empty() {
            default_avatars()
        } else {
            value.avatars.into_iter().map(Into::into).collect()
        };
        let tasks = if value.tasks.is_empty() {
            default_tasks()
        } else {
            value.tasks.into_iter().map(Into::into).collect()
        };
        let roster = if value.roster.is_empty() {
            default_roster()
        } else {
            value.roster.into_iter().map(Into::into).collect()
        };
        Self {
            avatars,
            tasks,
            roster,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single avatar catalog entry.
struct RawAvatar {
    id: String,
    name: String,
    image: String,
    background_color: String,
}

impl From<RawAvatar> for Avatar {
    fn from(value: RawAvatar) -> Self {
        Self {
            id: value.id,
            name: value.name,
            glyph: value.image,
            background_color: value.background_color,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a task template entry. Templates are always
/// incomplete; there is no `completed` field to set.
struct RawTask {
    id: String,
    title: String,
}

impl From<RawTask> for Task {
    fn from(value: RawTask) -> Self {
        Self {
            id: value.id,
            title: value.title,
            completed: false,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a pre-seeded family member.
struct RawRosterMember {
    id: String,
    name: String,
    avatar_id: String,
}

impl From<RawRosterMember> for RosterSeed {
    fn from(value: RawRosterMember) -> Self {
        Self {
            id: value.id,
            name: value.name,
            avatar_id: value.avatar_id,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in avatar catalog shipped with the binary.
fn default_avatars() -> Vec<Avatar> {
    [
        ("1", "Fox", "🦊", "#FDE1D3"),
        ("2", "Panda", "🐼", "#D3E4FD"),
        ("3", "Lion", "🦁", "#FEF7CD"),
        ("4", "Rabbit", "🐰", "#FFDEE2"),
        ("5", "Bear", "🐻", "#F2FCE2"),
        ("6", "Monkey", "🐵", "#D6BCFA"),
    ]
    .into_iter()
    .map(|(id, name, glyph, background_color)| Avatar {
        id: id.into(),
        name: name.into(),
        glyph: glyph.into(),
        background_color: background_color.into(),
    })
    .collect()
}

/// Built-in morning task template. Titles are kept byte-for-byte as the web
/// clients know them, since serialized checklists are compared during sync.
fn default_tasks() -> Vec<Task> {
    [
        ("task1", " 🦷🚰 צחצוח שיניים ופנים"),
        ("task2", " 👕 להתלבש "),
        ("task3", "👟 לנעול נעליים"),
        ("task4", "🛏 לסדר מיטה"),
    ]
    .into_iter()
    .map(|(id, title)| Task {
        id: id.into(),
        title: title.into(),
        completed: false,
    })
    .collect()
}

/// Built-in family roster seeded into fresh rounds.
fn default_roster() -> Vec<RosterSeed> {
    [
        ("dad", "DAD", "1"),
        ("mom", "MOM", "2"),
        ("adar", "ADAR", "3"),
        ("danni", "DANNI", "4"),
    ]
    .into_iter()
    .map(|(id, name, avatar_id)| RosterSeed {
        id: id.into(),
        name: name.into(),
        avatar_id: avatar_id.into(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_ship_the_full_family_setup() {
        let config = AppConfig::default();
        assert_eq!(config.avatars().len(), 6);
        assert_eq!(config.fresh_tasks().len(), 4);

        let players = config.seed_players();
        assert_eq!(players.len(), 4);
        assert_eq!(players[0].id, "dad");
        assert_eq!(players[0].avatar.name, "Fox");
        assert_eq!(players[3].avatar.name, "Rabbit");
        assert!(players.iter().all(|player| {
            !player.is_winner && player.tasks.iter().all(|task| !task.completed)
        }));
    }

    #[test]
    fn fresh_checklists_are_independent_copies() {
        let config = AppConfig::default();
        let mut first = config.fresh_tasks();
        first[0].completed = true;
        let second = config.fresh_tasks();
        assert!(!second[0].completed);
    }

    #[test]
    fn partial_config_keeps_missing_sections_at_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "tasks": [
                    { "id": "water", "title": "Water the plants" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.fresh_tasks().len(), 1);
        assert_eq!(config.avatars().len(), 6);
        assert_eq!(config.seed_players().len(), 4);
    }

    #[test]
    fn roster_with_unknown_avatar_falls_back_to_first_catalog_entry() {
        let config = AppConfig::from_json(
            r#"{
                "roster": [
                    { "id": "kid", "name": "KID", "avatar_id": "404" }
                ]
            }"#,
        )
        .unwrap();

        let players = config.seed_players();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].avatar.id, "1");
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(AppConfig::from_json("{ not json").is_err());
    }
}
