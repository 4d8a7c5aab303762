//! Steam Web API response types.
//!
//! Only the fields the catalog consumes are modelled; everything else in
//! the responses is ignored.

use serde::{Deserialize, Deserializer, Serialize};

/// A game from `IPlayerService/GetOwnedGames`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnedGame {
    pub appid: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub capsule_filename: String,
    #[serde(default)]
    pub playtime_forever: u64,
}

/// An app from `IFamilyGroupsService/GetSharedLibraryApps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedApp {
    pub appid: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub capsule_filename: String,
    #[serde(default)]
    pub owner_steamids: Vec<String>,
    #[serde(default)]
    pub rt_playtime: u64,
}

/// Steam wraps every service result in `{"response": {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub response: T,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OwnedGamesResponse {
    #[serde(default)]
    #[allow(dead_code)]
    pub game_count: u32,
    #[serde(default)]
    pub games: Vec<OwnedGame>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FamilyGroupResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub family_groupid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SharedLibraryResponse {
    #[serde(default)]
    pub apps: Vec<SharedApp>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppListResponse {
    pub applist: AppList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppList {
    #[serde(default)]
    pub apps: Vec<AppListEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppListEntry {
    pub appid: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VanityUrlResponse {
    /// 1 on a match, 42 when nothing matched.
    #[serde(default)]
    pub success: i32,
    #[serde(default, deserialize_with = "string_or_number")]
    pub steamid: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Steam serializes 64-bit ids as strings; accept both forms.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
