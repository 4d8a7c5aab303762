//! API response types for SteamGridDB.

use serde::{Deserialize, Serialize};

/// A game entry resolved through a platform id lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDetail {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub release_date: Option<i64>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub verified: bool,
}

/// Uploader of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steam64: String,
    #[serde(default)]
    pub avatar: String,
}

/// Image metadata from the SteamGridDB API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub id: i64,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub humor: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub epilepsy: bool,
    #[serde(default)]
    pub upvotes: i32,
    #[serde(default)]
    pub downvotes: i32,
    #[serde(default)]
    pub author: Option<GridAuthor>,
}

/// One page of grid results with its paging envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GridsPage {
    #[serde(default)]
    pub page: i32,
    #[serde(default)]
    pub total: i32,
    #[serde(default)]
    pub limit: i32,
    #[serde(default)]
    pub data: Vec<ImageData>,
}

impl GridsPage {
    /// Number of pages the full result set spans.
    ///
    /// A non-positive `limit` means the provider did not paginate, so the
    /// first page is all there is.
    pub fn page_count(&self) -> u32 {
        if self.limit <= 0 || self.total <= 0 {
            return 1;
        }
        let total = self.total as u32;
        let limit = self.limit as u32;
        total.div_ceil(limit)
    }
}

/// API response wrapper (internal).
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[allow(dead_code)]
    pub success: bool,
    #[serde(default)]
    #[allow(dead_code)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_detail_parse() {
        let json = r#"{"id":5248,"name":"Dota 2","release_date":1373328000,"types":["steam"],"verified":true}"#;
        let game: GameDetail = serde_json::from_str(json).unwrap();
        assert_eq!(game.id, 5248);
        assert_eq!(game.name, "Dota 2");
        assert_eq!(game.release_date, Some(1373328000));
        assert!(game.verified);
    }

    #[test]
    fn image_data_full() {
        let json = r#"{
            "id": 100,
            "score": 5,
            "style": "alternate",
            "width": 600,
            "height": 900,
            "nsfw": false,
            "humor": true,
            "notes": "fan art",
            "mime": "image/png",
            "language": "en",
            "url": "https://cdn.example.com/grid.png",
            "thumb": "https://cdn.example.com/thumb.png",
            "lock": false,
            "epilepsy": false,
            "upvotes": 10,
            "downvotes": 2,
            "author": {"name": "artist", "steam64": "7656119", "avatar": "https://cdn.example.com/a.png"}
        }"#;
        let img: ImageData = serde_json::from_str(json).unwrap();
        assert_eq!(img.id, 100);
        assert_eq!(img.height, 900);
        assert!(img.humor);
        assert_eq!(img.notes.as_deref(), Some("fan art"));
        assert_eq!(img.author.unwrap().name, "artist");
    }

    #[test]
    fn image_data_defaults() {
        let json = r#"{"id": 1, "notes": null}"#;
        let img: ImageData = serde_json::from_str(json).unwrap();
        assert_eq!(img.score, 0);
        assert!(img.url.is_empty());
        assert!(img.notes.is_none());
        assert!(img.author.is_none());
    }

    #[test]
    fn page_count_rounds_up() {
        let page = GridsPage {
            total: 120,
            limit: 50,
            ..Default::default()
        };
        assert_eq!(page.page_count(), 3);
    }

    #[test]
    fn page_count_exact_multiple() {
        let page = GridsPage {
            total: 100,
            limit: 50,
            ..Default::default()
        };
        assert_eq!(page.page_count(), 2);
    }

    #[test]
    fn page_count_without_limit_is_one() {
        let page = GridsPage {
            total: 120,
            limit: 0,
            ..Default::default()
        };
        assert_eq!(page.page_count(), 1);
    }

    #[test]
    fn page_count_empty_result_is_one() {
        let page = GridsPage {
            total: 0,
            limit: 50,
            ..Default::default()
        };
        assert_eq!(page.page_count(), 1);
    }

    #[test]
    fn grids_page_envelope_parse() {
        let json = r#"{"success":true,"page":0,"total":2,"limit":50,"data":[{"id":1},{"id":2}]}"#;
        let page: GridsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.limit, 50);
        assert_eq!(page.data.len(), 2);
    }

    #[test]
    fn api_response_with_errors() {
        let json = r#"{"success":false,"errors":["Game not found"]}"#;
        let resp: ApiResponse<GameDetail> = serde_json::from_str(json).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.errors, vec!["Game not found"]);
        assert_eq!(resp.data.id, 0);
    }
}
