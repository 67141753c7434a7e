use std::fmt;

/// Episode count assumed when a season carries no explicit count
pub const DEFAULT_EPISODE_COUNT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Movie,
    Series,
}

impl ContentKind {
    /// Path segment used by Stremio addons
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Series => "series",
        }
    }

    pub fn from_addon_type(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(ContentKind::Movie),
            "series" | "tv" | "show" => Some(ContentKind::Series),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user is browsing at one navigation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    pub imdb_id: String,
    pub kind: ContentKind,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl ContentRef {
    pub fn movie(imdb_id: impl Into<String>) -> Self {
        Self {
            imdb_id: imdb_id.into(),
            kind: ContentKind::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn episode(imdb_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            imdb_id: imdb_id.into(),
            kind: ContentKind::Series,
            season: Some(season),
            episode: Some(episode),
        }
    }

    /// "S1E2" style label, None for movies
    pub fn episode_label(&self) -> Option<String> {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => Some(format!("S{}E{}", s, e)),
            _ => None,
        }
    }
}

/// Checks the identifier scheme expected by the addons
pub fn is_imdb_id(id: &str) -> bool {
    id.len() > 2 && id.starts_with("tt")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonInfo {
    pub season_number: u32,
    pub episode_count: Option<u32>,
}

/// Metadata of the title whose streams are requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleMeta {
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: Option<u16>,
    pub number_of_seasons: Option<u32>,
    pub seasons: Vec<SeasonInfo>,
    /// Present for series even when the date itself is unknown
    pub first_air_date: Option<String>,
}

impl TitleMeta {
    pub fn movie(imdb_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            imdb_id: Some(imdb_id.into()),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn series(imdb_id: impl Into<String>, title: impl Into<String>, seasons: Vec<SeasonInfo>) -> Self {
        Self {
            imdb_id: Some(imdb_id.into()),
            title: title.into(),
            number_of_seasons: Some(seasons.len() as u32).filter(|n| *n > 0),
            seasons,
            first_air_date: Some(String::new()),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> ContentKind {
        if self.number_of_seasons.is_some_and(|n| n > 0)
            || !self.seasons.is_empty()
            || self.first_air_date.is_some()
        {
            ContentKind::Series
        } else {
            ContentKind::Movie
        }
    }

    /// IMDb id if present and well-formed
    pub fn imdb_id(&self) -> Option<&str> {
        self.imdb_id
            .as_deref()
            .map(str::trim)
            .filter(|id| is_imdb_id(id))
    }

    pub fn season_count(&self) -> u32 {
        self.number_of_seasons
            .filter(|n| *n > 0)
            .or_else(|| Some(self.seasons.len() as u32).filter(|n| *n > 0))
            .unwrap_or(1)
    }

    pub fn episode_count(&self, season: u32) -> u32 {
        self.seasons
            .iter()
            .find(|s| s.season_number == season)
            .and_then(|s| s.episode_count)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_EPISODE_COUNT)
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Video"
        } else {
            &self.title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_resolution() {
        assert_eq!(TitleMeta::movie("tt1", "A").kind(), ContentKind::Movie);

        let with_count = TitleMeta {
            number_of_seasons: Some(3),
            ..TitleMeta::movie("tt1", "A")
        };
        assert_eq!(with_count.kind(), ContentKind::Series);

        let with_list = TitleMeta {
            seasons: vec![SeasonInfo {
                season_number: 1,
                episode_count: None,
            }],
            ..TitleMeta::movie("tt1", "A")
        };
        assert_eq!(with_list.kind(), ContentKind::Series);
    }

    #[test]
    fn test_season_and_episode_counts() {
        let meta = TitleMeta::series(
            "tt2",
            "Show",
            vec![
                SeasonInfo {
                    season_number: 1,
                    episode_count: Some(8),
                },
                SeasonInfo {
                    season_number: 2,
                    episode_count: None,
                },
            ],
        );
        assert_eq!(meta.season_count(), 2);
        assert_eq!(meta.episode_count(1), 8);
        assert_eq!(meta.episode_count(2), DEFAULT_EPISODE_COUNT);
        assert_eq!(meta.episode_count(7), DEFAULT_EPISODE_COUNT);

        let bare = TitleMeta {
            first_air_date: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(bare.season_count(), 1);
    }

    #[test]
    fn test_imdb_id_validation() {
        assert_eq!(TitleMeta::movie("tt0133093", "M").imdb_id(), Some("tt0133093"));
        assert_eq!(TitleMeta::movie("", "M").imdb_id(), None);
        assert_eq!(TitleMeta::movie("tmdb:603", "M").imdb_id(), None);
        assert_eq!(TitleMeta::default().imdb_id(), None);
    }

    #[test]
    fn test_episode_label() {
        assert_eq!(ContentRef::episode("tt1", 2, 5).episode_label(), Some("S2E5".to_string()));
        assert_eq!(ContentRef::movie("tt1").episode_label(), None);
    }
}
