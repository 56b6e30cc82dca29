//! Search keywords, most specific first.

use crate::guess::{MediaKind, VideoDescriptor};

/// Short names subtitle sites index streaming services under.
const SERVICE_SHORT_NAMES: &[(&str, &str)] = &[
    ("amazon prime", "amzn"),
    ("netflix", "nf"),
    ("disney+", "dsnp"),
    ("hulu", "hulu"),
    ("hbo max", "hmax"),
    ("apple tv+", "atvp"),
];

fn service_short_name(service: &str) -> Option<&'static str> {
    let service = service.to_lowercase();
    SERVICE_SHORT_NAMES
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, short)| *short)
}

/// Ordered, URL-encoded search terms.
///
/// The title always comes first. Terms are dropped from the tail with
/// [`Keywords::narrow`] when a query is too specific to find anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keywords {
    terms: Vec<String>,
}

impl Keywords {
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// All terms joined into one query string.
    pub fn query(&self) -> String {
        self.terms.join(" ")
    }

    /// Drop the least specific term. Returns it, or `None` once only the
    /// title is left.
    pub fn narrow(&mut self) -> Option<String> {
        if self.terms.len() > 1 {
            self.terms.pop()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Build the keyword sequence for a video.
///
/// Order: title, season, year (movies only), episode, source, release group,
/// streaming service short name, screen size.
pub fn build_keywords(video: &VideoDescriptor) -> Keywords {
    let mut terms = Vec::new();

    if let Some(title) = &video.title {
        terms.push(title.clone());
    }
    if let Some(season) = video.season.filter(|&s| s > 0) {
        terms.push(format!("s{:02}", season));
    }
    if video.kind == MediaKind::Movie {
        if let Some(year) = video.year {
            terms.push(year.to_string());
        }
    }
    if let Some(episode) = video.episode.filter(|&e| e > 0) {
        terms.push(format!("e{:02}", episode));
    }
    if let Some(source) = &video.source {
        terms.push(source.replace('-', ""));
    }
    if let Some(group) = &video.release_group {
        terms.push(group.clone());
    }
    if let Some(short) = video.streaming_service.as_deref().and_then(service_short_name) {
        terms.push(short.to_string());
    }
    if let Some(size) = &video.screen_size {
        terms.push(size.clone());
    }

    let terms = terms
        .iter()
        .map(|term| urlencoding::encode(term).into_owned())
        .collect();

    Keywords { terms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guess::guess;

    fn terms(name: &str) -> Vec<String> {
        build_keywords(&guess(name)).terms().to_vec()
    }

    #[test]
    fn test_episode_keywords() {
        let video = VideoDescriptor::episode("The Flash", Some(1), Some(1));
        let keywords = build_keywords(&video);
        assert_eq!(keywords.terms(), ["The%20Flash", "s01", "e01"]);
        assert_eq!(keywords.query(), "The%20Flash s01 e01");
    }

    #[test]
    fn test_keywords_from_names() {
        assert_eq!(
            terms("Show.S01E01.ShowName.1080p.AMZN.WEB-DL.DDP5.1.H.264-GRP.mkv"),
            ["Show", "s01", "e01", "Web", "GRP", "amzn", "1080p"]
        );
        assert_eq!(
            terms("Hanzawa.Naoki.Ep10.Final.Chi_Jap.BDrip.1280X720-ZhuixinFan.mp4"),
            ["Hanzawa%20Naoki", "e10", "Bluray", "ZhuixinFan", "720p"]
        );
        assert_eq!(
            terms("Homeland.S02E12.PROPER.720p.HDTV.x264-EVOLVE.mkv"),
            ["Homeland", "s02", "e12", "HDTV", "EVOLVE", "720p"]
        );
        assert_eq!(
            terms("La.La.Land.2016.1080p.BluRay.x264.Atmos.TrueHD.7.1-HDChina.mkv"),
            ["La%20La%20Land", "2016", "Bluray", "HDChina", "1080p"]
        );
    }

    #[test]
    fn test_year_only_for_movies() {
        let mut video = VideoDescriptor::episode("Doctor Who", Some(1), Some(2));
        video.year = Some(2005);
        assert_eq!(build_keywords(&video).terms(), ["Doctor%20Who", "s01", "e02"]);
    }

    #[test]
    fn test_unknown_service_is_skipped() {
        let mut video = VideoDescriptor::movie("Heat", Some(1995));
        video.streaming_service = Some("Crackle".to_string());
        assert_eq!(build_keywords(&video).terms(), ["Heat", "1995"]);
    }

    #[test]
    fn test_narrow_keeps_title() {
        let video = VideoDescriptor::episode("The Flash", Some(1), Some(1));
        let mut keywords = build_keywords(&video);

        assert_eq!(keywords.narrow().as_deref(), Some("e01"));
        assert_eq!(keywords.narrow().as_deref(), Some("s01"));
        assert_eq!(keywords.narrow(), None);
        assert_eq!(keywords.terms(), ["The%20Flash"]);
        assert_eq!(keywords.len(), 1);
    }
}
