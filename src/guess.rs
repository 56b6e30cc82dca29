//! Release name parsing.
//!
//! Turns names like `The.Walking.Dead.S10E01.1080p.WEB.H264-TBS.mkv` into a
//! [`VideoDescriptor`]. The same parser is used for videos and for candidate
//! subtitle names, so matching compares like with like.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{file_name, is_archive_file, is_subtitle_file, is_video_file, split_extension};

/// Whether a release is a single movie or an episode of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    #[default]
    Movie,
    Episode,
}

/// Structured metadata guessed from a release name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoDescriptor {
    pub title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub year: Option<u32>,
    pub kind: MediaKind,
    /// `Web`, `Blu-ray`, `HDTV`, `DVD` or `HD-DVD`
    pub source: Option<String>,
    pub release_group: Option<String>,
    /// e.g. `1080p`
    pub screen_size: Option<String>,
    /// e.g. `Amazon Prime`
    pub streaming_service: Option<String>,
}

impl VideoDescriptor {
    pub fn movie(title: &str, year: Option<u32>) -> Self {
        Self {
            title: Some(title.to_string()),
            year,
            kind: MediaKind::Movie,
            ..Default::default()
        }
    }

    pub fn episode(title: &str, season: Option<u32>, episode: Option<u32>) -> Self {
        Self {
            title: Some(title.to_string()),
            season,
            episode,
            kind: MediaKind::Episode,
            ..Default::default()
        }
    }
}

// =============================================================================
// Token patterns
// =============================================================================

static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._\s\[\]()&【】+,]+").unwrap());

static SEASON_EPISODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^s(\d{1,2})e(\d{1,3})(?:-?e\d{1,3})*$").unwrap());

static SEASON_ONLY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^s(\d{1,2})$").unwrap());

static EPISODE_ONLY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ep?(\d{1,3})$").unwrap());

static CROSS_EPISODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})x(\d{2,3})$").unwrap());

static CHINESE_SEASON_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第([0-9零一二两三四五六七八九十百]+)季").unwrap());

static CHINESE_EPISODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第([0-9零一二两三四五六七八九十百]+)[集话]").unwrap());

static YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(19\d{2}|20\d{2})$").unwrap());

static SCREEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{3,4})([pi])$").unwrap());

static FRAME_SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3,4}x(\d{3,4})$").unwrap());

static VIDEO_CODEC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(x26[45]|h26[45]|hevc|avc|av1|vp9|xvid|divx|10bit|8bit|hi10p)$").unwrap()
});

static AUDIO_CODEC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(ddp?|e?ac3|aac|dts|dtshd|truehd|atmos|flac|mp3|opus)(\d(ch)?)?$").unwrap()
});

static RELEASE_TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^(
            repack|rerip|proper|internal|limited|extended|unrated|uncut|
            remastered|complete|imax|hdr|hdr10|remux|multi|dubbed|subbed
        )$",
    )
    .unwrap()
});

static LANGUAGE_TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(chs|cht|eng|chi|chn|gb|big5|jap|jpn|[简繁中英日韩文双语字幕体]+)$").unwrap()
});

static RELEASE_GROUP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-([A-Za-z0-9]+)(?:\[[^\]]*\])?$").unwrap());

/// What a single name token says about the release.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Marker {
    SeasonEpisode(Option<u32>, Option<u32>),
    Year(u32),
    Screen(String),
    Source(&'static str),
    Service(&'static str),
    Tag,
}

fn parse_number(digits: &str) -> Option<u32> {
    if digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.parse().ok();
    }
    parse_chinese_number(digits)
}

/// Chinese numerals up to the hundreds, e.g. `十二` or `二十二`.
fn parse_chinese_number(text: &str) -> Option<u32> {
    let mut total = 0;
    let mut digit = None;
    for c in text.chars() {
        let value = match c {
            '零' => 0,
            '一' => 1,
            '二' | '两' => 2,
            '三' => 3,
            '四' => 4,
            '五' => 5,
            '六' => 6,
            '七' => 7,
            '八' => 8,
            '九' => 9,
            '十' => {
                total += digit.take().unwrap_or(1) * 10;
                continue;
            }
            '百' => {
                total += digit.take().unwrap_or(1) * 100;
                continue;
            }
            _ => return None,
        };
        digit = Some(value);
    }
    Some(total + digit.unwrap_or(0))
}

fn source_name(token: &str) -> Option<&'static str> {
    match token.replace('-', "").as_str() {
        "web" | "webdl" | "webrip" | "webhd" => Some("Web"),
        "bluray" | "bdrip" | "brrip" | "bd" | "bdremux" | "bluraydisc" => Some("Blu-ray"),
        "hdtv" | "hdtvrip" | "pdtv" => Some("HDTV"),
        "dvd" | "dvdrip" | "dvd5" | "dvd9" => Some("DVD"),
        "hddvd" | "hddvdrip" => Some("HD-DVD"),
        _ => None,
    }
}

fn service_name(token: &str) -> Option<&'static str> {
    match token {
        "amzn" | "amazon" => Some("Amazon Prime"),
        "nf" | "netflix" => Some("Netflix"),
        "dsnp" | "disney" => Some("Disney+"),
        "hulu" => Some("Hulu"),
        "hmax" => Some("HBO Max"),
        "atvp" => Some("Apple TV+"),
        _ => None,
    }
}

/// Classify one token. `index` is its position in the name; a year in the
/// first position is part of the title (e.g. `2012.mkv`).
fn classify_token(token: &str, index: usize) -> Option<Marker> {
    let lower = token.to_lowercase();
    let lower = lower.as_str();

    if let Some(caps) = SEASON_EPISODE_PATTERN.captures(lower) {
        return Some(Marker::SeasonEpisode(
            caps[1].parse().ok(),
            caps[2].parse().ok(),
        ));
    }
    if let Some(caps) = SEASON_ONLY_PATTERN.captures(lower) {
        return Some(Marker::SeasonEpisode(caps[1].parse().ok(), None));
    }
    if let Some(caps) = EPISODE_ONLY_PATTERN.captures(lower) {
        return Some(Marker::SeasonEpisode(None, caps[1].parse().ok()));
    }
    if let Some(caps) = CROSS_EPISODE_PATTERN.captures(lower) {
        return Some(Marker::SeasonEpisode(
            caps[1].parse().ok(),
            caps[2].parse().ok(),
        ));
    }

    let season = CHINESE_SEASON_PATTERN
        .captures(lower)
        .and_then(|caps| parse_number(&caps[1]));
    let episode = CHINESE_EPISODE_PATTERN
        .captures(lower)
        .and_then(|caps| parse_number(&caps[1]));
    if season.is_some() || episode.is_some() {
        return Some(Marker::SeasonEpisode(season, episode));
    }

    if index > 0 {
        if let Some(caps) = YEAR_PATTERN.captures(lower) {
            if let Ok(year) = caps[1].parse() {
                return Some(Marker::Year(year));
            }
        }
    }

    if let Some(caps) = SCREEN_PATTERN.captures(lower) {
        return Some(Marker::Screen(format!("{}{}", &caps[1], &caps[2])));
    }
    if let Some(caps) = FRAME_SIZE_PATTERN.captures(lower) {
        return Some(Marker::Screen(format!("{}p", &caps[1])));
    }
    if lower == "4k" || lower == "uhd" {
        return Some(Marker::Screen("2160p".to_string()));
    }

    if let Some(source) = source_name(lower) {
        return Some(Marker::Source(source));
    }
    if let Some(service) = service_name(lower) {
        return Some(Marker::Service(service));
    }

    if VIDEO_CODEC_PATTERN.is_match(lower)
        || AUDIO_CODEC_PATTERN.is_match(lower)
        || RELEASE_TAG_PATTERN.is_match(lower)
        || LANGUAGE_TAG_PATTERN.is_match(lower)
    {
        return Some(Marker::Tag);
    }

    None
}

/// Classify a token, falling back to the part before a `-` for tokens
/// like `WEB-DL` or `x264-GROUP`.
fn classify(token: &str, index: usize) -> Option<Marker> {
    classify_token(token, index).or_else(|| {
        let (prefix, _) = token.split_once('-')?;
        if prefix.is_empty() {
            return None;
        }
        classify_token(prefix, index)
    })
}

/// Guess release metadata from a file name.
///
/// Deterministic: the same input always yields the same descriptor.
pub fn guess(name: &str) -> VideoDescriptor {
    let base = file_name(name);
    let stem = if is_video_file(base) || is_subtitle_file(base) || is_archive_file(base) {
        split_extension(base).0
    } else {
        base
    };

    let tokens: Vec<&str> = TOKEN_SPLIT
        .split(stem)
        .filter(|token| !token.is_empty())
        .collect();

    let mut descriptor = VideoDescriptor::default();
    let mut title_end = None;

    for (index, token) in tokens.iter().enumerate() {
        let Some(marker) = classify(token, index) else {
            continue;
        };
        title_end.get_or_insert(index);

        match marker {
            Marker::SeasonEpisode(season, episode) => {
                if descriptor.season.is_none() {
                    descriptor.season = season;
                }
                if descriptor.episode.is_none() {
                    descriptor.episode = episode;
                }
            }
            Marker::Year(year) => {
                descriptor.year.get_or_insert(year);
            }
            Marker::Screen(size) => {
                descriptor.screen_size.get_or_insert(size);
            }
            Marker::Source(source) => {
                descriptor.source.get_or_insert_with(|| source.to_string());
            }
            Marker::Service(service) => {
                descriptor
                    .streaming_service
                    .get_or_insert_with(|| service.to_string());
            }
            Marker::Tag => {}
        }
    }

    let title_tokens = &tokens[..title_end.unwrap_or(tokens.len())];
    if !title_tokens.is_empty() {
        descriptor.title = Some(title_tokens.join(" "));
    }

    // A trailing "-GROUP" only counts once the title has ended, so names
    // like "X-Men" keep their hyphen.
    if title_end.is_some() {
        descriptor.release_group = RELEASE_GROUP_PATTERN
            .captures(stem)
            .map(|caps| caps[1].to_string());
    }

    if descriptor.season.is_some() || descriptor.episode.is_some() {
        descriptor.kind = MediaKind::Episode;
    }

    descriptor
}
