//! Candidate subtitle scoring.

use std::fmt;

use tracing::debug;

use crate::guess::{guess, MediaKind, VideoDescriptor};

/// Score of one candidate against a video.
///
/// `Rejected` orders below every `Scored` value, so the derived `Ord` can be
/// used directly to find the best candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchScore {
    Rejected,
    Scored(u32),
}

impl MatchScore {
    /// Numeric form, `-1` for rejected candidates.
    pub fn value(self) -> i64 {
        match self {
            MatchScore::Rejected => -1,
            MatchScore::Scored(n) => i64::from(n),
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, MatchScore::Scored(n) if n > 0)
    }
}

impl fmt::Display for MatchScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

const SIMPLIFIED_MARKERS: [&str; 3] = ["简体", "chs", ".gb."];
const TRADITIONAL_MARKERS: [&str; 3] = ["繁体", "cht", ".big5."];
const BILINGUAL_MARKERS: [&str; 2] = ["chs.eng", "chs&eng"];
const DUAL_MARKERS: [&str; 4] = ["中英", "简英", "双语", "简体&英文"];

const SIMPLIFIED_BONUS: u32 = 2;
/// Traditional subtitles are recognized but earn nothing.
const TRADITIONAL_BONUS: u32 = 0;
const BILINGUAL_BONUS: u32 = 2;
const DUAL_BONUS: u32 = 4;

fn contains_any(name: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| name.contains(marker))
}

/// Language and format bonus, computed on the lowercased full name.
fn content_bonus(name: &str) -> u32 {
    let mut bonus = 0;

    if contains_any(name, &SIMPLIFIED_MARKERS) {
        bonus += SIMPLIFIED_BONUS;
    }
    if contains_any(name, &TRADITIONAL_MARKERS) {
        bonus += TRADITIONAL_BONUS;
    }
    if contains_any(name, &BILINGUAL_MARKERS) {
        bonus += BILINGUAL_BONUS;
    }
    if contains_any(name, &DUAL_MARKERS) {
        bonus += DUAL_BONUS;
    }

    // Substring match, so any name containing these letters qualifies.
    if name.contains("ass") || name.contains("ssa") {
        bonus += 2;
    }
    if name.contains("srt") {
        bonus += 1;
    }

    bonus
}

/// Score `candidate` against `video`.
///
/// The candidate is parsed with the same guesser as the video. Movies earn a
/// point each for matching year and title; a different non-empty title
/// rejects. Episodes with a matching title need a matching season, and a
/// matching episode when `match_episode` is set; without a title match only
/// an untitled candidate with the same season and episode survives.
///
/// Missing fields compare equal to each other, so an untitled candidate
/// matches an untitled video.
pub fn score(video: &VideoDescriptor, candidate: &str, match_episode: bool) -> MatchScore {
    let name = candidate.to_lowercase();
    let parsed = guess(&name);

    let video_title = video.title.as_ref().map(|t| t.to_lowercase());
    let candidate_title = parsed.title.as_ref().map(|t| t.to_lowercase());
    let same_title = video_title == candidate_title;

    let mut points = 0;

    match video.kind {
        MediaKind::Movie => {
            if video.year == parsed.year {
                points += 1;
            }
            if same_title {
                points += 1;
            } else if candidate_title.is_some() {
                debug!(candidate, "rejected: title mismatch");
                return MatchScore::Rejected;
            }
        }
        MediaKind::Episode => {
            if same_title {
                if video.season != parsed.season {
                    debug!(candidate, "rejected: season mismatch");
                    return MatchScore::Rejected;
                }
                if match_episode && video.episode != parsed.episode {
                    debug!(candidate, "rejected: episode mismatch");
                    return MatchScore::Rejected;
                }
                points += 1;
            } else if video.season == parsed.season && video.episode == parsed.episode {
                if candidate_title.is_some() {
                    debug!(candidate, "rejected: episode matches but title differs");
                    return MatchScore::Rejected;
                }
            } else {
                debug!(candidate, "rejected: neither title nor episode match");
                return MatchScore::Rejected;
            }
        }
    }

    let total = points + content_bonus(&name);
    debug!(candidate, score = total, "scored");
    MatchScore::Scored(total)
}
