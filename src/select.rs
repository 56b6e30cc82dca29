//! Picking the best subtitle out of archive entries and search results.

use bitflags::bitflags;

use crate::guess::VideoDescriptor;
use crate::score::{score, MatchScore};
use crate::{file_name, is_directory_entry, is_subtitle_file};

bitflags! {
    /// Languages a subtitle site advertises for a result.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LanguageTags: u8 {
        const ENGLISH = 0b0001;
        const TRADITIONAL = 0b0010;
        const SIMPLIFIED = 0b0100;
        /// Chinese and English in one file.
        const DUAL = 0b1000;
    }
}

impl LanguageTags {
    /// Tags advertised by a result title or description.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let mut tags = LanguageTags::empty();

        if lower.contains("英") || lower.contains("eng") {
            tags |= LanguageTags::ENGLISH;
        }
        if lower.contains("繁") || lower.contains("cht") {
            tags |= LanguageTags::TRADITIONAL;
        }
        if lower.contains("简") || lower.contains("chs") {
            tags |= LanguageTags::SIMPLIFIED;
        }
        if lower.contains("双语") || lower.contains("中英") || lower.contains("chs&eng") {
            tags |= LanguageTags::DUAL;
        }

        tags
    }

    /// Fixed-width label like `【简】      【英】      `.
    pub fn label(&self) -> String {
        [
            (LanguageTags::SIMPLIFIED, "【简】"),
            (LanguageTags::TRADITIONAL, "【繁】"),
            (LanguageTags::ENGLISH, "【英】"),
            (LanguageTags::DUAL, "【双】"),
        ]
        .iter()
        .map(|(flag, mark)| if self.contains(*flag) { *mark } else { "      " })
        .collect()
    }
}

/// One result returned by a subtitle site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Display name, prefixed with the site's choice prefix (e.g. `[LIBRARY]`).
    pub name: String,
    pub languages: LanguageTags,
    pub link: String,
    pub session: Option<String>,
}

/// Search results in site relevance order.
pub type SearchResults = Vec<SearchResult>;

/// Outcome of [`pick_best`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// True when the chosen candidate scored above zero.
    pub success: bool,
    /// Best candidate, returned even when `success` is false.
    pub chosen: Option<String>,
    pub score: MatchScore,
}

impl Selection {
    fn none() -> Self {
        Self {
            success: false,
            chosen: None,
            score: MatchScore::Rejected,
        }
    }
}

/// Score every subtitle entry in `candidates` and pick the highest.
///
/// Directory entries and names without a subtitle extension are skipped.
/// Only the final path component is scored. Ties go to the first candidate
/// seen.
pub fn pick_best<S: AsRef<str>>(candidates: &[S], video: &VideoDescriptor) -> Selection {
    let mut best: Option<(&str, MatchScore)> = None;

    for candidate in candidates {
        let candidate = candidate.as_ref();
        if is_directory_entry(candidate) || !is_subtitle_file(candidate) {
            continue;
        }

        let candidate_score = score(video, file_name(candidate), true);

        let better = match best {
            Some((_, best_score)) => candidate_score > best_score,
            None => true,
        };
        if better {
            best = Some((candidate, candidate_score));
        }
    }

    match best {
        Some((chosen, best_score)) => Selection {
            success: best_score.is_positive(),
            chosen: Some(chosen.to_string()),
            score: best_score,
        },
        None => Selection::none(),
    }
}

/// Put dual-language results first unless the top result already is one.
///
/// When the first result lacks [`LanguageTags::DUAL`], results are sorted by
/// descending tag value; the sort is stable so equal tags keep site order.
pub fn rank_search_results(mut results: SearchResults) -> SearchResults {
    let first_is_dual = results
        .first()
        .map(|first| first.languages.contains(LanguageTags::DUAL))
        .unwrap_or(true);

    if !first_is_dual {
        results.sort_by(|a, b| b.languages.bits().cmp(&a.languages.bits()));
    }

    results
}
