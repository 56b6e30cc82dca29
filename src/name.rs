//! Mixed-language file name cleanup.
//!
//! Release names from Chinese subtitle groups mix CJK text with the Latin
//! release name, e.g. `[SPS辛普森一家字幕组].[丑陋的美国人.第一季].Ugly.Americans.S01E01.rmvb`.
//! The metadata parser works best on one script, so the dominant one is
//! isolated before parsing.

use crate::split_extension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Chinese,
    Latin,
    Other,
}

fn classify(c: char) -> Script {
    match c {
        '\u{4e00}'..='\u{9fff}' => Script::Chinese,
        'a'..='z' | 'A'..='Z' => Script::Latin,
        _ => Script::Other,
    }
}

/// Extract the dominant-language part of `name`.
///
/// The extension is split off first and appended back to the result. When
/// `force_english` is set, or Latin letters are at least as frequent as
/// Chinese characters, Latin text is kept and Chinese text dropped;
/// otherwise the reverse. Returns an empty string when the kept script does
/// not occur at all.
///
/// If the dropped script sits entirely before or after the kept one, the
/// name is trimmed at that boundary. If the two interleave, the longest run
/// of kept-script text (spanning any punctuation inside it) is returned.
pub fn extract_dominant_language(name: &str, force_english: bool) -> String {
    let (stem, suffix) = split_extension(name);
    let chars: Vec<char> = stem.chars().collect();
    let scripts: Vec<Script> = chars.iter().map(|&c| classify(c)).collect();

    let chinese = scripts.iter().filter(|&&s| s == Script::Chinese).count();
    let latin = scripts.iter().filter(|&&s| s == Script::Latin).count();

    let (target, discard) = if force_english || chinese <= latin {
        (Script::Latin, Script::Chinese)
    } else {
        (Script::Chinese, Script::Latin)
    };

    let positions = |script: Script| -> Vec<usize> {
        scripts
            .iter()
            .enumerate()
            .filter(|(_, &s)| s == script)
            .map(|(i, _)| i)
            .collect()
    };
    let targets = positions(target);
    let discards = positions(discard);

    let (first_target, last_target) = match (targets.first(), targets.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return String::new(),
    };

    let kept: String = match (discards.first(), discards.last()) {
        (Some(&first_discard), Some(&last_discard)) => {
            if last_discard < first_target {
                chars[first_target..].iter().collect()
            } else if last_target < first_discard {
                chars[..first_discard].iter().collect()
            } else {
                let (start, end) = longest_run(&scripts, target, discard);
                chars[start..=end].iter().collect()
            }
        }
        _ => chars[first_target..].iter().collect(),
    };

    format!("{}{}", kept.trim(), suffix)
}

/// Longest span that starts on a `target` character and runs through every
/// following non-`discard` character. Earlier spans win ties.
fn longest_run(scripts: &[Script], target: Script, discard: Script) -> (usize, usize) {
    let mut best: Option<(usize, usize)> = None;
    let mut current: Option<(usize, usize)> = None;

    let mut close = |current: &mut Option<(usize, usize)>| {
        if let Some((start, end)) = current.take() {
            let longer = match best {
                Some((s, e)) => end - start > e - s,
                None => true,
            };
            if longer {
                best = Some((start, end));
            }
        }
    };

    for (i, &script) in scripts.iter().enumerate() {
        if script == discard {
            close(&mut current);
        } else if let Some((start, _)) = current {
            current = Some((start, i));
        } else if script == target {
            current = Some((i, i));
        }
    }
    close(&mut current);

    // Callers only get here with at least one target character.
    best.unwrap_or((0, 0))
}

/// Recover a file name stored with a legacy (GBK) code page.
///
/// Zip entries without the UTF-8 flag carry raw bytes that readers decode
/// as cp437, which garbles Chinese names. Valid UTF-8 (including plain
/// ASCII) is returned as-is; otherwise the bytes are decoded as GBK.
/// Returns `None` when neither decoding is clean.
pub fn repair_legacy_name(raw: &[u8]) -> Option<String> {
    if let Ok(utf8) = std::str::from_utf8(raw) {
        return Some(utf8.to_string());
    }

    encoding_rs::GBK
        .decode_without_bom_handling_and_without_replacement(raw)
        .map(|name| name.into_owned())
}
