// src/analyze/language.rs
//! Best-effort statistical language identification (`whatlang`).

pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Minimum trimmed length (chars) worth handing to the detector.
const MIN_CHARS: usize = 3;

/// ISO 639-1 for common languages, whatlang's ISO 639-3 otherwise,
/// `UNKNOWN_LANGUAGE` for short input or no verdict.
pub fn detect_language(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() < MIN_CHARS {
        return UNKNOWN_LANGUAGE.to_string();
    }
    match whatlang::detect(text) {
        Some(info) => short_code(info.lang().code()).to_string(),
        None => {
            tracing::debug!(target: "classify", "language detection gave no result");
            UNKNOWN_LANGUAGE.to_string()
        }
    }
}

fn short_code(iso639_3: &'static str) -> &'static str {
    match iso639_3 {
        "eng" => "en",
        "jpn" => "ja",
        "cmn" => "zh",
        "kor" => "ko",
        "deu" => "de",
        "fra" => "fr",
        "spa" => "es",
        "rus" => "ru",
        "por" => "pt",
        "ita" => "it",
        other => other,
    }
}
