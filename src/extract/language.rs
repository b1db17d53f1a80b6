//! Best-effort language identification for block text.

use crate::model::UNKNOWN_LANGUAGE;

/// Minimum alphabetic characters before detection is attempted.
const MIN_ALPHABETIC: usize = 3;

/// Identifies the language of a text fragment.
///
/// Implementations return `None` when the text is too short or ambiguous;
/// they never fail.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<String>;

    /// Language code, falling back to [`UNKNOWN_LANGUAGE`].
    fn language_of(&self, text: &str) -> String {
        self.detect(text)
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
    }
}

/// Detector backed by `whatlang`.
///
/// Codes are ISO 639-1 (`en`, `fr`, `zh-cn`) as written by langdetect-based
/// labeling tools, so block files from either source share language ids.
/// Languages without a two-letter code keep their ISO 639-3 code.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        if text.chars().filter(|c| c.is_alphabetic()).count() < MIN_ALPHABETIC {
            return None;
        }
        let info = whatlang::detect(text)?;
        if !info.is_reliable() {
            return None;
        }
        Some(two_letter_code(info.lang().code()).to_string())
    }
}

/// Map a whatlang ISO 639-3 code onto the langdetect code set.
fn two_letter_code(code: &'static str) -> &'static str {
    match code {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh-cn",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "no",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        other => other,
    }
}

/// Detector used when language identification is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLanguage;

impl LanguageDetector for NoLanguage {
    fn detect(&self, _text: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_unknown() {
        assert_eq!(WhatlangDetector.language_of("42"), UNKNOWN_LANGUAGE);
        assert_eq!(WhatlangDetector.language_of("a b"), UNKNOWN_LANGUAGE);
    }

    #[test]
    fn test_detects_english_sentence() {
        let text = "The quick brown fox jumps over the lazy dog while the farmer watches \
                    from the porch of his old wooden house.";
        assert_eq!(WhatlangDetector.language_of(text), "en");
    }

    #[test]
    fn test_codes_match_langdetect() {
        assert_eq!(two_letter_code("deu"), "de");
        assert_eq!(two_letter_code("cmn"), "zh-cn");
        assert_eq!(two_letter_code("nob"), "no");
        assert_eq!(two_letter_code("xyz"), "xyz");
    }

    #[test]
    fn test_no_language_always_unknown() {
        assert_eq!(
            NoLanguage.language_of("Ceci est une phrase en français."),
            UNKNOWN_LANGUAGE
        );
    }
}
