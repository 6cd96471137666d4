use twdict_core::preprocess::Preprocessor;
use unicode_normalization::UnicodeNormalization;

/// Query normalization for Traditional Chinese input.
///
/// Composes to NFC and drops ideographic spaces, zero-width characters and
/// line breaks. Character variants are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChineseProcessor;

impl Preprocessor for ChineseProcessor {
    fn process(&self, text: &str) -> String {
        text.nfc()
            .filter(|c| !matches!(c, '\n' | '\r' | '\t' | '\u{200b}' | '\u{200d}' | '\u{feff}'))
            .collect::<String>()
            .trim_matches(|c: char| c.is_whitespace())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ideographic_space_and_zero_width() {
        assert_eq!(ChineseProcessor.process("\u{3000}梅雨\u{200b}\u{3000}"), "梅雨");
        assert_eq!(ChineseProcessor.process(" 藍寶石\n"), "藍寶石");
    }

    #[test]
    fn keeps_traditional_forms() {
        assert_eq!(ChineseProcessor.process("臺灣"), "臺灣");
    }
}
