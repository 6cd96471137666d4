use unicode_normalization::UnicodeNormalization;

pub trait Preprocessor {
    // Default query normalization: trim, NFC, drop line breaks and tabs
    fn process(&self, text: &str) -> String {
        let text = text.trim();

        if text.is_empty() {
            return String::new();
        }

        text.nfc()
            .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
            .collect::<String>()
            .trim()
            .to_string()
    }
}
