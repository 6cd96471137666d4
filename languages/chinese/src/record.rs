use std::sync::LazyLock;

use regex::Regex;
use twdict_types::DictionaryRecord;
use unicode_normalization::UnicodeNormalization;

use crate::columns::ColumnMap;

/// Enumerated sense markers: （一）（二）… and circled numbers ①…⑳
static ENUMERATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[（(][一二三四五六七八九十]+[）)]|[①-⑳]").expect("enumerated marker pattern")
});

/// Explicit separators between readings
static READING_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[|｜/／、;；\n]").expect("reading delimiter pattern"));

/// Separators between per-reading definitions when not on separate lines
static DEFINITION_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[|｜]").expect("definition delimiter pattern"));

/// Build a record from one data row. Returns `None` when the headword is
/// blank.
pub fn record_from_row(columns: &ColumnMap, cells: &[String]) -> Option<DictionaryRecord> {
    let cell = |index: usize| cells.get(index).map(|c| clean_cell(c)).unwrap_or_default();
    let optional = |index: Option<usize>| index.map(cell).filter(|c| !c.is_empty());

    let headword = cell(columns.headword);
    if headword.is_empty() {
        return None;
    }

    let pronunciations = split_pronunciations(&cell(columns.pronunciation), headword.chars().count());
    let definitions = align_definitions(&cell(columns.definition), pronunciations.len());

    let examples = optional(columns.examples)
        .map(|text| {
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(DictionaryRecord {
        headword,
        pronunciations,
        part_of_speech: optional(columns.part_of_speech),
        definitions,
        examples,
        extra: optional(columns.extra),
    })
}

/// Trim, unify line endings and compose to NFC.
pub fn clean_cell(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .nfc()
        .collect()
}

/// Split a pronunciation cell into one reading per sense.
///
/// Whitespace separates syllables of a multi-character word, so it only
/// splits readings when the headword is a single character.
pub fn split_pronunciations(raw: &str, headword_chars: usize) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return vec![String::new()];
    }

    let mut readings = if ENUMERATED.is_match(raw) {
        segments(&ENUMERATED, raw)
    } else {
        segments(&READING_DELIMITER, raw)
    };

    if readings.len() == 1 && headword_chars == 1 {
        readings = readings[0]
            .split(|c: char| c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }

    if readings.is_empty() {
        readings.push(String::new());
    }
    readings
}

/// Produce exactly `count` definitions.
///
/// Tries enumerated markers, then line breaks, then `|`. When no split
/// yields `count` parts the whole text is repeated for every reading.
pub fn align_definitions(raw: &str, count: usize) -> Vec<String> {
    let raw = raw.trim();
    if count <= 1 {
        return vec![raw.to_string()];
    }
    if raw.is_empty() {
        return vec![String::new(); count];
    }

    let candidates = [
        segments(&ENUMERATED, raw),
        raw.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        segments(&DEFINITION_DELIMITER, raw),
    ];

    candidates
        .into_iter()
        .find(|parts| parts.len() == count)
        .unwrap_or_else(|| {
            tracing::debug!("Cannot align {} readings, repeating definition", count);
            vec![raw.to_string(); count]
        })
}

fn segments(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnMap {
        ColumnMap {
            headword: 0,
            pronunciation: 1,
            definition: 3,
            part_of_speech: Some(2),
            examples: Some(4),
            extra: Some(5),
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn single_reading_row() {
        let record = record_from_row(
            &columns(),
            &row(&["藍寶石", "ㄌㄢˊ ㄅㄠˇ ㄕˊ", "名詞", "寶石名...", "她的戒指上鑲著一顆藍寶石。", ""]),
        )
        .unwrap();

        assert_eq!(record.headword, "藍寶石");
        assert_eq!(record.pronunciations, vec!["ㄌㄢˊ ㄅㄠˇ ㄕˊ"]);
        assert_eq!(record.definitions, vec!["寶石名..."]);
        assert_eq!(record.part_of_speech.as_deref(), Some("名詞"));
        assert_eq!(record.examples, vec!["她的戒指上鑲著一顆藍寶石。"]);
        assert_eq!(record.extra, None);
    }

    #[test]
    fn bar_separated_readings_align_with_lines() {
        let record = record_from_row(
            &columns(),
            &row(&["行", "ㄒㄧㄥˊ|ㄒㄧㄥˋ|ㄏㄢˊ", "", "義1\n義2\n義3", "", ""]),
        )
        .unwrap();

        assert_eq!(record.pronunciations, vec!["ㄒㄧㄥˊ", "ㄒㄧㄥˋ", "ㄏㄢˊ"]);
        assert_eq!(record.definitions, vec!["義1", "義2", "義3"]);
        assert_eq!(record.senses().nth(1), Some(("ㄒㄧㄥˋ", "義2")));
    }

    #[test]
    fn enumerated_readings_and_definitions() {
        let readings = split_pronunciations("（一）ㄉㄜˊ（二）ㄉㄧˊ（三）ㄉㄧˋ", 1);
        assert_eq!(readings, vec!["ㄉㄜˊ", "ㄉㄧˊ", "ㄉㄧˋ"]);

        let definitions = align_definitions("①助詞。②確實。③箭靶的中心。", 3);
        assert_eq!(definitions, vec!["助詞。", "確實。", "箭靶的中心。"]);
    }

    #[test]
    fn whitespace_splits_only_single_characters() {
        assert_eq!(split_pronunciations("ㄒㄧㄥˊ ㄏㄤˊ", 1), vec!["ㄒㄧㄥˊ", "ㄏㄤˊ"]);
        assert_eq!(split_pronunciations("ㄇㄟˊ ㄩˇ", 2), vec!["ㄇㄟˊ ㄩˇ"]);
    }

    #[test]
    fn misaligned_definition_is_repeated() {
        let definitions = align_definitions("只有一個解釋。", 2);
        assert_eq!(definitions, vec!["只有一個解釋。", "只有一個解釋。"]);
    }

    #[test]
    fn blank_cells_become_empty_strings() {
        let record = record_from_row(&columns(), &row(&["梅", "", "", ""])).unwrap();
        assert_eq!(record.pronunciations, vec![""]);
        assert_eq!(record.definitions, vec![""]);
        assert!(record.examples.is_empty());
        assert_eq!(record.part_of_speech, None);
    }

    #[test]
    fn blank_headword_is_skipped() {
        assert!(record_from_row(&columns(), &row(&["  ", "ㄇㄟˊ", "", "植物名。"])).is_none());
        assert!(record_from_row(&columns(), &[]).is_none());
    }

    #[test]
    fn cells_are_trimmed_and_composed() {
        assert_eq!(clean_cell("  e\u{301}\r\n"), "\u{e9}");
        assert_eq!(clean_cell("義1\r\n義2"), "義1\n義2");
    }

    #[quickcheck_macros::quickcheck]
    fn senses_always_align(headword: String, pronunciation: String, definition: String) -> bool {
        let cells = vec![headword, pronunciation, String::new(), definition];
        match record_from_row(&columns(), &cells) {
            Some(record) => record.pronunciations.len() == record.definitions.len(),
            None => true,
        }
    }
}
