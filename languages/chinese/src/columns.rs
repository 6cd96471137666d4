use twdict_core::error::ParseError;

const HEADWORD: &[&str] = &["字詞名", "字詞", "詞目", "字頭", "headword", "word"];
const PRONUNCIATION: &[&str] = &["注音一式", "注音", "讀音", "pronunciation", "bopomofo"];
const DEFINITION: &[&str] = &["釋義", "解釋", "definition"];
const PART_OF_SPEECH: &[&str] = &["詞性", "part_of_speech", "pos"];
const EXAMPLES: &[&str] = &["例句", "examples"];
const EXTRA: &[&str] = &["其他資訊", "多音參見訊息", "備註", "additional_info", "extra"];

/// Header-name to column-position mapping for one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub headword: usize,
    pub pronunciation: usize,
    pub definition: usize,
    pub part_of_speech: Option<usize>,
    pub examples: Option<usize>,
    pub extra: Option<usize>,
}

impl ColumnMap {
    /// Resolve columns from the header row.
    ///
    /// Each field takes the first header equal to one of its aliases, then
    /// the first header containing (or contained in) an alias. A column is
    /// claimed by at most one field.
    pub fn from_header(header: &[String]) -> Result<Self, ParseError> {
        let header: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut taken = vec![false; header.len()];

        let mut required = |column: &'static str, aliases: &[&str]| {
            resolve(&header, &mut taken, aliases).ok_or_else(|| ParseError::MissingColumn {
                column,
                header: header.clone(),
            })
        };

        let headword = required("headword", HEADWORD)?;
        let pronunciation = required("pronunciation", PRONUNCIATION)?;
        let definition = required("definition", DEFINITION)?;

        Ok(Self {
            headword,
            pronunciation,
            definition,
            part_of_speech: resolve(&header, &mut taken, PART_OF_SPEECH),
            examples: resolve(&header, &mut taken, EXAMPLES),
            extra: resolve(&header, &mut taken, EXTRA),
        })
    }
}

fn resolve(header: &[String], taken: &mut [bool], aliases: &[&str]) -> Option<usize> {
    let free = |i: &usize| !taken[*i];

    let exact = aliases.iter().find_map(|alias| {
        (0..header.len())
            .filter(free)
            .find(|&i| header[i] == *alias)
    });

    let found = exact.or_else(|| {
        aliases.iter().find_map(|alias| {
            (0..header.len()).filter(free).find(|&i| {
                !header[i].is_empty() && (header[i].contains(alias) || alias.contains(header[i].as_str()))
            })
        })
    })?;

    taken[found] = true;
    Some(found)
}
