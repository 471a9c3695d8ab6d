use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SimsError};
use crate::utils::normalizer::nfc_owned;

/// One dictionary entry as delivered by the corpus producer:
/// the NFC headword and its tokenized, NFC-normalized definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub headword: String,
    pub tokens: Vec<String>,
}

impl CorpusRecord {
    /// Normalize both sides and split the definition on whitespace
    pub fn from_definition(headword: &str, definition: &str) -> Self {
        CorpusRecord {
            headword: nfc_owned(headword),
            tokens: definition.split_whitespace().map(nfc_owned).collect(),
        }
    }
}

/// Read a flat dictionary file: one `headword<TAB>definition` per line.
///
/// Document ids are the position of the record in the returned vector;
/// blank lines are skipped and do not consume an id.
pub fn read_flat_dictionary<R: BufRead>(reader: R) -> Result<Vec<CorpusRecord>> {
    let mut records = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        let (head, def) = line.split_once('\t').ok_or_else(|| {
            SimsError::format("flat dictionary", lineno + 1, "expected `headword<TAB>definition`")
        })?;
        records.push(CorpusRecord::from_definition(head, def));
    }
    debug!(records = records.len(), "read flat dictionary");
    Ok(records)
}

/// Split records into the two parallel streams the index build consumes.
pub fn split_records(records: Vec<CorpusRecord>) -> (Vec<String>, Vec<Vec<String>>) {
    records
        .into_iter()
        .map(|r| (r.headword, r.tokens))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_records_and_normalizes() {
        let input = "amicus\tfriend, ally\n\u{03C6}\u{03AF}\u{03BB}\u{03BF}\u{03C2}\tfriend dear\r\n\n";
        let records = read_flat_dictionary(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].headword, "amicus");
        assert_eq!(records[0].tokens, vec!["friend,", "ally"]);
        assert_eq!(records[1].tokens, vec!["friend", "dear"]);
    }

    #[test]
    fn missing_tab_is_format_error_with_line() {
        let input = "a\tb\nbroken line\n";
        match read_flat_dictionary(input.as_bytes()) {
            Err(SimsError::Format { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_definition_is_legal() {
        let records = read_flat_dictionary("lonely\t\n".as_bytes()).unwrap();
        assert_eq!(records[0].tokens, Vec::<String>::new());
    }
}
