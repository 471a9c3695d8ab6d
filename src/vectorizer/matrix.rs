use std::io::{BufRead, Write};

use tracing::debug;

use crate::error::{Result, SimsError};
use crate::utils::math::vector::ZeroSpVec;
use crate::vectorizer::tfidf::WeightVector;

const BANNER: &str = "%%MatrixMarket matrix coordinate real general";
const CONTEXT: &str = "matrix market";

/// The weighted corpus: one sparse row per document, index-aligned with
/// headword ids. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentMatrix {
    n_terms: usize,
    docs: Vec<WeightVector>,
}

impl DocumentMatrix {
    /// Every row must have dimension `n_terms`.
    pub fn new(docs: Vec<WeightVector>, n_terms: usize) -> Result<Self> {
        if let Some(bad) = docs.iter().find(|d| d.len() != n_terms) {
            return Err(SimsError::DimensionMismatch {
                what: "document vector dimension",
                expected: n_terms,
                found: bad.len(),
            });
        }
        Ok(DocumentMatrix { n_terms, docs })
    }

    /// number of documents
    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// term-id cardinality
    #[inline]
    pub fn n_terms(&self) -> usize {
        self.n_terms
    }

    pub fn nnz(&self) -> usize {
        self.docs.iter().map(|d| d.nnz()).sum()
    }

    #[inline]
    pub fn get(&self, doc: usize) -> Option<&WeightVector> {
        self.docs.get(doc)
    }

    #[inline]
    pub fn docs(&self) -> &[WeightVector] {
        &self.docs
    }

    pub fn into_docs(self) -> Vec<WeightVector> {
        self.docs
    }

    /// Matrix Market coordinate text.
    ///
    /// Records are grouped by document, term ids ascending within a
    /// document. Indices are 1-based on disk.
    pub fn write_market<W: Write>(&self, mut w: W) -> Result<()> {
        write_market_header(&mut w, self.len(), self.n_terms, self.nnz())?;
        for (doc, vec) in self.docs.iter().enumerate() {
            write_market_row(&mut w, doc, vec)?;
        }
        w.flush()?;
        Ok(())
    }

    /// Parse Matrix Market coordinate text, failing on the first defect.
    pub fn read_market<R: BufRead>(reader: R) -> Result<Self> {
        Self::read_market_inner(reader, None)
    }

    /// `read_market` for a matrix that must hold exactly `n_docs` rows.
    /// A header declaring any other count is rejected before rows are
    /// allocated.
    pub fn read_market_expecting<R: BufRead>(reader: R, n_docs: usize) -> Result<Self> {
        Self::read_market_inner(reader, Some(n_docs))
    }

    fn read_market_inner<R: BufRead>(reader: R, expected_docs: Option<usize>) -> Result<Self> {
        let mut lines = reader.lines().enumerate();

        match lines.next() {
            Some((_, line)) => {
                let line = line?;
                if !line.trim().eq_ignore_ascii_case(BANNER) {
                    return Err(SimsError::format(CONTEXT, 1, format!("bad banner {line:?}")));
                }
            }
            None => return Err(SimsError::format(CONTEXT, 1, "empty input")),
        }

        // size line, skipping comments
        let (n_docs, n_terms, nnz) = loop {
            let Some((lineno, line)) = lines.next() else {
                return Err(SimsError::format(CONTEXT, 2, "missing size line"));
            };
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let nums = parse_fields::<usize>(line, lineno + 1)?;
            if let Some(expected) = expected_docs.filter(|&e| e != nums[0]) {
                return Err(SimsError::format(
                    CONTEXT,
                    lineno + 1,
                    format!("header declares {} documents, expected {expected}", nums[0]),
                ));
            }
            break (nums[0], nums[1], nums[2]);
        };
        if n_terms > u32::MAX as usize {
            return Err(SimsError::format(CONTEXT, 2, "term cardinality exceeds u32"));
        }

        // the header is untrusted until the record count checks out
        let mut docs: Vec<WeightVector> = Vec::with_capacity(n_docs.min(1 << 16));
        let mut seen = 0usize;
        let mut prev: Option<(usize, usize)> = None;

        for (lineno, line) in lines {
            let lineno = lineno + 1;
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let mut fields = line.split_ascii_whitespace();
            let (Some(d), Some(t), Some(v), None) = (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(SimsError::format(CONTEXT, lineno, "expected `doc term weight`"));
            };
            let doc = parse_index(d, n_docs, "document", lineno)?;
            let term = parse_index(t, n_terms, "term", lineno)?;
            let weight: f64 = v
                .parse()
                .map_err(|_| SimsError::format(CONTEXT, lineno, format!("bad weight {v:?}")))?;
            if !weight.is_finite() {
                return Err(SimsError::format(CONTEXT, lineno, "non-finite weight"));
            }

            seen += 1;
            if seen > nnz {
                return Err(SimsError::format(
                    CONTEXT,
                    lineno,
                    format!("more records than the declared {nnz}"),
                ));
            }
            if let Some((pd, pt)) = prev {
                if doc < pd || (doc == pd && term <= pt) {
                    return Err(SimsError::format(
                        CONTEXT,
                        lineno,
                        "records not grouped by document in ascending term order",
                    ));
                }
            }
            prev = Some((doc, term));

            while docs.len() <= doc {
                docs.push(ZeroSpVec::with_len(n_terms));
            }
            docs[doc].raw_push(term as u32, weight);
        }

        if seen != nnz {
            return Err(SimsError::format(
                CONTEXT,
                seen + 2,
                format!("header declares {nnz} records, found {seen}"),
            ));
        }
        while docs.len() < n_docs {
            docs.push(ZeroSpVec::with_len(n_terms));
        }
        for d in docs.iter_mut() {
            d.shrink_to_fit();
        }
        debug!(documents = n_docs, terms = n_terms, nnz, "matrix market loaded");
        DocumentMatrix::new(docs, n_terms)
    }

    /// `write_market` into a byte buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_market(&mut buf)?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_market(bytes)
    }
}

pub(crate) fn write_market_header<W: Write>(w: &mut W, n_docs: usize, n_terms: usize, nnz: usize) -> Result<()> {
    writeln!(w, "{BANNER}")?;
    writeln!(w, "{n_docs} {n_terms} {nnz}")?;
    Ok(())
}

/// Records of document `doc` (0-based)
pub(crate) fn write_market_row<W: Write>(w: &mut W, doc: usize, row: &WeightVector) -> Result<()> {
    for (term, weight) in row.raw_iter() {
        writeln!(w, "{} {} {}", doc + 1, term + 1, weight)?;
    }
    Ok(())
}

fn parse_fields<T: std::str::FromStr>(line: &str, lineno: usize) -> Result<[T; 3]> {
    let mut it = line.split_ascii_whitespace().map(|f| f.parse::<T>());
    match (it.next(), it.next(), it.next(), it.next()) {
        (Some(Ok(a)), Some(Ok(b)), Some(Ok(c)), None) => Ok([a, b, c]),
        _ => Err(SimsError::format(
            CONTEXT,
            lineno,
            format!("expected `documents terms nnz`, got {line:?}"),
        )),
    }
}

/// 1-based on disk -> 0-based, bounded by `limit`
fn parse_index(field: &str, limit: usize, what: &str, lineno: usize) -> Result<usize> {
    let idx: usize = field
        .parse()
        .map_err(|_| SimsError::format(CONTEXT, lineno, format!("bad {what} index {field:?}")))?;
    if idx == 0 || idx > limit {
        return Err(SimsError::format(
            CONTEXT,
            lineno,
            format!("{what} index {idx} outside 1..={limit}"),
        ));
    }
    Ok(idx - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocumentMatrix {
        let docs = vec![
            ZeroSpVec::from_parts(5, vec![0, 3], vec![0.405_465_108_108_164_4, 1.0 / 3.0]),
            ZeroSpVec::with_len(5),
            ZeroSpVec::from_parts(5, vec![4, 1, 2], vec![1e-9, 12345.678, 2.5]),
        ];
        DocumentMatrix::new(docs, 5).unwrap()
    }

    #[test]
    fn market_roundtrip_is_exact() {
        let m = sample();
        let bytes = m.to_bytes().unwrap();
        let back = DocumentMatrix::from_bytes(&bytes).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.n_terms(), 5);
        assert_eq!(back.nnz(), m.nnz());
        for (a, b) in m.docs().iter().zip(back.docs()) {
            assert_eq!(a.indices(), b.indices());
            for (x, y) in a.values().iter().zip(b.values()) {
                assert!((x - y).abs() <= 1e-6 * x.abs());
            }
        }
    }

    #[test]
    fn trailing_empty_documents_survive() {
        let docs = vec![ZeroSpVec::from_parts(2, vec![1], vec![1.0]), ZeroSpVec::with_len(2)];
        let m = DocumentMatrix::new(docs, 2).unwrap();
        let back = DocumentMatrix::from_bytes(&m.to_bytes().unwrap()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.get(1).map(|d| d.nnz()), Some(0));
    }

    #[test]
    fn rejects_record_count_mismatch() {
        let text = format!("{BANNER}\n2 2 3\n1 1 0.5\n2 2 0.5\n");
        assert!(matches!(
            DocumentMatrix::from_bytes(text.as_bytes()),
            Err(SimsError::Format { .. })
        ));
        let text = format!("{BANNER}\n2 2 1\n1 1 0.5\n2 2 0.5\n");
        assert!(DocumentMatrix::from_bytes(text.as_bytes()).is_err());
    }

    #[test]
    fn rejects_document_out_of_range() {
        let text = format!("{BANNER}\n2 2 1\n3 1 0.5\n");
        match DocumentMatrix::from_bytes(text.as_bytes()) {
            Err(SimsError::Format { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
        let text = format!("{BANNER}\n2 2 1\n0 1 0.5\n");
        assert!(DocumentMatrix::from_bytes(text.as_bytes()).is_err());
    }

    #[test]
    fn rejects_unordered_records_and_garbage() {
        let text = format!("{BANNER}\n2 3 2\n1 2 0.5\n1 1 0.5\n");
        assert!(DocumentMatrix::from_bytes(text.as_bytes()).is_err());
        let text = format!("{BANNER}\n2 3 1\n1 2 nan\n");
        assert!(DocumentMatrix::from_bytes(text.as_bytes()).is_err());
        assert!(DocumentMatrix::from_bytes(b"1 1 1\n").is_err());
        assert!(DocumentMatrix::from_bytes(b"").is_err());
    }

    #[test]
    fn header_document_count_must_match_expectation() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(DocumentMatrix::read_market_expecting(&bytes[..], 3).unwrap(), sample());

        let huge = format!("{BANNER}\n30000000000 5 1\n1 1 0.5\n");
        match DocumentMatrix::read_market_expecting(huge.as_bytes(), 3) {
            Err(SimsError::Format { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn comments_are_skipped() {
        let text = format!("{BANNER}\n% written by test\n1 2 1\n% mid\n1 2 0.25\n");
        let m = DocumentMatrix::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(m.get(0).and_then(|d| d.get(1)), Some(0.25));
    }
}
