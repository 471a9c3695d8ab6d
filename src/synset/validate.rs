use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::lookup::HeadwordLookup;
use crate::synset::{PairKey, SynPair, SynPairSet};
use crate::vectorizer::evaluate::index::SimilarityIndex;

/// Shared stop signal, checked between pairs.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome for one pair. Unresolved pairs keep every numeric field `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub key: PairKey,
    pub score: Option<f64>,
    /// position of `b` in `a`'s ranked list
    pub rank_a: Option<usize>,
    /// position of `a` in `b`'s ranked list
    pub rank_b: Option<usize>,
    pub synsets: BTreeSet<u32>,
}

impl PairReport {
    fn unresolved(pair: &SynPair) -> Self {
        PairReport {
            key: pair.key.clone(),
            score: None,
            rank_a: None,
            rank_b: None,
            synsets: pair.synsets.clone(),
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.score.is_some()
    }
}

struct Field<T>(Option<T>);

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => v.fmt(f),
            None => f.write_str("None"),
        }
    }
}

impl fmt::Display for PairReport {
    /// `a->b<TAB>score<TAB>rank_a<TAB>rank_b<TAB>id;id;...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t",
            self.key,
            Field(self.score),
            Field(self.rank_a),
            Field(self.rank_b)
        )?;
        for (i, id) in self.synsets.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub written: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub cancelled: bool,
}

/// RESOLVE and RANK for synonym pairs against a built index.
#[derive(Debug, Clone, Copy)]
pub struct CrossValidator<'a> {
    lookup: &'a HeadwordLookup,
    index: &'a SimilarityIndex,
}

impl<'a> CrossValidator<'a> {
    pub fn new(lookup: &'a HeadwordLookup, index: &'a SimilarityIndex) -> Self {
        CrossValidator { lookup, index }
    }

    /// Resolve and rank one pair. Missing members are not an error.
    pub fn validate_pair(&self, pair: &SynPair) -> Result<PairReport> {
        let (Some(a), Some(b)) = (
            self.lookup.lookup_by_word(pair.key.a()),
            self.lookup.lookup_by_word(pair.key.b()),
        ) else {
            debug!(pair = %pair.key, "unresolved pair");
            return Ok(PairReport::unresolved(pair));
        };
        let (a, b) = (a as usize, b as usize);
        let n = self.index.len();

        let rank_a = self.index.ranked(a)?.rank_map(n).rank_of(b as u32);
        let rank_b = self.index.ranked(b)?.rank_map(n).rank_of(a as u32);
        let score = self.index.similarity(a, b)?;

        Ok(PairReport {
            key: pair.key.clone(),
            score: Some(score),
            rank_a,
            rank_b,
            synsets: pair.synsets.clone(),
        })
    }

    /// Validate every pair and write one line each, in key order.
    ///
    /// Pairs are ranked in parallel chunks; lines are written and flushed
    /// one by one, so a cancelled run leaves only complete lines behind.
    /// A pair whose ranking fails is reported unresolved and the pass goes on.
    pub fn run<W: Write>(&self, pairs: &SynPairSet, mut writer: W, cancel: &CancelFlag) -> Result<ValidationSummary> {
        let mut summary = ValidationSummary::default();
        let chunk = rayon::current_num_threads().max(1) * 4;

        'outer: for block in pairs.pairs().chunks(chunk) {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let reports: Vec<PairReport> = block
                .par_iter()
                .map(|pair| {
                    self.validate_pair(pair).unwrap_or_else(|err| {
                        warn!(pair = %pair.key, %err, "pair failed, reporting as unresolved");
                        PairReport::unresolved(pair)
                    })
                })
                .collect();

            for report in reports {
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'outer;
                }
                writeln!(writer, "{report}")?;
                writer.flush()?;
                summary.written += 1;
                if report.is_resolved() {
                    summary.resolved += 1;
                } else {
                    summary.unresolved += 1;
                }
            }
        }

        info!(
            written = summary.written,
            resolved = summary.resolved,
            unresolved = summary.unresolved,
            cancelled = summary.cancelled,
            "cross-validation finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::synset::SynsetRecord;
    use crate::vectorizer::build_index;
    use crate::vectorizer::corpus::CorpusRecord;

    fn built() -> crate::vectorizer::BuiltIndex {
        let records = vec![
            CorpusRecord::from_definition("felis", "cat animal"),
            CorpusRecord::from_definition("canis", "dog animal"),
            CorpusRecord::from_definition("pet", "cat dog"),
            CorpusRecord::from_definition("lapis", "stone rock"),
        ];
        build_index(records, &Config::default()).unwrap()
    }

    #[test]
    fn half_resolved_pair_has_empty_fields_and_pass_continues() {
        let b = built();
        let v = CrossValidator::new(&b.lookup, &b.index);
        let pairs = SynPairSet::from_records(vec![
            SynsetRecord::new(7, ["felis", "nemo"]),
            SynsetRecord::new(8, ["felis", "canis"]),
        ]);
        let mut out = Vec::new();
        let summary = v.run(&pairs, &mut out, &CancelFlag::new()).unwrap();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.unresolved, 1);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields[0], "canis->felis");
        assert!((fields[1].parse::<f64>().unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(&fields[2..], &["0", "0", "8"]);
        assert_eq!(lines[1], "felis->nemo\tNone\tNone\tNone\t7");
    }

    #[test]
    fn ranks_and_score() {
        let b = built();
        let v = CrossValidator::new(&b.lookup, &b.index);
        let pair = SynPair {
            key: PairKey::new("felis", "canis"),
            synsets: [1, 2].into_iter().collect(),
        };
        let report = v.validate_pair(&pair).unwrap();
        let score = report.score.unwrap();
        assert!((score - 0.5).abs() < 1e-12);
        assert_eq!(report.key.a(), "canis");
        // canis ranks felis first: tie with pet at 0.5, felis has the lower id
        assert_eq!(report.rank_a, Some(0));
        // felis: canis (id 1) and pet (id 2) tie, canis first
        assert_eq!(report.rank_b, Some(0));
        assert!(report.to_string().ends_with("\t0\t0\t1;2"));
    }

    #[test]
    fn cancelled_before_start_writes_nothing() {
        let b = built();
        let v = CrossValidator::new(&b.lookup, &b.index);
        let pairs = SynPairSet::from_records(vec![SynsetRecord::new(1, ["felis", "canis", "pet"])]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut out = Vec::new();
        let summary = v.run(&pairs, &mut out, &cancel).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.written, 0);
        assert!(out.is_empty());
    }

    /// Raises `cancel` once `after` complete lines have been flushed.
    struct CancellingWriter {
        out: Vec<u8>,
        cancel: CancelFlag,
        after: usize,
    }

    impl Write for CancellingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.out.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if self.out.iter().filter(|&&b| b == b'\n').count() >= self.after {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    #[test]
    fn cancel_mid_run_leaves_only_complete_lines() {
        let b = built();
        let v = CrossValidator::new(&b.lookup, &b.index);
        // four members, six pairs
        let pairs = SynPairSet::from_records(vec![SynsetRecord::new(1, ["felis", "canis", "pet", "lapis"])]);
        assert_eq!(pairs.len(), 6);

        let cancel = CancelFlag::new();
        let mut writer = CancellingWriter {
            out: Vec::new(),
            cancel: cancel.clone(),
            after: 2,
        };
        let summary = v.run(&pairs, &mut writer, &cancel).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.resolved + summary.unresolved, 2);

        let text = String::from_utf8(writer.out).unwrap();
        assert!(text.ends_with('\n'));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.split('\t').count() == 5));
        assert!(lines[0].starts_with("canis->felis\t"));
    }
}
