//! Headword queries: resolve, rank, filter, truncate.
//!
//! The script filter is applied to the full ranked list *before* truncation,
//! so `top_k` always counts filtered candidates.

use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::Result;
use crate::glossary::Glossary;
use crate::lookup::HeadwordLookup;
use crate::vectorizer::evaluate::scoring::Hits;

/// Writing system of a headword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Greek,
    Latin,
}

impl Script {
    /// Greek if any char lies beyond Latin-1, Latin otherwise
    pub fn of(word: &str) -> Script {
        if word.chars().any(|c| c as u32 > 255) {
            Script::Greek
        } else {
            Script::Latin
        }
    }

    #[inline]
    pub fn matches(self, word: &str) -> bool {
        Script::of(word) == self
    }
}

/// `None` keeps every candidate
pub type ScriptFilter = Option<Script>;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: u32,
    pub word: String,
    pub score: f64,
    pub gloss: Option<String>,
}

impl fmt::Display for QueryHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{:.3}", self.word, self.score)?;
        if let Some(gloss) = &self.gloss {
            write!(f, "  {gloss}")?;
        }
        Ok(())
    }
}

/// Result of one query. A word missing from the lookup is a normal
/// negative answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Hits(Vec<QueryHit>),
    NotIndexed(String),
}

impl QueryOutcome {
    pub fn hits(&self) -> Option<&[QueryHit]> {
        match self {
            QueryOutcome::Hits(h) => Some(h),
            QueryOutcome::NotIndexed(_) => None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, QueryOutcome::Hits(_))
    }

    /// Interactive listing: a `query = WORD` header and one line per hit,
    /// or a single `WORD is not indexed.` line.
    pub fn write_listing<W: Write>(&self, query: &str, mut w: W) -> std::io::Result<()> {
        match self {
            QueryOutcome::Hits(hits) => {
                writeln!(w, "query = {query}")?;
                for hit in hits {
                    writeln!(w, "{hit}")?;
                }
            }
            QueryOutcome::NotIndexed(word) => writeln!(w, "{word} is not indexed.")?,
        }
        Ok(())
    }
}

/// Walk `ranked` in order, keep candidates accepted by `filter` and stop
/// after `top_k` of them.
pub(crate) fn filter_ranked<F>(
    ranked: Hits,
    lookup: &HeadwordLookup,
    glossary: Option<&Glossary>,
    top_k: usize,
    filter: F,
) -> Result<Vec<QueryHit>>
where
    F: Fn(&str) -> bool,
{
    let mut out = Vec::with_capacity(top_k.min(ranked.len()));
    for hit in ranked {
        if out.len() >= top_k {
            break;
        }
        let word = lookup.lookup_by_id(hit.id as usize)?;
        if !filter(word) {
            continue;
        }
        out.push(QueryHit {
            id: hit.id,
            word: word.to_string(),
            score: hit.score,
            gloss: glossary.and_then(|g| g.get(word)).map(str::to_string),
        });
    }
    Ok(out)
}

/// Direction of a translation export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslateDirection {
    LatinToGreek,
    GreekToLatin,
}

impl TranslateDirection {
    pub fn source(self) -> Script {
        match self {
            TranslateDirection::LatinToGreek => Script::Latin,
            TranslateDirection::GreekToLatin => Script::Greek,
        }
    }

    pub fn target(self) -> Script {
        match self {
            TranslateDirection::LatinToGreek => Script::Greek,
            TranslateDirection::GreekToLatin => Script::Latin,
        }
    }
}

/// One CSV row per indexed headword: the headword followed by its top
/// `results` candidates. With a direction, only source-script headwords are
/// queried and only target-script candidates kept. Returns rows written.
pub fn export_translations<W: Write>(
    engine: &Engine,
    results: usize,
    direction: Option<TranslateDirection>,
    mut writer: W,
) -> Result<usize> {
    let lookup = engine.lookup()?;
    let filter: ScriptFilter = direction.map(|d| d.target());
    let mut rows = 0usize;
    for (_, word) in lookup.iter() {
        if let Some(d) = direction {
            if !d.source().matches(word) {
                continue;
            }
        }
        let QueryOutcome::Hits(hits) = engine.query(word, results, filter)? else {
            debug!(%word, "headword vanished from lookup during export");
            continue;
        };
        let mut row = csv_field(word);
        for hit in &hits {
            row.push(',');
            row.push_str(&csv_field(&hit.word));
        }
        writeln!(writer, "{row}")?;
        rows += 1;
    }
    writer.flush()?;
    info!(rows, ?direction, "translations exported");
    Ok(rows)
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::DuplicatePolicy;

    #[test]
    fn script_heuristic() {
        assert_eq!(Script::of("amicus"), Script::Latin);
        assert_eq!(Script::of("caf\u{00E9}"), Script::Latin);
        assert_eq!(Script::of("\u{03C6}\u{03AF}\u{03BB}\u{03BF}\u{03C2}"), Script::Greek);
        assert_eq!(Script::of(""), Script::Latin);
    }

    #[test]
    fn filter_applies_before_truncation() {
        // id 0 is the query; 1..=10 ranked in id order, Greek at 2,3,5,7,8,10
        let words = [
            "q", "la", "\u{03B1}", "\u{03B2}", "lb", "\u{03B3}", "lc", "\u{03B4}", "\u{03B5}", "ld", "\u{03B6}",
        ];
        let lookup = HeadwordLookup::build(words, DuplicatePolicy::Overwrite).unwrap();
        let ranked = Hits::from_ranked(0, (1..=10).map(|id| (id, 1.0 - id as f64 / 20.0)).collect());

        let greek = filter_ranked(ranked.clone(), &lookup, None, 3, |w| Script::Greek.matches(w)).unwrap();
        let ids: Vec<u32> = greek.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 3, 5]);
        assert!(greek.windows(2).all(|w| w[0].score > w[1].score));

        let all = filter_ranked(ranked, &lookup, None, 3, |_| true).unwrap();
        assert_eq!(all.iter().map(|h| h.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn glosses_are_attached() {
        let lookup = HeadwordLookup::build(["a", "b"], DuplicatePolicy::Overwrite).unwrap();
        let mut glossary = Glossary::default();
        glossary.insert("b", "the letter b");
        let ranked = Hits::from_ranked(0, vec![(1, 0.25)]);
        let hits = filter_ranked(ranked, &lookup, Some(&glossary), 5, |_| true).unwrap();
        assert_eq!(hits[0].gloss.as_deref(), Some("the letter b"));
        assert_eq!(hits[0].to_string(), "b\t0.250  the letter b");
    }

    #[test]
    fn listing_header_only_for_indexed_words() {
        let hits = QueryOutcome::Hits(vec![QueryHit {
            id: 1,
            word: "socius".to_string(),
            score: 0.5,
            gloss: None,
        }]);
        let mut out = Vec::new();
        hits.write_listing("amicus", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "query = amicus\nsocius\t0.500\n");

        let mut out = Vec::new();
        QueryOutcome::NotIndexed("nemo".to_string())
            .write_listing("nemo", &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "nemo is not indexed.\n");
    }

    #[test]
    fn csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"x\""), "\"say \"\"x\"\"\"");
    }
}
