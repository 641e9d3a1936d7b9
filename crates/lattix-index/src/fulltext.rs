//! Full-Text Index
//!
//! Tokenizes document fields into an inverted index and ranks matches by
//! TF-IDF. One `InvertedEntry` exists per (term, document, field) triple;
//! `document_frequency[term]` always equals the number of distinct
//! documents referencing the term, recomputed from the surviving entry set
//! on removal rather than decremented.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Default number of results returned when the caller passes no limit
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Fixed stop-word set; tokens in it never enter the index.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "be", "to", "of", "and", "in", "it", "for", "on",
    "with", "as", "at", "by", "or", "if",
];

/// One posting: a term's occurrences within a single field of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvertedEntry {
    /// Document (node) id
    pub node_id: String,
    /// Field the term occurred in
    pub field: String,
    /// Token positions of the occurrences within the field
    pub positions: Vec<usize>,
    /// Occurrence count (`positions.len()`, cached)
    pub frequency: usize,
}

/// A matched field within a search result.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    /// Matched query term
    pub term: String,
    /// Field the match occurred in
    pub field: String,
    /// Token positions of the matches
    pub positions: Vec<usize>,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Document (node) id
    pub node_id: String,
    /// Summed TF-IDF score across matching fields
    pub score: f64,
    /// Per-field match positions
    pub matches: Vec<FieldMatch>,
}

/// Inverted full-text index with TF-IDF ranking.
#[derive(Debug, Default, Clone)]
pub struct FullTextIndex {
    /// term -> postings
    index: HashMap<String, Vec<InvertedEntry>>,
    /// term -> number of distinct documents containing it
    document_frequency: HashMap<String, usize>,
    /// document -> terms it contributes (for removal)
    doc_terms: HashMap<String, HashSet<String>>,
    /// document -> field -> token count (TF denominator)
    field_lengths: HashMap<String, HashMap<String, usize>>,
}

impl FullTextIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents
    pub fn document_count(&self) -> usize {
        self.doc_terms.len()
    }

    /// Number of distinct terms
    pub fn term_count(&self) -> usize {
        self.index.len()
    }

    /// Document frequency of a term
    pub fn document_frequency(&self, term: &str) -> usize {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    /// Remove all documents
    pub fn clear(&mut self) {
        self.index.clear();
        self.document_frequency.clear();
        self.doc_terms.clear();
        self.field_lengths.clear();
    }

    /// Index a document's fields.
    ///
    /// Indexing an id that is already present replaces the old document.
    pub fn add_document(&mut self, node_id: &str, fields: &BTreeMap<String, String>) {
        if self.doc_terms.contains_key(node_id) {
            self.remove_document(node_id);
        }

        let mut terms_for_doc: HashSet<String> = HashSet::new();
        let mut lengths: HashMap<String, usize> = HashMap::new();

        for (field, text) in fields {
            let tokens = tokenize(text);
            if tokens.is_empty() {
                continue;
            }
            lengths.insert(field.clone(), tokens.len());

            // Group positions per term within this field
            let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
            for (pos, token) in tokens.iter().enumerate() {
                positions.entry(token.as_str()).or_default().push(pos);
            }

            for (term, positions) in positions {
                let frequency = positions.len();
                self.index
                    .entry(term.to_string())
                    .or_default()
                    .push(InvertedEntry {
                        node_id: node_id.to_string(),
                        field: field.clone(),
                        positions,
                        frequency,
                    });
                terms_for_doc.insert(term.to_string());
            }
        }

        // A term's document frequency counts distinct documents
        for term in &terms_for_doc {
            *self.document_frequency.entry(term.clone()).or_insert(0) += 1;
        }

        self.field_lengths.insert(node_id.to_string(), lengths);
        self.doc_terms.insert(node_id.to_string(), terms_for_doc);
    }

    /// Replace a document's fields (= remove + add).
    pub fn update_document(&mut self, node_id: &str, fields: &BTreeMap<String, String>) {
        self.remove_document(node_id);
        self.add_document(node_id, fields);
    }

    /// Remove a document; absent ids are a no-op.
    ///
    /// `document_frequency` is recomputed from the remaining postings for
    /// every term the document contributed, not merely decremented.
    pub fn remove_document(&mut self, node_id: &str) {
        let Some(terms) = self.doc_terms.remove(node_id) else {
            return;
        };
        self.field_lengths.remove(node_id);

        for term in terms {
            let remaining = match self.index.get_mut(&term) {
                Some(postings) => {
                    postings.retain(|e| e.node_id != node_id);
                    !postings.is_empty()
                }
                None => false,
            };

            if remaining {
                // Recompute from the surviving entry set to avoid drift
                let distinct: HashSet<&str> = self.index[&term]
                    .iter()
                    .map(|e| e.node_id.as_str())
                    .collect();
                self.document_frequency.insert(term, distinct.len());
            } else {
                self.index.remove(&term);
                self.document_frequency.remove(&term);
            }
        }
    }

    /// Rank documents matching the query by summed TF-IDF.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<SearchResult> {
        let total_docs = self.document_count();
        if total_docs == 0 {
            return Vec::new();
        }

        let query_terms: Vec<String> = {
            let mut seen = HashSet::new();
            tokenize(query)
                .into_iter()
                .filter(|t| seen.insert(t.clone()))
                .collect()
        };
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<String, (f64, Vec<FieldMatch>)> = HashMap::new();

        for term in &query_terms {
            let Some(postings) = self.index.get(term) else {
                continue;
            };
            let df = self.document_frequency(term);
            if df == 0 {
                continue;
            }
            let idf = (total_docs as f64 / df as f64).ln();

            for entry in postings {
                let field_len = self
                    .field_lengths
                    .get(&entry.node_id)
                    .and_then(|lengths| lengths.get(&entry.field))
                    .copied()
                    .unwrap_or(entry.frequency.max(1));
                let tf = entry.frequency as f64 / field_len as f64;

                let slot = scores
                    .entry(entry.node_id.clone())
                    .or_insert_with(|| (0.0, Vec::new()));
                slot.0 += idf * tf;
                slot.1.push(FieldMatch {
                    term: term.clone(),
                    field: entry.field.clone(),
                    positions: entry.positions.clone(),
                });
            }
        }

        let mut results: Vec<SearchResult> = scores
            .into_iter()
            .map(|(node_id, (score, matches))| SearchResult {
                node_id,
                score,
                matches,
            })
            .collect();

        // Descending score; ties broken by id for deterministic output
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        results.truncate(limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        results
    }
}

/// Tokenize text into index terms.
///
/// Lower-cases, strips non-word characters, splits on the resulting
/// whitespace, and drops tokens shorter than 2 characters or present in
/// the stop-word set. Positions reported by the index refer to offsets in
/// the filtered token sequence.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= 2 && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}
