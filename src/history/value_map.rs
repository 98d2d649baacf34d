//! ValueMap - logical view over a property's full history
//!
//! The merged, descending view of one property across the local document
//! and every previous document whose range could contain revisions for it.
//! The view is a pull iterator doing a lazy merge: a previous document is
//! loaded only once its range's high end outranks every entry still
//! buffered, so callers that stop early never touch the deep history.
//! Intermediate previous documents recurse into their own ranges.
//!
//! A dangling `_prev` pointer is not an error for the caller: the warning
//! is rate-limited per id, the subtree reads as empty, and when the main
//! document was loaded long enough ago its cache entry (plus any
//! intermediate along the failed path) is invalidated as likely stale.

use std::iter::Peekable;

use chrono::Utc;

use crate::document::errors::{DocumentError, DocumentResult};
use crate::document::{id, NodeDocument};
use crate::observability::{previous_doc_silencer, Logger};
use crate::revision::Revision;
use crate::store::{DocumentStore, PrevNoPropCache};

use super::range::Range;

/// Age after which a main document observed with a dangling previous
/// pointer is evicted from the store cache.
pub const MISSING_PREVIOUS_EVICT_AGE_MS: i64 = 60_000;

/// The merged view of one property across a document and its history.
pub struct ValueMap<'a> {
    store: &'a dyn DocumentStore,
    doc: &'a NodeDocument,
    property: &'a str,
    cache: Option<&'a PrevNoPropCache>,
}

impl<'a> ValueMap<'a> {
    /// Creates the view for `property` on `doc`.
    pub fn new(store: &'a dyn DocumentStore, doc: &'a NodeDocument, property: &'a str) -> Self {
        Self {
            store,
            doc,
            property,
            cache: None,
        }
    }

    /// Attaches the process-wide prev-no-property cache.
    pub fn with_cache(mut self, cache: &'a PrevNoPropCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Iterates `(revision, value)` pairs newest-first across the local
    /// map and all previous documents.
    pub fn iter(&self) -> ValueMapIter<'a> {
        let (pending, err) = match self.doc.previous_ranges() {
            Ok(index) => {
                let mut ranges: Vec<Range> = index.values().copied().collect();
                sort_by_high(&mut ranges);
                (ranges, None)
            }
            Err(e) => (Vec::new(), Some(e)),
        };
        let local: Vec<(Revision, String)> = self
            .doc
            .local_map(self.property)
            .iter()
            .map(|(r, v)| (*r, v.clone()))
            .collect();
        ValueMapIter {
            store: self.store,
            main_doc: self.doc,
            property: self.property.to_string(),
            cache: self.cache,
            sources: vec![local.into_iter().peekable()],
            pending,
            intermediates_seen: Vec::new(),
            last_yielded: None,
            err,
        }
    }

    /// Entries bounded below by `min`: iteration stops once revisions get
    /// older than `min`, so only the relevant history loads.
    pub fn changes_newer_than(
        &self,
        min: Revision,
    ) -> impl Iterator<Item = DocumentResult<(Revision, String)>> + 'a {
        self.iter().take_while(move |entry| match entry {
            Ok((r, _)) => !min.is_newer_than(r),
            Err(_) => true,
        })
    }

    /// Targeted lookup of the value stored at exactly `revision`,
    /// following only ranges that include it.
    pub fn get(&self, revision: &Revision) -> DocumentResult<Option<String>> {
        if let Some(value) = self.doc.local_map(self.property).get(revision) {
            return Ok(Some(value.clone()));
        }
        self.get_from_previous(self.doc, revision)
    }

    fn get_from_previous(
        &self,
        doc: &NodeDocument,
        revision: &Revision,
    ) -> DocumentResult<Option<String>> {
        let main_path = match doc.main_path() {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };
        let index = doc.previous_ranges()?;
        for range in index.values() {
            if !range.includes(revision) {
                continue;
            }
            let prev_id = id::previous_id_for(&main_path, range.high(), range.height());
            if let Some(cache) = self.cache {
                if cache.knows_empty(self.property, &prev_id) {
                    continue;
                }
            }
            match self.store.find(&prev_id)? {
                None => handle_missing_previous(self.store, self.doc, &prev_id, &[]),
                Some(prev) => {
                    if let Some(value) = prev.local_map(self.property).get(revision) {
                        return Ok(Some(value.clone()));
                    }
                    if prev.split_doc_type().is_ok_and(|t| t.is_intermediate()) {
                        if let Some(value) = self.get_from_previous(&prev, revision)? {
                            return Ok(Some(value));
                        }
                    }
                }
            }
        }
        Ok(None)
    }
}

type EntrySource = Peekable<std::vec::IntoIter<(Revision, String)>>;

/// Pull iterator over a [`ValueMap`], descending.
pub struct ValueMapIter<'a> {
    store: &'a dyn DocumentStore,
    main_doc: &'a NodeDocument,
    property: String,
    cache: Option<&'a PrevNoPropCache>,
    // open entry streams: the local map plus every loaded previous doc
    sources: Vec<EntrySource>,
    // unloaded ranges, sorted descending by high
    pending: Vec<Range>,
    intermediates_seen: Vec<String>,
    last_yielded: Option<Revision>,
    err: Option<DocumentError>,
}

impl ValueMapIter<'_> {
    fn max_head(&mut self) -> Option<Revision> {
        let mut best: Option<Revision> = None;
        for source in &mut self.sources {
            if let Some((r, _)) = source.peek() {
                if best.map_or(true, |b| r.is_newer_than(&b)) {
                    best = Some(*r);
                }
            }
        }
        best
    }

    fn best_source(&mut self) -> Option<usize> {
        let mut best: Option<(usize, Revision)> = None;
        for (idx, source) in self.sources.iter_mut().enumerate() {
            if let Some((r, _)) = source.peek() {
                if best.map_or(true, |(_, b)| r.is_newer_than(&b)) {
                    best = Some((idx, *r));
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn load_range(&mut self, range: Range) {
        let main_path = match self.main_doc.main_path() {
            Ok(path) => path,
            Err(e) => {
                self.err = Some(e);
                return;
            }
        };
        let prev_id = id::previous_id_for(&main_path, range.high(), range.height());
        if let Some(cache) = self.cache {
            if cache.knows_empty(&self.property, &prev_id) {
                return;
            }
        }
        let prev = match self.store.find(&prev_id) {
            Ok(Some(prev)) => prev,
            Ok(None) => {
                handle_missing_previous(
                    self.store,
                    self.main_doc,
                    &prev_id,
                    &self.intermediates_seen,
                );
                return;
            }
            Err(e) => {
                self.err = Some(e.into());
                return;
            }
        };
        if prev.split_doc_type().is_ok_and(|t| t.is_intermediate()) {
            self.intermediates_seen.push(prev_id);
            match prev.previous_ranges() {
                Ok(index) => {
                    self.pending.extend(index.values().copied());
                    sort_by_high(&mut self.pending);
                }
                Err(e) => self.err = Some(e),
            }
            return;
        }
        let entries: Vec<(Revision, String)> = prev
            .local_map(&self.property)
            .iter()
            .map(|(r, v)| (*r, v.clone()))
            .collect();
        if entries.is_empty() {
            // scan of this document completed with no hit
            if let Some(cache) = self.cache {
                cache.mark_empty(&self.property, &prev_id);
            }
            return;
        }
        self.sources.push(entries.into_iter().peekable());
    }
}

impl Iterator for ValueMapIter<'_> {
    type Item = DocumentResult<(Revision, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.err.take() {
                return Some(Err(e));
            }
            // load pending ranges that could outrank every buffered entry
            loop {
                let max_head = self.max_head();
                let load = match (self.pending.first(), max_head) {
                    (Some(_), None) => true,
                    (Some(front), Some(head)) => front.high().is_newer_than(&head),
                    (None, _) => false,
                };
                if !load || self.err.is_some() {
                    break;
                }
                let range = self.pending.remove(0);
                self.load_range(range);
            }
            if self.err.is_some() {
                continue;
            }
            let idx = match self.best_source() {
                Some(idx) => idx,
                None => return None,
            };
            let (revision, value) = match self.sources[idx].next() {
                Some(entry) => entry,
                None => continue,
            };
            // a retried split can leave the same entry in two documents
            if self.last_yielded == Some(revision) {
                continue;
            }
            self.last_yielded = Some(revision);
            return Some(Ok((revision, value)));
        }
    }
}

fn sort_by_high(ranges: &mut [Range]) {
    ranges.sort_by(|a, b| b.high().cmp(a.high()));
}

fn handle_missing_previous(
    store: &dyn DocumentStore,
    main_doc: &NodeDocument,
    missing_id: &str,
    intermediates: &[String],
) {
    let now = Utc::now().timestamp_millis();
    if previous_doc_silencer().should_log(missing_id, now) {
        Logger::warn(
            "previous_doc_missing",
            &[
                ("id", missing_id),
                ("main", main_doc.doc_id().unwrap_or("?")),
            ],
        );
    }
    // an old in-memory instance probably points at a garbage-collected
    // document; drop it (and the intermediates walked to get here) from
    // the store cache so the next read starts fresh
    if now - main_doc.created() > MISSING_PREVIOUS_EVICT_AGE_MS {
        if let Some(main_id) = main_doc.doc_id() {
            store.invalidate_cache(main_id);
        }
        for intermediate_id in intermediates {
            store.invalidate_cache(intermediate_id);
        }
    }
}
