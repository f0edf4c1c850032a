//! Contraction entries, day sessions and the session store.
//!
//! Every transition on [`Store`] takes the current store by reference and
//! returns a new one, so readers only ever see committed states. Entries in a
//! session are kept sorted by `start` at all times.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{EntryId, SessionId};

/// One recorded contraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractionLogEntry {
    pub id: EntryId,
    /// Start of the contraction, epoch milliseconds.
    pub start: i64,
    /// End of the contraction, epoch milliseconds. Always after `start`.
    pub end: i64,
    /// When the entry was logged, epoch milliseconds.
    pub created_at: i64,
}

impl ContractionLogEntry {
    /// Creates an entry with a freshly generated id.
    #[must_use]
    pub fn new(start: i64, end: i64, created_at: i64) -> Self {
        Self {
            id: EntryId::generate(),
            start,
            end,
            created_at,
        }
    }

    pub const fn duration_ms(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// The contractions attributed to one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    entries: Vec<ContractionLogEntry>,
}

impl Session {
    /// Builds a session, sorting `entries` regardless of the order given.
    #[must_use]
    pub fn new(id: SessionId, entries: Vec<ContractionLogEntry>) -> Self {
        Self {
            id,
            entries: sort_chronologically(entries),
        }
    }

    /// An empty session for `id`.
    #[must_use]
    pub fn empty(id: SessionId) -> Self {
        Self::new(id, Vec::new())
    }

    /// Entries in ascending `start` order.
    pub fn entries(&self) -> &[ContractionLogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, id: &EntryId) -> Option<&ContractionLogEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// The entry with the latest `start`.
    pub fn latest(&self) -> Option<&ContractionLogEntry> {
        self.entries.last()
    }

    fn with_entries(&self, entries: Vec<ContractionLogEntry>) -> Self {
        Self::new(self.id.clone(), entries)
    }
}

/// Stable sort by `start`, ascending.
///
/// Entries with equal `start` keep their relative order, so sorting an
/// already sorted sequence returns it unchanged.
#[must_use]
pub fn sort_chronologically(mut entries: Vec<ContractionLogEntry>) -> Vec<ContractionLogEntry> {
    entries.sort_by_key(|entry| entry.start);
    entries
}

/// All sessions plus the pointer to the active one.
///
/// `sessions[current_session_id]` always exists. Deserialization goes through
/// [`crate::persist`], which validates and repairs the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    current_session_id: SessionId,
    sessions: BTreeMap<SessionId, Session>,
}

impl Store {
    /// A store holding a single empty session, which is current.
    #[must_use]
    pub fn fresh(today: SessionId) -> Self {
        let mut sessions = BTreeMap::new();
        sessions.insert(today.clone(), Session::empty(today.clone()));
        Self {
            current_session_id: today,
            sessions,
        }
    }

    /// Assembles a store from parts, creating the current session if absent.
    #[must_use]
    pub fn from_parts(current: SessionId, mut sessions: BTreeMap<SessionId, Session>) -> Self {
        sessions
            .entry(current.clone())
            .or_insert_with(|| Session::empty(current.clone()));
        Self {
            current_session_id: current,
            sessions,
        }
    }

    pub const fn current_session_id(&self) -> &SessionId {
        &self.current_session_id
    }

    pub fn current_session(&self) -> &Session {
        // Every constructor and transition keeps the current session present.
        &self.sessions[&self.current_session_id]
    }

    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub const fn sessions(&self) -> &BTreeMap<SessionId, Session> {
        &self.sessions
    }

    /// Adds `entry` to the current session.
    #[must_use]
    pub fn with_entry_appended(&self, entry: ContractionLogEntry) -> Self {
        let session = self.current_session();
        let mut entries = session.entries.clone();
        entries.push(entry);
        self.with_session(session.with_entries(entries))
    }

    /// Drops the latest entry of the current session. `None` when it is empty.
    #[must_use]
    pub fn with_latest_removed(&self) -> Option<(Self, ContractionLogEntry)> {
        let session = self.current_session();
        let mut entries = session.entries.clone();
        let removed = entries.pop()?;
        Some((self.with_session(session.with_entries(entries)), removed))
    }

    /// Empties the current session. `None` when it is already empty.
    #[must_use]
    pub fn with_current_cleared(&self) -> Option<Self> {
        let session = self.current_session();
        if session.is_empty() {
            return None;
        }
        Some(self.with_session(session.with_entries(Vec::new())))
    }

    /// Points the store at `id`, creating an empty session for it if needed.
    ///
    /// Other sessions are left exactly as they were.
    #[must_use]
    pub fn switched_to(&self, id: SessionId) -> Self {
        Self::from_parts(id, self.sessions.clone())
    }

    /// Replaces one entry's bounds and re-sorts its session.
    ///
    /// `None` when the session or entry does not exist.
    #[must_use]
    pub fn with_entry_retimed(
        &self,
        session_id: &SessionId,
        entry_id: &EntryId,
        start: i64,
        end: i64,
    ) -> Option<Self> {
        let session = self.sessions.get(session_id)?;
        session.entry(entry_id)?;
        let entries = session
            .entries
            .iter()
            .map(|entry| {
                if &entry.id == entry_id {
                    ContractionLogEntry {
                        start,
                        end,
                        ..entry.clone()
                    }
                } else {
                    entry.clone()
                }
            })
            .collect();
        Some(self.with_session(session.with_entries(entries)))
    }

    fn with_session(&self, session: Session) -> Self {
        let mut sessions = self.sessions.clone();
        sessions.insert(session.id.clone(), session);
        Self {
            current_session_id: self.current_session_id.clone(),
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(id: &str) -> SessionId {
        SessionId::new(id).unwrap()
    }

    fn entry(id: &str, start: i64, end: i64) -> ContractionLogEntry {
        ContractionLogEntry {
            id: EntryId::new(id).unwrap(),
            start,
            end,
            created_at: end,
        }
    }

    fn ids(entries: &[ContractionLogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn sort_orders_by_start() {
        let sorted = sort_chronologically(vec![
            entry("c", 30_000, 40_000),
            entry("a", 0, 10_000),
            entry("b", 15_000, 20_000),
        ]);
        assert_eq!(ids(&sorted), ["a", "b", "c"]);
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let input = vec![
            entry("x", 5_000, 9_000),
            entry("y", 1_000, 7_000),
            entry("z", 5_000, 12_000),
        ];
        let once = sort_chronologically(input);
        assert_eq!(ids(&once), ["y", "x", "z"]);
        let twice = sort_chronologically(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn session_new_never_trusts_caller_order() {
        let session = Session::new(
            day("2025-01-01"),
            vec![entry("late", 50_000, 60_000), entry("early", 0, 6_000)],
        );
        assert_eq!(ids(session.entries()), ["early", "late"]);
        assert_eq!(session.latest().unwrap().id.as_str(), "late");
    }

    #[test]
    fn fresh_store_has_current_session() {
        let store = Store::fresh(day("2025-01-01"));
        assert_eq!(store.current_session_id().as_str(), "2025-01-01");
        assert!(store.current_session().is_empty());
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn append_keeps_order_and_leaves_original_untouched() {
        let store = Store::fresh(day("2025-01-01")).with_entry_appended(entry("b", 20_000, 30_000));
        let next = store.with_entry_appended(entry("a", 0, 10_000));
        assert_eq!(ids(next.current_session().entries()), ["a", "b"]);
        assert_eq!(store.current_session().len(), 1);
    }

    #[test]
    fn remove_latest_takes_highest_start() {
        let store = Store::fresh(day("2025-01-01"))
            .with_entry_appended(entry("late", 90_000, 100_000))
            .with_entry_appended(entry("early", 0, 10_000));
        let (next, removed) = store.with_latest_removed().unwrap();
        assert_eq!(removed.id.as_str(), "late");
        assert_eq!(ids(next.current_session().entries()), ["early"]);
    }

    #[test]
    fn remove_latest_on_empty_is_none() {
        assert!(Store::fresh(day("2025-01-01")).with_latest_removed().is_none());
    }

    #[test]
    fn clear_keeps_session() {
        let store = Store::fresh(day("2025-01-01")).with_entry_appended(entry("a", 0, 10_000));
        let cleared = store.with_current_cleared().unwrap();
        assert!(cleared.current_session().is_empty());
        assert!(cleared.session(&day("2025-01-01")).is_some());
        assert!(cleared.with_current_cleared().is_none());
    }

    #[test]
    fn switch_creates_missing_session_and_preserves_others() {
        let store = Store::fresh(day("2025-01-01")).with_entry_appended(entry("a", 0, 10_000));
        let next = store.switched_to(day("2025-01-02"));
        assert_eq!(next.current_session_id().as_str(), "2025-01-02");
        assert!(next.current_session().is_empty());
        assert_eq!(next.session(&day("2025-01-01")), store.session(&day("2025-01-01")));

        let back = next.switched_to(day("2025-01-01"));
        assert_eq!(back.current_session().len(), 1);
    }

    #[test]
    fn retime_resorts_entries() {
        let store = Store::fresh(day("2025-01-01"))
            .with_entry_appended(entry("a", 0, 10_000))
            .with_entry_appended(entry("b", 60_000, 70_000));
        let next = store
            .with_entry_retimed(
                &day("2025-01-01"),
                &EntryId::new("a").unwrap(),
                80_000,
                90_000,
            )
            .unwrap();
        assert_eq!(ids(next.current_session().entries()), ["b", "a"]);
        let moved = next.current_session().entry(&EntryId::new("a").unwrap()).unwrap();
        assert_eq!((moved.start, moved.end, moved.created_at), (80_000, 90_000, 10_000));
    }

    #[test]
    fn retime_missing_target_is_none() {
        let store = Store::fresh(day("2025-01-01"));
        let missing = EntryId::new("nope").unwrap();
        assert!(store.with_entry_retimed(&day("2025-01-01"), &missing, 0, 10_000).is_none());
        assert!(store.with_entry_retimed(&day("2025-01-02"), &missing, 0, 10_000).is_none());
    }

    #[test]
    fn store_serializes_to_camel_case_record() {
        let store = Store::fresh(day("2025-01-01")).with_entry_appended(entry("a", 0, 10_000));
        let value = serde_json::to_value(&store).unwrap();
        assert_eq!(value["currentSessionId"], "2025-01-01");
        let first = &value["sessions"]["2025-01-01"]["entries"][0];
        assert_eq!(first["createdAt"], 10_000);
        assert_eq!(value["sessions"]["2025-01-01"]["id"], "2025-01-01");
    }
}
