use super::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    id: u64,
    slug: String,
    body: String,
}

impl Record for Note {
    const TABLE: &'static str = "notes";
    fn id(&self) -> u64 { self.id }
    fn set_id(&mut self, id: u64) { self.id = id; }
    fn unique_fields(&self) -> Vec<(&'static str, String)> { vec![("slug", self.slug.to_lowercase())] }
}

fn note(slug: &str) -> Note { Note { id: 0, slug: slug.into(), body: format!("body of {}", slug) } }

#[test]
fn insert_assigns_increasing_ids() {
    let mut s = SharedStore::in_memory();
    let a = s.insert(note("a")).unwrap();
    let b = s.insert(note("b")).unwrap();
    assert_eq!((a.id, b.id), (1, 2));
    s.delete::<Note>(2).unwrap();
    // ids are not reused after delete
    let c = s.insert(note("c")).unwrap();
    assert_eq!(c.id, 3);
    assert_eq!(s.count::<Note>().unwrap(), 2);
}

#[test]
fn unique_fields_conflict_on_insert_and_update() {
    let mut s = SharedStore::in_memory();
    s.insert(note("alpha")).unwrap();
    let beta = s.insert(note("beta")).unwrap();
    match s.insert(note("ALPHA")) {
        Err(StoreError::Conflict { kind, field }) => { assert_eq!(kind, "notes"); assert_eq!(field, "slug"); }
        other => panic!("expected conflict, got {:?}", other.map(|n| n.id)),
    }
    let mut renamed = beta.clone();
    renamed.slug = "alpha".into();
    assert!(matches!(s.update(renamed), Err(StoreError::Conflict { .. })));
    // updating a record with its own unique value is fine
    let mut same = beta.clone();
    same.body = "changed".into();
    assert_eq!(s.update(same).unwrap().body, "changed");
}

#[test]
fn update_and_delete_missing_rows_fail() {
    let mut s = SharedStore::in_memory();
    let mut ghost = note("ghost");
    ghost.id = 42;
    assert!(matches!(s.update(ghost), Err(StoreError::NotFound { id: 42, .. })));
    assert!(matches!(s.delete::<Note>(42), Err(StoreError::NotFound { .. })));
}

#[test]
fn find_and_list_by_predicate() {
    let mut s = SharedStore::in_memory();
    for slug in ["x1", "y1", "x2"] { s.insert(note(slug)).unwrap(); }
    let xs: Vec<Note> = s.list(|n: &Note| n.slug.starts_with('x')).unwrap();
    assert_eq!(xs.len(), 2);
    let y: Option<Note> = s.find(|n: &Note| n.slug == "y1").unwrap();
    assert_eq!(y.map(|n| n.id), Some(2));
    let none: Option<Note> = s.get(99).unwrap();
    assert!(none.is_none());
}

#[test]
fn snapshot_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("data.json");
    {
        let mut s = SharedStore::open(&path).unwrap();
        s.insert(note("kept")).unwrap();
        s.insert(note("dropped")).unwrap();
        s.delete::<Note>(2).unwrap();
    }
    let mut s = SharedStore::open(&path).unwrap();
    let all: Vec<Note> = s.list(|_: &Note| true).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].slug, "kept");
    assert_eq!(s.insert(note("next")).unwrap().id, 3);
}

#[test]
fn failed_mutation_leaves_table_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("data.json");
    let mut s = SharedStore::open(&path).unwrap();
    s.insert(note("one")).unwrap();
    assert!(s.insert(note("one")).is_err());
    let reopened = SharedStore::open(&path).unwrap();
    assert_eq!(reopened.count::<Note>().unwrap(), 1);
    assert_eq!(s.count::<Note>().unwrap(), 1);
}

#[test]
fn corrupt_snapshot_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("data.json");
    std::fs::write(&path, b"{ not json").unwrap();
    assert!(matches!(SharedStore::open(&path), Err(StoreError::Serde(_))));
}
