// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};
use std::io::Write as _;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
    n: u64,
    tag: String,
}

fn entry(n: u64) -> Entry {
    Entry {
        n,
        tag: format!("e{n}"),
    }
}

#[test]
fn append_flush_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("j.jsonl");

    let mut journal: Journal<Entry> = Journal::open(&path).unwrap();
    journal.append(&entry(1)).unwrap();
    journal.append(&entry(2)).unwrap();
    journal.flush().unwrap();

    let loaded = Journal::<Entry>::load(&path).unwrap();
    assert_eq!(loaded, vec![entry(1), entry(2)]);
}

#[test]
fn unflushed_entries_are_not_durable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("j.jsonl");

    let mut journal: Journal<Entry> = Journal::open(&path).unwrap();
    journal.append(&entry(1)).unwrap();

    assert!(Journal::<Entry>::load(&path).unwrap().is_empty());
}

#[test]
fn missing_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let loaded = Journal::<Entry>::load(&dir.path().join("nope.jsonl")).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn load_stops_at_corrupt_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("j.jsonl");

    let mut journal: Journal<Entry> = Journal::open(&path).unwrap();
    journal.append_flush(&entry(1)).unwrap();

    {
        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        writeln!(f, "{{not json").unwrap();
    }

    // Entry appended after the corruption point is unreachable
    let mut journal: Journal<Entry> = Journal::open(&path).unwrap();
    journal.append_flush(&entry(2)).unwrap();

    let loaded = Journal::<Entry>::load(&path).unwrap();
    assert_eq!(loaded, vec![entry(1)]);
}

#[test]
fn blank_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("j.jsonl");

    let mut journal: Journal<Entry> = Journal::open(&path).unwrap();
    journal.append_flush(&entry(1)).unwrap();
    {
        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        writeln!(f).unwrap();
    }
    journal.append_flush(&entry(2)).unwrap();

    let loaded = Journal::<Entry>::load(&path).unwrap();
    assert_eq!(loaded, vec![entry(1), entry(2)]);
}

#[test]
fn rewrite_replaces_contents_atomically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("j.jsonl");

    let mut journal: Journal<Entry> = Journal::open(&path).unwrap();
    for n in 1..=5 {
        journal.append(&entry(n)).unwrap();
    }
    journal.flush().unwrap();

    journal.rewrite(&[entry(4), entry(5)]).unwrap();
    assert_eq!(
        Journal::<Entry>::load(&path).unwrap(),
        vec![entry(4), entry(5)]
    );

    // Journal stays appendable after rewrite
    journal.append_flush(&entry(6)).unwrap();
    assert_eq!(
        Journal::<Entry>::load(&path).unwrap(),
        vec![entry(4), entry(5), entry(6)]
    );
}
