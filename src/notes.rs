//! Character field notes: normalization of backend records and the
//! per-character notes book.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::{Note, NoteId};

/// Backend field names that may carry a note's identifier, in priority order.
const ID_FIELDS: [&str; 3] = ["note_id", "_id", "id"];

/// Normalize a notes response. Anything but an array yields no notes.
/// Records without `created_at` are stamped with `now`.
pub fn normalize_notes(data: &Value, now: DateTime<Utc>) -> Vec<Note> {
    let Some(records) = data.as_array() else {
        return Vec::new();
    };

    records
        .iter()
        .map(|record| Note {
            id: resolve_id(record),
            text: match record.get("note") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
            timestamp: record
                .get("created_at")
                .and_then(parse_created_at)
                .unwrap_or(now),
        })
        .collect()
}

fn resolve_id(record: &Value) -> Option<NoteId> {
    let value = ID_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .find(|v| !v.is_null())?;

    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(NoteId::Int(i)),
            None => Some(NoteId::Text(n.to_string())),
        },
        Value::String(s) if !s.is_empty() => Some(NoteId::Text(s.clone())),
        _ => None,
    }
}

fn parse_created_at(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Notes keyed by character id, in the order the backend returned them.
#[derive(Debug, Default)]
pub struct NotesBook {
    by_character: HashMap<String, Vec<Note>>,
}

impl NotesBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, character_id: &str) -> &[Note] {
        self.by_character
            .get(character_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace a character's notes with the backend's list.
    pub fn replace(&mut self, character_id: &str, notes: Vec<Note>) {
        self.by_character.insert(character_id.to_string(), notes);
    }

    /// Drop every note with `note_id`. Returns how many were removed.
    pub fn remove(&mut self, character_id: &str, note_id: &NoteId) -> usize {
        let Some(notes) = self.by_character.get_mut(character_id) else {
            return 0;
        };
        let before = notes.len();
        notes.retain(|n| n.id.as_ref() != Some(note_id));
        before - notes.len()
    }
}
