#![allow(dead_code)]

use jsonquery::{FieldType, Record, Schema};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub fn records(value: Value) -> Vec<Record> {
    value
        .as_array()
        .expect("fixture must be an array")
        .iter()
        .map(|v| v.as_object().expect("fixture rows must be objects").clone())
        .collect()
}

/// Eight albums across three genres. The last row has nulls in place of
/// Artist, Live and Released.
pub fn music_value() -> Value {
    json!([
        {"Title": "Blue Train", "Artist": "Coltrane", "Genre": "jazz", "Year": 1957, "Plays": 120, "Live": false, "Released": "1957-09-15", "Tags": ["hard bop", "sax"]},
        {"Title": "Kind of Blue", "Artist": "Davis", "Genre": "jazz", "Year": 1959, "Plays": 300, "Live": false, "Released": "1959-08-17", "Tags": ["modal", "trumpet"]},
        {"Title": "Nevermind", "Artist": "Nirvana", "Genre": "rock", "Year": 1991, "Plays": 250, "Live": false, "Released": "1991-09-24", "Tags": ["grunge"]},
        {"Title": "Unplugged", "Artist": "Nirvana", "Genre": "rock", "Year": 1994, "Plays": 180, "Live": true, "Released": "1994-11-01", "Tags": ["acoustic", "live"]},
        {"Title": "OK Computer", "Artist": "Radiohead", "Genre": "rock", "Year": 1997, "Plays": 280, "Live": false, "Released": "1997-05-21", "Tags": []},
        {"Title": "Thriller", "Artist": "Jackson", "Genre": "pop", "Year": 1982, "Plays": 400, "Live": false, "Released": "1982-11-30", "Tags": ["dance"]},
        {"Title": "Live at Leeds", "Artist": "The Who", "Genre": "rock", "Year": 1970, "Plays": 90, "Live": true, "Released": "1970-05-16", "Tags": ["live"]},
        {"Title": "Untitled", "Artist": null, "Genre": "pop", "Year": 2001, "Plays": 5, "Live": null, "Released": null, "Tags": ["demo"]}
    ])
}

pub fn music_records() -> Vec<Record> {
    records(music_value())
}

pub fn music_schema() -> Schema {
    Schema::new()
        .with_field("Title", FieldType::String)
        .with_field("Artist", FieldType::String)
        .with_field("Genre", FieldType::String)
        .with_field("Year", FieldType::Int)
        .with_field("Plays", FieldType::Int)
        .with_field("Live", FieldType::Bool)
        .with_field("Released", FieldType::Date)
        .with_field("Tags", FieldType::Array)
}

/// Values of `field` as strings, in record order.
pub fn column(records: &[Record], field: &str) -> Vec<String> {
    records
        .iter()
        .map(|r| match r.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
        .collect()
}

pub fn titles(records: &[Record]) -> Vec<String> {
    column(records, "Title")
}

/// Write the music dataset as plain JSON into `dir`.
pub fn write_music_file(dir: &Path) -> PathBuf {
    let path = dir.join("music.json");
    std::fs::write(&path, music_value().to_string()).expect("write fixture");
    path
}
