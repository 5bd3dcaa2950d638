//! Builders for on-disk test worlds.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use fastnbt::Value;
use flate2::write::ZlibEncoder;
use flate2::Compression;

pub fn sign(x: i32, y: i32, z: i32, lines: [&str; 4]) -> Value {
    let mut map = HashMap::from([
        ("id".to_string(), Value::String("Sign".into())),
        ("x".to_string(), Value::Int(x)),
        ("y".to_string(), Value::Int(y)),
        ("z".to_string(), Value::Int(z)),
    ]);
    for (i, line) in lines.iter().enumerate() {
        map.insert(format!("Text{}", i + 1), Value::String(line.to_string()));
    }
    Value::Compound(map)
}

pub fn chest(x: i32) -> Value {
    Value::Compound(HashMap::from([
        ("id".to_string(), Value::String("Chest".into())),
        ("x".to_string(), Value::Int(x)),
        ("y".to_string(), Value::Int(0)),
        ("z".to_string(), Value::Int(0)),
    ]))
}

/// Pre-1.18 layout: `Level.TileEntities`.
pub fn chunk(entities: Vec<Value>) -> Value {
    let level = Value::Compound(HashMap::from([("TileEntities".to_string(), Value::List(entities))]));
    Value::Compound(HashMap::from([("Level".to_string(), level)]))
}

/// Writes a zlib-compressed region file with one chunk per `(slot, tree)`.
pub fn write_region(path: &Path, chunks: &[(usize, Value)]) {
    let mut out = vec![0u8; 8192];
    let mut sector = 2u32;
    for (slot, tree) in chunks {
        let raw = fastnbt::to_bytes(tree).unwrap();
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&raw).unwrap();
        let body = enc.finish().unwrap();

        let sectors = (body.len() + 5).div_ceil(4096) as u32;
        let entry = (sector << 8) | sectors;
        out[slot * 4..slot * 4 + 4].copy_from_slice(&entry.to_be_bytes());
        out[4096 + slot * 4..4096 + slot * 4 + 4].copy_from_slice(&1_600_000_000u32.to_be_bytes());

        let start = out.len();
        out.extend_from_slice(&(body.len() as u32 + 1).to_be_bytes());
        out.push(2);
        out.extend_from_slice(&body);
        out.resize(start + sectors as usize * 4096, 0);
        sector += sectors;
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, out).unwrap();
}
