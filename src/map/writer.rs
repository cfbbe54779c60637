// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Test-only encoder for the tile map format. Fixtures are built in
//! code instead of being checked in as opaque binaries, so every test
//! documents the exact file it reads.

use std::io::Write;

use super::road::{RestrictionKind, COORDINATE_SHIFT};
use super::tree::BBox31;
use super::{SUPPORTED_VERSION, FIELD_ROUTING_REGION, FIELD_TIMESTAMP, FIELD_VERSION, FIELD_VERSION_CONFIRM};
use crate::geo::Point31;

pub(crate) struct TestMap {
    pub regions: Vec<TestRegion>,
}

pub(crate) struct TestRegion {
    pub name: String,
    /// 1-based encoding rules: (tag, value).
    pub rules: Vec<(String, String)>,
    pub boxes: Vec<TestBox>,
    pub base_boxes: Vec<TestBox>,
}

pub(crate) struct TestBox {
    pub bbox: BBox31,
    pub roads: Vec<TestRoad>,
    pub children: Vec<TestBox>,
}

#[derive(Clone)]
pub(crate) struct TestRoad {
    pub id: u64,
    pub points: Vec<Point31>,
    pub types: Vec<u32>,
    pub point_types: Vec<(u32, Vec<u32>)>,
    /// (name-kind rule id, text)
    pub names: Vec<(u32, String)>,
    pub restrictions: Vec<(RestrictionKind, u64)>,
}

impl TestRoad {
    pub fn new(id: u64, points: Vec<Point31>) -> Self {
        Self {
            id,
            points,
            types: Vec::new(),
            point_types: Vec::new(),
            names: Vec::new(),
            restrictions: Vec::new(),
        }
    }

    pub fn types(mut self, types: &[u32]) -> Self {
        self.types = types.to_vec();
        self
    }

    pub fn point_types(mut self, vertex: u32, types: &[u32]) -> Self {
        self.point_types.push((vertex, types.to_vec()));
        self
    }

    pub fn named(mut self, rule: u32, name: &str) -> Self {
        self.names.push((rule, name.to_string()));
        self
    }

    pub fn restrict(mut self, kind: RestrictionKind, target: u64) -> Self {
        self.restrictions.push((kind, target));
        self
    }
}

impl TestBox {
    pub fn leaf(bbox: BBox31, roads: Vec<TestRoad>) -> Self {
        Self {
            bbox,
            roads,
            children: Vec::new(),
        }
    }

    pub fn interior(bbox: BBox31, children: Vec<TestBox>) -> Self {
        Self {
            bbox,
            roads: Vec::new(),
            children,
        }
    }
}

impl TestMap {
    pub fn single_region(rules: &[(&str, &str)], boxes: Vec<TestBox>) -> Self {
        Self {
            regions: vec![TestRegion {
                name: "test".to_string(),
                rules: rules
                    .iter()
                    .map(|(t, v)| (t.to_string(), v.to_string()))
                    .collect(),
                boxes,
                base_boxes: Vec::new(),
            }],
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_varint_field(&mut out, FIELD_VERSION, SUPPORTED_VERSION as u64);
        put_varint_field(&mut out, FIELD_TIMESTAMP, 1_700_000_000_000);
        for region in &self.regions {
            put_bytes_field(&mut out, FIELD_ROUTING_REGION, &encode_region(region));
        }
        put_varint_field(&mut out, FIELD_VERSION_CONFIRM, SUPPORTED_VERSION as u64);
        out
    }

    pub fn write_to_temp(&self) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp map file");
        file.write_all(&self.encode()).expect("write temp map file");
        file.flush().expect("flush temp map file");
        file
    }
}

fn encode_region(region: &TestRegion) -> Vec<u8> {
    let mut out = Vec::new();
    put_string_field(&mut out, 1, &region.name);
    for (tag, value) in &region.rules {
        let mut rule = Vec::new();
        put_string_field(&mut rule, 1, tag);
        put_string_field(&mut rule, 2, value);
        put_bytes_field(&mut out, 2, &rule);
    }
    for b in &region.boxes {
        put_bytes_field(&mut out, 3, &encode_box(b, None));
    }
    for b in &region.base_boxes {
        put_bytes_field(&mut out, 4, &encode_box(b, None));
    }
    out
}

fn encode_box(tb: &TestBox, parent: Option<&BBox31>) -> Vec<u8> {
    let (origin_x, origin_y) = match parent {
        Some(p) => (p.left, p.top),
        None => (0, 0),
    };

    let mut bounds = Vec::new();
    put_varint_field(&mut bounds, 1, zigzag((tb.bbox.left - origin_x) as i64));
    put_varint_field(&mut bounds, 2, zigzag((tb.bbox.right - origin_x) as i64));
    put_varint_field(&mut bounds, 3, zigzag((tb.bbox.top - origin_y) as i64));
    put_varint_field(&mut bounds, 4, zigzag((tb.bbox.bottom - origin_y) as i64));

    let mut children = Vec::new();
    for child in &tb.children {
        put_bytes_field(&mut children, 7, &encode_box(child, Some(&tb.bbox)));
    }

    if tb.roads.is_empty() {
        let mut out = bounds;
        out.extend_from_slice(&children);
        return out;
    }

    // The shift field's own varint length feeds into the shift value;
    // iterate until the assumed length is consistent (two passes max).
    let block = encode_block(tb);
    let mut shift_len = 1usize;
    loop {
        // bounds + (tag + shift varint) + children + data field tag
        let shift = bounds.len() + 1 + shift_len + children.len() + 1;
        if varint_len(shift as u64) == shift_len {
            let mut out = bounds;
            put_varint_field(&mut out, 5, shift as u64);
            out.extend_from_slice(&children);
            put_bytes_field(&mut out, 8, &block);
            return out;
        }
        shift_len += 1;
    }
}

fn encode_block(tb: &TestBox) -> Vec<u8> {
    // The id table covers road ids and restriction targets alike.
    let mut ids: Vec<u64> = Vec::new();
    let mut id_index = |id: u64, ids: &mut Vec<u64>| -> u64 {
        match ids.iter().position(|&existing| existing == id) {
            Some(at) => at as u64 + 1,
            None => {
                ids.push(id);
                ids.len() as u64
            }
        }
    };
    for road in &tb.roads {
        id_index(road.id, &mut ids);
        for &(_, target) in &road.restrictions {
            id_index(target, &mut ids);
        }
    }

    let mut strings: Vec<String> = Vec::new();
    let mut road_bufs = Vec::new();
    for road in &tb.roads {
        road_bufs.push(encode_road(road, &tb.bbox, &ids, &mut strings));
    }

    let mut id_table = Vec::new();
    let mut previous: i64 = 0;
    for &id in &ids {
        put_varint(&mut id_table, zigzag(id as i64 - previous));
        previous = id as i64;
    }

    let mut out = Vec::new();
    put_bytes_field(&mut out, 1, &id_table);
    for buf in &road_bufs {
        put_bytes_field(&mut out, 2, buf);
    }
    if !strings.is_empty() {
        let mut table = Vec::new();
        for s in &strings {
            put_string_field(&mut table, 1, s);
        }
        put_bytes_field(&mut out, 3, &table);
    }
    out
}

fn encode_road(road: &TestRoad, bbox: &BBox31, ids: &[u64], strings: &mut Vec<String>) -> Vec<u8> {
    let mut out = Vec::new();

    let mut points = Vec::new();
    let mut px = bbox.left >> COORDINATE_SHIFT;
    let mut py = bbox.top >> COORDINATE_SHIFT;
    for p in &road.points {
        let x = p.x >> COORDINATE_SHIFT;
        let y = p.y >> COORDINATE_SHIFT;
        put_varint(&mut points, zigzag((x - px) as i64));
        put_varint(&mut points, zigzag((y - py) as i64));
        px = x;
        py = y;
    }
    put_bytes_field(&mut out, 1, &points);

    if !road.types.is_empty() {
        let mut types = Vec::new();
        for &t in &road.types {
            put_varint(&mut types, t as u64);
        }
        put_bytes_field(&mut out, 2, &types);
    }

    if !road.point_types.is_empty() {
        let mut pt = Vec::new();
        for (vertex, types) in &road.point_types {
            put_varint(&mut pt, *vertex as u64);
            put_varint(&mut pt, types.len() as u64);
            for &t in types {
                put_varint(&mut pt, t as u64);
            }
        }
        put_bytes_field(&mut out, 3, &pt);
    }

    let index = ids.iter().position(|&id| id == road.id).unwrap() as u64 + 1;
    put_varint_field(&mut out, 4, index);

    if !road.names.is_empty() {
        let mut names = Vec::new();
        for (rule, text) in &road.names {
            let string_index = match strings.iter().position(|s| s == text) {
                Some(at) => at,
                None => {
                    strings.push(text.clone());
                    strings.len() - 1
                }
            };
            put_varint(&mut names, *rule as u64);
            put_varint(&mut names, string_index as u64);
        }
        put_bytes_field(&mut out, 5, &names);
    }

    if !road.restrictions.is_empty() {
        let mut restrictions = Vec::new();
        for &(kind, target) in &road.restrictions {
            let target_index = ids.iter().position(|&id| id == target).unwrap() as u64 + 1;
            put_varint(&mut restrictions, kind.to_wire());
            put_varint(&mut restrictions, target_index);
        }
        put_bytes_field(&mut out, 6, &restrictions);
    }

    out
}

fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn varint_len(mut v: u64) -> usize {
    let mut len = 1;
    while v >= 0x80 {
        v >>= 7;
        len += 1;
    }
    len
}

fn put_varint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn put_varint_field(out: &mut Vec<u8>, field: u32, v: u64) {
    put_varint(out, u64::from(field << 3));
    put_varint(out, v);
}

fn put_bytes_field(out: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    put_varint(out, u64::from((field << 3) | 2));
    put_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn put_string_field(out: &mut Vec<u8>, field: u32, s: &str) {
    put_bytes_field(out, field, s.as_bytes());
}
