// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::codec::{MessageReader, WIRE_BYTES, WIRE_VARINT};
use super::tree::BBox31;
use super::{EncodingRule, MapError};
use crate::geo::Point31;

/// Road geometry is stored with the lowest 4 bits of each coordinate
/// dropped; decoding restores them as zeroes.
pub(crate) const COORDINATE_SHIFT: u32 = 4;

/// Kind of a turn restriction record attached to a source road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    NoLeftTurn,
    NoRightTurn,
    NoStraightOn,
    NoUTurn,
    OnlyLeftTurn,
    OnlyRightTurn,
    OnlyStraightOn,
}

impl RestrictionKind {
    pub(crate) fn from_wire(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::NoLeftTurn),
            2 => Some(Self::NoRightTurn),
            3 => Some(Self::NoStraightOn),
            4 => Some(Self::NoUTurn),
            5 => Some(Self::OnlyLeftTurn),
            6 => Some(Self::OnlyRightTurn),
            7 => Some(Self::OnlyStraightOn),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn to_wire(self) -> u64 {
        match self {
            Self::NoLeftTurn => 1,
            Self::NoRightTurn => 2,
            Self::NoStraightOn => 3,
            Self::NoUTurn => 4,
            Self::OnlyLeftTurn => 5,
            Self::OnlyRightTurn => 6,
            Self::OnlyStraightOn => 7,
        }
    }

    /// "only_*" kinds: when any such record exists at a junction,
    /// it enumerates the complete set of permitted exits.
    pub fn is_exclusive(self) -> bool {
        matches!(
            self,
            Self::OnlyLeftTurn | Self::OnlyRightTurn | Self::OnlyStraightOn
        )
    }
}

/// A turn restriction record: traversal from the owning road onto
/// `road_id` is either prohibited or mandated, depending on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restriction {
    pub road_id: u64,
    pub kind: RestrictionKind,
}

/// An immutable road polyline decoded from a map file.
///
/// Coordinates are 31-bit fixed-point; `types` are rule ids local to
/// the region's decoding table. Point types mark per-vertex obstacles
/// (traffic signals, barriers) and are stored sparsely.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadObject {
    pub id: u64,
    pub points: Vec<Point31>,
    pub types: Vec<u32>,
    pub(crate) point_types: Vec<(u32, Vec<u32>)>,
    pub(crate) names: Vec<(String, String)>,
    pub restrictions: Vec<Restriction>,
    /// Index of the owning region inside the [MapFile](super::MapFile).
    pub(crate) region: u32,
}

impl RoadObject {
    /// Rule ids attached to the vertex at `index`, empty when none.
    pub fn point_types(&self, index: u32) -> &[u32] {
        self.point_types
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, t)| t.as_slice())
            .unwrap_or_default()
    }

    /// The value of the given name-kind tag ("name", "ref", ...).
    pub fn get_name(&self, tag: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// The road's display name, if encoded.
    pub fn name(&self) -> Option<&str> {
        self.get_name("name")
    }

    /// The restriction record targeting `road_id`, if any.
    pub fn restriction_to(&self, road_id: u64) -> Option<RestrictionKind> {
        self.restrictions
            .iter()
            .find(|r| r.road_id == road_id)
            .map(|r| r.kind)
    }

    /// Whether any exclusive ("only_*") restriction starts at this road.
    pub fn has_exclusive_restriction(&self) -> bool {
        self.restrictions.iter().any(|r| r.kind.is_exclusive())
    }

    /// The bounding box of the road's geometry.
    pub fn bbox(&self) -> BBox31 {
        let mut bbox = BBox31 {
            left: i32::MAX,
            right: i32::MIN,
            top: i32::MAX,
            bottom: i32::MIN,
        };
        for p in &self.points {
            bbox.left = bbox.left.min(p.x);
            bbox.right = bbox.right.max(p.x);
            bbox.top = bbox.top.min(p.y);
            bbox.bottom = bbox.bottom.max(p.y);
        }
        bbox
    }
}

/// Decodes one road block: id table, roads, then a block-local string
/// table. Roads are resolved only after both tables are known, as the
/// string table follows the roads on disk.
pub(crate) fn decode_block(
    buf: &[u8],
    rules: &[EncodingRule],
    region: u32,
    bbox: &BBox31,
) -> Result<Vec<Arc<RoadObject>>, MapError> {
    let mut ids: Vec<u64> = Vec::new();
    let mut road_bufs: Vec<Vec<u8>> = Vec::new();
    let mut strings: Vec<String> = Vec::new();

    let mut msg = MessageReader::from_bytes(buf);
    while let Some((field, wire)) = msg.next_tag()? {
        match (field, wire) {
            (1, WIRE_BYTES) => ids = decode_id_table(&msg.read_bytes()?)?,
            (2, WIRE_BYTES) => road_bufs.push(msg.read_bytes()?),
            (3, WIRE_BYTES) => strings = decode_string_table(&msg.read_bytes()?)?,
            (_, wire) => msg.skip_value(wire)?,
        }
    }

    road_bufs
        .iter()
        .map(|b| decode_road(b, &ids, &strings, rules, region, bbox).map(Arc::new))
        .collect()
}

/// The id table is a run of cumulative zigzag deltas over 64-bit ids.
fn decode_id_table(buf: &[u8]) -> Result<Vec<u64>, MapError> {
    let mut msg = MessageReader::from_bytes(buf);
    let mut ids = Vec::new();
    let mut previous: i64 = 0;
    while !msg.at_end()? {
        previous += msg.read_sint64()?;
        ids.push(previous as u64);
    }
    Ok(ids)
}

fn decode_string_table(buf: &[u8]) -> Result<Vec<String>, MapError> {
    let mut msg = MessageReader::from_bytes(buf);
    let mut strings = Vec::new();
    while let Some((field, wire)) = msg.next_tag()? {
        match (field, wire) {
            (1, WIRE_BYTES) => strings.push(msg.read_string()?),
            (_, wire) => msg.skip_value(wire)?,
        }
    }
    Ok(strings)
}

fn decode_road(
    buf: &[u8],
    ids: &[u64],
    strings: &[String],
    rules: &[EncodingRule],
    region: u32,
    bbox: &BBox31,
) -> Result<RoadObject, MapError> {
    let mut road = RoadObject {
        id: 0,
        points: Vec::new(),
        types: Vec::new(),
        point_types: Vec::new(),
        names: Vec::new(),
        restrictions: Vec::new(),
        region,
    };

    let mut msg = MessageReader::from_bytes(buf);
    while let Some((field, wire)) = msg.next_tag()? {
        match (field, wire) {
            (1, WIRE_BYTES) => road.points = decode_points(&msg.read_bytes()?, bbox)?,
            (2, WIRE_BYTES) => road.types = decode_packed_varints(&msg.read_bytes()?)?,
            (3, WIRE_BYTES) => road.point_types = decode_point_types(&msg.read_bytes()?)?,
            (4, WIRE_VARINT) => {
                let index = msg.read_varint64()?;
                road.id = *ids
                    .get((index as usize).wrapping_sub(1))
                    .ok_or(MapError::Format("road id out of id table range"))?;
            }
            (5, WIRE_BYTES) => road.names = decode_names(&msg.read_bytes()?, rules, strings),
            (6, WIRE_BYTES) => {
                road.restrictions = decode_restrictions(&msg.read_bytes()?, ids)?;
            }
            (_, wire) => msg.skip_value(wire)?,
        }
    }

    if road.id == 0 {
        return Err(MapError::Format("road without an id"));
    }
    if road.points.is_empty() {
        return Err(MapError::Format("road without geometry"));
    }
    Ok(road)
}

/// Point coordinates: zigzag deltas against the previous point, in the
/// reduced `>> 4` precision; the first point is relative to the box's
/// top-left corner.
fn decode_points(buf: &[u8], bbox: &BBox31) -> Result<Vec<Point31>, MapError> {
    let mut msg = MessageReader::from_bytes(buf);
    let mut points = Vec::new();
    let mut px = bbox.left >> COORDINATE_SHIFT;
    let mut py = bbox.top >> COORDINATE_SHIFT;
    while !msg.at_end()? {
        px += msg.read_sint32()?;
        py += msg.read_sint32()?;
        points.push(Point31 {
            x: px << COORDINATE_SHIFT,
            y: py << COORDINATE_SHIFT,
        });
    }
    Ok(points)
}

fn decode_packed_varints(buf: &[u8]) -> Result<Vec<u32>, MapError> {
    let mut msg = MessageReader::from_bytes(buf);
    let mut values = Vec::new();
    while !msg.at_end()? {
        values.push(msg.read_varint32()?);
    }
    Ok(values)
}

/// Point types: repeated `[vertex index, count, count × rule id]`.
fn decode_point_types(buf: &[u8]) -> Result<Vec<(u32, Vec<u32>)>, MapError> {
    let mut msg = MessageReader::from_bytes(buf);
    let mut result = Vec::new();
    while !msg.at_end()? {
        let vertex = msg.read_varint32()?;
        let count = msg.read_varint32()?;
        let mut types = Vec::with_capacity(count as usize);
        for _ in 0..count {
            types.push(msg.read_varint32()?);
        }
        result.push((vertex, types));
    }
    Ok(result)
}

/// Names: repeated `[name-kind rule id, string table index]` pairs.
/// Records with dangling references are dropped, not fatal: a single
/// file aggregates many independently-authored regions.
fn decode_names(buf: &[u8], rules: &[EncodingRule], strings: &[String]) -> Vec<(String, String)> {
    let mut msg = MessageReader::from_bytes(buf);
    let mut names = Vec::new();
    loop {
        match msg.at_end() {
            Ok(true) | Err(_) => break,
            Ok(false) => {}
        }
        let (Ok(rule_id), Ok(string_index)) = (msg.read_varint32(), msg.read_varint32()) else {
            break;
        };
        let rule = rules.get((rule_id as usize).wrapping_sub(1));
        let value = strings.get(string_index as usize);
        match (rule, value) {
            (Some(rule), Some(value)) => names.push((rule.tag.clone(), value.clone())),
            _ => log::warn!(
                "dropping name record with dangling reference ({} -> {})",
                rule_id,
                string_index
            ),
        }
    }
    names
}

/// Restrictions: repeated `[kind, id table index]` pairs. Unknown
/// kinds and dangling indices are skipped, never fatal.
fn decode_restrictions(buf: &[u8], ids: &[u64]) -> Result<Vec<Restriction>, MapError> {
    let mut msg = MessageReader::from_bytes(buf);
    let mut restrictions = Vec::new();
    while !msg.at_end()? {
        let kind = msg.read_varint64()?;
        let index = msg.read_varint64()?;
        let kind = RestrictionKind::from_wire(kind);
        let target = ids.get((index as usize).wrapping_sub(1));
        match (kind, target) {
            (Some(kind), Some(&road_id)) => restrictions.push(Restriction { road_id, kind }),
            _ => log::warn!("dropping malformed restriction record"),
        }
    }
    Ok(restrictions)
}
