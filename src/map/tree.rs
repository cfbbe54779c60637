// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::BufReader;
use std::sync::{Arc, OnceLock};

use super::codec::{field_number, wire_type, FileScanner, MessageReader, WIRE_BYTES, WIRE_VARINT};
use super::road::{decode_block, RoadObject};
use super::{MapError, MapFile, RouteRegion};

pub(crate) const FIELD_BOX_LEFT: u32 = 1;
pub(crate) const FIELD_BOX_RIGHT: u32 = 2;
pub(crate) const FIELD_BOX_TOP: u32 = 3;
pub(crate) const FIELD_BOX_BOTTOM: u32 = 4;
pub(crate) const FIELD_BOX_SHIFT: u32 = 5;
pub(crate) const FIELD_BOX_CHILD: u32 = 7;
pub(crate) const FIELD_BOX_DATA: u32 = 8;

/// Box headers are a handful of varint fields written before any
/// child or data field; this prefix size can never truncate them.
const BOX_HEADER_PREFIX: u64 = 128;

/// An axis-aligned bounding box in 31-bit map coordinates.
/// `y` grows southward, so `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BBox31 {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl BBox31 {
    pub fn new(left: i32, right: i32, top: i32, bottom: i32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn intersects(&self, other: &BBox31) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }
}

/// A node of the on-disk spatial route index.
///
/// Only the bounding box and file extent are known up front; the
/// children and contained roads are read on first visit, exactly once
/// per process lifetime. Each load opens its own file handle, so
/// concurrent queries never contend on a shared cursor.
#[derive(Debug)]
pub struct RouteSubregion {
    pub bbox: BBox31,
    /// Absolute offset of the node's encoded content.
    pub(crate) file_offset: u64,
    pub(crate) length: u64,
    /// Offset of the object block inside the content; 0 ⇒ interior node.
    pub(crate) shift_to_data: u64,
    content: OnceLock<SubregionContent>,
}

#[derive(Debug)]
pub(crate) struct SubregionContent {
    pub(crate) children: Vec<RouteSubregion>,
    pub(crate) roads: Vec<Arc<RoadObject>>,
}

impl RouteSubregion {
    /// Reads one box header from the scanner, positioned right after
    /// the box's field tag, and leaves the scanner past the box.
    ///
    /// Only the bounds and data-shift fields are parsed here; the
    /// node interior (children, objects) stays untouched on disk.
    pub(crate) fn read_header<R: std::io::Read + std::io::Seek>(
        scanner: &mut FileScanner<R>,
        parent: Option<&BBox31>,
    ) -> Result<Self, MapError> {
        let length = scanner.read_varint()?;
        let start = scanner.pos();

        let prefix = scanner.read_exact(length.min(BOX_HEADER_PREFIX))?;
        let (origin_x, origin_y) = match parent {
            Some(parent) => (parent.left, parent.top),
            None => (0, 0),
        };

        let mut bbox = BBox31::default();
        let mut shift_to_data = 0u64;

        let mut msg = MessageReader::from_bytes(&prefix);
        while let Some((field, wire)) = msg.next_tag()? {
            match (field, wire) {
                (FIELD_BOX_LEFT, WIRE_VARINT) => bbox.left = origin_x + msg.read_sint32()?,
                (FIELD_BOX_RIGHT, WIRE_VARINT) => bbox.right = origin_x + msg.read_sint32()?,
                (FIELD_BOX_TOP, WIRE_VARINT) => bbox.top = origin_y + msg.read_sint32()?,
                (FIELD_BOX_BOTTOM, WIRE_VARINT) => bbox.bottom = origin_y + msg.read_sint32()?,
                (FIELD_BOX_SHIFT, WIRE_VARINT) => shift_to_data = msg.read_varint64()?,
                _ => break,
            }
        }

        scanner.seek_to(start + length)?;
        Ok(Self {
            bbox,
            file_offset: start,
            length,
            shift_to_data,
            content: OnceLock::new(),
        })
    }

    /// Whether this node carries an object block.
    pub fn is_leaf(&self) -> bool {
        self.shift_to_data != 0
    }

    /// Returns the node's content, loading it from disk on first call.
    /// Re-entrant calls are idempotent: a lost populate race simply
    /// adopts the winning load, which decoded the same bytes.
    pub(crate) fn ensure_loaded(
        &self,
        map: &MapFile,
        region: &RouteRegion,
        region_index: u32,
    ) -> Result<&SubregionContent, MapError> {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }
        let loaded = self.load(map, region, region_index)?;
        map.note_block_load();
        Ok(self.content.get_or_init(|| loaded))
    }

    fn load(
        &self,
        map: &MapFile,
        region: &RouteRegion,
        region_index: u32,
    ) -> Result<SubregionContent, MapError> {
        let file = File::open(map.path())?;
        let mut scanner = FileScanner::new(BufReader::new(file));
        scanner.seek_to(self.file_offset)?;
        let end = self.file_offset + self.length;

        let mut children = Vec::new();
        while let Some(tag) = scanner.read_tag_within(end)? {
            match (field_number(tag), wire_type(tag)) {
                // Own bounds and shift were parsed when this node was
                // discovered as a child header.
                (
                    FIELD_BOX_LEFT..=FIELD_BOX_BOTTOM | FIELD_BOX_SHIFT,
                    WIRE_VARINT,
                ) => {
                    scanner.read_varint()?;
                }
                (FIELD_BOX_CHILD, WIRE_BYTES) => {
                    children.push(Self::read_header(&mut scanner, Some(&self.bbox))?);
                }
                (FIELD_BOX_DATA, WIRE_BYTES) => break,
                (_, wire) => scanner.skip_value(wire)?,
            }
        }

        let roads = if self.shift_to_data != 0 {
            scanner.seek_to(self.file_offset + self.shift_to_data)?;
            let block_length = scanner.read_varint()?;
            if self.file_offset + self.shift_to_data + block_length > end {
                return Err(MapError::Format("object block overruns its node"));
            }
            let buf = scanner.read_exact(block_length)?;
            decode_block(&buf, &region.rules, region_index, &self.bbox)?
        } else {
            Vec::new()
        };

        log::debug!(
            "loaded subregion at {}: {} children, {} roads",
            self.file_offset,
            children.len(),
            roads.len()
        );
        Ok(SubregionContent { children, roads })
    }

    /// Descends into this node if it intersects `bbox`, loading lazily
    /// and pruning on miss: a disjoint node is never even loaded.
    pub(crate) fn visit<'a>(
        &'a self,
        map: &MapFile,
        region: &'a RouteRegion,
        region_index: u32,
        bbox: &BBox31,
        visitor: &mut dyn FnMut(&'a RouteSubregion, &'a [Arc<RoadObject>]),
    ) -> Result<(), MapError> {
        if !self.bbox.intersects(bbox) {
            return Ok(());
        }

        let content = self.ensure_loaded(map, region, region_index)?;
        for child in &content.children {
            child.visit(map, region, region_index, bbox, visitor)?;
        }
        if !content.roads.is_empty() {
            visitor(self, &content.roads);
        }
        Ok(())
    }
}
