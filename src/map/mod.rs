// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Reading of the tile-indexed binary map format.
//!
//! A map file is a protobuf-wire stream: a version header, one or
//! more routing regions (each with a tag/value decoding table and two
//! disjoint subregion tiers), and a trailing version confirmation.
//! Subregion interiors are never read at open; they are paged in
//! lazily as queries descend into them.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod codec;
mod road;
mod tree;
#[cfg(test)]
pub(crate) mod writer;

pub use road::{Restriction, RestrictionKind, RoadObject};
pub use tree::{BBox31, RouteSubregion};

use codec::{field_number, wire_type, FileScanner, MessageReader, WIRE_BYTES, WIRE_VARINT};

/// The only map format version this reader understands.
pub const SUPPORTED_VERSION: u32 = 2;

pub(crate) const FIELD_VERSION: u32 = 1;
pub(crate) const FIELD_TIMESTAMP: u32 = 18;
pub(crate) const FIELD_ROUTING_REGION: u32 = 6;
pub(crate) const FIELD_VERSION_CONFIRM: u32 = 32;

const FIELD_REGION_NAME: u32 = 1;
const FIELD_REGION_RULE: u32 = 2;
const FIELD_REGION_ROOT: u32 = 3;
const FIELD_REGION_BASE_ROOT: u32 = 4;

/// Error conditions of opening or lazily reading a map file.
/// All of them are fatal for the file: a partially understood index
/// is never trusted.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire: {0}")]
    Wire(#[from] protobuf::Error),

    #[error("malformed map file: {0}")]
    Format(&'static str),

    #[error("unsupported map format version {0} (supported: {SUPPORTED_VERSION})")]
    Version(u32),
}

/// One (tag, value) entry of a region's decoding table.
/// Road type codes are 1-based indices into this table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingRule {
    pub tag: String,
    pub value: String,
}

/// A routing region of a map file: a named decoding table plus the
/// roots of the full-detail and coarse ("base") subregion tiers.
#[derive(Debug)]
pub struct RouteRegion {
    pub name: String,
    pub(crate) rules: Vec<EncodingRule>,
    pub(crate) subregions: Vec<RouteSubregion>,
    pub(crate) base_subregions: Vec<RouteSubregion>,
}

impl RouteRegion {
    /// Resolves a region-local rule id (1-based) to its table entry.
    pub fn rule(&self, id: u32) -> Option<&EncodingRule> {
        self.rules.get((id as usize).wrapping_sub(1))
    }

    pub fn rules(&self) -> &[EncodingRule] {
        &self.rules
    }
}

/// An opened map file.
///
/// Owns the parsed header and the subregion trees; closing is
/// dropping. Lazy loads open their own file handle against the stored
/// path, so a `MapFile` can be queried from multiple threads without
/// a shared cursor. Queries must not outlive the value, which the
/// borrow checker enforces.
#[derive(Debug)]
pub struct MapFile {
    path: PathBuf,
    version: u32,
    timestamp: u64,
    regions: Vec<RouteRegion>,
    block_loads: AtomicUsize,
}

impl MapFile {
    /// Opens a map file and reads its header: version, regions, rule
    /// tables and root subregion bounds. No road data is read yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut scanner = FileScanner::new(BufReader::new(file));

        let mut version: Option<u32> = None;
        let mut confirmation: Option<u32> = None;
        let mut timestamp = 0u64;
        let mut regions = Vec::new();

        while let Some(tag) = scanner.read_varint_or_eof()? {
            match (field_number(tag as u32), wire_type(tag as u32)) {
                (FIELD_VERSION, WIRE_VARINT) => version = Some(scanner.read_varint()? as u32),
                (FIELD_TIMESTAMP, WIRE_VARINT) => timestamp = scanner.read_varint()?,
                (FIELD_ROUTING_REGION, WIRE_BYTES) => {
                    let length = scanner.read_varint()?;
                    let end = scanner.pos() + length;
                    regions.push(read_region(&mut scanner, end)?);
                    scanner.seek_to(end)?;
                }
                (FIELD_VERSION_CONFIRM, WIRE_VARINT) => {
                    confirmation = Some(scanner.read_varint()? as u32)
                }
                (_, wire) => scanner.skip_value(wire)?,
            }
        }

        let version = version.ok_or(MapError::Format("missing version header"))?;
        if version != SUPPORTED_VERSION {
            return Err(MapError::Version(version));
        }
        if confirmation != Some(version) {
            return Err(MapError::Format("version confirmation mismatch"));
        }

        log::info!(
            "opened {}: version {}, {} region(s)",
            path.display(),
            version,
            regions.len()
        );
        Ok(Self {
            path,
            version,
            timestamp,
            regions,
            block_loads: AtomicUsize::new(0),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn regions(&self) -> &[RouteRegion] {
        &self.regions
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Number of subregion content blocks loaded so far; a disjoint
    /// query must leave this untouched.
    pub fn block_loads(&self) -> usize {
        self.block_loads.load(Ordering::Relaxed)
    }

    pub(crate) fn note_block_load(&self) {
        self.block_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns all indexed roads whose bounding box intersects `bbox`,
    /// reading one tier only, deduplicated by road id. Subregions
    /// disjoint from `bbox` are pruned without being loaded.
    pub fn query(&self, bbox: &BBox31, base_tier: bool) -> Result<Vec<Arc<RoadObject>>, MapError> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        self.for_each_block(bbox, base_tier, &mut |_, _, roads| {
            for road in roads {
                if road.bbox().intersects(bbox) && seen.insert(road.id) {
                    out.push(road.clone());
                }
            }
        })?;
        Ok(out)
    }

    /// Visits every loaded-or-loadable object block intersecting
    /// `bbox`: `visitor(region index, subregion, roads)`.
    pub(crate) fn for_each_block(
        &self,
        bbox: &BBox31,
        base_tier: bool,
        visitor: &mut dyn FnMut(u32, &RouteSubregion, &[Arc<RoadObject>]),
    ) -> Result<(), MapError> {
        for (index, region) in self.regions.iter().enumerate() {
            let roots = if base_tier {
                &region.base_subregions
            } else {
                &region.subregions
            };
            for root in roots {
                root.visit(self, region, index as u32, bbox, &mut |subregion, roads| {
                    visitor(index as u32, subregion, roads)
                })?;
            }
        }
        Ok(())
    }
}

fn read_region<R: std::io::Read + std::io::Seek>(
    scanner: &mut FileScanner<R>,
    end: u64,
) -> Result<RouteRegion, MapError> {
    let mut region = RouteRegion {
        name: String::new(),
        rules: Vec::new(),
        subregions: Vec::new(),
        base_subregions: Vec::new(),
    };

    while let Some(tag) = scanner.read_tag_within(end)? {
        match (field_number(tag), wire_type(tag)) {
            (FIELD_REGION_NAME, WIRE_BYTES) => {
                let length = scanner.read_varint()?;
                let buf = scanner.read_exact(length)?;
                region.name = String::from_utf8(buf)
                    .map_err(|_| MapError::Format("region name is not valid UTF-8"))?;
            }
            (FIELD_REGION_RULE, WIRE_BYTES) => {
                let length = scanner.read_varint()?;
                let buf = scanner.read_exact(length)?;
                match read_encoding_rule(&buf)? {
                    Some(rule) => region.rules.push(rule),
                    // A single bad rule record poisons only itself:
                    // the id space still advances past it.
                    None => {
                        log::warn!("skipping malformed encoding rule in {:?}", region.name);
                        region.rules.push(EncodingRule {
                            tag: String::new(),
                            value: String::new(),
                        });
                    }
                }
            }
            (FIELD_REGION_ROOT, WIRE_BYTES) => {
                region
                    .subregions
                    .push(RouteSubregion::read_header(scanner, None)?);
            }
            (FIELD_REGION_BASE_ROOT, WIRE_BYTES) => {
                region
                    .base_subregions
                    .push(RouteSubregion::read_header(scanner, None)?);
            }
            (_, wire) => scanner.skip_value(wire)?,
        }
    }

    Ok(region)
}

fn read_encoding_rule(buf: &[u8]) -> Result<Option<EncodingRule>, MapError> {
    let mut tag: Option<String> = None;
    let mut value = String::new();

    let mut msg = MessageReader::from_bytes(buf);
    while let Some((field, wire)) = msg.next_tag()? {
        match (field, wire) {
            (1, WIRE_BYTES) => tag = Some(msg.read_string()?),
            (2, WIRE_BYTES) => value = msg.read_string()?,
            (_, wire) => msg.skip_value(wire)?,
        }
    }

    Ok(tag.map(|tag| EncodingRule { tag, value }))
}
