// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! The per-query routing cache.
//!
//! A [RoutingContext] serves exactly one route query: it pages road
//! graph fragments in tile by tile, memoizes them in a road arena,
//! and evicts the least-used tiles' segment tables under a configured
//! memory ceiling. Segments handed out to the search are value
//! cursors into the arena, which eviction never touches, so they stay
//! valid across sweeps.

use std::collections::HashMap;
use std::sync::Arc;

use crate::geo::{self, Point31};
use crate::map::{BBox31, MapError, MapFile, RoadObject};
use crate::rules::{Params, RegionRules, VehicleProfile};

/// Index of a road in a context's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoadId(pub(crate) u32);

/// A traversal cursor: one vertex of one road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSegment {
    pub road: RoadId,
    pub vertex: u32,
}

/// The projection of a query coordinate onto the nearest road.
#[derive(Debug, Clone, Copy)]
pub struct RoadSegmentPoint {
    pub road: RoadId,
    /// Index `i` such that the projection lies between vertices `i`
    /// and `i + 1`.
    pub segment: u32,
    pub projected: Point31,
    pub distance: f64,
}

/// Per-query configuration, typically derived from a profile's
/// attribute map and overridden by the caller.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// A* admissibility slack; 1.0 keeps the heuristic exact.
    pub heuristic_coefficient: f32,
    /// Tile granularity of the cache.
    pub zoom_to_load_tiles: u32,
    /// Eviction ceiling, in bytes.
    pub memory_limit: usize,
    /// 0 = bidirectional search, > 0 forward only, < 0 reverse only.
    pub plan_road_direction: i32,
    /// Which side of the road traffic drives on.
    pub left_hand_driving: bool,
    /// Read the coarse map tier instead of the full-detail one.
    pub base_tier: bool,
    /// Rule parameter overrides (`$name` references).
    pub parameters: HashMap<String, f32>,
}

impl RoutingConfig {
    /// Builds a configuration from a profile's attribute map.
    pub fn from_profile(profile: &VehicleProfile) -> Self {
        Self {
            heuristic_coefficient: profile.float_attribute("heuristicCoefficient", 1.0).max(1.0),
            zoom_to_load_tiles: profile.float_attribute("zoomToLoadTiles", 16.0) as u32,
            memory_limit: profile.float_attribute("nativeMemoryLimitInMB", 64.0) as usize
                * 1024
                * 1024,
            plan_road_direction: profile.float_attribute("planRoadDirection", 0.0) as i32,
            left_hand_driving: profile.float_attribute("leftHandDriving", 0.0) != 0.0,
            base_tier: false,
            parameters: HashMap::new(),
        }
    }
}

/// A road admitted into the arena, with its per-query evaluated
/// attributes memoized.
#[derive(Debug)]
pub(crate) struct ArenaRoad {
    pub(crate) road: Arc<RoadObject>,
    pub(crate) speed: f32,
    pub(crate) priority: f32,
    pub(crate) oneway: i32,
    pub(crate) roundabout: bool,
    pub(crate) region: u32,
}

/// Cache identity of one materialized subregion: its box-left and
/// file offset. Two query tiles covered by the same subregion share
/// the entry.
type TileKey = (i32, u64);

#[derive(Debug, Default)]
struct Tile {
    /// 62-bit point key → segments anchored at that vertex.
    points: HashMap<u64, Vec<RouteSegment>>,
    roads: Vec<RoadId>,
    access_count: u32,
    size_bytes: usize,
    loaded: bool,
}

impl Tile {
    fn estimate_size(&self) -> usize {
        let segments: usize = self.points.values().map(|v| v.len()).sum();
        64 + self.points.len() * 48 + segments * 16
    }
}

#[derive(Debug, Default)]
pub struct ContextStats {
    pub loaded_blocks: usize,
    pub eviction_sweeps: usize,
    pub evicted_tiles: usize,
}

/// The mutable state of one route query.
pub struct RoutingContext<'a> {
    map: &'a MapFile,
    profile: &'a VehicleProfile,
    pub config: RoutingConfig,
    params: Params,
    bindings: Vec<RegionRules>,
    roads: Vec<ArenaRoad>,
    road_index: HashMap<u64, Option<RoadId>>,
    /// Packed tile id → subregions covering it, resolved once.
    tile_index: HashMap<u64, Vec<TileKey>>,
    tiles: HashMap<TileKey, Tile>,
    pub stats: ContextStats,
}

impl<'a> RoutingContext<'a> {
    pub fn new(map: &'a MapFile, profile: &'a VehicleProfile, config: RoutingConfig) -> Self {
        let bindings = map
            .regions()
            .iter()
            .map(|region| profile.bind_region(region))
            .collect();
        let params = profile.build_params(&config.parameters);
        Self {
            map,
            profile,
            config,
            params,
            bindings,
            roads: Vec::new(),
            road_index: HashMap::new(),
            tile_index: HashMap::new(),
            tiles: HashMap::new(),
            stats: ContextStats::default(),
        }
    }

    pub fn profile(&self) -> &VehicleProfile {
        self.profile
    }

    pub fn road(&self, id: RoadId) -> &RoadObject {
        &self.roads[id.0 as usize].road
    }

    pub(crate) fn arena(&self, id: RoadId) -> &ArenaRoad {
        &self.roads[id.0 as usize]
    }

    /// The speed used for route costs: the evaluated speed scaled by
    /// the road's priority, clamped into the profile's speed band.
    pub(crate) fn routing_speed(&self, id: RoadId) -> f32 {
        let arena = &self.roads[id.0 as usize];
        (arena.speed * arena.priority).clamp(self.profile.min_speed(), self.profile.max_speed())
    }

    /// The plain travel speed of a road, in m/s.
    pub(crate) fn travel_speed(&self, id: RoadId) -> f32 {
        self.roads[id.0 as usize].speed
    }

    /// Number of distinct roads admitted so far.
    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    /// Number of tiles currently holding a segment table.
    pub fn loaded_tile_count(&self) -> usize {
        self.tiles.values().filter(|t| t.loaded).count()
    }

    fn tile_shift(&self) -> u32 {
        31 - self.config.zoom_to_load_tiles.clamp(8, 31)
    }

    fn tile_id(&self, point: Point31) -> u64 {
        let shift = self.tile_shift();
        (((point.x >> shift) as u64) << 32) | ((point.y >> shift) as u64 & 0xffff_ffff)
    }

    fn tile_bbox(&self, tile_id: u64) -> BBox31 {
        let shift = self.tile_shift();
        let tx = (tile_id >> 32) as i64;
        let ty = (tile_id & 0xffff_ffff) as i64;
        // Widened arithmetic: the far edge of the last tile column
        // touches 2^31.
        BBox31::new(
            (tx << shift) as i32,
            (((tx + 1) << shift) - 1) as i32,
            (ty << shift) as i32,
            (((ty + 1) << shift) - 1) as i32,
        )
    }

    /// Admits a road into the arena, or rejects it when the profile
    /// denies access. Roads reappearing in multiple subregions are
    /// deduplicated by id.
    fn ensure_road(&mut self, region: u32, road: &Arc<RoadObject>) -> Option<RoadId> {
        if let Some(&cached) = self.road_index.get(&road.id) {
            return cached;
        }

        let binding = &self.bindings[region as usize];
        let tags = self.profile.resolve_road(binding, road);
        let admitted = if self.profile.allowed(binding, &tags, &self.params) {
            let id = RoadId(self.roads.len() as u32);
            self.roads.push(ArenaRoad {
                road: road.clone(),
                speed: self.profile.speed(binding, &tags, &self.params),
                priority: self.profile.priority(binding, &tags, &self.params),
                oneway: self.profile.oneway(binding, &tags, &self.params),
                roundabout: self.profile.is_roundabout(binding, &tags),
                region,
            });
            Some(id)
        } else {
            None
        };
        self.road_index.insert(road.id, admitted);
        admitted
    }

    /// Returns the sibling segments anchored at the given vertex
    /// coordinate, paging in the covering tiles as needed.
    pub fn load_route_segment(&mut self, point: Point31) -> Result<Vec<RouteSegment>, MapError> {
        let tile_id = self.tile_id(point);
        self.ensure_tile(tile_id)?;

        let key = point.key();
        let mut segments = Vec::new();
        let tile_keys = self.tile_index.get(&tile_id).cloned().unwrap_or_default();
        for tile_key in tile_keys {
            if let Some(tile) = self.tiles.get_mut(&tile_key) {
                tile.access_count += 1;
                if let Some(found) = tile.points.get(&key) {
                    segments.extend_from_slice(found);
                }
            }
        }
        Ok(segments)
    }

    /// Resolves and materializes all subregions covering a tile.
    fn ensure_tile(&mut self, tile_id: u64) -> Result<(), MapError> {
        if !self.tile_index.contains_key(&tile_id) {
            let bbox = self.tile_bbox(tile_id);
            let mut found: Vec<(TileKey, u32, Vec<Arc<RoadObject>>)> = Vec::new();
            self.map
                .for_each_block(&bbox, self.config.base_tier, &mut |region, subregion, roads| {
                    let key = (subregion.bbox.left, subregion.file_offset);
                    found.push((key, region, roads.to_vec()));
                })?;
            self.stats.loaded_blocks += found.len();

            let keys: Vec<TileKey> = found.iter().map(|(key, _, _)| *key).collect();
            self.tile_index.insert(tile_id, keys);

            // New subregions are about to take memory: sweep first.
            self.evict_if_needed();

            for (key, region, roads) in found {
                if self.tiles.contains_key(&key) {
                    continue;
                }
                let road_ids: Vec<RoadId> = roads
                    .iter()
                    .filter_map(|road| self.ensure_road(region, road))
                    .collect();
                let mut tile = Tile {
                    roads: road_ids,
                    ..Tile::default()
                };
                self.fill_tile_points(&mut tile);
                self.tiles.insert(key, tile);
            }
        }

        // Re-materialize any covering tile a past sweep unloaded.
        let keys = self.tile_index.get(&tile_id).cloned().unwrap_or_default();
        for key in keys {
            let needs_fill = self.tiles.get(&key).is_some_and(|t| !t.loaded);
            if needs_fill {
                self.evict_if_needed();
                if let Some(mut tile) = self.tiles.remove(&key) {
                    self.fill_tile_points(&mut tile);
                    self.tiles.insert(key, tile);
                }
            }
        }
        Ok(())
    }

    fn fill_tile_points(&self, tile: &mut Tile) {
        tile.points.clear();
        for &road_id in &tile.roads {
            let road = &self.roads[road_id.0 as usize].road;
            for (vertex, point) in road.points.iter().enumerate() {
                tile.points.entry(point.key()).or_default().push(RouteSegment {
                    road: road_id,
                    vertex: vertex as u32,
                });
            }
        }
        tile.loaded = true;
        tile.size_bytes = tile.estimate_size();
    }

    /// Unloads least-used tiles once the byte estimate passes 90% of
    /// the ceiling, down to 70%, then decays the survivors' access
    /// counters so recency dominates over time. Only segment tables
    /// are dropped; the arena, and with it every segment already
    /// handed out, is untouched.
    fn evict_if_needed(&mut self) {
        let limit = self.config.memory_limit;
        let mut total: usize = self.tiles.values().map(|t| t.size_bytes).sum();
        if limit == 0 || (total as f64) < limit as f64 * 0.9 {
            return;
        }

        let mut order: Vec<(u32, usize, TileKey)> = self
            .tiles
            .iter()
            .filter(|(_, t)| t.loaded)
            .map(|(&key, t)| (t.access_count, t.size_bytes, key))
            .collect();
        order.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let target = (limit as f64 * 0.7) as usize;
        let mut evicted = 0usize;
        for (_, _, key) in order {
            if total <= target {
                break;
            }
            if let Some(tile) = self.tiles.get_mut(&key) {
                total -= tile.size_bytes;
                tile.points = HashMap::new();
                tile.size_bytes = 0;
                tile.loaded = false;
                evicted += 1;
            }
        }
        for tile in self.tiles.values_mut() {
            tile.access_count /= 3;
        }

        self.stats.eviction_sweeps += 1;
        self.stats.evicted_tiles += evicted;
        log::debug!(
            "eviction sweep: unloaded {} tile(s), {} bytes remain",
            evicted,
            total
        );
    }

    /// Finds the road closest to `point`, widening the search window
    /// until something routable is hit.
    pub fn find_nearest_road(
        &mut self,
        point: Point31,
    ) -> Result<Option<RoadSegmentPoint>, MapError> {
        let mut radius: i32 = 8_192;
        for _ in 0..4 {
            let bbox = BBox31::new(
                point.x.saturating_sub(radius),
                point.x.saturating_add(radius),
                point.y.saturating_sub(radius),
                point.y.saturating_add(radius),
            );
            let mut candidates: Vec<(u32, Arc<RoadObject>)> = Vec::new();
            self.map
                .for_each_block(&bbox, self.config.base_tier, &mut |region, _, roads| {
                    for road in roads {
                        if road.bbox().intersects(&bbox) {
                            candidates.push((region, road.clone()));
                        }
                    }
                })?;

            let mut best: Option<RoadSegmentPoint> = None;
            for (region, road) in candidates {
                let Some(road_id) = self.ensure_road(region, &road) else {
                    continue;
                };
                let points = &self.roads[road_id.0 as usize].road.points;
                for i in 0..points.len().saturating_sub(1) {
                    let (projected, distance) =
                        geo::project_on_segment(point, points[i], points[i + 1]);
                    if best.as_ref().is_none_or(|b| distance < b.distance) {
                        best = Some(RoadSegmentPoint {
                            road: road_id,
                            segment: i as u32,
                            projected,
                            distance,
                        });
                    }
                }
            }

            if best.is_some() {
                return Ok(best);
            }
            radius = radius.saturating_mul(4);
        }
        Ok(None)
    }

    /// Routing weight of the point obstacle at a vertex, if any;
    /// negative means the vertex cannot be passed.
    pub(crate) fn point_obstacle(&self, segment: RouteSegment) -> Option<f32> {
        let arena = &self.roads[segment.road.0 as usize];
        let codes = arena.road.point_types(segment.vertex);
        if codes.is_empty() {
            return None;
        }
        let binding = &self.bindings[arena.region as usize];
        let tags = self.profile.resolve(binding, codes);
        self.profile.obstacle(binding, &tags, &self.params)
    }

    /// Real crossing time of the point obstacle at a vertex.
    pub(crate) fn point_obstacle_time(&self, segment: RouteSegment) -> Option<f32> {
        let arena = &self.roads[segment.road.0 as usize];
        let codes = arena.road.point_types(segment.vertex);
        if codes.is_empty() {
            return None;
        }
        let binding = &self.bindings[arena.region as usize];
        let tags = self.profile.resolve(binding, codes);
        self.profile.obstacle_time(binding, &tags, &self.params)
    }

    /// Whether the vertex carries a traffic signal point type.
    pub(crate) fn is_signal(&self, segment: RouteSegment) -> bool {
        let arena = &self.roads[segment.road.0 as usize];
        let codes = arena.road.point_types(segment.vertex);
        if codes.is_empty() {
            return false;
        }
        let binding = &self.bindings[arena.region as usize];
        let tags = self.profile.resolve(binding, codes);
        self.profile.is_traffic_signal(binding, &tags)
    }

    /// The tag value of a road, resolved through its region's table.
    pub(crate) fn road_tag_value<'s>(&'s self, id: RoadId, tag: &str) -> Option<&'s str> {
        let arena = &self.roads[id.0 as usize];
        let region = self.map.regions().get(arena.region as usize)?;
        arena.road.types.iter().find_map(|&code| {
            let rule = region.rule(code)?;
            if rule.tag == tag {
                Some(rule.value.as_str())
            } else {
                None
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn tile_access_counts(&self) -> Vec<u32> {
        self.tiles.values().map(|t| t.access_count).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::writer::{TestBox, TestMap, TestRoad};
    use crate::map::RestrictionKind;
    use crate::rules::RuleSet;

    // Fixtures use a 16-unit grid: the format drops the low 4 bits.
    fn p(x: i32, y: i32) -> Point31 {
        Point31::new(x * 16, y * 16)
    }

    const RULES: &[(&str, &str)] = &[
        ("highway", "residential"),     // 1
        ("highway", "traffic_signals"), // 2
        ("access", "no"),               // 3
        ("oneway", "yes"),              // 4
        ("name", ""),                   // 5
    ];

    fn crossing_map() -> TestMap {
        // Two roads crossing at (100, 100) on the grid.
        let leaf = TestBox::leaf(
            BBox31::new(0, 400 * 16, 0, 400 * 16),
            vec![
                TestRoad::new(1, vec![p(50, 100), p(100, 100), p(150, 100)]).types(&[1]),
                TestRoad::new(2, vec![p(100, 50), p(100, 100), p(100, 150)]).types(&[1]),
                TestRoad::new(3, vec![p(50, 300), p(150, 300)]).types(&[1, 3]),
            ],
        );
        TestMap::single_region(RULES, vec![leaf])
    }

    fn context_config() -> RoutingConfig {
        RoutingConfig {
            heuristic_coefficient: 1.0,
            zoom_to_load_tiles: 16,
            memory_limit: 64 * 1024 * 1024,
            plan_road_direction: 0,
            left_hand_driving: false,
            base_tier: false,
            parameters: HashMap::new(),
        }
    }

    #[test]
    fn sibling_segments_at_a_junction() {
        let file = crossing_map().write_to_temp();
        let map = MapFile::open(file.path()).unwrap();
        let profile = RuleSet::default_rules().profile("car").unwrap();
        let mut ctx = RoutingContext::new(&map, profile, context_config());

        let segments = ctx.load_route_segment(p(100, 100)).unwrap();
        assert_eq!(segments.len(), 2);

        let roads: Vec<u64> = segments.iter().map(|s| ctx.road(s.road).id).collect();
        assert!(roads.contains(&1));
        assert!(roads.contains(&2));
        // Both cursors anchor at the shared physical vertex.
        for s in &segments {
            assert_eq!(ctx.road(s.road).points[s.vertex as usize], p(100, 100));
        }

        // A plain mid-road vertex has exactly one sibling.
        let single = ctx.load_route_segment(p(50, 100)).unwrap();
        assert_eq!(single.len(), 1);

        // Nothing is anchored between vertices.
        assert!(ctx.load_route_segment(p(75, 100)).unwrap().is_empty());
    }

    #[test]
    fn access_denied_roads_are_not_registered() {
        let file = crossing_map().write_to_temp();
        let map = MapFile::open(file.path()).unwrap();
        let profile = RuleSet::default_rules().profile("car").unwrap();
        let mut ctx = RoutingContext::new(&map, profile, context_config());

        // Road 3 carries access=no.
        assert!(ctx.load_route_segment(p(50, 300)).unwrap().is_empty());
        assert_eq!(ctx.road_count(), 2);
    }

    #[test]
    fn roads_are_deduplicated_across_subregions() {
        // The same road id in two leaves, as tiled maps produce near
        // box edges.
        let shared = TestRoad::new(7, vec![p(10, 10), p(20, 10)]).types(&[1]);
        let map_spec = TestMap::single_region(
            RULES,
            vec![
                TestBox::leaf(BBox31::new(0, 320, 0, 320), vec![shared.clone()]),
                TestBox::leaf(BBox31::new(0, 640, 0, 640), vec![shared]),
            ],
        );
        let file = map_spec.write_to_temp();
        let map = MapFile::open(file.path()).unwrap();
        let profile = RuleSet::default_rules().profile("car").unwrap();
        let mut ctx = RoutingContext::new(&map, profile, context_config());

        let segments = ctx.load_route_segment(p(10, 10)).unwrap();
        assert_eq!(ctx.road_count(), 1);
        // Two tiles register the same arena road at the same vertex.
        assert!(segments.iter().all(|s| ctx.road(s.road).id == 7));
    }

    #[test]
    fn eviction_unloads_least_used_and_keeps_segments_valid() {
        // Two junctions in tiles far apart.
        let west = TestBox::leaf(
            BBox31::new(0, 65_536, 0, 65_536),
            vec![TestRoad::new(
                1,
                vec![p(25, 100), p(50, 100), p(75, 100), p(100, 100), p(125, 100)],
            )
            .types(&[1])],
        );
        let east = TestBox::leaf(
            BBox31::new(1_000_000, 1_065_536, 0, 65_536),
            vec![TestRoad::new(2, vec![
                Point31::new(1_000_160, 1_600),
                Point31::new(1_000_320, 1_600),
            ])
            .types(&[1])],
        );
        let file = TestMap::single_region(RULES, vec![west, east]).write_to_temp();
        let map = MapFile::open(file.path()).unwrap();
        let profile = RuleSet::default_rules().profile("car").unwrap();

        let mut config = context_config();
        config.memory_limit = 300; // bytes: any tile crosses the line
        let mut ctx = RoutingContext::new(&map, profile, config);

        let west_segments = ctx.load_route_segment(p(100, 100)).unwrap();
        assert_eq!(west_segments.len(), 1);
        let west_road = west_segments[0].road;

        // Loading the east tile forces a sweep of the west one.
        let east_segments = ctx
            .load_route_segment(Point31::new(1_000_160, 1_600))
            .unwrap();
        assert_eq!(east_segments.len(), 1);
        assert!(ctx.stats.eviction_sweeps >= 1);
        assert!(ctx.stats.evicted_tiles >= 1);
        assert_eq!(ctx.loaded_tile_count(), 1);

        // Segments handed out before the sweep stay dereferenceable
        // and unchanged.
        assert_eq!(ctx.road(west_road).id, 1);
        assert_eq!(ctx.road(west_road).points[3], p(100, 100));

        // The unloaded tile reloads on demand, without new disk reads.
        let loads_before = map.block_loads();
        let again = ctx.load_route_segment(p(100, 100)).unwrap();
        assert_eq!(again, west_segments);
        assert_eq!(map.block_loads(), loads_before);
    }

    #[test]
    fn eviction_decays_access_counters() {
        let file = crossing_map().write_to_temp();
        let map = MapFile::open(file.path()).unwrap();
        let profile = RuleSet::default_rules().profile("car").unwrap();
        let mut config = context_config();
        config.memory_limit = usize::MAX; // never sweep on its own
        let mut ctx = RoutingContext::new(&map, profile, config);

        for _ in 0..9 {
            ctx.load_route_segment(p(100, 100)).unwrap();
        }
        assert_eq!(ctx.tile_access_counts(), vec![9]);

        ctx.config.memory_limit = 1; // force the next check to sweep
        ctx.evict_if_needed();
        assert_eq!(ctx.tile_access_counts(), vec![3]);
    }

    #[test]
    fn nearest_road_projects_onto_the_closest_segment() {
        let file = crossing_map().write_to_temp();
        let map = MapFile::open(file.path()).unwrap();
        let profile = RuleSet::default_rules().profile("car").unwrap();
        let mut ctx = RoutingContext::new(&map, profile, context_config());

        // Slightly north of road 1 between its first two vertices.
        let hit = ctx
            .find_nearest_road(Point31::new(70 * 16, 97 * 16))
            .unwrap()
            .expect("a road must be found");
        assert_eq!(ctx.road(hit.road).id, 1);
        assert_eq!(hit.segment, 0);
        assert_eq!(hit.projected.y, 100 * 16);

        // Far away from everything.
        let miss = ctx
            .find_nearest_road(Point31::new(500_000_000, 500_000_000))
            .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn restrictions_survive_the_arena_round_trip() {
        let leaf = TestBox::leaf(
            BBox31::new(0, 6400, 0, 6400),
            vec![
                TestRoad::new(1, vec![p(10, 10), p(20, 10)])
                    .types(&[1])
                    .restrict(RestrictionKind::OnlyStraightOn, 2),
                TestRoad::new(2, vec![p(20, 10), p(30, 10)]).types(&[1]),
            ],
        );
        let file = TestMap::single_region(RULES, vec![leaf]).write_to_temp();
        let map = MapFile::open(file.path()).unwrap();
        let profile = RuleSet::default_rules().profile("car").unwrap();
        let mut ctx = RoutingContext::new(&map, profile, context_config());

        let segments = ctx.load_route_segment(p(20, 10)).unwrap();
        let from = segments
            .iter()
            .find(|s| ctx.road(s.road).id == 1)
            .expect("road 1 at the junction");
        assert_eq!(
            ctx.road(from.road).restriction_to(2),
            Some(RestrictionKind::OnlyStraightOn)
        );
        assert!(ctx.road(from.road).has_exclusive_restriction());
    }
}
