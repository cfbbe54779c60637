// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use crate::context::{RoadSegmentPoint, RouteSegment, RoutingContext};
use crate::geo::{self, Point31};
use crate::map::RoadObject;
use crate::planner::RouteError;
use crate::progress::RouteObserver;

pub(crate) const NO_PARENT: u32 = u32::MAX;

/// One node of the search tree.
///
/// Nodes live in a per-query arena; `parent` is an index into it, so
/// the parent chain is exclusively owned by this search run and can
/// never alias another query's state. `entry_bearing` is NaN for
/// nodes continuing along their own road, the bearing of the arriving
/// movement for road-change nodes (its first step pays the turn
/// cost), or infinite for a road change straight off a seed vertex
/// (a road change, but with nothing to turn from).
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchNode {
    pub(crate) segment: RouteSegment,
    pub(crate) parent: u32,
    pub(crate) g: f32,
    pub(crate) entry_bearing: f32,
}

/// The record of a successful meeting of the two frontiers.
#[derive(Debug)]
pub(crate) struct SearchResult {
    pub(crate) nodes: Vec<SearchNode>,
    pub(crate) forward_node: u32,
    pub(crate) reverse_node: u32,
    pub(crate) cost: f32,
    pub(crate) start: RoadSegmentPoint,
    pub(crate) end: RoadSegmentPoint,
}

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    node: u32,
    f: f32,
    g: f32,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.f.eq(&other.f) && self.g.eq(&other.g)
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        // NOTE: We revert the order of comparison, as lower f-scores
        // are considered better ("higher"), and Rust's BinaryHeap is
        // a max-heap. Ties break toward the larger g: the frontier
        // prefers deeper-explored paths.
        match other.f.partial_cmp(&self.f) {
            Some(std::cmp::Ordering::Equal) => self.g.partial_cmp(&other.g),
            ordering => ordering,
        }
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// One side of the bidirectional search. The visited set and
/// best-known costs are keyed by the physical (road id, vertex) pair.
struct Frontier {
    queue: BinaryHeap<QueueItem>,
    visited: HashMap<(u64, u32), u32>,
    best_g: HashMap<(u64, u32), f32>,
    /// Heuristic target: the opposite endpoint's projection.
    target: Point31,
    last_g: f32,
}

impl Frontier {
    fn new(target: Point31) -> Self {
        Self {
            queue: BinaryHeap::new(),
            visited: HashMap::new(),
            best_g: HashMap::new(),
            target,
            last_g: 0.0,
        }
    }

    /// Whether a candidate at `key` with cost `g` is worth pushing:
    /// unvisited and strictly cheaper than anything known.
    fn improves(&self, key: &(u64, u32), g: f32) -> bool {
        if self.visited.contains_key(key) {
            return false;
        }
        match self.best_g.get(key) {
            Some(&best) => g < best,
            None => true,
        }
    }

    fn push(
        &mut self,
        nodes: &mut Vec<SearchNode>,
        node: SearchNode,
        key: (u64, u32),
        h: f32,
    ) -> u32 {
        let index = push_raw(nodes, node);
        self.best_g.insert(key, node.g);
        self.queue.push(QueueItem {
            node: index,
            f: node.g + h,
            g: node.g,
        });
        index
    }
}

fn push_raw(nodes: &mut Vec<SearchNode>, node: SearchNode) -> u32 {
    let index = nodes.len() as u32;
    nodes.push(node);
    index
}

fn heuristic(point: Point31, target: Point31, max_speed: f32, coefficient: f32) -> f32 {
    (geo::distance31(point, target) / max_speed as f64) as f32 * coefficient
}

/// Both frontiers pay a point obstacle on arrival at the meeting
/// vertex; the total must charge it once.
fn meeting_adjustment(ctx: &RoutingContext<'_>, segment: RouteSegment) -> f32 {
    ctx.point_obstacle(segment).unwrap_or(0.0).max(0.0)
}

/// A meeting where both nodes are road-change hops would stitch a
/// zero-extent presence on the shared road into the path, laundering
/// the junction's restrictions. At least one side must have actually
/// moved on (or started on) the meeting road.
fn meeting_valid(this: &SearchNode, other: &SearchNode) -> bool {
    this.entry_bearing.is_nan() || other.entry_bearing.is_nan()
}

/// Whether a step along the vertex array is permitted by the road's
/// one-way evaluation. The reverse frontier walks against the travel
/// direction, so its permitted step inverts.
fn direction_allowed(oneway: i32, side: usize, step: i32) -> bool {
    let travel = if side == 1 { -step } else { step };
    match oneway {
        1 => travel > 0,
        -1 => travel < 0,
        _ => true,
    }
}

/// Turn-restriction filtering for the transition `from` → `to` at a
/// shared junction, where `from` is the expanding frontier's current
/// road and `to` the candidate.
///
/// Records always bind the travel-wise source road: on the reverse
/// frontier that is the candidate, so the lookup swaps sides. The
/// source's prohibitory record drops the target; when the source
/// carries any exclusive ("only") record, only its targets survive.
/// What has no backward reading is the current road's own record set:
/// a many-to-one merge onto it is never constrained by rules about
/// leaving it.
pub(crate) fn restriction_allows(from: &RoadObject, to: &RoadObject, reverse: bool) -> bool {
    let (source, target) = if reverse { (to, from) } else { (from, to) };
    match source.restriction_to(target.id) {
        Some(kind) => kind.is_exclusive(),
        None => !source.has_exclusive_restriction(),
    }
}

/// Seeds one frontier with the two bracket vertices of the projected
/// segment, each carrying its fractional lead-in cost. One-way roads
/// seed only the vertex the travel direction can actually reach, and
/// an impassable point obstacle suppresses its vertex: a seed must
/// never leap over a constraint the expansion would enforce.
#[allow(clippy::too_many_arguments)]
fn seed(
    ctx: &RoutingContext<'_>,
    frontier: &mut Frontier,
    nodes: &mut Vec<SearchNode>,
    point: &RoadSegmentPoint,
    side: usize,
    coefficient: f32,
    max_speed: f32,
    active: bool,
) {
    let arena = ctx.arena(point.road);
    let road = arena.road.clone();
    let oneway = arena.oneway;
    let speed = ctx.routing_speed(point.road);

    for (vertex, step) in [(point.segment, -1i32), (point.segment + 1, 1i32)] {
        if !direction_allowed(oneway, side, step) {
            continue;
        }
        let Some(&at) = road.points.get(vertex as usize) else {
            continue;
        };
        let segment = RouteSegment {
            road: point.road,
            vertex,
        };
        let mut g = (geo::distance31(point.projected, at) / speed as f64) as f32;
        match ctx.point_obstacle(segment) {
            Some(obstacle) if obstacle < 0.0 => continue,
            Some(obstacle) => g += obstacle,
            None => {}
        }

        let node = SearchNode {
            segment,
            parent: NO_PARENT,
            g,
            entry_bearing: f32::NAN,
        };
        let key = (road.id, vertex);
        if !frontier.improves(&key, g) {
            continue;
        }
        if active {
            let h = heuristic(at, frontier.target, max_speed, coefficient);
            frontier.push(nodes, node, key, h);
        } else {
            // A frozen frontier only serves as a meeting target.
            let index = push_raw(nodes, node);
            frontier.best_g.insert(key, g);
            frontier.visited.insert(key, index);
        }
    }
}

/// Selects the frontier to expand: strict alternation, falling back
/// to the non-empty side once one queue drains. A forced plan
/// direction pins the choice to one side.
fn pick_side(frontiers: &[Frontier; 2], last: usize, plan: i32) -> Option<usize> {
    if plan > 0 {
        return (!frontiers[0].queue.is_empty()).then_some(0);
    }
    if plan < 0 {
        return (!frontiers[1].queue.is_empty()).then_some(1);
    }
    let preferred = 1 - last;
    if !frontiers[preferred].queue.is_empty() {
        Some(preferred)
    } else if !frontiers[last].queue.is_empty() {
        Some(last)
    } else {
        None
    }
}

/// Runs the bidirectional A* search between two projected endpoints.
pub(crate) fn search<O: RouteObserver + ?Sized>(
    ctx: &mut RoutingContext<'_>,
    start: RoadSegmentPoint,
    end: RoadSegmentPoint,
    observer: &O,
) -> Result<SearchResult, RouteError> {
    let coefficient = ctx.config.heuristic_coefficient;
    let max_speed = ctx.profile().max_speed();
    let plan = ctx.config.plan_road_direction;

    let mut nodes: Vec<SearchNode> = Vec::new();
    let mut frontiers = [Frontier::new(end.projected), Frontier::new(start.projected)];
    seed(ctx, &mut frontiers[0], &mut nodes, &start, 0, coefficient, max_speed, plan >= 0);
    seed(ctx, &mut frontiers[1], &mut nodes, &end, 1, coefficient, max_speed, plan <= 0);

    let mut last_side = 1usize;
    let mut iterations = 0usize;

    loop {
        iterations += 1;
        if iterations % 100 == 1 {
            if observer.is_cancelled() {
                log::debug!("search cancelled after {} iterations", iterations);
                return Err(RouteError::Cancelled);
            }
            observer.update_status(
                frontiers[0].last_g,
                frontiers[0].queue.len(),
                frontiers[1].last_g,
                frontiers[1].queue.len(),
            );
        }

        let Some(side) = pick_side(&frontiers, last_side, plan) else {
            log::debug!(
                "both frontiers exhausted after {} iterations, {} nodes",
                iterations,
                nodes.len()
            );
            return Err(RouteError::NoRoute);
        };
        last_side = side;

        let Some(item) = frontiers[side].queue.pop() else {
            continue;
        };
        let node = nodes[item.node as usize];
        let key = (ctx.road(node.segment.road).id, node.segment.vertex);

        // Stale queue entry: a better path to this vertex was pushed
        // after this one.
        if frontiers[side].visited.contains_key(&key) {
            continue;
        }
        if frontiers[side].best_g.get(&key).is_some_and(|&g| item.g > g) {
            continue;
        }
        frontiers[side].visited.insert(key, item.node);
        frontiers[side].last_g = item.g;

        if let Some(&other) = frontiers[1 - side].visited.get(&key) {
            if meeting_valid(&node, &nodes[other as usize]) {
                let cost =
                    item.g + nodes[other as usize].g - meeting_adjustment(ctx, node.segment);
                return Ok(finish(nodes, side, item.node, other, cost, start, end, iterations));
            }
        }

        if let Some((this, other, cost)) = expand(
            ctx,
            &mut nodes,
            &mut frontiers,
            side,
            item.node,
            coefficient,
            max_speed,
        )? {
            return Ok(finish(nodes, side, this, other, cost, start, end, iterations));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn finish(
    nodes: Vec<SearchNode>,
    side: usize,
    this: u32,
    other: u32,
    cost: f32,
    start: RoadSegmentPoint,
    end: RoadSegmentPoint,
    iterations: usize,
) -> SearchResult {
    let (forward_node, reverse_node) = if side == 0 { (this, other) } else { (other, this) };
    log::debug!(
        "frontiers met after {} iterations, {} nodes, cost {:.1}s",
        iterations,
        nodes.len(),
        cost
    );
    SearchResult {
        nodes,
        forward_node,
        reverse_node,
        cost,
        start,
        end,
    }
}

/// Expands one node: moves a single step along its road in every
/// permitted direction, then turns onto the sibling segments anchored
/// at the node's own vertex, subject to restriction filtering.
///
/// Road-change nodes do not enumerate siblings again — their arrival
/// road already did, and re-enumerating would chain same-point road
/// changes past the first road's restrictions.
fn expand(
    ctx: &mut RoutingContext<'_>,
    nodes: &mut Vec<SearchNode>,
    frontiers: &mut [Frontier; 2],
    side: usize,
    node_index: u32,
    coefficient: f32,
    max_speed: f32,
) -> Result<Option<(u32, u32, f32)>, RouteError> {
    let node = nodes[node_index as usize];
    let arena = ctx.arena(node.segment.road);
    let road = arena.road.clone();
    let oneway = arena.oneway;
    let roundabout = arena.roundabout;
    let speed = ctx.routing_speed(node.segment.road);
    let entering_roundabout = roundabout
        && node.parent != NO_PARENT
        && !ctx.arena(nodes[node.parent as usize].segment.road).roundabout;

    let vertex = node.segment.vertex as i32;
    let at_point = road.points[vertex as usize];

    for step in [1i32, -1] {
        if !direction_allowed(oneway, side, step) {
            continue;
        }
        let w = vertex + step;
        if w < 0 || w as usize >= road.points.len() {
            continue;
        }
        let to_point = road.points[w as usize];
        let target = RouteSegment {
            road: node.segment.road,
            vertex: w as u32,
        };

        let mut cost = (geo::distance31(at_point, to_point) / speed as f64) as f32;
        match ctx.point_obstacle(target) {
            // A negative obstacle cannot be passed at all.
            Some(obstacle) if obstacle < 0.0 => continue,
            Some(obstacle) => cost += obstacle,
            None => {}
        }

        if node.entry_bearing.is_finite() {
            // First movement after a road change: account for the
            // turn. The reverse frontier sees the turn mirrored, so
            // the bearings swap.
            let bearing_out = geo::bearing31(at_point, to_point);
            let (b_in, b_out) = if side == 0 {
                (node.entry_bearing as f64, bearing_out)
            } else {
                (bearing_out, node.entry_bearing as f64)
            };
            let via_signal = ctx.is_signal(node.segment);
            cost += ctx
                .profile()
                .transition_cost(b_in, b_out, entering_roundabout, via_signal);
        }

        let g = node.g + cost;
        let key = (road.id, w as u32);
        if !frontiers[side].improves(&key, g) {
            continue;
        }

        let moved = SearchNode {
            segment: target,
            parent: node_index,
            g,
            entry_bearing: f32::NAN,
        };
        if let Some(&other) = frontiers[1 - side].visited.get(&key) {
            let index = push_raw(nodes, moved);
            let cost = g + nodes[other as usize].g - meeting_adjustment(ctx, target);
            return Ok(Some((index, other, cost)));
        }
        let h = heuristic(to_point, frontiers[side].target, max_speed, coefficient);
        frontiers[side].push(nodes, moved, key, h);
    }

    if node.entry_bearing.is_nan() {
        // The bearing the path entered this vertex with. Seeds have
        // no incoming movement: their road changes turn for free, and
        // the infinite sentinel keeps the turned-onto node from
        // enumerating siblings a second time.
        let entered = if node.parent != NO_PARENT {
            let parent = nodes[node.parent as usize];
            let from = road.points[parent.segment.vertex as usize];
            geo::bearing31(from, at_point) as f32
        } else {
            f32::INFINITY
        };

        // This is the cache-filling call.
        let siblings = ctx.load_route_segment(at_point)?;
        for candidate in siblings {
            if candidate.road == node.segment.road && candidate.vertex == node.segment.vertex {
                continue;
            }
            let candidate_phys = {
                let candidate_road = ctx.road(candidate.road);
                if !restriction_allows(&road, candidate_road, side == 1) {
                    continue;
                }
                candidate_road.id
            };
            let candidate_key = (candidate_phys, candidate.vertex);
            if !frontiers[side].improves(&candidate_key, node.g) {
                continue;
            }

            let turned = SearchNode {
                segment: candidate,
                parent: node_index,
                g: node.g,
                entry_bearing: entered,
            };
            if let Some(&other) = frontiers[1 - side].visited.get(&candidate_key) {
                if meeting_valid(&turned, &nodes[other as usize]) {
                    let index = push_raw(nodes, turned);
                    let cost =
                        node.g + nodes[other as usize].g - meeting_adjustment(ctx, candidate);
                    return Ok(Some((index, other, cost)));
                }
            }
            // The candidate shares this node's physical point.
            let h = heuristic(at_point, frontiers[side].target, max_speed, coefficient);
            frontiers[side].push(nodes, turned, candidate_key, h);
        }
    }

    Ok(None)
}
