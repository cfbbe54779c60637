// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Turning a raw search tree into an ordered maneuver list.
//!
//! The pass walks both parent chains outward from the meeting point,
//! merges them into per-road vertex ranges, splits ranges at
//! ambiguous forks, computes travel times, and derives turn and lane
//! guidance for every boundary.

mod turns;

pub use turns::{Lane, TurnInstruction, TurnKind};

use crate::context::{RoadId, RouteSegment, RoutingContext};
use crate::geo::{self, Point31};
use crate::map::MapError;
use crate::planner::{SearchResult, NO_PARENT};
use crate::rules::TURN_DEGREE;
use turns::{activate_lanes, classify_turn, infer_keep, parse_turn_lanes};

/// One element of a prepared route: a contiguous stretch of a single
/// road, with the maneuver that leads onto it.
#[derive(Debug, Clone)]
pub struct RouteStep {
    pub(crate) road: RoadId,
    /// The road's globally unique id in the map file.
    pub road_id: u64,
    pub name: Option<String>,
    pub start_vertex: u32,
    pub end_vertex: u32,
    /// Geometry in travel order; at least two points.
    pub points: Vec<Point31>,
    /// Meters.
    pub distance: f32,
    /// Seconds, from the rule-engine speed plus obstacle times.
    pub time: f32,
    /// The maneuver at the beginning of this step; `None` on the
    /// first step and on announcements collapsed away.
    pub turn: Option<TurnInstruction>,
}

/// A contiguous vertex range of one road; `start > end` means the
/// road is traversed against its vertex order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResultSegment {
    pub(crate) road: RoadId,
    pub(crate) start: u32,
    pub(crate) end: u32,
}

impl ResultSegment {
    fn direction(&self) -> i32 {
        if self.end >= self.start {
            1
        } else {
            -1
        }
    }

    fn vertices(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut v = self.start as i64;
        let step = self.direction() as i64;
        loop {
            out.push(v as u32);
            if v as u32 == self.end {
                break;
            }
            v += step;
        }
        out
    }
}

/// Runs the full preparation pipeline over a finished search.
pub(crate) fn prepare_route(
    ctx: &mut RoutingContext<'_>,
    result: &SearchResult,
) -> Result<Vec<RouteStep>, MapError> {
    let path = collect_path(result);
    let merged = merge_results(&path);
    let segments = split_ambiguous(ctx, merged)?;

    let mut steps: Vec<RouteStep> = segments.iter().map(|seg| build_step(ctx, seg)).collect();
    extend_endpoints(ctx, &mut steps, result);
    // A boundary range whose projection coincided with its vertex
    // never gained real geometry.
    steps.retain(|step| step.points.len() >= 2);
    assign_turns(ctx, &mut steps)?;
    turns::merge_lane_activation(&mut steps);
    turns::mark_skippable(&mut steps);
    turns::collapse_uturns(&mut steps);

    log::debug!("prepared route: {} step(s)", steps.len());
    Ok(steps)
}

/// Step (a), first half: both parent chains, reversed into a single
/// start → end cursor sequence.
fn collect_path(result: &SearchResult) -> Vec<RouteSegment> {
    let mut path = Vec::new();
    let mut at = result.forward_node;
    while at != NO_PARENT {
        path.push(result.nodes[at as usize].segment);
        at = result.nodes[at as usize].parent;
    }
    path.reverse();

    // The reverse chain already runs meeting → end; only the shared
    // meeting cursor needs dropping.
    let mut at = result.reverse_node;
    while at != NO_PARENT {
        let segment = result.nodes[at as usize].segment;
        if path.last() != Some(&segment) {
            path.push(segment);
        }
        at = result.nodes[at as usize].parent;
    }
    path
}

/// Step (a), second half: adjacent cursors on the same road collapse
/// into vertex ranges; zero-distance road-change hops vanish.
fn merge_results(path: &[RouteSegment]) -> Vec<ResultSegment> {
    let mut out: Vec<ResultSegment> = Vec::new();
    for &seg in path {
        let mut push_new: Option<ResultSegment> = None;
        match out.last_mut() {
            Some(last) if last.road == seg.road => {
                if seg.vertex == last.end {
                    // Duplicate cursor at the same vertex.
                } else if seg.vertex == last.end + 1 && last.start <= last.end {
                    last.end = seg.vertex;
                } else if last.end > 0 && seg.vertex == last.end - 1 && last.start >= last.end {
                    last.end = seg.vertex;
                } else {
                    // Direction reversal on the same road: a new
                    // range anchored at the shared vertex.
                    push_new = Some(ResultSegment {
                        road: seg.road,
                        start: last.end,
                        end: seg.vertex,
                    });
                }
            }
            _ => {
                push_new = Some(ResultSegment {
                    road: seg.road,
                    start: seg.vertex,
                    end: seg.vertex,
                });
            }
        }
        if let Some(seg) = push_new {
            out.push(seg);
        }
    }

    // Interior zero-length ranges are pure road-change hops. The
    // boundary ones stay: they carry the roads the query's projected
    // endpoints lie on, and the projections flesh them out later.
    let last = out.len().saturating_sub(1);
    let mut index = 0;
    out.retain(|seg| {
        let keep = seg.start != seg.end || index == 0 || index == last;
        index += 1;
        keep
    });
    out
}

/// Step (b): the outward bearings of every other road anchored at a
/// vertex, honoring their one-way direction. These are the "roads not
/// taken" that drive splitting and keep guidance.
fn attached_bearings(
    ctx: &mut RoutingContext<'_>,
    road: RoadId,
    vertex: u32,
    exclude: &[RoadId],
) -> Result<Vec<f64>, MapError> {
    let at = ctx.road(road).points[vertex as usize];
    let siblings = ctx.load_route_segment(at)?;

    let mut bearings = Vec::new();
    for sibling in siblings {
        if exclude.contains(&sibling.road) {
            continue;
        }
        let arena = ctx.arena(sibling.road);
        let points = &arena.road.points;
        for direction in [1i32, -1] {
            if arena.oneway != 0 && arena.oneway != direction {
                continue;
            }
            let next = sibling.vertex as i64 + direction as i64;
            if next < 0 || next as usize >= points.len() {
                continue;
            }
            bearings.push(geo::bearing31(
                points[sibling.vertex as usize],
                points[next as usize],
            ));
        }
    }
    Ok(bearings)
}

/// Step (c): a result is split wherever an attached road's bearing
/// runs close enough to the path's own continuation to be mistaken
/// for it, so every remaining boundary is one unambiguous maneuver
/// point.
fn split_ambiguous(
    ctx: &mut RoutingContext<'_>,
    results: Vec<ResultSegment>,
) -> Result<Vec<ResultSegment>, MapError> {
    let mut out = Vec::new();
    for seg in results {
        if seg.start == seg.end {
            out.push(seg);
            continue;
        }
        let step = seg.direction() as i64;
        let mut current_start = seg.start;
        let mut v = seg.start as i64 + step;
        while v != seg.end as i64 {
            let vertex = v as u32;
            let points = &ctx.road(seg.road).points;
            let continuation = geo::bearing31(
                points[vertex as usize],
                points[(v + step) as usize],
            );
            let attached = attached_bearings(ctx, seg.road, vertex, &[seg.road])?;
            let ambiguous = attached
                .iter()
                .any(|&b| geo::normalize_degrees(b - continuation).abs() < TURN_DEGREE);
            if ambiguous {
                out.push(ResultSegment {
                    road: seg.road,
                    start: current_start,
                    end: vertex,
                });
                current_start = vertex;
            }
            v += step;
        }
        out.push(ResultSegment {
            road: seg.road,
            start: current_start,
            end: seg.end,
        });
    }
    Ok(out)
}

/// Step (d): geometry, distance and travel time of one range. Time
/// uses the plain rule-engine speed (no routing priority) plus the
/// crossing time of every passed obstacle.
fn build_step(ctx: &RoutingContext<'_>, seg: &ResultSegment) -> RouteStep {
    let arena = ctx.arena(seg.road);
    let road = &arena.road;
    let vertices = seg.vertices();
    let points: Vec<Point31> = vertices
        .iter()
        .map(|&v| road.points[v as usize])
        .collect();

    let speed = ctx.travel_speed(seg.road) as f64;
    let mut distance = 0f64;
    let mut time = 0f64;
    for pair in points.windows(2) {
        let d = geo::distance31(pair[0], pair[1]);
        distance += d;
        time += d / speed;
    }
    for &vertex in &vertices[1..] {
        let segment = RouteSegment {
            road: seg.road,
            vertex,
        };
        if let Some(extra) = ctx.point_obstacle_time(segment) {
            if extra > 0.0 {
                time += extra as f64;
            }
        }
    }

    RouteStep {
        road: seg.road,
        road_id: road.id,
        name: road.name().map(str::to_string),
        start_vertex: seg.start,
        end_vertex: seg.end,
        points,
        distance: distance as f32,
        time: time as f32,
        turn: None,
    }
}

/// The search anchors its chains at whole vertices; the query's
/// actual endpoints are projections between them. Graft the projected
/// points onto the first and last steps so geometry, distance and
/// time cover the full path — including an obstacle at the first
/// range vertex, which is genuinely passed when the route starts
/// short of it.
fn extend_endpoints(
    ctx: &RoutingContext<'_>,
    steps: &mut [RouteStep],
    result: &SearchResult,
) {
    if let Some(first) = steps.first_mut() {
        let projected = result.start.projected;
        if first.points.first().copied() != Some(projected) {
            let lead_in = geo::distance31(projected, first.points[0]);
            first.distance += lead_in as f32;
            first.time += (lead_in / ctx.travel_speed(first.road) as f64) as f32;
            if let Some(extra) = ctx.point_obstacle_time(RouteSegment {
                road: first.road,
                vertex: first.start_vertex,
            }) {
                if extra > 0.0 {
                    first.time += extra;
                }
            }
            first.points.insert(0, projected);
        }
    }

    if let Some(last) = steps.last_mut() {
        let projected = result.end.projected;
        if last.points.last().copied() != Some(projected) {
            let lead_out = geo::distance31(*last.points.last().unwrap_or(&projected), projected);
            last.distance += lead_out as f32;
            last.time += (lead_out / ctx.travel_speed(last.road) as f64) as f32;
            last.points.push(projected);
        }
    }
}

/// Step (e): classify the maneuver at every boundary; below the turn
/// threshold, diverging alternatives and lane data decide between
/// plain straight-on and keep-left/right guidance.
fn assign_turns(
    ctx: &mut RoutingContext<'_>,
    steps: &mut [RouteStep],
) -> Result<(), MapError> {
    for i in 1..steps.len() {
        let (out_bearing, prev_road) = {
            let prev = &steps[i - 1];
            let n = prev.points.len();
            (geo::bearing31(prev.points[n - 2], prev.points[n - 1]), prev.road)
        };
        let (in_bearing, next_road, boundary_vertex) = {
            let next = &steps[i];
            (
                geo::bearing31(next.points[0], next.points[1]),
                next.road,
                next.start_vertex,
            )
        };

        let delta = geo::normalize_degrees(in_bearing - out_bearing);
        let mut kind = classify_turn(delta);
        if kind == TurnKind::Straight {
            let exclude = [prev_road, next_road];
            let attached = attached_bearings(ctx, next_road, boundary_vertex, &exclude)?;
            let deltas: Vec<f64> = attached
                .iter()
                .map(|&b| geo::normalize_degrees(b - in_bearing))
                .collect();
            kind = infer_keep(&deltas, ctx.config.left_hand_driving);
        }

        let mut turn = TurnInstruction::new(kind, delta as f32);
        if let Some(value) = ctx.road_tag_value(prev_road, "turn:lanes") {
            turn.lanes = parse_turn_lanes(value);
        }
        activate_lanes(&mut turn.lanes, kind);
        steps[i].turn = Some(turn);
    }
    Ok(())
}
