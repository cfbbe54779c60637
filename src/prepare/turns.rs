// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Turn classification, lane parsing and announcement clean-up.

use super::RouteStep;
use crate::rules::{TURN_DEGREE, UTURN_DEGREE};

/// Bearing changes at or below this are no maneuver at all.
const STRAIGHT_DEGREE: f64 = 15.0;
/// Bearing changes at or above this are U-turns.
const SHARP_LIMIT_DEGREE: f64 = 150.0;
/// A diverging road within this of the path still competes for the
/// driver's attention (keep-left/right territory).
const DIVERGE_DEGREE: f64 = 60.0;
/// Straight announcements closer than this to a real turn are
/// redundant.
const SKIP_BEFORE_TURN_METERS: f32 = 120.0;
/// Opposite turns this close with matching names are one U-turn.
const UTURN_PAIR_METERS: f32 = 60.0;
/// Lane activation carries across maneuvers this close together.
const LANE_SEQUENCE_METERS: f32 = 200.0;

/// A classified maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Straight,
    SlightLeft,
    SlightRight,
    Left,
    Right,
    SharpLeft,
    SharpRight,
    KeepLeft,
    KeepRight,
    UTurn,
}

impl TurnKind {
    pub fn is_left(self) -> bool {
        matches!(
            self,
            Self::SlightLeft | Self::Left | Self::SharpLeft | Self::KeepLeft
        )
    }

    pub fn is_right(self) -> bool {
        matches!(
            self,
            Self::SlightRight | Self::Right | Self::SharpRight | Self::KeepRight
        )
    }

    /// Whether this is a real turn, as opposed to continue-straight
    /// guidance.
    pub fn is_turn(self) -> bool {
        !matches!(self, Self::Straight | Self::KeepLeft | Self::KeepRight)
    }
}

impl std::fmt::Display for TurnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Straight => "straight",
            Self::SlightLeft => "slight left",
            Self::SlightRight => "slight right",
            Self::Left => "left",
            Self::Right => "right",
            Self::SharpLeft => "sharp left",
            Self::SharpRight => "sharp right",
            Self::KeepLeft => "keep left",
            Self::KeepRight => "keep right",
            Self::UTurn => "u-turn",
        };
        write!(f, "{}", name)
    }
}

/// One lane of the approach road, with the directions it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub active: bool,
    pub directions: Vec<TurnKind>,
}

/// The maneuver attached to the beginning of a [RouteStep].
#[derive(Debug, Clone, PartialEq)]
pub struct TurnInstruction {
    pub kind: TurnKind,
    /// Bearing change in degrees, positive clockwise.
    pub angle: f32,
    pub lanes: Vec<Lane>,
    /// Set when announcing this maneuver aloud would be redundant.
    pub skip_announce: bool,
}

impl TurnInstruction {
    pub(crate) fn new(kind: TurnKind, angle: f32) -> Self {
        Self {
            kind,
            angle,
            lanes: Vec::new(),
            skip_announce: false,
        }
    }
}

/// Classifies a bearing change into a turn type: at most 15° is
/// straight, under 45° slight, under 120° a plain turn, under 150°
/// sharp, anything beyond a U-turn. Positive deltas turn right.
pub(crate) fn classify_turn(delta: f64) -> TurnKind {
    let magnitude = delta.abs();
    if magnitude <= STRAIGHT_DEGREE {
        return TurnKind::Straight;
    }
    if magnitude >= SHARP_LIMIT_DEGREE {
        return TurnKind::UTurn;
    }
    let right = delta > 0.0;
    if magnitude < TURN_DEGREE {
        if right {
            TurnKind::SlightRight
        } else {
            TurnKind::SlightLeft
        }
    } else if magnitude < UTURN_DEGREE {
        if right {
            TurnKind::Right
        } else {
            TurnKind::Left
        }
    } else if right {
        TurnKind::SharpRight
    } else {
        TurnKind::SharpLeft
    }
}

/// Keep-left/keep-right inference for a below-threshold bearing
/// change with diverging alternatives: `diverging` holds the bearing
/// deltas of the attached roads relative to the path's continuation.
/// With alternatives on one side only, the driver keeps to the other;
/// with both, the driving side decides which keep is announced.
pub(crate) fn infer_keep(diverging: &[f64], left_hand_driving: bool) -> TurnKind {
    let relevant: Vec<f64> = diverging
        .iter()
        .copied()
        .filter(|d| d.abs() < DIVERGE_DEGREE && d.abs() > 1.0)
        .collect();
    if relevant.is_empty() {
        return TurnKind::Straight;
    }
    let right = relevant.iter().any(|&d| d > 0.0);
    let left = relevant.iter().any(|&d| d < 0.0);
    match (left, right) {
        (true, false) => TurnKind::KeepRight,
        (false, true) => TurnKind::KeepLeft,
        _ => {
            if left_hand_driving {
                TurnKind::KeepLeft
            } else {
                TurnKind::KeepRight
            }
        }
    }
}

/// Parses a `turn:lanes`-style tag value: lanes split on `|`,
/// directions within a lane on `;`. Unknown direction words count as
/// through lanes.
pub(crate) fn parse_turn_lanes(value: &str) -> Vec<Lane> {
    value
        .split('|')
        .map(|lane| Lane {
            active: false,
            directions: lane
                .split(';')
                .map(|direction| match direction.trim() {
                    "left" => TurnKind::Left,
                    "slight_left" => TurnKind::SlightLeft,
                    "sharp_left" => TurnKind::SharpLeft,
                    "right" => TurnKind::Right,
                    "slight_right" => TurnKind::SlightRight,
                    "sharp_right" => TurnKind::SharpRight,
                    "merge_to_left" => TurnKind::KeepLeft,
                    "merge_to_right" => TurnKind::KeepRight,
                    "reverse" => TurnKind::UTurn,
                    _ => TurnKind::Straight,
                })
                .collect(),
        })
        .collect()
}

/// Marks the lanes serving the maneuver as active. An exact direction
/// match wins; keeps fall back to through lanes, and as a last resort
/// the maneuver's side of the lane set is taken.
pub(crate) fn activate_lanes(lanes: &mut [Lane], kind: TurnKind) {
    if lanes.is_empty() {
        return;
    }

    let mut hit = false;
    for lane in lanes.iter_mut() {
        if lane.directions.contains(&kind) {
            lane.active = true;
            hit = true;
        }
    }
    if hit {
        return;
    }

    if matches!(kind, TurnKind::KeepLeft | TurnKind::KeepRight) {
        for lane in lanes.iter_mut() {
            if lane.directions.contains(&TurnKind::Straight) {
                lane.active = true;
                hit = true;
            }
        }
        if hit {
            return;
        }
    }

    // No lane names the maneuver: take its side of the road.
    let half = lanes.len().div_ceil(2);
    if kind.is_right() {
        let skip = lanes.len() - half;
        for lane in lanes.iter_mut().skip(skip) {
            lane.active = true;
        }
    } else {
        for lane in lanes.iter_mut().take(half) {
            lane.active = true;
        }
    }
}

/// Pass (f): across a short sequence of maneuvers, keep active only
/// the lanes that also serve the following maneuver, so the driver is
/// told which lanes stay valid through the sequence. A restriction
/// that would deactivate every lane is discarded.
pub(crate) fn merge_lane_activation(steps: &mut [RouteStep]) {
    for i in 1..steps.len() {
        if steps[i].distance > LANE_SEQUENCE_METERS {
            continue;
        }
        let Some(next_kind) = steps.get(i + 1).and_then(|s| s.turn.as_ref()).map(|t| t.kind)
        else {
            continue;
        };
        let Some(turn) = steps[i].turn.as_mut() else {
            continue;
        };
        if turn.lanes.is_empty() {
            continue;
        }

        let narrowed: Vec<bool> = turn
            .lanes
            .iter()
            .map(|lane| {
                lane.active
                    && (lane.directions.contains(&next_kind)
                        || lane.directions.contains(&TurnKind::Straight) && !next_kind.is_turn())
            })
            .collect();
        if narrowed.iter().any(|&keep| keep) {
            for (lane, keep) in turn.lanes.iter_mut().zip(narrowed) {
                lane.active = keep;
            }
        }
    }
}

/// Pass (g), first half: a straight-on announcement directly before a
/// real turn says nothing the turn itself would not; mark it
/// skippable rather than dropping it, so rendering still sees the
/// geometry boundary.
pub(crate) fn mark_skippable(steps: &mut [RouteStep]) {
    for i in 1..steps.len() {
        let next_is_turn = steps
            .get(i + 1)
            .and_then(|s| s.turn.as_ref())
            .is_some_and(|t| t.kind.is_turn());
        if !next_is_turn || steps[i].distance > SKIP_BEFORE_TURN_METERS {
            continue;
        }
        if let Some(turn) = steps[i].turn.as_mut() {
            if turn.kind == TurnKind::Straight {
                turn.skip_announce = true;
            }
        }
    }
}

/// Pass (g), second half: an immediate left-right (or right-left)
/// pair between identically named roads is one U-turn in disguise,
/// produced by dual carriageways; collapse it.
pub(crate) fn collapse_uturns(steps: &mut [RouteStep]) {
    for i in 1..steps.len().saturating_sub(1) {
        let (Some(first), Some(second)) = (steps[i].turn.as_ref(), steps[i + 1].turn.as_ref())
        else {
            continue;
        };
        let opposite = (first.kind.is_left() && second.kind.is_right())
            || (first.kind.is_right() && second.kind.is_left());
        if !opposite || steps[i].distance > UTURN_PAIR_METERS {
            continue;
        }
        let names_match = match (&steps[i - 1].name, &steps[i + 1].name) {
            (Some(before), Some(after)) => before == after,
            _ => false,
        };
        if !names_match {
            continue;
        }

        let angle = first.angle;
        steps[i].turn = Some(TurnInstruction::new(TurnKind::UTurn, angle));
        steps[i + 1].turn = None;
    }
}
