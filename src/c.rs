// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! C bindings over the open/route/close surface.
//!
//! Handles are heap pointers owned by the caller; every `_new`/`_open`
//! has a matching `_delete`/`_close`. Status codes returned by
//! [routile_route] distinguish the no-route family of outcomes from
//! hard errors.

use super::*;

use std::ffi::{c_char, CStr, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::ptr::null_mut;
use std::slice;

/// An opened map file behind the C boundary.
pub struct MapHandle {
    map: MapFile,
}

pub const ROUTILE_ERROR: isize = -1;
pub const ROUTILE_NO_ROUTE: isize = -2;
pub const ROUTILE_START_NOT_FOUND: isize = -3;
pub const ROUTILE_END_NOT_FOUND: isize = -4;
pub const ROUTILE_CANCELLED: isize = -5;

/// One prepared maneuver, flattened for C consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct CRouteStep {
    pub road_id: u64,
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    /// Meters.
    pub distance: f32,
    /// Seconds.
    pub time: f32,
    /// 0 = none, 1 = straight, 2/3 = slight left/right, 4/5 = left/
    /// right, 6/7 = sharp left/right, 8/9 = keep left/right,
    /// 10 = u-turn.
    pub turn: i32,
    pub turn_angle: f32,
    pub skip_announce: bool,
}

fn turn_code(turn: &Option<TurnInstruction>) -> i32 {
    match turn.as_ref().map(|t| t.kind) {
        None => 0,
        Some(TurnKind::Straight) => 1,
        Some(TurnKind::SlightLeft) => 2,
        Some(TurnKind::SlightRight) => 3,
        Some(TurnKind::Left) => 4,
        Some(TurnKind::Right) => 5,
        Some(TurnKind::SharpLeft) => 6,
        Some(TurnKind::SharpRight) => 7,
        Some(TurnKind::KeepLeft) => 8,
        Some(TurnKind::KeepRight) => 9,
        Some(TurnKind::UTurn) => 10,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routile_open(path: *const c_char) -> *mut MapHandle {
    if path.is_null() {
        return null_mut();
    }
    let path = OsStr::from_bytes(CStr::from_ptr(path).to_bytes());
    match MapFile::open(path) {
        Ok(map) => Box::into_raw(Box::new(MapHandle { map })),
        Err(e) => {
            log::error!("routile_open: {}", e);
            null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routile_close(handle: *mut MapHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routile_cancellation_new() -> *mut CancellationFlag {
    Box::into_raw(Box::new(CancellationFlag::new()))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routile_cancellation_cancel(flag: *const CancellationFlag) {
    if let Some(flag) = flag.as_ref() {
        flag.cancel();
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routile_cancellation_delete(flag: *mut CancellationFlag) {
    if !flag.is_null() {
        drop(Box::from_raw(flag));
    }
}

/// Finds the id of the road nearest to the given position, or 0 when
/// nothing routable is within reach.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn routile_find_nearest_road(
    handle: *const MapHandle,
    lat: f64,
    lon: f64,
    profile: *const c_char,
) -> u64 {
    let Some(handle) = handle.as_ref() else {
        return 0;
    };
    let Some(profile) = resolve_profile(profile) else {
        return 0;
    };

    let config = RoutingConfig::from_profile(profile);
    let mut ctx = RoutingContext::new(&handle.map, profile, config);
    match ctx.find_nearest_road(Point31::from_lat_lon(lat, lon)) {
        Ok(Some(found)) => ctx.road(found.road).id,
        Ok(None) => 0,
        Err(e) => {
            log::error!("routile_find_nearest_road: {}", e);
            0
        }
    }
}

/// Calculates a route and writes an owned array of [CRouteStep] into
/// `out_steps`. Returns the number of steps, or a negative status
/// code; `out_steps` is only written on success. The array must be
/// released with [routile_route_delete].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn routile_route(
    handle: *const MapHandle,
    start_lat: f64,
    start_lon: f64,
    end_lat: f64,
    end_lon: f64,
    profile: *const c_char,
    cancellation: *const CancellationFlag,
    out_steps: *mut *mut CRouteStep,
) -> isize {
    let Some(handle) = handle.as_ref() else {
        return ROUTILE_ERROR;
    };
    let Some(profile) = resolve_profile(profile) else {
        return ROUTILE_ERROR;
    };

    let config = RoutingConfig::from_profile(profile);
    let mut ctx = RoutingContext::new(&handle.map, profile, config);
    let start = Point31::from_lat_lon(start_lat, start_lon);
    let end = Point31::from_lat_lon(end_lat, end_lon);

    let observer: &dyn RouteObserver = match cancellation.as_ref() {
        Some(flag) => flag,
        None => &NoObserver,
    };

    let steps = match find_route(&mut ctx, start, end, observer) {
        Ok(steps) => steps,
        Err(RouteError::NoRoute) => return ROUTILE_NO_ROUTE,
        Err(RouteError::StartNotFound) => return ROUTILE_START_NOT_FOUND,
        Err(RouteError::EndNotFound) => return ROUTILE_END_NOT_FOUND,
        Err(RouteError::Cancelled) => return ROUTILE_CANCELLED,
        Err(e) => {
            log::error!("routile_route: {}", e);
            return ROUTILE_ERROR;
        }
    };

    let converted: Vec<CRouteStep> = steps
        .iter()
        .map(|step| {
            let first = step.points[0];
            let last = step.points[step.points.len() - 1];
            CRouteStep {
                road_id: step.road_id,
                start_lat: first.lat(),
                start_lon: first.lon(),
                end_lat: last.lat(),
                end_lon: last.lon(),
                distance: step.distance,
                time: step.time,
                turn: turn_code(&step.turn),
                turn_angle: step.turn.as_ref().map(|t| t.angle).unwrap_or(0.0),
                skip_announce: step.turn.as_ref().is_some_and(|t| t.skip_announce),
            }
        })
        .collect();

    let count = converted.len() as isize;
    if !out_steps.is_null() {
        *out_steps = Box::into_raw(converted.into_boxed_slice()) as *mut CRouteStep;
    }
    count
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routile_route_delete(steps: *mut CRouteStep, count: usize) {
    if !steps.is_null() {
        drop(Box::from_raw(slice::from_raw_parts_mut(steps, count)));
    }
}

fn resolve_profile(name: *const c_char) -> Option<&'static VehicleProfile> {
    let rules = RuleSet::default_rules();
    if name.is_null() {
        return rules.profile("car");
    }
    let name = unsafe { CStr::from_ptr(name) };
    rules.profile(name.to_str().ok()?)
}
