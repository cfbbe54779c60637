// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Bidirectional A* over the lazily loaded road graph.

mod error;
mod search;

pub use error::RouteError;
pub(crate) use search::{SearchResult, NO_PARENT};

use crate::context::RoutingContext;
use crate::geo::Point31;
use crate::prepare::{self, RouteStep};
use crate::progress::RouteObserver;

/// Finds a time-optimal route between two map coordinates and
/// prepares it into an ordered maneuver list.
///
/// The endpoints are projected onto their nearest routable roads
/// first; distinguished errors report which of the two had none. A
/// search that exhausts both frontiers yields [RouteError::NoRoute] —
/// never a silent retry with relaxed constraints.
pub fn find_route<O: RouteObserver + ?Sized>(
    ctx: &mut RoutingContext<'_>,
    start: Point31,
    end: Point31,
    observer: &O,
) -> Result<Vec<RouteStep>, RouteError> {
    let start_point = ctx
        .find_nearest_road(start)?
        .ok_or(RouteError::StartNotFound)?;
    let end_point = ctx.find_nearest_road(end)?.ok_or(RouteError::EndNotFound)?;

    let result = search::search(ctx, start_point, end_point, observer)?;
    log::info!(
        "route found: cost {:.1}s, {} search nodes, {} roads in arena",
        result.cost,
        result.nodes.len(),
        ctx.road_count()
    );

    Ok(prepare::prepare_route(ctx, &result)?)
}
