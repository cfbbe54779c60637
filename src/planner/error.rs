// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::map::MapError;

/// Outcomes of a route query that did not produce a path.
///
/// Not-found conditions and cancellation are first-class outcomes,
/// distinguished from map-file failures; nothing here is retried
/// internally. Callers decide whether to run again with different
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Reading the map failed; fatal for this file.
    #[error(transparent)]
    Map(#[from] MapError),

    /// No routable road near the start coordinate.
    #[error("no road near the start point")]
    StartNotFound,

    /// No routable road near the end coordinate.
    #[error("no road near the end point")]
    EndNotFound,

    /// Both frontiers exhausted without meeting.
    #[error("no route between the given points")]
    NoRoute,

    /// The observer reported cancellation; not an error condition,
    /// but the query produced no result.
    #[error("route calculation cancelled")]
    Cancelled,
}
