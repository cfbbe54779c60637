// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Offline routing over compact tile-indexed binary road maps.
//!
//! A map file carries a quadrant-subdivided spatial index whose nodes
//! are paged in lazily, on first touch, under a configurable memory
//! ceiling. Road attributes (speed, access, one-way direction,
//! obstacles, turn penalties) are evaluated by a declarative
//! per-profile [rule engine](RuleSet), paths are found with a
//! bidirectional A* honoring turn restrictions, and the raw result is
//! prepared into maneuvers with turn and lane guidance.
//!
//! # Example
//!
//! ```no_run
//! let map = routile::MapFile::open("poland.rtm").expect("failed to open the map");
//! let rules = routile::RuleSet::default_rules();
//! let profile = rules.profile("car").expect("car profile is built in");
//! let config = routile::RoutingConfig::from_profile(profile);
//! let mut ctx = routile::RoutingContext::new(&map, profile, config);
//!
//! let start = routile::Point31::from_lat_lon(52.2297, 21.0122);
//! let end = routile::Point31::from_lat_lon(52.4064, 16.9252);
//! let route = routile::find_route(&mut ctx, start, end, &routile::NoObserver)
//!     .expect("failed to find route");
//!
//! for step in &route {
//!     println!(
//!         "{} for {:.0} m",
//!         step.turn.as_ref().map(|t| t.kind.to_string()).unwrap_or_default(),
//!         step.distance,
//!     );
//! }
//! ```

pub mod c;
mod context;
mod geo;
mod map;
mod planner;
mod prepare;
mod progress;
mod rules;

pub use context::{
    RoadId, RoadSegmentPoint, RouteSegment, RoutingConfig, RoutingContext,
};
pub use geo::{bearing31, distance31, Point31};
pub use map::{
    BBox31, EncodingRule, MapError, MapFile, Restriction, RestrictionKind, RoadObject,
    RouteRegion, RouteSubregion, SUPPORTED_VERSION,
};
pub use planner::{find_route, RouteError};
pub use prepare::{Lane, RouteStep, TurnInstruction, TurnKind};
pub use progress::{CancellationFlag, NoObserver, RouteObserver};
pub use rules::{RuleError, RuleSet, VehicleProfile};
