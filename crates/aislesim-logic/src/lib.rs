//! Pure order-routing and layout logic for AisleSim.
//!
//! This crate holds everything that does not depend on a UI, a database or
//! a runtime. Functions take a [`grid::Layout`] and plain data and return
//! results, so the same code backs the headless simtest, benchmarks and any
//! service that wants to embed it.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Routing, scoring, optimizer and search tunables with validation |
//! | [`grid`] | Positions, layouts, cell occupancy queries |
//! | [`metrics`] | Readings, efficiency sub-scores, batch summaries, expected travel |
//! | [`optimizer`] | Demand-ordered zone layout and before/after comparison |
//! | [`orders`] | Orders, order-frequency catalogue, demand weights, order generation |
//! | [`pathfinding`] | Manhattan distance and A* paths on the open grid |
//! | [`routing`] | Entry → shelf → packing → exit routing, single and batched |
//! | [`search`] | Seeded stochastic layout search |
//! | [`validation`] | Layout findings and validated JSON loading |

pub mod config;
pub mod grid;
pub mod metrics;
pub mod optimizer;
pub mod orders;
pub mod pathfinding;
pub mod routing;
pub mod search;
pub mod validation;
