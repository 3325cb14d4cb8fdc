//! # petri-reach: symbolic analysis of 1-safe Petri nets
//!
//! **`petri-reach`** computes the reachable markings of a 1-safe Petri net as a
//! Binary Decision Diagram, searches that set for deadlocks, and optimizes
//! linear objectives over it.
//!
//! ## How it works
//!
//! - Each place is one boolean variable. A set of markings is a BDD over those
//!   variables, owned by a single [`Bdd`][crate::bdd::Bdd] manager which
//!   hash-conses nodes and caches operations.
//! - Places are mapped to variables once, by a breadth-first walk over the
//!   place adjacency graph ([`order`]), so places touched by the same
//!   transition end up close in the diagram.
//! - Every transition becomes an enabling condition, a set of changed
//!   variables and an update cube ([`relation`]). The image of a set is
//!   `(∃ changed. S ∧ enable) ∧ update`; no next-state variables are needed.
//! - The reachable set is a frontier-based fixpoint ([`reach`]). Its size is
//!   counted on the diagram, never by enumeration.
//! - Deadlocks are searched with a 0-1 program describing markings where every
//!   transition is disabled ([`deadlock`], [`ilp`]). Candidates are checked
//!   against the reachable set; unreachable ones are cut off and the program is
//!   solved again. Place invariants ([`invariant`]) prune candidates early.
//! - A weighted token sum is maximized by dynamic programming over the diagram
//!   nodes ([`optimize`]).
//!
//! ## Basic usage
//!
//! ```rust
//! use num_bigint::BigUint;
//! use petri_reach::deadlock::{find_deadlock, DeadlockOutcome};
//! use petri_reach::net::{Marking, NetBuilder};
//! use petri_reach::optimize::optimize_marking;
//! use petri_reach::reach::compute_reachable_set;
//!
//! // A token circulating over three places.
//! let mut builder = NetBuilder::new();
//! let p1 = builder.place("p1", true);
//! let p2 = builder.place("p2", false);
//! let p3 = builder.place("p3", false);
//! builder.transition("t1", [p1], [p2]);
//! builder.transition("t2", [p2], [p3]);
//! builder.transition("t3", [p3], [p1]);
//! let net = builder.build().unwrap();
//!
//! let reach = compute_reachable_set(&net).unwrap();
//! assert_eq!(*reach.count(), BigUint::from(3u32));
//!
//! assert_eq!(find_deadlock(&net, &reach).unwrap(), DeadlockOutcome::NoDeadlock);
//!
//! let best = optimize_marking(&["p1", "p2", "p3"], &reach, &[1, -2, 3]).unwrap();
//! assert_eq!(best, Some((Marking::from_bits(&[0, 0, 1]), 3)));
//! ```
//!
//! ## Core components
//!
//! - **[`net`]**: validated net model with explicitly oriented incidence matrices.
//! - **[`bdd`]**: the diagram manager; [`sat`] counts and samples models, [`dot`] renders diagrams.
//! - **[`reach`]**, **[`deadlock`]**, **[`optimize`]**: the three analyses.
//! - **[`explicit`]**: breadth-first enumeration, for small nets and cross-checks.
//! - **[`config`]**: knobs shared by the whole pipeline.

pub mod bdd;
pub mod cache;
pub mod config;
pub mod deadlock;
pub mod dot;
pub mod error;
pub mod explicit;
pub mod ilp;
pub mod invariant;
pub mod net;
pub mod node;
pub mod optimize;
pub mod order;
pub mod reach;
pub mod reference;
pub mod relation;
pub mod sat;
pub mod table;
pub mod utils;

pub use error::{Error, Result};
