//! # pgopf-core: network snapshot model
//!
//! The data every other pgopf crate reads: a power network held as an
//! undirected petgraph multigraph, typed element ids, unit newtypes and the
//! solve state a power-flow engine leaves behind.
//!
//! Buses, generators, loads and shunts are graph nodes; branches are edges.
//! Lines and transformers share the pi model.
//!
//! ## Canonical bus ordering
//!
//! Numerical code never indexes buses by [`BusId`]. [`Network::bus_order`]
//! returns buses sorted by id, and the position in that list is the dense bus
//! index `0..n_buses` used by every vector and matrix downstream.
//!
//! ```rust
//! use pgopf_core::*;
//!
//! let mut network = Network::new();
//! let b2 = network.graph.add_node(Node::Bus(Bus {
//!     id: BusId::new(2),
//!     ..Bus::default()
//! }));
//! let b1 = network.graph.add_node(Node::Bus(Bus {
//!     id: BusId::new(1),
//!     ..Bus::default()
//! }));
//! let line = Branch::new(BranchId::new(1), "1-2".into(), BusId::new(1), BusId::new(2), 0.01, 0.1);
//! network.graph.add_edge(b1, b2, Edge::Branch(line));
//!
//! let order: Vec<usize> = network.bus_order().iter().map(|b| b.id.value()).collect();
//! assert_eq!(order, vec![1, 2]);
//! assert!(!network.has_solved_state());
//! ```

pub mod diagnostics;
pub mod elements;
pub mod error;
pub mod ids;
pub mod network;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use elements::{Branch, Bus, Edge, Gen, Load, Node, Shunt};
pub use error::{PgopfError, PgopfResult};
pub use ids::{BranchId, BusId, GenId, LoadId, ShuntId};
pub use network::{Network, NetworkStats, SolveState, DEFAULT_BASE_MVA};
pub use petgraph::graph::{EdgeIndex, NodeIndex};
pub use units::{Kilovolts, Megavars, MegavoltAmperes, Megawatts, PerUnit, Radians};
