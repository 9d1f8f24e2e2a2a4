//! Sparse Y-bus (admittance) matrix.
//!
//! ```text
//! I = Y × V,   Y[i,j] = G[i,j] + jB[i,j]
//! ```
//!
//! G and B are stored as separate CSR matrices. Rows and columns follow the
//! canonical bus order of [`Network::bus_order`].

use ndarray::Array2;
use num_complex::Complex64;
use pgopf_core::{Branch, BusId, Network, PgopfError};
use sprs::{CsMat, TriMat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum YBusError {
    #[error("No buses found in network")]
    NoBuses,

    #[error("Branch {0} has zero impedance")]
    ZeroImpedance(String),

    #[error("Unknown bus ID: {0}")]
    UnknownBus(usize),

    #[error("Bus ID {0} appears more than once")]
    DuplicateBus(usize),
}

impl From<YBusError> for PgopfError {
    fn from(err: YBusError) -> Self {
        PgopfError::Network(err.to_string())
    }
}

/// The four pi-model entries a branch adds to the admittance matrix.
///
/// For series admittance `ys`, total charging `bc` and complex tap
/// `t = τ·e^{jφ}`:
///
/// ```text
/// Yff = (ys + j·bc/2) / τ²     Yft = -ys / conj(t)
/// Ytt =  ys + j·bc/2           Ytf = -ys / t
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchStamp {
    pub ff: Complex64,
    pub ft: Complex64,
    pub tf: Complex64,
    pub tt: Complex64,
}

impl BranchStamp {
    pub fn of(branch: &Branch) -> Result<Self, YBusError> {
        let z = Complex64::new(branch.resistance, branch.reactance);
        if z.norm() < 1e-12 {
            return Err(YBusError::ZeroImpedance(branch.name.clone()));
        }
        let ys = z.inv();
        let shunt_half = Complex64::new(0.0, branch.charging_b.value() / 2.0);
        // A non-positive ratio is treated as a plain line
        let tau = Some(branch.tap_ratio).filter(|t| *t > 0.0).unwrap_or(1.0);
        let tap = Complex64::from_polar(tau, branch.phase_shift.value());

        Ok(BranchStamp {
            ff: (ys + shunt_half) / (tau * tau),
            ft: -ys / tap.conj(),
            tf: -ys / tap,
            tt: ys + shunt_half,
        })
    }
}

/// Admittance matrix held as separate CSR conductance and susceptance parts.
#[derive(Debug, Clone)]
pub struct SparseYBus {
    /// Bus ids in canonical order; sorted, so lookups are binary searches
    buses: Vec<BusId>,
    g: CsMat<f64>,
    b: CsMat<f64>,
}

impl SparseYBus {
    /// Stamp every in-service branch and shunt of `network`.
    pub fn from_network(network: &Network) -> Result<Self, YBusError> {
        let buses: Vec<BusId> = network.bus_order().into_iter().map(|b| b.id).collect();
        if buses.is_empty() {
            return Err(YBusError::NoBuses);
        }
        if let Some(pair) = buses.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(YBusError::DuplicateBus(pair[0].value()));
        }
        let n = buses.len();
        let locate = |id: BusId| {
            buses
                .binary_search(&id)
                .map_err(|_| YBusError::UnknownBus(id.value()))
        };

        let mut g = TriMat::new((n, n));
        let mut b = TriMat::new((n, n));
        let mut stamp = |i: usize, j: usize, y: Complex64| {
            g.add_triplet(i, j, y.re);
            b.add_triplet(i, j, y.im);
        };

        for branch in network.branches().into_iter().filter(|br| br.status) {
            let (f, t) = (locate(branch.from_bus)?, locate(branch.to_bus)?);
            let entries = BranchStamp::of(branch)?;
            stamp(f, f, entries.ff);
            stamp(f, t, entries.ft);
            stamp(t, f, entries.tf);
            stamp(t, t, entries.tt);
        }

        for shunt in network.shunts().into_iter().filter(|s| s.status) {
            let k = locate(shunt.bus)?;
            stamp(k, k, Complex64::new(shunt.gs_pu, shunt.bs_pu));
        }

        Ok(SparseYBus {
            g: g.to_csr(),
            b: b.to_csr(),
            buses,
        })
    }

    pub fn n_bus(&self) -> usize {
        self.buses.len()
    }

    pub fn g(&self, i: usize, j: usize) -> f64 {
        self.g.get(i, j).copied().unwrap_or(0.0)
    }

    pub fn b(&self, i: usize, j: usize) -> f64 {
        self.b.get(i, j).copied().unwrap_or(0.0)
    }

    pub fn y(&self, i: usize, j: usize) -> Complex64 {
        Complex64::new(self.g(i, j), self.b(i, j))
    }

    pub fn bus_index(&self, id: BusId) -> Option<usize> {
        self.buses.binary_search(&id).ok()
    }

    pub fn bus_id(&self, idx: usize) -> Option<BusId> {
        self.buses.get(idx).copied()
    }

    /// Stored entries in G plus stored entries in B.
    pub fn nnz(&self) -> usize {
        self.g.nnz() + self.b.nnz()
    }

    pub fn to_dense(&self) -> Array2<Complex64> {
        let n = self.n_bus();
        let mut dense = Array2::<Complex64>::zeros((n, n));
        for (&v, (i, j)) in self.g.iter() {
            dense[[i, j]].re += v;
        }
        for (&v, (i, j)) in self.b.iter() {
            dense[[i, j]].im += v;
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgopf_core::{Branch, BranchId, Bus, Edge, Node, Radians, Shunt};

    fn two_bus(r: f64, x: f64) -> Network {
        let mut network = Network::new();
        let b1 = network.graph.add_node(Node::Bus(Bus {
            id: BusId::new(1),
            ..Bus::default()
        }));
        let b2 = network.graph.add_node(Node::Bus(Bus {
            id: BusId::new(2),
            ..Bus::default()
        }));
        network.graph.add_edge(
            b1,
            b2,
            Edge::Branch(
                Branch::new(
                    BranchId::new(1),
                    "1-2".to_string(),
                    BusId::new(1),
                    BusId::new(2),
                    r,
                    x,
                )
                .with_charging(0.1),
            ),
        );
        network
    }

    #[test]
    fn test_single_line_entries() {
        let ybus = SparseYBus::from_network(&two_bus(0.0, 0.1)).unwrap();
        // ys = 1/(j0.1) = -j10, half charging j0.05
        assert!((ybus.b(0, 0) - (-10.0 + 0.05)).abs() < 1e-12);
        assert!((ybus.b(0, 1) - 10.0).abs() < 1e-12);
        assert!((ybus.b(1, 0) - 10.0).abs() < 1e-12);
        assert!(ybus.g(0, 1).abs() < 1e-12);
    }

    #[test]
    fn test_rows_follow_bus_order() {
        let mut network = Network::new();
        network.graph.add_node(Node::Bus(Bus {
            id: BusId::new(9),
            ..Bus::default()
        }));
        network.graph.add_node(Node::Bus(Bus {
            id: BusId::new(4),
            ..Bus::default()
        }));
        network.graph.add_node(Node::Shunt(Shunt {
            bus: BusId::new(9),
            bs_pu: 0.2,
            ..Shunt::default()
        }));

        let ybus = SparseYBus::from_network(&network).unwrap();
        assert_eq!(ybus.bus_id(0), Some(BusId::new(4)));
        assert_eq!(ybus.bus_index(BusId::new(9)), Some(1));
        assert_eq!(ybus.b(1, 1), 0.2);
        assert_eq!(ybus.b(0, 0), 0.0);
    }

    #[test]
    fn test_phase_shift_breaks_symmetry() {
        let mut network = two_bus(0.01, 0.1);
        if let Some(Edge::Branch(br)) = network.graph.edge_weights_mut().next() {
            br.tap_ratio = 1.0;
            br.phase_shift = Radians::from_degrees(10.0);
        }
        let ybus = SparseYBus::from_network(&network).unwrap();
        assert!((ybus.y(0, 1) - ybus.y(1, 0)).norm() > 1e-6);
    }

    #[test]
    fn test_zero_impedance_rejected() {
        let err = SparseYBus::from_network(&two_bus(0.0, 0.0)).unwrap_err();
        assert!(matches!(err, YBusError::ZeroImpedance(_)));
    }

    #[test]
    fn test_no_buses() {
        assert!(matches!(
            SparseYBus::from_network(&Network::new()),
            Err(YBusError::NoBuses)
        ));
    }

    #[test]
    fn test_duplicate_bus_rejected() {
        let mut network = two_bus(0.01, 0.1);
        network.graph.add_node(Node::Bus(Bus {
            id: BusId::new(2),
            ..Bus::default()
        }));
        assert!(matches!(
            SparseYBus::from_network(&network),
            Err(YBusError::DuplicateBus(2))
        ));
    }

    #[test]
    fn test_unknown_bus() {
        let mut network = two_bus(0.01, 0.1);
        network.graph.add_node(Node::Shunt(Shunt {
            bus: BusId::new(42),
            gs_pu: 0.1,
            ..Shunt::default()
        }));
        assert!(matches!(
            SparseYBus::from_network(&network),
            Err(YBusError::UnknownBus(42))
        ));
    }

    #[test]
    fn test_stamp_of_tapped_transformer() {
        let br = Branch::new(BranchId::new(1), "T".into(), BusId::new(1), BusId::new(2), 0.0, 0.5)
            .with_tap(2.0, Radians(0.0));
        let stamp = BranchStamp::of(&br).unwrap();
        // ys = -j2; Yff scales by 1/τ², off-diagonals by 1/τ
        assert!((stamp.tt - Complex64::new(0.0, -2.0)).norm() < 1e-12);
        assert!((stamp.ff - Complex64::new(0.0, -0.5)).norm() < 1e-12);
        assert!((stamp.ft - Complex64::new(0.0, 1.0)).norm() < 1e-12);
        assert_eq!(stamp.ft, stamp.tf);
    }

    #[test]
    fn test_dense_matches_sparse() {
        let ybus = SparseYBus::from_network(&two_bus(0.02, 0.2)).unwrap();
        let dense = ybus.to_dense();
        for i in 0..2 {
            for j in 0..2 {
                assert_eq!(dense[[i, j]], ybus.y(i, j));
            }
        }
    }
}
