mod network_builder;

pub use network_builder::{
    BranchInput, BusInput, GenInput, LoadInput, NetworkBuilder, ShuntInput,
};
