pub mod matpower;
pub mod matpower_parser;

pub use matpower::{
    build_network_from_matpower_case, load_matpower_network, network_from_matpower_str,
    parse_matpower, ImportResult,
};
pub use matpower_parser::{
    parse_matpower_file, parse_matpower_string, MatpowerBranch, MatpowerBus, MatpowerCase,
    MatpowerGen,
};
