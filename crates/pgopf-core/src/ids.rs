//! Typed element ids. Each wraps the number the case file assigned, so bus 7
//! stays `BusId(7)` no matter where it sits in the graph.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! element_id {
    ($($name:ident => $prefix:literal),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub(crate) usize);

            impl $name {
                pub const fn new(value: usize) -> Self {
                    Self(value)
                }

                pub const fn value(&self) -> usize {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!($prefix, " {}"), self.0)
                }
            }
        )+
    };
}

element_id! {
    BusId => "Bus",
    BranchId => "Branch",
    GenId => "Gen",
    LoadId => "Load",
    ShuntId => "Shunt",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_number() {
        let mut ids = vec![BusId::new(9), BusId::new(2), BusId::new(4)];
        ids.sort();
        assert_eq!(ids, vec![BusId(2), BusId(4), BusId(9)]);
    }

    #[test]
    fn ids_display_with_kind() {
        assert_eq!(GenId::new(3).to_string(), "Gen 3");
        assert_eq!(LoadId::new(12).to_string(), "Load 12");
    }
}
