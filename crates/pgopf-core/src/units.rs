//! Unit newtypes for power system quantities.
//!
//! Case data arrives in engineering units (MW, Mvar, kV, degrees) while every
//! numerical routine works in per-unit on the system MVA base. The only way
//! from one to the other is an explicit `to_per_unit(base)`.
//!
//! ```
//! use pgopf_core::units::{Megawatts, MegavoltAmperes};
//!
//! let load = Megawatts(70.0) + Megawatts(30.0);
//! assert_eq!(load.to_per_unit(MegavoltAmperes(100.0)).value(), 1.0);
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Declares an `f64` newtype with its display symbol and basic arithmetic.
macro_rules! quantity {
    ($(#[$doc:meta])* $name:ident, $symbol:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub f64);

        impl $name {
            pub const SYMBOL: &'static str = $symbol;

            pub const fn value(self) -> f64 {
                self.0
            }

            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.4} {}", self.0, Self::SYMBOL)
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                $name(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                $name(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                $name(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, k: f64) -> Self {
                $name(self.0 * k)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold($name(0.0), |acc, x| acc + x)
            }
        }
    };
}

/// Power quantities that normalise against the system MVA base.
macro_rules! on_mva_base {
    ($($name:ident),+) => {
        $(
            impl $name {
                /// Per-unit on `base`. Infinite limits stay infinite.
                pub fn to_per_unit(self, base: MegavoltAmperes) -> PerUnit {
                    PerUnit(self.0 / base.0)
                }
            }
        )+
    };
}

quantity!(
    /// Active power, MW
    Megawatts,
    "MW"
);
quantity!(
    /// Reactive power, Mvar
    Megavars,
    "Mvar"
);
quantity!(
    /// Apparent power, MVA. Also the system base.
    MegavoltAmperes,
    "MVA"
);
quantity!(PerUnit, "pu");
quantity!(Kilovolts, "kV");
quantity!(Radians, "rad");

on_mva_base!(Megawatts, Megavars);

impl PerUnit {
    pub const ONE: Self = PerUnit(1.0);
}

impl Radians {
    pub fn from_degrees(deg: f64) -> Self {
        Radians(deg.to_radians())
    }

    pub fn to_degrees(self) -> f64 {
        self.0.to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Megawatts(100.0);
        let b = Megawatts(50.0);
        assert_eq!(a + b, Megawatts(150.0));
        assert_eq!(a - b, Megawatts(50.0));
        assert_eq!(-a, Megawatts(-100.0));
        assert_eq!(a * 0.5, b);
    }

    #[test]
    fn test_per_unit_conversion() {
        let base = MegavoltAmperes(100.0);
        assert_eq!(Megawatts(70.0).to_per_unit(base), PerUnit(0.7));
        assert_eq!(Megavars(-25.0).to_per_unit(base), PerUnit(-0.25));
        assert!(!Megawatts(f64::INFINITY).to_per_unit(base).is_finite());
    }

    #[test]
    fn test_sum() {
        let total: Megavars = [Megavars(1.0), Megavars(2.5)].into_iter().sum();
        assert_eq!(total.value(), 3.5);
    }

    #[test]
    fn test_degrees() {
        let a = Radians::from_degrees(180.0);
        assert!((a.value() - std::f64::consts::PI).abs() < 1e-12);
        assert!((a.to_degrees() - 180.0).abs() < 1e-12);
    }

    #[test]
    fn test_display_uses_symbol() {
        assert_eq!(Megawatts(12.5).to_string(), "12.5000 MW");
        assert_eq!(PerUnit::ONE.to_string(), "1.0000 pu");
    }
}
