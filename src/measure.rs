//! Simple zero-overhead unit of measure types
//!
//! Keeps units correct by construction while leaving the storage type visible,
//! which matters here because nearly every FIT field has its own integer width
//! and scale.

use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Div, Mul, Sub};

use approx::{AbsDiffEq, RelativeEq, relative_eq};
use num_traits::{Float, Num};

/// Lossless conversion between two units of the same dimension, going through
/// `f64`.
pub trait FromUnit<U> {
    fn from_unit(u: U) -> Self;
}

macro_rules! unit_of_measure {
    ($u:ident) => {
        #[derive(Clone, Copy, Default, PartialEq, PartialOrd, Debug)]
        pub struct $u<N: Num>(pub N);

        impl<N> Add for $u<N>
        where
            N: Num + Add,
        {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl<N> Sub for $u<N>
        where
            N: Num + Sub,
        {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl<N> AddAssign for $u<N>
        where
            N: Num + AddAssign,
        {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        // Relative equality traits for appox support

        impl<N> AbsDiffEq for $u<N>
        where
            N: Num + Float + AbsDiffEq<N, Epsilon = N>,
        {
            type Epsilon = N;

            fn default_epsilon() -> Self::Epsilon {
                N::epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                self.0.abs_diff_eq(&other.0, epsilon)
            }
        }

        impl<N> RelativeEq for $u<N>
        where
            N: Num + Float + AbsDiffEq<N, Epsilon = N> + RelativeEq<N>,
        {
            fn default_max_relative() -> Self::Epsilon {
                N::epsilon()
            }

            fn relative_eq(
                &self,
                other: &Self,
                epsilon: Self::Epsilon,
                max_relative: Self::Epsilon,
            ) -> bool {
                relative_eq!(
                    self.0,
                    other.0,
                    epsilon = epsilon,
                    max_relative = max_relative
                )
            }
        }
    };

    ($u:ident, $base:ident / $coeff:tt) => {
        unit_of_measure!($u);
        unit_conversion!($u, 1.0 / ($coeff as f64), $base);
    };
}

macro_rules! unit_conversion {
    ($u:ident, $coeff:expr, $base:ident) => {
        impl<N> FromUnit<$u<N>> for $base<f64>
        where
            N: Num,
            f64: From<N>,
        {
            fn from_unit(value: $u<N>) -> Self {
                Self(<f64 as From<N>>::from(value.0) * ($coeff as f64))
            }
        }

        impl<N> FromUnit<$base<N>> for $u<f64>
        where
            N: Num,
            f64: From<N>,
        {
            fn from_unit(value: $base<N>) -> Self {
                Self(<f64 as From<N>>::from(value.0) / ($coeff as f64))
            }
        }
    };
}

macro_rules! unit_ratio_impl {
    ($ratio:ident, $num:ident, $denom:ident) => {
        impl<N> Div<$denom<N>> for $num<N>
        where
            N: Num + Div,
        {
            type Output = $ratio<N>;

            fn div(self, rhs: $denom<N>) -> Self::Output {
                $ratio(self.0 / rhs.0)
            }
        }

        impl<N> Mul<$denom<N>> for $ratio<N>
        where
            N: Num + Mul,
        {
            type Output = $num<N>;

            fn mul(self, rhs: $denom<N>) -> Self::Output {
                $num(self.0 * rhs.0)
            }
        }
    };
}

macro_rules! unit_ratio {
    ($ratio:ident, $num:ident, $denom:ident) => {
        unit_ratio_impl!($ratio, $num, $denom);
        unit_ratio_impl!($denom, $num, $ratio);
    };
}

// Time units:
unit_of_measure![Seconds];
unit_of_measure![Milliseconds, Seconds / 1000];

// Distance units:
unit_of_measure![Meters];
unit_of_measure![Centimeters, Meters / 100];

// Angular units:
unit_of_measure![Degrees];
unit_of_measure![Semicircles];

// Velocity / speed units:
unit_of_measure![MetersPerSecond];
unit_of_measure![MillimetersPerSecond, MetersPerSecond / 1000];

unit_ratio![MetersPerSecond, Meters, Seconds];

impl<T> Display for Meters<T>
where
    T: Num + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.0)
    }
}

impl Milliseconds<i64> {
    /// Converts a whole number of milliseconds to fractional seconds.
    pub fn as_seconds(self) -> Seconds<f64> {
        Seconds(self.0 as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn unit_addition() {
        let a = Meters(2);
        let b = Meters(3);
        assert_eq!(a + b, Meters(5));
    }

    #[test]
    fn unit_subtraction() {
        assert_eq!(Meters(10.5) - Meters(0.5), Meters(10.0));
    }

    #[test]
    fn unit_ratio() {
        assert_eq!(MetersPerSecond(3), Meters(6) / Seconds(2));
        assert_eq!(Seconds(2), Meters(6) / MetersPerSecond(3));
        assert_eq!(Meters(6), Seconds(2) * MetersPerSecond(3));
        assert_eq!(Meters(6), MetersPerSecond(3) * Seconds(2));
    }

    #[test]
    fn convert_divisor_coefficient() {
        assert_eq!(Centimeters(250.0), Centimeters::from_unit(Meters(2.5)));
        assert_eq!(Meters(2.5), Meters::from_unit(Centimeters(250u32)));
        assert_eq!(
            MillimetersPerSecond(4500.0),
            MillimetersPerSecond::from_unit(MetersPerSecond(4.5))
        );
    }

    #[test]
    fn milliseconds_as_seconds() {
        assert_relative_eq!(Milliseconds(90_500i64).as_seconds(), Seconds(90.5));
        assert_relative_eq!(Seconds::from_unit(Milliseconds(1500u32)), Seconds(1.5));
    }

    #[test]
    fn display_meters() {
        assert_eq!(Meters(12.5).to_string(), "12.5m");
    }
}
