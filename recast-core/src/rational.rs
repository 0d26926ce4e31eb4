//! Rational number type for precise time and rate representation.

use std::fmt;

/// Rounding policy for rescaling operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Round to the nearest integer with ties away from zero.
    ///
    /// This is the policy used for packet timestamps when converting
    /// between mismatched stream time bases.
    #[default]
    NearestAwayFromZero,
    /// Truncate toward zero.
    Zero,
}

/// A rational number represented as a numerator and denominator.
///
/// Used for precise representation of frame rates and time bases.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator
    pub num: i64,
    /// Denominator (always positive)
    pub den: i64,
}

impl Rational {
    /// Create a new rational number.
    ///
    /// # Panics
    ///
    /// Panics if denominator is zero.
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "Denominator cannot be zero");
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        Self { num, den }
    }

    /// Create a rational from an integer.
    pub fn from_int(n: i64) -> Self {
        Self { num: n, den: 1 }
    }

    /// Reduce the rational to its simplest form.
    pub fn reduce(&self) -> Self {
        if self.num == 0 {
            return Self { num: 0, den: 1 };
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs());
        Self {
            num: self.num / g as i64,
            den: self.den / g as i64,
        }
    }

    /// Convert to f64.
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Get the reciprocal of this rational.
    ///
    /// # Panics
    ///
    /// Panics if the numerator is zero.
    pub fn recip(&self) -> Self {
        assert!(self.num != 0, "Cannot take reciprocal of zero");
        Self::new(self.den, self.num)
    }

    /// Rescale a value from this time base to another, rounding to the
    /// nearest integer with ties away from zero.
    pub fn rescale(&self, value: i64, target: Rational) -> i64 {
        self.rescale_rnd(value, target, Rounding::NearestAwayFromZero)
    }

    /// Rescale a value from this time base to another with an explicit
    /// rounding policy.
    ///
    /// The intermediate product is computed in 128-bit arithmetic and the
    /// result saturates to `i64::MIN + 1 ..= i64::MAX`; `i64::MIN` is
    /// reserved for the "unknown timestamp" sentinel and is never produced
    /// by rescaling.
    pub fn rescale_rnd(&self, value: i64, target: Rational, rounding: Rounding) -> i64 {
        // value * self / target
        let num = value as i128 * self.num as i128 * target.den as i128;
        let den = self.den as i128 * target.num as i128;
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };

        let q = match rounding {
            Rounding::Zero => num / den,
            Rounding::NearestAwayFromZero => {
                if num >= 0 {
                    (num + den / 2) / den
                } else {
                    (num - den / 2) / den
                }
            }
        };

        q.clamp(i64::MIN as i128 + 1, i64::MAX as i128) as i64
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self { num: 0, den: 1 }
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_sign() {
        let r = Rational::new(1, -4);
        assert_eq!(r.num, -1);
        assert_eq!(r.den, 4);
    }

    #[test]
    fn test_reduce() {
        let r = Rational::new(50, 100).reduce();
        assert_eq!(r.num, 1);
        assert_eq!(r.den, 2);
    }

    #[test]
    fn test_rescale_nearest() {
        // 100 ticks of 1/1000 is 3.0 ticks of 1/30
        let ms = Rational::new(1, 1000);
        assert_eq!(ms.rescale(100, Rational::new(1, 30)), 3);
        // 50 ticks of 1/1000 is 1.5 ticks of 1/30: ties round away from zero
        assert_eq!(ms.rescale(50, Rational::new(1, 30)), 2);
        assert_eq!(ms.rescale(-50, Rational::new(1, 30)), -2);
    }

    #[test]
    fn test_rescale_truncating() {
        let ms = Rational::new(1, 1000);
        assert_eq!(ms.rescale_rnd(99, Rational::new(1, 30), Rounding::Zero), 2);
        assert_eq!(ms.rescale_rnd(-99, Rational::new(1, 30), Rounding::Zero), -2);
    }

    #[test]
    fn test_rescale_saturates() {
        let fine = Rational::new(1, 1_000_000_000);
        let coarse = Rational::new(1, 1);
        // Scaling up by 1e9 overflows i64 and must clamp instead of wrapping.
        assert_eq!(coarse.rescale(i64::MAX / 2, fine), i64::MAX);
        assert_eq!(coarse.rescale(i64::MIN / 2, fine), i64::MIN + 1);
    }

    #[test]
    fn test_recip() {
        let fps = Rational::new(30, 1);
        let tb = fps.recip();
        assert_eq!(tb, Rational::new(1, 30));
    }
}
