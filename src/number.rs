// Arbitrary-precision complex numbers backing the interpreter's numeric tower.
// Field operations are exact decimal arithmetic; transcendental functions run
// through Complex<f64> and convert back, so their precision is that of the
// host floats.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_complex::Complex;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

/// A complex number with `BigDecimal` components. A number is *real* iff its
/// imaginary component is exactly zero; integer-only operations additionally
/// require the real component to carry no fractional part.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub re: BigDecimal,
    pub im: BigDecimal,
}

impl Number {
    pub fn new(re: BigDecimal, im: BigDecimal) -> Self {
        Number { re, im }
    }

    pub fn real(re: BigDecimal) -> Self {
        Number {
            re,
            im: BigDecimal::zero(),
        }
    }

    pub fn zero() -> Self {
        Self::real(BigDecimal::zero())
    }

    pub fn from_i64(n: i64) -> Self {
        Self::real(BigDecimal::from(n))
    }

    pub fn from_usize(n: usize) -> Self {
        Self::real(BigDecimal::from(n as u64))
    }

    pub fn from_f64(x: f64) -> Option<Self> {
        BigDecimal::from_f64(x).map(Self::real)
    }

    /// Parse a signed decimal literal with optional fractional part.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.strip_prefix('+').unwrap_or(text);
        BigDecimal::from_str(text).ok().map(Self::real)
    }

    pub fn is_real(&self) -> bool {
        self.im.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.re.is_zero() && self.im.is_zero()
    }

    /// True when the number is real and carries no fractional part.
    pub fn is_integer(&self) -> bool {
        self.is_real() && self.re.is_integer()
    }

    pub fn real_part(&self) -> Number {
        Self::real(self.re.clone())
    }

    pub fn imag_part(&self) -> Number {
        Self::real(self.im.clone())
    }

    pub fn add(&self, other: &Number) -> Number {
        Number::new(&self.re + &other.re, &self.im + &other.im)
    }

    pub fn subtract(&self, other: &Number) -> Number {
        Number::new(&self.re - &other.re, &self.im - &other.im)
    }

    pub fn negate(&self) -> Number {
        Number::new(-&self.re, -&self.im)
    }

    pub fn multiply(&self, other: &Number) -> Number {
        let re = &self.re * &other.re - &self.im * &other.im;
        let im = &self.re * &other.im + &self.im * &other.re;
        Number::new(re, im)
    }

    /// Complex division. The caller must reject a zero divisor first.
    pub fn divide(&self, other: &Number) -> Number {
        let denom = &other.re * &other.re + &other.im * &other.im;
        let re = (&self.re * &other.re + &self.im * &other.im) / &denom;
        let im = (&self.im * &other.re - &self.re * &other.im) / &denom;
        Number::new(re, im)
    }

    /// Exponentiation. Integer exponents of modest size are computed exactly
    /// by repeated multiplication; everything else goes through the float
    /// fallback. Returns `None` when the result is not representable
    /// (e.g. `0 ** -1`, or a float overflow).
    pub fn pow(&self, exponent: &Number) -> Option<Number> {
        if exponent.is_integer() {
            if let Some(n) = exponent.re.to_i64() {
                if n.unsigned_abs() <= 4096 {
                    return self.powi(n);
                }
            }
        }
        let c = self.to_c64()?.powc(exponent.to_c64()?);
        Number::from_c64(c)
    }

    fn powi(&self, n: i64) -> Option<Number> {
        let mut acc = Number::from_i64(1);
        let mut base = self.clone();
        let mut k = n.unsigned_abs();
        while k > 0 {
            if k & 1 == 1 {
                acc = acc.multiply(&base);
            }
            base = base.multiply(&base);
            k >>= 1;
        }
        if n < 0 {
            if acc.is_zero() {
                return None;
            }
            Some(Number::from_i64(1).divide(&acc))
        } else {
            Some(acc)
        }
    }

    /// Natural logarithm, complex-capable. `None` for log of zero.
    pub fn log(&self) -> Option<Number> {
        if self.is_zero() {
            return None;
        }
        Number::from_c64(self.to_c64()?.ln())
    }

    pub fn sin(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.sin())
    }

    pub fn cos(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.cos())
    }

    pub fn tan(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.tan())
    }

    pub fn sinh(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.sinh())
    }

    pub fn cosh(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.cosh())
    }

    pub fn tanh(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.tanh())
    }

    pub fn asin(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.asin())
    }

    pub fn acos(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.acos())
    }

    pub fn atan(&self) -> Option<Number> {
        Number::from_c64(self.to_c64()?.atan())
    }

    /// Inverse hyperbolics are real-only; the caller checks `is_real`.
    pub fn asinh(&self) -> Option<Number> {
        Number::from_f64(self.re.to_f64()?.asinh())
    }

    pub fn acosh(&self) -> Option<Number> {
        Number::from_f64(self.re.to_f64()?.acosh())
    }

    pub fn atanh(&self) -> Option<Number> {
        Number::from_f64(self.re.to_f64()?.atanh())
    }

    /// Rounding family: real-only, checked by the caller.
    pub fn floor(&self) -> Number {
        Self::real(self.re.with_scale_round(0, RoundingMode::Floor))
    }

    pub fn ceiling(&self) -> Number {
        Self::real(self.re.with_scale_round(0, RoundingMode::Ceiling))
    }

    pub fn round(&self) -> Number {
        Self::real(self.re.with_scale_round(0, RoundingMode::HalfUp))
    }

    pub fn truncate(&self) -> Number {
        Self::real(self.re.with_scale_round(0, RoundingMode::Down))
    }

    /// Remainder carrying the dividend's sign. Real operands, nonzero divisor.
    pub fn remainder(&self, divisor: &Number) -> Number {
        Self::real(&self.re % &divisor.re)
    }

    /// Modulo carrying the divisor's sign. Real operands, nonzero divisor.
    pub fn modulo(&self, divisor: &Number) -> Number {
        let r = &self.re % &divisor.re;
        if !r.is_zero() && r.is_negative() != divisor.re.is_negative() {
            Self::real(r + &divisor.re)
        } else {
            Self::real(r)
        }
    }

    /// Ordering on the real components; callers require both operands real.
    pub fn cmp_real(&self, other: &Number) -> std::cmp::Ordering {
        self.re.cmp(&other.re)
    }

    /// The integer value of the real component, when there is one.
    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.re.to_i64()
        } else {
            None
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.re.to_f64()
    }

    /// The integer part of the real component rendered in the given radix,
    /// for the printf radix directives.
    pub fn to_radix_string(&self, radix: u32) -> String {
        let truncated = self.re.with_scale_round(0, RoundingMode::Down);
        let (int, _): (BigInt, i64) = truncated.into_bigint_and_exponent();
        int.to_str_radix(radix)
    }

    fn to_c64(&self) -> Option<Complex<f64>> {
        Some(Complex::new(self.re.to_f64()?, self.im.to_f64()?))
    }

    fn from_c64(c: Complex<f64>) -> Option<Number> {
        let re = BigDecimal::from_f64(c.re)?;
        let im = BigDecimal::from_f64(c.im)?;
        Some(Number::new(re, im))
    }
}

fn format_component(d: &BigDecimal) -> String {
    d.normalized().to_string()
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_real() {
            write!(f, "{}", format_component(&self.re))
        } else if self.im.is_negative() {
            write!(
                f,
                "{}-{}i",
                format_component(&self.re),
                format_component(&self.im.abs())
            )
        } else {
            write!(
                f,
                "{}+{}i",
                format_component(&self.re),
                format_component(&self.im)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Number {
        Number::from_i64(n)
    }

    #[test]
    fn display_trims_trailing_zeros() {
        let n = Number::parse("1.500").unwrap();
        assert_eq!(n.to_string(), "1.5");
        assert_eq!(int(720).to_string(), "720");
        assert_eq!(Number::parse("-0.25").unwrap().to_string(), "-0.25");
    }

    #[test]
    fn display_complex_forms() {
        let n = Number::new(BigDecimal::from(3), BigDecimal::from(2));
        assert_eq!(n.to_string(), "3+2i");
        let n = Number::new(BigDecimal::from(3), BigDecimal::from(-2));
        assert_eq!(n.to_string(), "3-2i");
    }

    #[test]
    fn equality_ignores_scale() {
        assert_eq!(Number::parse("1.0").unwrap(), int(1));
    }

    #[test]
    fn modulo_takes_divisor_sign() {
        assert_eq!(int(7).modulo(&int(3)), int(1));
        assert_eq!(int(-7).modulo(&int(3)), int(2));
        assert_eq!(int(7).modulo(&int(-3)), int(-2));
        assert_eq!(int(-7).modulo(&int(-3)), int(-1));
    }

    #[test]
    fn remainder_takes_dividend_sign() {
        assert_eq!(int(7).remainder(&int(3)), int(1));
        assert_eq!(int(-7).remainder(&int(3)), int(-1));
        assert_eq!(int(7).remainder(&int(-3)), int(1));
        assert_eq!(int(-7).remainder(&int(-3)), int(-1));
    }

    #[test]
    fn complex_multiply() {
        let i = Number::new(BigDecimal::zero(), BigDecimal::from(1));
        assert_eq!(i.multiply(&i), int(-1));
    }

    #[test]
    fn division_is_exact_for_decimals() {
        let q = int(1).divide(&int(4));
        assert_eq!(q, Number::parse("0.25").unwrap());
    }

    #[test]
    fn integer_pow_is_exact() {
        assert_eq!(int(2).pow(&int(10)).unwrap(), int(1024));
        assert_eq!(int(2).pow(&int(-2)).unwrap(), Number::parse("0.25").unwrap());
        assert!(int(0).pow(&int(-1)).is_none());
    }

    #[test]
    fn rounding_family() {
        let x = Number::parse("2.5").unwrap();
        assert_eq!(x.floor(), int(2));
        assert_eq!(x.ceiling(), int(3));
        assert_eq!(x.round(), int(3));
        assert_eq!(x.truncate(), int(2));
        let y = Number::parse("-2.5").unwrap();
        assert_eq!(y.floor(), int(-3));
        assert_eq!(y.ceiling(), int(-2));
        assert_eq!(y.truncate(), int(-2));
    }

    #[test]
    fn radix_strings_use_integer_part() {
        assert_eq!(int(255).to_radix_string(16), "ff");
        assert_eq!(int(8).to_radix_string(8), "10");
        assert_eq!(int(5).to_radix_string(2), "101");
        assert_eq!(Number::parse("255.75").unwrap().to_radix_string(16), "ff");
    }

    #[test]
    fn integer_detection() {
        assert!(int(3).is_integer());
        assert!(Number::parse("3.00").unwrap().is_integer());
        assert!(!Number::parse("3.5").unwrap().is_integer());
        assert!(!Number::new(BigDecimal::from(1), BigDecimal::from(1)).is_integer());
    }
}
