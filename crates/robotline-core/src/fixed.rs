use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Money is fixed-point so accounting stays deterministic across platforms.
pub type Money = Fixed64;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Money. Use only for initialization, never in sim loop.
#[inline]
pub fn money(v: f64) -> Money {
    Money::from_num(v)
}

/// Convert Money to f64. Use only for display, never in sim loop.
#[inline]
pub fn money_to_f64(v: Money) -> f64 {
    v.to_num::<f64>()
}

/// Convert an f64 probability to Fixed64. Use only for initialization.
#[inline]
pub fn rate(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_arithmetic() {
        let a = money(1.5);
        let b = money(2.0);
        assert_eq!(money_to_f64(a + b), 3.5);
    }

    #[test]
    fn money_determinism() {
        let a = money(1.0 / 3.0);
        let b = money(1.0 / 3.0);
        assert_eq!(a, b);
    }

    #[test]
    fn money_ordering() {
        assert!(money(2.99) < money(3.0));
    }
}
