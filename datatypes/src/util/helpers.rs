/// This macro allows comparing float slices using [float_cmp::approx_eq].
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr $(,)?) => ({
        if !$crate::util::helpers::approx_eq_floats($left, $right) {
            panic!(r#"assertion failed: `(left == right)`
            left: `{:?}`,
           right: `{:?}`"#, $left, $right)
        }
    });
    ($left:expr, $right:expr, $($arg:tt)+) => ({
        if !$crate::util::helpers::approx_eq_floats($left, $right) {
            panic!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`: {}"#, $left, $right,
                           format_args!($($arg)+))
        }
    });
}

/// Compares two float slices element-wise. Two `NaN`s are considered equal so that
/// statistics with undefined fields can be compared as a whole.
#[must_use]
pub fn approx_eq_floats(left: &[f64], right: &[f64]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    left.iter()
        .zip(right)
        .all(|(&l, &r)| (l.is_nan() && r.is_nan()) || float_cmp::approx_eq!(f64, l, r))
}

/// Bitwise hashing key for a float, so that value types with float fields can implement `Eq` and `Hash`.
/// `-0.0` and `0.0` are treated as the same value.
#[inline]
#[allow(clippy::float_cmp)]
pub(crate) fn float_key(value: f64) -> u64 {
    if value == 0.0 { 0 } else { value.to_bits() }
}
