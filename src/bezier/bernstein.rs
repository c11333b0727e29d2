use crate::misc::FloatingPoint;

/// Evaluate a power basis polynomial by Horner's rule.
/// `coefficients` start from the lowest degree.
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// // 1 + 2u + 3u^2
/// assert_eq!(horner(&[1., 2., 3.], 2.), 17.);
/// ```
pub fn horner<T: FloatingPoint>(coefficients: &[T], u: T) -> T {
    coefficients
        .iter()
        .rev()
        .fold(T::zero(), |c, a| c * u + *a)
}

/// Value of the Bernstein polynomial `B(i, n)` at `u`
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// assert_eq!(bernstein(1, 2, 0.5), 0.5);
/// assert_eq!(bernstein(3, 2, 0.5), 0.);
/// ```
pub fn bernstein<T: FloatingPoint>(i: usize, n: usize, u: T) -> T {
    if i > n {
        return T::zero();
    }

    let mut temp = vec![T::zero(); n + 1];
    temp[n - i] = T::one();
    let u1 = T::one() - u;
    for k in 1..=n {
        for j in (k..=n).rev() {
            temp[j] = u1 * temp[j] + u * temp[j - 1];
        }
    }
    temp[n]
}

/// Values of all the `n + 1` Bernstein polynomials of degree `n` at `u`
/// # Example
/// ```
/// use nurbskit::prelude::*;
/// assert_eq!(all_bernstein(2, 0.5), vec![0.25, 0.5, 0.25]);
/// ```
pub fn all_bernstein<T: FloatingPoint>(n: usize, u: T) -> Vec<T> {
    let mut b = vec![T::zero(); n + 1];
    b[0] = T::one();
    let u1 = T::one() - u;
    for j in 1..=n {
        let mut saved = T::zero();
        for k in 0..j {
            let temp = b[k];
            b[k] = saved + u1 * temp;
            saved = u * temp;
        }
        b[j] = saved;
    }
    b
}
