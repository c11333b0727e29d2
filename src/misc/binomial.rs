use std::collections::HashMap;

use super::FloatingPoint;

/// Returns the binomial coefficient of `n` and `k`.
/// Computed directly as a running product, nothing is cached between calls.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.;
    }
    if k == 0 || k == n {
        return 1.;
    }

    let k = k.min(n - k);
    let mut r = 1.;
    for i in 0..k {
        r = r * (n - i) as f64 / (i + 1) as f64;
    }
    r.round()
}

/// A memoized binomial coefficient calculator.
///
/// The memo lives as long as the value does, so an operation that needs many
/// coefficients creates one, passes it down by `&mut` and drops it on return.
#[derive(Debug, Clone, Default)]
pub struct Binomial<T> {
    memo: HashMap<(usize, usize), T>,
}

impl<T: FloatingPoint> Binomial<T> {
    pub fn new() -> Self {
        Self {
            memo: HashMap::new(),
        }
    }

    /// Returns the binomial coefficient of `n` and `k` with memoization.
    pub fn get(&mut self, n: usize, k: usize) -> T {
        if k > n {
            return T::zero();
        }
        if k == 0 || k == n {
            return T::one();
        }

        let k = k.min(n - k);
        if let Some(memoized) = self.memo.get(&(n, k)) {
            return *memoized;
        }

        let r = self.get(n - 1, k) + self.get(n - 1, k - 1);
        self.memo.insert((n, k), r);
        r
    }

    /// Number of memoized entries
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5, 0), 1.);
        assert_eq!(binomial(5, 1), 5.);
        assert_eq!(binomial(5, 2), 10.);
        assert_eq!(binomial(5, 3), 10.);
        assert_eq!(binomial(5, 4), 5.);
        assert_eq!(binomial(5, 5), 1.);
        assert_eq!(binomial(5, 6), 0.);
        assert_eq!(binomial(0, 0), 1.);
        assert_eq!(binomial(30, 15), 155117520.);
    }

    #[test]
    fn test_memoized_binomial() {
        let mut memo = Binomial::<f64>::new();
        assert!(memo.is_empty());
        for n in 1..20 {
            for k in 0..=n {
                assert_eq!(memo.get(n, k), binomial(n, k));
            }
        }
        assert!(!memo.is_empty());
    }

    #[test]
    fn memo_is_scoped_to_its_owner() {
        let mut a = Binomial::<f64>::new();
        a.get(10, 3);
        let b = Binomial::<f64>::new();
        assert!(a.len() > 0);
        assert_eq!(b.len(), 0);
    }
}
