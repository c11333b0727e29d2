use std::ops::Index;

use itertools::Itertools;
use nalgebra::convert;
use simba::scalar::SupersetOf;

use crate::error::{ensure, scalar, NurbsError, Result};
use crate::misc::{FloatingPoint, Invertible};

use super::KnotMultiplicity;

/// Knot vector representation
///
/// A non-decreasing sequence of parameter values. The degree of a spline is
/// never stored next to it: it follows from `knots.len() - control_points.len() - 1`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnotVector<T>(Vec<T>);

impl<T: FloatingPoint> KnotVector<T> {
    /// Wrap a sequence of knots without validating it
    pub fn new(knots: Vec<T>) -> Self {
        Self(knots)
    }

    /// Wrap a sequence of knots after checking that it is finite and non-decreasing
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// assert!(KnotVector::try_new(vec![0., 0., 1., 1.]).is_ok());
    /// assert!(KnotVector::try_new(vec![0., 1., 0.5, 1.]).is_err());
    /// ```
    pub fn try_new(knots: Vec<T>) -> Result<Self> {
        let knots = Self(knots);
        knots.validate()?;
        Ok(knots)
    }

    /// Check that the knots are finite and non-decreasing
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.0.is_empty(),
            NurbsError::MalformedKnotVector("knot vector is empty".to_string())
        );
        if let Some(i) = self.0.iter().position(|k| !k.is_finite()) {
            return Err(NurbsError::MalformedKnotVector(format!(
                "knot {} is not finite",
                i
            )));
        }
        if let Some((i, (a, b))) = self
            .0
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| b < a)
        {
            return Err(NurbsError::MalformedKnotVector(format!(
                "knots {} and {} decrease ({} > {})",
                i,
                i + 1,
                scalar(*a),
                scalar(*b)
            )));
        }
        Ok(())
    }

    /// Create an open knot vector on [0, 1] with `degree + 1` multiplicity at both ends
    /// and the interior values spread evenly
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// let knots = KnotVector::<f64>::try_open_uniform(7, 3).unwrap();
    /// assert_eq!(
    ///     knots.to_vec(),
    ///     vec![0., 0., 0., 0., 0.25, 0.5, 0.75, 1., 1., 1., 1.]
    /// );
    /// ```
    pub fn try_open_uniform(control_point_count: usize, degree: usize) -> Result<Self> {
        ensure!(
            control_point_count > degree,
            NurbsError::DimensionMismatch(format!(
                "{} control points are too few for degree {}",
                control_point_count, degree
            ))
        );
        let intervals = control_point_count - degree;
        let inv = T::one() / convert::<f64, T>(intervals as f64);
        let mut knots = vec![T::zero(); degree];
        knots.extend((0..=intervals).map(|i| convert::<f64, T>(i as f64) * inv));
        knots.extend(std::iter::repeat_n(T::one(), degree));
        Ok(Self(knots))
    }

    /// Create a knot vector on [0, 1] where every knot has multiplicity one,
    /// as used for closed curves
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// let knots = KnotVector::<f64>::try_periodic(3, 2).unwrap();
    /// assert_eq!(knots.len(), 6);
    /// assert_eq!(knots[1], 0.2);
    /// ```
    pub fn try_periodic(control_point_count: usize, degree: usize) -> Result<Self> {
        ensure!(
            control_point_count > degree,
            NurbsError::DimensionMismatch(format!(
                "{} control points are too few for degree {}",
                control_point_count, degree
            ))
        );
        let count = control_point_count + degree + 1;
        let inv = T::one() / convert::<f64, T>((count - 1) as f64);
        Ok(Self(
            (0..count)
                .map(|i| convert::<f64, T>(i as f64) * inv)
                .collect(),
        ))
    }

    /// Create a knot vector whose interior knots all have multiplicity `degree`,
    /// so that the spline is a chain of Bezier segments.
    /// The number of control points must be a multiple of the degree, plus one.
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// let knots = KnotVector::<f64>::try_unblended(7, 3).unwrap();
    /// assert_eq!(
    ///     knots.to_vec(),
    ///     vec![0., 0., 0., 0., 1., 1., 1., 2., 2., 2., 2.]
    /// );
    /// assert!(KnotVector::<f64>::try_unblended(6, 3).is_err());
    /// ```
    pub fn try_unblended(control_point_count: usize, degree: usize) -> Result<Self> {
        ensure!(
            degree > 0
                && control_point_count > degree
                && (control_point_count - 1) % degree == 0,
            NurbsError::DimensionMismatch(format!(
                "unblended knots need a multiple of the degree plus one control points, got {} for degree {}",
                control_point_count, degree
            ))
        );
        let parts = (control_point_count - 1) / degree;
        let mut knots = vec![T::zero()];
        for i in 0..=parts {
            knots.extend(std::iter::repeat_n(convert::<f64, T>(i as f64), degree));
        }
        knots.push(convert(parts as f64));
        Ok(Self(knots))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.clone()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    /// First knot
    /// # Panics
    /// If the vector is empty, which only `KnotVector::new` can produce
    pub fn first(&self) -> T {
        self.0[0]
    }

    /// Last knot
    /// # Panics
    /// If the vector is empty, which only `KnotVector::new` can produce
    pub fn last(&self) -> T {
        self.0[self.0.len() - 1]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Get the domain of the knot vector by degree
    pub fn domain(&self, degree: usize) -> (T, T) {
        (self.0[degree], self.0[self.0.len() - 1 - degree])
    }

    /// Get the multiplicity of each distinct knot
    /// # Example
    /// ```
    /// use nurbskit::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 0.5, 0.5, 1., 1., 1.]);
    /// let knot_multiplicity = knots.multiplicity();
    /// assert_eq!(knot_multiplicity.len(), 3);
    /// assert_eq!(knot_multiplicity[0].multiplicity(), 3);
    /// assert_eq!(knot_multiplicity[1].multiplicity(), 2);
    /// assert_eq!(*knot_multiplicity[2].knot(), 1.);
    /// ```
    pub fn multiplicity(&self) -> Vec<KnotMultiplicity<T>> {
        let mut mult: Vec<KnotMultiplicity<T>> = vec![];
        for knot in self.0.iter() {
            match mult.last_mut() {
                Some(current) if current.knot() == knot => current.increment_multiplicity(),
                _ => mult.push(KnotMultiplicity::new(*knot, 1)),
            }
        }
        mult
    }

    /// Distinct knot values in ascending order
    pub fn distinct(&self) -> Vec<T> {
        self.0.iter().copied().dedup().collect()
    }

    /// Locate a knot value: returns the index of its last occurrence and its multiplicity
    pub fn multiplicity_of(&self, knot: T) -> Option<(usize, usize)> {
        let last = self.0.iter().rposition(|k| *k == knot)?;
        let count = self.0[..=last]
            .iter()
            .rev()
            .take_while(|k| **k == knot)
            .count();
        Some((last, count))
    }

    /// Check if the knot vector is clamped
    /// `clamped` means the first and last knots have a multiplicity greater than the degree
    /// e.g. [0, 0, 0, 1, 2, 3, 3, 3] with degree 2 is clamped
    pub fn is_clamped(&self, degree: usize) -> bool {
        let multiplicity = self.multiplicity();
        match (multiplicity.first(), multiplicity.last()) {
            (Some(start), Some(end)) => {
                start.multiplicity() > degree && end.multiplicity() > degree
            }
            _ => false,
        }
    }

    /// Find the knot span index by binary search
    ///
    /// `n` is the number of control points minus one. The span `s` satisfies
    /// `U[s] <= u < U[s + 1]`, except at the upper bound `u == U[n + 1]` where `n` is returned.
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 4., 4., 4.]);
    /// assert_eq!(knots.find_span(5, 2, 0.).unwrap(), 2);
    /// assert_eq!(knots.find_span(5, 2, 2.5).unwrap(), 4);
    /// assert_eq!(knots.find_span(5, 2, 4.).unwrap(), 5);
    /// assert!(knots.find_span(5, 2, 4.5).is_err());
    /// ```
    pub fn find_span(&self, n: usize, degree: usize, u: T) -> Result<usize> {
        ensure!(
            degree <= n && n + 1 < self.len(),
            NurbsError::DimensionMismatch(format!(
                "no span for degree {} and {} control points in a vector of {} knots",
                degree,
                n + 1,
                self.len()
            ))
        );

        let (min, max) = (self[0], self[n + 1]);
        ensure!(
            u >= min && u <= max,
            NurbsError::out_of_domain(u, min, max)
        );

        if u == max {
            return Ok(n);
        }
        if u < self[degree] {
            return Ok(degree);
        }

        // a sound vector halves [low, high) on every step, so this bound is never reached
        let limit = 2 * (usize::BITS - self.len().leading_zeros()) as usize + 2;

        let mut low = degree;
        let mut high = n + 1;
        let mut mid = (low + high) / 2;
        let mut iterations = 0;
        while u < self[mid] || self[mid + 1] <= u {
            if u < self[mid] {
                high = mid;
            } else {
                low = mid;
            }
            let next = (low + high) / 2;
            iterations += 1;
            if next == mid || iterations > limit {
                return Err(NurbsError::MalformedKnotVector(format!(
                    "span search for {} did not converge",
                    scalar(u)
                )));
            }
            mid = next;
        }

        Ok(mid)
    }

    /// Span lookup for vectors already validated by a caller.
    /// `u` below `U[degree]` maps to `degree`, `u` at or above `U[n + 1]` maps to `n`.
    pub(crate) fn locate_span(&self, n: usize, degree: usize, u: T) -> usize {
        if u >= self[n + 1] {
            return n;
        }
        let s = self.0[..=n].partition_point(|k| *k <= u);
        s.saturating_sub(1).clamp(degree, n)
    }

    /// Compute the non-vanishing basis functions at `u` for the given span
    ///
    /// # Example
    /// ```
    /// use nurbskit::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// let span = knots.find_span(4, 2, 1.5).unwrap();
    /// let basis = knots.basis_functions(span, 1.5, 2);
    /// assert_eq!(basis, vec![0.125, 0.75, 0.125]);
    /// ```
    pub fn basis_functions(&self, knot_span_index: usize, u: T, degree: usize) -> Vec<T> {
        let mut basis_functions = vec![T::zero(); degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        basis_functions[0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[knot_span_index + 1 - j];
            right[j] = self[knot_span_index + j] - u;
            let mut saved = T::zero();

            for r in 0..j {
                let temp = basis_functions[r] / (right[r + 1] + left[j - r]);
                basis_functions[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }

            basis_functions[j] = saved;
        }

        basis_functions
    }

    /// Compute the non-vanishing basis functions and their derivatives.
    ///
    /// Returns `derivs + 1` rows of `degree + 1` values: row `k` holds the `k`-th derivatives
    /// and row 0 the basis function values. Rows above the degree are zero.
    pub fn derivative_basis_functions(
        &self,
        knot_span_index: usize,
        u: T,
        degree: usize,
        derivs: usize,
    ) -> Vec<Vec<T>> {
        let p = degree;
        let du = derivs.min(p);

        let mut ndu = vec![vec![T::zero(); p + 1]; p + 1];
        let mut left = vec![T::zero(); p + 1];
        let mut right = vec![T::zero(); p + 1];

        ndu[0][0] = T::one();

        for j in 1..=p {
            left[j] = u - self[knot_span_index + 1 - j];
            right[j] = self[knot_span_index + j] - u;

            let mut saved = T::zero();
            for r in 0..j {
                // lower triangle
                ndu[j][r] = right[r + 1] + left[j - r];
                let temp = ndu[r][j - 1] / ndu[j][r];

                // upper triangle
                ndu[r][j] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            ndu[j][j] = saved;
        }

        let mut ders = vec![vec![T::zero(); p + 1]; derivs + 1];
        for j in 0..=p {
            ders[0][j] = ndu[j][p];
        }

        // two alternating rows of derivative coefficients
        let mut a = vec![vec![T::zero(); p + 1]; 2];

        for r in 0..=p {
            let mut s1 = 0;
            let mut s2 = 1;
            a[0][0] = T::one();

            for k in 1..=du {
                let mut d = T::zero();
                let rk = r as isize - k as isize;
                let pk = p - k;

                if r >= k {
                    a[s2][0] = a[s1][0] / ndu[pk + 1][r - k];
                    d = a[s2][0] * ndu[r - k][pk];
                }

                let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
                let j2 = if r <= pk + 1 { k - 1 } else { p - r };

                for j in j1..=j2 {
                    let rkj = (rk + j as isize) as usize;
                    a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][rkj];
                    d += a[s2][j] * ndu[rkj][pk];
                }

                if r <= pk {
                    a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                    d += a[s2][k] * ndu[r][pk];
                }

                ders[k][r] = d;
                std::mem::swap(&mut s1, &mut s2);
            }
        }

        let mut acc = p;
        for row in ders.iter_mut().take(du + 1).skip(1).enumerate() {
            let (k, row) = (row.0 + 1, row.1);
            let factor = convert::<f64, T>(acc as f64);
            row.iter_mut().for_each(|v| *v *= factor);
            acc *= p - k;
        }

        ders
    }

    /// Cast the knot vector to another floating point type
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// let knots: KnotVector<f64> = KnotVector::new(vec![1., 2., 3., 4., 5., 6.]);
    /// let knots2 = knots.cast::<f32>();
    /// assert_eq!(knots2.first(), 1.0_f32);
    /// ```
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> KnotVector<F> {
        KnotVector::new(self.0.iter().map(|v| convert(*v)).collect())
    }
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> FromIterator<T> for KnotVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: FloatingPoint> Invertible for KnotVector<T> {
    /// Reverses the knot vector, mirroring the values inside its range
    /// # Example
    /// ```
    /// use nurbskit::prelude::*;
    /// let mut knots = KnotVector::new(vec![0., 0., 0., 1., 3., 6., 6., 8., 8., 8.]);
    /// knots.invert();
    /// assert_eq!(knots.to_vec(), vec![0., 0., 0., 2., 2., 5., 7., 8., 8., 8.]);
    /// ```
    fn invert(&mut self) {
        if self.0.is_empty() {
            return;
        }
        let sum = self.first() + self.last();
        self.0 = self.0.iter().rev().map(|k| sum - *k).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::KnotVector;
    use crate::error::NurbsError;
    use approx::assert_relative_eq;

    #[test]
    fn span_at_both_ends() {
        let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 4., 4., 4.]);
        assert_eq!(knots.find_span(5, 2, 0.).unwrap(), 2);
        assert_eq!(knots.find_span(5, 2, 4.).unwrap(), 5);
    }

    #[test]
    fn span_brackets_parameter() {
        let knots = KnotVector::new(vec![0., 0., 0., 0., 0.5, 0.5, 1., 2., 2., 2., 2.]);
        let n = 6;
        for i in 0..=40 {
            let u = i as f64 / 20.;
            let s = knots.find_span(n, 3, u).unwrap();
            assert!((3..=n).contains(&s));
            if u < 2. {
                assert!(knots[s] <= u && u < knots[s + 1], "u = {}", u);
            } else {
                assert_eq!(s, n);
            }
        }
    }

    #[test]
    fn span_skips_repeated_interior_knots() {
        let knots = KnotVector::new(vec![0., 0., 0., 0.5, 0.5, 1., 1., 1.]);
        assert_eq!(knots.find_span(4, 2, 0.5).unwrap(), 4);
        assert_eq!(knots.find_span(4, 2, 0.49).unwrap(), 2);
    }

    #[test]
    fn locate_span_agrees_with_search() {
        let knots = KnotVector::new(vec![0., 0., 0., 1., 1., 2., 3., 3., 3.]);
        for i in 0..=30 {
            let u = i as f64 / 10.;
            assert_eq!(
                knots.locate_span(5, 2, u),
                knots.find_span(5, 2, u).unwrap(),
                "u = {}",
                u
            );
        }
    }

    #[test]
    fn span_out_of_domain() {
        let knots = KnotVector::new(vec![0., 0., 1., 1.]);
        let err = knots.find_span(1, 1, -0.1).unwrap_err();
        assert!(matches!(err, NurbsError::OutOfDomain { .. }));
        let err = knots.find_span(1, 1, f64::NAN).unwrap_err();
        assert!(matches!(err, NurbsError::OutOfDomain { .. }));
    }

    #[test]
    fn span_search_terminates_on_malformed_knots() {
        let knots = KnotVector::new(vec![0., 0., 0., 5., 1., 2., 0.5, 6., 6., 6.]);
        let res = knots.find_span(6, 2, 3.);
        assert_eq!(
            std::mem::discriminant(&res.unwrap_err()),
            std::mem::discriminant(&NurbsError::MalformedKnotVector(String::new()))
        );
    }

    #[test]
    fn span_rejects_inconsistent_sizes() {
        let knots = KnotVector::new(vec![0., 0., 1., 1.]);
        assert!(matches!(
            knots.find_span(3, 1, 0.5),
            Err(NurbsError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn partition_of_unity() {
        let knots = KnotVector::new(vec![0., 0., 0., 0., 0.3, 0.3, 0.7, 1., 1., 1., 1.]);
        let n = 6;
        for i in 0..=50 {
            let u = i as f64 / 50.;
            let s = knots.find_span(n, 3, u).unwrap();
            let basis = knots.basis_functions(s, u, 3);
            assert_eq!(basis.len(), 4);
            assert_relative_eq!(basis.iter().sum::<f64>(), 1., epsilon = 1e-12);
            assert!(basis.iter().all(|b| *b >= -1e-14));
        }
    }

    #[test]
    fn derivative_rows_match_basis_functions() {
        let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
        let u = 1.3;
        let s = knots.find_span(4, 2, u).unwrap();
        let basis = knots.basis_functions(s, u, 2);
        let ders = knots.derivative_basis_functions(s, u, 2, 2);
        assert_eq!(ders.len(), 3);
        for (a, b) in basis.iter().zip(ders[0].iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        // derivatives of a partition of unity sum to zero
        assert_relative_eq!(ders[1].iter().sum::<f64>(), 0., epsilon = 1e-12);
        assert_relative_eq!(ders[2].iter().sum::<f64>(), 0., epsilon = 1e-12);
    }

    #[test]
    fn first_derivative_matches_finite_difference() {
        let knots = KnotVector::new(vec![0., 0., 0., 0., 0.4, 0.6, 1., 1., 1., 1.]);
        let (u, h) = (0.5, 1e-6);
        let s = knots.find_span(5, 3, u).unwrap();
        let ders = knots.derivative_basis_functions(s, u, 3, 1);
        let plus = knots.basis_functions(s, u + h, 3);
        let minus = knots.basis_functions(s, u - h, 3);
        for j in 0..=3 {
            let fd = (plus[j] - minus[j]) / (2. * h);
            assert_relative_eq!(ders[1][j], fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn derivatives_above_degree_are_zero() {
        let knots = KnotVector::new(vec![0., 0., 1., 1.]);
        let ders = knots.derivative_basis_functions(1, 0.25, 1, 3);
        assert_eq!(ders.len(), 4);
        assert_eq!(ders[1], vec![-1., 1.]);
        assert!(ders[2].iter().chain(ders[3].iter()).all(|v| *v == 0.));
    }

    #[test]
    fn multiplicity_lookup() {
        let knots = KnotVector::new(vec![0., 0., 0., 0.5, 0.5, 1., 1., 1.]);
        assert_eq!(knots.multiplicity_of(0.5), Some((4, 2)));
        assert_eq!(knots.multiplicity_of(1.), Some((7, 3)));
        assert_eq!(knots.multiplicity_of(0.25), None);
        assert_eq!(knots.distinct(), vec![0., 0.5, 1.]);
        assert!(knots.is_clamped(2));
        assert!(!knots.is_clamped(3));
    }

    #[test]
    fn validation() {
        assert!(KnotVector::<f64>::try_new(vec![]).is_err());
        assert!(KnotVector::try_new(vec![0., f64::INFINITY]).is_err());
        assert!(KnotVector::try_new(vec![0., 0., 1., 1.]).is_ok());
    }

    #[test]
    fn end_knots() {
        let knots = KnotVector::new(vec![-1., 0., 2., 3.]);
        assert_eq!(knots.first(), -1.);
        assert_eq!(knots.last(), 3.);
    }

    #[test]
    #[should_panic]
    fn first_of_an_empty_vector_panics() {
        KnotVector::<f64>::new(vec![]).first();
    }
}
