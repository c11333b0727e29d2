use argmin::argmin_error_closure;
use argmin::core::{
    ArgminFloat, Error, Gradient, Hessian, IterState, Problem, Solver, State, TerminationReason,
    TerminationStatus, KV,
};

/// Newton's method on the distance between a curve and a point,
/// with the parameter kept inside the knot domain
#[derive(Clone, Copy, Debug)]
pub struct ClosestParameterNewton<F> {
    /// domain of the parameter
    knot_domain: (F, F),
    /// wrap the parameter around the domain instead of clamping it
    closed: bool,
    /// parameter step under which the search stops
    tolerance: F,
}

impl<F: ArgminFloat> ClosestParameterNewton<F> {
    pub fn new(knot_domain: (F, F), closed: bool, tolerance: F) -> Self {
        Self {
            knot_domain,
            closed,
            tolerance,
        }
    }

    /// Bring a parameter back into the domain
    fn constrain(&self, u: F) -> F {
        let (min, max) = self.knot_domain;
        if self.closed {
            let range = max - min;
            let mut offset = (u - min) % range;
            if offset < F::zero() {
                offset = offset + range;
            }
            min + offset
        } else if u < min {
            min
        } else if u > max {
            max
        } else {
            u
        }
    }
}

impl<O, F> Solver<O, IterState<F, F, (), F, (), F>> for ClosestParameterNewton<F>
where
    O: Gradient<Param = F, Gradient = F> + Hessian<Param = F, Hessian = F>,
    F: ArgminFloat,
{
    const NAME: &'static str = "Closest parameter newton method";

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: IterState<F, F, (), F, (), F>,
    ) -> Result<(IterState<F, F, (), F, (), F>, Option<KV>), Error> {
        let param = *state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            "closest parameter search requires an initial parameter"
        ))?;

        let grad = problem.gradient(&param)?;
        let hessian = problem.hessian(&param)?;
        // a flat or undefined step leaves the parameter where it is, which ends the search
        if hessian == F::zero() {
            return Ok((state.param(param), None));
        }
        let next = param - grad / hessian;
        let next = if next.is_finite() {
            self.constrain(next)
        } else {
            param
        };

        Ok((state.param(next), None))
    }

    fn terminate(&mut self, state: &IterState<F, F, (), F, (), F>) -> TerminationStatus {
        if state.iter > state.max_iters {
            return TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        }

        match (state.get_param(), state.get_prev_param()) {
            (Some(current), Some(prev)) if (*current - *prev).abs() <= self.tolerance => {
                TerminationStatus::Terminated(TerminationReason::SolverConverged)
            }
            _ => TerminationStatus::NotTerminated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ClosestParameterNewton;

    #[test]
    fn open_domain_clamps() {
        let solver = ClosestParameterNewton::new((0., 2.), false, 1e-12);
        assert_eq!(solver.constrain(-0.5), 0.);
        assert_eq!(solver.constrain(2.5), 2.);
        assert_eq!(solver.constrain(1.25), 1.25);
    }

    #[test]
    fn closed_domain_wraps() {
        let solver = ClosestParameterNewton::new((1., 3.), true, 1e-12);
        assert_eq!(solver.constrain(0.5), 2.5);
        assert_eq!(solver.constrain(3.5), 1.5);
        assert_eq!(solver.constrain(2.), 2.);
    }
}
