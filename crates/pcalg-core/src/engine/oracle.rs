//! Thresholded independence decisions.

use crate::engine::ci_test::{CiOutcome, IndependenceTest};
use crate::engine::data::DataMatrix;
use crate::engine::errors::PcError;

/// Decision for one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// `p_value > alpha`.
    pub independent: bool,
    pub outcome: CiOutcome,
}

impl Verdict {
    pub fn p_value(&self) -> f64 {
        self.outcome.p_value
    }
}

/// An [`IndependenceTest`] paired with a significance level.
///
/// A pair is judged independent when the p-value is strictly greater than
/// `alpha`, so `alpha = 1` never separates anything and `alpha = 0` separates
/// every pair whose p-value is positive.
#[derive(Debug)]
pub struct IndependenceOracle<'t, T: ?Sized> {
    test: &'t T,
    alpha: f64,
}

impl<'t, T: IndependenceTest + ?Sized> IndependenceOracle<'t, T> {
    /// Fails with [`PcError::Configuration`] unless `alpha` is finite and in
    /// `[0, 1]`.
    pub fn new(test: &'t T, alpha: f64) -> Result<Self, PcError> {
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return Err(PcError::config(format!(
                "significance level {alpha} outside [0, 1]"
            )));
        }
        Ok(Self { test, alpha })
    }

    /// Runs the test for `x ⊥ y | cond` and thresholds it.
    pub fn query(
        &self,
        data: &DataMatrix,
        x: usize,
        y: usize,
        cond: &[usize],
    ) -> Result<Verdict, PcError> {
        let outcome = self.test.test(data, x, y, cond)?;
        Ok(Verdict {
            independent: outcome.p_value > self.alpha,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(p: f64) -> impl Fn(&DataMatrix, usize, usize, &[usize]) -> Result<f64, PcError> {
        move |_: &DataMatrix, _: usize, _: usize, _: &[usize]| -> Result<f64, PcError> { Ok(p) }
    }

    #[test]
    fn threshold_is_strict() {
        let data = DataMatrix::from_rows([[0u32, 1]]).unwrap();
        let at = fixed(0.05);
        let oracle = IndependenceOracle::new(&at, 0.05).unwrap();
        assert!(!oracle.query(&data, 0, 1, &[]).unwrap().independent);

        let above = fixed(0.050001);
        let oracle = IndependenceOracle::new(&above, 0.05).unwrap();
        let verdict = oracle.query(&data, 0, 1, &[]).unwrap();
        assert!(verdict.independent);
        assert_eq!(verdict.p_value(), 0.050001);
    }

    #[test]
    fn alpha_extremes() {
        let data = DataMatrix::from_rows([[0u32, 1]]).unwrap();
        let one = fixed(1.0);
        assert!(!IndependenceOracle::new(&one, 1.0)
            .unwrap()
            .query(&data, 0, 1, &[])
            .unwrap()
            .independent);
        let tiny = fixed(1e-300);
        assert!(IndependenceOracle::new(&tiny, 0.0)
            .unwrap()
            .query(&data, 0, 1, &[])
            .unwrap()
            .independent);
    }

    #[test]
    fn rejects_bad_alpha() {
        let test = fixed(0.5);
        for alpha in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                IndependenceOracle::new(&test, alpha),
                Err(PcError::Configuration(_))
            ));
        }
    }
}
