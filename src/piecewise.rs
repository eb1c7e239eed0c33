use std::cmp::Ordering;

/// A cubic polynomial `c0 + c1 x + c2 x^2 + c3 x^3`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cubic {
    coefficients: [f64; 4],
}

impl Cubic {
    pub const ZERO: Cubic = Cubic {
        coefficients: [0.0; 4],
    };

    pub fn new(c0: f64, c1: f64, c2: f64, c3: f64) -> Self {
        Cubic {
            coefficients: [c0, c1, c2, c3],
        }
    }

    pub fn value_at(&self, x: f64) -> f64 {
        let [c0, c1, c2, c3] = self.coefficients;
        c0 + x * (c1 + x * (c2 + x * c3))
    }

    pub fn add(&self, other: &Cubic) -> Cubic {
        let mut coefficients = [0.0; 4];
        for (i, c) in coefficients.iter_mut().enumerate() {
            *c = self.coefficients[i] + other.coefficients[i];
        }
        Cubic { coefficients }
    }
}

/// A piecewise cubic function over the whole real line.
///
/// The function is given by `n` breakpoints (strictly increasing) and
/// `n + 1` cubic pieces; piece `i` applies on the interval from breakpoint
/// `i - 1` (or `-inf`) up to but excluding breakpoint `i` (or `+inf`).
///
/// The main use is as a *sand function*: the volume of terrain above water
/// level `h`, as a function of `h`. Those functions are built per triangle
/// and summed per Morse–Smale face with [`PiecewiseCubicFunction::add`].
#[derive(Clone, Debug, PartialEq)]
pub struct PiecewiseCubicFunction {
    breakpoints: Vec<f64>,
    pieces: Vec<Cubic>,
}

impl Default for PiecewiseCubicFunction {
    fn default() -> Self {
        PiecewiseCubicFunction::zero()
    }
}

impl PiecewiseCubicFunction {
    /// The function that is zero everywhere.
    pub fn zero() -> Self {
        PiecewiseCubicFunction {
            breakpoints: Vec::new(),
            pieces: vec![Cubic::ZERO],
        }
    }

    /// Creates a piecewise function from breakpoints and pieces.
    ///
    /// **Panics** if the counts do not match up or the breakpoints are not
    /// strictly increasing.
    pub fn new(breakpoints: Vec<f64>, pieces: Vec<Cubic>) -> Self {
        assert_eq!(pieces.len(), breakpoints.len() + 1);
        assert!(breakpoints.windows(2).all(|w| w[0] < w[1]));
        PiecewiseCubicFunction {
            breakpoints,
            pieces,
        }
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    /// Evaluates the function at `x`.
    pub fn value_at(&self, x: f64) -> f64 {
        let piece = self.breakpoints.partition_point(|&b| b <= x);
        self.pieces[piece].value_at(x)
    }

    /// Returns the pointwise sum of two functions, merging their
    /// breakpoints.
    pub fn add(&self, other: &PiecewiseCubicFunction) -> PiecewiseCubicFunction {
        let mut breakpoints =
            Vec::with_capacity(self.breakpoints.len() + other.breakpoints.len());
        let (mut i, mut j) = (0, 0);
        while i < self.breakpoints.len() || j < other.breakpoints.len() {
            let next = match (self.breakpoints.get(i), other.breakpoints.get(j)) {
                (Some(&a), Some(&b)) => match a.total_cmp(&b) {
                    Ordering::Less => {
                        i += 1;
                        a
                    }
                    Ordering::Greater => {
                        j += 1;
                        b
                    }
                    Ordering::Equal => {
                        i += 1;
                        j += 1;
                        a
                    }
                },
                (Some(&a), None) => {
                    i += 1;
                    a
                }
                (None, Some(&b)) => {
                    j += 1;
                    b
                }
                (None, None) => unreachable!(),
            };
            breakpoints.push(next);
        }

        let mut pieces = Vec::with_capacity(breakpoints.len() + 1);
        let mut left = 0;
        let mut right = 0;
        for k in 0..=breakpoints.len() {
            // advance each input to the piece that covers this interval
            if k > 0 {
                let b = breakpoints[k - 1];
                while left < self.breakpoints.len() && self.breakpoints[left] <= b {
                    left += 1;
                }
                while right < other.breakpoints.len() && other.breakpoints[right] <= b {
                    right += 1;
                }
            }
            pieces.push(self.pieces[left].add(&other.pieces[right]));
        }

        PiecewiseCubicFunction {
            breakpoints,
            pieces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn evaluates_the_right_piece() {
        let f = PiecewiseCubicFunction::new(
            vec![0.0, 1.0],
            vec![
                Cubic::new(1.0, 0.0, 0.0, 0.0),
                Cubic::new(0.0, 1.0, 0.0, 0.0),
                Cubic::new(2.0, 0.0, 0.0, 0.0),
            ],
        );
        assert_relative_eq!(f.value_at(-3.0), 1.0);
        assert_relative_eq!(f.value_at(0.5), 0.5);
        assert_relative_eq!(f.value_at(1.0), 2.0);
        assert_relative_eq!(f.value_at(7.0), 2.0);
    }

    #[test]
    fn addition_merges_breakpoints() {
        let f = PiecewiseCubicFunction::new(
            vec![0.0],
            vec![Cubic::ZERO, Cubic::new(0.0, 1.0, 0.0, 0.0)],
        );
        let g = PiecewiseCubicFunction::new(
            vec![1.0],
            vec![Cubic::new(3.0, 0.0, 0.0, 0.0), Cubic::ZERO],
        );
        let sum = f.add(&g);
        assert_eq!(sum.breakpoints(), &[0.0, 1.0]);
        assert_relative_eq!(sum.value_at(-1.0), 3.0);
        assert_relative_eq!(sum.value_at(0.5), 3.5);
        assert_relative_eq!(sum.value_at(2.0), 2.0);
    }

    #[test]
    fn adding_zero_is_identity() {
        let f = PiecewiseCubicFunction::new(
            vec![2.0],
            vec![Cubic::new(0.0, 0.0, 1.0, 0.0), Cubic::new(4.0, 0.0, 0.0, 0.0)],
        );
        let sum = f.add(&PiecewiseCubicFunction::zero());
        for x in [-2.0, 0.0, 1.9, 2.0, 10.0] {
            assert_relative_eq!(sum.value_at(x), f.value_at(x));
        }
    }
}
