macro_rules! impl_range {
    ($($a:ident)*) => ($(
        pub fn $a(begin: $a, end: $a, count: usize) -> impl Iterator<Item = $a> {
            let step = (end - begin) / 1.max(1.max(count) - 1)  as $a;
            (0..count).map(move |i| (i as $a).mul_add(step, begin))
        }
    )*)
}

pub mod range {
    impl_range! { f32 f64 }
}

/// Natural cubic spline through `(x, y)` knots with strictly increasing `x`.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots, zero at both ends.
    m: Vec<f64>,
}

impl CubicSpline {
    /// `None` unless there are at least two knots with strictly increasing `x`.
    #[must_use]
    pub fn natural(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len();
        if n < 2 || y.len() != n || x.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }
        let h = x.windows(2).map(|w| w[1] - w[0]).collect::<Vec<_>>();
        let mut m = vec![0.0; n];
        if n > 2 {
            // Thomas algorithm on the interior knots
            let size = n - 2;
            let mut diag = vec![0.0; size];
            let mut rhs = vec![0.0; size];
            for k in 0..size {
                let i = k + 1;
                diag[k] = 2.0 * (h[i - 1] + h[i]);
                rhs[k] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
            }
            for k in 1..size {
                let w = h[k] / diag[k - 1];
                diag[k] -= w * h[k];
                rhs[k] -= w * rhs[k - 1];
            }
            m[size] = rhs[size - 1] / diag[size - 1];
            for k in (0..size - 1).rev() {
                m[k + 1] = (rhs[k] - h[k + 1] * m[k + 2]) / diag[k];
            }
        }
        Some(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Value at `t`; outside the knots the end segments are extended.
    #[must_use]
    pub fn at(&self, t: f64) -> f64 {
        let last = self.x.len() - 2;
        let i = self.x[1..=last].partition_point(|&xk| xk <= t).min(last);
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - t) / h;
        let b = (t - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a.powi(3) - a) * self.m[i] + (b.powi(3) - b) * self.m[i + 1]) * h * h / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::{assert_f32_near, assert_f64_near};
    use std::iter;

    #[test]
    fn test_range_f32() {
        let range = range::f32(0.0, 10.0, 5).collect::<Vec<_>>();
        let values = [0.0, 2.5, 5.0, 7.5, 10.0];
        assert_eq!(range.len(), values.len());
        iter::zip(range, values).for_each(|(got, want)| {
            assert_f32_near!(got, want, 6);
        });
        let range = range::f32(4.0, 5.0, 1).collect::<Vec<_>>();
        assert_eq!(range.len(), 1);
        assert_f32_near!(range[0], 4.0, 6);
        assert_eq!(range::f32(4.0, 5.0, 0).count(), 0);
    }

    #[test]
    fn test_spline_interpolates_knots() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.0, 0.4, 1.2, 0.3, 0.1];
        let spline = CubicSpline::natural(&x, &y).unwrap();
        iter::zip(x, y).for_each(|(x, y)| assert!((spline.at(x) - y).abs() < 1e-12));
        // natural end conditions
        assert_f64_near!(spline.m[0], 0.0);
        assert_f64_near!(spline.m[4], 0.0);
    }

    #[test]
    fn test_spline_reproduces_lines() {
        let x = [0.0, 1.0, 2.5, 4.0];
        let y = x.map(|x| 2.0 * x - 1.0);
        let spline = CubicSpline::natural(&x, &y).unwrap();
        for t in range::f64(0.0, 4.0, 17) {
            assert!((spline.at(t) - (2.0 * t - 1.0)).abs() < 1e-12);
        }
        let two = CubicSpline::natural(&[1.0, 2.0], &[3.0, 5.0]).unwrap();
        assert!((two.at(1.5) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_spline_known_value() {
        // symmetric three point natural spline: m1 = -3, value at 0.5 is 11/16
        let spline = CubicSpline::natural(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!((spline.m[1] + 3.0).abs() < 1e-12);
        assert!((spline.at(0.5) - 0.6875).abs() < 1e-12);
    }

    #[test]
    fn test_spline_rejects_bad_knots() {
        assert!(CubicSpline::natural(&[1.0], &[1.0]).is_none());
        assert!(CubicSpline::natural(&[1.0, 1.0], &[1.0, 2.0]).is_none());
        assert!(CubicSpline::natural(&[1.0, 2.0], &[1.0]).is_none());
    }
}
