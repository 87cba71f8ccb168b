// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Fan curve definitions and interpolation.
//!
//! A curve maps a sensor value to a duty cycle percentage. Between the first
//! and last control point the value follows the Lagrange polynomial through
//! every point; outside that range the curve is flat.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single control point on a fan curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    /// Sensor value, usually degrees Celsius
    #[serde(alias = "temp")]
    pub x: f64,
    /// Duty cycle percentage
    #[serde(alias = "duty")]
    pub y: f64,
}

impl CurvePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An immutable curve built from one or more control points.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Points sorted by strictly increasing `x`.
    points: Vec<CurvePoint>,
}

impl Curve {
    /// Create a curve. Points are sorted by `x` automatically.
    ///
    /// Fails if there are no points, if a coordinate is not finite, or if
    /// two points share the same `x` (the polynomial would be undefined).
    pub fn new(mut points: Vec<CurvePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::Config("Curve must have at least 1 point".to_string()));
        }
        if let Some(p) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::Config(format!(
                "Curve point ({}, {}) is not a finite number",
                p.x, p.y
            )));
        }

        points.sort_by(|a, b| a.x.total_cmp(&b.x));

        if let Some(w) = points.windows(2).find(|w| w[0].x == w[1].x) {
            return Err(Error::Config(format!(
                "Curve has duplicate points at x = {}",
                w[0].x
            )));
        }

        Ok(Self { points })
    }

    /// Create a curve from separate x and y sequences of equal length.
    pub fn from_xy(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(Error::Config(format!(
                "Curve has {} x values but {} y values",
                xs.len(),
                ys.len()
            )));
        }
        Self::new(
            xs.iter()
                .zip(ys)
                .map(|(&x, &y)| CurvePoint::new(x, y))
                .collect(),
        )
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Evaluate the duty cycle for a sensor value.
    ///
    /// - At or below the first point: returns the first point's `y`
    /// - At or above the last point: returns the last point's `y`
    /// - In between: the Lagrange polynomial of degree `k - 1`
    pub fn evaluate(&self, x: f64) -> f64 {
        let first = &self.points[0];
        let last = &self.points[self.points.len() - 1];

        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }

        self.points
            .iter()
            .enumerate()
            .map(|(j, pj)| {
                let weight: f64 = self
                    .points
                    .iter()
                    .enumerate()
                    .filter(|&(m, _)| m != j)
                    .map(|(_, pm)| (x - pm.x) / (pj.x - pm.x))
                    .product();
                weight * pj.y
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn three_point() -> Curve {
        Curve::from_xy(&[0.0, 50.0, 100.0], &[20.0, 50.0, 100.0]).unwrap()
    }

    #[test]
    fn test_passes_through_every_point() {
        let curve = Curve::from_xy(
            &[30.0, 45.0, 60.0, 75.0, 90.0],
            &[0.0, 25.0, 40.0, 70.0, 100.0],
        )
        .unwrap();
        for p in curve.points() {
            assert!((curve.evaluate(p.x) - p.y).abs() < EPS, "at x = {}", p.x);
        }
    }

    #[test]
    fn test_flat_below_and_above_range() {
        let curve = three_point();
        assert_eq!(curve.evaluate(-40.0), 20.0);
        assert_eq!(curve.evaluate(250.0), 100.0);
    }

    #[test]
    fn test_three_point_values() {
        let curve = three_point();
        assert_eq!(curve.evaluate(0.0), 20.0);
        assert_eq!(curve.evaluate(100.0), 100.0);
        assert!((curve.evaluate(50.0) - 50.0).abs() < EPS);

        let quarter = curve.evaluate(25.0);
        assert!(quarter > 20.0 && quarter < 50.0, "got {quarter}");
    }

    #[test]
    fn test_quadratic_not_piecewise_linear() {
        // y = x^2 / 100 through (0,0), (50,25), (100,100)
        let curve = Curve::from_xy(&[0.0, 50.0, 100.0], &[0.0, 25.0, 100.0]).unwrap();
        assert!((curve.evaluate(20.0) - 4.0).abs() < EPS);
        assert!((curve.evaluate(80.0) - 64.0).abs() < EPS);
    }

    #[test]
    fn test_single_point_is_constant() {
        let curve = Curve::new(vec![CurvePoint::new(60.0, 45.0)]).unwrap();
        assert_eq!(curve.evaluate(0.0), 45.0);
        assert_eq!(curve.evaluate(60.0), 45.0);
        assert_eq!(curve.evaluate(99.0), 45.0);
    }

    #[test]
    fn test_unsorted_points_are_sorted() {
        let curve = Curve::new(vec![
            CurvePoint::new(100.0, 100.0),
            CurvePoint::new(0.0, 20.0),
            CurvePoint::new(50.0, 50.0),
        ])
        .unwrap();
        assert_eq!(curve, three_point());
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = Curve::from_xy(&[0.0, 50.0], &[20.0]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_duplicate_x_rejected() {
        let err = Curve::from_xy(&[10.0, 50.0, 50.0], &[0.0, 30.0, 60.0]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_and_nan_rejected() {
        assert!(Curve::new(Vec::new()).is_err());
        assert!(Curve::new(vec![CurvePoint::new(f64::NAN, 10.0)]).is_err());
    }
}
