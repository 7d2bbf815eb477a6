//! Issuer curve: an issuer group's best quotes plotted against tenor, with a
//! fitted curve through them.

use std::collections::{BTreeMap, BTreeSet};

use axes_core::maturity::years_to_maturity;
use axes_core::{BestQuote, Quote};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use nalgebra::{DMatrix, DVector, SVD};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Separator between issuer and ticker in group labels.
const GROUP_SEPARATOR: &str = " – ";
/// Default number of samples along a fitted curve.
pub const CURVE_SAMPLES: usize = 300;
/// Fewest distinct tenors needed for a Nelson-Siegel fit.
const MIN_NS_POINTS: usize = 4;
/// Decay grid searched before local refinement, in years.
const TAU_GRID_STEPS: u32 = 300;
const TAU_GRID_STEP: f64 = 0.1;
const GOLDEN_ITERATIONS: usize = 60;
/// Singular values below this make the loadings degenerate.
const RANK_TOLERANCE: f64 = 1e-12;

/// An issuer within a ticker group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssuerGroup {
    pub label: String,
    pub issuer: String,
    pub ticker: String,
}

/// Distinct (issuer, ticker) pairs of the best quotes, sorted by label.
pub fn issuer_groups(best: &[BestQuote]) -> Vec<IssuerGroup> {
    best.iter()
        .filter_map(|b| {
            let issuer = b.quote.issuer_name.clone()?;
            let ticker = b.quote.ticker.clone()?;
            Some(IssuerGroup {
                label: format!("{issuer}{GROUP_SEPARATOR}{ticker}"),
                issuer,
                ticker,
            })
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Issuers quoted under a ticker with their number of bonds, most bonds first.
pub fn issuer_counts(best: &[BestQuote], ticker: &str) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for b in best.iter().filter(|b| b.quote.ticker.as_deref() == Some(ticker)) {
        if let Some(issuer) = b.quote.issuer_name.as_deref() {
            *counts.entry(issuer).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(String, usize)> =
        counts.into_iter().map(|(issuer, n)| (issuer.to_string(), n)).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Subordinated debt is flagged by a Bond ID ending in "SUB" (or "SUB}").
pub fn is_subordinated(bond_id: Option<&str>) -> bool {
    bond_id.is_some_and(|id| id.ends_with("SUB") || id.ends_with("SUB}"))
}

/// Figure plotted on the curve's y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurveMetric {
    #[default]
    #[serde(rename = "AXE_Offer_YLD")]
    Yield,
    #[serde(rename = "AXE_Offer_I-SPD")]
    ISpread,
    #[serde(rename = "AXE_Offer_BMK_SPD")]
    BmkSpread,
    #[serde(rename = "AXE_Offer_Z-SPD")]
    ZSpread,
}

impl CurveMetric {
    pub fn value(self, quote: &Quote) -> Option<f64> {
        match self {
            CurveMetric::Yield => Some(quote.offer_yield),
            CurveMetric::ISpread => quote.i_spread,
            CurveMetric::BmkSpread => quote.bmk_spread,
            CurveMetric::ZSpread => quote.z_spread,
        }
    }
}

/// One bond on the issuer curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub isin: Option<String>,
    pub bond_id: Option<String>,
    pub maturity: NaiveDate,
    /// Years to maturity.
    pub x: f64,
    pub y: f64,
    pub subordinated: bool,
}

/// Selection of an issuer group's bonds.
///
/// Empty sets do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerCurveQuery {
    pub ticker: String,
    pub issuers: BTreeSet<String>,
    pub currencies: BTreeSet<String>,
    pub sub_sectors: BTreeSet<String>,
    pub include_subordinated: bool,
    pub include_senior: bool,
    /// Inclusive bounds on years to maturity.
    pub year_range: Option<(f64, f64)>,
    pub metric: CurveMetric,
}

fn in_set(set: &BTreeSet<String>, value: Option<&str>) -> bool {
    set.is_empty() || value.is_some_and(|v| set.contains(v))
}

impl IssuerCurveQuery {
    /// All bonds of a ticker, both seniorities, yield metric.
    pub fn for_ticker(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            include_subordinated: true,
            include_senior: true,
            ..Self::default()
        }
    }

    /// Curve points of the matching bonds that carry the metric.
    pub fn points(&self, best: &[BestQuote], now: NaiveDateTime) -> Vec<CurvePoint> {
        best.iter()
            .map(|b| &b.quote)
            .filter(|q| q.ticker.as_deref() == Some(self.ticker.as_str()))
            .filter(|q| in_set(&self.issuers, q.issuer_name.as_deref()))
            .filter(|q| in_set(&self.currencies, q.currency.as_deref()))
            .filter(|q| in_set(&self.sub_sectors, q.sub_sector.as_deref()))
            .filter_map(|q| {
                let subordinated = is_subordinated(q.bond_id.as_deref());
                if (subordinated && !self.include_subordinated)
                    || (!subordinated && !self.include_senior)
                {
                    return None;
                }
                let x = years_to_maturity(q.maturity, now);
                if let Some((lo, hi)) = self.year_range {
                    if x < lo || x > hi {
                        return None;
                    }
                }
                Some(CurvePoint {
                    isin: q.isin.clone(),
                    bond_id: q.bond_id.clone(),
                    maturity: q.maturity,
                    x,
                    y: self.metric.value(q)?,
                    subordinated,
                })
            })
            .collect()
    }
}

/// Whole-year slider bounds around the points' tenors.
pub fn year_bounds(points: &[CurvePoint]) -> Option<(i64, i64)> {
    let lo = points.iter().map(|p| OrderedFloat(p.x)).min()?;
    let hi = points.iter().map(|p| OrderedFloat(p.x)).max()?;
    Some((lo.0.floor() as i64, hi.0.ceil() as i64))
}

/// Calendar year shown for a tenor, for a maturity-year x axis.
pub fn maturity_year(x: f64, now: NaiveDateTime) -> f64 {
    f64::from(now.year()) + x
}

/// Fitted curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NelsonSiegel {
    pub beta0: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub tau: f64,
}

/// Slope and curvature loadings at `x` for decay `tau`.
fn loadings(x: f64, tau: f64) -> (f64, f64) {
    let t = x / tau;
    if t.abs() < 1e-8 {
        // Limits as t -> 0.
        return (1.0 - t / 2.0, t / 2.0);
    }
    let decay = (-t).exp();
    let slope = (1.0 - decay) / t;
    (slope, slope - decay)
}

impl NelsonSiegel {
    pub fn eval(&self, x: f64) -> f64 {
        let (slope, curvature) = loadings(x, self.tau);
        self.beta0 + self.beta1 * slope + self.beta2 * curvature
    }
}

/// How a curve was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CurveMethod {
    NelsonSiegel(NelsonSiegel),
    Linear,
}

/// Sampled curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCurve {
    pub method: CurveMethod,
    /// `(x, y)` samples, evenly spaced over the data's tenor span.
    pub points: Vec<(f64, f64)>,
}

/// Least-squares betas for a fixed decay, with the residual sum of squares.
fn fit_betas(data: &[(f64, f64)], tau: f64) -> Option<(NelsonSiegel, f64)> {
    let design = DMatrix::from_fn(data.len(), 3, |i, j| {
        let (slope, curvature) = loadings(data[i].0, tau);
        match j {
            0 => 1.0,
            1 => slope,
            _ => curvature,
        }
    });
    let y = DVector::from_iterator(data.len(), data.iter().map(|&(_, y)| y));

    let svd = SVD::new(design, true, true);
    if svd.singular_values.min() < RANK_TOLERANCE {
        return None;
    }
    let betas = svd.solve(&y, RANK_TOLERANCE).ok()?;
    if betas.iter().any(|b| !b.is_finite()) {
        return None;
    }

    let model = NelsonSiegel { beta0: betas[0], beta1: betas[1], beta2: betas[2], tau };
    let sse = data.iter().map(|&(x, y)| (model.eval(x) - y).powi(2)).sum();
    Some((model, sse))
}

/// Grid search over the decay, then golden-section refinement around the best.
fn fit_nelson_siegel(data: &[(f64, f64)]) -> Option<NelsonSiegel> {
    let (mut best, mut best_sse) = (1..=TAU_GRID_STEPS)
        .map(|k| f64::from(k) * TAU_GRID_STEP)
        .filter_map(|tau| fit_betas(data, tau))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    let sse_at = |tau: f64| fit_betas(data, tau).map_or(f64::INFINITY, |(_, s)| s);
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let (mut lo, mut hi) = ((best.tau - TAU_GRID_STEP).max(1e-3), best.tau + TAU_GRID_STEP);
    for _ in 0..GOLDEN_ITERATIONS {
        let m1 = hi - ratio * (hi - lo);
        let m2 = lo + ratio * (hi - lo);
        if sse_at(m1) < sse_at(m2) {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    if let Some((refined, sse)) = fit_betas(data, (lo + hi) / 2.0) {
        if sse < best_sse {
            best = refined;
            best_sse = sse;
        }
    }

    best_sse.is_finite().then_some(best)
}

/// Piecewise-linear interpolation over points sorted by x.
fn interpolate(data: &[(f64, f64)], x: f64) -> f64 {
    let idx = data.partition_point(|&(px, _)| px < x);
    if idx == 0 {
        return data[0].1;
    }
    if idx >= data.len() {
        return data[data.len() - 1].1;
    }
    let (x0, y0) = data[idx - 1];
    let (x1, y1) = data[idx];
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

fn linspace(lo: f64, hi: f64, samples: usize) -> impl Iterator<Item = f64> {
    let step = if samples > 1 { (hi - lo) / (samples - 1) as f64 } else { 0.0 };
    (0..samples).map(move |i| lo + step * i as f64)
}

/// Fit a curve through `(x, y)` points.
///
/// Points are sorted by x and duplicate tenors keep their first value. Four
/// or more tenors get a Nelson-Siegel fit; fewer, or a failed fit, fall back
/// to linear interpolation. Under two tenors there is no curve.
pub fn fit_curve(points: &[(f64, f64)], samples: usize) -> Option<FittedCurve> {
    let mut data: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    data.sort_by_key(|&(x, _)| OrderedFloat(x));
    data.dedup_by_key(|&mut (x, _)| OrderedFloat(x));
    if data.len() < 2 {
        return None;
    }

    let (lo, hi) = (data[0].0, data[data.len() - 1].0);
    let model = if data.len() >= MIN_NS_POINTS {
        fit_nelson_siegel(&data)
    } else {
        None
    };

    let curve = match model {
        Some(ns) => FittedCurve {
            method: CurveMethod::NelsonSiegel(ns),
            points: linspace(lo, hi, samples).map(|x| (x, ns.eval(x))).collect(),
        },
        None => FittedCurve {
            method: CurveMethod::Linear,
            points: linspace(lo, hi, samples).map(|x| (x, interpolate(&data, x))).collect(),
        },
    };
    debug!(points = data.len(), linear = matches!(curve.method, CurveMethod::Linear), "fitted issuer curve");
    Some(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bond(isin: &str, issuer: &str, ticker: &str, bond_id: &str, days: i64, yld: f64) -> BestQuote {
        let maturity = now().date() + Duration::days(days);
        let mut q = Quote::new(isin, "D1", 99.0, yld, 1_000_000.0, maturity, now());
        q.issuer_name = Some(issuer.to_string());
        q.ticker = Some(ticker.to_string());
        q.bond_id = Some(bond_id.to_string());
        q.currency = Some("EUR".to_string());
        BestQuote { quote: q, nb_dealers_axe: 1 }
    }

    fn sample() -> Vec<BestQuote> {
        vec![
            bond("A", "BNP PARIBAS SA", "BNP", "BNP 1 01/27", 365, 3.0),
            bond("B", "BNP PARIBAS SA", "BNP", "BNP 4 01/34 SUB", 3650, 4.8),
            bond("C", "BNP PARIBAS CARDIF", "BNP", "CARDIF 2 01/29", 1825, 3.6),
            bond("D", "ACME", "ACM", "ACME 5 01/30", 2190, 6.0),
        ]
    }

    #[test]
    fn test_issuer_groups() {
        let groups = issuer_groups(&sample());
        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["ACME – ACM", "BNP PARIBAS CARDIF – BNP", "BNP PARIBAS SA – BNP"]
        );
        assert_eq!(
            issuer_counts(&sample(), "BNP"),
            vec![("BNP PARIBAS SA".to_string(), 2), ("BNP PARIBAS CARDIF".to_string(), 1)]
        );
    }

    #[test]
    fn test_is_subordinated() {
        assert!(is_subordinated(Some("BNP 4 01/34 SUB")));
        assert!(is_subordinated(Some("XYZ {SUB}")));
        assert!(!is_subordinated(Some("SUBWAY 3 01/30")));
        assert!(!is_subordinated(None));
    }

    #[test]
    fn test_query_points() {
        let best = sample();
        let query = IssuerCurveQuery::for_ticker("BNP");
        assert_eq!(query.points(&best, now()).len(), 3);

        let seniors = IssuerCurveQuery { include_subordinated: false, ..query.clone() };
        let points = seniors.points(&best, now());
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| !p.subordinated));

        let short = IssuerCurveQuery { year_range: Some((0.0, 5.0)), ..query.clone() };
        let isins: Vec<_> = short
            .points(&best, now())
            .into_iter()
            .filter_map(|p| p.isin)
            .collect();
        assert_eq!(isins, vec!["A", "C"]);

        let spread = IssuerCurveQuery { metric: CurveMetric::ZSpread, ..query };
        assert!(spread.points(&best, now()).is_empty());

        let points = IssuerCurveQuery::for_ticker("BNP").points(&best, now());
        assert_eq!(year_bounds(&points), Some((1, 10)));
    }

    #[test]
    fn test_fit_needs_two_tenors() {
        assert!(fit_curve(&[(1.0, 3.0)], 10).is_none());
        assert!(fit_curve(&[(1.0, 3.0), (1.0, 3.5)], 10).is_none());
    }

    #[test]
    fn test_linear_fallback() {
        let curve = fit_curve(&[(5.0, 4.0), (1.0, 2.0), (3.0, 2.5)], 5).unwrap();
        assert_eq!(curve.method, CurveMethod::Linear);
        assert_eq!(curve.points.len(), 5);
        assert_eq!(curve.points[0], (1.0, 2.0));
        assert_relative_eq!(curve.points[1].1, 2.25);
        assert_relative_eq!(curve.points[3].1, 3.25);
        assert_eq!(curve.points[4], (5.0, 4.0));
    }

    #[test]
    fn test_nelson_siegel_reproduces_exact_curve() {
        let truth = NelsonSiegel { beta0: 5.0, beta1: -2.0, beta2: 1.5, tau: 2.0 };
        let xs = [0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0];
        let data: Vec<(f64, f64)> = xs.iter().map(|&x| (x, truth.eval(x))).collect();

        let curve = fit_curve(&data, CURVE_SAMPLES).unwrap();
        let CurveMethod::NelsonSiegel(model) = curve.method else {
            panic!("expected a Nelson-Siegel fit");
        };
        for &(x, y) in &data {
            assert_relative_eq!(model.eval(x), y, epsilon = 1e-6);
        }
        assert_eq!(curve.points.len(), CURVE_SAMPLES);
        assert_relative_eq!(curve.points[0].0, 0.5);
        assert_relative_eq!(curve.points[CURVE_SAMPLES - 1].0, 10.0);
    }

    #[test]
    fn test_fit_betas_rejects_single_tenor() {
        let data = [(2.0, 3.0), (2.0, 3.1), (2.0, 2.9), (2.0, 3.0)];
        assert!(fit_betas(&data, 1.0).is_none());
    }

    #[test]
    fn test_fit_betas_least_squares() {
        // Noisy points: the fit is a compromise, not an interpolation.
        let data = [(1.0, 3.0), (2.0, 3.6), (3.0, 3.7), (5.0, 4.3), (7.0, 4.2), (10.0, 4.6)];
        let (model, sse) = fit_betas(&data, 2.0).unwrap();
        assert!(sse > 0.0);
        let mean_residual: f64 =
            data.iter().map(|&(x, y)| y - model.eval(x)).sum::<f64>() / data.len() as f64;
        // The level loading is constant, so residuals average to zero.
        assert_relative_eq!(mean_residual, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loadings_at_zero() {
        let ns = NelsonSiegel { beta0: 4.0, beta1: -1.0, beta2: 2.0, tau: 1.5 };
        assert_relative_eq!(ns.eval(0.0), 3.0);
    }

    #[test]
    fn test_maturity_year() {
        assert_relative_eq!(maturity_year(2.5, now()), 2026.5);
    }
}
