//! Flow analysis: how offered quantity spreads across buckets and categories.

use std::collections::BTreeMap;

use axes_core::{bucket_for, MaturityBucket, Quote, RatingCategory};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Attribute quotes are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowDimension {
    #[serde(rename = "Rating_Category")]
    RatingCategory,
    #[serde(rename = "Sector")]
    Sector,
    #[serde(rename = "Sub_Sector")]
    SubSector,
    #[serde(rename = "Moody's_rating")]
    MoodysRating,
    #[serde(rename = "MaturityBucket")]
    MaturityBucket,
}

impl FlowDimension {
    /// Column label of the dimension.
    pub fn label(self) -> &'static str {
        match self {
            FlowDimension::RatingCategory => "Rating_Category",
            FlowDimension::Sector => "Sector",
            FlowDimension::SubSector => "Sub_Sector",
            FlowDimension::MoodysRating => "Moody's_rating",
            FlowDimension::MaturityBucket => "MaturityBucket",
        }
    }

    /// Parse a column label.
    pub fn from_label(label: &str) -> Option<Self> {
        [
            FlowDimension::RatingCategory,
            FlowDimension::Sector,
            FlowDimension::SubSector,
            FlowDimension::MoodysRating,
            FlowDimension::MaturityBucket,
        ]
        .into_iter()
        .find(|d| d.label() == label)
    }

    /// Fixed category labels for dimensions with an intrinsic order.
    fn categories(self) -> Option<Vec<&'static str>> {
        match self {
            FlowDimension::RatingCategory => {
                Some(RatingCategory::ALL.iter().map(|c| c.label()).collect())
            }
            FlowDimension::MaturityBucket => {
                Some(MaturityBucket::ALL.iter().map(|b| b.label()).collect())
            }
            _ => None,
        }
    }

    /// Sort key and label of a quote along this dimension.
    ///
    /// Ordered dimensions sort by category position, the others by label.
    fn key(self, quote: &Quote, bucket: MaturityBucket) -> Option<(usize, String)> {
        match self {
            FlowDimension::RatingCategory => {
                let c = quote.rating_category;
                Some((c as usize, c.label().to_string()))
            }
            FlowDimension::MaturityBucket => Some((bucket.index(), bucket.label().to_string())),
            FlowDimension::Sector => quote.sector.clone().map(|s| (0, s)),
            FlowDimension::SubSector => quote.sub_sector.clone().map(|s| (0, s)),
            FlowDimension::MoodysRating => quote.moodys_rating.clone().map(|s| (0, s)),
        }
    }
}

/// What a flow bar measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMeasure {
    /// Number of quotes.
    Count,
    /// Summed offered quantity.
    Quantity,
}

/// Summed quantity by dimension (rows) and maturity bucket (columns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub dimension: FlowDimension,
    pub rows: Vec<String>,
    pub columns: Vec<MaturityBucket>,
    /// `cells[row][column]`; empty combinations are zero.
    pub cells: Vec<Vec<f64>>,
}

impl Heatmap {
    /// Quantity in one cell.
    pub fn get(&self, row: &str, column: MaturityBucket) -> Option<f64> {
        let r = self.rows.iter().position(|label| label == row)?;
        self.cells.get(r)?.get(column.index()).copied()
    }

    /// Total quantity over all cells.
    pub fn total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }
}

/// Quantity heatmap of quotes against their maturity bucket.
pub fn quantity_heatmap(quotes: &[Quote], dimension: FlowDimension, now: NaiveDateTime) -> Heatmap {
    let width = MaturityBucket::ALL.len();
    let mut grid: BTreeMap<(usize, String), Vec<f64>> = BTreeMap::new();

    if let Some(categories) = dimension.categories() {
        for (i, label) in categories.into_iter().enumerate() {
            grid.insert((i, label.to_string()), vec![0.0; width]);
        }
    }

    for quote in quotes {
        let bucket = bucket_for(Some(quote.maturity), now);
        let Some(key) = dimension.key(quote, bucket) else {
            continue;
        };
        grid.entry(key).or_insert_with(|| vec![0.0; width])[bucket.index()] += quote.offer_qty;
    }

    let (rows, cells) = grid.into_iter().map(|((_, label), row)| (label, row)).unzip();
    Heatmap {
        dimension,
        rows,
        columns: MaturityBucket::ALL.to_vec(),
        cells,
    }
}

/// One bar of a flow chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowBar {
    pub label: String,
    pub value: f64,
}

/// Quote count or quantity per category, positive totals only.
///
/// Ordered dimensions and Moody's ratings follow category order. Otherwise
/// counts come largest first and quantities by label.
pub fn flow_bars(
    quotes: &[Quote],
    dimension: FlowDimension,
    measure: FlowMeasure,
    now: NaiveDateTime,
) -> Vec<FlowBar> {
    let mut totals: BTreeMap<(usize, String), f64> = BTreeMap::new();
    for quote in quotes {
        let bucket = bucket_for(Some(quote.maturity), now);
        let Some(key) = dimension.key(quote, bucket) else {
            continue;
        };
        let value = match measure {
            FlowMeasure::Count => 1.0,
            FlowMeasure::Quantity => quote.offer_qty,
        };
        *totals.entry(key).or_insert(0.0) += value;
    }

    let mut bars: Vec<FlowBar> = totals
        .into_iter()
        .filter(|(_, value)| *value > 0.0)
        .map(|((_, label), value)| FlowBar { label, value })
        .collect();

    let categorical = matches!(
        dimension,
        FlowDimension::RatingCategory | FlowDimension::MaturityBucket | FlowDimension::MoodysRating
    );
    if measure == FlowMeasure::Count && !categorical {
        // Stable: equal counts stay in label order.
        bars.sort_by(|a, b| b.value.total_cmp(&a.value));
    }
    bars
}

/// Summary figures of a set of bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub total: f64,
    pub mean: f64,
    pub max: f64,
}

/// Total, mean and largest bar; `None` without bars.
pub fn flow_summary(bars: &[FlowBar]) -> Option<FlowSummary> {
    if bars.is_empty() {
        return None;
    }
    let values: Vec<f64> = bars.iter().map(|b| b.value).collect();
    Some(FlowSummary {
        total: values.iter().sum(),
        mean: <_ as Statistics<f64>>::mean(values.iter()),
        max: <_ as Statistics<f64>>::max(values.iter()),
    })
}
