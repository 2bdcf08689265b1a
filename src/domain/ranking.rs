//! Multi-criteria ranking of evaluated recipes.
//!
//! Each row is reduced to a single score by a weighted sum of its four
//! numeric fields. Rows missing any field cannot be scored and always sort
//! as the worst entries.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeMap, HashMap},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::Membership;
use super::pricing::{Evaluation, Outcome, PricingError, RecipeResult};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    #[error("weight vector has no usable magnitude")]
    InvalidWeight,
    #[error("recipe `{0}` is missing from one of the compared rankings")]
    DriftMismatch(String),
}

/// Weights aligned to (margin, total margin, total time, throughput).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub margin: f64,
    pub total_margin: f64,
    pub total_time: f64,
    pub throughput: f64,
}

impl Default for Weights {
    fn default() -> Self {
        // Favour total gain, penalise long batches.
        Self::new(0.0, 1.0, -3.0, 0.0)
    }
}

impl Weights {
    pub fn new(margin: f64, total_margin: f64, total_time: f64, throughput: f64) -> Self {
        Self {
            margin,
            total_margin,
            total_time,
            throughput,
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [
            self.margin,
            self.total_margin,
            self.total_time,
            self.throughput,
        ]
    }

    /// Rescales so the absolute values sum to 1, keeping each sign.
    pub fn normalized(&self) -> Result<Self, RankError> {
        let magnitude: f64 = self.as_array().iter().map(|w| w.abs()).sum();
        if !magnitude.is_finite() || magnitude == 0.0 {
            return Err(RankError::InvalidWeight);
        }
        let [a, b, c, d] = self.as_array().map(|w| w / magnitude);
        Ok(Self::new(a, b, c, d))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Highest score first.
    #[default]
    Descending,
    Ascending,
}

impl SortDirection {
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }
}

/// Which pricing variant feeds the ranking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeVariant {
    #[default]
    Basic,
    Adjusted,
}

impl OutcomeVariant {
    pub fn pick<'a>(&self, evaluation: &'a Evaluation) -> &'a Outcome {
        match self {
            Self::Basic => &evaluation.basic,
            Self::Adjusted => &evaluation.adjusted,
        }
    }
}

/// Projection of an outcome fed to the ranker. `None` means "not applicable".
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedRow {
    pub name: String,
    pub margin: Option<i64>,
    pub total_margin: Option<i64>,
    pub total_time_hours: Option<f64>,
    pub throughput_per_hour: Option<i64>,
}

impl RankedRow {
    pub fn from_outcome(name: impl Into<String>, outcome: &Outcome) -> Self {
        Self {
            name: name.into(),
            margin: Some(outcome.margin),
            total_margin: Some(outcome.total_margin),
            total_time_hours: outcome.total_time_hours,
            throughput_per_hour: outcome.throughput_per_hour,
        }
    }

    pub fn not_applicable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            margin: None,
            total_margin: None,
            total_time_hours: None,
            throughput_per_hour: None,
        }
    }

    fn fields(&self) -> Option<[f64; 4]> {
        Some([
            self.margin? as f64,
            self.total_margin? as f64,
            self.total_time_hours?,
            self.throughput_per_hour? as f64,
        ])
    }

    pub fn is_complete(&self) -> bool {
        self.fields().is_some()
    }

    /// Weighted sum of the numeric fields, if all are present.
    pub fn score(&self, weights: &Weights) -> Option<f64> {
        let fields = self.fields()?;
        Some(
            fields
                .iter()
                .zip(weights.as_array().iter())
                .map(|(field, weight)| field * weight)
                .sum(),
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Score(f64);

impl Score {
    fn new(value: f64) -> Self {
        // -0.0 and 0.0 must tie
        Self(if value == 0.0 { 0.0 } else { value })
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Sort key: smaller sorts first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    group: u8,
    score: Score,
    name_len: Reverse<usize>,
}

fn rank_key(row: &RankedRow, weights: &Weights, direction: SortDirection) -> RankKey {
    match (row.score(weights), direction) {
        (Some(score), SortDirection::Descending) => RankKey {
            group: 0,
            score: Score::new(-score),
            name_len: Reverse(0),
        },
        (Some(score), SortDirection::Ascending) => RankKey {
            group: 1,
            score: Score::new(score),
            name_len: Reverse(0),
        },
        // Incomplete rows are the minimum; among them longer names lead.
        (None, direction) => RankKey {
            group: match direction {
                SortDirection::Descending => 1,
                SortDirection::Ascending => 0,
            },
            score: Score::new(0.0),
            name_len: Reverse(row.name.chars().count()),
        },
    }
}

/// Orders `rows` by weighted score. The sort is stable.
pub fn rank(
    rows: Vec<RankedRow>,
    weights: &Weights,
    direction: SortDirection,
) -> Result<Vec<RankedRow>, RankError> {
    let weights = weights.normalized()?;
    Ok(sort_rows(rows, &weights, direction))
}

fn sort_rows(mut rows: Vec<RankedRow>, weights: &Weights, direction: SortDirection) -> Vec<RankedRow> {
    rows.sort_by_cached_key(|row| rank_key(row, weights, direction));
    rows
}

/// Position change per recipe name.
pub type RankDrift = BTreeMap<String, i64>;

/// `index_after - index_before` for every name in `before`; positive means it moved down.
pub fn rank_drift(before: &[RankedRow], after: &[RankedRow]) -> Result<RankDrift, RankError> {
    let after_index: HashMap<&str, usize> = after
        .iter()
        .enumerate()
        .map(|(index, row)| (row.name.as_str(), index))
        .collect();

    before
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let moved_to = after_index
                .get(row.name.as_str())
                .ok_or_else(|| RankError::DriftMismatch(row.name.clone()))?;
            Ok((row.name.clone(), *moved_to as i64 - index as i64))
        })
        .collect()
}

/// Second-order comparison: `second[name] - first[name]` per name.
pub fn compare_drift(first: &RankDrift, second: &RankDrift) -> Result<RankDrift, RankError> {
    first
        .iter()
        .map(|(name, drift)| {
            let other = second
                .get(name)
                .ok_or_else(|| RankError::DriftMismatch(name.clone()))?;
            Ok((name.clone(), other - drift))
        })
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankOptions {
    pub weights: Weights,
    /// Hide recipes whose margin is zero or negative.
    pub filter_profitable_only: bool,
    /// Keep hidden recipes as not-applicable rows instead of dropping them.
    pub show_hidden: bool,
    /// Keep unresolvable recipes as not-applicable rows.
    pub include_unresolvable: bool,
    pub direction: SortDirection,
    pub membership: Membership,
    pub variant: OutcomeVariant,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankingReport {
    pub rows: Vec<RankedRow>,
    /// Unaffordable, or unprofitable when filtering for profit.
    pub hidden: Vec<String>,
    /// Recipes with no usable price data, kept apart from unprofitable ones.
    pub unresolvable: Vec<(String, PricingError)>,
}

impl RankingReport {
    pub fn top(&self, n: usize) -> &[RankedRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Rows for the overview table; `0` means every row.
    pub fn overview(&self, number: usize) -> &[RankedRow] {
        if number == 0 {
            &self.rows
        } else {
            self.top(number)
        }
    }
}

/// Projects per-recipe results to rows, filters them and ranks what is left.
pub fn rank_all(results: &[RecipeResult], options: &RankOptions) -> Result<RankingReport, RankError> {
    let weights = options.weights.normalized()?;
    let mut report = RankingReport::default();
    let mut rows = Vec::with_capacity(results.len());

    for RecipeResult {
        name,
        members,
        result,
    } in results
    {
        if !options.membership.allows(*members) {
            continue;
        }

        let evaluation = match result {
            Ok(evaluation) => evaluation,
            Err(error) => {
                report.unresolvable.push((name.clone(), error.clone()));
                if options.include_unresolvable {
                    rows.push(RankedRow::not_applicable(name.as_str()));
                }
                continue;
            }
        };

        let outcome = options.variant.pick(evaluation);
        let cant_afford = outcome.amount == 0;
        let no_profit = outcome.margin <= 0;

        if cant_afford || (options.filter_profitable_only && no_profit) {
            report.hidden.push(name.clone());
            if options.show_hidden {
                rows.push(RankedRow::not_applicable(name.as_str()));
            }
            continue;
        }

        rows.push(RankedRow::from_outcome(name.as_str(), outcome));
    }

    report.rows = sort_rows(rows, &weights, options.direction);
    Ok(report)
}
