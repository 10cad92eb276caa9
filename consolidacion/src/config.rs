// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use chrono::{NaiveDate, NaiveDateTime};

/// A table as originally published: a header row plus one row of raw string
/// values per follow-up entry.
///
/// Nothing is assumed about the headers at this point. Column names vary
/// across deployments and may carry surrounding whitespace; rows may be
/// shorter than the header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A column binding resolved from one of several accepted spellings.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResolvedColumn {
    /// Index into the (trimmed) header row.
    pub index: usize,
    /// The spelling that was actually matched, for display purposes.
    pub header: String,
}

/// Which of the known columns were detected in the header row.
///
/// Every downstream feature is gated on the corresponding entry: an absent
/// column silently disables the dependent breakdown or filter, it never
/// raises an error.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ColumnMap {
    pub timestamp: Option<usize>,
    pub full_name: Option<usize>,
    pub phone: Option<usize>,
    pub age_group: Option<usize>,
    pub inviter: Option<usize>,
    pub neighborhood: Option<usize>,
    pub call_made: Option<usize>,
    pub in_small_group: Option<usize>,
    pub visit_made: Option<usize>,
    /// Resolved from a priority list of accepted spellings.
    pub leader: Option<ResolvedColumn>,
    /// Resolved from a priority list of accepted spellings.
    pub meeting: Option<ResolvedColumn>,
}

/// One row after normalization.
///
/// The source values are kept in full (with the yes/no columns rewritten to
/// their canonical tokens); every derived attribute is an explicit option.
/// Records are never dropped: a row whose timestamp failed all the parse
/// tiers simply has all its time-derived fields absent.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NormalizedRecord {
    /// The row values, aligned with the table headers and padded to the
    /// header length.
    pub values: Vec<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub month_name: Option<String>,
    pub iso_week: Option<u32>,
    pub weekday_name: Option<String>,
    pub date: Option<NaiveDate>,
    /// Computed over the whole dataset, see the weekend rule in `normalize`.
    pub is_weekend: Option<bool>,
    /// Canonical "SI"/"NO", or the residual text when it matched neither
    /// alias table. Absent when the column itself is absent.
    pub call_made: Option<String>,
    pub in_small_group: Option<String>,
    pub visit_made: Option<String>,
    /// Trimmed copy of the age-group self-description.
    pub age_group: Option<String>,
    /// Trimmed, title-cased; an empty value becomes the fixed placeholder.
    pub neighborhood: Option<String>,
    /// Trimmed copy of the meeting value.
    pub meeting: Option<String>,
}

/// Dataset-level counters gathered while normalizing, for the data-quality
/// panel of the presentation layer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DataSummary {
    pub total_records: u64,
    pub parsed_timestamps: u64,
    pub unparsed_timestamps: u64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Years with at least one parsed timestamp, ascending.
    pub years: Vec<i32>,
    /// Distinct weekday names present in the parsed timestamps.
    pub weekdays: Vec<String>,
}

/// The annotated table produced by the schema normalizer.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NormalizedTable {
    /// Trimmed header names, in source order.
    pub headers: Vec<String>,
    pub records: Vec<NormalizedRecord>,
    pub columns: ColumnMap,
    pub summary: DataSummary,
}

/// The filter selections of one interaction.
///
/// `None` always means "do not restrict on this dimension" (the "Todos" /
/// "Todas" sentinel of the original sheets). The month range is inclusive on
/// both ends and may wrap across the year boundary (e.g. November..February).
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FilterCriteria {
    pub years: Option<Vec<i32>>,
    pub month_range: Option<(u32, u32)>,
    pub age_group: Option<String>,
    pub leader: Option<String>,
    pub meeting: Option<String>,
}

impl FilterCriteria {
    /// No restriction on any dimension.
    pub const ALL: FilterCriteria = FilterCriteria {
        years: None,
        month_range: None,
        age_group: None,
        leader: None,
        meeting: None,
    };
}

// ******** Output data structures *********

/// Grand totals over the filtered subset.
#[derive(PartialEq, Debug, Clone)]
pub struct Totals {
    pub records: u64,
    pub calls: u64,
    pub in_group: u64,
    pub visits: u64,
    pub pct_calls: f64,
    pub pct_in_group: f64,
    pub pct_visits: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MonthlyCount {
    pub month: u32,
    pub month_name: String,
    pub count: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct WeeklyCount {
    pub year: i32,
    pub week: u32,
    /// Composite label, `"{year}-S{week:02}"`.
    pub period: String,
    pub count: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct FunnelStage {
    pub stage: String,
    pub value: u64,
}

/// Per-leader or per-meeting statistics.
#[derive(PartialEq, Debug, Clone)]
pub struct GroupStats {
    pub name: String,
    pub records: u64,
    pub calls: u64,
    pub in_group: u64,
    pub visits: u64,
    /// Rounded to one decimal; 0 when the group is empty.
    pub pct_calls: f64,
    pub pct_in_group: f64,
    pub pct_visits: f64,
}

/// A frequency bucket for the descriptive charts.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

/// The full metric set consumed by the presentation layer, computed over the
/// currently filtered subset.
#[derive(PartialEq, Debug, Clone)]
pub struct Metrics {
    pub totals: Totals,
    /// Count per month, ascending by month number.
    pub monthly: Vec<MonthlyCount>,
    /// Count per (year, ISO week), ascending.
    pub weekly: Vec<WeeklyCount>,
    /// Personas Nuevas -> Llamadas -> En Celula -> Visitadas. The engine does
    /// not enforce monotonicity; that is a property of real data only.
    pub funnel: Vec<FunnelStage>,
    /// Absent when no leader column was detected.
    pub by_leader: Option<Vec<GroupStats>>,
    /// Absent when no meeting column was detected.
    pub by_meeting: Option<Vec<GroupStats>>,
    pub age_groups: Vec<CategoryCount>,
    /// Capped to the top 10 by count.
    pub neighborhoods: Vec<CategoryCount>,
    /// Absent when no meeting column was detected.
    pub meetings: Option<Vec<CategoryCount>>,
}

/// Errors that prevent normalization from completing.
///
/// Row-level anomalies are absorbed and never reach this enum.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ConsolidationErrors {
    EmptyTable,
}

impl Error for ConsolidationErrors {}

impl Display for ConsolidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsolidationErrors::EmptyTable => write!(f, "the table contains no rows"),
        }
    }
}
