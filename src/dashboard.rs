use log::{info, warn};

use consolidacion::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::dashboard::config_reader::*;
use crate::dashboard::source::SheetCache;

pub mod export;
pub mod io_csv;
pub mod source;

#[derive(Debug, Snafu)]
pub enum DashboardError {
    /// The raw table could not be fetched or decoded at all. Everything
    /// downstream is skipped for this invocation.
    #[snafu(display("Could not load the data source {url}: {message}"))]
    SourceUnavailable { url: String, message: String },

    /// The table was fetched but carries no data rows. Kept distinct from
    /// [SourceUnavailable] so a caller can show "no data" instead of
    /// "fetch failed".
    #[snafu(display("The data source {url} was loaded but contains no rows"))]
    EmptySource { url: String },

    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashboardError>;

pub mod config_reader {
    use log::debug;
    use serde::{Deserialize, Serialize};
    use serde_json::Value as JSValue;
    use snafu::prelude::*;
    use std::fs;

    use crate::dashboard::*;

    /// The file-based counterpart of the command line flags: the source
    /// address plus default filter selections. Flags take precedence.
    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct DashboardConfig {
        pub source: Option<String>,
        pub years: Option<Vec<i32>>,
        #[serde(rename = "monthStart")]
        pub month_start: Option<u32>,
        #[serde(rename = "monthEnd")]
        pub month_end: Option<u32>,
        #[serde(rename = "ageGroup")]
        pub age_group: Option<String>,
        pub leader: Option<String>,
        pub meeting: Option<String>,
        pub export: Option<String>,
        pub reference: Option<String>,
        pub out: Option<String>,
    }

    pub fn read_config(path: String) -> DashResult<DashboardConfig> {
        let contents =
            fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path: path.clone() })?;
        debug!("read_config: {:?}", contents);
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
    }

    pub fn read_summary(path: String) -> DashResult<JSValue> {
        let contents =
            fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path: path.clone() })?;
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
    }
}

// The "Todos"/"Todas" sentinels of the original sheets disable a filter.
fn sentinel(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && !v.eq_ignore_ascii_case("todos") && !v.eq_ignore_ascii_case("todas")
    })
}

/// Merges the command line flags with the optional configuration file into
/// the typed filter criteria.
pub fn build_criteria(args: &Args, config: Option<&DashboardConfig>) -> DashResult<FilterCriteria> {
    let years = args
        .years
        .clone()
        .or_else(|| config.and_then(|c| c.years.clone()));
    let month_start = args.month_start.or_else(|| config.and_then(|c| c.month_start));
    let month_end = args.month_end.or_else(|| config.and_then(|c| c.month_end));
    let month_range = match (month_start, month_end) {
        (None, None) => None,
        (Some(start), Some(end)) => {
            ensure_whatever!(
                (1..=12).contains(&start) && (1..=12).contains(&end),
                "month bounds must lie within 1..12, got {} and {}",
                start,
                end
            );
            Some((start, end))
        }
        _ => {
            whatever!("both --month-start and --month-end are required to filter by months")
        }
    };
    Ok(FilterCriteria {
        years,
        month_range,
        age_group: sentinel(
            args.age_group
                .clone()
                .or_else(|| config.and_then(|c| c.age_group.clone())),
        ),
        leader: sentinel(
            args.leader
                .clone()
                .or_else(|| config.and_then(|c| c.leader.clone())),
        ),
        meeting: sentinel(
            args.meeting
                .clone()
                .or_else(|| config.and_then(|c| c.meeting.clone())),
        ),
    })
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn group_stats_to_json(stats: &[GroupStats]) -> Vec<JSValue> {
    stats
        .iter()
        .map(|g| {
            json!({
                "name": g.name,
                "nuevos": g.records,
                "llamadas": g.calls,
                "celula": g.in_group,
                "visitas": g.visits,
                "pctLlamadas": g.pct_calls,
                "pctCelula": g.pct_in_group,
                "pctVisitas": g.pct_visits,
            })
        })
        .collect()
}

fn distribution_to_json(counts: &[CategoryCount]) -> Vec<JSValue> {
    counts
        .iter()
        .map(|c| json!({ "name": c.name, "count": c.count }))
        .collect()
}

fn date_js(d: &Option<chrono::NaiveDate>) -> JSValue {
    match d {
        Some(d) => json!(d.format("%d/%m/%Y").to_string()),
        None => JSValue::Null,
    }
}

/// Assembles the JSON summary handed to the presentation layer.
pub fn build_summary_js(
    table: &NormalizedTable,
    criteria: &FilterCriteria,
    shown: usize,
    metrics: &Metrics,
) -> JSValue {
    let s = &table.summary;
    let summary = json!({
        "totalRecords": s.total_records,
        "parsedTimestamps": s.parsed_timestamps,
        "unparsedTimestamps": s.unparsed_timestamps,
        "firstDate": date_js(&s.first_date),
        "lastDate": date_js(&s.last_date),
        "years": s.years,
        "weekdays": s.weekdays,
    });
    let columns = json!({
        "timestamp": table.columns.timestamp.is_some(),
        "ageGroup": table.columns.age_group.is_some(),
        "neighborhood": table.columns.neighborhood.is_some(),
        "leader": table.columns.leader.as_ref().map(|c| c.header.clone()),
        "meeting": table.columns.meeting.as_ref().map(|c| c.header.clone()),
    });
    let filters = json!({
        "years": criteria.years,
        "monthRange": criteria.month_range.map(|(s, e)| vec![s, e]),
        "ageGroup": criteria.age_group,
        "leader": criteria.leader,
        "meeting": criteria.meeting,
        "shown": shown,
        "total": s.total_records,
    });
    let t = &metrics.totals;
    let totals = json!({
        "personasNuevas": t.records,
        "llamadas": t.calls,
        "enCelula": t.in_group,
        "visitadas": t.visits,
        "pctLlamadas": round1(t.pct_calls),
        "pctEnCelula": round1(t.pct_in_group),
        "pctVisitadas": round1(t.pct_visits),
    });
    let monthly: Vec<JSValue> = metrics
        .monthly
        .iter()
        .map(|m| json!({ "month": m.month, "monthName": m.month_name, "count": m.count }))
        .collect();
    let weekly: Vec<JSValue> = metrics
        .weekly
        .iter()
        .map(|w| json!({ "year": w.year, "week": w.week, "period": w.period, "count": w.count }))
        .collect();
    let funnel: Vec<JSValue> = metrics
        .funnel
        .iter()
        .map(|f| json!({ "stage": f.stage, "value": f.value }))
        .collect();

    json!({
        "summary": summary,
        "columns": columns,
        "filters": filters,
        "totals": totals,
        "monthly": monthly,
        "weekly": weekly,
        "funnel": funnel,
        "byLeader": metrics.by_leader.as_deref().map(group_stats_to_json),
        "byMeeting": metrics.by_meeting.as_deref().map(group_stats_to_json),
        "ageGroups": distribution_to_json(&metrics.age_groups),
        "neighborhoods": distribution_to_json(&metrics.neighborhoods),
        "meetings": metrics.meetings.as_deref().map(distribution_to_json),
    })
}

/// One full recomputation: fetch (through the cache), decode, normalize,
/// filter, aggregate, emit. Triggered once per user interaction.
pub fn run_dashboard(args: &Args, cache: &mut SheetCache) -> DashResult<()> {
    let config: Option<DashboardConfig> = match &args.config {
        Some(path) => Some(read_config(path.clone())?),
        None => None,
    };
    let source_addr = args
        .source
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.source.clone()));
    let source_addr = match source_addr {
        Some(s) => s,
        None => whatever!("no source given: pass --source or a --config file with a source entry"),
    };

    if args.refresh {
        cache.invalidate(&source_addr);
    }
    let body = cache.fetch(&source_addr)?;

    let raw = match io_csv::read_table(&body) {
        Ok(t) => t,
        Err(e) => {
            return SourceUnavailableSnafu {
                url: source_addr,
                message: e.to_string(),
            }
            .fail()
        }
    };
    info!("run_dashboard: {} rows read from {}", raw.rows.len(), source_addr);

    let table = match normalize(&raw) {
        Ok(t) => t,
        Err(ConsolidationErrors::EmptyTable) => {
            return EmptySourceSnafu { url: source_addr }.fail()
        }
    };

    let criteria = build_criteria(args, config.as_ref())?;
    let selected = apply_filters(&table, &criteria);
    let metrics = compute_metrics(&table, &selected);

    let summary_js = build_summary_js(&table, &criteria, selected.len(), &metrics);
    let pretty_js = match serde_json::to_string_pretty(&summary_js) {
        Ok(s) => s,
        Err(e) => whatever!("could not serialize the summary: {}", e),
    };

    let out = args
        .out
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.out.clone()));
    match out.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js),
        Some(path) => {
            fs::write(path, &pretty_js).context(WritingFileSnafu { path })?;
            info!("run_dashboard: summary written to {}", path);
        }
    }

    let export_dest = args
        .export
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.export.clone()));
    if let Some(dest) = export_dest {
        export::export_filtered(Path::new(&dest), &table, &selected, &criteria)?;
    }

    // The reference summary, if provided for comparison.
    let reference = args
        .reference
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.reference.clone()));
    if let Some(reference_path) = reference {
        let summary_ref = read_summary(reference_path)?;
        let pretty_js_ref = match serde_json::to_string_pretty(&summary_ref) {
            Ok(s) => s,
            Err(e) => whatever!("could not serialize the reference summary: {}", e),
        };
        if pretty_js_ref != pretty_js {
            warn!("Found differences with the reference summary");
            print_diff(pretty_js_ref.as_str(), pretty_js.as_str(), "\n");
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}
