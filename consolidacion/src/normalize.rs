//! The schema normalizer: turns a loosely-structured raw table into an
//! annotated table with a stable shape.

use log::{debug, info, warn};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::*;
use crate::schema;

/// Month names used for the monthly series and the export file names.
pub static MONTH_NAMES: &[&str] = &[
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

static WEEKDAY_NAMES: &[&str] = &[
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];

/// Parses one raw timestamp value through the tiered fallback:
///
/// 1. strict day/month/year with time of day,
/// 2. strict day/month/year date only,
/// 3. a permissive day-first parse.
///
/// The two strict passes anchor the day-before-month convention the sheets
/// are known to use; the lenient pass is the last resort. A value failing all
/// three stays unparsed, it never raises.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%d/%m/%Y %H:%M:%S") {
        return Some(ts);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(d.and_time(NaiveTime::MIN));
    }
    parse_day_first(s)
}

// Permissive last-resort parse. Accepts '/', '-' or '.' separators, two- or
// four-digit years, an optional time of day, and a leading four-digit year
// for ISO-style values. Day-first when the fields are ambiguous.
fn parse_day_first(s: &str) -> Option<NaiveDateTime> {
    let (date_part, time_part) = match s.split_once(' ') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };
    let fields: Vec<&str> = date_part
        .split(|c| c == '/' || c == '-' || c == '.')
        .map(|f| f.trim())
        .collect();
    if fields.len() != 3 {
        return None;
    }

    let date = if fields[0].len() == 4 {
        // Year first: no ambiguity, read as year/month/day.
        let year: i32 = fields[0].parse().ok()?;
        let month: u32 = fields[1].parse().ok()?;
        let day: u32 = fields[2].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)?
    } else {
        let first: u32 = fields[0].parse().ok()?;
        let second: u32 = fields[1].parse().ok()?;
        let mut year: i32 = fields[2].parse().ok()?;
        if year < 100 {
            year += 2000;
        }
        // Day first, swapping only when the day-first reading is impossible.
        NaiveDate::from_ymd_opt(year, second, first)
            .or_else(|| NaiveDate::from_ymd_opt(year, first, second))?
    };

    let time = match time_part {
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
            .unwrap_or(NaiveTime::MIN),
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

fn trimmed_opt(values: &[String], index: Option<usize>) -> Option<String> {
    index.map(|i| values[i].trim().to_string())
}

/// Normalizes a raw table: resolves the column bindings, parses timestamps
/// through the tiered fallback, derives the time fields, canonicalizes the
/// yes/no flags and the category columns.
///
/// The row count is invariant: no record is ever dropped for a missing or
/// unparseable field. The only error is a table with zero rows.
pub fn normalize(raw: &RawTable) -> Result<NormalizedTable, ConsolidationErrors> {
    if raw.rows.is_empty() {
        return Err(ConsolidationErrors::EmptyTable);
    }

    let headers: Vec<String> = raw.headers.iter().map(|h| h.trim().to_string()).collect();
    let columns = schema::resolve_columns(&headers);
    info!(
        "normalize: {} rows, timestamp: {:?}, leader: {:?}, meeting: {:?}",
        raw.rows.len(),
        columns.timestamp.is_some(),
        columns.leader.as_ref().map(|c| &c.header),
        columns.meeting.as_ref().map(|c| &c.header),
    );

    let flag_columns = [columns.call_made, columns.in_small_group, columns.visit_made];

    let mut records: Vec<NormalizedRecord> = Vec::with_capacity(raw.rows.len());
    for (lineno, row) in raw.rows.iter().enumerate() {
        let mut values = row.clone();
        values.resize(headers.len(), String::new());

        let timestamp = columns.timestamp.and_then(|i| {
            let parsed = parse_timestamp(&values[i]);
            if parsed.is_none() && !values[i].trim().is_empty() {
                warn!(
                    "normalize: row {}: unparseable timestamp {:?}, keeping record without time fields",
                    lineno + 1,
                    values[i]
                );
            }
            parsed
        });
        debug!("normalize: row {}: timestamp {:?}", lineno + 1, timestamp);

        for idx in flag_columns.iter().flatten() {
            values[*idx] = schema::normalize_flag(&values[*idx]);
        }

        let weekday = timestamp.map(|ts| ts.weekday().num_days_from_monday());
        let neighborhood = columns.neighborhood.map(|i| {
            let b = values[i].trim();
            if b.is_empty() {
                schema::UNSPECIFIED.to_string()
            } else {
                schema::title_case(b)
            }
        });

        records.push(NormalizedRecord {
            timestamp,
            year: timestamp.map(|ts| ts.year()),
            month: timestamp.map(|ts| ts.month()),
            month_name: timestamp.map(|ts| MONTH_NAMES[ts.month0() as usize].to_string()),
            iso_week: timestamp.map(|ts| ts.iso_week().week()),
            weekday_name: weekday.map(|d| WEEKDAY_NAMES[d as usize].to_string()),
            date: timestamp.map(|ts| ts.date()),
            is_weekend: None,
            call_made: columns.call_made.map(|i| values[i].clone()),
            in_small_group: columns.in_small_group.map(|i| values[i].clone()),
            visit_made: columns.visit_made.map(|i| values[i].clone()),
            age_group: trimmed_opt(&values, columns.age_group),
            neighborhood,
            meeting: trimmed_opt(&values, columns.meeting.as_ref().map(|c| c.index)),
            values,
        });
    }

    // Weekend flag, decided over the whole dataset: when any record falls on
    // a weekday only Saturday/Sunday records are weekend; a dataset made of
    // weekend days only (a congregation registering on Saturdays) flags every
    // record as weekend.
    let has_weekday = records
        .iter()
        .filter_map(|r| r.timestamp)
        .any(|ts| ts.weekday().num_days_from_monday() < 5);
    for r in records.iter_mut() {
        if let Some(ts) = r.timestamp {
            r.is_weekend = Some(!has_weekday || ts.weekday().num_days_from_monday() >= 5);
        }
    }

    let summary = build_summary(&records);
    info!(
        "normalize: {} timestamps parsed, {} unparsed",
        summary.parsed_timestamps, summary.unparsed_timestamps
    );

    Ok(NormalizedTable {
        headers,
        records,
        columns,
        summary,
    })
}

fn build_summary(records: &[NormalizedRecord]) -> DataSummary {
    let parsed: Vec<NaiveDateTime> = records.iter().filter_map(|r| r.timestamp).collect();
    let mut years: Vec<i32> = parsed.iter().map(|ts| ts.year()).collect();
    years.sort_unstable();
    years.dedup();
    let mut weekdays: Vec<String> = Vec::new();
    for r in records.iter() {
        if let Some(name) = &r.weekday_name {
            if !weekdays.contains(name) {
                weekdays.push(name.clone());
            }
        }
    }
    DataSummary {
        total_records: records.len() as u64,
        parsed_timestamps: parsed.len() as u64,
        unparsed_timestamps: (records.len() - parsed.len()) as u64,
        first_date: parsed.iter().min().map(|ts| ts.date()),
        last_date: parsed.iter().max().map(|ts| ts.date()),
        years,
        weekdays,
    }
}
