//! The filter & aggregation engine.
//!
//! Filters compose with a logical AND across dimensions. Every time-based
//! filter ORs with "timestamp absent" so that un-dated records always survive
//! temporal filtering; the equality filters (age group, leader, meeting) have
//! no such bypass.

use log::{debug, info};

use std::collections::BTreeMap;

use crate::config::*;
use crate::normalize::MONTH_NAMES;
use crate::schema::YES;

/// The funnel stage labels, in pipeline order.
pub static FUNNEL_STAGES: &[&str] = &["Personas Nuevas", "Llamadas", "En Célula", "Visitadas"];

const NEIGHBORHOOD_TOP: usize = 10;

fn month_in_range(month: u32, start: u32, end: u32) -> bool {
    if start <= end {
        month >= start && month <= end
    } else {
        // The range crosses the year boundary (e.g. November..February).
        month >= start || month <= end
    }
}

/// Applies the criteria and returns the indices of the surviving records, in
/// table order.
pub fn apply_filters(table: &NormalizedTable, criteria: &FilterCriteria) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::new();
    for (idx, r) in table.records.iter().enumerate() {
        if let Some(years) = &criteria.years {
            // An empty selection means no restriction.
            if !years.is_empty() {
                if let Some(y) = r.year {
                    if !years.contains(&y) {
                        continue;
                    }
                }
                // Absent timestamp: kept under any year selection.
            }
        }
        if let Some((start, end)) = criteria.month_range {
            if let Some(m) = r.month {
                if !month_in_range(m, start, end) {
                    continue;
                }
            }
        }
        if let Some(selected_age) = &criteria.age_group {
            if table.columns.age_group.is_some()
                && r.age_group.as_deref() != Some(selected_age.as_str())
            {
                continue;
            }
        }
        if let Some(selected_leader) = &criteria.leader {
            if let Some(col) = &table.columns.leader {
                if r.values[col.index] != *selected_leader {
                    continue;
                }
            }
        }
        if let Some(selected_meeting) = &criteria.meeting {
            if table.columns.meeting.is_some()
                && r.meeting.as_deref() != Some(selected_meeting.as_str())
            {
                continue;
            }
        }
        selected.push(idx);
    }
    info!(
        "apply_filters: {} of {} records kept",
        selected.len(),
        table.records.len()
    );
    selected
}

/// Percentage of `part` over `total`; exactly 0 when the denominator is 0.
fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn is_yes(flag: &Option<String>) -> bool {
    flag.as_deref() == Some(YES)
}

#[derive(Default)]
struct FlagCounts {
    records: u64,
    calls: u64,
    in_group: u64,
    visits: u64,
}

impl FlagCounts {
    fn add(&mut self, r: &NormalizedRecord) {
        self.records += 1;
        if is_yes(&r.call_made) {
            self.calls += 1;
        }
        if is_yes(&r.in_small_group) {
            self.in_group += 1;
        }
        if is_yes(&r.visit_made) {
            self.visits += 1;
        }
    }
}

// Frequency counts ordered by descending count, ties by name.
fn distribution<'a, I: Iterator<Item = &'a str>>(values: I) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for v in values {
        if !v.trim().is_empty() {
            *counts.entry(v).or_insert(0) += 1;
        }
    }
    let mut res: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(name, count)| CategoryCount {
            name: name.to_string(),
            count,
        })
        .collect();
    res.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));
    res
}

/// Computes the full metric set over the records selected by `apply_filters`.
pub fn compute_metrics(table: &NormalizedTable, selected: &[usize]) -> Metrics {
    let records: Vec<&NormalizedRecord> = selected.iter().map(|i| &table.records[*i]).collect();

    let mut total = FlagCounts::default();
    for r in records.iter() {
        total.add(r);
    }
    let totals = Totals {
        records: total.records,
        calls: total.calls,
        in_group: total.in_group,
        visits: total.visits,
        pct_calls: percentage(total.calls, total.records),
        pct_in_group: percentage(total.in_group, total.records),
        pct_visits: percentage(total.visits, total.records),
    };

    let mut monthly_counts: BTreeMap<u32, u64> = BTreeMap::new();
    let mut weekly_counts: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for r in records.iter() {
        if let Some(m) = r.month {
            *monthly_counts.entry(m).or_insert(0) += 1;
        }
        if let (Some(y), Some(w)) = (r.year, r.iso_week) {
            *weekly_counts.entry((y, w)).or_insert(0) += 1;
        }
    }
    let monthly: Vec<MonthlyCount> = monthly_counts
        .into_iter()
        .map(|(month, count)| MonthlyCount {
            month,
            month_name: MONTH_NAMES[(month - 1) as usize].to_string(),
            count,
        })
        .collect();
    let weekly: Vec<WeeklyCount> = weekly_counts
        .into_iter()
        .map(|((year, week), count)| WeeklyCount {
            year,
            week,
            period: format!("{}-S{:02}", year, week),
            count,
        })
        .collect();

    let funnel_values = [total.records, total.calls, total.in_group, total.visits];
    let funnel: Vec<FunnelStage> = FUNNEL_STAGES
        .iter()
        .zip(funnel_values.iter())
        .map(|(stage, value)| FunnelStage {
            stage: stage.to_string(),
            value: *value,
        })
        .collect();

    let by_leader = table.columns.leader.as_ref().map(|col| {
        breakdown(records.iter().map(|r| (r.values[col.index].as_str(), *r)))
    });
    let by_meeting = table
        .columns
        .meeting
        .as_ref()
        .map(|_| breakdown(records.iter().map(|r| (r.meeting.as_deref().unwrap_or(""), *r))));

    let age_groups = distribution(records.iter().filter_map(|r| r.age_group.as_deref()));
    let mut neighborhoods = distribution(records.iter().filter_map(|r| r.neighborhood.as_deref()));
    neighborhoods.truncate(NEIGHBORHOOD_TOP);
    let meetings = table
        .columns
        .meeting
        .as_ref()
        .map(|_| distribution(records.iter().filter_map(|r| r.meeting.as_deref())));

    debug!(
        "compute_metrics: {} records, {} monthly buckets, {} weekly buckets",
        totals.records,
        monthly.len(),
        weekly.len()
    );

    Metrics {
        totals,
        monthly,
        weekly,
        funnel,
        by_leader,
        by_meeting,
        age_groups,
        neighborhoods,
        meetings,
    }
}

// Per-group flag counts and percentages, groups sorted by name. Records with
// an empty group value are left out, matching the original sheets where an
// unassigned row simply does not belong to any group.
fn breakdown<'a, I>(pairs: I) -> Vec<GroupStats>
where
    I: Iterator<Item = (&'a str, &'a NormalizedRecord)>,
{
    let mut groups: BTreeMap<String, FlagCounts> = BTreeMap::new();
    for (key, r) in pairs {
        if key.trim().is_empty() {
            continue;
        }
        groups.entry(key.to_string()).or_default().add(r);
    }
    groups
        .into_iter()
        .map(|(name, c)| GroupStats {
            name,
            records: c.records,
            calls: c.calls,
            in_group: c.in_group,
            visits: c.visits,
            pct_calls: round1(percentage(c.calls, c.records)),
            pct_in_group: round1(percentage(c.in_group, c.records)),
            pct_visits: round1(percentage(c.visits, c.records)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TableBuilder;
    use crate::normalize::normalize;

    fn follow_up_table() -> NormalizedTable {
        let mut builder = TableBuilder::new(&[
            "Marca temporal",
            "Nombres y apellidos completos",
            "Tú eres:",
            "¿En qué barrio vives?",
            "Llamada realizada y contestada (SI/NO)",
            "Ubicado en célula o Grupo Go! (SI/NO)",
            "Líder Principal",
            "Reunión",
        ]);
        builder
            .row(&["15/01/2024 10:00:00", "Ana", "Joven", "san felipe", "Sí", "no", "Carlos", "Dominical"])
            .row(&["invalid-date", "Luis", "Adulto", "", "sin gestión", "maybe", "Carlos", "Dominical"])
            .row(&["20/02/2024", "Marta", "Joven", "el centro", "yes", "1", "Diana", "Jóvenes"])
            .row(&["10/06/2023", "Pedro", "Adulto", "san felipe", "N", "0", "Diana", ""]);
        normalize(&builder.build()).unwrap()
    }

    #[test]
    fn no_criteria_keeps_everything() {
        let table = follow_up_table();
        assert_eq!(apply_filters(&table, &FilterCriteria::ALL).len(), 4);
    }

    #[test]
    fn year_filter_keeps_undated_records() {
        let table = follow_up_table();
        let criteria = FilterCriteria {
            years: Some(vec![2024]),
            ..FilterCriteria::default()
        };
        // Two 2024 records, plus the invalid-date record which always
        // survives temporal filtering. The 2023 record is dropped.
        assert_eq!(apply_filters(&table, &criteria), vec![0, 1, 2]);
    }

    #[test]
    fn empty_year_selection_is_no_restriction() {
        let table = follow_up_table();
        let criteria = FilterCriteria {
            years: Some(vec![]),
            ..FilterCriteria::default()
        };
        assert_eq!(apply_filters(&table, &criteria).len(), 4);
    }

    #[test]
    fn disabled_month_range_has_no_effect() {
        let table = follow_up_table();
        let with_years = FilterCriteria {
            years: Some(vec![2023, 2024]),
            ..FilterCriteria::default()
        };
        let mut with_months = with_years.clone();
        with_months.month_range = None;
        assert_eq!(
            apply_filters(&table, &with_years),
            apply_filters(&table, &with_months)
        );
    }

    #[test]
    fn month_range_plain() {
        let table = follow_up_table();
        let criteria = FilterCriteria {
            month_range: Some((1, 2)),
            ..FilterCriteria::default()
        };
        // January, February and the undated record; June is out.
        assert_eq!(apply_filters(&table, &criteria), vec![0, 1, 2]);
    }

    #[test]
    fn month_range_wraps_across_december() {
        let table = follow_up_table();
        let criteria = FilterCriteria {
            month_range: Some((11, 2)),
            ..FilterCriteria::default()
        };
        // month=1 and month=2 are kept, month=6 is excluded, the undated
        // record survives.
        assert_eq!(apply_filters(&table, &criteria), vec![0, 1, 2]);
        assert!(month_in_range(12, 11, 2));
        assert!(month_in_range(1, 11, 2));
        assert!(!month_in_range(6, 11, 2));
    }

    #[test]
    fn equality_filters_have_no_bypass() {
        let table = follow_up_table();
        let criteria = FilterCriteria {
            age_group: Some("Joven".to_string()),
            ..FilterCriteria::default()
        };
        assert_eq!(apply_filters(&table, &criteria), vec![0, 2]);

        let criteria = FilterCriteria {
            leader: Some("Diana".to_string()),
            ..FilterCriteria::default()
        };
        assert_eq!(apply_filters(&table, &criteria), vec![2, 3]);

        let criteria = FilterCriteria {
            meeting: Some("Dominical".to_string()),
            ..FilterCriteria::default()
        };
        // The record with an empty meeting value is excluded by the plain
        // equality test.
        assert_eq!(apply_filters(&table, &criteria), vec![0, 1]);
    }

    #[test]
    fn filters_compose_with_and() {
        let table = follow_up_table();
        let criteria = FilterCriteria {
            years: Some(vec![2024]),
            age_group: Some("Joven".to_string()),
            leader: Some("Carlos".to_string()),
            ..FilterCriteria::default()
        };
        assert_eq!(apply_filters(&table, &criteria), vec![0]);
    }

    #[test]
    fn totals_and_percentages() {
        let table = follow_up_table();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        assert_eq!(metrics.totals.records, 4);
        assert_eq!(metrics.totals.calls, 2);
        assert_eq!(metrics.totals.in_group, 1);
        // No visit column in this table.
        assert_eq!(metrics.totals.visits, 0);
        assert!((metrics.totals.pct_calls - 50.0).abs() < 1e-9);
        assert!((metrics.totals.pct_in_group - 25.0).abs() < 1e-9);
    }

    #[test]
    fn percentages_of_an_empty_selection_are_zero() {
        let table = follow_up_table();
        let metrics = compute_metrics(&table, &[]);
        assert_eq!(metrics.totals.records, 0);
        assert_eq!(metrics.totals.pct_calls, 0.0);
        assert_eq!(metrics.totals.pct_in_group, 0.0);
        assert_eq!(metrics.totals.pct_visits, 0.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn monthly_series_scenario() {
        // The spec scenario: 3 records, one unparseable date, year filter
        // {2024} keeps all 3, the monthly series has one count per month.
        let mut builder = TableBuilder::new(&[
            "Marca temporal",
            "Llamada realizada y contestada (SI/NO)",
            "Ubicado en célula o Grupo Go! (SI/NO)",
        ]);
        builder
            .row(&["15/01/2024 10:00:00", "SI", "NO"])
            .row(&["invalid-date", "NO", "NO"])
            .row(&["20/02/2024", "SI", "SI"]);
        let table = normalize(&builder.build()).unwrap();
        assert_eq!(table.summary.unparsed_timestamps, 1);

        let criteria = FilterCriteria {
            years: Some(vec![2024]),
            ..FilterCriteria::default()
        };
        let selected = apply_filters(&table, &criteria);
        assert_eq!(selected.len(), 3);

        let metrics = compute_metrics(&table, &selected);
        assert_eq!(
            metrics.monthly,
            vec![
                MonthlyCount {
                    month: 1,
                    month_name: "Enero".to_string(),
                    count: 1
                },
                MonthlyCount {
                    month: 2,
                    month_name: "Febrero".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn weekly_series_labels() {
        let table = follow_up_table();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        let periods: Vec<&str> = metrics.weekly.iter().map(|w| w.period.as_str()).collect();
        // 10/06/2023 is ISO week 23, 15/01/2024 week 3, 20/02/2024 week 8.
        assert_eq!(periods, vec!["2023-S23", "2024-S03", "2024-S08"]);
        assert!(metrics.weekly.iter().all(|w| w.count == 1));
    }

    #[test]
    fn funnel_stages() {
        let table = follow_up_table();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        let stages: Vec<&str> = metrics.funnel.iter().map(|f| f.stage.as_str()).collect();
        assert_eq!(
            stages,
            vec!["Personas Nuevas", "Llamadas", "En Célula", "Visitadas"]
        );
        assert_eq!(metrics.funnel[0].value, 4);
        assert_eq!(metrics.funnel[1].value, 2);
    }

    #[test]
    fn leader_breakdown() {
        let table = follow_up_table();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        let by_leader = metrics.by_leader.unwrap();
        assert_eq!(by_leader.len(), 2);
        assert_eq!(by_leader[0].name, "Carlos");
        assert_eq!(by_leader[0].records, 2);
        assert_eq!(by_leader[0].calls, 1);
        assert_eq!(by_leader[0].pct_calls, 50.0);
        assert_eq!(by_leader[1].name, "Diana");
        assert_eq!(by_leader[1].calls, 1);
        assert_eq!(by_leader[1].pct_calls, 50.0);
    }

    #[test]
    fn breakdown_rounds_to_one_decimal() {
        let mut builder = TableBuilder::new(&[
            "Llamada realizada y contestada (SI/NO)",
            "Líder Principal",
        ]);
        builder.row(&["SI", "Eva"]).row(&["NO", "Eva"]).row(&["NO", "Eva"]);
        let table = normalize(&builder.build()).unwrap();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        let by_leader = metrics.by_leader.unwrap();
        // 1/3 = 33.333..., rounded to one decimal.
        assert_eq!(by_leader[0].pct_calls, 33.3);
    }

    #[test]
    fn absent_leader_column_omits_the_breakdown() {
        let mut builder = TableBuilder::new(&[
            "Marca temporal",
            "Llamada realizada y contestada (SI/NO)",
        ]);
        builder.row(&["15/01/2024", "SI"]);
        let table = normalize(&builder.build()).unwrap();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        assert!(metrics.by_leader.is_none());
        assert!(metrics.by_meeting.is_none());
        assert!(metrics.meetings.is_none());
        // Everything else still computes.
        assert_eq!(metrics.totals.records, 1);
        assert_eq!(metrics.monthly.len(), 1);
    }

    #[test]
    fn meeting_breakdown_skips_empty_values() {
        let table = follow_up_table();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        let by_meeting = metrics.by_meeting.unwrap();
        let names: Vec<&str> = by_meeting.iter().map(|g| g.name.as_str()).collect();
        // Pedro's empty meeting value does not form a group.
        assert_eq!(names, vec!["Dominical", "Jóvenes"]);
        assert_eq!(by_meeting[0].records, 2);
    }

    #[test]
    fn placeholder_neighborhood_is_a_bucket() {
        let table = follow_up_table();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        let placeholder = metrics
            .neighborhoods
            .iter()
            .find(|c| c.name == "No especificado")
            .unwrap();
        assert_eq!(placeholder.count, 1);
        // Sorted by descending count.
        assert_eq!(metrics.neighborhoods[0].name, "San Felipe");
        assert_eq!(metrics.neighborhoods[0].count, 2);
    }

    #[test]
    fn neighborhood_distribution_is_capped() {
        let mut builder = TableBuilder::new(&["¿En qué barrio vives?"]);
        for i in 0..15 {
            let name = format!("Barrio {:02}", i);
            builder.row(&[name.as_str()]);
        }
        let table = normalize(&builder.build()).unwrap();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        assert_eq!(metrics.neighborhoods.len(), 10);
    }

    #[test]
    fn age_distribution() {
        let table = follow_up_table();
        let selected = apply_filters(&table, &FilterCriteria::ALL);
        let metrics = compute_metrics(&table, &selected);
        assert_eq!(
            metrics.age_groups,
            vec![
                CategoryCount {
                    name: "Adulto".to_string(),
                    count: 2
                },
                CategoryCount {
                    name: "Joven".to_string(),
                    count: 2
                },
            ]
        );
    }
}
