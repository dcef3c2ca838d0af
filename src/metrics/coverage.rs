use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::parsing::coverage_percentage;
use crate::types::{CoverageStats, ExpiringReservation, ReservedInstance, RunningInstance};

/// Match running instances against active reservations of the same type
pub fn calculate_coverage(running: &[RunningInstance], reserved: &[ReservedInstance]) -> CoverageStats {
    let mut running_by_type: BTreeMap<String, u32> = BTreeMap::new();
    for inst in running {
        *running_by_type.entry(inst.instance_type.clone()).or_default() += 1;
    }

    let mut reserved_by_type: BTreeMap<String, u32> = BTreeMap::new();
    for ri in reserved {
        *reserved_by_type.entry(ri.instance_type.clone()).or_default() += ri.count;
    }

    let mut covered_instances = 0;
    let mut uncovered_by_type = BTreeMap::new();
    for (instance_type, &count) in &running_by_type {
        let available = reserved_by_type.get(instance_type).copied().unwrap_or(0);
        let covered = count.min(available);
        covered_instances += covered;
        if count > covered {
            uncovered_by_type.insert(instance_type.clone(), count - covered);
        }
    }

    let total_instances: u32 = running_by_type.values().sum();
    let total_reserved_instances: u32 = reserved_by_type.values().sum();

    let mut ri_details = reserved.to_vec();
    // stable: reservations ending the same day keep their listing order
    ri_details.sort_by_key(|ri| ri.end_date);
    let soonest_expiring = ri_details.first().map(ExpiringReservation::from);

    CoverageStats {
        total_instances,
        total_reserved_instances,
        covered_instances,
        uncovered_instances: total_instances - covered_instances,
        coverage_percentage: coverage_percentage(covered_instances, total_instances),
        running_by_type,
        reserved_by_type,
        uncovered_by_type,
        ri_details,
        soonest_expiring,
    }
}

/// Reservations whose end date falls on or before `today + days`, soonest first
pub fn expiring_within(reserved: &[ReservedInstance], today: NaiveDate, days: i64) -> Vec<ReservedInstance> {
    // a window past the calendar range covers every reservation
    let cutoff = Duration::try_days(days)
        .and_then(|d| today.checked_add_signed(d))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX });
    let mut expiring: Vec<ReservedInstance> = reserved
        .iter()
        .filter(|ri| ri.end_date <= cutoff)
        .cloned()
        .collect();
    expiring.sort_by_key(|ri| ri.end_date);
    expiring
}
