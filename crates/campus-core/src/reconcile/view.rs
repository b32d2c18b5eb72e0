// ── List view derivation ──
//
// Pure functions from (snapshot, view state) to what the list shows.
// Re-run after every fetch so filters, tab counts and category options
// always reflect fresh data.

use std::collections::BTreeMap;

use campus_api::{Incident, Worker};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use strum::{Display, EnumString};

use crate::store::ListState;

pub const EMPTY_ACTIVE: &str = "No active incidents.";
pub const EMPTY_FILTERED: &str = "No incidents match the selected filters.";
pub const EMPTY_RESOLVED: &str = "No resolved incidents.";

/// Which half of the list is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Active,
    Resolved,
}

/// Active-tab filters. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// Exact risk level (`Nivel_Riesgo`).
    pub severity: Option<String>,
    /// Exact category (`tipo`).
    pub category: Option<String>,
    /// State, compared case-insensitively.
    pub status: Option<String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.severity.is_none() && self.category.is_none() && self.status.is_none()
    }

    pub fn matches(&self, incident: &Incident) -> bool {
        if let Some(severity) = &self.severity {
            if incident.severity.as_deref() != Some(severity.as_str()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if incident.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if !incident
                .status
                .as_deref()
                .unwrap_or_default()
                .eq_ignore_ascii_case(status)
            {
                return false;
            }
        }
        true
    }
}

/// Viewer-controlled presentation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filters: Filters,
    pub tab: Tab,
}

/// Resolved incidents completed on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGroup {
    /// `None` for incidents with no usable date.
    pub date: Option<NaiveDate>,
    pub incidents: Vec<Incident>,
}

/// Body of the selected tab.
#[derive(Debug, Clone, PartialEq)]
pub enum ListBody {
    Rows(Vec<Incident>),
    Groups(Vec<ResolvedGroup>),
    Empty(&'static str),
}

/// Everything needed to draw the incident list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub tab: Tab,
    pub body: ListBody,
    /// Active incidents after filtering.
    pub active_count: usize,
    pub resolved_count: usize,
    /// Distinct categories in the fresh data, first-seen order.
    pub categories: Vec<String>,
    pub error: Option<String>,
    pub loading: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl ListView {
    pub fn build(state: &ListState, view: &ViewState) -> Self {
        let incidents: &[Incident] = state
            .snapshot
            .as_ref()
            .map_or(&[], |snapshot| snapshot.incidents.as_slice());

        let (resolved, active): (Vec<&Incident>, Vec<&Incident>) =
            incidents.iter().partition(|i| i.is_resolved());
        let filtered: Vec<Incident> = active
            .into_iter()
            .filter(|i| view.filters.matches(i))
            .cloned()
            .collect();

        let active_count = filtered.len();
        let resolved_count = resolved.len();

        let body = match view.tab {
            Tab::Active if filtered.is_empty() => ListBody::Empty(if view.filters.is_empty() {
                EMPTY_ACTIVE
            } else {
                EMPTY_FILTERED
            }),
            Tab::Active => ListBody::Rows(filtered),
            Tab::Resolved if resolved.is_empty() => ListBody::Empty(EMPTY_RESOLVED),
            Tab::Resolved => ListBody::Groups(group_by_completion(&resolved)),
        };

        Self {
            tab: view.tab,
            body,
            active_count,
            resolved_count,
            categories: categories(incidents),
            error: state.error.clone(),
            loading: state.loading,
            fetched_at: state.snapshot.as_ref().map(|s| s.fetched_at),
        }
    }
}

/// Group by completion day, most recent first, undated last.
fn group_by_completion(resolved: &[&Incident]) -> Vec<ResolvedGroup> {
    let mut dated: BTreeMap<NaiveDate, Vec<Incident>> = BTreeMap::new();
    let mut undated = Vec::new();
    for incident in resolved {
        match incident.completed_date() {
            Some(date) => dated.entry(date).or_default().push((*incident).clone()),
            None => undated.push((*incident).clone()),
        }
    }

    let mut groups: Vec<ResolvedGroup> = dated
        .into_iter()
        .rev()
        .map(|(date, incidents)| ResolvedGroup {
            date: Some(date),
            incidents,
        })
        .collect();
    if !undated.is_empty() {
        groups.push(ResolvedGroup {
            date: None,
            incidents: undated,
        });
    }
    groups
}

fn categories(incidents: &[Incident]) -> Vec<String> {
    let mut seen = Vec::new();
    for category in incidents.iter().filter_map(|i| i.category.as_deref()) {
        if !category.is_empty() && !seen.iter().any(|c: &String| c == category) {
            seen.push(category.to_owned());
        }
    }
    seen
}

// ── Worker availability ──────────────────────────────────────────────

/// A worker with their current load, for the assign flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerLoad {
    pub worker: Worker,
    /// Incidents assigned to this worker that are neither resolved nor closed.
    pub active_incidents: usize,
}

impl WorkerLoad {
    pub fn is_available(&self) -> bool {
        self.active_incidents == 0
    }
}

/// Pair each worker with their open assignment count.
pub fn worker_loads(workers: Vec<Worker>, incidents: &[Incident]) -> Vec<WorkerLoad> {
    workers
        .into_iter()
        .map(|worker| {
            let active_incidents = incidents
                .iter()
                .filter(|i| i.is_open() && i.assigned_to.as_deref() == Some(worker.email.as_str()))
                .count();
            WorkerLoad {
                worker,
                active_incidents,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::Snapshot;

    fn incident(id: &str, status: &str, category: &str, severity: &str) -> Incident {
        let mut incident = Incident::with_id(id);
        incident.status = Some(status.into());
        incident.category = Some(category.into());
        incident.severity = Some(severity.into());
        incident
    }

    fn resolved_on(id: &str, completed: Option<&str>, created: Option<&str>) -> Incident {
        let mut incident = Incident::with_id(id);
        incident.status = Some("resuelto".into());
        incident.completed_at = completed.map(str::to_owned);
        incident.created_at = created.map(str::to_owned);
        incident
    }

    fn state(incidents: Vec<Incident>) -> ListState {
        ListState {
            snapshot: Some(Arc::new(Snapshot {
                incidents,
                fetched_at: Utc::now(),
            })),
            ..ListState::default()
        }
    }

    fn ids(body: &ListBody) -> Vec<&str> {
        match body {
            ListBody::Rows(rows) => rows.iter().map(|i| i.id.as_str()).collect(),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn filters_apply_to_active_tab_only() {
        let state = state(vec![
            incident("a", "pendiente", "plumbing", "alto"),
            incident("b", "asignado", "electrical", "bajo"),
            incident("c", "Resuelto", "plumbing", "alto"),
        ]);
        let view = ViewState {
            filters: Filters {
                category: Some("plumbing".into()),
                ..Filters::default()
            },
            tab: Tab::Active,
        };

        let list = ListView::build(&state, &view);
        assert_eq!(ids(&list.body), vec!["a"]);
        assert_eq!(list.active_count, 1);
        assert_eq!(list.resolved_count, 1);
        assert_eq!(list.categories, vec!["plumbing", "electrical"]);
    }

    #[test]
    fn status_filter_ignores_case() {
        let state = state(vec![
            incident("a", "Asignado", "x", "bajo"),
            incident("b", "pendiente", "x", "bajo"),
        ]);
        let view = ViewState {
            filters: Filters {
                status: Some("asignado".into()),
                ..Filters::default()
            },
            ..ViewState::default()
        };
        assert_eq!(ids(&ListView::build(&state, &view).body), vec!["a"]);
    }

    #[test]
    fn empty_messages_distinguish_filters() {
        let state = state(vec![incident("a", "pendiente", "x", "bajo")]);

        let filtered = ViewState {
            filters: Filters {
                severity: Some("alto".into()),
                ..Filters::default()
            },
            ..ViewState::default()
        };
        assert_eq!(
            ListView::build(&state, &filtered).body,
            ListBody::Empty(EMPTY_FILTERED)
        );

        let empty = ListState::default();
        assert_eq!(
            ListView::build(&empty, &ViewState::default()).body,
            ListBody::Empty(EMPTY_ACTIVE)
        );

        let resolved_tab = ViewState {
            tab: Tab::Resolved,
            ..ViewState::default()
        };
        assert_eq!(
            ListView::build(&state, &resolved_tab).body,
            ListBody::Empty(EMPTY_RESOLVED)
        );
    }

    #[test]
    fn resolved_grouped_by_completion_day_newest_first() {
        let state = state(vec![
            resolved_on("early", Some("2024-11-10T09:00:00"), None),
            resolved_on("undated", None, None),
            resolved_on("late-a", Some("2024-11-12T09:00:00"), None),
            resolved_on("fallback", None, Some("2024-11-11T12:00:00")),
            resolved_on("late-b", Some("2024-11-12T18:00:00"), None),
        ]);
        let view = ViewState {
            tab: Tab::Resolved,
            ..ViewState::default()
        };

        let ListBody::Groups(groups) = ListView::build(&state, &view).body else {
            panic!("expected groups");
        };
        let shape: Vec<(Option<NaiveDate>, Vec<&str>)> = groups
            .iter()
            .map(|g| (g.date, g.incidents.iter().map(|i| i.id.as_str()).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (NaiveDate::from_ymd_opt(2024, 11, 12), vec!["late-a", "late-b"]),
                (NaiveDate::from_ymd_opt(2024, 11, 11), vec!["fallback"]),
                (NaiveDate::from_ymd_opt(2024, 11, 10), vec!["early"]),
                (None, vec!["undated"]),
            ]
        );
    }

    #[test]
    fn fetch_error_is_carried_inline() {
        let mut state = state(Vec::new());
        state.error = Some("HTTP 500".into());
        let list = ListView::build(&state, &ViewState::default());
        assert_eq!(list.error.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn worker_availability_counts_open_assignments() {
        let worker = |email: &str| Worker {
            email: email.into(),
            name: None,
            specialty: None,
            role: Some("trabajador".into()),
        };
        let assigned = |id: &str, status: &str, email: &str| {
            let mut incident = Incident::with_id(id);
            incident.status = Some(status.into());
            incident.assigned_to = Some(email.into());
            incident
        };

        let loads = worker_loads(
            vec![worker("busy@uni.edu"), worker("free@uni.edu")],
            &[
                assigned("1", "asignado", "busy@uni.edu"),
                assigned("2", "en atención", "busy@uni.edu"),
                assigned("3", "resuelto", "free@uni.edu"),
                assigned("4", "cerrado", "free@uni.edu"),
            ],
        );
        assert_eq!(loads[0].active_incidents, 2);
        assert!(!loads[0].is_available());
        assert!(loads[1].is_available());
    }
}
