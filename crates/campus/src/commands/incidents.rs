//! Incident command handlers.

use std::fmt::Write as _;

use tabled::Tabled;

use campus_core::{
    Controller, Incident, IncidentDraft, IncidentPatch, ListBody, ListView, ResolvedGroup,
};

use crate::cli::{GlobalOpts, IncidentsArgs, IncidentsCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct IncidentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Risk")]
    severity: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Assigned")]
    assigned: String,
    #[tabled(rename = "Reported")]
    reported: String,
}

impl From<&Incident> for IncidentRow {
    fn from(i: &Incident) -> Self {
        Self {
            id: i.id.clone(),
            title: i.title.clone().unwrap_or_default(),
            category: i.category.clone().unwrap_or_default(),
            severity: i.severity.clone().unwrap_or_default(),
            status: i.status_or_default().to_owned(),
            assigned: i
                .assigned_to_name
                .clone()
                .or_else(|| i.assigned_to.clone())
                .unwrap_or_default(),
            reported: i
                .created_time()
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

fn detail(i: &Incident) -> String {
    let mut out = String::new();
    let field = |out: &mut String, label: &str, value: Option<&str>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "{label:<12} {value}");
        }
    };
    field(&mut out, "ID", Some(&i.id));
    field(&mut out, "Title", i.title.as_deref());
    field(&mut out, "Description", i.description.as_deref());
    field(&mut out, "Category", i.category.as_deref());
    field(&mut out, "Floor", i.floor.as_deref());
    field(&mut out, "Location", i.location.as_deref());
    field(&mut out, "Risk", i.severity.as_deref());
    field(&mut out, "Status", Some(i.status_or_default()));
    field(&mut out, "Assigned", i.assigned_to.as_deref());
    field(&mut out, "Reported", i.created_at.as_deref());
    out.trim_end().to_owned()
}

fn group_heading(group: &ResolvedGroup) -> String {
    group.date.map_or_else(
        || "Undated".to_owned(),
        |d| d.format("%A, %d %B %Y").to_string(),
    )
}

/// Render the selected tab of a list view.
pub(crate) fn render_list_view(view: &ListView, format: &OutputFormat) -> Result<String, CliError> {
    match &view.body {
        ListBody::Rows(incidents) => output::render_list(
            format,
            incidents,
            |i| IncidentRow::from(i),
            |i| i.id.clone(),
        ),
        ListBody::Groups(groups) => match format {
            OutputFormat::Table => Ok(groups
                .iter()
                .map(|group| {
                    let rows: Vec<IncidentRow> =
                        group.incidents.iter().map(IncidentRow::from).collect();
                    format!("{}\n{}", group_heading(group), output::render_table(&rows))
                })
                .collect::<Vec<_>>()
                .join("\n\n")),
            OutputFormat::Plain => Ok(groups
                .iter()
                .flat_map(|g| g.incidents.iter().map(|i| i.id.clone()))
                .collect::<Vec<_>>()
                .join("\n")),
            _ => output::render_single(format, groups, |_| String::new(), |_| String::new()),
        },
        ListBody::Empty(message) => output::render_single(
            format,
            &Vec::<Incident>::new(),
            |_| (*message).to_owned(),
            |_| String::new(),
        ),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: IncidentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        IncidentsCommand::List { tab, filters } => {
            controller.set_tab(util::tab(tab));
            controller.set_filters(util::filters(filters));
            controller.refresh().await?;

            let out = render_list_view(&controller.list_view(), &global.output)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        IncidentsCommand::Create {
            title,
            description,
            category,
            floor,
            location,
            photo,
            severity,
        } => {
            let draft = IncidentDraft {
                title,
                description,
                category,
                floor,
                location,
                photo,
                severity,
            };
            let created = controller.create_incident(&draft).await?;
            let out = output::render_single(&global.output, &created, detail, |i| i.id.clone())?;
            output::print_output(&out, global.quiet);
            if !global.quiet {
                eprintln!("✓ Incident reported");
            }
            Ok(())
        }

        IncidentsCommand::Update {
            id,
            title,
            description,
            category,
            severity,
        } => {
            let patch = IncidentPatch {
                title,
                description,
                category,
                severity,
            };
            controller.update_incident(&id, &patch).await?;
            if !global.quiet {
                eprintln!("✓ Incident {id} updated");
            }
            Ok(())
        }

        IncidentsCommand::Assign { id, worker } => {
            controller.assign_incident(&id, &worker).await?;
            if !global.quiet {
                eprintln!("✓ Incident {id} assigned to {worker}");
            }
            Ok(())
        }

        IncidentsCommand::Complete { id } => {
            controller.complete_incident(&id).await?;
            if !global.quiet {
                eprintln!("✓ Incident {id} completed");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use campus_core::{ListState, Snapshot, Tab, ViewState};
    use chrono::Utc;
    use std::sync::Arc;

    use super::*;

    fn incident(id: &str, status: &str, created: &str) -> Incident {
        let mut i = Incident::with_id(id);
        i.title = Some(format!("Title {id}"));
        i.status = Some(status.into());
        i.created_at = Some(created.into());
        i
    }

    fn view(incidents: Vec<Incident>, tab: Tab) -> ListView {
        let state = ListState {
            snapshot: Some(Arc::new(Snapshot::new(incidents, Utc::now()))),
            version: 1,
            ..ListState::default()
        };
        ListView::build(
            &state,
            &ViewState {
                tab,
                ..ViewState::default()
            },
        )
    }

    #[test]
    fn plain_active_rows_are_ids_newest_first() {
        let v = view(
            vec![
                incident("old", "pendiente", "2024-11-01T08:00:00"),
                incident("new", "asignado", "2024-11-02T08:00:00"),
                incident("done", "resuelto", "2024-11-03T08:00:00"),
            ],
            Tab::Active,
        );
        assert_eq!(render_list_view(&v, &OutputFormat::Plain).unwrap(), "new\nold");
    }

    #[test]
    fn empty_tab_prints_message_in_table_and_array_in_json() {
        let v = view(Vec::new(), Tab::Resolved);
        assert_eq!(
            render_list_view(&v, &OutputFormat::Table).unwrap(),
            "No resolved incidents."
        );
        assert_eq!(render_list_view(&v, &OutputFormat::JsonCompact).unwrap(), "[]");
    }

    #[test]
    fn resolved_table_has_day_headings() {
        let v = view(
            vec![incident("done", "resuelto", "2024-11-16T10:15:00")],
            Tab::Resolved,
        );
        let out = render_list_view(&v, &OutputFormat::Table).unwrap();
        assert!(out.starts_with("Saturday, 16 November 2024"));
        assert!(out.contains("done"));
    }

    #[test]
    fn detail_skips_empty_fields() {
        let out = detail(&incident("42", "pendiente", "2024-11-16T10:15:00"));
        assert!(out.contains("Title        Title 42"));
        assert!(!out.contains("Floor"));
    }
}
