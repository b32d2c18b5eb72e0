//! `campus watch`: follow the realtime channel until interrupted.
//!
//! Prints one line per connection status change and per notification,
//! and the selected list tab after every completed re-fetch. Structured
//! output formats emit one JSON object per line instead.

use std::collections::HashSet;
use std::io::IsTerminal;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use campus_core::{
    ClientConfig, ConnectionState, Controller, DesktopNotifier, HistoryStore, ListState,
    Permission, Severity, Toast, ToastId, render,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::{DesktopMode, Profile};
use crate::error::CliError;
use crate::notifier::TerminalNotifier;
use crate::output::{self, Painter};

use super::incidents::render_list_view;
use super::util;

/// One line of structured watch output.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    Status {
        state: &'a str,
        attempt: u32,
    },
    Notification {
        id: ToastId,
        kind: Severity,
        title: &'a str,
        body: &'a str,
        incident_id: &'a str,
        time: &'a str,
    },
    List {
        version: u64,
        active: usize,
        resolved: usize,
        error: Option<&'a str>,
    },
}

struct Printer {
    structured: bool,
    list_format: OutputFormat,
    quiet: bool,
    show_list: bool,
    interactive: bool,
    painter: Painter,
    seen: HashSet<ToastId>,
    last_version: u64,
    last_error: Option<String>,
}

impl Printer {
    fn new(global: &GlobalOpts, show_list: bool) -> Self {
        let structured = matches!(
            global.output,
            OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml
        );
        let list_format = match global.output {
            OutputFormat::Plain => OutputFormat::Plain,
            _ => OutputFormat::Table,
        };
        Self {
            structured,
            list_format,
            quiet: global.quiet,
            show_list,
            interactive: std::io::stdin().is_terminal(),
            painter: Painter::new(&global.color),
            seen: HashSet::new(),
            last_version: 0,
            last_error: None,
        }
    }

    fn emit(&self, event: &WatchEvent<'_>) {
        match serde_json::to_string(event) {
            Ok(line) => output::print_output(&line, self.quiet),
            Err(e) => tracing::warn!(error = %e, "could not serialize watch event"),
        }
    }

    fn line(&self, text: &str) {
        let stamp = self.painter.dim(&format!("[{}]", util::now_hms()));
        output::print_output(&format!("{stamp} {text}"), self.quiet);
    }

    fn status(&self, state: &ConnectionState) {
        if self.structured {
            self.emit(&WatchEvent::Status {
                state: state.label(),
                attempt: state.attempt(),
            });
            return;
        }
        let mut text = format!("● {}", state.label());
        match state {
            ConnectionState::ReconnectPending { attempt, delay } => {
                text.push_str(&format!(" (attempt {attempt} in {}s)", delay.as_secs()));
            }
            ConnectionState::Failed { attempts } => {
                text.push_str(&format!(" after {attempts} retries"));
                if self.interactive {
                    text.push_str("; press Enter to try again");
                }
            }
            _ => {}
        }
        self.line(&self.painter.status(state, &text));
    }

    /// Print toasts not seen before.
    fn toasts(&mut self, toasts: &[Toast]) {
        let overlay = render(toasts);
        for toast in overlay.toasts.iter().filter(|t| !t.fading) {
            if !self.seen.insert(toast.id) {
                continue;
            }
            let notification = toasts.iter().find(|t| t.id == toast.id);
            let title = notification.map_or("", |t| t.notification.title.as_str());
            if self.structured {
                self.emit(&WatchEvent::Notification {
                    id: toast.id,
                    kind: toast.kind,
                    title,
                    body: &toast.body,
                    incident_id: &toast.subject_id,
                    time: &toast.time,
                });
            } else {
                let heading = self.painter.severity(toast.kind, &toast.heading);
                let details = self.painter.dim(&format!("(incident {})", toast.subject_id));
                output::print_output(
                    &format!("[{}] {heading}  {}  {details}", toast.time, toast.body),
                    self.quiet,
                );
            }
        }
        // Ids only grow, so a toast that left never comes back.
        let current: HashSet<ToastId> = toasts.iter().map(|t| t.id).collect();
        self.seen.retain(|id| current.contains(id));
    }

    fn list(&mut self, state: &ListState, controller: &Controller) -> Result<(), CliError> {
        if state.error != self.last_error {
            if let Some(error) = &state.error {
                if !self.structured {
                    self.line(&self.painter.error(&format!("✖ Could not refresh incidents: {error}")));
                }
            }
            self.last_error.clone_from(&state.error);
        }
        if state.version == self.last_version {
            return Ok(());
        }
        self.last_version = state.version;

        let view = controller.list_view();
        if self.structured {
            self.emit(&WatchEvent::List {
                version: state.version,
                active: view.active_count,
                resolved: view.resolved_count,
                error: view.error.as_deref(),
            });
            return Ok(());
        }
        self.line(&format!(
            "{} active · {} resolved",
            view.active_count, view.resolved_count
        ));
        if self.show_list {
            let out = render_list_view(&view, &self.list_format)?;
            output::print_output(&out, self.quiet);
        }
        Ok(())
    }
}

async fn desktop_notifier(mode: DesktopMode) -> Option<Arc<dyn DesktopNotifier>> {
    if mode == DesktopMode::Denied {
        return None;
    }
    let notifier = TerminalNotifier::new(mode);
    if !notifier.is_supported() {
        return None;
    }
    // Ask before the session starts so the prompt does not race the
    // Enter-to-reconnect reader.
    if notifier.permission() == Permission::Default {
        notifier.request_permission().await;
    }
    Some(Arc::new(notifier))
}

pub async fn handle(
    mut config: ClientConfig,
    profile: &Profile,
    history: Arc<dyn HistoryStore>,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(max) = args.max_retries {
        config.reconnect.max_retries = Some(max);
    } else if args.bounded && config.reconnect.max_retries.is_none() {
        config.reconnect.max_retries = Some(campus_config::DEFAULT_MAX_RETRIES);
    }

    let desktop = if args.no_desktop {
        None
    } else {
        desktop_notifier(profile.desktop).await
    };

    let controller = Controller::new(config, history, desktop)?;
    controller.set_tab(util::tab(args.tab));
    controller.set_filters(util::filters(args.filters));

    let mut printer = Printer::new(global, !args.no_list);
    let mut connection = controller.connection_state();
    let mut toasts = controller.toasts();
    let mut list = controller.list();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    controller.start().await?;

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => break Ok(()),

            changed = connection.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = connection.borrow_and_update().clone();
                printer.status(&state);
            }

            changed = toasts.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = toasts.borrow_and_update().clone();
                printer.toasts(&current);
            }

            changed = list.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = list.borrow_and_update().clone();
                if let Err(e) = printer.list(&state, &controller) {
                    break Err(e);
                }
            }

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    if matches!(controller.current_connection_state(), ConnectionState::Failed { .. }) {
                        controller.reconnect().await;
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    };

    controller.stop().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_events_are_tagged() {
        let line = serde_json::to_string(&WatchEvent::Status {
            state: "Notifications active",
            attempt: 0,
        })
        .unwrap_or_default();
        assert_eq!(
            line,
            r#"{"event":"status","state":"Notifications active","attempt":0}"#
        );
    }

    #[test]
    fn list_event_carries_counts() {
        let line = serde_json::to_string(&WatchEvent::List {
            version: 3,
            active: 2,
            resolved: 5,
            error: None,
        })
        .unwrap_or_default();
        assert_eq!(
            line,
            r#"{"event":"list","version":3,"active":2,"resolved":5,"error":null}"#
        );
    }
}
