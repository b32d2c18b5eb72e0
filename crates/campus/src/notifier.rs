//! Desktop notifications through the terminal.
//!
//! Emits OSC 9 escape sequences, which terminals such as iTerm2, kitty,
//! WezTerm and foot turn into native notifications. Permission comes from
//! the profile's `desktop` setting; `ask` prompts once with dialoguer.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::debug;

use campus_core::{DesktopNotifier, Permission};

use crate::config::DesktopMode;

const PROMPT: &str = "Show desktop notifications for incident updates?";

pub struct TerminalNotifier {
    permission: Arc<Mutex<Permission>>,
    interactive: bool,
}

impl TerminalNotifier {
    pub fn new(mode: DesktopMode) -> Self {
        Self {
            permission: Arc::new(Mutex::new(initial_permission(mode))),
            interactive: io::stdin().is_terminal() && io::stderr().is_terminal(),
        }
    }
}

fn initial_permission(mode: DesktopMode) -> Permission {
    match mode {
        DesktopMode::Ask => Permission::Default,
        DesktopMode::Granted => Permission::Granted,
        DesktopMode::Denied => Permission::Denied,
    }
}

impl DesktopNotifier for TerminalNotifier {
    fn is_supported(&self) -> bool {
        io::stderr().is_terminal()
    }

    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_permission(&self) -> BoxFuture<'static, Permission> {
        let permission = Arc::clone(&self.permission);
        let interactive = self.interactive;
        async move {
            let answer = if interactive {
                let confirmed = tokio::task::spawn_blocking(|| {
                    dialoguer::Confirm::new()
                        .with_prompt(PROMPT)
                        .default(true)
                        .interact()
                })
                .await;
                match confirmed {
                    Ok(Ok(true)) => Permission::Granted,
                    _ => Permission::Denied,
                }
            } else {
                Permission::Denied
            };
            debug!(permission = %answer, "desktop notification permission decided");
            *permission.lock().unwrap_or_else(PoisonError::into_inner) = answer;
            answer
        }
        .boxed()
    }

    fn show(&self, title: &str, body: &str) {
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "{}", osc9(title, body));
        let _ = stderr.flush();
    }
}

fn osc9(title: &str, body: &str) -> String {
    format!("\x1b]9;{}: {}\x07", strip_controls(title), strip_controls(body))
}

/// Control characters would terminate or corrupt the escape sequence.
fn strip_controls(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}
