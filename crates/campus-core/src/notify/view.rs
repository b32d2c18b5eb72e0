// Pure rendering of the toast stack into display-ready rows.

use chrono::Local;

use super::Severity;
use super::presenter::{Toast, ToastId, ToastPhase};

/// One rendered toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastView {
    pub id: ToastId,
    pub kind: Severity,
    pub icon: &'static str,
    /// Icon and title, e.g. `⚠ Status updated`.
    pub heading: String,
    pub body: String,
    /// Local wall-clock time, `HH:MM:SS`.
    pub time: String,
    /// Target of the "view details" action.
    pub subject_id: String,
    pub fading: bool,
}

/// The overlay: toasts in display order, oldest at the top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayView {
    pub toasts: Vec<ToastView>,
}

impl OverlayView {
    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

pub fn render(toasts: &[Toast]) -> OverlayView {
    OverlayView {
        toasts: toasts
            .iter()
            .map(|toast| {
                let n = &toast.notification;
                ToastView {
                    id: toast.id,
                    kind: n.kind,
                    icon: n.kind.icon(),
                    heading: format!("{} {}", n.kind.icon(), n.title),
                    body: n.body.clone(),
                    time: n.created_at.with_timezone(&Local).format("%H:%M:%S").to_string(),
                    subject_id: n.subject_id.clone(),
                    fading: toast.phase == ToastPhase::Fading,
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::notify::Notification;

    fn toast(id: ToastId, kind: Severity, phase: ToastPhase) -> Toast {
        Toast {
            id,
            notification: Notification {
                kind,
                title: "Status updated".into(),
                body: format!("body {id}"),
                subject_id: format!("inc-{id}"),
                created_at: Utc::now(),
            },
            phase,
        }
    }

    #[test]
    fn empty_stack_renders_empty_overlay() {
        assert!(render(&[]).is_empty());
    }

    #[test]
    fn renders_in_stack_order_with_icons() {
        let view = render(&[
            toast(1, Severity::Success, ToastPhase::Visible),
            toast(2, Severity::Warning, ToastPhase::Fading),
        ]);

        assert_eq!(view.toasts.len(), 2);
        assert_eq!(view.toasts[0].heading, "✔ Status updated");
        assert_eq!(view.toasts[0].subject_id, "inc-1");
        assert!(!view.toasts[0].fading);
        assert_eq!(view.toasts[1].icon, "⚠");
        assert!(view.toasts[1].fading);
        assert_eq!(view.toasts[1].time.len(), 8);
    }
}
