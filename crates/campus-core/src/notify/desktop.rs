// ── Native desktop notifications ──
//
// The platform side is pluggable; the presenter only needs to know whether
// the capability exists, what the permission is, and how to ask.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

/// Permission state for native notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; the viewer may be asked.
    Default,
}

/// Platform notification surface.
pub trait DesktopNotifier: Send + Sync {
    /// Whether native notifications exist on this platform at all.
    fn is_supported(&self) -> bool;

    fn permission(&self) -> Permission;

    /// Ask the viewer. Resolves to the decision.
    fn request_permission(&self) -> BoxFuture<'static, Permission>;

    fn show(&self, title: &str, body: &str);
}

/// Show a native notification if permitted, asking first when undecided.
///
/// Never blocks the caller: an undecided permission is requested on a
/// spawned task and the notification shown only if granted.
pub(crate) fn notify(notifier: &Arc<dyn DesktopNotifier>, title: String, body: String) {
    if !notifier.is_supported() {
        return;
    }
    match notifier.permission() {
        Permission::Granted => notifier.show(&title, &body),
        Permission::Denied => debug!("desktop notifications denied"),
        Permission::Default => {
            let notifier = Arc::clone(notifier);
            let request = notifier.request_permission();
            tokio::spawn(async move {
                match request.await {
                    Permission::Granted => notifier.show(&title, &body),
                    other => debug!(permission = %other, "desktop notification not permitted"),
                }
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use futures_util::FutureExt;

    use super::*;

    /// Records shown notifications; permission answers are scripted.
    pub(crate) struct RecordingNotifier {
        pub supported: bool,
        pub permission: Mutex<Permission>,
        pub answer: Permission,
        pub requests: Mutex<u32>,
        pub shown: Mutex<Vec<(String, String)>>,
    }

    impl RecordingNotifier {
        pub(crate) fn new(permission: Permission, answer: Permission) -> Self {
            Self {
                supported: true,
                permission: Mutex::new(permission),
                answer,
                requests: Mutex::new(0),
                shown: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn shown(&self) -> Vec<(String, String)> {
            self.shown.lock().unwrap().clone()
        }
    }

    impl DesktopNotifier for RecordingNotifier {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn permission(&self) -> Permission {
            *self.permission.lock().unwrap()
        }

        fn request_permission(&self) -> BoxFuture<'static, Permission> {
            *self.requests.lock().unwrap() += 1;
            let answer = self.answer;
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                answer
            }
            .boxed()
        }

        fn show(&self, title: &str, body: &str) {
            self.shown
                .lock()
                .unwrap()
                .push((title.to_owned(), body.to_owned()));
        }
    }

    fn as_dyn(notifier: &Arc<RecordingNotifier>) -> Arc<dyn DesktopNotifier> {
        Arc::clone(notifier) as Arc<dyn DesktopNotifier>
    }

    #[tokio::test(start_paused = true)]
    async fn granted_shows_immediately() {
        let notifier = Arc::new(RecordingNotifier::new(Permission::Granted, Permission::Denied));
        notify(&as_dyn(&notifier), "Incident: Leak".into(), "assigned".into());
        assert_eq!(
            notifier.shown(),
            vec![("Incident: Leak".to_owned(), "assigned".to_owned())]
        );
        assert_eq!(*notifier.requests.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn undecided_asks_then_shows_when_granted() {
        let notifier = Arc::new(RecordingNotifier::new(Permission::Default, Permission::Granted));
        notify(&as_dyn(&notifier), "t".into(), "b".into());

        // Request is pending; nothing shown yet and the caller was not blocked.
        assert!(notifier.shown().is_empty());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(notifier.shown().len(), 1);
        assert_eq!(*notifier.requests.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn undecided_and_refused_shows_nothing() {
        let notifier = Arc::new(RecordingNotifier::new(Permission::Default, Permission::Denied));
        notify(&as_dyn(&notifier), "t".into(), "b".into());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(notifier.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn denied_or_unsupported_never_asks() {
        let denied = Arc::new(RecordingNotifier::new(Permission::Denied, Permission::Granted));
        notify(&as_dyn(&denied), "t".into(), "b".into());

        let mut unsupported = RecordingNotifier::new(Permission::Default, Permission::Granted);
        unsupported.supported = false;
        let unsupported = Arc::new(unsupported);
        notify(&as_dyn(&unsupported), "t".into(), "b".into());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(denied.shown().is_empty());
        assert!(unsupported.shown().is_empty());
        assert_eq!(*denied.requests.lock().unwrap(), 0);
        assert_eq!(*unsupported.requests.lock().unwrap(), 0);
    }
}
