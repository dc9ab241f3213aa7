use crate::kernel::completion::CompletionState;
use crate::kernel::run::RunState;
use crate::kernel::search::SearchState;
use crate::kernel::services::ports::settings::Settings;
use crate::kernel::session::{BufferId, Session};
use crate::kernel::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Dismissible message shown above the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
}

/// What to do once the user confirms discarding unsaved changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    CloseBuffer(BufferId),
    Quit,
}

pub struct AppState {
    pub session: Session,
    pub search: SearchState,
    pub completion: CompletionState,
    pub run: RunState,
    pub theme: Theme,
    pub tab_size: u8,
    pub notifications: Vec<Notification>,
    pub pending: Option<PendingAction>,
    next_notification_id: u64,
}

impl AppState {
    pub fn new(session: Session, settings: &Settings) -> Self {
        Self {
            session,
            search: SearchState::default(),
            completion: CompletionState::default(),
            run: RunState::new(settings.compiler.output_capacity),
            theme: Theme::from_settings(&settings.theme),
            tab_size: settings.editor.tab_size.max(1),
            notifications: Vec::new(),
            pending: None,
            next_notification_id: 1,
        }
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        let id = self.next_notification_id;
        self.next_notification_id += 1;
        self.notifications.push(Notification {
            id,
            level,
            message: message.into(),
        });
        id
    }

    pub fn dismiss_notification(&mut self, id: u64) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        self.notifications.len() != before
    }
}
