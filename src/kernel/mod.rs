//! Headless application core (state/action/effect).

pub mod action;
pub mod completion;
pub mod editing;
pub mod effect;
pub mod formatting;
pub mod run;
pub mod search;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
pub mod syntax;
pub mod theme;

pub use action::Action;
pub use completion::{CompletionItem, CompletionKind, CompletionState, SignatureHelp};
pub use effect::Effect;
pub use run::{RunReport, RunState, StartedRun};
pub use search::{SearchQuery, SearchState};
pub use session::{Buffer, BufferId, Session, SessionError, SessionEvent};
pub use state::{AppState, Notification, NotificationLevel, PendingAction};
pub use store::{DispatchResult, Store};
pub use theme::{Theme, ThemeMode};
