pub mod adapters;
pub mod dispatcher;
pub mod notifiers;
pub mod traits;

pub use adapters::{select_adapter, AdapterKind};
pub use dispatcher::NotificationDispatcher;
pub use traits::{NotificationEvent, Notifier};
