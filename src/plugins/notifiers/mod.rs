// Notifier implementations
pub mod discord;
pub mod signal;

pub use discord::DiscordNotifier;
pub use signal::SignalNotifier;
