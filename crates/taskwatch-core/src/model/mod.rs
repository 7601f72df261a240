//! Typed rows and enums shared across the store and the core components.

pub mod item;
pub mod user;
pub mod watch;

pub use item::{Comment, Item, Priority, Status};
pub use user::{Team, TeamSummary, User, UserSummary};
pub use watch::{EventType, Notification, NotificationDetail, Subscription, Watcher};
