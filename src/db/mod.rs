pub mod entity;
pub use entity::*;

mod alert_store;
pub use alert_store::AlertStore;

mod notification_store;
pub use notification_store::NotificationStore;
