pub mod alert_log;
pub mod alert_rule;
pub mod in_app_notification;
pub mod notification_preferences;
pub mod symbol_stats;
pub mod user;

pub use alert_log::Entity as AlertLog;
pub use alert_rule::Entity as AlertRule;
pub use in_app_notification::Entity as InAppNotification;
pub use notification_preferences::Entity as NotificationPreferences;
pub use symbol_stats::Entity as SymbolStats;
pub use user::Entity as User;
