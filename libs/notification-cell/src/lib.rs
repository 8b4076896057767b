pub mod consumer;
pub mod dispatcher;
pub mod email;
pub mod handlers;
pub mod realtime;
pub mod reminder;
pub mod router;

use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::BookingStore;

/// State for the notification HTTP surface. Kept separate from the booking
/// state so this crate stays independent of the booking cell.
#[derive(Clone)]
pub struct NotificationsState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn BookingStore>,
}
