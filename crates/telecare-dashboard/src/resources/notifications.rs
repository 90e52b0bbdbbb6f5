//! Admin notification history

use crate::list::{ListResource, PaginatedList};
use serde_json::Value;
use telecare_client::{AdminApi, ApiRequest, NotificationFilters};

/// `/notification/admin/all`; rows live under `data.notifications`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notifications;

impl ListResource for Notifications {
    type Filters = NotificationFilters;
    type Extra = ();

    const NAME: &'static str = "notifications";
    const ITEMS_KEY: Option<&'static str> = Some("notifications");

    fn request(_filters: &NotificationFilters, page: u32, limit: u32) -> ApiRequest {
        AdminApi::admin_notifications_request(page, limit)
    }
}

impl PaginatedList<Notifications> {
    /// Broadcast a notification, then refresh the list
    pub async fn create_notification(&self, notification: Value) -> bool {
        self.mutate("createNotification", self.api().create_notification(notification))
            .await
    }

    /// Delete a notification, then refresh the list
    pub async fn delete_notification(&self, id: &str) -> bool {
        self.mutate("deleteNotification", self.api().delete_notification(id))
            .await
    }
}
