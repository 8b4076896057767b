use crate::{AppointmentFilter, BookingStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header::HeaderMap, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use shared_config::AppConfig;
use shared_models::booking::{Appointment, Notification, Service, WeekSchedule};
use std::sync::Arc;
use uuid::Uuid;

/// PostgREST-style backend. Every table is a resource under the base URL and
/// filters are query parameters (`column=op.value`).
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    config: Arc<AppConfig>,
}

impl RestStore {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = self.config.database_api_key.parse() {
            headers.insert("apikey", value);
        }
        if let Ok(value) = format!("Bearer {}", self.config.database_api_key).parse() {
            headers.insert("Authorization", value);
        }
        if let Ok(value) = "application/json".parse() {
            headers.insert("Content-Type", value);
        }
        headers
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        representation: bool,
    ) -> Result<T, StoreError> {
        let url = format!("{}/rest/v1/{}", self.config.database_url, path);
        let mut request = self.client.request(method, &url).headers(self.headers());
        if representation {
            request = request.header("Prefer", "return=representation");
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, %url, "store request failed: {}", detail);
            return Err(StoreError::Backend(format!("{}: {}", status, detail)));
        }
        Ok(response.json().await?)
    }

    async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let mut rows: Vec<T> = self.request(Method::GET, path, None, false).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(rows.remove(0))
    }

    fn filter_query(filter: &AppointmentFilter) -> String {
        let mut parts = Vec::new();
        if let Some(provider_id) = filter.provider_id {
            parts.push(format!("providerId=eq.{}", provider_id));
        }
        if let Some(user_id) = filter.user_id {
            parts.push(format!("userId=eq.{}", user_id));
        }
        if let Some(service_id) = filter.service_id {
            parts.push(format!("serviceId=eq.{}", service_id));
        }
        if let Some(status) = filter.status {
            parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = filter.date {
            parts.push(format!("date=eq.{}", date));
        }
        parts.join("&")
    }
}

fn encode_ts(ts: DateTime<Utc>) -> String {
    urlencoding::encode(&ts.to_rfc3339()).into_owned()
}

#[async_trait]
impl BookingStore for RestStore {
    async fn find_service(&self, id: Uuid) -> Result<Service, StoreError> {
        self.fetch_one(&format!("services?id=eq.{}", id)).await
    }

    async fn find_week_schedule(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<WeekSchedule>, StoreError> {
        let path = format!(
            "working_hours?providerId=eq.{}&select=schedule",
            provider_id
        );
        #[derive(serde::Deserialize)]
        struct Row {
            schedule: WeekSchedule,
        }
        let rows: Vec<Row> = self.request(Method::GET, &path, None, false).await?;
        Ok(rows.into_iter().next().map(|row| row.schedule))
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.fetch_one(&format!("appointments?id=eq.{}", id)).await
    }

    async fn active_appointments_in_range(
        &self,
        provider_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "appointments?providerId=eq.{}&status=neq.CANCELLED&startTime=lt.{}&endTime=gt.{}",
            provider_id,
            encode_ts(to),
            encode_ts(from)
        );
        self.request(Method::GET, &path, None, false).await
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut path = format!("appointments?{}", Self::filter_query(filter));
        path.push_str(&format!(
            "&order=startTime.asc&limit={}&offset={}",
            filter.limit, filter.offset
        ));
        self.request(Method::GET, &path, None, false).await
    }

    async fn count_appointments(&self, filter: &AppointmentFilter) -> Result<u64, StoreError> {
        let path = format!(
            "appointments?{}&select=id",
            Self::filter_query(filter)
        );
        let rows: Vec<serde_json::Value> = self.request(Method::GET, &path, None, false).await?;
        Ok(rows.len() as u64)
    }

    async fn insert_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, StoreError> {
        let body = serde_json::to_value(appointment)?;
        let mut rows: Vec<Appointment> = self
            .request(Method::POST, "appointments", Some(body), true)
            .await?;
        if rows.is_empty() {
            return Err(StoreError::Backend(
                "insert returned no representation".to_string(),
            ));
        }
        Ok(rows.remove(0))
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, StoreError> {
        let path = format!("appointments?id=eq.{}", appointment.id);
        let body = serde_json::to_value(appointment)?;
        let mut rows: Vec<Appointment> = self
            .request(Method::PATCH, &path, Some(body), true)
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(rows.remove(0))
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError> {
        let url = format!(
            "{}/rest/v1/appointments?id=eq.{}",
            self.config.database_url, id
        );
        let response = self
            .client
            .delete(&url)
            .headers(self.headers())
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status => {
                let detail = response.text().await.unwrap_or_default();
                Err(StoreError::Backend(format!("{}: {}", status, detail)))
            }
        }
    }

    async fn confirmed_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "appointments?status=eq.CONFIRMED&startTime=gte.{}&startTime=lt.{}",
            encode_ts(from),
            encode_ts(to)
        );
        self.request(Method::GET, &path, None, false).await
    }

    async fn appointments_for_party(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut path = format!(
            "appointments?or=(userId.eq.{id},providerId.eq.{id})",
            id = user_id
        );
        if let Some(from) = from {
            path.push_str(&format!("&startTime=gte.{}", encode_ts(from)));
        }
        if let Some(to) = to {
            path.push_str(&format!("&startTime=lte.{}", encode_ts(to)));
        }
        path.push_str("&order=startTime.asc");
        self.request(Method::GET, &path, None, false).await
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let body = serde_json::to_value(notification)?;
        let _: Vec<Notification> = self
            .request(Method::POST, "notifications", Some(body), true)
            .await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let path = format!(
            "notifications?userId=eq.{}&order=createdAt.desc&limit={}&offset={}",
            user_id, limit, offset
        );
        self.request(Method::GET, &path, None, false).await
    }

    async fn unread_notification_count(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let path = format!(
            "notifications?userId=eq.{}&isRead=eq.false&select=id",
            user_id
        );
        let rows: Vec<serde_json::Value> = self.request(Method::GET, &path, None, false).await?;
        Ok(rows.len() as u64)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Notification, StoreError> {
        let path = format!("notifications?id=eq.{}&userId=eq.{}", id, user_id);
        let mut rows: Vec<Notification> = self
            .request(Method::PATCH, &path, Some(json!({ "isRead": true })), true)
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(rows.remove(0))
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let path = format!("notifications?userId=eq.{}&isRead=eq.false", user_id);
        let rows: Vec<Notification> = self
            .request(Method::PATCH, &path, Some(json!({ "isRead": true })), true)
            .await?;
        Ok(rows.len() as u64)
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let path = format!("notifications?id=eq.{}&userId=eq.{}", id, user_id);
        let rows: Vec<serde_json::Value> = self
            .request(Method::DELETE, &path, None, true)
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_user_email(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        #[derive(serde::Deserialize)]
        struct Row {
            email: String,
        }
        let path = format!("users?id=eq.{}&select=email", user_id);
        let rows: Vec<Row> = self.request(Method::GET, &path, None, false).await?;
        Ok(rows.into_iter().next().map(|row| row.email))
    }
}
