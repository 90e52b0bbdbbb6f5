//! Endpoint catalog for the admin API

use crate::envelope::Envelope;
use crate::error::{ClientError, ClientResult};
use crate::params::{
    ConsultationFilters, DoctorFilters, LoginCredentials, OrderFilters, OtpVerification,
    ProductFilters, UserFilters, VideoFilters,
};
use crate::request::ApiRequest;
use crate::transport::{HttpTransport, TokenStore, Transport};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use telecare_core::{ApiConfig, FilterSet};
use tracing::{info, instrument};

/// Paths used by the dashboard, exposed so tests and mocks agree on them
pub mod paths {
    /// Dashboard counters
    pub const DASHBOARD_STATS: &str = "/admin/dashboard/stats";
    /// Registrations per period
    pub const USER_REGISTRATION_TRENDS: &str = "/admin/trends/user-registrations";
    /// Consultations and revenue per period
    pub const CONSULTATION_TRENDS: &str = "/admin/trends/consultations";
    /// Orders and revenue per period
    pub const PRODUCT_PURCHASE_TRENDS: &str = "/admin/trends/product-purchases";
    /// All time doctor leaderboard
    pub const TOP_DOCTORS: &str = "/admin/trends/top-doctors";
    /// Users list
    pub const USERS: &str = "/admin/users";
    /// Doctors list
    pub const DOCTORS: &str = "/admin/doctors";
    /// Orders list
    pub const ORDERS: &str = "/order/admin/all-orders";
    /// Products list
    pub const PRODUCTS: &str = "/product/admin/get";
    /// Consultations list
    pub const CONSULTATIONS: &str = "/admin/consultations";
    /// Consultation counters
    pub const CONSULTATION_STATS: &str = "/admin/consultations/stats";
    /// Video library
    pub const VIDEOS: &str = "/videos";
    /// Video counter
    pub const VIDEO_COUNT: &str = "/videos/stats/count";
    /// Notifications sent by admins
    pub const ADMIN_NOTIFICATIONS: &str = "/notification/admin/all";
    /// Login
    pub const LOGIN: &str = "/admin/auth/login";
    /// Logout
    pub const LOGOUT: &str = "/admin/auth/logout";
}

/// Gateway client for every admin endpoint
///
/// Cloning is cheap; clones share the transport and its token.
#[derive(Clone)]
pub struct AdminApi {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for AdminApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminApi")
            .field("authenticated", &self.transport.tokens().is_set())
            .finish_non_exhaustive()
    }
}

impl AdminApi {
    /// Wrap an existing transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build an HTTP backed client from configuration
    pub fn from_config(config: &ApiConfig) -> ClientResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// Token store of the underlying transport
    pub fn tokens(&self) -> &TokenStore {
        self.transport.tokens()
    }

    /// Send a raw request
    pub async fn send(&self, request: ApiRequest) -> ClientResult<Envelope> {
        self.transport.send(request).await
    }

    // Auth

    /// Log in and keep the returned bearer token
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> ClientResult<Envelope> {
        let body = serde_json::to_value(credentials)
            .map_err(|e| ClientError::invalid_request(e.to_string()))?;
        let envelope = self
            .send(
                ApiRequest::post(paths::LOGIN)
                    .json(body)
                    .header("deviceuniqueid", credentials.deviceuniqueid.clone())
                    .header("devicemodel", credentials.devicemodel.clone()),
            )
            .await?;

        let token = ["token", "accessToken", "authToken"]
            .iter()
            .find_map(|key| envelope.data_field(key).and_then(Value::as_str))
            .ok_or_else(|| ClientError::decode("login response carried no token"))?;
        self.tokens().set(token);
        info!("admin session established");

        Ok(envelope)
    }

    /// Request a password reset OTP
    pub async fn forgot_password(&self, payload: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::post("/admin/auth/forgot-password").json(payload))
            .await
    }

    /// Verify an OTP; the device fields are also sent as headers
    pub async fn verify_otp(&self, payload: &OtpVerification) -> ClientResult<Envelope> {
        let body =
            serde_json::to_value(payload).map_err(|e| ClientError::invalid_request(e.to_string()))?;
        self.send(
            ApiRequest::post("/admin/auth/verify-otp")
                .json(body)
                .header("deviceuniqueid", payload.deviceuniqueid.clone())
                .header("devicemodel", payload.devicemodel.clone()),
        )
        .await
    }

    /// Set a new password after OTP verification
    pub async fn update_password(&self, payload: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::post("/admin/auth/update-password").json(payload))
            .await
    }

    /// Change the password of the logged in admin
    pub async fn update_password_auth(&self, payload: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::post("/admin/auth/update-password-auth").json(payload))
            .await
    }

    /// Log out; the local token is cleared whatever the server says
    pub async fn logout(&self) -> ClientResult<Envelope> {
        let result = self.send(ApiRequest::post(paths::LOGOUT)).await;
        self.tokens().clear();
        result
    }

    // Dashboard analytics

    /// Platform wide counters
    pub async fn dashboard_stats(&self) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(paths::DASHBOARD_STATS)).await
    }

    /// Registration trend for a period
    pub async fn user_registration_trends(&self, filter: &FilterSet) -> ClientResult<Envelope> {
        self.send(trend_request(paths::USER_REGISTRATION_TRENDS, filter))
            .await
    }

    /// Consultation trend for a period
    pub async fn consultation_trends(&self, filter: &FilterSet) -> ClientResult<Envelope> {
        self.send(trend_request(paths::CONSULTATION_TRENDS, filter))
            .await
    }

    /// Product purchase trend for a period
    pub async fn product_purchase_trends(&self, filter: &FilterSet) -> ClientResult<Envelope> {
        self.send(trend_request(paths::PRODUCT_PURCHASE_TRENDS, filter))
            .await
    }

    /// All time doctor leaderboard
    pub async fn top_doctors_all_time(&self) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(paths::TOP_DOCTORS)).await
    }

    // Products

    /// Create a product
    pub async fn create_product(&self, product: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::post("/product/add").json(product))
            .await
    }

    /// Update a product
    pub async fn update_product(&self, id: &str, product: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::patch(format!("/product/update/{id}")).json(product))
            .await
    }

    /// Delete a product
    pub async fn delete_product(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::delete(format!("/product/delete/{id}")))
            .await
    }

    /// Fetch one product
    pub async fn product_by_id(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(format!("/product/{id}"))).await
    }

    /// Products list request
    pub fn products_request(filters: &ProductFilters, page: u32, limit: u32) -> ApiRequest {
        ApiRequest::get(paths::PRODUCTS)
            .query("q", &filters.search)
            .query("type", "post")
            .page(page, limit)
    }

    /// Products list
    pub async fn products(
        &self,
        filters: &ProductFilters,
        page: u32,
        limit: u32,
    ) -> ClientResult<Envelope> {
        self.send(Self::products_request(filters, page, limit)).await
    }

    // Orders

    /// Orders list request
    pub fn orders_request(filters: &OrderFilters, page: u32, limit: u32) -> ApiRequest {
        ApiRequest::get(paths::ORDERS)
            .query("status", &filters.status)
            .query("paymentStatus", &filters.payment_status)
            .page(page, limit)
    }

    /// Orders list
    pub async fn orders(
        &self,
        filters: &OrderFilters,
        page: u32,
        limit: u32,
    ) -> ClientResult<Envelope> {
        self.send(Self::orders_request(filters, page, limit)).await
    }

    /// Update an order's status fields
    pub async fn update_order(&self, id: &str, order: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::patch(format!("/order/admin/status/{id}")).json(order))
            .await
    }

    /// Delete an order
    pub async fn delete_order(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::delete(format!("/order/admin/delete/{id}")))
            .await
    }

    // Users

    /// Users list request
    pub fn users_request(filters: &UserFilters, page: u32, limit: u32) -> ApiRequest {
        ApiRequest::get(paths::USERS)
            .query("role", &filters.role)
            .query("isActive", &filters.is_active)
            .query("search", &filters.search)
            .page(page, limit)
    }

    /// Users list
    pub async fn users(
        &self,
        filters: &UserFilters,
        page: u32,
        limit: u32,
    ) -> ClientResult<Envelope> {
        self.send(Self::users_request(filters, page, limit)).await
    }

    /// Fetch one user
    pub async fn user_by_id(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(format!("/admin/users/{id}"))).await
    }

    /// Activate or deactivate a user
    pub async fn update_user_status(&self, id: &str, is_active: bool) -> ClientResult<Envelope> {
        self.send(
            ApiRequest::patch(format!("/admin/users/{id}/status"))
                .json(serde_json::json!({ "isActive": is_active })),
        )
        .await
    }

    /// Reports uploaded by a user
    pub async fn reports_by_user(&self, id: &str, page: u32, limit: u32) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(format!("/admin/users/{id}/reports")).page(page, limit))
            .await
    }

    /// Orders placed by a user
    pub async fn user_orders(&self, id: &str, page: u32, limit: u32) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(format!("/admin/users/{id}/orders")).page(page, limit))
            .await
    }

    /// Consultations booked by a user
    pub async fn user_consultations(
        &self,
        id: &str,
        page: u32,
        limit: u32,
    ) -> ClientResult<Envelope> {
        self.send(
            ApiRequest::get(format!("/admin/users/{id}/consultations")).page(page, limit),
        )
        .await
    }

    /// Questionnaire answers of a user
    pub async fn user_questions(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(format!("/admin/users/{id}/questions")))
            .await
    }

    /// One report
    pub async fn report_details(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(format!("/admin/reports/{id}"))).await
    }

    // Doctors

    /// Doctors list request
    pub fn doctors_request(filters: &DoctorFilters, page: u32, limit: u32) -> ApiRequest {
        ApiRequest::get(paths::DOCTORS)
            .query("isActive", &filters.is_active)
            .query("search", &filters.search)
            .page(page, limit)
    }

    /// Doctors list
    pub async fn doctors(
        &self,
        filters: &DoctorFilters,
        page: u32,
        limit: u32,
    ) -> ClientResult<Envelope> {
        self.send(Self::doctors_request(filters, page, limit)).await
    }

    /// Fetch one doctor
    pub async fn doctor_by_id(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(format!("/admin/doctors/{id}"))).await
    }

    /// Consultations handled by a doctor
    pub async fn doctor_consultations(
        &self,
        id: &str,
        page: u32,
        limit: u32,
    ) -> ClientResult<Envelope> {
        self.send(
            ApiRequest::get(format!("/admin/doctors/{id}/consultations")).page(page, limit),
        )
        .await
    }

    // Consultations

    /// Consultations list request
    pub fn consultations_request(
        filters: &ConsultationFilters,
        page: u32,
        limit: u32,
    ) -> ApiRequest {
        ApiRequest::get(paths::CONSULTATIONS)
            .query("when", &filters.when)
            .query("status", &filters.status)
            .query("search", &filters.search)
            .query("startDate", &filters.start_date)
            .query("endDate", &filters.end_date)
            .page(page, limit)
    }

    /// Consultations list
    pub async fn consultations(
        &self,
        filters: &ConsultationFilters,
        page: u32,
        limit: u32,
    ) -> ClientResult<Envelope> {
        self.send(Self::consultations_request(filters, page, limit))
            .await
    }

    /// Consultation counters
    pub async fn consultation_stats(&self) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(paths::CONSULTATION_STATS)).await
    }

    // Videos

    /// Add a video
    pub async fn upload_video(&self, video: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::post(paths::VIDEOS).json(video)).await
    }

    /// Video library request
    pub fn videos_request(filters: &VideoFilters, page: u32, limit: u32) -> ApiRequest {
        ApiRequest::get(paths::VIDEOS)
            .query("search", &filters.search)
            .page(page, limit)
    }

    /// Video library
    pub async fn videos(
        &self,
        filters: &VideoFilters,
        page: u32,
        limit: u32,
    ) -> ClientResult<Envelope> {
        self.send(Self::videos_request(filters, page, limit)).await
    }

    /// Fetch one video
    pub async fn video_by_id(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(format!("/videos/{id}"))).await
    }

    /// Update a video
    pub async fn update_video(&self, id: &str, video: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::patch(format!("/videos/{id}")).json(video))
            .await
    }

    /// Delete a video
    pub async fn delete_video(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::delete(format!("/videos/{id}"))).await
    }

    /// Number of videos
    pub async fn video_count(&self) -> ClientResult<Envelope> {
        self.send(ApiRequest::get(paths::VIDEO_COUNT)).await
    }

    // Notifications

    /// Broadcast a notification
    pub async fn create_notification(&self, notification: Value) -> ClientResult<Envelope> {
        self.send(ApiRequest::post("/notification/create").json(notification))
            .await
    }

    /// Delete a notification
    pub async fn delete_notification(&self, id: &str) -> ClientResult<Envelope> {
        self.send(ApiRequest::delete(format!("/notification/{id}")))
            .await
    }

    /// Admin notifications list request
    pub fn admin_notifications_request(page: u32, limit: u32) -> ApiRequest {
        ApiRequest::get(paths::ADMIN_NOTIFICATIONS).page(page, limit)
    }

    /// Notifications sent by admins
    pub async fn admin_notifications(&self, page: u32, limit: u32) -> ClientResult<Envelope> {
        self.send(Self::admin_notifications_request(page, limit))
            .await
    }

    /// Notifications addressed to the logged in account
    pub async fn user_notifications(&self, page: u32, limit: u32) -> ClientResult<Envelope> {
        self.send(ApiRequest::get("/notifications").page(page, limit))
            .await
    }
}

fn trend_request(path: &str, filter: &FilterSet) -> ApiRequest {
    filter
        .query_pairs()
        .into_iter()
        .fold(ApiRequest::get(path), |request, (key, value)| {
            request.query(key, value)
        })
}
