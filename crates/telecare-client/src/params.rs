//! Filter records and payloads for the admin endpoints
//!
//! Filter fields are plain strings. An empty string is sent as an empty query
//! value and means "no filter" to the server.

use serde::{Deserialize, Serialize};

/// Users list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilters {
    /// `user`, `doctor`, `admin` or empty
    pub role: String,
    /// `true`, `false` or empty
    pub is_active: String,
    /// Free text search
    pub search: String,
}

/// Doctors list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorFilters {
    /// `true`, `false` or empty
    pub is_active: String,
    /// Free text search
    pub search: String,
}

/// Orders list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilters {
    /// Fulfilment status
    pub status: String,
    /// Payment status
    pub payment_status: String,
}

/// Products list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilters {
    /// Free text search, sent as `q`
    pub search: String,
}

/// Consultations list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationFilters {
    /// `upcoming`, `past`, `today` or empty
    pub when: String,
    /// Booking status
    pub status: String,
    /// Free text search
    pub search: String,
    /// Inclusive start date, `YYYY-MM-DD`
    pub start_date: String,
    /// Inclusive end date, `YYYY-MM-DD`
    pub end_date: String,
}

/// Video library filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFilters {
    /// Free text search
    pub search: String,
}

/// Notification list has no filters beyond paging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFilters;

/// Free text search shared by the filter records that support it
pub trait Searchable {
    /// Replace the search term
    fn set_search(&mut self, search: String);
}

macro_rules! searchable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Searchable for $ty {
                fn set_search(&mut self, search: String) {
                    self.search = search;
                }
            }
        )+
    };
}

searchable!(
    UserFilters,
    DoctorFilters,
    ProductFilters,
    ConsultationFilters,
    VideoFilters
);

/// Admin login payload; the device fields are also sent as headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
    /// Stable device identifier
    pub deviceuniqueid: String,
    /// Device model string
    pub devicemodel: String,
}

/// OTP verification payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpVerification {
    /// Account email
    pub email: String,
    /// One time password
    pub otp: String,
    /// Stable device identifier
    pub deviceuniqueid: String,
    /// Device model string
    pub devicemodel: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_filters_serialize_camel_case() {
        let filters = ConsultationFilters {
            start_date: "2024-01-01".to_string(),
            ..ConsultationFilters::default()
        };
        let value = serde_json::to_value(&filters).unwrap();
        assert_eq!(value["startDate"], json!("2024-01-01"));
        assert_eq!(value["endDate"], json!(""));
    }

    #[test]
    fn test_set_search() {
        let mut filters = UserFilters::default();
        filters.set_search("ana".to_string());
        assert_eq!(filters.search, "ana");
        assert_eq!(filters.role, "");
    }
}
