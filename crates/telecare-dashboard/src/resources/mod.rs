//! Per-resource list definitions and their actions

pub mod consultations;
pub mod doctors;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod users;
pub mod videos;

pub use consultations::{ConsultationStatsState, ConsultationSummary, Consultations};
pub use doctors::Doctors;
pub use notifications::Notifications;
pub use orders::Orders;
pub use products::Products;
pub use users::{UserDetail, UserDetailMeta, Users};
pub use videos::{VideoDraft, Videos};

use crate::list::PaginatedList;

/// User management table
pub type UserList = PaginatedList<Users>;
/// Doctor directory
pub type DoctorList = PaginatedList<Doctors>;
/// Order management table
pub type OrderList = PaginatedList<Orders>;
/// Product catalog
pub type ProductList = PaginatedList<Products>;
/// Consultation bookings
pub type ConsultationList = PaginatedList<Consultations>;
/// Video library
pub type VideoList = PaginatedList<Videos>;
/// Admin notification history
pub type NotificationList = PaginatedList<Notifications>;
