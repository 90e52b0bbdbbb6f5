//! REST gateway client for the Telecare admin API
//!
//! [`AdminApi`] is the endpoint catalog. It talks through a [`Transport`]:
//! [`HttpTransport`] in production, [`mock::MockTransport`] in tests. Every
//! call resolves to a successful [`Envelope`] or a [`ClientError`] carrying a
//! human readable message.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod api;
pub mod envelope;
pub mod error;
pub mod mock;
pub mod params;
pub mod request;
pub mod transport;

pub use api::{AdminApi, paths};
pub use envelope::Envelope;
pub use error::{ClientError, ClientResult, ErrorSeverity};
pub use mock::{MockReply, MockTransport};
pub use params::{
    ConsultationFilters, DoctorFilters, LoginCredentials, NotificationFilters, OrderFilters,
    OtpVerification, ProductFilters, Searchable, UserFilters, VideoFilters,
};
pub use request::ApiRequest;
pub use transport::{HttpTransport, TokenStore, Transport};
