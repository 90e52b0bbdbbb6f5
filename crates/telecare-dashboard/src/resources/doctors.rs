//! Doctor directory table

use crate::list::ListResource;
use telecare_client::{AdminApi, ApiRequest, DoctorFilters};

/// `/admin/doctors`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doctors;

impl ListResource for Doctors {
    type Filters = DoctorFilters;
    type Extra = ();

    const NAME: &'static str = "doctors";

    fn request(filters: &DoctorFilters, page: u32, limit: u32) -> ApiRequest {
        AdminApi::doctors_request(filters, page, limit)
    }
}
