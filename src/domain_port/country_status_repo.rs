use crate::application_port::*;
use crate::domain_model::*;

/// Storage for per-(user, country) status rows.
///
/// Implementations must back the (`user_id`, `iso_code`) pair with a
/// uniqueness guarantee; callers never assume exclusive access between two
/// calls.
#[async_trait::async_trait]
pub trait CountryStatusRepo: Send + Sync {
    /// Insert a new row. Returns `None` when a row for the pair already exists.
    async fn insert_if_absent(
        &self,
        owner: UserId,
        iso_code: &IsoCode,
        name: Option<&str>,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError>;

    /// Change the status of the row for the pair. Returns `None` when absent.
    async fn update_status_by_key(
        &self,
        owner: UserId,
        iso_code: &IsoCode,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError>;

    async fn list_by_user(
        &self,
        owner: UserId,
    ) -> Result<Vec<CountryStatusRecord>, CountryStatusError>;

    async fn update_status_by_id(
        &self,
        owner: UserId,
        id: CountryStatusId,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError>;

    /// Returns whether a row was removed.
    async fn delete_by_id(
        &self,
        owner: UserId,
        id: CountryStatusId,
    ) -> Result<bool, CountryStatusError>;
}
