use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum CountryStatusError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("country status not found")]
    NotFound,
    #[error("concurrent writes to the same country, retry")]
    Conflict,
    #[error("store error: {0}")]
    Store(String),
}

impl From<InvalidIsoCode> for CountryStatusError {
    fn from(error: InvalidIsoCode) -> Self {
        CountryStatusError::Validation(error.to_string())
    }
}

impl From<UnknownVisitStatus> for CountryStatusError {
    fn from(error: UnknownVisitStatus) -> Self {
        CountryStatusError::Validation(error.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UpsertStatusInput {
    pub iso_code: IsoCode,
    pub status: VisitStatus,
    /// Only written when the row is created.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UpsertKind {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub record: CountryStatusRecord,
    pub kind: UpsertKind,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

/// Every operation is scoped to `owner`; rows of other users behave as absent.
#[async_trait::async_trait]
pub trait CountryStatusService: Send + Sync {
    async fn upsert_status(
        &self,
        owner: UserId,
        input: UpsertStatusInput,
    ) -> Result<UpsertOutcome, CountryStatusError>;

    async fn list_statuses(&self, owner: UserId)
    -> Result<Vec<CountryStatusRecord>, CountryStatusError>;

    async fn set_status_by_id(
        &self,
        owner: UserId,
        id: CountryStatusId,
        status: VisitStatus,
    ) -> Result<CountryStatusRecord, CountryStatusError>;

    async fn delete_status(
        &self,
        owner: UserId,
        id: CountryStatusId,
    ) -> Result<DeleteOutcome, CountryStatusError>;
}
