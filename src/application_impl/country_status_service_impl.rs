use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::CountryStatusRepo;
use crate::logger::*;
use std::sync::Arc;

/// How often an upsert may lose the insert race before giving up.
const MAX_UPSERT_ATTEMPTS: usize = 3;
const MAX_NAME_LEN: usize = 128;

pub struct RealCountryStatusService {
    repo: Arc<dyn CountryStatusRepo>,
}

impl RealCountryStatusService {
    pub fn new(repo: Arc<dyn CountryStatusRepo>) -> Self {
        Self { repo }
    }

    fn normalize_name(name: Option<String>) -> Result<Option<String>, CountryStatusError> {
        let Some(name) = name else {
            return Ok(None);
        };
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CountryStatusError::Validation(format!(
                "countryName must be at most {MAX_NAME_LEN} characters"
            )));
        }
        Ok(Some(name.to_string()))
    }
}

#[async_trait::async_trait]
impl CountryStatusService for RealCountryStatusService {
    async fn upsert_status(
        &self,
        owner: UserId,
        input: UpsertStatusInput,
    ) -> Result<UpsertOutcome, CountryStatusError> {
        let UpsertStatusInput {
            iso_code,
            status,
            name,
        } = input;
        let name = Self::normalize_name(name)?;

        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            if let Some(record) = self
                .repo
                .update_status_by_key(owner, &iso_code, status)
                .await?
            {
                debug!(%owner, %iso_code, %status, "country status updated");
                return Ok(UpsertOutcome {
                    record,
                    kind: UpsertKind::Updated,
                });
            }

            if let Some(record) = self
                .repo
                .insert_if_absent(owner, &iso_code, name.as_deref(), status)
                .await?
            {
                debug!(%owner, %iso_code, %status, "country status created");
                return Ok(UpsertOutcome {
                    record,
                    kind: UpsertKind::Created,
                });
            }

            debug!(%owner, %iso_code, attempt, "lost insert race, retrying as update");
        }

        warn!(%owner, %iso_code, "upsert gave up after {MAX_UPSERT_ATTEMPTS} attempts");
        Err(CountryStatusError::Conflict)
    }

    async fn list_statuses(
        &self,
        owner: UserId,
    ) -> Result<Vec<CountryStatusRecord>, CountryStatusError> {
        self.repo.list_by_user(owner).await
    }

    async fn set_status_by_id(
        &self,
        owner: UserId,
        id: CountryStatusId,
        status: VisitStatus,
    ) -> Result<CountryStatusRecord, CountryStatusError> {
        self.repo
            .update_status_by_id(owner, id, status)
            .await?
            .ok_or(CountryStatusError::NotFound)
    }

    async fn delete_status(
        &self,
        owner: UserId,
        id: CountryStatusId,
    ) -> Result<DeleteOutcome, CountryStatusError> {
        if self.repo.delete_by_id(owner, id).await? {
            Ok(DeleteOutcome::Deleted)
        } else {
            debug!(%owner, %id, "delete of absent country status");
            Ok(DeleteOutcome::AlreadyAbsent)
        }
    }
}
