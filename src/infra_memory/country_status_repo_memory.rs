use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Rows plus the composite-key index, guarded together so every operation
/// sees both in the same state.
#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<CountryStatusId, CountryStatusRecord>,
    by_key: HashMap<(UserId, IsoCode), CountryStatusId>,
}

#[derive(Default)]
pub struct MemoryCountryStatusRepo {
    table: Mutex<Table>,
}

impl MemoryCountryStatusRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>, CountryStatusError> {
        self.table
            .lock()
            .map_err(|_| CountryStatusError::Store("country table lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl CountryStatusRepo for MemoryCountryStatusRepo {
    async fn insert_if_absent(
        &self,
        owner: UserId,
        iso_code: &IsoCode,
        name: Option<&str>,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError> {
        let mut table = self.lock()?;
        let key = (owner, iso_code.clone());
        if table.by_key.contains_key(&key) {
            return Ok(None);
        }

        table.last_id += 1;
        let id = CountryStatusId(table.last_id);
        let record = CountryStatusRecord {
            id,
            user_id: owner,
            iso_code: iso_code.clone(),
            name: name.map(str::to_string),
            status,
        };
        table.by_key.insert(key, id);
        table.rows.insert(id, record.clone());
        Ok(Some(record))
    }

    async fn update_status_by_key(
        &self,
        owner: UserId,
        iso_code: &IsoCode,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError> {
        let mut table = self.lock()?;
        let Some(id) = table.by_key.get(&(owner, iso_code.clone())).copied() else {
            return Ok(None);
        };
        Ok(table.rows.get_mut(&id).map(|row| {
            row.status = status;
            row.clone()
        }))
    }

    async fn list_by_user(
        &self,
        owner: UserId,
    ) -> Result<Vec<CountryStatusRecord>, CountryStatusError> {
        Ok(self
            .lock()?
            .rows
            .values()
            .filter(|row| row.user_id == owner)
            .cloned()
            .collect())
    }

    async fn update_status_by_id(
        &self,
        owner: UserId,
        id: CountryStatusId,
        status: VisitStatus,
    ) -> Result<Option<CountryStatusRecord>, CountryStatusError> {
        let mut table = self.lock()?;
        Ok(table
            .rows
            .get_mut(&id)
            .filter(|row| row.user_id == owner)
            .map(|row| {
                row.status = status;
                row.clone()
            }))
    }

    async fn delete_by_id(
        &self,
        owner: UserId,
        id: CountryStatusId,
    ) -> Result<bool, CountryStatusError> {
        let mut table = self.lock()?;
        let owned = table.rows.get(&id).is_some_and(|row| row.user_id == owner);
        if !owned {
            return Ok(false);
        }
        if let Some(row) = table.rows.remove(&id) {
            table.by_key.remove(&(row.user_id, row.iso_code));
        }
        Ok(true)
    }
}
