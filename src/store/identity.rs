use crate::{
    errors::AppError,
    model::person::{NewPerson, Person, PersonRow, ValidPerson},
    utils::{clock, identity_cache::IdentityCache},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// v4 collisions are not expected; the primary key is what guarantees uniqueness.
const MAX_TOKEN_ATTEMPTS: usize = 3;

/// Registered persons, keyed by identity token.
#[derive(Clone)]
pub struct IdentityStore {
    pool: SqlitePool,
    cache: IdentityCache,
    /// Bumped by every delete; a lookup that overlapped one drops what it cached.
    deletions: Arc<AtomicU64>,
}

impl IdentityStore {
    pub fn new(pool: SqlitePool, cache_capacity: u64) -> Self {
        Self {
            pool,
            cache: IdentityCache::new(cache_capacity),
            deletions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn lookup(&self, identity_token: &str) -> Result<Person, AppError> {
        if let Some(person) = self.cache.get(identity_token).await {
            return Ok(person);
        }

        let generation = self.deletions.load(Ordering::SeqCst);
        let person = self.fetch(identity_token).await?;
        self.remember(person.clone(), generation).await;
        Ok(person)
    }

    async fn fetch(&self, identity_token: &str) -> Result<Person, AppError> {
        let row = sqlx::query_as::<_, PersonRow>(
            r#"
            SELECT identity_token, name, role, id_number, department, contact_number, registered_at
            FROM persons
            WHERE identity_token = ?
            "#,
        )
        .bind(identity_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up person");
            AppError::from(e)
        })?;

        Person::try_from(row.ok_or(AppError::UnknownIdentity)?)
    }

    async fn remember(&self, person: Person, generation: u64) {
        let identity_token = person.identity_token.clone();
        self.cache.insert(person).await;
        if self.deletions.load(Ordering::SeqCst) != generation {
            self.cache.invalidate(&identity_token).await;
        }
    }

    pub async fn register(&self, input: NewPerson) -> Result<Person, AppError> {
        self.register_at(input, Utc::now()).await
    }

    pub async fn register_at(
        &self,
        input: NewPerson,
        now: DateTime<Utc>,
    ) -> Result<Person, AppError> {
        let valid = ValidPerson::try_from(input)?;
        let registered_at = clock::truncate_to_second(now);

        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let identity_token = Uuid::new_v4().to_string();

            let result = sqlx::query(
                r#"
                INSERT INTO persons
                (identity_token, name, role, id_number, department, contact_number, registered_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&identity_token)
            .bind(&valid.name)
            .bind(valid.role.as_ref())
            .bind(&valid.id_number)
            .bind(&valid.department)
            .bind(&valid.contact_number)
            .bind(clock::to_unix(registered_at))
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => {
                    info!(identity_token, role = %valid.role, "Person registered");
                    return Ok(Person {
                        identity_token,
                        name: valid.name,
                        role: valid.role,
                        id_number: valid.id_number,
                        department: valid.department,
                        contact_number: valid.contact_number,
                        registered_at,
                    });
                }
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    if db_err.message().contains("persons.id_number") {
                        info!(id_number = ?valid.id_number, "Registration rejected: id number taken");
                        return Err(AppError::invalid(format!(
                            "id number {} is already registered",
                            valid.id_number.as_deref().unwrap_or_default()
                        )));
                    }
                    warn!(attempt, "Identity token collision, generating a new one");
                }
                Err(e) => {
                    error!(error = %e, "Failed to register person");
                    return Err(e.into());
                }
            }
        }

        Err(AppError::StorageUnavailable(sqlx::Error::Protocol(
            "could not allocate a unique identity token".into(),
        )))
    }

    /// Removes the person together with all of their attendance records.
    pub async fn delete(&self, identity_token: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM persons WHERE identity_token = ?")
            .bind(identity_token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, identity_token, "Failed to delete person");
                AppError::from(e)
            })?;

        self.deletions.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(identity_token).await;

        if result.rows_affected() == 0 {
            return Err(AppError::UnknownIdentity);
        }

        debug!(identity_token, "Person deleted");
        Ok(())
    }
}
