use crate::model::person::Person;
use moka::future::Cache;
use std::time::Duration;

/// In-memory front for person lookups. Persons never change after
/// registration, so entries only leave on deletion, capacity pressure or TTL.
#[derive(Clone)]
pub struct IdentityCache {
    inner: Cache<String, Person>,
}

impl IdentityCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity) // tune based on memory
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }

    pub async fn get(&self, identity_token: &str) -> Option<Person> {
        self.inner.get(identity_token).await
    }

    pub async fn insert(&self, person: Person) {
        self.inner
            .insert(person.identity_token.clone(), person)
            .await;
    }

    pub async fn invalidate(&self, identity_token: &str) {
        self.inner.invalidate(identity_token).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use chrono::Utc;

    fn person(token: &str) -> Person {
        Person {
            identity_token: token.into(),
            name: "Ana Reyes".into(),
            role: Role::Guest,
            id_number: None,
            department: None,
            contact_number: None,
            registered_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn insert_then_invalidate() {
        let cache = IdentityCache::new(16);
        cache.insert(person("abc")).await;
        assert_eq!(cache.get("abc").await.map(|p| p.name), Some("Ana Reyes".into()));

        cache.invalidate("abc").await;
        assert!(cache.get("abc").await.is_none());
    }
}
