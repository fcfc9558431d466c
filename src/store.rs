//! In-memory user store
//!
//! Records live in a map keyed by id, with a unique email index and an
//! insertion-order list kept in step under one lock. Mutations also take the
//! `writes` gate, which is held across password hashing so check-then-act
//! sequences stay atomic with respect to other writers while readers proceed.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{NewUser, UpdateUserRequest, User, UserId, UserRecord};
use crate::password::SecretHasher;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Default)]
struct StoreInner {
    users: HashMap<UserId, UserRecord>,
    by_email: HashMap<String, UserId>,
    order: Vec<UserId>,
}

impl StoreInner {
    fn insert(&mut self, record: UserRecord) {
        self.by_email.insert(record.email.clone(), record.id);
        self.order.push(record.id);
        self.users.insert(record.id, record);
    }

    fn remove(&mut self, id: UserId) -> Option<UserRecord> {
        let record = self.users.remove(&id)?;
        self.by_email.remove(&record.email);
        self.order.retain(|existing| *existing != id);
        Some(record)
    }
}

/// Authoritative set of user records
pub struct UserStore {
    inner: RwLock<StoreInner>,
    writes: Mutex<()>,
    hasher: SecretHasher,
}

impl UserStore {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self::with_hasher(SecretHasher::new(config)?))
    }

    pub fn with_hasher(hasher: SecretHasher) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            writes: Mutex::new(()),
            hasher,
        }
    }

    /// Create a user, hashing the plaintext password
    ///
    /// Fails with [`AuthError::Conflict`] if the email is already taken.
    pub async fn create(&self, profile: NewUser, password: &str) -> Result<User, AuthError> {
        let _write = self.writes.lock().await;

        if self.inner.read().await.by_email.contains_key(&profile.email) {
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hasher.hash(password).await?;

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: profile.email,
            password_hash,
            name: profile.name,
            date_of_birth: profile.date_of_birth,
            gender: profile.gender,
            address: profile.address,
            subscribe_to_newsletter: profile.subscribe_to_newsletter,
            created_at: now,
            updated_at: now,
        };

        let user = User::from(&record);
        self.inner.write().await.insert(record);

        tracing::debug!(user_id = %user.id, "User record created");
        Ok(user)
    }

    /// All users in insertion order
    pub async fn find_all(&self) -> Vec<User> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.users.get(id))
            .map(User::from)
            .collect()
    }

    pub async fn find_by_id(&self, id: UserId) -> Result<User, AuthError> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .map(User::from)
            .ok_or(AuthError::NotFound)
    }

    /// Full record including the password hash, `None` if no user has this email
    pub async fn find_by_email_with_secret(&self, email: &str) -> Option<UserRecord> {
        let inner = self.inner.read().await;
        inner
            .by_email
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned()
    }

    /// Check a plaintext password against a record's stored hash
    pub async fn verify_secret(
        &self,
        record: &UserRecord,
        password: &str,
    ) -> Result<bool, AuthError> {
        self.hasher.verify(password, &record.password_hash).await
    }

    /// Spend one verification's worth of work when there is no record to check
    pub async fn verify_missing_secret(&self, password: &str) -> Result<(), AuthError> {
        self.hasher.verify_decoy(password).await.map(|_| ())
    }

    /// Apply the fields present in `changes`; always bumps `updated_at`
    pub async fn update(&self, id: UserId, changes: UpdateUserRequest) -> Result<User, AuthError> {
        let _write = self.writes.lock().await;
        let mut inner = self.inner.write().await;
        let record = inner.users.get_mut(&id).ok_or(AuthError::NotFound)?;

        if let Some(date_of_birth) = changes.date_of_birth {
            record.date_of_birth = date_of_birth;
        }
        if let Some(gender) = changes.gender {
            record.gender = gender;
        }
        if let Some(address) = changes.address {
            record.address = address;
        }
        if let Some(subscribe) = changes.subscribe_to_newsletter {
            record.subscribe_to_newsletter = subscribe;
        }
        record.updated_at = next_timestamp(record.updated_at);

        Ok(User::from(&*record))
    }

    pub async fn remove(&self, id: UserId) -> Result<(), AuthError> {
        let _write = self.writes.lock().await;
        self.inner
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(AuthError::NotFound)
    }

    /// Replace a user's password after verifying the current one
    ///
    /// The stored hash is left untouched unless `current` verifies.
    pub async fn change_secret(
        &self,
        id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let _write = self.writes.lock().await;

        let stored_hash = self
            .inner
            .read()
            .await
            .users
            .get(&id)
            .map(|record| record.password_hash.clone())
            .ok_or(AuthError::NotFound)?;

        if !self.hasher.verify(current, &stored_hash).await? {
            return Err(AuthError::unauthorized("Current password is incorrect"));
        }

        let new_hash = self.hasher.hash(new).await?;

        let mut inner = self.inner.write().await;
        let record = inner.users.get_mut(&id).ok_or(AuthError::NotFound)?;
        record.password_hash = new_hash;
        record.updated_at = next_timestamp(record.updated_at);

        Ok(())
    }

    /// Whole calendar years from `date_of_birth` to today's local date
    pub fn age_of(&self, date_of_birth: NaiveDate) -> i32 {
        age_on(date_of_birth, Local::now().date_naive())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Resolve a client-supplied id. Anything that is not a UUID names no user.
pub fn parse_user_id(raw: &str) -> Result<UserId, AuthError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AuthError::NotFound)
}

/// Calendar age on `today`, one less than the year difference until the
/// birthday has come around this year
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

// updated_at must strictly advance even if the clock hasn't ticked.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
