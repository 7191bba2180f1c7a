//! User/session store: registered accounts and the current-user slot.
//!
//! The logged-in user is kept as a full snapshot under the current-user key,
//! separate from the master user list. Profile updates therefore write twice
//! (slot first, then list entry). If the second write fails the two copies
//! drift until the next successful update; the error is returned and logged.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::models::{new_id, now_iso, NewUser, User, UserStats, UserUpdate};
use crate::schema::{user_stats_key, CURRENT_USER_KEY, USERS_KEY};
use crate::storage::{read_json, write_json, KeyValueStore};
use crate::{Error, Result};

// ---

/// Email of the built-in administrator account.
pub const ADMIN_EMAIL: &str = "admin@tapaburaco.com";

const ADMIN_ID: &str = "admin-001";
const ADMIN_PASSWORD: &str = "Admin@123";
const DEFAULT_AVATAR: &str = "👨‍💼";

pub struct UserStore {
    storage: Arc<dyn KeyValueStore>,
    active: watch::Sender<Option<User>>,
    error: watch::Sender<Option<String>>,
    write_lock: Mutex<()>,
}

impl UserStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        // ---
        Self {
            storage,
            active: watch::Sender::new(None),
            error: watch::Sender::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Restore the active user from the current-user slot, merged with the
    /// separately stored report counters.
    ///
    /// Read failures set [`last_error`](Self::last_error) and leave no
    /// active user.
    pub async fn load_current(&self) -> Option<User> {
        // ---
        match self.read_current().await {
            Ok(user) => {
                debug!("Current user: {:?}", user.as_ref().map(|u| &u.id));
                self.active.send_replace(user);
                self.error.send_replace(None);
            }
            Err(e) => {
                self.flag(&e);
                self.active.send_replace(None);
            }
        }
        self.active_user()
    }

    async fn read_current(&self) -> Result<Option<User>> {
        // ---
        let Some(user) = read_json::<User>(self.storage.as_ref(), CURRENT_USER_KEY).await? else {
            return Ok(None);
        };
        let stats = self.read_stats(&user.id).await?;
        Ok(Some(user.with_stats(stats)))
    }

    async fn read_stats(&self, user_id: &str) -> Result<UserStats> {
        // ---
        let stats = read_json(self.storage.as_ref(), &user_stats_key(user_id)).await?;
        Ok(stats.unwrap_or_default())
    }

    /// The master user list as stored; empty when nothing was stored yet.
    pub async fn users(&self) -> Result<Vec<User>> {
        Ok(read_json(self.storage.as_ref(), USERS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Append a new account. Rejected when the email is already registered,
    /// compared case-insensitively. Field validation is the caller's job.
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        // ---
        let _guard = self.write_lock.lock().await;
        let mut users = self.users().await?;

        if users.iter().any(|u| u.email_matches(&new_user.email)) {
            debug!("Registration rejected, email taken: {}", new_user.email);
            return Err(Error::DuplicateEmail {
                email: new_user.email,
            });
        }

        let user = User {
            id: new_id(),
            name: new_user.name,
            email: new_user.email,
            password: new_user.password,
            phone: new_user.phone,
            city: new_user.city,
            avatar: Some(DEFAULT_AVATAR.to_string()),
            total_reports: 0,
            resolved_reports: 0,
            joined_date: joined_today(),
            role: None,
            created_at: Some(now_iso()),
        };
        users.push(user.clone());
        self.write(USERS_KEY, &users).await?;

        info!("Registered user {} ({})", user.id, user.email);
        Ok(user)
    }

    /// Find a user by case-insensitive email and exact password, snapshot it
    /// into the current-user slot and make it the active user.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        // ---
        let users = self.users().await?;
        let Some(user) = users
            .into_iter()
            .find(|u| u.email_matches(email) && u.password == password)
        else {
            debug!("Login failed for {}", email);
            return Err(Error::InvalidCredentials);
        };

        let stats = self.read_stats(&user.id).await?;
        let _guard = self.write_lock.lock().await;
        self.write(CURRENT_USER_KEY, &user).await?;
        let active = user.with_stats(stats);
        self.active.send_replace(Some(active.clone()));

        info!("User {} logged in", active.id);
        Ok(active)
    }

    /// Clear the current-user slot. The master list is untouched.
    pub async fn logout(&self) -> Result<()> {
        // ---
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.storage.remove(CURRENT_USER_KEY).await {
            self.flag(&e);
            return Err(e);
        }
        self.active.send_replace(None);
        info!("User logged out");
        Ok(())
    }

    /// Merge `update` into the active user, then write both the current-user
    /// slot and the matching master-list entry.
    ///
    /// Returns `Ok(None)` when nobody is logged in.
    pub async fn update(&self, update: UserUpdate) -> Result<Option<User>> {
        // ---
        let _guard = self.write_lock.lock().await;
        let Some(mut merged) = self.active_user() else {
            return Ok(None);
        };
        merged.apply(&update);

        self.write(CURRENT_USER_KEY, &merged).await?;

        if let Err(e) = self.update_master_entry(&merged.id, &update).await {
            warn!(
                "User {} slot updated but master list write failed; copies have drifted",
                merged.id
            );
            self.flag(&e);
            return Err(e);
        }

        self.active.send_replace(Some(merged.clone()));
        debug!("User {} updated", merged.id);
        Ok(Some(merged))
    }

    async fn update_master_entry(&self, user_id: &str, update: &UserUpdate) -> Result<()> {
        // ---
        let Some(mut users) = read_json::<Vec<User>>(self.storage.as_ref(), USERS_KEY).await? else {
            return Ok(());
        };
        for user in users.iter_mut().filter(|u| u.id == user_id) {
            user.apply(update);
        }
        write_json(self.storage.as_ref(), USERS_KEY, &users).await
    }

    pub async fn increment_total_reports(&self) -> Result<Option<User>> {
        self.bump_stats(|stats| stats.total_reports += 1).await
    }

    pub async fn increment_resolved_reports(&self) -> Result<Option<User>> {
        self.bump_stats(|stats| stats.resolved_reports += 1).await
    }

    async fn bump_stats(&self, f: impl FnOnce(&mut UserStats)) -> Result<Option<User>> {
        // ---
        let _guard = self.write_lock.lock().await;
        let Some(user) = self.active_user() else {
            return Ok(None);
        };

        let mut stats = user.stats();
        f(&mut stats);
        self.write(&user_stats_key(&user.id), &stats).await?;

        let updated = user.with_stats(stats);
        self.active.send_replace(Some(updated.clone()));
        Ok(Some(updated))
    }

    /// Append the built-in administrator unless an account with its email
    /// already exists. Safe to call on every process start.
    ///
    /// Returns `true` when the account was created by this call.
    pub async fn seed_admin_if_absent(&self) -> Result<bool> {
        // ---
        let _guard = self.write_lock.lock().await;
        let mut users = self.users().await?;

        if users.iter().any(|u| u.email == ADMIN_EMAIL) {
            debug!("Administrator account already present");
            return Ok(false);
        }

        users.push(admin_user());
        self.write(USERS_KEY, &users).await?;

        info!("Administrator account created: {}", ADMIN_EMAIL);
        Ok(true)
    }

    async fn write<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        // ---
        write_json(self.storage.as_ref(), key, value)
            .await
            .inspect_err(|e| self.flag(e))
    }

    fn flag(&self, err: &Error) {
        warn!("user store: {}", err);
        self.error.send_replace(Some(err.to_string()));
    }

    pub fn active_user(&self) -> Option<User> {
        self.active.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.active.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.active.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }
}

fn joined_today() -> String {
    Local::now().format("%d/%m/%Y").to_string()
}

fn admin_user() -> User {
    // ---
    User {
        id: ADMIN_ID.to_string(),
        name: "Administrator".to_string(),
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
        phone: Some("(11) 9999-9999".to_string()),
        city: Some("São Paulo, SP".to_string()),
        avatar: Some("🛡️".to_string()),
        total_reports: 0,
        resolved_reports: 0,
        joined_date: joined_today(),
        role: Some("admin".to_string()),
        created_at: None,
    }
}
