use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::backing::{read_json, write_json, KeyValueStore};
use crate::error::{Result, StoreError};
use crate::models::{NotificationPrefs, PrivacySettings, User};
use crate::store::StorageKeys;
use crate::utils;

/// Sign-up form; the provider assigns the id and creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub interests: Vec<String>,
}

/// Account page edits. Unset fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub occupation: Option<String>,
    pub profile_picture: Option<String>,
    pub interests: Option<Vec<String>>,
    pub notification_prefs: Option<NotificationPrefs>,
    pub privacy_settings: Option<PrivacySettings>,
}

/// Holds the signed-in user and mirrors it to `<ns>_user`.
pub struct IdentityProvider<B: KeyValueStore> {
    backing: B,
    key: String,
    current: Option<User>,
}

impl<B: KeyValueStore> IdentityProvider<B> {
    pub fn load(backing: B, namespace: &str) -> Result<Self> {
        let key = StorageKeys::new(namespace).user;
        let current: Option<User> = read_json(&backing, &key)?;
        if let Some(user) = &current {
            log::info!("restored session for user {}", user.id);
        }
        Ok(Self {
            backing,
            key,
            current,
        })
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn login(&mut self, user: User) -> Result<()> {
        write_json(&self.backing, &self.key, &user)?;
        log::info!("user {} logged in", user.id);
        self.current = Some(user);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.backing.remove(&self.key)?;
        if let Some(user) = self.current.take() {
            log::info!("user {} logged out", user.id);
        }
        Ok(())
    }

    pub fn register(&mut self, registration: Registration) -> Result<User> {
        let user = User {
            id: utils::next_id(),
            name: registration.name,
            email: registration.email,
            interests: registration.interests,
            notification_prefs: NotificationPrefs::default(),
            privacy_settings: PrivacySettings::default(),
            phone: None,
            location: None,
            bio: None,
            occupation: None,
            profile_picture: None,
            created_at: Some(Utc::now()),
        };
        self.login(user.clone())?;
        Ok(user)
    }

    pub fn update_user(&mut self, update: ProfileUpdate) -> Result<User> {
        let mut user = self
            .current
            .clone()
            .ok_or_else(|| StoreError::not_found("user", "current"))?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if update.phone.is_some() {
            user.phone = update.phone;
        }
        if update.location.is_some() {
            user.location = update.location;
        }
        if update.bio.is_some() {
            user.bio = update.bio;
        }
        if update.occupation.is_some() {
            user.occupation = update.occupation;
        }
        if update.profile_picture.is_some() {
            user.profile_picture = update.profile_picture;
        }
        if let Some(interests) = update.interests {
            user.interests = interests;
        }
        if let Some(prefs) = update.notification_prefs {
            user.notification_prefs = prefs;
        }
        if let Some(privacy) = update.privacy_settings {
            user.privacy_settings = privacy;
        }

        write_json(&self.backing, &self.key, &user)?;
        self.current = Some(user.clone());
        Ok(user)
    }
}
