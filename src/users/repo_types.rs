use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Social networks a user can link a handle for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Twitter,
    Facebook,
    Github,
    Twitch,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Twitter,
        Provider::Facebook,
        Provider::Github,
        Provider::Twitch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Twitter => "twitter",
            Provider::Facebook => "facebook",
            Provider::Github => "github",
            Provider::Twitch => "twitch",
        }
    }
}

/// Linked handles; unset entries are left out of the JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitch: Option<String>,
}

impl Socials {
    pub fn get_mut(&mut self, provider: Provider) -> &mut Option<String> {
        match provider {
            Provider::Twitter => &mut self.twitter,
            Provider::Facebook => &mut self.facebook,
            Provider::Github => &mut self.github,
            Provider::Twitch => &mut self.twitch,
        }
    }
}

/// Partial socials update.
///
/// Per provider: `None` leaves the handle alone, `Some(None)` unsets it and
/// `Some(Some(handle))` replaces it. An explicit `null` in JSON is an unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SocialsPatch {
    #[serde(default, deserialize_with = "present")]
    pub twitter: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub facebook: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub github: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub twitch: Option<Option<String>>,
}

fn present<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(Some)
}

impl SocialsPatch {
    pub fn get(&self, provider: Provider) -> Option<&Option<String>> {
        match provider {
            Provider::Twitter => self.twitter.as_ref(),
            Provider::Facebook => self.facebook.as_ref(),
            Provider::Github => self.github.as_ref(),
            Provider::Twitch => self.twitch.as_ref(),
        }
    }

    pub fn get_mut(&mut self, provider: Provider) -> &mut Option<Option<String>> {
        match provider {
            Provider::Twitter => &mut self.twitter,
            Provider::Facebook => &mut self.facebook,
            Provider::Github => &mut self.github,
            Provider::Twitch => &mut self.twitch,
        }
    }

    /// Writes the touched providers into `socials`.
    pub fn apply(&self, socials: &mut Socials) {
        for provider in Provider::ALL {
            if let Some(value) = self.get(provider) {
                *socials.get_mut(provider) = value.clone();
            }
        }
    }
}

/// User record as held by the store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    pub socials: Socials,
    pub created_at: OffsetDateTime,
}

/// Flat row shape of the `users` table.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub github: Option<String>,
    pub twitch: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            socials: Socials {
                twitter: r.twitter,
                facebook: r.facebook,
                github: r.github,
                twitch: r.twitch,
            },
            created_at: r.created_at,
        }
    }
}

/// Validated, hashed account ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Public identity of a user; what handlers see of the logged-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for CurrentUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
        }
    }
}
