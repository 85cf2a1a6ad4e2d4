//! Expiring cookie slots.
//!
//! A [`Cookie`] is a single named value in a [`Cache`] with a max-age. Reads
//! past the expiry behave as if the cookie was never set, and the stale
//! entry is removed on the way out.

use crate::{Cache, CacheError};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::marker::PhantomData;

/// `SameSite` attribute carried with the cookie options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

/// Options applied when a cookie is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Duration,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieOptions {
    /// Lax, non-secure cookie living for `days` days. Out-of-range values
    /// saturate; writing such a cookie fails with [`CacheError::InvalidExpiry`].
    pub fn days(days: i64) -> Self {
        let max_age = Duration::try_days(days).unwrap_or(if days < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        });
        Self {
            max_age,
            secure: false,
            same_site: SameSite::Lax,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self::days(30)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCookie<T> {
    value: T,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    same_site: SameSite,
}

/// A named, expiring value slot.
#[derive(Debug, Clone)]
pub struct Cookie<T> {
    cache: Cache,
    name: String,
    options: CookieOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Cookie<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a cookie slot. Names must be non-empty and free of
    /// whitespace, `;`, `,` and `=`.
    pub fn new(
        cache: Cache,
        name: impl Into<String>,
        options: CookieOptions,
    ) -> Result<Self, CacheError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_graphic() && !matches!(c, ';' | ',' | '='));
        if !valid {
            return Err(CacheError::InvalidName(name));
        }
        Ok(Self {
            cache,
            name,
            options,
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    /// Read the cookie. Expired cookies are deleted and reported as absent.
    pub fn get(&self) -> Result<Option<T>, CacheError> {
        let Some(stored) = self.cache.get::<StoredCookie<T>>(&self.name)? else {
            return Ok(None);
        };
        if stored.expires_at <= Utc::now() {
            tracing::debug!(cookie = %self.name, "cookie expired");
            self.cache.delete(&self.name)?;
            return Ok(None);
        }
        Ok(Some(stored.value))
    }

    /// Write the cookie, restarting its max-age.
    pub fn set(&self, value: &T) -> Result<(), CacheError>
    where
        T: Clone,
    {
        let expires_at = Utc::now()
            .checked_add_signed(self.options.max_age)
            .ok_or_else(|| CacheError::InvalidExpiry(self.name.clone()))?;
        let stored = StoredCookie {
            value: value.clone(),
            expires_at,
            secure: self.options.secure,
            same_site: self.options.same_site,
        };
        self.cache.set(&self.name, &stored)
    }

    /// Remove the cookie.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.cache.delete(&self.name)
    }

    /// When the current value expires, if one is set.
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>, CacheError> {
        Ok(self
            .cache
            .get::<StoredCookie<serde_json::Value>>(&self.name)?
            .map(|stored| stored.expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(options: CookieOptions) -> Cookie<String> {
        Cookie::new(Cache::in_memory(), "cart_id", options).unwrap()
    }

    #[test]
    fn test_set_get_clear() {
        let c = cookie(CookieOptions::default());
        assert_eq!(c.get().unwrap(), None);

        c.set(&"cart_1".to_string()).unwrap();
        assert_eq!(c.get().unwrap().as_deref(), Some("cart_1"));

        c.set(&"cart_2".to_string()).unwrap();
        assert_eq!(c.get().unwrap().as_deref(), Some("cart_2"));

        c.clear().unwrap();
        assert_eq!(c.get().unwrap(), None);
    }

    #[test]
    fn test_expired_cookie_reads_as_absent_and_is_removed() {
        let cache = Cache::in_memory();
        let c: Cookie<String> = Cookie::new(
            cache.clone(),
            "cart_id",
            CookieOptions::default().with_max_age(Duration::seconds(-1)),
        )
        .unwrap();

        c.set(&"cart_1".to_string()).unwrap();
        assert!(cache.exists("cart_id").unwrap());
        assert_eq!(c.get().unwrap(), None);
        assert!(!cache.exists("cart_id").unwrap());
    }

    #[test]
    fn test_expiry_tracks_max_age() {
        let c = cookie(CookieOptions::days(30));
        c.set(&"cart_1".to_string()).unwrap();
        let expires = c.expires_at().unwrap().unwrap();
        let remaining = expires - Utc::now();
        assert!(remaining > Duration::days(29));
        assert!(remaining <= Duration::days(30));
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let c = cookie(CookieOptions::days(100_000_000));
        assert!(matches!(
            c.set(&"cart_1".to_string()),
            Err(CacheError::InvalidExpiry(_))
        ));
        assert_eq!(c.get().unwrap(), None);

        let huge = cookie(CookieOptions::days(i64::MAX));
        assert_eq!(huge.options().max_age, Duration::MAX);
        assert!(huge.set(&"cart_1".to_string()).is_err());
    }

    #[test]
    fn test_invalid_names_rejected() {
        for name in ["", "cart id", "a;b", "k=v"] {
            let result: Result<Cookie<String>, _> =
                Cookie::new(Cache::in_memory(), name, CookieOptions::default());
            assert!(matches!(result, Err(CacheError::InvalidName(_))), "{name:?}");
        }
    }

    #[test]
    fn test_slots_share_a_cache_independently() {
        let cache = Cache::in_memory();
        let cart: Cookie<String> =
            Cookie::new(cache.clone(), "cart_id", CookieOptions::default()).unwrap();
        let token: Cookie<String> =
            Cookie::new(cache, "_auth_token", CookieOptions::days(7).with_secure(true)).unwrap();

        cart.set(&"cart_1".to_string()).unwrap();
        token.set(&"jwt".to_string()).unwrap();
        cart.clear().unwrap();

        assert_eq!(cart.get().unwrap(), None);
        assert_eq!(token.get().unwrap().as_deref(), Some("jwt"));
        assert!(token.options().secure);
    }
}
