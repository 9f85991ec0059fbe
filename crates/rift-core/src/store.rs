//! Хранилище профилей десинхронизации
//!
//! Таблица профилей загружается из TOML один раз при старте и после
//! этого неизменна: активные вызовы `desync` получают профиль по
//! ссылке без блокировок. Выбор профиля - по точному совпадению
//! hostname либо по суффиксу домена.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::profile::DesyncProfile;

#[derive(Debug, Deserialize)]
struct StoreFile {
    #[serde(default)]
    default: DesyncProfile,
    #[serde(default)]
    hosts: HashMap<String, DesyncProfile>,
}

/// Неизменяемая таблица профилей
#[derive(Debug)]
pub struct ProfileStore {
    default: DesyncProfile,
    hosts: HashMap<String, DesyncProfile>,
}

impl ProfileStore {
    /// Загрузить таблицу из строки TOML
    ///
    /// `fake_supported` - флаг возможностей платформы; профили с
    /// недоступными методами отклоняются здесь, на загрузке.
    pub fn from_toml_str(s: &str, fake_supported: bool) -> Result<Self> {
        let file: StoreFile = toml::from_str(s)?;
        file.default.validate(fake_supported)?;
        for profile in file.hosts.values() {
            profile.validate(fake_supported)?;
        }
        Ok(Self {
            default: file.default,
            hosts: file.hosts,
        })
    }

    /// Загрузить таблицу из файла
    pub fn load<P: AsRef<Path>>(path: P, fake_supported: bool) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s, fake_supported)
    }

    /// Таблица из одного профиля по умолчанию
    pub fn single(default: DesyncProfile) -> Self {
        Self {
            default,
            hosts: HashMap::new(),
        }
    }

    /// Выбрать профиль для hostname
    ///
    /// Сначала точное совпадение, затем суффикс домена
    /// (`api.example.com` попадает под запись `example.com`), иначе
    /// профиль по умолчанию.
    pub fn select(&self, host: &str) -> &DesyncProfile {
        if let Some(profile) = self.hosts.get(host) {
            debug!("профиль для {}: точное совпадение", host);
            return profile;
        }
        for (domain, profile) in &self.hosts {
            if host.ends_with(&format!(".{}", domain)) {
                debug!("профиль для {}: суффикс {}", host, domain);
                return profile;
            }
        }
        &self.default
    }

    /// Профиль по умолчанию
    pub fn default_profile(&self) -> &DesyncProfile {
        &self.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::SplitMethod;

    const TABLE: &str = r#"
        [default]
        default_ttl = 64

        [hosts."example.com"]
        fake_ttl = 5

        [[hosts."example.com".parts]]
        position = 1
        method = "fake"

        [hosts."wiki.org"]

        [[hosts."wiki.org".parts]]
        position = 2
        method = "disorder"
    "#;

    #[test]
    fn test_store_select() {
        let store = ProfileStore::from_toml_str(TABLE, true).unwrap();

        assert_eq!(store.select("example.com").fake_ttl, 5);
        // Поддомен попадает под запись родителя
        assert_eq!(store.select("api.example.com").fake_ttl, 5);
        assert_eq!(
            store.select("wiki.org").parts[0].method,
            SplitMethod::Disorder
        );
        // Чужой домен получает профиль по умолчанию
        assert!(store.select("other.net").parts.is_empty());
        // Суффикс без точки не считается совпадением
        assert!(store.select("notexample.com").parts.is_empty());
    }

    #[test]
    fn test_store_rejects_unsupported_method() {
        assert!(ProfileStore::from_toml_str(TABLE, false).is_err());
    }

    #[test]
    fn test_store_empty_table() {
        let store = ProfileStore::from_toml_str("", true).unwrap();
        assert_eq!(store.default_profile().default_ttl, 64);
    }
}
