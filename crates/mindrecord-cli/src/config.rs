//! Runtime configuration assembled from flags, environment and the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use mindrecord_core::storage::LANG_KEY;
use mindrecord_core::{ApiUrl, AppState, FileStore, KeyValueStore, SessionStore};
use mindrecord_http::{ApiClient, AuthClient};

use crate::cli::Cli;

/// Language used when nothing else is configured.
pub const DEFAULT_LANG: &str = "en";

/// Everything a command needs: where the API is and the session store.
#[derive(Debug)]
pub struct AppContext {
    api: ApiUrl,
    store_path: PathBuf,
    session: Arc<SessionStore>,
    lang: String,
}

impl AppContext {
    /// Build the context for one invocation.
    ///
    /// The language is read once here. A `--lang` flag is written back to the
    /// store so later runs pick it up.
    pub fn load(cli: &Cli) -> Result<Self> {
        let api = match cli.api.as_deref() {
            Some(url) => ApiUrl::new(url).context("Invalid API URL")?,
            None => ApiUrl::default(),
        };

        let store_path = match &cli.store {
            Some(path) => path.clone(),
            None => default_store_path()?,
        };
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&store_path));

        if let Some(lang) = cli.lang.as_deref() {
            storage
                .set(LANG_KEY, lang)
                .context("Failed to save language")?;
        }
        let stored_lang = storage.get(LANG_KEY).context("Failed to read session store")?;
        let lang = resolve_lang(
            cli.lang.as_deref(),
            stored_lang.as_deref(),
            std::env::var("LANG").ok().as_deref(),
        );

        debug!(api = %api, store = %store_path.display(), lang = %lang, "Configuration loaded");

        Ok(Self {
            api,
            store_path,
            session: Arc::new(SessionStore::new(storage)),
            lang,
        })
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn api(&self) -> Result<ApiClient> {
        ApiClient::new(self.api.clone(), self.session.clone())
            .context("Failed to create API client")
    }

    pub fn auth_client(&self) -> Result<AuthClient> {
        Ok(AuthClient::from_api(self.api()?))
    }

    /// An [`AppState`] seeded from the stored session.
    pub fn app_state(&self) -> Result<AppState<AuthClient>> {
        Ok(AppState::new(self.auth_client()?))
    }
}

fn default_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "mindrecord")
        .context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("session.json"))
}

/// Pick the interface language: the flag, else the stored value, else the
/// language part of a POSIX locale such as `de_DE.UTF-8`, else
/// [`DEFAULT_LANG`].
pub fn resolve_lang(flag: Option<&str>, stored: Option<&str>, locale: Option<&str>) -> String {
    flag.or(stored)
        .map(str::to_string)
        .or_else(|| locale.and_then(locale_language))
        .unwrap_or_else(|| DEFAULT_LANG.to_string())
}

fn locale_language(locale: &str) -> Option<String> {
    let lang = locale.split(['_', '.', '@']).next()?.to_ascii_lowercase();
    match lang.as_str() {
        "" | "c" | "posix" => None,
        _ => Some(lang),
    }
}
