use crate::api::ApiClient;
use crate::auth::{CredentialStore, FileCredentialStore, HttpAuthBackend};
use crate::config::{self, AppPaths, Settings};
use crate::error::AppResult;
use crate::output::Output;

#[derive(Debug)]
pub struct AppContext {
    pub profile: String,
    pub paths: AppPaths,
    pub settings: Settings,
    pub credential_store: FileCredentialStore,
    pub auth_backend: HttpAuthBackend,
    pub api_client: ApiClient,
    pub output: Output,
}

impl AppContext {
    pub fn bootstrap(profile: String, json: bool) -> AppResult<Self> {
        let profile = config::resolve_profile(&profile);
        let paths = AppPaths::discover()?;
        let settings = config::load_settings(&paths, &profile)?;
        let credential_store = FileCredentialStore::new(&paths, &profile);
        let auth_backend = HttpAuthBackend::new(settings.api_base_url());
        let api_client = ApiClient::new(settings.api_base_url());

        if let Some(access_token) = credential_store.access_token()? {
            api_client.set_token(&access_token);
        }

        Ok(Self {
            profile,
            paths,
            settings,
            credential_store,
            auth_backend,
            api_client,
            output: Output::new(json),
        })
    }
}
