use std::sync::Arc;

use {
    anyhow::Context,
    reqwest::Client,
    snaplist_config::SnaplistConfig,
    snaplist_listing::{
        DefaultsStore, ImageHost, ListingPublisher, ListingRequest, PublishError, PublishResult,
    },
    snaplist_oauth::{CredentialStore, OAuthClient},
    tokio::sync::Mutex,
};

use crate::{net::public_host, uploads::UploadStore};

/// Everything the HTTP handlers share.
pub struct GatewayState {
    pub version: String,
    pub config: SnaplistConfig,
    pub oauth: OAuthClient,
    pub publisher: ListingPublisher,
    pub defaults: DefaultsStore,
    pub uploads: UploadStore,
    pub image_host: ImageHost,
    /// Held for the whole inventory → offer → publish chain.
    publish_lock: Mutex<()>,
}

impl GatewayState {
    pub fn new(
        config: SnaplistConfig,
        oauth: OAuthClient,
        http: Client,
        defaults: DefaultsStore,
        uploads: UploadStore,
        image_host: ImageHost,
    ) -> Arc<Self> {
        let publisher = ListingPublisher::new(oauth.clone(), http);
        Arc::new(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            oauth,
            publisher,
            defaults,
            uploads,
            image_host,
            publish_lock: Mutex::new(()),
        })
    }

    /// State backed by the default stores under the config directory.
    pub fn from_config(config: SnaplistConfig) -> anyhow::Result<Arc<Self>> {
        let http = Client::builder()
            .timeout(config.http.timeout())
            .build()
            .context("failed to build http client")?;
        let oauth = OAuthClient::new(CredentialStore::new(), http.clone());
        let uploads = UploadStore::new(config.server.uploads_dir.clone());
        let image_host = ImageHost::new(
            public_host(config.server.public_host.as_deref()),
            config.server.port,
        );
        Ok(Self::new(
            config,
            oauth,
            http,
            DefaultsStore::new(),
            uploads,
            image_host,
        ))
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.oauth.store()
    }

    /// Publish `request`, one listing at a time.
    pub async fn publish(&self, request: &ListingRequest) -> Result<PublishResult, PublishError> {
        let _guard = self.publish_lock.lock().await;
        self.publisher.publish(request).await
    }
}
