//! Configuration for snaplist: directory layout, the optional `snaplist.toml`
//! app config, and the small JSON documents the other crates persist.

pub mod document;
pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    document::{load_document, save_document},
    loader::{
        clear_config_dir, config_dir, config_file_path, discover_and_load, load_config, save_config,
        set_config_dir, update_config,
    },
    schema::{HttpConfig, OAuthSettings, ServerConfig, SnaplistConfig, UpdatesConfig},
};
