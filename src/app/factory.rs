use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use homedir::my_home;

use crate::config::Config;

use super::backend::Backend;
use super::local::AppLocal;
use super::remote::AppRemote;

/// Builds app components from the environment.
pub struct AppFactory;

impl AppFactory {
    /// Pick the backend: `REWATCH_ADDR` set means a running daemon does the
    /// work and this process is only a client.
    pub fn create_backend(paths: &AppPaths) -> Result<Box<dyn Backend>> {
        if let Ok(addr) = std::env::var("REWATCH_ADDR") {
            log::info!("using remote backend: {addr}");
            Ok(Box::new(AppRemote::new(&addr, Self::parse_basic_auth())))
        } else {
            Ok(Box::new(Self::create_local_app(paths)?))
        }
    }

    pub fn create_local_app(paths: &AppPaths) -> Result<AppLocal> {
        let config = Arc::new(RwLock::new(Config::load_with(&paths.base_path)?));
        Ok(AppLocal::new(config)?)
    }

    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths { base_path })
    }

    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var("REWATCH_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;
        Ok(format!("{}/.local/share/rewatch", home.to_string_lossy()))
    }

    /// `REWATCH_BASIC_AUTH` as `username` or `username:password`.
    fn parse_basic_auth() -> Option<(String, Option<String>)> {
        match std::env::var("REWATCH_BASIC_AUTH") {
            Ok(ba) => {
                let parts: Vec<_> = ba.split(':').collect();
                match parts.as_slice() {
                    [username] => Some((username.to_string(), None)),
                    [username, password] => {
                        Some((username.to_string(), Some(password.to_string())))
                    }
                    _ => {
                        log::warn!(
                            "Invalid REWATCH_BASIC_AUTH format. Expected 'username' or 'username:password'"
                        );
                        None
                    }
                }
            }
            Err(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
}
