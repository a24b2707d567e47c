//! Git smart/dumb HTTP gateway.
//!
//! This daemon lets stock git clients talk to hearth-hosted repositories
//! over HTTP: it authorizes each request against the forge data model, then
//! either relays the smart stateless-RPC protocol through a `git` subprocess
//! or serves raw repository files to legacy dumb-protocol clients.

pub mod advert;
pub mod authorize;
pub mod dumb;
pub mod error;
pub mod hookenv;
pub mod pktline;
pub mod routes;
pub mod rpc;
pub mod service;

use std::sync::Arc;

use hearth::config::Config;
use hearth::forge::Forge;
use hearth::storage::Storage;

pub use error::Error;

/// Composition root of the gateway. One per process, shared by all requests.
pub struct Gateway {
    pub config: Config,
    pub forge: Arc<dyn Forge>,
    pub storage: Storage,
    /// Cached empty-repository advertisement for push-to-create probes.
    pub advert: advert::EmptyAdvert,
}

impl Gateway {
    pub fn new(config: Config, forge: Arc<dyn Forge>) -> Self {
        let storage = config.storage();
        Self {
            config,
            forge,
            storage,
            advert: advert::EmptyAdvert::new(),
        }
    }
}
