use std::sync::Arc;

use crate::store::TokenStore;

mod impls;

/// Client for the FormFlow collection API. Holds one shared HTTP client;
/// cloning is cheap and clones share the session store.
#[derive(Clone)]
pub struct FormFlowClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<TokenStore>,
}
