use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use shelf_kernel::Module;

/// Banner pointing clients at the API documentation.
#[derive(Debug, Serialize)]
pub struct Welcome {
    pub message: &'static str,
    pub docs: &'static str,
    pub openapi: &'static str,
}

pub struct RootModule;

#[async_trait]
impl Module for RootModule {
    fn name(&self) -> &'static str {
        "root"
    }

    fn routes(&self) -> Router {
        Router::new().route("/", get(welcome))
    }
}

async fn welcome() -> Json<Welcome> {
    Json(Welcome {
        message: "Welcome to the Library API!",
        docs: "/swagger-ui",
        openapi: "/docs/openapi.json",
    })
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(RootModule)
}
