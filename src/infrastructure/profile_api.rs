//! Client for the external create-user endpoint.

use crate::config::AppConfig;
use crate::core::error::EffectError;
use crate::core::model::RegisterUser;
use crate::core::traits::{ProfileApi, Registration};
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::debug;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpProfileApi {
    client: Client,
    endpoint: Option<Url>,
}

#[injectable(ProfileApi)]
impl HttpProfileApi {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> HttpProfileApi {
        HttpProfileApi::new(config.profile_api_url.clone())
    }
}

impl HttpProfileApi {
    /// `None` disables the call.
    pub fn new(endpoint: Option<Url>) -> HttpProfileApi {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        HttpProfileApi { client, endpoint }
    }
}

#[async_trait]
impl ProfileApi for HttpProfileApi {
    async fn register(&self, request: &RegisterUser) -> Result<Registration, EffectError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(Registration::Skipped);
        };

        let response = self
            .client
            .post(endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| EffectError::ExternalApi(e.to_string()))?;

        let status = response.status();
        debug!("create-user for {} answered {status}", request.id);

        if status == StatusCode::CREATED {
            Ok(Registration::Created)
        } else {
            let body = response
                .text()
                .await
                .map_err(|e| EffectError::ExternalApi(e.to_string()))?;
            Ok(Registration::Rejected(body))
        }
    }
}
