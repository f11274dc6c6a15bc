//! HTTP persistence client for the transcription record API.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Persistence;
use crate::error::PersistenceError;

#[derive(Serialize)]
struct RecordBody<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreatedRecord {
    id: i64,
}

pub struct HttpPersistence {
    client: reqwest::Client,
    api_url: String,
}

impl HttpPersistence {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Persistence for HttpPersistence {
    async fn create_record(&self, token: &str) -> Result<i64, PersistenceError> {
        let url = format!("{}/transcriptions", self.api_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&RecordBody { text: "" })
            .send()
            .await
            .map_err(|e| PersistenceError::Create(e.to_string()))?;

        if response.status() != reqwest::StatusCode::CREATED {
            return Err(PersistenceError::Create(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let created: CreatedRecord = response
            .json()
            .await
            .map_err(|e| PersistenceError::Create(e.to_string()))?;

        debug!("Created transcription record {}", created.id);
        Ok(created.id)
    }

    async fn update_record(
        &self,
        token: &str,
        record_id: i64,
        text: &str,
    ) -> Result<(), PersistenceError> {
        let url = format!("{}/transcriptions/{}", self.api_url, record_id);

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&RecordBody { text })
            .send()
            .await
            .map_err(|e| PersistenceError::Update {
                record_id,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PersistenceError::Update {
                record_id,
                reason: format!("unexpected status {}", response.status()),
            });
        }

        debug!("Updated transcription record {} ({} chars)", record_id, text.len());
        Ok(())
    }
}
