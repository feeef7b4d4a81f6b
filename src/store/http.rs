use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{DocumentStore, Filter};
use crate::error::StoreError;

/// [`DocumentStore`] over a json-server style REST API.
#[derive(Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
}

impl HttpDocumentStore {
    /// `timeout` bounds every request; `None` waits as long as the server does.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, StoreError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, collection: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{collection}/{id}", self.base_url),
            None => format!("{}/{collection}", self.base_url),
        }
    }

    async fn send(request: RequestBuilder, collection: &str, id: Option<&str>) -> Result<Response, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    #[instrument(skip(self))]
    async fn list(&self, collection: &str, filter: Option<Filter>) -> Result<Vec<Value>, StoreError> {
        debug!("Sending request");
        let mut request = self.client.get(self.url(collection, None));
        if let Some(filter) = &filter {
            request = request.query(&[(filter.field.as_str(), filter.value.as_str())]);
        }
        Ok(Self::send(request, collection, None).await?.json().await?)
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        debug!("Sending request");
        let request = self.client.get(self.url(collection, Some(id)));
        match Self::send(request, collection, Some(id)).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, document))]
    async fn create(&self, collection: &str, document: Value) -> Result<Value, StoreError> {
        debug!("Sending request");
        let request = self.client.post(self.url(collection, None)).json(&document);
        Ok(Self::send(request, collection, None).await?.json().await?)
    }

    #[instrument(skip(self, document))]
    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<Value, StoreError> {
        debug!("Sending request");
        let request = self.client.put(self.url(collection, Some(id))).json(&document);
        Ok(Self::send(request, collection, Some(id)).await?.json().await?)
    }

    #[instrument(skip(self, fields))]
    async fn patch(&self, collection: &str, id: &str, fields: Value) -> Result<Value, StoreError> {
        debug!("Sending request");
        let request = self.client.patch(self.url(collection, Some(id))).json(&fields);
        Ok(Self::send(request, collection, Some(id)).await?.json().await?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        debug!("Sending request");
        let request = self.client.delete(self.url(collection, Some(id)));
        Self::send(request, collection, Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn store_for(server: &MockServer) -> HttpDocumentStore {
        HttpDocumentStore::new(server.base_url(), Some(Duration::from_secs(5))).unwrap()
    }

    #[tokio::test]
    async fn get_maps_404_to_none() {
        let server = MockServer::start();
        let missing = server.mock(|when, then| {
            when.method(GET).path("/orders/99");
            then.status(404).json_body(json!({}));
        });

        let result = store_for(&server).get("orders", "99").await;

        assert_eq!(result, Ok(None));
        missing.assert();
    }

    #[tokio::test]
    async fn list_sends_equality_filter_as_query() {
        let server = MockServer::start();
        let listing = server.mock(|when, then| {
            when.method(GET).path("/cart").query_param("ownerId", "guest");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([{"id": "1", "ownerId": "guest"}]));
        });

        let docs = store_for(&server)
            .list("cart", Some(Filter::new("ownerId", "guest")))
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        listing.assert();
    }

    #[tokio::test]
    async fn patch_sends_partial_document() {
        let server = MockServer::start();
        let patch = server.mock(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path("/products/7")
                .json_body(json!({"stock": 3, "availabilityStatus": "Low Stock"}));
            then.status(200)
                .json_body(json!({"id": 7, "price": 2.5, "stock": 3, "availabilityStatus": "Low Stock"}));
        });

        let updated = store_for(&server)
            .patch("products", "7", json!({"stock": 3, "availabilityStatus": "Low Stock"}))
            .await
            .unwrap();

        assert_eq!(updated["stock"], 3);
        patch.assert();
    }

    #[tokio::test]
    async fn server_errors_carry_status_and_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/orders");
            then.status(500).body("Internal Server Error");
        });

        let result = store_for(&server).create("orders", json!({"total": 1})).await;

        assert_eq!(
            result,
            Err(StoreError::Api {
                status: 500,
                message: "Internal Server Error".to_string()
            })
        );
    }

    #[tokio::test]
    async fn delete_of_missing_document_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/orders/5");
            then.status(404);
        });

        let result = store_for(&server).delete("orders", "5").await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
