use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::store::Filter;

// =============================================================================
// 1. THE MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Requests served by a [`DocumentActor`]. One variant per store verb.
#[derive(Debug)]
pub enum DocumentRequest {
    List {
        collection: String,
        filter: Option<Filter>,
        respond_to: Response<Vec<Value>>,
    },
    Get {
        collection: String,
        id: String,
        respond_to: Response<Option<Value>>,
    },
    Create {
        collection: String,
        document: Value,
        respond_to: Response<Value>,
    },
    Replace {
        collection: String,
        id: String,
        document: Value,
        respond_to: Response<Value>,
    },
    Patch {
        collection: String,
        id: String,
        fields: Value,
        respond_to: Response<Value>,
    },
    Delete {
        collection: String,
        id: String,
        respond_to: Response<()>,
    },
}

// =============================================================================
// 2. THE ACTOR SERVER
// =============================================================================

/// In-process document store. Owns every collection and serves requests one
/// at a time, so each single request is atomic; multi-request sequences are
/// not.
pub struct DocumentActor {
    receiver: mpsc::Receiver<DocumentRequest>,
    collections: HashMap<String, BTreeMap<String, Value>>,
    next_ids: HashMap<String, u64>,
}

impl DocumentActor {
    pub fn new(buffer_size: usize) -> (Self, DocumentClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            collections: HashMap::new(),
            next_ids: HashMap::new(),
        };
        (actor, DocumentClient::new(sender))
    }

    #[instrument(name = "document_actor", skip(self))]
    pub async fn run(mut self) {
        info!("DocumentActor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                DocumentRequest::List { collection, filter, respond_to } => {
                    let _ = respond_to.send(Ok(self.list(&collection, filter.as_ref())));
                }
                DocumentRequest::Get { collection, id, respond_to } => {
                    let doc = self
                        .collections
                        .get(&collection)
                        .and_then(|docs| docs.get(&id))
                        .cloned();
                    let _ = respond_to.send(Ok(doc));
                }
                DocumentRequest::Create { collection, document, respond_to } => {
                    let _ = respond_to.send(self.create(collection, document));
                }
                DocumentRequest::Replace { collection, id, document, respond_to } => {
                    let _ = respond_to.send(self.replace(&collection, &id, document));
                }
                DocumentRequest::Patch { collection, id, fields, respond_to } => {
                    let _ = respond_to.send(self.patch(&collection, &id, fields));
                }
                DocumentRequest::Delete { collection, id, respond_to } => {
                    let removed = self
                        .collections
                        .get_mut(&collection)
                        .and_then(|docs| docs.remove(&id));
                    let result = match removed {
                        Some(_) => Ok(()),
                        None => Err(not_found(&collection, &id)),
                    };
                    let _ = respond_to.send(result);
                }
            }
        }
        info!("DocumentActor stopped");
    }

    fn list(&self, collection: &str, filter: Option<&Filter>) -> Vec<Value> {
        let Some(docs) = self.collections.get(collection) else {
            return Vec::new();
        };
        docs.values()
            .filter(|doc| filter.map_or(true, |f| f.matches(doc)))
            .cloned()
            .collect()
    }

    fn create(&mut self, collection: String, document: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = document else {
            return Err(StoreError::Api {
                status: 400,
                message: "document must be a JSON object".to_string(),
            });
        };

        let counter = self.next_ids.entry(collection.clone()).or_insert(1);
        let id = match fields.get("id").and_then(id_text) {
            Some(id) => id,
            None => {
                let docs = self.collections.get(&collection);
                loop {
                    let candidate = counter.to_string();
                    *counter += 1;
                    if !docs.is_some_and(|d| d.contains_key(&candidate)) {
                        break candidate;
                    }
                }
            }
        };
        fields.insert("id".to_string(), Value::String(id.clone()));

        let doc = Value::Object(fields);
        debug!(collection = %collection, id = %id, "Document created");
        self.collections
            .entry(collection)
            .or_default()
            .insert(id, doc.clone());
        Ok(doc)
    }

    fn replace(&mut self, collection: &str, id: &str, document: Value) -> Result<Value, StoreError> {
        let slot = self
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| not_found(collection, id))?;
        let mut fields = match document {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.insert("id".to_string(), Value::String(id.to_string()));
        *slot = Value::Object(fields);
        Ok(slot.clone())
    }

    fn patch(&mut self, collection: &str, id: &str, fields: Value) -> Result<Value, StoreError> {
        let slot = self
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| not_found(collection, id))?;
        if let (Value::Object(target), Value::Object(changes)) = (&mut *slot, fields) {
            for (key, value) in changes {
                if key != "id" {
                    target.insert(key, value);
                }
            }
        }
        Ok(slot.clone())
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn not_found(collection: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

// =============================================================================
// 3. THE CLIENT
// =============================================================================

#[derive(Clone)]
pub struct DocumentClient {
    sender: mpsc::Sender<DocumentRequest>,
}

impl DocumentClient {
    pub fn new(sender: mpsc::Sender<DocumentRequest>) -> Self {
        Self { sender }
    }

    /// Sends one request and waits for the actor's answer.
    pub async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> DocumentRequest,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Actor dropped".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn assigns_sequential_ids_and_keeps_explicit_ones() {
        let (actor, client) = DocumentActor::new(10);
        tokio::spawn(actor.run());

        let first = client
            .request(|respond_to| DocumentRequest::Create {
                collection: "cart".into(),
                document: json!({"Quantity": 1}),
                respond_to,
            })
            .await
            .unwrap();
        assert_eq!(first["id"], "1");

        let seeded = client
            .request(|respond_to| DocumentRequest::Create {
                collection: "products".into(),
                document: json!({"id": 42, "stock": 3}),
                respond_to,
            })
            .await
            .unwrap();
        assert_eq!(seeded["id"], "42");
    }

    #[tokio::test]
    async fn patch_merges_fields_and_missing_documents_are_not_found() {
        let (actor, client) = DocumentActor::new(10);
        tokio::spawn(actor.run());

        client
            .request(|respond_to| DocumentRequest::Create {
                collection: "products".into(),
                document: json!({"id": "p1", "stock": 3, "title": "Lamp"}),
                respond_to,
            })
            .await
            .unwrap();

        let patched = client
            .request(|respond_to| DocumentRequest::Patch {
                collection: "products".into(),
                id: "p1".into(),
                fields: json!({"stock": 1}),
                respond_to,
            })
            .await
            .unwrap();
        assert_eq!(patched, json!({"id": "p1", "stock": 1, "title": "Lamp"}));

        let missing = client
            .request(|respond_to| DocumentRequest::Delete {
                collection: "products".into(),
                id: "nope".into(),
                respond_to,
            })
            .await;
        assert_eq!(
            missing,
            Err(StoreError::NotFound {
                collection: "products".into(),
                id: "nope".into()
            })
        );
    }

    #[tokio::test]
    async fn closed_actor_reports_communication_error() {
        let (actor, client) = DocumentActor::new(1);
        drop(actor);

        let result = client
            .request(|respond_to| DocumentRequest::Get {
                collection: "orders".into(),
                id: "1".into(),
                respond_to,
            })
            .await;
        assert!(matches!(result, Err(StoreError::ActorCommunicationError(_))));
    }
}
