use async_trait::async_trait;

use super::{transport_error, ApiClient};
use crate::error::StoreError;
use crate::models::message::{ContactForm, Message, MessagePatch, NewMessage};
use crate::store::DocumentStore;

/// Store backed by the server's contact routes. Moderation calls carry the
/// operator token held by the shared [`ApiClient`].
#[derive(Clone)]
pub struct HttpDocumentStore {
    api: ApiClient,
}

impl HttpDocumentStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn contact_path(id: &str) -> String {
        format!("api/admin/contacts/{}", id)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn create(&self, message: NewMessage) -> Result<Message, StoreError> {
        // The public route always stores `read = false`.
        let form = ContactForm::new(message.name, message.email, message.body);
        let req = self.api.http().post(self.api.url("api/contacts")?).json(&form);
        let res = self.api.send(req).await?;
        res.json::<Message>().await.map_err(transport_error)
    }

    async fn list(&self) -> Result<Vec<Message>, StoreError> {
        let req = self
            .api
            .authorized(self.api.http().get(self.api.url("api/admin/contacts")?));
        let res = self.api.send(req).await?;
        res.json::<Vec<Message>>().await.map_err(transport_error)
    }

    async fn update_fields(&self, id: &str, patch: MessagePatch) -> Result<(), StoreError> {
        let req = self
            .api
            .authorized(self.api.http().patch(self.api.url(&Self::contact_path(id))?))
            .json(&patch);
        self.api.send(req).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let req = self
            .api
            .authorized(self.api.http().delete(self.api.url(&Self::contact_path(id))?));
        self.api.send(req).await?;
        Ok(())
    }
}
