/// Generates `get_<entity>` on a client that holds a `Collection` field,
/// turning a missing document into the client's own not-found error.
#[macro_export]
macro_rules! impl_entity_lookup {
    ($client_name:ident, $field:ident, $entity:ty, $error:ty, $entity_name_snake:ident, $not_found:path) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: &str) -> Result<$entity, $error> {
                    tracing::debug!("Sending request");
                    self.$field
                        .get(id)
                        .await?
                        .ok_or_else(|| $not_found(id.to_string()))
                }
            }
        }
    };
}
