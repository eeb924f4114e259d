/// Generates the raw lookup methods every typed client shares:
/// `find_<entity>` (missing is `NotFound`) and `list_<entity>s_where`.
/// These skip role checks, so they stay crate-internal.
#[macro_export]
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $entity_name_snake:ident) => {
        paste::paste! {
            #[allow(dead_code)]
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub(crate) async fn [<find_ $entity_name_snake>](&self, id: &str) -> $crate::error::AppResult<$entity> {
                    tracing::debug!("Sending request");
                    Ok(self.inner.fetch(id.to_string()).await?)
                }

                #[tracing::instrument(skip(self, filter))]
                pub(crate) async fn [<list_ $entity_name_snake s_where>](
                    &self,
                    filter: $crate::actor_framework::Filter<$entity>,
                ) -> $crate::error::AppResult<Vec<$entity>> {
                    tracing::debug!("Sending request");
                    Ok(self.inner.list(filter).await?)
                }
            }
        }
    };
}
