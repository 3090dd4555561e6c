//! Units of work

use super::core::CrudRepository;
use crate::errors::CrudError;
use crate::traits::{Model, StoreClient};
use std::future::Future;

/// Run `work` inside a transaction on `client`.
///
/// The closure receives a handle bound to the transaction; every repository
/// built on it (see [`CrudRepository::bind`]) joins the same unit of work.
/// `Ok` commits, `Err` rolls back and is returned unchanged. Calling this on a
/// handle that is already inside a transaction fails with
/// [`CrudError::Transaction`].
pub async fn transaction<C, R, F, Fut>(client: &C, work: F) -> Result<R, CrudError>
where
    C: StoreClient,
    F: FnOnce(C) -> Fut,
    Fut: Future<Output = Result<R, CrudError>>,
{
    if client.in_transaction() {
        return Err(CrudError::Transaction(
            "nested transactions are not supported".into(),
        ));
    }

    let tx = client.begin().await?;
    match work(tx.clone()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(error = %rollback_error, "Failed to roll back transaction");
            }
            Err(error)
        }
    }
}

impl<T: Model, C: StoreClient> CrudRepository<T, C> {
    /// Run `work` in a transaction on this repository's client
    pub async fn transaction<R, F, Fut>(&self, work: F) -> Result<R, CrudError>
    where
        F: FnOnce(C) -> Fut,
        Fut: Future<Output = Result<R, CrudError>>,
    {
        transaction(&self.client, work).await
    }
}
