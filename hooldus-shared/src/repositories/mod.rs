use std::future::Future;
use futures::stream::{self, StreamExt};
use crate::database::errors::StoreError;

pub mod device_repository;
pub mod memory;
pub mod role_repository;
pub mod ticket_repository;

/// Upper bound on concurrent DynamoDB queries issued by one lookup.
pub const QUERY_CONCURRENCY: usize = 8;

/// Runs `lookups` with at most `limit` in flight and flattens their results.
/// The first error wins and the remaining lookups are dropped.
pub(crate) async fn collect_bounded<I, F, T>(lookups: I, limit: usize) -> Result<Vec<T>, StoreError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<Vec<T>, StoreError>>,
{
    let mut pending = stream::iter(lookups).buffer_unordered(limit.max(1));
    let mut items = Vec::new();

    while let Some(result) = pending.next().await {
        items.extend(result?);
    }

    Ok(items)
}
