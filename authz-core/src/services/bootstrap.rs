//! Idempotent startup provisioning.

use std::sync::Arc;

use crate::models::Group;
use crate::services::clock::Clock;
use crate::services::error::AuthzError;
use crate::store::Store;

/// Ensures the root group exists. Safe to call on every startup; concurrent
/// callers converge on the same row.
#[tracing::instrument(skip(store, clock))]
pub async fn ensure_root_group(
    store: &Arc<dyn Store>,
    clock: &Arc<dyn Clock>,
) -> Result<Group, AuthzError> {
    let (root, created) = store.ensure_root_group(clock.now()).await?;
    if created {
        tracing::info!(group_id = %root.group_id, "Root group created");
    } else {
        tracing::debug!(group_id = %root.group_id, "Root group already present");
    }
    Ok(root)
}
