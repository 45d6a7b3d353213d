use kubebuild_core::{AppV1, Pod, Resource, pod_name_prefix};
use kubebuild_storage::{DeleteOptions, ListParams, StoreExt};

use super::{Reconciler, StepOutcome};
use crate::error::Result;

impl Reconciler {
    /// Delete every Failed Pod of the App's Deployment.
    ///
    /// Stops at the first failed delete; Pods already removed stay removed.
    pub(crate) async fn sweep_failed_pods(&self, app: &AppV1) -> Result<StepOutcome> {
        let app_key = app.key();
        let params = ListParams::new().with_name_prefix(pod_name_prefix(&app_key));
        let pods: Vec<Pod> = self.store.list_as(&app_key.namespace, &params).await?;

        let options = DeleteOptions::with_grace_period(self.options.pod_grace_period_seconds);
        let mut deleted = 0;
        for pod in pods.iter().filter(|pod| pod.is_failed()) {
            tracing::info!(
                pod = %pod.key(),
                phase = "Failed",
                grace_period_seconds = self.options.pod_grace_period_seconds,
                "deleting failed Pod"
            );
            self.store.delete_object(pod, &options).await?;
            deleted += 1;
        }

        Ok(if deleted == 0 {
            StepOutcome::Unchanged
        } else {
            StepOutcome::Deleted(deleted)
        })
    }
}
