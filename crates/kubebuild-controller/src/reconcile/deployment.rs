use kubebuild_core::{AppV1, Deployment, OwnerReference, Resource, deployment_key};
use kubebuild_storage::{StoreExt, UpdateOptions};

use super::{Reconciler, StepOutcome};
use crate::error::Result;

impl Reconciler {
    /// Ensure `<app>-deployment` exists and runs the App's replica count.
    ///
    /// Only `spec.replicas` is ever written on an existing Deployment.
    pub(crate) async fn reconcile_deployment(&self, app: &AppV1) -> Result<StepOutcome> {
        let key = deployment_key(&app.key());

        let (mut deployment, created) = match self.store.try_get_as::<Deployment>(&key).await? {
            Some(existing) => (existing, false),
            None => {
                tracing::debug!(deployment = %key, "Deployment not found, creating");
                let mut desired: Deployment = self.renderer.render_as(app)?;
                desired.metadata.name = key.name.clone();
                desired.metadata.namespace = key.namespace.clone();
                desired
                    .metadata
                    .set_controller_reference(OwnerReference::controlled_by(app)?, Deployment::KIND.as_str())?;

                let stored = self.store.create_typed(&desired).await?;
                tracing::info!(deployment = %key, "created Deployment");
                (stored, true)
            }
        };

        let desired_replicas = app.spec.replicas;
        if deployment.spec.replicas == Some(desired_replicas) {
            return Ok(if created {
                StepOutcome::Created
            } else {
                StepOutcome::Unchanged
            });
        }

        tracing::info!(
            deployment = %key,
            observed = ?deployment.spec.replicas,
            desired = desired_replicas,
            "replica count drifted"
        );
        deployment.spec.replicas = Some(desired_replicas);
        self.store
            .update_typed(
                &deployment,
                &UpdateOptions::with_field_manager(&self.options.field_manager),
            )
            .await?;

        Ok(if created {
            StepOutcome::Created
        } else {
            StepOutcome::Updated
        })
    }
}
