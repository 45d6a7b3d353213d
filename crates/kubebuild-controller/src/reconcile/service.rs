use kubebuild_core::{AppV1, OwnerReference, Resource, Service, service_key};
use kubebuild_storage::{StoreExt, UpdateOptions};

use super::{Reconciler, StepOutcome};
use crate::error::Result;

impl Reconciler {
    /// Ensure `<app>-svc` exists. An existing Service is never modified.
    pub(crate) async fn reconcile_service(&self, app: &AppV1) -> Result<StepOutcome> {
        let key = service_key(&app.key());

        if self.store.try_get_as::<Service>(&key).await?.is_some() {
            return Ok(StepOutcome::Unchanged);
        }

        tracing::debug!(service = %key, "Service not found, creating");
        let mut desired: Service = self.renderer.render_as(app)?;
        desired.metadata.name = key.name.clone();
        desired.metadata.namespace = key.namespace.clone();
        desired
            .metadata
            .set_controller_reference(OwnerReference::controlled_by(app)?, Service::KIND.as_str())?;

        self.store.create_typed(&desired).await?;
        tracing::info!(service = %key, "created Service");
        Ok(StepOutcome::Created)
    }

    /// Make `enableIngress` follow `enableService` on the App itself.
    pub(crate) async fn sync_toggles(&self, mut app: AppV1) -> Result<StepOutcome> {
        if app.spec.enable_ingress == app.spec.enable_service {
            return Ok(StepOutcome::Unchanged);
        }

        tracing::info!(
            enable_service = app.spec.enable_service,
            enable_ingress = app.spec.enable_ingress,
            "App toggles disagree, following enableService"
        );
        app.spec.enable_ingress = app.spec.enable_service;
        self.store
            .update_typed(
                &app,
                &UpdateOptions::with_field_manager(&self.options.field_manager),
            )
            .await?;
        Ok(StepOutcome::Updated)
    }
}
