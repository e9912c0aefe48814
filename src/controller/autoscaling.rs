//! KEDA object convergence
//!
//! HTTP-scaled connectors get an HTTPScaledObject. Custom-scaled connectors
//! get a ScaledObject plus one TriggerAuthentication per secret-backed
//! trigger. Every trigger is validated before anything is written, so an
//! invalid trigger never leaves a partially authorized scaler behind.

use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use kube::api::DynamicObject;
use tracing::{debug, error, info};

use crate::controller::apply::{Applied, create_or_patch};
use crate::controller::context::Context;
use crate::controller::error::{Error, Result};
use crate::controller::store::get_typed;
use crate::controller::validation::{closest_missing_keys, matching_key_set};
use crate::crd::{Connector, CustomScaling, HttpScaling, ScalingRule, Trigger};
use crate::resources::common::{ResourceKind, secret_resource, trigger_auth_name};
use crate::resources::http_scaled_object::generate_http_scaled_object;
use crate::resources::scaled_object::{ScaleTrigger, generate_scaled_object};
use crate::resources::trigger_auth::generate_trigger_auth;

/// Upsert the HTTPScaledObject of an HTTP-scaled connector
pub async fn reconcile_http_scaled_object(
    ctx: &Context,
    connector: &Connector,
    ns: &str,
    rule: &ScalingRule,
    http: &HttpScaling,
    port: i32,
) -> Result<Applied> {
    let obj = generate_http_scaled_object(connector, rule, http, port);
    let applied =
        create_or_patch(ctx.store.as_ref(), ResourceKind::HttpScaledObject, ns, &obj).await?;

    info!(
        http_scaled_object = ?obj.metadata.name,
        host = %http.host,
        ?applied,
        "HTTPScaledObject reconciled"
    );
    Ok(applied)
}

/// A validated trigger ready to be written
struct PlannedTrigger<'a> {
    trigger: &'a Trigger,
    auth: Option<DynamicObject>,
}

/// Upsert the TriggerAuthentications and the ScaledObject of a custom-scaled connector
///
/// Returns the names of the TriggerAuthentications written.
pub async fn reconcile_scaled_object(
    ctx: &Context,
    connector: &Connector,
    ns: &str,
    rule: &ScalingRule,
    custom: &CustomScaling,
) -> Result<Vec<String>> {
    let planned = plan_triggers(ctx, connector, ns, custom).await?;

    let mut trigger_auths = Vec::new();
    let mut triggers = Vec::with_capacity(planned.len());
    for PlannedTrigger { trigger, auth } in planned {
        let auth_name = match auth {
            Some(auth) => {
                let name = auth.metadata.name.clone().unwrap_or_default();
                create_or_patch(
                    ctx.store.as_ref(),
                    ResourceKind::TriggerAuthentication,
                    ns,
                    &auth,
                )
                .await?;
                debug!(trigger_authentication = %name, trigger_type = %trigger.type_, "TriggerAuthentication reconciled");
                trigger_auths.push(name.clone());
                Some(name)
            }
            None => None,
        };
        triggers.push(ScaleTrigger::from_trigger(trigger, auth_name));
    }

    let obj = generate_scaled_object(connector, rule, custom, triggers);
    let applied = create_or_patch(ctx.store.as_ref(), ResourceKind::ScaledObject, ns, &obj).await?;

    info!(
        scaled_object = ?obj.metadata.name,
        triggers = custom.triggers.len(),
        trigger_authentications = trigger_auths.len(),
        ?applied,
        "ScaledObject reconciled"
    );
    Ok(trigger_auths)
}

/// Validate every trigger and build its TriggerAuthentication
///
/// Fails on the first trigger with an unknown type, a missing Secret or a
/// Secret that satisfies none of the configured key-sets.
async fn plan_triggers<'a>(
    ctx: &Context,
    connector: &Connector,
    ns: &str,
    custom: &'a CustomScaling,
) -> Result<Vec<PlannedTrigger<'a>>> {
    let connector_name = connector.name_any();
    let mut planned = Vec::with_capacity(custom.triggers.len());
    let mut auth_index = 0;

    for trigger in &custom.triggers {
        let Some(key_sets) = ctx.scaler_config.auth_key_sets(&trigger.type_) else {
            error!(trigger_type = %trigger.type_, "Trigger type has no scaler auth config");
            return Err(Error::UnknownTriggerType(trigger.type_.clone()));
        };

        let Some(secret_name) = trigger.secret_name() else {
            planned.push(PlannedTrigger {
                trigger,
                auth: None,
            });
            continue;
        };

        let secret: Secret =
            match get_typed(ctx.store.as_ref(), &secret_resource(), ns, secret_name).await {
                Ok(Some(secret)) => secret,
                Ok(None) => {
                    error!(secret = %secret_name, namespace = %ns, trigger_type = %trigger.type_, "No such secret");
                    return Err(Error::NotFound(format!("Secret {ns}/{secret_name}")));
                }
                Err(e) => {
                    error!(secret = %secret_name, error = %e, "Fetch secret failed");
                    return Err(e);
                }
            };

        let Some(keys) = matching_key_set(&secret, key_sets) else {
            let missing = closest_missing_keys(&secret, key_sets);
            error!(
                trigger_type = %trigger.type_,
                secret = %secret_name,
                missing_fields = ?missing,
                "Secret misses required field"
            );
            if let Some(health) = &ctx.health_state {
                health
                    .metrics
                    .record_secret_validation_failure(&trigger.type_);
            }
            return Err(Error::SecretMissingRequiredKeys {
                secret: secret_name.to_string(),
                trigger_type: trigger.type_.clone(),
                missing,
            });
        };

        let name = trigger_auth_name(&connector_name, auth_index);
        auth_index += 1;
        planned.push(PlannedTrigger {
            trigger,
            auth: Some(generate_trigger_auth(connector, &name, secret_name, keys)),
        });
    }

    Ok(planned)
}
