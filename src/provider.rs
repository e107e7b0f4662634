//! The BlueCat provider.
//!
//! Every operation that talks to BAM runs in its own session: take the
//! provider lock, log in, issue the calls, log out, release the lock. BAM
//! sessions are never shared between operations, and at most one is open at
//! a time per provider.

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::info;

use crate::bam::client::{Connector, Session};
use crate::bam::rest::RestConnector;
use crate::config::BamConfig;
use crate::error::ProviderError;
use crate::ip4_network::data_source::{self, LookupArgs, DATA_SOURCE_TYPE};
use crate::ip4_network::resource::{self, NetworkArgs, RESOURCE_TYPE};
use crate::plan;
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Provider for BlueCat Address Manager IPv4 networks.
pub struct BlueCatProvider<C: Connector = RestConnector> {
    connector: C,
    config: RwLock<Option<BamConfig>>,
    lock: Mutex<()>,
}

impl BlueCatProvider {
    /// A provider talking to BAM over its REST API.
    pub fn new() -> Self {
        Self::with_connector(RestConnector::new())
    }
}

impl Default for BlueCatProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> BlueCatProvider<C> {
    /// A provider opening its sessions through `connector`.
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            config: RwLock::new(None),
            lock: Mutex::new(()),
        }
    }

    async fn config(&self) -> Result<BamConfig, ProviderError> {
        self.config.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })
    }

    /// Take the provider lock and log in. The session must be closed with
    /// [`Session::finish`] before the guard is dropped.
    async fn session(&self) -> Result<(MutexGuard<'_, ()>, Session), ProviderError> {
        let config = self.config().await?;
        let guard = self.lock.lock().await;
        let session = Session::open(&self.connector, &config).await?;
        Ok((guard, session))
    }

    async fn read_network(&self, args: &NetworkArgs) -> Result<Option<Value>, ProviderError> {
        let (_guard, session) = self.session().await?;
        let result = resource::read(&*session, args).await;
        let state = session.finish(result).await?;
        Ok(state.map(serde_json::to_value).transpose()?)
    }
}

fn resource_schema(resource_type: &str) -> Result<Schema, ProviderError> {
    match resource_type {
        RESOURCE_TYPE => Ok(resource::schema()),
        other => Err(ProviderError::UnknownResource(other.to_string())),
    }
}

fn data_source_schema(data_source_type: &str) -> Result<Schema, ProviderError> {
    match data_source_type {
        DATA_SOURCE_TYPE => Ok(data_source::schema()),
        other => Err(ProviderError::UnknownResource(other.to_string())),
    }
}

fn vanished(id: &str) -> ProviderError {
    ProviderError::NotFound(format!("IP4 network {} disappeared before it could be read", id))
}

#[async_trait::async_trait]
impl<C: Connector> ProviderService for BlueCatProvider<C> {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(BamConfig::schema())
            .with_resource(RESOURCE_TYPE, resource::schema())
            .with_data_source(DATA_SOURCE_TYPE, data_source::schema())
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(BamConfig::from_value(&config).err().unwrap_or_default())
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        match BamConfig::from_value(&config) {
            Ok(config) => {
                info!(
                    endpoint = %config.endpoint,
                    username = %config.username,
                    ssl_verify = config.ssl_verify,
                    "Configured BlueCat provider"
                );
                *self.config.write().await = Some(config);
                Ok(vec![])
            }
            Err(diagnostics) => Ok(diagnostics),
        }
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Stopping BlueCat provider");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = resource_schema(resource_type)?;
        Ok(validation::validate(&schema, &config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = resource_schema(resource_type)?;
        if version > schema.version as i64 {
            return Err(ProviderError::Validation(format!(
                "state version {} is newer than schema version {}",
                version, schema.version
            )));
        }
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = resource_schema(resource_type)?;
        Ok(plan::diff(&schema, prior_state.as_ref(), &proposed_state))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        resource_schema(resource_type)?;
        let args = NetworkArgs::from_value(planned_state)?;
        info!(
            parent_id = args.parent_id.as_deref().unwrap_or_default(),
            name = args.name.as_deref().unwrap_or_default(),
            size = args.size.unwrap_or_default(),
            "Creating IP4 network"
        );

        let id = {
            let (_guard, session) = self.session().await?;
            let result = resource::create(&*session, &args).await;
            session.finish(result).await?
        };

        let args = args.with_id(id);
        self.read_network(&args)
            .await?
            .ok_or_else(|| vanished(&id.to_string()))
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        resource_schema(resource_type)?;
        let args = NetworkArgs::from_value(current_state)?;
        info!(id = args.id.as_deref().unwrap_or_default(), "Reading IP4 network");

        Ok(self.read_network(&args).await?.unwrap_or(Value::Null))
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        resource_schema(resource_type)?;
        let prior = NetworkArgs::from_value(prior_state)?;
        let args = NetworkArgs {
            id: prior.id,
            ..NetworkArgs::from_value(planned_state)?
        };
        info!(
            id = args.id.as_deref().unwrap_or_default(),
            name = args.name.as_deref().unwrap_or_default(),
            "Updating IP4 network"
        );

        {
            let (_guard, session) = self.session().await?;
            let result = resource::update(&*session, &args).await;
            session.finish(result).await?;
        }

        self.read_network(&args)
            .await?
            .ok_or_else(|| vanished(args.id.as_deref().unwrap_or_default()))
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        resource_schema(resource_type)?;
        let args = NetworkArgs::from_value(current_state)?;
        info!(id = args.id.as_deref().unwrap_or_default(), "Deleting IP4 network");

        let (_guard, session) = self.session().await?;
        let result = resource::delete(&*session, &args).await;
        session.finish(result).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        resource_schema(resource_type)?;
        info!(id, "Importing IP4 network");

        let (_guard, session) = self.session().await?;
        let result = async {
            let args = resource::import(&*session, id).await?;
            resource::read(&*session, &args).await
        }
        .await;
        let state = session.finish(result).await?.ok_or_else(|| vanished(id))?;

        Ok(vec![ImportedResource::new(
            RESOURCE_TYPE,
            serde_json::to_value(state)?,
        )])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = data_source_schema(data_source_type)?;
        Ok(validation::validate(&schema, &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let schema = data_source_schema(data_source_type)?;
        validation::validate_result(&schema, &config).map_err(|diagnostics| {
            let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
            ProviderError::Validation(summaries.join("; "))
        })?;

        let args = LookupArgs::from_value(config)?;
        info!(
            container_id = args.container_id.as_deref().unwrap_or_default(),
            object_type = args.object_type.as_deref().unwrap_or_default(),
            address = args.address.as_deref().unwrap_or_default(),
            "Looking up IP4 object by address"
        );

        let (_guard, session) = self.session().await?;
        let result = data_source::read(&*session, &args).await;
        let state = session.finish(result).await?;
        Ok(serde_json::to_value(state)?)
    }
}
