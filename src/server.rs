//! gRPC hosting of a provider.
//!
//! [`ProviderService`] is the typed seam the Whisparr provider implements;
//! [`serve`] wraps it in the generated `hemmer.provider.v1.Provider` service,
//! prints the handshake line and runs until SIGTERM or SIGINT.
//!
//! Provider failures never surface as RPC errors: they are returned to the
//! host as error diagnostics in the response.
//!
//! # Shutdown
//!
//! On a signal the server stops accepting connections and drains in-flight
//! requests for at most [`ServeOptions::shutdown_timeout`], then calls
//! [`ProviderService::stop`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated as pb;
use crate::schema::{Block, BlockNestingMode, Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

/// Operations a provider exposes to the host.
///
/// Values are JSON objects keyed by attribute name. Only the schema,
/// configuration, planning and resource CRUD methods are mandatory.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Provider config, resource and data source schemas.
    fn schema(&self) -> ProviderSchema;

    /// Resource and data source names, derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    /// Validate the provider configuration before `configure`.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Release resources before exit.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Validate a resource configuration.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Migrate state written by an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Compute the changes needed to reach `proposed_state`.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a resource.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Refresh a resource.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Update a resource in place.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Bring an existing entity under management.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::Unimplemented(format!(
            "import is not supported for {}",
            resource_type
        )))
    }

    /// Validate a data source configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read a data source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let _ = config;
        Err(ProviderError::UnknownResource(format!(
            "unknown data source type: {}",
            data_source_type
        )))
    }
}

/// Decode a JSON payload; an empty payload is null.
fn decode_json(bytes: &[u8]) -> Result<Value, ProviderError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| {
        ProviderError::InvalidRequest(format!("payload is not valid JSON: {}", e))
    })
}

fn encode_json(value: &Value) -> Result<Vec<u8>, ProviderError> {
    Ok(serde_json::to_vec(value)?)
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<pb::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| pb::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => pb::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => pb::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_diagnostics(err: &ProviderError) -> Vec<pb::Diagnostic> {
    vec![pb::Diagnostic {
        severity: pb::diagnostic::Severity::Error as i32,
        summary: err.to_string(),
        detail: String::new(),
        attribute: String::new(),
    }]
}

/// Log the outcome of a validation-style call.
fn log_diagnostics(operation: &str, type_name: &str, diagnostics: &[Diagnostic]) {
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        warn!(operation, type_name, errors, "completed with errors");
    } else {
        debug!(operation, type_name, warnings = diagnostics.len(), "completed");
    }
}

fn schema_to_proto(schema: &crate::schema::Schema) -> pb::Schema {
    pb::Schema {
        version: schema.version as i64,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> pb::Block {
    pb::Block {
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| pb::Attribute {
                name: name.clone(),
                r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
                required: attr.flags.required,
                optional: attr.flags.optional,
                computed: attr.flags.computed,
                sensitive: attr.flags.sensitive,
                description: attr.description.clone().unwrap_or_default(),
                force_new: attr.force_new,
                default_value: attr
                    .default
                    .as_ref()
                    .and_then(|v| serde_json::to_vec(v).ok())
                    .unwrap_or_default(),
            })
            .collect(),
        block_types: block
            .blocks
            .iter()
            .map(|(name, nested)| pb::NestedBlock {
                type_name: name.clone(),
                block: Some(block_to_proto(&nested.block)),
                nesting_mode: match nested.nesting_mode {
                    BlockNestingMode::Single => pb::nested_block::NestingMode::Single as i32,
                    BlockNestingMode::List => pb::nested_block::NestingMode::List as i32,
                    BlockNestingMode::Set => pb::nested_block::NestingMode::Set as i32,
                    BlockNestingMode::Map => pb::nested_block::NestingMode::Map as i32,
                },
                min_items: nested.min_items as i32,
                max_items: nested.max_items as i32,
            })
            .collect(),
        description: block.description.clone().unwrap_or_default(),
    }
}

/// Adapter from the generated gRPC trait to [`ProviderService`].
struct GrpcProvider<P: ProviderService> {
    provider: Arc<P>,
}

impl<P: ProviderService> GrpcProvider<P> {
    async fn validate_with<F, Fut>(
        &self,
        operation: &str,
        type_name: &str,
        config: &[u8],
        call: F,
    ) -> Vec<pb::Diagnostic>
    where
        F: FnOnce(Arc<P>, Value) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<Diagnostic>, ProviderError>>,
    {
        let result = match decode_json(config) {
            Ok(config) => call(Arc::clone(&self.provider), config).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(diagnostics) => {
                log_diagnostics(operation, type_name, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(operation, type_name, error = %e, "failed");
                error_to_diagnostics(&e)
            }
        }
    }
}

#[tonic::async_trait]
impl<P: ProviderService> pb::provider_server::Provider for GrpcProvider<P> {
    #[instrument(skip_all, name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: Request<pb::GetMetadataRequest>,
    ) -> Result<Response<pb::GetMetadataResponse>, Status> {
        let metadata = self.provider.metadata();
        debug!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "metadata"
        );
        Ok(Response::new(pb::GetMetadataResponse {
            server_capabilities: Some(pb::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: Request<pb::GetSchemaRequest>,
    ) -> Result<Response<pb::GetSchemaResponse>, Status> {
        let schema = self.provider.schema();
        debug!(
            resources = schema.resources.len(),
            data_sources = schema.data_sources.len(),
            "schema"
        );
        Ok(Response::new(pb::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: Request<pb::ValidateProviderConfigRequest>,
    ) -> Result<Response<pb::ValidateProviderConfigResponse>, Status> {
        let req = request.into_inner();
        let diagnostics = self
            .validate_with("validate_provider_config", "provider", &req.config, |p, c| async move {
                p.validate_provider_config(c).await
            })
            .await;
        Ok(Response::new(pb::ValidateProviderConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.configure")]
    async fn configure(
        &self,
        request: Request<pb::ConfigureRequest>,
    ) -> Result<Response<pb::ConfigureResponse>, Status> {
        let req = request.into_inner();
        let diagnostics = self
            .validate_with("configure", "provider", &req.config, |p, c| async move {
                p.configure(c).await
            })
            .await;
        Ok(Response::new(pb::ConfigureResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.stop")]
    async fn stop(
        &self,
        _request: Request<pb::StopRequest>,
    ) -> Result<Response<pb::StopResponse>, Status> {
        info!("stop requested");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "stop failed");
                e.to_string()
            }
        };
        Ok(Response::new(pb::StopResponse { error }))
    }

    #[instrument(
        skip_all,
        name = "grpc.validate_resource_config",
        fields(resource_type = %request.get_ref().resource_type)
    )]
    async fn validate_resource_config(
        &self,
        request: Request<pb::ValidateResourceConfigRequest>,
    ) -> Result<Response<pb::ValidateResourceConfigResponse>, Status> {
        let req = request.into_inner();
        let resource_type = req.resource_type.clone();
        let diagnostics = self
            .validate_with(
                "validate_resource_config",
                &req.resource_type,
                &req.config,
                |p, c| async move { p.validate_resource_config(&resource_type, c).await },
            )
            .await;
        Ok(Response::new(pb::ValidateResourceConfigResponse { diagnostics }))
    }

    #[instrument(
        skip_all,
        name = "grpc.upgrade_resource_state",
        fields(resource_type = %request.get_ref().resource_type)
    )]
    async fn upgrade_resource_state(
        &self,
        request: Request<pb::UpgradeResourceStateRequest>,
    ) -> Result<Response<pb::UpgradeResourceStateResponse>, Status> {
        let req = request.into_inner();
        let result = async {
            let state = decode_json(&req.raw_state)?;
            let upgraded = self
                .provider
                .upgrade_resource_state(&req.resource_type, req.version, state)
                .await?;
            encode_json(&upgraded)
        }
        .await;

        Ok(Response::new(match result {
            Ok(upgraded_state) => pb::UpgradeResourceStateResponse {
                upgraded_state,
                diagnostics: vec![],
            },
            Err(e) => {
                error!(version = req.version, error = %e, "upgrade failed");
                pb::UpgradeResourceStateResponse {
                    upgraded_state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        }))
    }

    #[instrument(
        skip_all,
        name = "grpc.plan",
        fields(resource_type = %request.get_ref().resource_type)
    )]
    async fn plan(
        &self,
        request: Request<pb::PlanRequest>,
    ) -> Result<Response<pb::PlanResponse>, Status> {
        let req = request.into_inner();
        let result = async {
            let prior = if req.prior_state.is_empty() {
                None
            } else {
                Some(decode_json(&req.prior_state)?).filter(|v| !v.is_null())
            };
            let proposed = decode_json(&req.proposed_state)?;
            let config = decode_json(&req.config)?;
            let plan = self
                .provider
                .plan(&req.resource_type, prior, proposed, config)
                .await?;
            let planned_state = encode_json(&plan.planned_state)?;
            Ok::<_, ProviderError>((plan, planned_state))
        }
        .await;

        Ok(Response::new(match result {
            Ok((plan, planned_state)) => {
                debug!(
                    changes = plan.changes.len(),
                    requires_replace = plan.requires_replace,
                    "planned"
                );
                pb::PlanResponse {
                    planned_state,
                    changes: plan.changes.into_iter().map(Into::into).collect(),
                    requires_replace: plan.requires_replace,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "plan failed");
                pb::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        }))
    }

    #[instrument(
        skip_all,
        name = "grpc.create",
        fields(resource_type = %request.get_ref().resource_type)
    )]
    async fn create(
        &self,
        request: Request<pb::CreateRequest>,
    ) -> Result<Response<pb::CreateResponse>, Status> {
        let req = request.into_inner();
        let result = async {
            let planned = decode_json(&req.planned_state)?;
            encode_json(&self.provider.create(&req.resource_type, planned).await?)
        }
        .await;

        Ok(Response::new(match result {
            Ok(state) => {
                info!("created");
                pb::CreateResponse {
                    state,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "create failed");
                pb::CreateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        }))
    }

    #[instrument(
        skip_all,
        name = "grpc.read",
        fields(resource_type = %request.get_ref().resource_type)
    )]
    async fn read(
        &self,
        request: Request<pb::ReadRequest>,
    ) -> Result<Response<pb::ReadResponse>, Status> {
        let req = request.into_inner();
        let result = async {
            let current = decode_json(&req.current_state)?;
            encode_json(&self.provider.read(&req.resource_type, current).await?)
        }
        .await;

        Ok(Response::new(match result {
            Ok(state) => pb::ReadResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => {
                error!(error = %e, "read failed");
                pb::ReadResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        }))
    }

    #[instrument(
        skip_all,
        name = "grpc.update",
        fields(resource_type = %request.get_ref().resource_type)
    )]
    async fn update(
        &self,
        request: Request<pb::UpdateRequest>,
    ) -> Result<Response<pb::UpdateResponse>, Status> {
        let req = request.into_inner();
        let result = async {
            let prior = decode_json(&req.prior_state)?;
            let planned = decode_json(&req.planned_state)?;
            encode_json(&self.provider.update(&req.resource_type, prior, planned).await?)
        }
        .await;

        Ok(Response::new(match result {
            Ok(state) => {
                info!("updated");
                pb::UpdateResponse {
                    state,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "update failed");
                pb::UpdateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        }))
    }

    #[instrument(
        skip_all,
        name = "grpc.delete",
        fields(resource_type = %request.get_ref().resource_type)
    )]
    async fn delete(
        &self,
        request: Request<pb::DeleteRequest>,
    ) -> Result<Response<pb::DeleteResponse>, Status> {
        let req = request.into_inner();
        let result = async {
            let current = decode_json(&req.current_state)?;
            self.provider.delete(&req.resource_type, current).await
        }
        .await;

        let diagnostics = match result {
            Ok(()) => {
                info!("deleted");
                vec![]
            }
            Err(e) => {
                error!(error = %e, "delete failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(Response::new(pb::DeleteResponse { diagnostics }))
    }

    #[instrument(
        skip_all,
        name = "grpc.import_resource_state",
        fields(resource_type = %request.get_ref().resource_type, id = %request.get_ref().id)
    )]
    async fn import_resource_state(
        &self,
        request: Request<pb::ImportResourceStateRequest>,
    ) -> Result<Response<pb::ImportResourceStateResponse>, Status> {
        let req = request.into_inner();
        let result = async {
            self.provider
                .import_resource(&req.resource_type, &req.id)
                .await?
                .into_iter()
                .map(|r| {
                    Ok(pb::ImportedResource {
                        state: encode_json(&r.state)?,
                        resource_type: r.resource_type,
                    })
                })
                .collect::<Result<Vec<_>, ProviderError>>()
        }
        .await;

        Ok(Response::new(match result {
            Ok(imported) => {
                info!(count = imported.len(), "imported");
                pb::ImportResourceStateResponse {
                    imported,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "import failed");
                pb::ImportResourceStateResponse {
                    imported: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        }))
    }

    #[instrument(
        skip_all,
        name = "grpc.validate_data_source_config",
        fields(data_source_type = %request.get_ref().data_source_type)
    )]
    async fn validate_data_source_config(
        &self,
        request: Request<pb::ValidateDataSourceConfigRequest>,
    ) -> Result<Response<pb::ValidateDataSourceConfigResponse>, Status> {
        let req = request.into_inner();
        let data_source_type = req.data_source_type.clone();
        let diagnostics = self
            .validate_with(
                "validate_data_source_config",
                &req.data_source_type,
                &req.config,
                |p, c| async move { p.validate_data_source_config(&data_source_type, c).await },
            )
            .await;
        Ok(Response::new(pb::ValidateDataSourceConfigResponse { diagnostics }))
    }

    #[instrument(
        skip_all,
        name = "grpc.read_data_source",
        fields(data_source_type = %request.get_ref().data_source_type)
    )]
    async fn read_data_source(
        &self,
        request: Request<pb::ReadDataSourceRequest>,
    ) -> Result<Response<pb::ReadDataSourceResponse>, Status> {
        let req = request.into_inner();
        let result = async {
            let config = decode_json(&req.config)?;
            encode_json(
                &self
                    .provider
                    .read_data_source(&req.data_source_type, config)
                    .await?,
            )
        }
        .await;

        Ok(Response::new(match result {
            Ok(state) => pb::ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => {
                error!(error = %e, "data source read failed");
                pb::ReadDataSourceResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }
            }
        }))
    }
}

/// Options for [`serve_with_options`].
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long in-flight requests may run after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Resolve on SIGTERM or SIGINT (CTRL+C on Windows).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => info!(signal = "SIGTERM", "shutting down"),
            _ = sigint.recv() => info!(signal = "SIGINT", "shutting down"),
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!(signal = "CTRL+C", "shutting down");
    }

    #[cfg(not(any(unix, windows)))]
    std::future::pending::<()>().await;
}

/// Serve a provider on an ephemeral localhost port.
///
/// Prints `HEMMER_PROVIDER|<version>|<address>` to stdout once listening and
/// returns after a shutdown signal.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// [`serve`] with custom options.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    serve_on_listener(provider, listener, options, wait_for_shutdown_signal()).await
}

/// Serve a provider on a fixed address.
pub async fn serve_on<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// [`serve_on`] with custom options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    serve_on_listener(provider, listener, options, wait_for_shutdown_signal()).await
}

async fn serve_on_listener<P, S>(
    provider: P,
    listener: TcpListener,
    options: ServeOptions,
    shutdown: S,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: ProviderService,
    S: std::future::Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);
    info!(address = %addr, "provider listening");

    let provider = Arc::new(provider);
    let service = pb::provider_server::ProviderServer::new(GrpcProvider {
        provider: Arc::clone(&provider),
    });

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        Server::builder()
            .add_service(service)
            .serve_with_incoming_shutdown(
                tokio_stream::wrappers::TcpListenerStream::new(listener),
                async {
                    let _ = drain_rx.await;
                },
            ),
    );

    tokio::select! {
        joined = &mut server => {
            // Server exited without a signal.
            joined??;
        }
        _ = shutdown => {
            let _ = drain_tx.send(());
            match tokio::time::timeout(options.shutdown_timeout, &mut server).await {
                Ok(joined) => joined??,
                Err(_) => {
                    warn!(timeout = ?options.shutdown_timeout, "drain timed out, aborting");
                    server.abort();
                }
            }
        }
    }

    if let Err(e) = provider.stop().await {
        warn!(error = %e, "provider stop failed");
    }
    info!("provider stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock, Schema};
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        assert_eq!(decode_json(b"").unwrap(), Value::Null);
        assert_eq!(decode_json(br#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert!(matches!(
            decode_json(b"{not json"),
            Err(ProviderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_error_to_diagnostics() {
        let diags = error_to_diagnostics(&ProviderError::NotFound("tag '5' not found".into()));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, pb::diagnostic::Severity::Error as i32);
        assert!(diags[0].summary.contains("tag '5' not found"));
    }

    #[test]
    fn test_schema_to_proto() {
        let schema = Schema::v0()
            .with_attribute("api_key", Attribute::optional_string().sensitive())
            .with_attribute("priority", Attribute::optional_int64().with_default(json!(25)))
            .with_block(
                "items",
                NestedBlock::list(
                    crate::schema::Block::new().with_attribute("id", Attribute::required_int64()),
                )
                .with_min_items(1),
            );

        let proto = schema_to_proto(&schema);
        let block = proto.block.unwrap();
        let api_key = block.attributes.iter().find(|a| a.name == "api_key").unwrap();
        assert!(api_key.sensitive && api_key.optional);
        let priority = block.attributes.iter().find(|a| a.name == "priority").unwrap();
        assert_eq!(priority.default_value, b"25".to_vec());
        assert_eq!(block.block_types[0].min_items, 1);
        assert_eq!(
            block.block_types[0].nesting_mode,
            pb::nested_block::NestingMode::List as i32
        );
    }

    #[test]
    fn test_serve_options() {
        assert_eq!(ServeOptions::new().shutdown_timeout, Duration::from_secs(30));
        let options = ServeOptions::new().with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(options.shutdown_timeout, Duration::from_secs(5));
    }
}
