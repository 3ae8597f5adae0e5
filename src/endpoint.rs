//! The HTTP-facing endpoint tying normalization, execution and the error
//! policy together.

use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use async_graphql::ServerError;
use async_graphql::Variables;
use async_graphql::dynamic;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use serde_json::json;
use tower::BoxError;

use crate::context::RequestContext;
use crate::descriptor::FieldSpec;
use crate::error::ConfigurationError;
use crate::error_policy;
use crate::host::Host;
use crate::host::TracingHost;
use crate::request::NormalizerConfig;
use crate::request::normalize;
use crate::schema::SchemaOptions;
use crate::schema::SchemaRegistry;

type RootFields = IndexMap<String, FieldSpec>;

/// One GraphQL endpoint over one schema.
///
/// The schema is assembled lazily on the first request and then shared: every
/// later request executes against the same [`dynamic::Schema`] instance, and
/// the registry refuses further type registration from that point on.
pub struct GraphQLEndpoint {
    registry: SchemaRegistry,
    roots: Mutex<Option<(RootFields, RootFields)>>,
    schema: OnceCell<Arc<dynamic::Schema>>,
    config: NormalizerConfig,
    host: Arc<dyn Host>,
    introspection: Option<bool>,
}

#[buildstructor::buildstructor]
impl GraphQLEndpoint {
    /// Build an endpoint from a registry and its root operation mappings.
    #[builder(visibility = "pub")]
    fn new(
        registry: SchemaRegistry,
        queries: RootFields,
        mutations: Option<RootFields>,
        config: Option<NormalizerConfig>,
        host: Option<Arc<dyn Host>>,
        introspection: Option<bool>,
    ) -> Self {
        Self {
            registry,
            roots: Mutex::new(Some((queries, mutations.unwrap_or_default()))),
            schema: OnceCell::new(),
            config: config.unwrap_or_default(),
            host: host.unwrap_or_else(|| Arc::new(TracingHost::default())),
            introspection,
        }
    }

    /// The assembled schema, building it on first use.
    ///
    /// Introspection follows the host's debug flag unless overridden at
    /// construction.
    pub fn schema(&self) -> Result<Arc<dynamic::Schema>, ConfigurationError> {
        self.schema
            .get_or_try_init(|| {
                let (queries, mutations) = self.roots.lock().take().ok_or_else(|| {
                    ConfigurationError::Schema(
                        "a previous schema build consumed the root mappings".to_string(),
                    )
                })?;
                let options = SchemaOptions {
                    introspection: self
                        .introspection
                        .unwrap_or_else(|| self.host.is_debug_mode()),
                };
                let schema = self.registry.build_schema(queries, mutations, &options)?;
                Ok(Arc::new(schema))
            })
            .map(Arc::clone)
    }

    /// Handle one HTTP request end to end.
    pub async fn handle(&self, request: http::Request<Bytes>) -> http::Response<Bytes> {
        self.handle_with(request, |_context| {}).await
    }

    /// Handle one HTTP request, letting the caller seed the request context
    /// (current user, database handles) before execution starts.
    pub async fn handle_with(
        &self,
        request: http::Request<Bytes>,
        prepare: impl FnOnce(&RequestContext),
    ) -> http::Response<Bytes> {
        let schema = match self.schema() {
            Ok(schema) => schema,
            Err(err) => {
                self.host
                    .log_exception(&ServerError::new(err.to_string(), None));
                let message = if self.host.is_debug_mode() {
                    err.to_string()
                } else {
                    error_policy::MASKED_MESSAGE.to_string()
                };
                return json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"errors": [{"message": message}]}),
                );
            }
        };

        let operation = match normalize(request, &self.config).await {
            Ok(operation) => operation,
            Err(err) => {
                let (status, body) = error_policy::request_failure(&err, self.host.as_ref());
                return json_response(status, body);
            }
        };

        let context = RequestContext::new(operation.uploads);
        prepare(&context);

        let mut engine_request = async_graphql::Request::new(operation.query).data(context);
        if let Some(variables) = operation.variables {
            engine_request = engine_request.variables(Variables::from_json(Value::Object(variables)));
        }
        if let Some(operation_name) = operation.operation_name {
            engine_request = engine_request.operation_name(operation_name);
        }

        let response = schema.execute(engine_request).await;
        json_response(
            StatusCode::OK,
            error_policy::process_response(response, self.host.as_ref()),
        )
    }
}

fn json_response(status: StatusCode, body: Value) -> http::Response<Bytes> {
    http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from(body.to_string()))
        .expect("a statically valid response")
}

/// [`tower::Service`] adapter over a shared endpoint.
#[derive(Clone)]
pub struct GraphQLService {
    endpoint: Arc<GraphQLEndpoint>,
}

impl GraphQLService {
    pub fn new(endpoint: Arc<GraphQLEndpoint>) -> Self {
        Self { endpoint }
    }
}

impl tower::Service<http::Request<Bytes>> for GraphQLService {
    type Response = http::Response<Bytes>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Bytes>) -> Self::Future {
        let endpoint = Arc::clone(&self.endpoint);
        Box::pin(async move { Ok(endpoint.handle(request).await) })
    }
}
