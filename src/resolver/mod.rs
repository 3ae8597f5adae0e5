//! The resolver pipeline: authorization, validation, then the user resolver.
//!
//! Each descriptor field is compiled into one engine resolver closure. The
//! closure holds only `Arc`s and is safe to invoke concurrently for distinct
//! field invocations; the engine owns the execution scheduler.

mod rules;

use std::sync::Arc;

use async_graphql::dynamic::FieldFuture;
use async_graphql::dynamic::FieldValue;
use async_graphql::dynamic::ResolverContext;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::Value;
use tower::BoxError;

pub use self::rules::Rule;
use crate::context::RequestContext;
use crate::error::FieldError;
use crate::error::InternalFieldError;
use crate::error::ValidationFailure;

/// Everything a resolver sees for one field invocation.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// The parent object's value, JSON `null` at the roots.
    pub parent: Value,
    /// The coerced field arguments.
    pub args: serde_json::Map<String, Value>,
    /// Shared per-request state.
    pub context: RequestContext,
    /// The field being resolved.
    pub field_name: String,
}

impl ResolveRequest {
    /// An argument value, JSON `null` when absent.
    pub fn arg(&self, name: &str) -> &Value {
        self.args.get(name).unwrap_or(&Value::Null)
    }
}

/// A field resolver: computes the field value from the resolve request.
pub type Resolver =
    Arc<dyn Fn(ResolveRequest) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

/// A predicate gating whether the resolver may run at all.
pub type Authorizer = Arc<dyn Fn(ResolveRequest) -> BoxFuture<'static, bool> + Send + Sync>;

/// Wrap a plain async function as a [`Resolver`].
pub fn resolver<F, Fut>(f: F) -> Resolver
where
    F: Fn(ResolveRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// Wrap a plain async predicate as an [`Authorizer`].
pub fn authorizer<F, Fut>(f: F) -> Authorizer
where
    F: Fn(ResolveRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// The compiled middleware chain for one field.
pub(crate) struct ResolverPipeline {
    field_name: String,
    resolver: Resolver,
    authorizer: Option<Authorizer>,
    rules: Vec<Rule>,
    declared_args: Vec<String>,
}

impl ResolverPipeline {
    pub(crate) fn new(
        field_name: String,
        resolver: Resolver,
        authorizer: Option<Authorizer>,
        rules: Vec<Rule>,
        declared_args: Vec<String>,
    ) -> Self {
        Self {
            field_name,
            resolver,
            authorizer,
            rules,
            declared_args,
        }
    }

    /// Compile into the closure shape the engine invokes during execution.
    pub(crate) fn into_engine_resolver(
        self,
    ) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
        let pipeline = Arc::new(self);
        move |ctx: ResolverContext<'_>| {
            let pipeline = pipeline.clone();
            let request = extract_request(&ctx, pipeline.field_name.clone());
            FieldFuture::new(async move {
                let value = pipeline.resolve(request).await?;
                if value.is_null() {
                    return Ok(None);
                }
                let value = async_graphql::Value::from_json(value)
                    .map_err(|err| async_graphql::Error::new(err.to_string()))?;
                Ok(Some(FieldValue::value(value)))
            })
        }
    }

    /// Authorize, validate, then resolve. Stops at the first failing stage.
    async fn resolve(&self, request: ResolveRequest) -> Result<Value, async_graphql::Error> {
        if let Some(authorizer) = &self.authorizer {
            if !(authorizer)(request.clone()).await {
                return Err(async_graphql::Error::new_with_source(FieldError::Forbidden));
            }
        }

        if !self.rules.is_empty() {
            let failures = self.validate(&request.args);
            if !failures.is_empty() {
                return Err(async_graphql::Error::new_with_source(
                    FieldError::Validation(failures),
                ));
            }
        }

        (self.resolver)(request).await.map_err(into_engine_error)
    }

    /// Run all rules against the declared argument names, each defaulted to
    /// JSON `null` when not supplied, and aggregate one failure entry per
    /// failing field.
    fn validate(&self, args: &serde_json::Map<String, Value>) -> Vec<ValidationFailure> {
        let mut attributes = serde_json::Map::new();
        for name in &self.declared_args {
            attributes.insert(
                name.clone(),
                args.get(name).cloned().unwrap_or(Value::Null),
            );
        }

        let mut by_field: IndexMap<String, Vec<String>> = IndexMap::new();
        for rule in &self.rules {
            for (field, message) in rule.evaluate(&attributes) {
                by_field.entry(field).or_default().push(message);
            }
        }
        by_field
            .into_iter()
            .map(|(field, messages)| ValidationFailure { field, messages })
            .collect()
    }
}

/// Resolver failures keep their identity when the resolver raised a
/// [`FieldError`] itself; anything else counts as internal.
fn into_engine_error(err: BoxError) -> async_graphql::Error {
    match err.downcast::<FieldError>() {
        Ok(field_error) => async_graphql::Error::new_with_source(*field_error),
        Err(other) => async_graphql::Error::new_with_source(InternalFieldError(other)),
    }
}

/// Pull owned inputs out of the engine context before the future detaches.
fn extract_request(ctx: &ResolverContext<'_>, field_name: String) -> ResolveRequest {
    let parent = ctx
        .parent_value
        .as_value()
        .cloned()
        .and_then(|value| value.into_json().ok())
        .unwrap_or(Value::Null);
    let args: serde_json::Map<String, Value> = ctx
        .args
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.as_value().clone().into_json().unwrap_or(Value::Null),
            )
        })
        .collect();
    let context = ctx
        .data::<RequestContext>()
        .cloned()
        .unwrap_or_default();
    ResolveRequest {
        parent,
        args,
        context,
        field_name,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;

    fn counting_resolver(counter: Arc<AtomicUsize>) -> Resolver {
        resolver(move |_request| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!("resolved"))
            }
        })
    }

    fn request_with_args(args: Value) -> ResolveRequest {
        ResolveRequest {
            parent: Value::Null,
            args: args.as_object().expect("object fixture").clone(),
            context: RequestContext::default(),
            field_name: "test".to_string(),
        }
    }

    fn source_of<T: 'static>(error: &async_graphql::Error) -> Option<&T> {
        error
            .source
            .as_ref()
            .and_then(|source| source.downcast_ref::<T>())
    }

    #[tokio::test]
    async fn validation_failure_never_invokes_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = ResolverPipeline::new(
            "createUser".to_string(),
            counting_resolver(calls.clone()),
            None,
            vec![Rule::required(["name"]), Rule::min_length(["name"], 3)],
            vec!["name".to_string(), "email".to_string()],
        );

        let error = pipeline
            .resolve(request_with_args(json!({"email": "a@b.c"})))
            .await
            .expect_err("validation must fail");
        let Some(FieldError::Validation(failures)) = source_of::<FieldError>(&error) else {
            panic!("expected a validation source");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "name");
        assert_eq!(failures[0].messages, vec!["name cannot be blank."]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_authorizer_skips_validation_and_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = ResolverPipeline::new(
            "secret".to_string(),
            counting_resolver(calls.clone()),
            Some(authorizer(|_request| async { false })),
            // Would fail if validation ran.
            vec![Rule::required(["missing"])],
            vec!["missing".to_string()],
        );

        let error = pipeline
            .resolve(request_with_args(json!({})))
            .await
            .expect_err("authorization must fail");
        assert!(matches!(
            source_of::<FieldError>(&error),
            Some(FieldError::Forbidden)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn passing_stages_reach_the_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = ResolverPipeline::new(
            "createUser".to_string(),
            counting_resolver(calls.clone()),
            Some(authorizer(|_request| async { true })),
            vec![Rule::required(["name"])],
            vec!["name".to_string()],
        );

        let value = pipeline
            .resolve(request_with_args(json!({"name": "ada"})))
            .await
            .expect("resolution succeeds");
        assert_eq!(value, json!("resolved"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolver_status_errors_keep_their_identity() {
        let pipeline = ResolverPipeline::new(
            "lookup".to_string(),
            resolver(|_request| async {
                Err::<Value, BoxError>(Box::new(FieldError::status(
                    http::StatusCode::NOT_FOUND,
                    "no such record",
                )))
            }),
            None,
            Vec::new(),
            Vec::new(),
        );

        let error = pipeline
            .resolve(request_with_args(json!({})))
            .await
            .expect_err("resolver fails");
        assert!(matches!(
            source_of::<FieldError>(&error),
            Some(FieldError::Status { .. })
        ));
    }

    #[tokio::test]
    async fn other_resolver_errors_become_internal() {
        let pipeline = ResolverPipeline::new(
            "boom".to_string(),
            resolver(|_request| async { Err::<Value, BoxError>("database exploded".into()) }),
            None,
            Vec::new(),
            Vec::new(),
        );

        let error = pipeline
            .resolve(request_with_args(json!({})))
            .await
            .expect_err("resolver fails");
        assert!(source_of::<InternalFieldError>(&error).is_some());
        assert_eq!(error.message, "database exploded");
    }
}
