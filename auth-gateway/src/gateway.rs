use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::models::*;
use crate::namespace::Namespace;
use crate::registry::StoreRegistry;
use crate::resolver::ModelResolver;
use crate::schema::compile_modules;
use crate::session::AuthorizationSession;
use auth_zanzibar::{
    AuthorizationService, CheckRequest as EngineCheck, Object, Relation, Subject, TupleFilter,
    ZanzibarError,
};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{info, info_span, instrument, warn, Span};

/// Authorization gateway over per-namespace engine stores.
///
/// Each namespace is backed by its own store and model, provisioned on first
/// use and remembered for the lifetime of the gateway. Queries name the
/// namespace; the gateway resolves it and forwards the query to the engine.
pub struct AuthzGateway {
    engine: Arc<dyn AuthorizationService>,
    registry: Arc<StoreRegistry>,
    resolver: ModelResolver,
    config: GatewayConfig,
    span: Span,
}

impl AuthzGateway {
    pub fn new(engine: Arc<dyn AuthorizationService>, config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let schema = Arc::new(compile_modules(&config.modules)?);
        let registry = Arc::new(StoreRegistry::new());
        let resolver = ModelResolver::new(engine.clone(), registry.clone(), schema, &config)?;

        let span = info_span!("authz_gateway", service = %config.service_name);
        info!(
            parent: &span,
            modules = config.modules.len(),
            pinned_stores = config.stores.len(),
            auto_provision = config.auto_provision,
            "authorization gateway ready"
        );

        Ok(Self {
            engine,
            registry,
            resolver,
            config,
            span,
        })
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Session for `namespace`, provisioning its store and model if needed.
    #[instrument(parent = &self.span, skip_all, fields(namespace = %namespace))]
    pub async fn resolve(
        &self,
        namespace: &str,
        deadline: Option<Instant>,
    ) -> Result<AuthorizationSession> {
        let namespace = Namespace::new(namespace)?;
        self.within_deadline("resolve", deadline, self.session(&namespace))
            .await
    }

    #[instrument(parent = &self.span, skip_all, fields(namespace = %request.namespace))]
    pub async fn check(&self, request: CheckRequest) -> Result<Decision> {
        let namespace = Namespace::new(request.namespace.as_str())?;
        let check = parse_check(&request.subject, &request.relation, &request.object)?;

        let engine = &self.engine;
        let check = &check;
        let allowed = self
            .within_deadline(
                "check",
                request.deadline,
                self.with_session(&namespace, move |session| async move {
                    engine
                        .check(session.store_id(), session.model_id(), check)
                        .await
                }),
            )
            .await?;

        Ok(Decision { allowed })
    }

    /// Check every entry against one session; results keep the input order.
    ///
    /// Malformed entries fail in their own slot without reaching the engine.
    /// The outer error is reserved for failures that affect the whole batch.
    #[instrument(
        parent = &self.span,
        skip_all,
        fields(namespace = %request.namespace, size = request.checks.len())
    )]
    pub async fn batch_check(&self, request: BatchCheckRequest) -> Result<Vec<Result<Decision>>> {
        let namespace = Namespace::new(request.namespace.as_str())?;
        if request.checks.len() > self.config.batch_max_size {
            return Err(GatewayError::InvalidRequest(format!(
                "batch of {} checks exceeds the limit of {}",
                request.checks.len(),
                self.config.batch_max_size
            )));
        }

        let mut results: Vec<Option<Result<Decision>>> = Vec::with_capacity(request.checks.len());
        let mut slots = Vec::new();
        let mut checks = Vec::new();
        for (slot, item) in request.checks.iter().enumerate() {
            match parse_check(&item.subject, &item.relation, &item.object) {
                Ok(check) => {
                    slots.push(slot);
                    checks.push(check);
                    results.push(None);
                }
                Err(e) => results.push(Some(Err(e))),
            }
        }

        if !checks.is_empty() {
            let engine = &self.engine;
            let batch = checks.as_slice();
            let outcomes = self
                .within_deadline(
                    "batch_check",
                    request.deadline,
                    self.with_session(&namespace, move |session| async move {
                        engine
                            .batch_check(session.store_id(), session.model_id(), batch)
                            .await
                    }),
                )
                .await?;

            if outcomes.len() != slots.len() {
                return Err(GatewayError::Engine(ZanzibarError::StorageError(format!(
                    "engine returned {} results for {} checks",
                    outcomes.len(),
                    slots.len()
                ))));
            }
            for (slot, outcome) in slots.into_iter().zip(outcomes) {
                results[slot] = Some(
                    outcome
                        .map(|allowed| Decision { allowed })
                        .map_err(GatewayError::from),
                );
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    #[instrument(parent = &self.span, skip_all, fields(namespace = %request.namespace))]
    pub async fn expand(&self, request: ExpandRequest) -> Result<ExpandResponse> {
        let namespace = Namespace::new(request.namespace.as_str())?;
        let relation: Relation = request.relation.parse()?;
        let object: Object = request.object.parse()?;
        let max_depth = match request.max_depth {
            Some(0) => {
                return Err(GatewayError::InvalidRequest(
                    "max_depth must be at least 1".to_string(),
                ))
            }
            Some(depth) => depth.min(self.config.expand_max_depth),
            None => self.config.expand_max_depth,
        };

        let engine = &self.engine;
        let (relation, object) = (&relation, &object);
        let tree = self
            .within_deadline(
                "expand",
                request.deadline,
                self.with_session(&namespace, move |session| async move {
                    engine
                        .expand(
                            session.store_id(),
                            session.model_id(),
                            relation,
                            object,
                            Some(max_depth),
                        )
                        .await
                }),
            )
            .await?;

        Ok(ExpandResponse { tree })
    }

    /// Objects of a type the subject holds the relation on, capped at the limit.
    #[instrument(parent = &self.span, skip_all, fields(namespace = %request.namespace))]
    pub async fn list(&self, request: ListRequest) -> Result<ListResponse> {
        let namespace = Namespace::new(request.namespace.as_str())?;
        let subject: Subject = request.subject.parse()?;
        let relation: Relation = request.relation.parse()?;
        if !is_type_name(&request.object_type) {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid object type '{}'",
                request.object_type
            )));
        }
        let limit = self.limit(request.limit)?;

        let engine = &self.engine;
        let (subject, relation, object_type) = (&subject, &relation, request.object_type.as_str());
        let mut objects = self
            .within_deadline(
                "list",
                request.deadline,
                self.with_session(&namespace, move |session| async move {
                    engine
                        .list_objects(
                            session.store_id(),
                            session.model_id(),
                            subject,
                            relation,
                            object_type,
                        )
                        .await
                }),
            )
            .await?;

        let truncated = objects.len() > limit;
        objects.truncate(limit);
        Ok(ListResponse {
            objects: objects.iter().map(Object::to_string).collect(),
            truncated,
        })
    }

    /// Stored tuples matching the filter, capped at the limit.
    #[instrument(parent = &self.span, skip_all, fields(namespace = %request.namespace))]
    pub async fn read(&self, request: ReadRequest) -> Result<ReadResponse> {
        let namespace = Namespace::new(request.namespace.as_str())?;
        let filter = TupleFilter {
            subject: request.subject.as_deref().map(str::parse::<Subject>).transpose()?,
            relation: request.relation.as_deref().map(str::parse::<Relation>).transpose()?,
            object: request.object.as_deref().map(str::parse::<Object>).transpose()?,
        };
        let limit = self.limit(request.limit)?;

        let engine = &self.engine;
        let filter = &filter;
        let mut tuples = self
            .within_deadline(
                "read",
                request.deadline,
                self.with_session(&namespace, move |session| async move {
                    engine.read(session.store_id(), filter).await
                }),
            )
            .await?;

        let truncated = tuples.len() > limit;
        tuples.truncate(limit);
        Ok(ReadResponse { tuples, truncated })
    }

    async fn session(&self, namespace: &Namespace) -> Result<AuthorizationSession> {
        let binding = self.resolver.resolve(namespace).await?;
        Ok(AuthorizationSession::new(namespace.clone(), binding))
    }

    /// Run `query` in the namespace's session.
    ///
    /// If the engine no longer knows the bound store or model, the binding is
    /// replaced and the query runs once more.
    async fn with_session<T, F, Fut>(&self, namespace: &Namespace, query: F) -> Result<T>
    where
        F: Fn(AuthorizationSession) -> Fut,
        Fut: Future<Output = std::result::Result<T, ZanzibarError>>,
    {
        let session = self.session(namespace).await?;
        match query(session.clone()).await {
            Err(e) if is_stale_binding(&e) => {
                warn!(
                    namespace = %namespace,
                    store_id = %session.store_id(),
                    model_id = %session.model_id(),
                    error = %e,
                    "engine rejected binding, re-resolving"
                );
                let binding = self.resolver.refresh(namespace, session.binding()).await?;
                query(AuthorizationSession::new(namespace.clone(), binding))
                    .await
                    .map_err(GatewayError::from)
            }
            result => result.map_err(GatewayError::from),
        }
    }

    async fn within_deadline<T>(
        &self,
        operation: &'static str,
        deadline: Option<Instant>,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let deadline = deadline.unwrap_or_else(|| Instant::now() + self.config.request_timeout());
        // timeout_at polls the work once before looking at the clock
        if deadline <= Instant::now() {
            warn!(operation, "deadline already passed");
            return Err(GatewayError::DeadlineExceeded(operation.to_string()));
        }
        match timeout_at(deadline, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, "deadline exceeded");
                Err(GatewayError::DeadlineExceeded(operation.to_string()))
            }
        }
    }

    fn limit(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            Some(0) => Err(GatewayError::InvalidRequest(
                "limit must be at least 1".to_string(),
            )),
            Some(limit) => Ok(limit.min(self.config.list_max_results)),
            None => Ok(self.config.list_max_results),
        }
    }
}

fn parse_check(subject: &str, relation: &str, object: &str) -> Result<EngineCheck> {
    Ok(EngineCheck::new(subject.parse()?, relation.parse()?, object.parse()?))
}

fn is_stale_binding(error: &ZanzibarError) -> bool {
    matches!(
        error,
        ZanzibarError::StoreNotFound(_)
            | ZanzibarError::ModelNotInitialized { .. }
            | ZanzibarError::ModelNotFound { .. }
    )
}

fn is_type_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
