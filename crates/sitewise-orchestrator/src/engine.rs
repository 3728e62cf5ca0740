//! Orchestration engine
//!
//! [`Orchestrator::handle`] answers special queries directly, then walks the
//! strategy chain. The deterministic [`Pipeline`] behind the last strategy
//! runs availability check, routing, lifecycle commands, project resolution
//! (with duplicate detection for new sites), validation, defaults,
//! capability invocation, persistence, and reply formatting, recording one
//! trace step per phase.

use serde_json::{json, Map, Value};
use sitewise_core::config::{CapabilityConfig, SitewiseConfig};
use sitewise_core::error::{Result, SitewiseError};
use sitewise_core::models::{
    Artifact, CapabilityRequest, CapabilityResponse, Coordinates, DuplicateMatch, Intent, IntentType,
    OrchestratorRequest, OrchestratorResponse, ProjectRecord, ProjectUpdate, RequestContext,
    SessionContext,
};
use sitewise_core::naming::{normalize_project_name, validate_project_name};
use sitewise_core::retry::RetryPolicy;
use sitewise_intent::{
    IntentRegistry, IntentRouter, ParameterValidator, ProjectResolver, ResolutionConfidence,
    RoutedIntent,
};
use sitewise_invoke::{
    invoke_with_retry, CapabilityInvoker, Geocoder, HttpAgent, HttpCapabilityInvoker,
    IntelligentAgent, NominatimGeocoder,
};
use sitewise_store::{FileObjectStore, ObjectSessionBackend, ObjectStore, ProjectStore, SessionContextStore};
use std::sync::Arc;
use std::time::Duration;

use crate::commands::{classify_special, parse_lifecycle, wants_new_site, DeleteTarget, LifecycleCommand, SpecialQuery};
use crate::guidance::Guidance;
use crate::lifecycle::{duplicate_prompt, DuplicateChoiceOutcome, ProjectLifecycleManager};
use crate::naming::ProjectNameGenerator;
use crate::reply::{
    analysis_artifact, completion_message, dispatched_message, project_details_message, project_list_message,
};
use crate::strategy::{AgentStrategy, DirectInvocationStrategy, Strategy, StrategyOutcome};
use crate::trace::TraceRecorder;

/// Per-request timeout for synchronous capability calls
const CAPABILITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Below this routed confidence the engine asks instead of acting
const MIN_ACTION_CONFIDENCE: u8 = 50;

/// Collaborators injected into the engine
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub store: Arc<ProjectStore>,
    pub sessions: Arc<SessionContextStore>,
    pub invoker: Arc<dyn CapabilityInvoker>,
    pub agent: Option<Arc<dyn IntelligentAgent>>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
}

/// What was known when a request failed, for internal error logs
#[derive(Debug, Default)]
struct ErrorContext {
    intent: Option<IntentType>,
    params: Map<String, Value>,
    project: Option<String>,
    has_session: bool,
}

fn render_error(err: SitewiseError, context: &ErrorContext) -> OrchestratorResponse {
    if err.is_user_facing() {
        tracing::info!(code = err.code(), error = %err, "Request ended with guidance");
    } else {
        tracing::error!(
            error = %err,
            intent = ?context.intent,
            params = %serde_json::Value::Object(context.params.clone()),
            has_project = context.project.is_some(),
            has_session = context.has_session,
            "Orchestration failed"
        );
    }

    let mut response = Guidance::for_error(&err).into_response(&err);
    response.metadata.intent = context.intent.map(|k| k.as_str().to_string());
    response.metadata.project_name = context.project.clone();
    response
}

fn json_artifact<T: serde::Serialize>(artifact_type: &str, value: &T) -> Result<Artifact> {
    Ok(Artifact::new(artifact_type, serde_json::to_value(value)?))
}

/// Query coordinates locate a new project; a stored location is never moved
fn locate(update: ProjectUpdate, intent: &Intent, project: Option<&ProjectRecord>) -> ProjectUpdate {
    match (intent.coordinates(), project.and_then(|p| p.coordinates)) {
        (Some(coordinates), None) => update.coordinates(coordinates),
        _ => update,
    }
}

fn with_project(mut response: OrchestratorResponse, record: &ProjectRecord) -> OrchestratorResponse {
    response.metadata.project_id = Some(record.project_id.clone());
    response.metadata.project_name = Some(record.project_name.clone());
    response.metadata.project_status = Some(record.status);
    response
}

/// Deterministic route, resolve, validate, invoke, persist, reply pipeline
pub struct Pipeline {
    store: Arc<ProjectStore>,
    sessions: Arc<SessionContextStore>,
    invoker: Arc<dyn CapabilityInvoker>,
    lifecycle: Arc<ProjectLifecycleManager>,
    names: ProjectNameGenerator,
    router: IntentRouter,
    resolver: ProjectResolver,
    validator: ParameterValidator,
    capabilities: CapabilityConfig,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(config: &SitewiseConfig, deps: &OrchestratorDeps, lifecycle: Arc<ProjectLifecycleManager>) -> Self {
        Self {
            store: deps.store.clone(),
            sessions: deps.sessions.clone(),
            invoker: deps.invoker.clone(),
            lifecycle,
            names: ProjectNameGenerator::new(deps.store.clone(), deps.geocoder.clone()),
            router: IntentRouter::new(Arc::new(IntentRegistry::standard()), config.capabilities.clone()),
            resolver: ProjectResolver::new(config.resolution.fuzzy_similarity_threshold),
            validator: ParameterValidator::new(),
            capabilities: config.capabilities.clone(),
            retry: config.retry,
        }
    }

    /// Run the pipeline; failures become guidance responses
    pub async fn respond(&self, request: &OrchestratorRequest, trace: &mut TraceRecorder) -> OrchestratorResponse {
        let mut context = ErrorContext { has_session: request.session_id.is_some(), ..Default::default() };
        match self.run(request, trace, &mut context).await {
            Ok(response) => response,
            Err(err) => render_error(err, &context),
        }
    }

    async fn run(
        &self,
        request: &OrchestratorRequest,
        trace: &mut TraceRecorder,
        context: &mut ErrorContext,
    ) -> Result<OrchestratorResponse> {
        let query = request.query.trim();
        let session_id = request.session_id.as_deref();

        self.check_deployment(trace)?;

        trace.begin();
        let RoutedIntent { intent, requires_confirmation, confirmation_message, alternatives, .. } =
            self.router.route(query);
        context.intent = Some(intent.kind);
        context.params = intent.params.clone();
        trace.complete(
            "Classify intent",
            "Pattern scoring over the intent registry",
            format!("{} ({}%)", intent.kind, intent.confidence),
        );

        if requires_confirmation && intent.confidence < MIN_ACTION_CONFIDENCE && !request.context.skip_confirmation {
            let question = confirmation_message
                .unwrap_or_else(|| format!("Did you mean {}?", intent.kind.label()));
            let mut response = OrchestratorResponse::success(question)
                .with_artifact(Artifact::new("intent_confirmation", json!({
                    "intent": intent.kind,
                    "confidence": intent.confidence,
                    "alternatives": alternatives,
                })))
                .awaiting_confirmation();
            response.metadata.intent = Some(intent.kind.as_str().to_string());
            return Ok(response);
        }
        let notice = if requires_confirmation { confirmation_message } else { None };

        let session = match session_id {
            Some(id) => Some(self.sessions.get(id).await?),
            None => None,
        };

        if intent.kind.is_lifecycle() {
            return self.run_lifecycle(&intent, request, session.as_ref(), trace, context).await;
        }

        let target = match self.resolve_target(&intent, request, session.as_ref(), trace).await? {
            Resolved::Target(target) => target,
            Resolved::NearbyProjects { coordinates, duplicates } => {
                return self.suspend_for_duplicates(&intent, request, coordinates, duplicates, trace).await;
            }
        };
        context.project = target.name.clone();
        if let (Some(session_id), Some(record)) = (session_id, target.record.as_ref()) {
            self.sessions.set_active_project(session_id, &record.project_name).await?;
        }

        trace.begin();
        let validation = self.validator.validate(&intent, target.record.as_ref());
        if !validation.is_valid {
            let err = self.validator.to_error(&validation, target.name.as_deref());
            trace.error("Validate parameters", "Required parameters and value constraints", err.to_string());
            return Err(err);
        }
        let validation_summary = if validation.warnings.is_empty() {
            "valid".to_string()
        } else {
            validation.warnings.join("; ")
        };
        trace.complete("Validate parameters", "Required parameters and value constraints", validation_summary);

        let intent = self.validator.apply_defaults(&intent, target.record.as_ref());
        context.params = intent.params.clone();

        let project_name = target.name.ok_or_else(|| {
            SitewiseError::InvalidParameters(vec![
                "name a project or give coordinates, e.g. \"analyze terrain at 35.067482, -101.395466\"".to_string(),
            ])
        })?;

        self.invoke_and_persist(&intent, &project_name, target.record.as_ref(), request, notice, trace)
            .await
    }

    fn check_deployment(&self, trace: &mut TraceRecorder) -> Result<()> {
        trace.begin();
        let missing = self.capabilities.missing_required();
        if missing.is_empty() {
            trace.complete("Check deployment", "Required capabilities must be configured", "ready");
            return Ok(());
        }

        let variables: Vec<&str> = missing.iter().map(|c| c.env_var()).collect();
        let err = SitewiseError::DeploymentIssue {
            missing: missing.iter().map(|c| c.as_str().to_string()).collect(),
            remediation: format!("Set {} and restart the service.", variables.join(", ")),
        };
        trace.error("Check deployment", "Required capabilities must be configured", err.to_string());
        Err(err)
    }

    /// Project the query targets, or the projects near a new site
    async fn resolve_target(
        &self,
        intent: &Intent,
        request: &OrchestratorRequest,
        session: Option<&SessionContext>,
        trace: &mut TraceRecorder,
    ) -> Result<Resolved> {
        trace.begin();
        let query = request.query.trim();
        let coordinates = intent.coordinates();

        if let Some(name) = &request.context.project_name {
            let name = normalize_project_name(name);
            let record = self.store.load(&name).await?;
            if record.is_none() {
                if coordinates.is_none() {
                    trace.error("Resolve project", "Project named by the caller", "not found");
                    return Err(SitewiseError::ProjectNotFound { name });
                }
                validate_project_name(&name)?;
            }
            trace.complete("Resolve project", "Project named by the caller", name.as_str());
            return Ok(Resolved::Target(Target { name: Some(name), record }));
        }

        let names = self.store.list_names().await?;
        let resolution = self.resolver.resolve(query, session, &names);
        if resolution.is_ambiguous {
            trace.error("Resolve project", "Several projects match the reference", resolution.matches.join(", "));
            return Err(SitewiseError::AmbiguousReference {
                reference: query.to_string(),
                candidates: resolution.matches,
            });
        }

        let weak = matches!(resolution.confidence, ResolutionConfidence::Active | ResolutionConfidence::None);
        match (coordinates, resolution.project_name) {
            (Some(coordinates), _) if weak => {
                let skip = request.context.skip_duplicate_check || wants_new_site(query);
                if skip {
                    trace.skip("Detect duplicates", "New analysis requested");
                } else {
                    let duplicates = self.lifecycle.detect_duplicates(&coordinates, None).await?;
                    if !duplicates.is_empty() {
                        trace.complete(
                            "Detect duplicates",
                            "Existing projects near the requested site",
                            format!("{} nearby", duplicates.len()),
                        );
                        return Ok(Resolved::NearbyProjects { coordinates, duplicates });
                    }
                }

                let name = self.names.generate(query, Some(&coordinates)).await?;
                trace.complete("Resolve project", "New site from coordinates", name.as_str());
                Ok(Resolved::Target(Target { name: Some(name), record: None }))
            }
            (_, Some(name)) => {
                let record = self
                    .store
                    .load(&name)
                    .await?
                    .ok_or_else(|| SitewiseError::ProjectNotFound { name: name.clone() })?;
                trace.complete(
                    "Resolve project",
                    "Reference matched a stored project",
                    format!("{} ({:?})", name, resolution.confidence),
                );
                Ok(Resolved::Target(Target { name: Some(name), record: Some(record) }))
            }
            (_, None) => {
                trace.skip("Resolve project", "No project referenced");
                Ok(Resolved::Target(Target { name: None, record: None }))
            }
        }
    }

    async fn suspend_for_duplicates(
        &self,
        intent: &Intent,
        request: &OrchestratorRequest,
        coordinates: Coordinates,
        duplicates: Vec<DuplicateMatch>,
        trace: &mut TraceRecorder,
    ) -> Result<OrchestratorResponse> {
        trace.begin();
        let prompt = match request.session_id.as_deref() {
            Some(session_id) => {
                self.lifecycle
                    .suspend_for_duplicates(session_id, request.query.trim(), coordinates, duplicates.clone())
                    .await?
            }
            None => duplicate_prompt(&duplicates),
        };
        trace.complete("Suspend for duplicate choice", "Waiting for the user to pick 1, 2 or 3", "prompted");

        let mut response = OrchestratorResponse::success(prompt)
            .with_artifact(Artifact::new("duplicate_detection", json!({
                "coordinates": coordinates,
                "radiusKm": self.lifecycle.duplicate_radius_km(),
                "candidates": duplicates,
            })))
            .awaiting_confirmation();
        response.metadata.intent = Some(intent.kind.as_str().to_string());
        Ok(response)
    }

    async fn invoke_and_persist(
        &self,
        intent: &Intent,
        project_name: &str,
        project: Option<&ProjectRecord>,
        request: &OrchestratorRequest,
        notice: Option<String>,
        trace: &mut TraceRecorder,
    ) -> Result<OrchestratorResponse> {
        let session_id = request.session_id.as_deref();
        let capability = intent.kind.capability().ok_or_else(|| {
            SitewiseError::InvalidParameters(vec![format!("{} has no analysis capability", intent.kind.label())])
        })?;
        let function = self.capabilities.function_for(capability).ok_or_else(|| SitewiseError::DeploymentIssue {
            missing: vec![capability.as_str().to_string()],
            remediation: format!("Set {} and restart the service.", capability.env_var()),
        })?;

        let mut parameters = intent.params.clone();
        parameters.insert("project_name".to_string(), Value::from(project_name));
        let mut payload = CapabilityRequest {
            parameters,
            project_context: project.map(serde_json::to_value).transpose()?,
        };

        if let (true, Some(session_id), Some(user_id)) =
            (self.capabilities.async_delivery, session_id, request.user_id.as_deref())
        {
            payload.parameters.insert("session_id".to_string(), Value::from(session_id));
            payload.parameters.insert("user_id".to_string(), Value::from(user_id));
            return self
                .dispatch(intent, function, project_name, &payload, session_id, trace)
                .await;
        }

        trace.begin();
        let reply = match invoke_with_retry(self.invoker.as_ref(), &self.retry, function, &payload)
            .await
            .and_then(|reply| ensure_success(function, reply))
        {
            Ok(reply) => reply,
            Err(err) => {
                trace.error("Invoke capability", function, err.to_string());
                if project.is_some() {
                    self.record_failure(project_name, &err).await;
                }
                return Err(err);
            }
        };
        trace.complete("Invoke capability", function, reply.result_type.as_str());

        trace.begin();
        let update = locate(ProjectUpdate::new(), intent, project);
        let update = match intent.kind.stage() {
            Some(stage) => update.stage_result(stage, reply.data.clone()),
            None => copy_metrics(update, &reply.data),
        };
        let record = self.store.save(project_name, update).await?;
        if let Some(session_id) = session_id {
            self.sessions.set_active_project(session_id, &record.project_name).await?;
        }
        trace.complete(
            "Persist results",
            "Merge-save into the project record",
            format!("{}% complete", record.completion_percentage()),
        );

        let mut message = completion_message(intent.kind, &record);
        if let Some(notice) = notice {
            message = format!("{}\n\n{}", notice, message);
        }
        let mut response = with_project(
            OrchestratorResponse::success(message).with_artifact(analysis_artifact(intent.kind, &reply, &record)),
            &record,
        );
        response.metadata.tools_used = vec![function.to_string()];
        response.metadata.intent = Some(intent.kind.as_str().to_string());

        tracing::info!(
            project = %record.project_name,
            intent = %intent.kind,
            function,
            status = %record.status,
            "Analysis complete"
        );
        Ok(response)
    }

    /// Fire-and-forget invocation; the project records the running operation
    async fn dispatch(
        &self,
        intent: &Intent,
        function: &str,
        project_name: &str,
        payload: &CapabilityRequest,
        session_id: &str,
        trace: &mut TraceRecorder,
    ) -> Result<OrchestratorResponse> {
        trace.begin();
        let mut update = ProjectUpdate::new().active_operation(Some(intent.kind.as_str().to_string()));
        // project_context is the stored record; its location is kept
        let located = payload.project_context.as_ref().is_some_and(|p| !p["coordinates"].is_null());
        if let (false, Some(coordinates)) = (located, intent.coordinates()) {
            update = update.coordinates(coordinates);
        }
        let record = self.store.save(project_name, update).await?;

        if let Err(err) = self.invoker.invoke_async(function, payload).await {
            trace.error("Dispatch capability", function, err.to_string());
            self.record_failure(project_name, &err).await;
            return Err(err);
        }
        self.sessions.set_active_project(session_id, project_name).await?;
        trace.complete("Dispatch capability", function, "dispatched");

        let mut response =
            with_project(OrchestratorResponse::success(dispatched_message(intent.kind, project_name)), &record);
        response.metadata.tools_used = vec![function.to_string()];
        response.metadata.intent = Some(intent.kind.as_str().to_string());
        Ok(response)
    }

    async fn record_failure(&self, project_name: &str, err: &SitewiseError) {
        if let Err(save_err) = self.store.save(project_name, ProjectUpdate::new().failed(err.to_string())).await {
            tracing::warn!(project = project_name, error = %save_err, "Could not record analysis failure");
        }
    }

    async fn run_lifecycle(
        &self,
        intent: &Intent,
        request: &OrchestratorRequest,
        session: Option<&SessionContext>,
        trace: &mut TraceRecorder,
        context: &mut ErrorContext,
    ) -> Result<OrchestratorResponse> {
        let query = request.query.trim();
        let session_id = request.session_id.as_deref();
        let confirmed = request.context.skip_confirmation;

        let resolved = match &request.context.project_name {
            Some(name) => Some(normalize_project_name(name)),
            None => {
                let names = self.store.list_names().await?;
                self.resolver.resolve(query, session, &names).project_name
            }
        };

        trace.begin();
        let command = parse_lifecycle(intent.kind, query, resolved.as_deref())?;
        let action = format!("{:?}", command);
        let outcome = self.execute(command, confirmed, session_id, context).await;
        match &outcome {
            Ok(_) => trace.complete("Manage projects", &action, "done"),
            Err(err) => trace.error("Manage projects", &action, err.to_string()),
        }

        let mut response = outcome?;
        response.metadata.intent = Some(intent.kind.as_str().to_string());
        Ok(response)
    }

    async fn execute(
        &self,
        command: LifecycleCommand,
        confirmed: bool,
        session_id: Option<&str>,
        context: &mut ErrorContext,
    ) -> Result<OrchestratorResponse> {
        let lifecycle = &self.lifecycle;
        match command {
            LifecycleCommand::Delete(DeleteTarget::Project(name)) => {
                context.project = Some(name.clone());
                lifecycle.delete_project(&name, confirmed, session_id).await?;
                let mut response = OrchestratorResponse::success(format!("Deleted project '{}'.", name));
                response.metadata.project_name = Some(name);
                Ok(response)
            }
            LifecycleCommand::Delete(DeleteTarget::Matching(pattern)) => {
                let outcome = lifecycle.bulk_delete(&pattern, confirmed, session_id).await?;
                let mut message = format!("Deleted {} project(s) matching '{}'.", outcome.deleted.len(), pattern);
                for (name, reason) in &outcome.failed {
                    message.push_str(&format!("\n  Could not delete {}: {}", name, reason));
                }
                let mut response = OrchestratorResponse::success(message)
                    .with_artifact(json_artifact("bulk_delete_result", &outcome)?);
                response.success = outcome.failed.is_empty();
                Ok(response)
            }
            LifecycleCommand::Rename { from, to } => {
                context.project = Some(from.clone());
                let record = lifecycle.rename_project(&from, &to, confirmed, session_id).await?;
                let message = format!("Renamed project '{}' to '{}'.", from, record.project_name);
                Ok(with_project(OrchestratorResponse::success(message), &record))
            }
            LifecycleCommand::Merge { first, second, keep } => {
                let record = lifecycle
                    .merge_projects(&first, &second, keep.as_deref(), confirmed, session_id)
                    .await?;
                let removed = if record.project_name == first { &second } else { &first };
                let message = format!(
                    "Merged '{}' into '{}'. Project progress: {}%.",
                    removed,
                    record.project_name,
                    record.completion_percentage()
                );
                Ok(with_project(OrchestratorResponse::success(message), &record))
            }
            LifecycleCommand::Archive { name } => {
                context.project = Some(name.clone());
                let record = lifecycle.archive_project(&name, session_id).await?;
                let message = format!("Archived project '{}'. It no longer appears in your project list.", name);
                Ok(with_project(OrchestratorResponse::success(message), &record))
            }
            LifecycleCommand::Unarchive { name } => {
                context.project = Some(name.clone());
                let record = lifecycle.unarchive_project(&name).await?;
                Ok(with_project(
                    OrchestratorResponse::success(format!("Restored project '{}'.", name)),
                    &record,
                ))
            }
            LifecycleCommand::Export { name } => {
                context.project = Some(name.clone());
                let export = lifecycle.export_project(&name).await?;
                let message = format!(
                    "Exported project '{}' (format {}, {} artifact reference(s)).",
                    name,
                    export.version,
                    export.artifact_references.len()
                );
                Ok(with_project(
                    OrchestratorResponse::success(message).with_artifact(json_artifact("project_export", &export)?),
                    &export.project,
                ))
            }
            LifecycleCommand::Search(filters) => {
                let results = lifecycle.search_projects(&filters).await?;
                Ok(OrchestratorResponse::success(project_list_message("Matching projects", &results))
                    .with_artifact(json_artifact("project_list", &results)?))
            }
            LifecycleCommand::Dashboard => dashboard_response(lifecycle, session_id).await,
        }
    }
}

/// Resolved target of an analysis request
struct Target {
    name: Option<String>,
    record: Option<ProjectRecord>,
}

enum Resolved {
    Target(Target),
    /// New site with existing projects inside the duplicate radius
    NearbyProjects { coordinates: Coordinates, duplicates: Vec<DuplicateMatch> },
}

fn ensure_success(function: &str, reply: CapabilityResponse) -> Result<CapabilityResponse> {
    if reply.success {
        return Ok(reply);
    }
    Err(SitewiseError::CapabilityFailed {
        function: function.to_string(),
        reason: reply.error.unwrap_or_else(|| "capability reported failure".to_string()),
        transient: false,
    })
}

fn copy_metrics(mut update: ProjectUpdate, data: &Value) -> ProjectUpdate {
    if let Some(metrics) = data.get("metrics").and_then(Value::as_object) {
        for (key, value) in metrics {
            if let Some(number) = value.as_f64() {
                update = update.metric(key.clone(), number);
            }
        }
    }
    update
}

async fn dashboard_response(
    lifecycle: &ProjectLifecycleManager,
    session_id: Option<&str>,
) -> Result<OrchestratorResponse> {
    let dashboard = lifecycle.dashboard(session_id).await?;
    let totals = &dashboard.totals;
    let mut message = format!(
        "{} project(s): {} completed, {} in progress, {} archived.",
        totals.projects, totals.completed, totals.in_progress, totals.archived
    );
    if totals.duplicate_groups > 0 {
        message.push_str(&format!(
            " {} group(s) of projects sit close together.",
            totals.duplicate_groups
        ));
    }
    if let Some(active) = &dashboard.active_project {
        message.push_str(&format!("\nActive project: {}", active));
    }
    Ok(OrchestratorResponse::success(message).with_artifact(json_artifact("project_dashboard", &dashboard)?))
}

/// Entry point for conversational requests
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    lifecycle: Arc<ProjectLifecycleManager>,
    store: Arc<ProjectStore>,
    sessions: Arc<SessionContextStore>,
    capabilities: CapabilityConfig,
    strategies: Vec<Box<dyn Strategy>>,
}

impl Orchestrator {
    pub fn new(config: &SitewiseConfig, deps: OrchestratorDeps) -> Self {
        let lifecycle = Arc::new(ProjectLifecycleManager::new(
            deps.store.clone(),
            deps.sessions.clone(),
            config.resolution.duplicate_radius_km,
        ));
        let pipeline = Arc::new(Pipeline::new(config, &deps, lifecycle.clone()));

        let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
        if let Some(agent) = deps.agent.clone() {
            strategies.push(Box::new(AgentStrategy::new(agent)));
        }
        strategies.push(Box::new(DirectInvocationStrategy::new(pipeline.clone())));

        Self {
            pipeline,
            lifecycle,
            store: deps.store,
            sessions: deps.sessions,
            capabilities: config.capabilities.clone(),
            strategies,
        }
    }

    /// Filesystem stores plus HTTP capability, agent and geocoder adapters
    pub fn from_config(config: &SitewiseConfig) -> Result<Self> {
        let objects: Arc<dyn ObjectStore> = Arc::new(FileObjectStore::new(config.store_root.clone()));
        let store = Arc::new(ProjectStore::new(objects.clone(), config.cache, config.retry));
        let sessions = Arc::new(SessionContextStore::new(
            Arc::new(ObjectSessionBackend::new(objects)),
            config.cache,
        )?);

        let invoker: Arc<dyn CapabilityInvoker> =
            Arc::new(HttpCapabilityInvoker::new(config.capabilities.endpoint.clone(), CAPABILITY_TIMEOUT));
        let agent = config.agent.endpoint.as_ref().map(|endpoint| {
            Arc::new(HttpAgent::new(endpoint.clone(), config.agent.timeout)) as Arc<dyn IntelligentAgent>
        });
        let geocoder = config
            .geocoder_endpoint
            .as_ref()
            .map(|endpoint| Arc::new(NominatimGeocoder::new(endpoint.clone())) as Arc<dyn Geocoder>);

        tracing::info!(
            store_root = %config.store_root.display(),
            endpoint = %config.capabilities.endpoint,
            agent = agent.is_some(),
            geocoder = geocoder.is_some(),
            "Orchestrator configured"
        );

        Ok(Self::new(config, OrchestratorDeps { store, sessions, invoker, agent, geocoder }))
    }

    pub fn lifecycle(&self) -> &Arc<ProjectLifecycleManager> {
        &self.lifecycle
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionContextStore> {
        &self.sessions
    }

    pub fn capabilities(&self) -> &CapabilityConfig {
        &self.capabilities
    }

    /// Names of the strategies tried, in order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn handle(&self, request: OrchestratorRequest) -> OrchestratorResponse {
        let mut trace = TraceRecorder::new();
        tracing::info!(
            query = %request.query,
            session_id = ?request.session_id,
            "Handling query"
        );

        let mut response = if request.query.trim().is_empty() {
            let err = SitewiseError::InvalidParameters(vec!["the query is empty".to_string()]);
            render_error(err, &ErrorContext::default())
        } else {
            match self.special(&request, &mut trace).await {
                Some(response) => response,
                None => self.run_strategies(&request, &mut trace).await,
            }
        };

        response.metadata.execution_time_ms = trace.elapsed_ms();
        response.thought_steps = trace.into_steps();
        tracing::info!(
            success = response.success,
            execution_time_ms = response.metadata.execution_time_ms,
            "Query handled"
        );
        response
    }

    async fn run_strategies(&self, request: &OrchestratorRequest, trace: &mut TraceRecorder) -> OrchestratorResponse {
        let mut last_reason = None;
        for strategy in &self.strategies {
            match strategy.attempt(request, trace).await {
                StrategyOutcome::Complete(mut response) => {
                    if last_reason.is_some() {
                        response.metadata.fallback_used = Some(strategy.name().to_string());
                    }
                    return response;
                }
                StrategyOutcome::FallThrough { transient, reason } => {
                    tracing::info!(strategy = strategy.name(), transient, %reason, "Strategy fell through");
                    last_reason = Some(reason);
                }
            }
        }

        let reason = last_reason.unwrap_or_else(|| "no strategy configured".to_string());
        render_error(SitewiseError::AgentUnavailable { reason }, &ErrorContext::default())
    }

    /// Dashboard, list, details and duplicate-choice replies skip the strategy chain
    async fn special(&self, request: &OrchestratorRequest, trace: &mut TraceRecorder) -> Option<OrchestratorResponse> {
        let special = classify_special(request.query.trim())?;
        let session_id = request.session_id.as_deref();
        let context = ErrorContext { has_session: session_id.is_some(), ..Default::default() };

        if let SpecialQuery::DuplicateChoice(choice) = special {
            return self.duplicate_choice(request, session_id?, choice, trace).await;
        }

        trace.begin();
        let outcome = match &special {
            SpecialQuery::Dashboard => dashboard_response(&self.lifecycle, session_id).await,
            SpecialQuery::ListProjects => self.list_response().await,
            SpecialQuery::ProjectDetails { name } => self.details_response(name, session_id).await,
            SpecialQuery::DuplicateChoice(_) => return None,
        };
        let action = format!("{:?}", special);
        Some(match outcome {
            Ok(response) => {
                trace.complete("Answer directly", &action, "answered");
                response
            }
            Err(err) => {
                trace.error("Answer directly", &action, err.to_string());
                render_error(err, &context)
            }
        })
    }

    async fn list_response(&self) -> Result<OrchestratorResponse> {
        let projects = self.lifecycle.list_projects(false).await?;
        Ok(OrchestratorResponse::success(project_list_message("Your renewable projects", &projects))
            .with_artifact(json_artifact("project_list", &projects)?))
    }

    async fn details_response(&self, name: &str, session_id: Option<&str>) -> Result<OrchestratorResponse> {
        let record = self
            .store
            .load(name)
            .await?
            .ok_or_else(|| SitewiseError::ProjectNotFound { name: name.to_string() })?;
        if let Some(session_id) = session_id {
            self.sessions.set_active_project(session_id, &record.project_name).await?;
        }
        Ok(with_project(
            OrchestratorResponse::success(project_details_message(&record))
                .with_artifact(json_artifact("project_details", &record)?),
            &record,
        ))
    }

    /// `None` when no duplicate prompt is pending for the session
    async fn duplicate_choice(
        &self,
        request: &OrchestratorRequest,
        session_id: &str,
        choice: u8,
        trace: &mut TraceRecorder,
    ) -> Option<OrchestratorResponse> {
        trace.begin();
        let outcome = match self.lifecycle.handle_duplicate_choice(session_id, choice).await {
            Ok(outcome) => outcome?,
            Err(err) => {
                trace.error("Duplicate choice", "Reply to a pending duplicate prompt", err.to_string());
                let context = ErrorContext { has_session: true, ..Default::default() };
                return Some(render_error(err, &context));
            }
        };

        let resume = |query: String, project_name: Option<String>| OrchestratorRequest {
            query,
            session_id: request.session_id.clone(),
            user_id: request.user_id.clone(),
            context: RequestContext {
                project_name,
                skip_confirmation: request.context.skip_confirmation,
                skip_duplicate_check: true,
            },
        };

        Some(match outcome {
            DuplicateChoiceOutcome::ContinueExisting { project, query } => {
                trace.complete("Duplicate choice", "Continue with the existing project", project.as_str());
                self.pipeline.respond(&resume(query, Some(project)), trace).await
            }
            DuplicateChoiceOutcome::CreateNew { query } => {
                trace.complete("Duplicate choice", "Create a new project", "new");
                self.pipeline.respond(&resume(query, None), trace).await
            }
            DuplicateChoiceOutcome::ShowDetails { candidates, prompt } => {
                trace.complete("Duplicate choice", "Show nearby project details", "details");
                let mut message = project_list_message("Nearby projects", &candidates);
                message.push_str("\n\n");
                message.push_str(&prompt);
                let artifact = Artifact::new("project_list", json!(candidates));
                OrchestratorResponse::success(message).with_artifact(artifact).awaiting_confirmation()
            }
        })
    }
}
