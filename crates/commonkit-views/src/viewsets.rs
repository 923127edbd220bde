//! View-sets with per-action permissions and split input/output serializers.
//!
//! [`GenericViewSet`] resolves which permissions guard an action and which
//! serializer handles each direction. [`ModelViewSet`] adds the standard
//! create/list/retrieve/update/destroy actions on top of it and a
//! [`dispatch`](ModelViewSet::dispatch) entry point that turns every outcome,
//! errors included, into a rendered [`HttpResponse`].
//!
//! ## Permissions
//!
//! Each standard action has its own list (`permission_classes_create`,
//! `permission_classes_update`, ...), defaulting to
//! [`permission_classes`](GenericViewSet::permission_classes). `partial_update`
//! shares the `update` list. Extra actions are looked up through
//! [`permission_classes_for`](GenericViewSet::permission_classes_for) and fall
//! back to the default list when it returns `None`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use commonkit_core::logging::action_span;
use commonkit_core::{CommonkitError, CommonkitResult};
use commonkit_http::{HttpRequest, HttpResponse, Response};
use commonkit_rest::{
    Field, JsonRenderer, ListSerializer, Renderer, Scope, Serializer, SerializerClass,
    SerializerContext,
};
use http::header::LOCATION;
use http::StatusCode;
use serde_json::Value as Json;
use tracing::Instrument;

use crate::actions::Action;
use crate::permissions::{AllowAny, Permission, PermissionClass};

/// Permission and serializer resolution shared by all view-sets.
pub trait GenericViewSet: Send + Sync {
    /// The name used in log spans and error messages, e.g. `"articles"`.
    fn basename(&self) -> &str;

    /// The key objects are looked up by.
    fn lookup_field(&self) -> &str {
        "id"
    }

    // ── Permissions ─────────────────────────────────────────────────

    /// The default permission list.
    fn permission_classes(&self) -> Vec<PermissionClass> {
        vec![AllowAny::CLASS]
    }

    /// Permissions for `create`.
    fn permission_classes_create(&self) -> Vec<PermissionClass> {
        self.permission_classes()
    }

    /// Permissions for `update` and `partial_update`.
    fn permission_classes_update(&self) -> Vec<PermissionClass> {
        self.permission_classes()
    }

    /// Permissions for `destroy`.
    fn permission_classes_destroy(&self) -> Vec<PermissionClass> {
        self.permission_classes()
    }

    /// Permissions for `retrieve`.
    fn permission_classes_retrieve(&self) -> Vec<PermissionClass> {
        self.permission_classes()
    }

    /// Permissions for `list`.
    fn permission_classes_list(&self) -> Vec<PermissionClass> {
        self.permission_classes()
    }

    /// Permissions for an extra action, or `None` to use the default list.
    fn permission_classes_for(&self, _action: &str) -> Option<Vec<PermissionClass>> {
        None
    }

    /// Maps each standard action to its permission list.
    fn get_action_perms_map(&self) -> HashMap<Action, Vec<PermissionClass>> {
        let update = self.permission_classes_update();
        HashMap::from([
            (Action::Create, self.permission_classes_create()),
            (Action::PartialUpdate, update.clone()),
            (Action::Update, update),
            (Action::Destroy, self.permission_classes_destroy()),
            (Action::Retrieve, self.permission_classes_retrieve()),
            (Action::List, self.permission_classes_list()),
        ])
    }

    /// Instantiates the permissions guarding `action`.
    fn get_permissions(&self, action: &Action) -> Vec<Box<dyn Permission>> {
        let classes = self
            .get_action_perms_map()
            .remove(action)
            .or_else(|| self.permission_classes_for(action.as_str()))
            .unwrap_or_else(|| self.permission_classes());
        classes.into_iter().map(|class| class()).collect()
    }

    /// Fails with [`CommonkitError::PermissionDenied`] on the first
    /// permission that rejects the request.
    fn check_permissions(&self, request: &HttpRequest, action: &Action) -> CommonkitResult<()> {
        for permission in self.get_permissions(action) {
            if !permission.has_permission(request, action) {
                tracing::warn!(
                    basename = self.basename(),
                    action = %action,
                    user = request.user().map(|u| u.username.as_str()),
                    "permission denied"
                );
                return Err(CommonkitError::PermissionDenied(
                    permission.message().to_string(),
                ));
            }
        }
        Ok(())
    }

    // ── Serializers ─────────────────────────────────────────────────

    /// The serializer used for both directions unless overridden.
    fn serializer_class(&self) -> Option<Arc<dyn SerializerClass>> {
        None
    }

    /// The serializer that validates request data.
    fn input_serializer_class(&self) -> Option<Arc<dyn SerializerClass>> {
        None
    }

    /// The serializer that shapes response data.
    fn output_serializer_class(&self) -> Option<Arc<dyn SerializerClass>> {
        None
    }

    /// Returns [`serializer_class`](Self::serializer_class) or fails when
    /// none is configured.
    fn get_serializer_class(&self) -> CommonkitResult<Arc<dyn SerializerClass>> {
        self.serializer_class().ok_or_else(|| {
            CommonkitError::ImproperlyConfigured(format!(
                "{} should either include a serializer_class or override get_serializer_class",
                self.basename()
            ))
        })
    }

    /// The context handed to every serializer built for `request`.
    fn get_serializer_context(&self, request: &Arc<HttpRequest>) -> SerializerContext {
        SerializerContext::new()
            .with_request(Arc::clone(request))
            .with_extra("basename", Json::String(self.basename().to_string()))
    }

    /// Builds the input serializer, falling back to the shared one.
    fn get_input_serializer(&self, request: &Arc<HttpRequest>) -> CommonkitResult<Serializer> {
        let class = match self.input_serializer_class() {
            Some(class) => class,
            None => self.get_serializer_class()?,
        };
        class.build(self.get_serializer_context(request))
    }

    /// Builds the output serializer, falling back to the shared one.
    fn get_output_serializer(&self, request: &Arc<HttpRequest>) -> CommonkitResult<Serializer> {
        let class = match self.output_serializer_class() {
            Some(class) => class,
            None => self.get_serializer_class()?,
        };
        class.build(self.get_serializer_context(request))
    }

    // ── Responses ───────────────────────────────────────────────────

    /// The renderer used for every response.
    fn renderer(&self) -> Box<dyn Renderer> {
        Box::new(JsonRenderer::new())
    }

    /// Converts an error into a response.
    fn handle_exception(&self, error: &CommonkitError) -> Response {
        if error.status_code() >= 500 {
            tracing::error!(basename = self.basename(), %error, "action failed");
        }
        Response::from_error(error)
    }

    /// Renders `response` for `request`.
    fn finalize_response(&self, request: &HttpRequest, response: &Response) -> HttpResponse {
        match self.renderer().render_response(response, Some(request)) {
            Ok(rendered) => rendered,
            Err(error) => {
                tracing::error!(basename = self.basename(), %error, "rendering failed");
                HttpResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    b"Internal Server Error".to_vec(),
                    "text/plain",
                )
            }
        }
    }
}

/// The standard actions over a collection of JSON objects.
///
/// Implementors supply the collection and the destroy step; saving goes
/// through the input serializer's hooks.
#[async_trait]
pub trait ModelViewSet: GenericViewSet {
    /// Returns every object visible to `request`.
    async fn get_queryset(&self, request: &HttpRequest) -> CommonkitResult<Vec<Json>>;

    /// Finds the object whose lookup field equals `pk`.
    async fn get_object(&self, request: &HttpRequest, pk: &str) -> CommonkitResult<Json> {
        let lookup = self.lookup_field();
        self.get_queryset(request)
            .await?
            .into_iter()
            .find(|object| match object.get(lookup) {
                Some(Json::String(value)) => value == pk,
                Some(value) => value.to_string() == pk,
                None => false,
            })
            .ok_or_else(|| {
                CommonkitError::NotFound(format!("No {} matches the given query.", self.basename()))
            })
    }

    /// Saves a new object.
    async fn perform_create(&self, serializer: &mut Serializer) -> CommonkitResult<Json> {
        serializer.save()
    }

    /// Saves changes to an existing object.
    async fn perform_update(&self, serializer: &mut Serializer) -> CommonkitResult<Json> {
        serializer.save()
    }

    /// Deletes an object.
    async fn perform_destroy(&self, instance: Json) -> CommonkitResult<()>;

    /// Handles an extra action. The default rejects every name.
    async fn custom_action(
        &self,
        _request: Arc<HttpRequest>,
        name: &str,
        _pk: Option<&str>,
    ) -> CommonkitResult<Response> {
        Err(CommonkitError::MethodNotAllowed(format!(
            "{} has no action named {name}",
            self.basename()
        )))
    }

    /// Validates with the input serializer and answers with the output one.
    ///
    /// Responds `201 Created`, with a `Location` header when the output has
    /// a `url` key.
    async fn create(&self, request: Arc<HttpRequest>) -> CommonkitResult<Response> {
        let mut input = self
            .get_input_serializer(&request)?
            .with_data(request.data().clone())
            .with_files(request.files().clone());
        input.validate_or_raise()?;
        let instance = self.perform_create(&mut input).await?;

        let data = self.get_output_serializer(&request)?.represent(&instance)?;
        let location = data.get("url").and_then(Json::as_str).map(str::to_string);
        let response = Response::created(data);
        Ok(match location {
            Some(url) => response.with_header(LOCATION, &url),
            None => response,
        })
    }

    /// Represents every object in the queryset.
    async fn list(&self, request: Arc<HttpRequest>) -> CommonkitResult<Response> {
        let objects = self.get_queryset(&request).await?;
        let output = self.get_output_serializer(&request)?;
        let context = output.context().clone();
        let many = ListSerializer::new(output);
        let data = many.to_representation(&Json::Array(objects), &Scope::root(&context))?;
        Ok(Response::ok(data))
    }

    /// Represents a single object.
    async fn retrieve(&self, request: Arc<HttpRequest>, pk: &str) -> CommonkitResult<Response> {
        let instance = self.get_object(&request, pk).await?;
        let data = self.get_output_serializer(&request)?.represent(&instance)?;
        Ok(Response::ok(data))
    }

    /// Validates changes with the input serializer and answers with the
    /// output one.
    async fn update(
        &self,
        request: Arc<HttpRequest>,
        pk: &str,
        partial: bool,
    ) -> CommonkitResult<Response> {
        let instance = self.get_object(&request, pk).await?;
        let mut input = self
            .get_input_serializer(&request)?
            .with_instance(instance)
            .with_data(request.data().clone())
            .with_files(request.files().clone())
            .partial(partial);
        input.validate_or_raise()?;
        let saved = self.perform_update(&mut input).await?;

        let data = self.get_output_serializer(&request)?.represent(&saved)?;
        Ok(Response::ok(data))
    }

    /// [`update`](Self::update) with only the submitted fields.
    async fn partial_update(
        &self,
        request: Arc<HttpRequest>,
        pk: &str,
    ) -> CommonkitResult<Response> {
        self.update(request, pk, true).await
    }

    /// Deletes an object and responds `204 No Content`.
    async fn destroy(&self, request: Arc<HttpRequest>, pk: &str) -> CommonkitResult<Response> {
        let instance = self.get_object(&request, pk).await?;
        self.perform_destroy(instance).await?;
        Ok(Response::no_content())
    }

    /// Checks permissions, runs `action` and renders the outcome.
    async fn dispatch(
        &self,
        request: HttpRequest,
        action: Action,
        pk: Option<String>,
    ) -> HttpResponse {
        let span = action_span(self.basename(), action.as_str());
        let request = Arc::new(request);

        let result = async {
            self.check_permissions(&request, &action)?;
            let request = Arc::clone(&request);
            match &action {
                Action::Create => self.create(request).await,
                Action::List => self.list(request).await,
                Action::Retrieve => {
                    self.retrieve(request, require_pk(&action, pk.as_deref())?)
                        .await
                }
                Action::Update => {
                    self.update(request, require_pk(&action, pk.as_deref())?, false)
                        .await
                }
                Action::PartialUpdate => {
                    self.partial_update(request, require_pk(&action, pk.as_deref())?)
                        .await
                }
                Action::Destroy => self.destroy(request, require_pk(&action, pk.as_deref())?).await,
                Action::Custom(name) => self.custom_action(request, name, pk.as_deref()).await,
            }
        }
        .instrument(span)
        .await;

        let response = result.unwrap_or_else(|error| self.handle_exception(&error));
        self.finalize_response(&request, &response)
    }

    /// Derives the action from the request method and dispatches it.
    async fn handle(&self, request: HttpRequest, pk: Option<String>) -> HttpResponse {
        match Action::from_method(request.method(), pk.is_some()) {
            Some(action) => self.dispatch(request, action, pk).await,
            None => {
                let error = CommonkitError::MethodNotAllowed(format!(
                    "Method \"{}\" not allowed.",
                    request.method()
                ));
                self.finalize_response(&request, &self.handle_exception(&error))
            }
        }
    }
}

fn require_pk<'a>(action: &Action, pk: Option<&'a str>) -> CommonkitResult<&'a str> {
    pk.ok_or_else(|| CommonkitError::BadRequest(format!("{action} requires a primary key")))
}
