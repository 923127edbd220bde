//! Response renderers.
//!
//! A [`Renderer`] encodes response data for one media type. [`JsonRenderer`]
//! additionally reshapes error payloads so that clients always receive
//! `{"field_errors": {...}, "non_field_errors": [...]}` for 4xx and 5xx
//! responses.

use commonkit_core::{CommonkitResult, Settings};
use commonkit_http::{HttpRequest, HttpResponse, Response};
use serde_json::{json, Map, Value as Json};

/// What a renderer knows about the exchange it renders for.
#[derive(Debug, Clone, Copy, Default)]
pub struct RendererContext<'a> {
    /// The response being rendered.
    pub response: Option<&'a Response>,
    /// The request being answered.
    pub request: Option<&'a HttpRequest>,
}

impl<'a> RendererContext<'a> {
    /// Creates a context bound to `response`.
    pub const fn for_response(response: &'a Response) -> Self {
        Self {
            response: Some(response),
            request: None,
        }
    }

    /// Attaches the request.
    #[must_use]
    pub const fn with_request(mut self, request: &'a HttpRequest) -> Self {
        self.request = Some(request);
        self
    }
}

/// Encodes response data.
pub trait Renderer: Send + Sync {
    /// The media type written to `Content-Type`.
    fn media_type(&self) -> &str;

    /// The short format name (e.g. `"json"`).
    fn format(&self) -> &str;

    /// Encodes `data`.
    fn render(
        &self,
        data: &Json,
        context: Option<&RendererContext<'_>>,
    ) -> CommonkitResult<Vec<u8>>;

    /// Renders a [`Response`] into an [`HttpResponse`], keeping its status
    /// and headers.
    fn render_response(
        &self,
        response: &Response,
        request: Option<&HttpRequest>,
    ) -> CommonkitResult<HttpResponse> {
        let context = RendererContext {
            response: Some(response),
            request,
        };
        let body = self.render(&response.data, Some(&context))?;
        let mut rendered = HttpResponse::new(response.status, body, self.media_type());
        for (name, value) in &response.headers {
            rendered.headers_mut().insert(name, value.clone());
        }
        Ok(rendered)
    }
}

/// Renders JSON and reshapes error payloads.
///
/// ```
/// use commonkit_http::Response;
/// use commonkit_rest::{JsonRenderer, Renderer, RendererContext};
/// use serde_json::json;
///
/// let renderer = JsonRenderer::new();
/// let response =
///     Response::new(http::StatusCode::UNPROCESSABLE_ENTITY, json!({"name": ["required"]}));
/// let context = RendererContext::for_response(&response);
/// let body = renderer.render(&response.data, Some(&context)).unwrap();
/// let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
/// assert_eq!(body, json!({"field_errors": {"name": ["required"]}, "non_field_errors": []}));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JsonRenderer {
    reshape_errors: bool,
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self {
            reshape_errors: Settings::current().renderer.reshape_errors,
        }
    }
}

impl JsonRenderer {
    /// Creates a renderer following the `renderer.reshape_errors` setting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns error reshaping on or off.
    #[must_use]
    pub const fn reshape_errors(mut self, reshape: bool) -> Self {
        self.reshape_errors = reshape;
        self
    }

    /// Reshapes an error payload.
    ///
    /// Objects become `field_errors`, arrays become `non_field_errors`, a
    /// string becomes a single non-field error; anything else leaves both
    /// empty.
    pub fn render_errors(data: &Json) -> Json {
        let (field_errors, non_field_errors) = match data {
            Json::Object(map) => (Json::Object(map.clone()), Json::Array(Vec::new())),
            Json::Array(items) => (Json::Object(Map::new()), Json::Array(items.clone())),
            Json::String(message) => (
                Json::Object(Map::new()),
                Json::Array(vec![Json::String(message.clone())]),
            ),
            _ => (Json::Object(Map::new()), Json::Array(Vec::new())),
        };
        json!({
            "field_errors": field_errors,
            "non_field_errors": non_field_errors,
        })
    }

    /// Returns a success payload unchanged.
    pub fn render_success(data: &Json) -> Json {
        data.clone()
    }
}

impl Renderer for JsonRenderer {
    fn media_type(&self) -> &str {
        "application/json"
    }

    fn format(&self) -> &str {
        "json"
    }

    fn render(
        &self,
        data: &Json,
        context: Option<&RendererContext<'_>>,
    ) -> CommonkitResult<Vec<u8>> {
        let data = match context.and_then(|c| c.response) {
            Some(response) if self.reshape_errors && response.status.as_u16() >= 400 => {
                Self::render_errors(data)
            }
            Some(_) => Self::render_success(data),
            None => data.clone(),
        };
        if data.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::to_vec(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn render(status: StatusCode, data: Json) -> Json {
        let response = Response::new(status, data);
        let body = JsonRenderer::new()
            .render(&response.data, Some(&RendererContext::for_response(&response)))
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_success_passes_through() {
        assert_eq!(render(StatusCode::OK, json!({"key": "value"})), json!({"key": "value"}));
    }

    #[test]
    fn test_error_shapes() {
        assert_eq!(
            render(StatusCode::BAD_REQUEST, json!(["bad"])),
            json!({"field_errors": {}, "non_field_errors": ["bad"]})
        );
        assert_eq!(
            render(StatusCode::FORBIDDEN, json!("nope")),
            json!({"field_errors": {}, "non_field_errors": ["nope"]})
        );
        assert_eq!(
            render(StatusCode::INTERNAL_SERVER_ERROR, json!(3)),
            json!({"field_errors": {}, "non_field_errors": []})
        );
    }

    #[test]
    fn test_without_response_nothing_is_reshaped() {
        let body = JsonRenderer::new().render(&json!(["x"]), None).unwrap();
        assert_eq!(body, br#"["x"]"#);
    }

    #[test]
    fn test_reshaping_can_be_disabled() {
        let response = Response::new(StatusCode::BAD_REQUEST, json!({"a": ["b"]}));
        let body = JsonRenderer::new()
            .reshape_errors(false)
            .render(&response.data, Some(&RendererContext::for_response(&response)))
            .unwrap();
        assert_eq!(body, br#"{"a":["b"]}"#);
    }

    #[test]
    fn test_render_response_keeps_status_and_headers() {
        let response =
            Response::created(json!({"id": 1})).with_header(http::header::LOCATION, "/h/1/");
        let rendered = JsonRenderer::new().render_response(&response, None).unwrap();
        assert_eq!(rendered.status(), StatusCode::CREATED);
        assert_eq!(rendered.headers().get(http::header::LOCATION).unwrap(), "/h/1/");
        assert_eq!(rendered.json().unwrap(), json!({"id": 1}));

        let rendered = JsonRenderer::new().render_response(&Response::no_content(), None).unwrap();
        assert!(rendered.content().is_empty());
    }
}
