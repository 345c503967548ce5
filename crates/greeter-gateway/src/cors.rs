// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! CORS filtering in front of the gateway

use crate::error::GatewayError;
use http_body_util::Full;
use hyper::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, HeaderValue, ORIGIN, VARY};
use hyper::{Method, Request, Response, StatusCode, body::Bytes};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::debug;

/// Allowed origins, methods and request headers. Fixed once the layer is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    /// Origins allowed to call the gateway; `*` allows any origin
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: Vec<String>,
}

impl CorsPolicy {
    /// Any origin, the usual REST methods
    pub fn permissive() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![Method::GET, Method::POST, Method::DELETE, Method::PATCH, Method::PUT, Method::OPTIONS],
            allowed_headers: vec!["Accept".to_string(), "Content-Type".to_string(), "Grpc-Timeout".to_string()],
        }
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method)
    }

    fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }

    /// Value of `Access-Control-Allow-Origin` for a request, `None` when the
    /// origin is not allowed
    fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        if self.allows_any_origin() {
            return Some(HeaderValue::from_static("*"));
        }

        let origin = origin?;
        let requested = origin.to_str().ok()?;
        self.allowed_origins.iter().any(|allowed| allowed.eq_ignore_ascii_case(requested)).then(|| origin.clone())
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

struct CorsState {
    policy: CorsPolicy,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
}

impl CorsState {
    fn new(policy: CorsPolicy) -> Self {
        let methods = policy.allowed_methods.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
        let headers = policy.allowed_headers.join(", ");

        Self {
            allow_methods: HeaderValue::from_str(&methods).ok(),
            allow_headers: (!headers.is_empty()).then(|| HeaderValue::from_str(&headers).ok()).flatten(),
            policy,
        }
    }

    fn decorate(&self, response: &mut Response<Full<Bytes>>, allow_origin: Option<HeaderValue>) {
        let Some(allow_origin) = allow_origin else {
            return;
        };

        let headers = response.headers_mut();
        if allow_origin != "*" {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        if let Some(allow_methods) = &self.allow_methods {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, allow_methods.clone());
        }
    }

    fn preflight<B>(&self, request: &Request<B>, allow_origin: Option<HeaderValue>) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::OK;

        if allow_origin.is_none() {
            debug!(origin = ?request.headers().get(ORIGIN), "preflight from an origin outside the CORS policy");
            return response;
        }

        self.decorate(&mut response, allow_origin);
        if let Some(allow_headers) = &self.allow_headers {
            response.headers_mut().insert(ACCESS_CONTROL_ALLOW_HEADERS, allow_headers.clone());
        }
        response
    }

    fn method_not_allowed(&self, method: &Method, allow_origin: Option<HeaderValue>) -> Response<Full<Bytes>> {
        let mut response = Response::from(GatewayError::MethodNotAllowed {
            message: format!("method {} is not allowed", method),
        });
        if let Some(allow_methods) = &self.allow_methods {
            response.headers_mut().insert(ALLOW, allow_methods.clone());
        }
        self.decorate(&mut response, allow_origin);
        response
    }
}

/// CORS middleware.
///
/// Preflight requests are answered directly and requests with a method
/// outside the policy are rejected with 405; neither reaches the inner
/// service. Every other response gets the CORS headers added.
#[derive(Clone)]
pub struct Cors<S> {
    inner: S,
    state: Arc<CorsState>,
}

impl<S> Cors<S> {
    pub fn new(inner: S, policy: CorsPolicy) -> Self {
        Self {
            inner,
            state: Arc::new(CorsState::new(policy)),
        }
    }

    pub fn policy(&self) -> &CorsPolicy {
        &self.state.policy
    }
}

impl<S, B> Service<Request<B>> for Cors<S>
where
    S: Service<Request<B>, Response = Response<Full<Bytes>>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let allow_origin = self.state.policy.allow_origin(request.headers().get(ORIGIN));

        if request.method() == Method::OPTIONS {
            let response = self.state.preflight(&request, allow_origin);
            return Box::pin(async move { Ok(response) });
        }

        if !self.state.policy.allows_method(request.method()) {
            debug!(method = %request.method(), path = %request.uri().path(), "rejecting request outside the CORS policy");
            let response = self.state.method_not_allowed(request.method(), allow_origin);
            return Box::pin(async move { Ok(response) });
        }

        // The clone is not ready yet; keep the service that was polled
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            state.decorate(&mut response, allow_origin);
            Ok(response)
        })
    }
}

/// Wraps services in [`Cors`]
#[derive(Clone)]
pub struct CorsLayer {
    policy: CorsPolicy,
}

impl CorsLayer {
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy }
    }

    pub fn permissive() -> Self {
        Self::new(CorsPolicy::permissive())
    }
}

impl<S> Layer<S> for CorsLayer {
    type Service = Cors<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Cors::new(inner, self.policy.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    type Inner = tower::util::BoxCloneService<Request<Full<Bytes>>, Response<Full<Bytes>>, Infallible>;

    fn counting_service(calls: Arc<AtomicUsize>) -> Inner {
        tower::util::BoxCloneService::new(tower::service_fn(move |_request: Request<Full<Bytes>>| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"{\"ok\":true}")))) }
        }))
    }

    fn request(method: Method) -> Request<Full<Bytes>> {
        Request::builder().method(method).uri("/v1/example/echo").body(Full::new(Bytes::new())).unwrap()
    }

    #[test]
    fn test_permissive_policy() {
        let policy = CorsPolicy::permissive();
        assert_eq!(policy.allowed_origins, vec!["*".to_string()]);
        assert!(policy.allows_method(&Method::PATCH));
        assert!(!policy.allows_method(&Method::HEAD));
        assert_eq!(CorsState::new(policy).allow_methods.unwrap(), "GET, POST, DELETE, PATCH, PUT, OPTIONS");
    }

    #[tokio::test]
    async fn test_preflight_answered_without_forwarding() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cors = CorsLayer::permissive().layer(counting_service(calls.clone()));

        let response = cors.oneshot(request(Method::OPTIONS)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, DELETE, PATCH, PUT, OPTIONS");
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_HEADERS));
        assert!(response.into_body().collect().await.unwrap().to_bytes().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disallowed_method_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cors = CorsLayer::permissive().layer(counting_service(calls.clone()));

        let response = cors.oneshot(request(Method::HEAD)).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, POST, DELETE, PATCH, PUT, OPTIONS");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forwarded_response_gets_headers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cors = CorsLayer::permissive().layer(counting_service(calls.clone()));

        let response = cors.oneshot(request(Method::POST)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, DELETE, PATCH, PUT, OPTIONS");
        assert_eq!(response.into_body().collect().await.unwrap().to_bytes(), Bytes::from_static(b"{\"ok\":true}"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listed_origin_is_echoed() {
        let policy = CorsPolicy {
            allowed_origins: vec!["https://app.example".to_string()],
            ..CorsPolicy::permissive()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let cors = CorsLayer::new(policy).layer(counting_service(calls.clone()));

        let mut allowed = request(Method::GET);
        allowed.headers_mut().insert(ORIGIN, HeaderValue::from_static("https://app.example"));
        let response = cors.clone().oneshot(allowed).await.unwrap();
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example");
        assert_eq!(response.headers()[VARY], "Origin");

        let mut other = request(Method::GET);
        other.headers_mut().insert(ORIGIN, HeaderValue::from_static("https://evil.example"));
        let response = cors.clone().oneshot(other).await.unwrap();
        assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let mut preflight = request(Method::OPTIONS);
        preflight.headers_mut().insert(ORIGIN, HeaderValue::from_static("https://evil.example"));
        let response = cors.oneshot(preflight).await.unwrap();
        assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
