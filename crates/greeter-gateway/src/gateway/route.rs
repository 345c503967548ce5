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

//! Static HTTP route table

use super::transcoder::{MessageTranscoder, ProstJsonTranscoder};
use crate::error::{GatewayError, GatewayResult};
use hyper::Method;
use hyper::http::uri::PathAndQuery;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Binds an HTTP method and path template to one unary RPC method
#[derive(Clone)]
pub struct MethodBinding {
    http_method: Method,
    pattern: String,
    rpc_path: PathAndQuery,
    transcoder: Arc<dyn MessageTranscoder>,
}

impl MethodBinding {
    /// Bind a unary method whose messages are prost messages with serde mappings.
    ///
    /// `pattern` uses `{field}` segments for path parameters, `rpc_path` is the
    /// full gRPC path such as `/helloworld.Greeter/SayHello`.
    pub fn unary<Req, Resp>(http_method: Method, pattern: &str, rpc_path: &'static str) -> Self
    where
        Req: prost::Message + DeserializeOwned + 'static,
        Resp: prost::Message + Default + Serialize + 'static,
    {
        Self::with_transcoder(http_method, pattern, rpc_path, Arc::new(ProstJsonTranscoder::<Req, Resp>::new()))
    }

    pub fn with_transcoder(http_method: Method, pattern: &str, rpc_path: &'static str, transcoder: Arc<dyn MessageTranscoder>) -> Self {
        Self {
            http_method,
            pattern: pattern.to_string(),
            rpc_path: PathAndQuery::from_static(rpc_path),
            transcoder,
        }
    }

    pub fn http_method(&self) -> &Method {
        &self.http_method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn rpc_path(&self) -> &PathAndQuery {
        &self.rpc_path
    }

    pub fn transcoder(&self) -> &dyn MessageTranscoder {
        self.transcoder.as_ref()
    }
}

impl std::fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodBinding")
            .field("http_method", &self.http_method)
            .field("pattern", &self.pattern)
            .field("rpc_path", &self.rpc_path)
            .finish()
    }
}

/// A binding selected for a request, with its decoded path parameters
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub binding: &'a MethodBinding,
    pub path_params: Vec<(String, String)>,
}

/// Route table built once before serving and read-only afterwards
#[derive(Debug, Default)]
pub struct RouteTable {
    routers: HashMap<Method, matchit::Router<usize>>,
    bindings: Vec<MethodBinding>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding; a template overlapping an existing one for the same
    /// HTTP method is rejected
    pub fn insert(&mut self, binding: MethodBinding) -> GatewayResult<()> {
        let index = self.bindings.len();
        self.routers.entry(binding.http_method.clone()).or_insert_with(matchit::Router::new).insert(binding.pattern.clone(), index)?;

        debug!(
            http_method = %binding.http_method,
            pattern = %binding.pattern,
            rpc = %binding.rpc_path,
            "bound gateway route"
        );
        self.bindings.push(binding);
        Ok(())
    }

    /// Find the binding for a request.
    ///
    /// Returns `Ok(None)` when nothing matches; a matching path whose
    /// parameters are not valid percent-encoded UTF-8 is an error.
    pub fn at(&self, method: &Method, path: &str) -> GatewayResult<Option<RouteMatch<'_>>> {
        let Some(router) = self.routers.get(method) else {
            return Ok(None);
        };
        let Ok(matched) = router.at(path) else {
            return Ok(None);
        };

        let path_params = matched
            .params
            .iter()
            .map(|(name, raw)| {
                let value = percent_decode_str(raw).decode_utf8().map_err(|_| GatewayError::InvalidArgument {
                    message: format!("path parameter '{}' is not valid UTF-8", name),
                })?;
                Ok((name.to_string(), value.into_owned()))
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(Some(RouteMatch {
            binding: &self.bindings[*matched.value],
            path_params,
        }))
    }

    pub fn bindings(&self) -> &[MethodBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{HelloReply, HelloRequest, SAY_HELLO_PATH};

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        table.insert(MethodBinding::unary::<HelloRequest, HelloReply>(Method::POST, "/v1/example/echo", SAY_HELLO_PATH)).unwrap();
        table.insert(MethodBinding::unary::<HelloRequest, HelloReply>(Method::GET, "/v1/example/echo/{name}", SAY_HELLO_PATH)).unwrap();
        table
    }

    #[test]
    fn test_exact_match() {
        let table = table();
        let matched = table.at(&Method::POST, "/v1/example/echo").unwrap().unwrap();
        assert_eq!(matched.binding.rpc_path().path(), SAY_HELLO_PATH);
        assert!(matched.path_params.is_empty());
    }

    #[test]
    fn test_path_params_are_decoded() {
        let table = table();
        let matched = table.at(&Method::GET, "/v1/example/echo/hello%20there").unwrap().unwrap();
        assert_eq!(matched.path_params, vec![("name".to_string(), "hello there".to_string())]);
    }

    #[test]
    fn test_unmapped_routes() {
        let table = table();
        assert!(table.at(&Method::POST, "/v1/example/other").unwrap().is_none());
        assert!(table.at(&Method::PUT, "/v1/example/echo").unwrap().is_none());
        assert!(table.at(&Method::GET, "/v1/example/echo").unwrap().is_none());
    }

    #[test]
    fn test_invalid_utf8_path_param() {
        let table = table();
        assert!(matches!(table.at(&Method::GET, "/v1/example/echo/%FF"), Err(GatewayError::InvalidArgument { .. })));
    }

    #[test]
    fn test_conflicting_binding_rejected() {
        let mut table = table();
        let duplicate = MethodBinding::unary::<HelloRequest, HelloReply>(Method::POST, "/v1/example/echo", SAY_HELLO_PATH);
        assert!(matches!(table.insert(duplicate), Err(GatewayError::Router(_))));
        assert_eq!(table.len(), 2);
    }
}
