use super::endpoints::{DispatchRequest, RequestMethod};
use super::grammar::Captures;
use super::table::{Endpoint, RouteTable};
use crate::backend::Backend;
use crate::error::AppError;
use crate::relay::ResponseEnvelope;
use axum::http::Method;
use bytes::Bytes;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Strip one leading and one trailing slash
pub fn normalize_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Resolves API paths against the rule table and forwards to the backend
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("rules", &self.table.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(table: RouteTable, backend: Arc<dyn Backend>) -> Self {
        Self {
            table: Arc::new(table),
            backend,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        query: HashMap<String, String>,
        body: Bytes,
    ) -> ResponseEnvelope {
        let Some(request_method) = RequestMethod::from_http(method) else {
            debug!("No rule serves method {}", method);
            return ResponseEnvelope::not_implemented();
        };

        let path = normalize_path(path);
        let Some((rule, captures)) = self.table.resolve(path) else {
            debug!("No rule matches path: {}", path);
            return ResponseEnvelope::not_implemented();
        };

        let endpoint = rule.endpoint();
        debug!(
            rule = rule.pattern(),
            captures = captures.len(),
            "Matched {} {}",
            method,
            path
        );
        counter!("api_dispatch_total", "rule" => endpoint.name()).increment(1);

        let request = DispatchRequest {
            method: request_method,
            query,
            body,
        };

        match self.invoke(endpoint, &request, &captures).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(rule = rule.pattern(), "Dispatch failed: {}", e);
                ResponseEnvelope::StatusOnly(e.status_code())
            }
        }
    }

    async fn invoke(
        &self,
        endpoint: Endpoint,
        request: &DispatchRequest,
        captures: &Captures,
    ) -> Result<ResponseEnvelope, AppError> {
        let call = endpoint.build_call(request, captures)?;
        let operation = call.name();
        let response = self.backend.call(call).await?;
        debug!(operation, status = response.status, "Backend responded");
        Ok(ResponseEnvelope::from_backend(response))
    }
}
