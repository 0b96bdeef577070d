//! Scripted Resource Manager
//!
//! Responses are registered per method and path (case-insensitive, query
//! ignored). Each registration is queued; the last response for a route keeps
//! being returned once the queue drains. Unscripted GETs answer 404 and
//! unscripted mutations answer 200, so a test only scripts what it asserts on.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use teardown::arm::{ArmRequest, ArmResponse, Method, ProviderError, ResourceService};

struct Route {
    method: Method,
    path: String,
    responses: VecDeque<ArmResponse>,
}

#[derive(Default)]
pub struct FakeArm {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ArmRequest>>,
}

impl FakeArm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method path`
    pub fn on(&self, method: Method, path: &str, response: ArmResponse) -> &Self {
        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path.eq_ignore_ascii_case(path))
        {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    pub fn on_json(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.on(method, path, ArmResponse::new(status, body))
    }

    /// Publish provider metadata so generic deletes can resolve an API version
    pub fn with_provider(
        &self,
        subscription_id: &str,
        namespace: &str,
        type_path: &str,
        api_version: &str,
    ) -> &Self {
        self.on_json(
            Method::Get,
            &format!("/subscriptions/{}/providers/{}", subscription_id, namespace),
            200,
            json!({
                "namespace": namespace,
                "resourceTypes": [{"resourceType": type_path, "apiVersions": [api_version]}]
            }),
        )
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<ArmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, method: Method) -> Vec<ArmRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Every non-GET request
    pub fn mutations(&self) -> Vec<ArmRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.is_mutation())
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path.eq_ignore_ascii_case(path))
            .count()
    }

    /// Position of the first `method path` request, for ordering assertions
    pub fn position(&self, method: Method, path: &str) -> Option<usize> {
        self.requests()
            .iter()
            .position(|r| r.method == method && r.path.eq_ignore_ascii_case(path))
    }

    fn respond(&self, request: &ArmRequest) -> ArmResponse {
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.path.eq_ignore_ascii_case(&request.path));
        match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front().unwrap(),
            Some(route) => route.responses[0].clone(),
            None if request.method == Method::Get => crate::fixtures::not_found(),
            None => ArmResponse::new(200, Value::Null),
        }
    }
}

#[async_trait]
impl ResourceService for FakeArm {
    async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ProviderError> {
        let response = self.respond(&request);
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}
