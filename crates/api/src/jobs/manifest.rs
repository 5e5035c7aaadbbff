//! Function registration document sent to the bus on `PUT /api/inngest`.

use std::collections::BTreeMap;

use serde::Serialize;

const SDK_VERSION: &str = concat!("rust:v", env!("CARGO_PKG_VERSION"));
const STEP_ID: &str = "step";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub url: String,
    pub deploy_type: &'static str,
    pub framework: &'static str,
    pub app_name: String,
    pub functions: Vec<FunctionConfig>,
    pub sdk: &'static str,
    pub v: &'static str,
}

impl Manifest {
    pub fn new(app_name: &str, serve_url: &str, functions: Vec<FunctionConfig>) -> Self {
        Self {
            url: serve_url.to_owned(),
            deploy_type: "ping",
            framework: "axum",
            app_name: app_name.to_owned(),
            functions,
            sdk: SDK_VERSION,
            v: "0.1",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionConfig {
    pub id: String,
    pub name: String,
    pub triggers: Vec<Trigger>,
    pub steps: BTreeMap<String, StepConfig>,
}

impl FunctionConfig {
    /// A single-step function invoked over HTTP at `serve_url?fnId=..&stepId=step`.
    pub fn http(slug: String, name: &str, event: &str, serve_url: &str) -> Self {
        let url = format!("{serve_url}?fnId={slug}&stepId={STEP_ID}");
        let step = StepConfig {
            id: STEP_ID.into(),
            name: STEP_ID.into(),
            runtime: Runtime { kind: "http", url },
        };
        Self {
            id: slug,
            name: name.to_owned(),
            triggers: vec![Trigger {
                event: event.to_owned(),
            }],
            steps: BTreeMap::from([(STEP_ID.to_owned(), step)]),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Trigger {
    pub event: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepConfig {
    pub id: String,
    pub name: String,
    pub runtime: Runtime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Runtime {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_function_points_at_serve_url() {
        let f = FunctionConfig::http(
            "app-sync-user".into(),
            "Sync user",
            "clerk/user.created",
            "https://api.example.com/api/inngest",
        );
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["triggers"][0]["event"], "clerk/user.created");
        assert_eq!(v["steps"]["step"]["runtime"]["type"], "http");
        assert_eq!(
            v["steps"]["step"]["runtime"]["url"],
            "https://api.example.com/api/inngest?fnId=app-sync-user&stepId=step"
        );
    }

    #[test]
    fn manifest_uses_camel_case() {
        let m = Manifest::new("app", "http://localhost:3000/api/inngest", vec![]);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["deployType"], "ping");
        assert_eq!(v["appName"], "app");
    }
}
