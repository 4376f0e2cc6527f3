// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kubectl-backed cluster client

use super::{ClusterClient, ClusterError, LabelMap, Object, ObjectKind};
use crate::subprocess::{run_with_input, run_with_timeout};
use async_trait::async_trait;
use base64::Engine;
use std::collections::BTreeMap;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Cluster client that shells out to `kubectl`
#[derive(Clone, Debug)]
pub struct KubectlClient {
    binary: String,
    context: Option<String>,
    timeout: Duration,
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self {
            binary: "kubectl".to_string(),
            context: None,
            timeout: crate::env::kubectl_timeout(),
        }
    }
}

impl KubectlClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a named kubeconfig context instead of the current one.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into()).filter(|c: &String| !c.is_empty());
        self
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(ref context) = self.context {
            cmd.arg("--context").arg(context);
        }
        cmd
    }

    async fn run(&self, cmd: Command, description: &str) -> Result<Output, ClusterError> {
        let output = run_with_timeout(cmd, self.timeout, description)
            .await
            .map_err(ClusterError::CommandFailed)?;
        check_status(output, description)
    }
}

const SERVER_ALREADY_EXISTS: &str = "Error from server (AlreadyExists)";
const SERVER_NOT_FOUND: &str = "Error from server (NotFound)";

/// Map a failed kubectl invocation onto the cluster error taxonomy.
///
/// Only the API server's status reason counts. Free text such as a missing
/// kubeconfig ("context ... not found") is a command failure.
pub(crate) fn classify_failure(description: &str, stderr: &str) -> ClusterError {
    let message = stderr.trim();
    let reported = |reason: &str| message.lines().any(|line| line.trim_start().starts_with(reason));
    if reported(SERVER_ALREADY_EXISTS) {
        ClusterError::AlreadyExists(message.to_string())
    } else if reported(SERVER_NOT_FOUND) {
        ClusterError::NotFound(message.to_string())
    } else {
        ClusterError::CommandFailed(format!("{}: {}", description, message))
    }
}

fn check_status(output: Output, description: &str) -> Result<Output, ClusterError> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    tracing::debug!(description, stderr = %stderr, "kubectl failed");
    Err(classify_failure(description, &stderr))
}

/// Decode the base64 `data` map of a secret fetched with `-o json`.
pub(crate) fn decode_secret(raw: &[u8]) -> Result<BTreeMap<String, String>, ClusterError> {
    let value: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|e| ClusterError::InvalidResponse(format!("secret is not JSON: {}", e)))?;

    let mut decoded = BTreeMap::new();
    let Some(data) = value.get("data").and_then(|d| d.as_object()) else {
        return Ok(decoded);
    };
    for (key, encoded) in data {
        let encoded = encoded.as_str().ok_or_else(|| {
            ClusterError::InvalidResponse(format!("secret key {} is not a string", key))
        })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ClusterError::InvalidResponse(format!("secret key {}: {}", key, e)))?;
        decoded.insert(key.clone(), String::from_utf8_lossy(&bytes).into_owned());
    }
    Ok(decoded)
}

/// JSON merge patch for a secret's `data`: base64 values for `set`, nulls
/// for `unset`.
pub(crate) fn secret_patch(set: &BTreeMap<String, String>, unset: &[String]) -> serde_json::Value {
    let mut data = serde_json::Map::new();
    for key in unset {
        data.insert(key.clone(), serde_json::Value::Null);
    }
    for (key, value) in set {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        data.insert(key.clone(), serde_json::Value::String(encoded));
    }
    serde_json::json!({ "data": data })
}

/// Render a label map as a kubectl `-l` selector.
pub(crate) fn selector_arg(selector: &LabelMap) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn create(&self, object: &Object) -> Result<(), ClusterError> {
        let manifest = object
            .to_manifest()
            .map_err(|e| ClusterError::InvalidResponse(format!("encode {}: {}", object.describe(), e)))?;
        let body = serde_json::to_vec(&manifest)
            .map_err(|e| ClusterError::InvalidResponse(format!("encode {}: {}", object.describe(), e)))?;

        let mut cmd = self.command();
        cmd.args(["create", "-f", "-", "-o", "name"]);
        let output = run_with_input(cmd, &body, self.timeout, "kubectl create")
            .await
            .map_err(ClusterError::CommandFailed)?;
        check_status(output, "kubectl create")?;
        Ok(())
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, ClusterError> {
        let mut cmd = self.command();
        cmd.args(["get", "secret", name, "-n", namespace, "-o", "json"]);
        let output = self.run(cmd, "kubectl get secret").await?;
        decode_secret(&output.stdout)
    }

    async fn patch_secret(
        &self,
        namespace: &str,
        name: &str,
        set: &BTreeMap<String, String>,
        unset: &[String],
    ) -> Result<(), ClusterError> {
        let body = serde_json::to_vec(&secret_patch(set, unset))
            .map_err(|e| ClusterError::InvalidResponse(format!("encode patch for {}: {}", name, e)))?;

        // Values go through stdin so they never show up in the process list.
        let mut cmd = self.command();
        cmd.args([
            "patch",
            "secret",
            name,
            "-n",
            namespace,
            "--type=merge",
            "--patch-file=/dev/stdin",
        ]);
        let output = run_with_input(cmd, &body, self.timeout, "kubectl patch secret")
            .await
            .map_err(ClusterError::CommandFailed)?;
        check_status(output, "kubectl patch secret")?;
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let mut cmd = self.command();
        cmd.args([
            "delete",
            "namespace",
            name,
            "--ignore-not-found=true",
            "--wait=false",
        ]);
        self.run(cmd, "kubectl delete namespace").await?;
        Ok(())
    }

    async fn delete_collection(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelMap,
    ) -> Result<(), ClusterError> {
        if selector.is_empty() {
            return Err(ClusterError::CommandFailed(format!(
                "refusing to delete every {} in {} without a label selector",
                kind, namespace
            )));
        }
        let mut cmd = self.command();
        cmd.args(["delete", kind.resource(), "-n", namespace, "-l"])
            .arg(selector_arg(selector))
            .arg("--ignore-not-found=true");
        self.run(cmd, "kubectl delete collection").await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "kubectl_tests.rs"]
mod tests;
