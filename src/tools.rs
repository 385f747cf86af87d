//! MCP tool handlers for mailtracking-mcp.

use crate::db::MailpieceStore;
use crate::query::{
    cust_id_filter, delivery_status_filter, is_free_text, tracking_number_filter,
    CUST_ID_FREE_TEXT_MESSAGE, DEFAULT_MESSAGE, LOOKUP_LIMIT,
};
use crate::sanitize::{document_to_json, sanitize_mailpiece};
use mongodb::bson::Document;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, ErrorData as McpError, Implementation, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router, ServerHandler,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

/// Inclusive character bounds on every lookup input.
pub const MIN_INPUT_LEN: usize = 1;
pub const MAX_INPUT_LEN: usize = 100;

// =============================================================================
// Parameter types
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CustIdParams {
    /// Customer ID to search for.
    #[serde(deserialize_with = "coerce_string")]
    #[schemars(with = "String", length(min = 1, max = 100))]
    pub cust_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeliveryStatusParams {
    /// Delivery status to search for (e.g., 'Delivered', 'In Transit').
    #[serde(deserialize_with = "coerce_string")]
    #[schemars(with = "String", length(min = 1, max = 100))]
    pub status: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TrackingNumberParams {
    /// Tracking number (IMB) to search for.
    #[serde(deserialize_with = "coerce_string")]
    #[schemars(with = "String", length(min = 1, max = 100))]
    pub imb: String,
}

/// Accepts a string, number or boolean and yields its string form, so
/// callers may send `12345` where `"12345"` is meant.
fn coerce_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(match n.as_f64() {
            // Integral doubles print without exponent below 1e21, as JavaScript does.
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
            _ => n.to_string(),
        }),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, number or boolean, got {other}"
        ))),
    }
}

fn check_length(field: &str, value: &str) -> Result<(), McpError> {
    // Lengths are counted in UTF-16 code units, as JSON schema validators do.
    let len = value.encode_utf16().count();
    if (MIN_INPUT_LEN..=MAX_INPUT_LEN).contains(&len) {
        Ok(())
    } else {
        Err(McpError::invalid_params(
            format!("{field} must be between {MIN_INPUT_LEN} and {MAX_INPUT_LEN} characters, got {len}"),
            None,
        ))
    }
}

// =============================================================================
// Server implementation
// =============================================================================

/// MCP server exposing mail-tracking lookups.
#[derive(Clone)]
pub struct MailtrackingServer {
    store: Arc<dyn MailpieceStore>,
    tool_router: ToolRouter<Self>,
}

impl MailtrackingServer {
    /// Creates a new server reading from the given store.
    #[must_use]
    pub fn new(store: Arc<dyn MailpieceStore>) -> Self {
        Self {
            store,
            tool_router: Self::tool_router(),
        }
    }

    /// Runs `filter`, sanitizes every hit and returns them as a pretty JSON array.
    async fn lookup(
        &self,
        tool: &'static str,
        filter: Document,
        limit: Option<i64>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool, %filter, ?limit, "query");
        let records = self.store.find(filter, limit).await.map_err(|e| {
            tracing::error!(tool, error = %e, "lookup failed");
            McpError::internal_error(e.to_string(), None)
        })?;
        tracing::info!(tool, count = records.len(), "results");

        let sanitized: Vec<Value> = records
            .iter()
            .map(|record| document_to_json(&sanitize_mailpiece(record)))
            .collect();
        let text = serde_json::to_string_pretty(&sanitized)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(text_response(text))
    }
}

fn text_response(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

#[tool_router]
impl MailtrackingServer {
    /// Look up mailpieces by customer ID.
    #[tool(description = "Get statement tracking data for a given customer ID.")]
    async fn search_mailpieces_by_cust_id(
        &self,
        Parameters(params): Parameters<CustIdParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "search_mailpieces_by_cust_id";
        tracing::info!(tool = TOOL, cust_id = %params.cust_id, "received request");
        check_length("cust_id", &params.cust_id)?;

        if is_free_text(&params.cust_id) {
            tracing::info!(tool = TOOL, "input appears to be free text, returning default response");
            return Ok(text_response(CUST_ID_FREE_TEXT_MESSAGE));
        }

        self.lookup(TOOL, cust_id_filter(&params.cust_id), Some(LOOKUP_LIMIT))
            .await
    }

    /// Look up mailpieces having a scan with the given delivery status.
    #[tool(description = "Get statement tracking data for mailpieces with a given delivery status.")]
    async fn search_mailpieces_by_delivery_status(
        &self,
        Parameters(params): Parameters<DeliveryStatusParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "search_mailpieces_by_delivery_status";
        tracing::info!(tool = TOOL, status = %params.status, "received request");
        check_length("status", &params.status)?;

        self.lookup(TOOL, delivery_status_filter(&params.status), None)
            .await
    }

    /// Look up mailpieces by tracking number.
    #[tool(description = "Get statement tracking data for a given tracking number (IMB).")]
    async fn search_mailpieces_by_tracking_number(
        &self,
        Parameters(params): Parameters<TrackingNumberParams>,
    ) -> Result<CallToolResult, McpError> {
        const TOOL: &str = "search_mailpieces_by_tracking_number";
        tracing::info!(tool = TOOL, imb = %params.imb, "received request");
        check_length("imb", &params.imb)?;

        if is_free_text(&params.imb) {
            tracing::info!(tool = TOOL, "input appears to be free text, returning default response");
            return Ok(text_response(DEFAULT_MESSAGE));
        }

        self.lookup(TOOL, tracking_number_filter(&params.imb), Some(LOOKUP_LIMIT))
            .await
    }

    /// Fallback for requests that match no other tool.
    #[tool(
        description = "When MCP is called with no specific tool or no input, this default tool responds."
    )]
    async fn no_match_default_tool(&self) -> Result<CallToolResult, McpError> {
        tracing::info!(tool = "no_match_default_tool", "received request");
        Ok(text_response(DEFAULT_MESSAGE))
    }
}

#[tool_handler]
impl ServerHandler for MailtrackingServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Mail tracking MCP server. Look up mailpieces by customer ID, tracking number (IMB) or delivery status."
                    .to_string(),
            ),
        }
    }
}
