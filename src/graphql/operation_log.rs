//! Diagnostic log of incoming GraphQL operations.
//!
//! Every operation except schema introspection is logged as two DEBUG events on the
//! [OPERATION_LOG_TARGET] target: the query text and the variables as JSON.
//!
//! HTTP operations are logged when their context is built. Operations sent over a WebSocket
//! connection are logged by the [ConnectionOperationLog] schema extension.
//!
//! With redaction on, values under sensitive variable keys are replaced, and so is every
//! string literal of a query whose text mentions a sensitive name. Sensitive values written
//! as numbers or enums in the query text are not recognised.

use std::borrow::Cow;
use std::sync::Arc;

use async_graphql::extensions::{
    Extension, ExtensionContext, ExtensionFactory, NextPrepareRequest,
};
use async_graphql::{Request, ServerResult};
use serde_json::Value as JsonValue;

/// Tracing target of the operation log; filter it with `RUST_LOG=hackernews::operations=debug`
pub const OPERATION_LOG_TARGET: &str = "hackernews::operations";

/// Operation name sent by GraphiQL and most tooling when introspecting
const INTROSPECTION_MARKER: &str = "IntrospectionQuery";

const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: &[&str] = &["password", "token", "secret", "authorization"];

const BLOCK_STRING_QUOTE: &str = "\"\"\"";

/// Operation log settings
#[derive(Debug, Clone, Copy)]
pub struct OperationLogConfig {
    pub enabled: bool,
    pub redact_variables: bool,
}

impl Default for OperationLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_variables: true,
        }
    }
}

/// Plain substring test, so a query mentioning the marker in a comment also counts
pub fn is_introspection(query: &str) -> bool {
    query.contains(INTROSPECTION_MARKER)
}

/// Log the query and variables of an operation unless it is an introspection query
pub fn log_operation(
    config: OperationLogConfig,
    operation_name: Option<&str>,
    query: &str,
    variables: &JsonValue,
) {
    if !config.enabled || is_introspection(query) {
        return;
    }

    let (query, variables) = if config.redact_variables {
        (redact_query(query), redact(variables))
    } else {
        (Cow::Borrowed(query), variables.clone())
    };

    tracing::debug!(
        target: OPERATION_LOG_TARGET,
        operation = operation_name,
        query = %query,
        "graphql:query"
    );
    tracing::debug!(target: OPERATION_LOG_TARGET, variables = %variables, "graphql:variables");
}

/// Copy of `value` with the values under sensitive keys replaced, at any depth
pub fn redact(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if is_sensitive(key) {
                        JsonValue::String(REDACTED.to_string())
                    } else {
                        redact(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|s| key.contains(s))
}

/// Query text with string literals replaced when the text mentions a sensitive name
pub fn redact_query(query: &str) -> Cow<'_, str> {
    if !is_sensitive(query) {
        return Cow::Borrowed(query);
    }

    let mut redacted = String::with_capacity(query.len());
    let mut rest = query;
    while let Some(start) = rest.find('"') {
        redacted.push_str(&rest[..start]);
        let delimiter = if rest[start..].starts_with(BLOCK_STRING_QUOTE) {
            BLOCK_STRING_QUOTE
        } else {
            "\""
        };
        let body = &rest[start + delimiter.len()..];

        redacted.push_str(delimiter);
        redacted.push_str(REDACTED);
        match literal_end(body, delimiter) {
            Some(end) => {
                redacted.push_str(delimiter);
                rest = &body[end + delimiter.len()..];
            }
            None => rest = "",
        }
    }
    redacted.push_str(rest);
    Cow::Owned(redacted)
}

/// Offset of the closing `delimiter` in `body`, skipping backslash escapes
fn literal_end(body: &str, delimiter: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if body[i..].starts_with(delimiter) {
            return Some(i);
        }
    }
    None
}

/// Connection data marking a WebSocket connection whose operations are logged
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLog(pub OperationLogConfig);

/// Schema extension logging each operation of a connection that carries [ConnectionLog]
pub struct ConnectionOperationLog;

impl ExtensionFactory for ConnectionOperationLog {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(ConnectionOperationLogExtension)
    }
}

struct ConnectionOperationLogExtension;

#[async_trait::async_trait]
impl Extension for ConnectionOperationLogExtension {
    async fn prepare_request(
        &self,
        ctx: &ExtensionContext<'_>,
        request: Request,
        next: NextPrepareRequest<'_>,
    ) -> ServerResult<Request> {
        if let Some(ConnectionLog(config)) = ctx.data_opt::<ConnectionLog>() {
            let variables = serde_json::to_value(&request.variables).unwrap_or_default();
            log_operation(
                *config,
                request.operation_name.as_deref(),
                &request.query,
                &variables,
            );
        }
        next.run(ctx, request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    /// Collects formatted log lines written while a closure runs
    #[derive(Clone, Default)]
    pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub(crate) fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
            let subscriber = tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            tracing::subscriber::with_default(subscriber, f)
        }

        /// Capture on this thread until the guard drops
        pub(crate) fn set_default(&self) -> tracing::subscriber::DefaultGuard {
            let subscriber = tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        pub(crate) fn operation_lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .filter(|line| line.contains(OPERATION_LOG_TARGET))
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_logs_query_and_variables() {
        let logs = CapturedLogs::default();
        logs.capture(|| {
            log_operation(
                OperationLogConfig::default(),
                None,
                "{ feed { id } }",
                &json!({}),
            )
        });

        let lines = logs.operation_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("graphql:query"));
        assert!(lines[0].contains("{ feed { id } }"));
        assert!(lines[1].contains("graphql:variables"));
        assert!(lines[1].contains("{}"));
    }

    #[test]
    fn test_introspection_is_not_logged() {
        let logs = CapturedLogs::default();
        logs.capture(|| {
            log_operation(
                OperationLogConfig::default(),
                None,
                "query IntrospectionQuery { __schema { types { name } } }",
                &json!({}),
            )
        });
        assert!(logs.operation_lines().is_empty());
    }

    #[test]
    fn test_disabled_log() {
        let logs = CapturedLogs::default();
        let config = OperationLogConfig {
            enabled: false,
            ..Default::default()
        };
        logs.capture(|| log_operation(config, None, "{ info }", &json!({})));
        assert!(logs.operation_lines().is_empty());
    }

    #[test]
    fn test_variables_are_redacted() {
        let logs = CapturedLogs::default();
        logs.capture(|| {
            log_operation(
                OperationLogConfig::default(),
                None,
                "mutation($email: String!, $password: String!) { login(email: $email, password: $password) { token } }",
                &json!({ "email": "a@b.c", "password": "hunter2" }),
            )
        });

        let lines = logs.operation_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("a@b.c"));
        assert!(lines[1].contains(REDACTED));
        assert!(!lines[1].contains("hunter2"));
    }

    #[test]
    fn test_redaction_can_be_disabled() {
        let logs = CapturedLogs::default();
        let config = OperationLogConfig {
            redact_variables: false,
            ..Default::default()
        };
        logs.capture(|| {
            log_operation(
                config,
                Some("Info"),
                "{ info }",
                &json!({ "password": "hunter2" }),
            )
        });
        assert!(logs.operation_lines()[1].contains("hunter2"));
    }

    #[test]
    fn test_inline_sensitive_literals_are_redacted() {
        let logs = CapturedLogs::default();
        logs.capture(|| {
            log_operation(
                OperationLogConfig::default(),
                None,
                r#"mutation { login(email: "a@b.c", password: "hunter2") { token } }"#,
                &json!({}),
            )
        });

        let lines = logs.operation_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("login(email:"));
        assert!(lines[0].contains(REDACTED));
        assert!(!lines[0].contains("hunter2"));
    }

    #[test]
    fn test_redact_query() {
        let plain = r#"{ feed(filter: "rust") { count } }"#;
        assert_eq!(redact_query(plain), plain);
        assert_eq!(
            redact_query(r#"mutation { signup(name: "a \"b\"", password: "x") { token } }"#),
            r#"mutation { signup(name: "[REDACTED]", password: "[REDACTED]") { token } }"#
        );
        assert_eq!(
            redact_query(r#"mutation { login(email: "e", password: """multi"line""") { token } }"#),
            r#"mutation { login(email: "[REDACTED]", password: """[REDACTED]""") { token } }"#
        );
        assert_eq!(
            redact_query(r#"mutation { login(password: "unterminated"#),
            r#"mutation { login(password: "[REDACTED]"#
        );
    }

    #[test]
    fn test_redact_nested() {
        let value = json!({
            "input": { "authToken": "abc", "name": "x" },
            "list": [{ "clientSecret": 1 }],
            "n": 3
        });
        assert_eq!(
            redact(&value),
            json!({
                "input": { "authToken": REDACTED, "name": "x" },
                "list": [{ "clientSecret": REDACTED }],
                "n": 3
            })
        );
    }

    #[test]
    fn test_is_introspection_substring() {
        assert!(is_introspection("query IntrospectionQuery { __schema { queryType { name } } }"));
        // Known imprecision: the marker inside a comment also matches
        assert!(is_introspection("# IntrospectionQuery\n{ info }"));
        assert!(!is_introspection("{ feed { count } }"));
    }
}
