//! Breakpoint bookkeeping through the side channel
//!
//! The debugger is the source of truth for breakpoints. After every prompt
//! the breakpoints of the displayed file are queried from a cooperating
//! proxy, and the stored entry for that file is replaced wholesale.

mod proxy;

pub use proxy::{SideChannel, UdpProxy};

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Breakpoint ids per line of one file, keyed by the line number as text
pub type BreakpointsForFile = BTreeMap<String, Vec<String>>;

/// Why a breakpoint query produced no usable data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// No structured payload could be found or decoded
    #[error("Malformed breakpoint response: {0}")]
    Malformed(String),

    /// The debugger answered with an error message instead of data
    #[error("Can't get breakpoints: {0}")]
    Reported(String),

    /// The side channel itself failed
    #[error("Side channel failure: {0}")]
    Channel(String),
}

/// Request line asking the proxy for the breakpoints of `file`
pub fn query_request(file: &Path) -> String {
    format!("info-breakpoints {}\n", file.display())
}

/// Decode a proxy response
///
/// The debugger may echo input or control sequences before the payload, so
/// everything before the first `{` is skipped, and anything after the first
/// complete JSON value is ignored. An absent or blank response means no
/// breakpoints are known yet.
pub fn parse_response(response: Option<&str>) -> Result<BreakpointsForFile, QueryError> {
    let Some(response) = response.filter(|r| !r.trim().is_empty()) else {
        return Ok(BreakpointsForFile::new());
    };

    let start = response
        .find('{')
        .ok_or_else(|| QueryError::Malformed(format!("no '{{' in response: {:?}", response)))?;

    let value = serde_json::Deserializer::from_str(&response[start..])
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| QueryError::Malformed("empty payload".to_string()))?
        .map_err(|e| QueryError::Malformed(e.to_string()))?;

    let Value::Object(map) = value else {
        return Err(QueryError::Malformed(format!("expected an object, got {}", value)));
    };

    let mut breaks = BreakpointsForFile::new();
    for (line, ids) in map {
        if line == "_error" {
            match ids {
                Value::String(message) if !message.is_empty() => {
                    return Err(QueryError::Reported(message));
                }
                Value::Null | Value::Bool(false) | Value::String(_) => continue,
                other => return Err(QueryError::Reported(other.to_string())),
            }
        }

        let Value::Array(ids) = ids else {
            return Err(QueryError::Malformed(format!("line {}: expected a list of ids", line)));
        };
        let ids = ids
            .into_iter()
            .map(|id| match id {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(QueryError::Malformed(format!(
                    "line {}: unexpected breakpoint id {}",
                    line, other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        breaks.insert(line, ids);
    }

    Ok(breaks)
}

/// Client issuing breakpoint queries and holding the per-file results
///
/// Responses carry no request id, so only one query may be in flight per
/// channel; the `&mut self` receivers enforce that.
#[derive(Debug)]
pub struct BreakpointClient<C> {
    channel: C,
    breaks: HashMap<PathBuf, BreakpointsForFile>,
}

impl<C: SideChannel> BreakpointClient<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            breaks: HashMap::new(),
        }
    }

    /// Query the debugger for the breakpoints of `file`
    ///
    /// On success, and on a malformed response (treated as no breakpoints),
    /// the stored entry is replaced. A reported error or a channel failure
    /// leaves it untouched.
    #[tracing::instrument(skip(self, file), fields(file = %file.display()))]
    pub async fn query(&mut self, file: &Path) -> Result<BreakpointsForFile, QueryError> {
        tracing::debug!("Querying breakpoints");

        let response = self
            .channel
            .request(&query_request(file))
            .await
            .map_err(|e| QueryError::Channel(e.to_string()))?;

        match parse_response(response.as_deref()) {
            Ok(breaks) => {
                tracing::debug!(lines = breaks.len(), "Breakpoints updated");
                self.breaks.insert(file.to_path_buf(), breaks.clone());
                Ok(breaks)
            }
            Err(QueryError::Malformed(reason)) => {
                tracing::warn!(%reason, "Malformed breakpoint response");
                self.breaks.insert(file.to_path_buf(), BreakpointsForFile::new());
                Err(QueryError::Malformed(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Breakpoint ids at `line` of `file`, oldest first
    pub fn lookup(&self, file: &Path, line: u32) -> &[String] {
        self.breaks
            .get(file)
            .and_then(|breaks| breaks.get(&line.to_string()))
            .map_or(&[], Vec::as_slice)
    }

    pub fn for_file(&self, file: &Path) -> Option<&BreakpointsForFile> {
        self.breaks.get(file)
    }

    /// Forget every known breakpoint
    pub fn reset(&mut self) {
        self.breaks.clear();
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Replays canned responses and records requests
    #[derive(Default)]
    struct Canned {
        responses: VecDeque<Result<Option<String>>>,
        requests: Vec<String>,
    }

    impl Canned {
        fn with(responses: Vec<Result<Option<String>>>) -> Self {
            Self {
                responses: responses.into(),
                requests: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl SideChannel for Canned {
        async fn request(&mut self, line: &str) -> Result<Option<String>> {
            self.requests.push(line.to_string());
            self.responses.pop_front().unwrap_or(Ok(None))
        }
    }

    fn ok(text: &str) -> Result<Option<String>> {
        Ok(Some(text.to_string()))
    }

    const FILE: &str = "/a/b.c";

    #[tokio::test]
    async fn test_successful_query_replaces_entry() {
        let channel = Canned::with(vec![
            ok(r#"{"5": ["9"]}"#),
            ok(r#"{"10": ["1"], "20": ["2","3"]}"#),
        ]);
        let mut client = BreakpointClient::new(channel);
        let file = Path::new(FILE);

        client.query(file).await.unwrap();
        let breaks = client.query(file).await.unwrap();

        assert_eq!(breaks.len(), 2);
        assert_eq!(client.lookup(file, 20), ["2", "3"]);
        assert_eq!(client.lookup(file, 10), ["1"]);
        assert!(client.lookup(file, 5).is_empty());
        assert!(client.lookup(file, 99).is_empty());
        assert_eq!(client.channel.requests[0], "info-breakpoints /a/b.c\n");
    }

    #[tokio::test]
    async fn test_reported_error_keeps_previous_entry() {
        let channel = Canned::with(vec![
            ok(r#"{"10": ["1"]}"#),
            ok(r#"{"_error": "no symbol table"}"#),
        ]);
        let mut client = BreakpointClient::new(channel);
        let file = Path::new(FILE);

        client.query(file).await.unwrap();
        let err = client.query(file).await.unwrap_err();

        assert_eq!(err, QueryError::Reported("no symbol table".to_string()));
        assert_eq!(client.lookup(file, 10), ["1"]);
    }

    #[tokio::test]
    async fn test_channel_failure_keeps_previous_entry() {
        let channel = Canned::with(vec![
            ok(r#"{"10": ["1"]}"#),
            Err(crate::common::Error::SideChannel("proxy gone".to_string())),
        ]);
        let mut client = BreakpointClient::new(channel);
        let file = Path::new(FILE);

        client.query(file).await.unwrap();
        assert!(matches!(
            client.query(file).await,
            Err(QueryError::Channel(_))
        ));
        assert_eq!(client.lookup(file, 10), ["1"]);
    }

    #[tokio::test]
    async fn test_malformed_response_clears_entry() {
        let channel = Canned::with(vec![ok(r#"{"10": ["1"]}"#), ok("{\"7\": [")]);
        let mut client = BreakpointClient::new(channel);
        let file = Path::new(FILE);

        client.query(file).await.unwrap();
        assert!(matches!(
            client.query(file).await,
            Err(QueryError::Malformed(_))
        ));
        assert!(client.lookup(file, 10).is_empty());
        assert_eq!(client.for_file(file), Some(&BreakpointsForFile::new()));
    }

    #[tokio::test]
    async fn test_empty_response_means_no_breakpoints() {
        let channel = Canned::with(vec![ok(r#"{"10": ["1"]}"#), Ok(None)]);
        let mut client = BreakpointClient::new(channel);
        let file = Path::new(FILE);

        client.query(file).await.unwrap();
        let breaks = client.query(file).await.unwrap();
        assert!(breaks.is_empty());
        assert!(client.lookup(file, 10).is_empty());
    }

    #[tokio::test]
    async fn test_reset_forgets_everything() {
        let mut client = BreakpointClient::new(Canned::with(vec![ok(r#"{"3": ["4"]}"#)]));
        let file = Path::new(FILE);
        client.query(file).await.unwrap();
        assert!(client.for_file(file).is_some());

        client.reset();
        assert!(client.for_file(file).is_none());
        assert!(client.lookup(file, 3).is_empty());
    }

    #[test]
    fn test_parse_skips_leading_noise() {
        let breaks = parse_response(Some("info-breakpoints x\n \x08{\"7\": [\"1\"]}\n(lldb) ")).unwrap();
        assert_eq!(breaks.get("7").unwrap(), &vec!["1".to_string()]);
    }

    #[test]
    fn test_parse_accepts_numeric_ids() {
        let breaks = parse_response(Some(r#"{"7": [1, "2"]}"#)).unwrap();
        assert_eq!(breaks["7"], vec!["1", "2"]);
    }

    #[test]
    fn test_parse_malformed_responses() {
        for response in ["no payload here", "{\"7\": [", "{\"7\": \"1\"}", "{\"7\": [true]}"] {
            assert!(
                matches!(parse_response(Some(response)), Err(QueryError::Malformed(_))),
                "response {:?}",
                response
            );
        }
    }

    #[test]
    fn test_parse_blank_response() {
        assert!(parse_response(Some("  \n")).unwrap().is_empty());
        assert!(parse_response(None).unwrap().is_empty());
    }

    #[test]
    fn test_parse_empty_error_is_ignored() {
        let breaks = parse_response(Some(r#"{"_error": "", "4": ["2"]}"#)).unwrap();
        assert_eq!(breaks.len(), 1);
    }
}
