//! GraphQL query text and response envelopes for the GitHub v4 API

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::period::SubInterval;

/// Rate-limit introspection; costs nothing against the quota
pub const RATE_LIMIT_QUERY: &str = "query { rateLimit { limit cost remaining resetAt } }";

/// User search for one window, `page_size` results per page, resuming after `cursor`
pub fn search_query(window: &SubInterval, page_size: usize, cursor: Option<&str>) -> String {
    // JSON string escaping is valid GraphQL string escaping
    let after = cursor
        .map(|c| format!(", after: {}", serde_json::Value::from(c)))
        .unwrap_or_default();
    format!(
        r#"{{
  search(query: "{} type:user", type: USER, first: {page_size}{after}) {{
    pageInfo {{ endCursor hasNextPage }}
    edges {{ node {{ ... on User {{ login location bio createdAt }} }} }}
  }}
}}"#,
        window.created_qualifier()
    )
}

/// Top-level GraphQL response. `data` is absent (or null) when the API
/// rejects the query, which is how quota exhaustion shows up in a 200 body.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
    /// REST-style rejection message (`{"message": "API rate limit exceeded ..."}`)
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Human-readable reason for a missing `data` field
    pub fn rejection_reason(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        if messages.is_empty() {
            "no data in response".to_string()
        } else {
            messages.join("; ")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub node: Option<UserNode>,
}

/// Search hit. Organizations match `type: USER` searches too and come back
/// as empty objects because of the `... on User` fragment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub login: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitData {
    pub rate_limit: RateLimit,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub limit: u64,
    pub cost: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> SubInterval {
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        SubInterval {
            start: day.and_hms_opt(0, 0, 0).unwrap(),
            end: day.and_hms_opt(0, 9, 59).unwrap(),
        }
    }

    #[test]
    fn first_page_has_no_after() {
        let q = search_query(&window(), 100, None);
        assert!(q.contains(
            r#"search(query: "created:2021-01-01T00:00:00..2021-01-01T00:09:59 type:user", type: USER, first: 100)"#
        ));
        assert!(!q.contains("after:"));
        assert!(q.contains("pageInfo { endCursor hasNextPage }"));
    }

    #[test]
    fn cursor_is_quoted_and_escaped() {
        let q = search_query(&window(), 50, Some(r#"Y3Vy"c2"#));
        assert!(q.contains(r#"first: 50, after: "Y3Vy\"c2")"#));
    }

    #[test]
    fn search_envelope_parses() {
        let body = r#"{"data":{"search":{
            "pageInfo":{"endCursor":"abc","hasNextPage":true},
            "edges":[{"node":{"login":"octo","location":"Mars","bio":"hi","createdAt":"2021-01-01T00:00:01Z"}},{"node":{}}]
        }}}"#;
        let env: Envelope<SearchData> = serde_json::from_str(body).unwrap();
        let search = env.data.unwrap().search;
        assert_eq!(search.page_info.end_cursor.as_deref(), Some("abc"));
        assert!(search.page_info.has_next_page);
        assert_eq!(search.edges.len(), 2);
        assert_eq!(search.edges[0].node.as_ref().unwrap().login.as_deref(), Some("octo"));
        assert!(search.edges[1].node.as_ref().unwrap().login.is_none());
    }

    #[test]
    fn rejection_without_data() {
        let body = r#"{"message":"API rate limit exceeded for user ID 1.","documentation_url":"https://docs.github.com"}"#;
        let env: Envelope<SearchData> = serde_json::from_str(body).unwrap();
        assert!(env.data.is_none());
        assert!(env.rejection_reason().contains("rate limit exceeded"));
    }

    #[test]
    fn null_data_with_errors() {
        let body = r#"{"data":null,"errors":[{"type":"RATE_LIMITED","message":"API rate limit exceeded"}]}"#;
        let env: Envelope<SearchData> = serde_json::from_str(body).unwrap();
        assert!(env.data.is_none());
        assert_eq!(env.errors[0].kind.as_deref(), Some("RATE_LIMITED"));
        assert_eq!(env.rejection_reason(), "API rate limit exceeded");
    }

    #[test]
    fn rate_limit_parses_reset_at() {
        let body = r#"{"data":{"rateLimit":{"limit":5000,"cost":1,"remaining":0,"resetAt":"2030-02-01T01:00:00Z"}}}"#;
        let env: Envelope<RateLimitData> = serde_json::from_str(body).unwrap();
        let rl = env.data.unwrap().rate_limit;
        assert_eq!(rl.remaining, 0);
        assert_eq!(rl.reset_at.to_rfc3339(), "2030-02-01T01:00:00+00:00");
    }
}
