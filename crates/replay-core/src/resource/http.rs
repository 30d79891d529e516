//! REST client for the replay server
//!
//! Uses ureq (blocking, simple) since every call already runs on a
//! background worker thread.

use std::time::Duration;

use serde::Serialize;

use super::{ApiError, ApiResult, ReplayMetadataService, ReplayResource};
use crate::config::ClientConfig;
use crate::types::{CommentDraft, Replay, ReplayTag, TagRef};

const LIST_PATH: &str = "/api/replays";
const PLAY_PATH: &str = "/api/replay";
const STOP_PATH: &str = "/api/replay/stop";
const COMMENTS_PATH: &str = "/api/replay/comments";
const TAGS_PATH: &str = "/api/replay/tags";

/// HTTP implementation of [`ReplayResource`] and [`ReplayMetadataService`]
pub struct HttpReplayApi {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpReplayApi {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_json<T: Serialize + ?Sized>(
        &self,
        method: &str,
        path: &str,
        tag: &ReplayTag,
        body: &T,
    ) -> ApiResult<String> {
        let payload = serde_json::to_string(body)?;
        log::debug!("{} {} tag={} body={}", method, path, tag, payload);

        let response = self
            .agent
            .request(method, &self.url(path))
            .query("tag", tag.as_str())
            .set("Content-Type", "application/json")
            .send_string(&payload)
            .map_err(map_ureq_error)?;
        read_body(response)
    }
}

impl ReplayResource for HttpReplayApi {
    fn query(&self) -> ApiResult<Vec<Replay>> {
        log::debug!("GET {}", LIST_PATH);
        let response = self
            .agent
            .get(&self.url(LIST_PATH))
            .call()
            .map_err(map_ureq_error)?;
        let body = read_body(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn get(&self, tag: &ReplayTag) -> ApiResult<Option<Replay>> {
        log::debug!("GET {} tag={}", PLAY_PATH, tag);
        let response = self
            .agent
            .get(&self.url(PLAY_PATH))
            .query("tag", tag.as_str())
            .call()
            .map_err(map_ureq_error)?;
        let body = read_body(response)?;

        // Some servers acknowledge with a bare "ok" instead of the replay
        match serde_json::from_str::<Replay>(&body) {
            Ok(replay) => Ok(Some(replay)),
            Err(e) => {
                log::debug!("Play response for {} is not a replay document: {}", tag, e);
                Ok(None)
            }
        }
    }

    fn stop(&self, tag: &ReplayTag) -> ApiResult<()> {
        log::debug!("POST {} tag={}", STOP_PATH, tag);
        let response = self
            .agent
            .post(&self.url(STOP_PATH))
            .query("tag", tag.as_str())
            .call()
            .map_err(map_ureq_error)?;
        read_body(response).map(|_| ())
    }
}

impl ReplayMetadataService for HttpReplayApi {
    fn update_tags(&self, tag: &ReplayTag, tags: &[TagRef]) -> ApiResult<()> {
        self.send_json("PUT", TAGS_PATH, tag, tags).map(|_| ())
    }

    fn save_comment(&self, tag: &ReplayTag, comment: &CommentDraft) -> ApiResult<()> {
        self.send_json("POST", COMMENTS_PATH, tag, comment).map(|_| ())
    }
}

fn read_body(response: ureq::Response) -> ApiResult<String> {
    response
        .into_string()
        .map_err(|e| ApiError::Transport(e.to_string()))
}

fn map_ureq_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(status, response) => ApiError::Rejected {
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve exactly one canned response; the join handle yields the raw request
    fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line == "\r\n" {
                    break;
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            request.push_str(&String::from_utf8(body).unwrap());

            stream.write_all(response.as_bytes()).unwrap();
            request
        });

        (format!("http://{}/", addr), handle)
    }

    fn api(base_url: &str) -> HttpReplayApi {
        HttpReplayApi::new(base_url, Duration::from_secs(5))
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = api("http://localhost:8080/");
        assert_eq!(api.base_url(), "http://localhost:8080");
        assert_eq!(api.url(LIST_PATH), "http://localhost:8080/api/replays");
    }

    #[test]
    fn test_query_decodes_list_in_order() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"tag":"b","metadata":{"tags":[{"name":"wet"}]}},{"tag":"a"}]"#,
        );

        let replays = api(&url).query().unwrap();
        let request = server.join().unwrap();

        assert!(request.starts_with("GET /api/replays HTTP/1.1"));
        assert_eq!(replays.len(), 2);
        assert_eq!(replays[0].tag.as_str(), "b");
        assert_eq!(replays[0].tag_names(), vec!["wet"]);
        assert_eq!(replays[1].tag.as_str(), "a");
    }

    #[test]
    fn test_play_accepts_plain_ok_body() {
        let (url, server) = serve_once("200 OK", "ok");

        let played = api(&url).get(&ReplayTag::new("race1")).unwrap();
        let request = server.join().unwrap();

        assert!(played.is_none());
        assert!(request.starts_with("GET /api/replay?tag=race1 HTTP/1.1"));
    }

    #[test]
    fn test_update_tags_sends_whole_list() {
        let (url, server) = serve_once("204 No Content", "");

        let tags = vec![TagRef::new("A"), TagRef::new("C")];
        api(&url).update_tags(&ReplayTag::new("race1"), &tags).unwrap();
        let request = server.join().unwrap();

        assert!(request.starts_with("PUT /api/replay/tags?tag=race1 HTTP/1.1"));
        assert!(request.ends_with(r#"[{"name":"A"},{"name":"C"}]"#));
    }

    #[test]
    fn test_stop_uses_global_sentinel() {
        let (url, server) = serve_once("200 OK", "");

        api(&url).stop(&ReplayTag::all()).unwrap();
        let request = server.join().unwrap();

        assert!(request.starts_with("POST /api/replay/stop?tag=all HTTP/1.1"));
    }

    #[test]
    fn test_rejected_status_maps_to_error() {
        let (url, server) = serve_once("422 Unprocessable Entity", "no such replay");

        let err = api(&url)
            .save_comment(&ReplayTag::new("ghost"), &CommentDraft::new("hello"))
            .unwrap_err();
        let request = server.join().unwrap();

        assert!(request.ends_with(r#"{"text":"hello"}"#));
        assert_eq!(
            err,
            ApiError::Rejected {
                status: 422,
                body: "no such replay".to_string()
            }
        );
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let err = api(&format!("http://{}", addr)).query().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
