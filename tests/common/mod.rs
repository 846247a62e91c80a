//! Scripted in-memory transport shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use serde_json::Value;
use tsunagi::error::LlmError;
use tsunagi::http::{
    HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport,
};

enum Planned {
    Json { status: u16, body: Value },
    Stream { status: u16, chunks: Vec<Vec<u8>> },
}

/// Transport that replays scripted responses and records every request.
pub struct MockTransport {
    planned: Mutex<VecDeque<Planned>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            planned: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.planned
            .lock()
            .unwrap()
            .push_back(Planned::Json { status, body });
    }

    /// Plans a streaming response; each entry becomes one network chunk.
    pub fn push_stream(&self, status: u16, chunks: &[&str]) {
        self.planned.lock().unwrap().push_back(Planned::Stream {
            status,
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
        });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Parses the body of the n-th recorded request as JSON.
    pub fn request_body(&self, index: usize) -> Value {
        let requests = self.requests.lock().unwrap();
        let request = requests.get(index).expect("request recorded");
        let body = request.body.as_ref().expect("request has a body");
        serde_json::from_slice(body).expect("request body is JSON")
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        match self.planned.lock().unwrap().pop_front() {
            Some(Planned::Json { status, body }) => Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: serde_json::to_vec(&body).expect("serializable body"),
            }),
            Some(Planned::Stream { .. }) => panic!("buffered request met a planned stream"),
            None => panic!("no planned response for request"),
        }
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        match self.planned.lock().unwrap().pop_front() {
            Some(Planned::Stream { status, chunks }) => {
                let items: Vec<Result<Vec<u8>, LlmError>> =
                    chunks.into_iter().map(Ok).collect();
                let body: HttpBodyStream = Box::pin(stream::iter(items));
                Ok(HttpStreamResponse {
                    status,
                    headers: HashMap::new(),
                    body,
                })
            }
            Some(Planned::Json { status, body }) => {
                // 非 2xx 的流式请求走缓冲错误体
                let bytes = serde_json::to_vec(&body).expect("serializable body");
                let items: Vec<Result<Vec<u8>, LlmError>> = vec![Ok(bytes)];
                let body: HttpBodyStream = Box::pin(stream::iter(items));
                Ok(HttpStreamResponse {
                    status,
                    headers: HashMap::new(),
                    body,
                })
            }
            None => panic!("no planned response for stream request"),
        }
    }
}
