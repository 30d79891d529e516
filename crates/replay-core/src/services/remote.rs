//! RemoteService - Background workers for replay server requests
//!
//! A small pool of threads shares one command channel. Each worker runs a
//! request to completion against the configured resources and publishes
//! the outcome on the completion channel, so slow requests never hold up
//! fast ones and completions surface in arrival order.

use super::messages::{
    Completion, RemoteCommand, RemoteReply, RemoteRequest, RequestId, RequestSink, ServiceHandle,
};
use crate::resource::{ApiError, ApiResult, ReplayMetadataService, ReplayResource};
use crossbeam::channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// One worker of the remote request pool
pub struct RemoteService {
    resource: Arc<dyn ReplayResource>,
    metadata: Arc<dyn ReplayMetadataService>,
    command_rx: Receiver<RemoteCommand>,
    completion_tx: Sender<Completion>,
    worker: usize,
}

impl RemoteService {
    /// Spawn `workers` threads (at least one)
    ///
    /// Returns a handle for sending commands and the receiver on which
    /// completions of [`RemoteCommand::Execute`] arrive.
    pub fn spawn(
        resource: Arc<dyn ReplayResource>,
        metadata: Arc<dyn ReplayMetadataService>,
        workers: usize,
    ) -> ApiResult<(ServiceHandle<RemoteCommand>, Receiver<Completion>)> {
        let (command_tx, command_rx) = crossbeam::channel::unbounded();
        let (completion_tx, completion_rx) = crossbeam::channel::unbounded();

        let mut thread_handles = Vec::with_capacity(workers.max(1));
        for worker in 0..workers.max(1) {
            let service = RemoteService {
                resource: Arc::clone(&resource),
                metadata: Arc::clone(&metadata),
                command_rx: command_rx.clone(),
                completion_tx: completion_tx.clone(),
                worker,
            };

            let handle = thread::Builder::new()
                .name(format!("remote-service-{}", worker))
                .spawn(move || service.run())
                .map_err(|e| {
                    ApiError::ServiceUnavailable(format!(
                        "Failed to spawn remote service thread: {}",
                        e
                    ))
                })?;
            thread_handles.push(handle);
        }

        log::info!("RemoteService started with {} workers", thread_handles.len());

        Ok((
            ServiceHandle {
                command_tx,
                thread_handles,
            },
            completion_rx,
        ))
    }

    /// Worker loop
    fn run(self) {
        log::debug!("RemoteService worker {} started", self.worker);

        while let Ok(cmd) = self.command_rx.recv() {
            match cmd {
                RemoteCommand::Shutdown => break,
                RemoteCommand::Execute { id, request } => {
                    let result = self.execute(&request);
                    if self.completion_tx.send(Completion { id, result }).is_err() {
                        log::debug!("Completion #{} dropped, nobody is listening", id);
                    }
                }
                RemoteCommand::Call { request, reply } => {
                    let _ = reply.send(self.execute(&request));
                }
            }
        }

        log::debug!("RemoteService worker {} stopped", self.worker);
    }

    /// Run one request against the resources
    fn execute(&self, request: &RemoteRequest) -> ApiResult<RemoteReply> {
        let result = match request {
            RemoteRequest::QueryAll => self.resource.query().map(RemoteReply::Replays),
            RemoteRequest::Play { tag } => self.resource.get(tag).map(RemoteReply::Played),
            RemoteRequest::Stop { tag } => self.resource.stop(tag).map(|_| RemoteReply::Done),
            RemoteRequest::SaveComment { tag, comment } => self
                .metadata
                .save_comment(tag, comment)
                .map(|_| RemoteReply::Done),
            RemoteRequest::UpdateTags { tag, tags } => self
                .metadata
                .update_tags(tag, tags)
                .map(|_| RemoteReply::Done),
        };

        if let Err(e) = &result {
            log::warn!("{} request failed: {}", request.kind(), e);
        }
        result
    }
}

/// Client for interacting with the RemoteService
pub struct RemoteClient {
    command_tx: Sender<RemoteCommand>,
    workers: usize,
}

impl RemoteClient {
    /// Create a new client from a service handle
    pub fn new(handle: &ServiceHandle<RemoteCommand>) -> Self {
        Self {
            command_tx: handle.command_tx.clone(),
            workers: handle.worker_count(),
        }
    }

    /// Queue a request; its completion arrives on the completion channel
    pub fn execute(&self, id: RequestId, request: RemoteRequest) -> ApiResult<()> {
        log::debug!("Dispatching {} request #{}", request.kind(), id);
        self.command_tx
            .send(RemoteCommand::Execute { id, request })
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))
    }

    /// Run a request and wait for its reply (blocking)
    ///
    /// Must not be called from inside an async runtime.
    pub fn call_blocking(&self, request: RemoteRequest) -> ApiResult<RemoteReply> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(RemoteCommand::Call { request, reply: tx })
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

        rx.blocking_recv()
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?
    }

    /// Ask every worker to stop
    pub fn shutdown(&self) -> ApiResult<()> {
        for _ in 0..self.workers {
            self.command_tx
                .send(RemoteCommand::Shutdown)
                .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
        }
        Ok(())
    }
}

impl RequestSink for RemoteClient {
    fn dispatch(&self, id: RequestId, request: RemoteRequest) -> ApiResult<()> {
        self.execute(id, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryReplayApi;
    use crate::types::{Replay, ReplayTag, TagRef};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn spawn_with(
        api: Arc<InMemoryReplayApi>,
        workers: usize,
    ) -> (ServiceHandle<RemoteCommand>, Receiver<Completion>, RemoteClient) {
        let (handle, completions) = RemoteService::spawn(api.clone(), api, workers).unwrap();
        let client = RemoteClient::new(&handle);
        (handle, completions, client)
    }

    #[test]
    fn test_remote_service_lifecycle() {
        let api = Arc::new(InMemoryReplayApi::with_replays(vec![Replay::new("a")]));
        let (handle, _completions, client) = spawn_with(api, 2);
        assert_eq!(handle.worker_count(), 2);

        let reply = client.call_blocking(RemoteRequest::QueryAll).unwrap();
        assert_eq!(reply, RemoteReply::Replays(vec![Replay::new("a")]));

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_execute_publishes_completion_with_id() {
        let api = Arc::new(InMemoryReplayApi::with_replays(vec![Replay::new("a")]));
        let (handle, completions, client) = spawn_with(api.clone(), 1);

        client
            .execute(
                11,
                RemoteRequest::UpdateTags {
                    tag: ReplayTag::new("a"),
                    tags: vec![TagRef::new("wet")],
                },
            )
            .unwrap();

        let completion = completions.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(completion.id, 11);
        assert_eq!(completion.result, Ok(RemoteReply::Done));
        assert_eq!(api.replays()[0].tag_names(), vec!["wet"]);

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_failure_travels_in_completion() {
        let api = Arc::new(InMemoryReplayApi::default());
        let (handle, completions, client) = spawn_with(api, 1);

        client
            .dispatch(3, RemoteRequest::Play { tag: ReplayTag::new("ghost") })
            .unwrap();

        let completion = completions.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(completion.id, 3);
        assert!(matches!(
            completion.result,
            Err(ApiError::Rejected { status: 404, .. })
        ));

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_completions_arrive_in_arrival_order() {
        let api = Arc::new(InMemoryReplayApi::with_replays(vec![
            Replay::new("slow"),
            Replay::new("fast"),
        ]));
        let release = api.hold_play("slow");
        let (handle, completions, client) = spawn_with(api.clone(), 2);

        client.execute(1, RemoteRequest::Play { tag: ReplayTag::new("slow") }).unwrap();
        client.execute(2, RemoteRequest::Play { tag: ReplayTag::new("fast") }).unwrap();

        let first = completions.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.id, 2);

        release.send(()).unwrap();
        let second = completions.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.id, 1);
        assert_eq!(api.plays.load(Ordering::SeqCst), 2);

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_dispatch_after_shutdown_fails() {
        let api = Arc::new(InMemoryReplayApi::default());
        let (handle, completions, client) = spawn_with(api, 1);

        client.shutdown().unwrap();
        handle.join();
        drop(completions);

        // Every receiver is gone, so the call fails instead of hanging
        let err = client.call_blocking(RemoteRequest::QueryAll).unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }
}
