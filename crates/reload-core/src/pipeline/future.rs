//! One-shot handle carrying a build result back to the caller.
//!
//! The build job resolves its promise exactly once. The caller either
//! blocks on [`ResultFuture::wait`] or awaits the handle from async code.

use crate::pipeline::ReloadResponse;
use crate::request::RequestId;
use futures::executor::block_on;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::IntoFuture;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::debug;

/// Create a connected promise/future pair for `id`.
pub(crate) fn result_channel(id: RequestId) -> (ResultPromise, ResultFuture) {
    let (tx, rx) = oneshot::channel();
    (
        ResultPromise { id, tx },
        ResultFuture {
            id,
            state: FutureState::Pending(rx),
        },
    )
}

/// Producer side, owned by the build job.
#[derive(Debug)]
pub(crate) struct ResultPromise {
    id: RequestId,
    tx: oneshot::Sender<ReloadResponse>,
}

impl ResultPromise {
    pub(crate) fn resolve(self, response: ReloadResponse) {
        if self.tx.send(response).is_err() {
            debug!(id = %self.id, "Result future dropped before the build finished");
        }
    }
}

#[derive(Debug)]
enum FutureState {
    Pending(oneshot::Receiver<ReloadResponse>),
    Ready(ReloadResponse),
}

/// Handle to the outcome of one build.
///
/// The blocking methods park the calling thread. Inside an async runtime,
/// `.await` the handle instead.
#[derive(Debug)]
pub struct ResultFuture {
    id: RequestId,
    state: FutureState,
}

// A build job only goes away without resolving if the bundle builder
// panicked, which is not part of the status taxonomy.
fn abandoned(id: RequestId) -> ! {
    panic!("build job for request {id} terminated without a response")
}

impl ResultFuture {
    /// Future that is already resolved.
    pub(crate) fn ready(response: ReloadResponse) -> Self {
        Self {
            id: response.id(),
            state: FutureState::Ready(response),
        }
    }

    /// Id the build was started for.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Whether the result has arrived, without blocking.
    pub fn is_ready(&mut self) -> bool {
        let response = match &mut self.state {
            FutureState::Ready(_) => return true,
            FutureState::Pending(rx) => match rx.try_recv() {
                Ok(response) => response,
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Closed) => abandoned(self.id),
            },
        };
        self.state = FutureState::Ready(response);
        true
    }

    /// Block until the result has arrived. Returns at once if it already has.
    pub fn wait(&mut self) {
        let id = self.id;
        let response = match &mut self.state {
            FutureState::Ready(_) => return,
            FutureState::Pending(rx) => block_on(rx).unwrap_or_else(|_| abandoned(id)),
        };
        self.state = FutureState::Ready(response);
    }

    /// The resolved response, waiting for it first if necessary.
    pub fn get(&mut self) -> &ReloadResponse {
        self.wait();
        match &self.state {
            FutureState::Ready(response) => response,
            FutureState::Pending(_) => unreachable!("wait() leaves the future resolved"),
        }
    }

    /// Consume the handle, waiting for the response if necessary.
    pub fn into_response(self) -> ReloadResponse {
        match self.state {
            FutureState::Ready(response) => response,
            FutureState::Pending(rx) => block_on(rx).unwrap_or_else(|_| abandoned(self.id)),
        }
    }
}

impl IntoFuture for ResultFuture {
    type Output = ReloadResponse;
    type IntoFuture = BoxFuture<'static, ReloadResponse>;

    fn into_future(self) -> Self::IntoFuture {
        let id = self.id;
        async move {
            match self.state {
                FutureState::Ready(response) => response,
                FutureState::Pending(rx) => rx.await.unwrap_or_else(|_| abandoned(id)),
            }
        }
        .boxed()
    }
}
