use std::sync::Arc;

use futures_util::FutureExt;
use tokio::{
    select,
    sync::{Mutex, mpsc::Receiver},
};
use tokio_util::sync::CancellationToken;

use crate::{Call, Value, internal::Registry};

/// The dispatcher's serializing loop: takes submitted calls off the mailbox
/// one at a time and routes each under the registry lock.
///
/// The loop never blocks except while waiting for the next submission; all
/// matching happens inside [`Registry::route`].
pub(crate) struct DispatchLoop<V: Value> {
    mailbox: Receiver<Call<V>>,
    registry: Arc<Mutex<Registry<V>>>,
    cancel_token: CancellationToken,
}

impl<V: Value> DispatchLoop<V> {
    pub(crate) fn new(
        mailbox: Receiver<Call<V>>,
        registry: Arc<Mutex<Registry<V>>>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            mailbox,
            registry,
            cancel_token,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                maybe_call = self.mailbox.recv() => {
                    let Some(call) = maybe_call else {
                        break;
                    };
                    self.registry.lock().await.route(call);
                }
            }
        }
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        // Route any calls still buffered in the mailbox (best effort) so a
        // waiter that matched before teardown still gets its call; calls
        // with no waiter land in the backlog and are dropped with it,
        // unblocking their producers.
        self.mailbox.close();
        while let Some(call) = self.mailbox.recv().now_or_never().flatten() {
            self.registry.lock().await.route(call);
        }
        tracing::debug!("dispatch loop stopped");
    }
}
