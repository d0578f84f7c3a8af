//! Readiness gate for the primary render instance.
//!
//! A load completes the gate with the id of the instance it installed; a
//! waiter resolves with that id, or fails after its optional timeout, or when
//! its cancel handle fires. Nothing polls.

use std::time::Duration;

use log::warn;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::GateError;

#[derive(Debug)]
pub struct ReadinessGate {
    tx: watch::Sender<Option<Uuid>>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        ReadinessGate { tx }
    }
}

impl ReadinessGate {
    pub fn new() -> Self { Self::default() }

    pub fn mark_ready(&self, instance: Uuid) {
        self.tx.send_replace(Some(instance));
    }

    // Waiters stay pending until the next mark_ready
    pub fn reset(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<Uuid> {
        *self.tx.borrow()
    }

    pub fn waiter(&self) -> ReadyWaiter {
        ReadyWaiter { rx: self.tx.subscribe() }
    }
}

/// Fires a [`CancelToken`]. Dropping the handle without firing leaves the
/// token pending forever.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelHandle { tx }
    }
}

impl CancelHandle {
    pub fn new() -> Self { Self::default() }

    pub fn token(&self) -> CancelToken {
        CancelToken { rx: self.tx.subscribe() }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl CancelToken {
    async fn cancelled(&mut self) {
        if self.rx.wait_for(|c| *c).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub struct ReadyWaiter {
    rx: watch::Receiver<Option<Uuid>>,
}

impl ReadyWaiter {
    pub async fn wait(mut self, timeout: Option<Duration>, cancel: Option<CancelToken>) -> Result<Uuid, GateError> {
        let rx = &mut self.rx;
        let ready = async move {
            match rx.wait_for(Option::is_some).await {
                Ok(current) => (*current).ok_or(GateError::Closed),
                Err(_) => Err(GateError::Closed),
            }
        };
        let guarded = async move {
            match cancel {
                Some(mut token) => tokio::select! {
                    res = ready => res,
                    _ = token.cancelled() => Err(GateError::Cancelled),
                },
                None => ready.await,
            }
        };
        let res = match timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .unwrap_or(Err(GateError::Timeout(limit))),
            None => guarded.await,
        };
        if let Err(e) = &res {
            warn!("abandoning operation waiting on the graph view: {}", e);
        }
        res
    }
}

/// Binds a dependent request to the instance that was live when it was
/// issued. With nothing live yet, it waits for the next load instead.
pub struct InstanceTicket {
    issued: Option<Uuid>,
    waiter: ReadyWaiter,
}

impl InstanceTicket {
    pub fn new(issued: Option<Uuid>, waiter: ReadyWaiter) -> Self {
        InstanceTicket { issued, waiter }
    }

    pub fn issued(&self) -> Option<Uuid> { self.issued }

    /// The instance a result should be stamped with. A later reload never
    /// changes the answer once an instance was live at issue time.
    pub async fn instance(self, timeout: Option<Duration>, cancel: Option<CancelToken>) -> Result<Uuid, GateError> {
        match self.issued {
            Some(id) => Ok(id),
            None => self.waiter.wait(timeout, cancel).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_immediately_when_already_ready() {
        let gate = ReadinessGate::new();
        let id = Uuid::now_v7();
        gate.mark_ready(id);
        let got = gate.waiter().wait(Some(Duration::from_millis(50)), None).await;
        assert_eq!(got, Ok(id));
    }

    #[tokio::test]
    async fn resolves_when_load_completes_later() {
        let gate = ReadinessGate::new();
        let waiter = gate.waiter();
        let id = Uuid::now_v7();
        let pending = tokio::spawn(waiter.wait(Some(Duration::from_secs(2)), None));
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.mark_ready(id);
        assert_eq!(pending.await.unwrap(), Ok(id));
    }

    #[tokio::test]
    async fn times_out_when_nothing_loads() {
        let gate = ReadinessGate::new();
        let limit = Duration::from_millis(20);
        assert_eq!(gate.waiter().wait(Some(limit), None).await, Err(GateError::Timeout(limit)));
    }

    #[tokio::test]
    async fn cancel_handle_ends_the_wait() {
        let gate = ReadinessGate::new();
        let handle = CancelHandle::new();
        let pending = tokio::spawn(gate.waiter().wait(None, Some(handle.token())));
        handle.cancel();
        assert_eq!(pending.await.unwrap(), Err(GateError::Cancelled));
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_gate_reports_closed() {
        let gate = ReadinessGate::new();
        let waiter = gate.waiter();
        gate.reset();
        drop(gate);
        assert_eq!(waiter.wait(None, None).await, Err(GateError::Closed));
    }

    #[tokio::test]
    async fn ticket_keeps_the_instance_live_at_issue() {
        let gate = ReadinessGate::new();
        let first = Uuid::now_v7();
        gate.mark_ready(first);
        let ticket = InstanceTicket::new(gate.current(), gate.waiter());
        gate.reset();
        gate.mark_ready(Uuid::now_v7());
        assert_eq!(ticket.instance(Some(Duration::from_millis(50)), None).await, Ok(first));
    }

    #[tokio::test]
    async fn ticket_without_instance_waits_for_the_next_load() {
        let gate = ReadinessGate::new();
        let ticket = InstanceTicket::new(gate.current(), gate.waiter());
        assert_eq!(ticket.issued(), None);
        let pending = tokio::spawn(ticket.instance(Some(Duration::from_secs(2)), None));
        let id = Uuid::now_v7();
        gate.mark_ready(id);
        assert_eq!(pending.await.unwrap(), Ok(id));
    }
}
