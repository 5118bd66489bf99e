//! Ticketed state cells.
//!
//! Every state-producing event (poll response, command response) carries a
//! ticket drawn from a [`Sequencer`]. A [`TicketedCell`] only accepts a value
//! whose ticket is higher than the one it currently holds, so a slow response
//! can never overwrite a newer one. Once closed, a cell rejects everything.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic ticket source, one per polling loop.
#[derive(Debug, Default)]
pub struct Sequencer {
    last: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Ticket {
        Ticket(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[derive(Debug, Clone)]
pub struct Sequenced<T> {
    pub ticket: u64,
    pub value: Option<T>,
    closed: bool,
}

#[derive(Debug)]
pub struct TicketedCell<T> {
    tx: watch::Sender<Sequenced<T>>,
}

impl<T> TicketedCell<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Sequenced {
            ticket: 0,
            value: None,
            closed: false,
        });
        Self { tx }
    }

    /// Applies `value` if `ticket` is newer than the held one.
    /// Returns whether the value was accepted.
    pub fn apply(&self, ticket: Ticket, value: T) -> bool {
        let mut value = Some(value);
        self.tx.send_if_modified(|current| {
            if current.closed || ticket.0 <= current.ticket {
                return false;
            }
            current.ticket = ticket.0;
            current.value = value.take();
            true
        })
    }

    pub fn close(&self) {
        self.tx.send_if_modified(|current| {
            current.closed = true;
            false
        });
    }

    pub fn is_closed(&self) -> bool {
        self.tx.borrow().closed
    }

    pub fn ticket(&self) -> u64 {
        self.tx.borrow().ticket
    }

    pub fn subscribe(&self) -> watch::Receiver<Sequenced<T>> {
        self.tx.subscribe()
    }
}

impl<T: Clone> TicketedCell<T> {
    pub fn get(&self) -> Option<T> {
        self.tx.borrow().value.clone()
    }
}

impl<T> Default for TicketedCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequencer_is_monotonic() {
        let seq = Sequencer::new();
        let a = seq.next();
        let b = seq.next();
        assert!(b > a);
        assert_eq!(a.value(), 1);
    }

    #[test]
    fn test_newer_ticket_wins() {
        let seq = Sequencer::new();
        let cell = TicketedCell::new();
        let first = seq.next();
        let second = seq.next();

        assert!(cell.apply(second, "second"));
        assert!(!cell.apply(first, "first"));
        assert_eq!(cell.get(), Some("second"));
        assert_eq!(cell.ticket(), second.value());
    }

    #[test]
    fn test_equal_ticket_rejected() {
        let seq = Sequencer::new();
        let cell = TicketedCell::new();
        let ticket = seq.next();

        assert!(cell.apply(ticket, 1));
        assert!(!cell.apply(ticket, 2));
        assert_eq!(cell.get(), Some(1));
    }

    #[test]
    fn test_closed_cell_rejects_updates() {
        let seq = Sequencer::new();
        let cell = TicketedCell::new();
        assert!(cell.apply(seq.next(), 10));

        cell.close();

        assert!(cell.is_closed());
        assert!(!cell.apply(seq.next(), 20));
        assert_eq!(cell.get(), Some(10));
    }

    #[test]
    fn test_apply_notifies_subscribers() {
        tokio_test::block_on(async {
            let seq = Sequencer::new();
            let cell = TicketedCell::new();
            let mut rx = cell.subscribe();

            cell.apply(seq.next(), 42.5);

            rx.changed().await.unwrap();
            assert_eq!(rx.borrow().value, Some(42.5));
        });
    }
}
