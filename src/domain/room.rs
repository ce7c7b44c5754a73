//! Per-auction arbitration loop.
//!
//! Each open auction runs exactly one [`AuctionRoom`] task. The task is the
//! sole owner of the membership map and the sole arbiter of bid ordering:
//! joins, leaves, domain messages, and the deadline are all funneled through
//! one `select!` loop, so no two bid-affecting events are ever processed
//! concurrently. Producers talk to the room through a clonable
//! [`RoomHandle`]; once the room drains, every handle operation fails with
//! [`RoomClosed`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::lobby::AuctionLobby;
use super::message::RoomMessage;
use super::AuctionId;
use crate::ledger::{BidLedger, LedgerError};

/// Capacity of the join/leave/message intake channels.
const INTAKE_CAPACITY: usize = 64;

/// A bidder's live session as seen by the room: identity plus the sending
/// half of the bounded outbound queue drained by that bidder's pump.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Authenticated bidder identifier.
    pub bidder_id: Uuid,
    /// Producer side of the participant's outbound queue.
    pub outbound: mpsc::Sender<RoomMessage>,
}

/// The room has drained and no longer accepts events.
#[derive(Debug, thiserror::Error)]
#[error("auction room {0} is closed")]
pub struct RoomClosed(pub AuctionId);

/// Clonable handle used by pumps and services to feed events into a room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    auction_id: AuctionId,
    ends_at: DateTime<Utc>,
    join_tx: mpsc::Sender<Participant>,
    leave_tx: mpsc::Sender<Uuid>,
    message_tx: mpsc::Sender<RoomMessage>,
    cancel: Arc<watch::Sender<bool>>,
}

impl RoomHandle {
    /// The auction this room serves.
    #[must_use]
    pub const fn auction_id(&self) -> AuctionId {
        self.auction_id
    }

    /// Absolute expiry instant of the auction.
    #[must_use]
    pub const fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// Adds a participant to the room.
    ///
    /// # Errors
    ///
    /// Returns [`RoomClosed`] if the room has drained.
    pub async fn join(&self, participant: Participant) -> Result<(), RoomClosed> {
        self.join_tx
            .send(participant)
            .await
            .map_err(|_| RoomClosed(self.auction_id))
    }

    /// Removes a participant. Idempotent; a closed room is a no-op since it
    /// has already forgotten all members.
    pub async fn leave(&self, bidder_id: Uuid) {
        let _ = self.leave_tx.send(bidder_id).await;
    }

    /// Feeds a domain message into the arbitration loop.
    ///
    /// # Errors
    ///
    /// Returns [`RoomClosed`] if the room has drained.
    pub async fn send(&self, message: RoomMessage) -> Result<(), RoomClosed> {
        self.message_tx
            .send(message)
            .await
            .map_err(|_| RoomClosed(self.auction_id))
    }

    /// Requests an external cancel; the room drains as if the deadline fired.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Returns `true` once the room has drained.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.message_tx.is_closed()
    }
}

/// The arbitration task state. Constructed with [`AuctionRoom::new`] and
/// consumed by [`AuctionRoom::run`].
#[derive(Debug)]
pub struct AuctionRoom {
    id: AuctionId,
    ends_at: DateTime<Utc>,
    ledger: Arc<dyn BidLedger>,
    join_rx: mpsc::Receiver<Participant>,
    leave_rx: mpsc::Receiver<Uuid>,
    message_rx: mpsc::Receiver<RoomMessage>,
    cancel_rx: watch::Receiver<bool>,
}

impl AuctionRoom {
    /// Creates a room bound to the given deadline together with its handle.
    #[must_use]
    pub fn new(
        id: AuctionId,
        ends_at: DateTime<Utc>,
        ledger: Arc<dyn BidLedger>,
    ) -> (Self, RoomHandle) {
        let (join_tx, join_rx) = mpsc::channel(INTAKE_CAPACITY);
        let (leave_tx, leave_rx) = mpsc::channel(INTAKE_CAPACITY);
        let (message_tx, message_rx) = mpsc::channel(INTAKE_CAPACITY);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let room = Self {
            id,
            ends_at,
            ledger,
            join_rx,
            leave_rx,
            message_rx,
            cancel_rx,
        };
        let handle = RoomHandle {
            auction_id: id,
            ends_at,
            join_tx,
            leave_tx,
            message_tx,
            cancel: Arc::new(cancel_tx),
        };
        (room, handle)
    }

    /// Runs the arbitration loop until the deadline elapses or an external
    /// cancel arrives, then drains and removes the lobby entry.
    pub async fn run(self, lobby: Arc<AuctionLobby>) {
        let Self {
            id,
            ends_at,
            ledger,
            mut join_rx,
            mut leave_rx,
            mut message_rx,
            mut cancel_rx,
        } = self;

        let mut members: HashMap<Uuid, mpsc::Sender<RoomMessage>> = HashMap::new();
        let remaining = (ends_at - Utc::now()).to_std().unwrap_or_default();
        let deadline = tokio::time::sleep(remaining);
        tokio::pin!(deadline);

        tracing::info!(auction_id = %id, %ends_at, "auction room running");

        loop {
            tokio::select! {
                // Deadline and cancel take priority so the auction always
                // ends on time; joins and leaves settle before messages so a
                // bid never races its own subscription.
                biased;

                () = &mut deadline => {
                    tracing::info!(auction_id = %id, "auction deadline elapsed");
                    break;
                }
                Ok(()) = cancel_rx.changed() => {
                    tracing::info!(auction_id = %id, "auction cancelled");
                    break;
                }
                Some(participant) = join_rx.recv() => {
                    tracing::info!(auction_id = %id, bidder_id = %participant.bidder_id, "bidder joined");
                    members.insert(participant.bidder_id, participant.outbound);
                }
                Some(bidder_id) = leave_rx.recv() => {
                    if members.remove(&bidder_id).is_some() {
                        tracing::info!(auction_id = %id, %bidder_id, "bidder left");
                    }
                }
                Some(message) = message_rx.recv() => {
                    handle_message(id, ledger.as_ref(), &mut members, message).await;
                }
            }
        }

        // Draining: joins the handle already accepted may still be buffered
        // when the deadline or a cancel wins the select; apply them so the
        // final notice reaches every admitted bidder. Then close the intake
        // channels so producers observe a closed room, and drop every
        // outbound sender so the pumps can exit.
        while let Ok(participant) = join_rx.try_recv() {
            members.insert(participant.bidder_id, participant.outbound);
        }
        for outbound in members.values() {
            let _ = outbound.try_send(RoomMessage::AuctionFinished);
        }
        drop(join_rx);
        drop(leave_rx);
        drop(message_rx);
        drop(members);

        lobby.close(id).await;
        tracing::info!(auction_id = %id, "auction room terminated");
    }
}

/// Processes one dequeued domain message to completion.
async fn handle_message(
    id: AuctionId,
    ledger: &dyn BidLedger,
    members: &mut HashMap<Uuid, mpsc::Sender<RoomMessage>>,
    message: RoomMessage,
) {
    match message {
        RoomMessage::PlaceBid { bidder_id, amount } => {
            match ledger.submit_bid(id, bidder_id, amount).await {
                Ok(bid) => {
                    tracing::info!(auction_id = %id, %bidder_id, amount = bid.amount, "bid accepted");
                    deliver(members, bidder_id, RoomMessage::BidAccepted { amount: bid.amount });
                    broadcast_except(
                        members,
                        bidder_id,
                        &RoomMessage::HigherBid { amount: bid.amount },
                    );
                }
                Err(err @ LedgerError::BidTooLow) => {
                    deliver(
                        members,
                        bidder_id,
                        RoomMessage::BidRejected {
                            reason: err.to_string(),
                        },
                    );
                }
                Err(err) => {
                    // Transient fault: no inline retry, the loop must keep
                    // serving other participants.
                    tracing::error!(auction_id = %id, %bidder_id, error = %err, "bid submission failed");
                    deliver(
                        members,
                        bidder_id,
                        RoomMessage::BidRejected {
                            reason: "could not process bid, try again later".to_string(),
                        },
                    );
                }
            }
        }
        RoomMessage::InvalidInput { bidder_id, detail } => {
            // Routed back to the origin only; dropped if it already left.
            deliver(
                members,
                bidder_id,
                RoomMessage::InvalidInput { bidder_id, detail },
            );
        }
        other => {
            tracing::debug!(auction_id = %id, ?other, "ignoring outbound-only message on intake");
        }
    }
}

/// Non-blocking delivery to one member. A full or closed queue marks the
/// member unresponsive and removes it; safe because only the room task
/// mutates membership.
fn deliver(
    members: &mut HashMap<Uuid, mpsc::Sender<RoomMessage>>,
    bidder_id: Uuid,
    message: RoomMessage,
) {
    if let Some(outbound) = members.get(&bidder_id)
        && outbound.try_send(message).is_err()
    {
        members.remove(&bidder_id);
        tracing::warn!(%bidder_id, "outbound queue unavailable, dropping participant");
    }
}

/// Non-blocking fan-out to every member except `except`, removing members
/// whose queues are saturated or closed.
fn broadcast_except(
    members: &mut HashMap<Uuid, mpsc::Sender<RoomMessage>>,
    except: Uuid,
    message: &RoomMessage,
) {
    let unresponsive: Vec<Uuid> = members
        .iter()
        .filter(|(bidder_id, _)| **bidder_id != except)
        .filter(|(_, outbound)| outbound.try_send(message.clone()).is_err())
        .map(|(bidder_id, _)| *bidder_id)
        .collect();

    for bidder_id in unresponsive {
        members.remove(&bidder_id);
        tracing::warn!(%bidder_id, "outbound queue saturated, dropping participant");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::ledger::memory::MemoryLedger;
    use crate::ledger::models::{AuctionRecord, Bid, NewAuction};

    async fn open_room(base_price: f64, ends_in: chrono::Duration) -> (RoomHandle, Arc<AuctionLobby>) {
        let ledger = Arc::new(MemoryLedger::new());
        let id = AuctionId::new();
        ledger
            .seed_auction(AuctionRecord {
                id,
                seller_id: Uuid::new_v4(),
                item_name: "lamp".to_string(),
                description: String::new(),
                base_price,
                ends_at: Utc::now() + ends_in,
                created_at: Utc::now(),
            })
            .await;

        let lobby = Arc::new(AuctionLobby::new());
        let (room, handle) = AuctionRoom::new(id, Utc::now() + ends_in, ledger);
        let open = lobby.open(handle.clone()).await;
        assert!(open.is_ok());
        tokio::spawn(room.run(Arc::clone(&lobby)));
        (handle, lobby)
    }

    async fn expect_msg(rx: &mut mpsc::Receiver<RoomMessage>) -> RoomMessage {
        let Ok(Some(message)) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await
        else {
            panic!("expected a message");
        };
        message
    }

    /// Joins a member with the given outbound queue capacity. The `biased`
    /// select guarantees the join is applied before any later message.
    async fn join_member(handle: &RoomHandle, capacity: usize) -> (Uuid, mpsc::Receiver<RoomMessage>) {
        let bidder_id = Uuid::new_v4();
        let (outbound, rx) = mpsc::channel(capacity);
        let joined = handle.join(Participant { bidder_id, outbound }).await;
        assert!(joined.is_ok());
        (bidder_id, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_bid_notifies_bidder_and_broadcasts_to_others() {
        let (handle, _lobby) = open_room(100.0, chrono::Duration::hours(1)).await;
        let (a, mut a_rx) = join_member(&handle, 8).await;
        let (_b, mut b_rx) = join_member(&handle, 8).await;

        let sent = handle
            .send(RoomMessage::PlaceBid {
                bidder_id: a,
                amount: 150.0,
            })
            .await;
        assert!(sent.is_ok());

        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::BidAccepted { amount: 150.0 });
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::HigherBid { amount: 150.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn stale_bid_rejected_without_broadcast() {
        let (handle, _lobby) = open_room(100.0, chrono::Duration::hours(1)).await;
        let (a, mut a_rx) = join_member(&handle, 8).await;
        let (b, mut b_rx) = join_member(&handle, 8).await;

        let _ = handle
            .send(RoomMessage::PlaceBid { bidder_id: a, amount: 150.0 })
            .await;
        let _ = handle
            .send(RoomMessage::PlaceBid { bidder_id: b, amount: 120.0 })
            .await;

        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::BidAccepted { amount: 150.0 });
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::HigherBid { amount: 150.0 });

        let RoomMessage::BidRejected { .. } = expect_msg(&mut b_rx).await else {
            panic!("expected BidRejected for the stale bid");
        };

        // The rejection reached B, so the room has fully processed both
        // bids; A must have seen nothing beyond its own acceptance.
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn higher_bid_excludes_only_the_bidder() {
        let (handle, _lobby) = open_room(0.0, chrono::Duration::hours(1)).await;
        let (a, mut a_rx) = join_member(&handle, 8).await;
        let (_b, mut b_rx) = join_member(&handle, 8).await;
        let (_c, mut c_rx) = join_member(&handle, 8).await;

        let _ = handle
            .send(RoomMessage::PlaceBid { bidder_id: a, amount: 10.0 })
            .await;

        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::BidAccepted { amount: 10.0 });
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::HigherBid { amount: 10.0 });
        assert_eq!(expect_msg(&mut c_rx).await, RoomMessage::HigherBid { amount: 10.0 });
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn saturated_member_is_dropped_others_unaffected() {
        let (handle, _lobby) = open_room(0.0, chrono::Duration::hours(1)).await;
        let (a, mut a_rx) = join_member(&handle, 8).await;
        // B never drains its capacity-1 queue.
        let (_b, mut b_rx) = join_member(&handle, 1).await;
        let (_c, mut c_rx) = join_member(&handle, 8).await;

        let _ = handle
            .send(RoomMessage::PlaceBid { bidder_id: a, amount: 10.0 })
            .await;
        let _ = handle
            .send(RoomMessage::PlaceBid { bidder_id: a, amount: 20.0 })
            .await;

        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::BidAccepted { amount: 10.0 });
        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::BidAccepted { amount: 20.0 });
        assert_eq!(expect_msg(&mut c_rx).await, RoomMessage::HigherBid { amount: 10.0 });
        assert_eq!(expect_msg(&mut c_rx).await, RoomMessage::HigherBid { amount: 20.0 });

        // B got the first broadcast (buffered), then its queue overflowed on
        // the second and the room dropped it: the channel is now closed.
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::HigherBid { amount: 10.0 });
        assert!(b_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_sends_finished_and_closes_room() {
        let (handle, lobby) = open_room(0.0, chrono::Duration::seconds(1)).await;
        let (_a, mut a_rx) = join_member(&handle, 8).await;
        let (_b, mut b_rx) = join_member(&handle, 8).await;

        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::AuctionFinished);
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::AuctionFinished);

        // Queues close after the final notice.
        assert!(a_rx.recv().await.is_none());
        assert!(b_rx.recv().await.is_none());

        // No further joins or bids are accepted.
        let (outbound, _rx) = mpsc::channel(8);
        let late_join = handle
            .join(Participant { bidder_id: Uuid::new_v4(), outbound })
            .await;
        assert!(late_join.is_err());
        let late_bid = handle
            .send(RoomMessage::PlaceBid { bidder_id: Uuid::new_v4(), amount: 1.0 })
            .await;
        assert!(late_bid.is_err());
        assert!(handle.is_closed());

        // The room removes its own lobby entry on the way out.
        for _ in 0..100 {
            if lobby.lookup(handle.auction_id()).await.is_none() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("lobby entry was not removed");
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancel_drains_room() {
        let (handle, _lobby) = open_room(0.0, chrono::Duration::hours(1)).await;
        let (_a, mut a_rx) = join_member(&handle, 8).await;

        handle.cancel();
        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::AuctionFinished);
        assert!(a_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn join_buffered_behind_cancel_still_gets_final_notice() {
        let (handle, _lobby) = open_room(0.0, chrono::Duration::hours(1)).await;

        // Cancel first, then join before the room has run: the join is
        // accepted by the handle and sits buffered while the cancel wins
        // the select. The admitted bidder must still be told the auction
        // is over.
        handle.cancel();
        let (_a, mut a_rx) = join_member(&handle, 8).await;

        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::AuctionFinished);
        assert!(a_rx.recv().await.is_none());
    }

    /// Ledger whose `submit_bid` takes a full second of (paused) time.
    #[derive(Debug)]
    struct SlowLedger(MemoryLedger);

    #[async_trait]
    impl BidLedger for SlowLedger {
        async fn create_auction(&self, auction: NewAuction) -> Result<AuctionRecord, LedgerError> {
            self.0.create_auction(auction).await
        }
        async fn get_auction(&self, id: AuctionId) -> Result<AuctionRecord, LedgerError> {
            self.0.get_auction(id).await
        }
        async fn submit_bid(
            &self,
            auction_id: AuctionId,
            bidder_id: Uuid,
            amount: f64,
        ) -> Result<Bid, LedgerError> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.0.submit_bid(auction_id, bidder_id, amount).await
        }
        async fn list_bids(&self, id: AuctionId) -> Result<Vec<Bid>, LedgerError> {
            self.0.list_bids(id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dequeued_bid_completes_before_drain() {
        let ledger = SlowLedger(MemoryLedger::new());
        let id = AuctionId::new();
        ledger
            .0
            .seed_auction(AuctionRecord {
                id,
                seller_id: Uuid::new_v4(),
                item_name: "lamp".to_string(),
                description: String::new(),
                base_price: 0.0,
                ends_at: Utc::now() + chrono::Duration::hours(1),
                created_at: Utc::now(),
            })
            .await;

        let lobby = Arc::new(AuctionLobby::new());
        let (room, handle) =
            AuctionRoom::new(id, Utc::now() + chrono::Duration::hours(1), Arc::new(ledger));
        tokio::spawn(room.run(Arc::clone(&lobby)));

        let (a, mut a_rx) = join_member(&handle, 8).await;
        let (_b, mut b_rx) = join_member(&handle, 8).await;
        let sent = handle
            .send(RoomMessage::PlaceBid { bidder_id: a, amount: 10.0 })
            .await;
        assert!(sent.is_ok());

        // Let the room dequeue the bid and block inside the ledger call,
        // then cancel while the submission is in flight.
        tokio::task::yield_now().await;
        handle.cancel();

        // The dequeued bid runs to completion before the room drains.
        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::BidAccepted { amount: 10.0 });
        assert_eq!(expect_msg(&mut a_rx).await, RoomMessage::AuctionFinished);
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::HigherBid { amount: 10.0 });
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::AuctionFinished);
    }

    #[tokio::test(start_paused = true)]
    async fn leave_is_idempotent_and_room_keeps_serving() {
        let (handle, _lobby) = open_room(0.0, chrono::Duration::hours(1)).await;
        let (a, mut a_rx) = join_member(&handle, 8).await;

        handle.leave(a).await;
        handle.leave(a).await;
        handle.leave(Uuid::new_v4()).await; // never joined

        // A's queue closes on leave.
        assert!(a_rx.recv().await.is_none());

        // The room still arbitrates bids for remaining members.
        let (b, mut b_rx) = join_member(&handle, 8).await;
        let _ = handle
            .send(RoomMessage::PlaceBid { bidder_id: b, amount: 10.0 })
            .await;
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::BidAccepted { amount: 10.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_routed_to_origin_only() {
        let (handle, _lobby) = open_room(0.0, chrono::Duration::hours(1)).await;
        let (a, mut a_rx) = join_member(&handle, 8).await;
        let (_b, mut b_rx) = join_member(&handle, 8).await;

        let _ = handle
            .send(RoomMessage::InvalidInput {
                bidder_id: a,
                detail: "invalid json".to_string(),
            })
            .await;
        // From a non-member: dropped silently.
        let _ = handle
            .send(RoomMessage::InvalidInput {
                bidder_id: Uuid::new_v4(),
                detail: "invalid json".to_string(),
            })
            .await;

        let RoomMessage::InvalidInput { bidder_id, .. } = expect_msg(&mut a_rx).await else {
            panic!("expected InvalidInput echo");
        };
        assert_eq!(bidder_id, a);

        // Prove the room is still alive and B saw neither notice.
        let _ = handle
            .send(RoomMessage::PlaceBid { bidder_id: a, amount: 10.0 })
            .await;
        assert_eq!(expect_msg(&mut b_rx).await, RoomMessage::HigherBid { amount: 10.0 });
    }

    /// Ledger that always fails with a storage fault.
    #[derive(Debug)]
    struct FaultyLedger;

    #[async_trait]
    impl BidLedger for FaultyLedger {
        async fn create_auction(&self, _: NewAuction) -> Result<AuctionRecord, LedgerError> {
            Err(LedgerError::Storage("down".to_string()))
        }
        async fn get_auction(&self, id: AuctionId) -> Result<AuctionRecord, LedgerError> {
            Err(LedgerError::AuctionNotFound(id))
        }
        async fn submit_bid(&self, _: AuctionId, _: Uuid, _: f64) -> Result<Bid, LedgerError> {
            Err(LedgerError::Storage("down".to_string()))
        }
        async fn list_bids(&self, _: AuctionId) -> Result<Vec<Bid>, LedgerError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn storage_fault_surfaced_to_bidder_only() {
        let lobby = Arc::new(AuctionLobby::new());
        let (room, handle) = AuctionRoom::new(
            AuctionId::new(),
            Utc::now() + chrono::Duration::hours(1),
            Arc::new(FaultyLedger),
        );
        tokio::spawn(room.run(Arc::clone(&lobby)));

        let (a, mut a_rx) = join_member(&handle, 8).await;
        let (_b, mut b_rx) = join_member(&handle, 8).await;

        let _ = handle
            .send(RoomMessage::PlaceBid { bidder_id: a, amount: 10.0 })
            .await;

        let RoomMessage::BidRejected { reason } = expect_msg(&mut a_rx).await else {
            panic!("expected generic BidRejected");
        };
        assert!(!reason.is_empty());
        assert!(b_rx.try_recv().is_err());
    }
}
