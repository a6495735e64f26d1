use crate::message::{Block1, ExchangeId};
use log::{debug, warn};
use thiserror::Error;

/// Reassembly buffer of a writable resource.
///
/// A block-wise write is accumulated until its last block arrives. While
/// it is in progress the inbox belongs to that exchange: any other
/// exchange writing to the same resource is turned away with
/// [`InboxError::Busy`].
///
/// Blocks must arrive in order. A retransmission of the block just
/// accepted is acknowledged again without being appended.
#[derive(Debug)]
pub struct Inbox {
    limit: usize,
    owner: Option<ExchangeId>,
    /// block number the owner sends next
    next_num: u32,
    buffer: Vec<u8>,
}

/// Outcome of a write delivered to an [`Inbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// more blocks are expected
    Continue,
    /// the whole payload
    Complete(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InboxError {
    #[error("Resource is busy with another request ({owner})")]
    Busy { owner: ExchangeId },
    #[error("Server reached internal buffer limit. Shorten payload.")]
    PayloadTooLarge { limit: usize },
    #[error("Block {num} received out of sequence")]
    OutOfSequence { num: u32 },
}

impl Inbox {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            owner: None,
            next_num: 0,
            buffer: Vec::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// the exchange currently writing, if any
    pub fn owner(&self) -> Option<ExchangeId> {
        self.owner
    }

    pub fn is_busy(&self) -> bool {
        self.owner.is_some()
    }

    /// Accept one block (or a whole payload when `block1` is `None`).
    ///
    /// On [`InboxError::PayloadTooLarge`] and
    /// [`InboxError::OutOfSequence`] the partial payload of `exchange` is
    /// dropped. [`InboxError::Busy`] leaves the owner's transfer untouched.
    pub fn receive(
        &mut self,
        exchange: ExchangeId,
        block1: Option<Block1>,
        payload: &[u8],
    ) -> Result<Delivery, InboxError> {
        if let Some(owner) = self.owner
            && owner != exchange
        {
            warn!("write from exchange {exchange} rejected, inbox owned by {owner}");
            return Err(InboxError::Busy { owner });
        }

        let Some(Block1 { num, more }) = block1 else {
            self.reset();
            if payload.len() > self.limit {
                return Err(InboxError::PayloadTooLarge { limit: self.limit });
            }
            return Ok(Delivery::Complete(payload.to_vec()));
        };

        if self.owner.is_some() {
            if self.next_num.checked_sub(1) == Some(num) {
                debug!("block {num} of exchange {exchange} repeated");
                return Ok(Delivery::Continue);
            }
            if num != self.next_num {
                warn!(
                    "block {num} of exchange {exchange} out of sequence, expected {}",
                    self.next_num
                );
                self.reset();
                return Err(InboxError::OutOfSequence { num });
            }
        } else if num != 0 {
            return Err(InboxError::OutOfSequence { num });
        } else {
            self.buffer.clear();
        }

        if self.buffer.len() + payload.len() > self.limit {
            self.reset();
            return Err(InboxError::PayloadTooLarge { limit: self.limit });
        }
        self.buffer.extend_from_slice(payload);

        if more {
            self.owner = Some(exchange);
            self.next_num = num.wrapping_add(1);
            debug!(
                "block {num} of exchange {exchange} buffered ({} bytes)",
                self.buffer.len()
            );
            Ok(Delivery::Continue)
        } else {
            self.owner = None;
            self.next_num = 0;
            Ok(Delivery::Complete(std::mem::take(&mut self.buffer)))
        }
    }

    fn reset(&mut self) {
        self.owner = None;
        self.next_num = 0;
        self.buffer.clear();
    }
}
