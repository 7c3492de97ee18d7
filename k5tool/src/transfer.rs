//! Page-wise reads and writes.
//!
//! A transfer is split into 128-byte pages (the last one may be shorter).
//! Ranges that end inside the first 8 KiB use the flat commands, anything
//! else uses the banked commands for every page. Writes are checked against
//! the radio's acknowledgement; there is no rollback when a page fails.

use std::ops::ControlFlow;

use log::{debug, trace};

use crate::error::{TransferError, TransportError};
use crate::memory::{AddressSpace, Page, Regime, TransferPlan};
use crate::port::Port;
use crate::protocol::command::{CommandFrame, READ_DATA_OFFSET, WRITE_ACK_OPCODE, is_write_ack};
use crate::transport::Transport;

/// Progress of a running transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress<'a> {
    /// What is being transferred.
    pub label: &'a str,
    /// Pages done so far.
    pub completed_pages: usize,
    /// Pages in the transfer.
    pub total_pages: usize,
}

impl TransferProgress<'_> {
    /// Completion between 0.0 and 1.0.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total_pages == 0 {
            1.0
        } else {
            self.completed_pages as f64 / self.total_pages as f64
        }
    }
}

/// Progress callback. Returning `ControlFlow::Break(())` stops the transfer
/// before the next page.
pub type ProgressFn<'a> = dyn FnMut(&TransferProgress<'_>) -> ControlFlow<()> + 'a;

/// Progress callback that never cancels.
pub fn ignore_progress(_: &TransferProgress<'_>) -> ControlFlow<()> {
    ControlFlow::Continue(())
}

/// Moves buffers between the host and the radio's EEPROM.
pub struct TransferEngine<'t, P: Port> {
    transport: &'t mut Transport<P>,
    space: AddressSpace,
}

impl<'t, P: Port> TransferEngine<'t, P> {
    /// Engine over `transport`, bounded by `space`.
    pub fn new(transport: &'t mut Transport<P>, space: AddressSpace) -> Self {
        Self { transport, space }
    }

    /// Read `len` bytes starting at logical address `start`.
    pub fn read(
        &mut self,
        start: u32,
        len: usize,
        label: &str,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Vec<u8>, TransferError> {
        let plan = self.space.plan(start, len)?;
        debug!(
            "Reading {label}: {len} bytes at 0x{start:05X} ({:?}, {} pages)",
            plan.regime,
            plan.page_count()
        );

        let mut out = Vec::with_capacity(len);
        let total = plan.page_count();
        for page in plan.pages() {
            let data = self.read_page(&plan, &page)?;
            out.extend_from_slice(&data);
            report(label, &page, total, progress)?;
        }
        Ok(out)
    }

    /// Write `data` starting at logical address `start`.
    pub fn write(
        &mut self,
        start: u32,
        data: &[u8],
        label: &str,
        progress: &mut ProgressFn<'_>,
    ) -> Result<(), TransferError> {
        let plan = self.space.plan(start, data.len())?;
        debug!(
            "Writing {label}: {} bytes at 0x{start:05X} ({:?}, {} pages)",
            data.len(),
            plan.regime,
            plan.page_count()
        );

        let total = plan.page_count();
        for page in plan.pages() {
            self.write_page(&plan, &page, &data[page.range.clone()])?;
            report(label, &page, total, progress)?;
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_page(&mut self, plan: &TransferPlan, page: &Page) -> Result<Vec<u8>, TransferError> {
        let len = page.len() as u8;
        let body = match plan.regime {
            Regime::Flat => CommandFrame::read_eeprom(page.address.offset, len),
            Regime::Banked => {
                CommandFrame::read_extra_eeprom(page.address.bank, page.address.offset, len)
            },
        }
        .build();
        trace!("Read page {} at {}", page.index, page.address);

        let reply = self.exchange(page.index, &body)?;
        let data = reply.get(READ_DATA_OFFSET..).unwrap_or_default();
        if data.len() < page.len() {
            return Err(TransferError::ShortPage {
                page: page.index,
                expected: page.len(),
                actual: data.len(),
            });
        }
        Ok(data[..page.len()].to_vec())
    }

    fn write_page(
        &mut self,
        plan: &TransferPlan,
        page: &Page,
        chunk: &[u8],
    ) -> Result<(), TransferError> {
        let (frame, echo) = match plan.regime {
            Regime::Flat => (
                CommandFrame::write_eeprom(page.address.offset, chunk),
                page.address.offset,
            ),
            Regime::Banked => (
                CommandFrame::write_extra_eeprom(page.address.bank, page.address.offset, chunk),
                page.address.bank,
            ),
        };
        let body = frame
            .map_err(|e| TransferError::Transport {
                page: page.index,
                source: e.into(),
            })?
            .build();
        trace!("Write page {} at {}", page.index, page.address);

        let reply = self.exchange(page.index, &body)?;
        if !is_write_ack(&reply, echo) {
            return Err(TransferError::Unacknowledged {
                page: page.index,
                expected_opcode: WRITE_ACK_OPCODE,
                expected_echo: echo,
                reply: reply.into_iter().take(8).collect(),
            });
        }
        Ok(())
    }

    fn exchange(&mut self, page: usize, body: &[u8]) -> Result<Vec<u8>, TransferError> {
        self.transport
            .exchange(body)
            .map_err(|source: TransportError| TransferError::Transport { page, source })
    }
}

fn report(
    label: &str,
    page: &Page,
    total: usize,
    progress: &mut ProgressFn<'_>,
) -> Result<(), TransferError> {
    let completed_pages = page.index + 1;
    let event = TransferProgress {
        label,
        completed_pages,
        total_pages: total,
    };
    if progress(&event).is_break() && completed_pages < total {
        debug!("{label}: cancelled after {completed_pages}/{total} pages");
        return Err(TransferError::Cancelled { completed_pages });
    }
    Ok(())
}
