//! Command batches and the sequencer flushing them over the transport

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::command::{Command, LOCK, UNLOCK};
use crate::error::{BatchOverflow, ErrorKind};
use crate::identity::PanelRev;
use crate::traits::{self, CommandTransport};

/// Longest packet (address + parameters) a batch can hold
pub const MAX_PACKET_LEN: usize = 40;
/// Number of packets a batch can hold
pub const MAX_BATCH_PACKETS: usize = 48;

/// One packet: register address followed by its parameters
pub type Packet = Vec<u8, MAX_PACKET_LEN>;

/// Ordered list of packets built in memory before anything goes out
///
/// A batch is either sent as a whole or not at all, so a command group never
/// reaches the panel half written.
#[derive(Debug, Default, Clone)]
pub struct CommandBatch {
    packets: Vec<Packet, MAX_BATCH_PACKETS>,
}

impl CommandBatch {
    /// Creates an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, command: Command, params: &[u8]) -> Result<(), BatchOverflow> {
        let packet = packet(command, params)?;
        self.packets.push(packet).map_err(|_| BatchOverflow)
    }

    /// Points the next vendor register write at parameter `offset` of `register`
    pub(crate) fn offset(&mut self, offset: u16, register: Command) -> Result<(), BatchOverflow> {
        let [hi, lo] = offset.to_be_bytes();
        self.add(
            Command::GlobalParam,
            &[hi, lo, traits::Command::address(register)],
        )
    }

    /// Wraps whatever `f` adds in the unlock / lock pair
    pub(crate) fn unlocked<F>(&mut self, f: F) -> Result<(), BatchOverflow>
    where
        F: FnOnce(&mut CommandBatch) -> Result<(), BatchOverflow>,
    {
        self.add(Command::TestKey, &UNLOCK)?;
        f(self)?;
        self.add(Command::TestKey, &LOCK)
    }

    /// Number of packets in the batch
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// True if nothing was added yet
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Iterates over the raw packets in issue order
    pub fn packets(&self) -> impl Iterator<Item = &[u8]> {
        self.packets.iter().map(|p| p.as_slice())
    }

    pub(crate) fn clear(&mut self) {
        self.packets.clear();
    }
}

fn packet(command: Command, params: &[u8]) -> Result<Packet, BatchOverflow> {
    let mut packet = Packet::new();
    packet
        .push(traits::Command::address(command))
        .map_err(|_| BatchOverflow)?;
    packet.extend_from_slice(params).map_err(|_| BatchOverflow)?;
    Ok(packet)
}

/// Revision gate of a [CmdEntry]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RevGate {
    Always,
    Below(PanelRev),
    AtLeast(PanelRev),
}

impl RevGate {
    pub(crate) fn admits(self, rev: PanelRev) -> bool {
        match self {
            RevGate::Always => true,
            RevGate::Below(limit) => rev < limit,
            RevGate::AtLeast(limit) => rev >= limit,
        }
    }
}

/// One entry of a static command set
#[derive(Debug, Clone, Copy)]
pub(crate) struct CmdEntry {
    pub command: Command,
    pub params: &'static [u8],
    pub gate: RevGate,
    /// Delay after the entry, in ms. The batch is flushed before sleeping.
    pub delay_ms: u32,
}

impl CmdEntry {
    pub(crate) const fn new(command: Command, params: &'static [u8]) -> Self {
        CmdEntry {
            command,
            params,
            gate: RevGate::Always,
            delay_ms: 0,
        }
    }

    pub(crate) const fn gated(self, gate: RevGate) -> Self {
        CmdEntry { gate, ..self }
    }

    pub(crate) const fn delay(self, delay_ms: u32) -> Self {
        CmdEntry { delay_ms, ..self }
    }
}

/// Flushes batches and single commands over a [CommandTransport]
pub struct Sequencer<T> {
    transport: T,
}

impl<T: CommandTransport> Sequencer<T> {
    /// Wraps a transport
    pub fn new(transport: T) -> Self {
        Sequencer { transport }
    }

    /// Sends every packet of `batch` in order and flushes the transport
    ///
    /// An empty batch is not sent at all.
    pub fn send(&mut self, batch: &CommandBatch) -> Result<(), ErrorKind<T::Error>> {
        if batch.is_empty() {
            return Ok(());
        }
        for packet in batch.packets() {
            self.transport.write(packet).map_err(ErrorKind::Transport)?;
        }
        self.transport.flush().map_err(ErrorKind::Transport)
    }

    /// Writes a single command and flushes right away
    pub(crate) fn write(
        &mut self,
        command: Command,
        params: &[u8],
    ) -> Result<(), ErrorKind<T::Error>> {
        let packet = packet(command, params)?;
        self.transport
            .write_and_flush(&packet)
            .map_err(ErrorKind::Transport)
    }

    /// Reads `buf.len()` bytes from `command`, returns how many arrived
    pub(crate) fn read(
        &mut self,
        command: Command,
        buf: &mut [u8],
    ) -> Result<usize, ErrorKind<T::Error>> {
        self.transport
            .read(traits::Command::address(command), buf)
            .map_err(ErrorKind::Transport)
    }

    /// Sends the entries of `set` admitted for `rev`
    pub(crate) fn send_cmdset<D: DelayNs>(
        &mut self,
        set: &[CmdEntry],
        rev: PanelRev,
        delay: &mut D,
    ) -> Result<(), ErrorKind<T::Error>> {
        let mut batch = CommandBatch::new();
        for entry in set.iter().filter(|e| e.gate.admits(rev)) {
            batch.add(entry.command, entry.params)?;
            if entry.delay_ms > 0 {
                self.send(&batch)?;
                batch.clear();
                delay.delay_ms(entry.delay_ms);
            }
        }
        self.send(&batch)
    }

    pub(crate) fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ErrorKind<T::Error>> {
        self.transport.reset(delay).map_err(ErrorKind::Transport)
    }

    /// Access to the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Gives the transport back
    pub fn release(self) -> T {
        self.transport
    }
}
