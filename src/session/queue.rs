use heapless::{Deque, Vec};

use crate::climate::ClimateDelta;
use crate::protocol::types::TenthDegreesC;
use crate::protocol::SetRequest;

/// Commands waiting for the unit, including the one in flight.
pub const QUEUE_DEPTH: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandId(u16);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Settings(ClimateDelta),
    /// `None` returns the unit to its internal temperature sensor.
    RemoteTemperature(Option<TenthDegreesC>),
}

impl Command {
    fn supersedes(&self, older: &Command) -> bool {
        match (self, older) {
            (Command::Settings(newer), Command::Settings(older)) => newer.covers(older),
            (Command::RemoteTemperature(_), Command::RemoteTemperature(_)) => true,
            _ => false,
        }
    }

    pub fn to_request(&self) -> SetRequest {
        match self {
            Command::Settings(delta) => SetRequest::Settings(delta.to_settings()),
            Command::RemoteTemperature(temp) => SetRequest::RemoteTemperature(*temp),
        }
    }
}

/// How a queued command left the queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Acknowledged,
    /// A newer command replaced everything this one would have changed.
    Superseded,
    /// The queue was full and this was the oldest command.
    Dropped,
    /// The unit left every transmission unacknowledged, up to the failure
    /// threshold.
    Failed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingCommand {
    pub id: CommandId,
    pub command: Command,
    misses: u8,
}

impl PendingCommand {
    /// Transmissions the unit never acknowledged.
    pub fn misses(&self) -> u8 {
        self.misses
    }
}

pub type Displaced = Vec<(CommandId, CommandOutcome), { QUEUE_DEPTH + 1 }>;

#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Deque<PendingCommand, QUEUE_DEPTH>,
    next_id: u16,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `command` behind the others.
    ///
    /// The command identified by `in_flight` has already been transmitted
    /// and is never displaced. Returns the new command's id together with
    /// every command that left the queue to make room for it.
    pub fn push(&mut self, command: Command, in_flight: Option<CommandId>) -> (CommandId, Displaced) {
        let id = CommandId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let mut displaced = Displaced::new();
        let survivors = self.commands.iter()
            .filter(|p| Some(p.id) == in_flight || !command.supersedes(&p.command))
            .count();
        let mut must_drop = survivors >= QUEUE_DEPTH;

        let mut kept = Deque::new();
        while let Some(pending) = self.commands.pop_front() {
            let fixed = Some(pending.id) == in_flight;
            if !fixed && command.supersedes(&pending.command) {
                let _ = displaced.push((pending.id, CommandOutcome::Superseded));
            } else if !fixed && must_drop {
                must_drop = false;
                let _ = displaced.push((pending.id, CommandOutcome::Dropped));
            } else {
                let _ = kept.push_back(pending);
            }
        }
        self.commands = kept;

        if self.commands.push_back(PendingCommand { id, command, misses: 0 }).is_err() {
            let _ = displaced.push((id, CommandOutcome::Dropped));
        }
        (id, displaced)
    }

    pub fn front(&self) -> Option<&PendingCommand> {
        self.commands.front()
    }

    pub fn pop_front(&mut self) -> Option<PendingCommand> {
        self.commands.pop_front()
    }

    /// Counts a missed acknowledgement against the head command if it is
    /// `id`, returning its misses so far.
    pub fn record_miss(&mut self, id: CommandId) -> Option<u8> {
        let pending = self.commands.front_mut().filter(|p| p.id == id)?;
        pending.misses = pending.misses.saturating_add(1);
        Some(pending.misses)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}
