//! Lock-free command mailbox between external adapters and the tick loop.
//!
//! Producers (relay threads, console handlers, signal handlers) post
//! commands through a shared reference; the orchestrator drains the queue
//! at the top of each tick. Backed by a fixed-capacity MPMC ring so a
//! burst of operator commands can never block a producer or allocate on
//! the hot path.

use heapless::mpmc::MpMcQueue;

use crate::app::commands::RunnerCommand;

/// Queue depth. Commands arrive at human rates; 16 slots of headroom is
/// already generous.
pub const MAILBOX_DEPTH: usize = 16;

/// Shared command queue. `post` and `take` both go through `&self`, so a
/// single instance can be shared across threads without a mutex.
pub struct CommandMailbox {
    queue: MpMcQueue<RunnerCommand, MAILBOX_DEPTH>,
}

impl CommandMailbox {
    pub const fn new() -> Self {
        Self {
            queue: MpMcQueue::new(),
        }
    }

    /// Post a command. On a full queue the command is handed back to the
    /// caller; dropping a Stop silently is not acceptable.
    pub fn post(&self, command: RunnerCommand) -> Result<(), RunnerCommand> {
        self.queue.enqueue(command)
    }

    /// Take the oldest pending command, if any.
    pub fn take(&self) -> Option<RunnerCommand> {
        self.queue.dequeue()
    }
}

impl Default for CommandMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_come_out_in_post_order() {
        let mailbox = CommandMailbox::new();
        mailbox.post(RunnerCommand::Start).unwrap();
        mailbox
            .post(RunnerCommand::Reconfigure {
                field: "target_rpm".into(),
                value: 5000.0,
            })
            .unwrap();
        mailbox.post(RunnerCommand::Stop).unwrap();

        assert!(matches!(mailbox.take(), Some(RunnerCommand::Start)));
        assert!(matches!(
            mailbox.take(),
            Some(RunnerCommand::Reconfigure { .. })
        ));
        assert!(matches!(mailbox.take(), Some(RunnerCommand::Stop)));
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn full_mailbox_returns_the_command() {
        let mailbox = CommandMailbox::new();
        for _ in 0..MAILBOX_DEPTH {
            mailbox.post(RunnerCommand::Start).unwrap();
        }
        let rejected = mailbox.post(RunnerCommand::Stop);
        assert!(matches!(rejected, Err(RunnerCommand::Stop)));
    }
}
