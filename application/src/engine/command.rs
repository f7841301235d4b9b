//! Actor command vocabulary
//!
//! One inbound queue per discussion actor, consumed sequentially. Inbound
//! bus commands are translated into exactly these commands, so they pass
//! the same validation as client commands.

use crate::error::EngineError;
use crate::use_cases::lifecycle::ParticipantSpec;
use parley_domain::{Participant, ParticipantId, PrincipalId};
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

pub(crate) enum ActorCommand {
    Start {
        started_by: PrincipalId,
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    End {
        reason: String,
        reply: Reply<()>,
    },
    AddParticipant {
        spec: ParticipantSpec,
        reply: Reply<Participant>,
    },
    RemoveParticipant {
        participant_id: ParticipantId,
        reply: Reply<()>,
    },
    SendMessage {
        sender: PrincipalId,
        content: String,
        reply: Reply<()>,
    },
    AdvanceTurn {
        requested_by: PrincipalId,
        target: Option<ParticipantId>,
        reply: Reply<()>,
    },
}

impl ActorCommand {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            ActorCommand::Start { .. } => "start",
            ActorCommand::Pause { .. } => "pause",
            ActorCommand::Resume { .. } => "resume",
            ActorCommand::End { .. } => "end",
            ActorCommand::AddParticipant { .. } => "add_participant",
            ActorCommand::RemoveParticipant { .. } => "remove_participant",
            ActorCommand::SendMessage { .. } => "send_message",
            ActorCommand::AdvanceTurn { .. } => "advance_turn",
        }
    }
}
