//! Moderated selection: no automatic choice, ever

use crate::discussion::entities::Discussion;
use crate::discussion::participant::Participant;

/// A moderated discussion never auto-selects; the next speaker arrives as
/// an explicit moderator decision through the command surface.
pub(super) fn next_participant<'a>() -> Option<&'a Participant> {
    None
}

/// Only the speaker the moderator already appointed holds the floor
pub(super) fn can_take_turn(participant: &Participant, discussion: &Discussion) -> bool {
    discussion.is_current_speaker(&participant.id)
}
