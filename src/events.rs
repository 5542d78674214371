//! Event types for ImpactSonic

use crate::playback::InstanceId;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ImpactSonicEvent {
    InstanceStarted {
        instance_id: InstanceId,
        asset: Arc<str>,
    },
    InstanceCompleted {
        instance_id: InstanceId,
        asset: Arc<str>,
    },
    InstanceStopped {
        instance_id: InstanceId,
        asset: Arc<str>,
    },
    /// The mixer or its command queue was full; the instance never played.
    InstanceDropped {
        instance_id: InstanceId,
        asset: Arc<str>,
    },
    EngineStarted,
    EngineStopped,
    EngineError {
        error: String,
    },
}

impl ImpactSonicEvent {
    pub fn instance_id(&self) -> Option<InstanceId> {
        match self {
            Self::InstanceStarted { instance_id, .. }
            | Self::InstanceCompleted { instance_id, .. }
            | Self::InstanceStopped { instance_id, .. }
            | Self::InstanceDropped { instance_id, .. } => Some(*instance_id),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::InstanceDropped { .. } | Self::EngineError { .. }
        )
    }
}

/// Queues `event` without blocking. A full queue drops the event; nobody
/// has polled for a while.
pub(crate) fn publish(events: &Sender<ImpactSonicEvent>, event: ImpactSonicEvent) {
    if let Err(TrySendError::Full(event)) = events.try_send(event) {
        log::trace!("Event queue full, dropping {:?}", event);
    }
}
