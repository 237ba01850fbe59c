//! Working out which messages need to be exchanged with the device.

use std::collections::BTreeSet;

use crate::messages::{Direction, MessageId};
use crate::registry::{Entity, EntityRef, Registry, UnknownEntityKey};

/// A message that has to be exchanged, along with the direction it needs to be exchanged in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct RequiredMessage {
    pub direction: Direction,
    pub message: MessageId,
}

impl RequiredMessage {
    pub const fn new(direction: Direction, message: MessageId) -> Self {
        Self { direction, message }
    }

    pub const fn read(message: MessageId) -> Self {
        Self::new(Direction::Read, message)
    }

    pub const fn write(message: MessageId) -> Self {
        Self::new(Direction::Write, message)
    }
}

impl std::fmt::Display for RequiredMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.direction, self.message)
    }
}

/// The messages an entity needs, each with whether it has to be repeated continuously.
fn contributions(entity: &Entity) -> impl Iterator<Item = (RequiredMessage, bool)> + '_ {
    let primary = RequiredMessage::new(entity.category().direction(), entity.message);
    let bounds = entity.setpoint().into_iter().flat_map(|setpoint| setpoint.bounds());
    std::iter::once((primary, entity.keep_updated))
        .chain(bounds.map(|bound| (RequiredMessage::read(bound.message), false)))
}

fn lookup_all<'r>(
    registry: &'r Registry,
    enabled: impl IntoIterator<Item = &'r EntityRef>,
) -> Result<Vec<&'r Entity>, UnknownEntityKey> {
    enabled.into_iter().map(|entity| registry.lookup(entity)).collect()
}

/// The set of messages that have to be exchanged for the `enabled` entities to work.
///
/// Readable entities need their message read, writable ones need it written. Setpoints
/// additionally need the messages their bounds are reported in to be read.
pub fn required_messages<'r>(
    registry: &'r Registry,
    enabled: impl IntoIterator<Item = &'r EntityRef>,
) -> Result<BTreeSet<RequiredMessage>, UnknownEntityKey> {
    let entities = lookup_all(registry, enabled)?;
    let mut result = BTreeSet::new();
    for entity in entities {
        for (message, _) in contributions(entity) {
            tracing::trace!(entity = %entity.entity_ref(), %message, "requires");
            result.insert(message);
        }
    }
    tracing::debug!(messages = result.len(), "resolved required messages");
    Ok(result)
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Cadence {
    /// Exchanged once, while initializing.
    Initial,
    /// Exchanged continuously.
    Repeating,
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}

/// The required messages, split by how often they need to be exchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct MessagePlan {
    pub initial: BTreeSet<RequiredMessage>,
    pub repeating: BTreeSet<RequiredMessage>,
}

impl MessagePlan {
    pub fn iter(&self) -> impl Iterator<Item = (Cadence, RequiredMessage)> + '_ {
        let initial = self.initial.iter().map(|m| (Cadence::Initial, *m));
        let repeating = self.repeating.iter().map(|m| (Cadence::Repeating, *m));
        initial.chain(repeating)
    }

    pub fn len(&self) -> usize {
        self.initial.len() + self.repeating.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Like [`required_messages`], but split into the messages that need to be kept up to date
/// and the ones that only need to be exchanged once.
///
/// A message is repeated if any entity that needs it keeps its value updated. Bound
/// messages are only ever read once.
pub fn message_plan<'r>(
    registry: &'r Registry,
    enabled: impl IntoIterator<Item = &'r EntityRef>,
) -> Result<MessagePlan, UnknownEntityKey> {
    let entities = lookup_all(registry, enabled)?;
    let mut plan = MessagePlan::default();
    for (message, repeating) in entities.iter().flat_map(|entity| contributions(entity)) {
        if repeating {
            plan.initial.remove(&message);
            plan.repeating.insert(message);
        } else if !plan.repeating.contains(&message) {
            plan.initial.insert(message);
        }
    }
    tracing::debug!(
        initial = plan.initial.len(),
        repeating = plan.repeating.len(),
        "planned message exchange"
    );
    Ok(plan)
}
