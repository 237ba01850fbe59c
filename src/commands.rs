use crate::messages::MessageId;

#[derive(thiserror::Error, Debug, Clone)]
#[error("`{0}` is neither a known message name nor a known data-id")]
pub struct UnknownMessage(String);

/// Parse a message given either by its name or by its numeric data-id.
pub fn parse_message(s: &str) -> Result<MessageId, UnknownMessage> {
    MessageId::from_name(s)
        .or_else(|| s.parse::<u8>().ok().and_then(MessageId::from_id))
        .ok_or_else(|| UnknownMessage(s.to_string()))
}

/// Render an error along with the chain of errors that caused it, one per line.
pub fn error_report(error: &dyn std::error::Error) -> String {
    let mut report = format!("error: {error}");
    let mut cause = error.source();
    while let Some(e) = cause {
        report.push_str(&format!("\n  because: {e}"));
        cause = e.source();
    }
    report
}

pub mod entities {
    use crate::output::{self, Record};
    use crate::registry::{self, Entity, EntityKind, LoadError};

    /// Search and output the known entities.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        registry: registry::Args,
        #[clap(flatten)]
        output: output::Args,
        /// Only list entities whose key, message or description contain this text.
        filter: Option<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not load the entity schema")]
        Registry(#[source] LoadError),
        #[error("could not output the entities")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct EntityRecord<'a> {
        pub id: u8,
        #[serde(flatten)]
        pub entity: &'a Entity,
    }

    impl EntityRecord<'_> {
        pub fn is_match(&self, pattern: &str) -> bool {
            let pattern = pattern.to_lowercase();
            [&*self.entity.key, self.entity.message.name(), &*self.entity.description]
                .into_iter()
                .any(|text| text.to_lowercase().contains(&pattern))
        }

        fn attributes(&self) -> String {
            match &self.entity.kind {
                EntityKind::Sensor | EntityKind::BinarySensor => String::new(),
                EntityKind::Switch { restore_mode } => restore_mode.to_string(),
                EntityKind::Setpoint(setpoint) => {
                    let mut attributes =
                        format!("{}..={} step {}", setpoint.min, setpoint.max, setpoint.step);
                    if let Some(bound) = &setpoint.auto_min_value {
                        attributes += &format!(", min from {} {}", bound.message, bound.field);
                    }
                    if let Some(bound) = &setpoint.auto_max_value {
                        attributes += &format!(", max from {} {}", bound.message, bound.field);
                    }
                    attributes
                }
            }
        }
    }

    impl Record for EntityRecord<'_> {
        const HEADERS: &'static [&'static str] = &[
            "Category",
            "Key",
            "Message",
            "ID",
            "Field",
            "Updated",
            "Attributes",
            "Description",
        ];

        fn table_row(&self) -> Vec<String> {
            let entity = self.entity;
            vec![
                entity.category().to_string(),
                entity.key.clone(),
                entity.message.to_string(),
                self.id.to_string(),
                entity.field.to_string(),
                if entity.keep_updated { "continuously" } else { "once" }.to_string(),
                self.attributes(),
                entity.description.clone(),
            ]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let registry = args.registry.to_registry().map_err(Error::Registry)?;
        let mut output = args.output.to_output().map_err(Error::Output)?;
        for entity in registry.entities() {
            let record = EntityRecord { id: entity.message.id(), entity };
            if let Some(pattern) = &args.filter {
                if !record.is_match(pattern) {
                    continue;
                }
            }
            output.record(&record).map_err(Error::Output)?;
        }
        output.commit().map_err(Error::Output)
    }
}

pub mod messages {
    use crate::messages::MessageId;
    use crate::output::{self, Record};

    /// Output the catalog of known OpenTherm messages.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        /// Only list messages whose name or description contain this text.
        filter: Option<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not output the messages")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct MessageRecord {
        pub id: u8,
        pub name: &'static str,
        pub description: &'static str,
    }

    impl From<MessageId> for MessageRecord {
        fn from(message: MessageId) -> Self {
            Self { id: message.id(), name: message.name(), description: message.description() }
        }
    }

    impl MessageRecord {
        pub fn is_match(&self, pattern: &str) -> bool {
            let pattern = pattern.to_lowercase();
            self.name.to_lowercase().contains(&pattern)
                || self.description.to_lowercase().contains(&pattern)
        }
    }

    impl Record for MessageRecord {
        const HEADERS: &'static [&'static str] = &["ID", "Name", "Description"];
        fn table_row(&self) -> Vec<String> {
            vec![self.id.to_string(), self.name.to_string(), self.description.to_string()]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let mut output = args.output.to_output().map_err(Error::Output)?;
        for &message in MessageId::all() {
            let record = MessageRecord::from(message);
            if let Some(pattern) = &args.filter {
                if !record.is_match(pattern) {
                    continue;
                }
            }
            output.record(&record).map_err(Error::Output)?;
        }
        output.commit().map_err(Error::Output)
    }
}

pub mod resolve {
    use std::path::PathBuf;

    use crate::messages::{Direction, MessageId};
    use crate::output::{self, Record};
    use crate::registry::{self, EntityRef, LoadError, UnknownEntityKey};
    use crate::resolver::{self, Cadence, RequiredMessage};
    use crate::selection::{self, Selection};

    /// Compute the messages that need to be exchanged with the device for a set of entities.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        registry: registry::Args,
        #[clap(flatten)]
        output: output::Args,
        /// Enabled entities, as `category:key` (e.g. `binary_sensor:flame_on`).
        entities: Vec<EntityRef>,
        /// A JSON file listing the enabled entity keys per category.
        #[arg(long, short = 's')]
        selection: Option<PathBuf>,
        /// Also show whether each message is exchanged once or continuously.
        #[arg(long)]
        plan: bool,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not load the entity schema")]
        Registry(#[source] LoadError),
        #[error("could not load the entity selection")]
        Selection(#[source] selection::Error),
        #[error("could not resolve the required messages")]
        Resolve(#[source] UnknownEntityKey),
        #[error("could not output the required messages")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct RequiredRecord {
        pub direction: Direction,
        pub id: u8,
        pub message: MessageId,
    }

    impl From<RequiredMessage> for RequiredRecord {
        fn from(required: RequiredMessage) -> Self {
            Self {
                direction: required.direction,
                id: required.message.id(),
                message: required.message,
            }
        }
    }

    impl Record for RequiredRecord {
        const HEADERS: &'static [&'static str] = &["Direction", "ID", "Message"];
        fn table_row(&self) -> Vec<String> {
            vec![self.direction.to_string(), self.id.to_string(), self.message.to_string()]
        }
    }

    #[derive(serde::Serialize)]
    pub struct PlannedRecord {
        pub cadence: Cadence,
        #[serde(flatten)]
        pub required: RequiredRecord,
    }

    impl Record for PlannedRecord {
        const HEADERS: &'static [&'static str] = &["Cadence", "Direction", "ID", "Message"];
        fn table_row(&self) -> Vec<String> {
            let mut row = vec![self.cadence.to_string()];
            row.extend(self.required.table_row());
            row
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let registry = args.registry.to_registry().map_err(Error::Registry)?;
        let mut selection = match &args.selection {
            Some(path) => Selection::load(path).map_err(Error::Selection)?,
            None => Selection::default(),
        };
        for entity in args.entities {
            selection.insert(entity);
        }
        if selection.is_empty() {
            tracing::warn!("no entities are enabled, nothing needs to be exchanged");
        }
        let enabled = selection.entity_refs().collect::<Vec<_>>();
        if args.plan {
            let plan = resolver::message_plan(&registry, &enabled).map_err(Error::Resolve)?;
            let mut output = args.output.to_output().map_err(Error::Output)?;
            for (cadence, required) in plan.iter() {
                let record = PlannedRecord { cadence, required: required.into() };
                output.record(&record).map_err(Error::Output)?;
            }
            output.commit().map_err(Error::Output)
        } else {
            let required =
                resolver::required_messages(&registry, &enabled).map_err(Error::Resolve)?;
            let mut output = args.output.to_output().map_err(Error::Output)?;
            for message in required {
                output.record(&RequiredRecord::from(message)).map_err(Error::Output)?;
            }
            output.commit().map_err(Error::Output)
        }
    }
}

pub mod decode {
    use crate::codec::{Field, Payload, Value};
    use crate::messages::MessageId;
    use crate::output::{self, Record};
    use crate::registry::{self, EntityRef, LoadError};
    use crate::schema::Category;

    /// Decode a message payload into the values of every entity it carries.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        registry: registry::Args,
        #[clap(flatten)]
        output: output::Args,
        /// Only decode the values of entities in this category.
        #[arg(long, short = 'c')]
        category: Option<Category>,
        /// The message, by name (e.g. `Status`) or data-id.
        #[arg(value_parser = super::parse_message)]
        message: MessageId,
        /// The two data bytes of the message, in hex (e.g. `0x0190`).
        payload: Payload,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not load the entity schema")]
        Registry(#[source] LoadError),
        #[error("could not output the decoded values")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct DecodedRecord {
        pub entity: EntityRef,
        pub field: Field,
        pub value: Value,
    }

    impl Record for DecodedRecord {
        const HEADERS: &'static [&'static str] = &["Entity", "Field", "Value"];
        fn table_row(&self) -> Vec<String> {
            vec![self.entity.to_string(), self.field.to_string(), self.value.to_string()]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let registry = args.registry.to_registry().map_err(Error::Registry)?;
        let mut output = args.output.to_output().map_err(Error::Output)?;
        let mut decoded = 0;
        for entity in registry.entities_for_message(args.message) {
            if args.category.is_some_and(|c| c != entity.category()) {
                continue;
            }
            let value = entity.decode(args.payload);
            tracing::trace!(entity = %entity.entity_ref(), %value, "decoded");
            let record = DecodedRecord { entity: entity.entity_ref(), field: entity.field, value };
            output.record(&record).map_err(Error::Output)?;
            decoded += 1;
        }
        if decoded == 0 {
            tracing::warn!(data_id = args.message.id(), "no entities are carried by this message");
        }
        output.commit().map_err(Error::Output)
    }
}

pub mod encode {
    use crate::codec::{Payload, Value};
    use crate::messages::{Direction, MessageId};
    use crate::output::{self, Record};
    use crate::registry::{self, EncodeError, EntityRef, LoadError, UnknownEntityKey};

    /// Encode a value for a switch or a setpoint into a message payload.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        registry: registry::Args,
        #[clap(flatten)]
        output: output::Args,
        /// The entity, as `category:key` (e.g. `setpoint:t_set`).
        entity: EntityRef,
        /// The value to encode: `true`/`false` (or `on`/`off`) for switches, a number otherwise.
        #[arg(allow_hyphen_values = true)]
        value: Value,
        /// The payload to merge the value into.
        ///
        /// Switches that share a message only change their own bit, so the current state of the
        /// other switches can be passed in here.
        #[arg(long, short = 'b', default_value = "0x0000")]
        base: Payload,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not load the entity schema")]
        Registry(#[source] LoadError),
        #[error("could not find the entity to encode")]
        Lookup(#[source] UnknownEntityKey),
        #[error("could not encode the value")]
        Encode(#[source] EncodeError),
        #[error("could not output the encoded message")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct EncodedRecord {
        pub entity: EntityRef,
        pub direction: Direction,
        pub id: u8,
        pub message: MessageId,
        pub payload: Payload,
    }

    impl Record for EncodedRecord {
        const HEADERS: &'static [&'static str] = &["Entity", "Direction", "ID", "Message", "Payload"];
        fn table_row(&self) -> Vec<String> {
            vec![
                self.entity.to_string(),
                self.direction.to_string(),
                self.id.to_string(),
                self.message.to_string(),
                self.payload.to_string(),
            ]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let registry = args.registry.to_registry().map_err(Error::Registry)?;
        let entity = registry.lookup(&args.entity).map_err(Error::Lookup)?;
        let payload = entity.encode(args.value, args.base).map_err(Error::Encode)?;
        let mut output = args.output.to_output().map_err(Error::Output)?;
        let record = EncodedRecord {
            entity: args.entity,
            direction: entity.category().direction(),
            id: entity.message.id(),
            message: entity.message,
            payload,
        };
        output.record(&record).map_err(Error::Output)?;
        output.commit().map_err(Error::Output)
    }
}
