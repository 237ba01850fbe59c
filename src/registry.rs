//! Validated entity tables.
//!
//! A [`Registry`] is built from the raw tables in [`crate::schema`] (and optionally a JSON
//! overlay with the same shape) once, at start. Every message name and field descriptor is
//! checked then, so that lookups, decoding and message resolution never need to fail on a
//! malformed descriptor later.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::codec::{Field, InvalidDescriptor, Payload, RangeError, Value};
use crate::messages::MessageId;
use crate::schema::{Category, RawBound, RawEntity, RawSchema, RestoreMode};

/// A reference to an entity by category and key, written as `category:key`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    pub category: Category,
    pub key: String,
}

impl EntityRef {
    pub fn new(category: Category, key: impl Into<String>) -> Self {
        Self { category, key: key.into() }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.category, self.key)
    }
}

impl serde::Serialize for EntityRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` is not an entity reference of the form `category:key`")]
pub struct InvalidEntityRef(String);

impl std::str::FromStr for EntityRef {
    type Err = InvalidEntityRef;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidEntityRef(s.to_string());
        let (category, key) = s.split_once(':').ok_or_else(invalid)?;
        let category = category.parse::<Category>().map_err(|_| invalid())?;
        if key.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(category, key))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("there is no {} entity named `{}`", .0.category, .0.key)]
pub struct UnknownEntityKey(pub EntityRef);

/// A value the device reports in a message of its own, used to narrow a setpoint's range.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Bound {
    pub message: MessageId,
    pub field: Field,
}

impl Bound {
    fn decode_from(&self, payload_of: &impl Fn(MessageId) -> Option<Payload>) -> Option<f32> {
        let value = self.field.decode(payload_of(self.message)?);
        Some(value.as_f64() as f32)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Setpoint {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub auto_min_value: Option<Bound>,
    pub auto_max_value: Option<Bound>,
}

impl Setpoint {
    /// Check that `value` lies within the declared range.
    pub fn check(&self, value: Value) -> Result<(), RangeError> {
        let v = value.as_f64();
        if v.is_nan() || v < f64::from(self.min) || v > f64::from(self.max) {
            return Err(RangeError::OutsideBounds(value, self.min, self.max));
        }
        Ok(())
    }

    /// The declared range, narrowed by whatever bounds the device has reported.
    ///
    /// `payload_of` returns the last payload received for a message, if any. A bound whose
    /// message has not been received leaves that end of the range as declared. Should the
    /// device report bounds that leave nothing of the range, the declared range is used.
    pub fn effective_range(
        &self,
        payload_of: impl Fn(MessageId) -> Option<Payload>,
    ) -> (f32, f32) {
        let mut min = self.min;
        let mut max = self.max;
        if let Some(device_min) = self.auto_min_value.and_then(|b| b.decode_from(&payload_of)) {
            min = min.max(device_min);
        }
        if let Some(device_max) = self.auto_max_value.and_then(|b| b.decode_from(&payload_of)) {
            max = max.min(device_max);
        }
        if min > max {
            tracing::debug!(min, max, "device reported bounds are inverted, ignoring them");
            return (self.min, self.max);
        }
        (min, max)
    }

    /// Bounds declared for this setpoint, minimum first.
    pub fn bounds(&self) -> impl Iterator<Item = &Bound> {
        self.auto_min_value.iter().chain(self.auto_max_value.iter())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EntityKind {
    Sensor,
    BinarySensor,
    Switch { restore_mode: RestoreMode },
    Setpoint(Setpoint),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Entity {
    pub key: String,
    pub description: String,
    pub message: MessageId,
    pub field: Field,
    pub keep_updated: bool,
    #[serde(flatten)]
    pub kind: EntityKind,
}

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("`{0}` is read-only")]
    ReadOnly(EntityRef),
    #[error("could not encode a value for `{0}`")]
    Range(EntityRef, #[source] RangeError),
}

impl Entity {
    pub fn category(&self) -> Category {
        match self.kind {
            EntityKind::Sensor => Category::Sensor,
            EntityKind::BinarySensor => Category::BinarySensor,
            EntityKind::Switch { .. } => Category::Switch,
            EntityKind::Setpoint(_) => Category::Setpoint,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.category(), self.key.clone())
    }

    pub fn setpoint(&self) -> Option<&Setpoint> {
        match &self.kind {
            EntityKind::Setpoint(setpoint) => Some(setpoint),
            _ => None,
        }
    }

    pub fn decode(&self, payload: Payload) -> Value {
        self.field.decode(payload)
    }

    /// Encode a value for this entity on top of `base`.
    ///
    /// Setpoint values must lie within the declared range.
    pub fn encode(&self, value: Value, base: Payload) -> Result<Payload, EncodeError> {
        let range_error = |e: RangeError| EncodeError::Range(self.entity_ref(), e);
        match &self.kind {
            EntityKind::Sensor | EntityKind::BinarySensor => {
                return Err(EncodeError::ReadOnly(self.entity_ref()));
            }
            EntityKind::Switch { .. } => {}
            EntityKind::Setpoint(setpoint) => setpoint.check(value).map_err(range_error)?,
        }
        self.field.encode_into(value, base).map_err(range_error)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("`{0}` refers to `{1}`, which is not a known OpenTherm message")]
    UnknownMessage(EntityRef, String),
    #[error("`{0}` has an invalid field descriptor")]
    InvalidDescriptor(EntityRef, #[source] InvalidDescriptor),
    #[error("`{0}` is defined more than once")]
    DuplicateKey(EntityRef),
    #[error("`{0}` uses the field `{1}`, which does not hold a {2} value")]
    FieldKind(EntityRef, Field, &'static str),
    #[error("`{0}` is missing the `{1}` attribute")]
    MissingAttribute(EntityRef, &'static str),
    #[error("`{0}` has the `{1}` attribute, which does not apply to its category")]
    UnexpectedAttribute(EntityRef, &'static str),
    #[error("`{0}` has an invalid range {1}..={2} with step {3}")]
    InvalidRange(EntityRef, f32, f32, f32),
    #[error("could not parse the schema")]
    Json(#[source] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("the built-in schema is not valid")]
    Builtin(#[source] SchemaError),
    #[error("could not read the schema file at {1:?}")]
    ReadFile(#[source] std::io::Error, PathBuf),
    #[error("the schema file at {1:?} is not valid")]
    Schema(#[source] SchemaError, PathBuf),
}

fn parse_field(
    entity: &EntityRef,
    descriptor: &str,
    boolean: bool,
) -> Result<Field, SchemaError> {
    let field = descriptor
        .parse::<Field>()
        .map_err(|e| SchemaError::InvalidDescriptor(entity.clone(), e))?;
    if field.is_flag() != boolean {
        let expected = if boolean { "boolean" } else { "numeric" };
        return Err(SchemaError::FieldKind(entity.clone(), field, expected));
    }
    Ok(field)
}

fn parse_message(entity: &EntityRef, name: &str) -> Result<MessageId, SchemaError> {
    MessageId::from_name(name)
        .ok_or_else(|| SchemaError::UnknownMessage(entity.clone(), name.to_string()))
}

fn parse_bound(entity: &EntityRef, raw: Option<&RawBound<'_>>) -> Result<Option<Bound>, SchemaError> {
    let Some(raw) = raw else { return Ok(None) };
    Ok(Some(Bound {
        message: parse_message(entity, &raw.message)?,
        field: parse_field(entity, &raw.message_data, false)?,
    }))
}

/// The category-specific attributes present on `raw`, with the category each belongs to.
fn category_attributes(raw: &RawEntity<'_>) -> [(&'static str, Category, bool); 5] {
    [
        ("default_mode", Category::Switch, raw.default_mode.is_some()),
        ("range", Category::Setpoint, raw.range.is_some()),
        ("step", Category::Setpoint, raw.step.is_some()),
        ("auto_min_value", Category::Setpoint, raw.auto_min_value.is_some()),
        ("auto_max_value", Category::Setpoint, raw.auto_max_value.is_some()),
    ]
}

fn validate(entity: EntityRef, raw: &RawEntity<'_>) -> Result<Entity, SchemaError> {
    for (attribute, category, present) in category_attributes(raw) {
        if present && category != entity.category {
            return Err(SchemaError::UnexpectedAttribute(entity, attribute));
        }
    }
    let message = parse_message(&entity, &raw.message)?;
    let field = parse_field(&entity, &raw.message_data, entity.category.is_boolean())?;
    let kind = match entity.category {
        Category::Sensor => EntityKind::Sensor,
        Category::BinarySensor => EntityKind::BinarySensor,
        Category::Switch => EntityKind::Switch {
            restore_mode: raw
                .default_mode
                .ok_or_else(|| SchemaError::MissingAttribute(entity.clone(), "default_mode"))?,
        },
        Category::Setpoint => {
            let (min, max) = raw
                .range
                .ok_or_else(|| SchemaError::MissingAttribute(entity.clone(), "range"))?;
            let step =
                raw.step.ok_or_else(|| SchemaError::MissingAttribute(entity.clone(), "step"))?;
            let finite = min.is_finite() && max.is_finite() && step.is_finite();
            if !finite || min > max || step <= 0.0 {
                return Err(SchemaError::InvalidRange(entity, min, max, step));
            }
            EntityKind::Setpoint(Setpoint {
                min,
                max,
                step,
                auto_min_value: parse_bound(&entity, raw.auto_min_value.as_ref())?,
                auto_max_value: parse_bound(&entity, raw.auto_max_value.as_ref())?,
            })
        }
    };
    Ok(Entity {
        key: entity.key,
        description: raw.description.to_string(),
        message,
        field,
        keep_updated: raw.keep_updated,
        kind,
    })
}

#[derive(clap::Parser, Debug)]
#[group(id = "registry::Args")]
pub struct Args {
    /// A JSON file with additional entity definitions.
    ///
    /// The file has the same layout as the built-in tables: an object keyed by category, each
    /// mapping entity keys to their descriptors. Keys must not collide with the built-in ones.
    #[arg(long)]
    schema: Option<PathBuf>,
}

impl Args {
    pub fn new(schema: Option<PathBuf>) -> Self {
        Self { schema }
    }

    pub fn to_registry(&self) -> Result<Registry, LoadError> {
        let mut registry = Registry::builtin().map_err(LoadError::Builtin)?;
        if let Some(path) = &self.schema {
            registry.load_overlay(path)?;
        }
        Ok(registry)
    }
}

/// All entities known to the tool, one table per category.
#[derive(Debug, Default)]
pub struct Registry {
    tables: [BTreeMap<String, Entity>; 4],
}

impl Registry {
    /// A registry holding the built-in entity tables.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut registry = Self::default();
        let entries = crate::schema::builtin().into_iter().flat_map(|(category, table)| {
            table.iter().map(move |(key, raw)| (category, *key, raw))
        });
        registry.extend(entries)?;
        tracing::debug!(entities = registry.len(), "loaded the built-in schema");
        Ok(registry)
    }

    /// Add the entities of a JSON schema overlay.
    ///
    /// The overlay is checked in full before any of it is added: on error the registry is
    /// left as it was.
    pub fn extend_from_json(&mut self, json: &str) -> Result<(), SchemaError> {
        let schema: RawSchema<'_> = serde_json::from_str(json).map_err(SchemaError::Json)?;
        let before = self.len();
        self.extend(schema.entries())?;
        tracing::debug!(added = self.len() - before, "loaded a schema overlay");
        Ok(())
    }

    pub fn load_overlay(&mut self, path: &Path) -> Result<(), LoadError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| LoadError::ReadFile(e, path.to_path_buf()))?;
        self.extend_from_json(&json)
            .map_err(|e| LoadError::Schema(e, path.to_path_buf()))
    }

    fn extend<'r, 'a: 'r>(
        &mut self,
        entries: impl Iterator<Item = (Category, &'r str, &'r RawEntity<'a>)>,
    ) -> Result<(), SchemaError> {
        let mut staged = Vec::<Entity>::new();
        for (category, key, raw) in entries {
            let entity = EntityRef::new(category, key);
            let staged_already = staged.iter().any(|e| e.category() == category && e.key == key);
            if staged_already || self.tables[category.index()].contains_key(key) {
                return Err(SchemaError::DuplicateKey(entity));
            }
            staged.push(validate(entity, raw)?);
        }
        for entity in staged {
            self.tables[entity.category().index()].insert(entity.key.clone(), entity);
        }
        Ok(())
    }

    pub fn get(&self, category: Category, key: &str) -> Result<&Entity, UnknownEntityKey> {
        self.tables[category.index()]
            .get(key)
            .ok_or_else(|| UnknownEntityKey(EntityRef::new(category, key)))
    }

    pub fn lookup(&self, entity: &EntityRef) -> Result<&Entity, UnknownEntityKey> {
        self.get(entity.category, &entity.key)
    }

    /// Every entity, in category then key order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.tables.iter().flat_map(|table| table.values())
    }

    pub fn entities_in(&self, category: Category) -> impl Iterator<Item = &Entity> {
        self.tables[category.index()].values()
    }

    /// Entities whose value is carried by `message`.
    pub fn entities_for_message(&self, message: MessageId) -> impl Iterator<Item = &Entity> {
        self.entities().filter(move |e| e.message == message)
    }

    pub fn len(&self) -> usize {
        self.tables.iter().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Byte;

    fn builtin() -> Registry {
        Registry::builtin().expect("built-in schema is valid")
    }

    #[test]
    fn builtin_tables() {
        let registry = builtin();
        assert_eq!(registry.entities_in(Category::Sensor).count(), crate::schema::SENSORS.len());
        assert_eq!(registry.entities_in(Category::BinarySensor).count(), 24);
        assert_eq!(registry.entities_in(Category::Switch).count(), 8);
        assert_eq!(registry.entities_in(Category::Setpoint).count(), 9);
        let categories = registry.entities().map(|e| e.category()).collect::<Vec<_>>();
        assert!(categories.is_sorted());
    }

    #[test]
    fn keys_repeat_across_categories() {
        let registry = builtin();
        let sensor = registry.get(Category::BinarySensor, "ch2_active").unwrap();
        let switch = registry.get(Category::Switch, "ch2_active").unwrap();
        assert_eq!(sensor.message, MessageId::Status);
        assert_eq!(sensor.field, Field::Flag { byte: Byte::Low, bit: 5 });
        assert_eq!(switch.field, Field::Flag { byte: Byte::High, bit: 4 });
        assert!(registry.get(Category::Sensor, "t_dhw_set").is_ok());
        assert!(registry.get(Category::Setpoint, "t_dhw_set").is_ok());
    }

    #[test]
    fn aliased_keys_stay_distinct() {
        let registry = builtin();
        let a = registry.get(Category::BinarySensor, "controller_pump_control_allowed").unwrap();
        let b = registry.get(Category::BinarySensor, "master_pump_control_allowed").unwrap();
        assert_ne!(a.key, b.key);
        assert_eq!((a.message, a.field), (b.message, b.field));
    }

    #[test]
    fn unknown_keys() {
        let registry = builtin();
        let err = registry.get(Category::Switch, "t_boiler").unwrap_err();
        assert_eq!(err, UnknownEntityKey(EntityRef::new(Category::Switch, "t_boiler")));
        assert_eq!(err.to_string(), "there is no switch entity named `t_boiler`");
    }

    #[test]
    fn entity_refs() {
        let r = "binary_sensor:flame_on".parse::<EntityRef>().unwrap();
        assert_eq!(r, EntityRef::new(Category::BinarySensor, "flame_on"));
        assert_eq!(r.to_string(), "binary_sensor:flame_on");
        assert_eq!("number:t_set".parse::<EntityRef>().unwrap().category, Category::Setpoint);
        assert!("flame_on".parse::<EntityRef>().is_err());
        assert!("sensor:".parse::<EntityRef>().is_err());
        assert!("lamp:on".parse::<EntityRef>().is_err());
    }

    #[test]
    fn entities_for_message() {
        let registry = builtin();
        let mut keys = registry
            .entities_for_message(MessageId::RBPflags)
            .map(|e| e.key.as_str())
            .collect::<Vec<_>>();
        keys.sort();
        assert_eq!(
            keys,
            [
                "dhw_setpoint_rw",
                "dhw_setpoint_transfer_enabled",
                "max_ch_setpoint_rw",
                "max_ch_setpoint_transfer_enabled"
            ]
        );
        let status = registry.entities_for_message(MessageId::Status).count();
        assert_eq!(status, 7 + 7);
    }

    fn overlay_error(json: &str) -> SchemaError {
        let mut registry = builtin();
        let before = registry.len();
        let err = registry.extend_from_json(json).unwrap_err();
        assert_eq!(registry.len(), before, "a failed overlay must not change the registry");
        err
    }

    #[test]
    fn overlay_adds_entities() {
        let mut registry = builtin();
        registry
            .extend_from_json(
                r#"{ "sensor": { "t_room": {
                    "message": "Tr", "message_data": "f88", "keep_updated": true,
                    "unit_of_measurement": "°C"
                } } }"#,
            )
            .unwrap();
        let entity = registry.get(Category::Sensor, "t_room").unwrap();
        assert_eq!(entity.message, MessageId::Tr);
        assert_eq!(entity.description, "");
    }

    #[test]
    fn overlay_rejects_duplicates() {
        let err = overlay_error(
            r#"{ "binary_sensor": {
                "a_new_flag": { "message": "Status", "message_data": "flag8_lb_7", "keep_updated": true },
                "flame_on": { "message": "Status", "message_data": "flag8_lb_3", "keep_updated": true }
            } }"#,
        );
        assert!(matches!(err, SchemaError::DuplicateKey(r) if r.key == "flame_on"));
    }

    #[test]
    fn overlay_rejects_bad_descriptors() {
        let err = overlay_error(
            r#"{ "sensor": { "x": { "message": "Tr", "message_data": "f8.8", "keep_updated": true } } }"#,
        );
        assert!(matches!(err, SchemaError::InvalidDescriptor(..)));
        let err = overlay_error(
            r#"{ "sensor": { "x": { "message": "Troom", "message_data": "f88", "keep_updated": true } } }"#,
        );
        assert!(matches!(err, SchemaError::UnknownMessage(_, name) if name == "Troom"));
        let err = overlay_error(
            r#"{ "switch": { "x": {
                "message": "Status", "message_data": "u8_hb", "keep_updated": true,
                "default_mode": "always_on"
            } } }"#,
        );
        assert!(matches!(err, SchemaError::FieldKind(_, _, "boolean")));
        let err = overlay_error(
            r#"{ "setpoint": { "x": {
                "message": "TrOverride", "message_data": "f88", "keep_updated": true,
                "range": [0, 30], "step": 0.5,
                "auto_max_value": { "message": "Status", "message_data": "flag8_lb_0" }
            } } }"#,
        );
        assert!(matches!(err, SchemaError::FieldKind(_, _, "numeric")));
    }

    #[test]
    fn overlay_requires_category_attributes() {
        let err = overlay_error(
            r#"{ "switch": { "x": { "message": "Status", "message_data": "flag8_hb_7", "keep_updated": true } } }"#,
        );
        assert!(matches!(err, SchemaError::MissingAttribute(_, "default_mode")));
        let err = overlay_error(
            r#"{ "setpoint": { "x": {
                "message": "TrOverride", "message_data": "f88", "keep_updated": true, "step": 0.5
            } } }"#,
        );
        assert!(matches!(err, SchemaError::MissingAttribute(_, "range")));
        let err = overlay_error(
            r#"{ "setpoint": { "x": {
                "message": "TrOverride", "message_data": "f88", "keep_updated": true,
                "range": [30, 0], "step": 0.5
            } } }"#,
        );
        assert!(matches!(err, SchemaError::InvalidRange(..)));
        let err = overlay_error(
            r#"{ "setpoint": { "x": {
                "message": "TrOverride", "message_data": "f88", "keep_updated": true,
                "range": [0, 30], "step": 0
            } } }"#,
        );
        assert!(matches!(err, SchemaError::InvalidRange(..)));
        let err = overlay_error(r#"{ "sensor": [] }"#);
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn overlay_rejects_keys_repeated_within_a_category() {
        let err = overlay_error(
            r#"{ "sensor": {
                "x": { "message": "Tr", "message_data": "f88", "keep_updated": true },
                "x": { "message": "TrCH2", "message_data": "f88", "keep_updated": true }
            } }"#,
        );
        assert!(matches!(
            err,
            SchemaError::DuplicateKey(r) if r == EntityRef::new(Category::Sensor, "x")
        ));

        let mut registry = builtin();
        registry
            .extend_from_json(
                r#"{
                    "sensor": { "x": { "message": "Tr", "message_data": "f88", "keep_updated": true } },
                    "setpoint": { "x": {
                        "message": "TrOverride", "message_data": "f88", "keep_updated": true,
                        "range": [0, 30], "step": 0.5
                    } }
                }"#,
            )
            .unwrap();
        assert_eq!(registry.get(Category::Sensor, "x").unwrap().message, MessageId::Tr);
        assert_eq!(registry.get(Category::Setpoint, "x").unwrap().message, MessageId::TrOverride);
    }

    #[test]
    fn overlay_checks_bound_messages_and_descriptors() {
        let err = overlay_error(
            r#"{ "setpoint": { "x": {
                "message": "TrOverride", "message_data": "f88", "keep_updated": true,
                "range": [0, 30], "step": 0.5,
                "auto_min_value": { "message": "NoSuchMessage", "message_data": "f88" }
            } } }"#,
        );
        assert!(matches!(err, SchemaError::UnknownMessage(_, name) if name == "NoSuchMessage"));
        let err = overlay_error(
            r#"{ "setpoint": { "x": {
                "message": "TrOverride", "message_data": "f88", "keep_updated": true,
                "range": [0, 30], "step": 0.5,
                "auto_max_value": { "message": "MaxTSet", "message_data": "garbage" }
            } } }"#,
        );
        assert!(matches!(err, SchemaError::InvalidDescriptor(_, InvalidDescriptor(d)) if d == "garbage"));
    }

    #[test]
    fn overlay_rejects_attributes_of_other_categories() {
        let err = overlay_error(
            r#"{ "sensor": { "y": {
                "message": "Tr", "message_data": "f88", "keep_updated": true,
                "auto_max_value": { "message": "NoSuchMessage", "message_data": "garbage" }
            } } }"#,
        );
        assert!(matches!(err, SchemaError::UnexpectedAttribute(_, "auto_max_value")));
        let err = overlay_error(
            r#"{ "binary_sensor": { "y": {
                "message": "Status", "message_data": "flag8_lb_7", "keep_updated": true,
                "default_mode": "always_on"
            } } }"#,
        );
        assert!(matches!(err, SchemaError::UnexpectedAttribute(_, "default_mode")));
        let err = overlay_error(
            r#"{ "switch": { "y": {
                "message": "Status", "message_data": "flag8_hb_7", "keep_updated": true,
                "default_mode": "always_on", "range": [0, 1], "step": 1
            } } }"#,
        );
        assert!(matches!(err, SchemaError::UnexpectedAttribute(_, "range")));
        let err = overlay_error(
            r#"{ "setpoint": { "x": {
                "message": "TrOverride", "message_data": "f88", "keep_updated": true,
                "range": [0, 30], "step": 0.5,
                "auto_max_value": { "message": "MaxTSet", "messge_data": "f88" }
            } } }"#,
        );
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn effective_range() {
        let registry = builtin();
        let t_dhw_set = registry.get(Category::Setpoint, "t_dhw_set").unwrap();
        let setpoint = t_dhw_set.setpoint().unwrap();
        assert_eq!(setpoint.effective_range(|_| None), (0.0, 127.0));
        let bounds =
            |m: MessageId| (m == MessageId::TdhwSetUBTdhwSetLB).then_some(Payload::new(65, 40));
        assert_eq!(setpoint.effective_range(bounds), (40.0, 65.0));
        let inverted =
            |m: MessageId| (m == MessageId::TdhwSetUBTdhwSetLB).then_some(Payload::new(30, 60));
        assert_eq!(setpoint.effective_range(inverted), (0.0, 127.0));

        let max_rel_mod = registry.get(Category::Setpoint, "max_rel_mod_level").unwrap();
        let min_mod =
            |m: MessageId| (m == MessageId::MaxCapacityMinModLevel).then_some(Payload::new(24, 20));
        assert_eq!(max_rel_mod.setpoint().unwrap().effective_range(min_mod), (20.0, 127.0));
    }

    #[test]
    fn encoding_entities() {
        let registry = builtin();
        let flame_on = registry.get(Category::BinarySensor, "flame_on").unwrap();
        assert!(matches!(
            flame_on.encode(Value::Bool(true), Payload::ZERO),
            Err(EncodeError::ReadOnly(_))
        ));

        let dhw_enable = registry.get(Category::Switch, "dhw_enable").unwrap();
        let base = Payload::new(0b0000_0001, 0x0A);
        assert_eq!(
            dhw_enable.encode(Value::Bool(true), base).unwrap(),
            Payload::new(0b0000_0011, 0x0A)
        );

        let t_set = registry.get(Category::Setpoint, "t_set").unwrap();
        assert_eq!(t_set.encode(Value::Float(1.5625), Payload::ZERO).unwrap(), Payload::new(1, 0x90));
        assert!(matches!(
            t_set.encode(Value::Float(100.5), Payload::ZERO),
            Err(EncodeError::Range(_, RangeError::OutsideBounds(..)))
        ));
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
