//! Command serialization.
//!
//! A command is written as a flat key-value bag: its type tag, name and
//! final flag plus its constructor fields. Captured inversion data is not
//! written; a command rebuilt from a bag captures afresh when performed.
//! A multi command stores its children under positional keys `"0"`, `"1"`…
//!
//! Lists of bags can be packed into MessagePack for persisting or replaying
//! an undo history.

use crate::commands::{Command, CommandOp, CommandType};
use crate::error::{EditorError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Bag = Map<String, Value>;

const TYPE: &str = "type";
const NAME: &str = "name";
const FINAL: &str = "final";

impl Command {
    /// Write the tag and constructor fields into a bag.
    pub fn to_bag(&self) -> Result<Bag> {
        let mut bag = Bag::new();
        bag.insert(TYPE.into(), Value::from(self.kind().tag()));
        bag.insert(NAME.into(), Value::from(self.name()));
        bag.insert(FINAL.into(), Value::from(self.is_final()));
        match self.op() {
            CommandOp::CreateObject(c) => {
                put(&mut bag, "parent", &c.parent)?;
                put(&mut bag, "tree", &c.tree)?;
                put(&mut bag, "placement", &c.placement)?;
            }
            CommandOp::DeleteObject(c) => put(&mut bag, "id", &c.id)?,
            CommandOp::SetField(c) => {
                put(&mut bag, "id", &c.id)?;
                put(&mut bag, "field", &c.field)?;
                put(&mut bag, "value", &c.value)?;
            }
            CommandOp::MoveObject(c) => {
                put(&mut bag, "id", &c.id)?;
                put(&mut bag, "to", &c.to)?;
            }
            CommandOp::SelectObjects(c) => put(&mut bag, "ids", &c.ids)?,
            CommandOp::DeselectObjects(c) => put(&mut bag, "ids", &c.ids)?,
            CommandOp::ParentObject(c) => {
                put(&mut bag, "id", &c.id)?;
                put(&mut bag, "parent", &c.parent)?;
                put(&mut bag, "strategy", &c.strategy)?;
            }
            CommandOp::Multi(c) => {
                for (index, child) in c.commands.iter().enumerate() {
                    bag.insert(index.to_string(), Value::Object(child.to_bag()?));
                }
            }
        }
        Ok(bag)
    }

    /// Rebuild a command from a bag written by [`Command::to_bag`].
    pub fn from_bag(bag: &Bag) -> Result<Command> {
        let tag: String = take(bag, TYPE)?;
        let kind = CommandType::from_tag(&tag)
            .ok_or_else(|| EditorError::InvalidBag(format!("unknown command type {tag:?}")))?;
        let mut command = match kind {
            CommandType::CreateObject => Command::create(
                take(bag, "parent")?,
                take(bag, "tree")?,
                take(bag, "placement")?,
            ),
            CommandType::DeleteObject => Command::delete(take(bag, "id")?),
            CommandType::SetField => Command::set_field(
                take(bag, "id")?,
                take(bag, "field")?,
                take(bag, "value")?,
            ),
            CommandType::MoveObject => Command::move_to(take(bag, "id")?, take(bag, "to")?),
            CommandType::SelectObjects => Command::select(take(bag, "ids")?),
            CommandType::DeselectObjects => Command::deselect(take(bag, "ids")?),
            CommandType::ParentObject => Command::reparent(
                take(bag, "id")?,
                take(bag, "parent")?,
                take(bag, "strategy")?,
            ),
            CommandType::Multi => {
                let mut children = Vec::new();
                while let Some(child) = bag.get(&children.len().to_string()) {
                    let Value::Object(child) = child else {
                        return Err(EditorError::InvalidBag(format!(
                            "multi child {} is not a bag",
                            children.len()
                        )));
                    };
                    children.push(Command::from_bag(child)?);
                }
                Command::multi(children)
            }
        };
        if let Some(name) = bag.get(NAME).and_then(Value::as_str) {
            command = command.named(name);
        }
        if let Some(is_final) = bag.get(FINAL).and_then(Value::as_bool) {
            command.set_final(is_final);
        }
        Ok(command)
    }
}

// Commands travel as their bag, so scripts and messages can carry them.
impl Serialize for Command {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_bag()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bag = Bag::deserialize(deserializer)?;
        Command::from_bag(&bag).map_err(serde::de::Error::custom)
    }
}

fn put<T: Serialize>(bag: &mut Bag, key: &str, value: &T) -> Result<()> {
    bag.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

fn take<T: DeserializeOwned>(bag: &Bag, key: &str) -> Result<T> {
    let value = bag
        .get(key)
        .ok_or_else(|| EditorError::InvalidBag(format!("missing key {key:?}")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| EditorError::InvalidBag(format!("key {key:?}: {e}")))
}

/// Pack a list of bags as MessagePack.
pub fn encode_history(bags: &[Bag]) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(bags)?)
}

/// Unpack bags written by [`encode_history`].
pub fn decode_history(bytes: &[u8]) -> Result<Vec<Bag>> {
    Ok(rmp_serde::from_slice(bytes)?)
}
