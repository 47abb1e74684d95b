//! Stat modifiers and their application kinds.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr};

use crate::wire::{WireCodec, WireError, WireReader, WireWriter};

/// How a modifier participates in the final value computation.
///
/// The discriminant is the wire byte; do not reorder.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    FromRepr,
)]
#[repr(u8)]
pub enum ModifierKind {
    /// Added to the base before percentages.
    Flat = 0,
    /// Added after percentages and multipliers.
    FlatPostMods = 1,
    /// Summed, then applied once as `1 + sum/100`.
    Percent = 2,
    /// Applied one after another.
    Multiplier = 3,
    /// Upper cap; the lowest cap wins.
    CapMax = 4,
    /// Lower cap; the highest cap wins.
    CapMin = 5,
    /// Replaces the base value. Latest inserted wins.
    OverrideBase = 6,
    /// Replaces the computed value. Latest inserted wins, bounds ignored.
    OverrideFinal = 7,
}

impl ModifierKind {
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A single modifier attached to a stat, keyed by `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub id: String,
    pub value: f32,
    pub kind: ModifierKind,
}

impl StatModifier {
    pub fn new(id: impl Into<String>, value: f32, kind: ModifierKind) -> Self {
        Self {
            id: id.into(),
            value,
            kind,
        }
    }

    pub fn flat(id: impl Into<String>, value: f32) -> Self {
        Self::new(id, value, ModifierKind::Flat)
    }

    pub fn percent(id: impl Into<String>, value: f32) -> Self {
        Self::new(id, value, ModifierKind::Percent)
    }

    pub fn multiplier(id: impl Into<String>, value: f32) -> Self {
        Self::new(id, value, ModifierKind::Multiplier)
    }
}

/// `[id:string][value:f32][kind:u8]`
impl WireCodec for StatModifier {
    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.put_str(&self.id)?;
        w.put(&self.value)?;
        w.put(&self.kind.as_byte())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let id = r.take_string()?;
        let value: f32 = r.take()?;
        let byte: u8 = r.take()?;
        let kind = ModifierKind::from_repr(byte).ok_or(WireError::UnknownModifierKind(byte))?;
        Ok(Self { id, value, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_wire_layout() {
        let modifier = StatModifier::new("rage", 1.5, ModifierKind::Multiplier);
        let bytes = modifier.to_bytes().expect("encode");
        // u64 length prefix + "rage" + f32 + kind byte
        assert_eq!(bytes.len(), 8 + 4 + 4 + 1);
        assert_eq!(bytes.last(), Some(&3));
        assert_eq!(StatModifier::from_bytes(&bytes).expect("decode"), modifier);
    }

    #[test]
    fn unknown_kind_byte_is_rejected() {
        let mut bytes = StatModifier::flat("x", 1.0).to_bytes().expect("encode");
        if let Some(last) = bytes.last_mut() {
            *last = 42;
        }
        assert!(matches!(
            StatModifier::from_bytes(&bytes),
            Err(WireError::UnknownModifierKind(42))
        ));
    }

    #[test]
    fn corrupt_id_length_is_rejected() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0x0f, 0, 0, b'a', b'b', b'c'];
        assert!(matches!(StatModifier::from_bytes(&bytes), Err(WireError::Bincode(_))));
    }

    #[test]
    fn kind_names_parse() {
        assert_eq!("OverrideFinal".parse::<ModifierKind>(), Ok(ModifierKind::OverrideFinal));
        assert!("Sideways".parse::<ModifierKind>().is_err());
    }
}
