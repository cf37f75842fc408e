use crate::asset::AssetId;
use crate::serde::{
    ByteReader,
    ByteWriter,
    Deserializable,
    DeserializationError,
    Serializable,
};

/// Destruction of supply for an asset.
///
/// Burning needs no owner authorization: the burned value is drawn from notes the
/// transaction already proves it can spend. The native asset cannot be burned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burn {
    pub asset_id: AssetId,
    pub value: u64,
}

impl Serializable for Burn {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.asset_id.write_into(target);
        target.write_u64(self.value);
    }
}

impl Deserializable for Burn {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self { asset_id: source.read()?, value: source.read_u64()? })
    }
}
