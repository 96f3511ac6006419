//! Decoded SM4/SM5 (D3D10/D3D11) shader program model.
//!
//! This crate holds the **already-decoded** form of a tokenized shader program: the
//! shader stage and model, a linear instruction stream with typed operands, and the
//! payloads carried by declaration opcodes. Producing this model from raw `SHDR`/`SHEX`
//! token bytes is the job of an external decoder; consuming it is the job of
//! `sm5-front`.
//!
//! The numeric tables (opcodes, operand types, system-value names, resource
//! dimensions, ...) follow the canonical D3D10/D3D11 tokenized program format so a
//! decoder can map raw token fields with [`Opcode::from_raw`] and friends.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Declares a fieldless enum mirroring a numeric D3D token table.
///
/// Every table gets an `Unknown(u32)` catch-all so decoding never fails on values from
/// newer shader models; callers decide whether an unknown value is fatal.
macro_rules! numeric_enum {
    (
        $(#[$enum_meta:meta])*
        pub enum $name:ident {
            $( $variant:ident = $value:literal => $text:literal, )*
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[doc = concat!("`", $text, "` (", stringify!($value), ")")]
                $variant,
            )*
            /// A value outside the known table.
            Unknown(u32),
        }

        impl $name {
            /// Maps a raw token value onto the table.
            pub const fn from_raw(raw: u32) -> Self {
                match raw {
                    $( $value => Self::$variant, )*
                    other => Self::Unknown(other),
                }
            }

            /// Returns the raw token value.
            pub const fn raw(self) -> u32 {
                match self {
                    $( Self::$variant => $value, )*
                    Self::Unknown(raw) => raw,
                }
            }

            /// Returns the assembly-style name, or `"unknown"`.
            pub const fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )*
                    Self::Unknown(_) => "unknown",
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    Self::Unknown(raw) => write!(f, "unknown({raw})"),
                    other => f.write_str(other.name()),
                }
            }
        }
    };
}

/// Declaration payloads and the enumerations they reference.
pub mod decl;
/// Instructions and whole programs.
pub mod inst;
/// Opcode table and opcode-token bitfields.
pub mod opcode;
/// Operands, index addressing, masks and swizzles.
pub mod operand;
/// Input/output signature elements (`ISGN`/`OSGN` contents).
pub mod signature;

pub use crate::decl::{
    CustomDataClass, Declaration, InterpolationMode, ResourceDimension, ResourceReturnType,
    SamplerMode, SystemName,
};
pub use crate::inst::{
    decode_version_token, Instruction, ShaderModel, ShaderProgram, ShaderStage, TestBoolean,
};
pub use crate::opcode::Opcode;
pub use crate::operand::{
    ComponentMask, IndexDimension, Operand, OperandIndex, OperandModifier, OperandType, Swizzle,
};
pub use crate::signature::{RegisterComponentType, ShaderSignatures, SignatureElement};
