// Operator registry: the closed set of operators a search can draw from.
//
// The C original kept a lazily initialized global table of function pointers
// with runtime arity flags; here the registry is a closed enum whose
// metadata (arity class, cost weight, complexity tier, names) is a property
// of the variant, dispatched through a single match.

use thiserror::Error;

use super::kernels;

// ---------------------------------------------------------------------------
// Complexity tiers
// ---------------------------------------------------------------------------

/// Operator complexity tiers. The tiers nest: a search at `Intermediate`
/// includes every `Basic` operator, and `Advanced` includes everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Complexity {
    Basic,
    Intermediate,
    Advanced,
}

impl Complexity {
    /// Parse a case-insensitive tier name.
    pub fn parse(s: &str) -> Option<Complexity> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Some(Complexity::Basic),
            "intermediate" => Some(Complexity::Intermediate),
            "advanced" => Some(Complexity::Advanced),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Complexity::Basic => "Basic",
            Complexity::Intermediate => "Intermediate",
            Complexity::Advanced => "Advanced",
        }
    }
}

// ---------------------------------------------------------------------------
// Arity classes
// ---------------------------------------------------------------------------

/// How the evaluator sources an operator's operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArityClass {
    /// Transforms the live value alone; ignores the next field and constant.
    Unary,
    /// Consumes the next field of the permutation; ignores the constant.
    Binary,
    /// Combines the live value with the search constant; consumes no field.
    ConstUsing,
}

// ---------------------------------------------------------------------------
// The operator set
// ---------------------------------------------------------------------------

/// The closed operator set. Discriminant order is the registry order, which
/// the solution sort (and therefore the output) depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Op {
    // Basic
    Add = 0,
    Sub,
    Xor,
    And,
    Or,
    Identity,
    // Intermediate
    Not,
    Lshift,
    Rshift,
    Mul,
    Div,
    Mod,
    Negate,
    ConstAdd,
    ConstXor,
    ConstSub,
    OnesComplement,
    TwosComplement,
    // Advanced
    RotLeft,
    RotRight,
    Crc8Ccitt,
    Crc8Dallas,
    Crc8Sae,
    Fletcher8,
    SwapNibbles,
    ReverseBits,
    LookupTable,
    PolyCrc,
    ChecksumVariant,
}

impl Op {
    /// Every operator, in registry order.
    pub const ALL: [Op; 29] = [
        Op::Add,
        Op::Sub,
        Op::Xor,
        Op::And,
        Op::Or,
        Op::Identity,
        Op::Not,
        Op::Lshift,
        Op::Rshift,
        Op::Mul,
        Op::Div,
        Op::Mod,
        Op::Negate,
        Op::ConstAdd,
        Op::ConstXor,
        Op::ConstSub,
        Op::OnesComplement,
        Op::TwosComplement,
        Op::RotLeft,
        Op::RotRight,
        Op::Crc8Ccitt,
        Op::Crc8Dallas,
        Op::Crc8Sae,
        Op::Fletcher8,
        Op::SwapNibbles,
        Op::ReverseBits,
        Op::LookupTable,
        Op::PolyCrc,
        Op::ChecksumVariant,
    ];

    /// The operand-sourcing class the evaluator obeys for this operator.
    pub fn arity(self) -> ArityClass {
        use ArityClass::*;
        match self {
            Op::Identity
            | Op::Not
            | Op::Negate
            | Op::OnesComplement
            | Op::TwosComplement
            | Op::SwapNibbles
            | Op::ReverseBits
            | Op::LookupTable => Unary,
            Op::ConstAdd | Op::ConstXor | Op::ConstSub | Op::PolyCrc | Op::ChecksumVariant => {
                ConstUsing
            }
            _ => Binary,
        }
    }

    /// Whether the operator's result depends on the search constant.
    pub fn requires_constant(self) -> bool {
        matches!(self.arity(), ArityClass::ConstUsing)
    }

    /// Relative CPU cost, used by the partitioner's workload estimate.
    pub fn cost_weight(self) -> u32 {
        match self {
            Op::Mul => 3,
            Op::Div | Op::Mod => 30,
            Op::TwosComplement => 2,
            Op::RotLeft | Op::RotRight | Op::SwapNibbles => 2,
            Op::Crc8Ccitt | Op::Crc8Dallas | Op::Crc8Sae | Op::ReverseBits => 8,
            Op::Fletcher8 => 6,
            Op::LookupTable => 3,
            Op::PolyCrc => 20,
            Op::ChecksumVariant => 5,
            _ => 1,
        }
    }

    /// Lowest complexity tier that includes this operator.
    pub fn complexity(self) -> Complexity {
        match self {
            Op::Add | Op::Sub | Op::Xor | Op::And | Op::Or | Op::Identity => Complexity::Basic,
            Op::Not
            | Op::Lshift
            | Op::Rshift
            | Op::Mul
            | Op::Div
            | Op::Mod
            | Op::Negate
            | Op::ConstAdd
            | Op::ConstXor
            | Op::ConstSub
            | Op::OnesComplement
            | Op::TwosComplement => Complexity::Intermediate,
            _ => Complexity::Advanced,
        }
    }

    /// Short display name, as printed in solution listings.
    pub fn short_name(self) -> &'static str {
        match self {
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Xor => "XOR",
            Op::And => "AND",
            Op::Or => "OR",
            Op::Identity => "ID",
            Op::Not => "NOT",
            Op::Lshift => "LSH",
            Op::Rshift => "RSH",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Mod => "MOD",
            Op::Negate => "NEG",
            Op::ConstAdd => "C+",
            Op::ConstXor => "C^",
            Op::ConstSub => "C-",
            Op::OnesComplement => "1COMP",
            Op::TwosComplement => "2COMP",
            Op::RotLeft => "ROTL",
            Op::RotRight => "ROTR",
            Op::Crc8Ccitt => "CRC8C",
            Op::Crc8Dallas => "CRC8D",
            Op::Crc8Sae => "CRC8S",
            Op::Fletcher8 => "FLETCH",
            Op::SwapNibbles => "SWAP",
            Op::ReverseBits => "REVB",
            Op::LookupTable => "LUT",
            Op::PolyCrc => "PCRC",
            Op::ChecksumVariant => "CVAR",
        }
    }

    /// Canonical configuration-file name (the name `operations=` accepts).
    pub fn config_name(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Xor => "xor",
            Op::And => "and",
            Op::Or => "or",
            Op::Identity => "identity",
            Op::Not => "not",
            Op::Lshift => "lshift",
            Op::Rshift => "rshift",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Mod => "mod",
            Op::Negate => "negate",
            Op::ConstAdd => "const_add",
            Op::ConstXor => "const_xor",
            Op::ConstSub => "const_sub",
            Op::OnesComplement => "ones_complement",
            Op::TwosComplement => "twos_complement",
            Op::RotLeft => "rotleft",
            Op::RotRight => "rotright",
            Op::Crc8Ccitt => "crc8_ccitt",
            Op::Crc8Dallas => "crc8_dallas",
            Op::Crc8Sae => "crc8_sae",
            Op::Fletcher8 => "fletcher8",
            Op::SwapNibbles => "swap_nibbles",
            Op::ReverseBits => "reverse_bits",
            Op::LookupTable => "lookup_table",
            Op::PolyCrc => "poly_crc",
            Op::ChecksumVariant => "checksum_variant",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Op::Add => "Simple addition",
            Op::Sub => "Subtraction",
            Op::Xor => "Exclusive OR",
            Op::And => "Bitwise AND",
            Op::Or => "Bitwise OR",
            Op::Identity => "Pass-through",
            Op::Not => "Bitwise NOT",
            Op::Lshift => "Left shift",
            Op::Rshift => "Right shift",
            Op::Mul => "Multiplication",
            Op::Div => "Division",
            Op::Mod => "Modulo",
            Op::Negate => "Two's complement negation",
            Op::ConstAdd => "Add constant",
            Op::ConstXor => "XOR with constant",
            Op::ConstSub => "Subtract constant",
            Op::OnesComplement => "One's complement",
            Op::TwosComplement => "Two's complement",
            Op::RotLeft => "Rotate left",
            Op::RotRight => "Rotate right",
            Op::Crc8Ccitt => "CRC-8 CCITT",
            Op::Crc8Dallas => "CRC-8 Dallas/Maxim",
            Op::Crc8Sae => "CRC-8 SAE J1850",
            Op::Fletcher8 => "Fletcher checksum round",
            Op::SwapNibbles => "Swap nibbles",
            Op::ReverseBits => "Reverse bits",
            Op::LookupTable => "Lookup table",
            Op::PolyCrc => "Polynomial CRC",
            Op::ChecksumVariant => "Checksum variant",
        }
    }

    /// Apply the operator. `b` is the next field value (binary operators)
    /// and `c` the search constant (const-using operators); each kernel
    /// reads only the operands its arity class prescribes.
    #[inline(always)]
    pub fn apply(self, a: u64, b: u64, c: u64) -> u64 {
        match self {
            Op::Add => kernels::add(a, b),
            Op::Sub => kernels::sub(a, b),
            Op::Xor => kernels::xor(a, b),
            Op::And => kernels::and(a, b),
            Op::Or => kernels::or(a, b),
            Op::Identity => kernels::identity(a),
            Op::Not => kernels::not(a),
            Op::Lshift => kernels::lshift(a, b),
            Op::Rshift => kernels::rshift(a, b),
            Op::Mul => kernels::mul(a, b),
            Op::Div => kernels::div(a, b),
            Op::Mod => kernels::rem(a, b),
            Op::Negate => kernels::negate(a),
            Op::ConstAdd => kernels::const_add(a, c),
            Op::ConstXor => kernels::const_xor(a, c),
            Op::ConstSub => kernels::const_sub(a, c),
            Op::OnesComplement => kernels::ones_complement(a),
            Op::TwosComplement => kernels::twos_complement(a),
            Op::RotLeft => kernels::rot_left(a, b),
            Op::RotRight => kernels::rot_right(a, b),
            Op::Crc8Ccitt => kernels::crc8_ccitt(a, b),
            Op::Crc8Dallas => kernels::crc8_dallas(a, b),
            Op::Crc8Sae => kernels::crc8_sae(a, b),
            Op::Fletcher8 => kernels::fletcher8(a, b),
            Op::SwapNibbles => kernels::swap_nibbles(a),
            Op::ReverseBits => kernels::reverse_bits(a),
            Op::LookupTable => kernels::lookup_table(a),
            Op::PolyCrc => kernels::poly_crc(a, c),
            Op::ChecksumVariant => kernels::checksum_variant(a, c),
        }
    }

    /// Parse a case-insensitive operator name from the closed set. Accepts
    /// the configuration name (`const_add`) and the short display name
    /// (`C+`).
    pub fn parse_name(s: &str) -> Result<Op, UnknownOperation> {
        let lowered = s.trim().to_ascii_lowercase();
        Op::ALL
            .iter()
            .copied()
            .find(|op| {
                op.config_name() == lowered || op.short_name().to_ascii_lowercase() == lowered
            })
            .ok_or_else(|| UnknownOperation(s.trim().to_string()))
    }
}

/// An `operations=` entry that names no operator in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation name: '{0}'")]
pub struct UnknownOperation(pub String);

// ---------------------------------------------------------------------------
// Active set construction
// ---------------------------------------------------------------------------

/// Build the operator list a search runs with: the custom list verbatim when
/// one is configured, otherwise every registry entry at or below the tier.
pub fn active_operators(complexity: Complexity, custom: Option<&[Op]>) -> Vec<Op> {
    match custom {
        Some(ops) => ops.to_vec(),
        None => Op::ALL
            .iter()
            .copied()
            .filter(|op| op.complexity() <= complexity)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
