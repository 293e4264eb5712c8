//! Wire-type hints
//!
//! The chain encodes a few types differently from a stock Substrate node:
//! transaction actions distinguish calls from contract creation, and
//! extrinsic signatures carry two extra Ethereum-style variants. The registry
//! records those enums with their variant order so that discriminants can be
//! resolved by name.

use std::collections::HashMap;

/// Definition of one registered type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    /// Alias to another type, e.g. `AccountInfo -> AccountInfoWithDualRefCount`
    Alias(String),
    /// Enum with `(variant, payload type)` pairs in discriminant order
    Enum(Vec<(String, String)>),
}

/// Registry of custom type hints handed to the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDef>,
}

impl TypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Hints required by the Acala dev chain
    pub fn acala() -> Self {
        let mut registry = Self::new();
        registry.register_enum("TransactionAction", [("Call", "H160"), ("Create", "Null")]);
        registry.register_enum(
            "ExtrinsicSignature",
            [
                ("Ed25519", "Ed25519Signature"),
                ("Sr25519", "Sr25519Signature"),
                ("Ecdsa", "EcdsaSignature"),
                ("Ethereum", "[u8; 65]"),
                ("AcalaEip712", "[u8; 65]"),
            ],
        );
        registry
    }

    /// Register an enum; variants are numbered in the order given
    pub fn register_enum<I, V, T>(&mut self, name: impl Into<String>, variants: I)
    where
        I: IntoIterator<Item = (V, T)>,
        V: Into<String>,
        T: Into<String>,
    {
        let variants = variants
            .into_iter()
            .map(|(v, t)| (v.into(), t.into()))
            .collect();
        self.types.insert(name.into(), TypeDef::Enum(variants));
    }

    /// Register a type alias
    pub fn register_alias(&mut self, name: impl Into<String>, target: impl Into<String>) {
        self.types.insert(name.into(), TypeDef::Alias(target.into()));
    }

    /// Look up a type definition
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Variant name for an enum discriminant
    pub fn variant_name(&self, type_name: &str, index: u8) -> Option<&str> {
        match self.resolve(type_name)? {
            TypeDef::Enum(variants) => variants.get(index as usize).map(|(v, _)| v.as_str()),
            TypeDef::Alias(_) => None,
        }
    }

    /// Discriminant of an enum variant
    pub fn variant_index(&self, type_name: &str, variant: &str) -> Option<u8> {
        match self.resolve(type_name)? {
            TypeDef::Enum(variants) => variants
                .iter()
                .position(|(v, _)| v == variant)
                .and_then(|i| u8::try_from(i).ok()),
            TypeDef::Alias(_) => None,
        }
    }

    /// Follow aliases to the underlying definition
    fn resolve(&self, name: &str) -> Option<&TypeDef> {
        let mut current = self.types.get(name)?;
        // bounded so that alias cycles cannot loop forever
        for _ in 0..self.types.len() {
            match current {
                TypeDef::Alias(target) => match self.types.get(target) {
                    Some(next) => current = next,
                    None => return Some(current),
                },
                TypeDef::Enum(_) => return Some(current),
            }
        }
        Some(current)
    }
}
