//! The registry of canonical type descriptors.
//!
//! AST literal nodes borrow descriptors through [`TypeId`] handles; the
//! registry must outlive any AST referring to it. Nothing here is resolved
//! type information - these are descriptors for type *syntax* that later
//! stages map onto real types.

use std::fmt;

/// A non-owning handle to a descriptor inside a [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// عدد_صحيح
    Int,
    /// عدد_حقيقي
    Float,
    /// حرف
    Char,
    /// منطقي
    Bool,
    /// فراغ
    Void,
    /// The type of string literals.
    String,
}

impl PrimitiveType {
    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveType::Int => "عدد_صحيح",
            PrimitiveType::Float => "عدد_حقيقي",
            PrimitiveType::Char => "حرف",
            PrimitiveType::Bool => "منطقي",
            PrimitiveType::Void => "فراغ",
            PrimitiveType::String => "نص",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub primitive: PrimitiveType,
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primitive.keyword())
    }
}

/// Owns the canonical descriptors for the primitive types.
#[derive(Debug)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let descriptors = [
            PrimitiveType::Int,
            PrimitiveType::Float,
            PrimitiveType::Char,
            PrimitiveType::Bool,
            PrimitiveType::Void,
            PrimitiveType::String,
        ]
        .into_iter()
        .map(|primitive| TypeDescriptor { primitive })
        .collect();
        Self { descriptors }
    }

    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.descriptors[id.0]
    }

    fn id_of(&self, primitive: PrimitiveType) -> TypeId {
        TypeId(
            self.descriptors
                .iter()
                .position(|descriptor| descriptor.primitive == primitive)
                .expect("all primitives are installed"),
        )
    }

    pub fn int(&self) -> TypeId {
        self.id_of(PrimitiveType::Int)
    }

    pub fn float(&self) -> TypeId {
        self.id_of(PrimitiveType::Float)
    }

    pub fn char_type(&self) -> TypeId {
        self.id_of(PrimitiveType::Char)
    }

    pub fn bool(&self) -> TypeId {
        self.id_of(PrimitiveType::Bool)
    }

    pub fn void(&self) -> TypeId {
        self.id_of(PrimitiveType::Void)
    }

    pub fn string(&self) -> TypeId {
        self.id_of(PrimitiveType::String)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_handles() {
        let registry = TypeRegistry::new();
        let int = registry.int();
        assert_eq!(registry.get(int).primitive, PrimitiveType::Int);
        assert_eq!(registry.get(registry.bool()).primitive, PrimitiveType::Bool);
        assert_ne!(registry.int(), registry.float());
        assert_eq!(registry.int(), int);
    }
}
