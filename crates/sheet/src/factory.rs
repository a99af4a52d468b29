//! Selection of the cell kind for a declared field type.

use crate::cell::CellKind;
use crate::types::{TypeDesc, TypeRegistry};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;

/// Closed set of type categories a constructor can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Bool,
    Integer,
    Float,
    Char,
    String,
    Enum,
    Color,
    Curve,
    Gradient,
    LayerMask,
    Reference,
    List,
    Dictionary,
    Object,
    Other,
}

impl TypeCategory {
    #[must_use]
    pub fn of(desc: &TypeDesc) -> Self {
        match desc {
            TypeDesc::Bool => TypeCategory::Bool,
            TypeDesc::Int(_) => TypeCategory::Integer,
            TypeDesc::Float(_) => TypeCategory::Float,
            TypeDesc::Char => TypeCategory::Char,
            TypeDesc::String => TypeCategory::String,
            TypeDesc::Enum(_) => TypeCategory::Enum,
            TypeDesc::Color => TypeCategory::Color,
            TypeDesc::Curve => TypeCategory::Curve,
            TypeDesc::Gradient => TypeCategory::Gradient,
            TypeDesc::LayerMask => TypeCategory::LayerMask,
            TypeDesc::Reference(_) => TypeCategory::Reference,
            TypeDesc::List(_) => TypeCategory::List,
            TypeDesc::Dictionary(..) => TypeCategory::Dictionary,
            TypeDesc::Object(_) => TypeCategory::Object,
            TypeDesc::Other(_) => TypeCategory::Other,
        }
    }
}

/// Builds the cell kind for a declared type.
pub type CellConstructor = fn(&TypeDesc) -> CellKind;

/// Registry mapping declared types to cell kinds.
///
/// Lookup order: exact type name, a registered base the type is assignable
/// to, generic collection category, enum, primitive category, nested object,
/// and finally the unsupported placeholder. Results are cached per type.
#[derive(Debug)]
pub struct CellFactory {
    named: IndexMap<String, CellConstructor>,
    categories: HashMap<TypeCategory, CellConstructor>,
    cache: RefCell<HashMap<TypeDesc, CellKind>>,
}

impl Default for CellFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register_category(TypeCategory::Bool, |_| CellKind::Bool);
        factory.register_category(TypeCategory::Integer, |_| CellKind::Integer);
        factory.register_category(TypeCategory::Float, |_| CellKind::Float);
        factory.register_category(TypeCategory::Char, |_| CellKind::Char);
        factory.register_category(TypeCategory::String, |_| CellKind::String);
        factory.register_category(TypeCategory::Enum, |_| CellKind::Enum);
        factory.register_category(TypeCategory::Color, |_| CellKind::Color);
        factory.register_category(TypeCategory::Curve, |_| CellKind::Curve);
        factory.register_category(TypeCategory::Gradient, |_| CellKind::Gradient);
        factory.register_category(TypeCategory::LayerMask, |_| CellKind::LayerMask);
        factory.register_category(TypeCategory::Reference, |_| CellKind::Reference);
        factory.register_category(TypeCategory::List, |_| CellKind::List);
        factory.register_category(TypeCategory::Dictionary, |_| CellKind::Dictionary);
        factory
    }
}

impl CellFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with no constructors; every type resolves to nested object
    /// or unsupported.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            named: IndexMap::new(),
            categories: HashMap::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Register a constructor for an exact type expression such as `Vec2`
    /// or `list<string>`. Object types derived from `name` also match.
    pub fn register_type(&mut self, name: impl Into<String>, ctor: CellConstructor) {
        self.named.insert(name.into(), ctor);
        self.cache.get_mut().clear();
    }

    pub fn register_category(&mut self, category: TypeCategory, ctor: CellConstructor) {
        self.categories.insert(category, ctor);
        self.cache.get_mut().clear();
    }

    /// Cell kind for a declared type.
    pub fn kind_for(&self, desc: &TypeDesc, registry: &TypeRegistry) -> CellKind {
        if let Some(kind) = self.cache.borrow().get(desc) {
            return *kind;
        }
        let kind = self.resolve(desc, registry);
        self.cache.borrow_mut().insert(desc.clone(), kind);
        kind
    }

    fn resolve(&self, desc: &TypeDesc, registry: &TypeRegistry) -> CellKind {
        let name = desc.to_string();
        if let Some(ctor) = self.named.get(&name) {
            return ctor(desc);
        }

        if let TypeDesc::Object(derived) = desc {
            if let Some(ctor) = self
                .named
                .iter()
                .find(|(base, _)| registry.is_assignable(derived, base))
                .map(|(_, ctor)| ctor)
            {
                return ctor(desc);
            }
        }

        let category = TypeCategory::of(desc);
        if desc.is_collection() {
            if let Some(ctor) = self.categories.get(&category) {
                return ctor(desc);
            }
        }

        if let TypeDesc::Enum(enum_name) = desc {
            return match (registry.enum_type(enum_name), self.categories.get(&category)) {
                (Some(_), Some(ctor)) => ctor(desc),
                _ => unsupported(desc),
            };
        }

        if desc.is_simple() {
            if let Some(ctor) = self.categories.get(&category) {
                return ctor(desc);
            }
        }

        match desc {
            TypeDesc::Object(type_name) if registry.has_object(type_name) => CellKind::Object,
            _ => unsupported(desc),
        }
    }
}

fn unsupported(desc: &TypeDesc) -> CellKind {
    tracing::warn!(ty = %desc, "no cell kind supports this type, using placeholder");
    CellKind::Unsupported
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumType, IntKind, ObjectType};

    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.register_enum(EnumType::new("Mode", ["A", "B"]));
        reg.register_object(ObjectType::new("Vec2").field("x", TypeDesc::Float(crate::types::FloatKind::F32)));
        reg.register_object(ObjectType::new("Tinted").with_base("Vec2"));
        reg
    }

    #[test]
    fn test_default_lookup_order() {
        let reg = registry();
        let factory = CellFactory::new();
        assert_eq!(factory.kind_for(&TypeDesc::Int(IntKind::U8), &reg), CellKind::Integer);
        assert_eq!(factory.kind_for(&TypeDesc::Enum("Mode".into()), &reg), CellKind::Enum);
        assert_eq!(factory.kind_for(&TypeDesc::Enum("Nope".into()), &reg), CellKind::Unsupported);
        assert_eq!(factory.kind_for(&TypeDesc::object("Vec2"), &reg), CellKind::Object);
        assert_eq!(factory.kind_for(&TypeDesc::object("Missing"), &reg), CellKind::Unsupported);
        assert_eq!(
            factory.kind_for(&TypeDesc::list(TypeDesc::String), &reg),
            CellKind::List
        );
        assert_eq!(factory.kind_for(&TypeDesc::Other("Mesh".into()), &reg), CellKind::Unsupported);
    }

    #[test]
    fn test_named_and_assignable_override() {
        let reg = registry();
        let mut factory = CellFactory::new();
        factory.register_type("Vec2", |_| CellKind::Unsupported);
        assert_eq!(factory.kind_for(&TypeDesc::object("Vec2"), &reg), CellKind::Unsupported);
        assert_eq!(factory.kind_for(&TypeDesc::object("Tinted"), &reg), CellKind::Unsupported);
    }

    #[test]
    fn test_empty_factory_falls_back() {
        let reg = registry();
        let factory = CellFactory::empty();
        assert_eq!(factory.kind_for(&TypeDesc::Bool, &reg), CellKind::Unsupported);
        assert_eq!(factory.kind_for(&TypeDesc::object("Vec2"), &reg), CellKind::Object);
    }
}
