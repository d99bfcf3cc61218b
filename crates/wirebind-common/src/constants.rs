//! Annotation identities, well-known types, option keys and naming
//! conventions.

use crate::types::QualifiedName;

/// Package holding the injection annotations.
pub const ANNOTATION_PACKAGE: &str = "wirebind.annotations";

/// Marks an abstract class as a component to generate.
pub const COMPONENT: QualifiedName = QualifiedName::new(ANNOTATION_PACKAGE, "Component");
/// Marks a member as a binding.
pub const PROVIDES: QualifiedName = QualifiedName::new(ANNOTATION_PACKAGE, "Provides");
/// Meta-annotation identifying scope annotations.
pub const SCOPE: QualifiedName = QualifiedName::new(ANNOTATION_PACKAGE, "Scope");
/// Marks an injectable class or constructor, or an injectable top-level function.
pub const INJECT: QualifiedName = QualifiedName::new(ANNOTATION_PACKAGE, "Inject");
/// Contributes a `Pair<K, V>` entry to `Map<K, V>`.
pub const INTO_MAP: QualifiedName = QualifiedName::new(ANNOTATION_PACKAGE, "IntoMap");
/// Contributes an element to `Set<T>`.
pub const INTO_SET: QualifiedName = QualifiedName::new(ANNOTATION_PACKAGE, "IntoSet");
/// Meta-annotation identifying qualifier annotations.
pub const QUALIFIER: QualifiedName = QualifiedName::new(ANNOTATION_PACKAGE, "Qualifier");

/// `javax.inject.Inject`, honored when javax annotations are enabled.
pub const JAVAX_INJECT: QualifiedName = QualifiedName::new("javax.inject", "Inject");
/// `javax.inject.Scope`, honored when javax annotations are enabled.
pub const JAVAX_SCOPE: QualifiedName = QualifiedName::new("javax.inject", "Scope");
/// `javax.inject.Qualifier`, honored when javax annotations are enabled.
pub const JAVAX_QUALIFIER: QualifiedName = QualifiedName::new("javax.inject", "Qualifier");

/// Deferred single value.
pub const LAZY: QualifiedName = QualifiedName::new("kotlin", "Lazy");
/// Set container.
pub const SET: QualifiedName = QualifiedName::new("kotlin.collections", "Set");
/// Map container.
pub const MAP: QualifiedName = QualifiedName::new("kotlin.collections", "Map");
/// Key/value pair returned by map contributors.
pub const PAIR: QualifiedName = QualifiedName::new("kotlin", "Pair");
/// The empty return type.
pub const UNIT: QualifiedName = QualifiedName::new("kotlin", "Unit");
/// Package of the function type family `Function0`, `Function1`, ...
pub const FUNCTION_PACKAGE: &str = "kotlin";

/// Packages whose declarations render by simple name.
pub const PRELUDE_PACKAGES: &[&str] = &["kotlin", "kotlin.collections"];

/// Option key enabling `javax.inject` annotations.
pub const OPTION_ENABLE_JAVAX_ANNOTATIONS: &str = "wirebind.enableJavaxAnnotations";
/// Option key enabling the plan graph dump.
pub const OPTION_DUMP_GRAPH: &str = "wirebind.dumpGraph";

/// Prefix of generated component implementations.
pub const GENERATED_CLASS_PREFIX: &str = "Inject";
/// Prefix of synthesized private accessors.
pub const PRIVATE_ACCESSOR_PREFIX: &str = "_";
/// Prefix of synthesized lambda argument names.
pub const ARG_NAME_PREFIX: &str = "arg";
