//! Source AST surface.
//!
//! The resolution engine never sees a host compiler's AST directly. A
//! front-end lowers declarations into the types below and answers queries
//! through [`AstProvider`]; [`Program`] is the owned in-memory
//! implementation front-ends lower into.

pub mod program;
pub mod types;

use std::fmt;

use serde::{Deserialize, Serialize};
use wirebind_common::constants::PRELUDE_PACKAGES;
use wirebind_common::types::QualifiedName;

pub use program::Program;
pub use types::{Substitution, TypeDesc, TypeKind};

/// Identity of a class declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Identity of a method, property or top-level function declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub u32);

/// A source element that diagnostics and traces can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AstElement {
    /// A class declaration.
    Class(ClassId),
    /// The constructor at `index` of `class`.
    Constructor {
        /// Declaring class.
        class: ClassId,
        /// Position in [`AstClass::constructors`].
        index: usize,
    },
    /// A member or top-level function.
    Method(MethodId),
}

/// Declaration visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Visible everywhere.
    #[default]
    Public,
    /// Visible within the module.
    Internal,
    /// Visible to subclasses.
    Protected,
    /// Visible to the declaring scope only.
    Private,
}

/// What kind of class a declaration is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    /// A regular or abstract class.
    #[default]
    Class,
    /// An interface.
    Interface,
    /// A singleton object.
    Object,
    /// An annotation class.
    Annotation,
}

/// Whether a member is a function or a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    /// A function with a parameter list.
    #[default]
    Function,
    /// A property read.
    Property,
}

/// An annotation usage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AstAnnotation {
    /// Package of the annotation class.
    pub package: String,
    /// Simple name of the annotation class.
    pub name: String,
    /// Rendered argument values, in order.
    pub args: Vec<String>,
}

impl AstAnnotation {
    /// An annotation usage without arguments.
    #[must_use]
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Adds an argument value.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns true if this usage is of the annotation `name`.
    pub fn is(&self, name: QualifiedName) -> bool {
        name.matches(&self.package, &self.name)
    }

    /// The annotation class as a type.
    pub fn ty(&self) -> TypeDesc {
        TypeDesc::declared(self.package.clone(), self.name.clone())
    }
}

impl From<QualifiedName> for AstAnnotation {
    fn from(name: QualifiedName) -> Self {
        Self::new(name.package, name.name)
    }
}

impl fmt::Display for AstAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "({})", self.args.join(", "))?;
        }
        Ok(())
    }
}

/// A declared type parameter with its upper bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParam {
    /// Parameter name.
    pub name: String,
    /// Upper bounds; empty means unbounded.
    pub bounds: Vec<TypeDesc>,
}

impl TypeParam {
    /// An unbounded type parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
        }
    }

    /// Adds an upper bound.
    #[must_use]
    pub fn bounded_by(mut self, bound: TypeDesc) -> Self {
        self.bounds.push(bound);
        self
    }
}

/// A constructor or function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstParam {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: TypeDesc,
    /// Annotations on the parameter.
    pub annotations: Vec<AstAnnotation>,
    /// Whether the parameter declares a default value.
    pub has_default: bool,
    /// Whether a constructor parameter also declares a read-only property.
    pub is_val: bool,
    /// Visibility of that property.
    pub visibility: Visibility,
}

impl AstParam {
    /// A plain parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
            has_default: false,
            is_val: false,
            visibility: Visibility::Public,
        }
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: impl Into<AstAnnotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Declares a default value.
    #[must_use]
    pub const fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Declares the parameter as a property.
    #[must_use]
    pub const fn val(mut self) -> Self {
        self.is_val = true;
        self
    }

    /// Sets the property visibility.
    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

impl fmt::Display for AstParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// A class constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstConstructor {
    /// Parameters in declaration order.
    pub params: Vec<AstParam>,
    /// Annotations on the constructor.
    pub annotations: Vec<AstAnnotation>,
    /// Whether callers may pass arguments by name.
    pub supports_named_arguments: bool,
}

impl AstConstructor {
    /// A constructor with the given parameters.
    #[must_use]
    pub const fn new(params: Vec<AstParam>) -> Self {
        Self {
            params,
            annotations: Vec::new(),
            supports_named_arguments: true,
        }
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: impl Into<AstAnnotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }
}

/// A class, interface, object or annotation declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstClass {
    /// Declaring package.
    pub package: String,
    /// Simple name, with `.` separating nested declarations.
    pub name: String,
    /// Declaration kind.
    pub kind: ClassKind,
    /// Declaration visibility.
    pub visibility: Visibility,
    /// Whether the class is abstract (interfaces always are).
    pub is_abstract: bool,
    /// Annotations on the class.
    pub annotations: Vec<AstAnnotation>,
    /// Declared type parameters.
    pub type_params: Vec<TypeParam>,
    /// Direct supertypes, possibly referring to `type_params`.
    pub super_types: Vec<TypeDesc>,
    /// Constructors; the primary constructor comes first.
    pub constructors: Vec<AstConstructor>,
    /// Declared members, in source order.
    pub methods: Vec<MethodId>,
}

impl AstClass {
    /// A public concrete class without constructors or members.
    #[must_use]
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            kind: ClassKind::Class,
            visibility: Visibility::Public,
            is_abstract: false,
            annotations: Vec::new(),
            type_params: Vec::new(),
            super_types: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A public interface.
    #[must_use]
    pub fn interface(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Interface,
            is_abstract: true,
            ..Self::new(package, name)
        }
    }

    /// A public singleton object.
    #[must_use]
    pub fn object(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Object,
            ..Self::new(package, name)
        }
    }

    /// Marks the class abstract.
    #[must_use]
    pub const fn make_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: impl Into<AstAnnotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Adds a direct supertype.
    #[must_use]
    pub fn extends(mut self, super_type: TypeDesc) -> Self {
        self.super_types.push(super_type);
        self
    }

    /// Adds a type parameter.
    #[must_use]
    pub fn with_type_param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    /// Adds a constructor. The first one added is the primary constructor.
    #[must_use]
    pub fn with_constructor(mut self, constructor: AstConstructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Sets the visibility.
    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// The class type, with its own type parameters as arguments.
    pub fn ty(&self) -> TypeDesc {
        TypeDesc::declared(self.package.clone(), self.name.clone()).with_args(
            self.type_params
                .iter()
                .map(|param| TypeDesc::parameter(param.name.clone()))
                .collect(),
        )
    }

    /// The primary constructor, if any.
    pub fn primary_constructor(&self) -> Option<&AstConstructor> {
        self.constructors.first()
    }

    /// Binds this class's type parameters to the arguments of `ty`.
    pub fn substitution_for(&self, ty: &TypeDesc) -> Substitution {
        self.type_params
            .iter()
            .zip(&ty.resolved().args)
            .map(|(param, arg)| (param.name.clone(), arg.clone()))
            .collect()
    }

    /// Returns true if any annotation is `name`.
    pub fn has_annotation(&self, name: QualifiedName) -> bool {
        self.annotations.iter().any(|a| a.is(name))
    }
}

impl fmt::Display for AstClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() || PRELUDE_PACKAGES.contains(&self.package.as_str()) {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// A member function, property, or top-level function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstMethod {
    /// Declaring class; `None` for top-level functions.
    pub owner: Option<ClassId>,
    /// Package of a top-level function.
    pub package: String,
    /// Member name.
    pub name: String,
    /// Function or property.
    pub kind: MethodKind,
    /// Declaration visibility.
    pub visibility: Visibility,
    /// Whether the member has no body.
    pub is_abstract: bool,
    /// Whether the member suspends.
    pub is_suspend: bool,
    /// Annotations on the member.
    pub annotations: Vec<AstAnnotation>,
    /// Extension receiver type.
    pub receiver: Option<TypeDesc>,
    /// Parameters in declaration order.
    pub params: Vec<AstParam>,
    /// Declared return type.
    pub return_type: TypeDesc,
    /// Declared type parameters.
    pub type_params: Vec<TypeParam>,
}

impl AstMethod {
    /// A concrete public function.
    #[must_use]
    pub fn function(name: impl Into<String>, return_type: TypeDesc) -> Self {
        Self {
            owner: None,
            package: String::new(),
            name: name.into(),
            kind: MethodKind::Function,
            visibility: Visibility::Public,
            is_abstract: false,
            is_suspend: false,
            annotations: Vec::new(),
            receiver: None,
            params: Vec::new(),
            return_type,
            type_params: Vec::new(),
        }
    }

    /// A concrete public property.
    #[must_use]
    pub fn property(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            kind: MethodKind::Property,
            ..Self::function(name, ty)
        }
    }

    /// Marks the member abstract.
    #[must_use]
    pub const fn make_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Marks the member suspending.
    #[must_use]
    pub const fn suspending(mut self) -> Self {
        self.is_suspend = true;
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: impl Into<AstAnnotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, param: AstParam) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the extension receiver.
    #[must_use]
    pub fn with_receiver(mut self, receiver: TypeDesc) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Adds a type parameter.
    #[must_use]
    pub fn with_type_param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    /// Sets the visibility.
    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Places a top-level function in `package`.
    #[must_use]
    pub fn in_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Returns true if any annotation is `name`.
    pub fn has_annotation(&self, name: QualifiedName) -> bool {
        self.annotations.iter().any(|a| a.is(name))
    }

    fn signature(&self) -> String {
        let receiver = self
            .receiver
            .as_ref()
            .map(|r| format!("{r}."))
            .unwrap_or_default();
        match self.kind {
            MethodKind::Property => format!("{receiver}{}: {}", self.name, self.return_type),
            MethodKind::Function => {
                let params = self
                    .params
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{receiver}{}({params}): {}", self.name, self.return_type)
            }
        }
    }
}

/// Read access to the declarations of one compilation.
///
/// Implementors supply lookups; everything else has a default built on
/// them.
pub trait AstProvider {
    /// The class with identity `id`.
    fn class(&self, id: ClassId) -> &AstClass;

    /// The method with identity `id`.
    fn method(&self, id: MethodId) -> &AstMethod;

    /// The class declaring `ty`, looking through type aliases.
    fn class_for(&self, ty: &TypeDesc) -> Option<ClassId>;

    /// Top-level functions named `name` in `package`.
    fn find_functions(&self, package: &str, name: &str) -> Vec<MethodId>;

    /// The annotation class of `annotation`, if declared in this compilation.
    fn annotation_class(&self, annotation: &AstAnnotation) -> Option<ClassId> {
        self.class_for(&annotation.ty())
    }

    /// `class` followed by its supertypes, depth first, each class once.
    fn inheritance_chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut stack = vec![class];
        while let Some(current) = stack.pop() {
            if chain.contains(&current) {
                continue;
            }
            chain.push(current);
            for super_type in self.class(current).super_types.iter().rev() {
                if let Some(id) = self.class_for(super_type) {
                    stack.push(id);
                }
            }
        }
        chain
    }

    /// Every supertype of `ty`, with type arguments substituted.
    fn supertypes(&self, ty: &TypeDesc) -> Vec<TypeDesc> {
        let mut out: Vec<TypeDesc> = Vec::new();
        let mut stack = vec![ty.resolved().clone()];
        while let Some(current) = stack.pop() {
            let Some(id) = self.class_for(&current) else {
                continue;
            };
            let class = self.class(id);
            let substitution = class.substitution_for(&current);
            for super_type in &class.super_types {
                let super_type = super_type.substitute(&substitution);
                if !out.contains(&super_type) {
                    out.push(super_type.clone());
                    stack.push(super_type);
                }
            }
        }
        out
    }

    /// Type parameter bindings that members of `owner` see when inherited by
    /// `enclosing`.
    fn member_substitution(&self, enclosing: ClassId, owner: ClassId) -> Substitution {
        if enclosing == owner {
            return Substitution::default();
        }
        let owner_class = self.class(owner);
        self.supertypes(&self.class(enclosing).ty())
            .into_iter()
            .find(|st| self.class_for(st) == Some(owner))
            .map(|st| owner_class.substitution_for(&st))
            .unwrap_or_default()
    }

    /// The return type of `method` as seen from `enclosing`.
    fn return_type_for(&self, method: MethodId, enclosing: ClassId) -> TypeDesc {
        let method = self.method(method);
        match method.owner {
            Some(owner) => method
                .return_type
                .substitute(&self.member_substitution(enclosing, owner)),
            None => method.return_type.clone(),
        }
    }

    /// Returns true if `method` overrides `other`: same name, kind and
    /// parameter types, declared in a subtype of `other`'s owner.
    fn overrides(&self, method: MethodId, other: MethodId) -> bool {
        let (a, b) = (self.method(method), self.method(other));
        let (Some(a_owner), Some(b_owner)) = (a.owner, b.owner) else {
            return false;
        };
        if a_owner == b_owner || a.name != b.name || a.kind != b.kind {
            return false;
        }
        if !self.inheritance_chain(a_owner).contains(&b_owner) {
            return false;
        }
        let substitution = self.member_substitution(a_owner, b_owner);
        a.params.len() == b.params.len()
            && a.params
                .iter()
                .zip(&b.params)
                .all(|(x, y)| x.ty.same_type(&y.ty.substitute(&substitution)))
            && a.receiver.as_ref().map(TypeDesc::resolved)
                == b.receiver
                    .as_ref()
                    .map(|r| r.substitute(&substitution))
                    .as_ref()
                    .map(TypeDesc::resolved)
    }

    /// Returns true if a value of type `source` can be used where `target` is
    /// expected.
    fn is_assignable_from(&self, target: &TypeDesc, source: &TypeDesc) -> bool {
        if source.resolved().nullable && !target.resolved().nullable {
            return false;
        }
        target.same_type(source)
            || self
                .supertypes(source)
                .iter()
                .any(|super_type| target.same_type(super_type))
    }

    /// Renders `element` as one trace line, e.g. `Foo(bar: Bar)` or
    /// `MyComponent.foo(): Foo`.
    fn to_trace(&self, element: AstElement) -> String {
        match element {
            AstElement::Class(id) => self.class(id).to_string(),
            AstElement::Constructor { class, index } => {
                let class = self.class(class);
                let params = class
                    .constructors
                    .get(index)
                    .map(|c| {
                        c.params
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                format!("{class}({params})")
            }
            AstElement::Method(id) => {
                let method = self.method(id);
                match method.owner {
                    Some(owner) => format!("{}.{}", self.class(owner), method.signature()),
                    None => method.signature(),
                }
            }
        }
    }
}
