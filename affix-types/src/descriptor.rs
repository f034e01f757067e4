//! Reified type descriptors
//!
//! Rust erases nothing but also reflects nothing: there is no runtime notion
//! of "subtype". A [`TypeDescriptor`] makes the type hierarchy explicit. Each
//! descriptor names a raw type, carries its generic arguments, and lists the
//! supertypes it declares. Assignability is computed from that data alone.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

/// A type that can describe itself as a [`TypeDescriptor`]
///
/// This is the stand-in for a runtime type token. Implementations usually
/// build the descriptor once and clone it out of a `static`.
///
/// # Example
///
/// ```
/// use affix_types::{Reified, TypeDescriptor};
///
/// struct Logger;
///
/// impl Reified for Logger {
///     fn type_descriptor() -> TypeDescriptor {
///         TypeDescriptor::named("app::Logger")
///     }
/// }
///
/// assert_eq!(TypeDescriptor::of::<Logger>().name(), "app::Logger");
/// ```
pub trait Reified: 'static {
    /// The descriptor of `Self`
    fn type_descriptor() -> TypeDescriptor;
}

/// A generic argument of a parameterized type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeArg {
    /// An invariant argument: only the identical type is accepted
    Exact(TypeDescriptor),
    /// `?`: any argument is accepted
    Wildcard,
    /// `? extends B`: any argument assignable to `B` is accepted
    Extends(TypeDescriptor),
}

impl TypeArg {
    /// Check whether an argument in this position accepts `other`
    pub fn accepts(&self, other: &TypeArg) -> bool {
        match (self, other) {
            (TypeArg::Wildcard, _) => true,
            (TypeArg::Exact(a), TypeArg::Exact(b)) => a == b,
            (TypeArg::Exact(_), _) => false,
            (TypeArg::Extends(bound), TypeArg::Exact(b)) => bound.is_assignable_from(b),
            (TypeArg::Extends(bound), TypeArg::Extends(b)) => bound.is_assignable_from(b),
            (TypeArg::Extends(_), TypeArg::Wildcard) => false,
        }
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Exact(ty) => write!(f, "{}", ty),
            TypeArg::Wildcard => write!(f, "?"),
            TypeArg::Extends(bound) => write!(f, "? extends {}", bound),
        }
    }
}

struct Inner {
    name: String,
    args: Vec<TypeArg>,
    supertypes: Vec<TypeDescriptor>,
    anonymous: bool,
    /// Rendered form, computed once; used for display and ordering
    rendered: String,
}

/// An immutable description of a (possibly parameterized) type
///
/// Descriptors are cheap to clone and compare. Equality and hashing look at
/// the raw name, the generic arguments and the anonymity flag; the declared
/// supertypes belong to the raw type and are not compared.
#[derive(Clone)]
pub struct TypeDescriptor(Arc<Inner>);

static ANONYMOUS_COUNTER: AtomicU64 = AtomicU64::new(1);

impl TypeDescriptor {
    /// A raw type with no arguments and no declared supertypes
    pub fn named(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    /// Start building a descriptor for the raw type `name`
    pub fn builder(name: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            name: name.into(),
            args: Vec::new(),
            supertypes: Vec::new(),
            anonymous: false,
        }
    }

    /// The descriptor a [`Reified`] type declares for itself
    pub fn of<T: Reified>() -> Self {
        T::type_descriptor()
    }

    /// A raw descriptor named after the Rust type `T`
    ///
    /// Useful for leaf types that take part in no hierarchy.
    pub fn from_type_name<T: ?Sized>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    /// Synthesize a fresh anonymous subtype of `supertype`
    ///
    /// Every call yields a distinct type, named after the supertype's raw
    /// name with a `$anon` suffix.
    pub fn anonymous_of(supertype: &TypeDescriptor) -> Self {
        let n = ANONYMOUS_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
        Self::builder(format!("{}$anon{}", supertype.name(), n))
            .supertype(supertype.clone())
            .anonymous()
            .build()
    }

    /// Raw type name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Generic arguments, empty for raw types
    pub fn args(&self) -> &[TypeArg] {
        &self.0.args
    }

    /// Directly declared supertypes
    pub fn supertypes(&self) -> &[TypeDescriptor] {
        &self.0.supertypes
    }

    /// Whether this describes a synthetic, anonymous implementation type
    pub fn is_anonymous(&self) -> bool {
        self.0.anonymous
    }

    /// Whether this descriptor carries generic arguments
    pub fn is_parameterized(&self) -> bool {
        !self.0.args.is_empty()
    }

    /// The erased form: same raw type and supertypes, no arguments
    pub fn raw(&self) -> TypeDescriptor {
        if !self.is_parameterized() {
            return self.clone();
        }
        TypeDescriptor::from_parts(
            self.0.name.clone(),
            Vec::new(),
            self.0.supertypes.clone(),
            self.0.anonymous,
        )
    }

    /// The closest non-anonymous type: `self`, or the first named type found
    /// by walking the declared supertypes of an anonymous descriptor
    pub fn nearest_named(&self) -> TypeDescriptor {
        if !self.is_anonymous() {
            return self.clone();
        }
        self.supertypes()
            .iter()
            .map(TypeDescriptor::nearest_named)
            .find(|ty| !ty.is_anonymous())
            .unwrap_or_else(|| self.clone())
    }

    /// Check whether a value of type `other` may be used where `self` is
    /// expected
    ///
    /// The relation is reflexive and transitive. `other` is accepted when it
    /// shares the raw type with compatible arguments, or when one of its
    /// declared supertypes is accepted. A raw `self` accepts every
    /// parameterization of the same raw type.
    pub fn is_assignable_from(&self, other: &TypeDescriptor) -> bool {
        if self.matches_directly(other) {
            return true;
        }
        other
            .supertypes()
            .iter()
            .any(|supertype| self.is_assignable_from(supertype))
    }

    /// Inverse of [`is_assignable_from`](Self::is_assignable_from)
    pub fn is_subtype_of(&self, other: &TypeDescriptor) -> bool {
        other.is_assignable_from(self)
    }

    fn matches_directly(&self, other: &TypeDescriptor) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.name() != other.name() || self.is_anonymous() != other.is_anonymous() {
            return false;
        }
        if self.args().is_empty() {
            return true;
        }
        if other.args().is_empty() {
            return self.args().iter().all(|arg| *arg == TypeArg::Wildcard);
        }
        self.args().len() == other.args().len()
            && self
                .args()
                .iter()
                .zip(other.args())
                .all(|(ours, theirs)| ours.accepts(theirs))
    }

    fn from_parts(
        name: String,
        args: Vec<TypeArg>,
        supertypes: Vec<TypeDescriptor>,
        anonymous: bool,
    ) -> Self {
        let rendered = render(&name, &args);
        Self(Arc::new(Inner {
            name,
            args,
            supertypes,
            anonymous,
            rendered,
        }))
    }
}

fn render(name: &str, args: &[TypeArg]) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("{}<{}>", name, args.join(", "))
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.name == other.0.name
                && self.0.anonymous == other.0.anonymous
                && self.0.args == other.0.args)
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
        self.0.anonymous.hash(state);
        self.0.args.hash(state);
    }
}

impl Ord for TypeDescriptor {
    /// Orders by rendered string form; structural fields break ties so the
    /// order stays consistent with equality
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .rendered
            .cmp(&other.0.rendered)
            .then_with(|| self.0.anonymous.cmp(&other.0.anonymous))
            .then_with(|| self.0.name.cmp(&other.0.name))
            .then_with(|| self.0.args.cmp(&other.0.args))
    }
}

impl PartialOrd for TypeDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.rendered)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.0.rendered)
    }
}

/// Builder for [`TypeDescriptor`]
#[derive(Debug, Clone)]
pub struct TypeDescriptorBuilder {
    name: String,
    args: Vec<TypeArg>,
    supertypes: Vec<TypeDescriptor>,
    anonymous: bool,
}

impl TypeDescriptorBuilder {
    /// Append an invariant generic argument
    pub fn arg(mut self, ty: TypeDescriptor) -> Self {
        self.args.push(TypeArg::Exact(ty));
        self
    }

    /// Append a `?` argument
    pub fn wildcard(mut self) -> Self {
        self.args.push(TypeArg::Wildcard);
        self
    }

    /// Append a `? extends bound` argument
    pub fn extends_arg(mut self, bound: TypeDescriptor) -> Self {
        self.args.push(TypeArg::Extends(bound));
        self
    }

    /// Declare a direct supertype
    pub fn supertype(mut self, ty: TypeDescriptor) -> Self {
        self.supertypes.push(ty);
        self
    }

    /// Mark the described type as anonymous
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Finish the descriptor
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::from_parts(self.name, self.args, self.supertypes, self.anonymous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use proptest::prelude::*;

    static OBJECT: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::named("Object"));
    static HANDLER: Lazy<TypeDescriptor> = Lazy::new(|| {
        TypeDescriptor::builder("Handler")
            .supertype(OBJECT.clone())
            .build()
    });
    static CLICK_HANDLER: Lazy<TypeDescriptor> = Lazy::new(|| {
        TypeDescriptor::builder("ClickHandler")
            .supertype(HANDLER.clone())
            .build()
    });

    fn provider(arg: TypeArg) -> TypeDescriptor {
        let builder = TypeDescriptor::builder("Provider");
        let builder = match arg {
            TypeArg::Exact(ty) => builder.arg(ty),
            TypeArg::Wildcard => builder.wildcard(),
            TypeArg::Extends(bound) => builder.extends_arg(bound),
        };
        builder.build()
    }

    #[test]
    fn test_reflexive() {
        assert!(HANDLER.is_assignable_from(&HANDLER));
        let list = provider(TypeArg::Exact(HANDLER.clone()));
        assert!(list.is_assignable_from(&list.clone()));
    }

    #[test]
    fn test_subtype_walk() {
        assert!(OBJECT.is_assignable_from(&CLICK_HANDLER));
        assert!(HANDLER.is_assignable_from(&CLICK_HANDLER));
        assert!(!CLICK_HANDLER.is_assignable_from(&HANDLER));
        assert!(CLICK_HANDLER.is_subtype_of(&OBJECT));
    }

    #[test]
    fn test_unrelated_types() {
        let other = TypeDescriptor::named("Other");
        assert!(!HANDLER.is_assignable_from(&other));
        assert!(!other.is_assignable_from(&HANDLER));
    }

    #[test]
    fn test_generic_arguments_are_invariant() {
        let of_handler = provider(TypeArg::Exact(HANDLER.clone()));
        let of_click = provider(TypeArg::Exact(CLICK_HANDLER.clone()));

        assert!(!of_handler.is_assignable_from(&of_click));
        assert!(!of_click.is_assignable_from(&of_handler));
    }

    #[test]
    fn test_bounded_wildcard() {
        let of_extends_handler = provider(TypeArg::Extends(HANDLER.clone()));
        let of_click = provider(TypeArg::Exact(CLICK_HANDLER.clone()));
        let of_object = provider(TypeArg::Exact(OBJECT.clone()));

        assert!(of_extends_handler.is_assignable_from(&of_click));
        assert!(!of_extends_handler.is_assignable_from(&of_object));

        let of_extends_click = provider(TypeArg::Extends(CLICK_HANDLER.clone()));
        assert!(of_extends_handler.is_assignable_from(&of_extends_click));
        assert!(!of_extends_click.is_assignable_from(&of_extends_handler));
    }

    #[test]
    fn test_raw_accepts_every_parameterization() {
        let raw = TypeDescriptor::named("Provider");
        let of_click = provider(TypeArg::Exact(CLICK_HANDLER.clone()));

        assert!(raw.is_assignable_from(&of_click));
        assert!(!of_click.is_assignable_from(&raw));
        assert!(provider(TypeArg::Wildcard).is_assignable_from(&raw));
        assert_eq!(of_click.raw(), raw);
    }

    #[test]
    fn test_parameterized_supertype() {
        let of_handler = provider(TypeArg::Exact(HANDLER.clone()));
        let handler_provider = TypeDescriptor::builder("HandlerProvider")
            .supertype(of_handler.clone())
            .build();

        assert!(of_handler.is_assignable_from(&handler_provider));
        assert!(provider(TypeArg::Wildcard).is_assignable_from(&handler_provider));
        assert!(!provider(TypeArg::Exact(OBJECT.clone())).is_assignable_from(&handler_provider));
    }

    #[test]
    fn test_anonymous_subtype() {
        let anon = TypeDescriptor::anonymous_of(&HANDLER);

        assert!(anon.is_anonymous());
        assert_ne!(anon, *HANDLER);
        assert!(HANDLER.is_assignable_from(&anon));
        assert!(OBJECT.is_assignable_from(&anon));
        assert!(!anon.is_assignable_from(&HANDLER));
        assert_eq!(anon.nearest_named(), *HANDLER);
    }

    #[test]
    fn test_anonymous_types_are_distinct() {
        let a = TypeDescriptor::anonymous_of(&HANDLER);
        let b = TypeDescriptor::anonymous_of(&HANDLER);

        assert_ne!(a, b);
        assert!(!a.is_assignable_from(&b));
    }

    #[test]
    fn test_equality_ignores_supertypes() {
        let plain = TypeDescriptor::named("Handler");
        assert_eq!(plain, *HANDLER);
        assert_eq!(plain.cmp(&HANDLER), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        let nested = TypeDescriptor::builder("Map")
            .arg(TypeDescriptor::named("String"))
            .extends_arg(HANDLER.clone())
            .wildcard()
            .build();

        insta::assert_snapshot!(nested, @"Map<String, ? extends Handler, ?>");
        insta::assert_snapshot!(format!("{:?}", *HANDLER), @"TypeDescriptor(Handler)");
    }

    #[test]
    fn test_ordering_is_by_rendered_form() {
        let mut types = vec![
            CLICK_HANDLER.clone(),
            OBJECT.clone(),
            provider(TypeArg::Wildcard),
            HANDLER.clone(),
        ];
        types.sort();

        let names: Vec<String> = types.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["ClickHandler", "Handler", "Object", "Provider<?>"]);
    }

    /// Builds `T0 <- T1 <- ... <- Tn`, each `Ti` declaring `Ti-1` as its supertype
    fn chain(len: usize) -> Vec<TypeDescriptor> {
        let mut types: Vec<TypeDescriptor> = Vec::with_capacity(len);
        for i in 0..len {
            let mut builder = TypeDescriptor::builder(format!("T{}", i));
            if let Some(parent) = types.last() {
                builder = builder.supertype(parent.clone());
            }
            types.push(builder.build());
        }
        types
    }

    proptest! {
        #[test]
        fn prop_chain_assignability(len in 1usize..12, a in 0usize..12, b in 0usize..12, c in 0usize..12) {
            let types = chain(len);
            let (a, b, c) = (a % len, b % len, c % len);

            prop_assert!(types[a].is_assignable_from(&types[a]));
            prop_assert_eq!(types[a].is_assignable_from(&types[b]), a <= b);

            if types[a].is_assignable_from(&types[b]) && types[b].is_assignable_from(&types[c]) {
                prop_assert!(types[a].is_assignable_from(&types[c]));
            }
        }

        #[test]
        fn prop_ordering_is_total(x in "[A-Z][a-z]{0,6}", y in "[A-Z][a-z]{0,6}") {
            let a = TypeDescriptor::named(x.clone());
            let b = TypeDescriptor::named(y.clone());

            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
        }
    }
}
