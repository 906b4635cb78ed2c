//! Literal types and the type registry
//!
//! A literal type takes part in programs by being able to:
//! - parse its footnote text into a [`Value`]
//! - produce a random literal of itself
//! - blend two of its literals into a new one
//!
//! Types are looked up by footnote tag through an explicit [`TypeRegistry`]
//! populated once at startup.

use crate::codegen::{random_point, GenerationOptions};
use crate::error::ValueError;
use crate::program::Program;
use crate::value::Value;
use indexmap::IndexMap;
use rand::{Rng, RngCore};
use std::fmt;
use std::sync::Arc;

/// Capability descriptor for one literal type
pub trait LiteralType: Send + Sync + fmt::Debug {
    /// Footnote tag of the type (`int` for `«int»`)
    fn name(&self) -> &str;

    /// Read footnote text as a value
    ///
    /// # Errors
    /// Returns [`ValueError::Invalid`] if the text is not a literal of this type
    fn parse(&self, text: &str) -> Result<Value, ValueError>;

    /// Produce the text of a fresh random literal
    fn random_value(&self, options: &GenerationOptions, rng: &mut dyn RngCore) -> String;

    /// Combine two literals of this type
    fn blend(&self, a: &str, b: &str, rng: &mut dyn RngCore) -> String;
}

/// `«int»`: signed 64-bit integers
#[derive(Debug, Clone, Copy, Default)]
pub struct IntType;

impl LiteralType for IntType {
    fn name(&self) -> &str {
        "int"
    }

    fn parse(&self, text: &str) -> Result<Value, ValueError> {
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ValueError::invalid("int", text))
    }

    fn random_value(&self, options: &GenerationOptions, rng: &mut dyn RngCore) -> String {
        let lo = options.int_min.min(options.int_max);
        let hi = options.int_min.max(options.int_max);
        rng.gen_range(lo..=hi).to_string()
    }

    fn blend(&self, a: &str, b: &str, rng: &mut dyn RngCore) -> String {
        match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
            (Ok(x), Ok(y)) => rng.gen_range(x.min(y)..=x.max(y)).to_string(),
            _ => a.to_string(),
        }
    }
}

/// `«float»`: 64-bit floating point
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType;

impl LiteralType for FloatType {
    fn name(&self) -> &str {
        "float"
    }

    fn parse(&self, text: &str) -> Result<Value, ValueError> {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(Value::Float)
            .ok_or_else(|| ValueError::invalid("float", text))
    }

    fn random_value(&self, options: &GenerationOptions, rng: &mut dyn RngCore) -> String {
        let lo = options.float_min.min(options.float_max);
        let hi = options.float_min.max(options.float_max);
        format!("{:?}", rng.gen_range(lo..=hi))
    }

    fn blend(&self, a: &str, b: &str, rng: &mut dyn RngCore) -> String {
        match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
            (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => {
                let t: f64 = rng.gen();
                format!("{:?}", x + t * (y - x))
            }
            _ => a.to_string(),
        }
    }
}

/// `«bool»`: `true` / `false`
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolType;

impl LiteralType for BoolType {
    fn name(&self) -> &str {
        "bool"
    }

    fn parse(&self, text: &str) -> Result<Value, ValueError> {
        match text.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ValueError::invalid("bool", text)),
        }
    }

    fn random_value(&self, options: &GenerationOptions, rng: &mut dyn RngCore) -> String {
        rng.gen_bool(options.bool_true_probability.clamp(0.0, 1.0))
            .to_string()
    }

    fn blend(&self, a: &str, b: &str, rng: &mut dyn RngCore) -> String {
        if rng.gen_bool(0.5) { a } else { b }.to_string()
    }
}

/// `«code»`: a literal program
///
/// Random code literals carry no literals of their own, so they fit on a
/// single footnote line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeType;

impl LiteralType for CodeType {
    fn name(&self) -> &str {
        "code"
    }

    fn parse(&self, text: &str) -> Result<Value, ValueError> {
        Program::parse(text)
            .map(Value::Code)
            .map_err(|_| ValueError::invalid("code", text))
    }

    fn random_value(&self, options: &GenerationOptions, rng: &mut dyn RngCore) -> String {
        let mut plain = options.clone();
        plain.type_names.clear();
        let size = plain.target_size_in_points.max(1);
        random_point(size, &plain, &TypeRegistry::new(), rng).compact()
    }

    fn blend(&self, a: &str, b: &str, rng: &mut dyn RngCore) -> String {
        if rng.gen_bool(0.5) { a } else { b }.to_string()
    }
}

/// Explicit mapping from type name to literal type
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, Arc<dyn LiteralType>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}

impl TypeRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Registry with `int`, `float`, `bool` and `code`
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(IntType);
        registry.register(FloatType);
        registry.register(BoolType);
        registry.register(CodeType);
        registry
    }

    /// Register a literal type under its own name
    pub fn register<T: LiteralType + 'static>(&mut self, literal_type: T) {
        self.register_arc(Arc::new(literal_type));
    }

    /// Register a shared literal type
    pub fn register_arc(&mut self, literal_type: Arc<dyn LiteralType>) {
        self.types
            .insert(literal_type.name().to_string(), literal_type);
    }

    /// Sub-registry holding only the named types
    ///
    /// # Errors
    /// Returns [`ValueError::UnknownType`] for the first name not registered
    pub fn restricted<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ValueError> {
        let mut subset = Self::new();
        for name in names {
            let literal_type = self
                .get(name.as_ref())
                .ok_or_else(|| ValueError::UnknownType(name.as_ref().to_string()))?;
            subset.register_arc(Arc::clone(literal_type));
        }
        Ok(subset)
    }

    /// Look up a type
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn LiteralType>> {
        self.types.get(name)
    }

    /// Check if a type is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Number of registered types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Parse literal text of the named type
    ///
    /// # Errors
    /// Returns [`ValueError::UnknownType`] or the type's own parse error
    pub fn parse_value(&self, type_name: &str, text: &str) -> Result<Value, ValueError> {
        self.get(type_name)
            .ok_or_else(|| ValueError::UnknownType(type_name.to_string()))?
            .parse(text)
    }

    /// Random literal text of the named type, `None` if unregistered
    #[must_use]
    pub fn random_value(
        &self,
        type_name: &str,
        options: &GenerationOptions,
        rng: &mut dyn RngCore,
    ) -> Option<String> {
        self.get(type_name)
            .map(|literal_type| literal_type.random_value(options, rng))
    }

    /// Blend two literals of the named type
    ///
    /// Unregistered types keep the first literal unchanged.
    #[must_use]
    pub fn blend(&self, type_name: &str, a: &str, b: &str, rng: &mut dyn RngCore) -> String {
        match self.get(type_name) {
            Some(literal_type) => literal_type.blend(a, b, rng),
            None => {
                tracing::trace!(type_name, "no blend for unregistered type");
                a.to_string()
            }
        }
    }
}
