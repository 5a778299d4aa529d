//! Schema-driven mock data generation.
//!
//! [`MockGenerator`] walks any [`SchemaIntrospect`] implementation, so the
//! typed [`SchemaNode`](crate::domain::SchemaNode) used by widget authors and
//! the JSON Schema documents read by the metadata extractor share one set of
//! rules:
//!
//! | node       | generated value                                       |
//! |------------|-------------------------------------------------------|
//! | `string`   | a lorem word                                          |
//! | `number`   | integer in `number_min..=number_max`                  |
//! | `boolean`  | fair coin                                             |
//! | `array`    | `array_min..=array_max` elements (or the node arity)  |
//! | `object`   | every field, in declaration order                     |
//! | `optional` | absent with `optional_probability`                    |
//! | `nullable` | `null` with `nullable_probability`                    |
//! | `enum`     | one of the declared values                            |
//! | `union`    | one alternative, then recurse                         |
//! | `literal`  | the literal                                           |
//! | `default`  | the default value                                     |
//!
//! Anything else is logged and generated as `null`; generation never fails.
//! Array lengths never exceed [`MAX_ARRAY_LEN`].

use crate::config::GeneratorSettings;
use crate::domain::{SchemaIntrospect, SchemaShape};
use fake::faker::lorem::en::Word;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::warn;

/// Upper bound on generated array length, whatever the schema asks for.
pub const MAX_ARRAY_LEN: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct MockGenerator {
    policy: GeneratorSettings,
}

impl MockGenerator {
    pub fn new(policy: GeneratorSettings) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GeneratorSettings {
        &self.policy
    }

    /// Generate a value for `schema` using the thread-local RNG.
    pub fn generate<S: SchemaIntrospect>(&self, schema: &S) -> Value {
        let mut rng = rand::thread_rng();
        self.generate_with_rng(schema, &mut rng)
    }

    /// Generate a value for `schema`. A top-level absent optional yields `null`.
    pub fn generate_with_rng<S, R>(&self, schema: &S, rng: &mut R) -> Value
    where
        S: SchemaIntrospect,
        R: Rng + ?Sized,
    {
        self.generate_slot(schema, rng).unwrap_or(Value::Null)
    }

    /// `None` means the value is absent (an optional that was not taken).
    fn generate_slot<S, R>(&self, schema: &S, rng: &mut R) -> Option<Value>
    where
        S: SchemaIntrospect,
        R: Rng + ?Sized,
    {
        match schema.shape() {
            SchemaShape::String => Some(Value::String(Word().fake_with_rng::<String, _>(rng))),
            SchemaShape::Number => {
                let (low, high) = ordered(self.policy.number_min, self.policy.number_max);
                Some(json!(rng.gen_range(low..=high)))
            }
            SchemaShape::Boolean => Some(Value::Bool(rng.gen_bool(0.5))),
            SchemaShape::Array { element, arity } => {
                let (min, max) = match arity {
                    Some(arity) => ordered(arity.min, arity.max),
                    None => ordered(self.policy.array_min, self.policy.array_max),
                };
                let (min, max) = capped(min, max);
                let len = rng.gen_range(min..=max);
                let items = (0..len)
                    .map(|_| self.generate_slot(element, rng).unwrap_or(Value::Null))
                    .collect();
                Some(Value::Array(items))
            }
            SchemaShape::Object(fields) => {
                let mut object = Map::new();
                for field in fields {
                    if !field.required && chance(rng, self.policy.optional_probability) {
                        continue;
                    }
                    if let Some(value) = self.generate_slot(field.schema, rng) {
                        object.insert(field.name.to_string(), value);
                    }
                }
                Some(Value::Object(object))
            }
            SchemaShape::Optional(inner) => {
                if chance(rng, self.policy.optional_probability) {
                    None
                } else {
                    self.generate_slot(&*inner, rng)
                }
            }
            SchemaShape::Nullable(inner) => {
                if chance(rng, self.policy.nullable_probability) {
                    Some(Value::Null)
                } else {
                    self.generate_slot(&*inner, rng)
                }
            }
            SchemaShape::Enum(values) => match values.choose(rng) {
                Some(value) => Some(value.clone()),
                None => {
                    warn!("Enum schema declares no values; generating null");
                    Some(Value::Null)
                }
            },
            SchemaShape::Union(variants) => match variants.choose(rng) {
                Some(variant) => self.generate_slot(*variant, rng),
                None => {
                    warn!("Union schema declares no alternatives; generating null");
                    Some(Value::Null)
                }
            },
            SchemaShape::Literal(value) => Some(value.clone()),
            SchemaShape::Default { value, .. } => Some(value.clone()),
            SchemaShape::Unsupported(kind) => {
                warn!(schema_kind = %kind, "Unsupported schema node; generating null");
                Some(Value::Null)
            }
        }
    }
}

/// Generate a value for `schema` with the default policy.
pub fn generate<S: SchemaIntrospect>(schema: &S) -> Value {
    MockGenerator::default().generate(schema)
}

fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}

fn capped(min: usize, max: usize) -> (usize, usize) {
    if max <= MAX_ARRAY_LEN {
        return (min, max);
    }
    warn!(
        requested_min = min,
        requested_max = max,
        cap = MAX_ARRAY_LEN,
        "Array length bound exceeds cap; clamping"
    );
    (min.min(MAX_ARRAY_LEN), MAX_ARRAY_LEN)
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
