use crate::common::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

type Convert<T> = Arc<dyn Fn(T) -> Value + Send + Sync>;

/// Per-field value conversion applied by a milestone.
///
/// A present value is dispatched on its runtime kind: the slot for that
/// kind runs if set and yields a non-null value, else `from_other`, else the
/// value passes through unchanged. A missing or null value runs `fallback`
/// instead. `final_transform` runs last on whatever the dispatch produced.
///
/// ```rust
/// use rowshape::common::Value;
/// use rowshape::migration::FieldOverride;
///
/// let mut o = FieldOverride::new();
/// o.from_int(|i| format!("#{}", i)).fallback(|| "none");
///
/// assert_eq!(o.apply(Some(&Value::Int(7))), Some(Value::from("#7")));
/// assert_eq!(o.apply(Some(&Value::from("x"))), Some(Value::from("x")));
/// assert_eq!(o.apply(None), Some(Value::from("none")));
/// ```
#[derive(Clone, Default)]
pub struct FieldOverride {
    from_int: Option<Convert<i32>>,
    from_long: Option<Convert<i64>>,
    from_float: Option<Convert<f64>>,
    from_bool: Option<Convert<bool>>,
    from_str: Option<Arc<dyn Fn(&str) -> Value + Send + Sync>>,
    from_blob: Option<Arc<dyn Fn(&[u8]) -> Value + Send + Sync>>,
    from_other: Option<Arc<dyn Fn(&Value) -> Value + Send + Sync>>,
    fallback: Option<Arc<dyn Fn() -> Value + Send + Sync>>,
    final_transform: Option<Convert<Value>>,
}

impl FieldOverride {
    pub fn new() -> Self {
        FieldOverride::default()
    }

    pub fn from_int<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(i32) -> V + Send + Sync + 'static,
    {
        self.from_int = Some(Arc::new(move |v| f(v).into()));
        self
    }

    pub fn from_long<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(i64) -> V + Send + Sync + 'static,
    {
        self.from_long = Some(Arc::new(move |v| f(v).into()));
        self
    }

    pub fn from_float<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(f64) -> V + Send + Sync + 'static,
    {
        self.from_float = Some(Arc::new(move |v| f(v).into()));
        self
    }

    pub fn from_bool<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(bool) -> V + Send + Sync + 'static,
    {
        self.from_bool = Some(Arc::new(move |v| f(v).into()));
        self
    }

    pub fn from_str<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&str) -> V + Send + Sync + 'static,
    {
        self.from_str = Some(Arc::new(move |v: &str| f(v).into()));
        self
    }

    pub fn from_blob<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&[u8]) -> V + Send + Sync + 'static,
    {
        self.from_blob = Some(Arc::new(move |v: &[u8]| f(v).into()));
        self
    }

    /// Catch-all for kinds without their own slot, and for slots that
    /// returned `Null`.
    pub fn from_other<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&Value) -> V + Send + Sync + 'static,
    {
        self.from_other = Some(Arc::new(move |v: &Value| f(v).into()));
        self
    }

    /// Produces the value when the source field is missing or null.
    pub fn fallback<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(move || f().into()));
        self
    }

    pub fn final_transform<V, F>(&mut self, f: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(Value) -> V + Send + Sync + 'static,
    {
        self.final_transform = Some(Arc::new(move |v| f(v).into()));
        self
    }

    /// Converts a source value. `None` means the override produced nothing
    /// and the caller falls back to the field default.
    pub fn apply(&self, value: Option<&Value>) -> Option<Value> {
        let converted = match value {
            None | Some(Value::Null) => self.fallback.as_ref().map(|f| f())?,
            Some(value) => self.dispatch(value),
        };
        Some(match &self.final_transform {
            Some(transform) => transform(converted),
            None => converted,
        })
    }

    fn dispatch(&self, value: &Value) -> Value {
        let by_kind = match value {
            Value::Int(v) => self.from_int.as_ref().map(|f| f(*v)),
            Value::Long(v) => self.from_long.as_ref().map(|f| f(*v)),
            Value::Float(v) => self.from_float.as_ref().map(|f| f(*v)),
            Value::Bool(v) => self.from_bool.as_ref().map(|f| f(*v)),
            Value::Str(v) => self.from_str.as_ref().map(|f| f(v)),
            Value::Blob(v) => self.from_blob.as_ref().map(|f| f(v)),
            Value::Null | Value::List(_) => None,
        };
        match by_kind {
            Some(converted) if !converted.is_null() => converted,
            _ => match &self.from_other {
                Some(f) => {
                    let converted = f(value);
                    if converted.is_null() {
                        value.clone()
                    } else {
                        converted
                    }
                }
                None => value.clone(),
            },
        }
    }
}

impl Debug for FieldOverride {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldOverride")
            .field("from_int", &self.from_int.is_some())
            .field("from_long", &self.from_long.is_some())
            .field("from_float", &self.from_float.is_some())
            .field("from_bool", &self.from_bool.is_some())
            .field("from_str", &self.from_str.is_some())
            .field("from_blob", &self.from_blob.is_some())
            .field("from_other", &self.from_other.is_some())
            .field("fallback", &self.fallback.is_some())
            .field("final_transform", &self.final_transform.is_some())
            .finish()
    }
}
