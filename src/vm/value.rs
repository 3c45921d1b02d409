/// Runtime value model of the stack VM.
///
/// Values copy by value: assigning an array copies its contents, so no
/// sharing is observable from the source language.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Int(i64),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
}

impl Value {
    /// Dense array of `n` integer zeroes.
    pub fn zero_array(n: usize) -> Self {
        Value::Array(vec![Value::Int(0); n])
    }

    /// The "zero" test used by `JZ` and `NOT`.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Double(d) => *d == 0.0,
            Value::Str(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::None => true,
        }
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Value::Double(_))
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            Value::Double(d) => *d as i64,
            Value::Str(s) => s.parse().unwrap_or(0),
            Value::Array(_) | Value::None => 0,
        }
    }

    pub fn as_double(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Double(d) => *d,
            Value::Str(s) => s.parse().unwrap_or(0.0),
            Value::Array(_) | Value::None => 0.0,
        }
    }

    /// String form used by `ADD` concatenation and the `EQ`/`NEQ` compare.
    pub fn as_string(&self) -> String {
        match self {
            Value::Int(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Str(s) => s.clone(),
            Value::Array(_) | Value::None => String::new(),
        }
    }
}
