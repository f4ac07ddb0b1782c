//! Constructor signatures and argument binding
//!
//! Constructors take positional and keyword arguments. A [`Signature`]
//! binds an [`Args`] list into named values before any constructor body
//! runs, so a mismatch is reported without touching the instance.

use rustc_hash::FxHashMap;

use crate::value::Value;

/// Call-site arguments: positional values followed by keyword values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
}

impl Args {
    /// No arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments only
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Args {
            positional: values.into_iter().collect(),
            keywords: Vec::new(),
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    /// Positional values in call order
    pub fn positional_values(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword values in call order
    pub fn keyword_values(&self) -> &[(String, Value)] {
        &self.keywords
    }

    /// True if no argument of either kind was given
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }
}

/// How a parameter can be supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// By position or by name
    PositionalOrKeyword,
    /// By name only
    KeywordOnly,
}

/// A named constructor parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Value used when the caller omits the parameter
    pub default: Option<Value>,
    /// Positional or keyword-only
    pub kind: ParamKind,
}

/// Constructor parameter list.
///
/// Mirrors the usual `(a, b=1, *rest, key=0, **extra)` shape: ordered
/// positional-or-keyword parameters, an optional rest collector, keyword
/// only parameters and an optional keyword collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
    var_positional: Option<String>,
    var_keyword: Option<String>,
}

impl Signature {
    /// Empty signature; accepts no arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// Required positional-or-keyword parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
            kind: ParamKind::PositionalOrKeyword,
        });
        self
    }

    /// Positional-or-keyword parameter with a default
    pub fn param_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
            kind: ParamKind::PositionalOrKeyword,
        });
        self
    }

    /// Keyword-only parameter, optionally with a default
    pub fn keyword_only(mut self, name: impl Into<String>, default: Option<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default,
            kind: ParamKind::KeywordOnly,
        });
        self
    }

    /// Collect surplus positional arguments under `name`
    pub fn var_positional(mut self, name: impl Into<String>) -> Self {
        self.var_positional = Some(name.into());
        self
    }

    /// Collect unknown keyword arguments under `name`
    pub fn var_keyword(mut self, name: impl Into<String>) -> Self {
        self.var_keyword = Some(name.into());
        self
    }

    /// Declared parameters in order
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Bind call-site arguments to this signature.
    ///
    /// On failure returns a human readable reason; callers wrap it into
    /// [`ProxyError::ConstructorArgumentMismatch`](crate::ProxyError).
    pub fn bind(&self, args: &Args) -> Result<BoundArgs, String> {
        let mut bound = BoundArgs::default();

        let positional_params: Vec<&Param> = self
            .params
            .iter()
            .filter(|p| p.kind == ParamKind::PositionalOrKeyword)
            .collect();

        for (i, value) in args.positional.iter().enumerate() {
            if let Some(param) = positional_params.get(i) {
                bound.values.insert(param.name.clone(), value.clone());
            } else if self.var_positional.is_some() {
                bound.rest.push(value.clone());
            } else {
                return Err(format!(
                    "takes {} positional arguments but {} were given",
                    positional_params.len(),
                    args.positional.len()
                ));
            }
        }

        for (name, value) in &args.keywords {
            if self.params.iter().any(|p| &p.name == name) {
                if bound.values.contains_key(name) {
                    return Err(format!("got multiple values for argument '{}'", name));
                }
                bound.values.insert(name.clone(), value.clone());
            } else if self.var_keyword.is_some() {
                if bound.extra.iter().any(|(n, _)| n == name) {
                    return Err(format!("got multiple values for argument '{}'", name));
                }
                bound.extra.push((name.clone(), value.clone()));
            } else {
                return Err(format!("got an unexpected keyword argument '{}'", name));
            }
        }

        for param in &self.params {
            if bound.values.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    bound.values.insert(param.name.clone(), default.clone());
                }
                None => {
                    return Err(format!("missing required argument '{}'", param.name));
                }
            }
        }

        Ok(bound)
    }
}

/// Arguments after binding against a [`Signature`]
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    values: FxHashMap<String, Value>,
    rest: Vec<Value>,
    extra: Vec<(String, Value)>,
}

impl BoundArgs {
    /// Value bound to a declared parameter
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Value bound to a declared parameter; [`Value::None`] if absent
    pub fn value(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or_default()
    }

    /// Surplus positional arguments
    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    /// Keyword arguments not matching a declared parameter
    pub fn extra(&self) -> &[(String, Value)] {
        &self.extra
    }
}
