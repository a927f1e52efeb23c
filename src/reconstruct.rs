use crate::fault::{Fault, ASSERTION_KIND, GENERIC_KIND};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Strategy that builds a fresh fault of a given kind from a source fault.
///
/// Strategies only need to produce the kind and message; backtrace and
/// properties are copied over by [`FaultCloner::clone_fault`].
pub type ReconstructFn = fn(&Fault) -> Result<Fault, ReconstructError>;

/// Reasons a strategy can refuse to rebuild a fault.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("{kind} requires the `{field}` property")]
    MissingField { kind: String, field: &'static str },

    #[error("cannot reconstruct {kind}: {reason}")]
    Rejected { kind: String, reason: String },
}

/// Kinds rebuilt from their message alone.
pub const STANDARD_KINDS: &[&str] = &[
    GENERIC_KIND,
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "EvalError",
    "URIError",
];

/// Registry of reconstruction strategies keyed by fault kind.
///
/// Unknown kinds, and kinds whose strategy fails, fall back to a generic
/// `Error` with the source's message. Reconstruction therefore never
/// fails.
#[derive(Clone)]
pub struct FaultCloner {
    strategies: HashMap<String, ReconstructFn>,
}

impl Default for FaultCloner {
    fn default() -> Self {
        let mut cloner = FaultCloner::empty();
        for kind in STANDARD_KINDS {
            cloner.register(*kind, rebuild_from_message);
        }
        cloner.register(ASSERTION_KIND, rebuild_assertion);
        cloner
    }
}

impl FaultCloner {
    /// Cloner preloaded with the standard kinds and `AssertionError`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloner with no strategies; every kind falls back to `Error`.
    pub fn empty() -> Self {
        FaultCloner {
            strategies: HashMap::new(),
        }
    }

    /// Register (or replace) the strategy used for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, strategy: ReconstructFn) -> &mut Self {
        self.strategies.insert(kind.into(), strategy);
        self
    }

    pub fn knows(&self, kind: &str) -> bool {
        self.strategies.contains_key(kind)
    }

    /// Build a new fault of the source's kind, or a generic `Error` when
    /// no strategy exists or the strategy refuses.
    pub fn reconstruct(&self, source: &Fault) -> Fault {
        match self.strategies.get(source.kind()) {
            Some(strategy) => strategy(source).unwrap_or_else(|_| generic(source)),
            None => generic(source),
        }
    }

    /// Independent copy of `source`: reconstructed kind and message, then
    /// the backtrace and every property copied across.
    ///
    /// Mutating the result never affects `source` and vice versa.
    pub fn clone_fault(&self, source: &Fault) -> Fault {
        let mut copy = self.reconstruct(source);
        copy.set_stack(source.stack().to_vec());
        for (key, value) in source.properties() {
            copy.insert_property(key.clone(), value.clone());
        }
        copy
    }
}

/// Process-wide cloner with the default strategies.
pub fn default_cloner() -> &'static FaultCloner {
    static CLONER: OnceLock<FaultCloner> = OnceLock::new();
    CLONER.get_or_init(FaultCloner::default)
}

/// Clone a fault with the default strategies.
pub fn clone_fault(source: &Fault) -> Fault {
    default_cloner().clone_fault(source)
}

fn generic(source: &Fault) -> Fault {
    Fault::bare(GENERIC_KIND, source.message())
}

fn rebuild_from_message(source: &Fault) -> Result<Fault, ReconstructError> {
    Ok(Fault::bare(source.kind(), source.message()))
}

fn rebuild_assertion(source: &Fault) -> Result<Fault, ReconstructError> {
    let mut rebuilt = Fault::bare(ASSERTION_KIND, source.message());
    for field in ["actual", "expected", "operator"] {
        let value = source.property(field).ok_or_else(|| ReconstructError::MissingField {
            kind: ASSERTION_KIND.to_string(),
            field,
        })?;
        rebuilt.insert_property(field, value.clone());
    }
    Ok(rebuilt)
}
