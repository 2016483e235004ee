//! Site-specific HL7 text transformation hooks.
//!
//! Hospital feeds have idiosyncrasies that are easier to patch on the raw
//! text than to model. A [`Transformer`] is a pair of pure string rewrites,
//! one per direction, selected by name at configuration time. The default
//! `identity` transformer passes text through untouched.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

/// A pure text rewrite applied to raw HL7 before parsing / after generation
pub type TransformFn = fn(&str) -> String;

/// A named pair of directional transforms
#[derive(Clone, Copy, Debug)]
pub struct Transformer {
    pub name: &'static str,
    incoming: TransformFn,
    outgoing: TransformFn,
}

impl Transformer {
    /// Rewrite raw inbound text before it reaches the parser
    pub fn transform_incoming(&self, raw: &str) -> String {
        (self.incoming)(raw)
    }

    /// Rewrite generated outbound text before transmission
    pub fn transform_outgoing(&self, raw: &str) -> String {
        (self.outgoing)(raw)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("HL7 message transformer '{0}' is unavailable")]
pub struct UnknownTransformer(pub String);

fn identity(raw: &str) -> String {
    raw.to_string()
}

static REGISTRY: Lazy<HashMap<&'static str, Transformer>> = Lazy::new(|| {
    let transformers = [Transformer {
        name: "identity",
        incoming: identity,
        outgoing: identity,
    }];

    transformers.into_iter().map(|t| (t.name, t)).collect()
});

/// Look up a transformer by its configured name
pub fn lookup(name: &str) -> Result<Transformer, UnknownTransformer> {
    REGISTRY
        .get(name)
        .copied()
        .ok_or_else(|| UnknownTransformer(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roundtrip() {
        let t = lookup("identity").unwrap();
        let raw = "MSH|^~\\&|A|B|C|D|20170731141348||ADT^A01|X1|P|2.3";
        assert_eq!(t.transform_incoming(raw), raw);
        assert_eq!(t.transform_outgoing(raw), raw);
    }

    #[test]
    fn test_unknown_name() {
        let err = lookup("missing_module").unwrap_err();
        assert_eq!(err, UnknownTransformer("missing_module".to_string()));
        assert!(err.to_string().contains("missing_module"));
    }
}
