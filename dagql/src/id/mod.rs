//! Object identity: the chain of field calls that produced a value.
//!
//! An [`Id`] is an immutable list of [`IdSelector`]s starting at the root plus
//! the type of the value it refers to. Two IDs built from the same field
//! calls are equal no matter the order their arguments were written in, and
//! hash to the same [`Digest`] once meta selectors are dropped.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest as _;
use sha2::Sha256;

use crate::class::FieldDefinition;
use crate::error::DagqlError;
use crate::literal::Literal;
use crate::selection::Selector;
use crate::types::TypeRef;

mod digest;

pub use digest::Digest;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Id {
    selectors: Vec<IdSelector>,
    #[serde(rename = "type")]
    ty: TypeRef,
}

/// One field call in an [`Id`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdSelector {
    pub field: String,

    /// Sorted by name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Argument>,

    /// 1-based index into the list the field returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,

    /// The call is not repeatable: its results must not be memoized.
    #[serde(default, skip_serializing_if = "is_false")]
    pub tainted: bool,

    /// The call does not affect the identity of the result.
    #[serde(default, skip_serializing_if = "is_false")]
    pub meta: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: Literal,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl IdSelector {
    pub fn new(field: impl Into<String>) -> Self {
        IdSelector {
            field: field.into(),
            args: Vec::new(),
            nth: None,
            tainted: false,
            meta: false,
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.args.push(Argument {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    fn sort_args(&mut self) {
        self.args.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

impl Id {
    /// The ID of a root object of type `ty`.
    pub fn root(ty: TypeRef) -> Self {
        Id {
            selectors: Vec::new(),
            ty,
        }
    }

    pub fn selectors(&self) -> &[IdSelector] {
        &self.selectors
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn is_root(&self) -> bool {
        self.selectors.is_empty()
    }

    /// A new ID with `selector` appended, referring to a value of type `ty`.
    pub fn append(&self, mut selector: IdSelector, ty: TypeRef) -> Id {
        selector.sort_args();
        let mut selectors = Vec::with_capacity(self.selectors.len() + 1);
        selectors.extend(self.selectors.iter().cloned());
        selectors.push(selector);
        Id { selectors, ty }
    }

    /// The ID of the result of calling `field` with `selector`'s arguments on
    /// the object this ID refers to.
    ///
    /// The selector's index is not recorded; see [`Id::nth`].
    pub fn extend(&self, selector: &Selector, field: &FieldDefinition) -> Id {
        let id_selector = IdSelector {
            field: field.name.clone(),
            args: selector
                .args
                .iter()
                .map(|arg| Argument {
                    name: arg.name.clone(),
                    value: arg.value.to_literal(),
                })
                .collect(),
            nth: None,
            tainted: field.tainted,
            meta: field.meta,
        };
        self.append(id_selector, field.ty.clone())
    }

    /// The ID of the 1-based `nth` element of the list this ID refers to.
    pub fn nth(&self, nth: usize) -> Id {
        let mut id = self.clone();
        if let Some(last) = id.selectors.last_mut() {
            last.nth = Some(nth);
            if let Some(elem) = self.ty.elem() {
                id.ty = elem.clone();
            }
        }
        id
    }

    /// The ID with meta selectors removed.
    pub fn canonical(&self) -> Id {
        Id {
            selectors: self
                .selectors
                .iter()
                .filter(|selector| !selector.meta)
                .cloned()
                .collect(),
            ty: self.ty.clone(),
        }
    }

    /// Whether any call in the chain is tainted.
    pub fn is_tainted(&self) -> bool {
        self.selectors.iter().any(|selector| selector.tainted)
    }

    /// A SHA-256 digest of the canonical form of this ID.
    pub fn digest(&self) -> Digest {
        let mut hasher = Sha256::new();
        self.canonical().hash_into(&mut hasher);
        Digest::from(hasher)
    }

    /// An opaque string form of this ID, suitable for use in responses.
    ///
    /// Fails for IDs carrying NaN or infinite float arguments, which JSON
    /// cannot represent.
    pub fn encode(&self) -> Result<String, DagqlError> {
        if let Some(arg) = self
            .selectors
            .iter()
            .flat_map(|selector| &selector.args)
            .find(|arg| !arg.value.is_finite())
        {
            return Err(DagqlError::InvalidId {
                reason: format!("argument {:?} is not a finite number", arg.name),
            });
        }
        let bytes = serde_json::to_vec(self).map_err(|err| DagqlError::InvalidId {
            reason: err.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parses an ID produced by [`Id::encode`].
    pub fn decode(encoded: &str) -> Result<Id, DagqlError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|err| DagqlError::InvalidId {
                reason: err.to_string(),
            })?;
        serde_json::from_slice(&bytes).map_err(|err| DagqlError::InvalidId {
            reason: err.to_string(),
        })
    }

    fn hash_into(&self, hasher: &mut Sha256) {
        hash_str(hasher, &self.ty.to_string());
        hasher.update((self.selectors.len() as u64).to_be_bytes());
        for selector in &self.selectors {
            hash_str(hasher, &selector.field);
            hasher.update((selector.args.len() as u64).to_be_bytes());
            for arg in &selector.args {
                hash_str(hasher, &arg.name);
                hash_literal(hasher, &arg.value);
            }
            match selector.nth {
                Some(nth) => {
                    hasher.update([1]);
                    hasher.update((nth as u64).to_be_bytes());
                }
                None => hasher.update([0]),
            }
            hasher.update([u8::from(selector.tainted)]);
        }
    }
}

fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

fn hash_literal(hasher: &mut Sha256, literal: &Literal) {
    match literal {
        Literal::Null => hasher.update([0]),
        Literal::Bool(b) => hasher.update([1, u8::from(*b)]),
        Literal::Int(i) => {
            hasher.update([2]);
            hasher.update(i.to_be_bytes());
        }
        Literal::Float(x) => {
            hasher.update([3]);
            hasher.update(x.to_bits().to_be_bytes());
        }
        Literal::String(s) => {
            hasher.update([4]);
            hash_str(hasher, s);
        }
        Literal::Enum(e) => {
            hasher.update([5]);
            hash_str(hasher, e);
        }
        Literal::Id(id) => {
            hasher.update([6]);
            id.canonical().hash_into(hasher);
        }
        Literal::List(items) => {
            hasher.update([7]);
            hasher.update((items.len() as u64).to_be_bytes());
            for item in items {
                hash_literal(hasher, item);
            }
        }
        Literal::Object(fields) => {
            hasher.update([8]);
            hasher.update((fields.len() as u64).to_be_bytes());
            for (name, value) in fields {
                hash_str(hasher, name);
                hash_literal(hasher, value);
            }
        }
        Literal::Variable(name) => {
            hasher.update([9]);
            hash_str(hasher, name);
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.selectors.is_empty() {
            return write!(f, "{}", self.ty);
        }
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", selector.field)?;
            if !selector.args.is_empty() {
                write!(f, "(")?;
                for (j, arg) in selector.args.iter().enumerate() {
                    if j > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", arg.name, arg.value)?;
                }
                write!(f, ")")?;
            }
            if let Some(nth) = selector.nth {
                write!(f, "[{nth}]")?;
            }
        }
        write!(f, ": {}", self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> Id {
        Id::root(TypeRef::named("Query").non_null())
    }

    #[test]
    fn display_reads_as_a_call_chain() {
        let id = query()
            .append(
                IdSelector::new("greeting").arg("name", "Ada"),
                TypeRef::named("Greeting").non_null(),
            )
            .append(IdSelector::new("hello"), TypeRef::named("String").non_null());
        assert_eq!(id.to_string(), r#"greeting(name: "Ada").hello: String!"#);
        assert_eq!(query().to_string(), "Query!");
    }

    #[test]
    fn argument_order_does_not_matter() {
        let ty = TypeRef::named("Point").non_null();
        let a = query().append(IdSelector::new("point").arg("x", 1).arg("y", 2), ty.clone());
        let b = query().append(IdSelector::new("point").arg("y", 2).arg("x", 1), ty);
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.encode().unwrap(), b.encode().unwrap());
    }

    #[test]
    fn nth_specializes_to_the_element_type() {
        let items = query().append(
            IdSelector::new("items"),
            TypeRef::list(TypeRef::named("Item").non_null()).non_null(),
        );
        let second = items.nth(2);
        assert_eq!(second.type_ref(), &TypeRef::named("Item").non_null());
        assert_eq!(second.selectors().last().unwrap().nth, Some(2));
        assert_ne!(second.digest(), items.nth(3).digest());
        assert_eq!(second.to_string(), "items[2]: Item!");
    }

    #[test]
    fn meta_selectors_do_not_affect_digest() {
        let ty = TypeRef::named("Thing").non_null();
        let plain = query().append(IdSelector::new("thing"), ty.clone());
        let mut meta = IdSelector::new("withLabel").arg("label", "x");
        meta.meta = true;
        let labelled = plain.append(meta, ty);
        assert_ne!(plain, labelled);
        assert_eq!(plain.digest(), labelled.digest());
        assert_eq!(labelled.canonical().selectors().len(), 1);
    }

    #[test]
    fn tainted_anywhere_taints_the_chain() {
        let ty = TypeRef::named("Thing").non_null();
        let mut now = IdSelector::new("now");
        now.tainted = true;
        let id = query()
            .append(now, ty.clone())
            .append(IdSelector::new("thing"), ty);
        assert!(id.is_tainted());
        assert!(!query().is_tainted());
    }

    #[test]
    fn encode_decode() {
        let id = query().append(
            IdSelector::new("greeting").arg("name", "Ada"),
            TypeRef::named("Greeting").non_null(),
        );
        assert_eq!(Id::decode(&id.encode().unwrap()).unwrap(), id);
        assert!(matches!(
            Id::decode("not an id"),
            Err(DagqlError::InvalidId { .. })
        ));
    }

    #[test]
    fn non_finite_floats_cannot_be_encoded() {
        let ty = TypeRef::named("Point").non_null();
        let nan = query().append(IdSelector::new("scale").arg("by", f64::NAN), ty.clone());
        assert_eq!(
            nan.encode().unwrap_err().to_string(),
            r#"invalid ID: argument "by" is not a finite number"#
        );

        let nested = query().append(
            IdSelector::new("load").arg("id", nan.clone()),
            ty.clone(),
        );
        assert!(nested.encode().is_err());

        let finite = query().append(IdSelector::new("scale").arg("by", 0.5), ty);
        assert_eq!(Id::decode(&finite.encode().unwrap()).unwrap(), finite);
    }

    #[test]
    fn digest_display() {
        let digest = query().digest();
        let text = digest.to_string();
        assert!(text.starts_with("sha256:"));
        assert_eq!(text.len(), "sha256:".len() + 64);
    }
}
