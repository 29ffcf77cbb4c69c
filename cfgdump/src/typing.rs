//! Type descriptors for attributes and tabular columns.
//!
//! A [`TypeDescriptor`] knows how to render its `Type` block (and its
//! qualifiers, where the type has any) into an attribute's properties.

use thiserror::Error;

use crate::xml::Element;

/// Category of a top-level object a reference type points at.
///
/// [`TypeDescriptor::from_element`] only recognizes catalog references;
/// `std::DocumentRef::<name>` stays [`TypeDescriptor::Generic`]. Document
/// references are available to trees built in code and render as
/// `cfg:DocumentRef.<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Catalog,
    /// Rendered only; never produced by parsing.
    Document,
}

impl RefKind {
    /// Token used in both the source type id and the rendered type name.
    pub fn token(self) -> &'static str {
        match self {
            RefKind::Catalog => "CatalogRef",
            RefKind::Document => "DocumentRef",
        }
    }
}

/// Sign policy of a numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Negative values allowed.
    Any,
    /// Only zero and positive values.
    Nonnegative,
}

impl Sign {
    fn as_str(self) -> &'static str {
        match self {
            Sign::Any => "Any",
            Sign::Nonnegative => "Nonnegative",
        }
    }
}

/// Data type of a property or column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// Opaque type identified by its schema-qualified name.
    Generic(String),
    /// Reference to a top-level object.
    Reference { kind: RefKind, name: String },
    /// String with a maximum length.
    Text { length: u32, variable: bool },
    /// Whole number with a digit count.
    Integer { digits: u32, sign: Sign },
    /// Number with fractional digits.
    Decimal { digits: u32, fraction: u32, sign: Sign },
}

/// A source type token that matched none of the known forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown type `{0}`")]
pub struct UnknownType(pub String);

impl UnknownType {
    /// Falls back to an opaque descriptor carrying the raw token.
    pub fn into_generic(self) -> TypeDescriptor {
        TypeDescriptor::Generic(self.0)
    }
}

impl TypeDescriptor {
    /// Appends the `Type` block for this descriptor to `parent`.
    pub fn render_into(&self, parent: &mut Element) {
        let ty = parent.append("Type");
        match self {
            TypeDescriptor::Generic(id) => {
                ty.append_text("v8:Type", id.as_str());
            }
            TypeDescriptor::Reference { kind, name } => {
                ty.append_text("v8:Type", format!("cfg:{}.{}", kind.token(), name));
            }
            TypeDescriptor::Text { length, variable } => {
                ty.append_text("v8:Type", "xs:string");
                let qualifiers = ty.append("v8:StringQualifiers");
                qualifiers.append_text("v8:Length", length.to_string());
                qualifiers.append_text(
                    "v8:AllowedLength",
                    if *variable { "Variable" } else { "Fixed" },
                );
            }
            TypeDescriptor::Integer { digits, sign } => {
                render_number(ty, *digits, 0, *sign);
            }
            TypeDescriptor::Decimal {
                digits,
                fraction,
                sign,
            } => {
                render_number(ty, *digits, *fraction, *sign);
            }
        }
    }

    /// Reads a source `<type>` element.
    ///
    /// Recognized ids are `std::string`, `std::int`, `std::float` and
    /// `<ns>::CatalogRef::<name>`. Numeric attributes that are missing or
    /// unparsable read as zero, flags read as false.
    pub fn from_element(element: &Element) -> Result<Self, UnknownType> {
        let id = element.attr("id").unwrap_or_default();
        let number = |key: &str| {
            element
                .attr(key)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let flag = |key: &str| element.attr(key).map(parse_flag).unwrap_or(false);
        let sign = |only_positive: bool| {
            if only_positive {
                Sign::Nonnegative
            } else {
                Sign::Any
            }
        };

        match id {
            "std::string" => {
                return Ok(TypeDescriptor::Text {
                    length: number("length"),
                    variable: flag("variable"),
                });
            }
            "std::int" => {
                return Ok(TypeDescriptor::Integer {
                    digits: number("length"),
                    sign: sign(flag("onlyPositive")),
                });
            }
            "std::float" => {
                return Ok(TypeDescriptor::Decimal {
                    digits: number("length"),
                    fraction: number("fractionLength"),
                    sign: sign(flag("onlyPositive")),
                });
            }
            _ => {}
        }

        let segments: Vec<&str> = id.split("::").collect();
        if let [_, category, name] = segments.as_slice()
            && *category == RefKind::Catalog.token()
            && !name.is_empty()
        {
            return Ok(TypeDescriptor::Reference {
                kind: RefKind::Catalog,
                name: name.to_string(),
            });
        }

        Err(UnknownType(id.to_string()))
    }

    /// Like [`from_element`](Self::from_element), but never fails: an
    /// unknown token is logged and kept as a [`TypeDescriptor::Generic`].
    pub fn from_element_lenient(element: &Element) -> Self {
        Self::from_element(element).unwrap_or_else(|e| {
            warn!("{e}, keeping it as an opaque type");
            e.into_generic()
        })
    }
}

fn render_number(ty: &mut Element, digits: u32, fraction: u32, sign: Sign) {
    ty.append_text("v8:Type", "xs:decimal");
    let qualifiers = ty.append("v8:NumberQualifiers");
    qualifiers.append_text("v8:Digits", digits.to_string());
    qualifiers.append_text("v8:FractionDigits", fraction.to_string());
    qualifiers.append_text("v8:AllowedSign", sign.as_str());
}

// Same truthiness rule as the source format's reader: leading 1/t/y.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim_start().chars().next(),
        Some('1' | 't' | 'T' | 'y' | 'Y')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_element(attrs: &[(&str, &str)]) -> Element {
        let mut el = Element::new("type");
        for (k, v) in attrs {
            el.set_attr(*k, *v);
        }
        el
    }

    fn rendered(ty: &TypeDescriptor) -> Element {
        let mut props = Element::new("Properties");
        ty.render_into(&mut props);
        props.children.remove(0)
    }

    #[test]
    fn test_parse_string() {
        let el = type_element(&[("id", "std::string"), ("length", "150"), ("variable", "true")]);
        assert_eq!(
            TypeDescriptor::from_element(&el),
            Ok(TypeDescriptor::Text {
                length: 150,
                variable: true
            })
        );
    }

    #[test]
    fn test_parse_numbers() {
        let int = type_element(&[("id", "std::int"), ("length", "9"), ("onlyPositive", "false")]);
        assert_eq!(
            TypeDescriptor::from_element(&int),
            Ok(TypeDescriptor::Integer {
                digits: 9,
                sign: Sign::Any
            })
        );

        let float = type_element(&[
            ("id", "std::float"),
            ("length", "15"),
            ("fractionLength", "3"),
            ("onlyPositive", "1"),
        ]);
        assert_eq!(
            TypeDescriptor::from_element(&float),
            Ok(TypeDescriptor::Decimal {
                digits: 15,
                fraction: 3,
                sign: Sign::Nonnegative
            })
        );
    }

    #[test]
    fn test_parse_catalog_reference() {
        let el = type_element(&[("id", "std::CatalogRef::Goods")]);
        assert_eq!(
            TypeDescriptor::from_element(&el),
            Ok(TypeDescriptor::Reference {
                kind: RefKind::Catalog,
                name: "Goods".into()
            })
        );
    }

    #[test]
    fn test_unknown_falls_back_to_generic() {
        for id in [
            "std::bool",
            "std::EnumRef::Colors",
            "std::DocumentRef::Order",
            "a::b::c::d",
            "",
        ] {
            let el = type_element(&[("id", id)]);
            assert_eq!(TypeDescriptor::from_element(&el), Err(UnknownType(id.into())));
            assert_eq!(
                TypeDescriptor::from_element_lenient(&el),
                TypeDescriptor::Generic(id.into())
            );
        }
    }

    #[test]
    fn test_render_text_qualifiers() {
        let ty = rendered(&TypeDescriptor::Text {
            length: 150,
            variable: true,
        });
        assert_eq!(ty.name, "Type");
        assert_eq!(ty.child_text("v8:Type"), "xs:string");
        let q = ty.child("v8:StringQualifiers").unwrap();
        assert_eq!(q.child_text("v8:Length"), "150");
        assert_eq!(q.child_text("v8:AllowedLength"), "Variable");

        let fixed = rendered(&TypeDescriptor::Text {
            length: 3,
            variable: false,
        });
        assert_eq!(
            fixed
                .child("v8:StringQualifiers")
                .unwrap()
                .child_text("v8:AllowedLength"),
            "Fixed"
        );
    }

    #[test]
    fn test_render_number_qualifiers() {
        let ty = rendered(&TypeDescriptor::Decimal {
            digits: 15,
            fraction: 2,
            sign: Sign::Nonnegative,
        });
        assert_eq!(ty.child_text("v8:Type"), "xs:decimal");
        let q = ty.child("v8:NumberQualifiers").unwrap();
        assert_eq!(q.child_text("v8:Digits"), "15");
        assert_eq!(q.child_text("v8:FractionDigits"), "2");
        assert_eq!(q.child_text("v8:AllowedSign"), "Nonnegative");

        let int = rendered(&TypeDescriptor::Integer {
            digits: 9,
            sign: Sign::Any,
        });
        let q = int.child("v8:NumberQualifiers").unwrap();
        assert_eq!(q.child_text("v8:FractionDigits"), "0");
        assert_eq!(q.child_text("v8:AllowedSign"), "Any");
    }

    #[test]
    fn test_render_reference_and_generic() {
        let r = rendered(&TypeDescriptor::Reference {
            kind: RefKind::Document,
            name: "Order".into(),
        });
        assert_eq!(r.child_text("v8:Type"), "cfg:DocumentRef.Order");
        assert!(r.child("v8:StringQualifiers").is_none());

        let g = rendered(&TypeDescriptor::Generic("xs:boolean".into()));
        assert_eq!(g.child_text("v8:Type"), "xs:boolean");
        assert_eq!(g.children.len(), 1);
    }
}
